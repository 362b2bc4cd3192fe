//! Model-call handlers: usage collection, non-streaming content replay, and tool-call
//! registration during streaming.

use std::sync::Arc;

use pcommon::RunMetadata;
use pdispatch::is_truthy;
use serde_json::{Value, json};

use crate::{EventError, EventHandler, RunGraph, UsageAccumulator, UsageRecord};

const MESSAGE_CREATION_STEP: &str = "message_creation";

fn tool_calls(data: &Value) -> Option<&Vec<Value>> {
    data.pointer("/output/tool_calls").and_then(Value::as_array)
}

fn is_text_part(part: &Value) -> bool {
    part.get("type")
        .and_then(Value::as_str)
        .is_some_and(|kind| kind.starts_with("text"))
}

/// Handles `on_chat_model_end`. Failures are logged and never surface to the caller.
pub struct ModelEndHandler {
    usage: Arc<UsageAccumulator>,
}

impl ModelEndHandler {
    pub fn new(usage: Arc<UsageAccumulator>) -> Self {
        Self { usage }
    }

    fn process(
        &self,
        data: &Value,
        metadata: &RunMetadata,
        graph: &dyn RunGraph,
    ) -> Result<(), EventError> {
        if let Some(calls) = tool_calls(data) {
            graph.register_tool_calls(calls, metadata)?;
        }

        let Some(usage) = data
            .pointer("/output/usage_metadata")
            .filter(|usage| !usage.is_null())
        else {
            return Ok(());
        };
        let mut record: UsageRecord = serde_json::from_value(usage.clone())?;
        if let Some(model) = &metadata.model {
            record.model = Some(model.clone());
        }
        self.usage.push(record);

        if !graph.streaming_disabled() {
            return Ok(());
        }
        let Some(content) = data.pointer("/output/content").filter(|content| is_truthy(content))
        else {
            return Ok(());
        };

        // Nothing was streamed, so replay the final content as one step and one delta.
        let step_key = graph.step_key(metadata)?;
        if let Some(message_id) = graph.message_id(&step_key).filter(|id| !id.is_empty()) {
            graph.dispatch_run_step(
                &step_key,
                json!({
                    "type": MESSAGE_CREATION_STEP,
                    "message_creation": {"message_id": message_id},
                }),
            )?;
        }

        let step_id = graph.step_id(&step_key)?;
        match content {
            Value::String(text) => graph.dispatch_message_delta(
                &step_id,
                json!({"content": [{"type": "text", "text": text}]}),
            ),
            Value::Array(parts) if parts.iter().all(is_text_part) => {
                graph.dispatch_message_delta(&step_id, json!({"content": parts}))
            }
            _ => Ok(()),
        }
    }
}

impl EventHandler for ModelEndHandler {
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError> {
        let (Some(metadata), Some(graph)) = (metadata, graph) else {
            tracing::warn!(
                phase = "events",
                event = "model_end_context_missing",
                graph_event = event,
                has_metadata = metadata.is_some(),
                has_graph = graph.is_some()
            );
            return Ok(());
        };

        if let Err(error) = self.process(data, metadata, graph) {
            tracing::error!(
                phase = "events",
                event = "model_end_failure",
                run_id = %metadata.run_id,
                error_kind = ?error.kind,
                error = %error
            );
        }
        Ok(())
    }
}

/// Runs `inner`, then registers any tool calls carried by the streamed chunk.
pub struct ToolCallRegisteringHandler<H> {
    inner: H,
}

impl<H> ToolCallRegisteringHandler<H>
where
    H: EventHandler,
{
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> EventHandler for ToolCallRegisteringHandler<H>
where
    H: EventHandler,
{
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError> {
        let handled = self.inner.handle(event, data, metadata, graph);

        if let (Some(calls), Some(metadata), Some(graph)) = (tool_calls(data), metadata, graph)
            && let Err(error) = graph.register_tool_calls(calls, metadata)
        {
            tracing::error!(
                phase = "events",
                event = "stream_tool_call_registration_failure",
                run_id = %metadata.run_id,
                error = %error
            );
        }

        handled
    }
}
