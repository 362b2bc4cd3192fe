//! Bridges `on_tool_end` events into the artifact dispatcher.

use pcommon::RunMetadata;
use pdispatch::{ArtifactDispatcher, ToolOutput};
use serde_json::Value;

use crate::{EventError, EventHandler, RunGraph};

pub struct ToolEndHandler {
    dispatcher: ArtifactDispatcher,
}

impl ToolEndHandler {
    pub fn new(dispatcher: ArtifactDispatcher) -> Self {
        Self { dispatcher }
    }
}

impl EventHandler for ToolEndHandler {
    /// Expects `data.output` to hold the tool message. Must run inside a tokio runtime.
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        _graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError> {
        let Some(metadata) = metadata else {
            tracing::warn!(phase = "events", event = "tool_end_without_metadata", graph_event = event);
            return Ok(());
        };

        let output = match data.get("output").filter(|output| !output.is_null()) {
            Some(raw) => Some(serde_json::from_value::<ToolOutput>(raw.clone())?),
            None => None,
        };
        self.dispatcher.dispatch(output.as_ref(), metadata);
        Ok(())
    }
}
