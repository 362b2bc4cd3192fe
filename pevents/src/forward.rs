//! Handlers that forward step and delta events to the browser.
//!
//! Intermediate agents of a sequential run can hide their output. Their steps are then
//! summarized as `on_agent_update` frames (run steps) or dropped (deltas), while the
//! aggregator still sees every event.

use std::sync::Arc;

use pcommon::RunMetadata;
use pstream::{ResponseChannel, StreamFrame};
use serde_json::{Value, json};

use crate::{AGENT_UPDATE_EVENT, ContentAggregator, EventError, EventHandler, RunGraph};

const TOOL_CALLS_STEP: &str = "tool_calls";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardPolicy {
    RunStep,
    RunStepDelta,
    RunStepCompleted,
    /// Message and reasoning deltas.
    ContentDelta,
}

#[derive(Debug, Clone, PartialEq)]
enum Forward {
    Event,
    AgentUpdate(Value),
    Suppress,
}

impl ForwardPolicy {
    fn decide(&self, data: &Value, metadata: Option<&RunMetadata>) -> Forward {
        let visible = agent_output_visible(metadata);
        match self {
            Self::RunStep => {
                if is_tool_calls(data.pointer("/stepDetails/type")) || visible {
                    return Forward::Event;
                }
                Forward::AgentUpdate(agent_update(data, metadata))
            }
            Self::RunStepDelta => {
                if is_tool_calls(data.pointer("/delta/type")) || visible {
                    return Forward::Event;
                }
                Forward::Suppress
            }
            Self::RunStepCompleted => {
                let has_result = data.get("result").is_some_and(|result| !result.is_null());
                if is_tool_calls(data.pointer("/stepDetails/type")) || has_result || visible {
                    return Forward::Event;
                }
                Forward::Suppress
            }
            Self::ContentDelta => {
                if visible {
                    return Forward::Event;
                }
                Forward::Suppress
            }
        }
    }
}

/// Missing metadata counts as the last agent.
fn agent_output_visible(metadata: Option<&RunMetadata>) -> bool {
    metadata.is_none_or(|metadata| metadata.is_last_agent() || metadata.shows_sequential_outputs())
}

fn is_tool_calls(step_type: Option<&Value>) -> bool {
    step_type.and_then(Value::as_str) == Some(TOOL_CALLS_STEP)
}

fn agent_update(data: &Value, metadata: Option<&RunMetadata>) -> Value {
    let agent = metadata
        .and_then(|metadata| metadata.name.as_deref())
        .unwrap_or("Agent");
    let action = if is_tool_calls(data.pointer("/stepDetails/type")) {
        "performing a task..."
    } else {
        "thinking..."
    };

    json!({
        "runId": metadata.map(|metadata| metadata.run_id.as_str()),
        "message": format!("{agent} is {action}"),
    })
}

pub struct ForwardingHandler {
    channel: ResponseChannel,
    aggregator: Arc<dyn ContentAggregator>,
    policy: ForwardPolicy,
}

impl ForwardingHandler {
    pub fn new(
        channel: ResponseChannel,
        aggregator: Arc<dyn ContentAggregator>,
        policy: ForwardPolicy,
    ) -> Self {
        Self {
            channel,
            aggregator,
            policy,
        }
    }

    pub fn policy(&self) -> ForwardPolicy {
        self.policy
    }
}

impl EventHandler for ForwardingHandler {
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        _graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError> {
        let sent = match self.policy.decide(data, metadata) {
            Forward::Event => self.channel.send(StreamFrame::event(event, data.clone())),
            Forward::AgentUpdate(update) => self
                .channel
                .send(StreamFrame::event(AGENT_UPDATE_EVENT, update)),
            Forward::Suppress => Ok(()),
        };

        self.aggregator.aggregate(event, data);
        sent.map_err(EventError::from)
    }
}
