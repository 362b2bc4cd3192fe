//! Orchestration event names and the handler contract.
//!
//! ```rust
//! use pevents::GraphEvent;
//!
//! assert_eq!(GraphEvent::parse("on_run_step"), Some(GraphEvent::RunStep));
//! assert_eq!(GraphEvent::ToolEnd.as_str(), "on_tool_end");
//! assert_eq!(GraphEvent::parse("on_custom_event"), None);
//! ```

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use pcommon::RunMetadata;
use serde_json::Value;

use crate::{EventError, RunGraph};

/// Frame name used when a hidden agent's step is summarized instead of forwarded.
pub const AGENT_UPDATE_EVENT: &str = "on_agent_update";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphEvent {
    ChatModelEnd,
    ChatModelStream,
    ToolEnd,
    RunStep,
    RunStepDelta,
    RunStepCompleted,
    MessageDelta,
    ReasoningDelta,
}

impl GraphEvent {
    pub const ALL: [GraphEvent; 8] = [
        Self::ChatModelEnd,
        Self::ChatModelStream,
        Self::ToolEnd,
        Self::RunStep,
        Self::RunStepDelta,
        Self::RunStepCompleted,
        Self::MessageDelta,
        Self::ReasoningDelta,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ChatModelEnd => "on_chat_model_end",
            Self::ChatModelStream => "on_chat_model_stream",
            Self::ToolEnd => "on_tool_end",
            Self::RunStep => "on_run_step",
            Self::RunStepDelta => "on_run_step_delta",
            Self::RunStepCompleted => "on_run_step_completed",
            Self::MessageDelta => "on_message_delta",
            Self::ReasoningDelta => "on_reasoning_delta",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.as_str() == name)
    }
}

impl Display for GraphEvent {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the handler table.
///
/// `metadata` and `graph` are absent when the engine does not supply them; handlers
/// decide for themselves whether that is fatal.
pub trait EventHandler: Send + Sync {
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError>;
}

impl EventHandler for Arc<dyn EventHandler> {
    fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        graph: Option<&dyn RunGraph>,
    ) -> Result<(), EventError> {
        self.as_ref().handle(event, data, metadata, graph)
    }
}
