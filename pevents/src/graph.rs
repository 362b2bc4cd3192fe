//! Seams to the orchestration graph and the content aggregator.

use std::sync::{Mutex, PoisonError};

use pcommon::RunMetadata;
use serde_json::Value;

use crate::EventError;

/// The parts of the running agent graph the handlers drive.
pub trait RunGraph: Send + Sync {
    /// Registers tool calls so later deltas can be matched to their steps.
    fn register_tool_calls(
        &self,
        tool_calls: &[Value],
        metadata: &RunMetadata,
    ) -> Result<(), EventError>;

    fn streaming_disabled(&self) -> bool;

    fn step_key(&self, metadata: &RunMetadata) -> Result<String, EventError>;

    /// Message id already allocated for `step_key`, if any.
    fn message_id(&self, step_key: &str) -> Option<String>;

    fn step_id(&self, step_key: &str) -> Result<String, EventError>;

    fn dispatch_run_step(&self, step_key: &str, details: Value) -> Result<(), EventError>;

    fn dispatch_message_delta(&self, step_id: &str, delta: Value) -> Result<(), EventError>;
}

/// Builds the final message content from the same events the browser sees.
pub trait ContentAggregator: Send + Sync {
    fn aggregate(&self, event: &str, data: &Value);
}

/// Keeps every aggregated event in arrival order.
#[derive(Debug, Default)]
pub struct RecordingAggregator {
    events: Mutex<Vec<(String, Value)>>,
}

impl RecordingAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events().into_iter().map(|(name, _)| name).collect()
    }
}

impl ContentAggregator for RecordingAggregator {
    fn aggregate(&self, event: &str, data: &Value) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((event.to_string(), data.clone()));
    }
}
