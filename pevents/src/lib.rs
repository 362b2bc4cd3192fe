//! Orchestration event handlers: browser forwarding with the sequential-agent visibility
//! policy, usage collection, and tool-end artifact dispatch.

mod error;
mod event;
mod forward;
mod graph;
mod model;
mod table;
mod tool;
mod usage;

pub mod prelude {
    pub use crate::{
        ContentAggregator, EventError, EventErrorKind, EventHandler, GraphEvent, HandlerOptions,
        HandlerTable, RunGraph, UsageAccumulator, UsageRecord, default_handlers, route_event,
    };
}

pub use error::{EventError, EventErrorKind};
pub use event::{AGENT_UPDATE_EVENT, EventHandler, GraphEvent};
pub use forward::{ForwardPolicy, ForwardingHandler};
pub use graph::{ContentAggregator, RecordingAggregator, RunGraph};
pub use model::{ModelEndHandler, ToolCallRegisteringHandler};
pub use table::{HandlerOptions, HandlerTable, default_handlers, route_event};
pub use tool::ToolEndHandler;
pub use usage::{UsageAccumulator, UsageRecord};
