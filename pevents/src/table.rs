//! Default handler table construction and event routing.

use std::sync::Arc;

use pcommon::{Registry, RunMetadata};
use pdispatch::ArtifactDispatcher;
use pstream::ResponseChannel;
use serde_json::Value;

use crate::{
    ContentAggregator, EventError, EventHandler, ForwardPolicy, ForwardingHandler, GraphEvent,
    ModelEndHandler, RunGraph, ToolCallRegisteringHandler, ToolEndHandler, UsageAccumulator,
};

pub type HandlerTable = Registry<GraphEvent, Arc<dyn EventHandler>>;

/// Inputs for [`default_handlers`]. The channel and aggregator are required.
#[derive(Default)]
pub struct HandlerOptions {
    pub channel: Option<ResponseChannel>,
    pub aggregator: Option<Arc<dyn ContentAggregator>>,
    pub dispatcher: Option<ArtifactDispatcher>,
    pub usage: Arc<UsageAccumulator>,
    /// Base handler for `on_chat_model_stream`; registered wrapped so streamed tool calls
    /// are also registered with the graph.
    pub stream_handler: Option<Arc<dyn EventHandler>>,
}

impl HandlerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_channel(mut self, channel: ResponseChannel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_aggregator(mut self, aggregator: Arc<dyn ContentAggregator>) -> Self {
        self.aggregator = Some(aggregator);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: ArtifactDispatcher) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    pub fn with_usage(mut self, usage: Arc<UsageAccumulator>) -> Self {
        self.usage = usage;
        self
    }

    pub fn with_stream_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.stream_handler = Some(handler);
        self
    }
}

/// Builds the standard handler table for one request.
///
/// ```rust
/// use std::sync::Arc;
///
/// use pevents::{GraphEvent, HandlerOptions, RecordingAggregator, default_handlers};
/// use pstream::{BufferedResponseSink, ResponseChannel};
///
/// let options = HandlerOptions::new()
///     .with_channel(ResponseChannel::new(Arc::new(BufferedResponseSink::new())))
///     .with_aggregator(Arc::new(RecordingAggregator::new()));
/// let table = default_handlers(options).expect("table should build");
///
/// assert!(table.contains_key(&GraphEvent::RunStep));
/// assert!(!table.contains_key(&GraphEvent::ToolEnd));
///
/// let missing = default_handlers(HandlerOptions::new());
/// assert!(missing.is_err());
/// ```
pub fn default_handlers(options: HandlerOptions) -> Result<HandlerTable, EventError> {
    let (Some(channel), Some(aggregator)) = (options.channel, options.aggregator) else {
        return Err(EventError::missing_option(
            "handler table requires a response channel and a content aggregator",
        ));
    };

    let mut table = HandlerTable::new();
    table.insert(
        GraphEvent::ChatModelEnd,
        Arc::new(ModelEndHandler::new(options.usage)),
    );
    if let Some(dispatcher) = options.dispatcher {
        table.insert(GraphEvent::ToolEnd, Arc::new(ToolEndHandler::new(dispatcher)));
    }
    if let Some(stream_handler) = options.stream_handler {
        table.insert(
            GraphEvent::ChatModelStream,
            Arc::new(ToolCallRegisteringHandler::new(stream_handler)),
        );
    }

    for (event, policy) in [
        (GraphEvent::RunStep, ForwardPolicy::RunStep),
        (GraphEvent::RunStepDelta, ForwardPolicy::RunStepDelta),
        (GraphEvent::RunStepCompleted, ForwardPolicy::RunStepCompleted),
        (GraphEvent::MessageDelta, ForwardPolicy::ContentDelta),
        (GraphEvent::ReasoningDelta, ForwardPolicy::ContentDelta),
    ] {
        table.insert(
            event,
            Arc::new(ForwardingHandler::new(
                channel.clone(),
                Arc::clone(&aggregator),
                policy,
            )),
        );
    }

    Ok(table)
}

/// Routes a raw event name through `table`.
///
/// Returns `Ok(false)` when the name is unknown or has no registered handler.
pub fn route_event(
    table: &HandlerTable,
    event: &str,
    data: &Value,
    metadata: Option<&RunMetadata>,
    graph: Option<&dyn RunGraph>,
) -> Result<bool, EventError> {
    let Some(handler) = GraphEvent::parse(event).and_then(|parsed| table.get(&parsed)) else {
        tracing::trace!(phase = "events", event = "unhandled_event", graph_event = event);
        return Ok(false);
    };

    handler.handle(event, data, metadata, graph)?;
    Ok(true)
}
