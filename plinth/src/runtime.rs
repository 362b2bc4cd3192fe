//! Per-request wiring of the response channel, the artifact dispatcher and the handler
//! table.

use std::sync::Arc;

use pcommon::{RunMetadata, UserId};
use pdispatch::{
    AppConfig, ArtifactDispatcher, Attachment, CitationProcessor, CodeOutputProcessor,
    CredentialLoader, DispatchHooks, ImageStore, PendingResults,
};
use pevents::{
    ContentAggregator, EventError, EventHandler, HandlerOptions, HandlerTable, RunGraph,
    UsageAccumulator, UsageRecord, default_handlers, route_event,
};
use pstream::{DeliveryPhase, ResponseChannel, ResponseSink};
use serde_json::Value;

use crate::util::default_hooks;

/// Everything one chat request needs to turn orchestration events into browser frames
/// and attachments.
///
/// ```rust
/// use std::sync::Arc;
///
/// use plinth::{BufferedResponseSink, RecordingAggregator, RequestPipeline, RunMetadata};
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let sink = Arc::new(BufferedResponseSink::new());
/// let pipeline = RequestPipeline::new(sink.clone(), Arc::new(RecordingAggregator::new()))
///     .expect("pipeline should build");
///
/// let metadata = RunMetadata::new("run-1", "thread-1");
/// let output = json!({"output": {"name": "search", "tool_call_id": "call-1",
///     "content": "done", "artifact": {"web_search": {"results": []}}}});
/// assert!(pipeline.handle("on_tool_end", &output, Some(&metadata), None));
///
/// let (attachments, usage) = pipeline.finish().await;
/// assert_eq!(attachments.len(), 1);
/// assert!(usage.is_empty());
/// # }
/// ```
pub struct RequestPipeline {
    channel: ResponseChannel,
    pending: Arc<PendingResults>,
    usage: Arc<UsageAccumulator>,
    dispatcher: ArtifactDispatcher,
    table: HandlerTable,
}

impl RequestPipeline {
    /// Pipeline with no artifact collaborators; collaborator-backed artifacts fail soft.
    pub fn new(
        sink: Arc<dyn ResponseSink>,
        aggregator: Arc<dyn ContentAggregator>,
    ) -> Result<Self, EventError> {
        Self::builder(sink, aggregator).build()
    }

    pub fn builder(
        sink: Arc<dyn ResponseSink>,
        aggregator: Arc<dyn ContentAggregator>,
    ) -> RequestPipelineBuilder {
        RequestPipelineBuilder::new(sink, aggregator)
    }

    pub fn channel(&self) -> &ResponseChannel {
        &self.channel
    }

    pub fn dispatcher(&self) -> &ArtifactDispatcher {
        &self.dispatcher
    }

    pub fn table(&self) -> &HandlerTable {
        &self.table
    }

    pub fn usage(&self) -> Arc<UsageAccumulator> {
        Arc::clone(&self.usage)
    }

    pub fn pending(&self) -> Arc<PendingResults> {
        Arc::clone(&self.pending)
    }

    /// Marks response headers as sent. Attachments finishing after this are streamed
    /// instead of buffered.
    pub fn begin_streaming(&self) -> bool {
        self.channel.begin_streaming()
    }

    pub fn phase(&self) -> DeliveryPhase {
        self.channel.phase()
    }

    /// Routes one raw orchestration event. Handler errors are logged, never returned, so
    /// one bad event cannot abort the run. Returns whether a handler ran.
    pub fn handle(
        &self,
        event: &str,
        data: &Value,
        metadata: Option<&RunMetadata>,
        graph: Option<&dyn RunGraph>,
    ) -> bool {
        match route_event(&self.table, event, data, metadata, graph) {
            Ok(handled) => handled,
            Err(error) => {
                tracing::error!(
                    phase = "pipeline",
                    event = "handler_failure",
                    graph_event = event,
                    run_id = metadata.map(|metadata| metadata.run_id.as_str()).unwrap_or_default(),
                    error_kind = ?error.kind,
                    error = %error
                );
                true
            }
        }
    }

    /// Waits for every in-flight attachment and takes the collected usage.
    pub async fn finish(&self) -> (Vec<Attachment>, Vec<UsageRecord>) {
        let attachments = self.pending.drain().await;
        let usage = self.usage.take();
        tracing::debug!(
            phase = "pipeline",
            event = "finished",
            attachments = attachments.len(),
            usage_records = usage.len()
        );
        (attachments, usage)
    }
}

pub struct RequestPipelineBuilder {
    sink: Arc<dyn ResponseSink>,
    aggregator: Arc<dyn ContentAggregator>,
    user_id: UserId,
    app_config: Arc<AppConfig>,
    citations: Option<Arc<dyn CitationProcessor>>,
    images: Option<Arc<dyn ImageStore>>,
    credentials: Option<Arc<dyn CredentialLoader>>,
    code_outputs: Option<Arc<dyn CodeOutputProcessor>>,
    hooks: Option<Arc<dyn DispatchHooks>>,
    stream_handler: Option<Arc<dyn EventHandler>>,
}

impl RequestPipelineBuilder {
    pub fn new(sink: Arc<dyn ResponseSink>, aggregator: Arc<dyn ContentAggregator>) -> Self {
        Self {
            sink,
            aggregator,
            user_id: UserId::default(),
            app_config: Arc::new(AppConfig::default()),
            citations: None,
            images: None,
            credentials: None,
            code_outputs: None,
            hooks: None,
            stream_handler: None,
        }
    }

    pub fn user(mut self, user_id: impl Into<UserId>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn app_config(mut self, app_config: Arc<AppConfig>) -> Self {
        self.app_config = app_config;
        self
    }

    pub fn citation_processor(mut self, processor: Arc<dyn CitationProcessor>) -> Self {
        self.citations = Some(processor);
        self
    }

    pub fn image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.images = Some(store);
        self
    }

    pub fn credential_loader(mut self, loader: Arc<dyn CredentialLoader>) -> Self {
        self.credentials = Some(loader);
        self
    }

    pub fn code_output_processor(mut self, processor: Arc<dyn CodeOutputProcessor>) -> Self {
        self.code_outputs = Some(processor);
        self
    }

    /// Replaces the default tracing hooks.
    pub fn hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn stream_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.stream_handler = Some(handler);
        self
    }

    pub fn build(self) -> Result<RequestPipeline, EventError> {
        let channel = ResponseChannel::new(self.sink);
        let pending = Arc::new(PendingResults::new());
        let usage = Arc::new(UsageAccumulator::new());

        let mut dispatcher = ArtifactDispatcher::builder(channel.clone(), Arc::clone(&pending))
            .user(self.user_id)
            .app_config(self.app_config)
            .hooks(self.hooks.unwrap_or_else(default_hooks));
        if let Some(processor) = self.citations {
            dispatcher = dispatcher.citation_processor(processor);
        }
        if let Some(store) = self.images {
            dispatcher = dispatcher.image_store(store);
        }
        if let Some(loader) = self.credentials {
            dispatcher = dispatcher.credential_loader(loader);
        }
        if let Some(processor) = self.code_outputs {
            dispatcher = dispatcher.code_output_processor(processor);
        }
        let dispatcher = dispatcher.build();

        let mut options = HandlerOptions::new()
            .with_channel(channel.clone())
            .with_aggregator(self.aggregator)
            .with_dispatcher(dispatcher.clone())
            .with_usage(Arc::clone(&usage));
        if let Some(handler) = self.stream_handler {
            options = options.with_stream_handler(handler);
        }
        let table = default_handlers(options)?;

        Ok(RequestPipeline {
            channel,
            pending,
            usage,
            dispatcher,
            table,
        })
    }
}
