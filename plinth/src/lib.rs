//! Unified facade over the plinth workspace crates.
//!
//! Most chat backends only need this crate: it re-exports the dispatcher, the event
//! handler table, the origin validator and the reference collaborators, and wires them
//! together per request in [`RequestPipeline`].

pub mod prelude;
pub mod runtime;
pub mod util;

pub use pcommon;
pub use pdispatch;
pub use pevents;
pub use pfiles;
pub use pobserve;
pub use porigin;
pub use pstream;

pub use pcommon::{BoxFuture, ConfigError, ConversationId, MessageId, RunMetadata, UserId};
pub use pdispatch::{
    AppConfig, ArtifactDispatcher, ArtifactDispatcherBuilder, ArtifactError, ArtifactErrorKind,
    Attachment, AttachmentKind, CitationPolicy, CitationProcessor, CodeOutputProcessor,
    CredentialLoader, DispatchContext, DispatchHooks, FileContext, FileMetadata, ImageStore,
    NoopDispatchHooks, PendingResults, ToolArtifact, ToolOutput, html_attachments,
};
pub use pevents::{
    ContentAggregator, EventError, EventErrorKind, EventHandler, GraphEvent, HandlerOptions,
    HandlerTable, RecordingAggregator, RunGraph, UsageAccumulator, UsageRecord,
    default_handlers, route_event,
};
pub use pfiles::{
    EnvCredentialLoader, FilesystemImageStore, HttpCodeOutputProcessor, InMemoryCredentialLoader,
    PolicyCitationProcessor,
};
pub use pobserve::{
    CompositeDispatchHooks, MetricsDispatchHooks, SafeDispatchHooks, TracingDispatchHooks,
};
pub use porigin::{
    AllowListConfig, ArtifactSource, ArtifactType, ExternalAppsConfig, ValidationResult,
    extract_urls_from_html, is_external_app_allowed,
};
pub use pstream::{
    BufferedResponseSink, ChannelResponseSink, DeliveryPhase, ResponseChannel, ResponseSink,
    StreamFrame,
};

pub use runtime::{RequestPipeline, RequestPipelineBuilder};
pub use util::{default_hooks, local_collaborators};
