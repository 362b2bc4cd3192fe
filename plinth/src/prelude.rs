//! Common imports for most plinth applications.

pub use crate::{
    AllowListConfig, AppConfig, ArtifactDispatcher, ArtifactError, ArtifactSource, ArtifactType,
    Attachment, AttachmentKind, BufferedResponseSink, ContentAggregator, DeliveryPhase,
    EventError, EventHandler, GraphEvent, RequestPipeline, RequestPipelineBuilder, ResponseSink,
    RunGraph, RunMetadata, ToolArtifact, ToolOutput, UsageRecord, ValidationResult,
    is_external_app_allowed,
};
pub use crate::{default_hooks, local_collaborators};
