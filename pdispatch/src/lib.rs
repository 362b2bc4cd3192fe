//! Tool output classification and attachment dispatch.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pcommon::RunMetadata;
//! use pdispatch::{ArtifactDispatcher, PendingResults, ToolOutput};
//! use pstream::{BufferedResponseSink, ResponseChannel};
//! use serde_json::json;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let channel = ResponseChannel::new(Arc::new(BufferedResponseSink::new()));
//! let pending = Arc::new(PendingResults::new());
//! let dispatcher = ArtifactDispatcher::builder(channel, pending.clone()).build();
//!
//! let output = ToolOutput::new("render", "call-1")
//!     .with_content(json!({"__html_content": true, "html": "<p>hi</p>"}).to_string());
//! dispatcher.dispatch(Some(&output), &RunMetadata::new("run-1", "thread-1"));
//!
//! let attachments = pending.drain().await;
//! assert_eq!(attachments.len(), 1);
//! assert!(attachments[0].is_html());
//! # }
//! ```

mod config;
mod content;
mod dispatcher;
mod error;
mod hooks;
mod pending;
mod services;
mod types;

pub mod prelude {
    pub use crate::{
        AppConfig, ArtifactDispatcher, ArtifactError, ArtifactErrorKind, Attachment,
        AttachmentKind, CitationPolicy, DispatchContext, DispatchHooks, NoopDispatchHooks,
        PendingResults, ToolArtifact, ToolOutput,
    };
}

pub use config::{AppConfig, CitationPolicy};
pub use content::{HtmlContent, is_truthy, parse_tool_content};
pub use dispatcher::{ArtifactDispatcher, ArtifactDispatcherBuilder, DispatchContext};
pub use error::{ArtifactError, ArtifactErrorKind};
pub use hooks::{DispatchHooks, NoopDispatchHooks};
pub use pending::PendingResults;
pub use services::{
    ArtifactFuture, CitationProcessor, CitationRequest, CodeOutputProcessor, CodeOutputRequest,
    CredentialLoader, ImageStore, SaveImageRequest,
};
pub use types::{
    Attachment, AttachmentKind, CodeFile, ContentPart, FileContext, FileMetadata, ImageUrl,
    ToolArtifact, ToolOutput, UiResources, html_attachments, tools,
};
