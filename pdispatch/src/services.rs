//! Collaborator contracts the dispatcher delegates artifact processing to.
//!
//! Each collaborator is a narrow trait returning a boxed future so implementations can
//! live anywhere: in-process stores, HTTP services, or test doubles.
//!
//! ```rust
//! use std::collections::HashMap;
//!
//! use pcommon::UserId;
//! use pdispatch::{ArtifactError, ArtifactFuture, CredentialLoader};
//!
//! struct StaticKey;
//!
//! impl CredentialLoader for StaticKey {
//!     fn load_auth_values<'a>(
//!         &'a self,
//!         _user_id: &'a UserId,
//!         fields: &'a [&'a str],
//!     ) -> ArtifactFuture<'a, Result<HashMap<String, String>, ArtifactError>> {
//!         Box::pin(async move {
//!             Ok(fields.iter().map(|field| (field.to_string(), "key".to_string())).collect())
//!         })
//!     }
//! }
//!
//! fn accepts_loader(_loader: &dyn CredentialLoader) {}
//! accepts_loader(&StaticKey);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use pcommon::{BoxFuture, ConversationId, MessageId, RunMetadata, UserId};

use crate::{AppConfig, ArtifactError, Attachment, FileContext, FileMetadata, ToolArtifact};

pub type ArtifactFuture<'a, T> = BoxFuture<'a, T>;

#[derive(Debug, Clone)]
pub struct CitationRequest {
    pub user_id: UserId,
    pub metadata: RunMetadata,
    pub app_config: Arc<AppConfig>,
    pub artifact: ToolArtifact,
    pub tool_call_id: String,
}

pub trait CitationProcessor: Send + Sync {
    /// `Ok(None)` means there is nothing worth citing.
    fn process_citations<'a>(
        &'a self,
        request: CitationRequest,
    ) -> ArtifactFuture<'a, Result<Option<Attachment>, ArtifactError>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveImageRequest {
    pub user_id: UserId,
    /// Pre-assigned id; the store generates one when absent.
    pub file_id: Option<String>,
    pub filename: String,
    /// Provider that produced the image.
    pub endpoint: Option<String>,
    pub context: FileContext,
}

pub trait ImageStore: Send + Sync {
    fn save_base64_image<'a>(
        &'a self,
        url: String,
        request: SaveImageRequest,
    ) -> ArtifactFuture<'a, Result<FileMetadata, ArtifactError>>;
}

pub trait CredentialLoader: Send + Sync {
    /// Every requested field must be present in the returned map.
    fn load_auth_values<'a>(
        &'a self,
        user_id: &'a UserId,
        fields: &'a [&'a str],
    ) -> ArtifactFuture<'a, Result<HashMap<String, String>, ArtifactError>>;
}

#[derive(Clone, PartialEq, Eq)]
pub struct CodeOutputRequest {
    pub user_id: UserId,
    pub file_id: String,
    pub file_name: String,
    pub api_key: String,
    pub message_id: MessageId,
    pub tool_call_id: String,
    pub conversation_id: ConversationId,
    pub session_id: Option<String>,
}

impl std::fmt::Debug for CodeOutputRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeOutputRequest")
            .field("user_id", &self.user_id)
            .field("file_id", &self.file_id)
            .field("file_name", &self.file_name)
            .field("api_key", &"[REDACTED]")
            .field("message_id", &self.message_id)
            .field("tool_call_id", &self.tool_call_id)
            .field("conversation_id", &self.conversation_id)
            .field("session_id", &self.session_id)
            .finish()
    }
}

pub trait CodeOutputProcessor: Send + Sync {
    fn process_code_output<'a>(
        &'a self,
        request: CodeOutputRequest,
    ) -> ArtifactFuture<'a, Result<Option<FileMetadata>, ArtifactError>>;
}
