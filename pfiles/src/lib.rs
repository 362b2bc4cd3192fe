//! Reference collaborators for the artifact dispatcher: filesystem image storage,
//! credential loading, code-output download, and policy-driven citations.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pdispatch::{ArtifactDispatcher, PendingResults};
//! use pfiles::{FilesystemImageStore, InMemoryCredentialLoader, PolicyCitationProcessor};
//! use pstream::{BufferedResponseSink, ResponseChannel};
//!
//! let channel = ResponseChannel::new(Arc::new(BufferedResponseSink::new()));
//! let _dispatcher = ArtifactDispatcher::builder(channel, Arc::new(PendingResults::new()))
//!     .image_store(Arc::new(FilesystemImageStore::new(std::env::temp_dir())))
//!     .credential_loader(Arc::new(InMemoryCredentialLoader::new()))
//!     .citation_processor(Arc::new(PolicyCitationProcessor::new()))
//!     .build();
//! ```

mod citations;
mod code;
mod credentials;
mod images;
mod secret;
mod storage;

pub mod prelude {
    pub use crate::{
        CodeApiTransport, EnvCredentialLoader, FilesystemImageStore, HttpCodeOutputProcessor,
        InMemoryCredentialLoader, PolicyCitationProcessor, SecretString,
    };
}

pub use citations::{PolicyCitationProcessor, select_sources};
#[cfg(feature = "http")]
pub use code::ReqwestCodeApiTransport;
pub use code::{CODE_OUTPUT_TTL, CodeApiTransport, HttpCodeOutputProcessor};
pub use credentials::{EnvCredentialLoader, InMemoryCredentialLoader};
pub use images::{FilesystemImageStore, InlineImage};
pub use secret::SecretString;
