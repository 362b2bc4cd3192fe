//! Origin allow-list validation for external application artifacts.
//!
//! An external application artifact is HTML that navigates to or embeds a live third-party
//! page. It is only rendered when it comes from an MCP server that opted in and at least
//! one extracted navigation target starts with one of that server's allowed origins. The
//! first such target becomes the validated URL; targets that match no origin do not
//! cause a rejection.

mod artifact;
mod config;
mod extract;
mod validate;

pub mod prelude {
    pub use crate::{
        AllowListConfig, ArtifactSource, ArtifactType, ExternalAppsConfig, ValidationResult,
        extract_urls_from_html, is_external_app_allowed,
    };
}

pub use artifact::{ArtifactSource, ArtifactType, EXTERNAL_APP_TYPE, UnknownArtifactType};
pub use config::{AllowListConfig, ExternalAppsConfig, ServerConfig};
pub use extract::extract_urls_from_html;
pub use validate::{ValidationResult, is_external_app_allowed};
