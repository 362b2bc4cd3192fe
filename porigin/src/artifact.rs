//! Artifact MIME types and provenance as the browser models them.
//!
//! ```rust
//! use porigin::{ArtifactSource, ArtifactType};
//!
//! let kind: ArtifactType = "application/vnd.external-app".parse().expect("known type");
//! assert_eq!(kind, ArtifactType::ExternalApp);
//! assert_eq!(kind.entry_filename(None), "index.html");
//!
//! let source = ArtifactSource::mcp("maps");
//! assert_eq!(source.mcp_server(), Some("maps"));
//! ```

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub const EXTERNAL_APP_TYPE: &str = "application/vnd.external-app";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArtifactType {
    #[serde(rename = "text/html")]
    Html,
    #[serde(rename = "application/vnd.react")]
    React,
    #[serde(rename = "application/vnd.code-html")]
    CodeHtml,
    #[serde(rename = "application/vnd.external-app")]
    ExternalApp,
    #[serde(rename = "application/vnd.mermaid")]
    Mermaid,
    #[serde(rename = "text/markdown")]
    Markdown,
    #[serde(rename = "text/md")]
    Md,
    #[serde(rename = "text/plain")]
    PlainText,
}

impl ArtifactType {
    pub const ALL: [ArtifactType; 8] = [
        Self::Html,
        Self::React,
        Self::CodeHtml,
        Self::ExternalApp,
        Self::Mermaid,
        Self::Markdown,
        Self::Md,
        Self::PlainText,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Html => "text/html",
            Self::React => "application/vnd.react",
            Self::CodeHtml => "application/vnd.code-html",
            Self::ExternalApp => EXTERNAL_APP_TYPE,
            Self::Mermaid => "application/vnd.mermaid",
            Self::Markdown => "text/markdown",
            Self::Md => "text/md",
            Self::PlainText => "text/plain",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == value)
    }

    /// File the artifact's primary source is written to when rendered.
    ///
    /// A language qualifier never names a known entry, so qualified artifacts fall back
    /// to `index.html`.
    pub fn entry_filename(&self, language: Option<&str>) -> &'static str {
        if language.is_some_and(|language| !language.is_empty()) {
            return "index.html";
        }

        match self {
            Self::React => "App.tsx",
            _ => "index.html",
        }
    }

    /// External apps are shown in a frame, never compiled in a sandbox bundle.
    pub fn uses_sandbox(&self) -> bool {
        !matches!(self, Self::ExternalApp)
    }
}

impl Display for ArtifactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownArtifactType(pub String);

impl Display for UnknownArtifactType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown artifact type '{}'", self.0)
    }
}

impl std::error::Error for UnknownArtifactType {}

impl FromStr for ArtifactType {
    type Err = UnknownArtifactType;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value).ok_or_else(|| UnknownArtifactType(value.to_string()))
    }
}

/// Who produced an artifact: the model itself or a named MCP server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ArtifactSource {
    Llm,
    Mcp {
        #[serde(
            rename = "mcpServer",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        mcp_server: Option<String>,
    },
}

impl ArtifactSource {
    pub fn mcp(server: impl Into<String>) -> Self {
        Self::Mcp {
            mcp_server: Some(server.into()),
        }
    }

    /// The originating server, when the source is MCP and names one.
    pub fn mcp_server(&self) -> Option<&str> {
        match self {
            Self::Mcp {
                mcp_server: Some(server),
            } if !server.is_empty() => Some(server.as_str()),
            _ => None,
        }
    }
}
