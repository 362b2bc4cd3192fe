//! Application configuration handed to artifact collaborators.
//!
//! ```rust
//! use pdispatch::AppConfig;
//!
//! let config = AppConfig::from_json_str(r#"{"fileCitations":{"maxCitations":10}}"#)
//!     .expect("config should parse");
//! assert_eq!(config.file_citations.max_citations, 10);
//! assert_eq!(config.file_citations.max_citations_per_file, 7);
//! ```

use std::path::Path;

use pcommon::ConfigError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub file_citations: CitationPolicy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_api_base_url: Option<String>,
}

/// Limits applied when turning file-search results into citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CitationPolicy {
    pub enabled: bool,
    pub max_citations: usize,
    pub max_citations_per_file: usize,
    pub min_relevance_score: f64,
}

impl Default for CitationPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_citations: 30,
            max_citations_per_file: 7,
            min_relevance_score: 0.45,
        }
    }
}

impl AppConfig {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::parse(error.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ConfigError::io(format!("failed to read {}: {error}", path.display()))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn with_code_api_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.code_api_base_url = Some(base_url.into());
        self
    }
}
