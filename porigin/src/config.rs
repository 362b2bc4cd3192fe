//! Per-server external application allow-list.
//!
//! ```rust
//! use porigin::AllowListConfig;
//!
//! let config = AllowListConfig::from_json_str(
//!     r#"{"maps": {"externalApps": {"enabled": true, "allowedOrigins": ["https://maps.test"]}}}"#,
//! )
//! .expect("config should parse");
//!
//! let apps = config.external_apps("maps").expect("maps is configured");
//! assert!(apps.enabled);
//! assert_eq!(apps.allowed_origins, vec!["https://maps.test".to_string()]);
//! ```

use std::collections::HashMap;
use std::path::Path;

use pcommon::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExternalAppsConfig {
    #[serde(default)]
    pub enabled: bool,
    /// Prefixes matched against extracted URLs, in priority order.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl ExternalAppsConfig {
    pub fn enabled_for<I, S>(origins: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            enabled: true,
            allowed_origins: origins.into_iter().map(Into::into).collect(),
        }
    }
}

/// One MCP server entry. Only `externalApps` is interpreted; other keys are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_apps: Option<ExternalAppsConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AllowListConfig {
    servers: HashMap<String, ServerConfig>,
}

impl AllowListConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(raw).map_err(|error| ConfigError::parse(error.to_string()))
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|error| ConfigError::io(format!("{}: {error}", path.display())))?;
        Self::from_json_str(&raw)
    }

    pub fn with_server(mut self, name: impl Into<String>, external_apps: ExternalAppsConfig) -> Self {
        self.servers.insert(
            name.into(),
            ServerConfig {
                external_apps: Some(external_apps),
                extra: Map::new(),
            },
        );
        self
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.get(name)
    }

    pub fn external_apps(&self, name: &str) -> Option<&ExternalAppsConfig> {
        self.server(name)
            .and_then(|server| server.external_apps.as_ref())
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
