//! External application allow decision.

use serde::{Deserialize, Serialize};

use crate::{AllowListConfig, ArtifactSource, EXTERNAL_APP_TYPE, extract_urls_from_html};

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub allowed: bool,
    /// The first extracted URL that matched an allowed origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validated_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ValidationResult {
    pub fn allow(validated_url: impl Into<String>) -> Self {
        Self {
            allowed: true,
            validated_url: Some(validated_url.into()),
            reason: None,
        }
    }

    pub fn deny(reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            validated_url: None,
            reason: Some(reason.into()),
        }
    }
}

/// Decides whether an artifact may be shown as a live external application.
///
/// The artifact must declare the external-app type, come from a named MCP server whose
/// `externalApps` entry is enabled with at least one origin, and contain a navigation
/// target starting with one of those origins. Extracted URLs are tried in extraction
/// order against origins in configured order; the first hit wins.
///
/// ```rust
/// use porigin::{AllowListConfig, ArtifactSource, ExternalAppsConfig, is_external_app_allowed};
///
/// let servers = AllowListConfig::new()
///     .with_server("maps", ExternalAppsConfig::enabled_for(["https://maps.test"]));
/// let result = is_external_app_allowed(
///     Some("application/vnd.external-app"),
///     Some(&ArtifactSource::mcp("maps")),
///     Some(r#"<iframe src="https://maps.test/embed"></iframe>"#),
///     Some(&servers),
/// );
///
/// assert!(result.allowed);
/// assert_eq!(result.validated_url.as_deref(), Some("https://maps.test/embed"));
/// ```
pub fn is_external_app_allowed(
    artifact_type: Option<&str>,
    source: Option<&ArtifactSource>,
    content: Option<&str>,
    servers: Option<&AllowListConfig>,
) -> ValidationResult {
    let result = evaluate(artifact_type, source, content, servers);
    tracing::debug!(
        phase = "origin",
        event = "external_app_validated",
        allowed = result.allowed,
        validated_url = result.validated_url.as_deref().unwrap_or_default(),
        reason = result.reason.as_deref().unwrap_or_default()
    );
    result
}

fn evaluate(
    artifact_type: Option<&str>,
    source: Option<&ArtifactSource>,
    content: Option<&str>,
    servers: Option<&AllowListConfig>,
) -> ValidationResult {
    if artifact_type != Some(EXTERNAL_APP_TYPE) {
        return ValidationResult::deny("Not an external app artifact");
    }

    let Some(server_name) = source.and_then(ArtifactSource::mcp_server) else {
        return ValidationResult::deny("External apps must come from a trusted MCP server");
    };

    let external_apps = servers
        .and_then(|servers| servers.external_apps(server_name))
        .filter(|apps| apps.enabled);
    let Some(external_apps) = external_apps else {
        return ValidationResult::deny(format!(
            "MCP server \"{server_name}\" does not have external apps enabled"
        ));
    };

    if external_apps.allowed_origins.is_empty() {
        return ValidationResult::deny(format!(
            "MCP server \"{server_name}\" has no allowed origins configured"
        ));
    }

    let urls = extract_urls_from_html(content.unwrap_or_default());
    if urls.is_empty() {
        return ValidationResult::deny("No URLs found in artifact content");
    }

    let matched = urls.into_iter().find(|url| {
        external_apps
            .allowed_origins
            .iter()
            .any(|origin| url.starts_with(origin.as_str()))
    });

    match matched {
        Some(url) => ValidationResult::allow(url),
        None => ValidationResult::deny(format!(
            "URLs in artifact do not match allowed origins for \"{server_name}\""
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExternalAppsConfig;

    fn servers() -> AllowListConfig {
        AllowListConfig::new()
            .with_server("maps", ExternalAppsConfig::enabled_for(["https://maps.test"]))
            .with_server("closed", ExternalAppsConfig::default())
            .with_server("empty", ExternalAppsConfig::enabled_for(Vec::<String>::new()))
    }

    #[test]
    fn rejection_reasons_follow_check_order() {
        let servers = servers();
        let maps = ArtifactSource::mcp("maps");
        let iframe = Some(r#"<iframe src="https://maps.test/x"></iframe>"#);

        let cases = [
            (
                is_external_app_allowed(Some("text/html"), Some(&maps), iframe, Some(&servers)),
                "Not an external app artifact",
            ),
            (
                is_external_app_allowed(Some(EXTERNAL_APP_TYPE), Some(&ArtifactSource::Llm), iframe, Some(&servers)),
                "External apps must come from a trusted MCP server",
            ),
            (
                is_external_app_allowed(Some(EXTERNAL_APP_TYPE), None, iframe, Some(&servers)),
                "External apps must come from a trusted MCP server",
            ),
            (
                is_external_app_allowed(
                    Some(EXTERNAL_APP_TYPE),
                    Some(&ArtifactSource::mcp("closed")),
                    iframe,
                    Some(&servers),
                ),
                "MCP server \"closed\" does not have external apps enabled",
            ),
            (
                is_external_app_allowed(
                    Some(EXTERNAL_APP_TYPE),
                    Some(&ArtifactSource::mcp("unknown")),
                    iframe,
                    Some(&servers),
                ),
                "MCP server \"unknown\" does not have external apps enabled",
            ),
            (
                is_external_app_allowed(Some(EXTERNAL_APP_TYPE), Some(&maps), iframe, None),
                "MCP server \"maps\" does not have external apps enabled",
            ),
            (
                is_external_app_allowed(
                    Some(EXTERNAL_APP_TYPE),
                    Some(&ArtifactSource::mcp("empty")),
                    iframe,
                    Some(&servers),
                ),
                "MCP server \"empty\" has no allowed origins configured",
            ),
            (
                is_external_app_allowed(Some(EXTERNAL_APP_TYPE), Some(&maps), None, Some(&servers)),
                "No URLs found in artifact content",
            ),
        ];

        for (result, reason) in cases {
            assert!(!result.allowed);
            assert_eq!(result.validated_url, None);
            assert_eq!(result.reason.as_deref(), Some(reason));
        }
    }

    #[test]
    fn any_extracted_url_may_satisfy_the_allow_list() {
        let servers = servers();
        let html = r#"<script>window.location = "https://other.test"</script>
                      <iframe src="https://maps.test/embed"></iframe>"#;

        let result = is_external_app_allowed(
            Some(EXTERNAL_APP_TYPE),
            Some(&ArtifactSource::mcp("maps")),
            Some(html),
            Some(&servers),
        );

        assert_eq!(result, ValidationResult::allow("https://maps.test/embed"));
    }

    #[test]
    fn results_serialize_in_browser_shape() {
        let rendered = serde_json::to_value(ValidationResult::allow("https://maps.test"))
            .expect("result should serialize");
        assert_eq!(
            rendered,
            serde_json::json!({"allowed": true, "validatedUrl": "https://maps.test"})
        );
    }
}
