//! Helpers for reading tool output content.
//!
//! ```rust
//! use pdispatch::{HtmlContent, parse_tool_content};
//! use serde_json::json;
//!
//! let parsed = parse_tool_content(&json!(r#"{"__html_content":true,"html":"<b>hi</b>"}"#));
//! let html = parsed.as_ref().and_then(HtmlContent::detect).expect("marker should be found");
//! assert_eq!(html.html.as_deref(), Some("<b>hi</b>"));
//! ```

use serde_json::Value;

use crate::types::tools;

/// Parses string content as JSON and passes structured content through.
///
/// Unparseable strings and empty content yield `None`: they are "not JSON", never an error.
pub fn parse_tool_content(content: &Value) -> Option<Value> {
    match content {
        Value::String(raw) => serde_json::from_str(raw).ok(),
        Value::Null => None,
        other => Some(other.clone()),
    }
}

/// JavaScript-style truthiness, which is how the engine's payloads flag optional sections.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlContent {
    pub html: Option<String>,
    pub domain: Option<String>,
}

impl HtmlContent {
    pub fn detect(parsed: &Value) -> Option<Self> {
        let marker = parsed.get(tools::HTML_CONTENT_MARKER)?;
        if !is_truthy(marker) {
            return None;
        }

        Some(Self {
            html: parsed
                .get("html")
                .and_then(Value::as_str)
                .map(ToString::to_string),
            domain: parsed
                .get("domain")
                .and_then(Value::as_str)
                .map(ToString::to_string),
        })
    }
}
