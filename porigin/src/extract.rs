//! Navigation target extraction from external-app HTML.

use std::sync::OnceLock;

use regex::Regex;

fn meta_refresh_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)content=["'][^"']*url=([^"'\s>]+)"#).expect("meta refresh regex")
    })
}

fn location_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)(?:window\.(?:top\.)?location(?:\.href)?)\s*=\s*["']([^"']+)["']"#)
            .expect("location assignment regex")
    })
}

fn iframe_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<iframe[^>]+src=["']([^"']+)["']"#).expect("iframe regex")
    })
}

fn escaping_anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a[^>]+href=["']([^"']+)["'][^>]+target=["'](?:_top|_parent)["']"#)
            .expect("anchor regex")
    })
}

/// Collects the URLs an HTML document would navigate to or embed.
///
/// Four patterns are tried in a fixed order (meta refresh, `window.location`
/// assignment, iframe `src`, anchor targeting `_top` or `_parent`), and each contributes
/// at most its first match. Matching is case-insensitive.
///
/// ```rust
/// use porigin::extract_urls_from_html;
///
/// let html = r#"<meta http-equiv="refresh" content="0; url=https://a.test/x">
///               <iframe width="10" src="https://b.test/frame"></iframe>"#;
/// assert_eq!(
///     extract_urls_from_html(html),
///     vec!["https://a.test/x".to_string(), "https://b.test/frame".to_string()]
/// );
/// ```
pub fn extract_urls_from_html(html: &str) -> Vec<String> {
    [
        meta_refresh_regex(),
        location_regex(),
        iframe_regex(),
        escaping_anchor_regex(),
    ]
    .into_iter()
    .filter_map(|pattern| {
        pattern
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|found| found.as_str().to_string())
    })
    .collect()
}
