//! Policy-driven citation attachments from file-search results.
//!
//! Sources are read from `artifact.file_search.sources`. Each source may carry a
//! `relevance` score and a `fileId`; sources without a score are kept, sources without a
//! file id are capped together.

use std::cmp::Ordering;
use std::collections::HashMap;

use pdispatch::{
    ArtifactError, ArtifactFuture, Attachment, AttachmentKind, CitationPolicy, CitationProcessor,
    CitationRequest, tools,
};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyCitationProcessor;

impl PolicyCitationProcessor {
    pub fn new() -> Self {
        Self
    }
}

fn relevance(source: &Value) -> Option<f64> {
    source.get("relevance").and_then(Value::as_f64)
}

fn file_key(source: &Value) -> &str {
    source
        .get("fileId")
        .or_else(|| source.get("file_id"))
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// Applies the relevance floor, then the per-file and overall caps, highest relevance first.
pub fn select_sources(sources: &[Value], policy: &CitationPolicy) -> Vec<Value> {
    let mut ranked: Vec<&Value> = sources
        .iter()
        .filter(|source| source.is_object())
        .filter(|source| relevance(source).is_none_or(|score| score >= policy.min_relevance_score))
        .collect();
    // Stable sort keeps engine order among equal or missing scores.
    ranked.sort_by(|left, right| {
        let left = relevance(left).unwrap_or(f64::INFINITY);
        let right = relevance(right).unwrap_or(f64::INFINITY);
        right.partial_cmp(&left).unwrap_or(Ordering::Equal)
    });

    let mut per_file: HashMap<&str, usize> = HashMap::new();
    let mut selected = Vec::new();
    for source in ranked {
        if selected.len() >= policy.max_citations {
            break;
        }
        let count = per_file.entry(file_key(source)).or_default();
        if *count >= policy.max_citations_per_file {
            continue;
        }
        *count += 1;
        selected.push(source.clone());
    }
    selected
}

impl CitationProcessor for PolicyCitationProcessor {
    fn process_citations<'a>(
        &'a self,
        request: CitationRequest,
    ) -> ArtifactFuture<'a, Result<Option<Attachment>, ArtifactError>> {
        Box::pin(async move {
            let policy = &request.app_config.file_citations;
            if !policy.enabled {
                return Ok(None);
            }

            let Some(file_search) = request.artifact.file_search.as_ref() else {
                return Ok(None);
            };
            let sources = match file_search.get("sources") {
                None | Some(Value::Null) => return Ok(None),
                Some(Value::Array(sources)) => sources,
                Some(_) => {
                    return Err(ArtifactError::citation("file_search.sources must be an array"));
                }
            };

            let selected = select_sources(sources, policy);
            tracing::debug!(
                phase = "files",
                event = "citations_selected",
                tool_call_id = %request.tool_call_id,
                candidates = sources.len(),
                selected = selected.len()
            );
            if selected.is_empty() {
                return Ok(None);
            }

            let mut payload = file_search.as_object().cloned().unwrap_or_else(Map::new);
            payload.insert("sources".to_string(), Value::Array(selected));

            Ok(Some(
                Attachment::new(AttachmentKind::FileSearch, &request.metadata, request.tool_call_id)
                    .with_field(tools::FILE_SEARCH, Value::Object(payload)),
            ))
        })
    }
}
