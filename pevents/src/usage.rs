//! Per-request token usage collection.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Token usage reported by one model call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UsageRecord {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Provider-specific breakdowns, kept verbatim for billing.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UsageRecord {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            ..Self::default()
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Append-only usage log shared by the handlers of one request.
#[derive(Debug, Default)]
pub struct UsageAccumulator {
    records: Mutex<Vec<UsageRecord>>,
}

impl UsageAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: UsageRecord) {
        self.records().push(record);
    }

    pub fn snapshot(&self) -> Vec<UsageRecord> {
        self.records().clone()
    }

    pub fn take(&self) -> Vec<UsageRecord> {
        std::mem::take(&mut *self.records())
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum over every record, without a model tag.
    pub fn totals(&self) -> UsageRecord {
        self.records()
            .iter()
            .fold(UsageRecord::default(), |mut total, record| {
                total.input_tokens += record.input_tokens;
                total.output_tokens += record.output_tokens;
                total.total_tokens += record.total_tokens;
                total
            })
    }

    fn records(&self) -> MutexGuard<'_, Vec<UsageRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
