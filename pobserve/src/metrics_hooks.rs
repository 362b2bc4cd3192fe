//! Metrics-based dispatch hooks.
//!
//! Counters and histograms are emitted through the `metrics` facade, so they go to
//! whichever recorder the host installs.

use std::time::Duration;

use pcommon::RunMetadata;
use pdispatch::{ArtifactError, Attachment, AttachmentKind, DispatchHooks};
use pstream::DeliveryPhase;

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsDispatchHooks;

fn delivery_label(phase: DeliveryPhase) -> &'static str {
    match phase {
        DeliveryPhase::Buffering => "buffering",
        DeliveryPhase::Streaming => "streaming",
    }
}

impl DispatchHooks for MetricsDispatchHooks {
    fn on_artifact_enqueued(&self, kind: AttachmentKind, metadata: &RunMetadata, _tool_call_id: &str) {
        metrics::counter!(
            "plinth_artifact_enqueued_total",
            "kind" => kind.label(),
            "provider" => metadata.provider.clone().unwrap_or_default()
        )
        .increment(1);
    }

    fn on_attachment_ready(&self, attachment: &Attachment, phase: DeliveryPhase, elapsed: Duration) {
        metrics::counter!(
            "plinth_attachment_ready_total",
            "kind" => attachment.kind.label(),
            "delivery" => delivery_label(phase)
        )
        .increment(1);
        metrics::histogram!(
            "plinth_artifact_duration_seconds",
            "kind" => attachment.kind.label(),
            "status" => "success"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_artifact_failed(
        &self,
        kind: AttachmentKind,
        _tool_call_id: &str,
        error: &ArtifactError,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "plinth_artifact_failure_total",
            "kind" => kind.label(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "plinth_artifact_duration_seconds",
            "kind" => kind.label(),
            "status" => "failure"
        )
        .record(elapsed.as_secs_f64());
    }

    fn on_delivery_failed(&self, attachment: &Attachment, _error: &ArtifactError) {
        metrics::counter!(
            "plinth_attachment_delivery_failure_total",
            "kind" => attachment.kind.label()
        )
        .increment(1);
    }
}
