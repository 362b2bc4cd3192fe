//! Tracing-based dispatch hooks.
//!
//! ```rust
//! use pdispatch::DispatchHooks;
//! use pobserve::TracingDispatchHooks;
//!
//! fn accepts_hooks(_hooks: &dyn DispatchHooks) {}
//!
//! accepts_hooks(&TracingDispatchHooks);
//! ```

use std::time::Duration;

use pcommon::RunMetadata;
use pdispatch::{ArtifactError, Attachment, AttachmentKind, DispatchHooks};
use pstream::DeliveryPhase;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDispatchHooks;

impl DispatchHooks for TracingDispatchHooks {
    fn on_artifact_enqueued(&self, kind: AttachmentKind, metadata: &RunMetadata, tool_call_id: &str) {
        tracing::debug!(
            phase = "dispatch",
            event = "artifact_enqueued",
            kind = kind.label(),
            run_id = %metadata.run_id,
            thread_id = %metadata.thread_id,
            tool_call_id
        );
    }

    fn on_attachment_ready(&self, attachment: &Attachment, phase: DeliveryPhase, elapsed: Duration) {
        tracing::info!(
            phase = "dispatch",
            event = "attachment_ready",
            kind = attachment.kind.label(),
            message_id = %attachment.message_id,
            tool_call_id = %attachment.tool_call_id,
            delivery = ?phase,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }

    fn on_artifact_failed(
        &self,
        kind: AttachmentKind,
        tool_call_id: &str,
        error: &ArtifactError,
        elapsed: Duration,
    ) {
        tracing::warn!(
            phase = "dispatch",
            event = "artifact_failed",
            kind = kind.label(),
            tool_call_id,
            error_kind = ?error.kind,
            elapsed_ms = elapsed.as_millis() as u64,
            error = %error
        );
    }

    fn on_delivery_failed(&self, attachment: &Attachment, error: &ArtifactError) {
        tracing::warn!(
            phase = "dispatch",
            event = "attachment_delivery_failed",
            kind = attachment.kind.label(),
            tool_call_id = %attachment.tool_call_id,
            error = %error
        );
    }
}
