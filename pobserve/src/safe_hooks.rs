use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::time::Duration;

use pcommon::RunMetadata;
use pdispatch::{ArtifactError, Attachment, AttachmentKind, DispatchHooks};
use pstream::DeliveryPhase;

/// Swallows panics raised by the wrapped hooks so a faulty observer cannot take down a
/// background artifact task.
pub struct SafeDispatchHooks<H> {
    inner: H,
}

impl<H> SafeDispatchHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }
}

impl<H> DispatchHooks for SafeDispatchHooks<H>
where
    H: DispatchHooks,
{
    fn on_artifact_enqueued(&self, kind: AttachmentKind, metadata: &RunMetadata, tool_call_id: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_artifact_enqueued(kind, metadata, tool_call_id)
        }));
    }

    fn on_attachment_ready(&self, attachment: &Attachment, phase: DeliveryPhase, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attachment_ready(attachment, phase, elapsed)
        }));
    }

    fn on_artifact_failed(
        &self,
        kind: AttachmentKind,
        tool_call_id: &str,
        error: &ArtifactError,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_artifact_failed(kind, tool_call_id, error, elapsed)
        }));
    }

    fn on_delivery_failed(&self, attachment: &Attachment, error: &ArtifactError) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_delivery_failed(attachment, error)
        }));
    }
}

/// Fans each callback out to every member in order.
#[derive(Default, Clone)]
pub struct CompositeDispatchHooks {
    members: Vec<Arc<dyn DispatchHooks>>,
}

impl CompositeDispatchHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.members.push(hooks);
        self
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl DispatchHooks for CompositeDispatchHooks {
    fn on_artifact_enqueued(&self, kind: AttachmentKind, metadata: &RunMetadata, tool_call_id: &str) {
        for hooks in &self.members {
            hooks.on_artifact_enqueued(kind, metadata, tool_call_id);
        }
    }

    fn on_attachment_ready(&self, attachment: &Attachment, phase: DeliveryPhase, elapsed: Duration) {
        for hooks in &self.members {
            hooks.on_attachment_ready(attachment, phase, elapsed);
        }
    }

    fn on_artifact_failed(
        &self,
        kind: AttachmentKind,
        tool_call_id: &str,
        error: &ArtifactError,
        elapsed: Duration,
    ) {
        for hooks in &self.members {
            hooks.on_artifact_failed(kind, tool_call_id, error, elapsed);
        }
    }

    fn on_delivery_failed(&self, attachment: &Attachment, error: &ArtifactError) {
        for hooks in &self.members {
            hooks.on_delivery_failed(attachment, error);
        }
    }
}
