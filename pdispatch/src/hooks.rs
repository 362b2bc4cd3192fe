//! Lifecycle hooks for artifact dispatch.
//!
//! ```rust
//! use pdispatch::{DispatchHooks, NoopDispatchHooks};
//!
//! fn assert_hooks_trait(_hooks: &dyn DispatchHooks) {}
//!
//! let hooks = NoopDispatchHooks;
//! assert_hooks_trait(&hooks);
//! ```

use std::time::Duration;

use pcommon::RunMetadata;
use pstream::DeliveryPhase;

use crate::{ArtifactError, Attachment, AttachmentKind};

pub trait DispatchHooks: Send + Sync {
    fn on_artifact_enqueued(
        &self,
        _kind: AttachmentKind,
        _metadata: &RunMetadata,
        _tool_call_id: &str,
    ) {
    }

    fn on_attachment_ready(
        &self,
        _attachment: &Attachment,
        _phase: DeliveryPhase,
        _elapsed: Duration,
    ) {
    }

    fn on_artifact_failed(
        &self,
        _kind: AttachmentKind,
        _tool_call_id: &str,
        _error: &ArtifactError,
        _elapsed: Duration,
    ) {
    }

    /// The attachment was produced but its out-of-band frame could not be written. It is
    /// still returned through the pending results.
    fn on_delivery_failed(&self, _attachment: &Attachment, _error: &ArtifactError) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatchHooks;

impl DispatchHooks for NoopDispatchHooks {}
