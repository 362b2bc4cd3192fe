//! Two-phase response delivery.
//!
//! A reply starts in [`DeliveryPhase::Buffering`]: nothing has reached the client, so
//! finished attachments ride along with the final response. The first frame written to
//! the sink flips the channel to [`DeliveryPhase::Streaming`]; from then on attachments
//! are pushed as discrete `attachment` frames. The transition happens once and never
//! reverses.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use pstream::{BufferedResponseSink, DeliveryPhase, ResponseChannel, StreamFrame};
//! use serde_json::json;
//!
//! let sink = Arc::new(BufferedResponseSink::new());
//! let channel = ResponseChannel::new(sink.clone());
//! assert_eq!(channel.phase(), DeliveryPhase::Buffering);
//!
//! channel.send(StreamFrame::event("on_run_step", json!({}))).expect("send");
//! assert_eq!(channel.phase(), DeliveryPhase::Streaming);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::{ResponseSink, StreamError, StreamFrame};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryPhase {
    Buffering,
    Streaming,
}

#[derive(Clone)]
pub struct ResponseChannel {
    sink: Arc<dyn ResponseSink>,
    streaming: Arc<AtomicBool>,
}

impl ResponseChannel {
    pub fn new(sink: Arc<dyn ResponseSink>) -> Self {
        Self {
            sink,
            streaming: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn phase(&self) -> DeliveryPhase {
        if self.streaming.load(Ordering::Acquire) {
            DeliveryPhase::Streaming
        } else {
            DeliveryPhase::Buffering
        }
    }

    /// Returns `true` only for the call that performed the transition.
    pub fn begin_streaming(&self) -> bool {
        let transitioned = !self.streaming.swap(true, Ordering::AcqRel);
        if transitioned {
            tracing::debug!(phase = "stream", event = "begin_streaming");
        }
        transitioned
    }

    pub fn send(&self, frame: StreamFrame) -> Result<(), StreamError> {
        self.begin_streaming();
        self.sink.write_frame(&frame)
    }

    /// Decides the delivery path for one finished attachment at call time.
    ///
    /// While buffering nothing is written and the caller keeps the record for the main
    /// response. While streaming the record is written as an `attachment` frame.
    pub fn deliver_attachment<T>(&self, attachment: &T) -> Result<DeliveryPhase, StreamError>
    where
        T: Serialize + ?Sized,
    {
        match self.phase() {
            DeliveryPhase::Buffering => Ok(DeliveryPhase::Buffering),
            DeliveryPhase::Streaming => {
                let frame = StreamFrame::attachment(attachment)?;
                self.sink.write_frame(&frame)?;
                Ok(DeliveryPhase::Streaming)
            }
        }
    }
}

impl std::fmt::Debug for ResponseChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseChannel")
            .field("phase", &self.phase())
            .finish()
    }
}
