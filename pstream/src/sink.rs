//! Response sink contracts and in-memory/channel-backed implementations.

use std::sync::Mutex;

use tokio::sync::mpsc::UnboundedSender;

use crate::{StreamError, StreamFrame};

/// Write side of the HTTP response the browser is reading.
pub trait ResponseSink: Send + Sync {
    fn write_frame(&self, frame: &StreamFrame) -> Result<(), StreamError>;
}

/// Keeps every written frame, in write order. Used by tests and buffered replies.
#[derive(Debug, Default)]
pub struct BufferedResponseSink {
    frames: Mutex<Vec<StreamFrame>>,
}

impl BufferedResponseSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<StreamFrame> {
        self.frames
            .lock()
            .map(|frames| frames.clone())
            .unwrap_or_default()
    }

    pub fn encoded(&self) -> Result<String, StreamError> {
        let mut body = String::new();
        for frame in self.frames() {
            body.push_str(&frame.encode()?);
        }
        Ok(body)
    }

    pub fn len(&self) -> usize {
        self.frames.lock().map(|frames| frames.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ResponseSink for BufferedResponseSink {
    fn write_frame(&self, frame: &StreamFrame) -> Result<(), StreamError> {
        self.frames
            .lock()
            .map_err(|_| StreamError::other("buffered sink lock poisoned"))?
            .push(frame.clone());
        Ok(())
    }
}

/// Forwards encoded frames to whatever task owns the HTTP body.
#[derive(Debug, Clone)]
pub struct ChannelResponseSink {
    sender: UnboundedSender<String>,
}

impl ChannelResponseSink {
    pub fn new(sender: UnboundedSender<String>) -> Self {
        Self { sender }
    }
}

impl ResponseSink for ChannelResponseSink {
    fn write_frame(&self, frame: &StreamFrame) -> Result<(), StreamError> {
        let encoded = frame.encode()?;
        self.sender
            .send(encoded)
            .map_err(|_| StreamError::closed("response body receiver dropped"))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tokio::sync::mpsc;

    use super::*;
    use crate::StreamErrorKind;

    #[test]
    fn buffered_sink_keeps_write_order() {
        let sink = BufferedResponseSink::new();
        sink.write_frame(&StreamFrame::event("a", json!(1)))
            .expect("write should succeed");
        sink.write_frame(&StreamFrame::Attachment(json!({"type": "html_content"})))
            .expect("write should succeed");

        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].sse_event_name(), "message");
        assert_eq!(frames[1].sse_event_name(), "attachment");
        assert!(sink.encoded().expect("encode").contains("event: attachment"));
    }

    #[tokio::test]
    async fn channel_sink_reports_closed_receiver() {
        let (sender, mut receiver) = mpsc::unbounded_channel();
        let sink = ChannelResponseSink::new(sender);

        sink.write_frame(&StreamFrame::event("on_run_step", json!({})))
            .expect("write should succeed");
        let received = receiver.recv().await.expect("frame should arrive");
        assert!(received.starts_with("event: message"));

        drop(receiver);
        let error = sink
            .write_frame(&StreamFrame::event("on_run_step", json!({})))
            .expect_err("closed receiver should fail");
        assert_eq!(error.kind, StreamErrorKind::Closed);
    }
}
