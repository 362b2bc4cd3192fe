//! Server-sent event frames written to the browser.
//!
//! ```rust
//! use pstream::StreamFrame;
//! use serde_json::json;
//!
//! let frame = StreamFrame::event("on_message_delta", json!({"id": "step-1"}));
//! let encoded = frame.encode().expect("frame should encode");
//! assert!(encoded.starts_with("event: message\ndata: "));
//! assert!(encoded.ends_with("\n\n"));
//! ```

use serde::Serialize;
use serde_json::{Value, json};

use crate::StreamError;

pub const MESSAGE_EVENT: &str = "message";
pub const ATTACHMENT_EVENT: &str = "attachment";

/// One discrete SSE message.
///
/// `Event` wraps an orchestration event verbatim in an `{event, data}` envelope.
/// `Attachment` carries a serialized attachment record pushed out-of-band.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Event { event: String, data: Value },
    Attachment(Value),
}

impl StreamFrame {
    pub fn event(event: impl Into<String>, data: Value) -> Self {
        Self::Event {
            event: event.into(),
            data,
        }
    }

    pub fn attachment<T>(attachment: &T) -> Result<Self, StreamError>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self::Attachment(serde_json::to_value(attachment)?))
    }

    pub fn sse_event_name(&self) -> &'static str {
        match self {
            Self::Event { .. } => MESSAGE_EVENT,
            Self::Attachment(_) => ATTACHMENT_EVENT,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Event { event, data } => json!({ "event": event, "data": data }),
            Self::Attachment(value) => value.clone(),
        }
    }

    pub fn encode(&self) -> Result<String, StreamError> {
        let data = serde_json::to_string(&self.payload())?;
        Ok(format!("event: {}\ndata: {data}\n\n", self.sse_event_name()))
    }
}
