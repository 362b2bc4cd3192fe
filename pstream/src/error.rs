//! Response stream error kinds and error value helpers.
//!
//! ```rust
//! use pstream::{StreamError, StreamErrorKind};
//!
//! let closed = StreamError::closed("client went away");
//! assert_eq!(closed.kind, StreamErrorKind::Closed);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamErrorKind {
    Serialization,
    Closed,
    Write,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    pub message: String,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Serialization, message)
    }

    pub fn closed(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Closed, message)
    }

    pub fn write(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Write, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(StreamErrorKind::Other, message)
    }
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for StreamError {}

impl From<serde_json::Error> for StreamError {
    fn from(value: serde_json::Error) -> Self {
        StreamError::serialization(value.to_string())
    }
}
