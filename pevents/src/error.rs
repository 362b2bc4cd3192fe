//! Handler-table construction and handling errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventErrorKind {
    MissingOption,
    Delivery,
    Graph,
    Payload,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventError {
    pub kind: EventErrorKind,
    pub message: String,
}

impl EventError {
    pub fn new(kind: EventErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn missing_option(message: impl Into<String>) -> Self {
        Self::new(EventErrorKind::MissingOption, message)
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(EventErrorKind::Delivery, message)
    }

    pub fn graph(message: impl Into<String>) -> Self {
        Self::new(EventErrorKind::Graph, message)
    }

    pub fn payload(message: impl Into<String>) -> Self {
        Self::new(EventErrorKind::Payload, message)
    }
}

impl Display for EventError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for EventError {}

impl From<pstream::StreamError> for EventError {
    fn from(value: pstream::StreamError) -> Self {
        EventError::delivery(value.to_string())
    }
}

impl From<serde_json::Error> for EventError {
    fn from(value: serde_json::Error) -> Self {
        EventError::payload(value.to_string())
    }
}
