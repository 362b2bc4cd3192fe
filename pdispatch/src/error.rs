//! Artifact processing errors and classifications.

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactErrorKind {
    Citation,
    ImagePersistence,
    Credentials,
    CodeOutput,
    Delivery,
    Unavailable,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactError {
    pub kind: ArtifactErrorKind,
    pub message: String,
    pub tool_name: Option<String>,
    pub tool_call_id: Option<String>,
}

impl ArtifactError {
    pub fn new(kind: ArtifactErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            tool_name: None,
            tool_call_id: None,
        }
    }

    pub fn citation(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::Citation, message)
    }

    pub fn image_persistence(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::ImagePersistence, message)
    }

    pub fn credentials(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::Credentials, message)
    }

    pub fn code_output(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::CodeOutput, message)
    }

    pub fn delivery(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::Delivery, message)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::Unavailable, message)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ArtifactErrorKind::Other, message)
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }

    pub fn with_tool_call_id(mut self, tool_call_id: impl Into<String>) -> Self {
        self.tool_call_id = Some(tool_call_id.into());
        self
    }
}

impl Display for ArtifactError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (&self.tool_name, &self.tool_call_id) {
            (Some(tool_name), Some(tool_call_id)) => write!(
                f,
                "{:?} [tool={}, call_id={}]: {}",
                self.kind, tool_name, tool_call_id, self.message
            ),
            (None, Some(tool_call_id)) => {
                write!(f, "{:?} [call_id={}]: {}", self.kind, tool_call_id, self.message)
            }
            _ => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ArtifactError {}

impl From<pstream::StreamError> for ArtifactError {
    fn from(value: pstream::StreamError) -> Self {
        ArtifactError::delivery(value.to_string())
    }
}

impl From<serde_json::Error> for ArtifactError {
    fn from(value: serde_json::Error) -> Self {
        ArtifactError::other(format!("attachment serialization failed: {value}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_fields_are_included_in_display() {
        let error = ArtifactError::image_persistence("disk full")
            .with_tool_name("dalle")
            .with_tool_call_id("call_1");

        let rendered = error.to_string();
        assert!(rendered.contains("dalle"));
        assert!(rendered.contains("call_1"));
        assert!(rendered.contains("disk full"));
    }

    #[test]
    fn stream_errors_become_delivery_errors() {
        let error: ArtifactError = pstream::StreamError::closed("gone").into();
        assert_eq!(error.kind, ArtifactErrorKind::Delivery);
    }
}
