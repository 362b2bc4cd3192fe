//! Tool output, artifact, file, and attachment record types.

use pcommon::{ConversationId, MessageId, RunMetadata};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Tool and artifact key names shared with the orchestration engine and the browser.
pub mod tools {
    pub const HTML_CONTENT: &str = "html_content";
    pub const FILE_SEARCH: &str = "file_search";
    pub const UI_RESOURCES: &str = "ui_resources";
    pub const WEB_SEARCH: &str = "web_search";
    pub const EXECUTE_CODE: &str = "execute_code";
    pub const IMAGE_URL: &str = "image_url";
    pub const HTML_CONTENT_MARKER: &str = "__html_content";
    pub const CODE_API_KEY: &str = "CODE_API_KEY";
}

/// A field that does not have the expected shape reads as absent.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

fn lenient_or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    Ok(lenient(deserializer)?.unwrap_or_default())
}

/// Malformed elements become `None` and keep their position.
fn lenient_slots<'de, D, T>(deserializer: D) -> Result<Option<Vec<Option<T>>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };
    Ok(Some(
        items
            .into_iter()
            .map(|item| serde_json::from_value(item).ok())
            .collect(),
    ))
}

/// Malformed elements are dropped.
fn lenient_items<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(lenient_slots(deserializer)?.map(|items| items.into_iter().flatten().collect()))
}

/// Result of one tool invocation, as emitted by the orchestration engine.
///
/// Deserialization never fails on the shape of a single field: a malformed artifact
/// section reads as absent so the remaining sections are still dispatched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Plain text, a JSON-encoded string, or structured content.
    #[serde(default)]
    pub content: Value,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub artifact: Option<ToolArtifact>,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub tool_call_id: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub name: String,
}

impl ToolOutput {
    pub fn new(name: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tool_call_id: tool_call_id.into(),
            ..Self::default()
        }
    }

    pub fn with_content(mut self, content: impl Into<Value>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_artifact(mut self, artifact: ToolArtifact) -> Self {
        self.artifact = Some(artifact);
        self
    }
}

/// Structured side-output keyed by artifact kind. Keys this crate does not know survive
/// in `extra` so citation processors can still read them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToolArtifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_search: Option<Value>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub ui_resources: Option<UiResources>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub web_search: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "lenient_slots", skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<Option<ContentPart>>>,
    #[serde(default, deserialize_with = "lenient_items", skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<CodeFile>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    /// Positionally aligned with `content`.
    #[serde(default, deserialize_with = "lenient_slots", skip_serializing_if = "Option::is_none")]
    pub file_ids: Option<Vec<Option<String>>>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ToolArtifact {
    pub fn file_id_at(&self, index: usize) -> Option<String> {
        self.file_ids
            .as_ref()
            .and_then(|ids| ids.get(index).cloned().flatten())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct UiResources {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub image_url: Option<ImageUrl>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    pub fn image(url: impl Into<String>) -> Self {
        Self {
            kind: tools::IMAGE_URL.to_string(),
            image_url: Some(ImageUrl { url: url.into() }),
            extra: Map::new(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        let mut extra = Map::new();
        extra.insert("text".to_string(), Value::String(text.into()));
        Self {
            kind: "text".to_string(),
            image_url: None,
            extra,
        }
    }

    pub fn is_image(&self) -> bool {
        self.kind == tools::IMAGE_URL
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageUrl {
    pub url: String,
}

/// File produced by a code-execution session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeFile {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileContext {
    ImageGeneration,
    ExecuteCode,
}

impl FileContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ImageGeneration => "image_generation",
            Self::ExecuteCode => "execute_code",
        }
    }
}

/// Stored-file record returned by image and code-output persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_id: String,
    pub filename: String,
    pub filepath: String,
    /// MIME type.
    #[serde(rename = "type")]
    pub mime_type: String,
    #[serde(default)]
    pub bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    pub context: FileContext,
    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<u64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FileMetadata {
    pub fn new(
        file_id: impl Into<String>,
        filename: impl Into<String>,
        filepath: impl Into<String>,
        mime_type: impl Into<String>,
        context: FileContext,
    ) -> Self {
        Self {
            file_id: file_id.into(),
            filename: filename.into(),
            filepath: filepath.into(),
            mime_type: mime_type.into(),
            bytes: 0,
            width: None,
            height: None,
            context,
            expires: None,
            extra: Map::new(),
        }
    }

    pub fn with_bytes(mut self, bytes: u64) -> Self {
        self.bytes = bytes;
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttachmentKind {
    HtmlContent,
    FileSearch,
    UiResources,
    WebSearch,
    ImageGeneration,
    CodeOutput,
}

impl AttachmentKind {
    /// Value of the `type` field for kinds that carry one. File attachments keep the
    /// stored file's MIME type there instead.
    pub fn wire_type(&self) -> Option<&'static str> {
        match self {
            Self::HtmlContent => Some(tools::HTML_CONTENT),
            Self::FileSearch => Some(tools::FILE_SEARCH),
            Self::UiResources => Some(tools::UI_RESOURCES),
            Self::WebSearch => Some(tools::WEB_SEARCH),
            Self::ImageGeneration | Self::CodeOutput => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HtmlContent => "html_content",
            Self::FileSearch => "file_search",
            Self::UiResources => "ui_resources",
            Self::WebSearch => "web_search",
            Self::ImageGeneration => "image_generation",
            Self::CodeOutput => "code_output",
        }
    }
}

const ID_KEYS: [&str; 3] = ["messageId", "toolCallId", "conversationId"];

/// Normalized attachment record sent to the browser.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip)]
    pub kind: AttachmentKind,
    pub message_id: MessageId,
    pub tool_call_id: String,
    pub conversation_id: ConversationId,
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Attachment {
    pub fn new(kind: AttachmentKind, metadata: &RunMetadata, tool_call_id: impl Into<String>) -> Self {
        let mut payload = Map::new();
        if let Some(wire_type) = kind.wire_type() {
            payload.insert("type".to_string(), Value::String(wire_type.to_string()));
        }

        Self {
            kind,
            message_id: metadata.message_id(),
            tool_call_id: tool_call_id.into(),
            conversation_id: metadata.conversation_id(),
            payload,
        }
    }

    /// Merges the identifiers into a stored-file record. The identifiers win over any
    /// same-named keys the record carries.
    pub fn from_file(
        kind: AttachmentKind,
        metadata: &RunMetadata,
        tool_call_id: impl Into<String>,
        file: &FileMetadata,
    ) -> Result<Self, serde_json::Error> {
        let mut payload = match serde_json::to_value(file)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        for key in ID_KEYS {
            payload.remove(key);
        }

        Ok(Self {
            kind,
            message_id: metadata.message_id(),
            tool_call_id: tool_call_id.into(),
            conversation_id: metadata.conversation_id(),
            payload,
        })
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key.into(), value.into());
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }

    pub fn is_html(&self) -> bool {
        self.kind == AttachmentKind::HtmlContent
    }
}

/// Keeps only the attachments the browser renders as inline HTML frames.
pub fn html_attachments(attachments: &[Attachment]) -> Vec<&Attachment> {
    attachments.iter().filter(|item| item.is_html()).collect()
}
