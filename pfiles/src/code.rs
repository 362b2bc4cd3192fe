//! Download and storage of code-execution output files.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pdispatch::{
    AppConfig, ArtifactError, ArtifactFuture, CodeOutputProcessor, CodeOutputRequest,
    FileContext, FileMetadata,
};

use crate::storage::{safe_segment, write_atomic};

/// How long downloaded outputs are advertised as available.
pub const CODE_OUTPUT_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Fetches raw file bytes from the code-execution API.
pub trait CodeApiTransport: Send + Sync {
    /// `Ok(None)` means the file no longer exists upstream.
    fn download<'a>(
        &'a self,
        url: String,
        api_key: &'a str,
    ) -> ArtifactFuture<'a, Result<Option<Vec<u8>>, ArtifactError>>;
}

#[cfg(feature = "http")]
#[derive(Debug, Clone)]
pub struct ReqwestCodeApiTransport {
    client: reqwest::Client,
}

#[cfg(feature = "http")]
impl ReqwestCodeApiTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "http")]
impl Default for ReqwestCodeApiTransport {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[cfg(feature = "http")]
impl CodeApiTransport for ReqwestCodeApiTransport {
    fn download<'a>(
        &'a self,
        url: String,
        api_key: &'a str,
    ) -> ArtifactFuture<'a, Result<Option<Vec<u8>>, ArtifactError>> {
        Box::pin(async move {
            let response = self
                .client
                .get(&url)
                .header("X-API-Key", api_key)
                .header("User-Agent", "plinth")
                .send()
                .await
                .map_err(|error| ArtifactError::code_output(error.to_string()))?;

            let status = response.status();
            if status == reqwest::StatusCode::NOT_FOUND {
                return Ok(None);
            }
            if !status.is_success() {
                return Err(ArtifactError::code_output(format!(
                    "code output download failed with status {status}"
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|error| ArtifactError::code_output(error.to_string()))?;
            Ok(Some(bytes.to_vec()))
        })
    }
}

/// Downloads `<base>/download/<session>/<file id>` and stores it under
/// `<root>/outputs/<conversation>/<file id>-<name>`.
#[derive(Clone)]
pub struct HttpCodeOutputProcessor {
    transport: Arc<dyn CodeApiTransport>,
    base_url: String,
    root: PathBuf,
}

impl HttpCodeOutputProcessor {
    pub fn new(
        transport: Arc<dyn CodeApiTransport>,
        base_url: impl Into<String>,
        root: impl AsRef<Path>,
    ) -> Self {
        Self {
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Uses `code_api_base_url` from the application config.
    pub fn from_config(
        config: &AppConfig,
        transport: Arc<dyn CodeApiTransport>,
        root: impl AsRef<Path>,
    ) -> Result<Self, ArtifactError> {
        let base_url = config
            .code_api_base_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .ok_or_else(|| ArtifactError::unavailable("code API base url is not configured"))?;
        Ok(Self::new(transport, base_url, root))
    }

    fn download_url(&self, session_id: &str, file_id: &str) -> String {
        format!(
            "{}/download/{}/{}",
            self.base_url,
            path_segment(session_id),
            path_segment(file_id)
        )
    }
}

/// Percent-encodes one URL path segment. Dot segments are encoded too so they cannot be
/// normalised away.
fn path_segment(value: &str) -> Cow<'_, str> {
    match value {
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        _ => urlencoding::encode(value),
    }
}

impl std::fmt::Debug for HttpCodeOutputProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpCodeOutputProcessor")
            .field("base_url", &self.base_url)
            .field("root", &self.root)
            .finish()
    }
}

impl CodeOutputProcessor for HttpCodeOutputProcessor {
    fn process_code_output<'a>(
        &'a self,
        request: CodeOutputRequest,
    ) -> ArtifactFuture<'a, Result<Option<FileMetadata>, ArtifactError>> {
        Box::pin(async move {
            let session_id = request
                .session_id
                .as_deref()
                .ok_or_else(|| ArtifactError::code_output("execution output has no session id"))?;
            let url = self.download_url(session_id, &request.file_id);

            let Some(bytes) = self.transport.download(url, &request.api_key).await? else {
                tracing::warn!(
                    phase = "files",
                    event = "code_output_missing",
                    file_id = %request.file_id,
                    tool_call_id = %request.tool_call_id
                );
                return Ok(None);
            };

            let relative = PathBuf::from("outputs")
                .join(safe_segment(request.conversation_id.as_str()))
                .join(safe_segment(&format!("{}-{}", request.file_id, request.file_name)));
            write_atomic(&self.root.join(&relative), &bytes)
                .await
                .map_err(|error| ArtifactError::code_output(error.to_string()))?;

            let mut file = FileMetadata::new(
                request.file_id.clone(),
                request.file_name.clone(),
                format!("/{}", relative.to_string_lossy()),
                mime_for(&request.file_name),
                FileContext::ExecuteCode,
            )
            .with_bytes(bytes.len() as u64);
            file.expires = expiry_millis();
            Ok(Some(file))
        })
    }
}

fn expiry_millis() -> Option<u64> {
    let expires = SystemTime::now().checked_add(CODE_OUTPUT_TTL)?;
    let millis = expires.duration_since(UNIX_EPOCH).ok()?.as_millis();
    u64::try_from(millis).ok()
}

fn mime_for(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "csv" => "text/csv",
        "txt" | "log" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use pcommon::{ConversationId, MessageId, UserId};
    use pdispatch::ArtifactErrorKind;

    use super::*;

    #[derive(Default)]
    struct FakeTransport {
        calls: Mutex<Vec<(String, String)>>,
        body: Option<Vec<u8>>,
    }

    impl CodeApiTransport for FakeTransport {
        fn download<'a>(
            &'a self,
            url: String,
            api_key: &'a str,
        ) -> ArtifactFuture<'a, Result<Option<Vec<u8>>, ArtifactError>> {
            Box::pin(async move {
                self.calls
                    .lock()
                    .expect("lock")
                    .push((url, api_key.to_string()));
                Ok(self.body.clone())
            })
        }
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("pfiles-{prefix}-{unique}"))
    }

    fn request(session_id: Option<&str>) -> CodeOutputRequest {
        CodeOutputRequest {
            user_id: UserId::from("user-1"),
            file_id: "file-9".to_string(),
            file_name: "Results.CSV".to_string(),
            api_key: "code-key".to_string(),
            message_id: MessageId::from("run-1"),
            tool_call_id: "call-1".to_string(),
            conversation_id: ConversationId::from("thread-1"),
            session_id: session_id.map(ToString::to_string),
        }
    }

    #[tokio::test]
    async fn downloads_with_api_key_and_stores_output() {
        let root = temp_dir("code");
        let transport = Arc::new(FakeTransport {
            body: Some(b"a,b\n1,2\n".to_vec()),
            ..FakeTransport::default()
        });
        let processor = HttpCodeOutputProcessor::new(transport.clone(), "https://code.test/api/", &root);

        let file = processor
            .process_code_output(request(Some("session-3")))
            .await
            .expect("download should succeed")
            .expect("file should exist");

        assert_eq!(
            transport.calls.lock().expect("lock").as_slice(),
            &[(
                "https://code.test/api/download/session-3/file-9".to_string(),
                "code-key".to_string()
            )]
        );
        assert_eq!(file.mime_type, "text/csv");
        assert_eq!(file.context, FileContext::ExecuteCode);
        assert_eq!(file.bytes, 8);
        assert_eq!(file.filepath, "/outputs/thread-1/file-9-Results.CSV");
        assert!(file.expires.is_some());
        assert!(root.join("outputs/thread-1/file-9-Results.CSV").exists());
    }

    #[tokio::test]
    async fn ids_are_encoded_as_single_path_segments() {
        let transport = Arc::new(FakeTransport {
            body: Some(b"x".to_vec()),
            ..FakeTransport::default()
        });
        let processor =
            HttpCodeOutputProcessor::new(transport.clone(), "https://code.test", temp_dir("code-escape"));
        let mut escaped = request(Some("../admin?x=1"));
        escaped.file_id = "a/b#c".to_string();
        let mut dotted = request(Some(".."));
        dotted.file_id = ".".to_string();

        processor
            .process_code_output(escaped)
            .await
            .expect("download should succeed");
        processor
            .process_code_output(dotted)
            .await
            .expect("download should succeed");

        let urls: Vec<String> = transport
            .calls
            .lock()
            .expect("lock")
            .iter()
            .map(|(url, _)| url.clone())
            .collect();
        assert_eq!(
            urls,
            vec![
                "https://code.test/download/..%2Fadmin%3Fx%3D1/a%2Fb%23c".to_string(),
                "https://code.test/download/%2E%2E/%2E".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn missing_upstream_file_resolves_to_none() {
        let processor = HttpCodeOutputProcessor::new(
            Arc::new(FakeTransport::default()),
            "https://code.test",
            temp_dir("code-missing"),
        );

        let file = processor
            .process_code_output(request(Some("session-3")))
            .await
            .expect("missing files are not errors");

        assert_eq!(file, None);
    }

    #[tokio::test]
    async fn outputs_without_a_session_are_rejected() {
        let processor = HttpCodeOutputProcessor::new(
            Arc::new(FakeTransport::default()),
            "https://code.test",
            temp_dir("code-session"),
        );

        let error = processor
            .process_code_output(request(None))
            .await
            .expect_err("session is required");

        assert_eq!(error.kind, ArtifactErrorKind::CodeOutput);
    }

    #[test]
    fn config_without_base_url_is_unavailable() {
        let error = HttpCodeOutputProcessor::from_config(
            &AppConfig::default(),
            Arc::new(FakeTransport::default()),
            "/tmp",
        )
        .expect_err("base url is required");

        assert_eq!(error.kind, ArtifactErrorKind::Unavailable);
    }
}
