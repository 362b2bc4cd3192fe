use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pcommon::{RunMetadata, UserId};
use pdispatch::prelude::*;
use pdispatch::{
    ArtifactFuture, CitationProcessor, CitationRequest, CodeFile, CodeOutputProcessor,
    CodeOutputRequest, ContentPart, CredentialLoader, FileContext, FileMetadata, ImageStore,
    SaveImageRequest, UiResources,
};
use pstream::{
    BufferedResponseSink, ChannelResponseSink, DeliveryPhase, ResponseChannel, StreamFrame,
};
use serde_json::{Map, json};
use tokio::sync::mpsc;

#[derive(Debug, Default)]
struct RecordingImageStore {
    requests: Mutex<Vec<SaveImageRequest>>,
}

impl ImageStore for RecordingImageStore {
    fn save_base64_image<'a>(
        &'a self,
        url: String,
        request: SaveImageRequest,
    ) -> ArtifactFuture<'a, Result<FileMetadata, ArtifactError>> {
        Box::pin(async move {
            if !url.starts_with("data:") {
                return Err(ArtifactError::image_persistence("not a data url"));
            }
            let file_id = request.file_id.clone().unwrap_or_else(|| "generated".to_string());
            let file = FileMetadata::new(
                file_id,
                format!("{}.png", request.filename),
                format!("/images/{}.png", request.filename),
                "image/png",
                FileContext::ImageGeneration,
            );
            self.requests.lock().expect("lock").push(request);
            Ok(file)
        })
    }
}

#[derive(Debug)]
struct StaticCredentials;

impl CredentialLoader for StaticCredentials {
    fn load_auth_values<'a>(
        &'a self,
        _user_id: &'a UserId,
        fields: &'a [&'a str],
    ) -> ArtifactFuture<'a, Result<HashMap<String, String>, ArtifactError>> {
        Box::pin(async move {
            Ok(fields
                .iter()
                .map(|field| (field.to_string(), "code-key".to_string()))
                .collect())
        })
    }
}

#[derive(Debug, Default)]
struct RecordingCodeOutputs {
    requests: Mutex<Vec<CodeOutputRequest>>,
}

impl CodeOutputProcessor for RecordingCodeOutputs {
    fn process_code_output<'a>(
        &'a self,
        request: CodeOutputRequest,
    ) -> ArtifactFuture<'a, Result<Option<FileMetadata>, ArtifactError>> {
        Box::pin(async move {
            let file = if request.file_name.ends_with(".skip") {
                None
            } else {
                Some(FileMetadata::new(
                    request.file_id.clone(),
                    request.file_name.clone(),
                    format!("/outputs/{}", request.file_name),
                    "text/csv",
                    FileContext::ExecuteCode,
                ))
            };
            self.requests.lock().expect("lock").push(request);
            Ok(file)
        })
    }
}

#[derive(Debug)]
struct EchoCitations;

impl CitationProcessor for EchoCitations {
    fn process_citations<'a>(
        &'a self,
        request: CitationRequest,
    ) -> ArtifactFuture<'a, Result<Option<Attachment>, ArtifactError>> {
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            let sources = request
                .artifact
                .file_search
                .and_then(|search| search.get("sources").cloned())
                .unwrap_or_else(|| json!([]));
            Ok(Some(
                Attachment::new(AttachmentKind::FileSearch, &request.metadata, request.tool_call_id)
                    .with_field("sources", sources),
            ))
        })
    }
}

#[derive(Debug, Default)]
struct RecordingHooks {
    enqueued: Mutex<Vec<AttachmentKind>>,
    ready: Mutex<Vec<(AttachmentKind, DeliveryPhase)>>,
    failed: Mutex<Vec<(AttachmentKind, ArtifactErrorKind)>>,
    undelivered: Mutex<Vec<(AttachmentKind, ArtifactErrorKind)>>,
}

impl DispatchHooks for RecordingHooks {
    fn on_artifact_enqueued(&self, kind: AttachmentKind, _metadata: &RunMetadata, _id: &str) {
        self.enqueued.lock().expect("lock").push(kind);
    }

    fn on_attachment_ready(&self, attachment: &Attachment, phase: DeliveryPhase, _elapsed: Duration) {
        self.ready.lock().expect("lock").push((attachment.kind, phase));
    }

    fn on_artifact_failed(
        &self,
        kind: AttachmentKind,
        _tool_call_id: &str,
        error: &ArtifactError,
        _elapsed: Duration,
    ) {
        self.failed.lock().expect("lock").push((kind, error.kind));
    }

    fn on_delivery_failed(&self, attachment: &Attachment, error: &ArtifactError) {
        self.undelivered
            .lock()
            .expect("lock")
            .push((attachment.kind, error.kind));
    }
}

struct Harness {
    sink: Arc<BufferedResponseSink>,
    channel: ResponseChannel,
    pending: Arc<PendingResults>,
    images: Arc<RecordingImageStore>,
    code_outputs: Arc<RecordingCodeOutputs>,
    hooks: Arc<RecordingHooks>,
    dispatcher: ArtifactDispatcher,
}

fn harness() -> Harness {
    let sink = Arc::new(BufferedResponseSink::new());
    let channel = ResponseChannel::new(sink.clone());
    let pending = Arc::new(PendingResults::new());
    let images = Arc::new(RecordingImageStore::default());
    let code_outputs = Arc::new(RecordingCodeOutputs::default());
    let hooks = Arc::new(RecordingHooks::default());

    let dispatcher = ArtifactDispatcher::builder(channel.clone(), pending.clone())
        .user("user-1")
        .citation_processor(Arc::new(EchoCitations))
        .image_store(images.clone())
        .credential_loader(Arc::new(StaticCredentials))
        .code_output_processor(code_outputs.clone())
        .hooks(hooks.clone())
        .build();

    Harness {
        sink,
        channel,
        pending,
        images,
        code_outputs,
        hooks,
        dispatcher,
    }
}

fn metadata() -> RunMetadata {
    RunMetadata::new("run-1", "thread-1").with_provider("openai")
}

fn web_search_artifact() -> ToolArtifact {
    let mut web_search = Map::new();
    web_search.insert("turn".to_string(), json!(0));
    ToolArtifact {
        web_search: Some(web_search),
        ..ToolArtifact::default()
    }
}

#[tokio::test]
async fn missing_output_enqueues_nothing() {
    let harness = harness();

    harness.dispatcher.dispatch(None, &metadata());

    assert!(harness.pending.is_empty());
    assert!(harness.pending.drain().await.is_empty());
}

#[tokio::test]
async fn html_content_short_circuits_artifact_processing() {
    let harness = harness();
    let output = ToolOutput::new("render_page", "call-1")
        .with_content(json!({"__html_content": true, "html": "<p>x</p>", "domain": "a.test"}).to_string())
        .with_artifact(web_search_artifact());

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 1);
    let attachment = &attachments[0];
    assert!(attachment.is_html());
    assert_eq!(attachment.field("type"), Some(&json!("html_content")));
    assert_eq!(attachment.field("html"), Some(&json!("<p>x</p>")));
    assert_eq!(attachment.field("domain"), Some(&json!("a.test")));
    assert_eq!(attachment.message_id.as_str(), "run-1");
    assert_eq!(attachment.conversation_id.as_str(), "thread-1");
}

#[tokio::test]
async fn plain_text_content_without_artifact_produces_nothing() {
    let harness = harness();
    let output = ToolOutput::new("calculator", "call-1").with_content("42 is the answer");

    harness.dispatcher.dispatch(Some(&output), &metadata());

    assert!(harness.pending.is_empty());
}

#[tokio::test]
async fn independent_artifact_kinds_each_produce_one_attachment() {
    let harness = harness();
    let mut artifact = web_search_artifact();
    artifact.file_search = Some(json!({"sources": [{"fileId": "f-1"}]}));
    artifact.ui_resources = Some(UiResources {
        data: Some(json!([{"uri": "ui://widget"}])),
        extra: Map::new(),
    });
    let output = ToolOutput::new("file_search", "call-7").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());
    assert_eq!(harness.pending.len(), 3);

    let attachments = harness.pending.drain().await;
    let mut kinds: Vec<_> = attachments.iter().map(|item| item.kind.label()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["file_search", "ui_resources", "web_search"]);

    let web = attachments
        .iter()
        .find(|item| item.kind == AttachmentKind::WebSearch)
        .expect("web search attachment");
    assert_eq!(web.field("web_search"), Some(&json!({"turn": 0})));

    let ui = attachments
        .iter()
        .find(|item| item.kind == AttachmentKind::UiResources)
        .expect("ui attachment");
    assert_eq!(ui.field("ui_resources"), Some(&json!([{"uri": "ui://widget"}])));
}

#[tokio::test]
async fn buffered_replies_keep_attachments_off_the_wire() {
    let harness = harness();
    let output = ToolOutput::new("web", "call-2").with_artifact(web_search_artifact());

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 1);
    assert!(harness.sink.is_empty());
    assert_eq!(
        harness.hooks.ready.lock().expect("lock").as_slice(),
        &[(AttachmentKind::WebSearch, DeliveryPhase::Buffering)]
    );
}

#[tokio::test]
async fn streaming_replies_write_attachment_frames() {
    let harness = harness();
    harness.channel.begin_streaming();
    let output = ToolOutput::new("web", "call-3").with_artifact(web_search_artifact());

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 1);
    let frames = harness.sink.frames();
    assert_eq!(frames.len(), 1);
    match &frames[0] {
        StreamFrame::Attachment(payload) => {
            assert_eq!(payload["type"], json!("web_search"));
            assert_eq!(payload["toolCallId"], json!("call-3"));
            assert_eq!(payload["messageId"], json!("run-1"));
        }
        other => panic!("expected attachment frame, got {other:?}"),
    }
}

#[tokio::test]
async fn inline_images_use_positional_file_ids_and_skip_code_files() {
    let harness = harness();
    let artifact = ToolArtifact {
        content: Some(vec![
            Some(ContentPart::text("caption")),
            Some(ContentPart::image("data:image/png;base64,AAAA")),
            None,
            Some(ContentPart::image("data:image/png;base64,BBBB")),
        ]),
        file_ids: Some(vec![None, Some("file-a".to_string()), None]),
        files: Some(vec![CodeFile {
            id: "code-1".to_string(),
            name: "out.csv".to_string(),
        }]),
        session_id: Some("session-1".to_string()),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new(pdispatch::tools::EXECUTE_CODE, "call-4").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 2);
    assert!(attachments.iter().all(|item| item.kind == AttachmentKind::ImageGeneration));
    assert!(harness.code_outputs.requests.lock().expect("lock").is_empty());

    let requests = harness.images.requests.lock().expect("lock").clone();
    let mut file_ids: Vec<_> = requests.iter().map(|item| item.file_id.clone()).collect();
    file_ids.sort();
    assert_eq!(file_ids, vec![None, Some("file-a".to_string())]);
    for request in &requests {
        assert!(request.filename.starts_with("execute_code_call-4_img_"));
        assert_eq!(request.endpoint.as_deref(), Some("openai"));
        assert_eq!(request.context, FileContext::ImageGeneration);
        assert_eq!(request.user_id.as_str(), "user-1");
    }
    assert_ne!(requests[0].filename, requests[1].filename);
}

#[tokio::test]
async fn execution_files_resolve_credentials_and_drop_missing_outputs() {
    let harness = harness();
    let artifact = ToolArtifact {
        files: Some(vec![
            CodeFile {
                id: "code-1".to_string(),
                name: "result.csv".to_string(),
            },
            CodeFile {
                id: "code-2".to_string(),
                name: "scratch.skip".to_string(),
            },
        ]),
        session_id: Some("session-9".to_string()),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new(pdispatch::tools::EXECUTE_CODE, "call-5").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].kind, AttachmentKind::CodeOutput);
    assert_eq!(attachments[0].field("filename"), Some(&json!("result.csv")));
    assert_eq!(attachments[0].field("type"), Some(&json!("text/csv")));

    let requests = harness.code_outputs.requests.lock().expect("lock").clone();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.api_key, "code-key");
        assert_eq!(request.session_id.as_deref(), Some("session-9"));
        assert_eq!(request.message_id.as_str(), "run-1");
        assert_eq!(request.conversation_id.as_str(), "thread-1");
        assert_eq!(request.tool_call_id, "call-5");
    }
}

#[tokio::test]
async fn execution_files_from_other_tools_are_ignored() {
    let harness = harness();
    let artifact = ToolArtifact {
        files: Some(vec![CodeFile {
            id: "code-1".to_string(),
            name: "result.csv".to_string(),
        }]),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new("file_browser", "call-6").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());

    assert!(harness.pending.is_empty());
}

#[tokio::test]
async fn failed_artifact_resolves_to_nothing_without_affecting_siblings() {
    let harness = harness();
    let mut artifact = web_search_artifact();
    artifact.content = Some(vec![Some(ContentPart::image("https://not-inline.test/a.png"))]);
    let output = ToolOutput::new("image_gen", "call-8").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].kind, AttachmentKind::WebSearch);
    assert_eq!(
        harness.hooks.failed.lock().expect("lock").as_slice(),
        &[(AttachmentKind::ImageGeneration, ArtifactErrorKind::ImagePersistence)]
    );
    assert_eq!(harness.hooks.enqueued.lock().expect("lock").len(), 2);
}

#[tokio::test]
async fn one_failed_image_part_keeps_sibling_images() {
    let harness = harness();
    let artifact = ToolArtifact {
        content: Some(vec![
            Some(ContentPart::image("data:image/png;base64,AAAA")),
            Some(ContentPart::image("https://not-inline.test/b.png")),
            Some(ContentPart::image("data:image/png;base64,BBBB")),
        ]),
        file_ids: Some(vec![
            Some("img-1".to_string()),
            Some("img-2".to_string()),
            Some("img-3".to_string()),
        ]),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new("image_gen", "call-11").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    assert_eq!(attachments.len(), 2);
    assert!(
        attachments
            .iter()
            .all(|item| item.kind == AttachmentKind::ImageGeneration)
    );
    let mut file_ids: Vec<_> = attachments
        .iter()
        .filter_map(|item| item.field("file_id").and_then(|id| id.as_str()))
        .collect();
    file_ids.sort();
    assert_eq!(file_ids, vec!["img-1", "img-3"]);
    assert_eq!(
        harness.hooks.failed.lock().expect("lock").as_slice(),
        &[(AttachmentKind::ImageGeneration, ArtifactErrorKind::ImagePersistence)]
    );
    assert_eq!(harness.images.requests.lock().expect("lock").len(), 2);
}

#[tokio::test]
async fn closed_stream_still_returns_the_attachment() {
    let (sender, receiver) = mpsc::unbounded_channel();
    drop(receiver);
    let channel = ResponseChannel::new(Arc::new(ChannelResponseSink::new(sender)));
    let pending = Arc::new(PendingResults::new());
    let hooks = Arc::new(RecordingHooks::default());
    let dispatcher = ArtifactDispatcher::builder(channel.clone(), pending.clone())
        .hooks(hooks.clone())
        .build();
    channel.begin_streaming();
    let output = ToolOutput::new("web", "call-12").with_artifact(web_search_artifact());

    dispatcher.dispatch(Some(&output), &metadata());
    let attachments = pending.drain().await;

    assert_eq!(attachments.len(), 1);
    assert_eq!(attachments[0].kind, AttachmentKind::WebSearch);
    assert_eq!(attachments[0].tool_call_id, "call-12");
    assert!(hooks.failed.lock().expect("lock").is_empty());
    assert!(hooks.ready.lock().expect("lock").is_empty());
    assert_eq!(
        hooks.undelivered.lock().expect("lock").as_slice(),
        &[(AttachmentKind::WebSearch, ArtifactErrorKind::Delivery)]
    );
}

#[tokio::test]
async fn malformed_sections_only_skip_their_own_kind() {
    let harness = harness();
    let output: ToolOutput = serde_json::from_value(json!({
        "name": "execute_code",
        "tool_call_id": "call-13",
        "content": "ran",
        "artifact": {
            "web_search": {"turn": 1},
            "ui_resources": "not an object",
            "session_id": "session-2",
            "files": [{"id": "broken"}, {"id": "f-9", "name": "table.csv"}]
        }
    }))
    .expect("output should parse");

    harness.dispatcher.dispatch(Some(&output), &metadata());
    let attachments = harness.pending.drain().await;

    let mut kinds: Vec<_> = attachments.iter().map(|item| item.kind.label()).collect();
    kinds.sort();
    assert_eq!(kinds, vec!["code_output", "web_search"]);
    let requests = harness.code_outputs.requests.lock().expect("lock");
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].file_id, "f-9");
    assert!(harness.hooks.failed.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn missing_collaborators_are_reported_as_unavailable() {
    let sink = Arc::new(BufferedResponseSink::new());
    let pending = Arc::new(PendingResults::new());
    let hooks = Arc::new(RecordingHooks::default());
    let dispatcher = ArtifactDispatcher::builder(ResponseChannel::new(sink), pending.clone())
        .hooks(hooks.clone())
        .build();
    let artifact = ToolArtifact {
        file_search: Some(json!({"sources": []})),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new("file_search", "call-9").with_artifact(artifact);

    dispatcher.dispatch(Some(&output), &metadata());

    assert!(pending.drain().await.is_empty());
    assert_eq!(
        hooks.failed.lock().expect("lock").as_slice(),
        &[(AttachmentKind::FileSearch, ArtifactErrorKind::Unavailable)]
    );
}

#[tokio::test]
async fn falsy_file_search_sections_are_not_cited() {
    let harness = harness();
    let artifact = ToolArtifact {
        file_search: Some(json!(false)),
        ..ToolArtifact::default()
    };
    let output = ToolOutput::new("file_search", "call-10").with_artifact(artifact);

    harness.dispatcher.dispatch(Some(&output), &metadata());

    assert!(harness.pending.is_empty());
}
