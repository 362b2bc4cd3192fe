//! Tool-end artifact classification and attachment dispatch.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use pcommon::{RunMetadata, UserId};
use pstream::ResponseChannel;
use serde_json::Value;

use crate::content::{HtmlContent, is_truthy, parse_tool_content};
use crate::types::tools;
use crate::{
    AppConfig, ArtifactError, Attachment, AttachmentKind, CitationProcessor, CitationRequest,
    CodeFile, CodeOutputProcessor, CodeOutputRequest, ContentPart, CredentialLoader,
    DispatchHooks, FileContext, ImageStore, NoopDispatchHooks, PendingResults, SaveImageRequest,
    ToolArtifact, ToolOutput,
};

const CODE_AUTH_FIELDS: &[&str] = &[tools::CODE_API_KEY];

/// Request-scoped identity and configuration passed to collaborators.
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    pub user_id: UserId,
    pub app_config: Arc<AppConfig>,
}

/// Classifies finished tool outputs and queues one attachment task per artifact found.
///
/// `dispatch` never waits for the tasks. They run on the tokio runtime, decide their own
/// delivery path when they finish, and always resolve: a failed artifact is logged and
/// becomes `None` in the pending queue. A produced attachment is always returned, even
/// when its stream frame cannot be written.
#[derive(Clone)]
pub struct ArtifactDispatcher {
    context: DispatchContext,
    channel: ResponseChannel,
    pending: Arc<PendingResults>,
    citations: Option<Arc<dyn CitationProcessor>>,
    images: Option<Arc<dyn ImageStore>>,
    credentials: Option<Arc<dyn CredentialLoader>>,
    code_outputs: Option<Arc<dyn CodeOutputProcessor>>,
    hooks: Arc<dyn DispatchHooks>,
}

impl ArtifactDispatcher {
    pub fn builder(channel: ResponseChannel, pending: Arc<PendingResults>) -> ArtifactDispatcherBuilder {
        ArtifactDispatcherBuilder::new(channel, pending)
    }

    pub fn pending(&self) -> Arc<PendingResults> {
        Arc::clone(&self.pending)
    }

    pub fn context(&self) -> &DispatchContext {
        &self.context
    }

    /// Must be called from within a tokio runtime.
    pub fn dispatch(&self, output: Option<&ToolOutput>, metadata: &RunMetadata) {
        let Some(output) = output else {
            return;
        };

        let parsed = parse_tool_content(&output.content);
        tracing::debug!(
            phase = "dispatch",
            event = "tool_end",
            tool_name = %output.name,
            tool_call_id = %output.tool_call_id,
            content_is_json = parsed.is_some(),
            has_artifact = output.artifact.is_some()
        );

        if let Some(html) = parsed.as_ref().and_then(HtmlContent::detect) {
            self.enqueue_html(output, metadata, html);
            return;
        }

        let Some(artifact) = output.artifact.as_ref() else {
            return;
        };

        if artifact.file_search.as_ref().is_some_and(is_truthy) {
            self.enqueue_citations(output, artifact, metadata);
        }

        if let Some(ui_resources) = &artifact.ui_resources {
            let mut attachment =
                Attachment::new(AttachmentKind::UiResources, metadata, &output.tool_call_id);
            if let Some(data) = &ui_resources.data {
                attachment = attachment.with_field(tools::UI_RESOURCES, data.clone());
            }
            self.enqueue_ready(attachment, metadata);
        }

        if let Some(web_search) = &artifact.web_search {
            let attachment =
                Attachment::new(AttachmentKind::WebSearch, metadata, &output.tool_call_id)
                    .with_field(tools::WEB_SEARCH, Value::Object(web_search.clone()));
            self.enqueue_ready(attachment, metadata);
        }

        if let Some(parts) = &artifact.content {
            self.enqueue_images(output, artifact, parts, metadata);
            // Inline images end classification: execution files on the same output are
            // never processed.
            return;
        }

        if output.name != tools::EXECUTE_CODE {
            return;
        }

        let Some(files) = &artifact.files else {
            return;
        };

        for file in files {
            self.enqueue_code_output(output, artifact, file, metadata);
        }
    }

    fn enqueue_html(&self, output: &ToolOutput, metadata: &RunMetadata, html: HtmlContent) {
        let mut attachment =
            Attachment::new(AttachmentKind::HtmlContent, metadata, &output.tool_call_id);
        if let Some(markup) = html.html {
            attachment = attachment.with_field("html", markup);
        }
        if let Some(domain) = html.domain {
            attachment = attachment.with_field("domain", domain);
        }

        tracing::debug!(
            phase = "dispatch",
            event = "html_content_detected",
            tool_call_id = %output.tool_call_id,
            delivery_phase = ?self.channel.phase()
        );
        self.enqueue_ready(attachment, metadata);
    }

    fn enqueue_ready(&self, attachment: Attachment, metadata: &RunMetadata) {
        let kind = attachment.kind;
        let tool_call_id = attachment.tool_call_id.clone();
        self.enqueue(kind, metadata, &tool_call_id, async move { Ok(Some(attachment)) });
    }

    fn enqueue_citations(&self, output: &ToolOutput, artifact: &ToolArtifact, metadata: &RunMetadata) {
        let processor = self.citations.clone();
        let request = CitationRequest {
            user_id: self.context.user_id.clone(),
            metadata: metadata.clone(),
            app_config: Arc::clone(&self.context.app_config),
            artifact: artifact.clone(),
            tool_call_id: output.tool_call_id.clone(),
        };

        self.enqueue(
            AttachmentKind::FileSearch,
            metadata,
            &output.tool_call_id,
            async move {
                let processor = processor
                    .ok_or_else(|| ArtifactError::unavailable("no citation processor configured"))?;
                processor.process_citations(request).await
            },
        );
    }

    fn enqueue_images(
        &self,
        output: &ToolOutput,
        artifact: &ToolArtifact,
        parts: &[Option<ContentPart>],
        metadata: &RunMetadata,
    ) {
        for (index, part) in parts.iter().enumerate() {
            let Some(part) = part else {
                continue;
            };
            if !part.is_image() {
                continue;
            }
            let Some(image_url) = &part.image_url else {
                tracing::warn!(
                    phase = "dispatch",
                    event = "image_part_without_url",
                    tool_call_id = %output.tool_call_id,
                    index
                );
                continue;
            };

            let store = self.images.clone();
            let url = image_url.url.clone();
            let request = SaveImageRequest {
                user_id: self.context.user_id.clone(),
                file_id: artifact.file_id_at(index),
                filename: image_filename(&output.name, &output.tool_call_id),
                endpoint: metadata.provider.clone(),
                context: FileContext::ImageGeneration,
            };
            let run = metadata.clone();
            let tool_call_id = output.tool_call_id.clone();

            self.enqueue(
                AttachmentKind::ImageGeneration,
                metadata,
                &output.tool_call_id,
                async move {
                    let store =
                        store.ok_or_else(|| ArtifactError::unavailable("no image store configured"))?;
                    let file = store.save_base64_image(url, request).await?;
                    let attachment = Attachment::from_file(
                        AttachmentKind::ImageGeneration,
                        &run,
                        tool_call_id,
                        &file,
                    )?;
                    Ok(Some(attachment))
                },
            );
        }
    }

    fn enqueue_code_output(
        &self,
        output: &ToolOutput,
        artifact: &ToolArtifact,
        file: &CodeFile,
        metadata: &RunMetadata,
    ) {
        let credentials = self.credentials.clone();
        let processor = self.code_outputs.clone();
        let user_id = self.context.user_id.clone();
        let file = file.clone();
        let session_id = artifact.session_id.clone();
        let run = metadata.clone();
        let tool_call_id = output.tool_call_id.clone();

        self.enqueue(
            AttachmentKind::CodeOutput,
            metadata,
            &output.tool_call_id,
            async move {
                let credentials = credentials
                    .ok_or_else(|| ArtifactError::unavailable("no credential loader configured"))?;
                let processor = processor.ok_or_else(|| {
                    ArtifactError::unavailable("no code output processor configured")
                })?;

                let mut values = credentials.load_auth_values(&user_id, CODE_AUTH_FIELDS).await?;
                let api_key = values.remove(tools::CODE_API_KEY).ok_or_else(|| {
                    ArtifactError::credentials(format!("{} was not resolved", tools::CODE_API_KEY))
                })?;

                let request = CodeOutputRequest {
                    user_id,
                    file_id: file.id,
                    file_name: file.name,
                    api_key,
                    message_id: run.message_id(),
                    tool_call_id: tool_call_id.clone(),
                    conversation_id: run.conversation_id(),
                    session_id,
                };

                let Some(stored) = processor.process_code_output(request).await? else {
                    return Ok(None);
                };
                let attachment =
                    Attachment::from_file(AttachmentKind::CodeOutput, &run, tool_call_id, &stored)?;
                Ok(Some(attachment))
            },
        );
    }

    fn enqueue<F>(&self, kind: AttachmentKind, metadata: &RunMetadata, tool_call_id: &str, produce: F)
    where
        F: Future<Output = Result<Option<Attachment>, ArtifactError>> + Send + 'static,
    {
        self.hooks.on_artifact_enqueued(kind, metadata, tool_call_id);

        let channel = self.channel.clone();
        let hooks = Arc::clone(&self.hooks);
        let tool_call_id = tool_call_id.to_string();

        self.pending.spawn(async move {
            let started = Instant::now();
            let attachment = match produce.await {
                Ok(Some(attachment)) => attachment,
                Ok(None) => return None,
                Err(error) => {
                    let error = error.with_tool_call_id(tool_call_id.as_str());
                    tracing::error!(
                        phase = "dispatch",
                        event = "artifact_failure",
                        artifact_kind = kind.label(),
                        tool_call_id = %tool_call_id,
                        error_kind = ?error.kind,
                        error = %error
                    );
                    hooks.on_artifact_failed(kind, &tool_call_id, &error, started.elapsed());
                    return None;
                }
            };

            // A lost stream frame does not lose the attachment: it is still persisted
            // with the message.
            match channel.deliver_attachment(&attachment) {
                Ok(phase) => hooks.on_attachment_ready(&attachment, phase, started.elapsed()),
                Err(error) => {
                    let error = ArtifactError::from(error).with_tool_call_id(tool_call_id.as_str());
                    tracing::warn!(
                        phase = "dispatch",
                        event = "attachment_write_failure",
                        artifact_kind = kind.label(),
                        tool_call_id = %tool_call_id,
                        error = %error
                    );
                    hooks.on_delivery_failed(&attachment, &error);
                }
            }
            Some(attachment)
        });
    }
}

fn image_filename(tool_name: &str, tool_call_id: &str) -> String {
    format!(
        "{tool_name}_{tool_call_id}_img_{}",
        uuid::Uuid::new_v4().simple()
    )
}

pub struct ArtifactDispatcherBuilder {
    context: DispatchContext,
    channel: ResponseChannel,
    pending: Arc<PendingResults>,
    citations: Option<Arc<dyn CitationProcessor>>,
    images: Option<Arc<dyn ImageStore>>,
    credentials: Option<Arc<dyn CredentialLoader>>,
    code_outputs: Option<Arc<dyn CodeOutputProcessor>>,
    hooks: Arc<dyn DispatchHooks>,
}

impl ArtifactDispatcherBuilder {
    pub fn new(channel: ResponseChannel, pending: Arc<PendingResults>) -> Self {
        Self {
            context: DispatchContext::default(),
            channel,
            pending,
            citations: None,
            images: None,
            credentials: None,
            code_outputs: None,
            hooks: Arc::new(NoopDispatchHooks),
        }
    }

    pub fn user(mut self, user_id: impl Into<UserId>) -> Self {
        self.context.user_id = user_id.into();
        self
    }

    pub fn app_config(mut self, app_config: Arc<AppConfig>) -> Self {
        self.context.app_config = app_config;
        self
    }

    pub fn citation_processor(mut self, processor: Arc<dyn CitationProcessor>) -> Self {
        self.citations = Some(processor);
        self
    }

    pub fn image_store(mut self, store: Arc<dyn ImageStore>) -> Self {
        self.images = Some(store);
        self
    }

    pub fn credential_loader(mut self, loader: Arc<dyn CredentialLoader>) -> Self {
        self.credentials = Some(loader);
        self
    }

    pub fn code_output_processor(mut self, processor: Arc<dyn CodeOutputProcessor>) -> Self {
        self.code_outputs = Some(processor);
        self
    }

    pub fn hooks(mut self, hooks: Arc<dyn DispatchHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn build(self) -> ArtifactDispatcher {
        ArtifactDispatcher {
            context: self.context,
            channel: self.channel,
            pending: self.pending,
            citations: self.citations,
            images: self.images,
            credentials: self.credentials,
            code_outputs: self.code_outputs,
            hooks: self.hooks,
        }
    }
}
