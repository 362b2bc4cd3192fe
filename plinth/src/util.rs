//! Convenience wiring for common deployments.

use std::path::Path;
use std::sync::Arc;

use pdispatch::{AppConfig, DispatchHooks};
use pfiles::{EnvCredentialLoader, FilesystemImageStore, PolicyCitationProcessor};
use pobserve::{
    CompositeDispatchHooks, MetricsDispatchHooks, SafeDispatchHooks, TracingDispatchHooks,
};

use crate::RequestPipelineBuilder;

/// Tracing and metrics hooks, panic-guarded.
pub fn default_hooks() -> Arc<dyn DispatchHooks> {
    Arc::new(SafeDispatchHooks::new(
        CompositeDispatchHooks::new()
            .with(Arc::new(TracingDispatchHooks))
            .with(Arc::new(MetricsDispatchHooks)),
    ))
}

/// Installs the filesystem image store, policy citations and environment credentials
/// rooted at `root`. The HTTP code-output processor is added when `config` names a code
/// API base url and the `http` feature is enabled.
pub fn local_collaborators(
    builder: RequestPipelineBuilder,
    root: impl AsRef<Path>,
    config: Arc<AppConfig>,
) -> RequestPipelineBuilder {
    let root = root.as_ref();
    let builder = builder
        .image_store(Arc::new(FilesystemImageStore::new(root)))
        .citation_processor(Arc::new(PolicyCitationProcessor::new()))
        .credential_loader(Arc::new(EnvCredentialLoader::new()));

    #[cfg(feature = "http")]
    let builder = match pfiles::HttpCodeOutputProcessor::from_config(
        &config,
        Arc::new(pfiles::ReqwestCodeApiTransport::default()),
        root,
    ) {
        Ok(processor) => builder.code_output_processor(Arc::new(processor)),
        Err(error) => {
            tracing::debug!(
                phase = "pipeline",
                event = "code_outputs_disabled",
                error = %error
            );
            builder
        }
    };

    builder.app_config(config)
}
