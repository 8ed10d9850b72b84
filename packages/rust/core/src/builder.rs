//! Per-artifact build: assemble → transform → template → render.
//!
//! [`ArtifactBuilder::build`] never returns an error. Everything that can go
//! wrong for one artifact ends up in its [`ArtifactOutcome`], so the batch
//! keeps going.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};

use mdpress_artifacts::DocumentTemplate;
use mdpress_render::{PdfRenderer, RenderOutcome, RetryPolicy, render_with_retry};
use mdpress_shared::{
    ArtifactDescriptor, ArtifactFailure, ArtifactOutcome, ArtifactStatus, MdpressError,
    MissingFragmentPolicy,
};

use crate::assembler::assemble;
use crate::fragments::FragmentStore;

/// Where a build was when it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    Assembling,
    Transforming,
    Templating,
    Rendering,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Assembling => "assembling",
            Self::Transforming => "transforming",
            Self::Templating => "templating",
            Self::Rendering => "rendering",
        };
        f.write_str(name)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {source}")]
struct StageError {
    stage: BuildStage,
    source: MdpressError,
}

fn at(stage: BuildStage) -> impl FnOnce(MdpressError) -> StageError {
    move |source| StageError { stage, source }
}

/// Facts gathered along the way, reported whatever the end state.
#[derive(Default)]
struct Progress {
    missing: Vec<String>,
    attempts: u32,
}

/// Builds single artifacts. Cheap to share across tasks behind an `Arc`.
pub struct ArtifactBuilder {
    store: FragmentStore,
    template: DocumentTemplate,
    renderer: Arc<dyn PdfRenderer>,
    retry: RetryPolicy,
    missing_policy: MissingFragmentPolicy,
}

impl ArtifactBuilder {
    pub fn new(
        store: FragmentStore,
        template: DocumentTemplate,
        renderer: Arc<dyn PdfRenderer>,
    ) -> Self {
        Self {
            store,
            template,
            renderer,
            retry: RetryPolicy::default(),
            missing_policy: MissingFragmentPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_missing_policy(mut self, policy: MissingFragmentPolicy) -> Self {
        self.missing_policy = policy;
        self
    }

    pub fn store(&self) -> &FragmentStore {
        &self.store
    }

    /// Build one artifact into `output`.
    ///
    /// Only a validated render yields [`ArtifactStatus::Succeeded`]. Any other
    /// end state leaves no file at `output`.
    #[instrument(skip_all, fields(category = %category, artifact = %descriptor.name))]
    pub async fn build(
        &self,
        category: &str,
        descriptor: &ArtifactDescriptor,
        output: &Path,
    ) -> ArtifactOutcome {
        let started = Instant::now();
        let mut progress = Progress::default();

        let status = match self.run(descriptor, output, &mut progress).await {
            Ok(status) => status,
            Err(e) => {
                error!(stage = %e.stage, error = %e.source, "artifact build failed");
                ArtifactStatus::Failed {
                    reason: ArtifactFailure::internal(e.to_string()),
                }
            }
        };

        match &status {
            ArtifactStatus::Succeeded { bytes, .. } => {
                info!(bytes, attempts = progress.attempts, "artifact rendered");
            }
            ArtifactStatus::Skipped { reason } | ArtifactStatus::Failed { reason } => {
                warn!(reason = %reason, "artifact not rendered");
                discard_output(output);
            }
        }

        ArtifactOutcome {
            category: category.to_string(),
            artifact: descriptor.name.clone(),
            output_path: output.to_path_buf(),
            missing_fragments: progress.missing,
            attempts: progress.attempts,
            elapsed_ms: started.elapsed().as_millis() as u64,
            status,
        }
    }

    async fn run(
        &self,
        descriptor: &ArtifactDescriptor,
        output: &Path,
        progress: &mut Progress,
    ) -> Result<ArtifactStatus, StageError> {
        let doc = assemble(&self.store, &descriptor.fragments).map_err(at(BuildStage::Assembling))?;

        for fragment in &doc.missing {
            warn!(fragment = %fragment, "fragment not found");
        }
        progress.missing = doc.missing.clone();

        if !doc.missing.is_empty() && self.missing_policy == MissingFragmentPolicy::Fail {
            return Ok(ArtifactStatus::Failed {
                reason: ArtifactFailure::MissingFragments {
                    fragments: doc.missing,
                },
            });
        }

        if doc.is_blank() {
            return Ok(ArtifactStatus::Skipped {
                reason: ArtifactFailure::EmptyDocument,
            });
        }

        let body = mdpress_markdown::to_html(&doc.text);
        if body.trim().is_empty() {
            return Err(at(BuildStage::Transforming)(MdpressError::Conversion(
                "markdown produced no HTML".into(),
            )));
        }

        let page = self.template.wrap(&descriptor.name, &body);
        debug!(len = page.len(), "document ready to render");

        let rendered = render_with_retry(self.renderer.as_ref(), &page, output, &self.retry)
            .await
            .map_err(at(BuildStage::Rendering))?;
        progress.attempts = rendered.attempts;

        let status = match rendered.outcome {
            RenderOutcome::Success { path, bytes } => ArtifactStatus::Succeeded {
                bytes,
                sha256: file_sha256(&path).map_err(at(BuildStage::Rendering))?,
            },
            RenderOutcome::Timeout { after } => ArtifactStatus::Failed {
                reason: ArtifactFailure::RenderTimeout {
                    timeout_ms: after.as_millis() as u64,
                },
            },
            RenderOutcome::ProcessError { code, stderr } => ArtifactStatus::Failed {
                reason: ArtifactFailure::RenderProcess { code, stderr },
            },
            RenderOutcome::InvalidOutput { size, min_bytes } => ArtifactStatus::Failed {
                reason: ArtifactFailure::InvalidOutput { size, min_bytes },
            },
        };
        Ok(status)
    }
}

fn file_sha256(path: &Path) -> mdpress_shared::Result<String> {
    let bytes = std::fs::read(path).map_err(|e| MdpressError::io(path, e))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

/// Remove whatever an earlier run or a failed render left at `output`.
fn discard_output(output: &Path) {
    match std::fs::remove_file(output) {
        Ok(()) => debug!(path = %output.display(), "removed output of unsuccessful build"),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => warn!(path = %output.display(), error = %e, "could not remove stale output"),
    }
}
