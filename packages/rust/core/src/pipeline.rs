//! Batch orchestration: build every artifact in a manifest.
//!
//! Categories run in manifest order. Within a category, up to `jobs`
//! artifacts build concurrently; their outcomes come back over one channel
//! and are recorded in manifest order, so the report is independent of
//! completion order.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};
use tracing::{error, info, instrument};

use mdpress_shared::{
    ArtifactDescriptor, ArtifactFailure, ArtifactOutcome, ArtifactStatus, BuildReport, Category,
    Manifest,
};

use crate::builder::ArtifactBuilder;

/// Progress callback for reporting batch status.
pub trait ProgressReporter: Send + Sync {
    /// Called before a category's artifacts are built.
    fn category_started(&self, category: &str, artifacts: usize);
    /// Called as each artifact finishes, in completion order.
    fn artifact_finished(&self, outcome: &ArtifactOutcome);
    /// Called once the report is complete.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn category_started(&self, _category: &str, _artifacts: usize) {}
    fn artifact_finished(&self, _outcome: &ArtifactOutcome) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Build every artifact in `manifest` into `<output_root>/<category>/<name>.pdf`.
///
/// Never stops early: the report always holds one outcome per artifact.
#[instrument(skip_all, fields(output_root = %output_root.display(), jobs = jobs))]
pub async fn run_all(
    manifest: &Manifest,
    builder: Arc<ArtifactBuilder>,
    output_root: &Path,
    jobs: usize,
    progress: &dyn ProgressReporter,
) -> BuildReport {
    let jobs = jobs.max(1);
    let mut report = BuildReport::new(output_root);

    info!(
        categories = manifest.categories.len(),
        artifacts = manifest.artifact_count(),
        "starting build"
    );

    for category in &manifest.categories {
        progress.category_started(&category.name, category.artifacts.len());
        for outcome in build_category(category, &builder, output_root, jobs, progress).await {
            report.record(outcome);
        }
    }

    report.finish();
    info!(
        total = report.total,
        succeeded = report.succeeded,
        failed = report.failed(),
        "build complete"
    );
    progress.done(&report);
    report
}

#[instrument(skip_all, fields(category = %category.name))]
async fn build_category(
    category: &Category,
    builder: &Arc<ArtifactBuilder>,
    output_root: &Path,
    jobs: usize,
    progress: &dyn ProgressReporter,
) -> Vec<ArtifactOutcome> {
    let dir = output_root.join(&category.name);

    if let Err(e) = std::fs::create_dir_all(&dir) {
        error!(path = %dir.display(), error = %e, "cannot create category directory");
        let reason = format!("cannot create {}: {e}", dir.display());
        return category
            .artifacts
            .iter()
            .map(|descriptor| {
                let outcome = failed(&category.name, descriptor, &dir, reason.clone());
                progress.artifact_finished(&outcome);
                outcome
            })
            .collect();
    }

    let semaphore = Arc::new(Semaphore::new(jobs));
    let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ArtifactOutcome)>();
    let mut handles = Vec::with_capacity(category.artifacts.len());

    for (index, descriptor) in category.artifacts.iter().enumerate() {
        let builder = Arc::clone(builder);
        let semaphore = Arc::clone(&semaphore);
        let tx = tx.clone();
        let category_name = category.name.clone();
        let descriptor = descriptor.clone();
        let output = dir.join(descriptor.file_name());

        handles.push(tokio::spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return;
            };
            let outcome = builder.build(&category_name, &descriptor, &output).await;
            let _ = tx.send((index, outcome));
        }));
    }
    drop(tx);

    let mut slots: Vec<Option<ArtifactOutcome>> = vec![None; category.artifacts.len()];
    while let Some((index, outcome)) = rx.recv().await {
        progress.artifact_finished(&outcome);
        slots[index] = Some(outcome);
    }

    for handle in handles {
        if let Err(e) = handle.await {
            error!(error = %e, "artifact task did not complete");
        }
    }

    slots
        .into_iter()
        .zip(&category.artifacts)
        .map(|(slot, descriptor)| {
            slot.unwrap_or_else(|| {
                let outcome = failed(
                    &category.name,
                    descriptor,
                    &dir,
                    "build task aborted".to_string(),
                );
                progress.artifact_finished(&outcome);
                outcome
            })
        })
        .collect()
}

fn failed(
    category: &str,
    descriptor: &ArtifactDescriptor,
    dir: &Path,
    reason: String,
) -> ArtifactOutcome {
    ArtifactOutcome {
        category: category.to_string(),
        artifact: descriptor.name.clone(),
        output_path: dir.join(descriptor.file_name()),
        missing_fragments: Vec::new(),
        attempts: 0,
        elapsed_ms: 0,
        status: ArtifactStatus::Failed {
            reason: ArtifactFailure::internal(reason),
        },
    }
}
