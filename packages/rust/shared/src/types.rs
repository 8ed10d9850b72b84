//! Build accounting types: per-artifact outcomes and the aggregate report.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{MdpressError, Result};

// ---------------------------------------------------------------------------
// ArtifactFailure
// ---------------------------------------------------------------------------

/// Why an artifact did not produce a valid PDF.
///
/// Each variant is fatal to its artifact only; the batch always continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactFailure {
    /// Some fragments were missing and the policy is `fail`.
    #[error("missing fragments: {}", .fragments.join(", "))]
    MissingFragments { fragments: Vec<String> },

    /// Every fragment was missing or blank.
    #[error("assembled document is empty")]
    EmptyDocument,

    /// The browser did not finish within its time limit.
    #[error("renderer timed out after {timeout_ms} ms")]
    RenderTimeout { timeout_ms: u64 },

    /// The browser exited unsuccessfully.
    #[error("renderer exited with {}{}", exit_label(.code), stderr_suffix(.stderr))]
    RenderProcess { code: Option<i32>, stderr: String },

    /// The browser exited but the PDF is missing or suspiciously small.
    #[error("renderer produced {size} bytes (need more than {min_bytes})")]
    InvalidOutput { size: u64, min_bytes: u64 },

    /// I/O, encoding, or conversion error inside the build.
    #[error("{message}")]
    Internal { message: String },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (killed by signal)".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let line = stderr.lines().rev().find(|l| !l.trim().is_empty());
    match line {
        Some(line) => format!(": {}", line.trim()),
        None => String::new(),
    }
}

impl ArtifactFailure {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal {
            message: msg.into(),
        }
    }
}

impl From<MdpressError> for ArtifactFailure {
    fn from(err: MdpressError) -> Self {
        Self::internal(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// ArtifactOutcome
// ---------------------------------------------------------------------------

/// Terminal state of one artifact build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ArtifactStatus {
    /// A valid PDF was written.
    Succeeded { bytes: u64, sha256: String },
    /// Nothing to render; no PDF written.
    Skipped { reason: ArtifactFailure },
    /// Build or render failed.
    Failed { reason: ArtifactFailure },
}

/// The result of building one artifact, as recorded in the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactOutcome {
    pub category: String,
    pub artifact: String,
    pub output_path: PathBuf,
    /// Fragment ids that did not resolve, in manifest order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fragments: Vec<String>,
    /// Render attempts made (0 if rendering was never reached).
    pub attempts: u32,
    pub elapsed_ms: u64,
    #[serde(flatten)]
    pub status: ArtifactStatus,
}

impl ArtifactOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self.status, ArtifactStatus::Succeeded { .. })
    }

    /// Size of the written PDF, if the build succeeded.
    pub fn bytes(&self) -> Option<u64> {
        match &self.status {
            ArtifactStatus::Succeeded { bytes, .. } => Some(*bytes),
            _ => None,
        }
    }

    /// Failure reason, if the build did not succeed.
    pub fn failure(&self) -> Option<&ArtifactFailure> {
        match &self.status {
            ArtifactStatus::Succeeded { .. } => None,
            ArtifactStatus::Skipped { reason } | ArtifactStatus::Failed { reason } => Some(reason),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildReport
// ---------------------------------------------------------------------------

/// Aggregate accounting for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub output_root: PathBuf,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Artifacts attempted.
    pub total: usize,
    /// Artifacts that produced a valid PDF.
    pub succeeded: usize,
    /// One entry per attempted artifact, in manifest order.
    pub outcomes: Vec<ArtifactOutcome>,
}

impl BuildReport {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            started_at: Utc::now(),
            finished_at: None,
            total: 0,
            succeeded: 0,
            outcomes: Vec::new(),
        }
    }

    /// Add one artifact's outcome to the tally.
    pub fn record(&mut self, outcome: ArtifactOutcome) {
        self.total += 1;
        if outcome.is_success() {
            self.succeeded += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn failed(&self) -> usize {
        self.total - self.succeeded
    }

    pub fn all_succeeded(&self) -> bool {
        self.succeeded == self.total
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// Outcomes that did not succeed.
    pub fn failures(&self) -> impl Iterator<Item = &ArtifactOutcome> {
        self.outcomes.iter().filter(|o| !o.is_success())
    }

    /// Pretty-printed JSON form of the report.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| MdpressError::validation(format!("JSON serialization failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(name: &str, status: ArtifactStatus) -> ArtifactOutcome {
        ArtifactOutcome {
            category: "01_Mindset".into(),
            artifact: name.into(),
            output_path: PathBuf::from(format!("pdfs/01_Mindset/{name}.pdf")),
            missing_fragments: vec![],
            attempts: 1,
            elapsed_ms: 12,
            status,
        }
    }

    #[test]
    fn report_counts_successes_and_failures() {
        let mut report = BuildReport::new("pdfs");
        report.record(outcome(
            "A",
            ArtifactStatus::Succeeded {
                bytes: 48_213,
                sha256: "ab".repeat(32),
            },
        ));
        report.record(outcome(
            "B",
            ArtifactStatus::Skipped {
                reason: ArtifactFailure::EmptyDocument,
            },
        ));
        report.record(outcome(
            "C",
            ArtifactStatus::Failed {
                reason: ArtifactFailure::RenderTimeout { timeout_ms: 30_000 },
            },
        ));

        assert_eq!(report.total, 3);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed(), 2);
        assert!(!report.all_succeeded());

        let failed: Vec<&str> = report.failures().map(|o| o.artifact.as_str()).collect();
        assert_eq!(failed, ["B", "C"]);
        assert_eq!(report.outcomes[0].bytes(), Some(48_213));
    }

    #[test]
    fn failure_messages() {
        let err = ArtifactFailure::RenderProcess {
            code: Some(1),
            stderr: "[0101/000000.000:ERROR] first\n[0101/000000.001:FATAL] crashed\n\n".into(),
        };
        assert_eq!(err.to_string(), "renderer exited with status 1: [0101/000000.001:FATAL] crashed");

        let err = ArtifactFailure::RenderProcess {
            code: None,
            stderr: String::new(),
        };
        assert_eq!(err.to_string(), "renderer exited with no status (killed by signal)");

        let err = ArtifactFailure::MissingFragments {
            fragments: vec!["a.md".into(), "b.md".into()],
        };
        assert_eq!(err.to_string(), "missing fragments: a.md, b.md");

        let err = ArtifactFailure::InvalidOutput {
            size: 0,
            min_bytes: 1000,
        };
        assert!(err.to_string().contains("0 bytes"));
    }

    #[test]
    fn report_serializes_to_json() {
        let mut report = BuildReport::new("pdfs");
        report.record(outcome(
            "B",
            ArtifactStatus::Failed {
                reason: ArtifactFailure::InvalidOutput {
                    size: 12,
                    min_bytes: 1000,
                },
            },
        ));
        report.finish();

        let json = report.to_json().expect("serialize");
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total"], 1);
        assert_eq!(value["succeeded"], 0);
        assert_eq!(value["outcomes"][0]["status"], "failed");
        assert_eq!(value["outcomes"][0]["reason"]["kind"], "invalid_output");
        assert!(value["finished_at"].is_string());

        let parsed: BuildReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.outcomes[0], report.outcomes[0]);
    }
}
