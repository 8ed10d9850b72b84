//! HTML → PDF rendering through a headless browser.
//!
//! This crate provides:
//! - [`PdfRenderer`] — the seam the artifact builder renders through
//! - [`ChromeRenderer`] — prints via a Chromium-family browser subprocess
//! - [`RenderOutcome`] — tagged result of one render attempt
//! - [`RetryPolicy`] / [`render_with_retry`] — bounded retry with backoff
//! - [`locate_browser`] — finds a usable browser executable

pub mod browser;
pub mod chrome;
pub mod retry;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use mdpress_shared::Result;

pub use browser::locate_browser;
pub use chrome::{ChromeRenderer, RenderOptions, print_args};
pub use retry::{RetriedRender, RetryPolicy, render_with_retry};

/// What one render attempt produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// A PDF above the size threshold exists at `path`.
    Success { path: PathBuf, bytes: u64 },
    /// The browser was killed after running for `after`.
    Timeout { after: Duration },
    /// The browser exited unsuccessfully.
    ProcessError { code: Option<i32>, stderr: String },
    /// The browser exited cleanly but the PDF is missing or too small.
    InvalidOutput { size: u64, min_bytes: u64 },
}

impl RenderOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

/// Anything that can print an HTML document to a PDF file.
///
/// `Err` is reserved for local failures (scratch file I/O, browser cannot
/// be launched); everything the browser itself does wrong is a
/// [`RenderOutcome`].
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, html: &str, output: &Path) -> Result<RenderOutcome>;
}

/// Check the file a renderer was asked to produce.
///
/// A missing file counts as size 0. Valid only if strictly larger than `min_bytes`.
pub fn validate_output(path: &Path, min_bytes: u64) -> RenderOutcome {
    let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    if size > min_bytes {
        RenderOutcome::Success {
            path: path.to_path_buf(),
            bytes: size,
        }
    } else {
        RenderOutcome::InvalidOutput { size, min_bytes }
    }
}
