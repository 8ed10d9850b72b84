//! Headless Chromium print-to-PDF renderer.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument, warn};
use url::Url;

use mdpress_shared::{MdpressError, RenderConfig, Result};

use crate::{PdfRenderer, RenderOutcome, validate_output};

/// Settings for one [`ChromeRenderer`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Browser executable.
    pub browser: PathBuf,
    /// Arguments placed before the print flags.
    pub extra_args: Vec<String>,
    /// Wall-clock limit for one invocation.
    pub timeout: Duration,
    /// Output at or below this size is rejected.
    pub min_output_bytes: u64,
    /// Where the transient HTML files are written.
    pub scratch_dir: PathBuf,
}

impl RenderOptions {
    pub fn from_config(config: &RenderConfig, browser: PathBuf, scratch_dir: PathBuf) -> Self {
        Self {
            browser,
            extra_args: config.extra_args.clone(),
            timeout: config.timeout(),
            min_output_bytes: config.min_output_bytes,
            scratch_dir,
        }
    }
}

/// The print flags, in invocation order, ending with the page URL.
pub fn print_args(output: &Path, page: &Url) -> Vec<String> {
    vec![
        "--headless".into(),
        "--disable-gpu".into(),
        "--disable-software-rasterizer".into(),
        "--run-all-compositor-stages-before-draw".into(),
        format!("--print-to-pdf={}", output.display()),
        "--no-pdf-header-footer".into(),
        "--print-to-pdf-no-header".into(),
        page.to_string(),
    ]
}

/// Renders by spawning a headless browser per document.
#[derive(Debug, Clone)]
pub struct ChromeRenderer {
    options: RenderOptions,
}

impl ChromeRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Write `html` to a uniquely named file in the scratch directory.
    ///
    /// The file is deleted when the returned handle drops.
    fn write_scratch(&self, html: &str) -> Result<tempfile::NamedTempFile> {
        let dir = &self.options.scratch_dir;
        std::fs::create_dir_all(dir).map_err(|e| MdpressError::io(dir, e))?;

        let mut file = tempfile::Builder::new()
            .prefix("mdpress-")
            .suffix(".html")
            .tempfile_in(dir)
            .map_err(|e| MdpressError::io(dir, e))?;
        file.write_all(html.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| MdpressError::io(file.path(), e))?;
        Ok(file)
    }
}

/// Delete a PDF left by an earlier run so it cannot pass validation.
fn remove_stale_output(output: &Path) -> Result<()> {
    match std::fs::remove_file(output) {
        Ok(()) => {
            debug!(path = %output.display(), "removed previous output");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(MdpressError::io(output, e)),
    }
}

#[async_trait]
impl PdfRenderer for ChromeRenderer {
    #[instrument(skip_all, fields(output = %output.display()))]
    async fn render(&self, html: &str, output: &Path) -> Result<RenderOutcome> {
        let scratch = self.write_scratch(html)?;

        let scratch_path =
            std::path::absolute(scratch.path()).map_err(|e| MdpressError::io(scratch.path(), e))?;
        let output_path = std::path::absolute(output).map_err(|e| MdpressError::io(output, e))?;
        let page = Url::from_file_path(&scratch_path).map_err(|()| {
            MdpressError::Render(format!(
                "cannot express {} as a file URL",
                scratch_path.display()
            ))
        })?;

        remove_stale_output(&output_path)?;

        let mut command = Command::new(&self.options.browser);
        command
            .args(&self.options.extra_args)
            .args(print_args(&output_path, &page))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(browser = %self.options.browser.display(), page = %page, "invoking browser");
        let started = Instant::now();

        // Dropping the output future on timeout kills the child.
        let result = tokio::time::timeout(self.options.timeout, command.output()).await;

        let outcome = match result {
            Err(_) => {
                warn!(
                    timeout_ms = self.options.timeout.as_millis() as u64,
                    "browser timed out"
                );
                RenderOutcome::Timeout {
                    after: started.elapsed(),
                }
            }
            Ok(Err(e)) => {
                return Err(MdpressError::Render(format!(
                    "failed to launch {}: {e}",
                    self.options.browser.display()
                )));
            }
            Ok(Ok(out)) => {
                let stderr = String::from_utf8_lossy(&out.stderr).into_owned();
                if out.status.success() {
                    debug!(
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        stderr_len = stderr.len(),
                        "browser exited"
                    );
                    validate_output(&output_path, self.options.min_output_bytes)
                } else {
                    RenderOutcome::ProcessError {
                        code: out.status.code(),
                        stderr,
                    }
                }
            }
        };

        drop(scratch);
        Ok(outcome)
    }
}
