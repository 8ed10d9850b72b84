//! Test fixtures shared across the core crate's unit tests.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use mdpress_render::{PdfRenderer, RenderOutcome, validate_output};
use mdpress_shared::{MdpressError, Result};

pub const MIN_BYTES: u64 = 1000;

/// A content root in a fresh temp dir, removed on drop.
pub struct TempContent {
    dir: PathBuf,
}

impl TempContent {
    pub fn new() -> Self {
        let dir = std::env::temp_dir().join(format!("mdpress-core-test-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(dir.join("content")).unwrap();
        Self { dir }
    }

    pub fn root(&self) -> PathBuf {
        self.dir.join("content")
    }

    pub fn out(&self) -> PathBuf {
        self.dir.join("out")
    }

    pub fn write(&self, id: &str, text: &str) {
        self.write_bytes(id, text.as_bytes());
    }

    pub fn write_bytes(&self, id: &str, bytes: &[u8]) {
        let path = self.root().join(id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, bytes).unwrap();
    }
}

impl Drop for TempContent {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

/// How the fake renderer treats one artifact, keyed by output file stem.
#[derive(Clone, Debug)]
pub enum Behaviour {
    Write(usize),
    Timeout,
    Crash,
    Error,
    /// Crash this many times, then write.
    Flaky(usize),
}

/// In-process renderer that writes a fixed-size file instead of a PDF.
pub struct FakeRenderer {
    default: Behaviour,
    overrides: Vec<(String, Behaviour)>,
    delays: Vec<(String, Duration)>,
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
}

impl FakeRenderer {
    pub fn writing(bytes: usize) -> Self {
        Self {
            default: Behaviour::Write(bytes),
            overrides: Vec::new(),
            delays: Vec::new(),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, stem: &str, behaviour: Behaviour) -> Self {
        self.overrides.push((stem.to_string(), behaviour));
        self
    }

    pub fn with_delay(mut self, stem: &str, delay: Duration) -> Self {
        self.delays.push((stem.to_string(), delay));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// HTML documents received, in call order.
    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    fn calls_for(&self, stem: &str) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|html| html.contains(&format!("data-stem=\"{stem}\"")))
            .count()
    }
}

fn stem_of(output: &Path) -> String {
    output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(&self, html: &str, output: &Path) -> Result<RenderOutcome> {
        let stem = stem_of(output);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen
            .lock()
            .unwrap()
            .push(format!("<!-- data-stem=\"{stem}\" -->{html}"));

        if let Some((_, delay)) = self.delays.iter().find(|(s, _)| *s == stem) {
            tokio::time::sleep(*delay).await;
        }

        let behaviour = self
            .overrides
            .iter()
            .find(|(s, _)| *s == stem)
            .map(|(_, b)| b.clone())
            .unwrap_or_else(|| self.default.clone());

        let _ = std::fs::remove_file(output);
        match behaviour {
            Behaviour::Write(bytes) => {
                std::fs::write(output, vec![b'%'; bytes]).map_err(|e| MdpressError::io(output, e))?;
                Ok(validate_output(output, MIN_BYTES))
            }
            Behaviour::Timeout => Ok(RenderOutcome::Timeout {
                after: Duration::from_secs(30),
            }),
            Behaviour::Crash => Ok(RenderOutcome::ProcessError {
                code: Some(1),
                stderr: "renderer crashed".into(),
            }),
            Behaviour::Error => Err(MdpressError::Render("failed to launch fake".into())),
            Behaviour::Flaky(failures) => {
                if self.calls_for(&stem) <= failures {
                    Ok(RenderOutcome::ProcessError {
                        code: Some(1),
                        stderr: "transient".into(),
                    })
                } else {
                    std::fs::write(output, vec![b'%'; 4096]).map_err(|e| MdpressError::io(output, e))?;
                    Ok(validate_output(output, MIN_BYTES))
                }
            }
        }
    }
}
