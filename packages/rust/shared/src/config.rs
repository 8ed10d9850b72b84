//! Application configuration for mdpress.
//!
//! Config lives in `mdpress.toml`, looked up via an explicit path first and
//! then in the working directory. CLI flags override config file values,
//! which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MdpressError, Result};

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = "mdpress.toml";

// ---------------------------------------------------------------------------
// Config structs (matching mdpress.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Input and output locations.
    #[serde(default)]
    pub paths: PathsConfig,

    /// Headless browser settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Batch behaviour.
    #[serde(default)]
    pub build: BuildConfig,

    /// Cover page text and fonts.
    #[serde(default)]
    pub branding: BrandingConfig,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Manifest file declaring categories and artifacts.
    #[serde(default = "default_manifest")]
    pub manifest: String,

    /// Directory fragment ids are resolved against.
    #[serde(default = "default_content_root")]
    pub content_root: String,

    /// Directory receiving `<category>/<name>.pdf`.
    #[serde(default = "default_output_root")]
    pub output_root: String,

    /// Directory for transient HTML files. Empty means `<temp>/mdpress`.
    #[serde(default)]
    pub scratch_dir: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            manifest: default_manifest(),
            content_root: default_content_root(),
            output_root: default_output_root(),
            scratch_dir: String::new(),
        }
    }
}

fn default_manifest() -> String {
    "manifest.toml".into()
}
fn default_content_root() -> String {
    "content".into()
}
fn default_output_root() -> String {
    "pdfs".into()
}

impl PathsConfig {
    /// Resolved scratch directory.
    pub fn scratch_dir(&self) -> PathBuf {
        if self.scratch_dir.trim().is_empty() {
            std::env::temp_dir().join("mdpress")
        } else {
            expand_home(&self.scratch_dir)
        }
    }
}

/// `[render]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Browser executable. Empty means auto-detect.
    #[serde(default)]
    pub browser: String,

    /// Arguments passed to the browser before the print flags.
    #[serde(default = "default_extra_args")]
    pub extra_args: Vec<String>,

    /// Wall-clock limit for one browser invocation.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// A PDF at or below this size is treated as a silent render failure.
    #[serde(default = "default_min_output_bytes")]
    pub min_output_bytes: u64,

    /// Total render attempts per artifact (1 disables retry).
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the second attempt.
    #[serde(default = "default_retry_initial_delay_ms")]
    pub retry_initial_delay_ms: u64,

    /// Multiplier applied to the delay after each attempt.
    #[serde(default = "default_retry_backoff_factor")]
    pub retry_backoff_factor: f64,

    /// Upper bound for a single retry delay.
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            browser: String::new(),
            extra_args: default_extra_args(),
            timeout_secs: default_timeout_secs(),
            min_output_bytes: default_min_output_bytes(),
            max_attempts: default_max_attempts(),
            retry_initial_delay_ms: default_retry_initial_delay_ms(),
            retry_backoff_factor: default_retry_backoff_factor(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl RenderConfig {
    /// Timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_extra_args() -> Vec<String> {
    vec!["--no-sandbox".into()]
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_min_output_bytes() -> u64 {
    1000
}
fn default_max_attempts() -> u32 {
    2
}
fn default_retry_initial_delay_ms() -> u64 {
    500
}
fn default_retry_backoff_factor() -> f64 {
    2.0
}
fn default_retry_max_delay_ms() -> u64 {
    10_000
}

/// What to do when some (but not all) of an artifact's fragments are missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingFragmentPolicy {
    /// Warn and build from the fragments that exist.
    #[default]
    Skip,
    /// Fail the artifact if any fragment is missing.
    Fail,
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Artifacts built concurrently within a category.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Handling of missing fragments.
    #[serde(default)]
    pub missing_fragments: MissingFragmentPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            missing_fragments: MissingFragmentPolicy::default(),
        }
    }
}

fn default_jobs() -> usize {
    1
}

/// `[branding]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingConfig {
    /// Small uppercase mark above the cover title.
    #[serde(default = "default_brand")]
    pub brand: String,

    /// Line under the cover title.
    #[serde(default = "default_tagline")]
    pub tagline: String,

    /// Text pinned to the bottom of the cover.
    #[serde(default = "default_footer")]
    pub footer: String,

    /// Import web fonts in the stylesheet (best effort, needs network).
    #[serde(default = "default_true")]
    pub remote_fonts: bool,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            brand: default_brand(),
            tagline: default_tagline(),
            footer: default_footer(),
            remote_fonts: true,
        }
    }
}

fn default_brand() -> String {
    "The Clarity Protocol".into()
}
fn default_tagline() -> String {
    "Built in Cape Town. Engineered for the world.".into()
}
fn default_footer() -> String {
    "CLARITY PROTOCOL".into()
}
fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

/// Pick the config file to load: the explicit path, else `./mdpress.toml` if present.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    local.exists().then_some(local)
}

/// Load the application config. Returns defaults if no config file is found.
///
/// An explicitly requested file that does not exist is an error.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    match resolve_config_path(explicit) {
        Some(path) => load_config_from(&path),
        None => {
            tracing::debug!("no config file found, using defaults");
            Ok(AppConfig::default())
        }
    }
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| MdpressError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content).map_err(|e| {
        MdpressError::config(format!("failed to parse {}: {e}", path.display()))
    })?;
    validate_config(&config)?;
    tracing::debug!(path = %path.display(), "loaded config");
    Ok(config)
}

/// Reject values that would make the pipeline misbehave.
fn validate_config(config: &AppConfig) -> Result<()> {
    if config.build.jobs == 0 {
        return Err(MdpressError::config("build.jobs must be at least 1"));
    }
    if config.render.max_attempts == 0 {
        return Err(MdpressError::config("render.max_attempts must be at least 1"));
    }
    if config.render.timeout_secs == 0 {
        return Err(MdpressError::config("render.timeout_secs must be at least 1"));
    }
    if config.render.retry_backoff_factor < 1.0 {
        return Err(MdpressError::config(
            "render.retry_backoff_factor must be >= 1.0",
        ));
    }
    Ok(())
}

/// Write a default config file at `path`, refusing to overwrite an existing one.
pub fn init_config(path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Err(MdpressError::config(format!(
            "{} already exists",
            path.display()
        )));
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| MdpressError::io(parent, e))?;
    }

    let content = toml::to_string_pretty(&AppConfig::default())
        .map_err(|e| MdpressError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| MdpressError::io(path, e))?;
    tracing::info!(path = %path.display(), "created default config file");

    Ok(path.to_path_buf())
}
