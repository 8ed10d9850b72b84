//! Error types for mdpress.
//!
//! Library crates use [`MdpressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Per-artifact build failures are not errors: they are recorded as
//! [`ArtifactFailure`](crate::ArtifactFailure) values in the build report.

use std::path::PathBuf;

/// Top-level error type for all mdpress operations.
#[derive(Debug, thiserror::Error)]
pub enum MdpressError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Manifest parsing or schema validation error.
    #[error("manifest error: {message}")]
    Manifest { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (bad fragment id, invalid UTF-8, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Headless browser could not be located or launched.
    #[error("render error: {0}")]
    Render(String),

    /// Markdown-to-HTML or templating error.
    #[error("conversion error: {0}")]
    Conversion(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, MdpressError>;

impl MdpressError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a manifest error from any displayable message.
    pub fn manifest(msg: impl Into<String>) -> Self {
        Self::Manifest {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = MdpressError::config("no headless browser found");
        assert_eq!(err.to_string(), "config error: no headless browser found");

        let err = MdpressError::manifest("duplicate artifact 'Day_1' in category '06_Guides'");
        assert!(err.to_string().starts_with("manifest error:"));
        assert!(err.to_string().contains("Day_1"));
    }

    #[test]
    fn io_error_carries_path() {
        let err = MdpressError::io(
            "/tmp/missing.md",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/tmp/missing.md"));
        assert!(msg.contains("denied"));
    }
}
