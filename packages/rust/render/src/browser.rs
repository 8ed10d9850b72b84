//! Browser executable discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use mdpress_shared::{MdpressError, Result};

/// Executable names searched on `PATH`, in preference order.
const PATH_CANDIDATES: &[&str] = &[
    "google-chrome",
    "google-chrome-stable",
    "chromium",
    "chromium-browser",
    "chrome",
    "microsoft-edge",
];

/// Install locations that are usually not on `PATH`.
const INSTALL_LOCATIONS: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/Applications/Microsoft Edge.app/Contents/MacOS/Microsoft Edge",
    r"C:\Program Files\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
];

/// Find the browser to render with.
///
/// `explicit` is whatever the user asked for (flag, environment or config).
/// Without it, `PATH` is searched, then the usual install locations.
pub fn locate_browser(explicit: Option<&str>) -> Result<PathBuf> {
    if let Some(requested) = explicit.filter(|s| !s.trim().is_empty()) {
        return resolve_named(requested);
    }

    for name in PATH_CANDIDATES {
        if let Ok(path) = which::which(name) {
            debug!(browser = %path.display(), "found browser on PATH");
            return Ok(path);
        }
    }

    INSTALL_LOCATIONS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.is_file())
        .inspect(|p| debug!(browser = %p.display(), "found browser install"))
        .ok_or_else(|| {
            MdpressError::config(
                "no headless browser found; install Chrome or Chromium, or pass --browser",
            )
        })
}

/// Resolve a user-supplied browser: a path is checked as-is, a bare name is looked up on `PATH`.
fn resolve_named(requested: &str) -> Result<PathBuf> {
    let candidate = Path::new(requested);
    if candidate.components().count() > 1 {
        return if candidate.is_file() {
            Ok(candidate.to_path_buf())
        } else {
            Err(MdpressError::config(format!(
                "browser not found at {}",
                candidate.display()
            )))
        };
    }

    which::which(requested)
        .map_err(|e| MdpressError::config(format!("browser `{requested}` not found: {e}")))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn explicit_path_must_exist() {
        let err = locate_browser(Some("/nonexistent/dir/chrome")).unwrap_err();
        assert!(matches!(err, MdpressError::Config { .. }));
        assert!(err.to_string().contains("/nonexistent/dir/chrome"));
    }

    #[test]
    fn explicit_path_is_used_verbatim() {
        let found = locate_browser(Some("/bin/sh")).unwrap();
        assert_eq!(found, PathBuf::from("/bin/sh"));
    }

    #[test]
    fn bare_name_is_searched_on_path() {
        let found = locate_browser(Some("sh")).unwrap();
        assert!(found.is_absolute());
        assert!(found.ends_with("sh"));
    }

    #[test]
    fn unknown_bare_name_is_a_config_error() {
        let err = locate_browser(Some("mdpress-no-such-browser")).unwrap_err();
        assert!(err.to_string().contains("mdpress-no-such-browser"));
    }
}
