//! Read-only access to markdown fragments under the content root.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::trace;

use mdpress_shared::manifest::validate_fragment_id;
use mdpress_shared::{MdpressError, Result};

/// Fragments are addressed by their path relative to `root`.
#[derive(Debug, Clone)]
pub struct FragmentStore {
    root: PathBuf,
}

impl FragmentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path of a fragment. Rejects ids that escape the root.
    pub fn path_for(&self, id: &str) -> Result<PathBuf> {
        validate_fragment_id(id)?;
        Ok(self.root.join(id))
    }

    /// Read a fragment's text.
    ///
    /// `Ok(None)` means the fragment does not exist. Any other I/O failure,
    /// and content that is not UTF-8, is an error.
    pub fn read(&self, id: &str) -> Result<Option<String>> {
        let path = self.path_for(id)?;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                trace!(fragment = %id, "fragment not found");
                return Ok(None);
            }
            Err(e) => return Err(MdpressError::io(&path, e)),
        };

        String::from_utf8(bytes).map(Some).map_err(|e| {
            MdpressError::io(
                &path,
                std::io::Error::new(ErrorKind::InvalidData, format!("not valid UTF-8: {e}")),
            )
        })
    }
}
