//! Document assembly: concatenate an artifact's fragments in manifest order.

use tracing::{debug, instrument};

use mdpress_shared::Result;

use crate::fragments::FragmentStore;

/// Appended after every included fragment. Renders as a horizontal rule.
pub const SEPARATOR: &str = "\n\n---\n\n";

/// The markdown source for one artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssembledDocument {
    /// Concatenated fragment text.
    pub text: String,
    /// Ids that were found, in the order they were appended.
    pub included: Vec<String>,
    /// Ids that were not found, in manifest order.
    pub missing: Vec<String>,
}

impl AssembledDocument {
    /// True when no included fragment carries any non-whitespace text.
    pub fn is_blank(&self) -> bool {
        self.text.split(SEPARATOR).all(|part| part.trim().is_empty())
    }
}

/// Concatenate `ids` from `store`.
///
/// Missing fragments are recorded and skipped; the rest keep their order.
/// Repeated ids are included each time they appear.
#[instrument(skip_all, fields(fragments = ids.len()))]
pub fn assemble(store: &FragmentStore, ids: &[String]) -> Result<AssembledDocument> {
    let mut doc = AssembledDocument::default();

    for id in ids {
        match store.read(id)? {
            Some(text) => {
                doc.text.push_str(&text);
                doc.text.push_str(SEPARATOR);
                doc.included.push(id.clone());
            }
            None => doc.missing.push(id.clone()),
        }
    }

    debug!(
        included = doc.included.len(),
        missing = doc.missing.len(),
        len = doc.text.len(),
        "document assembled"
    );
    Ok(doc)
}
