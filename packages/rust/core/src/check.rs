//! Dry run: resolve every fragment in a manifest without rendering.

use tracing::instrument;

use mdpress_shared::Manifest;

use crate::assembler::assemble;
use crate::fragments::FragmentStore;

/// Resolution result for one artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckEntry {
    pub category: String,
    pub artifact: String,
    pub fragments: usize,
    pub missing: Vec<String>,
    /// The document would be skipped as empty.
    pub empty: bool,
    /// A fragment could not be read at all.
    pub error: Option<String>,
}

impl CheckEntry {
    pub fn is_clean(&self) -> bool {
        self.missing.is_empty() && !self.empty && self.error.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckReport {
    pub entries: Vec<CheckEntry>,
}

impl CheckReport {
    pub fn missing_count(&self) -> usize {
        self.entries.iter().map(|e| e.missing.len()).sum()
    }

    pub fn problems(&self) -> impl Iterator<Item = &CheckEntry> {
        self.entries.iter().filter(|e| !e.is_clean())
    }

    pub fn is_clean(&self) -> bool {
        self.entries.iter().all(CheckEntry::is_clean)
    }
}

#[instrument(skip_all, fields(root = %store.root().display()))]
pub fn check_manifest(manifest: &Manifest, store: &FragmentStore) -> CheckReport {
    let mut report = CheckReport::default();

    for category in &manifest.categories {
        for descriptor in &category.artifacts {
            let mut entry = CheckEntry {
                category: category.name.clone(),
                artifact: descriptor.name.clone(),
                fragments: descriptor.fragments.len(),
                missing: Vec::new(),
                empty: false,
                error: None,
            };
            match assemble(store, &descriptor.fragments) {
                Ok(doc) => {
                    entry.empty = doc.is_blank();
                    entry.missing = doc.missing;
                }
                Err(e) => entry.error = Some(e.to_string()),
            }
            report.entries.push(entry);
        }
    }
    report
}
