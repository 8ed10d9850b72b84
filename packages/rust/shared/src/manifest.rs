//! Manifest model: categories → artifacts → ordered fragment ids.
//!
//! The manifest is a TOML file loaded once at startup:
//!
//! ```toml
//! [[category]]
//! name = "01_Mindset"
//!
//! [[category.artifact]]
//! name = "Mental_Models"
//! fragments = ["chapter_8_inversion.md", "chapter_9_essentialism.md"]
//! ```
//!
//! Array order is significant: categories and artifacts are built in the
//! order they are declared. [`parse_manifest`] validates the whole document
//! before anything is built.

use std::collections::HashSet;
use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{MdpressError, Result};

/// The full set of categories to build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default, rename = "category")]
    pub categories: Vec<Category>,
}

/// One output subdirectory and the artifacts rendered into it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Category {
    /// Directory name under the output root.
    pub name: String,
    #[serde(default, rename = "artifact")]
    pub artifacts: Vec<ArtifactDescriptor>,
}

/// A named PDF and the fragments that compose it, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArtifactDescriptor {
    /// Output file stem; unique within its category.
    pub name: String,
    /// Fragment ids relative to the content root.
    pub fragments: Vec<String>,
}

impl ArtifactDescriptor {
    pub fn new(name: impl Into<String>, fragments: &[&str]) -> Self {
        Self {
            name: name.into(),
            fragments: fragments.iter().map(|f| (*f).to_string()).collect(),
        }
    }

    /// Output file name, `<name>.pdf`.
    pub fn file_name(&self) -> String {
        format!("{}.pdf", self.name)
    }
}

impl Manifest {
    /// Total number of artifacts across all categories.
    pub fn artifact_count(&self) -> usize {
        self.categories.iter().map(|c| c.artifacts.len()).sum()
    }

    /// Look up a category by name.
    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// Keep only the named categories, preserving manifest order.
    ///
    /// Every requested name must exist.
    pub fn select_categories(&self, names: &[String]) -> Result<Manifest> {
        for name in names {
            if self.category(name).is_none() {
                return Err(MdpressError::manifest(format!(
                    "unknown category '{name}'"
                )));
            }
        }
        Ok(Manifest {
            categories: self
                .categories
                .iter()
                .filter(|c| names.iter().any(|n| n == &c.name))
                .cloned()
                .collect(),
        })
    }

    /// Check the schema invariants not expressible in serde.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(MdpressError::manifest("manifest declares no categories"));
        }

        let mut category_names = HashSet::new();
        for category in &self.categories {
            validate_name("category", &category.name)?;
            if !category_names.insert(category.name.as_str()) {
                return Err(MdpressError::manifest(format!(
                    "duplicate category '{}'",
                    category.name
                )));
            }
            if category.artifacts.is_empty() {
                warn!(category = %category.name, "category declares no artifacts");
            }

            let mut artifact_names = HashSet::new();
            for artifact in &category.artifacts {
                validate_name("artifact", &artifact.name)?;
                if !artifact_names.insert(artifact.name.as_str()) {
                    return Err(MdpressError::manifest(format!(
                        "duplicate artifact '{}' in category '{}'",
                        artifact.name, category.name
                    )));
                }
                if artifact.fragments.is_empty() {
                    return Err(MdpressError::manifest(format!(
                        "artifact '{}' in category '{}' lists no fragments",
                        artifact.name, category.name
                    )));
                }
                for fragment in &artifact.fragments {
                    validate_fragment_id(fragment).map_err(|e| {
                        MdpressError::manifest(format!(
                            "artifact '{}' in category '{}': {e}",
                            artifact.name, category.name
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Names become path components, so keep them to a portable character set.
fn validate_name(kind: &str, name: &str) -> Result<()> {
    static NAME_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]*$").expect("valid regex"));

    if !NAME_RE.is_match(name) || name.contains("..") {
        return Err(MdpressError::manifest(format!(
            "invalid {kind} name '{name}': use letters, digits, space, '.', '_' or '-'"
        )));
    }
    Ok(())
}

/// A fragment id must be a relative path that stays inside the content root.
pub fn validate_fragment_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        return Err(MdpressError::validation("empty fragment id"));
    }
    let path = Path::new(id);
    for component in path.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(MdpressError::validation(format!(
                    "fragment id '{id}' must be a relative path inside the content root"
                )));
            }
        }
    }
    Ok(())
}

/// Parse and validate a manifest from TOML text.
pub fn parse_manifest(content: &str) -> Result<Manifest> {
    let manifest: Manifest =
        toml::from_str(content).map_err(|e| MdpressError::manifest(e.to_string()))?;
    manifest.validate()?;
    debug!(
        categories = manifest.categories.len(),
        artifacts = manifest.artifact_count(),
        "manifest validated"
    );
    Ok(manifest)
}

/// Load and validate the manifest file at `path`.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let content = std::fs::read_to_string(path).map_err(|e| MdpressError::io(path, e))?;
    parse_manifest(&content).map_err(|e| match e {
        MdpressError::Manifest { message } => {
            MdpressError::manifest(format!("{}: {message}", path.display()))
        }
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[[category]]
name = "01_Mindset"

[[category.artifact]]
name = "Stoic_Journaling_Syllabus"
fragments = ["stoic_journal_30.md"]

[[category.artifact]]
name = "Mental_Models"
fragments = ["chapter_8_inversion.md", "chapter_9_essentialism.md", "chapter_10_second_order.md"]

[[category]]
name = "02_Biohacking"

[[category.artifact]]
name = "Thermal_Protocol"
fragments = ["thermal_protocol.md"]
"#;

    #[test]
    fn parses_in_declaration_order() {
        let manifest = parse_manifest(SAMPLE).expect("parse");
        let names: Vec<&str> = manifest.categories.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["01_Mindset", "02_Biohacking"]);
        assert_eq!(manifest.artifact_count(), 3);

        let mental = &manifest.categories[0].artifacts[1];
        assert_eq!(mental.name, "Mental_Models");
        assert_eq!(
            mental.fragments,
            [
                "chapter_8_inversion.md",
                "chapter_9_essentialism.md",
                "chapter_10_second_order.md"
            ]
        );
        assert_eq!(mental.file_name(), "Mental_Models.pdf");
    }

    #[test]
    fn rejects_duplicate_artifact_in_category() {
        let toml_str = r#"
[[category]]
name = "03_Fuel"

[[category.artifact]]
name = "Kitchen_Audit"
fragments = ["a.md"]

[[category.artifact]]
name = "Kitchen_Audit"
fragments = ["b.md"]
"#;
        let err = parse_manifest(toml_str).unwrap_err();
        assert!(err.to_string().contains("duplicate artifact 'Kitchen_Audit'"));
    }

    #[test]
    fn same_artifact_name_in_different_categories_is_fine() {
        let toml_str = r#"
[[category]]
name = "a"
[[category.artifact]]
name = "Overview"
fragments = ["a.md"]

[[category]]
name = "b"
[[category.artifact]]
name = "Overview"
fragments = ["b.md"]
"#;
        assert!(parse_manifest(toml_str).is_ok());
    }

    #[test]
    fn rejects_duplicate_category() {
        let toml_str = r#"
[[category]]
name = "x"
[[category.artifact]]
name = "One"
fragments = ["a.md"]

[[category]]
name = "x"
"#;
        let err = parse_manifest(toml_str).unwrap_err();
        assert!(err.to_string().contains("duplicate category 'x'"));
    }

    #[test]
    fn rejects_empty_fragment_list() {
        let toml_str = r#"
[[category]]
name = "x"
[[category.artifact]]
name = "Hollow"
fragments = []
"#;
        let err = parse_manifest(toml_str).unwrap_err();
        assert!(err.to_string().contains("lists no fragments"));
    }

    #[test]
    fn rejects_escaping_fragment_ids() {
        for bad in ["../secrets.md", "/etc/passwd", "notes/../../x.md"] {
            let toml_str = format!(
                "[[category]]\nname = \"x\"\n[[category.artifact]]\nname = \"A\"\nfragments = [\"{bad}\"]\n"
            );
            let err = parse_manifest(&toml_str).unwrap_err();
            assert!(
                err.to_string().contains("relative path"),
                "{bad} should be rejected, got: {err}"
            );
        }
    }

    #[test]
    fn nested_fragment_ids_are_allowed() {
        assert!(validate_fragment_id("chapters/ch1.md").is_ok());
        assert!(validate_fragment_id("./ch1.md").is_ok());
        assert!(validate_fragment_id("  ").is_err());
    }

    #[test]
    fn rejects_names_with_separators() {
        let toml_str = r#"
[[category]]
name = "a/b"
[[category.artifact]]
name = "A"
fragments = ["a.md"]
"#;
        let err = parse_manifest(toml_str).unwrap_err();
        assert!(err.to_string().contains("invalid category name"));
    }

    #[test]
    fn rejects_unknown_fields() {
        let toml_str = r#"
[[category]]
name = "a"
[[category.artifact]]
name = "A"
fragment = ["a.md"]
"#;
        assert!(parse_manifest(toml_str).is_err());
    }

    #[test]
    fn rejects_empty_manifest() {
        let err = parse_manifest("").unwrap_err();
        assert!(err.to_string().contains("no categories"));
    }

    #[test]
    fn select_categories_keeps_manifest_order() {
        let manifest = parse_manifest(SAMPLE).unwrap();
        let selected = manifest
            .select_categories(&["02_Biohacking".into(), "01_Mindset".into()])
            .unwrap();
        assert_eq!(selected.categories[0].name, "01_Mindset");
        assert_eq!(selected.categories[1].name, "02_Biohacking");

        let err = manifest.select_categories(&["99_Nope".into()]).unwrap_err();
        assert!(err.to_string().contains("unknown category"));
    }

    #[test]
    fn load_manifest_prefixes_path() {
        let dir = std::env::temp_dir().join(format!("mdpress-manifest-{}", uuid::Uuid::now_v7()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("manifest.toml");
        std::fs::write(&path, "").unwrap();

        let err = load_manifest(&path).unwrap_err();
        assert!(err.to_string().contains("manifest.toml"));

        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(load_manifest(&path).unwrap().artifact_count(), 3);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
