//! Print document templating.
//!
//! Wraps a rendered HTML fragment in a self-contained document: an embedded
//! A4 stylesheet, a full-bleed dark cover page carrying the brand mark,
//! title and tagline, and the body content. The cover always ends with a
//! forced page break.

use tracing::debug;

use mdpress_markdown::escape_html;
use mdpress_shared::BrandingConfig;

/// Print stylesheet embedded in every document.
pub const PRINT_CSS: &str = include_str!("print.css");

/// Web font import. The document renders with system fonts if it fails.
const FONT_IMPORT: &str = "@import url('https://fonts.googleapis.com/css2?family=Inter:wght@300;400;500;600;700;800;900&family=JetBrains+Mono:wght@400;500&display=swap');\n";

/// Turn an artifact name into a display title: `Day_1_Protocol` → `Day 1 Protocol`.
pub fn display_title(name: &str) -> String {
    name.replace(['_', '-'], " ")
}

/// Cover and stylesheet settings shared by every document in a run.
#[derive(Debug, Clone)]
pub struct DocumentTemplate {
    brand: String,
    tagline: String,
    footer: String,
    remote_fonts: bool,
}

impl Default for DocumentTemplate {
    fn default() -> Self {
        Self::new(&BrandingConfig::default())
    }
}

impl DocumentTemplate {
    pub fn new(branding: &BrandingConfig) -> Self {
        Self {
            brand: branding.brand.clone(),
            tagline: branding.tagline.clone(),
            footer: branding.footer.clone(),
            remote_fonts: branding.remote_fonts,
        }
    }

    /// The stylesheet placed in the document's `<style>` element.
    pub fn stylesheet(&self) -> String {
        if self.remote_fonts {
            format!("{FONT_IMPORT}{PRINT_CSS}")
        } else {
            PRINT_CSS.to_string()
        }
    }

    /// Build the full HTML document for an artifact.
    ///
    /// `name` is the artifact name; the displayed title is derived from it.
    /// `body_html` is inserted verbatim and must already be trusted HTML.
    pub fn wrap(&self, name: &str, body_html: &str) -> String {
        let title = escape_html(&display_title(name));
        let brand = escape_html(&self.brand);
        let tagline = escape_html(&self.tagline);
        let footer = escape_html(&self.footer);
        let css = self.stylesheet();

        let document = format!(
            r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
{css}
</style>
</head>
<body>
<section class="cover">
    <div class="cover-brand">{brand}</div>
    <h1>{title}</h1>
    <div class="cover-line"></div>
    <div class="cover-tagline">{tagline}</div>
    <div class="cover-footer">{footer}</div>
</section>
<main class="content">
{body_html}
</main>
</body>
</html>
"#
        );

        debug!(artifact = %name, len = document.len(), "document templated");
        document
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_title_replaces_separators() {
        assert_eq!(display_title("Muscle_Up_and_10K_Plan"), "Muscle Up and 10K Plan");
        assert_eq!(display_title("her-edition"), "her edition");
        assert_eq!(display_title("Plain"), "Plain");
    }

    #[test]
    fn wrap_produces_cover_then_content() {
        let template = DocumentTemplate::default();
        let doc = template.wrap("Day_1_Protocol", "<h1>Morning</h1><p>Cold water.</p>");

        assert!(doc.starts_with("<!DOCTYPE html>"));
        assert!(doc.contains("<title>Day 1 Protocol</title>"));
        assert!(doc.contains("<h1>Day 1 Protocol</h1>"));
        assert!(doc.contains("The Clarity Protocol"));
        assert!(doc.contains("Built in Cape Town. Engineered for the world."));

        let cover = doc.find("class=\"cover\"").unwrap();
        let content = doc.find("<h1>Morning</h1>").unwrap();
        assert!(cover < content);
    }

    #[test]
    fn stylesheet_is_print_oriented() {
        let css = DocumentTemplate::default().stylesheet();
        assert!(css.contains("size: A4"));
        assert!(css.contains("page-break-after: always"));
        assert!(css.contains("page-break-inside: avoid"));
    }

    #[test]
    fn remote_fonts_can_be_disabled() {
        let mut branding = BrandingConfig::default();
        assert!(DocumentTemplate::new(&branding).stylesheet().contains("@import"));

        branding.remote_fonts = false;
        let template = DocumentTemplate::new(&branding);
        assert!(!template.stylesheet().contains("@import"));
        assert!(!template.wrap("X", "<p>x</p>").contains("googleapis"));
    }

    #[test]
    fn branding_text_is_escaped() {
        let branding = BrandingConfig {
            brand: "R&D <Lab>".into(),
            tagline: "\"quoted\"".into(),
            footer: "F".into(),
            remote_fonts: false,
        };
        let doc = DocumentTemplate::new(&branding).wrap("A<b>", "<p>body</p>");
        assert!(doc.contains("R&amp;D &lt;Lab&gt;"));
        assert!(doc.contains("&quot;quoted&quot;"));
        assert!(doc.contains("<title>A&lt;b&gt;</title>"));
        assert!(doc.contains("<p>body</p>"));
    }
}
