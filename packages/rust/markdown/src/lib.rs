//! Markdown-to-HTML transformation for assembled documents.
//!
//! Wraps `comrak` with the extension set the print templates expect:
//! GFM tables, fenced code with `language-*` class hooks, heading anchors,
//! strikethrough, task lists, autolinks and footnotes. A paragraph
//! containing only `[TOC]` is replaced by a generated table of contents.
//!
//! Raw HTML inside fragments is escaped and shows up as text, so nothing
//! embedded in the knowledge base runs in the headless browser.

mod toc;

use tracing::{debug, instrument};

pub use toc::{TocEntry, render_toc, table_of_contents};

/// Paragraph marker replaced by the generated table of contents.
pub const TOC_MARKER: &str = "<p>[TOC]</p>";

/// Convert markdown to an HTML fragment.
///
/// Deterministic and side-effect free. Empty input yields an empty string;
/// callers that must not render empty documents check before calling.
#[instrument(skip_all, fields(input_len = markdown.len()))]
pub fn to_html(markdown: &str) -> String {
    if markdown.is_empty() {
        return String::new();
    }

    let mut options = comrak::Options::default();
    options.extension.table = true;
    options.extension.strikethrough = true;
    options.extension.tasklist = true;
    options.extension.autolink = true;
    options.extension.footnotes = true;
    options.extension.header_ids = Some(String::new());
    options.render.escape = true;

    let mut html = comrak::markdown_to_html(markdown, &options);

    if html.contains(TOC_MARKER) {
        let entries = table_of_contents(&html);
        debug!(headings = entries.len(), "expanding [TOC] marker");
        html = html.replace(TOC_MARKER, &render_toc(&entries));
    }

    debug!(output_len = html.len(), "markdown converted");
    html
}

/// Escape text for use in HTML element content or a quoted attribute.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    // Writing into a String cannot fail.
    let _ = comrak::html::escape(&mut out, text);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_yields_empty_output() {
        assert_eq!(to_html(""), "");
    }

    #[test]
    fn renders_gfm_tables() {
        let md = "| Food | Verdict |\n|------|---------|\n| Seed oil | Avoid |\n| Eggs | Eat |\n";
        let html = to_html(md);
        assert!(html.contains("<table>"));
        assert!(html.contains("<th>Food</th>"));
        assert!(html.contains("<td>Seed oil</td>"));
    }

    #[test]
    fn fenced_code_gets_language_class() {
        let md = "```python\nprint('hi')\n```\n";
        let html = to_html(md);
        assert!(html.contains("<pre>"));
        assert!(html.contains(r#"class="language-python""#));
    }

    #[test]
    fn raw_html_is_escaped_as_text() {
        let md = "Before\n\n<script>alert(1)</script>\n\nAfter <b onclick=\"x()\">bold</b>\n";
        let html = to_html(md);
        assert!(!html.contains("<script>"));
        assert!(!html.contains("<b "));
        assert!(html.contains("&lt;script&gt;alert(1)&lt;/script&gt;"));
        assert!(html.contains("After"));
    }

    #[test]
    fn ordered_and_bullet_lists_do_not_merge() {
        let md = "1. one\n2. two\n\n- dot\n- dot\n";
        let html = to_html(md);
        assert!(html.contains("<ol>"));
        assert!(html.contains("<ul>"));
    }

    #[test]
    fn ordered_list_start_is_honoured() {
        let html = to_html("3. three\n4. four\n");
        assert!(html.contains(r#"<ol start="3">"#));
    }

    #[test]
    fn tight_lists_have_no_paragraphs() {
        let html = to_html("- a\n- b\n");
        assert!(!html.contains("<p>"));
    }

    #[test]
    fn horizontal_rule_separator_renders() {
        let html = to_html("first\n\n---\n\nsecond\n\n---\n\n");
        assert_eq!(html.matches("<hr />").count(), 2);
    }

    #[test]
    fn toc_marker_is_expanded() {
        let md = "[TOC]\n\n# Intro\n\n## Setup\n\n# Usage\n";
        let html = to_html(md);
        assert!(!html.contains("[TOC]"));
        assert!(html.contains(r#"<div class="toc">"#));
        assert!(html.contains("<li><a href=\"#intro\">Intro</a>"));
        assert!(html.contains("<li><a href=\"#setup\">Setup</a>"));
        assert!(html.contains("<li><a href=\"#usage\">Usage</a>"));
        assert!(html.contains(r#"id="intro""#));
    }

    #[test]
    fn headings_carry_deduplicated_anchors() {
        let html = to_html("# Summary\n\n# Summary\n\n## Salt & Sugar\n");
        let anchors: Vec<String> = table_of_contents(&html)
            .into_iter()
            .map(|e| e.anchor)
            .collect();
        assert_eq!(anchors, ["summary", "summary-1", "salt--sugar"]);
    }

    #[test]
    fn document_without_toc_marker_has_no_toc() {
        let html = to_html("# Intro\n\ntext\n");
        assert!(!html.contains("class=\"toc\""));
    }

    #[test]
    fn conversion_is_deterministic() {
        let md = "# Title\n\n| a | b |\n|---|---|\n| 1 | 2 |\n\n```rust\nfn main() {}\n```\n";
        assert_eq!(to_html(md), to_html(md));
    }

    #[test]
    fn escape_html_covers_markup_characters() {
        assert_eq!(
            escape_html(r#"<Tom & "Jerry">"#),
            "&lt;Tom &amp; &quot;Jerry&quot;&gt;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }
}
