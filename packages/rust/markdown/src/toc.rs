//! Table-of-contents extraction from rendered HTML.
//!
//! Headings are read back from the rendered HTML so the links always match
//! the ids actually present, including the `-1`, `-2` suffixes on repeated
//! headings across concatenated fragments.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

use crate::escape_html;

/// A single heading in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    /// Heading level, 1–6.
    pub level: u8,
    /// Heading text.
    pub title: String,
    /// Fragment id the heading can be linked by.
    pub anchor: String,
}

static HEADING_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1, h2, h3, h4, h5, h6").expect("valid selector"));
static ANCHOR_SEL: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[id]").expect("valid selector"));

/// Collect every heading that carries an anchor.
pub fn table_of_contents(html: &str) -> Vec<TocEntry> {
    let doc = Html::parse_fragment(html);

    doc.select(&HEADING_SEL)
        .filter_map(|heading| {
            let anchor = heading_anchor(&heading)?;
            let level = heading.value().name()[1..].parse::<u8>().ok()?;
            let title = heading.text().collect::<String>().trim().to_string();
            (!title.is_empty()).then_some(TocEntry {
                level,
                title,
                anchor,
            })
        })
        .collect()
}

/// comrak puts the id on an inner `<a>`; an id on the heading itself is accepted too.
fn heading_anchor(heading: &ElementRef) -> Option<String> {
    if let Some(id) = heading.value().attr("id") {
        return Some(id.to_string());
    }
    heading
        .select(&ANCHOR_SEL)
        .next()
        .and_then(|a| a.value().attr("id"))
        .map(str::to_string)
}

/// Render entries as nested `<ul>` lists inside `<div class="toc">`.
pub fn render_toc(entries: &[TocEntry]) -> String {
    let mut html = String::from("<div class=\"toc\">\n");
    let mut open_levels: Vec<u8> = Vec::new();

    for entry in entries {
        while open_levels.last().is_some_and(|&top| top > entry.level) {
            html.push_str("</li>\n</ul>\n");
            open_levels.pop();
        }
        match open_levels.last() {
            Some(&top) if top == entry.level => html.push_str("</li>\n"),
            _ => {
                html.push_str("<ul>\n");
                open_levels.push(entry.level);
            }
        }
        html.push_str(&format!(
            "<li><a href=\"#{}\">{}</a>",
            escape_html(&entry.anchor),
            escape_html(&entry.title)
        ));
    }
    for _ in open_levels {
        html.push_str("</li>\n</ul>\n");
    }

    html.push_str("</div>");
    html
}
