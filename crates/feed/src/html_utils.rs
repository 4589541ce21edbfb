// ABOUTME: HTML utility functions for plain-text extraction from feed markup.
// ABOUTME: Provides tag stripping over a parsed fragment and whitespace collapsing.

use scraper::{Html, Node};

/// Elements whose text never reaches the reader.
const SKIPPED: &[&str] = &["script", "style", "template", "noscript"];

/// Strips HTML tags from a string, returning plain text.
///
/// The fragment is parsed with scraper, so entities are decoded and
/// `<script>`/`<style>` bodies are dropped. This is not a sanitizer.
pub fn strip_html(s: &str) -> String {
    if !s.contains('<') && !s.contains('&') {
        return collapse_whitespace(s);
    }
    let fragment = Html::parse_fragment(s);
    let mut text = String::with_capacity(s.len());

    for node in fragment.tree.root().descendants() {
        if let Node::Text(t) = node.value() {
            let hidden = node.ancestors().any(|a| {
                a.value()
                    .as_element()
                    .is_some_and(|e| SKIPPED.contains(&e.name()))
            });
            if !hidden {
                text.push_str(t);
            }
        } else if let Node::Element(e) = node.value() {
            // block boundaries and line breaks separate words
            if matches!(e.name(), "br" | "p" | "div" | "li" | "tr" | "h1" | "h2" | "h3") {
                text.push(' ');
            }
        }
    }

    collapse_whitespace(&text)
}

/// Collapses multiple whitespace characters into single spaces.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
