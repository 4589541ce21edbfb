// ABOUTME: Rich text value distinguishing plain text, HTML, XHTML and loose markup.
// ABOUTME: HTML and XHTML variants carry the base URL of their source element.

use serde::{Deserialize, Serialize};

use crate::html_utils::{collapse_whitespace, strip_html};
use crate::url::Url;

/// A text-bearing field (title, summary, content).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Text {
    /// Plain text, no markup.
    Plain(String),
    /// Raw, unsanitized HTML.
    Html { content: String, base: Option<Url> },
    /// Raw XHTML fragment.
    Xhtml { content: String, base: Option<Url> },
    /// Text which may or may not be meant as HTML; render defensively.
    Loose(String),
}

impl Text {
    pub fn plain(content: impl Into<String>) -> Self {
        Text::Plain(content.into())
    }

    pub fn html(content: impl Into<String>, base: Option<Url>) -> Self {
        Text::Html {
            content: content.into(),
            base,
        }
    }

    pub fn xhtml(content: impl Into<String>, base: Option<Url>) -> Self {
        Text::Xhtml {
            content: content.into(),
            base,
        }
    }

    pub fn loose(content: impl Into<String>) -> Self {
        Text::Loose(content.into())
    }

    /// The raw content as stored.
    pub fn as_str(&self) -> &str {
        match self {
            Text::Plain(s) | Text::Loose(s) => s,
            Text::Html { content, .. } | Text::Xhtml { content, .. } => content,
        }
    }

    /// Base URL for resolving links inside markup.
    pub fn base(&self) -> Option<&Url> {
        match self {
            Text::Html { base, .. } | Text::Xhtml { base, .. } => base.as_ref(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().trim().is_empty()
    }

    /// Plain rendering with markup stripped and whitespace collapsed.
    pub fn to_plain(&self) -> String {
        match self {
            Text::Plain(s) => collapse_whitespace(s),
            other => strip_html(other.as_str()),
        }
    }

    /// Drops empty values so resolvers can chain with `?`.
    pub(crate) fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_plain_by_variant() {
        assert_eq!(Text::plain("  a <b>  b ").to_plain(), "a <b> b");
        assert_eq!(Text::html("<p>a &amp; b</p>", None).to_plain(), "a & b");
        assert_eq!(Text::loose("a &lt; b").to_plain(), "a < b");
    }

    #[test]
    fn test_base_only_on_markup() {
        let base = Url::parse("http://example.com/").unwrap();
        assert_eq!(Text::html("x", Some(base.clone())).base(), Some(&base));
        assert_eq!(Text::plain("x").base(), None);
    }

    #[test]
    fn test_empty_is_dropped() {
        assert!(Text::plain("   ").non_empty().is_none());
        assert!(Text::plain("x").non_empty().is_some());
    }
}
