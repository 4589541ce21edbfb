// ABOUTME: Document sniffing: guesses a media type from content and picks a parser family.
// ABOUTME: Declared content types win over sniffing when they name a supported family.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

use crate::error::FeedError;
use crate::mime::MimeType;

pub const XML_TYPES: &[&str] = &[
    "application/rss+xml",
    "application/rdf+xml",
    "application/atom+xml",
    "application/xml",
    "text/xml",
    "application/x-rss+xml",
    "application/x-rdf+xml",
];

pub const JSON_TYPES: &[&str] = &["application/json", "application/feed+json", "text/json"];

pub const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// How many bytes of the first tag are inspected.
const TAG_WINDOW: usize = 100;

static HTML_ROOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^<(!doctype\s+html|html|head|body)[\s>/]").expect("valid html root pattern")
});
static RSS_ROOT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^<rss[\s>/]").expect("valid rss root pattern"));
static ATOM_ROOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<([A-Za-z_][\w.\-]*:)?feed[\s>/]").expect("valid atom root pattern")
});
static RDF_ROOT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<([A-Za-z_][\w.\-]*:)?RDF[\s>/]").expect("valid rdf root pattern")
});

/// The structural parser family for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    Xml,
    Json,
    Html,
}

impl fmt::Display for ParserKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParserKind::Xml => "xml",
            ParserKind::Json => "json",
            ParserKind::Html => "html",
        };
        write!(f, "{}", s)
    }
}

/// Guesses a media type from the start of a document.
pub fn find_type_for_content(content: &str) -> &'static str {
    let trimmed = content.trim_start_matches(|c: char| c.is_whitespace() || c == '\u{feff}');
    if trimmed.starts_with("{\"")
        || (trimmed.starts_with('{') && trimmed[1..].trim_start().starts_with('"'))
    {
        return "application/json";
    }
    if trimmed.starts_with("<?xml") {
        return "application/xml";
    }
    if !trimmed.starts_with('<') {
        return "application/octet-stream";
    }

    let tag = skip_comments(trimmed);
    let window = truncate(tag, TAG_WINDOW);
    if HTML_ROOT.is_match(window) {
        "text/html"
    } else if RSS_ROOT.is_match(window) {
        "application/rss+xml"
    } else if ATOM_ROOT.is_match(window) {
        "application/atom+xml"
    } else if RDF_ROOT.is_match(window) {
        "application/rdf+xml"
    } else {
        "application/xml"
    }
}

fn skip_comments(mut s: &str) -> &str {
    while let Some(rest) = s.strip_prefix("<!--") {
        match rest.find("-->") {
            Some(end) => s = rest[end + 3..].trim_start(),
            None => return "",
        }
    }
    s
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Maps a declared media type to a parser family.
///
/// Returns `Ok(None)` when the type does not parse at all, leaving the
/// caller to sniff the content instead.
pub fn find_parser_for_type(content_type: &str) -> Result<Option<ParserKind>, FeedError> {
    let Some(mime) = MimeType::parse(content_type) else {
        return Ok(None);
    };
    let essence = mime.essence();
    let families = [
        (XML_TYPES, ParserKind::Xml),
        (JSON_TYPES, ParserKind::Json),
        (HTML_TYPES, ParserKind::Html),
    ];
    families
        .iter()
        .find(|(types, _)| types.contains(&essence.as_str()))
        .map(|(_, kind)| Some(*kind))
        .ok_or_else(|| FeedError::not_supported(essence))
}

/// Picks the parser for a document, preferring the declared type.
pub fn select_parser(content: &str, declared: Option<&str>) -> Result<ParserKind, FeedError> {
    if let Some(declared) = declared {
        if let Some(kind) = find_parser_for_type(declared)? {
            tracing::debug!(%kind, declared, "parser chosen from declared type");
            return Ok(kind);
        }
    }
    let sniffed = find_type_for_content(content);
    match find_parser_for_type(sniffed)? {
        Some(kind) => {
            tracing::debug!(%kind, sniffed, "parser chosen from content");
            Ok(kind)
        }
        None => Err(FeedError::not_supported(sniffed)),
    }
}
