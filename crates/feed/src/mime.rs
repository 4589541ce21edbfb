// ABOUTME: Media type parsing with strict, loose (heuristic) and Atom-specific entry points.
// ABOUTME: Provides MimeType with essence comparison, parameters and file-extension sniffing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::url::Url;

/// Bare medium tokens accepted by [`MimeType::parse_loose`], with their remaps.
const MEDIA: &[(&str, &str)] = &[
    ("audio", "audio"),
    ("video", "video"),
    ("image", "image"),
    ("text", "text"),
    ("application", "application"),
    ("document", "text"),
    ("executable", "application"),
];

/// File extension to media type.
const EXTENSIONS: &[(&str, &str)] = &[
    ("aac", "audio/aac"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("m4b", "audio/mp4"),
    ("mp3", "audio/mpeg"),
    ("oga", "audio/ogg"),
    ("ogg", "audio/ogg"),
    ("opus", "audio/opus"),
    ("wav", "audio/wav"),
    ("weba", "audio/webm"),
    ("avi", "video/x-msvideo"),
    ("m4v", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("mov", "video/quicktime"),
    ("mp4", "video/mp4"),
    ("mpeg", "video/mpeg"),
    ("mpg", "video/mpeg"),
    ("ogv", "video/ogg"),
    ("webm", "video/webm"),
    ("avif", "image/avif"),
    ("bmp", "image/bmp"),
    ("gif", "image/gif"),
    ("ico", "image/vnd.microsoft.icon"),
    ("jpeg", "image/jpeg"),
    ("jpg", "image/jpeg"),
    ("png", "image/png"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("epub", "application/epub+zip"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("torrent", "application/x-bittorrent"),
    ("xml", "application/xml"),
    ("zip", "application/zip"),
    ("htm", "text/html"),
    ("html", "text/html"),
    ("txt", "text/plain"),
];

/// A media type: `type/subtype` plus ordered parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MimeType {
    type_: String,
    subtype: String,
    params: Vec<(String, String)>,
}

impl MimeType {
    /// Builds a media type from already-valid parts.
    fn new(type_: &str, subtype: &str) -> Self {
        Self {
            type_: type_.to_ascii_lowercase(),
            subtype: subtype.to_ascii_lowercase(),
            params: Vec::new(),
        }
    }

    /// Strict `type "/" subtype *( ";" parameter )` parse.
    ///
    /// Returns `None` when the input does not match the grammar.
    pub fn parse(input: &str) -> Option<MimeType> {
        let mut parts = split_params(input.trim())?.into_iter();
        let essence = parts.next()?;
        let (type_, subtype) = essence.trim().split_once('/')?;
        if !is_token(type_) || !is_token(subtype) {
            return None;
        }
        let mut mime = MimeType::new(type_, subtype);
        for raw in parts {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let (name, value) = raw.split_once('=')?;
            let name = name.trim_end();
            if !is_token(name) {
                return None;
            }
            let value = value.trim_start();
            let value = if value.starts_with('"') {
                unquote(value)?
            } else if is_token(value) {
                value.to_string()
            } else {
                return None;
            };
            let name = name.to_ascii_lowercase();
            // the first occurrence of a parameter wins
            if mime.param(&name).is_none() {
                mime.params.push((name, value));
            }
        }
        Some(mime)
    }

    /// Heuristic parse for media types found in the wild.
    ///
    /// Tries the strict grammar, then bare medium names such as `audio`,
    /// then the file extension of `url`, then the media type of a `data:`
    /// URL.
    pub fn parse_loose(input: &str, url: Option<&Url>) -> Option<MimeType> {
        if let Some(mime) = MimeType::parse(input) {
            return Some(mime);
        }
        let token = input.trim().to_ascii_lowercase();
        if let Some((_, medium)) = MEDIA.iter().find(|(name, _)| *name == token) {
            return Some(MimeType::new(medium, "unknown"));
        }
        url.and_then(MimeType::from_url)
    }

    /// Interprets an Atom `type` attribute.
    pub fn parse_atom(input: &str) -> MimeType {
        match input.trim().to_ascii_lowercase().as_str() {
            "" | "text" => MimeType::new("text", "plain"),
            "html" => MimeType::new("text", "html"),
            "xhtml" => MimeType::new("application", "xhtml+xml"),
            _ => MimeType::parse(input).unwrap_or_else(|| MimeType::new("unknown", "unknown")),
        }
    }

    /// Sniffs a media type from a URL's file extension or `data:` prefix.
    pub fn from_url(url: &Url) -> Option<MimeType> {
        if url.scheme() == "data" {
            let path = url.path();
            let header = path.split_once(',').map_or(path, |(h, _)| h);
            let header = header
                .strip_suffix(";base64")
                .unwrap_or(header)
                .replace("%20", " ");
            return Some(MimeType::parse(&header).unwrap_or_else(|| MimeType::new("text", "plain")));
        }
        let segment = url.path().rsplit('/').next()?;
        let (_, ext) = segment.rsplit_once('.')?;
        let ext = ext.to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(e, _)| *e == ext)
            .and_then(|(_, mime)| MimeType::parse(mime))
    }

    pub fn type_(&self) -> &str {
        &self.type_
    }

    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// Lower-cased `type/subtype`.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.type_, self.subtype)
    }

    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    /// True for `*/xml` and `*/*+xml`.
    pub fn is_xml(&self) -> bool {
        self.subtype == "xml" || self.subtype.ends_with("+xml")
    }

    pub fn is_html(&self) -> bool {
        self.type_ == "text" && self.subtype == "html"
    }

    pub fn is_xhtml(&self) -> bool {
        self.type_ == "application" && self.subtype == "xhtml+xml"
    }

    pub fn is_text(&self) -> bool {
        self.type_ == "text"
    }

    pub fn is_json(&self) -> bool {
        self.subtype == "json" || self.subtype.ends_with("+json")
    }

    /// Top-level type, e.g. `audio`.
    pub fn medium(&self) -> &str {
        &self.type_
    }

    /// True when the essences are equal.
    pub fn same_essence(&self, other: &MimeType) -> bool {
        self.type_ == other.type_ && self.subtype == other.subtype
    }
}

impl fmt::Display for MimeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_, self.subtype)?;
        for (name, value) in &self.params {
            if is_token(value) {
                write!(f, ";{}={}", name, value)?;
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, ";{}=\"{}\"", name, escaped)?;
            }
        }
        Ok(())
    }
}

impl FromStr for MimeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MimeType::parse(s).ok_or_else(|| format!("invalid media type: {}", s))
    }
}

impl Serialize for MimeType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MimeType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// RFC 7230 `tchar`.
fn is_tchar(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

pub(crate) fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_tchar)
}

/// Splits on `;` outside quoted strings; `None` for an unterminated quote.
fn split_params(input: &str) -> Option<Vec<&str>> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            ';' if !quoted => {
                parts.push(&input[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if quoted {
        return None;
    }
    parts.push(&input[start..]);
    Some(parts)
}

/// Decodes an HTTP quoted-string; `None` if anything follows the closing quote.
pub(crate) fn unquote(value: &str) -> Option<String> {
    let mut chars = value.chars();
    if chars.next() != Some('"') {
        return None;
    }
    let mut out = String::new();
    while let Some(c) = chars.next() {
        match c {
            '\\' => out.push(chars.next()?),
            '"' => {
                return if chars.as_str().trim().is_empty() {
                    Some(out)
                } else {
                    None
                };
            }
            _ => out.push(c),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strict_parse() {
        let mime = MimeType::parse("Text/HTML; Charset=\"utf-8\"; charset=latin1").unwrap();
        assert_eq!(mime.essence(), "text/html");
        assert_eq!(mime.param("charset"), Some("utf-8"));
        assert_eq!(mime.params().len(), 1);
        assert_eq!(mime.to_string(), "text/html;charset=utf-8");
    }

    #[test]
    fn test_strict_parse_rejects_bad_input() {
        assert!(MimeType::parse("audio").is_none());
        assert!(MimeType::parse("text/ html").is_none());
        assert!(MimeType::parse("text/html; charset").is_none());
        assert!(MimeType::parse("text/html; q=\"open").is_none());
        assert!(MimeType::parse("").is_none());
    }

    #[test]
    fn test_loose_medium_tokens() {
        assert_eq!(
            MimeType::parse_loose("audio", None).unwrap().essence(),
            "audio/unknown"
        );
        assert_eq!(
            MimeType::parse_loose("document", None).unwrap().essence(),
            "text/unknown"
        );
        assert_eq!(
            MimeType::parse_loose("executable", None).unwrap().essence(),
            "application/unknown"
        );
    }

    #[test]
    fn test_loose_extension_sniffing() {
        let url = Url::parse("http://example.com/ep/Show.MP3?x=1").unwrap();
        assert_eq!(
            MimeType::parse_loose("", Some(&url)).unwrap().essence(),
            "audio/mpeg"
        );
        let url = Url::parse("http://example.com/ep/show").unwrap();
        assert!(MimeType::parse_loose("bogus", Some(&url)).is_none());
    }

    #[test]
    fn test_loose_data_url() {
        let url = Url::parse("data:image/png;base64,iVBORw0KGgo=").unwrap();
        assert_eq!(
            MimeType::parse_loose("", Some(&url)).unwrap().essence(),
            "image/png"
        );
        let url = Url::parse("data:,hello").unwrap();
        assert_eq!(
            MimeType::parse_loose("", Some(&url)).unwrap().essence(),
            "text/plain"
        );
    }

    #[test]
    fn test_atom_types() {
        assert_eq!(MimeType::parse_atom("").essence(), "text/plain");
        assert_eq!(MimeType::parse_atom("HTML").essence(), "text/html");
        assert_eq!(MimeType::parse_atom("xhtml").essence(), "application/xhtml+xml");
        assert_eq!(MimeType::parse_atom("image/svg+xml").essence(), "image/svg+xml");
        assert_eq!(MimeType::parse_atom("garbage").essence(), "unknown/unknown");
    }
}
