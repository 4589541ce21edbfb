// ABOUTME: Builds Metadata from an HTTP response's status and headers.
// ABOUTME: Parses caching headers, validated dates and RFC 8288 Link headers.

use percent_encoding::percent_decode_str;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::date::Date;
use crate::mime::{unquote, MimeType};
use crate::models::{Link, LinkCollection, Metadata};
use crate::url::Url;

/// Read access to a response, as exposed by HTTP client libraries.
pub trait HttpMessage {
    fn status(&self) -> u16;

    /// All values of a header in order; names compare case-insensitively.
    fn header_values(&self, name: &str) -> Vec<&str>;

    fn header(&self, name: &str) -> Option<&str> {
        self.header_values(name).into_iter().next()
    }
}

/// A plain response value for callers without their own message type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
}

impl HttpResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl HttpMessage for HttpResponse {
    fn status(&self) -> u16 {
        self.status
    }

    fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// Builds transport metadata for a response fetched from `url`.
pub fn parse_metadata(message: &impl HttpMessage, url: &str) -> Metadata {
    let base = Url::parse(url).ok();
    let mut links = LinkCollection::new();
    for value in message.header_values("link") {
        links.extend(parse_link_header(value, base.as_ref()));
    }
    links.dedup();

    Metadata {
        cached: message.status() == 304,
        mime: message.header("content-type").and_then(MimeType::parse),
        date: header_date(message, "date"),
        expires: header_date(message, "expires"),
        last_modified: header_date(message, "last-modified"),
        etag: message
            .header("etag")
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .map(str::to_string),
        age: message
            .header("age")
            .and_then(|a| a.trim().parse::<u64>().ok())
            .map(Duration::from_secs),
        max_age: max_age(message),
        links,
        url: base,
    }
}

/// A date header, discarded when its weekday does not match its date.
fn header_date(message: &impl HttpMessage, name: &str) -> Option<Date> {
    let value = message.header(name)?;
    let date = Date::parse(value);
    if date.is_none() {
        tracing::debug!(header = name, value, "rejected http date");
    }
    date
}

/// The smaller of `max-age` and `s-maxage`, whichever are present.
fn max_age(message: &impl HttpMessage) -> Option<Duration> {
    let mut max_age = None;
    let mut s_maxage = None;
    for value in message.header_values("cache-control") {
        for directive in split_unquoted(value, ',') {
            let (name, arg) = match directive.split_once('=') {
                Some((n, a)) => (n.trim(), Some(a.trim())),
                None => (directive.trim(), None),
            };
            let slot = if name.eq_ignore_ascii_case("max-age") {
                &mut max_age
            } else if name.eq_ignore_ascii_case("s-maxage") {
                &mut s_maxage
            } else {
                continue;
            };
            let seconds = arg
                .map(|a| unquote(a).unwrap_or_else(|| a.to_string()))
                .and_then(|a| a.parse::<u64>().ok());
            match seconds {
                Some(s) if slot.is_none() => *slot = Some(s),
                Some(_) => {}
                None => tracing::debug!(directive, "unparseable cache-control directive"),
            }
        }
    }
    match (max_age, s_maxage) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
    .map(Duration::from_secs)
}

/// Splits on `sep` outside quoted strings and `<...>` references.
fn split_unquoted(input: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    let mut escaped = false;
    let mut bracketed = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if quoted => escaped = true,
            '"' if !bracketed => quoted = !quoted,
            '<' if !quoted => bracketed = true,
            '>' if !quoted => bracketed = false,
            c if c == sep && !quoted && !bracketed => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&input[start..]);
    parts.into_iter().filter(|p| !p.trim().is_empty()).collect()
}

/// Decodes an RFC 8187 `ext-value` (`charset'lang'pct-encoded`).
fn decode_ext_value(value: &str) -> Option<(String, Option<String>)> {
    let mut parts = value.splitn(3, '\'');
    let charset = parts.next()?.trim().to_ascii_lowercase();
    let lang = parts.next()?.trim();
    let encoded = parts.next()?;
    let bytes: Vec<u8> = percent_decode_str(encoded).collect();
    let text = match charset.as_str() {
        "utf-8" => String::from_utf8(bytes).ok()?,
        "iso-8859-1" => bytes.into_iter().map(char::from).collect(),
        _ => return None,
    };
    let lang = (!lang.is_empty()).then(|| lang.to_string());
    Some((text, lang))
}

/// Parses one `Link` header value into links, one per relation type.
pub fn parse_link_header(value: &str, base: Option<&Url>) -> Vec<Link> {
    let mut out = Vec::new();
    for link_value in split_unquoted(value, ',') {
        let link_value = link_value.trim();
        let Some(rest) = link_value.strip_prefix('<') else {
            continue;
        };
        let Some((target, params)) = rest.split_once('>') else {
            continue;
        };
        let Some(url) = Url::resolve_opt(target.trim(), base) else {
            continue;
        };

        let mut attrs: BTreeMap<String, String> = BTreeMap::new();
        for param in split_unquoted(params, ';') {
            let (name, raw) = match param.split_once('=') {
                Some((n, v)) => (n.trim(), v.trim()),
                None => (param.trim(), ""),
            };
            if name.is_empty() {
                continue;
            }
            let value = if raw.starts_with('"') {
                match unquote(raw) {
                    Some(v) => v,
                    None => continue,
                }
            } else {
                raw.to_string()
            };
            // the first occurrence of a parameter wins
            attrs.entry(name.to_ascii_lowercase()).or_insert(value);
        }

        let rel = attrs.remove("rel");
        let rev = attrs.remove("rev");
        let anchor = attrs.remove("anchor").and_then(|a| Url::resolve_opt(&a, base));
        let mime = attrs.remove("type").and_then(|t| MimeType::parse(&t));
        let media = attrs.remove("media");
        let hreflang = attrs.remove("hreflang");
        let plain_title = attrs.remove("title");
        let ext_title = attrs.remove("title*").and_then(|t| decode_ext_value(&t));
        let (title, title_lang) = match ext_title {
            Some((text, lang)) => (Some(text), lang),
            None => (plain_title, None),
        };

        let template = Link {
            anchor,
            mime,
            title,
            lang: hreflang.or(title_lang),
            media,
            attr: attrs,
            ..Link::new(String::new(), url)
        };
        let relations = [(rel, false), (rev, true)];
        for (list, reverse) in relations {
            for token in list.iter().flat_map(|l| l.split_whitespace()) {
                if let Some(rel) = Link::normalize_rel(token, base) {
                    out.push(Link {
                        rel,
                        rev: reverse,
                        ..template.clone()
                    });
                }
            }
        }
    }
    out
}
