// ABOUTME: Immutable RFC 3986 URL value type with reference resolution and normalization.
// ABOUTME: Canonicalizes percent-encoding, IDNA hosts, IPv6 literals, default ports and dot segments.

//! URL model.
//!
//! Every [`Url`] is absolute and normalized on construction:
//!
//! - scheme and host are lower-cased;
//! - percent-encoded unreserved bytes are decoded, other escapes upper-cased,
//!   and bytes not allowed in a component are escaped;
//! - hosts go through IDNA to-ASCII and back to Unicode, IPv6 literals are
//!   compressed;
//! - default ports of known schemes are dropped;
//! - dot segments are removed from hierarchical paths.
//!
//! Normalization is a fixed point: `Url::parse(&u.to_string()) == Ok(u)`.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// RFC 3986 Appendix B.
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("valid reference pattern")
});

static SCHEME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("valid scheme pattern"));

/// Characters escaped in every component (besides `%`, which is handled separately).
const COMMON: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'\\')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}')
    .add(b'[')
    .add(b']')
    .add(b'#');

const PATH: &AsciiSet = &COMMON.add(b'?');
const QUERY: &AsciiSet = COMMON;
const FRAGMENT: &AsciiSet = COMMON;
const USERINFO: &AsciiSet = &PATH.add(b'/').add(b'@').add(b':');

const DEFAULT_PORTS: &[(&str, u16)] = &[
    ("http", 80),
    ("https", 443),
    ("ws", 80),
    ("wss", 443),
    ("ftp", 21),
    ("gopher", 70),
];

/// Schemes whose empty path is equivalent to `/`.
const SLASH_SCHEMES: &[&str] = &["http", "https", "ws", "wss", "ftp"];

/// Errors raised when constructing a URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlError {
    /// The input cannot be parsed, or it is relative with no usable base.
    #[error("invalid URL: {0}")]
    InvalidArgument(String),
}

impl UrlError {
    fn invalid(input: impl Into<String>) -> Self {
        UrlError::InvalidArgument(input.into())
    }
}

/// Authority component: user information, host and port.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct Authority {
    user: Option<String>,
    pass: Option<String>,
    host: String,
    port: Option<u16>,
}

/// A parsed, normalized, possibly relative reference.
#[derive(Debug, Clone, Default)]
struct Reference {
    scheme: Option<String>,
    authority: Option<Authority>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

/// An absolute, normalized URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Url {
    scheme: String,
    authority: Option<Authority>,
    path: String,
    query: Option<String>,
    fragment: Option<String>,
}

impl Url {
    /// Parses an absolute URL.
    pub fn parse(input: &str) -> Result<Url, UrlError> {
        Self::parse_with_base(input, None)
    }

    /// Parses a URL reference, resolving it against `base` when it is relative.
    pub fn parse_with_base(input: &str, base: Option<&str>) -> Result<Url, UrlError> {
        let reference = parse_reference(input)?;
        if reference.scheme.is_some() {
            return Ok(Url::from_reference(reference));
        }
        match base {
            Some(base) => {
                let base = Url::parse(base)?;
                Ok(base.resolve_reference(reference))
            }
            None => Err(UrlError::invalid(input)),
        }
    }

    /// Resolves a reference against this URL.
    pub fn join(&self, reference: &str) -> Result<Url, UrlError> {
        let reference = parse_reference(reference)?;
        Ok(self.resolve_reference(reference))
    }

    pub fn resolve(&self, reference: &str) -> Option<Url> {
        self.join(reference).ok()
    }

    /// Resolves `input` against an optional base, returning `None` on any failure.
    ///
    /// This is the lookup helper used by field resolvers, where a bad URL
    /// simply means an absent value.
    pub fn resolve_opt(input: &str, base: Option<&Url>) -> Option<Url> {
        let input = input.trim();
        if input.is_empty() && base.is_none() {
            return None;
        }
        match base {
            Some(base) => base.join(input).ok(),
            None => Url::parse(input).ok(),
        }
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user(&self) -> Option<&str> {
        self.authority.as_ref().and_then(|a| a.user.as_deref())
    }

    pub fn pass(&self) -> Option<&str> {
        self.authority.as_ref().and_then(|a| a.pass.as_deref())
    }

    /// Host, or `None` when the URL has no authority.
    pub fn host(&self) -> Option<&str> {
        self.authority.as_ref().map(|a| a.host.as_str())
    }

    /// Explicit, non-default port.
    pub fn port(&self) -> Option<u16> {
        self.authority.as_ref().and_then(|a| a.port)
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn fragment(&self) -> Option<&str> {
        self.fragment.as_deref()
    }

    /// Serialized authority (`user:pass@host:port`), if any.
    pub fn authority(&self) -> Option<String> {
        self.authority.as_ref().map(|a| a.to_string())
    }

    /// True when both URLs share scheme and authority.
    pub fn same_origin(&self, other: &Url) -> bool {
        self.scheme == other.scheme && self.authority == other.authority
    }

    pub fn with_scheme(&self, scheme: &str) -> Result<Url, UrlError> {
        if !SCHEME.is_match(scheme) {
            return Err(UrlError::invalid(scheme));
        }
        let mut out = self.clone();
        out.scheme = scheme.to_ascii_lowercase();
        Ok(out.finish())
    }

    pub fn with_user_info(&self, user: Option<&str>, pass: Option<&str>) -> Result<Url, UrlError> {
        let mut out = self.clone();
        let authority = out
            .authority
            .as_mut()
            .ok_or_else(|| UrlError::invalid("URL has no authority"))?;
        authority.user = user.map(|u| normalize_component(u, USERINFO));
        authority.pass = match authority.user {
            Some(_) => pass.map(|p| normalize_component(p, USERINFO)),
            None => None,
        };
        Ok(out)
    }

    /// Replaces the host; `None` removes the whole authority.
    pub fn with_host(&self, host: Option<&str>) -> Result<Url, UrlError> {
        let mut out = self.clone();
        match host {
            Some(host) => {
                let host = normalize_host(host)?;
                if !out.path.is_empty() && !out.path.starts_with('/') {
                    return Err(UrlError::invalid(out.path));
                }
                out.authority.get_or_insert_with(Authority::default).host = host;
            }
            None => {
                if out.path.starts_with("//") {
                    return Err(UrlError::invalid(out.path));
                }
                out.authority = None;
            }
        }
        Ok(out.finish())
    }

    pub fn with_port(&self, port: Option<u16>) -> Result<Url, UrlError> {
        let mut out = self.clone();
        let authority = out
            .authority
            .as_mut()
            .ok_or_else(|| UrlError::invalid("URL has no authority"))?;
        authority.port = port;
        Ok(out.finish())
    }

    pub fn with_path(&self, path: &str) -> Result<Url, UrlError> {
        let path = normalize_component(path, PATH);
        if self.authority.is_some() && !path.is_empty() && !path.starts_with('/') {
            return Err(UrlError::invalid(path));
        }
        if self.authority.is_none() && path.starts_with("//") {
            return Err(UrlError::invalid(path));
        }
        let mut out = self.clone();
        out.path = path;
        Ok(out.finish())
    }

    pub fn with_query(&self, query: Option<&str>) -> Url {
        let mut out = self.clone();
        out.query = query.map(|q| normalize_component(q, QUERY));
        out
    }

    pub fn with_fragment(&self, fragment: Option<&str>) -> Url {
        let mut out = self.clone();
        out.fragment = fragment.map(|f| normalize_component(f, FRAGMENT));
        out
    }

    fn from_reference(reference: Reference) -> Url {
        let scheme = reference.scheme.unwrap_or_default();
        let hierarchical = reference.authority.is_some() || reference.path.starts_with('/');
        let path = if hierarchical {
            remove_dot_segments(&reference.path)
        } else {
            reference.path
        };
        Url {
            scheme,
            authority: reference.authority,
            path,
            query: reference.query,
            fragment: reference.fragment,
        }
        .finish()
    }

    /// RFC 3986 §5.2.2.
    fn resolve_reference(&self, r: Reference) -> Url {
        if r.scheme.is_some() {
            return Url::from_reference(r);
        }
        let (authority, path, query) = if r.authority.is_some() {
            (r.authority, remove_dot_segments(&r.path), r.query)
        } else if r.path.is_empty() {
            (
                self.authority.clone(),
                self.path.clone(),
                r.query.or_else(|| self.query.clone()),
            )
        } else if r.path.starts_with('/') {
            (self.authority.clone(), remove_dot_segments(&r.path), r.query)
        } else {
            let merged = self.merge_path(&r.path);
            (self.authority.clone(), remove_dot_segments(&merged), r.query)
        };
        Url {
            scheme: self.scheme.clone(),
            authority,
            path,
            query,
            fragment: r.fragment,
        }
        .finish()
    }

    fn merge_path(&self, relative: &str) -> String {
        if self.authority.is_some() && self.path.is_empty() {
            return format!("/{}", relative);
        }
        match self.path.rfind('/') {
            Some(idx) => format!("{}{}", &self.path[..=idx], relative),
            None => relative.to_string(),
        }
    }

    /// Applies scheme-dependent normalization.
    fn finish(mut self) -> Url {
        if let Some(authority) = self.authority.as_mut() {
            let default = DEFAULT_PORTS
                .iter()
                .find(|(scheme, _)| *scheme == self.scheme)
                .map(|(_, port)| *port);
            if authority.port.is_some() && authority.port == default {
                authority.port = None;
            }
            if self.path.is_empty() && SLASH_SCHEMES.contains(&self.scheme.as_str()) {
                self.path.push('/');
            }
        }
        self
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref user) = self.user {
            f.write_str(user)?;
            if let Some(ref pass) = self.pass {
                write!(f, ":{}", pass)?;
            }
            f.write_str("@")?;
        }
        f.write_str(&self.host)?;
        if let Some(port) = self.port {
            write!(f, ":{}", port)?;
        }
        Ok(())
    }
}

impl fmt::Display for Url {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.scheme)?;
        match self.authority {
            Some(ref authority) => write!(f, "//{}", authority)?,
            // keep a `//` path from reading back as an authority
            None if self.path.starts_with("//") => f.write_str("/.")?,
            None => {}
        }
        f.write_str(&self.path)?;
        if let Some(ref query) = self.query {
            write!(f, "?{}", query)?;
        }
        if let Some(ref fragment) = self.fragment {
            write!(f, "#{}", fragment)?;
        }
        Ok(())
    }
}

impl FromStr for Url {
    type Err = UrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Url::parse(s)
    }
}

impl Serialize for Url {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Url {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Url::parse(&s).map_err(serde::de::Error::custom)
    }
}

fn parse_reference(input: &str) -> Result<Reference, UrlError> {
    let trimmed = input.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control());
    let caps = REFERENCE
        .captures(trimmed)
        .ok_or_else(|| UrlError::invalid(input))?;

    let scheme = match caps.get(1) {
        Some(m) if SCHEME.is_match(m.as_str()) => Some(m.as_str().to_ascii_lowercase()),
        Some(_) => return Err(UrlError::invalid(input)),
        None => None,
    };
    let authority = caps.get(2).map(|m| parse_authority(m.as_str())).transpose()?;
    let raw_path = caps.get(3).map_or("", |m| m.as_str());
    if authority.is_none() && scheme.is_none() {
        // a relative-path reference cannot have a colon in its first segment
        let first = raw_path.split('/').next().unwrap_or("");
        if first.contains(':') {
            return Err(UrlError::invalid(input));
        }
    }

    Ok(Reference {
        scheme,
        authority,
        path: normalize_component(raw_path, PATH),
        query: caps.get(4).map(|m| normalize_component(m.as_str(), QUERY)),
        fragment: caps.get(5).map(|m| normalize_component(m.as_str(), FRAGMENT)),
    })
}

fn parse_authority(raw: &str) -> Result<Authority, UrlError> {
    let (userinfo, hostport) = match raw.rfind('@') {
        Some(idx) => (Some(&raw[..idx]), &raw[idx + 1..]),
        None => (None, raw),
    };
    let (user, pass) = match userinfo {
        Some(info) => match info.split_once(':') {
            Some((u, p)) => (
                Some(normalize_component(u, USERINFO)),
                Some(normalize_component(p, USERINFO)),
            ),
            None => (Some(normalize_component(info, USERINFO)), None),
        },
        None => (None, None),
    };

    let (host, port) = if hostport.starts_with('[') {
        let end = hostport.find(']').ok_or_else(|| UrlError::invalid(raw))?;
        let rest = &hostport[end + 1..];
        let port = match rest.strip_prefix(':') {
            Some(p) => p,
            None if rest.is_empty() => "",
            None => return Err(UrlError::invalid(raw)),
        };
        (&hostport[..=end], port)
    } else {
        match hostport.rfind(':') {
            Some(idx) => (&hostport[..idx], &hostport[idx + 1..]),
            None => (hostport, ""),
        }
    };

    let port = if port.is_empty() {
        None
    } else if port.bytes().all(|b| b.is_ascii_digit()) {
        Some(port.parse::<u16>().map_err(|_| UrlError::invalid(raw))?)
    } else {
        return Err(UrlError::invalid(raw));
    };

    Ok(Authority {
        user,
        pass,
        host: normalize_host(host)?,
        port,
    })
}

/// IDNA round trip plus IP literal canonicalization.
fn normalize_host(host: &str) -> Result<String, UrlError> {
    if host.is_empty() {
        return Ok(String::new());
    }
    let parsed =
        ::url::Host::parse(host).map_err(|e| UrlError::invalid(format!("{}: {}", host, e)))?;
    Ok(match parsed {
        ::url::Host::Domain(ascii) => {
            let unicode = ::url::quirks::domain_to_unicode(&ascii);
            if unicode.is_empty() {
                ascii
            } else {
                unicode
            }
        }
        other => other.to_string(),
    })
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

/// Canonicalizes percent-encoding for one component.
fn normalize_component(input: &str, set: &'static AsciiSet) -> String {
    let bytes = input.as_bytes();
    let mut out = String::with_capacity(input.len());
    let mut i = 0;
    while i < input.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok())
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            match hex {
                Some(b) if is_unreserved(b) => out.push(b as char),
                Some(b) => out.push_str(&format!("%{:02X}", b)),
                None => {
                    out.push_str("%25");
                    i += 1;
                    continue;
                }
            }
            i += 3;
            continue;
        }
        // input is a str and `i` always sits on a char boundary here
        let ch = input[i..].chars().next().unwrap_or('\u{FFFD}');
        let mut buf = [0u8; 4];
        out.extend(utf8_percent_encode(ch.encode_utf8(&mut buf), set));
        i += ch.len_utf8();
    }
    out
}

/// RFC 3986 §5.2.4.
fn remove_dot_segments(path: &str) -> String {
    let absolute = path.starts_with('/');
    let body = if absolute { &path[1..] } else { path };
    let mut output: Vec<&str> = Vec::new();
    let mut trailing_slash = false;

    for segment in body.split('/') {
        match segment {
            "." => trailing_slash = true,
            ".." => {
                output.pop();
                trailing_slash = true;
            }
            other => {
                output.push(other);
                trailing_slash = false;
            }
        }
    }

    let mut result = String::with_capacity(path.len());
    if absolute {
        result.push('/');
    }
    result.push_str(&output.join("/"));
    if trailing_slash && !output.is_empty() {
        result.push('/');
    }
    result
}
