// ABOUTME: Typed links (RFC 8288 web links) with normalized relation types.
// ABOUTME: LinkCollection looks links up by relation and removes exact duplicates.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::mime::MimeType;
use crate::url::Url;

/// Prefix of IANA-registered relation types written out as URIs.
const IANA_RELATIONS: &str = "http://www.iana.org/assignments/relation/";

/// RFC 8288 `reg-rel-type`.
static REG_REL_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9.\-]*$").expect("valid relation pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation: a registered token, or an absolute URI for extensions.
    pub rel: String,
    /// True for reverse relations (`rev`).
    pub rev: bool,
    pub url: Url,
    /// Link context, when it is not the containing document.
    pub anchor: Option<Url>,
    #[serde(rename = "type")]
    pub mime: Option<MimeType>,
    pub title: Option<String>,
    pub lang: Option<String>,
    pub media: Option<String>,
    /// Target attributes with no dedicated field.
    pub attr: BTreeMap<String, String>,
}

impl Link {
    pub fn new(rel: impl Into<String>, url: Url) -> Self {
        Self {
            rel: rel.into(),
            rev: false,
            url,
            anchor: None,
            mime: None,
            title: None,
            lang: None,
            media: None,
            attr: BTreeMap::new(),
        }
    }

    /// Normalizes a single relation type.
    ///
    /// Tokens are case-folded, IANA registry URIs shortened to their token,
    /// and anything else is taken as a URI reference resolved against
    /// `base`.
    pub fn normalize_rel(rel: &str, base: Option<&Url>) -> Option<String> {
        let rel = rel.trim();
        if rel.is_empty() {
            return None;
        }
        let lower = rel.to_ascii_lowercase();
        if let Some(token) = lower.strip_prefix(IANA_RELATIONS) {
            return REG_REL_TYPE
                .is_match(token)
                .then(|| token.to_string());
        }
        if REG_REL_TYPE.is_match(&lower) {
            return Some(lower);
        }
        Url::resolve_opt(rel, base).map(|u| u.to_string())
    }

    /// True when this link has the given relation, comparing URI relations
    /// by URL equality.
    pub fn has_rel(&self, rel: &str) -> bool {
        match Link::normalize_rel(rel, None) {
            Some(wanted) if wanted == self.rel => true,
            Some(wanted) => match (Url::parse(&wanted), Url::parse(&self.rel)) {
                (Ok(a), Ok(b)) => a == b,
                _ => false,
            },
            None => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkCollection(Vec<Link>);

impl LinkCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, link: Link) {
        self.0.push(link);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Link> {
        self.0.iter()
    }

    /// Forward links with the given relation.
    pub fn with_rel(&self, rel: &str) -> Vec<&Link> {
        self.0.iter().filter(|l| !l.rev && l.has_rel(rel)).collect()
    }

    /// Removes links repeating an earlier one's relation, direction,
    /// target and anchor.
    pub fn dedup(&mut self) {
        let mut kept: Vec<Link> = Vec::with_capacity(self.0.len());
        for link in self.0.drain(..) {
            let duplicate = kept.iter().any(|k| {
                k.rel == link.rel
                    && k.rev == link.rev
                    && k.url == link.url
                    && k.anchor == link.anchor
            });
            if !duplicate {
                kept.push(link);
            }
        }
        self.0 = kept;
    }
}

impl Extend<Link> for LinkCollection {
    fn extend<I: IntoIterator<Item = Link>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

impl<'a> IntoIterator for &'a LinkCollection {
    type Item = &'a Link;
    type IntoIter = std::slice::Iter<'a, Link>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
