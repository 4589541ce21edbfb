// ABOUTME: Unified in-memory models for parsed newsfeeds.
// ABOUTME: Defines Feed, Entry and FeedFormat and re-exports the value collections.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::date::Date;
use crate::text::Text;
use crate::url::Url;

pub mod category;
pub mod enclosure;
pub mod link;
pub mod metadata;
pub mod person;
pub mod schedule;

pub use category::{Category, CategoryCollection};
pub use enclosure::{Enclosure, EnclosureCollection};
pub use link::{Link, LinkCollection};
pub use metadata::Metadata;
pub use person::{Person, PersonCollection, Role};
pub use schedule::Schedule;

/// The syndication format a feed was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedFormat {
    Rss,
    Rdf,
    Atom,
    Json,
    #[serde(rename = "hfeed")]
    HFeed,
}

impl fmt::Display for FeedFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FeedFormat::Rss => "rss",
            FeedFormat::Rdf => "rdf",
            FeedFormat::Atom => "atom",
            FeedFormat::Json => "json",
            FeedFormat::HFeed => "hfeed",
        };
        write!(f, "{}", s)
    }
}

/// Represents a single item/entry within a feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: Option<String>,
    pub lang: Option<String>,
    /// Web representation of the entry.
    pub link: Option<Url>,
    /// Resource the entry is about, when distinct from `link`.
    pub related_link: Option<Url>,
    pub title: Option<Text>,
    pub content: Option<Text>,
    pub summary: Option<Text>,
    pub date_created: Option<Date>,
    pub date_modified: Option<Date>,
    /// Banner image (JSON Feed `banner_image`, h-entry `u-featured`).
    pub banner: Option<Url>,
    pub categories: CategoryCollection,
    pub people: PersonCollection,
    pub enclosures: EnclosureCollection,
}

/// Represents a parsed feed with metadata and entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub format: FeedFormat,
    pub version: Option<String>,
    pub lang: Option<String>,
    pub id: Option<String>,
    /// Canonical URL of the feed document itself.
    pub url: Option<Url>,
    /// Web representation of the feed.
    pub link: Option<Url>,
    pub title: Option<Text>,
    pub summary: Option<Text>,
    pub date_modified: Option<Date>,
    pub icon: Option<Url>,
    pub image: Option<Url>,
    pub people: PersonCollection,
    pub categories: CategoryCollection,
    pub entries: Vec<Entry>,
    /// Transport metadata, filled in by callers that fetched the document.
    pub meta: Option<Metadata>,
    pub sched: Schedule,
}

impl Feed {
    /// Creates an empty feed of the given format.
    pub fn new(format: FeedFormat) -> Self {
        Self {
            format,
            version: None,
            lang: None,
            id: None,
            url: None,
            link: None,
            title: None,
            summary: None,
            date_modified: None,
            icon: None,
            image: None,
            people: PersonCollection::default(),
            categories: CategoryCollection::default(),
            entries: Vec::new(),
            meta: None,
            sched: Schedule::default(),
        }
    }
}
