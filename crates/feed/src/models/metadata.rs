// ABOUTME: Transport metadata derived from an HTTP response.
// ABOUTME: Holds caching validators, freshness lifetimes and Link header relations.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::date::Date;
use crate::http::HttpMessage;
use crate::mime::MimeType;
use crate::models::LinkCollection;
use crate::url::Url;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// The response was a `304 Not Modified`.
    pub cached: bool,
    pub url: Option<Url>,
    #[serde(rename = "type")]
    pub mime: Option<MimeType>,
    pub date: Option<Date>,
    pub expires: Option<Date>,
    pub last_modified: Option<Date>,
    pub etag: Option<String>,
    pub age: Option<Duration>,
    pub max_age: Option<Duration>,
    pub links: LinkCollection,
}

impl Metadata {
    /// Builds metadata from a response fetched from `url`.
    pub fn from_http(message: &impl HttpMessage, url: &str) -> Metadata {
        crate::http::parse_metadata(message, url)
    }
}
