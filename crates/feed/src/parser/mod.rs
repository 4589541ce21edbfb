// ABOUTME: Parse entry point and the resolution-chain machinery shared by all formats.
// ABOUTME: Selects a structural parser, then resolves every Feed field in a fixed order.

pub mod html;
pub mod json;
pub mod xml;

use chrono::{DateTime, Utc};

use crate::error::FeedError;
use crate::http::{parse_metadata, HttpMessage};
use crate::mime::MimeType;
use crate::models::Feed;
use crate::options::ParseOptions;
use crate::sniff::{select_parser, ParserKind};
use crate::url::Url;

pub use html::HtmlFeed;
pub use json::JsonFeed;
pub use xml::XmlFeed;

/// Per-document inputs threaded through every resolver.
#[derive(Debug, Clone)]
pub struct DocContext {
    /// Source URL of the document.
    pub base: Option<Url>,
    /// Declared media type, when one was given and parsed.
    pub content_type: Option<MimeType>,
    /// "Now" for two-digit-year resolution.
    pub reference_time: DateTime<Utc>,
}

impl DocContext {
    pub fn new(opts: &ParseOptions) -> Self {
        Self {
            base: opts.url.as_deref().and_then(|u| Url::parse(u).ok()),
            content_type: opts.content_type.as_deref().and_then(MimeType::parse),
            reference_time: opts.reference_time.unwrap_or_else(Utc::now),
        }
    }
}

/// A structural parser: validates the document once, then builds a Feed.
pub trait FeedSource: Sized {
    /// Checks the top-level structure and detects the concrete sub-format.
    fn init(input: &str, ctx: DocContext) -> Result<Self, FeedError>;

    /// Resolves every field of the feed.
    fn parse(&self) -> Feed;
}

/// Tries each primitive in order and returns the first value found.
pub fn first_of<S: ?Sized, T>(primitives: &[fn(&S) -> Option<T>], subject: &S) -> Option<T> {
    primitives.iter().find_map(|primitive| primitive(subject))
}

/// Parses a document into a [`Feed`].
///
/// The declared content type picks the parser when it names a supported
/// family; otherwise the content is sniffed.
pub fn parse(input: &str, opts: &ParseOptions) -> Result<Feed, FeedError> {
    let kind = select_parser(input, opts.content_type.as_deref())?;
    let ctx = DocContext::new(opts);
    let feed = match kind {
        ParserKind::Xml => XmlFeed::init(input, ctx)?.parse(),
        ParserKind::Json => JsonFeed::init(input, ctx)?.parse(),
        ParserKind::Html => HtmlFeed::init(input, ctx)?.parse(),
    };
    tracing::debug!(
        format = %feed.format,
        version = feed.version.as_deref().unwrap_or(""),
        entries = feed.entries.len(),
        "parsed feed"
    );
    Ok(feed)
}

/// Convenience wrapper over [`parse`] for callers without options.
pub fn parse_str(
    input: &str,
    content_type: Option<&str>,
    url: Option<&str>,
) -> Result<Feed, FeedError> {
    let opts = ParseOptions {
        content_type: content_type.map(str::to_string),
        url: url.map(str::to_string),
        reference_time: None,
    };
    parse(input, &opts)
}

/// Parses a fetched response body and attaches its transport metadata.
///
/// Failure statuses map to transport errors before the body is looked at.
pub fn parse_response(
    body: &str,
    message: &impl HttpMessage,
    url: &str,
) -> Result<Feed, FeedError> {
    if let Some(err) = FeedError::from_http_status(message.status()) {
        tracing::debug!(status = message.status(), url, "refusing failed response");
        return Err(err);
    }
    let mut builder = ParseOptions::builder().url(url);
    if let Some(content_type) = message.header("content-type") {
        builder = builder.content_type(content_type);
    }
    let mut feed = parse(body, &builder.build())?;
    feed.meta = Some(parse_metadata(message, url));
    Ok(feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn double_even(n: &i32) -> Option<i32> {
        (n % 2 == 0).then(|| n * 2)
    }

    fn negate(n: &i32) -> Option<i32> {
        Some(-n)
    }

    #[test]
    fn test_first_of_takes_first_present() {
        let chain: &[fn(&i32) -> Option<i32>] = &[double_even, negate];
        assert_eq!(first_of(chain, &4), Some(8));
        assert_eq!(first_of(chain, &3), Some(-3));
        let empty: &[fn(&i32) -> Option<i32>] = &[];
        assert_eq!(first_of(empty, &3), None);
    }

    #[test]
    fn test_doc_context_ignores_bad_inputs() {
        let opts = ParseOptions::builder()
            .url("not a url")
            .content_type("nonsense")
            .build();
        let ctx = DocContext::new(&opts);
        assert!(ctx.base.is_none());
        assert!(ctx.content_type.is_none());
    }

    #[test]
    fn test_parse_response_maps_status_and_attaches_meta() {
        use crate::http::HttpResponse;

        let missing = HttpResponse::new(404);
        assert_eq!(
            parse_response("", &missing, "http://example.com/feed"),
            Err(FeedError::HttpNotFound)
        );

        let ok = HttpResponse::new(200)
            .with_header("Content-Type", "application/feed+json")
            .with_header("ETag", "\"v1\"");
        let body = r#"{"version": "https://jsonfeed.org/version/1.1", "title": "T", "items": []}"#;
        let feed = parse_response(body, &ok, "http://example.com/feed.json").unwrap();
        let meta = feed.meta.unwrap();
        assert_eq!(meta.etag.as_deref(), Some("\"v1\""));
        assert!(!meta.cached);
        assert_eq!(feed.url.unwrap().to_string(), "http://example.com/feed.json");
    }
}
