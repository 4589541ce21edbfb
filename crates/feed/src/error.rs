// ABOUTME: Error types for feed detection and parsing operations.
// ABOUTME: Provides the FeedError enum with stable numeric codes and HTTP status mapping.

use std::fmt;
use thiserror::Error;

/// Errors that stop processing of a whole document.
///
/// Field-level problems (an unparseable date, URL or media type) are never
/// reported here; the affected field is simply left empty.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The declared or sniffed content type matches no parser.
    #[error("unsupported content type: {0}")]
    NotSupportedType(String),

    /// The body is not a JSON object.
    #[error("document is not valid JSON")]
    NotJson,

    /// The body is JSON but not a JSON Feed.
    #[error("document is not a JSON Feed")]
    NotJsonFeed,

    /// The body is not well-formed XML.
    #[error("document is not well-formed XML: {0}")]
    NotXml(String),

    /// The body is XML but its root element is not RSS, RDF or Atom.
    #[error("document is not an XML newsfeed")]
    NotXmlFeed,

    /// The body was declared as XHTML but is not well-formed XML.
    #[error("document is not well-formed XHTML: {0}")]
    NotXhtml(String),

    /// The body does not look like HTML.
    #[error("document is not HTML")]
    NotHtmlType,

    /// The body is HTML without any h-feed or h-entry markup.
    #[error("document does not contain an h-feed")]
    NotHtmlFeed,

    /// The server rejected the request (4xx other than 401/403/404/410).
    #[error("request rejected with status {0}")]
    HttpRequestRejected(u16),

    /// The server requires authentication.
    #[error("request unauthorized")]
    HttpUnauthorized,

    /// The server refused access.
    #[error("request forbidden")]
    HttpForbidden,

    /// The resource does not exist.
    #[error("resource not found")]
    HttpNotFound,

    /// The server failed (5xx).
    #[error("server error with status {0}")]
    HttpServerError(u16),

    /// The redirect limit was exceeded.
    #[error("too many redirects")]
    TooManyRedirects,
}

impl FeedError {
    /// Creates a NotSupportedType error from any displayable type name.
    pub fn not_supported(content_type: impl fmt::Display) -> Self {
        FeedError::NotSupportedType(content_type.to_string())
    }

    /// Creates a NotXml error from an underlying XML reader error.
    pub fn not_xml(err: impl fmt::Display) -> Self {
        FeedError::NotXml(err.to_string())
    }

    /// Stable numeric code for this error kind.
    pub fn code(&self) -> u32 {
        match self {
            FeedError::NotSupportedType(_) => 1101,
            FeedError::NotJson => 1111,
            FeedError::NotJsonFeed => 1112,
            FeedError::NotXml(_) => 1121,
            FeedError::NotXmlFeed => 1122,
            FeedError::NotXhtml(_) => 1131,
            FeedError::NotHtmlType => 1132,
            FeedError::NotHtmlFeed => 1133,
            FeedError::HttpRequestRejected(_) => 1201,
            FeedError::HttpUnauthorized => 1202,
            FeedError::HttpForbidden => 1203,
            FeedError::HttpNotFound => 1204,
            FeedError::HttpServerError(_) => 1205,
            FeedError::TooManyRedirects => 1211,
        }
    }

    /// Maps an HTTP status to the matching transport error, if it is a failure.
    pub fn from_http_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(FeedError::HttpUnauthorized),
            403 => Some(FeedError::HttpForbidden),
            404 | 410 => Some(FeedError::HttpNotFound),
            400..=499 => Some(FeedError::HttpRequestRejected(status)),
            500..=599 => Some(FeedError::HttpServerError(status)),
            _ => None,
        }
    }

    /// Returns true for document detection and validation failures.
    pub fn is_format_error(&self) -> bool {
        self.code() < 1200
    }

    /// Returns true for errors owned by the HTTP layer.
    pub fn is_transport_error(&self) -> bool {
        self.code() >= 1200
    }
}
