// ABOUTME: Inputs for a parse call: declared content type, source URL and reference time.
// ABOUTME: ParseOptionsBuilder provides a fluent API for constructing ParseOptions.

use chrono::{DateTime, Utc};

/// Options accompanying a document handed to [`crate::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Declared media type, usually the HTTP `Content-Type` header.
    pub content_type: Option<String>,
    /// URL the document was retrieved from; relative URLs resolve against it.
    pub url: Option<String>,
    /// "Now" for two-digit-year resolution. Defaults to the current time.
    pub reference_time: Option<DateTime<Utc>>,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ParseOptionsBuilder {
        ParseOptionsBuilder::new()
    }
}

/// Builder for [`ParseOptions`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptionsBuilder {
    opts: ParseOptions,
}

impl ParseOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the declared content type.
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.opts.content_type = Some(content_type.into());
        self
    }

    /// Set the source URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.opts.url = Some(url.into());
        self
    }

    /// Pin the reference time used for century resolution.
    pub fn reference_time(mut self, now: DateTime<Utc>) -> Self {
        self.opts.reference_time = Some(now);
        self
    }

    pub fn build(self) -> ParseOptions {
        self.opts
    }
}
