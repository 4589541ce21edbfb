// ABOUTME: Syndication normalizer for digests: RSS, RDF, Atom, JSON Feed and h-feed.
// ABOUTME: Parses any supported document into one Feed model, plus HTTP metadata.

pub mod date;
pub mod duration_parse;
pub mod error;
pub mod html_utils;
pub mod http;
pub mod mime;
pub mod models;
pub mod options;
pub mod parser;
pub mod sniff;
pub mod text;
pub mod url;

pub use date::Date;
pub use duration_parse::{parse_duration, parse_duration_seconds};
pub use error::FeedError;
pub use html_utils::strip_html;
pub use http::{parse_link_header, parse_metadata, HttpMessage, HttpResponse};
pub use mime::MimeType;
pub use models::{
    Category, CategoryCollection, Enclosure, EnclosureCollection, Entry, Feed, FeedFormat, Link,
    LinkCollection, Metadata, Person, PersonCollection, Role, Schedule,
};
pub use options::{ParseOptions, ParseOptionsBuilder};
pub use parser::{first_of, parse, parse_response, parse_str, DocContext, FeedSource};
pub use sniff::{find_parser_for_type, find_type_for_content, select_parser, ParserKind};
pub use text::Text;
pub use url::{Url, UrlError};
