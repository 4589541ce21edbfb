// ABOUTME: RSS 0.9x/2.0, RDF/RSS 1.0 and Atom parser built on the owned XML tree.
// ABOUTME: Detects the root dialect once at init and resolves feed fields in order.

pub mod dom;
mod common;
mod entry;
mod feed;

use crate::error::FeedError;
use crate::models::{Feed, FeedFormat};
use crate::parser::{DocContext, FeedSource};
use dom::Element;

pub mod ns {
    pub const ATOM: &str = "http://www.w3.org/2005/Atom";
    pub const RSS1: &str = "http://purl.org/rss/1.0/";
    pub const RSS090: &str = "http://my.netscape.com/rdf/simple/0.9/";
    pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
    pub const DC: &str = "http://purl.org/dc/elements/1.1/";
    pub const DCTERMS: &str = "http://purl.org/dc/terms/";
    pub const SY: &str = "http://purl.org/rss/1.0/modules/syndication/";
    pub const CONTENT: &str = "http://purl.org/rss/1.0/modules/content/";
    pub const ENC: &str = "http://purl.oclc.org/net/rss_2.0/enc#";
    pub const MEDIA: &str = "http://search.yahoo.com/mrss/";
    pub const ITUNES: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
    pub const GOOGLEPLAY: &str = "http://www.google.com/schemas/play-podcasts/1.0";
    pub const XHTML: &str = "http://www.w3.org/1999/xhtml";
}

/// Which family of elements carries the core feed vocabulary.
///
/// RSS 2.0 elements live in no namespace; RSS 1.0 and 0.90 elements live in
/// their own namespace, chosen once when the root is detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Atom,
    Rss2,
    Rdf(&'static str),
}

/// A validated XML newsfeed.
#[derive(Debug)]
pub struct XmlFeed {
    root: Element,
    dialect: Dialect,
    version: Option<String>,
    ctx: DocContext,
}

/// The node a primitive reads from, with the document it belongs to.
#[derive(Clone, Copy)]
pub(crate) struct Scope<'a> {
    pub doc: &'a XmlFeed,
    pub node: &'a Element,
}

impl<'a> Scope<'a> {
    pub fn new(doc: &'a XmlFeed, node: &'a Element) -> Self {
        Self { doc, node }
    }

    /// Namespace of the RSS 1.0/0.90 vocabulary, only for RDF documents.
    pub fn rss1(&self) -> Option<&'static str> {
        match self.doc.dialect {
            Dialect::Rdf(ns) => Some(ns),
            _ => None,
        }
    }

    /// True when unqualified RSS 2.0 elements are meaningful.
    pub fn rss2(&self) -> Option<()> {
        (self.doc.dialect == Dialect::Rss2).then_some(())
    }
}

impl XmlFeed {
    pub(crate) fn ctx(&self) -> &DocContext {
        &self.ctx
    }

    pub(crate) fn root(&self) -> &Element {
        &self.root
    }

    /// The element holding feed-level metadata.
    pub(crate) fn channel(&self) -> &Element {
        match self.dialect {
            Dialect::Atom => &self.root,
            Dialect::Rss2 => self.root.child(None, "channel").unwrap_or(&self.root),
            Dialect::Rdf(ns) => self.root.child(Some(ns), "channel").unwrap_or(&self.root),
        }
    }

    /// Entry elements in document order.
    pub(crate) fn items(&self) -> Vec<&Element> {
        match self.dialect {
            Dialect::Atom => self.root.children_named(Some(ns::ATOM), "entry").collect(),
            Dialect::Rss2 => self.channel().children_named(None, "item").collect(),
            Dialect::Rdf(rss) => {
                let mut items: Vec<&Element> =
                    self.root.children_named(Some(rss), "item").collect();
                if let Some(channel) = self.root.child(Some(rss), "channel") {
                    items.extend(channel.children_named(Some(rss), "item"));
                }
                items
            }
        }
    }

    fn format(&self) -> FeedFormat {
        match self.dialect {
            Dialect::Atom => FeedFormat::Atom,
            Dialect::Rss2 => FeedFormat::Rss,
            Dialect::Rdf(_) => FeedFormat::Rdf,
        }
    }
}

fn detect(root: &Element) -> Result<(Dialect, Option<String>), FeedError> {
    if root.is(Some(ns::ATOM), "feed") {
        return Ok((Dialect::Atom, Some("1.0".to_string())));
    }
    if root.is(None, "rss") {
        if root.child(None, "channel").is_none() {
            return Err(FeedError::NotXmlFeed);
        }
        let version = root.attr("version").map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        return Ok((Dialect::Rss2, version));
    }
    if root.is(Some(ns::RDF), "RDF") {
        for (rss, version) in [(ns::RSS1, "1.0"), (ns::RSS090, "0.90")] {
            let has_vocabulary = root.child(Some(rss), "channel").is_some()
                || root.child(Some(rss), "item").is_some();
            if has_vocabulary {
                return Ok((Dialect::Rdf(rss), Some(version.to_string())));
            }
        }
    }
    Err(FeedError::NotXmlFeed)
}

impl FeedSource for XmlFeed {
    fn init(input: &str, ctx: DocContext) -> Result<Self, FeedError> {
        let root = dom::parse_document(input, ctx.base.as_ref())?;
        let (dialect, version) = detect(&root)?;
        tracing::debug!(?dialect, version = version.as_deref().unwrap_or(""), "detected xml feed");
        Ok(Self {
            root,
            dialect,
            version,
            ctx,
        })
    }

    fn parse(&self) -> Feed {
        let mut out = Feed::new(self.format());
        out.version = self.version.clone();
        let scope = Scope::new(self, self.channel());

        out.sched = feed::schedule(&scope);
        out.id = feed::id(&scope);
        out.lang = feed::lang(&scope);
        out.url = feed::url(&scope);
        out.link = feed::link(&scope);
        out.title = feed::title(&scope);
        out.summary = feed::summary(&scope);
        out.date_modified = feed::date_modified(&scope);
        out.icon = feed::icon(&scope);
        out.image = feed::image(&scope);
        out.people = feed::people(&scope);
        out.categories = common::categories(&scope);
        out.entries = self
            .items()
            .into_iter()
            .map(|item| entry::parse(&Scope::new(self, item), &out))
            .collect();
        out
    }
}
