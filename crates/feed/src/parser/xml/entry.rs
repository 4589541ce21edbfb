// ABOUTME: Entry-level resolution chains for RSS items and Atom entries.
// ABOUTME: Handles link/related-link disambiguation, ambiguous dates and enclosure sources.

use std::collections::BTreeSet;
use std::str::FromStr;

use super::common::{self, atom_text, atom_text_child, loose_child, plain_child, url_child};
use super::dom::Element;
use super::ns;
use super::Scope;
use crate::date::Date;
use crate::duration_parse::parse_duration;
use crate::mime::MimeType;
use crate::models::{
    CategoryCollection, Enclosure, EnclosureCollection, Entry, Feed, PersonCollection, Role,
};
use crate::parser::first_of;
use crate::text::Text;
use crate::url::Url;

type Chain<T> = [fn(&Scope<'_>) -> Option<T>];

const ID: &Chain<String> = &[
    |s| s.node.child_text(Some(ns::ATOM), "id"),
    |s| s.node.child_text(Some(ns::DC), "identifier"),
    |s| {
        let about = s.node.attr_ns(Some(ns::RDF), "about")?.trim();
        (!about.is_empty()).then(|| about.to_string())
    },
    |s| s.rss2().and_then(|_| s.node.child_text(None, "guid")),
];

const LANG: &Chain<String> = &[
    |s| s.node.lang.clone(),
    |s| s.node.child_text(Some(ns::DC), "language"),
];

const LINK: &Chain<Url> = &[
    |s| common::atom_alternate(s.node),
    |s| url_child(s.node, Some(s.rss1()?), "link"),
];

const RELATED: &Chain<Url> = &[
    |s| common::atom_link_href(s.node, "related"),
    |s| url_child(s.node, Some(ns::DC), "relation"),
];

/// The item's `guid`, when it is flagged (or defaults) as a permalink.
fn permalink_guid(node: &Element) -> Option<Url> {
    let guid = node.child(None, "guid")?;
    let flag = guid
        .attrs
        .iter()
        .find(|a| a.ns.is_none() && a.name.eq_ignore_ascii_case("isPermaLink"))
        .map(|a| a.value.trim().to_ascii_lowercase());
    if flag.as_deref().is_some_and(|f| f != "true") {
        return None;
    }
    Url::parse(guid.trimmed_text()?.as_str()).ok()
}

/// RSS 2.0 `link` versus permalink `guid`.
///
/// A guid on a different origin than the link is taken as the entry itself,
/// with the link pointing at the resource the entry is about.
fn rss2_links(s: &Scope<'_>) -> (Option<Url>, Option<Url>) {
    if s.rss2().is_none() {
        return (None, None);
    }
    let link = url_child(s.node, None, "link");
    let guid = permalink_guid(s.node);
    match (link, guid) {
        (Some(link), Some(guid)) if !link.same_origin(&guid) => (Some(guid), Some(link)),
        (Some(link), _) => (Some(link), None),
        (None, guid) => (guid, None),
    }
}

fn links(s: &Scope<'_>) -> (Option<Url>, Option<Url>) {
    if let Some(link) = first_of(LINK, s) {
        return (Some(link), first_of(RELATED, s));
    }
    let (link, related) = rss2_links(s);
    (link, related.or_else(|| first_of(RELATED, s)))
}

const TITLE: &Chain<Text> = &[
    |s| atom_text_child(s.node, "title"),
    |s| plain_child(s.node, Some(s.rss1()?), "title"),
    |s| s.rss2().and_then(|_| loose_child(s.node, None, "title")),
    |s| plain_child(s.node, Some(ns::DC), "title"),
    |s| plain_child(s.node, Some(ns::ITUNES), "title"),
];

/// Inline Atom content; out-of-line `src` content is not fetched.
fn atom_content(s: &Scope<'_>) -> Option<Text> {
    s.node
        .children_named(Some(ns::ATOM), "content")
        .filter(|c| c.attr("src").is_none())
        .find_map(atom_text)
}

fn encoded_content(s: &Scope<'_>) -> Option<Text> {
    let el = s.node.child(Some(ns::CONTENT), "encoded")?;
    Text::html(el.text(), el.base.clone()).non_empty()
}

const CONTENT: &Chain<Text> = &[atom_content, encoded_content];

const SUMMARY: &Chain<Text> = &[
    |s| atom_text_child(s.node, "summary"),
    |s| plain_child(s.node, Some(ns::DC), "description"),
    |s| plain_child(s.node, Some(s.rss1()?), "description"),
    |s| s.rss2().and_then(|_| loose_child(s.node, None, "description")),
    |s| plain_child(s.node, Some(ns::ITUNES), "summary"),
    |s| plain_child(s.node, Some(ns::ITUNES), "subtitle"),
];

/// Atom `published`, else the earliest ambiguous date when at least two
/// distinct ones exist.
fn date_created(s: &Scope<'_>, ambiguous: &BTreeSet<Date>) -> Option<Date> {
    common::date_child(s, Some(ns::ATOM), "published").or_else(|| {
        if ambiguous.len() >= 2 {
            ambiguous.first().cloned()
        } else {
            None
        }
    })
}

/// Atom `updated`, else the latest ambiguous date.
fn date_modified(s: &Scope<'_>, ambiguous: &BTreeSet<Date>) -> Option<Date> {
    common::date_child(s, Some(ns::ATOM), "updated").or_else(|| ambiguous.last().cloned())
}

fn source_authors(s: &Scope<'_>) -> Option<PersonCollection> {
    let source = s.node.child(Some(ns::ATOM), "source")?;
    common::atom_people(source, "author", Role::Author)
}

fn people(s: &Scope<'_>, feed: &Feed) -> PersonCollection {
    let authors = first_of(common::AUTHORS, s)
        .or_else(|| source_authors(s))
        .or_else(|| {
            let inherited = feed.people.filter_role(&Role::Author);
            (!inherited.is_empty()).then_some(inherited)
        });
    let contributors = first_of(common::CONTRIBUTORS, s);
    let editors = first_of(common::EDITORS, s);

    let mut out = PersonCollection::new();
    out.merge(authors.iter().chain(contributors.iter()).chain(editors.iter()));
    out
}

fn categories(s: &Scope<'_>) -> CategoryCollection {
    let own = common::categories(s);
    if !own.is_empty() {
        return own;
    }
    s.node
        .child(Some(ns::ATOM), "source")
        .and_then(common::atom_categories)
        .unwrap_or_default()
}

fn number<T: FromStr>(value: Option<&str>) -> Option<T> {
    value?.trim().parse().ok()
}

fn media_content(el: &Element) -> Option<Enclosure> {
    let url = el.resolve(el.attr("url")?)?;
    let mime = el
        .attr("type")
        .and_then(MimeType::parse)
        .or_else(|| MimeType::parse_loose(el.attr("medium").unwrap_or(""), Some(&url)));
    let bitrate = number::<f64>(el.attr("bitrate"))
        .filter(|kbps| *kbps >= 0.0)
        .map(|kbps| (kbps * 1000.0) as u64);
    Some(Enclosure {
        mime,
        title: el.child_text(Some(ns::MEDIA), "title"),
        height: number(el.attr("height")),
        width: number(el.attr("width")),
        duration: el.attr("duration").and_then(parse_duration),
        bitrate,
        size: number(el.attr("fileSize")),
        preferred: el.attr("isDefault").is_some_and(|d| d.trim() == "true"),
        ..Enclosure::new(url)
    })
}

fn non_empty(enclosures: EnclosureCollection) -> Option<EnclosureCollection> {
    (!enclosures.is_empty()).then_some(enclosures)
}

fn media_enclosures(s: &Scope<'_>) -> Option<EnclosureCollection> {
    let direct = s.node.children_named(Some(ns::MEDIA), "content");
    let grouped = s
        .node
        .children_named(Some(ns::MEDIA), "group")
        .flat_map(|g| g.children_named(Some(ns::MEDIA), "content"));
    non_empty(direct.chain(grouped).filter_map(media_content).collect())
}

fn atom_enclosures(s: &Scope<'_>) -> Option<EnclosureCollection> {
    non_empty(
        common::atom_links(s.node, "enclosure")
            .filter_map(|l| {
                let url = l.resolve(l.attr("href")?)?;
                Some(Enclosure {
                    mime: MimeType::parse_loose(l.attr("type").unwrap_or(""), Some(&url)),
                    title: l.attr("title").map(str::to_string),
                    size: number(l.attr("length")),
                    ..Enclosure::new(url)
                })
            })
            .collect(),
    )
}

fn rss1_enclosures(s: &Scope<'_>) -> Option<EnclosureCollection> {
    non_empty(
        s.node
            .children_named(Some(ns::ENC), "enclosure")
            .filter_map(|el| {
                let href = el
                    .attr_ns(Some(ns::ENC), "url")
                    .or_else(|| el.attr_ns(Some(ns::RDF), "resource"))?;
                let url = el.resolve(href)?;
                Some(Enclosure {
                    mime: MimeType::parse_loose(
                        el.attr_ns(Some(ns::ENC), "type").unwrap_or(""),
                        Some(&url),
                    ),
                    size: number(el.attr_ns(Some(ns::ENC), "length")),
                    ..Enclosure::new(url)
                })
            })
            .collect(),
    )
}

fn rss2_enclosures(s: &Scope<'_>) -> Option<EnclosureCollection> {
    s.rss2()?;
    let mut out: EnclosureCollection = s
        .node
        .children_named(None, "enclosure")
        .filter_map(|el| {
            let url = el.resolve(el.attr("url")?)?;
            Some(Enclosure {
                mime: MimeType::parse_loose(el.attr("type").unwrap_or(""), Some(&url)),
                size: number(el.attr("length")),
                ..Enclosure::new(url)
            })
        })
        .collect();
    let duration = s
        .node
        .child_text(Some(ns::ITUNES), "duration")
        .and_then(|d| parse_duration(&d));
    for enclosure in out.iter_mut() {
        enclosure.duration = enclosure.duration.or(duration);
    }
    non_empty(out)
}

const ENCLOSURES: &Chain<EnclosureCollection> =
    &[media_enclosures, atom_enclosures, rss1_enclosures, rss2_enclosures];

/// Resolves one entry; `feed` supplies already-resolved defaults.
pub(crate) fn parse(s: &Scope<'_>, feed: &Feed) -> Entry {
    let ambiguous: BTreeSet<Date> = common::ambiguous_dates(s, &["pubDate"]).into_iter().collect();
    let (link, related_link) = links(s);
    Entry {
        id: first_of(ID, s),
        lang: first_of(LANG, s).or_else(|| feed.lang.clone()),
        link,
        related_link,
        title: first_of(TITLE, s),
        content: first_of(CONTENT, s),
        summary: first_of(SUMMARY, s),
        date_created: date_created(s, &ambiguous),
        date_modified: date_modified(s, &ambiguous),
        banner: None,
        categories: categories(s),
        people: people(s, feed),
        enclosures: first_of(ENCLOSURES, s).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use crate::parser::xml::XmlFeed;
    use crate::parser::{DocContext, FeedSource};
    use std::time::Duration;

    const RSS_NS: &str = r#"xmlns:atom="http://www.w3.org/2005/Atom"
        xmlns:media="http://search.yahoo.com/mrss/"
        xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
        xmlns:dc="http://purl.org/dc/elements/1.1/"
        xmlns:content="http://purl.org/rss/1.0/modules/content/""#;

    fn first_entry(item: &str) -> Entry {
        let doc = format!(
            r#"<rss version="2.0" {}><channel><title>c</title><author>Feed Author &lt;fa@example.com&gt;</author><item>{}</item></channel></rss>"#,
            RSS_NS, item
        );
        let opts = ParseOptions::builder().url("http://example.com/feed").build();
        let feed = XmlFeed::init(&doc, DocContext::new(&opts)).unwrap().parse();
        feed.entries.into_iter().next().unwrap()
    }

    #[test]
    fn test_guid_on_other_host_becomes_link() {
        let entry = first_entry(
            r#"<link>http://a.example/x</link><guid isPermalink="true">http://b.example/y</guid>"#,
        );
        assert_eq!(entry.link.unwrap().to_string(), "http://b.example/y");
        assert_eq!(entry.related_link.unwrap().to_string(), "http://a.example/x");
    }

    #[test]
    fn test_guid_on_same_host_keeps_link() {
        let entry = first_entry(
            r#"<link>http://a.example/x</link><guid isPermaLink="true">http://a.example/y</guid>"#,
        );
        assert_eq!(entry.link.unwrap().to_string(), "http://a.example/x");
        assert!(entry.related_link.is_none());
    }

    #[test]
    fn test_non_permalink_guid_is_only_an_id() {
        let entry = first_entry(r#"<guid isPermaLink="false">http://b.example/y</guid>"#);
        assert!(entry.link.is_none());
        assert_eq!(entry.id.as_deref(), Some("http://b.example/y"));
    }

    #[test]
    fn test_single_ambiguous_date_is_modification() {
        let entry = first_entry("<pubDate>Mon, 01 Jan 2024 00:00:00 GMT</pubDate>");
        assert!(entry.date_created.is_none());
        assert_eq!(entry.date_modified.unwrap().normalize(), "2024-01-01T00:00:00Z");
    }

    #[test]
    fn test_two_ambiguous_dates_split_created_and_modified() {
        let entry = first_entry(
            "<pubDate>Tue, 02 Jan 2024 00:00:00 GMT</pubDate><dc:date>2024-01-01T00:00:00Z</dc:date>",
        );
        assert_eq!(entry.date_created.unwrap().normalize(), "2024-01-01T00:00:00Z");
        assert_eq!(entry.date_modified.unwrap().normalize(), "2024-01-02T00:00:00Z");
    }

    #[test]
    fn test_content_and_summary() {
        let entry = first_entry(
            "<description>short</description><content:encoded><![CDATA[<p>long</p>]]></content:encoded>",
        );
        assert_eq!(entry.summary, Some(Text::loose("short")));
        let content = entry.content.unwrap();
        assert_eq!(content.as_str(), "<p>long</p>");
        assert_eq!(content.base().unwrap().to_string(), "http://example.com/feed");
    }

    #[test]
    fn test_authors_inherit_from_feed() {
        let entry = first_entry("<title>t</title>");
        assert_eq!(entry.people.len(), 1);
        assert_eq!(entry.people.primary().unwrap().mail.as_deref(), Some("fa@example.com"));

        let entry = first_entry("<dc:creator>Own</dc:creator>");
        assert_eq!(entry.people.primary().unwrap().name.as_deref(), Some("Own"));
    }

    #[test]
    fn test_media_rss_wins_over_rss2_enclosure() {
        let entry = first_entry(
            r#"<enclosure url="a.mp3" type="audio/mpeg" length="10"/>
               <media:group>
                 <media:content url="lo.mp4" type="video/mp4" bitrate="500" duration="60"/>
                 <media:content url="hi.mp4" medium="video" bitrate="2000" duration="60" isDefault="true"/>
               </media:group>"#,
        );
        assert_eq!(entry.enclosures.len(), 2);
        let best = entry.enclosures.primary().unwrap();
        assert_eq!(best.url.to_string(), "http://example.com/hi.mp4");
        assert_eq!(best.bitrate, Some(2_000_000));
        assert_eq!(best.mime.as_ref().unwrap().essence(), "video/unknown");
    }

    #[test]
    fn test_itunes_duration_fills_rss2_enclosure() {
        let entry = first_entry(
            r#"<enclosure url="http://cdn.example/ep.mp3" length="1234" type="audio/mpeg"/><itunes:duration>01:02:03</itunes:duration>"#,
        );
        let enclosure = entry.enclosures.primary().unwrap();
        assert_eq!(enclosure.duration, Some(Duration::from_secs(3723)));
        assert_eq!(enclosure.size, Some(1234));
    }

    #[test]
    fn test_out_of_range_durations_are_dropped() {
        let entry = first_entry(
            r#"<enclosure url="http://cdn.example/ep.mp3" type="audio/mpeg"/>
               <itunes:duration>5124095576030431:00:59</itunes:duration>"#,
        );
        let enclosure = entry.enclosures.primary().unwrap();
        assert_eq!(enclosure.duration, None);

        let entry = first_entry(
            r#"<media:content url="v.mp4" type="video/mp4" duration="5124095576030431:00:59"/>"#,
        );
        let enclosure = entry.enclosures.primary().unwrap();
        assert_eq!(enclosure.url.to_string(), "http://example.com/v.mp4");
        assert_eq!(enclosure.duration, None);
    }

    #[test]
    fn test_atom_title_beats_rss_title_in_entries() {
        let entry = first_entry("<title>rss</title><atom:title>atom</atom:title>");
        assert_eq!(entry.title.unwrap().as_str(), "atom");
    }
}
