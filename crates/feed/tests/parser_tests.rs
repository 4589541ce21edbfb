// ABOUTME: Integration tests for parsing whole documents of every supported format.
// ABOUTME: Covers dialect detection, field resolution, inheritance and document errors.

use digests_syndication::{parse, parse_str, FeedError, FeedFormat, ParseOptions, Role, Text};
use pretty_assertions::assert_eq;
use std::time::Duration;

#[test]
fn test_rss2_podcast_feed() {
    let rss = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd">
    <channel>
        <title>Tech Talk</title>
        <link>https://example.com/</link>
        <description>Weekly &lt;b&gt;talk&lt;/b&gt;</description>
        <language>en-us</language>
        <ttl>60</ttl>
        <managingEditor>editor@example.com (Eddie)</managingEditor>
        <itunes:image href="https://example.com/cover.jpg"/>
        <item>
            <title>Episode 1</title>
            <link>https://example.com/ep1</link>
            <guid isPermaLink="false">ep-1</guid>
            <pubDate>Mon, 15 Jan 2024 10:00:00 +0000</pubDate>
            <category>Tech</category>
            <category>Tech</category>
            <enclosure url="/audio/ep1.mp3" type="audio/mpeg" length="12345"/>
            <itunes:duration>01:02:03</itunes:duration>
        </item>
        <item>
            <title>Episode 2</title>
            <guid>https://example.com/ep2</guid>
        </item>
    </channel>
</rss>"#;

    let feed = parse_str(rss, None, Some("https://example.com/feed.xml")).unwrap();
    assert_eq!(feed.format, FeedFormat::Rss);
    assert_eq!(feed.version.as_deref(), Some("2.0"));
    assert_eq!(feed.title, Some(Text::loose("Tech Talk")));
    assert_eq!(feed.summary.as_ref().unwrap().to_plain(), "Weekly talk");
    assert_eq!(feed.lang.as_deref(), Some("en-us"));
    assert_eq!(feed.link.as_ref().unwrap().to_string(), "https://example.com/");
    assert_eq!(feed.url.as_ref().unwrap().to_string(), "https://example.com/feed.xml");
    assert_eq!(feed.image.as_ref().unwrap().to_string(), "https://example.com/cover.jpg");
    assert_eq!(feed.sched.interval, Some(Duration::from_secs(3600)));

    let editor = feed.people.primary().unwrap();
    assert_eq!(editor.role, Role::Editor);
    assert_eq!(editor.name.as_deref(), Some("Eddie"));
    assert_eq!(editor.mail.as_deref(), Some("editor@example.com"));

    assert_eq!(feed.entries.len(), 2);
    let first = &feed.entries[0];
    assert_eq!(first.id.as_deref(), Some("ep-1"));
    assert_eq!(first.link.as_ref().unwrap().to_string(), "https://example.com/ep1");
    assert_eq!(first.lang.as_deref(), Some("en-us"));
    assert_eq!(
        first.date_modified.as_ref().unwrap().normalize(),
        "2024-01-15T10:00:00Z"
    );
    assert!(first.date_created.is_none());
    assert_eq!(first.categories.list(true), vec!["Tech".to_string()]);

    let enclosure = first.enclosures.primary().unwrap();
    assert_eq!(enclosure.url.to_string(), "https://example.com/audio/ep1.mp3");
    assert_eq!(enclosure.mime.as_ref().unwrap().essence(), "audio/mpeg");
    assert_eq!(enclosure.size, Some(12345));
    assert_eq!(enclosure.duration, Some(Duration::from_secs(3723)));

    // a guid without isPermaLink defaults to a permalink
    let second = &feed.entries[1];
    assert_eq!(second.link.as_ref().unwrap().to_string(), "https://example.com/ep2");
    assert!(second.enclosures.is_empty());
}

#[test]
fn test_atom_feed_with_inherited_author() {
    let atom = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xml:lang="en">
    <title type="text">Example Feed</title>
    <subtitle>All the news</subtitle>
    <link href="http://example.org/"/>
    <link rel="self" href="http://example.org/feed.atom"/>
    <id>urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6</id>
    <updated>2003-12-13T18:30:02Z</updated>
    <author><name>John Doe</name><email>john@example.org</email></author>
    <logo>/logo.png</logo>
    <entry>
        <title type="html">Atom &lt;em&gt;powered&lt;/em&gt; robots</title>
        <link rel="alternate" type="text/html" href="/2003/12/13/atom03"/>
        <id>urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a</id>
        <published>2003-12-13T08:29:29-04:00</published>
        <updated>2003-12-13T18:30:02Z</updated>
        <content type="html">&lt;p&gt;Some text.&lt;/p&gt;</content>
        <category term="robots" label="Robots"/>
    </entry>
</feed>"#;

    let feed =
        parse_str(atom, Some("application/atom+xml"), Some("http://example.org/feed")).unwrap();
    assert_eq!(feed.format, FeedFormat::Atom);
    assert_eq!(feed.title, Some(Text::plain("Example Feed")));
    assert_eq!(feed.summary.as_ref().unwrap().as_str(), "All the news");
    assert_eq!(feed.id.as_deref(), Some("urn:uuid:60a76c80-d399-11d9-b93C-0003939e0af6"));
    assert_eq!(feed.url.as_ref().unwrap().to_string(), "http://example.org/feed.atom");
    assert_eq!(feed.link.as_ref().unwrap().to_string(), "http://example.org/");
    assert_eq!(feed.image.as_ref().unwrap().to_string(), "http://example.org/logo.png");
    assert_eq!(feed.lang.as_deref(), Some("en"));

    let entry = &feed.entries[0];
    assert!(matches!(entry.title, Some(Text::Html { .. })));
    assert_eq!(entry.title.as_ref().unwrap().to_plain(), "Atom powered robots");
    assert_eq!(
        entry.link.as_ref().unwrap().to_string(),
        "http://example.org/2003/12/13/atom03"
    );
    assert_eq!(entry.content.as_ref().unwrap().as_str(), "<p>Some text.</p>");
    assert_eq!(
        entry.date_created.as_ref().unwrap().normalize(),
        "2003-12-13T12:29:29Z"
    );
    assert_eq!(
        entry.date_modified.as_ref().unwrap().normalize(),
        "2003-12-13T18:30:02Z"
    );
    assert_eq!(entry.categories.list(true), vec!["Robots".to_string()]);
    assert_eq!(entry.categories.list(false), vec!["robots".to_string()]);

    let author = entry.people.primary().unwrap();
    assert_eq!(author.name.as_deref(), Some("John Doe"));
    assert_eq!(author.mail.as_deref(), Some("john@example.org"));
}

#[test]
fn test_rdf_feed() {
    let rdf = r#"<?xml version="1.0"?>
<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
         xmlns="http://purl.org/rss/1.0/"
         xmlns:dc="http://purl.org/dc/elements/1.1/">
    <channel rdf:about="http://example.net/">
        <title>RDF Site</title>
        <link>http://example.net/</link>
        <description>An RSS 1.0 feed</description>
        <dc:creator>Ruth</dc:creator>
    </channel>
    <item rdf:about="http://example.net/one">
        <title>One</title>
        <link>http://example.net/one</link>
        <dc:date>2024-03-01T12:00:00Z</dc:date>
    </item>
</rdf:RDF>"#;

    let feed = parse_str(rdf, None, None).unwrap();
    assert_eq!(feed.format, FeedFormat::Rdf);
    assert_eq!(feed.version.as_deref(), Some("1.0"));
    assert_eq!(feed.title, Some(Text::plain("RDF Site")));
    assert_eq!(feed.entries.len(), 1);

    let item = &feed.entries[0];
    assert_eq!(item.id.as_deref(), Some("http://example.net/one"));
    assert_eq!(item.title, Some(Text::plain("One")));
    assert_eq!(item.link.as_ref().unwrap().to_string(), "http://example.net/one");
    assert_eq!(item.date_modified.as_ref().unwrap().normalize(), "2024-03-01T12:00:00Z");
    assert_eq!(item.people.primary().unwrap().name.as_deref(), Some("Ruth"));
}

#[test]
fn test_json_feed() {
    let json = r#"{
        "version": "https://jsonfeed.org/version/1.1",
        "title": "JSON Blog",
        "home_page_url": "https://example.org/",
        "feed_url": "https://example.org/feed.json",
        "authors": [{"name": "Ann"}],
        "items": [
            {"id": "2", "url": "/two", "content_text": "Second", "date_published": "2024-05-02T00:00:00Z"},
            {"id": 1, "title": "First", "content_html": "<p>First</p>"}
        ]
    }"#;

    let feed =
        parse_str(json, Some("application/feed+json"), Some("https://example.org/")).unwrap();
    assert_eq!(feed.format, FeedFormat::Json);
    assert_eq!(feed.version.as_deref(), Some("1.1"));
    assert_eq!(feed.url.as_ref().unwrap().to_string(), "https://example.org/feed.json");
    assert_eq!(feed.entries.len(), 2);

    let two = &feed.entries[0];
    assert_eq!(two.link.as_ref().unwrap().to_string(), "https://example.org/two");
    assert_eq!(two.content, Some(Text::plain("Second")));
    assert_eq!(two.people.primary().unwrap().name.as_deref(), Some("Ann"));
    assert_eq!(two.date_created, two.date_modified);

    let one = &feed.entries[1];
    assert_eq!(one.id.as_deref(), Some("1"));
    assert_eq!(one.content.as_ref().unwrap().as_str(), "<p>First</p>");
}

#[test]
fn test_h_feed_from_html() {
    let html = r#"<!DOCTYPE html>
<html lang="en">
<head><title>Page</title></head>
<body>
    <div class="h-feed">
        <h1 class="p-name">Notes</h1>
        <article class="h-entry">
            <a class="u-url" href="/notes/1"><span class="p-name">Note one</span></a>
            <time class="dt-published" datetime="2024-02-01T09:00:00Z">Feb 1</time>
            <div class="e-content"><p>Body</p></div>
            <span class="p-category">misc</span>
        </article>
    </div>
</body>
</html>"#;

    let feed = parse_str(html, Some("text/html"), Some("https://notes.example/")).unwrap();
    assert_eq!(feed.format, FeedFormat::HFeed);
    assert_eq!(feed.title.as_ref().unwrap().as_str(), "Notes");
    assert_eq!(feed.lang.as_deref(), Some("en"));

    let entry = &feed.entries[0];
    assert_eq!(entry.link.as_ref().unwrap().to_string(), "https://notes.example/notes/1");
    assert_eq!(entry.id.as_deref(), Some("https://notes.example/notes/1"));
    assert_eq!(entry.title.as_ref().unwrap().as_str(), "Note one");
    assert_eq!(entry.content.as_ref().unwrap().as_str(), "<p>Body</p>");
    assert_eq!(entry.categories.list(true), vec!["misc".to_string()]);
}

#[test]
fn test_sniffing_picks_parser_without_declared_type() {
    let rss = r#"<!-- generator --><rss version="2.0"><channel><title>T</title></channel></rss>"#;
    assert_eq!(parse_str(rss, None, None).unwrap().format, FeedFormat::Rss);

    let json = r#"{ "version": "https://jsonfeed.org/version/1", "items": [] }"#;
    assert_eq!(parse_str(json, None, None).unwrap().format, FeedFormat::Json);

    // an unparseable declared type falls back to sniffing
    assert_eq!(parse_str(rss, Some("%%%"), None).unwrap().format, FeedFormat::Rss);
}

#[test]
fn test_document_errors() {
    assert_eq!(
        parse_str("<rss>", Some("image/png"), None).unwrap_err(),
        FeedError::NotSupportedType("image/png".to_string())
    );
    assert_eq!(
        parse_str("just some text", None, None).unwrap_err(),
        FeedError::NotSupportedType("application/octet-stream".to_string())
    );
    assert!(matches!(
        parse_str("<rss><channel></rss>", None, None).unwrap_err(),
        FeedError::NotXml(_)
    ));
    assert_eq!(
        parse_str("<html><body><p>hi</p></body></html>", None, None).unwrap_err(),
        FeedError::NotHtmlFeed
    );
    assert_eq!(
        parse_str(r#"{"title": "x"}"#, None, None).unwrap_err(),
        FeedError::NotJsonFeed
    );
    assert!(FeedError::NotXmlFeed.is_format_error());
}

#[test]
fn test_reference_time_resolves_two_digit_years() {
    let rss = r#"<rss version="2.0"><channel><item><guid>a</guid>
        <pubDate>Sat, 01 Jan 22 00:00:00 GMT</pubDate></item></channel></rss>"#;
    let now = chrono::DateTime::parse_from_rfc3339("2024-06-01T00:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let opts = ParseOptions::builder().reference_time(now).build();
    let feed = parse(rss, &opts).unwrap();
    assert_eq!(
        feed.entries[0].date_modified.as_ref().unwrap().normalize(),
        "2022-01-01T00:00:00Z"
    );
}
