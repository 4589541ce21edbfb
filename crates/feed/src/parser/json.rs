// ABOUTME: JSON Feed 1.0/1.1 parser over a serde_json value tree.
// ABOUTME: Typed accessors replace member lookups; numeric item ids are normalized to strings.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Number, Value};
use std::time::Duration;

use crate::date::Date;
use crate::error::FeedError;
use crate::mime::MimeType;
use crate::models::{
    Category, CategoryCollection, Enclosure, EnclosureCollection, Entry, Feed, FeedFormat, Person,
    PersonCollection, Role,
};
use crate::parser::{first_of, DocContext, FeedSource};
use crate::text::Text;
use crate::url::Url;

static VERSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^https?://jsonfeed\.org/version/(\d+(?:\.\d+)?)/?$")
        .expect("valid version pattern")
});

type Object = Map<String, Value>;

fn get_str<'a>(obj: &'a Object, key: &str) -> Option<&'a str> {
    obj.get(key)?.as_str().map(str::trim).filter(|s| !s.is_empty())
}

fn get_array<'a>(obj: &'a Object, key: &str) -> Option<&'a Vec<Value>> {
    obj.get(key)?.as_array()
}

fn get_object<'a>(obj: &'a Object, key: &str) -> Option<&'a Object> {
    obj.get(key)?.as_object()
}

fn get_bool(obj: &Object, key: &str) -> Option<bool> {
    obj.get(key)?.as_bool()
}

fn get_number(obj: &Object, key: &str) -> Option<f64> {
    obj.get(key)?.as_f64()
}

/// Decimal rendering of a JSON number without exponent notation.
///
/// Integers print as-is; floats print the shortest decimal that reads back
/// to the same value, so `1.0` becomes `1` and `1.5e10` becomes
/// `15000000000`.
pub fn number_to_id(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) => float_to_decimal(f),
        None => n.to_string(),
    }
}

/// Expands the shortest round-trip digits of `f` into positional notation.
fn float_to_decimal(f: f64) -> String {
    // `{:e}` yields the shortest round-trip digits, e.g. "1.5e10" or "-2.5e-7"
    let sci = format!("{:e}", f);
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let digits: String = mantissa.chars().filter(|c| *c != '.').collect();
    let digits = digits.trim_end_matches('0');
    if digits.is_empty() {
        return "0".to_string();
    }
    // position of the decimal point relative to the first digit
    let point = exponent + 1;
    let body = if point <= 0 {
        format!("0.{}{}", "0".repeat((-point) as usize), digits)
    } else if point as usize >= digits.len() {
        format!("{}{}", digits, "0".repeat(point as usize - digits.len()))
    } else {
        let (int, frac) = digits.split_at(point as usize);
        format!("{}.{}", int, frac)
    };
    format!("{}{}", sign, body)
}

fn item_id(item: &Object) -> Option<String> {
    match item.get("id")? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(number_to_id(n)),
        _ => None,
    }
    .filter(|id| !id.trim().is_empty())
}

/// A validated JSON Feed document.
#[derive(Debug)]
pub struct JsonFeed {
    root: Object,
    version: String,
    ctx: DocContext,
}

/// An object being resolved, with the document it belongs to.
struct Scope<'a> {
    doc: &'a JsonFeed,
    obj: &'a Object,
}

impl Scope<'_> {
    fn url(&self, key: &str) -> Option<Url> {
        Url::resolve_opt(get_str(self.obj, key)?, self.doc.ctx.base.as_ref())
    }

    fn plain(&self, key: &str) -> Option<Text> {
        get_str(self.obj, key).map(Text::plain)
    }

    fn date(&self, key: &str) -> Option<Date> {
        Date::parse_at(get_str(self.obj, key)?, self.doc.ctx.reference_time)
    }
}

fn person(s: &Scope<'_>, obj: &Object) -> Person {
    let scope = Scope { doc: s.doc, obj };
    Person {
        name: get_str(obj, "name").map(str::to_string),
        url: scope.url("url"),
        avatar: scope.url("avatar"),
        ..Person::new(Role::Author)
    }
}

fn authors(s: &Scope<'_>) -> Option<PersonCollection> {
    let people: PersonCollection = match get_array(s.obj, "authors") {
        Some(list) => list.iter().filter_map(Value::as_object).map(|o| person(s, o)).collect(),
        None => get_object(s.obj, "author").map(|o| person(s, o)).into_iter().collect(),
    };
    (!people.is_empty()).then_some(people)
}

const CONTENT: &[fn(&Scope<'_>) -> Option<Text>] = &[
    |s| get_str(s.obj, "content_html").map(|html| Text::html(html, s.doc.ctx.base.clone())),
    |s| s.plain("content_text"),
];

const DATE_MODIFIED: &[fn(&Scope<'_>) -> Option<Date>] =
    &[|s| s.date("date_modified"), |s| s.date("date_published")];

fn attachment(s: &Scope<'_>, obj: &Object) -> Option<Enclosure> {
    let scope = Scope { doc: s.doc, obj };
    let url = scope.url("url")?;
    Some(Enclosure {
        mime: MimeType::parse_loose(get_str(obj, "mime_type").unwrap_or(""), Some(&url)),
        title: get_str(obj, "title").map(str::to_string),
        size: get_number(obj, "size_in_bytes").filter(|n| *n >= 0.0).map(|n| n as u64),
        duration: get_number(obj, "duration_in_seconds")
            .and_then(|n| Duration::try_from_secs_f64(n).ok()),
        ..Enclosure::new(url)
    })
}

fn enclosures(s: &Scope<'_>) -> EnclosureCollection {
    let mut out: EnclosureCollection = get_array(s.obj, "attachments")
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
        .filter_map(|o| attachment(s, o))
        .collect();
    if let Some(url) = s.url("image") {
        let mime = MimeType::from_url(&url)
            .filter(|m| m.medium() == "image")
            .or_else(|| MimeType::parse_loose("image", None));
        out.push(Enclosure {
            mime,
            ..Enclosure::new(url)
        });
    }
    out
}

fn tags(s: &Scope<'_>) -> CategoryCollection {
    get_array(s.obj, "tags")
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
        .map(|t| Category::new(t.trim()))
        .collect()
}

fn entry(s: &Scope<'_>, feed: &Feed) -> Option<Entry> {
    let Some(id) = item_id(s.obj) else {
        tracing::debug!(item = ?s.obj.get("url"), "skipping json feed item without id");
        return None;
    };
    Some(Entry {
        id: Some(id),
        lang: get_str(s.obj, "language").map(str::to_string).or_else(|| feed.lang.clone()),
        link: s.url("url"),
        related_link: s.url("external_url"),
        title: s.plain("title"),
        content: first_of(CONTENT, s),
        summary: s.plain("summary"),
        date_created: s.date("date_published"),
        date_modified: first_of(DATE_MODIFIED, s),
        banner: s.url("banner_image"),
        categories: tags(s),
        people: authors(s).unwrap_or_else(|| feed.people.filter_role(&Role::Author)),
        enclosures: enclosures(s),
    })
}

impl FeedSource for JsonFeed {
    fn init(input: &str, ctx: DocContext) -> Result<Self, FeedError> {
        let value: Value = serde_json::from_str(input).map_err(|_| FeedError::NotJson)?;
        let Value::Object(root) = value else {
            return Err(FeedError::NotJson);
        };
        let version = get_str(&root, "version")
            .and_then(|v| VERSION.captures(v))
            .map(|caps| caps[1].to_string())
            .ok_or(FeedError::NotJsonFeed)?;
        tracing::debug!(%version, "detected json feed");
        Ok(Self { root, version, ctx })
    }

    fn parse(&self) -> Feed {
        let s = Scope {
            doc: self,
            obj: &self.root,
        };
        let mut out = Feed::new(FeedFormat::Json);
        out.version = Some(self.version.clone());

        out.sched.expired = get_bool(s.obj, "expired");
        // JSON Feed has no feed-level id
        out.id = Some(String::new());
        out.lang = get_str(s.obj, "language").map(str::to_string);
        out.url = s.url("feed_url").or_else(|| self.ctx.base.clone());
        out.link = s.url("home_page_url");
        out.title = s.plain("title");
        out.summary = s.plain("description");
        out.icon = s.url("favicon");
        out.image = s.url("icon");
        out.people = authors(&s).unwrap_or_default();
        out.entries = get_array(s.obj, "items")
            .into_iter()
            .flatten()
            .filter_map(Value::as_object)
            .filter_map(|obj| entry(&Scope { doc: self, obj }, &out))
            .collect();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;
    use proptest::prelude::*;

    fn parse(doc: &str) -> Result<Feed, FeedError> {
        let opts = ParseOptions::builder().url("https://example.org/feed.json").build();
        JsonFeed::init(doc, DocContext::new(&opts)).map(|f| f.parse())
    }

    #[test]
    fn test_version_validation() {
        assert_eq!(parse("[1, 2]").unwrap_err(), FeedError::NotJson);
        assert_eq!(parse("{oops").unwrap_err(), FeedError::NotJson);
        assert_eq!(parse(r#"{"title": "x"}"#).unwrap_err(), FeedError::NotJsonFeed);
        assert_eq!(
            parse(r#"{"version": "https://jsonfeed.org/version/2.x"}"#).unwrap_err(),
            FeedError::NotJsonFeed
        );
        let feed = parse(r#"{"version": "https://jsonfeed.org/version/1.1"}"#).unwrap();
        assert_eq!(feed.version.as_deref(), Some("1.1"));
        assert_eq!(feed.id.as_deref(), Some(""));
    }

    #[test]
    fn test_numeric_ids() {
        let feed = parse(
            r#"{"version": "https://jsonfeed.org/version/1", "items": [
                {"id": 1.0}, {"id": 1.5e10}, {"id": 42}, {"id": "abc"}, {"id": ""}, {"title": "no id"}
            ]}"#,
        )
        .unwrap();
        let ids: Vec<&str> = feed.entries.iter().filter_map(|e| e.id.as_deref()).collect();
        assert_eq!(ids, ["1", "15000000000", "42", "abc"]);
    }

    #[test]
    fn test_float_to_decimal() {
        assert_eq!(float_to_decimal(0.25), "0.25");
        assert_eq!(float_to_decimal(-2.5e-7), "-0.00000025");
        assert_eq!(float_to_decimal(123.456), "123.456");
        assert_eq!(float_to_decimal(0.0), "0");
        assert_eq!(float_to_decimal(1e21), "1000000000000000000000");
    }

    #[test]
    fn test_feed_and_item_fields() {
        let feed = parse(
            r#"{
                "version": "https://jsonfeed.org/version/1.1",
                "title": "Blog",
                "home_page_url": "https://example.org/",
                "favicon": "/favicon.ico",
                "icon": "/icon.png",
                "language": "en",
                "expired": true,
                "authors": [{"name": "Ann", "avatar": "/ann.png"}, {"url": "https://nobody"}],
                "items": [{
                    "id": "1",
                    "url": "/posts/1",
                    "external_url": "https://elsewhere.example/",
                    "content_html": "<p>hi</p>",
                    "content_text": "hi",
                    "date_published": "2024-01-01T10:00:00Z",
                    "tags": ["a", "b", "a"],
                    "image": "/cover.jpg",
                    "attachments": [{"url": "/ep.mp3", "mime_type": "audio/mpeg", "size_in_bytes": 99, "duration_in_seconds": 61.5}]
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(feed.sched.expired, Some(true));
        assert_eq!(feed.icon.unwrap().to_string(), "https://example.org/favicon.ico");
        assert_eq!(feed.url.unwrap().to_string(), "https://example.org/feed.json");
        assert_eq!(feed.people.len(), 1);

        let entry = &feed.entries[0];
        assert_eq!(entry.lang.as_deref(), Some("en"));
        assert_eq!(entry.link.as_ref().unwrap().to_string(), "https://example.org/posts/1");
        assert_eq!(entry.related_link.as_ref().unwrap().host(), Some("elsewhere.example"));
        assert!(matches!(entry.content, Some(Text::Html { .. })));
        assert_eq!(entry.date_modified, entry.date_created);
        assert_eq!(entry.categories.list(false), ["a", "b"]);
        assert_eq!(entry.people.primary().unwrap().name.as_deref(), Some("Ann"));
        assert_eq!(entry.enclosures.len(), 2);
        let audio = entry.enclosures.primary().unwrap();
        assert_eq!(audio.duration, Some(Duration::from_millis(61_500)));
        assert_eq!(audio.size, Some(99));
    }

    proptest! {
        #[test]
        fn float_ids_read_back_exactly(
            f in proptest::num::f64::NORMAL | proptest::num::f64::SUBNORMAL
        ) {
            let s = float_to_decimal(f);
            prop_assert!(!s.contains('e') && !s.contains('E'));
            prop_assert_eq!(s.parse::<f64>().unwrap(), f);
        }
    }
}
