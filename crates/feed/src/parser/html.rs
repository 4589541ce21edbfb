// ABOUTME: Microformats2 h-feed/h-entry parser over a scraper HTML document.
// ABOUTME: Reads p-/u-/dt-/e- properties without descending into nested microformat roots.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::date::Date;
use crate::error::FeedError;
use crate::html_utils::collapse_whitespace;
use crate::mime::MimeType;
use crate::models::{
    Category, CategoryCollection, Enclosure, EnclosureCollection, Entry, Feed, FeedFormat, Person,
    PersonCollection, Role,
};
use crate::parser::xml::dom;
use crate::parser::{first_of, DocContext, FeedSource};
use crate::text::Text;
use crate::url::Url;

static BASE: Lazy<Selector> = Lazy::new(|| Selector::parse("base[href]").expect("valid selector"));
static TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static ICON: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"link[rel~="icon"][href]"#).expect("valid selector"));
static H_FEED: Lazy<Selector> = Lazy::new(|| Selector::parse(".h-feed").expect("valid selector"));

fn has_class(el: &ElementRef<'_>, class: &str) -> bool {
    el.value().classes().any(|c| c == class)
}

/// True for elements starting a microformat (`h-*`).
fn is_root(el: &ElementRef<'_>) -> bool {
    el.value().classes().any(|c| c.starts_with("h-"))
}

/// Descendants carrying `class`, not looking inside other microformat roots.
fn collect<'a>(el: ElementRef<'a>, class: &str, out: &mut Vec<ElementRef<'a>>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        if has_class(&child, class) {
            out.push(child);
        }
        if !is_root(&child) {
            collect(child, class, out);
        }
    }
}

fn text_of(el: &ElementRef<'_>) -> Option<String> {
    let text = collapse_whitespace(&el.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn attr<'a>(el: &ElementRef<'a>, name: &str) -> Option<&'a str> {
    el.value().attr(name).map(str::trim).filter(|v| !v.is_empty())
}

fn p_value(el: &ElementRef<'_>) -> Option<String> {
    let from_attr = match el.value().name() {
        "abbr" | "link" => attr(el, "title"),
        "data" | "input" => attr(el, "value"),
        "img" | "area" => attr(el, "alt"),
        _ => None,
    };
    from_attr.map(str::to_string).or_else(|| text_of(el))
}

fn u_raw(el: &ElementRef<'_>) -> Option<String> {
    let from_attr = match el.value().name() {
        "a" | "area" | "link" => attr(el, "href"),
        "img" | "audio" | "video" | "source" | "iframe" => attr(el, "src"),
        "object" => attr(el, "data"),
        _ => None,
    };
    from_attr.map(str::to_string).or_else(|| text_of(el))
}

fn dt_value(el: &ElementRef<'_>) -> Option<String> {
    let from_attr = match el.value().name() {
        "time" | "ins" | "del" => attr(el, "datetime"),
        "abbr" => attr(el, "title"),
        "data" | "input" => attr(el, "value"),
        _ => None,
    };
    from_attr.map(str::to_string).or_else(|| text_of(el))
}

/// A validated HTML document with microformat feed markup.
#[derive(Debug)]
pub struct HtmlFeed {
    doc: Html,
    base: Option<Url>,
    ctx: DocContext,
}

/// A microformat root being resolved.
#[derive(Clone, Copy)]
struct Scope<'a> {
    doc: &'a HtmlFeed,
    el: ElementRef<'a>,
}

impl<'a> Scope<'a> {
    fn props(&self, class: &str) -> Vec<ElementRef<'a>> {
        let mut out = Vec::new();
        collect(self.el, class, &mut out);
        out
    }

    fn p(&self, name: &str) -> Option<String> {
        self.props(&format!("p-{}", name)).iter().find_map(p_value)
    }

    fn u_raw(&self, name: &str) -> Option<String> {
        self.props(&format!("u-{}", name)).iter().find_map(u_raw)
    }

    fn u_all(&self, name: &str) -> Vec<Url> {
        self.props(&format!("u-{}", name))
            .iter()
            .filter_map(u_raw)
            .filter_map(|raw| self.doc.resolve(&raw))
            .collect()
    }

    fn u(&self, name: &str) -> Option<Url> {
        self.u_all(name).into_iter().next()
    }

    fn dt(&self, name: &str) -> Option<Date> {
        self.props(&format!("dt-{}", name))
            .iter()
            .filter_map(dt_value)
            .find_map(|v| Date::parse_at(&v, self.doc.ctx.reference_time))
    }

    fn e(&self, name: &str) -> Option<Text> {
        self.props(&format!("e-{}", name))
            .iter()
            .find_map(|el| Text::html(el.inner_html().trim(), self.doc.base.clone()).non_empty())
    }

    fn people(&self, name: &str, role: Role) -> PersonCollection {
        self.props(&format!("p-{}", name))
            .into_iter()
            .map(|el| self.doc.person(el, role.clone()))
            .collect()
    }

    fn categories(&self) -> CategoryCollection {
        self.props("p-category")
            .iter()
            .filter_map(p_value)
            .map(Category::new)
            .collect()
    }

    fn lang(&self) -> Option<String> {
        std::iter::once(self.el)
            .chain(self.el.ancestors().filter_map(ElementRef::wrap))
            .find_map(|el| attr(&el, "lang"))
            .map(str::to_string)
    }

    /// Entry roots inside this scope.
    fn entries(&self) -> Vec<ElementRef<'a>> {
        let mut out = Vec::new();
        collect(self.el, "h-entry", &mut out);
        out
    }
}

impl HtmlFeed {
    fn resolve(&self, reference: &str) -> Option<Url> {
        Url::resolve_opt(reference, self.base.as_ref())
    }

    /// The h-feed root, or the whole document for a page of bare h-entries.
    fn feed_root(&self) -> Option<(ElementRef<'_>, bool)> {
        if let Some(feed) = self.doc.select(&H_FEED).next() {
            return Some((feed, true));
        }
        let scope = Scope {
            doc: self,
            el: self.doc.root_element(),
        };
        let top = if has_class(&scope.el, "h-entry") || !scope.entries().is_empty() {
            Some(scope.el)
        } else {
            None
        };
        top.map(|el| (el, false))
    }

    fn person(&self, el: ElementRef<'_>, role: Role) -> Person {
        if has_class(&el, "h-card") {
            let card = Scope { doc: self, el };
            return Person {
                name: card.p("name").or_else(|| text_of(&el)),
                mail: card
                    .u_raw("email")
                    .map(|m| m.trim_start_matches("mailto:").to_string()),
                url: card.u("url"),
                avatar: card.u("photo"),
                ..Person::new(role)
            };
        }
        Person {
            name: p_value(&el),
            url: match el.value().name() {
                "a" | "link" => attr(&el, "href").and_then(|h| self.resolve(h)),
                _ => None,
            },
            ..Person::new(role)
        }
    }
}

const FEED_ID: &[fn(&Scope<'_>) -> Option<String>] = &[|s| s.u_raw("uid")];

const FEED_LINK: &[fn(&Scope<'_>) -> Option<Url>] = &[|s| s.u("url"), |s| s.doc.ctx.base.clone()];

const FEED_TITLE: &[fn(&Scope<'_>) -> Option<Text>] = &[
    |s| s.p("name").map(Text::plain),
    |s| {
        let title = s.doc.doc.select(&TITLE).next()?;
        text_of(&title).map(Text::plain)
    },
];

const FEED_IMAGE: &[fn(&Scope<'_>) -> Option<Url>] = &[|s| s.u("photo"), |s| s.u("logo")];

const ENTRY_ID: &[fn(&Scope<'_>) -> Option<String>] = &[
    |s| s.u_raw("uid"),
    |s| s.u("url").map(|u| u.to_string()),
];

const ENTRY_MODIFIED: &[fn(&Scope<'_>) -> Option<Date>] =
    &[|s| s.dt("updated"), |s| s.dt("published")];

fn enclosures(s: &Scope<'_>) -> EnclosureCollection {
    let mut out = EnclosureCollection::new();
    for (prop, medium) in [("photo", "image"), ("audio", "audio"), ("video", "video")] {
        for url in s.u_all(prop) {
            let mime = MimeType::from_url(&url)
                .filter(|m| m.medium() == medium)
                .or_else(|| MimeType::parse_loose(medium, None));
            out.push(Enclosure {
                mime,
                ..Enclosure::new(url)
            });
        }
    }
    out
}

fn entry(s: &Scope<'_>, feed: &Feed) -> Entry {
    let authors = s.people("author", Role::Author);
    let authors = if authors.is_empty() {
        feed.people.filter_role(&Role::Author)
    } else {
        authors
    };
    let mut people = PersonCollection::new();
    people.merge([&authors, &s.people("contributor", Role::Contributor)]);

    Entry {
        id: first_of(ENTRY_ID, s),
        lang: s.lang().or_else(|| feed.lang.clone()),
        link: s.u("url"),
        related_link: None,
        title: s.p("name").map(Text::plain),
        content: s.e("content"),
        summary: s.p("summary").map(Text::plain),
        date_created: s.dt("published"),
        date_modified: first_of(ENTRY_MODIFIED, s),
        banner: s.u("featured"),
        categories: s.categories(),
        people,
        enclosures: enclosures(s),
    }
}

impl FeedSource for HtmlFeed {
    fn init(input: &str, ctx: DocContext) -> Result<Self, FeedError> {
        if !input.trim_start_matches('\u{feff}').trim_start().starts_with('<') {
            return Err(FeedError::NotHtmlType);
        }
        if ctx.content_type.as_ref().is_some_and(MimeType::is_xhtml) {
            dom::parse_document(input, None).map_err(|err| match err {
                FeedError::NotXml(msg) => FeedError::NotXhtml(msg),
                other => other,
            })?;
        }
        let doc = Html::parse_document(input);
        let base = doc
            .select(&BASE)
            .next()
            .and_then(|b| b.value().attr("href"))
            .and_then(|href| Url::resolve_opt(href, ctx.base.as_ref()))
            .or_else(|| ctx.base.clone());
        let feed = HtmlFeed { doc, base, ctx };
        match feed.feed_root() {
            Some((_, explicit)) => {
                tracing::debug!(explicit, "detected h-feed");
                Ok(feed)
            }
            None => Err(FeedError::NotHtmlFeed),
        }
    }

    fn parse(&self) -> Feed {
        let mut out = Feed::new(FeedFormat::HFeed);
        let Some((root, explicit)) = self.feed_root() else {
            return out;
        };
        let s = Scope { doc: self, el: root };

        out.id = first_of(FEED_ID, &s);
        out.lang = s.lang();
        out.url = self.ctx.base.clone();
        out.link = first_of(FEED_LINK, &s);
        out.title = first_of(FEED_TITLE, &s);
        out.summary = s.p("summary").map(Text::plain);
        out.date_modified = s.dt("updated");
        out.icon = self
            .doc
            .select(&ICON)
            .next()
            .and_then(|l| l.value().attr("href"))
            .and_then(|h| self.resolve(h));
        out.image = first_of(FEED_IMAGE, &s);
        out.people = s.people("author", Role::Author);
        out.categories = s.categories();

        let roots = if !explicit && has_class(&root, "h-entry") {
            vec![root]
        } else {
            s.entries()
        };
        out.entries = roots
            .into_iter()
            .map(|el| entry(&Scope { doc: self, el }, &out))
            .collect();
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::ParseOptions;

    fn parse(doc: &str) -> Result<Feed, FeedError> {
        parse_as(doc, None)
    }

    fn parse_as(doc: &str, content_type: Option<&str>) -> Result<Feed, FeedError> {
        let mut builder = ParseOptions::builder().url("https://blog.example/");
        if let Some(ct) = content_type {
            builder = builder.content_type(ct);
        }
        HtmlFeed::init(doc, DocContext::new(&builder.build())).map(|f| f.parse())
    }

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en"><head><title>Page Title</title><link rel="shortcut icon" href="/fav.ico"></head>
<body>
  <div class="h-feed">
    <h1 class="p-name">My Feed</h1>
    <a class="p-author h-card" href="/me"><img class="u-photo" src="/me.jpg" alt=""><span class="p-name">Me</span></a>
    <article class="h-entry">
      <a class="u-url" href="/post/1"><span class="p-name">First</span></a>
      <time class="dt-published" datetime="2024-02-01T09:00:00Z">Feb 1</time>
      <div class="e-content"><p>Hello <b>world</b></p></div>
      <span class="p-category">rust</span>
      <img class="u-photo" src="/p1.png">
      <div class="h-cite"><span class="p-name">Quoted, not mine</span></div>
    </article>
    <article class="h-entry">
      <a class="u-url" href="/post/2">second</a>
      <a class="p-author" href="https://guest.example/">Guest</a>
    </article>
  </div>
</body></html>"#;

    #[test]
    fn test_h_feed_fields() {
        let feed = parse(PAGE).unwrap();
        assert_eq!(feed.format, FeedFormat::HFeed);
        assert_eq!(feed.title, Some(Text::plain("My Feed")));
        assert_eq!(feed.lang.as_deref(), Some("en"));
        assert_eq!(feed.icon.unwrap().to_string(), "https://blog.example/fav.ico");
        let author = feed.people.primary().unwrap();
        assert_eq!(author.name.as_deref(), Some("Me"));
        assert_eq!(author.avatar.as_ref().unwrap().to_string(), "https://blog.example/me.jpg");
        assert_eq!(feed.entries.len(), 2);
    }

    #[test]
    fn test_h_entry_properties() {
        let feed = parse(PAGE).unwrap();
        let first = &feed.entries[0];
        assert_eq!(first.id.as_deref(), Some("https://blog.example/post/1"));
        assert_eq!(first.title, Some(Text::plain("First")));
        assert_eq!(first.date_created.as_ref().unwrap().normalize(), "2024-02-01T09:00:00Z");
        assert_eq!(first.date_modified, first.date_created);
        assert!(first.content.as_ref().unwrap().as_str().contains("<b>world</b>"));
        assert_eq!(first.categories.list(false), ["rust"]);
        assert_eq!(first.enclosures.len(), 1);
        assert_eq!(first.people.primary().unwrap().name.as_deref(), Some("Me"));

        let second = &feed.entries[1];
        assert_eq!(second.title, None);
        let guest = second.people.primary().unwrap();
        assert_eq!(guest.name.as_deref(), Some("Guest"));
        assert_eq!(guest.url.as_ref().unwrap().host(), Some("guest.example"));
    }

    #[test]
    fn test_bare_h_entry_page_is_an_implied_feed() {
        let feed = parse(
            r#"<html><head><title>Just a post</title></head><body>
               <div class="h-entry"><span class="p-name">Solo</span></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(feed.title, Some(Text::plain("Just a post")));
        assert_eq!(feed.entries.len(), 1);
        assert_eq!(feed.entries[0].title, Some(Text::plain("Solo")));
    }

    #[test]
    fn test_rejections() {
        assert_eq!(parse("not markup").unwrap_err(), FeedError::NotHtmlType);
        assert_eq!(
            parse("<html><body><p>hi</p></body></html>").unwrap_err(),
            FeedError::NotHtmlFeed
        );
        assert!(matches!(
            parse_as("<html><body><br></body></html>", Some("application/xhtml+xml")).unwrap_err(),
            FeedError::NotXhtml(_)
        ));
    }

    #[test]
    fn test_base_element_resolves_urls() {
        let feed = parse(
            r#"<html><head><base href="https://cdn.example/site/"></head><body>
               <div class="h-entry"><a class="u-url" href="post">p</a></div></body></html>"#,
        )
        .unwrap();
        assert_eq!(
            feed.entries[0].link.as_ref().unwrap().to_string(),
            "https://cdn.example/site/post"
        );
    }
}
