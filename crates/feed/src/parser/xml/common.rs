// ABOUTME: Primitives shared by feed-level and entry-level XML resolvers.
// ABOUTME: Covers Atom text constructs, people, categories, links and ambiguous dates.

use once_cell::sync::Lazy;
use regex::Regex;

use super::dom::Element;
use super::ns;
use super::Scope;
use crate::date::Date;
use crate::mime::MimeType;
use crate::models::{Category, CategoryCollection, Person, PersonCollection, Role};
use crate::parser::first_of;
use crate::text::Text;
use crate::url::Url;

/// `mail (Name)`
static MAIL_THEN_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\S+@\S+)\s*\((.*)\)$").expect("valid person pattern"));
/// `Name <mail>`
static NAME_THEN_MAIL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*?)\s*<([^<>\s]+@[^<>\s]+)>$").expect("valid person pattern"));

pub(crate) type PeopleChain = [fn(&Scope<'_>) -> Option<PersonCollection>];

/// Reads an Atom text construct (`title`, `subtitle`, `summary`, `rights`).
pub(crate) fn atom_text(el: &Element) -> Option<Text> {
    let mime = MimeType::parse_atom(el.attr("type").unwrap_or(""));
    let base = el.base.clone();
    let text = if mime.is_xhtml() {
        let div = el.child(Some(ns::XHTML), "div");
        Text::xhtml(div.map_or_else(|| el.inner_xml(), Element::inner_xml), base)
    } else if mime.is_html() {
        Text::html(el.text(), base)
    } else if mime.is_text() {
        Text::plain(el.text().trim())
    } else if mime.is_xml() {
        Text::xhtml(el.inner_xml(), base)
    } else {
        return None;
    };
    text.non_empty()
}

pub(crate) fn atom_text_child(node: &Element, name: &str) -> Option<Text> {
    node.children_named(Some(ns::ATOM), name).find_map(atom_text)
}

pub(crate) fn plain_child(node: &Element, ns: Option<&str>, name: &str) -> Option<Text> {
    node.child_text(ns, name).map(Text::plain)
}

pub(crate) fn loose_child(node: &Element, ns: Option<&str>, name: &str) -> Option<Text> {
    node.child_text(ns, name).map(Text::loose)
}

pub(crate) fn url_child(node: &Element, ns: Option<&str>, name: &str) -> Option<Url> {
    node.children_named(ns, name)
        .find_map(|el| el.trimmed_text().and_then(|t| el.resolve(&t)))
}

pub(crate) fn url_attr(node: &Element, ns: Option<&str>, name: &str, attr: &str) -> Option<Url> {
    node.children_named(ns, name)
        .find_map(|el| el.attr(attr).and_then(|v| el.resolve(v)))
}

/// Atom links with the given relation; a missing `rel` means `alternate`.
pub(crate) fn atom_links<'a>(
    node: &'a Element,
    rel: &'a str,
) -> impl Iterator<Item = &'a Element> + 'a {
    node.children_named(Some(ns::ATOM), "link").filter(move |l| {
        let own = l.attr("rel").unwrap_or("alternate").trim();
        let iana = format!("http://www.iana.org/assignments/relation/{}", rel);
        own.eq_ignore_ascii_case(rel) || own.eq_ignore_ascii_case(&iana)
    })
}

pub(crate) fn atom_link_href(node: &Element, rel: &str) -> Option<Url> {
    atom_links(node, rel).find_map(|l| l.attr("href").and_then(|h| l.resolve(h)))
}

/// Best web representation among Atom alternates: HTML, then XHTML, then untyped.
pub(crate) fn atom_alternate(node: &Element) -> Option<Url> {
    let rank = |link: &Element| match link.attr("type").map(MimeType::parse) {
        None => Some(2),
        Some(Some(m)) if m.is_html() => Some(0),
        Some(Some(m)) if m.is_xhtml() => Some(1),
        _ => None,
    };
    atom_links(node, "alternate")
        .filter_map(|l| Some((rank(l)?, l)))
        .filter_map(|(r, l)| Some((r, l.resolve(l.attr("href")?)?)))
        .min_by_key(|(r, _)| *r)
        .map(|(_, url)| url)
}

pub(crate) fn date(scope: &Scope<'_>, text: &str) -> Option<Date> {
    Date::parse_at(text, scope.doc.ctx().reference_time)
}

pub(crate) fn date_child(scope: &Scope<'_>, ns: Option<&str>, name: &str) -> Option<Date> {
    scope
        .node
        .children_named(ns, name)
        .find_map(|el| el.trimmed_text().and_then(|t| date(scope, &t)))
}

/// Dates whose created/modified meaning is not explicit, in document order.
pub(crate) fn ambiguous_dates(scope: &Scope<'_>, rss2_names: &[&str]) -> Vec<Date> {
    let mut sources: Vec<(Option<&str>, &str)> = Vec::new();
    if scope.rss2().is_some() {
        sources.extend(rss2_names.iter().map(|n| (None, *n)));
    }
    sources.extend([
        (Some(ns::DC), "date"),
        (Some(ns::DCTERMS), "created"),
        (Some(ns::DCTERMS), "issued"),
        (Some(ns::DCTERMS), "modified"),
    ]);
    sources
        .into_iter()
        .flat_map(|(ns, name)| scope.node.children_named(ns, name))
        .filter_map(|el| el.trimmed_text().and_then(|t| date(scope, &t)))
        .collect()
}

fn collection(people: impl IntoIterator<Item = Person>) -> Option<PersonCollection> {
    let people: PersonCollection = people.into_iter().collect();
    (!people.is_empty()).then_some(people)
}

/// An Atom person construct.
pub(crate) fn atom_person(el: &Element, role: Role) -> Person {
    Person {
        name: el.child_text(Some(ns::ATOM), "name"),
        mail: el.child_text(Some(ns::ATOM), "email"),
        url: url_child(el, Some(ns::ATOM), "uri"),
        ..Person::new(role)
    }
}

pub(crate) fn atom_people(node: &Element, name: &str, role: Role) -> Option<PersonCollection> {
    collection(node.children_named(Some(ns::ATOM), name).map(|el| atom_person(el, role.clone())))
}

/// People whose element text is simply a name.
pub(crate) fn named_people(
    node: &Element,
    ns: Option<&str>,
    name: &str,
    role: Role,
) -> Option<PersonCollection> {
    collection(node.children_named(ns, name).filter_map(Element::trimmed_text).map(|n| Person {
        name: Some(n),
        ..Person::new(role.clone())
    }))
}

/// Parses RSS 2.0 person text: `mail (Name)`, `Name <mail>`, a bare address or a bare name.
pub(crate) fn rss_person(text: &str, role: Role) -> Person {
    let text = text.trim();
    let mut person = Person::new(role);
    if let Some(caps) = MAIL_THEN_NAME.captures(text) {
        person.mail = Some(caps[1].to_string());
        person.name = Some(caps[2].trim().to_string()).filter(|n| !n.is_empty());
    } else if let Some(caps) = NAME_THEN_MAIL.captures(text) {
        person.name = Some(caps[1].trim().to_string()).filter(|n| !n.is_empty());
        person.mail = Some(caps[2].to_string());
    } else if text.contains('@') && !text.contains(char::is_whitespace) {
        person.mail = Some(text.trim_start_matches("mailto:").to_string());
    } else if !text.is_empty() {
        person.name = Some(text.to_string());
    }
    person
}

pub(crate) fn rss_people(node: &Element, name: &str, role: Role) -> Option<PersonCollection> {
    collection(
        node.children_named(None, name)
            .filter_map(Element::trimmed_text)
            .map(|t| rss_person(&t, role.clone())),
    )
}

fn itunes_owner(scope: &Scope<'_>) -> Option<PersonCollection> {
    collection(scope.node.children_named(Some(ns::ITUNES), "owner").map(|el| Person {
        name: el.child_text(Some(ns::ITUNES), "name"),
        mail: el.child_text(Some(ns::ITUNES), "email"),
        ..Person::new(Role::Webmaster)
    }))
}

pub(crate) const AUTHORS: &PeopleChain = &[
    |s| atom_people(s.node, "author", Role::Author),
    |s| named_people(s.node, Some(ns::DC), "creator", Role::Author),
    |s| s.rss2().and_then(|_| rss_people(s.node, "author", Role::Author)),
    |s| named_people(s.node, Some(ns::ITUNES), "author", Role::Author),
    |s| named_people(s.node, Some(ns::GOOGLEPLAY), "author", Role::Author),
];

pub(crate) const CONTRIBUTORS: &PeopleChain = &[
    |s| atom_people(s.node, "contributor", Role::Contributor),
    |s| named_people(s.node, Some(ns::DC), "contributor", Role::Contributor),
];

pub(crate) const EDITORS: &PeopleChain = &[
    |s| s.rss2().and_then(|_| rss_people(s.node, "managingEditor", Role::Editor)),
    |s| named_people(s.node, Some(ns::DC), "publisher", Role::Editor),
];

pub(crate) const WEBMASTERS: &PeopleChain = &[
    |s| s.rss2().and_then(|_| rss_people(s.node, "webMaster", Role::Webmaster)),
    itunes_owner,
];

/// Resolves each role chain independently and merges them in order.
pub(crate) fn merged_people(scope: &Scope<'_>, chains: &[&PeopleChain]) -> PersonCollection {
    let resolved: Vec<PersonCollection> = chains
        .iter()
        .filter_map(|&chain| first_of(chain, scope))
        .collect();
    let mut people = PersonCollection::new();
    people.merge(&resolved);
    people
}

fn categories_of(items: impl IntoIterator<Item = Category>) -> Option<CategoryCollection> {
    let cats: CategoryCollection = items.into_iter().collect();
    (!cats.is_empty()).then_some(cats)
}

pub(crate) fn atom_categories(node: &Element) -> Option<CategoryCollection> {
    categories_of(node.children_named(Some(ns::ATOM), "category").filter_map(|el| {
        Some(Category {
            label: el.attr("label").map(str::trim).filter(|l| !l.is_empty()).map(str::to_string),
            domain: el.attr("scheme").map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
            ..Category::new(el.attr("term")?.trim())
        })
    }))
}

fn rss_categories(scope: &Scope<'_>) -> Option<CategoryCollection> {
    scope.rss2()?;
    categories_of(scope.node.children_named(None, "category").filter_map(|el| {
        Some(Category {
            domain: el.attr("domain").map(str::trim).filter(|d| !d.is_empty()).map(str::to_string),
            ..Category::new(el.trimmed_text()?)
        })
    }))
}

fn dc_subjects(scope: &Scope<'_>) -> Option<CategoryCollection> {
    categories_of(
        scope
            .node
            .children_named(Some(ns::DC), "subject")
            .filter_map(Element::trimmed_text)
            .map(Category::new),
    )
}

fn itunes_categories(scope: &Scope<'_>) -> Option<CategoryCollection> {
    categories_of(scope.node.children_named(Some(ns::ITUNES), "category").filter_map(|el| {
        let sub = el
            .children_named(Some(ns::ITUNES), "category")
            .find_map(|s| s.attr("text"))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Some(Category {
            subcategory: sub,
            ..Category::new(el.attr("text")?.trim())
        })
    }))
}

const CATEGORIES: &[fn(&Scope<'_>) -> Option<CategoryCollection>] = &[
    |s| atom_categories(s.node),
    rss_categories,
    dc_subjects,
    itunes_categories,
];

pub(crate) fn categories(scope: &Scope<'_>) -> CategoryCollection {
    first_of(CATEGORIES, scope).unwrap_or_default()
}
