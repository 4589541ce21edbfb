// ABOUTME: Feed-level resolution chains for XML newsfeeds.
// ABOUTME: Each field is an ordered list of primitives evaluated by first_of.

use chrono::Weekday;
use std::time::Duration;

use super::common::{self, atom_text_child, loose_child, plain_child, url_attr, url_child};
use super::ns;
use super::Scope;
use crate::date::Date;
use crate::models::{PersonCollection, Schedule};
use crate::parser::first_of;
use crate::text::Text;
use crate::url::Url;

type Chain<T> = [fn(&Scope<'_>) -> Option<T>];

const HOUR: u64 = 3600;

/// Syndication module interval, then RSS 2.0 `ttl`.
fn sy_interval(s: &Scope<'_>) -> Option<Duration> {
    let period = s.node.child_text(Some(ns::SY), "updatePeriod");
    let frequency = s.node.child_text(Some(ns::SY), "updateFrequency");
    if period.is_none() && frequency.is_none() {
        return None;
    }
    let period_secs = match period.as_deref().map(str::to_ascii_lowercase).as_deref() {
        Some("hourly") => HOUR,
        None | Some("daily") => 24 * HOUR,
        Some("weekly") => 7 * 24 * HOUR,
        Some("monthly") => 30 * 24 * HOUR,
        Some("yearly") => 365 * 24 * HOUR,
        Some(_) => return None,
    };
    let frequency = match frequency {
        Some(f) => f.parse::<u64>().ok().filter(|f| *f > 0)?,
        None => 1,
    };
    Some(Duration::from_secs(period_secs / frequency))
}

fn ttl(s: &Scope<'_>) -> Option<Duration> {
    s.rss2()?;
    let minutes: u64 = s.node.child_text(None, "ttl")?.parse().ok()?;
    minutes.checked_mul(60).map(Duration::from_secs)
}

const INTERVAL: &Chain<Duration> = &[sy_interval, ttl];

fn weekday(name: &str) -> Option<Weekday> {
    name.trim().parse::<Weekday>().ok()
}

pub(crate) fn schedule(s: &Scope<'_>) -> Schedule {
    let mut sched = Schedule {
        interval: first_of(INTERVAL, s),
        base: common::date_child(s, Some(ns::SY), "updateBase"),
        ..Schedule::default()
    };
    if s.rss2().is_some() {
        if let Some(hours) = s.node.child(None, "skipHours") {
            for hour in hours.children_named(None, "hour").filter_map(|h| h.trimmed_text()) {
                if let Ok(hour) = hour.parse::<u32>() {
                    sched.skip_hour(hour);
                }
            }
        }
        if let Some(days) = s.node.child(None, "skipDays") {
            for day in days.children_named(None, "day").filter_map(|d| d.trimmed_text()) {
                if let Some(day) = weekday(&day) {
                    sched.skip_day(day);
                }
            }
        }
    }
    if let Some(complete) = s.node.child_text(Some(ns::ITUNES), "complete") {
        sched.expired = Some(complete.eq_ignore_ascii_case("yes"));
    }
    sched.infer_expired();
    sched
}

const ID: &Chain<String> = &[
    |s| s.node.child_text(Some(ns::ATOM), "id"),
    |s| s.node.child_text(Some(ns::DC), "identifier"),
];

pub(crate) fn id(s: &Scope<'_>) -> Option<String> {
    first_of(ID, s)
}

const LANG: &Chain<String> = &[
    |s| s.node.lang.clone(),
    |s| s.node.child_text(Some(ns::DC), "language"),
    |s| s.rss2().and_then(|_| s.node.child_text(None, "language")),
];

pub(crate) fn lang(s: &Scope<'_>) -> Option<String> {
    first_of(LANG, s)
}

const URL: &Chain<Url> = &[
    |s| common::atom_link_href(s.node, "self"),
    |s| s.doc.ctx().base.clone(),
];

pub(crate) fn url(s: &Scope<'_>) -> Option<Url> {
    first_of(URL, s)
}

const LINK: &Chain<Url> = &[
    |s| common::atom_alternate(s.node),
    |s| url_child(s.node, Some(s.rss1()?), "link"),
    |s| s.rss2().and_then(|_| url_child(s.node, None, "link")),
];

pub(crate) fn link(s: &Scope<'_>) -> Option<Url> {
    first_of(LINK, s)
}

const TITLE: &Chain<Text> = &[
    |s| atom_text_child(s.node, "title"),
    |s| plain_child(s.node, Some(s.rss1()?), "title"),
    |s| s.rss2().and_then(|_| loose_child(s.node, None, "title")),
    |s| plain_child(s.node, Some(ns::DC), "title"),
    |s| plain_child(s.node, Some(ns::ITUNES), "title"),
];

pub(crate) fn title(s: &Scope<'_>) -> Option<Text> {
    first_of(TITLE, s)
}

// Dublin Core comes first: Atom's subtitle is only a weak analog of a summary.
const SUMMARY: &Chain<Text> = &[
    |s| plain_child(s.node, Some(ns::DC), "description"),
    |s| atom_text_child(s.node, "subtitle"),
    |s| plain_child(s.node, Some(s.rss1()?), "description"),
    |s| s.rss2().and_then(|_| loose_child(s.node, None, "description")),
    |s| plain_child(s.node, Some(ns::ITUNES), "summary"),
    |s| plain_child(s.node, Some(ns::ITUNES), "subtitle"),
];

pub(crate) fn summary(s: &Scope<'_>) -> Option<Text> {
    first_of(SUMMARY, s)
}

const DATE_MODIFIED: &Chain<Date> = &[
    |s| common::date_child(s, Some(ns::ATOM), "updated"),
    |s| common::ambiguous_dates(s, &["pubDate", "lastBuildDate"]).into_iter().max(),
];

pub(crate) fn date_modified(s: &Scope<'_>) -> Option<Date> {
    first_of(DATE_MODIFIED, s)
}

pub(crate) fn icon(s: &Scope<'_>) -> Option<Url> {
    url_child(s.node, Some(ns::ATOM), "icon")
}

/// RSS 1.0 image: `rdf:resource` on the channel's `image`, or the root-level
/// image's `url`.
fn rss1_image(s: &Scope<'_>) -> Option<Url> {
    let rss = s.rss1()?;
    let from_channel = s
        .node
        .children_named(Some(rss), "image")
        .find_map(|img| img.attr_ns(Some(ns::RDF), "resource").and_then(|r| img.resolve(r)));
    from_channel.or_else(|| {
        s.doc
            .root()
            .children_named(Some(rss), "image")
            .find_map(|img| url_child(img, Some(rss), "url"))
    })
}

const IMAGE: &Chain<Url> = &[
    |s| url_child(s.node, Some(ns::ATOM), "logo"),
    rss1_image,
    |s| {
        s.rss2()?;
        s.node
            .children_named(None, "image")
            .find_map(|img| url_child(img, None, "url"))
    },
    |s| url_attr(s.node, Some(ns::ITUNES), "image", "href"),
    |s| url_attr(s.node, Some(ns::GOOGLEPLAY), "image", "href"),
    |s| url_attr(s.node, Some(ns::MEDIA), "thumbnail", "url"),
];

pub(crate) fn image(s: &Scope<'_>) -> Option<Url> {
    first_of(IMAGE, s)
}

pub(crate) fn people(s: &Scope<'_>) -> PersonCollection {
    common::merged_people(
        s,
        &[common::AUTHORS, common::CONTRIBUTORS, common::EDITORS, common::WEBMASTERS],
    )
}
