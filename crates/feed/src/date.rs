// ABOUTME: Date model and multi-grammar parser for feed and HTTP dates.
// ABOUTME: Handles RFC 3339, RFC 822, RFC 850 and asctime with zone names, century rules and weekday checks.

//! Dates.
//!
//! [`Date::parse`] tries four grammars in order: RFC 3339, RFC 822 (and its
//! RFC 1123 profile), RFC 850 and asctime. All of them accept optional
//! fractional seconds and an absent, numeric or named time zone.
//!
//! A missing zone, `-0000` and `-00:00` all mean "offset unknown". Such
//! dates are treated as UTC for comparison but keep the `-00:00` marker
//! when displayed.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Timelike, Utc,
    Weekday,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

static RFC3339: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<year>\d{4})-(?P<month>\d{2})-(?P<day>\d{2})(?:[Tt ](?P<hour>\d{2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?(?:[.,](?P<frac>\d+))?\s*(?P<zone>[Zz]|[+-]\d{2}(?::?\d{2})?|[A-Za-z]{1,5})?)?$",
    )
    .expect("valid RFC 3339 pattern")
});

static RFC822: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<wday>[A-Za-z]+)\s*,?\s+)?(?P<day>\d{1,2})\s+(?P<month>[A-Za-z]+)\.?\s+(?P<year>\d{4}|\d{2})\s+(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?(?:[.,](?P<frac>\d+))?(?:\s*(?P<zone>[+-]\d{2}(?::?\d{2})?|[A-Za-z]{1,5}))?$",
    )
    .expect("valid RFC 822 pattern")
});

static RFC850: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<wday>[A-Za-z]+)\s*,?\s*)?(?P<day>\d{1,2})-(?P<month>[A-Za-z]+)-(?P<year>\d{4}|\d{2})\s+(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?(?:[.,](?P<frac>\d+))?(?:\s*(?P<zone>[+-]\d{2}(?::?\d{2})?|[A-Za-z]{1,5}))?$",
    )
    .expect("valid RFC 850 pattern")
});

static ASCTIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:(?P<wday>[A-Za-z]+)\s+)?(?P<month>[A-Za-z]+)\s+(?P<day>\d{1,2})\s+(?P<hour>\d{1,2}):(?P<minute>\d{2})(?::(?P<second>\d{2}))?(?:[.,](?P<frac>\d+))?\s+(?P<year>\d{4})(?:\s+(?P<zone>[+-]\d{2}(?::?\d{2})?|[A-Za-z]{1,5}))?$",
    )
    .expect("valid asctime pattern")
});

/// Named zone abbreviations (seconds east of UTC); first match wins.
const ZONES: &[(&str, i32)] = &[
    ("UT", 0),
    ("UTC", 0),
    ("GMT", 0),
    ("Z", 0),
    ("EST", -5 * 3600),
    ("EDT", -4 * 3600),
    ("CST", -6 * 3600),
    ("CDT", -5 * 3600),
    ("MST", -7 * 3600),
    ("MDT", -6 * 3600),
    ("PST", -8 * 3600),
    ("PDT", -7 * 3600),
    ("AKST", -9 * 3600),
    ("AKDT", -8 * 3600),
    ("HST", -10 * 3600),
    ("AST", -4 * 3600),
    ("ADT", -3 * 3600),
    ("NST", -(3 * 3600 + 30 * 60)),
    ("NDT", -(2 * 3600 + 30 * 60)),
    ("WET", 0),
    ("WEST", 3600),
    ("CET", 3600),
    ("CEST", 2 * 3600),
    ("EET", 2 * 3600),
    ("EEST", 3 * 3600),
    ("BST", 3600),
    ("IST", 5 * 3600 + 30 * 60),
    ("JST", 9 * 3600),
    ("KST", 9 * 3600),
    ("AEST", 10 * 3600),
    ("AEDT", 11 * 3600),
    ("AWST", 8 * 3600),
    ("NZST", 12 * 3600),
    ("NZDT", 13 * 3600),
];

const MONTHS: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const WEEKDAYS: &[(&str, Weekday)] = &[
    ("monday", Weekday::Mon),
    ("tuesday", Weekday::Tue),
    ("wednesday", Weekday::Wed),
    ("thursday", Weekday::Thu),
    ("friday", Weekday::Fri),
    ("saturday", Weekday::Sat),
    ("sunday", Weekday::Sun),
];

/// Resolved time zone of a parsed string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Zone {
    Known(i32),
    Unknown,
}

/// A point in time with its original offset.
#[derive(Debug, Clone, Copy)]
pub struct Date {
    instant: DateTime<FixedOffset>,
    unknown_offset: bool,
}

impl Date {
    /// Parses a date, resolving two-digit years against the current time.
    pub fn parse(input: &str) -> Option<Date> {
        Self::parse_at(input, Utc::now())
    }

    /// Parses a date, resolving two-digit years against `reference`.
    pub fn parse_at(input: &str, reference: DateTime<Utc>) -> Option<Date> {
        let input = input.trim();
        if input.is_empty() {
            return None;
        }
        [&*RFC3339, &*RFC822, &*RFC850, &*ASCTIME]
            .iter()
            .find_map(|re| re.captures(input))
            .and_then(|caps| from_captures(&caps, reference))
    }

    /// Wraps a UTC instant; the offset is known to be zero.
    pub fn from_utc(instant: DateTime<Utc>) -> Date {
        Date {
            instant: instant.fixed_offset(),
            unknown_offset: false,
        }
    }

    /// Builds a date from a Unix timestamp in seconds.
    pub fn from_timestamp(secs: i64) -> Option<Date> {
        DateTime::from_timestamp(secs, 0).map(Date::from_utc)
    }

    /// The instant with its original offset (zero when unknown).
    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.instant.with_timezone(&Utc)
    }

    /// True when the source carried no usable offset.
    pub fn unknown_offset(&self) -> bool {
        self.unknown_offset
    }

    /// Canonical UTC rendering, usable for equality and ordering.
    pub fn normalize(&self) -> String {
        let utc = self.to_utc();
        format!("{}{}Z", utc.format("%Y-%m-%dT%H:%M:%S"), micros(utc.nanosecond()))
    }
}

fn micros(nanos: u32) -> String {
    let micro = nanos / 1_000;
    if micro == 0 {
        String::new()
    } else {
        format!(".{:06}", micro)
    }
}

fn from_captures(caps: &Captures<'_>, reference: DateTime<Utc>) -> Option<Date> {
    let num = |name: &str| caps.name(name).and_then(|m| m.as_str().parse::<u32>().ok());

    let year_text = caps.name("year")?.as_str();
    let year = match year_text.len() {
        2 => resolve_century(year_text.parse().ok()?, reference),
        _ => year_text.parse::<i32>().ok()?,
    };
    let month = match caps.name("month")?.as_str() {
        m if m.bytes().all(|b| b.is_ascii_digit()) => m.parse::<u32>().ok()?,
        m => month_from_name(m)?,
    };
    let day = num("day")?;
    let hour = num("hour").unwrap_or(0);
    let minute = num("minute").unwrap_or(0);
    let second = num("second").unwrap_or(0);
    let micro = caps
        .name("frac")
        .map(|m| {
            let digits: String = m.as_str().chars().chain("000000".chars()).take(6).collect();
            digits.parse::<u32>().unwrap_or(0)
        })
        .unwrap_or(0);

    let date = NaiveDate::from_ymd_opt(year, month, day)?;
    let time = NaiveTime::from_hms_micro_opt(hour, minute, second, micro)?;
    let local = NaiveDateTime::new(date, time);

    if let Some(wday) = caps.name("wday") {
        if weekday_from_name(wday.as_str())? != date.weekday() {
            return None;
        }
    }

    let zone = match caps.name("zone") {
        Some(m) => parse_zone(m.as_str())?,
        None => Zone::Unknown,
    };
    let (offset_secs, unknown_offset) = match zone {
        Zone::Known(secs) => (secs, false),
        Zone::Unknown => (0, true),
    };
    let offset = FixedOffset::east_opt(offset_secs)?;
    let instant = offset.from_local_datetime(&local).single()?;
    Some(Date {
        instant,
        unknown_offset,
    })
}

/// Assumes the reference century, stepping back one when that lands more
/// than 50 years ahead.
fn resolve_century(two_digit: i32, reference: DateTime<Utc>) -> i32 {
    let now = reference.year();
    let year = now - now.rem_euclid(100) + two_digit;
    if year - now > 50 {
        year - 100
    } else {
        year
    }
}

fn month_from_name(name: &str) -> Option<u32> {
    let lower = name.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTHS
        .iter()
        .position(|full| full.starts_with(&lower) || (lower == "sept" && *full == "september"))
        .map(|idx| idx as u32 + 1)
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    let lower = name.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    WEEKDAYS
        .iter()
        .find(|(full, _)| full.starts_with(&lower))
        .map(|(_, wd)| *wd)
}

fn parse_zone(zone: &str) -> Option<Zone> {
    if let Some(sign) = zone.chars().next().filter(|c| *c == '+' || *c == '-') {
        let digits: String = zone[1..].chars().filter(|c| *c != ':').collect();
        let (hh, mm) = match digits.len() {
            2 => (digits.parse::<i32>().ok()?, 0),
            4 => (digits[..2].parse::<i32>().ok()?, digits[2..].parse::<i32>().ok()?),
            _ => return None,
        };
        if hh > 23 || mm > 59 {
            return None;
        }
        if sign == '-' && hh == 0 && mm == 0 {
            return Some(Zone::Unknown);
        }
        let secs = hh * 3600 + mm * 60;
        return Some(Zone::Known(if sign == '-' { -secs } else { secs }));
    }

    let upper = zone.to_ascii_uppercase();
    if let Some((_, secs)) = ZONES.iter().find(|(name, _)| *name == upper) {
        return Some(Zone::Known(*secs));
    }
    military_zone(&upper).map(Zone::Known)
}

/// Single-letter nautical zones: A–I and K–M east, N–Y west, Z is UTC.
fn military_zone(letter: &str) -> Option<i32> {
    let mut chars = letter.chars();
    let c = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    let hours = match c {
        'A'..='I' => c as i32 - 'A' as i32 + 1,
        'K'..='M' => c as i32 - 'K' as i32 + 10,
        'N'..='Y' => -(c as i32 - 'N' as i32 + 1),
        'Z' => 0,
        _ => return None,
    };
    Some(hours * 3600)
}

impl fmt::Display for Date {
    /// RFC 3339 with the original offset; `-00:00` marks an unknown offset.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let offset = if self.unknown_offset {
            "-00:00".to_string()
        } else {
            self.instant.format("%:z").to_string()
        };
        write!(
            f,
            "{}{}{}",
            self.instant.format("%Y-%m-%dT%H:%M:%S"),
            micros(self.instant.nanosecond()),
            offset
        )
    }
}

impl PartialEq for Date {
    fn eq(&self, other: &Self) -> bool {
        self.instant == other.instant
    }
}

impl Eq for Date {}

impl PartialOrd for Date {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Date {
    fn cmp(&self, other: &Self) -> Ordering {
        self.instant.cmp(&other.instant)
    }
}

impl Hash for Date {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_utc().hash(state);
    }
}

impl Serialize for Date {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Date {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Date::parse(&s).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    fn norm(input: &str) -> Option<String> {
        Date::parse_at(input, reference()).map(|d| d.normalize())
    }

    #[test]
    fn test_rfc3339_variants() {
        assert_eq!(norm("2023-06-15T14:30:00").as_deref(), Some("2023-06-15T14:30:00Z"));
        assert_eq!(
            norm("2023-06-15T14:30:00-05:00").as_deref(),
            Some("2023-06-15T19:30:00Z")
        );
        assert_eq!(norm("2023-06-15T14:30:00 EST").as_deref(), Some("2023-06-15T19:30:00Z"));
        assert_eq!(
            norm("2023-06-15t14:30:00.25Z").as_deref(),
            Some("2023-06-15T14:30:00.250000Z")
        );
        assert_eq!(norm("2023-06-15").as_deref(), Some("2023-06-15T00:00:00Z"));
    }

    #[test]
    fn test_rfc822_variants() {
        assert_eq!(
            norm("Mon, 02 Jan 2006 15:04:05").as_deref(),
            Some("2006-01-02T15:04:05Z")
        );
        assert_eq!(
            norm("Mon, 02 Jan 2006 15:04:05 -0700").as_deref(),
            Some("2006-01-02T22:04:05Z")
        );
        assert_eq!(
            norm("Mon, 2 Jan 2006 15:04:05 PST").as_deref(),
            Some("2006-01-02T23:04:05Z")
        );
        assert_eq!(
            norm("02 Jan 2006 15:04:05.5 GMT").as_deref(),
            Some("2006-01-02T15:04:05.500000Z")
        );
        assert_eq!(norm("2 January 2006 15:04 Z").as_deref(), Some("2006-01-02T15:04:00Z"));
    }

    #[test]
    fn test_rfc850_variants() {
        assert_eq!(
            norm("Sunday, 06-Nov-94 08:49:37").as_deref(),
            Some("1994-11-06T08:49:37Z")
        );
        assert_eq!(
            norm("Sunday, 06-Nov-94 08:49:37 +0100").as_deref(),
            Some("1994-11-06T07:49:37Z")
        );
        assert_eq!(
            norm("Sunday, 06-Nov-94 08:49:37 GMT").as_deref(),
            Some("1994-11-06T08:49:37Z")
        );
        assert_eq!(
            norm("06-Nov-1994 08:49:37.123456 UTC").as_deref(),
            Some("1994-11-06T08:49:37.123456Z")
        );
    }

    #[test]
    fn test_asctime_variants() {
        assert_eq!(
            norm("Sun Nov  6 08:49:37 1994").as_deref(),
            Some("1994-11-06T08:49:37Z")
        );
        assert_eq!(
            norm("Sun Nov  6 08:49:37 1994 +0200").as_deref(),
            Some("1994-11-06T06:49:37Z")
        );
        assert_eq!(
            norm("Sun Nov  6 08:49:37 1994 EDT").as_deref(),
            Some("1994-11-06T12:49:37Z")
        );
        assert_eq!(
            norm("Nov 6 08:49:37.9 1994").as_deref(),
            Some("1994-11-06T08:49:37.900000Z")
        );
    }

    #[test]
    fn test_two_digit_year_closest_to_now() {
        assert_eq!(
            norm("01 Jan 30 00:00:00 GMT").as_deref(),
            Some("2030-01-01T00:00:00Z")
        );
        assert_eq!(
            norm("01 Jan 99 00:00:00 GMT").as_deref(),
            Some("1999-01-01T00:00:00Z")
        );
        assert_eq!(
            norm("Tuesday, 01-Jan-30 00:00:00 GMT").as_deref(),
            Some("2030-01-01T00:00:00Z")
        );
    }

    #[test]
    fn test_weekday_mismatch_rejected() {
        assert!(norm("Tue, 01 Jan 2021 00:00:00 GMT").is_none());
        assert!(norm("Fri, 01 Jan 2021 00:00:00 GMT").is_some());
        assert!(norm("Xyz, 01 Jan 2021 00:00:00 GMT").is_none());
    }

    #[test]
    fn test_military_zones() {
        assert_eq!(
            norm("01 Jan 2021 12:00:00 A").as_deref(),
            Some("2021-01-01T11:00:00Z")
        );
        assert_eq!(
            norm("01 Jan 2021 12:00:00 N").as_deref(),
            Some("2021-01-01T13:00:00Z")
        );
        assert!(norm("01 Jan 2021 12:00:00 J").is_none());
    }

    #[test]
    fn test_unknown_offset_is_distinct_from_utc() {
        let unknown = Date::parse_at("2021-01-01T00:00:00-00:00", reference()).unwrap();
        let utc = Date::parse_at("2021-01-01T00:00:00+00:00", reference()).unwrap();
        assert!(unknown.unknown_offset());
        assert!(!utc.unknown_offset());
        assert_eq!(unknown, utc);
        assert_eq!(unknown.to_string(), "2021-01-01T00:00:00-00:00");
        assert_eq!(utc.to_string(), "2021-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_display_keeps_offset_and_micros() {
        let date = Date::parse_at("2021-03-04T05:06:07.000123+09:30", reference()).unwrap();
        assert_eq!(date.to_string(), "2021-03-04T05:06:07.000123+09:30");
        assert_eq!(date.normalize(), "2021-03-03T19:36:07.000123Z");
    }

    #[test]
    fn test_garbage_rejected() {
        assert!(norm("").is_none());
        assert!(norm("not a date").is_none());
        assert!(norm("2021-13-01").is_none());
        assert!(norm("31 Feb 2021 00:00:00").is_none());
    }
}
