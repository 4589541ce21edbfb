// ABOUTME: Publishing-cadence hints for feeds (expiry, skip hours/days, refresh interval).
// ABOUTME: The skip mask stores 24 UTC hour bits followed by 7 weekday bits.

use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::date::Date;

/// All 24 hour bits.
pub const SKIP_ALL_HOURS: u32 = (1 << 24) - 1;
/// All 7 weekday bits.
pub const SKIP_ALL_DAYS: u32 = 0x7F << 24;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// `None` when the feed says nothing about whether it has ended.
    pub expired: Option<bool>,
    /// Hours (bit `h`) and weekdays (bit `24 + day`, Monday = 0) to skip.
    pub skip: u32,
    /// Suggested refetch interval.
    pub interval: Option<Duration>,
    /// Instant the interval is counted from.
    pub base: Option<Date>,
}

impl Schedule {
    /// Marks an hour (0–23, UTC) as skipped; 24 is read as midnight.
    pub fn skip_hour(&mut self, hour: u32) {
        let hour = if hour == 24 { 0 } else { hour };
        if hour < 24 {
            self.skip |= 1 << hour;
        }
    }

    pub fn skip_day(&mut self, day: Weekday) {
        self.skip |= 1 << (24 + day.num_days_from_monday());
    }

    pub fn skips_hour(&self, hour: u32) -> bool {
        hour < 24 && self.skip & (1 << hour) != 0
    }

    pub fn skips_day(&self, day: Weekday) -> bool {
        self.skip & (1 << (24 + day.num_days_from_monday())) != 0
    }

    /// A feed skipped at every hour or on every day is effectively ended.
    pub(crate) fn infer_expired(&mut self) {
        if self.skip & SKIP_ALL_HOURS == SKIP_ALL_HOURS
            || self.skip & SKIP_ALL_DAYS == SKIP_ALL_DAYS
        {
            self.expired = Some(true);
        }
    }
}
