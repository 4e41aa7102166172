//! Schedule time conversions.
//!
//! The catalog and the live feed mix 24-hour ("08:10") and 12-hour
//! ("08:10 AM") notations. Everything is reduced to minutes since midnight
//! for arithmetic and rendered back in the 12-hour notation for display.

use chrono::{NaiveTime, Timelike};

use crate::models::types::Direction;

/// Placeholder shown when a time is unknown
pub const UNKNOWN_TIME: &str = "--:--";

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Minutes since midnight, always normalized into `0..1440`
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    /// Wraps around midnight in both directions
    pub fn from_minutes(minutes: i32) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY) as u16)
    }

    pub fn from_hm(hours: u32, minutes: u32) -> Self {
        let total = (u64::from(hours) * 60 + u64::from(minutes)) % MINUTES_PER_DAY as u64;
        Self(total as u16)
    }

    /// Like [`TimeOfDay::from_hm`], but `None` when the total does not fit in an `i32`
    pub fn checked_hm(hours: u32, minutes: u32) -> Option<Self> {
        let total = hours.checked_mul(60)?.checked_add(minutes)?;
        i32::try_from(total).ok().map(Self::from_minutes)
    }

    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self::from_hm(time.hour(), time.minute())
    }

    pub fn minutes(self) -> i32 {
        self.0 as i32
    }

    pub fn offset(self, delta_minutes: i32) -> Self {
        Self::from_minutes(self.minutes() + delta_minutes)
    }

    /// Signed difference `self - other` in minutes, without wrapping
    pub fn minus(self, other: TimeOfDay) -> i32 {
        self.minutes() - other.minutes()
    }

    /// Parses "HH:MM" (24h) or "hh:mm AM/PM". Seconds are ignored.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() || text == UNKNOWN_TIME {
            return None;
        }

        match split_period(text) {
            Some((clock, is_pm)) => {
                let (h, m) = split_hm(clock)?;
                let hours = h % 12 + if is_pm { 12 } else { 0 };
                Self::checked_hm(hours, m)
            }
            None => {
                let (h, m) = split_hm(text)?;
                Self::checked_hm(h % 24, m)
            }
        }
    }

    pub fn to_hhmm(self) -> String {
        format!("{:02}:{:02}", self.0 / 60, self.0 % 60)
    }

    pub fn to_12_hour(self) -> String {
        let (h, m) = ((self.0 / 60) as u32, (self.0 % 60) as u32);
        twelve_hour(h, m, if h >= 12 { "PM" } else { "AM" })
    }
}

/// True when the text already carries an AM/PM marker
pub fn has_period(text: &str) -> bool {
    let upper = text.to_ascii_uppercase();
    upper.contains("AM") || upper.contains("PM")
}

/// Converts "HH:MM" to "hh:mm AM|PM"; text that already has a period passes through
pub fn to_12_hour(text: &str) -> String {
    if text.is_empty() || text == UNKNOWN_TIME {
        return UNKNOWN_TIME.to_owned();
    }
    if has_period(text) {
        return text.to_owned();
    }

    match split_hm(text) {
        Some((h, m)) => twelve_hour(h, m, if h >= 12 { "PM" } else { "AM" }),
        None => UNKNOWN_TIME.to_owned(),
    }
}

/// Formats a static schedule time for display.
///
/// UP runs are morning runs and always get an "AM" suffix; DOWN runs use the
/// real period of the 24-hour value.
pub fn format_static(text: Option<&str>, direction: Direction) -> String {
    let Some(text) = text.filter(|t| !t.is_empty()) else {
        return UNKNOWN_TIME.to_owned();
    };
    if has_period(text) {
        return text.to_owned();
    }

    match split_hm(text) {
        Some((h, m)) if direction.is_up() => twelve_hour(h, m, "AM"),
        Some((h, m)) => twelve_hour(h, m, if h >= 12 { "PM" } else { "AM" }),
        None => UNKNOWN_TIME.to_owned(),
    }
}

fn twelve_hour(hours: u32, minutes: u32, period: &str) -> String {
    let h = match hours % 12 {
        0 => 12,
        h => h,
    };
    format!("{h:02}:{minutes:02} {period}")
}

/// Strips a trailing AM/PM marker, returning the clock part and whether it was PM
fn split_period(text: &str) -> Option<(&str, bool)> {
    let upper = text.to_ascii_uppercase();
    let is_pm = upper.ends_with("PM");
    if !is_pm && !upper.ends_with("AM") {
        return None;
    }
    Some((text[..text.len() - 2].trim_end(), is_pm))
}

fn split_hm(text: &str) -> Option<(u32, u32)> {
    let mut parts = text.split(':');
    let h = parts.next()?.trim().parse().ok()?;
    let m = parts.next()?.trim().parse().ok()?;
    Some((h, m))
}
