//! Timeframes (bar period + slot width) and the time-scope grouping key.

use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use thiserror::Error;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Bar period plus the width of the hour buckets used to group trades.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub name: String,
    /// Bar period in minutes. Must divide a day.
    pub minutes: u32,
    /// Width in hours of one time-scope bucket. Must divide 24.
    pub slot_hours: u32,
}

impl Timeframe {
    pub fn new(name: impl Into<String>, minutes: u32, slot_hours: u32) -> Self {
        Self {
            name: name.into(),
            minutes,
            slot_hours,
        }
    }

    pub fn m15() -> Self {
        Self::new("M15", 15, 4)
    }

    pub fn m30() -> Self {
        Self::new("M30", 30, 4)
    }

    pub fn h1() -> Self {
        Self::new("H1", 60, 4)
    }

    pub fn h2() -> Self {
        Self::new("H2", 120, 8)
    }

    pub fn h4() -> Self {
        Self::new("H4", 240, 24)
    }

    pub fn h8() -> Self {
        Self::new("H8", 480, 24)
    }

    /// Look up one of the built-in timeframes by name (case-insensitive).
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "M15" => Some(Self::m15()),
            "M30" => Some(Self::m30()),
            "H1" => Some(Self::h1()),
            "H2" => Some(Self::h2()),
            "H4" => Some(Self::h4()),
            "H8" => Some(Self::h8()),
            _ => None,
        }
    }

    pub fn period(&self) -> Duration {
        Duration::minutes(i64::from(self.minutes))
    }

    /// Truncate a timestamp to the start of the bar containing it.
    pub fn bar_start(&self, timestamp: NaiveDateTime) -> NaiveDateTime {
        let minute_of_day = timestamp.hour() * 60 + timestamp.minute();
        let floored = minute_of_day - minute_of_day % self.minutes;
        timestamp.date().and_time(NaiveTime::MIN) + Duration::minutes(i64::from(floored))
    }

    /// Number of hour buckets in a day.
    pub fn slots_per_day(&self) -> u32 {
        24 / self.slot_hours
    }

    pub fn validate(&self) -> Result<(), TimeframeError> {
        if self.minutes == 0 || MINUTES_PER_DAY % self.minutes != 0 {
            return Err(TimeframeError::InvalidPeriod {
                name: self.name.clone(),
                minutes: self.minutes,
            });
        }
        if self.slot_hours == 0 || 24 % self.slot_hours != 0 {
            return Err(TimeframeError::InvalidSlotWidth {
                name: self.name.clone(),
                slot_hours: self.slot_hours,
            });
        }
        Ok(())
    }
}

impl Default for Timeframe {
    fn default() -> Self {
        Self::m15()
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum TimeframeError {
    #[error("timeframe {name}: period of {minutes} minutes does not divide a day")]
    InvalidPeriod { name: String, minutes: u32 },
    #[error("timeframe {name}: slot width of {slot_hours}h does not divide 24h")]
    InvalidSlotWidth { name: String, slot_hours: u32 },
}

/// (day-of-week, hour bucket) key that trades are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeScope {
    pub weekday: Weekday,
    pub hour_bucket: u32,
}

impl TimeScope {
    pub fn new(weekday: Weekday, hour_bucket: u32) -> Self {
        Self {
            weekday,
            hour_bucket,
        }
    }

    pub fn of(timestamp: NaiveDateTime, timeframe: &Timeframe) -> Self {
        Self {
            weekday: timestamp.weekday(),
            hour_bucket: timestamp.hour() / timeframe.slot_hours,
        }
    }

    /// First wall-clock instant of the bucket.
    pub fn slot_start(&self, timeframe: &Timeframe) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour_bucket * timeframe.slot_hours, 0, 0)
            .unwrap_or(NaiveTime::MIN)
    }

    /// Last whole second of the bucket.
    pub fn slot_end(&self, timeframe: &Timeframe) -> NaiveTime {
        let last_hour = (self.hour_bucket + 1) * timeframe.slot_hours - 1;
        NaiveTime::from_hms_opt(last_hour.min(23), 59, 59).unwrap_or(NaiveTime::MIN)
    }
}

impl fmt::Display for TimeScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.weekday, self.hour_bucket)
    }
}

// `Weekday` has no ordering of its own; scopes sort Monday-first, then by bucket.
impl Ord for TimeScope {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weekday
            .num_days_from_monday()
            .cmp(&other.weekday.num_days_from_monday())
            .then(self.hour_bucket.cmp(&other.hour_bucket))
    }
}

impl PartialOrd for TimeScope {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(h: u32, m: u32, s: u32) -> NaiveDateTime {
        // 2024-03-04 is a Monday.
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_milli_opt(h, m, s, 250)
            .unwrap()
    }

    #[test]
    fn m15_truncates_to_quarter_hour() {
        let tf = Timeframe::m15();
        let start = tf.bar_start(ts(9, 44, 59));
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(9, 30, 0).unwrap());
    }

    #[test]
    fn h4_truncates_to_four_hour_block() {
        let tf = Timeframe::h4();
        let start = tf.bar_start(ts(11, 5, 0));
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(8, 0, 0).unwrap());
    }

    #[test]
    fn time_scope_buckets_by_slot_width() {
        let scope = TimeScope::of(ts(9, 10, 0), &Timeframe::m15());
        assert_eq!(scope, TimeScope::new(Weekday::Mon, 2));
    }

    #[test]
    fn slot_bounds() {
        let tf = Timeframe::m15();
        let scope = TimeScope::new(Weekday::Mon, 2);
        assert_eq!(scope.slot_start(&tf), NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(scope.slot_end(&tf), NaiveTime::from_hms_opt(11, 59, 59).unwrap());
    }

    #[test]
    fn scopes_sort_by_weekday_then_bucket() {
        let mut scopes = vec![
            TimeScope::new(Weekday::Tue, 0),
            TimeScope::new(Weekday::Mon, 3),
            TimeScope::new(Weekday::Mon, 1),
        ];
        scopes.sort();
        assert_eq!(
            scopes,
            vec![
                TimeScope::new(Weekday::Mon, 1),
                TimeScope::new(Weekday::Mon, 3),
                TimeScope::new(Weekday::Tue, 0),
            ]
        );
    }

    #[test]
    fn validate_rejects_non_dividing_period() {
        let tf = Timeframe::new("M7", 7, 4);
        assert!(matches!(tf.validate(), Err(TimeframeError::InvalidPeriod { .. })));
        let tf = Timeframe::new("M15", 15, 5);
        assert!(matches!(tf.validate(), Err(TimeframeError::InvalidSlotWidth { .. })));
    }

    #[test]
    fn preset_lookup_is_case_insensitive() {
        assert_eq!(Timeframe::preset("h1"), Some(Timeframe::h1()));
        assert_eq!(Timeframe::preset("D1"), None);
    }
}
