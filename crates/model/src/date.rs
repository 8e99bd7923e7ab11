//! Month/day-only date arithmetic for the supported June–September sale
//! window (§1 non-goals: no general time-zone/calendar handling;
//! GLOSSARY "Originating date"). Grounded in the original system's
//! `dateFormatter.hpp`/`dateTime.hpp`, but expressed as pure value
//! conversions to/from an absolute minute count rather than the source's
//! in-place mutate-and-roll-over loops — equivalent semantics, safer to
//! get right without a compiler.

use thiserror::Error;

/// Per-month day counts, indexed by month number (index 0..6 unused).
const DAYS_IN_MONTH: [u16; 10] = [0, 0, 0, 0, 0, 0, 30, 31, 31, 30];
const FIRST_MONTH: u8 = 6;
const LAST_MONTH: u8 = 9;
const MINUTES_PER_DAY: i64 = 1440;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateError {
    #[error("date {0}-{1} is outside the supported June-September window")]
    OutOfWindow(u8, u8),
    #[error("malformed date string {0:?}, expected mm-dd")]
    MalformedDate(String),
    #[error("malformed time string {0:?}, expected hh:mm")]
    MalformedTime(String),
}

/// A month/day pair packed as `month * 100 + day` (§6.2 wire format).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthDay(u16);

impl MonthDay {
    pub fn new(month: u8, day: u8) -> Result<Self, DateError> {
        if month < FIRST_MONTH || month > LAST_MONTH {
            return Err(DateError::OutOfWindow(month, day));
        }
        if day == 0 || day as u16 > DAYS_IN_MONTH[month as usize] {
            return Err(DateError::OutOfWindow(month, day));
        }
        Ok(Self(month as u16 * 100 + day as u16))
    }

    pub fn month(&self) -> u8 {
        (self.0 / 100) as u8
    }

    pub fn day(&self) -> u8 {
        (self.0 % 100) as u8
    }

    pub fn mmdd(&self) -> u16 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, DateError> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b'-' {
            return Err(DateError::MalformedDate(s.to_string()));
        }
        let month: u8 = s[0..2]
            .parse()
            .map_err(|_| DateError::MalformedDate(s.to_string()))?;
        let day: u8 = s[3..5]
            .parse()
            .map_err(|_| DateError::MalformedDate(s.to_string()))?;
        Self::new(month, day)
    }

    pub fn format(&self) -> String {
        format!("{:02}-{:02}", self.month(), self.day())
    }

    /// Zero-based day offset from June 1st, used internally for arithmetic.
    fn day_index(&self) -> i64 {
        let mut offset = 0i64;
        for m in FIRST_MONTH..self.month() {
            offset += DAYS_IN_MONTH[m as usize] as i64;
        }
        offset + (self.day() as i64 - 1)
    }

    fn from_day_index(mut index: i64) -> Result<Self, DateError> {
        let mut month = FIRST_MONTH;
        loop {
            if month > LAST_MONTH {
                return Err(DateError::OutOfWindow(month, 1));
            }
            let len = DAYS_IN_MONTH[month as usize] as i64;
            if index < len {
                break;
            }
            index -= len;
            month += 1;
        }
        Self::new(month, (index + 1) as u8)
    }

    /// Days from `self` to `other` (signed; positive if `other` is later).
    pub fn days_until(&self, other: MonthDay) -> i64 {
        other.day_index() - self.day_index()
    }

    /// `self` shifted by `delta` whole days (may be negative).
    pub fn add_days(&self, delta: i64) -> Result<Self, DateError> {
        Self::from_day_index(self.day_index() + delta)
    }

    /// Reconstructs a `MonthDay` from its packed `month*100+day` wire form
    /// (§6.2), e.g. as stored in `model::Train`'s `sale_start`/`sale_end`.
    pub fn from_mmdd(v: u16) -> Result<Self, DateError> {
        Self::new((v / 100) as u8, (v % 100) as u8)
    }
}

/// Minutes since midnight (§6.2 `hh:mm`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DayMinutes(u16);

impl DayMinutes {
    pub fn new(minutes: u16) -> Result<Self, DateError> {
        if minutes as i64 >= MINUTES_PER_DAY {
            return Err(DateError::MalformedTime(minutes.to_string()));
        }
        Ok(Self(minutes))
    }

    pub fn minutes(&self) -> u16 {
        self.0
    }

    pub fn parse(s: &str) -> Result<Self, DateError> {
        let bytes = s.as_bytes();
        if bytes.len() != 5 || bytes[2] != b':' {
            return Err(DateError::MalformedTime(s.to_string()));
        }
        let hh: u16 = s[0..2]
            .parse()
            .map_err(|_| DateError::MalformedTime(s.to_string()))?;
        let mm: u16 = s[3..5]
            .parse()
            .map_err(|_| DateError::MalformedTime(s.to_string()))?;
        if hh >= 24 || mm >= 60 {
            return Err(DateError::MalformedTime(s.to_string()));
        }
        Ok(Self(hh * 60 + mm))
    }

    pub fn format(&self) -> String {
        format!("{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

/// A `(date, time-of-day)` pair, stored as an absolute minute offset from
/// June 1st 00:00 for arithmetic, re-expanded to `(MonthDay, DayMinutes)`
/// on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(date: MonthDay, time: DayMinutes) -> Self {
        Self(date.day_index() * MINUTES_PER_DAY + time.minutes() as i64)
    }

    /// Adds `offset_minutes` (may be negative) and decodes back to
    /// `(date, time)`. Errors if the result falls outside June 1 .. Sep 30.
    pub fn add_minutes(&self, offset_minutes: i64) -> Result<(MonthDay, DayMinutes), DateError> {
        let total = self.0 + offset_minutes;
        let day_index = total.div_euclid(MINUTES_PER_DAY);
        let minute = total.rem_euclid(MINUTES_PER_DAY) as u16;
        let date = MonthDay::from_day_index(day_index)?;
        let time = DayMinutes::new(minute)?;
        Ok((date, time))
    }

    /// Absolute difference in minutes between two timestamps (source's
    /// `calcMinutesDuration`, which also returns an unsigned magnitude).
    pub fn minutes_between(&self, other: Timestamp) -> i64 {
        (other.0 - self.0).abs()
    }

    pub fn raw_minutes(&self) -> i64 {
        self.0
    }

    /// Decodes an absolute minute count (as stored in `Order`'s datetime
    /// fields) back to `(date, time)` for display (§6.2 `mm-dd hh:mm`).
    pub fn from_raw_minutes(raw: i64) -> Result<(MonthDay, DayMinutes), DateError> {
        Timestamp(0).add_minutes(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_date() {
        let d = MonthDay::parse("06-01").unwrap();
        assert_eq!(d.month(), 6);
        assert_eq!(d.day(), 1);
        assert_eq!(d.format(), "06-01");
    }

    #[test]
    fn rejects_out_of_window_month() {
        assert!(MonthDay::new(5, 31).is_err());
        assert!(MonthDay::new(10, 1).is_err());
    }

    #[test]
    fn rejects_day_beyond_month_length() {
        assert!(MonthDay::new(6, 31).is_err()); // June has 30 days
        assert!(MonthDay::new(7, 31).is_ok());
    }

    #[test]
    fn parses_and_formats_time() {
        let t = DayMinutes::parse("09:05").unwrap();
        assert_eq!(t.minutes(), 9 * 60 + 5);
        assert_eq!(t.format(), "09:05");
    }

    #[test]
    fn timestamp_rolls_over_midnight_into_next_day() {
        let date = MonthDay::new(6, 1).unwrap();
        let time = DayMinutes::new(23 * 60 + 50).unwrap();
        let ts = Timestamp::new(date, time);
        let (next_date, next_time) = ts.add_minutes(40).unwrap();
        assert_eq!(next_date, MonthDay::new(6, 2).unwrap());
        assert_eq!(next_time, DayMinutes::new(0).unwrap());
    }

    #[test]
    fn timestamp_rolls_over_month_boundary() {
        let date = MonthDay::new(6, 30).unwrap();
        let time = DayMinutes::new(23 * 60).unwrap();
        let ts = Timestamp::new(date, time);
        let (next_date, _) = ts.add_minutes(120).unwrap();
        assert_eq!(next_date, MonthDay::new(7, 1).unwrap());
    }

    #[test]
    fn days_until_is_signed() {
        let a = MonthDay::new(6, 1).unwrap();
        let b = MonthDay::new(6, 5).unwrap();
        assert_eq!(a.days_until(b), 4);
        assert_eq!(b.days_until(a), -4);
    }
}
