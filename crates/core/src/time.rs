//! Minute-of-day arithmetic and boundary parsing
//!
//! Times are carried internally as minutes since midnight. The "HH:mm"
//! string form only exists at the edges (wire protocol, audit details).

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Minutes in a day; the exclusive upper bound for a start time
pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// A time of day with minute precision
///
/// Start times are always `< 24:00`. An end time may equal `24:00`
/// when a slot runs exactly to midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotTime(u16);

impl SlotTime {
    pub const MIDNIGHT: SlotTime = SlotTime(0);
    pub const END_OF_DAY: SlotTime = SlotTime(MINUTES_PER_DAY);

    /// Build from minutes since midnight; `24:00` is accepted as an end bound
    pub fn from_minutes(minutes: u16) -> Result<Self> {
        if minutes > MINUTES_PER_DAY {
            return Err(Error::Validation(format!(
                "minute of day out of range: {}",
                minutes
            )));
        }
        Ok(Self(minutes))
    }

    pub fn from_hm(hour: u16, minute: u16) -> Result<Self> {
        if minute >= 60 {
            return Err(Error::Validation(format!("invalid minute: {}", minute)));
        }
        Self::from_minutes(hour * 60 + minute)
    }

    pub fn minutes(self) -> u16 {
        self.0
    }

    /// Add a duration, failing if the result leaves the day
    pub fn checked_add(self, minutes: u16) -> Option<Self> {
        let total = self.0.checked_add(minutes)?;
        (total <= MINUTES_PER_DAY).then_some(Self(total))
    }

    /// True when this time can begin a slot (strictly before midnight)
    pub fn can_start_slot(self) -> bool {
        self.0 < MINUTES_PER_DAY
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for SlotTime {
    type Err = Error;

    /// Parse strict "HH:mm"
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::Validation(format!("invalid time (expected HH:mm): {:?}", s));

        let (h, m) = s.split_once(':').ok_or_else(invalid)?;
        if h.len() != 2 || m.len() != 2 {
            return Err(invalid());
        }
        if !h.bytes().chain(m.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }

        let hour: u16 = h.parse().map_err(|_| invalid())?;
        let minute: u16 = m.parse().map_err(|_| invalid())?;
        if hour > 24 || (hour == 24 && minute != 0) {
            return Err(invalid());
        }
        Self::from_hm(hour, minute)
    }
}

impl Serialize for SlotTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SlotTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Parse a calendar date in strict `YYYY-MM-DD` form
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    let well_formed = s.len() == 10
        && s.bytes()
            .enumerate()
            .all(|(i, b)| if i == 4 || i == 7 { b == b'-' } else { b.is_ascii_digit() });
    if !well_formed {
        return Err(Error::Validation(format!(
            "invalid date (expected YYYY-MM-DD): {:?}",
            s
        )));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| Error::Validation(format!("invalid date {:?}: {}", s, e)))
}

/// Format a date the way it is stored and sent on the wire
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let t: SlotTime = "08:05".parse().unwrap();
        assert_eq!(t.minutes(), 8 * 60 + 5);
        assert_eq!(t.to_string(), "08:05");

        let end: SlotTime = "24:00".parse().unwrap();
        assert_eq!(end, SlotTime::END_OF_DAY);
        assert!(!end.can_start_slot());
    }

    #[test]
    fn test_rejects_malformed_times() {
        for bad in ["8:00", "08:0", "0800", "25:00", "24:01", "12:60", "ab:cd", "", "08:00:00"] {
            assert!(bad.parse::<SlotTime>().is_err(), "{} should be rejected", bad);
        }
    }

    #[test]
    fn test_checked_add() {
        let t = SlotTime::from_hm(14, 30).unwrap();
        assert_eq!(t.checked_add(45).unwrap().to_string(), "15:15");

        let late = SlotTime::from_hm(23, 30).unwrap();
        assert_eq!(late.checked_add(30), Some(SlotTime::END_OF_DAY));
        assert_eq!(late.checked_add(31), None);
    }

    #[test]
    fn test_parse_date() {
        let d = parse_date("2026-01-08").unwrap();
        assert_eq!(format_date(d), "2026-01-08");

        assert!(parse_date("2026-1-08").is_err());
        assert!(parse_date("2026-02-30").is_err());
        assert!(parse_date("08/01/2026").is_err());
    }

    #[test]
    fn test_serde_uses_hhmm() {
        let t = SlotTime::from_hm(9, 0).unwrap();
        assert_eq!(serde_json::to_string(&t).unwrap(), "\"09:00\"");
        let back: SlotTime = serde_json::from_str("\"09:00\"").unwrap();
        assert_eq!(back, t);
    }
}
