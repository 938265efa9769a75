use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Key used when a file carries no usable capture time. Month and day zero
/// never come out of a real date, and the value sorts before every one.
pub const SENTINEL_KEY: &str = "0000-00-00 00-00-00";

const KEY_LEN: usize = 19;

/// Sort key of the form `YYYY-MM-DD HH-MM-SS`; lexicographic order is
/// chronological order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimestampKey(pub(crate) String);

impl TimestampKey {
    pub fn sentinel() -> Self {
        Self(SENTINEL_KEY.to_string())
    }

    pub fn from_datetime(dt: &NaiveDateTime) -> Self {
        Self(format!(
            "{:04}-{:02}-{:02} {:02}-{:02}-{:02}",
            dt.year(),
            dt.month(),
            dt.day(),
            dt.hour(),
            dt.minute(),
            dt.second()
        ))
    }

    /// Parses a key, optionally carrying a `-<n>` disambiguation suffix as
    /// produced by an earlier planning run.
    pub fn parse(input: &str) -> Option<Self> {
        if input.len() < KEY_LEN || !input.is_char_boundary(KEY_LEN) {
            return None;
        }
        let (base, suffix) = input.split_at(KEY_LEN);
        if !is_key_shape(base) {
            return None;
        }
        if !suffix.is_empty() {
            let digits = suffix.strip_prefix('-')?;
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
        }
        Some(Self(input.to_string()))
    }

    /// Splits off the `-<n>` suffix; a key without one reports `0`.
    pub fn split_suffix(&self) -> (&str, usize) {
        match (self.0.get(..KEY_LEN), self.0.get(KEY_LEN..)) {
            (Some(base), Some(rest)) => {
                let suffix = rest
                    .strip_prefix('-')
                    .and_then(|digits| digits.parse().ok())
                    .unwrap_or(0);
                (base, suffix)
            }
            _ => (self.0.as_str(), 0),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.0 == SENTINEL_KEY
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TimestampKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_key_shape(value: &str) -> bool {
    value.bytes().enumerate().all(|(i, b)| match i {
        4 | 7 | 13 | 16 => b == b'-',
        10 => b == b' ',
        _ => b.is_ascii_digit(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn dt(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .and_then(|date| date.and_hms_opt(h, mi, s))
            .expect("valid datetime")
    }

    #[test]
    fn from_datetime_zero_pads_fields() {
        let key = TimestampKey::from_datetime(&dt(2014, 3, 9, 7, 5, 1));
        assert_eq!(key.as_str(), "2014-03-09 07-05-01");
    }

    #[test]
    fn sentinel_sorts_before_earliest_real_date() {
        let earliest = TimestampKey::from_datetime(&dt(0, 1, 1, 0, 0, 0));
        assert!(TimestampKey::sentinel() < earliest);
        assert!(TimestampKey::sentinel().is_sentinel());
        assert!(!earliest.is_sentinel());
    }

    #[test]
    fn lexicographic_order_follows_time() {
        let a = TimestampKey::from_datetime(&dt(2019, 12, 31, 23, 59, 59));
        let b = TimestampKey::from_datetime(&dt(2020, 1, 1, 0, 0, 0));
        assert!(a < b);
    }

    #[test]
    fn parse_accepts_plain_and_suffixed_keys() {
        assert!(TimestampKey::parse("2014-03-09 10-11-12").is_some());
        assert!(TimestampKey::parse("2014-03-09 10-11-12-3").is_some());
        assert!(TimestampKey::parse("2014-03-09 10-11-12-").is_none());
        assert!(TimestampKey::parse("2014-03-09 10-11-12_3").is_none());
        assert!(TimestampKey::parse("2014:03:09 10:11:12").is_none());
        assert!(TimestampKey::parse("IMG_0001").is_none());
    }

    #[test]
    fn split_suffix_separates_base_and_counter() {
        let plain = TimestampKey::parse("2014-03-09 10-11-12").expect("plain");
        assert_eq!(plain.split_suffix(), ("2014-03-09 10-11-12", 0));

        let tenth = TimestampKey::parse("2014-03-09 10-11-12-10").expect("suffixed");
        assert_eq!(tenth.split_suffix(), ("2014-03-09 10-11-12", 10));
    }
}
