use std::fmt;

use chrono::{Datelike, NaiveDate};

/// A chart date that has passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartDate(NaiveDate);

impl ChartDate {
    /// Parses strict `YYYY-MM-DD` input into a real calendar date.
    ///
    /// chrono's `%Y-%m-%d` also accepts unpadded fields and signed years, so
    /// the shape is checked by hand before the calendar check.
    pub fn parse(text: &str) -> Option<Self> {
        let bytes = text.as_bytes();
        if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
            return None;
        }

        let digits_ok = bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
        if !digits_ok {
            return None;
        }

        let year = text[0..4].parse::<i32>().ok()?;
        let month = text[5..7].parse::<u32>().ok()?;
        let day = text[8..10].parse::<u32>().ok()?;

        NaiveDate::from_ymd_opt(year, month, day).map(ChartDate)
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }
}

impl fmt::Display for ChartDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

pub fn validate(text: &str) -> bool {
    ChartDate::parse(text).is_some()
}
