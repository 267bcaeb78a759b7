use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Inclusive date span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        DateRange { start, end }
    }

    pub fn single(date: NaiveDate) -> Self {
        DateRange { start: date, end: date }
    }

    /// Smallest range covering both `self` and `date`.
    pub fn extended_to(self, date: NaiveDate) -> Self {
        DateRange {
            start: self.start.min(date),
            end: self.end.max(date),
        }
    }

    /// Range spanning every date yielded, or `None` for an empty iterator.
    pub fn covering<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Option<Self> {
        dates.into_iter().fold(None, |acc, d| match acc {
            None => Some(DateRange::single(d)),
            Some(r) => Some(r.extended_to(d)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_range_display() {
        let range = DateRange::new(date(2024, 1, 1), date(2024, 12, 31));
        assert_eq!(range.to_string(), "2024-01-01 to 2024-12-31");
    }

    #[test]
    fn covering_unordered_dates() {
        let range = DateRange::covering([date(2024, 3, 5), date(2024, 1, 9), date(2024, 2, 1)]);
        assert_eq!(range, Some(DateRange::new(date(2024, 1, 9), date(2024, 3, 5))));
    }

    #[test]
    fn covering_single_date() {
        let range = DateRange::covering([date(2024, 6, 15)]);
        assert_eq!(range, Some(DateRange::single(date(2024, 6, 15))));
    }

    #[test]
    fn covering_nothing_is_none() {
        assert_eq!(DateRange::covering(Vec::new()), None);
    }
}
