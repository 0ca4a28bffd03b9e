//! Calendar-day iteration over a closed date range.

use chrono::{Days, NaiveDate};

use crate::config;
use crate::error::{EtlError, Result};

/// Finite iterator over every calendar day in `[start, end]`.
///
/// Holds no state beyond its cursor, so cloning it (or building a new one
/// from the same bounds) restarts the sequence. Yields nothing when
/// `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    next: Option<NaiveDate>,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            next: Some(start),
            end,
        }
    }
}

impl Iterator for DateRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        let current = self.next.filter(|d| *d <= self.end)?;
        self.next = current.checked_add_days(Days::new(1));
        Some(current)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.next {
            Some(d) if d <= self.end => {
                let n = (self.end - d).num_days() as usize + 1;
                (n, Some(n))
            }
            _ => (0, Some(0)),
        }
    }
}

impl ExactSizeIterator for DateRange {}

/// Shorthand for [`DateRange::new`].
pub fn date_range(start: NaiveDate, end: NaiveDate) -> DateRange {
    DateRange::new(start, end)
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), config::DATE_FORMAT).map_err(|e| {
        EtlError::InvalidArgument(format!("expected YYYY-MM-DD date, got '{}': {}", value, e))
    })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(config::DATE_FORMAT).to_string()
}
