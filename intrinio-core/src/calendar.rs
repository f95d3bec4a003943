//! Trading calendar: the ordered list of sessions bars are aligned to.

use crate::error::{IngestError, Result};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::path::Path;

pub trait TradingCalendar {
    /// Sessions in `[start, end]`, ascending. Empty if `start > end`.
    fn sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate>;
}

/// Monday–Friday calendar with an optional holiday list.
#[derive(Debug, Clone, Default)]
pub struct WeekdayCalendar {
    holidays: BTreeSet<NaiveDate>,
}

impl WeekdayCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_holidays(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Load holidays from a text file: one `YYYY-MM-DD` per line, `#` comments.
    pub fn from_holiday_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            IngestError::Configuration(format!("read holiday file {}: {e}", path.display()))
        })?;
        Self::from_holiday_list(&content)
    }

    pub fn from_holiday_list(content: &str) -> Result<Self> {
        let mut holidays = BTreeSet::new();
        for (lineno, line) in content.lines().enumerate() {
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let date = NaiveDate::parse_from_str(line, "%Y-%m-%d").map_err(|e| {
                IngestError::Configuration(format!("holiday line {}: '{line}': {e}", lineno + 1))
            })?;
            holidays.insert(date);
        }
        Ok(Self { holidays })
    }

    pub fn is_session(&self, date: NaiveDate) -> bool {
        !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !self.holidays.contains(&date)
    }
}

impl TradingCalendar for WeekdayCalendar {
    fn sessions_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
        if start > end {
            return Vec::new();
        }
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .filter(|d| self.is_session(*d))
            .collect()
    }
}
