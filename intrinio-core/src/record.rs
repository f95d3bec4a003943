//! Typed intermediate schema shared by every pipeline stage.
//!
//! Both API variants convert their payloads into [`PriceRecord`] at the
//! source boundary; nothing downstream looks at column names.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DEFAULT_DIVIDEND_CURRENCY: &str = "USD";

/// One row per (symbol, date) as delivered by a price source.
///
/// Prices the source did not supply are `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    pub symbol: String,
    pub name: Option<String>,
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub dividend: f64,
    pub dividend_currency: String,
    pub split_ratio: f64,
    pub factor: f64,
}

impl PriceRecord {
    /// A price row with neutral adjustment columns.
    pub fn priced(
        symbol: impl Into<String>,
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            name: None,
            date,
            open,
            high,
            low,
            close,
            volume,
            dividend: 0.0,
            dividend_currency: DEFAULT_DIVIDEND_CURRENCY.to_string(),
            split_ratio: 1.0,
            factor: 1.0,
        }
    }
}

/// The concatenated output of one successful batch, in arrival order.
///
/// `(symbol, date)` is unique: a repeated pair is dropped and the first
/// occurrence wins, so every stage reading the table sees the same rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    records: Vec<PriceRecord>,
    keys: HashSet<(String, NaiveDate)>,
}

impl RawTable {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        let mut table = Self::default();
        table.extend(records);
        table
    }

    pub fn records(&self) -> &[PriceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append rows, skipping pairs already present. Returns how many were skipped.
    pub fn extend(&mut self, records: Vec<PriceRecord>) -> usize {
        let mut skipped = 0;
        for r in records {
            if self.keys.insert((r.symbol.clone(), r.date)) {
                self.records.push(r);
            } else {
                skipped += 1;
            }
        }
        skipped
    }

    /// Content hash of the table, recorded in the bundle manifest.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for r in &self.records {
            hasher.update(r.symbol.as_bytes());
            hasher.update(r.date.to_string().as_bytes());
            for v in [
                r.open,
                r.high,
                r.low,
                r.close,
                r.volume,
                r.dividend,
                r.split_ratio,
                r.factor,
            ] {
                hasher.update(&v.to_le_bytes());
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl FromIterator<PriceRecord> for RawTable {
    fn from_iter<I: IntoIterator<Item = PriceRecord>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One session of an asset's daily bar series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl DailyBar {
    /// Placeholder for a session the source has no data for.
    pub fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0.0,
        }
    }
}
