//! Asset metadata and sid assignment.
//!
//! Sids are the codes of a categorical encoding of the symbol column:
//! distinct symbols sorted ascending, numbered from zero. The map is built
//! once per run and shared by every stage that writes sid-keyed tables, so
//! the asset table and the adjustment tables always agree.

use crate::record::RawTable;
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

pub const EXCHANGE: &str = "INTRINIO";

/// Small-integer asset identifier.
pub type Sid = u32;

/// Symbol ↔ sid mapping for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolMap {
    symbols: Vec<String>,
    sids: HashMap<String, Sid>,
}

impl SymbolMap {
    pub fn from_table(table: &RawTable) -> Self {
        let distinct: BTreeSet<&str> = table.records().iter().map(|r| r.symbol.as_str()).collect();
        Self::from_sorted(distinct.into_iter().map(String::from).collect())
    }

    fn from_sorted(symbols: Vec<String>) -> Self {
        let sids = symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as Sid))
            .collect();
        Self { symbols, sids }
    }

    pub fn sid(&self, symbol: &str) -> Option<Sid> {
        self.sids.get(symbol).copied()
    }

    pub fn symbol(&self, sid: Sid) -> Option<&str> {
        self.symbols.get(sid as usize).map(|s| s.as_str())
    }

    /// `(sid, symbol)` pairs in sid order.
    pub fn iter(&self) -> impl Iterator<Item = (Sid, &str)> + '_ {
        self.symbols
            .iter()
            .enumerate()
            .map(|(i, s)| (i as Sid, s.as_str()))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// One row of the asset table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMetadata {
    pub sid: Sid,
    pub symbol: String,
    pub asset_name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub auto_close_date: NaiveDate,
    pub exchange: String,
}

struct Span {
    start: NaiveDate,
    end: NaiveDate,
    name: Option<String>,
}

/// Derive one metadata row per symbol: observed date range, and an
/// auto-close date one calendar day after the last observation.
///
/// The +1 day is calendar-agnostic; it ignores exchange sessions.
pub fn gen_asset_metadata(table: &RawTable, symbol_map: &SymbolMap) -> Vec<AssetMetadata> {
    let mut spans: BTreeMap<&str, Span> = BTreeMap::new();
    for r in table.records() {
        let span = spans.entry(r.symbol.as_str()).or_insert_with(|| Span {
            start: r.date,
            end: r.date,
            name: None,
        });
        span.start = span.start.min(r.date);
        span.end = span.end.max(r.date);
        if span.name.is_none() {
            span.name = r.name.clone().filter(|n| !n.is_empty());
        }
    }

    symbol_map
        .iter()
        .filter_map(|(sid, symbol)| {
            let span = spans.get(symbol)?;
            Some(AssetMetadata {
                sid,
                symbol: symbol.to_string(),
                asset_name: span.name.clone().unwrap_or_else(|| symbol.to_string()),
                start_date: span.start,
                end_date: span.end,
                auto_close_date: span.end + Days::new(1),
                exchange: EXCHANGE.to_string(),
            })
        })
        .collect()
}
