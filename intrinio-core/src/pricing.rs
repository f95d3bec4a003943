//! Reshape the long (date, symbol) table into per-asset daily bar series.
//!
//! Every asset gets exactly one bar per calendar session, which is what the
//! daily bar writer requires. A session with no raw row becomes an all-zero
//! bar, and NaN fields of present rows are zeroed as well: "no trade" is
//! recorded as zero volume and zero prices.

use crate::metadata::{Sid, SymbolMap};
use crate::record::{DailyBar, PriceRecord, RawTable};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Lazily yields `(sid, series)` for each entry of `symbol_map`, in map order.
///
/// The input table is only read; running this twice over the same inputs
/// yields identical output.
pub fn parse_pricing_and_volume<'a>(
    table: &'a RawTable,
    sessions: &'a [NaiveDate],
    symbol_map: &'a SymbolMap,
) -> impl Iterator<Item = (Sid, Vec<DailyBar>)> + 'a {
    let index = index_by_symbol(table);
    symbol_map.iter().map(move |(sid, symbol)| {
        let rows = index.get(symbol);
        let series = sessions
            .iter()
            .map(|session| {
                rows.and_then(|by_date| by_date.get(session))
                    .map(|r| filled_bar(r))
                    .unwrap_or_else(|| DailyBar::zero(*session))
            })
            .collect();
        (sid, series)
    })
}

/// symbol → date → first record seen for that pair.
fn index_by_symbol(table: &RawTable) -> HashMap<&str, HashMap<NaiveDate, &PriceRecord>> {
    let mut index: HashMap<&str, HashMap<NaiveDate, &PriceRecord>> = HashMap::new();
    for r in table.records() {
        index
            .entry(r.symbol.as_str())
            .or_default()
            .entry(r.date)
            .or_insert(r);
    }
    index
}

fn filled_bar(r: &PriceRecord) -> DailyBar {
    DailyBar {
        date: r.date,
        open: zero_if_nan(r.open),
        high: zero_if_nan(r.high),
        low: zero_if_nan(r.low),
        close: zero_if_nan(r.close),
        volume: zero_if_nan(r.volume),
    }
}

fn zero_if_nan(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}
