//! Split and dividend adjustment tables, keyed by sid.

use crate::metadata::{Sid, SymbolMap};
use crate::record::RawTable;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitAdjustment {
    pub sid: Sid,
    pub effective_date: NaiveDate,
    /// Multiplier applied to prices before `effective_date` (1 / split ratio).
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DividendAdjustment {
    pub sid: Sid,
    pub ex_date: NaiveDate,
    pub amount: f64,
    pub record_date: Option<NaiveDate>,
    pub declared_date: Option<NaiveDate>,
    pub pay_date: Option<NaiveDate>,
}

/// Rows whose split ratio differs from 1, inverted.
///
/// Non-finite and zero ratios carry no usable adjustment and are skipped.
pub fn parse_splits(table: &RawTable, symbol_map: &SymbolMap) -> Vec<SplitAdjustment> {
    table
        .records()
        .iter()
        .filter(|r| r.split_ratio != 1.0 && r.split_ratio.is_finite() && r.split_ratio != 0.0)
        .filter_map(|r| {
            Some(SplitAdjustment {
                sid: symbol_map.sid(&r.symbol)?,
                effective_date: r.date,
                ratio: 1.0 / r.split_ratio,
            })
        })
        .collect()
}

/// Rows with a nonzero dividend. The source has no record, declared or
/// pay dates, so those stay empty.
pub fn parse_dividends(table: &RawTable, symbol_map: &SymbolMap) -> Vec<DividendAdjustment> {
    table
        .records()
        .iter()
        .filter(|r| r.dividend != 0.0 && r.dividend.is_finite())
        .filter_map(|r| {
            Some(DividendAdjustment {
                sid: symbol_map.sid(&r.symbol)?,
                ex_date: r.date,
                amount: r.dividend,
                record_date: None,
                declared_date: None,
                pay_date: None,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::PriceRecord;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn rec(symbol: &str, day: u32, split_ratio: f64, dividend: f64) -> PriceRecord {
        let mut r = PriceRecord::priced(symbol, d(day), 1.0, 1.0, 1.0, 1.0, 1.0);
        r.split_ratio = split_ratio;
        r.dividend = dividend;
        r
    }

    fn table() -> RawTable {
        RawTable::new(vec![
            rec("AAPL", 6, 1.0, 0.0),
            rec("AAPL", 9, 7.0, 0.0),
            rec("AAPL", 10, 1.0, 0.47),
            rec("NVDA", 10, 2.0, 0.0),
            rec("NVDA", 11, 1.0, 0.0),
        ])
    }

    #[test]
    fn splits_keep_non_unit_ratios_inverted() {
        let t = table();
        let map = SymbolMap::from_table(&t);
        let splits = parse_splits(&t, &map);

        assert_eq!(splits.len(), 2);
        assert_eq!(splits[0].sid, map.sid("AAPL").unwrap());
        assert_eq!(splits[0].effective_date, d(9));
        assert!((splits[0].ratio - 1.0 / 7.0).abs() < 1e-12);
        assert_eq!(splits[1].sid, map.sid("NVDA").unwrap());
        assert_eq!(splits[1].ratio, 0.5);
    }

    #[test]
    fn dividends_keep_nonzero_amounts_with_null_dates() {
        let t = table();
        let map = SymbolMap::from_table(&t);
        let dividends = parse_dividends(&t, &map);

        assert_eq!(dividends.len(), 1);
        let div = dividends[0];
        assert_eq!(div.sid, 0);
        assert_eq!(div.ex_date, d(10));
        assert_eq!(div.amount, 0.47);
        assert!(div.record_date.is_none());
        assert!(div.declared_date.is_none());
        assert!(div.pay_date.is_none());
    }

    #[test]
    fn degenerate_values_are_skipped() {
        let t = RawTable::new(vec![
            rec("X", 3, f64::NAN, f64::NAN),
            rec("X", 4, 0.0, f64::INFINITY),
        ]);
        let map = SymbolMap::from_table(&t);
        assert!(parse_splits(&t, &map).is_empty());
        assert!(parse_dividends(&t, &map).is_empty());
    }

    #[test]
    fn unmapped_symbols_are_ignored() {
        let t = table();
        let empty = SymbolMap::default();
        assert!(parse_splits(&t, &empty).is_empty());
        assert!(parse_dividends(&t, &empty).is_empty());
    }
}
