//! Integration tests for the batch orchestrator and the ingest pipeline,
//! driven by scripted price sources and an in-memory bundle store.

use chrono::NaiveDate;
use intrinio_core::bundle::{ingest, IngestContext};
use intrinio_core::orchestrator::{fetch_raw_data, BatchPolicy, DownloadProgress};
use intrinio_core::writer::{AdjustmentWriter, AssetDbWriter, DailyBarWriter};
use intrinio_core::{
    AssetMetadata, DailyBar, DividendAdjustment, IngestError, PriceRecord, PriceSource, Result,
    Sid, SplitAdjustment, Universe, WeekdayCalendar,
};
use std::cell::Cell;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, m, day).unwrap()
}

fn no_delay(attempts: u32) -> BatchPolicy {
    BatchPolicy {
        attempts,
        cooldown: std::time::Duration::ZERO,
    }
}

struct Silent;

impl DownloadProgress for Silent {
    fn on_attempt(&self, _: u32, _: u32) {}
    fn on_symbol(&self, _: &str, _: usize, _: usize) {}
    fn on_attempt_failed(&self, _: u32, _: &str, _: &IngestError) {}
    fn on_complete(&self, _: usize, _: usize) {}
}

/// Counts attempts and fails the second symbol until `succeed_on_attempt`.
/// Rows carry the attempt number in `close` so leaked rows are detectable.
struct AttemptSource {
    first_symbol: &'static str,
    failing_symbol: &'static str,
    succeed_on_attempt: u32,
    attempt: Cell<u32>,
}

impl PriceSource for AttemptSource {
    fn name(&self) -> &str {
        "attempt_source"
    }

    fn download(&self, symbol: &str) -> Result<Vec<PriceRecord>> {
        if symbol == self.first_symbol {
            self.attempt.set(self.attempt.get() + 1);
        }
        let attempt = self.attempt.get();
        if symbol == self.failing_symbol && attempt < self.succeed_on_attempt {
            return Err(IngestError::Http {
                status: 500,
                body: format!("attempt {attempt}"),
            });
        }
        let close = attempt as f64;
        Ok(vec![
            PriceRecord::priced(symbol, d(1, 2), close, close, close, close, 100.0),
            PriceRecord::priced(symbol, d(1, 3), close, close, close, close, 100.0),
        ])
    }
}

#[test]
fn batch_retry_returns_only_the_successful_attempt() {
    let source = AttemptSource {
        first_symbol: "AAPL",
        failing_symbol: "MSFT",
        succeed_on_attempt: 3,
        attempt: Cell::new(0),
    };
    let universe = Universe::from_symbols(&["AAPL", "MSFT", "YRD"]);

    let table = fetch_raw_data(&source, &universe, &no_delay(5), &Silent).unwrap();

    assert_eq!(source.attempt.get(), 3);
    assert_eq!(table.len(), 6);
    assert!(table.records().iter().all(|r| r.close == 3.0));
    let order: Vec<(&str, NaiveDate)> = table
        .records()
        .iter()
        .map(|r| (r.symbol.as_str(), r.date))
        .collect();
    assert_eq!(
        order,
        vec![
            ("AAPL", d(1, 2)),
            ("AAPL", d(1, 3)),
            ("MSFT", d(1, 2)),
            ("MSFT", d(1, 3)),
            ("YRD", d(1, 2)),
            ("YRD", d(1, 3)),
        ]
    );
}

#[test]
fn always_failing_source_exhausts_after_exact_attempts() {
    let source = AttemptSource {
        first_symbol: "AAPL",
        failing_symbol: "AAPL",
        succeed_on_attempt: u32::MAX,
        attempt: Cell::new(0),
    };
    let universe = Universe::from_symbols(&["AAPL", "MSFT"]);

    let err = fetch_raw_data(&source, &universe, &no_delay(3), &Silent).unwrap_err();

    assert_eq!(source.attempt.get(), 3);
    assert!(err.to_string().contains("after 3 attempts"), "{err}");
    match err {
        IngestError::DataSourceUnavailable { attempts, .. } => assert_eq!(attempts, 3),
        other => panic!("expected DataSourceUnavailable, got {other:?}"),
    }
}

// ── full pipeline ───────────────────────────────────────────────────

/// Fixed per-symbol histories.
struct FixtureSource;

impl PriceSource for FixtureSource {
    fn name(&self) -> &str {
        "fixture"
    }

    fn download(&self, symbol: &str) -> Result<Vec<PriceRecord>> {
        let mut rows = vec![
            PriceRecord::priced(symbol, d(1, 2), 10.0, 11.0, 9.0, 10.5, 1_000.0),
            PriceRecord::priced(symbol, d(1, 4), 10.5, 12.0, 10.0, 11.5, 2_000.0),
        ];
        match symbol {
            "NVDA" => rows[1].split_ratio = 2.0,
            "AAPL" => rows[0].dividend = 0.24,
            _ => {}
        }
        Ok(rows)
    }
}

#[derive(Default)]
struct MemoryStore {
    assets: Vec<AssetMetadata>,
    bars: Vec<(Sid, Vec<DailyBar>)>,
    splits: Vec<SplitAdjustment>,
    dividends: Vec<DividendAdjustment>,
    progress_flag: Option<bool>,
}

impl AssetDbWriter for MemoryStore {
    fn write_assets(&mut self, assets: &[AssetMetadata]) -> Result<()> {
        self.assets = assets.to_vec();
        Ok(())
    }
}

impl DailyBarWriter for MemoryStore {
    fn write_bars(
        &mut self,
        bars: &mut dyn Iterator<Item = (Sid, Vec<DailyBar>)>,
        show_progress: bool,
    ) -> Result<usize> {
        self.progress_flag = Some(show_progress);
        self.bars = bars.collect();
        Ok(self.bars.iter().map(|(_, s)| s.len()).sum())
    }
}

impl AdjustmentWriter for MemoryStore {
    fn write_adjustments(
        &mut self,
        splits: &[SplitAdjustment],
        dividends: &[DividendAdjustment],
    ) -> Result<()> {
        self.splits = splits.to_vec();
        self.dividends = dividends.to_vec();
        Ok(())
    }
}

#[test]
fn ingest_writes_consistent_sid_keyed_tables() {
    let universe = Universe::from_symbols(&["NVDA", "AAPL", "MSFT"]);
    let calendar = WeekdayCalendar::new();
    let mut store = MemoryStore::default();

    let summary = ingest(IngestContext {
        source: &FixtureSource,
        universe: &universe,
        policy: no_delay(1),
        calendar: &calendar,
        start_session: d(1, 1),
        end_session: d(1, 5),
        show_progress: true,
        writer: &mut store,
    })
    .unwrap();

    // sessions: Mon 1 .. Fri 5
    assert_eq!(summary.sessions, 5);
    assert_eq!(summary.assets, 3);
    assert_eq!(summary.bar_rows, 15);
    assert_eq!(summary.raw_rows, 6);
    assert_eq!(store.progress_flag, Some(true));

    // categorical order: AAPL, MSFT, NVDA
    let symbols: Vec<&str> = store.assets.iter().map(|a| a.symbol.as_str()).collect();
    assert_eq!(symbols, vec!["AAPL", "MSFT", "NVDA"]);
    for (i, asset) in store.assets.iter().enumerate() {
        assert_eq!(asset.sid, i as Sid);
        assert_eq!(asset.start_date, d(1, 2));
        assert_eq!(asset.end_date, d(1, 4));
        assert_eq!(asset.auto_close_date, d(1, 5));
    }

    let bar_sids: Vec<Sid> = store.bars.iter().map(|(sid, _)| *sid).collect();
    assert_eq!(bar_sids, vec![0, 1, 2]);
    let (_, aapl) = &store.bars[0];
    assert_eq!(aapl[0], DailyBar::zero(d(1, 1)));
    assert_eq!(aapl[1].close, 10.5);
    assert_eq!(aapl[2], DailyBar::zero(d(1, 3)));
    assert_eq!(aapl[4], DailyBar::zero(d(1, 5)));

    assert_eq!(store.splits.len(), 1);
    assert_eq!(store.splits[0].sid, 2);
    assert_eq!(store.splits[0].ratio, 0.5);
    assert_eq!(store.splits[0].effective_date, d(1, 4));

    assert_eq!(store.dividends.len(), 1);
    assert_eq!(store.dividends[0].sid, 0);
    assert_eq!(store.dividends[0].amount, 0.24);
}

#[test]
fn inverted_session_range_is_rejected_before_download() {
    let universe = Universe::from_symbols(&["AAPL"]);
    let source = AttemptSource {
        first_symbol: "AAPL",
        failing_symbol: "",
        succeed_on_attempt: 0,
        attempt: Cell::new(0),
    };
    let mut store = MemoryStore::default();

    let err = ingest(IngestContext {
        source: &source,
        universe: &universe,
        policy: no_delay(1),
        calendar: &WeekdayCalendar::new(),
        start_session: d(2, 1),
        end_session: d(1, 1),
        show_progress: false,
        writer: &mut store,
    })
    .unwrap_err();

    assert!(matches!(err, IngestError::Configuration(_)));
    assert_eq!(source.attempt.get(), 0);
}

/// Both tickers resolve to the same security, as an aliased v2 lookup does.
struct AliasSource;

impl PriceSource for AliasSource {
    fn name(&self) -> &str {
        "alias"
    }

    fn download(&self, _symbol: &str) -> Result<Vec<PriceRecord>> {
        let mut split_day = PriceRecord::priced("META", d(1, 2), 10.0, 11.0, 9.0, 10.5, 1_000.0);
        split_day.split_ratio = 2.0;
        split_day.dividend = 0.5;
        Ok(vec![
            split_day,
            PriceRecord::priced("META", d(1, 3), 5.0, 6.0, 4.5, 5.5, 2_000.0),
        ])
    }
}

#[test]
fn repeated_symbol_date_rows_adjust_once() {
    let universe = Universe::from_symbols(&["FB", "META"]);
    let calendar = WeekdayCalendar::new();
    let mut store = MemoryStore::default();

    let summary = ingest(IngestContext {
        source: &AliasSource,
        universe: &universe,
        policy: no_delay(1),
        calendar: &calendar,
        start_session: d(1, 2),
        end_session: d(1, 3),
        show_progress: false,
        writer: &mut store,
    })
    .unwrap();

    assert_eq!(summary.raw_rows, 2);
    assert_eq!(summary.assets, 1);
    assert_eq!(summary.bar_rows, 2);
    assert_eq!(store.splits.len(), 1);
    assert_eq!(store.splits[0].ratio, 0.5);
    assert_eq!(store.dividends.len(), 1);
    assert_eq!(store.dividends[0].amount, 0.5);
}
