//! The ingest entry point: download, derive, reshape, write.

use crate::adjustments::{parse_dividends, parse_splits};
use crate::calendar::TradingCalendar;
use crate::error::{IngestError, Result};
use crate::metadata::{gen_asset_metadata, SymbolMap};
use crate::orchestrator::{fetch_raw_data, BatchPolicy, LogProgress};
use crate::pricing::parse_pricing_and_volume;
use crate::source::PriceSource;
use crate::universe::Universe;
use crate::writer::{BundleManifest, BundleWriter};
use chrono::NaiveDate;
use tracing::info;

pub const BUNDLE_NAME: &str = "intrinio";

/// Everything one ingest run needs.
pub struct IngestContext<'a> {
    pub source: &'a dyn PriceSource,
    pub universe: &'a Universe,
    pub policy: BatchPolicy,
    pub calendar: &'a dyn TradingCalendar,
    pub start_session: NaiveDate,
    pub end_session: NaiveDate,
    pub show_progress: bool,
    pub writer: &'a mut dyn BundleWriter,
}

/// Counts reported after a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSummary {
    pub source: String,
    pub start_session: NaiveDate,
    pub end_session: NaiveDate,
    pub raw_rows: usize,
    pub assets: usize,
    pub sessions: usize,
    pub bar_rows: usize,
    pub splits: usize,
    pub dividends: usize,
    pub data_hash: String,
}

impl IngestSummary {
    pub fn manifest(&self, ingested_at: chrono::NaiveDateTime) -> BundleManifest {
        BundleManifest {
            bundle: BUNDLE_NAME.to_string(),
            source: self.source.clone(),
            start_session: self.start_session,
            end_session: self.end_session,
            raw_rows: self.raw_rows,
            assets: self.assets,
            bar_rows: self.bar_rows,
            splits: self.splits,
            dividends: self.dividends,
            data_hash: self.data_hash.clone(),
            ingested_at,
        }
    }
}

pub fn ingest(ctx: IngestContext<'_>) -> Result<IngestSummary> {
    if ctx.start_session > ctx.end_session {
        return Err(IngestError::Configuration(format!(
            "start session {} is after end session {}",
            ctx.start_session, ctx.end_session
        )));
    }

    let progress = LogProgress {
        enabled: ctx.show_progress,
    };
    let raw = fetch_raw_data(ctx.source, ctx.universe, &ctx.policy, &progress)?;

    // One categorical encoding for the whole run.
    let symbol_map = SymbolMap::from_table(&raw);

    if ctx.show_progress {
        info!("generating asset metadata");
    }
    let assets = gen_asset_metadata(&raw, &symbol_map);
    ctx.writer.write_assets(&assets)?;

    let sessions = ctx
        .calendar
        .sessions_in_range(ctx.start_session, ctx.end_session);
    let mut bars = parse_pricing_and_volume(&raw, &sessions, &symbol_map);
    let bar_rows = ctx.writer.write_bars(&mut bars, ctx.show_progress)?;

    if ctx.show_progress {
        info!("parsing split and dividend data");
    }
    let splits = parse_splits(&raw, &symbol_map);
    let dividends = parse_dividends(&raw, &symbol_map);
    ctx.writer.write_adjustments(&splits, &dividends)?;

    let summary = IngestSummary {
        source: ctx.source.name().to_string(),
        start_session: ctx.start_session,
        end_session: ctx.end_session,
        raw_rows: raw.len(),
        assets: assets.len(),
        sessions: sessions.len(),
        bar_rows,
        splits: splits.len(),
        dividends: dividends.len(),
        data_hash: raw.content_hash(),
    };
    info!(
        assets = summary.assets,
        bar_rows = summary.bar_rows,
        splits = summary.splits,
        dividends = summary.dividends,
        "ingest complete"
    );
    Ok(summary)
}
