//! Intrinio core: download Intrinio equity history and reshape it into bundle tables.
//!
//! Pipeline, leaf first:
//! - `source`: HTTP fetcher and the legacy CSV / v2 JSON price sources
//! - `orchestrator`: sequential, throttled batch download with whole-batch retry
//! - `metadata`: sid assignment and per-asset date ranges
//! - `pricing`: per-asset daily bars aligned to calendar sessions
//! - `adjustments`: split and dividend tables
//! - `writer`: bundle store contracts and the Parquet store
//! - `bundle`: the `ingest` entry point tying it together

pub mod adjustments;
pub mod bundle;
pub mod calendar;
pub mod config;
pub mod error;
pub mod metadata;
pub mod orchestrator;
pub mod pricing;
pub mod record;
pub mod source;
pub mod universe;
pub mod writer;

pub use adjustments::{parse_dividends, parse_splits, DividendAdjustment, SplitAdjustment};
pub use bundle::{ingest, IngestContext, IngestSummary};
pub use calendar::{TradingCalendar, WeekdayCalendar};
pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use metadata::{gen_asset_metadata, AssetMetadata, Sid, SymbolMap};
pub use orchestrator::{fetch_raw_data, BatchPolicy, DownloadProgress, LogProgress};
pub use pricing::parse_pricing_and_volume;
pub use record::{DailyBar, PriceRecord, RawTable};
pub use source::{ApiVersion, BasicAuth, Fetcher, PriceSource};
pub use universe::Universe;
pub use writer::{BundleWriter, ParquetBundleWriter};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: the tables handed between stages are Send + Sync,
    /// so a store may move them to a writer thread.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<RawTable>();
        require_sync::<RawTable>();
        require_send::<SymbolMap>();
        require_sync::<SymbolMap>();
        require_send::<AssetMetadata>();
        require_sync::<AssetMetadata>();
        require_send::<DailyBar>();
        require_sync::<DailyBar>();
        require_send::<SplitAdjustment>();
        require_sync::<SplitAdjustment>();
        require_send::<DividendAdjustment>();
        require_sync::<DividendAdjustment>();
        require_send::<IngestError>();
        require_sync::<IngestError>();
    }
}
