//! Contracts of the bundle store, plus a Parquet implementation.
//!
//! The pipeline only talks to these three traits; any store that accepts
//! the asset table, a lazy per-asset bar sequence, and the two adjustment
//! tables can sit behind them.

pub mod parquet_store;
pub mod schema;

pub use self::parquet_store::{BundleManifest, ParquetBundleWriter};
pub use self::schema::{BundleTable, SchemaError};

use crate::adjustments::{DividendAdjustment, SplitAdjustment};
use crate::error::Result;
use crate::metadata::{AssetMetadata, Sid};
use crate::record::DailyBar;

pub trait AssetDbWriter {
    fn write_assets(&mut self, assets: &[AssetMetadata]) -> Result<()>;
}

pub trait DailyBarWriter {
    /// Consume the `(sid, series)` sequence; returns the number of bars written.
    fn write_bars(
        &mut self,
        bars: &mut dyn Iterator<Item = (Sid, Vec<DailyBar>)>,
        show_progress: bool,
    ) -> Result<usize>;
}

pub trait AdjustmentWriter {
    fn write_adjustments(
        &mut self,
        splits: &[SplitAdjustment],
        dividends: &[DividendAdjustment],
    ) -> Result<()>;
}

/// A store implementing all three contracts.
pub trait BundleWriter: AssetDbWriter + DailyBarWriter + AdjustmentWriter {}

impl<T: AssetDbWriter + DailyBarWriter + AdjustmentWriter + ?Sized> BundleWriter for T {}
