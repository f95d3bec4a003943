//! Parquet bundle store.
//!
//! Layout of an output directory:
//!
//! ```text
//! {out_dir}/assets.parquet
//! {out_dir}/daily_bars.parquet
//! {out_dir}/splits.parquet
//! {out_dir}/dividends.parquet
//! {out_dir}/manifest.json
//! ```
//!
//! Every file is written to `.tmp` first and renamed into place, and each
//! table is checked against its [`BundleTable`] layout before it hits the disk.

use super::schema::BundleTable;
use super::{AdjustmentWriter, AssetDbWriter, DailyBarWriter};
use crate::adjustments::{DividendAdjustment, SplitAdjustment};
use crate::error::{IngestError, Result};
use crate::metadata::{AssetMetadata, Sid};
use crate::record::DailyBar;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const ASSETS_FILE: &str = "assets.parquet";
pub const DAILY_BARS_FILE: &str = "daily_bars.parquet";
pub const SPLITS_FILE: &str = "splits.parquet";
pub const DIVIDENDS_FILE: &str = "dividends.parquet";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Sidecar describing one ingest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleManifest {
    pub bundle: String,
    pub source: String,
    pub start_session: NaiveDate,
    pub end_session: NaiveDate,
    pub raw_rows: usize,
    pub assets: usize,
    pub bar_rows: usize,
    pub splits: usize,
    pub dividends: usize,
    pub data_hash: String,
    pub ingested_at: chrono::NaiveDateTime,
}

pub struct ParquetBundleWriter {
    out_dir: PathBuf,
}

impl ParquetBundleWriter {
    pub fn new(out_dir: impl Into<PathBuf>) -> Result<Self> {
        let out_dir = out_dir.into();
        fs::create_dir_all(&out_dir).map_err(|e| {
            IngestError::Writer(format!("failed to create {}: {e}", out_dir.display()))
        })?;
        Ok(Self { out_dir })
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    pub fn write_manifest(&self, manifest: &BundleManifest) -> Result<()> {
        let json = serde_json::to_string_pretty(manifest)
            .map_err(|e| IngestError::Writer(format!("manifest serialization: {e}")))?;
        let path = self.out_dir.join(MANIFEST_FILE);
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, json)
            .map_err(|e| IngestError::Writer(format!("manifest write: {e}")))?;
        rename_into_place(&tmp_path, &path)
    }

    pub fn read_manifest(&self) -> Result<BundleManifest> {
        let content = fs::read_to_string(self.out_dir.join(MANIFEST_FILE))
            .map_err(|e| IngestError::Writer(format!("manifest read: {e}")))?;
        serde_json::from_str(&content)
            .map_err(|e| IngestError::Writer(format!("manifest parse: {e}")))
    }

    /// Read one of the bundle tables back, e.g. [`ASSETS_FILE`].
    pub fn read_table(&self, file_name: &str) -> Result<DataFrame> {
        let path = self.out_dir.join(file_name);
        let file = fs::File::open(&path)
            .map_err(|e| IngestError::Writer(format!("open {}: {e}", path.display())))?;
        ParquetReader::new(file)
            .finish()
            .map_err(|e| IngestError::Writer(format!("read {}: {e}", path.display())))
    }

    fn write_table(&self, table: BundleTable, df: &mut DataFrame) -> Result<()> {
        table.validate(df)?;
        let file_name = table.file_name();

        let path = self.out_dir.join(file_name);
        let tmp_path = path.with_extension("parquet.tmp");
        let file = fs::File::create(&tmp_path)
            .map_err(|e| IngestError::Writer(format!("create {}: {e}", tmp_path.display())))?;
        ParquetWriter::new(file)
            .finish(df)
            .map_err(|e| IngestError::Writer(format!("write {file_name}: {e}")))?;

        rename_into_place(&tmp_path, &path)?;
        debug!(file = file_name, rows = df.height(), "wrote table");
        Ok(())
    }
}

impl AssetDbWriter for ParquetBundleWriter {
    fn write_assets(&mut self, assets: &[AssetMetadata]) -> Result<()> {
        let mut df = assets_to_dataframe(assets)?;
        self.write_table(BundleTable::Assets, &mut df)
    }
}

impl DailyBarWriter for ParquetBundleWriter {
    fn write_bars(
        &mut self,
        bars: &mut dyn Iterator<Item = (Sid, Vec<DailyBar>)>,
        show_progress: bool,
    ) -> Result<usize> {
        let mut columns = BarColumns::default();
        let mut assets = 0usize;

        for (sid, series) in bars {
            columns.push(sid, &series);
            assets += 1;
            if show_progress && assets % 50 == 0 {
                info!(assets, rows = columns.len(), "merging daily equity files");
            }
        }

        let rows = columns.len();
        let mut df = columns.into_dataframe()?;
        self.write_table(BundleTable::DailyBars, &mut df)?;
        if show_progress {
            info!(assets, rows, "daily bars written");
        }
        Ok(rows)
    }
}

impl AdjustmentWriter for ParquetBundleWriter {
    fn write_adjustments(
        &mut self,
        splits: &[SplitAdjustment],
        dividends: &[DividendAdjustment],
    ) -> Result<()> {
        let mut df = splits_to_dataframe(splits)?;
        self.write_table(BundleTable::Splits, &mut df)?;

        let mut df = dividends_to_dataframe(dividends)?;
        self.write_table(BundleTable::Dividends, &mut df)
    }
}

fn rename_into_place(tmp_path: &Path, path: &Path) -> Result<()> {
    fs::rename(tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(tmp_path);
        IngestError::Writer(format!("atomic rename failed: {e}"))
    })
}

// ── DataFrame conversion ────────────────────────────────────────────

fn epoch_days(date: NaiveDate) -> i32 {
    (date - NaiveDate::default()).num_days() as i32
}

fn date_column(name: &str, dates: Vec<Option<i32>>) -> Result<Column> {
    Column::new(name.into(), dates)
        .cast(&DataType::Date)
        .map_err(|e| IngestError::Writer(format!("{name} cast: {e}")))
}

fn frame(columns: Vec<Column>) -> Result<DataFrame> {
    DataFrame::new(columns).map_err(|e| IngestError::Writer(format!("dataframe creation: {e}")))
}

fn assets_to_dataframe(assets: &[AssetMetadata]) -> Result<DataFrame> {
    let day = |f: fn(&AssetMetadata) -> NaiveDate| -> Vec<Option<i32>> {
        assets.iter().map(|a| Some(epoch_days(f(a)))).collect()
    };

    frame(vec![
        Column::new("sid".into(), assets.iter().map(|a| a.sid).collect::<Vec<u32>>()),
        Column::new(
            "symbol".into(),
            assets.iter().map(|a| a.symbol.clone()).collect::<Vec<String>>(),
        ),
        Column::new(
            "asset_name".into(),
            assets.iter().map(|a| a.asset_name.clone()).collect::<Vec<String>>(),
        ),
        date_column("start_date", day(|a| a.start_date))?,
        date_column("end_date", day(|a| a.end_date))?,
        date_column("auto_close_date", day(|a| a.auto_close_date))?,
        Column::new(
            "exchange".into(),
            assets.iter().map(|a| a.exchange.clone()).collect::<Vec<String>>(),
        ),
    ])
}

/// Columnar accumulator for the bar sequence.
#[derive(Default)]
struct BarColumns {
    sids: Vec<u32>,
    dates: Vec<Option<i32>>,
    opens: Vec<f64>,
    highs: Vec<f64>,
    lows: Vec<f64>,
    closes: Vec<f64>,
    volumes: Vec<f64>,
}

impl BarColumns {
    fn push(&mut self, sid: Sid, series: &[DailyBar]) {
        for bar in series {
            self.sids.push(sid);
            self.dates.push(Some(epoch_days(bar.date)));
            self.opens.push(bar.open);
            self.highs.push(bar.high);
            self.lows.push(bar.low);
            self.closes.push(bar.close);
            self.volumes.push(bar.volume);
        }
    }

    fn len(&self) -> usize {
        self.sids.len()
    }

    fn into_dataframe(self) -> Result<DataFrame> {
        frame(vec![
            Column::new("sid".into(), self.sids),
            date_column("date", self.dates)?,
            Column::new("open".into(), self.opens),
            Column::new("high".into(), self.highs),
            Column::new("low".into(), self.lows),
            Column::new("close".into(), self.closes),
            Column::new("volume".into(), self.volumes),
        ])
    }
}

fn splits_to_dataframe(splits: &[SplitAdjustment]) -> Result<DataFrame> {
    frame(vec![
        Column::new("sid".into(), splits.iter().map(|s| s.sid).collect::<Vec<u32>>()),
        date_column(
            "effective_date",
            splits.iter().map(|s| Some(epoch_days(s.effective_date))).collect(),
        )?,
        Column::new("ratio".into(), splits.iter().map(|s| s.ratio).collect::<Vec<f64>>()),
    ])
}

fn dividends_to_dataframe(dividends: &[DividendAdjustment]) -> Result<DataFrame> {
    let optional = |f: fn(&DividendAdjustment) -> Option<NaiveDate>| -> Vec<Option<i32>> {
        dividends.iter().map(|d| f(d).map(epoch_days)).collect()
    };

    frame(vec![
        Column::new("sid".into(), dividends.iter().map(|d| d.sid).collect::<Vec<u32>>()),
        date_column("ex_date", optional(|d| Some(d.ex_date)))?,
        Column::new(
            "amount".into(),
            dividends.iter().map(|d| d.amount).collect::<Vec<f64>>(),
        ),
        date_column("record_date", optional(|d| d.record_date))?,
        date_column("declared_date", optional(|d| d.declared_date))?,
        date_column("pay_date", optional(|d| d.pay_date))?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    #[test]
    fn epoch_days_matches_polars_date_encoding() {
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 1);
        assert_eq!(epoch_days(d(1)), 19_723);
    }

    #[test]
    fn bars_are_written_sid_major() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ParquetBundleWriter::new(dir.path()).unwrap();

        let mut bars = vec![
            (0u32, vec![DailyBar::zero(d(2)), DailyBar::zero(d(3))]),
            (1u32, vec![DailyBar::zero(d(2)), DailyBar::zero(d(3))]),
        ]
        .into_iter();
        let rows = writer.write_bars(&mut bars, false).unwrap();
        assert_eq!(rows, 4);

        let df = writer.read_table(DAILY_BARS_FILE).unwrap();
        assert_eq!(df.height(), 4);
        let sids: Vec<Option<u32>> = df.column("sid").unwrap().u32().unwrap().into_iter().collect();
        assert_eq!(sids, vec![Some(0), Some(0), Some(1), Some(1)]);
        assert!(!dir.path().join("daily_bars.parquet.tmp").exists());
    }

    #[test]
    fn dividends_keep_null_dates() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = ParquetBundleWriter::new(dir.path()).unwrap();

        let dividends = [DividendAdjustment {
            sid: 3,
            ex_date: d(10),
            amount: 0.25,
            record_date: None,
            declared_date: None,
            pay_date: None,
        }];
        writer.write_adjustments(&[], &dividends).unwrap();

        let splits = writer.read_table(SPLITS_FILE).unwrap();
        assert_eq!(splits.height(), 0);

        let df = writer.read_table(DIVIDENDS_FILE).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("pay_date").unwrap().null_count(), 1);
        assert_eq!(df.column("ex_date").unwrap().null_count(), 0);
    }

    #[test]
    fn manifest_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let writer = ParquetBundleWriter::new(dir.path()).unwrap();
        let manifest = BundleManifest {
            bundle: "intrinio".into(),
            source: "intrinio_v2".into(),
            start_session: d(2),
            end_session: d(31),
            raw_rows: 10,
            assets: 2,
            bar_rows: 44,
            splits: 1,
            dividends: 0,
            data_hash: "abc".into(),
            ingested_at: d(31).and_hms_opt(12, 0, 0).unwrap(),
        };
        writer.write_manifest(&manifest).unwrap();
        assert_eq!(writer.read_manifest().unwrap(), manifest);
    }
}
