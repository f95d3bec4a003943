//! Column layout of the four bundle tables and the checks run before a
//! table is written.

use super::parquet_store::{ASSETS_FILE, DAILY_BARS_FILE, DIVIDENDS_FILE, SPLITS_FILE};
use crate::error::IngestError;
use polars::prelude::*;

/// One table of an output bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleTable {
    Assets,
    DailyBars,
    Splits,
    Dividends,
}

impl BundleTable {
    pub const ALL: [BundleTable; 4] = [
        BundleTable::Assets,
        BundleTable::DailyBars,
        BundleTable::Splits,
        BundleTable::Dividends,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            BundleTable::Assets => ASSETS_FILE,
            BundleTable::DailyBars => DAILY_BARS_FILE,
            BundleTable::Splits => SPLITS_FILE,
            BundleTable::Dividends => DIVIDENDS_FILE,
        }
    }

    pub fn schema(self) -> Schema {
        let fields: Vec<(&str, DataType)> = match self {
            BundleTable::Assets => vec![
                ("sid", DataType::UInt32),
                ("symbol", DataType::String),
                ("asset_name", DataType::String),
                ("start_date", DataType::Date),
                ("end_date", DataType::Date),
                ("auto_close_date", DataType::Date),
                ("exchange", DataType::String),
            ],
            BundleTable::DailyBars => vec![
                ("sid", DataType::UInt32),
                ("date", DataType::Date),
                ("open", DataType::Float64),
                ("high", DataType::Float64),
                ("low", DataType::Float64),
                ("close", DataType::Float64),
                ("volume", DataType::Float64),
            ],
            BundleTable::Splits => vec![
                ("sid", DataType::UInt32),
                ("effective_date", DataType::Date),
                ("ratio", DataType::Float64),
            ],
            BundleTable::Dividends => vec![
                ("sid", DataType::UInt32),
                ("ex_date", DataType::Date),
                ("amount", DataType::Float64),
                ("record_date", DataType::Date),
                ("declared_date", DataType::Date),
                ("pay_date", DataType::Date),
            ],
        };
        fields
            .into_iter()
            .map(|(name, dtype)| Field::new(name.into(), dtype))
            .collect()
    }

    /// Columns that may never hold nulls. Only the three dividend
    /// bookkeeping dates are optional.
    pub fn required_columns(self) -> &'static [&'static str] {
        match self {
            BundleTable::Assets => &[
                "sid",
                "symbol",
                "asset_name",
                "start_date",
                "end_date",
                "auto_close_date",
                "exchange",
            ],
            BundleTable::DailyBars => &["sid", "date", "open", "high", "low", "close", "volume"],
            BundleTable::Splits => &["sid", "effective_date", "ratio"],
            BundleTable::Dividends => &["sid", "ex_date", "amount"],
        }
    }

    /// Check column set, dtypes and required non-null columns.
    pub fn validate(self, df: &DataFrame) -> Result<(), SchemaError> {
        let expected = self.schema();
        let actual = df.schema();

        for field in expected.iter_fields() {
            let dtype = actual.get(field.name()).ok_or_else(|| SchemaError::MissingColumn {
                table: self,
                column: field.name().to_string(),
            })?;
            if dtype != field.dtype() {
                return Err(SchemaError::TypeMismatch {
                    table: self,
                    column: field.name().to_string(),
                    expected: field.dtype().clone(),
                    actual: dtype.clone(),
                });
            }
        }

        if let Some(extra) = df
            .get_column_names()
            .into_iter()
            .find(|name| expected.get(name.as_str()).is_none())
        {
            return Err(SchemaError::UnexpectedColumn {
                table: self,
                column: extra.to_string(),
            });
        }

        for &column in self.required_columns() {
            let nulls = df
                .column(column)
                .map(|c| c.null_count())
                .unwrap_or_default();
            if nulls > 0 {
                return Err(SchemaError::NullValues {
                    table: self,
                    column: column.to_string(),
                    count: nulls,
                });
            }
        }

        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("{table:?} table is missing column '{column}'")]
    MissingColumn { table: BundleTable, column: String },

    #[error("{table:?} table has unexpected column '{column}'")]
    UnexpectedColumn { table: BundleTable, column: String },

    #[error("{table:?}.{column}: expected {expected:?}, got {actual:?}")]
    TypeMismatch {
        table: BundleTable,
        column: String,
        expected: DataType,
        actual: DataType,
    },

    #[error("{table:?}.{column} has {count} null values")]
    NullValues {
        table: BundleTable,
        column: String,
        count: usize,
    },
}

impl From<SchemaError> for IngestError {
    fn from(e: SchemaError) -> Self {
        IngestError::Schema(e.to_string())
    }
}
