//! Legacy Intrinio API: one CSV download per symbol, basic auth.
//!
//! The body starts with a banner line that is not part of the table, then a
//! header row. Header names are matched case-insensitively.

use super::{BasicAuth, Fetcher, PriceSource};
use crate::error::{IngestError, Result};
use crate::record::{PriceRecord, DEFAULT_DIVIDEND_CURRENCY};
use chrono::NaiveDate;
use csv::StringRecord;

pub const DEFAULT_BASE_URL: &str = "https://api.intrinio.com";

pub struct LegacySource<F> {
    fetcher: F,
    base_url: String,
    auth: BasicAuth,
}

impl<F: Fetcher> LegacySource<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>, auth: BasicAuth) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
        }
    }

    pub fn data_url(&self, symbol: &str) -> String {
        format!("{}/prices.csv?identifier={symbol}", self.base_url)
    }
}

impl<F: Fetcher> PriceSource for LegacySource<F> {
    fn name(&self) -> &str {
        "intrinio_legacy"
    }

    fn download(&self, symbol: &str) -> Result<Vec<PriceRecord>> {
        let url = self.data_url(symbol);
        let body = self.fetcher.get(&url, Some(&self.auth))?;
        parse_prices_csv(symbol_from_url(&url), &body)
    }
}

/// The ticker is the value of the trailing `identifier=` parameter.
fn symbol_from_url(url: &str) -> &str {
    url.rsplit('=').next().unwrap_or(url)
}

/// Column positions resolved from the lower-cased header row.
struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: usize,
    dividend: Option<usize>,
    split_ratio: Option<usize>,
}

impl Columns {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
        let find = |name: &str| lowered.iter().position(|h| h == name);
        let require = |name: &str| {
            find(name).ok_or_else(|| IngestError::Parse(format!("prices.csv missing column '{name}'")))
        };

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            volume: require("volume")?,
            dividend: find("ex_dividend").or_else(|| find("dividend")),
            split_ratio: find("split_ratio"),
        })
    }
}

pub(crate) fn parse_prices_csv(symbol: &str, body: &str) -> Result<Vec<PriceRecord>> {
    // Skip the banner line.
    let table = match body.split_once('\n') {
        Some((_, rest)) => rest,
        None => return Ok(Vec::new()),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(table.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| IngestError::Parse(format!("prices.csv header for {symbol}: {e}")))?
        .clone();
    let cols = Columns::resolve(&headers)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row.map_err(|e| IngestError::Parse(format!("prices.csv row {i} for {symbol}: {e}")))?;
        let field = |idx: usize| row.get(idx).unwrap_or("");

        records.push(PriceRecord {
            symbol: symbol.to_string(),
            name: None,
            date: parse_date(field(cols.date))?,
            open: parse_number(field(cols.open), f64::NAN)?,
            high: parse_number(field(cols.high), f64::NAN)?,
            low: parse_number(field(cols.low), f64::NAN)?,
            close: parse_number(field(cols.close), f64::NAN)?,
            volume: parse_number(field(cols.volume), f64::NAN)?,
            dividend: cols
                .dividend
                .map(|idx| parse_number(field(idx), 0.0))
                .transpose()?
                .unwrap_or(0.0),
            dividend_currency: DEFAULT_DIVIDEND_CURRENCY.to_string(),
            split_ratio: cols
                .split_ratio
                .map(|idx| parse_number(field(idx), 1.0))
                .transpose()?
                .unwrap_or(1.0),
            factor: 1.0,
        });
    }

    Ok(records)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|e| IngestError::Parse(format!("invalid date '{raw}': {e}")))
}

fn parse_number(raw: &str, missing: f64) -> Result<f64> {
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Ok(missing);
    }
    raw.parse::<f64>()
        .map_err(|e| IngestError::Parse(format!("invalid number '{raw}': {e}")))
}
