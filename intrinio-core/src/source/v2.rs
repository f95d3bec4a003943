//! Intrinio v2 API: cursor-paginated JSON prices plus one adjustments call.
//!
//! Prices are requested page by page, following `next_page` until the
//! server returns null (or an empty string). Adjustments are outer-joined
//! onto the prices by date; a price row without an adjustment row gets
//! neutral adjustment values, an adjustment row without a price row keeps
//! NaN prices.
//!
//! The ticker and display name stamped on every record come from the
//! payload's `security` object, since Intrinio may resolve an alias to a
//! different ticker than the one requested.

use super::{Fetcher, PriceSource};
use crate::error::{IngestError, Result};
use crate::record::{PriceRecord, DEFAULT_DIVIDEND_CURRENCY};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://api-v2.intrinio.com";
pub const PAGE_SIZE: usize = 10_000;

#[derive(Debug, Deserialize)]
struct PricesPage {
    #[serde(default)]
    stock_prices: Vec<StockPrice>,
    #[serde(default)]
    next_page: Option<String>,
    #[serde(default)]
    security: Option<Security>,
}

#[derive(Debug, Deserialize)]
struct StockPrice {
    date: NaiveDate,
    open: Option<f64>,
    high: Option<f64>,
    low: Option<f64>,
    close: Option<f64>,
    volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct AdjustmentsPayload {
    #[serde(default)]
    stock_price_adjustments: Vec<StockPriceAdjustment>,
}

#[derive(Debug, Clone, Deserialize)]
struct StockPriceAdjustment {
    date: NaiveDate,
    factor: Option<f64>,
    dividend: Option<f64>,
    dividend_currency: Option<String>,
    split_ratio: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct Security {
    ticker: Option<String>,
    name: Option<String>,
}

/// Record of how a paginated download unfolded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageTrace {
    /// Number of price pages fetched.
    pub pages: usize,
    /// Price rows accumulated across all pages.
    pub rows: usize,
    /// Every `next_page` cursor that was followed, in order.
    pub cursors: Vec<String>,
}

impl PageTrace {
    pub fn last_cursor(&self) -> Option<&str> {
        self.cursors.last().map(|s| s.as_str())
    }
}

pub struct V2Source<F> {
    fetcher: F,
    base_url: String,
    api_key: String,
}

impl<F: Fetcher> V2Source<F> {
    pub fn new(fetcher: F, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    pub fn prices_url(&self, symbol: &str, next_page: Option<&str>) -> Result<String> {
        let page_size = PAGE_SIZE.to_string();
        let mut params = vec![
            ("api_key", self.api_key.as_str()),
            ("page_size", page_size.as_str()),
        ];
        if let Some(cursor) = next_page {
            params.push(("next_page", cursor));
        }
        self.url(&format!("securities/{symbol}/prices"), &params)
    }

    pub fn adjustments_url(&self, symbol: &str) -> Result<String> {
        self.url(
            &format!("securities/{symbol}/prices/adjustments"),
            &[("api_key", self.api_key.as_str())],
        )
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String> {
        reqwest::Url::parse_with_params(&format!("{}/{path}", self.base_url), params)
            .map(String::from)
            .map_err(|e| IngestError::Configuration(format!("invalid API URL: {e}")))
    }

    /// Download one symbol and report the pagination chain it followed.
    pub fn download_with_trace(&self, symbol: &str) -> Result<(Vec<PriceRecord>, PageTrace)> {
        let mut trace = PageTrace::default();
        let mut prices = Vec::new();
        let mut security: Option<Security> = None;
        let mut seen = HashSet::new();
        let mut cursor: Option<String> = None;

        loop {
            let url = self.prices_url(symbol, cursor.as_deref())?;
            let body = self.fetcher.get(&url, None)?;
            let page: PricesPage = serde_json::from_str(&body).map_err(|e| {
                IngestError::Parse(format!("prices page {} for {symbol}: {e}", trace.pages))
            })?;

            trace.pages += 1;
            trace.rows += page.stock_prices.len();
            debug!(
                symbol,
                page = trace.pages,
                rows = page.stock_prices.len(),
                "fetched price page"
            );

            prices.extend(page.stock_prices);
            if security.is_none() {
                security = page.security;
            }

            match page.next_page.filter(|c| !c.is_empty()) {
                Some(next) => {
                    if !seen.insert(next.clone()) {
                        return Err(IngestError::Parse(format!(
                            "pagination for {symbol} repeated cursor '{next}'"
                        )));
                    }
                    trace.cursors.push(next.clone());
                    cursor = Some(next);
                }
                None => break,
            }
        }

        let body = self.fetcher.get(&self.adjustments_url(symbol)?, None)?;
        let adjustments: AdjustmentsPayload = serde_json::from_str(&body)
            .map_err(|e| IngestError::Parse(format!("adjustments for {symbol}: {e}")))?;

        let security = security.unwrap_or_default();
        let ticker = security
            .ticker
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| symbol.to_string());

        let records = merge(
            &ticker,
            security.name,
            prices,
            adjustments.stock_price_adjustments,
        );
        Ok((records, trace))
    }
}

impl<F: Fetcher> PriceSource for V2Source<F> {
    fn name(&self) -> &str {
        "intrinio_v2"
    }

    fn download(&self, symbol: &str) -> Result<Vec<PriceRecord>> {
        self.download_with_trace(symbol).map(|(records, _)| records)
    }
}

/// Outer join of prices and adjustments on date, ascending by date.
/// Duplicate dates on either side keep their first occurrence.
fn merge(
    ticker: &str,
    name: Option<String>,
    prices: Vec<StockPrice>,
    adjustments: Vec<StockPriceAdjustment>,
) -> Vec<PriceRecord> {
    let mut by_date: BTreeMap<NaiveDate, StockPriceAdjustment> = BTreeMap::new();
    for adj in adjustments {
        by_date.entry(adj.date).or_insert(adj);
    }

    let mut rows: BTreeMap<NaiveDate, PriceRecord> = BTreeMap::new();
    for p in prices {
        rows.entry(p.date).or_insert_with(|| PriceRecord {
            symbol: ticker.to_string(),
            name: name.clone(),
            date: p.date,
            open: p.open.unwrap_or(f64::NAN),
            high: p.high.unwrap_or(f64::NAN),
            low: p.low.unwrap_or(f64::NAN),
            close: p.close.unwrap_or(f64::NAN),
            volume: p.volume.unwrap_or(f64::NAN),
            dividend: 0.0,
            dividend_currency: DEFAULT_DIVIDEND_CURRENCY.to_string(),
            split_ratio: 1.0,
            factor: 1.0,
        });
    }

    for (date, adj) in by_date {
        let row = rows.entry(date).or_insert_with(|| PriceRecord {
            symbol: ticker.to_string(),
            name: name.clone(),
            date,
            open: f64::NAN,
            high: f64::NAN,
            low: f64::NAN,
            close: f64::NAN,
            volume: f64::NAN,
            dividend: 0.0,
            dividend_currency: DEFAULT_DIVIDEND_CURRENCY.to_string(),
            split_ratio: 1.0,
            factor: 1.0,
        });
        row.dividend = adj.dividend.unwrap_or(0.0);
        row.factor = adj.factor.unwrap_or(1.0);
        row.split_ratio = adj.split_ratio.unwrap_or(1.0);
        if let Some(currency) = adj.dividend_currency.filter(|c| !c.is_empty()) {
            row.dividend_currency = currency;
        }
    }

    rows.into_values().collect()
}
