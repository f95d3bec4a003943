//! Batch download orchestrator.
//!
//! Downloads every symbol of the universe sequentially, sleeping a fixed
//! cooldown between symbols to stay under the API rate limit. The whole
//! symbol loop is one retry unit: a failure on any symbol discards the
//! attempt and the loop restarts from the first symbol.

use crate::error::{IngestError, Result};
use crate::record::RawTable;
use crate::source::PriceSource;
use crate::universe::Universe;
use std::time::Duration;
use tracing::{info, warn};

pub const DEFAULT_ATTEMPTS: u32 = 5;
pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(1);

/// Retry ceiling and throttle for one batch download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub attempts: u32,
    pub cooldown: Duration,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            cooldown: DEFAULT_COOLDOWN,
        }
    }
}

/// Progress callback for the batch download.
pub trait DownloadProgress {
    /// Called when an attempt starts (1-based).
    fn on_attempt(&self, attempt: u32, max_attempts: u32);

    /// Called before fetching a symbol.
    fn on_symbol(&self, symbol: &str, index: usize, total: usize);

    /// Called when an attempt is abandoned.
    fn on_attempt_failed(&self, attempt: u32, symbol: &str, error: &IngestError);

    /// Called once the batch succeeded.
    fn on_complete(&self, symbols: usize, rows: usize);
}

/// Reports progress through `tracing` when enabled. Failures are always logged.
pub struct LogProgress {
    pub enabled: bool,
}

impl DownloadProgress for LogProgress {
    fn on_attempt(&self, attempt: u32, max_attempts: u32) {
        if self.enabled {
            info!(attempt, max_attempts, "downloading equity data");
        }
    }

    fn on_symbol(&self, symbol: &str, index: usize, total: usize) {
        if self.enabled {
            info!("[{}/{}] fetching {symbol}", index + 1, total);
        }
    }

    fn on_attempt_failed(&self, attempt: u32, symbol: &str, error: &IngestError) {
        warn!(attempt, symbol, %error, "error reading Intrinio data, retrying batch");
    }

    fn on_complete(&self, symbols: usize, rows: usize) {
        if self.enabled {
            info!(symbols, rows, "download complete");
        }
    }
}

/// Download the whole universe, retrying the entire batch on any failure.
///
/// Returns the concatenated table of the first fully successful attempt.
/// Transport, HTTP and parse failures are retried until `policy.attempts`
/// is exhausted. A `Configuration` error (malformed base URL, unbuildable
/// client) fails the same way on every attempt, so it is returned at once
/// without retrying.
pub fn fetch_raw_data(
    source: &dyn PriceSource,
    universe: &Universe,
    policy: &BatchPolicy,
    progress: &dyn DownloadProgress,
) -> Result<RawTable> {
    if policy.attempts == 0 {
        return Err(IngestError::Configuration(
            "download attempts must be at least 1".into(),
        ));
    }

    let symbols = universe.symbols();
    let mut last_error = String::new();

    for attempt in 1..=policy.attempts {
        progress.on_attempt(attempt, policy.attempts);

        match download_batch(source, &symbols, policy.cooldown, progress) {
            Ok(table) => {
                progress.on_complete(symbols.len(), table.len());
                return Ok(table);
            }
            Err((symbol, error)) => {
                if error.is_fatal() {
                    return Err(error);
                }
                progress.on_attempt_failed(attempt, &symbol, &error);
                last_error = format!("{symbol}: {error}");
            }
        }
    }

    Err(IngestError::DataSourceUnavailable {
        attempts: policy.attempts,
        last_error,
    })
}

/// One pass over the universe. The table is local to the attempt so a
/// failed pass leaves nothing behind.
fn download_batch(
    source: &dyn PriceSource,
    symbols: &[&str],
    cooldown: Duration,
    progress: &dyn DownloadProgress,
) -> std::result::Result<RawTable, (String, IngestError)> {
    let total = symbols.len();
    let mut table = RawTable::default();

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 && !cooldown.is_zero() {
            std::thread::sleep(cooldown);
        }
        progress.on_symbol(symbol, i, total);

        let records = source
            .download(symbol)
            .map_err(|e| (symbol.to_string(), e))?;
        let skipped = table.extend(records);
        if skipped > 0 {
            warn!(symbol, skipped, "dropped repeated (symbol, date) rows");
        }
    }

    Ok(table)
}
