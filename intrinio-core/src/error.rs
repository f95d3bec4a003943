//! Structured error types for the ingestion pipeline.
//!
//! These are designed to be displayable straight to the CLI user.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Missing or malformed configuration. Never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Non-2xx response from the price API.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("network error: {0}")]
    Transport(String),

    #[error("response parse error: {0}")]
    Parse(String),

    /// Every batch attempt failed.
    #[error("failed to download Intrinio data after {attempts} attempts (last error: {last_error})")]
    DataSourceUnavailable { attempts: u32, last_error: String },

    #[error("schema error: {0}")]
    Schema(String),

    #[error("bundle write error: {0}")]
    Writer(String),
}

impl IngestError {
    /// Errors that must abort immediately instead of triggering a batch retry.
    pub fn is_fatal(&self) -> bool {
        matches!(self, IngestError::Configuration(_))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
