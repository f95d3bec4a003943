//! Price sources and the HTTP seam they sit on.
//!
//! The [`PriceSource`] trait abstracts over the two Intrinio API generations
//! so the orchestrator never knows which one it is driving, and tests can
//! substitute scripted sources. Each source talks HTTP only through a
//! [`Fetcher`], which is mocked in the pagination tests.

pub mod http;
pub mod legacy;
pub mod v2;

pub use http::HttpFetcher;
pub use legacy::LegacySource;
pub use v2::{PageTrace, V2Source};

use crate::error::Result;
use crate::record::PriceRecord;
use std::fmt;
use std::str::FromStr;

/// HTTP basic-auth credentials (legacy API only).
#[derive(Clone, PartialEq, Eq)]
pub struct BasicAuth {
    pub user: String,
    pub password: String,
}

impl fmt::Debug for BasicAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BasicAuth")
            .field("user", &self.user)
            .field("password", &"****")
            .finish()
    }
}

/// Issues a GET and returns the raw response body.
///
/// Non-2xx responses fail with [`IngestError::Http`](crate::error::IngestError::Http).
/// No retries happen at this layer.
pub trait Fetcher {
    fn get(&self, url: &str, auth: Option<&BasicAuth>) -> Result<String>;
}

impl<F: Fetcher + ?Sized> Fetcher for &F {
    fn get(&self, url: &str, auth: Option<&BasicAuth>) -> Result<String> {
        (**self).get(url, auth)
    }
}

/// Downloads the full price + adjustment history of one symbol.
pub trait PriceSource {
    /// Human-readable name of this source, for logs.
    fn name(&self) -> &str;

    /// Fetch every record for `symbol`, in date order as delivered.
    fn download(&self, symbol: &str) -> Result<Vec<PriceRecord>>;
}

/// Which Intrinio API generation to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApiVersion {
    Legacy,
    #[default]
    V2,
}

impl ApiVersion {
    pub fn default_base_url(self) -> &'static str {
        match self {
            ApiVersion::Legacy => legacy::DEFAULT_BASE_URL,
            ApiVersion::V2 => v2::DEFAULT_BASE_URL,
        }
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "v1" => Ok(ApiVersion::Legacy),
            "v2" => Ok(ApiVersion::V2),
            other => Err(format!("unknown API version '{other}' (expected 'v2' or 'legacy')")),
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiVersion::Legacy => f.write_str("legacy"),
            ApiVersion::V2 => f.write_str("v2"),
        }
    }
}
