//! Blocking HTTP fetcher backed by reqwest.

use super::{BasicAuth, Fetcher};
use crate::error::{IngestError, Result};
use std::time::Duration;
use tracing::debug;

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("intrinio-bundle/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| IngestError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    fn get(&self, url: &str, auth: Option<&BasicAuth>) -> Result<String> {
        debug!(url = %redact_api_key(url), "GET");

        let mut request = self.client.get(url);
        if let Some(auth) = auth {
            request = request.basic_auth(&auth.user, Some(&auth.password));
        }

        let resp = request
            .send()
            .map_err(|e| IngestError::Transport(e.to_string()))?;
        let status = resp.status();
        let body = resp
            .text()
            .map_err(|e| IngestError::Transport(format!("reading body: {e}")))?;

        if !status.is_success() {
            return Err(IngestError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

/// Mask the `api_key` query parameter so URLs can be logged.
pub(crate) fn redact_api_key(url: &str) -> String {
    let Some(start) = url.find("api_key=") else {
        return url.to_string();
    };
    let value_start = start + "api_key=".len();
    let value_end = url[value_start..]
        .find('&')
        .map(|i| value_start + i)
        .unwrap_or(url.len());
    format!("{}****{}", &url[..value_start], &url[value_end..])
}
