//! Environment-based configuration.
//!
//! | variable | default |
//! |---|---|
//! | `INTRINIO_API_KEY` | required |
//! | `INTRINIO_USER` / `INTRINIO_PWD` | empty (legacy API only) |
//! | `INTRINIO_DOWNLOAD_ATTEMPTS` | 5 |
//! | `INTRINIO_API_VERSION` | `v2` |
//! | `INTRINIO_BASE_URL` | per API version |
//! | `INTRINIO_API_COOLDOWN_MS` | 1000 |

use crate::error::{IngestError, Result};
use crate::orchestrator::{BatchPolicy, DEFAULT_ATTEMPTS, DEFAULT_COOLDOWN};
use crate::source::{ApiVersion, BasicAuth, HttpFetcher, LegacySource, PriceSource, V2Source};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

pub const API_KEY_VAR: &str = "INTRINIO_API_KEY";
pub const USER_VAR: &str = "INTRINIO_USER";
pub const PASSWORD_VAR: &str = "INTRINIO_PWD";
pub const ATTEMPTS_VAR: &str = "INTRINIO_DOWNLOAD_ATTEMPTS";
pub const API_VERSION_VAR: &str = "INTRINIO_API_VERSION";
pub const BASE_URL_VAR: &str = "INTRINIO_BASE_URL";
pub const COOLDOWN_VAR: &str = "INTRINIO_API_COOLDOWN_MS";

#[derive(Clone)]
pub struct IngestConfig {
    pub api_key: String,
    pub auth: BasicAuth,
    pub api_version: ApiVersion,
    pub base_url: String,
    pub policy: BatchPolicy,
}

impl fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IngestConfig")
            .field("api_key", &"****")
            .field("auth", &self.auth)
            .field("api_version", &self.api_version)
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish()
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = var(API_KEY_VAR).ok_or_else(|| {
            IngestError::Configuration(format!(
                "Please set your {API_KEY_VAR} environment variable and retry"
            ))
        })?;

        let api_version = parse_var(&var, API_VERSION_VAR, ApiVersion::default())?;
        let base_url = var(BASE_URL_VAR).unwrap_or_else(|| api_version.default_base_url().to_string());
        let attempts: u32 = parse_var(&var, ATTEMPTS_VAR, DEFAULT_ATTEMPTS)?;
        if attempts == 0 {
            return Err(IngestError::Configuration(format!(
                "{ATTEMPTS_VAR} must be at least 1"
            )));
        }
        let cooldown_ms: u64 = parse_var(&var, COOLDOWN_VAR, DEFAULT_COOLDOWN.as_millis() as u64)?;

        Ok(Self {
            api_key,
            auth: BasicAuth {
                user: var(USER_VAR).unwrap_or_default(),
                password: var(PASSWORD_VAR).unwrap_or_default(),
            },
            api_version,
            base_url,
            policy: BatchPolicy {
                attempts,
                cooldown: Duration::from_millis(cooldown_ms),
            },
        })
    }

    /// Build the configured price source on a real HTTP client.
    pub fn build_source(&self) -> Result<Box<dyn PriceSource>> {
        let fetcher = HttpFetcher::new()?;
        Ok(match self.api_version {
            ApiVersion::Legacy => Box::new(LegacySource::new(
                fetcher,
                self.base_url.clone(),
                self.auth.clone(),
            )),
            ApiVersion::V2 => Box::new(V2Source::new(
                fetcher,
                self.base_url.clone(),
                self.api_key.clone(),
            )),
        })
    }
}

fn parse_var<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match var(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| IngestError::Configuration(format!("invalid {name} '{raw}': {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn missing_api_key_is_configuration_error() {
        let err = IngestConfig::from_lookup(lookup(&[])).unwrap_err();
        match err {
            IngestError::Configuration(msg) => assert!(msg.contains("INTRINIO_API_KEY")),
            other => panic!("expected Configuration, got {other:?}"),
        }
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        assert!(IngestConfig::from_lookup(lookup(&[(API_KEY_VAR, "  ")])).is_err());
    }

    #[test]
    fn defaults() {
        let cfg = IngestConfig::from_lookup(lookup(&[(API_KEY_VAR, "k")])).unwrap();
        assert_eq!(cfg.api_key, "k");
        assert_eq!(cfg.api_version, ApiVersion::V2);
        assert_eq!(cfg.base_url, "https://api-v2.intrinio.com");
        assert_eq!(cfg.policy.attempts, 5);
        assert_eq!(cfg.policy.cooldown, Duration::from_secs(1));
        assert_eq!(cfg.auth.user, "");
    }

    #[test]
    fn overrides() {
        let cfg = IngestConfig::from_lookup(lookup(&[
            (API_KEY_VAR, "k"),
            (USER_VAR, "alice"),
            (PASSWORD_VAR, "pw"),
            (ATTEMPTS_VAR, "3"),
            (API_VERSION_VAR, "legacy"),
            (COOLDOWN_VAR, "0"),
        ]))
        .unwrap();
        assert_eq!(cfg.api_version, ApiVersion::Legacy);
        assert_eq!(cfg.base_url, "https://api.intrinio.com");
        assert_eq!(cfg.policy.attempts, 3);
        assert!(cfg.policy.cooldown.is_zero());
        assert_eq!(cfg.auth.user, "alice");
        assert_eq!(cfg.auth.password, "pw");
    }

    #[test]
    fn bad_numbers_are_rejected() {
        for (var, value) in [(ATTEMPTS_VAR, "five"), (ATTEMPTS_VAR, "0"), (COOLDOWN_VAR, "-1")] {
            let result = IngestConfig::from_lookup(lookup(&[(API_KEY_VAR, "k"), (var, value)]));
            assert!(
                matches!(result, Err(IngestError::Configuration(_))),
                "{var}={value} should be rejected"
            );
        }
    }

    #[test]
    fn debug_output_hides_api_key() {
        let cfg = IngestConfig::from_lookup(lookup(&[(API_KEY_VAR, "supersecret")])).unwrap();
        assert!(!format!("{cfg:?}").contains("supersecret"));
    }
}
