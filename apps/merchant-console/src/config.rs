//! Environment-backed runtime configuration for `merchant-console`.

use std::{env, path::PathBuf, time::Duration};

use merchant_platform::SESSION_FILE_NAME;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://ceramicraft-merchant-frontend";
const DEFAULT_DATA_DIR: &str = "./.merchant-console-store";
const DEFAULT_NOTIFY_DURATION_MS: u64 = 3_000;
const DEFAULT_ORDER_PAGE_SIZE: u32 = 20;

/// Runtime configuration used by the console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Backend gateway that `/api/*` paths are rewritten onto.
    pub api_base_url: Url,
    /// Directory holding the local session store.
    pub data_dir: PathBuf,
    /// How long notifications stay visible.
    pub notify_duration: Duration,
    /// Default `limit` for order listing.
    pub order_page_size: u32,
}

impl ConsoleConfig {
    /// Parse configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(mut lookup: F) -> Result<Self, ConfigError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let api_base_url = parse_base_url(
            "MERCHANT_API_BASE_URL",
            optional_trimmed_env("MERCHANT_API_BASE_URL", &mut lookup)
                .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_owned()),
        )?;
        let data_dir = optional_trimmed_env("MERCHANT_DATA_DIR", &mut lookup)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
        let notify_duration_ms = parse_positive(
            "MERCHANT_NOTIFY_DURATION_MS",
            DEFAULT_NOTIFY_DURATION_MS,
            &mut lookup,
        )?;
        let order_page_size = parse_positive(
            "MERCHANT_ORDER_PAGE_SIZE",
            DEFAULT_ORDER_PAGE_SIZE,
            &mut lookup,
        )?;

        Ok(Self {
            api_base_url,
            data_dir,
            notify_duration: Duration::from_millis(notify_duration_ms),
            order_page_size,
        })
    }

    /// Location of the JSON session store.
    pub fn session_path(&self) -> PathBuf {
        self.data_dir.join(SESSION_FILE_NAME)
    }
}

/// Errors produced while parsing runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// An environment variable could not be parsed.
    #[error("invalid {key}='{value}': {reason}")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

fn optional_trimmed_env<F>(key: &'static str, lookup: &mut F) -> Option<String>
where
    F: FnMut(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_base_url(key: &'static str, value: String) -> Result<Url, ConfigError> {
    let url = Url::parse(&value).map_err(|err| ConfigError::InvalidValue {
        key,
        value: value.clone(),
        reason: err.to_string(),
    })?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be an absolute http(s) URL".to_owned(),
        });
    }
    Ok(url)
}

fn parse_positive<T, F>(key: &'static str, default: T, lookup: &mut F) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + From<u8>,
    T::Err: std::fmt::Display,
    F: FnMut(&str) -> Option<String>,
{
    let Some(value) = optional_trimmed_env(key, lookup) else {
        return Ok(default);
    };
    let parsed = value
        .parse::<T>()
        .map_err(|err| ConfigError::InvalidValue {
            key,
            value: value.clone(),
            reason: err.to_string(),
        })?;
    if parsed < T::from(1) {
        return Err(ConfigError::InvalidValue {
            key,
            value,
            reason: "must be at least 1".to_owned(),
        });
    }
    Ok(parsed)
}
