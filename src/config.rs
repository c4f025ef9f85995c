//! Runtime configuration, read from `MCART_*` environment variables.

use crate::application::sampler::SamplerConfig;
use crate::domain::payment::MerchantProfile;
use crate::error::{CommerceError, Result};
use crate::infrastructure::http::ApiConfig;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    /// File the session token is persisted to.
    pub token_path: PathBuf,
    pub merchant: MerchantProfile,
    /// URI schemes some installed app can handle.
    pub upi_handlers: Vec<String>,
    pub sampler: SamplerConfig,
}

impl Config {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`; unset keys take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let text = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let timeout_secs: u64 = parse(&lookup, "MCART_HTTP_TIMEOUT_SECS", 30)?;
        let batch_capacity: usize = parse(&lookup, "MCART_BATCH_CAPACITY", 1000)?;
        if batch_capacity == 0 {
            return Err(CommerceError::ConfigError(
                "MCART_BATCH_CAPACITY must be greater than zero".to_string(),
            ));
        }
        let interval_ms: u64 = parse(&lookup, "MCART_SAMPLE_INTERVAL_MS", 10)?;
        if interval_ms == 0 {
            return Err(CommerceError::ConfigError(
                "MCART_SAMPLE_INTERVAL_MS must be greater than zero".to_string(),
            ));
        }

        let display_name = text("MCART_MERCHANT_NAME", "Walmart India");
        let merchant = MerchantProfile {
            merchant_id: lookup("MCART_MERCHANT_ID").unwrap_or_else(|| display_name.clone()),
            payee_name: lookup("MCART_PAYEE_NAME").unwrap_or_else(|| display_name.clone()),
            display_name,
            location: text("MCART_LOCATION", "India"),
            country_code: text("MCART_COUNTRY_CODE", "IN"),
            payee_vpa: text("MCART_PAYEE_VPA", "merchant@upi"),
            upi_note: text("MCART_UPI_NOTE", "UPI payment for cart"),
            currency: text("MCART_CURRENCY", "INR"),
        };

        let upi_handlers = text("MCART_UPI_HANDLERS", "upi")
            .split(',')
            .map(str::trim)
            .filter(|scheme| !scheme.is_empty())
            .map(str::to_string)
            .collect();

        Ok(Self {
            api: ApiConfig {
                base_url: text("MCART_API_URL", "http://localhost:5000/api"),
                timeout: Duration::from_secs(timeout_secs),
            },
            token_path: PathBuf::from(text("MCART_TOKEN_PATH", ".mcart-token")),
            merchant,
            upi_handlers,
            sampler: SamplerConfig {
                batch_capacity,
                interval: Duration::from_millis(interval_ms),
            },
        })
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| CommerceError::ConfigError(format!("invalid {key} {raw:?}: {e}"))),
        None => Ok(default),
    }
}
