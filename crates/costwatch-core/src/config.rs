//! Configuration management for costwatch
//!
//! The webhook URL and token are required and have no defaults. Everything else
//! can be tuned through `COSTWATCH_`-prefixed variables, with `__` separating
//! sections (`COSTWATCH_BILLING__FETCH_CONCURRENCY=4`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Variable holding the webhook POST URL
pub const WEBHOOK_URL_VAR: &str = "LINEPostURL";

/// Variable holding the webhook bearer token
pub const WEBHOOK_TOKEN_VAR: &str = "LINEtoken";

/// Prefix for optional settings
pub const ENV_PREFIX: &str = "COSTWATCH";

/// Main configuration struct
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Webhook configuration
    pub webhook: WebhookConfig,

    /// Billing metrics configuration
    pub billing: BillingConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from an explicit set of variables instead of the process environment
    pub fn from_source(vars: config::Map<String, String>) -> Result<Self> {
        Self::load(Some(vars))
    }

    fn load(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let lookup = |key: &str| match &vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        };

        let url = required(WEBHOOK_URL_VAR, lookup(WEBHOOK_URL_VAR))?;
        let token = required(WEBHOOK_TOKEN_VAR, lookup(WEBHOOK_TOKEN_VAR))?;

        let tuning: Tuning = config::Config::builder()
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars),
            )
            .build()?
            .try_deserialize()?;

        let config = Self {
            webhook: WebhookConfig {
                url,
                token,
                timeout_seconds: tuning.webhook.timeout_seconds,
            },
            billing: tuning.billing,
            logging: tuning.logging,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialized fine but cannot work
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.webhook.url).map_err(|e| {
            Error::config(format!("{WEBHOOK_URL_VAR} is not a valid URL: {e}"))
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "{WEBHOOK_URL_VAR} must be an http(s) URL, got scheme '{}'",
                parsed.scheme()
            )));
        }
        if self.webhook.timeout_seconds == 0 {
            return Err(Error::config("webhook.timeout_seconds must be positive"));
        }
        if self.billing.period_seconds <= 0 {
            return Err(Error::config("billing.period_seconds must be positive"));
        }
        if self.billing.fetch_concurrency == 0 {
            return Err(Error::config("billing.fetch_concurrency must be at least 1"));
        }
        Ok(())
    }
}

fn required(name: &str, value: Option<String>) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(Error::config(format!(
            "required environment variable {name} is not set"
        ))),
    }
}

/// Optional settings read through the `config` crate
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Tuning {
    webhook: WebhookTuning,
    billing: BillingConfig,
    logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct WebhookTuning {
    timeout_seconds: u64,
}

impl Default for WebhookTuning {
    fn default() -> Self {
        Self { timeout_seconds: 30 }
    }
}

/// Webhook configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// POST URL
    pub url: String,
    /// Bearer token
    pub token: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Billing metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BillingConfig {
    /// AWS region; billing metrics are only published in us-east-1
    pub region: String,
    /// CloudWatch namespace
    pub namespace: String,
    /// Metric name
    pub metric_name: String,
    /// Currency dimension value
    pub currency: String,
    /// Statistic period and lookback window in seconds
    pub period_seconds: i32,
    /// Maximum in-flight per-service queries
    pub fetch_concurrency: usize,
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            namespace: "AWS/Billing".to_string(),
            metric_name: "EstimatedCharges".to_string(),
            currency: "USD".to_string(),
            period_seconds: 86_400,
            fetch_concurrency: 1,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Log format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    Json,
    /// Human-readable output
    Pretty,
}
