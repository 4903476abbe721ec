use crate::analyzer::validate_threshold;
use serde::Deserialize;
use std::fs;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("cannot parse config: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SymbolConfig {
    pub symbol: String,
    /// Overrides `AppConfig::default_threshold` for this symbol.
    #[serde(default)]
    pub threshold: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    pub base_url: String,
    #[serde(default = "default_days")]
    pub days: u32,
    #[serde(default = "default_metric")]
    pub metric: String,
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub telegram_bot_token: String,
    pub telegram_chat_id: i64,
    pub check_interval_seconds: u64,
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,
    pub provider: ProviderConfig,
    pub symbols: Vec<SymbolConfig>,
}

/// Shortest accepted polling interval.
pub const MIN_CHECK_INTERVAL_SECONDS: u64 = 60;

fn default_days() -> u32 {
    10000
}

fn default_metric() -> String {
    "Price".to_string()
}

fn default_timeout() -> u64 {
    15
}

fn default_db_path() -> String {
    "data.db".to_string()
}

fn default_threshold() -> f64 {
    0.25
}

impl AppConfig {
    pub fn threshold_for(&self, symbol: &SymbolConfig) -> f64 {
        symbol.threshold.unwrap_or(self.default_threshold)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.symbols.is_empty() {
            return Err(ConfigError::Invalid("no symbols configured".into()));
        }
        if self.check_interval_seconds < MIN_CHECK_INTERVAL_SECONDS {
            return Err(ConfigError::Invalid(format!(
                "check_interval_seconds must be at least {}, got {}",
                MIN_CHECK_INTERVAL_SECONDS, self.check_interval_seconds
            )));
        }
        validate_threshold(self.default_threshold)
            .map_err(|e| ConfigError::Invalid(format!("default_threshold: {}", e)))?;
        for symbol in &self.symbols {
            if symbol.symbol.trim().is_empty() {
                return Err(ConfigError::Invalid("empty symbol".into()));
            }
            validate_threshold(self.threshold_for(symbol))
                .map_err(|e| ConfigError::Invalid(format!("{}: {}", symbol.symbol, e)))?;
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(content)?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &str) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}
