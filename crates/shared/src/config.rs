//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Payout ledger configuration.
    #[serde(default)]
    pub payout: PayoutConfig,
    /// Payout provider configuration.
    pub gateway: GatewayConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration as read from config sources.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key shared with the identity service.
    pub secret: String,
}

/// Payout ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PayoutConfig {
    /// Fraction of revenue kept by the platform, in `[0, 1]`.
    #[serde(default = "default_platform_share_ratio")]
    pub platform_share_ratio: Decimal,
    /// ISO 4217 code of the currency payouts are made in.
    #[serde(default = "default_currency")]
    pub currency: String,
    /// Seconds a derived balance may be served from cache.
    #[serde(default = "default_balance_cache_ttl")]
    pub balance_cache_ttl_secs: u64,
    /// Maximum number of cached organization balances.
    #[serde(default = "default_balance_cache_capacity")]
    pub balance_cache_capacity: u64,
}

impl Default for PayoutConfig {
    fn default() -> Self {
        Self {
            platform_share_ratio: default_platform_share_ratio(),
            currency: default_currency(),
            balance_cache_ttl_secs: default_balance_cache_ttl(),
            balance_cache_capacity: default_balance_cache_capacity(),
        }
    }
}

fn default_platform_share_ratio() -> Decimal {
    Decimal::new(25, 2)
}

fn default_currency() -> String {
    "XAF".to_string()
}

fn default_balance_cache_ttl() -> u64 {
    60
}

fn default_balance_cache_capacity() -> u64 {
    10_000
}

/// Payout provider configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the provider's transfer API.
    pub base_url: String,
    /// Secret API key sent as a bearer token.
    pub secret_key: String,
    /// Timeout applied to every provider call, in seconds.
    #[serde(default = "default_gateway_timeout")]
    pub timeout_secs: u64,
}

fn default_gateway_timeout() -> u64 {
    15
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded or the payout
    /// settings are out of range.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KIOSK").separator("__"))
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.payout.validate()?;
        Ok(config)
    }
}

impl PayoutConfig {
    /// Checks that the configured values are usable.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Message` if the platform share is outside `[0, 1]`
    /// or the currency code is empty.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.platform_share_ratio < Decimal::ZERO || self.platform_share_ratio > Decimal::ONE {
            return Err(config::ConfigError::Message(format!(
                "payout.platform_share_ratio must be within [0, 1], got {}",
                self.platform_share_ratio
            )));
        }
        if self.currency.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "payout.currency must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
