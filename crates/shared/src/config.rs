//! Application configuration management.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger engine settings.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Administrative allow-list.
    #[serde(default)]
    pub admin: AdminConfig,
    /// Payment gateway settings.
    #[serde(default)]
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

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Fraction of a transfer charged as a system fee (0.01 = 1%).
    #[serde(default = "default_fee_rate")]
    pub fee_rate: Decimal,
    /// Smallest amount accepted for a transfer.
    #[serde(default = "default_min_transfer_amount")]
    pub min_transfer_amount: Decimal,
    /// How many times an atomic unit is re-run after a write conflict.
    #[serde(default = "default_max_conflict_retries")]
    pub max_conflict_retries: u32,
}

fn default_fee_rate() -> Decimal {
    Decimal::new(1, 2)
}

fn default_min_transfer_amount() -> Decimal {
    Decimal::new(1, 2)
}

fn default_max_conflict_retries() -> u32 {
    5
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fee_rate: default_fee_rate(),
            min_transfer_amount: default_min_transfer_amount(),
            max_conflict_retries: default_max_conflict_retries(),
        }
    }
}

/// Administrative allow-list configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminConfig {
    /// External identities with administrative privileges.
    ///
    /// Accepts a list, or a comma-separated string when set from the environment.
    #[serde(default, deserialize_with = "deserialize_id_list")]
    pub ids: Vec<String>,
}

/// Payment gateway configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    /// Merchant identifier expected on inbound notifications.
    #[serde(default)]
    pub merchant_id: String,
    /// Shared secret used to sign inbound notifications.
    #[serde(default)]
    pub ipn_secret: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdList {
    List(Vec<String>),
    Joined(String),
}

fn deserialize_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let ids = match IdList::deserialize(deserializer)? {
        IdList::List(ids) => ids,
        IdList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
    };

    Ok(ids
        .into_iter()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect())
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("REMIT").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
