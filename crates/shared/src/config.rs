//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Reconciliation defaults.
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,
    /// Inventory costing configuration.
    #[serde(default)]
    pub costing: CostingConfig,
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

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
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

/// Ledger configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Code of the system account that absorbs reconciliation variances.
    #[serde(default = "default_short_over_account_code")]
    pub short_over_account_code: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            short_over_account_code: default_short_over_account_code(),
        }
    }
}

fn default_short_over_account_code() -> String {
    "CASH_SHORT_OVER".to_string()
}

/// Reconciliation defaults for channels without their own settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Per-account variance above which a reconciliation is held, in cents.
    #[serde(default = "default_variance_threshold_cents")]
    pub default_variance_threshold_cents: i64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        Self {
            default_variance_threshold_cents: default_variance_threshold_cents(),
        }
    }
}

fn default_variance_threshold_cents() -> i64 {
    1000
}

/// Inventory costing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CostingConfig {
    /// Oversell policy for channels without their own settings
    /// (`reject` or `wholesale_estimate`).
    #[serde(default = "default_oversell_policy")]
    pub default_oversell_policy: String,
    /// How many times an allocation is retried after a batch conflict.
    #[serde(default = "default_max_allocation_retries")]
    pub max_allocation_retries: u32,
    /// Whether sales post a COGS journal entry.
    #[serde(default = "default_post_cogs_entries")]
    pub post_cogs_entries: bool,
    /// Account debited with COGS.
    #[serde(default = "default_cogs_account_code")]
    pub cogs_account_code: String,
    /// Account credited with consumed inventory.
    #[serde(default = "default_inventory_account_code")]
    pub inventory_account_code: String,
}

impl Default for CostingConfig {
    fn default() -> Self {
        Self {
            default_oversell_policy: default_oversell_policy(),
            max_allocation_retries: default_max_allocation_retries(),
            post_cogs_entries: default_post_cogs_entries(),
            cogs_account_code: default_cogs_account_code(),
            inventory_account_code: default_inventory_account_code(),
        }
    }
}

fn default_oversell_policy() -> String {
    "wholesale_estimate".to_string()
}

fn default_max_allocation_retries() -> u32 {
    5
}

fn default_post_cogs_entries() -> bool {
    true
}

fn default_cogs_account_code() -> String {
    "COGS".to_string()
}

fn default_inventory_account_code() -> String {
    "INVENTORY".to_string()
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
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}
