use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::{analysis::TransferScope, reputation::ScoreWeights};

/// Ledger node connection configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct RpcSettings {
    pub url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Wallet cache contract configuration.
///
/// Without `owner_private_key` the cache is read-only and every commit
/// is skipped.
#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    pub contract_address: String,
    #[serde(default)]
    pub owner_private_key: Option<String>,
    /// How long to wait for the update transaction to be mined
    #[serde(default = "default_commit_timeout_secs")]
    pub commit_timeout_secs: u64,
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,
}

fn default_commit_timeout_secs() -> u64 {
    120
}

fn default_gas_limit() -> u64 {
    2_000_000
}

/// Block scanner and first-activity locator tuning.
#[derive(Debug, Deserialize, Clone)]
pub struct ScannerSettings {
    /// Attempts per nonce probe / block fetch before giving up on it
    #[serde(default = "default_probe_attempts")]
    pub probe_attempts: u32,
    /// Base delay for exponential backoff between attempts
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_progress_log_interval_blocks")]
    pub progress_log_interval_blocks: u64,
    /// Which `Transfer` logs count towards the token counters
    #[serde(default)]
    pub transfer_scope: TransferScope,
}

fn default_probe_attempts() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_progress_log_interval_blocks() -> u64 {
    1_000
}

impl Default for ScannerSettings {
    fn default() -> Self {
        Self {
            probe_attempts: default_probe_attempts(),
            retry_delay_ms: default_retry_delay_ms(),
            progress_log_interval_blocks: default_progress_log_interval_blocks(),
            transfer_scope: TransferScope::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ReputationSettings {
    #[serde(default)]
    pub weights: ScoreWeights,
}

/// Root application configuration.
///
/// Loaded from a `config` file (`config.yaml` by default) and overridden by
/// `RENOWN__SECTION__KEY` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub rpc: RpcSettings,
    pub cache: CacheSettings,
    #[serde(default)]
    pub scanner: ScannerSettings,
    #[serde(default)]
    pub reputation: ReputationSettings,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_file("config")
    }

    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("RENOWN").separator("__"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
