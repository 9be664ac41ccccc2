use std::path::PathBuf;
use std::time::Duration;

use tracing::trace;

/// Storage backend configuration
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(tag = "backend", rename_all = "lowercase")]
pub enum StorageConfig {
    /// In-memory shards (no persistence)
    #[serde(rename = "none")]
    None,

    /// SQLite, one database file per tenant under `data_dir`
    Sqlite {
        #[serde(default = "default_data_dir")]
        data_dir: PathBuf,
    },
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig::Sqlite {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// Health-check scheduler settings, shared by every shard
#[derive(Debug, Clone, serde::Deserialize)]
pub struct HealthConfig {
    /// Fixed interval between probe cycles
    #[serde(default = "default_health_interval")]
    pub interval_secs: u64,

    /// Per-URL probe timeout
    #[serde(default = "default_probe_timeout")]
    pub timeout_secs: u64,

    /// Bounded retries when persisting a cycle's results fails
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay for the backoff ladder (doubles per retry)
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval(),
            timeout_secs: default_probe_timeout(),
            max_retries: default_max_retries(),
            backoff_base_secs: default_backoff_base(),
        }
    }
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_secs(self.backoff_base_secs)
    }
}

fn default_health_interval() -> u64 {
    300
}

fn default_probe_timeout() -> u64 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    5
}

/// Fan-out aggregation settings
#[derive(Debug, Clone, serde::Deserialize)]
pub struct FanoutConfig {
    /// Per-tenant query timeout; expiry counts as an empty contribution
    #[serde(default = "default_fanout_timeout")]
    pub per_tenant_timeout_secs: u64,

    /// Cap on tenant queries in flight at once during a fan-out
    #[serde(default = "default_fanout_concurrency")]
    pub max_concurrency: usize,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            per_tenant_timeout_secs: default_fanout_timeout(),
            max_concurrency: default_fanout_concurrency(),
        }
    }
}

impl FanoutConfig {
    pub fn per_tenant_timeout(&self) -> Duration {
        Duration::from_secs(self.per_tenant_timeout_secs)
    }
}

fn default_fanout_timeout() -> u64 {
    5
}

fn default_fanout_concurrency() -> usize {
    16
}

/// A tenant registered by the hub at startup
#[derive(Debug, Clone, serde::Deserialize)]
pub struct TenantSeed {
    pub app_id: String,
    pub name: String,
    #[serde(default)]
    pub health_urls: Vec<String>,
}

#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct Config {
    /// Storage configuration (optional - defaults to SQLite under ./data)
    pub storage: Option<StorageConfig>,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub fanout: FanoutConfig,

    /// Tenants to register when the hub starts
    #[serde(default)]
    pub tenants: Vec<TenantSeed>,
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))
        .inspect(|config| trace!("loaded config: {config:?}"))
}
