//! Helper functions for integration tests

use std::path::Path;
use std::sync::Arc;

use logvault::LogDraft;
use logvault::config::{Config, HealthConfig, StorageConfig};
use logvault::gateway::Gateway;
use logvault::registry::MemoryRegistry;

/// Gateway over in-memory shards (no persistence)
pub fn memory_gateway() -> Gateway {
    Gateway::new(Arc::new(MemoryRegistry::new()), &memory_config())
}

pub fn memory_config() -> Config {
    Config {
        storage: Some(StorageConfig::None),
        ..Default::default()
    }
}

/// Config with SQLite shards under `data_dir`
pub fn sqlite_config(data_dir: &Path) -> Config {
    Config {
        storage: Some(StorageConfig::Sqlite {
            data_dir: data_dir.to_path_buf(),
        }),
        ..Default::default()
    }
}

/// Config with a fast health-check interval for timer tests
pub fn fast_health_config() -> Config {
    Config {
        storage: Some(StorageConfig::None),
        health: HealthConfig {
            interval_secs: 1,
            timeout_secs: 2,
            max_retries: 2,
            backoff_base_secs: 1,
        },
        ..Default::default()
    }
}

pub fn draft(level: &str, message: &str) -> LogDraft {
    LogDraft {
        level: level.to_string(),
        message: message.to_string(),
        ..Default::default()
    }
}

pub fn draft_at(level: &str, timestamp: &str, message: &str) -> LogDraft {
    LogDraft {
        timestamp: Some(timestamp.to_string()),
        level: level.to_string(),
        message: message.to_string(),
        ..Default::default()
    }
}
