//! Shard addressing and lifecycle
//!
//! Maps an `app_id` to its shard actor. The mapping is pure: a tenant's
//! database file is always `<data_dir>/<app_id>.db`, derived from the app
//! id alone without consulting the registry. Shards are materialized
//! lazily on first touch and cached for the life of the process.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::shard::ShardHandle;
use crate::config::{HealthConfig, StorageConfig};
use crate::error::VaultResult;
use crate::storage::error::StorageError;
use crate::storage::memory::MemoryStore;
use crate::storage::sqlite::SqliteStore;
use crate::storage::TenantStore;

/// The database file a tenant's shard lives in
///
/// Pure function of the app id; registration validation restricts app ids
/// to a filesystem-safe charset.
pub fn shard_db_path(data_dir: &Path, app_id: &str) -> PathBuf {
    data_dir.join(format!("{app_id}.db"))
}

/// Owns the map of running shard actors
pub struct ShardManager {
    storage: StorageConfig,
    health: HealthConfig,
    shards: Mutex<HashMap<String, ShardHandle>>,
}

impl ShardManager {
    pub fn new(storage: StorageConfig, health: HealthConfig) -> Self {
        Self {
            storage,
            health,
            shards: Mutex::new(HashMap::new()),
        }
    }

    /// Get the running shard for `app_id`, materializing it if needed
    ///
    /// `health_urls` seeds the probe set when a new actor is spawned; a
    /// running actor keeps its current set (use `set_health_urls` on the
    /// handle to change it).
    pub async fn handle_for(
        &self,
        app_id: &str,
        health_urls: &[String],
    ) -> VaultResult<ShardHandle> {
        let mut shards = self.shards.lock().await;

        if let Some(handle) = shards.get(app_id) {
            return Ok(handle.clone());
        }

        debug!("materializing shard for {app_id}");

        let store: Arc<dyn TenantStore> = match &self.storage {
            StorageConfig::None => Arc::new(MemoryStore::new()),
            StorageConfig::Sqlite { data_dir } => {
                std::fs::create_dir_all(data_dir).map_err(StorageError::IoError)?;
                Arc::new(SqliteStore::open(shard_db_path(data_dir, app_id)).await?)
            }
        };

        let handle = ShardHandle::spawn(
            app_id.to_string(),
            store,
            health_urls.to_vec(),
            &self.health,
        );
        shards.insert(app_id.to_string(), handle.clone());

        Ok(handle)
    }

    /// Tear down a tenant's shard and delete its on-disk data
    ///
    /// Called when a tenant is deregistered. File removal is best-effort:
    /// the actor flushes and closes asynchronously, and a leftover file is
    /// harmless (it is overwritten if the app id is ever reused).
    pub async fn remove(&self, app_id: &str) {
        let handle = self.shards.lock().await.remove(app_id);
        if let Some(handle) = handle {
            handle.shutdown().await;
        }

        if let StorageConfig::Sqlite { data_dir } = &self.storage {
            for suffix in ["", "-wal", "-shm"] {
                let file = data_dir.join(format!("{app_id}.db{suffix}"));
                match std::fs::remove_file(&file) {
                    Ok(()) => debug!("removed {}", file.display()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => warn!("could not remove {}: {e}", file.display()),
                }
            }
        }
    }

    /// Shut down every running shard actor
    pub async fn shutdown_all(&self) {
        let shards: Vec<ShardHandle> = self.shards.lock().await.drain().map(|(_, h)| h).collect();
        for handle in shards {
            handle.shutdown().await;
        }
    }
}
