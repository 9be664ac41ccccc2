//! Tenant registry contract
//!
//! The registry is an external collaborator: a flat, eventually-consistent
//! map from app identifier to registration metadata. The core only consumes
//! the four operations below and makes no transactional assumptions between
//! registry state and shard state: a registered app may have an empty,
//! schema-only shard, and a shard may briefly outlive its registration.
//!
//! `MemoryRegistry` is the in-process implementation used by the hub binary
//! and the test suite.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::TenantRegistration;
use crate::error::{VaultError, VaultResult};
use crate::util;

/// App identifiers double as shard database file names, so the charset is
/// restricted to filesystem-safe lowercase slugs.
const APP_ID_PATTERN: &str = "^[a-z0-9][a-z0-9_-]{0,63}$";

/// Validate an app identifier against the registration charset
pub fn validate_app_id(app_id: &str) -> VaultResult<()> {
    let pattern = regex::Regex::new(APP_ID_PATTERN).expect("app id pattern must compile");
    if pattern.is_match(app_id) {
        Ok(())
    } else {
        Err(VaultError::Validation(format!(
            "invalid app id {app_id:?}: expected {APP_ID_PATTERN}"
        )))
    }
}

/// Registry operations consumed by the gateway
#[async_trait]
pub trait TenantRegistry: Send + Sync {
    /// Create a registration; fails with a duplicate error if the app exists
    async fn register(
        &self,
        app_id: &str,
        name: &str,
        health_urls: Vec<String>,
    ) -> VaultResult<TenantRegistration>;

    /// Look up a registration by app id
    async fn get(&self, app_id: &str) -> VaultResult<TenantRegistration>;

    /// All registered app ids
    async fn list(&self) -> VaultResult<Vec<String>>;

    /// Remove a registration
    async fn delete(&self, app_id: &str) -> VaultResult<()>;
}

/// In-process registry backed by a map
#[derive(Default)]
pub struct MemoryRegistry {
    tenants: RwLock<HashMap<String, TenantRegistration>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TenantRegistry for MemoryRegistry {
    async fn register(
        &self,
        app_id: &str,
        name: &str,
        health_urls: Vec<String>,
    ) -> VaultResult<TenantRegistration> {
        validate_app_id(app_id)?;

        let mut tenants = self.tenants.write().await;
        if tenants.contains_key(app_id) {
            return Err(VaultError::Duplicate(format!("app {app_id}")));
        }

        let registration = TenantRegistration {
            app_id: app_id.to_string(),
            name: name.to_string(),
            api_key: uuid::Uuid::new_v4().to_string(),
            health_urls,
            created_at: util::now_timestamp(),
        };

        debug!("registered app {app_id}");
        tenants.insert(app_id.to_string(), registration.clone());
        Ok(registration)
    }

    async fn get(&self, app_id: &str) -> VaultResult<TenantRegistration> {
        self.tenants
            .read()
            .await
            .get(app_id)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(format!("app {app_id}")))
    }

    async fn list(&self) -> VaultResult<Vec<String>> {
        let mut ids: Vec<String> = self.tenants.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete(&self, app_id: &str) -> VaultResult<()> {
        match self.tenants.write().await.remove(app_id) {
            Some(_) => {
                debug!("deleted app {app_id}");
                Ok(())
            }
            None => Err(VaultError::NotFound(format!("app {app_id}"))),
        }
    }
}
