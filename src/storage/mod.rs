//! Per-tenant storage backends
//!
//! This module provides a trait-based abstraction for one tenant's shard
//! storage. A store instance owns exactly one tenant's `logs`,
//! `health_checks` and `stats` structures; isolation between tenants falls
//! out of never sharing a store across shards.
//!
//! ## Backends
//!
//! - **SQLite** (default): one database file per tenant under the data dir
//! - **In-Memory**: no persistence, for tests and ephemeral hubs

pub mod backend;
pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;

pub use backend::{HealthQuery, LogQuery, TenantStore};
pub use error::{StorageError, StorageResult};
