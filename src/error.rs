//! Service-level error taxonomy
//!
//! Validation, not-found and duplicate errors are local, caller-facing
//! conditions (4xx-equivalents for the surrounding API layer). Storage
//! errors wrap the persistence layer and are never retried here.

use std::fmt;

use crate::storage::StorageError;

/// Result type alias for gateway and shard operations
pub type VaultResult<T> = Result<T, VaultError>;

/// Errors surfaced by the gateway and shard actors
#[derive(Debug)]
pub enum VaultError {
    /// Bad input: missing required field, invalid enum, unparsable timestamp
    Validation(String),

    /// Unknown tenant/app
    NotFound(String),

    /// Re-registering an existing tenant
    Duplicate(String),

    /// Underlying persistence failure
    Storage(StorageError),
}

impl fmt::Display for VaultError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VaultError::Validation(msg) => write!(f, "validation failed: {}", msg),
            VaultError::NotFound(msg) => write!(f, "not found: {}", msg),
            VaultError::Duplicate(msg) => write!(f, "already exists: {}", msg),
            VaultError::Storage(err) => write!(f, "storage error: {}", err),
        }
    }
}

impl std::error::Error for VaultError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VaultError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StorageError> for VaultError {
    fn from(err: StorageError) -> Self {
        VaultError::Storage(err)
    }
}
