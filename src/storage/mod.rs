//! Storage backend selection and construction.

use std::sync::Arc;

use crate::errors::StorageError;

pub mod inmemory;
pub mod traits;

pub use inmemory::MemoryOAuthStorage;
pub use traits::{
    AuthorizationCodeStore, AuthorizationRequestStore, ClientStore, CodeRedemption, OAuthStorage,
    RefreshTokenStore,
};

/// Supported storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Memory,
}

/// Parse a storage backend name from configuration
pub fn parse_storage_backend(value: &str) -> Result<StorageBackend, StorageError> {
    match value {
        "memory" => Ok(StorageBackend::Memory),
        other => Err(StorageError::InvalidData(format!(
            "Unknown storage backend: {other}"
        ))),
    }
}

/// Construct the storage implementation for a backend
pub fn create_storage_backend(backend: StorageBackend) -> Arc<dyn OAuthStorage> {
    match backend {
        StorageBackend::Memory => Arc::new(MemoryOAuthStorage::new()),
    }
}
