//! Durable key-value storage for the Farmstead client.
//!
//! The session survives process restarts through a small string key-value
//! store:
//! - [`FileStorage`]: a JSON document on disk, one atomic rewrite per write
//! - [`MemoryStorage`]: an in-process map for tests and throwaway sessions
//!
//! Writes are atomic per key only. Nothing here offers a cross-key
//! transaction, so readers must tolerate a partially written session.

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::FileStorage;
pub use keys::StorageKeys;
pub use memory::MemoryStorage;
pub use traits::KeyValueStore;
pub use vault::SessionVault;

use thiserror::Error;

/// Error type for storage operations.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backend-specific storage error
    #[error("Platform storage error: {0}")]
    Platform(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
