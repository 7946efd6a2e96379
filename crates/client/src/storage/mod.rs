//! Durable client-side key/value storage.
//!
//! The session and cart mirror their state into a [`Storage`] backend so it
//! survives restarts. Values are opaque strings; the JSON helpers in this
//! module handle encoding.
//!
//! Backends:
//! - [`MemoryStorage`] - process-local, used by tests and throwaway sessions
//! - [`FileStorage`] - a single JSON document in a data directory

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Durable key holding the signed-in user's profile.
pub const USER_KEY: &str = "user";

/// Durable key holding the cart lines.
pub const CART_KEY: &str = "bookstore-cart";

/// Durable key holding the cookie jar.
pub const COOKIES_KEY: &str = "cookies";

/// Errors that can occur when reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be encoded or decoded.
    #[error("storage serialization error for `{key}`: {source}")]
    Serialization {
        /// Key whose value failed to (de)serialize.
        key: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Synchronous string key/value store.
///
/// Writes are write-through: once `set` or `remove` returns `Ok`, the change
/// is durable for the backend in question.
pub trait Storage: Send + Sync {
    /// Get the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns `StorageError::Serialization` if the stored value is not valid
/// JSON for `T`.
pub fn read_json<T: DeserializeOwned>(
    storage: &dyn Storage,
    key: &str,
) -> Result<Option<T>, StorageError> {
    let Some(raw) = storage.get(key)? else {
        return Ok(None);
    };
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|source| StorageError::Serialization {
            key: key.to_owned(),
            source,
        })
}

/// Encode a value as JSON and store it.
///
/// # Errors
///
/// Returns an error if encoding or the write fails.
pub fn write_json<T: Serialize + ?Sized>(
    storage: &dyn Storage,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value).map_err(|source| StorageError::Serialization {
        key: key.to_owned(),
        source,
    })?;
    storage.set(key, &raw)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_json_helpers() {
        let storage = MemoryStorage::new();
        write_json(&storage, "numbers", &[1, 2, 3]).unwrap();
        let numbers: Option<Vec<u32>> = read_json(&storage, "numbers").unwrap();
        assert_eq!(numbers, Some(vec![1, 2, 3]));

        let missing: Option<Vec<u32>> = read_json(&storage, "missing").unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_read_json_reports_corrupt_values() {
        let storage = MemoryStorage::new();
        storage.set("numbers", "{not json").unwrap();
        let err = read_json::<Vec<u32>>(&storage, "numbers").unwrap_err();
        assert!(matches!(err, StorageError::Serialization { ref key, .. } if key == "numbers"));
    }
}
