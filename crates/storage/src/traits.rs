use serde::{Serialize, de::DeserializeOwned};

use crate::error::StorageError;

/// Origin-scoped string-keyed blob store, the equivalent of the browser's
/// local storage.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    fn set_item(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Returns whether a value was present.
    fn remove_item(&mut self, key: &str) -> Result<bool, StorageError>;

    fn keys(&self) -> Result<Vec<String>, StorageError>;
}

/// Read a MessagePack-encoded record.
pub fn load_record<T: DeserializeOwned>(
    store: &dyn KeyValueStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    match store.get_item(key)? {
        Some(bytes) => rmp_serde::from_slice(&bytes)
            .map(Some)
            .map_err(|e| StorageError::Serialization(format!("{key}: {e}"))),
        None => Ok(None),
    }
}

/// Write a record as MessagePack.
pub fn save_record<T: Serialize>(
    store: &mut dyn KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let bytes = rmp_serde::to_vec(value).map_err(|e| StorageError::Serialization(format!("{key}: {e}")))?;
    store.set_item(key, &bytes)
}
