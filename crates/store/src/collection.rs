//! Typed views over the raw key-value store.

use crate::{CollectionKey, KeyValueStore, SingletonKey, StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// A named collection of `T` records stored as one JSON array.
///
/// Every read loads the full array and every write replaces it; there are no partial updates.
pub struct Collection<S, T> {
    store: Arc<S>,
    key: CollectionKey,
    _records: PhantomData<fn() -> T>,
}

impl<S, T> Clone for Collection<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _records: PhantomData,
        }
    }
}

impl<S, T> std::fmt::Debug for Collection<S, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("key", &self.key.as_str())
            .finish()
    }
}

impl<S, T> Collection<S, T>
where
    S: KeyValueStore,
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<S>, key: CollectionKey) -> Self {
        Self {
            store,
            key,
            _records: PhantomData,
        }
    }

    pub fn key(&self) -> CollectionKey {
        self.key
    }

    /// Loads every record. A key that was never written reads as an empty collection; a stored
    /// `null` (left behind by older clients when resetting) does too.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Deserialization` if the stored document is not a JSON array of `T`.
    pub async fn load(&self) -> StoreResult<Vec<T>> {
        let key = self.key.as_str();
        let Some(raw) = self.store.get(key).await? else {
            return Ok(Vec::new());
        };

        let records: Option<Vec<T>> =
            serde_json::from_str(&raw).map_err(|source| StoreError::Deserialization {
                key: key.to_owned(),
                source,
            })?;
        Ok(records.unwrap_or_default())
    }

    /// Replaces the whole collection.
    pub async fn save(&self, records: &[T]) -> StoreResult<()> {
        let key = self.key.as_str();
        let raw = serde_json::to_string(records).map_err(|source| StoreError::Serialization {
            key: key.to_owned(),
            source,
        })?;
        self.store.set(key, raw).await
    }
}

/// A single JSON value stored under its own key.
pub struct Singleton<S, T> {
    store: Arc<S>,
    key: SingletonKey,
    _value: PhantomData<fn() -> T>,
}

impl<S, T> Clone for Singleton<S, T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _value: PhantomData,
        }
    }
}

impl<S, T> Singleton<S, T>
where
    S: KeyValueStore,
    T: Serialize + DeserializeOwned,
{
    pub fn new(store: Arc<S>, key: SingletonKey) -> Self {
        Self {
            store,
            key,
            _value: PhantomData,
        }
    }

    /// Reads the value. Missing keys and stored `null` both read as `None`.
    pub async fn get(&self) -> StoreResult<Option<T>> {
        let key = self.key.as_str();
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).map_err(|source| StoreError::Deserialization {
            key: key.to_owned(),
            source,
        })
    }

    pub async fn set(&self, value: &T) -> StoreResult<()> {
        let key = self.key.as_str();
        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
            key: key.to_owned(),
            source,
        })?;
        self.store.set(key, raw).await
    }

    pub async fn clear(&self) -> StoreResult<()> {
        self.store.remove(self.key.as_str()).await
    }
}
