//! Shared repository machinery.
//!
//! Every repository is a thin typed wrapper over one store collection. Each operation reads
//! the full collection, works on it in memory and, for mutations, writes the full collection
//! back. Nothing here is atomic across collections; the engine owns that.

use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{Collection, CollectionKey, KeyValueStore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Display;
use std::sync::Arc;

/// A persisted record type with a unique id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync {
    type Id: PartialEq + Clone + Display + Send + Sync;

    /// Human-readable record kind, used in error messages.
    const KIND: &'static str;

    /// Store collection holding records of this type.
    const COLLECTION: CollectionKey;

    fn id(&self) -> &Self::Id;

    fn not_found(id: &Self::Id) -> DispensaryError;
}

/// Generic list/get/add/update/delete over one collection.
pub struct RecordRepository<S, T> {
    collection: Collection<S, T>,
}

impl<S, T> Clone for RecordRepository<S, T> {
    fn clone(&self) -> Self {
        Self {
            collection: self.collection.clone(),
        }
    }
}

impl<S, T> RecordRepository<S, T>
where
    S: KeyValueStore,
    T: Record,
{
    pub fn new(store: Arc<S>) -> Self {
        Self {
            collection: Collection::new(store, T::COLLECTION),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<T>> {
        Ok(self.collection.load().await?)
    }

    pub async fn get(&self, id: &T::Id) -> DispensaryResult<Option<T>> {
        Ok(self
            .collection
            .load()
            .await?
            .into_iter()
            .find(|record| record.id() == id))
    }

    /// Like [`get`](Self::get) but a missing record is an error.
    pub async fn require(&self, id: &T::Id) -> DispensaryResult<T> {
        self.get(id).await?.ok_or_else(|| T::not_found(id))
    }

    pub async fn filter<P>(&self, predicate: P) -> DispensaryResult<Vec<T>>
    where
        P: Fn(&T) -> bool + Send,
    {
        let mut records = self.collection.load().await?;
        records.retain(|record| predicate(record));
        Ok(records)
    }

    /// Appends `record` and returns the refreshed collection.
    ///
    /// # Errors
    ///
    /// Returns `DispensaryError::DuplicateId` if a record with the same id already exists.
    pub async fn add(&self, record: T) -> DispensaryResult<Vec<T>> {
        let mut records = self.collection.load().await?;
        if records.iter().any(|existing| existing.id() == record.id()) {
            return Err(DispensaryError::DuplicateId {
                kind: T::KIND,
                id: record.id().to_string(),
            });
        }
        records.push(record);
        self.collection.save(&records).await?;
        Ok(records)
    }

    /// Applies `change` to the record with `id` and returns the refreshed collection.
    pub async fn update_with<F>(&self, id: &T::Id, change: F) -> DispensaryResult<Vec<T>>
    where
        F: FnOnce(&mut T) + Send,
    {
        let mut records = self.collection.load().await?;
        let record = records
            .iter_mut()
            .find(|record| record.id() == id)
            .ok_or_else(|| T::not_found(id))?;
        change(record);
        self.collection.save(&records).await?;
        Ok(records)
    }

    /// Removes the record with `id` and returns the refreshed collection.
    pub async fn delete(&self, id: &T::Id) -> DispensaryResult<Vec<T>> {
        let mut records = self.collection.load().await?;
        let before = records.len();
        records.retain(|record| record.id() != id);
        if records.len() == before {
            return Err(T::not_found(id));
        }
        self.collection.save(&records).await?;
        Ok(records)
    }

    /// Overwrites the whole collection. Used to commit a batch computed in memory and to roll
    /// one back.
    pub async fn replace_all(&self, records: &[T]) -> DispensaryResult<()> {
        Ok(self.collection.save(records).await?)
    }
}
