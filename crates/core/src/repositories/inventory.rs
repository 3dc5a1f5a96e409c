//! Inventory Repository.
//!
//! Catalog CRUD plus the clamped administrative stock adjustment. Order-driven stock changes
//! do not go through [`InventoryRepository::adjust_stock`]; the engine validates them as a
//! batch and commits the whole catalog with [`InventoryRepository::replace_all`].

use crate::models::{Medication, MedicationPatch};
use crate::repositories::shared::{Record, RecordRepository};
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{CollectionKey, KeyValueStore};
use dispensary_types::MedicationId;
use std::sync::Arc;

impl Record for Medication {
    type Id = MedicationId;
    const KIND: &'static str = "medication";
    const COLLECTION: CollectionKey = CollectionKey::Medications;

    fn id(&self) -> &MedicationId {
        &self.id
    }

    fn not_found(id: &MedicationId) -> DispensaryError {
        DispensaryError::MedicationNotFound(id.clone())
    }
}

pub struct InventoryRepository<S> {
    records: RecordRepository<S, Medication>,
}

impl<S> Clone for InventoryRepository<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<S: KeyValueStore> InventoryRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<Medication>> {
        self.records.list().await
    }

    pub async fn get(&self, id: &MedicationId) -> DispensaryResult<Option<Medication>> {
        self.records.get(id).await
    }

    pub async fn add(&self, medication: Medication) -> DispensaryResult<Vec<Medication>> {
        self.records.add(medication).await
    }

    pub async fn update(
        &self,
        id: &MedicationId,
        patch: MedicationPatch,
    ) -> DispensaryResult<Vec<Medication>> {
        self.records.update_with(id, |m| patch.apply(m)).await
    }

    /// Unguarded delete. Callers must check references first.
    pub async fn delete(&self, id: &MedicationId) -> DispensaryResult<Vec<Medication>> {
        self.records.delete(id).await
    }

    /// Case-insensitive substring match on the medication name. A blank query matches all.
    pub async fn search(&self, query: &str) -> DispensaryResult<Vec<Medication>> {
        let needle = query.trim().to_lowercase();
        self.records
            .filter(|m| m.name.as_str().to_lowercase().contains(&needle))
            .await
    }

    /// Adds `delta` to the stock of `id`, clamping the result to `0..=u32::MAX`.
    ///
    /// Returns the new stock quantity.
    pub async fn adjust_stock(&self, id: &MedicationId, delta: i64) -> DispensaryResult<u32> {
        let mut new_quantity = 0;
        self.records
            .update_with(id, |m| {
                m.stock_quantity = clamped_stock(m.stock_quantity, delta);
                new_quantity = m.stock_quantity;
            })
            .await?;
        Ok(new_quantity)
    }

    pub async fn replace_all(&self, catalog: &[Medication]) -> DispensaryResult<()> {
        self.records.replace_all(catalog).await
    }
}

fn clamped_stock(current: u32, delta: i64) -> u32 {
    let target = i64::from(current).saturating_add(delta);
    u32::try_from(target.clamp(0, i64::from(u32::MAX))).unwrap_or(u32::MAX)
}
