//! Pharmacy directory.

use crate::models::Pharmacy;
use crate::repositories::shared::{Record, RecordRepository};
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{CollectionKey, KeyValueStore};
use dispensary_types::{PharmacyId, UserId};
use std::sync::Arc;

impl Record for Pharmacy {
    type Id = PharmacyId;
    const KIND: &'static str = "pharmacy";
    const COLLECTION: CollectionKey = CollectionKey::Pharmacies;

    fn id(&self) -> &PharmacyId {
        &self.id
    }

    fn not_found(id: &PharmacyId) -> DispensaryError {
        DispensaryError::PharmacyNotFound(id.clone())
    }
}

pub struct PharmacyRepository<S> {
    records: RecordRepository<S, Pharmacy>,
}

impl<S> Clone for PharmacyRepository<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<S: KeyValueStore> PharmacyRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<Pharmacy>> {
        self.records.list().await
    }

    pub async fn get(&self, id: &PharmacyId) -> DispensaryResult<Option<Pharmacy>> {
        self.records.get(id).await
    }

    pub async fn add(&self, pharmacy: Pharmacy) -> DispensaryResult<Vec<Pharmacy>> {
        self.records.add(pharmacy).await
    }

    /// Ids of the pharmacies `pharmacist_id` is linked to.
    pub async fn ids_for_pharmacist(
        &self,
        pharmacist_id: &UserId,
    ) -> DispensaryResult<Vec<PharmacyId>> {
        Ok(self
            .records
            .filter(|p| p.employs(pharmacist_id))
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect())
    }
}
