//! Prescription Repository.

use crate::models::{Prescription, PrescriptionPatch};
use crate::repositories::shared::{Record, RecordRepository};
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{CollectionKey, KeyValueStore};
use dispensary_types::{PrescriptionId, UserId};
use std::sync::Arc;

impl Record for Prescription {
    type Id = PrescriptionId;
    const KIND: &'static str = "prescription";
    const COLLECTION: CollectionKey = CollectionKey::Prescriptions;

    fn id(&self) -> &PrescriptionId {
        &self.id
    }

    fn not_found(id: &PrescriptionId) -> DispensaryError {
        DispensaryError::PrescriptionNotFound(id.clone())
    }
}

pub struct PrescriptionRepository<S> {
    records: RecordRepository<S, Prescription>,
}

impl<S> Clone for PrescriptionRepository<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<S: KeyValueStore> PrescriptionRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<Prescription>> {
        self.records.list().await
    }

    pub async fn get(&self, id: &PrescriptionId) -> DispensaryResult<Option<Prescription>> {
        self.records.get(id).await
    }

    pub async fn require(&self, id: &PrescriptionId) -> DispensaryResult<Prescription> {
        self.records.require(id).await
    }

    pub async fn add(&self, prescription: Prescription) -> DispensaryResult<Vec<Prescription>> {
        self.records.add(prescription).await
    }

    pub async fn update(
        &self,
        id: &PrescriptionId,
        patch: PrescriptionPatch,
    ) -> DispensaryResult<Vec<Prescription>> {
        self.records.update_with(id, |p| patch.apply(p)).await
    }

    /// Sets the `is_used` flag. Setting it back to `false` is only done to undo a failed
    /// order creation.
    pub async fn set_used(&self, id: &PrescriptionId, used: bool) -> DispensaryResult<()> {
        self.records.update_with(id, |p| p.is_used = used).await?;
        Ok(())
    }

    pub async fn delete(&self, id: &PrescriptionId) -> DispensaryResult<Vec<Prescription>> {
        self.records.delete(id).await
    }

    pub async fn by_patient(&self, patient_id: &UserId) -> DispensaryResult<Vec<Prescription>> {
        self.records.filter(|p| &p.patient_id == patient_id).await
    }

    pub async fn by_prescriber(
        &self,
        prescriber_id: &UserId,
    ) -> DispensaryResult<Vec<Prescription>> {
        self.records
            .filter(|p| &p.prescriber_id == prescriber_id)
            .await
    }
}
