//! Patient directory.

use crate::models::Patient;
use crate::repositories::shared::{Record, RecordRepository};
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{CollectionKey, KeyValueStore};
use dispensary_types::UserId;
use std::sync::Arc;

impl Record for Patient {
    type Id = UserId;
    const KIND: &'static str = "patient";
    const COLLECTION: CollectionKey = CollectionKey::Patients;

    fn id(&self) -> &UserId {
        &self.id
    }

    fn not_found(id: &UserId) -> DispensaryError {
        DispensaryError::PatientNotFound(id.clone())
    }
}

pub struct PatientRepository<S> {
    records: RecordRepository<S, Patient>,
}

impl<S> Clone for PatientRepository<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<S: KeyValueStore> PatientRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<Patient>> {
        self.records.list().await
    }

    pub async fn get(&self, id: &UserId) -> DispensaryResult<Option<Patient>> {
        self.records.get(id).await
    }

    pub async fn require(&self, id: &UserId) -> DispensaryResult<Patient> {
        self.records.require(id).await
    }

    pub async fn add(&self, patient: Patient) -> DispensaryResult<Vec<Patient>> {
        self.records.add(patient).await
    }
}
