//! Patient directory operations.

use super::OrderEngine;
use crate::access::{require, Capability};
use crate::models::Patient;
use crate::DispensaryResult;
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, UserId};

impl<S: KeyValueStore> OrderEngine<S> {
    /// Adds a patient to the directory so prescriptions can be issued to them.
    pub async fn register_patient(
        &self,
        caller: &Caller,
        patient: Patient,
    ) -> DispensaryResult<Vec<Patient>> {
        require(caller, Capability::RegisterPatients)?;
        let _patients = self.locks.patients().await;

        let id = patient.id.clone();
        let all = self.patients.add(patient).await?;
        tracing::info!(patient = %id, "patient registered");
        Ok(all)
    }

    pub async fn list_patients(&self) -> DispensaryResult<Vec<Patient>> {
        self.patients.list().await
    }

    pub async fn get_patient(&self, id: &UserId) -> DispensaryResult<Patient> {
        self.patients.require(id).await
    }
}
