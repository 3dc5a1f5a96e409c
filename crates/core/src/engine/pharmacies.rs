//! Pharmacy directory operations.

use super::OrderEngine;
use crate::access::{require, Capability};
use crate::models::Pharmacy;
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, PharmacyId, UserId};

impl<S: KeyValueStore> OrderEngine<S> {
    pub async fn register_pharmacy(
        &self,
        caller: &Caller,
        pharmacy: Pharmacy,
    ) -> DispensaryResult<Vec<Pharmacy>> {
        require(caller, Capability::ManagePharmacies)?;
        let _pharmacies = self.locks.pharmacies().await;

        let id = pharmacy.id.clone();
        let all = self.pharmacies.add(pharmacy).await?;
        tracing::info!(pharmacy = %id, "pharmacy registered");
        Ok(all)
    }

    pub async fn list_pharmacies(&self) -> DispensaryResult<Vec<Pharmacy>> {
        self.pharmacies.list().await
    }

    pub async fn get_pharmacy(&self, id: &PharmacyId) -> DispensaryResult<Pharmacy> {
        self.pharmacies
            .get(id)
            .await?
            .ok_or_else(|| DispensaryError::PharmacyNotFound(id.clone()))
    }

    pub async fn pharmacy_ids_for_pharmacist(
        &self,
        pharmacist_id: &UserId,
    ) -> DispensaryResult<Vec<PharmacyId>> {
        self.pharmacies.ids_for_pharmacist(pharmacist_id).await
    }
}
