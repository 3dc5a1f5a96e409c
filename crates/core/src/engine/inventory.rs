//! Catalog management and the guarded delete.

use super::OrderEngine;
use crate::access::{require, Capability};
use crate::models::{Medication, MedicationPatch, StockLevel, StockSummary};
use crate::{DispensaryError, DispensaryResult};
use chrono::Utc;
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, MedicationId};
use std::collections::HashMap;

impl<S: KeyValueStore> OrderEngine<S> {
    pub async fn add_medication(
        &self,
        caller: &Caller,
        medication: Medication,
    ) -> DispensaryResult<Vec<Medication>> {
        require(caller, Capability::ManageInventory)?;
        let _inventory = self.locks.inventory().await;

        let id = medication.id.clone();
        let catalog = self.inventory.add(medication).await?;
        tracing::info!(medication = %id, "medication added");
        Ok(catalog)
    }

    /// Partial update of a catalog entry, including a direct stock set.
    pub async fn update_medication(
        &self,
        caller: &Caller,
        id: &MedicationId,
        patch: MedicationPatch,
    ) -> DispensaryResult<Vec<Medication>> {
        require(caller, Capability::ManageInventory)?;
        let _inventory = self.locks.inventory().await;

        let catalog = self.inventory.update(id, patch).await?;
        tracing::info!(medication = %id, "medication updated");
        Ok(catalog)
    }

    /// Deletes a medication unless something still depends on it.
    ///
    /// # Errors
    ///
    /// - `MedicationNotFound` if `id` is not in the catalog
    /// - `MedicationInUsePrescription` if unused, unexpired prescriptions reference it
    /// - `MedicationInPendingOrder` if orders not yet collected or returned reference it
    ///   through their prescription
    pub async fn delete_medication(
        &self,
        caller: &Caller,
        id: &MedicationId,
    ) -> DispensaryResult<Vec<Medication>> {
        require(caller, Capability::ManageInventory)?;
        let _guard = self.locks.lifecycle().await;
        let now = Utc::now();

        if self.inventory.get(id).await?.is_none() {
            return Err(DispensaryError::MedicationNotFound(id.clone()));
        }

        let prescriptions = self.prescriptions.list().await?;
        let blocking_prescriptions = prescriptions
            .iter()
            .filter(|p| p.is_active_at(now) && p.references(id))
            .count();
        if blocking_prescriptions > 0 {
            tracing::debug!(medication = %id, count = blocking_prescriptions, "delete blocked by prescriptions");
            return Err(DispensaryError::MedicationInUsePrescription {
                medication: id.clone(),
                count: blocking_prescriptions,
            });
        }

        let by_id: HashMap<_, _> = prescriptions.iter().map(|p| (&p.id, p)).collect();
        let blocking_orders = self
            .orders
            .list()
            .await?
            .iter()
            .filter(|o| !o.status.is_terminal())
            .filter(|o| {
                by_id
                    .get(&o.prescription_id)
                    .is_some_and(|p| p.references(id))
            })
            .count();
        if blocking_orders > 0 {
            tracing::debug!(medication = %id, count = blocking_orders, "delete blocked by orders");
            return Err(DispensaryError::MedicationInPendingOrder {
                medication: id.clone(),
                count: blocking_orders,
            });
        }

        let catalog = self.inventory.delete(id).await?;
        tracing::info!(medication = %id, "medication deleted");
        Ok(catalog)
    }

    /// Administrative stock correction. The result is clamped at zero rather than rejected.
    pub async fn adjust_stock(
        &self,
        caller: &Caller,
        id: &MedicationId,
        delta: i64,
    ) -> DispensaryResult<()> {
        require(caller, Capability::ManageInventory)?;
        let _inventory = self.locks.inventory().await;

        let stock = self.inventory.adjust_stock(id, delta).await?;
        tracing::info!(medication = %id, delta, stock, "stock adjusted");
        Ok(())
    }

    pub async fn list_medications(&self) -> DispensaryResult<Vec<Medication>> {
        self.inventory.list().await
    }

    pub async fn get_medication(&self, id: &MedicationId) -> DispensaryResult<Medication> {
        self.inventory
            .get(id)
            .await?
            .ok_or_else(|| DispensaryError::MedicationNotFound(id.clone()))
    }

    pub async fn search_medications(&self, query: &str) -> DispensaryResult<Vec<Medication>> {
        self.inventory.search(query).await
    }

    pub fn stock_level(&self, medication: &Medication) -> StockLevel {
        self.config.stock_bands().classify(medication.stock_quantity)
    }

    pub async fn stock_summary(&self) -> DispensaryResult<StockSummary> {
        let catalog = self.inventory.list().await?;
        Ok(StockSummary::from_catalog(
            self.config.stock_bands(),
            &catalog,
        ))
    }
}
