//! Order creation and the status lifecycle.

use super::transitions::{apply_stock_deltas, inventory_delta, stock_effect, StockEffect};
use super::OrderEngine;
use crate::access::{require, Capability};
use crate::models::{
    Medication, Order, OrderDraft, OrderPatch, OrderStatus, PreparedItems, Prescription,
};
use crate::{DispensaryError, DispensaryResult};
use chrono::{DateTime, Utc};
use dispensary_store::KeyValueStore;
use dispensary_types::{Caller, MedicationId, OrderId, PharmacyId, UserId};

impl<S: KeyValueStore> OrderEngine<S> {
    /// Creates a `Pending` order against one of the caller's prescriptions.
    ///
    /// Preconditions are checked in this order and the first failure is returned:
    /// prescription exists (and belongs to the caller), is unused, is unexpired, every
    /// prescribed medication is still in the catalog, every medication has enough stock.
    /// The pharmacy must exist. Stock is only checked here, not deducted.
    ///
    /// The order is written first and the prescription marked used second. If marking fails
    /// the order is removed again, so a failure never leaves a used prescription without an
    /// order.
    ///
    /// Returns every order, including the new one.
    pub async fn create_order(
        &self,
        caller: &Caller,
        draft: OrderDraft,
    ) -> DispensaryResult<Vec<Order>> {
        require(caller, Capability::CreateOrder)?;
        let _guard = self.locks.lifecycle().await;
        let now = Utc::now();

        let prescription = self
            .prescriptions
            .require(&draft.prescription_id)
            .await
            .inspect_err(|e| tracing::debug!("create order rejected: {e}"))?;
        if let Err(e) = check_orderable(&prescription, caller, now) {
            tracing::debug!("create order rejected: {e}");
            return Err(e);
        }

        let catalog = self.inventory.list().await?;
        if let Err(e) = check_stock_covers(&catalog, &prescription) {
            tracing::debug!("create order rejected: {e}");
            return Err(e);
        }

        if self.pharmacies.get(&draft.pharmacy_id).await?.is_none() {
            return Err(DispensaryError::PharmacyNotFound(draft.pharmacy_id));
        }

        let order = Order::from_draft(draft, caller.id.clone(), now);
        let order_id = order.id.clone();
        let prescription_id = order.prescription_id.clone();
        let orders = self.orders.add(order).await?;

        if let Err(cause) = self.prescriptions.set_used(&prescription_id, true).await {
            return match self.orders.delete(&order_id).await {
                Ok(_) => Err(cause),
                Err(rollback) => {
                    tracing::error!(
                        order = %order_id,
                        "create order: marking prescription used failed ({cause}) and the order could not be removed ({rollback})"
                    );
                    Err(DispensaryError::RollbackFailed {
                        operation: "create order",
                        cause: Box::new(cause),
                        rollback: Box::new(rollback),
                    })
                }
            };
        }

        tracing::info!(
            order = %order_id,
            prescription = %prescription_id,
            patient = %caller.id,
            "order created"
        );
        Ok(orders)
    }

    /// Moves an order to `status`, applying its stock effect.
    ///
    /// `prepared_items`, when given, replaces the order's preparation flags before the
    /// transition is checked. Entering `{Ready, Collected}` from outside requires every
    /// prescribed medication to be prepared and in stock, and deducts the needed quantities.
    /// Leaving that set restores them. Any other transition leaves inventory untouched.
    ///
    /// All stock changes of a transition are validated together; on rejection nothing is
    /// written. Returns every order.
    pub async fn update_order_status(
        &self,
        caller: &Caller,
        order_id: &OrderId,
        status: OrderStatus,
        prepared_items: Option<PreparedItems>,
    ) -> DispensaryResult<Vec<Order>> {
        require(caller, Capability::ManageOrders)?;
        let _guard = self.locks.lifecycle().await;

        let order = self.orders.require(order_id).await?;
        let prescription = self.prescriptions.require(&order.prescription_id).await?;

        let prepared = match prepared_items {
            Some(items) => {
                check_in_prescription(&prescription, items.keys())?;
                items
            }
            None => order.prepared_items.clone(),
        };

        let effect = stock_effect(order.status, status);
        if effect == StockEffect::Deduct {
            let missing = unprepared(&prescription, &prepared);
            if !missing.is_empty() {
                let err = DispensaryError::PreparationIncomplete {
                    order: order_id.clone(),
                    missing,
                };
                tracing::debug!("status update rejected: {err}");
                return Err(err);
            }
        }

        let deltas = inventory_delta(order.status, status, &prescription.items);
        let snapshot = if deltas.is_empty() {
            None
        } else {
            let catalog = self.inventory.list().await?;
            let updated = apply_stock_deltas(&catalog, &deltas)
                .inspect_err(|e| tracing::debug!("status update rejected: {e}"))?;
            self.inventory.replace_all(&updated).await?;
            Some(catalog)
        };

        let patch = OrderPatch {
            status: Some(status),
            prepared_items: Some(prepared),
            ..Default::default()
        };
        let orders = match self.orders.update(order_id, patch).await {
            Ok(orders) => orders,
            Err(cause) => return Err(self.restore_catalog(snapshot, cause).await),
        };

        tracing::info!(
            order = %order_id,
            from = %order.status,
            to = %status,
            stock = effect.as_str(),
            medications = deltas.len(),
            "order status changed"
        );
        Ok(orders)
    }

    /// Merges per-medication preparation flags into an order without changing its status.
    ///
    /// # Errors
    ///
    /// Returns `NotInPrescription` if a flag names a medication the order's prescription does
    /// not contain.
    pub async fn set_prepared_items(
        &self,
        caller: &Caller,
        order_id: &OrderId,
        items: PreparedItems,
    ) -> DispensaryResult<Order> {
        require(caller, Capability::ManageOrders)?;
        let _orders = self.locks.orders().await;

        let order = self.orders.require(order_id).await?;
        let prescription = self.prescriptions.require(&order.prescription_id).await?;
        check_in_prescription(&prescription, items.keys())?;

        let mut merged = order.prepared_items;
        merged.extend(items);
        let patch = OrderPatch {
            prepared_items: Some(merged),
            ..Default::default()
        };

        let orders = self.orders.update(order_id, patch).await?;
        orders
            .into_iter()
            .find(|o| &o.id == order_id)
            .ok_or_else(|| DispensaryError::OrderNotFound(order_id.clone()))
    }

    pub async fn get_order(&self, id: &OrderId) -> DispensaryResult<Order> {
        self.orders.require(id).await
    }

    pub async fn list_orders(&self) -> DispensaryResult<Vec<Order>> {
        self.orders.list().await
    }

    pub async fn list_orders_for_patient(&self, patient_id: &UserId) -> DispensaryResult<Vec<Order>> {
        self.orders.by_patient(patient_id).await
    }

    pub async fn list_orders_for_pharmacy(
        &self,
        pharmacy_id: &PharmacyId,
    ) -> DispensaryResult<Vec<Order>> {
        self.orders.by_pharmacy(pharmacy_id).await
    }

    /// Orders at any pharmacy the pharmacist is linked to.
    pub async fn list_orders_for_pharmacist(
        &self,
        pharmacist_id: &UserId,
    ) -> DispensaryResult<Vec<Order>> {
        let pharmacy_ids = self.pharmacies.ids_for_pharmacist(pharmacist_id).await?;
        self.orders.by_pharmacies(&pharmacy_ids).await
    }

    pub async fn list_orders_by_status(&self, status: OrderStatus) -> DispensaryResult<Vec<Order>> {
        self.orders.by_status(status).await
    }

    /// Puts `snapshot` back after a failed order write and returns the error to report.
    async fn restore_catalog(
        &self,
        snapshot: Option<Vec<Medication>>,
        cause: DispensaryError,
    ) -> DispensaryError {
        let Some(catalog) = snapshot else {
            return cause;
        };
        match self.inventory.replace_all(&catalog).await {
            Ok(()) => cause,
            Err(rollback) => {
                tracing::error!(
                    "status update: order write failed ({cause}) and stock could not be restored ({rollback})"
                );
                DispensaryError::RollbackFailed {
                    operation: "update order status",
                    cause: Box::new(cause),
                    rollback: Box::new(rollback),
                }
            }
        }
    }
}

/// Ownership, single use and expiry, in that order.
fn check_orderable(
    prescription: &Prescription,
    caller: &Caller,
    now: DateTime<Utc>,
) -> DispensaryResult<()> {
    if prescription.patient_id != caller.id {
        return Err(DispensaryError::NotPrescriptionOwner(
            prescription.id.clone(),
        ));
    }
    if prescription.is_used {
        return Err(DispensaryError::PrescriptionUsed(prescription.id.clone()));
    }
    if prescription.is_expired_at(now) {
        return Err(DispensaryError::PrescriptionExpired {
            id: prescription.id.clone(),
            expired_at: prescription.expiration_date,
        });
    }
    Ok(())
}

/// Every prescribed medication is in the catalog, then every one has enough stock.
fn check_stock_covers(catalog: &[Medication], prescription: &Prescription) -> DispensaryResult<()> {
    if let Some(item) = prescription
        .items
        .iter()
        .find(|item| !catalog.iter().any(|m| m.id == item.medication_id))
    {
        return Err(DispensaryError::MedicationUnavailable(
            item.medication_id.clone(),
        ));
    }

    let deltas = inventory_delta(OrderStatus::Pending, OrderStatus::Ready, &prescription.items);
    apply_stock_deltas(catalog, &deltas).map(|_| ())
}

fn check_in_prescription<'a>(
    prescription: &Prescription,
    mut medication_ids: impl Iterator<Item = &'a MedicationId>,
) -> DispensaryResult<()> {
    match medication_ids.find(|id| !prescription.references(id)) {
        Some(id) => Err(DispensaryError::NotInPrescription(id.clone())),
        None => Ok(()),
    }
}

/// Prescribed medications not flagged as prepared, deduplicated.
fn unprepared(prescription: &Prescription, prepared: &PreparedItems) -> Vec<MedicationId> {
    prescription
        .needed_quantities()
        .into_keys()
        .filter(|id| !prepared.get(id).copied().unwrap_or(false))
        .collect()
}
