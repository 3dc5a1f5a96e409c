//! Order Repository.

use crate::models::{Order, OrderPatch, OrderStatus};
use crate::repositories::shared::{Record, RecordRepository};
use crate::{DispensaryError, DispensaryResult};
use dispensary_store::{CollectionKey, KeyValueStore};
use dispensary_types::{OrderId, PharmacyId, UserId};
use std::sync::Arc;

impl Record for Order {
    type Id = OrderId;
    const KIND: &'static str = "order";
    const COLLECTION: CollectionKey = CollectionKey::Orders;

    fn id(&self) -> &OrderId {
        &self.id
    }

    fn not_found(id: &OrderId) -> DispensaryError {
        DispensaryError::OrderNotFound(id.clone())
    }
}

pub struct OrderRepository<S> {
    records: RecordRepository<S, Order>,
}

impl<S> Clone for OrderRepository<S> {
    fn clone(&self) -> Self {
        Self {
            records: self.records.clone(),
        }
    }
}

impl<S: KeyValueStore> OrderRepository<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            records: RecordRepository::new(store),
        }
    }

    pub async fn list(&self) -> DispensaryResult<Vec<Order>> {
        self.records.list().await
    }

    pub async fn get(&self, id: &OrderId) -> DispensaryResult<Option<Order>> {
        self.records.get(id).await
    }

    pub async fn require(&self, id: &OrderId) -> DispensaryResult<Order> {
        self.records.require(id).await
    }

    pub async fn add(&self, order: Order) -> DispensaryResult<Vec<Order>> {
        self.records.add(order).await
    }

    pub async fn update(&self, id: &OrderId, patch: OrderPatch) -> DispensaryResult<Vec<Order>> {
        self.records.update_with(id, |o| patch.apply(o)).await
    }

    pub async fn delete(&self, id: &OrderId) -> DispensaryResult<Vec<Order>> {
        self.records.delete(id).await
    }

    pub async fn by_patient(&self, patient_id: &UserId) -> DispensaryResult<Vec<Order>> {
        self.records.filter(|o| &o.patient_id == patient_id).await
    }

    pub async fn by_pharmacy(&self, pharmacy_id: &PharmacyId) -> DispensaryResult<Vec<Order>> {
        self.records.filter(|o| &o.pharmacy_id == pharmacy_id).await
    }

    /// Orders placed at any of `pharmacy_ids`, typically a pharmacist's linked pharmacies.
    pub async fn by_pharmacies(&self, pharmacy_ids: &[PharmacyId]) -> DispensaryResult<Vec<Order>> {
        self.records
            .filter(|o| pharmacy_ids.contains(&o.pharmacy_id))
            .await
    }

    pub async fn by_status(&self, status: OrderStatus) -> DispensaryResult<Vec<Order>> {
        self.records.filter(|o| o.status == status).await
    }
}
