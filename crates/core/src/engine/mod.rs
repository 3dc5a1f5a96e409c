//! Order Consistency Engine.
//!
//! [`OrderEngine`] is the single entry point for every operation that mutates prescriptions,
//! orders or inventory. It composes the repositories, checks the caller's role, and keeps the
//! three collections consistent with each other:
//!
//! - a prescription backs at most one order, and only while unused and unexpired
//! - stock is deducted exactly once when an order enters `{Ready, Collected}` and restored
//!   when it leaves
//! - order-driven stock changes are validated as a batch and never drive stock negative
//! - medications referenced by active prescriptions or in-progress orders cannot be deleted
//!
//! Mutations of a collection are serialised through in-process locks, so two calls started
//! concurrently (a double-tap on "confirm order") cannot interleave their read-modify-write
//! cycles.
//!
//! The engine never touches the store directly; all reads and writes go through the
//! repositories in [`crate::repositories`].

mod inventory;
mod locks;
mod orders;
mod patients;
mod pharmacies;
mod prescriptions;
pub mod transitions;

#[cfg(test)]
mod tests;

use crate::config::CoreConfig;
use crate::repositories::{
    InventoryRepository, OrderRepository, PatientRepository, PharmacyRepository,
    PrescriptionRepository,
};
use dispensary_store::KeyValueStore;
use locks::CollectionLocks;
use std::sync::Arc;

pub use transitions::{
    apply_stock_deltas, inventory_delta, stock_effect, StockDelta, StockEffect,
};

pub struct OrderEngine<S> {
    config: Arc<CoreConfig>,
    prescriptions: PrescriptionRepository<S>,
    inventory: InventoryRepository<S>,
    orders: OrderRepository<S>,
    pharmacies: PharmacyRepository<S>,
    patients: PatientRepository<S>,
    locks: CollectionLocks,
}

impl<S: KeyValueStore> OrderEngine<S> {
    pub fn new(store: Arc<S>, config: Arc<CoreConfig>) -> Self {
        Self {
            config,
            prescriptions: PrescriptionRepository::new(Arc::clone(&store)),
            inventory: InventoryRepository::new(Arc::clone(&store)),
            orders: OrderRepository::new(Arc::clone(&store)),
            pharmacies: PharmacyRepository::new(Arc::clone(&store)),
            patients: PatientRepository::new(store),
            locks: CollectionLocks::default(),
        }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}
