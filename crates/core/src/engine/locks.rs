//! Per-collection mutation locks.
//!
//! Every engine operation that writes a collection holds that collection's lock for the whole
//! read-validate-write sequence. Operations spanning several collections take their locks in
//! the fixed order prescriptions, inventory, orders, pharmacies, patients; taking any
//! subsequence of that order cannot deadlock.

use tokio::sync::{Mutex, MutexGuard};

#[derive(Debug, Default)]
pub(crate) struct CollectionLocks {
    prescriptions: Mutex<()>,
    inventory: Mutex<()>,
    orders: Mutex<()>,
    pharmacies: Mutex<()>,
    patients: Mutex<()>,
}

/// Guards for prescriptions, inventory and orders, held together.
pub(crate) struct LifecycleGuard<'a> {
    _prescriptions: MutexGuard<'a, ()>,
    _inventory: MutexGuard<'a, ()>,
    _orders: MutexGuard<'a, ()>,
}

impl CollectionLocks {
    pub(crate) async fn prescriptions(&self) -> MutexGuard<'_, ()> {
        self.prescriptions.lock().await
    }

    pub(crate) async fn inventory(&self) -> MutexGuard<'_, ()> {
        self.inventory.lock().await
    }

    pub(crate) async fn orders(&self) -> MutexGuard<'_, ()> {
        self.orders.lock().await
    }

    pub(crate) async fn pharmacies(&self) -> MutexGuard<'_, ()> {
        self.pharmacies.lock().await
    }

    pub(crate) async fn patients(&self) -> MutexGuard<'_, ()> {
        self.patients.lock().await
    }

    /// Locks for operations that touch prescriptions, inventory and orders together.
    pub(crate) async fn lifecycle(&self) -> LifecycleGuard<'_> {
        let prescriptions = self.prescriptions.lock().await;
        let inventory = self.inventory.lock().await;
        let orders = self.orders.lock().await;
        LifecycleGuard {
            _prescriptions: prescriptions,
            _inventory: inventory,
            _orders: orders,
        }
    }
}
