//! Repository modules.
//!
//! One repository per persisted record type. Repositories are the only code that reads or
//! writes their collection; the engine composes them but never touches the store directly.

pub mod inventory;
pub mod orders;
pub mod patients;
pub mod pharmacies;
pub mod prescriptions;
pub mod shared;

pub use inventory::InventoryRepository;
pub use orders::OrderRepository;
pub use patients::PatientRepository;
pub use pharmacies::PharmacyRepository;
pub use prescriptions::PrescriptionRepository;
pub use shared::{Record, RecordRepository};
