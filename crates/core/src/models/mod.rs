//! Persisted record types.

mod medication;
mod order;
mod patient;
mod pharmacy;
mod prescription;

pub use medication::{Medication, MedicationPatch, StockBands, StockLevel, StockSummary};
pub use order::{Order, OrderDraft, OrderPatch, OrderStatus, OrderStatusParseError, PreparedItems};
pub use patient::Patient;
pub use pharmacy::Pharmacy;
pub use prescription::{
    needed_per_medication, NewPrescription, PrescribedItem, Prescription, PrescriptionPatch,
    PrescriptionStatus,
};
