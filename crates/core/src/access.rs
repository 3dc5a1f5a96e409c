//! Role capability checks.
//!
//! The engine trusts the [`Caller`] it is handed (authentication happens elsewhere) but not
//! that the caller's role was checked. Every mutating operation calls [`require`] first.

use crate::{DispensaryError, DispensaryResult};
use dispensary_types::{Caller, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    IssuePrescription,
    RegisterPatients,
    CreateOrder,
    ManageOrders,
    ManageInventory,
    ManagePharmacies,
}

impl Capability {
    /// The single role granted this capability.
    pub fn granted_to(&self) -> Role {
        match self {
            Capability::IssuePrescription | Capability::RegisterPatients => Role::Prescriber,
            Capability::CreateOrder => Role::Patient,
            Capability::ManageOrders
            | Capability::ManageInventory
            | Capability::ManagePharmacies => Role::Pharmacist,
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Capability::IssuePrescription => "issue prescriptions",
            Capability::RegisterPatients => "register patients",
            Capability::CreateOrder => "create orders",
            Capability::ManageOrders => "manage orders",
            Capability::ManageInventory => "manage inventory",
            Capability::ManagePharmacies => "manage pharmacies",
        }
    }
}

pub fn require(caller: &Caller, capability: Capability) -> DispensaryResult<()> {
    if caller.role == capability.granted_to() {
        return Ok(());
    }
    tracing::debug!(
        caller = %caller.id,
        role = %caller.role,
        action = capability.action(),
        "capability check failed"
    );
    Err(DispensaryError::Forbidden {
        role: caller.role,
        action: capability.action(),
    })
}
