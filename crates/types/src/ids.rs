//! Typed record identifiers.
//!
//! Every persisted record carries a caller-supplied string id. Wrapping each kind in its own
//! newtype stops an order id from being passed where a medication id is expected, while the
//! stored JSON stays a plain string (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wraps an existing identifier.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh identifier of the form `<prefix>_<32 hex chars>`.
            pub fn generate() -> Self {
                Self(format!("{}_{}", $prefix, uuid::Uuid::new_v4().simple()))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

record_id!(
    /// Identifier of a catalog medication.
    MedicationId,
    "med"
);
record_id!(
    /// Identifier of a prescription.
    PrescriptionId,
    "ord"
);
record_id!(
    /// Identifier of a pharmacy order.
    OrderId,
    "cmd"
);
record_id!(
    /// Identifier of a pharmacy.
    PharmacyId,
    "ph"
);
record_id!(
    /// Identifier of a user (prescriber, patient or pharmacist).
    UserId,
    "u"
);
