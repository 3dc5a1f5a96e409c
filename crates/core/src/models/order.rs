//! Pharmacy orders and their status.

use chrono::{DateTime, Utc};
use dispensary_types::{MedicationId, OrderId, PharmacyId, PrescriptionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Per-medication preparation progress of an order.
pub type PreparedItems = BTreeMap<MedicationId, bool>;

/// Order fulfilment status.
///
/// `Pending → InPreparation → Ready → Collected` is the usual path and `Returned` is reachable
/// from `Ready` or `Collected`, but a pharmacist may set any status to correct a mistake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[serde(alias = "EN_ATTENTE")]
    Pending,
    #[serde(alias = "EN_PREPARATION")]
    InPreparation,
    #[serde(alias = "PRETE")]
    Ready,
    #[serde(alias = "RECUPEREE")]
    Collected,
    #[serde(alias = "RETOURNEE")]
    Returned,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::InPreparation,
        OrderStatus::Ready,
        OrderStatus::Collected,
        OrderStatus::Returned,
    ];

    /// Whether an order in this status has had its stock taken out of inventory.
    pub fn is_stock_deducted(&self) -> bool {
        matches!(self, OrderStatus::Ready | OrderStatus::Collected)
    }

    /// Terminal statuses are kept as history and no longer block catalog deletes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Collected | OrderStatus::Returned)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::InPreparation => "IN_PREPARATION",
            OrderStatus::Ready => "READY",
            OrderStatus::Collected => "COLLECTED",
            OrderStatus::Returned => "RETURNED",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown order status '{0}'")]
pub struct OrderStatusParseError(String);

impl FromStr for OrderStatus {
    type Err = OrderStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalised = s.trim().to_ascii_uppercase().replace('-', "_");
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalised)
            .ok_or_else(|| OrderStatusParseError(s.to_owned()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    #[serde(alias = "ordonnanceId")]
    pub prescription_id: PrescriptionId,
    pub patient_id: UserId,
    #[serde(alias = "pharmacieId")]
    pub pharmacy_id: PharmacyId,
    pub status: OrderStatus,
    #[serde(alias = "dateCreation")]
    pub created_at: DateTime<Utc>,
    #[serde(default, alias = "lieuLivraison", skip_serializing_if = "Option::is_none")]
    pub delivery_address: Option<String>,
    #[serde(default, alias = "remarques", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, alias = "preparedMedicaments")]
    pub prepared_items: PreparedItems,
}

impl Order {
    /// Builds the initial `Pending` record for a validated draft.
    pub fn from_draft(draft: OrderDraft, patient_id: UserId, created_at: DateTime<Utc>) -> Self {
        Self {
            id: draft.id,
            prescription_id: draft.prescription_id,
            patient_id,
            pharmacy_id: draft.pharmacy_id,
            status: OrderStatus::Pending,
            created_at,
            delivery_address: non_blank(draft.delivery_address),
            notes: non_blank(draft.notes),
            prepared_items: PreparedItems::new(),
        }
    }

    pub fn is_prepared(&self, medication_id: &MedicationId) -> bool {
        self.prepared_items
            .get(medication_id)
            .copied()
            .unwrap_or(false)
    }
}

/// What a patient supplies when ordering against a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDraft {
    pub id: OrderId,
    pub prescription_id: PrescriptionId,
    pub pharmacy_id: PharmacyId,
    #[serde(default)]
    pub delivery_address: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of an [`Order`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub prepared_items: Option<PreparedItems>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl OrderPatch {
    pub fn apply(self, order: &mut Order) {
        if let Some(status) = self.status {
            order.status = status;
        }
        if let Some(prepared) = self.prepared_items {
            order.prepared_items = prepared;
        }
        if let Some(address) = self.delivery_address {
            order.delivery_address = non_blank(Some(address));
        }
        if let Some(notes) = self.notes {
            order.notes = non_blank(Some(notes));
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
