//! Prescriptions and their line items.

use chrono::{DateTime, Utc};
use dispensary_types::{MedicationId, PrescriptionId, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One prescribed medication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescribedItem {
    #[serde(alias = "idMedicament")]
    pub medication_id: MedicationId,
    #[serde(alias = "quantiteParJour")]
    pub daily_quantity: u32,
    #[serde(alias = "duree")]
    pub duration_days: u32,
}

impl PrescribedItem {
    /// Units needed to cover the whole course: `daily_quantity × duration_days`.
    pub fn needed_quantity(&self) -> u64 {
        u64::from(self.daily_quantity) * u64::from(self.duration_days)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prescription {
    pub id: PrescriptionId,
    pub patient_id: UserId,
    #[serde(alias = "medecinId")]
    pub prescriber_id: UserId,
    #[serde(alias = "date")]
    pub issue_date: DateTime<Utc>,
    #[serde(alias = "dateExpiration")]
    pub expiration_date: DateTime<Utc>,
    #[serde(alias = "medicaments")]
    pub items: Vec<PrescribedItem>,
    #[serde(default)]
    pub is_used: bool,
}

/// Where a prescription stands relative to ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrescriptionStatus {
    /// Unused and not expired: an order may reference it.
    Active,
    Used,
    Expired,
}

impl Prescription {
    /// A prescription is expired once `now` reaches its expiration date.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiration_date <= now
    }

    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        !self.is_used && !self.is_expired_at(now)
    }

    /// Used takes precedence over expired.
    pub fn status_at(&self, now: DateTime<Utc>) -> PrescriptionStatus {
        if self.is_used {
            PrescriptionStatus::Used
        } else if self.is_expired_at(now) {
            PrescriptionStatus::Expired
        } else {
            PrescriptionStatus::Active
        }
    }

    pub fn references(&self, medication_id: &MedicationId) -> bool {
        self.items
            .iter()
            .any(|item| &item.medication_id == medication_id)
    }

    /// Needed quantity per medication, summing line items that repeat a medication.
    pub fn needed_quantities(&self) -> BTreeMap<MedicationId, u64> {
        needed_per_medication(&self.items)
    }
}

/// Sums [`PrescribedItem::needed_quantity`] per medication.
pub fn needed_per_medication(items: &[PrescribedItem]) -> BTreeMap<MedicationId, u64> {
    let mut needed = BTreeMap::new();
    for item in items {
        let total = needed.entry(item.medication_id.clone()).or_insert(0u64);
        *total = total.saturating_add(item.needed_quantity());
    }
    needed
}

/// Partial update of a [`Prescription`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionPatch {
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Option<Vec<PrescribedItem>>,
    #[serde(default)]
    pub is_used: Option<bool>,
}

impl PrescriptionPatch {
    pub fn apply(self, prescription: &mut Prescription) {
        if let Some(expiration) = self.expiration_date {
            prescription.expiration_date = expiration;
        }
        if let Some(items) = self.items {
            prescription.items = items;
        }
        if let Some(is_used) = self.is_used {
            prescription.is_used = is_used;
        }
    }
}

/// What a prescriber supplies when issuing a prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPrescription {
    pub id: PrescriptionId,
    pub patient_id: UserId,
    pub items: Vec<PrescribedItem>,
    /// Defaults to the issue date plus the configured validity.
    #[serde(default)]
    pub expiration_date: Option<DateTime<Utc>>,
}
