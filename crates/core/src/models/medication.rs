//! Catalog medications and stock levels.

use dispensary_types::{MedicationId, NonEmptyText};
use serde::{Deserialize, Serialize};

/// A catalog item with a mutable stock quantity.
///
/// Documents written with the French field names (`nom`, `forme`, `quantiteStock`) still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: MedicationId,
    #[serde(alias = "nom")]
    pub name: NonEmptyText,
    pub dosage: NonEmptyText,
    #[serde(alias = "forme")]
    pub form: NonEmptyText,
    #[serde(default, alias = "fabricant", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(alias = "quantiteStock")]
    pub stock_quantity: u32,
}

/// Partial update of a [`Medication`]. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicationPatch {
    #[serde(default)]
    pub name: Option<NonEmptyText>,
    #[serde(default)]
    pub dosage: Option<NonEmptyText>,
    #[serde(default)]
    pub form: Option<NonEmptyText>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default)]
    pub stock_quantity: Option<u32>,
}

impl MedicationPatch {
    pub fn apply(self, medication: &mut Medication) {
        if let Some(name) = self.name {
            medication.name = name;
        }
        if let Some(dosage) = self.dosage {
            medication.dosage = dosage;
        }
        if let Some(form) = self.form {
            medication.form = form;
        }
        if let Some(manufacturer) = self.manufacturer {
            let manufacturer = manufacturer.trim().to_owned();
            medication.manufacturer = (!manufacturer.is_empty()).then_some(manufacturer);
        }
        if let Some(stock) = self.stock_quantity {
            medication.stock_quantity = stock;
        }
    }
}

/// Stock band a medication falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StockLevel {
    Low,
    Medium,
    Good,
}

/// Thresholds separating the [`StockLevel`] bands. Both bounds are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockBands {
    pub low_below: u32,
    pub medium_below: u32,
}

impl StockBands {
    pub fn classify(&self, stock: u32) -> StockLevel {
        if stock < self.low_below {
            StockLevel::Low
        } else if stock < self.medium_below {
            StockLevel::Medium
        } else {
            StockLevel::Good
        }
    }
}

/// Count of catalog medications per stock band.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockSummary {
    pub low: usize,
    pub medium: usize,
    pub good: usize,
}

impl StockSummary {
    pub fn from_catalog<'a>(
        bands: StockBands,
        medications: impl IntoIterator<Item = &'a Medication>,
    ) -> Self {
        let mut summary = Self::default();
        for medication in medications {
            match bands.classify(medication.stock_quantity) {
                StockLevel::Low => summary.low += 1,
                StockLevel::Medium => summary.medium += 1,
                StockLevel::Good => summary.good += 1,
            }
        }
        summary
    }
}
