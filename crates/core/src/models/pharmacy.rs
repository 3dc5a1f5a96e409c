//! Pharmacies and their linked pharmacists.

use dispensary_types::{NonEmptyText, PharmacyId, UserId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pharmacy {
    pub id: PharmacyId,
    #[serde(alias = "nom")]
    pub name: NonEmptyText,
    #[serde(alias = "adresse")]
    pub address: NonEmptyText,
    #[serde(default, alias = "telephone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Pharmacists working at this pharmacy.
    #[serde(default, alias = "pharmacienIds")]
    pub pharmacist_ids: Vec<UserId>,
}

impl Pharmacy {
    pub fn employs(&self, pharmacist_id: &UserId) -> bool {
        self.pharmacist_ids.contains(pharmacist_id)
    }
}
