//! Patient directory entries.

use dispensary_types::{NonEmptyText, UserId};
use serde::{Deserialize, Serialize};

/// A patient prescriptions can be issued to. The id is the patient's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: UserId,
    #[serde(alias = "nom")]
    pub name: NonEmptyText,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, alias = "telephone", skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}
