//! Caller roles.
//!
//! Authentication is handled outside this workspace; whatever authenticates a user hands the
//! core a [`Caller`]: the user's id and one of the three closed [`Role`]s.

use crate::UserId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Prescriber,
    Patient,
    Pharmacist,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Prescriber => "prescriber",
            Role::Patient => "patient",
            Role::Pharmacist => "pharmacist",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown role '{0}' (expected prescriber, patient or pharmacist)")]
pub struct RoleParseError(String);

impl FromStr for Role {
    type Err = RoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "prescriber" | "medecin" => Ok(Role::Prescriber),
            "patient" => Ok(Role::Patient),
            "pharmacist" | "pharmacien" => Ok(Role::Pharmacist),
            _ => Err(RoleParseError(s.to_owned())),
        }
    }
}

/// Identity of whoever is invoking an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub id: UserId,
    pub role: Role,
}

impl Caller {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }
}
