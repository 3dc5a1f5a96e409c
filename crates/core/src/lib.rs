//! # Dispensary Core
//!
//! Core business logic for prescriptions, pharmacy orders and inventory.
//!
//! This crate contains:
//! - Record types ([`models`]) for medications, prescriptions, orders and pharmacies
//! - Repositories over the typed store collections
//! - The [`OrderEngine`], which keeps prescriptions, orders and stock consistent
//! - Role capability checks applied at the engine boundary
//!
//! **No API concerns**: authentication, HTTP servers and terminal output belong in `api-rest`
//! and `dispensary-cli`. Configuration is resolved by binaries and passed in as a
//! [`CoreConfig`].

pub mod access;
pub mod config;
pub mod constants;
pub mod engine;
mod error;
pub mod models;
pub mod repositories;

pub use access::Capability;
pub use config::{config_from_env_values, u32_from_env_value, CoreConfig};
pub use engine::{OrderEngine, StockEffect};
pub use error::{DispensaryError, DispensaryResult, ErrorKind};
