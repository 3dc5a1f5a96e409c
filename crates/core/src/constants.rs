//! Constants used throughout the dispensary core crate.

/// Default directory for the data store when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "dispensary_data";

/// Medications with stock strictly below this are reported as low stock.
pub const DEFAULT_LOW_STOCK_BELOW: u32 = 10;

/// Medications with stock strictly below this (and not low) are reported as medium stock.
pub const DEFAULT_MEDIUM_STOCK_BELOW: u32 = 50;

/// Validity applied to a new prescription when the prescriber gives no expiration date.
pub const DEFAULT_PRESCRIPTION_VALIDITY_DAYS: u32 = 90;
