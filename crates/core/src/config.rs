//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the engine. Nothing in the core reads environment variables while handling a
//! request; binaries read them and hand the parsed values to [`CoreConfig::new`].

use crate::constants::{
    DEFAULT_DATA_DIR, DEFAULT_LOW_STOCK_BELOW, DEFAULT_MEDIUM_STOCK_BELOW,
    DEFAULT_PRESCRIPTION_VALIDITY_DAYS,
};
use crate::models::StockBands;
use crate::{DispensaryError, DispensaryResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    data_dir: PathBuf,
    stock_bands: StockBands,
    prescription_validity_days: u32,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns `DispensaryError::InvalidInput` if:
    /// - `low_stock_below` is not strictly below `medium_stock_below`
    /// - `prescription_validity_days` is zero
    pub fn new(
        data_dir: PathBuf,
        low_stock_below: u32,
        medium_stock_below: u32,
        prescription_validity_days: u32,
    ) -> DispensaryResult<Self> {
        if low_stock_below >= medium_stock_below {
            return Err(DispensaryError::InvalidInput(format!(
                "low stock threshold ({}) must be below medium stock threshold ({})",
                low_stock_below, medium_stock_below
            )));
        }

        if prescription_validity_days == 0 {
            return Err(DispensaryError::InvalidInput(
                "prescription validity must be at least one day".into(),
            ));
        }

        Ok(Self {
            data_dir,
            stock_bands: StockBands {
                low_below: low_stock_below,
                medium_below: medium_stock_below,
            },
            prescription_validity_days,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn stock_bands(&self) -> StockBands {
        self.stock_bands
    }

    pub fn prescription_validity_days(&self) -> u32 {
        self.prescription_validity_days
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            stock_bands: StockBands {
                low_below: DEFAULT_LOW_STOCK_BELOW,
                medium_below: DEFAULT_MEDIUM_STOCK_BELOW,
            },
            prescription_validity_days: DEFAULT_PRESCRIPTION_VALIDITY_DAYS,
        }
    }
}

/// Parse an optional numeric setting such as `DISPENSARY_LOW_STOCK_BELOW`.
///
/// If `value` is `None` or empty/whitespace, returns `default`.
pub fn u32_from_env_value(name: &str, value: Option<String>, default: u32) -> DispensaryResult<u32> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    match value {
        None => Ok(default),
        Some(v) => v.parse::<u32>().map_err(|_| {
            DispensaryError::InvalidInput(format!(
                "{} must be a non-negative integer, got '{}'",
                name, v
            ))
        }),
    }
}

/// Build a `CoreConfig` from raw (already read) environment values.
pub fn config_from_env_values(
    data_dir: Option<String>,
    low_stock_below: Option<String>,
    medium_stock_below: Option<String>,
    prescription_validity_days: Option<String>,
) -> DispensaryResult<CoreConfig> {
    let data_dir = data_dir
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_DATA_DIR.into());

    CoreConfig::new(
        PathBuf::from(data_dir),
        u32_from_env_value(
            "DISPENSARY_LOW_STOCK_BELOW",
            low_stock_below,
            DEFAULT_LOW_STOCK_BELOW,
        )?,
        u32_from_env_value(
            "DISPENSARY_MEDIUM_STOCK_BELOW",
            medium_stock_below,
            DEFAULT_MEDIUM_STOCK_BELOW,
        )?,
        u32_from_env_value(
            "DISPENSARY_PRESCRIPTION_VALIDITY_DAYS",
            prescription_validity_days,
            DEFAULT_PRESCRIPTION_VALIDITY_DAYS,
        )?,
    )
}
