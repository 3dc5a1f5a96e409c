//! Order status transitions and their stock effect.
//!
//! Everything here is pure: the engine computes the full set of stock changes for a transition
//! and validates it against a catalog snapshot before anything is written.

use crate::models::{needed_per_medication, Medication, OrderStatus, PrescribedItem};
use crate::{DispensaryError, DispensaryResult};
use dispensary_types::MedicationId;

/// Effect of a status change on inventory, from membership of the stock-deducted set
/// `{Ready, Collected}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockEffect {
    None,
    /// Entering the deducted set. Requires every item prepared and enough stock.
    Deduct,
    /// Leaving the deducted set, backwards or to `Returned`.
    Restore,
}

impl StockEffect {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockEffect::None => "none",
            StockEffect::Deduct => "deduct",
            StockEffect::Restore => "restore",
        }
    }
}

pub fn stock_effect(old: OrderStatus, new: OrderStatus) -> StockEffect {
    match (old.is_stock_deducted(), new.is_stock_deducted()) {
        (false, true) => StockEffect::Deduct,
        (true, false) => StockEffect::Restore,
        _ => StockEffect::None,
    }
}

/// Signed stock change for one medication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockDelta {
    pub medication_id: MedicationId,
    pub delta: i64,
}

/// Stock changes caused by moving an order from `old` to `new`, one entry per medication.
pub fn inventory_delta(
    old: OrderStatus,
    new: OrderStatus,
    items: &[PrescribedItem],
) -> Vec<StockDelta> {
    let sign = match stock_effect(old, new) {
        StockEffect::None => return Vec::new(),
        StockEffect::Deduct => -1,
        StockEffect::Restore => 1,
    };

    needed_per_medication(items)
        .into_iter()
        .map(|(medication_id, needed)| StockDelta {
            medication_id,
            delta: sign * i64::try_from(needed).unwrap_or(i64::MAX),
        })
        .collect()
}

/// Applies `deltas` to a copy of `catalog`, returning the new catalog.
///
/// Either every delta is valid and all are applied, or the first invalid one is reported and
/// `catalog` is left as it was.
///
/// # Errors
///
/// - `MedicationUnavailable` if a delta names a medication not in the catalog
/// - `InsufficientStock` if a deduction exceeds the available stock
/// - `StockOverflow` if a restore would exceed `u32::MAX`
pub fn apply_stock_deltas(
    catalog: &[Medication],
    deltas: &[StockDelta],
) -> DispensaryResult<Vec<Medication>> {
    let mut updated = catalog.to_vec();

    for StockDelta {
        medication_id,
        delta,
    } in deltas
    {
        let medication = updated
            .iter_mut()
            .find(|m| &m.id == medication_id)
            .ok_or_else(|| DispensaryError::MedicationUnavailable(medication_id.clone()))?;

        let available = medication.stock_quantity;
        let target = i64::from(available).saturating_add(*delta);

        if target < 0 {
            return Err(DispensaryError::InsufficientStock {
                medication: medication_id.clone(),
                name: medication.name.to_string(),
                needed: delta.unsigned_abs(),
                available,
            });
        }

        medication.stock_quantity = u32::try_from(target)
            .map_err(|_| DispensaryError::StockOverflow(medication_id.clone()))?;
    }

    Ok(updated)
}
