//! Disc size budgeting.
//!
//! The budget is checked once, before any directory or process work, from the
//! sizes the library declares. Every track counts, including ones that will be
//! skipped as unsupported.

use mixburn_common::Collection;
use serde::Serialize;

/// Capacity of a standard 700 MB CD-R in bytes.
pub const DEFAULT_CAPACITY_BYTES: u64 = 734_000_000;

/// Expected growth of the selection once AAC tracks are re-encoded.
pub const DEFAULT_INFLATION_FACTOR: f64 = 1.5;

/// Sizes computed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RunBudget {
    pub raw_total_bytes: u64,
    pub estimated_total_bytes: u64,
    pub capacity_bytes: u64,
}

/// The selection does not fit on the disc.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BudgetExceeded {
    #[error("selected tracks total {total} bytes, over the {capacity} byte capacity")]
    Raw { total: u64, capacity: u64 },

    #[error("converted tracks are estimated at {total} bytes, over the {capacity} byte capacity")]
    Estimated { total: u64, capacity: u64 },
}

/// Sum declared sizes and check them against `capacity_bytes`.
///
/// The raw total is checked first, then the total scaled by
/// `inflation_factor` (rounded down).
pub fn check_budget(
    collections: &[Collection],
    capacity_bytes: u64,
    inflation_factor: f64,
) -> Result<RunBudget, BudgetExceeded> {
    let raw_total_bytes = collections
        .iter()
        .fold(0u64, |acc, c| acc.saturating_add(c.declared_bytes()));

    if raw_total_bytes > capacity_bytes {
        return Err(BudgetExceeded::Raw {
            total: raw_total_bytes,
            capacity: capacity_bytes,
        });
    }

    // Float to int casts saturate.
    let estimated_total_bytes = (raw_total_bytes as f64 * inflation_factor).floor() as u64;

    if estimated_total_bytes > capacity_bytes {
        return Err(BudgetExceeded::Estimated {
            total: estimated_total_bytes,
            capacity: capacity_bytes,
        });
    }

    tracing::info!(
        raw_bytes = raw_total_bytes,
        estimated_bytes = estimated_total_bytes,
        capacity_bytes,
        "Selection fits on disc"
    );

    Ok(RunBudget {
        raw_total_bytes,
        estimated_total_bytes,
        capacity_bytes,
    })
}
