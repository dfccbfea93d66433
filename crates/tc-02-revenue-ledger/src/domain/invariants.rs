//! # Ledger Invariants
//!
//! Checked after mutations in debug builds and on every state reload.

use shared_types::U256;

use super::entities::Member;
use super::errors::LedgerError;

/// `Σ earnings + remainder == total_deposited`.
pub fn invariant_accounting(
    members: &[Member],
    remainder: U256,
    total_deposited: U256,
) -> Result<(), LedgerError> {
    let mut accounted = remainder;
    for member in members {
        accounted = accounted
            .checked_add(member.earnings)
            .ok_or(LedgerError::Overflow {
                operation: "invariant_accounting",
            })?;
    }
    if accounted != total_deposited {
        return Err(LedgerError::InvariantViolated(format!(
            "accounted {accounted} != deposited {total_deposited}"
        )));
    }
    Ok(())
}

/// The carried remainder is always smaller than the active member count,
/// unless nobody is active (then it holds every undistributed deposit).
pub fn invariant_remainder_bound(remainder: U256, active_count: usize) -> bool {
    active_count == 0 || remainder < U256::from(active_count)
}
