//! Invariant checking helpers

use crate::account::AccountId;
use crate::engine::EngineState;
use crate::ledger::{Tranche, TrancheLedger};
use crate::math::{add_u128, apply_ppm, sub_u128};
use crate::recovery::recovery_per_token;

/// AAA and AA supplies are equal (holds from every split until the first burn)
pub fn supplies_paired(ledger: &TrancheLedger) -> bool {
    ledger.total_supply(Tranche::Senior) == ledger.total_supply(Tranche::Junior)
}

/// Total owed to all outstanding tokens at `severity_ppm`
pub fn outstanding_obligation(ledger: &TrancheLedger, severity_ppm: u128) -> u128 {
    Tranche::ALL.iter().fold(0u128, |acc, &t| {
        let owed = apply_ppm(ledger.total_supply(t), recovery_per_token(t, severity_ppm))
            .unwrap_or(u128::MAX);
        add_u128(acc, owed)
    })
}

/// Pool balance minus what outstanding tokens are owed; negative means a
/// later claimant will hit `InsufficientPoolFunds`
pub fn solvency_margin(state: &EngineState, severity_ppm: u128) -> i128 {
    let pool = state.registry.pool_balance();
    let owed = outstanding_obligation(&state.ledger, severity_ppm);
    if pool >= owed {
        i128::try_from(sub_u128(pool, owed)).unwrap_or(i128::MAX)
    } else {
        i128::try_from(sub_u128(owed, pool)).map_or(i128::MIN, |d| -d)
    }
}

/// Principal that has not been deployed to the adapter (should stay zero
/// between transactions)
pub fn idle_custody(state: &EngineState, custody: &AccountId) -> u128 {
    state.asset.balance_of(custody)
}
