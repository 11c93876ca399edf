//! Generators for arbitrary inputs (for Kani)

#[cfg(kani)]
use kani::any;
use arrayvec::ArrayVec;
use tranche_engine::{AccountId, TrancheLedger};

use crate::sanitizer::N_HOLDERS;
#[cfg(kani)]
use crate::sanitizer::{ClaimInput, Sanitize};

/// Fixed holder set; identity derivation stays out of the solver
pub fn holders() -> ArrayVec<AccountId, N_HOLDERS> {
    let mut out = ArrayVec::new();
    for label in ["holder-a", "holder-b", "holder-c"] {
        let _ = out.try_push(AccountId::derived(label));
    }
    out
}

/// Empty ledger with granularity 1
pub fn empty_ledger() -> TrancheLedger {
    TrancheLedger::new(6, 1)
}

#[cfg(kani)]
pub fn any_severity() -> u128 {
    let raw: u32 = any();
    // values above SCALE exercise the clamp
    (raw as u128) % 2_000_001
}

#[cfg(kani)]
pub fn any_boundaries() -> tranche_engine::PhaseBoundaries {
    tranche_engine::PhaseBoundaries {
        issuance_end: any(),
        insurance_end: any(),
        settlement_end: any(),
        senior_claim_end: any(),
    }
    .sanitize()
}

#[cfg(kani)]
pub fn any_claim() -> ClaimInput {
    ClaimInput {
        senior: any(),
        amount: any::<u32>() as u128,
        severity_ppm: any::<u32>() as u128,
    }
    .sanitize()
}

#[cfg(kani)]
pub fn any_holder(holders: &[AccountId]) -> AccountId {
    holders[(any::<u8>() as usize) % holders.len()]
}
