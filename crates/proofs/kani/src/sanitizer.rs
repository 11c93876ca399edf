//! Bounds raw nondeterministic inputs for tractable exploration

use tranche_engine::math::SCALE;
use tranche_engine::PhaseBoundaries;

pub const N_HOLDERS: usize = 3;
pub const MAX_STEPS: u8 = 4;

/// Largest principal or transfer amount explored
pub const MAX_AMOUNT: u128 = 1_000_000;

/// Largest gap between two phase boundaries
const MAX_GAP: u64 = 1_000;

pub trait Sanitize {
    fn sanitize(self) -> Self;
}

impl Sanitize for PhaseBoundaries {
    /// Force strictly increasing boundaries with gaps in `1..=MAX_GAP`
    fn sanitize(self) -> PhaseBoundaries {
        let s = self.issuance_end % MAX_GAP;
        let t1 = s + 1 + self.insurance_end % MAX_GAP;
        let t2 = t1 + 1 + self.settlement_end % MAX_GAP;
        let t3 = t2 + 1 + self.senior_claim_end % MAX_GAP;
        PhaseBoundaries {
            issuance_end: s,
            insurance_end: t1,
            settlement_end: t2,
            senior_claim_end: t3,
        }
    }
}

/// One claim against a frozen severity
#[derive(Clone, Copy, Debug)]
pub struct ClaimInput {
    pub senior: bool,
    pub amount: u128,
    pub severity_ppm: u128,
}

impl Sanitize for ClaimInput {
    fn sanitize(mut self) -> ClaimInput {
        self.amount %= MAX_AMOUNT + 1;
        self.severity_ppm %= SCALE + 1;
        self
    }
}
