//! Seniority waterfall and the one-shot severity snapshot
//!
//! Severity `x` is the fraction of custodied value lost, in ppm.
//!
//! ```text
//! senior(x) = min(1, 2 * (1 - x))
//! junior(x) = max(0, 1 - 2 * x)
//! ```
//!
//! AA absorbs the first half of any loss at twice the rate and is wiped out
//! at x = 0.5; AAA is untouched up to 0.5 and reaches zero at x = 1. The two
//! recoveries do not sum to a constant, so payouts are always reconciled
//! against the live pool balance at claim time.

use serde::Serialize;

use crate::account::AccountId;
use crate::error::{EngineError, Result};
use crate::ledger::Tranche;
use crate::math::{apply_ppm, min_u128, mul_u128, sub_u128, SCALE};

/// Senior recovery per token, ppm. Inputs above SCALE are clamped.
pub fn senior_recovery_per_token(severity_ppm: u128) -> u128 {
    let x = min_u128(severity_ppm, SCALE);
    min_u128(SCALE, mul_u128(2, sub_u128(SCALE, x)))
}

/// Junior recovery per token, ppm. Inputs above SCALE are clamped.
pub fn junior_recovery_per_token(severity_ppm: u128) -> u128 {
    let x = min_u128(severity_ppm, SCALE);
    sub_u128(SCALE, min_u128(SCALE, mul_u128(2, x)))
}

pub fn recovery_per_token(tranche: Tranche, severity_ppm: u128) -> u128 {
    match tranche {
        Tranche::Senior => senior_recovery_per_token(severity_ppm),
        Tranche::Junior => junior_recovery_per_token(severity_ppm),
    }
}

/// Frozen severity; immutable once created
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecoverySnapshot {
    pub severity_ppm: u128,
    pub declared_at: u64,
    /// `None` when severity defaulted to zero at the first claim
    pub declared_by: Option<AccountId>,
}

impl RecoverySnapshot {
    pub fn recovery_per_token(&self, tranche: Tranche) -> u128 {
        recovery_per_token(tranche, self.severity_ppm)
    }

    /// `amount * recovery / SCALE`, rounded down in the pool's favour
    pub fn payout(&self, tranche: Tranche, amount: u128) -> Result<u128> {
        apply_ppm(amount, self.recovery_per_token(tranche))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryEngine {
    snapshot: Option<RecoverySnapshot>,
}

impl RecoveryEngine {
    pub fn snapshot(&self) -> Option<&RecoverySnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_frozen(&self) -> bool {
        self.snapshot.is_some()
    }

    /// Check a declaration without freezing anything
    pub fn check_declare(&self, severity_ppm: u128) -> Result<()> {
        if self.snapshot.is_some() {
            return Err(EngineError::SeverityAlreadyDeclared);
        }
        if severity_ppm > SCALE {
            return Err(EngineError::InvalidSeverity(severity_ppm));
        }
        Ok(())
    }

    pub fn declare(
        &mut self,
        severity_ppm: u128,
        reporter: AccountId,
        now: u64,
    ) -> Result<RecoverySnapshot> {
        self.check_declare(severity_ppm)?;
        let snap = RecoverySnapshot {
            severity_ppm,
            declared_at: now,
            declared_by: Some(reporter),
        };
        self.snapshot = Some(snap);
        Ok(snap)
    }

    /// Snapshot in force for claims; freezes severity 0 if none was declared.
    /// The bool is true when this call created the snapshot.
    pub fn freeze_or_default(&mut self, now: u64) -> (RecoverySnapshot, bool) {
        match self.snapshot {
            Some(snap) => (snap, false),
            None => {
                let snap = RecoverySnapshot {
                    severity_ppm: 0,
                    declared_at: now,
                    declared_by: None,
                };
                self.snapshot = Some(snap);
                (snap, true)
            }
        }
    }
}
