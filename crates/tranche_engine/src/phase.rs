//! Lifecycle phases derived from wall-clock time
//!
//! The phase is never stored. It is recomputed from `now` and the four
//! configured boundaries on every call, so crossing a boundary has no
//! side effects and emits nothing.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Operation, Result};
use crate::ledger::Tranche;

/// Ordered lifecycle phase; `Ord` follows the lifecycle
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// `[deploy, S)`: splitting allowed
    Issuance,
    /// `[S, T1)`: coverage active, capital earns yield
    Insurance,
    /// `[T1, T2)`: loss severity may be declared
    SettlementGap,
    /// `[T2, T3)`: AAA may redeem
    SeniorClaim,
    /// `[T3, inf)`: both tranches may redeem
    FinalClaim,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Issuance,
        Phase::Insurance,
        Phase::SettlementGap,
        Phase::SeniorClaim,
        Phase::FinalClaim,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }

    /// Claim gate per tranche, following the lifecycle table:
    ///
    /// | phase          | AAA | AA  |
    /// |----------------|-----|-----|
    /// | `SeniorClaim`  | yes | no  |
    /// | `FinalClaim`   | yes | yes |
    ///
    /// AA waits for `T3` so AAA redeems first against the live pool, and AAA
    /// stays redeemable after `T3` so late senior holders are not locked out.
    /// This deliberately differs from gating AAA to `[T2, T3)` and opening
    /// AA at `T2`.
    pub fn allows_claim(self, tranche: Tranche) -> bool {
        match tranche {
            Tranche::Senior => matches!(self, Phase::SeniorClaim | Phase::FinalClaim),
            Tranche::Junior => self == Phase::FinalClaim,
        }
    }

    pub fn require(self, expected: Phase, op: Operation) -> Result<()> {
        if self != expected {
            return Err(EngineError::PhaseViolation { op, phase: self });
        }
        Ok(())
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Issuance => "issuance",
            Phase::Insurance => "insurance",
            Phase::SettlementGap => "settlement-gap",
            Phase::SeniorClaim => "senior-claim",
            Phase::FinalClaim => "final-claim",
        };
        f.write_str(name)
    }
}

/// The four boundary timestamps `S < T1 < T2 < T3` (unix seconds)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBoundaries {
    /// S: end of issuance, start of coverage
    pub issuance_end: u64,
    /// T1: end of coverage
    pub insurance_end: u64,
    /// T2: senior claims open
    pub settlement_end: u64,
    /// T3: junior claims open
    pub senior_claim_end: u64,
}

impl PhaseBoundaries {
    pub fn new(s: u64, t1: u64, t2: u64, t3: u64) -> Result<Self> {
        let b = Self {
            issuance_end: s,
            insurance_end: t1,
            settlement_end: t2,
            senior_claim_end: t3,
        };
        b.validate()?;
        Ok(b)
    }

    /// Boundaries measured from `base` with per-phase offsets in seconds
    pub fn from_offsets(base: u64, s: u64, t1: u64, t2: u64, t3: u64) -> Result<Self> {
        let at = |off: u64| {
            base.checked_add(off)
                .ok_or(EngineError::InvalidConfig("phase boundary overflows u64"))
        };
        Self::new(at(s)?, at(t1)?, at(t2)?, at(t3)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.issuance_end < self.insurance_end
            && self.insurance_end < self.settlement_end
            && self.settlement_end < self.senior_claim_end
        {
            Ok(())
        } else {
            Err(EngineError::InvalidConfig(
                "phase boundaries must be strictly increasing",
            ))
        }
    }

    pub fn phase_at(&self, now: u64) -> Phase {
        phase(
            now,
            self.issuance_end,
            self.insurance_end,
            self.settlement_end,
            self.senior_claim_end,
        )
    }

    /// Start timestamp of `phase` (`None` for issuance, which starts at deploy)
    pub fn start_of(&self, phase: Phase) -> Option<u64> {
        match phase {
            Phase::Issuance => None,
            Phase::Insurance => Some(self.issuance_end),
            Phase::SettlementGap => Some(self.insurance_end),
            Phase::SeniorClaim => Some(self.settlement_end),
            Phase::FinalClaim => Some(self.senior_claim_end),
        }
    }

    /// Next boundary strictly after `now`, if any
    pub fn next_boundary(&self, now: u64) -> Option<u64> {
        [
            self.issuance_end,
            self.insurance_end,
            self.settlement_end,
            self.senior_claim_end,
        ]
        .into_iter()
        .find(|&b| b > now)
    }
}

/// Phase at `now`; each boundary is the first instant of the later phase
pub fn phase(now: u64, s: u64, t1: u64, t2: u64, t3: u64) -> Phase {
    if now < s {
        Phase::Issuance
    } else if now < t1 {
        Phase::Insurance
    } else if now < t2 {
        Phase::SettlementGap
    } else if now < t3 {
        Phase::SeniorClaim
    } else {
        Phase::FinalClaim
    }
}
