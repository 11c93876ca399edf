//! Pool solvency against outstanding tranche claims

use std::fmt;

use tranche_engine::helpers::{outstanding_obligation, solvency_margin};
use tranche_engine::{Phase, TrancheEngine};

/// Point-in-time view of pool value versus what tranche holders are owed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SolvencyReport {
    pub now: u64,
    pub phase: Phase,
    pub pool_balance: u128,
    /// Severity used to price the tranches: the frozen one, else the
    /// projected feed value, else 0
    pub severity_ppm: u128,
    pub frozen: bool,
    pub obligation: u128,
    /// Pool balance minus obligation; negative = later claimants at risk
    pub margin: i128,
}

impl SolvencyReport {
    pub fn is_short(&self) -> bool {
        self.margin < 0
    }
}

impl fmt::Display for SolvencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{} @ {}] pool {} owed {} margin {} at severity {} ppm{}",
            self.phase,
            self.now,
            self.pool_balance,
            self.obligation,
            self.margin,
            self.severity_ppm,
            if self.frozen { " (frozen)" } else { "" }
        )
    }
}

/// Price outstanding tranches at the frozen severity, or at
/// `projected_severity` while nothing is frozen yet
pub fn assess(engine: &TrancheEngine, now: u64, projected_severity: Option<u128>) -> SolvencyReport {
    let frozen = engine.recovery_snapshot().map(|s| s.severity_ppm);
    let severity_ppm = frozen.or(projected_severity).unwrap_or(0);
    let state = engine.state();

    SolvencyReport {
        now,
        phase: engine.phase(now),
        pool_balance: engine.pool_balance(),
        severity_ppm,
        frozen: frozen.is_some(),
        obligation: outstanding_obligation(&state.ledger, severity_ppm),
        margin: solvency_margin(state, severity_ppm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranche_engine::{
        AccountId, AdapterId, EngineConfig, LendingAdapter, PhaseBoundaries, TrancheEngine,
    };

    fn funded_engine(principal: u128) -> TrancheEngine {
        let b = PhaseBoundaries::new(100, 200, 300, 400).unwrap();
        let ops = AccountId::derived("ops");
        let alice = AccountId::derived("alice");
        let mut e = TrancheEngine::new(EngineConfig::new(b, ops, ops).with_granularity(1)).unwrap();
        e.add_adapter(ops, Box::new(LendingAdapter::aave(AdapterId(1))), 0)
            .unwrap();
        let custody = e.custody_account();
        e.asset_mut().mint(alice, principal).unwrap();
        e.asset_mut().approve(alice, custody, principal);
        e.split(alice, principal, 0).unwrap();
        e
    }

    #[test]
    fn test_short_at_zero_severity() {
        let e = funded_engine(1_000);
        let report = assess(&e, 50, None);

        assert_eq!(report.phase, Phase::Issuance);
        assert_eq!(report.obligation, 2_000);
        assert_eq!(report.margin, -1_000);
        assert!(report.is_short());
        assert!(!report.frozen);
    }

    #[test]
    fn test_projected_then_frozen_severity() {
        let mut e = funded_engine(1_000);

        let projected = assess(&e, 150, Some(500_000));
        assert_eq!(projected.obligation, 1_000);
        assert_eq!(projected.margin, 0);
        assert!(!projected.is_short());

        e.declare_severity(AccountId::derived("ops"), 750_000, 200).unwrap();
        let frozen = assess(&e, 250, Some(0));
        assert!(frozen.frozen);
        assert_eq!(frozen.severity_ppm, 750_000);
        assert_eq!(frozen.obligation, 500);
        assert_eq!(
            frozen.to_string(),
            "[settlement-gap @ 250] pool 1000 owed 500 margin 500 at severity 750000 ppm (frozen)"
        );
    }
}
