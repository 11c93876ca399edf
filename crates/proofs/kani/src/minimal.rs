//! Concrete-value Kani proofs
//! Fixed scenarios first, then the generalized versions in `safety`

use tranche_engine::math::SCALE;
use tranche_engine::*;

use crate::generators::{empty_ledger, holders};

/// 25% loss: AAA at par, AA at half
#[kani::proof]
fn quarter_loss_payouts() {
    let snap = RecoverySnapshot {
        severity_ppm: 250_000,
        declared_at: 0,
        declared_by: None,
    };
    assert_eq!(snap.payout(Tranche::Senior, 1_000), Ok(1_000));
    assert_eq!(snap.payout(Tranche::Junior, 1_000), Ok(500));
}

/// Curve anchor points
#[kani::proof]
fn curve_anchors() {
    assert_eq!(junior_recovery_per_token(SCALE / 2), 0);
    assert_eq!(senior_recovery_per_token(SCALE / 2), SCALE);
    assert_eq!(senior_recovery_per_token(SCALE), 0);
    assert_eq!(senior_recovery_per_token(0), SCALE);
}

/// One split mints the same amount of each tranche
#[kani::proof]
fn single_split_pairs() {
    let h = holders();
    let mut ledger = empty_ledger();
    let receipt = ledger.split(h[0], 500_000, Phase::Issuance);
    assert!(receipt.is_ok());
    assert_eq!(ledger.total_supply(Tranche::Senior), 500_000);
    assert_eq!(ledger.total_supply(Tranche::Junior), 500_000);
}

/// Burning one tranche leaves the other untouched
#[kani::proof]
fn burn_touches_one_tranche() {
    let h = holders();
    let mut ledger = empty_ledger();
    let _ = ledger.split(h[0], 100, Phase::Issuance);
    assert!(ledger.redeem_burn(Tranche::Senior, 40, h[0]).is_ok());
    assert_eq!(ledger.total_supply(Tranche::Senior), 60);
    assert_eq!(ledger.total_supply(Tranche::Junior), 100);
}
