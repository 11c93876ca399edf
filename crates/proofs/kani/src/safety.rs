//! Kani safety proofs for the recovery curves, phase clock and tranche ledger

use kani::{any, assume};
use tranche_engine::helpers::supplies_paired;
use tranche_engine::math::{mul_div_ceil, mul_div_floor, SCALE};
use tranche_engine::*;

use crate::{adversary::*, generators::*, sanitizer::*};

/// Both curves stay in [0, SCALE] and AA never recovers more than AAA
#[kani::proof]
fn curves_bounded_and_ordered() {
    let x = any_severity();
    let senior = senior_recovery_per_token(x);
    let junior = junior_recovery_per_token(x);

    kani::assert(senior <= SCALE, "senior recovery must not exceed par");
    kani::assert(junior <= senior, "junior must never out-recover senior");
    kani::assert(
        senior + junior == 2 * (SCALE - x.min(SCALE)),
        "pair recovery must equal 2 * (1 - x)",
    );
}

/// Recovery never increases with severity
#[kani::proof]
fn curves_non_increasing() {
    let a = any_severity();
    let b = any_severity();
    assume(a <= b);

    kani::assert(
        senior_recovery_per_token(a) >= senior_recovery_per_token(b),
        "senior curve must be non-increasing",
    );
    kani::assert(
        junior_recovery_per_token(a) >= junior_recovery_per_token(b),
        "junior curve must be non-increasing",
    );
}

/// Payout is bounded by the burned amount and rounds down
#[kani::proof]
fn payout_bounded_by_burn() {
    let c = any_claim();
    let tranche = if c.senior { Tranche::Senior } else { Tranche::Junior };
    let snap = RecoverySnapshot {
        severity_ppm: c.severity_ppm,
        declared_at: 0,
        declared_by: None,
    };

    let payout = snap.payout(tranche, c.amount);
    kani::assert(payout.is_ok(), "bounded payout must not overflow");
    if let Ok(p) = payout {
        kani::assert(p <= c.amount, "payout must not exceed tokens burned");
        kani::assert(
            p * SCALE <= c.amount * snap.recovery_per_token(tranche),
            "payout must round toward the pool",
        );
    }
}

/// Phases only move forward in time
#[kani::proof]
fn phase_monotonic() {
    let b = any_boundaries();
    let t: u64 = any();
    let u: u64 = any();
    assume(t <= u);

    kani::assert(b.phase_at(t) <= b.phase_at(u), "phase must be monotonic in time");
}

/// A boundary timestamp already belongs to the later phase
#[kani::proof]
fn boundaries_belong_to_later_phase() {
    let b = any_boundaries();
    assume(b.issuance_end > 0);

    kani::assert(b.phase_at(b.issuance_end) == Phase::Insurance, "S opens insurance");
    kani::assert(b.phase_at(b.insurance_end) == Phase::SettlementGap, "T1 opens settlement gap");
    kani::assert(b.phase_at(b.settlement_end) == Phase::SeniorClaim, "T2 opens senior claims");
    kani::assert(b.phase_at(b.senior_claim_end) == Phase::FinalClaim, "T3 opens final claims");
    kani::assert(b.phase_at(b.issuance_end - 1) == Phase::Issuance, "issuance ends before S");
}

/// Splits and transfers keep AAA and AA supply equal to total principal
#[kani::proof]
#[kani::unwind(6)]
fn supplies_stay_paired_without_burns() {
    let h = holders();
    let mut ledger = empty_ledger();
    let mut principal = 0u128;

    let mut steps: u8 = any();
    steps = (steps % MAX_STEPS) + 1;
    for _ in 0..steps {
        principal += adversary_step(&mut ledger, &h);
        kani::assert(supplies_paired(&ledger), "AAA and AA supply must stay equal");
    }
    kani::assert(
        ledger.total_supply(Tranche::Senior) == principal,
        "supply must equal principal split",
    );
}

/// Splits outside issuance never mint
#[kani::proof]
fn split_gated_to_issuance() {
    let b = any_boundaries();
    let now: u64 = any();
    let amount = (any::<u32>() as u128) % (MAX_AMOUNT + 1);
    let phase = b.phase_at(now);
    assume(phase != Phase::Issuance);

    let h = holders();
    let mut ledger = empty_ledger();
    let result = ledger.split(h[0], amount, phase);

    kani::assert(result.is_err(), "split outside issuance must fail");
    kani::assert(ledger.total_supply(Tranche::Senior) == 0, "failed split must not mint");
}

/// Severity freezes exactly once
#[kani::proof]
fn severity_declared_once() {
    let first = any_severity();
    let second = any_severity();
    assume(first <= SCALE);

    let mut recovery = RecoveryEngine::default();
    let reporter = holders()[0];
    kani::assert(recovery.declare(first, reporter, 1).is_ok(), "first declaration must succeed");
    kani::assert(
        recovery.declare(second, reporter, 2) == Err(EngineError::SeverityAlreadyDeclared),
        "second declaration must be rejected",
    );
    kani::assert(
        recovery.snapshot().map(|s| s.severity_ppm) == Some(first),
        "frozen severity must not change",
    );
}

/// Ceil and floor division differ by at most one
#[kani::proof]
fn mul_div_rounding() {
    let a = any::<u32>() as u128;
    let b = any::<u32>() as u128;
    let d = (any::<u32>() as u128).max(1);

    let lo = mul_div_floor(a, b, d);
    let hi = mul_div_ceil(a, b, d);
    kani::assert(lo.is_some() && hi.is_some(), "32-bit operands must not overflow");
    if let (Some(lo), Some(hi)) = (lo, hi) {
        kani::assert(lo <= hi && hi - lo <= 1, "ceil must be floor or floor + 1");
    }
}
