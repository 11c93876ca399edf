//! End-to-end lifecycle tests
//!
//! Boundaries follow the reference deployment: S = +2d, T1 = +7d, T2 = +8d,
//! T3 = +9d from a fixed base time.

use tranche_engine::helpers::{idle_custody, solvency_margin, supplies_paired};
use tranche_engine::*;

const BASE: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

fn admin() -> AccountId {
    AccountId::derived("admin")
}

fn reporter() -> AccountId {
    AccountId::derived("reporter")
}

fn depositor() -> AccountId {
    AccountId::derived("depositor")
}

fn boundaries() -> PhaseBoundaries {
    PhaseBoundaries::from_offsets(BASE, 2 * DAY, 7 * DAY, 8 * DAY, 9 * DAY).unwrap()
}

fn s() -> u64 {
    boundaries().issuance_end
}
fn t1() -> u64 {
    boundaries().insurance_end
}
fn t2() -> u64 {
    boundaries().settlement_end
}
fn t3() -> u64 {
    boundaries().senior_claim_end
}

fn new_engine(granularity: u64) -> TrancheEngine {
    let config = EngineConfig::new(boundaries(), reporter(), admin()).with_granularity(granularity);
    let mut engine = TrancheEngine::new(config).unwrap();
    engine
        .add_adapter(admin(), Box::new(LendingAdapter::aave(AdapterId(1))), BASE)
        .unwrap();
    engine
}

fn fund(engine: &mut TrancheEngine, who: AccountId, amount: u128) {
    let custody = engine.custody_account();
    engine.asset_mut().mint(who, amount).unwrap();
    engine.asset_mut().approve(who, custody, amount);
}

/// Venue that accepts withdrawals but refuses new deposits
#[derive(Clone, Debug)]
struct PausedVenue(LendingAdapter);

impl YieldAdapter for PausedVenue {
    fn id(&self) -> AdapterId {
        self.0.id()
    }

    fn venue(&self) -> VenueKind {
        VenueKind::Custom
    }

    fn account(&self) -> AccountId {
        self.0.account()
    }

    fn deposit(&mut self, _: &mut TokenLedger, _: AccountId, _: u128) -> Result<()> {
        Err(EngineError::InvalidConfig("deposits paused"))
    }

    fn withdraw(&mut self, asset: &mut TokenLedger, to: AccountId, amount: u128) -> Result<()> {
        self.0.withdraw(asset, to, amount)
    }

    fn balance(&self) -> u128 {
        self.0.balance()
    }

    fn boxed_clone(&self) -> Box<dyn YieldAdapter> {
        Box::new(self.clone())
    }
}

#[test]
fn test_reference_scenario() {
    let mut engine = new_engine(1);
    let senior_holder = AccountId::derived("senior-holder");
    let junior_holder = AccountId::derived("junior-holder");

    // Issuance: 500,000 principal mints 500,000 of each tranche
    fund(&mut engine, depositor(), 500_000);
    let receipt = engine.split(depositor(), 500_000, BASE + DAY).unwrap();
    assert_eq!(receipt.senior_minted, 500_000);
    assert_eq!(receipt.junior_minted, 500_000);
    assert_eq!(engine.tranche(Tranche::Senior).total_supply(), 500_000);
    assert_eq!(engine.tranche(Tranche::Junior).total_supply(), 500_000);
    assert_eq!(engine.pool_balance(), 500_000);
    assert_eq!(idle_custody(engine.state(), &engine.custody_account()), 0);

    // Secondary market hands 1,000 of each tranche to two holders
    engine
        .transfer_tranche(Tranche::Senior, depositor(), senior_holder, 1_000)
        .unwrap();
    engine
        .transfer_tranche(Tranche::Junior, depositor(), junior_holder, 1_000)
        .unwrap();

    // Settlement gap: 25% loss declared
    let snap = engine.declare_severity(reporter(), 250_000, t1() + 60).unwrap();
    assert_eq!(snap.recovery_per_token(Tranche::Senior), 1_000_000);
    assert_eq!(snap.recovery_per_token(Tranche::Junior), 500_000);

    // T2: AAA redeems at par
    let paid = engine.claim(senior_holder, Tranche::Senior, 1_000, t2()).unwrap();
    assert_eq!(paid.payout, 1_000);
    assert_eq!(engine.asset().balance_of(&senior_holder), 1_000);

    // AA is still locked until T3
    let err = engine
        .claim(junior_holder, Tranche::Junior, 1_000, t3() - 1)
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::PhaseViolation {
            op: Operation::ClaimJunior,
            phase: Phase::SeniorClaim
        }
    );

    // T3: AA redeems at half
    let paid = engine.claim(junior_holder, Tranche::Junior, 1_000, t3()).unwrap();
    assert_eq!(paid.payout, 500);
    assert_eq!(engine.asset().balance_of(&junior_holder), 500);
    assert_eq!(engine.pool_balance(), 500_000 - 1_500);
}

#[test]
fn test_junior_claim_rejected_when_pool_impaired() {
    let mut engine = new_engine(1);
    let junior_holder = AccountId::derived("junior-holder");

    fund(&mut engine, depositor(), 500_000);
    engine.split(depositor(), 500_000, BASE).unwrap();
    engine
        .transfer_tranche(Tranche::Junior, depositor(), junior_holder, 1_000)
        .unwrap();
    engine.declare_severity(reporter(), 250_000, t1()).unwrap();

    // venue loses almost everything, beyond what the declared severity expected
    engine
        .with_active_reserve(|reserve, usdc| reserve.impair(usdc, 999_500))
        .unwrap();
    assert_eq!(engine.pool_balance(), 250);

    let err = engine
        .claim(junior_holder, Tranche::Junior, 1_000, t3())
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientPoolFunds {
            requested: 500,
            available: 250
        }
    );
    // rejected claim burned nothing
    assert_eq!(engine.tranche(Tranche::Junior).balance_of(&junior_holder), 1_000);

    // a smaller claim is evaluated on its own
    let paid = engine.claim(junior_holder, Tranche::Junior, 400, t3()).unwrap();
    assert_eq!(paid.payout, 200);
}

#[test]
fn test_split_window_and_granularity() {
    let mut engine = new_engine(3);
    fund(&mut engine, depositor(), 1_000);

    assert_eq!(
        engine.split(depositor(), 100, BASE),
        Err(EngineError::InvalidGranularity {
            amount: 100,
            granularity: 3
        })
    );
    assert_eq!(
        engine.split(depositor(), 99, s()),
        Err(EngineError::PhaseViolation {
            op: Operation::Split,
            phase: Phase::Insurance
        })
    );
    assert_eq!(engine.split(depositor(), 0, BASE), Err(EngineError::AmountTooLow));

    engine.split(depositor(), 99, s() - 1).unwrap();
    assert!(supplies_paired(&engine.state().ledger));
}

#[test]
fn test_senior_round_trip_at_zero_severity() {
    let mut engine = new_engine(1);
    fund(&mut engine, depositor(), 600);
    engine.split(depositor(), 600, BASE).unwrap();

    // nobody declared; the first claim freezes severity 0
    let paid = engine.claim(depositor(), Tranche::Senior, 600, t2()).unwrap();
    assert_eq!(paid.payout, 600);
    assert_eq!(paid.severity_ppm, 0);
    assert_eq!(engine.asset().balance_of(&depositor()), 600);
    assert_eq!(
        engine.recovery_snapshot().map(|snap| snap.declared_by),
        Some(None)
    );

    // the junior leg is only as good as what is left in the pool
    let err = engine.claim(depositor(), Tranche::Junior, 600, t3()).unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientPoolFunds {
            requested: 600,
            available: 0
        }
    );
}

#[test]
fn test_yield_covers_both_tranches() {
    let mut engine = new_engine(1);
    fund(&mut engine, depositor(), 1_000);
    engine.split(depositor(), 1_000, BASE).unwrap();

    // 100% over the coverage period doubles the pool
    let earned = engine
        .with_active_reserve(|reserve, usdc| reserve.accrue(usdc, 1_000_000))
        .unwrap();
    assert_eq!(earned, 1_000);
    assert_eq!(solvency_margin(engine.state(), 0), 0);

    let receipts = engine.claim_all(depositor(), t3()).unwrap();
    let total: u128 = receipts.iter().map(|r| r.payout).sum();
    assert_eq!(total, 2_000);
    assert_eq!(engine.pool_balance(), 0);
    assert_eq!(engine.tranche(Tranche::Senior).total_supply(), 0);
    assert_eq!(engine.tranche(Tranche::Junior).total_supply(), 0);
}

#[test]
fn test_migration_mid_cycle_keeps_claims_whole() {
    let mut engine = new_engine(1);
    fund(&mut engine, depositor(), 10_000);
    engine.split(depositor(), 10_000, BASE).unwrap();

    let record = engine
        .add_adapter(admin(), Box::new(LendingAdapter::compound(AdapterId(2))), s() + DAY)
        .unwrap();
    assert_eq!(record.custody_balance_at_activation, 10_000);
    assert_eq!(engine.active_adapter().map(|a| a.venue()), Some(VenueKind::Compound));

    let record = engine
        .add_adapter(admin(), Box::new(LendingAdapter::moonwell(AdapterId(3))), s() + 2 * DAY)
        .unwrap();
    assert_eq!(record.custody_balance_at_activation, 10_000);

    let history: Vec<_> = engine.adapter_history().iter().map(|r| r.adapter_id).collect();
    assert_eq!(history, vec![AdapterId(1), AdapterId(2), AdapterId(3)]);

    let paid = engine.claim(depositor(), Tranche::Senior, 10_000, t2()).unwrap();
    assert_eq!(paid.payout, 10_000);
}

#[test]
fn test_failed_migration_leaves_engine_untouched() {
    let mut engine = new_engine(1);
    fund(&mut engine, depositor(), 5_000);
    engine.split(depositor(), 5_000, BASE).unwrap();
    engine
        .with_active_reserve(|reserve, _| {
            reserve.set_liquidity_cap(Some(1_000));
            Ok(())
        })
        .unwrap();
    engine.drain_events();

    let err = engine
        .add_adapter(admin(), Box::new(LendingAdapter::compound(AdapterId(2))), s())
        .unwrap_err();
    assert!(matches!(err, EngineError::MigrationFailed { leg: MigrationLeg::Withdraw, .. }));

    assert_eq!(engine.active_adapter().map(|a| a.id()), Some(AdapterId(1)));
    assert_eq!(engine.pool_balance(), 5_000);
    assert_eq!(engine.adapter_history().len(), 1);
    assert!(engine.drain_events().is_empty());

    // the rejected adapter id was never recorded and can be retried later
    engine
        .with_active_reserve(|reserve, _| {
            reserve.set_liquidity_cap(None);
            Ok(())
        })
        .unwrap();
    engine
        .add_adapter(admin(), Box::new(LendingAdapter::compound(AdapterId(2))), s())
        .unwrap();
    assert_eq!(engine.pool_balance(), 5_000);
}

#[test]
fn test_failed_deposit_leg_leaves_engine_untouched() {
    let mut engine = new_engine(1);
    fund(&mut engine, depositor(), 500);
    engine.split(depositor(), 500, BASE).unwrap();
    engine.drain_events();

    let err = engine
        .add_adapter(admin(), Box::new(PausedVenue(LendingAdapter::compound(AdapterId(2)))), s())
        .unwrap_err();
    assert!(matches!(err, EngineError::MigrationFailed { leg: MigrationLeg::Deposit, .. }));

    assert_eq!(engine.active_adapter().map(|a| a.id()), Some(AdapterId(1)));
    assert_eq!(engine.pool_balance(), 500);
    assert_eq!(idle_custody(engine.state(), &engine.custody_account()), 0);
    assert!(engine.drain_events().is_empty());

    let receipt = engine.claim(depositor(), Tranche::Senior, 500, t2()).unwrap();
    assert_eq!(receipt.payout, 500);
    assert_eq!(engine.asset().balance_of(&depositor()), 500);
}

#[test]
fn test_event_stream_for_full_cycle() {
    let mut engine = new_engine(1);
    engine.drain_events();
    fund(&mut engine, depositor(), 300);
    engine.split(depositor(), 300, BASE).unwrap();
    engine.declare_severity(reporter(), 0, t1()).unwrap();
    engine.claim(depositor(), Tranche::Senior, 300, t2()).unwrap();

    let kinds: Vec<&'static str> = engine
        .drain_events()
        .iter()
        .map(|e| match e {
            EngineEvent::Split { .. } => "split",
            EngineEvent::Deposited { .. } => "deposited",
            EngineEvent::Withdrawn { .. } => "withdrawn",
            EngineEvent::AdapterActivated { .. } => "activated",
            EngineEvent::AdapterMigrated { .. } => "migrated",
            EngineEvent::SeverityFrozen { .. } => "frozen",
            EngineEvent::Claimed { .. } => "claimed",
        })
        .collect();
    assert_eq!(
        kinds,
        vec!["split", "deposited", "frozen", "withdrawn", "claimed"]
    );
}

#[test]
fn test_events_serialize_with_asset_and_amount() {
    let mut engine = new_engine(1);
    engine.drain_events();
    fund(&mut engine, depositor(), 30);
    engine.split(depositor(), 30, BASE).unwrap();

    let events = engine.drain_events();
    let json = serde_json::to_value(&events[1]).unwrap();
    assert_eq!(json["event"], "deposited");
    assert_eq!(json["asset"], "USDC");
    assert_eq!(json["amount"], 30);
}
