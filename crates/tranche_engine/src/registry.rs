//! Active adapter custody and migration
//!
//! Exactly one adapter custodies the pool at a time. Adding an adapter while
//! one is active migrates the full balance: withdraw everything from the
//! outgoing adapter, deposit it into the incoming one, then switch.
//!
//! Every mutating call works on a staged copy of the adapter and holds a
//! savepoint on the principal ledger. Only a successful call swaps the copy
//! in, keeps the ledger writes and records events; a failed one leaves the
//! registry, the ledger and the event log as they were.

use serde::Serialize;

use crate::account::AccountId;
use crate::adapter::{AdapterId, VenueKind, YieldAdapter};
use crate::error::{EngineError, MigrationLeg, Result};
use crate::events::{EngineEvent, EventLog};
use crate::token::TokenLedger;
use crate::venues::ReserveState;

/// Append-only activation record
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AdapterRecord {
    pub adapter_id: AdapterId,
    pub venue: VenueKind,
    pub activated_at: u64,
    pub custody_balance_at_activation: u128,
}

#[derive(Clone, Debug, Default)]
pub struct AdapterRegistry {
    active: Option<Box<dyn YieldAdapter>>,
    history: Vec<AdapterRecord>,
}

/// Registry contents to restore when an enclosing operation fails
#[derive(Debug)]
pub struct RegistryCheckpoint {
    active: Option<Box<dyn YieldAdapter>>,
    history_len: usize,
}

impl AdapterRegistry {
    pub fn active(&self) -> Option<&dyn YieldAdapter> {
        self.active.as_deref()
    }

    pub fn active_mut(&mut self) -> Option<&mut (dyn YieldAdapter + 'static)> {
        self.active.as_deref_mut()
    }

    pub fn history(&self) -> &[AdapterRecord] {
        &self.history
    }

    pub fn is_registered(&self, id: AdapterId) -> bool {
        self.history.iter().any(|r| r.adapter_id == id)
    }

    /// Live custodied value of the active adapter, 0 when none is active
    pub fn pool_balance(&self) -> u128 {
        self.active.as_ref().map_or(0, |a| a.balance())
    }

    /// Copy of the active adapter and the history length
    pub fn checkpoint(&self) -> RegistryCheckpoint {
        RegistryCheckpoint {
            active: self.active.clone(),
            history_len: self.history.len(),
        }
    }

    pub fn restore(&mut self, checkpoint: RegistryCheckpoint) {
        self.active = checkpoint.active;
        self.history.truncate(checkpoint.history_len);
    }

    /// Register `adapter`, activating it directly or migrating into it
    pub fn add_adapter(
        &mut self,
        adapter: Box<dyn YieldAdapter>,
        asset: &mut TokenLedger,
        custody: AccountId,
        now: u64,
        events: &mut EventLog,
    ) -> Result<AdapterRecord> {
        let id = adapter.id();
        if self.is_registered(id) {
            return Err(EngineError::AdapterAlreadyRegistered(id));
        }

        let mut incoming = adapter;
        let mut emitted = Vec::new();
        match self.active.as_ref() {
            None => {
                emitted.push(EngineEvent::AdapterActivated {
                    adapter: id,
                    venue: incoming.venue(),
                    at: now,
                });
                log::info!("activated {} ({:?})", id, incoming.venue());
            }
            Some(current) => {
                let mut outgoing = current.clone();
                let savepoint = asset.begin();
                let moved = match migrate(outgoing.as_mut(), incoming.as_mut(), asset, custody) {
                    Ok(moved) => {
                        asset.commit(savepoint);
                        moved
                    }
                    Err(e) => {
                        asset.rollback(savepoint);
                        log::warn!("migration from {} to {} failed: {}", outgoing.id(), id, e);
                        return Err(e);
                    }
                };
                if moved > 0 {
                    emitted.push(EngineEvent::Withdrawn {
                        adapter: outgoing.id(),
                        asset: asset.symbol().to_string(),
                        amount: moved,
                    });
                    emitted.push(EngineEvent::Deposited {
                        adapter: id,
                        asset: asset.symbol().to_string(),
                        amount: moved,
                    });
                }
                emitted.push(EngineEvent::AdapterMigrated {
                    from: outgoing.id(),
                    to: id,
                    amount: moved,
                    at: now,
                });
                log::info!("migrated {} from {} to {}", moved, outgoing.id(), id);
            }
        }

        let record = AdapterRecord {
            adapter_id: id,
            venue: incoming.venue(),
            activated_at: now,
            custody_balance_at_activation: incoming.balance(),
        };
        self.active = Some(incoming);
        self.history.push(record.clone());
        for event in emitted {
            events.push(event);
        }
        Ok(record)
    }

    /// Approve and deposit `amount` from `from` into the active adapter
    pub fn deposit(
        &mut self,
        asset: &mut TokenLedger,
        from: AccountId,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<()> {
        let adapter = self.staged(asset, |adapter, asset| {
            asset.approve(from, adapter.account(), amount);
            adapter.deposit(asset, from, amount)?;
            Ok(adapter.id())
        })?;
        events.push(EngineEvent::Deposited {
            adapter,
            asset: asset.symbol().to_string(),
            amount,
        });
        Ok(())
    }

    pub fn withdraw(
        &mut self,
        asset: &mut TokenLedger,
        to: AccountId,
        amount: u128,
        events: &mut EventLog,
    ) -> Result<()> {
        let adapter = self.staged(asset, |adapter, asset| {
            adapter.withdraw(asset, to, amount)?;
            Ok(adapter.id())
        })?;
        events.push(EngineEvent::Withdrawn {
            adapter,
            asset: asset.symbol().to_string(),
            amount,
        });
        Ok(())
    }

    /// Reserve of the active venue, for yield and loss simulation
    pub fn active_reserve_mut(&mut self) -> Result<&mut ReserveState> {
        self.active
            .as_mut()
            .ok_or(EngineError::NoActiveAdapter)?
            .reserve_mut()
            .ok_or(EngineError::InvalidConfig("active adapter exposes no reserve"))
    }

    /// Run `f` on a copy of the active adapter under a ledger savepoint;
    /// the copy replaces the adapter only if `f` succeeds
    fn staged<T>(
        &mut self,
        asset: &mut TokenLedger,
        f: impl FnOnce(&mut dyn YieldAdapter, &mut TokenLedger) -> Result<T>,
    ) -> Result<T> {
        let active = self.active.as_mut().ok_or(EngineError::NoActiveAdapter)?;
        let mut staged = active.clone();
        let savepoint = asset.begin();
        match f(staged.as_mut(), asset) {
            Ok(out) => {
                asset.commit(savepoint);
                *active = staged;
                Ok(out)
            }
            Err(e) => {
                asset.rollback(savepoint);
                Err(e)
            }
        }
    }
}

/// Move the whole custodied balance; returns the amount moved
fn migrate(
    outgoing: &mut dyn YieldAdapter,
    incoming: &mut dyn YieldAdapter,
    asset: &mut TokenLedger,
    custody: AccountId,
) -> Result<u128> {
    let amount = outgoing.balance();
    if amount == 0 {
        return Ok(0);
    }

    outgoing
        .withdraw(asset, custody, amount)
        .map_err(|e| EngineError::MigrationFailed {
            leg: MigrationLeg::Withdraw,
            source: Box::new(e),
        })?;

    asset.approve(custody, incoming.account(), amount);
    incoming
        .deposit(asset, custody, amount)
        .map_err(|e| EngineError::MigrationFailed {
            leg: MigrationLeg::Deposit,
            source: Box::new(e),
        })?;

    Ok(amount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::venues::LendingAdapter;

    fn custody() -> AccountId {
        AccountId::derived("engine")
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

    fn funded_registry(amount: u128) -> (AdapterRegistry, TokenLedger, EventLog) {
        let mut registry = AdapterRegistry::default();
        let mut usdc = TokenLedger::new("USDC", 6);
        let mut events = EventLog::default();
        usdc.mint(custody(), amount).unwrap();
        registry
            .add_adapter(Box::new(LendingAdapter::aave(AdapterId(1))), &mut usdc, custody(), 10, &mut events)
            .unwrap();
        registry.deposit(&mut usdc, custody(), amount, &mut events).unwrap();
        (registry, usdc, events)
    }

    #[test]
    fn test_first_adapter_activates_immediately() {
        let (registry, usdc, events) = funded_registry(1_000);
        assert_eq!(registry.active().map(|a| a.id()), Some(AdapterId(1)));
        assert_eq!(registry.pool_balance(), 1_000);
        assert_eq!(usdc.balance_of(&custody()), 0);
        assert_eq!(registry.history().len(), 1);
        assert_eq!(registry.history()[0].custody_balance_at_activation, 0);
        assert!(events.iter().any(|e| matches!(e, EngineEvent::Deposited { amount: 1_000, .. })));
    }

    #[test]
    fn test_migration_moves_full_balance() {
        let (mut registry, mut usdc, mut events) = funded_registry(1_000);
        let record = registry
            .add_adapter(Box::new(LendingAdapter::compound(AdapterId(2))), &mut usdc, custody(), 20, &mut events)
            .unwrap();

        assert_eq!(record.custody_balance_at_activation, 1_000);
        assert_eq!(record.venue, VenueKind::Compound);
        assert_eq!(registry.active().map(|a| a.id()), Some(AdapterId(2)));
        assert_eq!(registry.pool_balance(), 1_000);
        assert_eq!(registry.history().len(), 2);
        assert_eq!(usdc.balance_of(&custody()), 0);
    }

    #[test]
    fn test_failed_withdraw_leg_keeps_old_adapter() {
        let (mut registry, mut usdc, mut events) = funded_registry(1_000);
        registry.active_reserve_mut().unwrap().set_liquidity_cap(Some(10));

        let err = registry
            .add_adapter(Box::new(LendingAdapter::compound(AdapterId(2))), &mut usdc, custody(), 20, &mut events)
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MigrationFailed {
                leg: MigrationLeg::Withdraw,
                ..
            }
        ));
        assert_eq!(registry.active().map(|a| a.id()), Some(AdapterId(1)));
        assert_eq!(registry.pool_balance(), 1_000);
        assert_eq!(registry.history().len(), 1);
    }

    #[test]
    fn test_duplicate_adapter_rejected() {
        let (mut registry, mut usdc, mut events) = funded_registry(10);
        let err = registry
            .add_adapter(Box::new(LendingAdapter::aave(AdapterId(1))), &mut usdc, custody(), 30, &mut events)
            .unwrap_err();
        assert_eq!(err, EngineError::AdapterAlreadyRegistered(AdapterId(1)));
    }

    #[test]
    fn test_no_active_adapter() {
        let mut registry = AdapterRegistry::default();
        let mut usdc = TokenLedger::new("USDC", 6);
        let mut events = EventLog::default();
        assert_eq!(registry.pool_balance(), 0);
        assert_eq!(
            registry.deposit(&mut usdc, custody(), 1, &mut events),
            Err(EngineError::NoActiveAdapter)
        );
        assert_eq!(
            registry.withdraw(&mut usdc, custody(), 1, &mut events),
            Err(EngineError::NoActiveAdapter)
        );
    }

    #[test]
    fn test_migration_events_follow_success() {
        let (mut registry, mut usdc, mut events) = funded_registry(1_000);
        events.drain();
        registry
            .add_adapter(Box::new(LendingAdapter::moonwell(AdapterId(2))), &mut usdc, custody(), 20, &mut events)
            .unwrap();

        let kinds: Vec<_> = events.iter().collect();
        assert!(matches!(kinds[0], EngineEvent::Withdrawn { adapter: AdapterId(1), amount: 1_000, .. }));
        assert!(matches!(kinds[1], EngineEvent::Deposited { adapter: AdapterId(2), amount: 1_000, .. }));
        assert!(matches!(kinds[2], EngineEvent::AdapterMigrated { amount: 1_000, .. }));
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_failed_deposit_leg_keeps_outgoing_position() {
        let (mut registry, mut usdc, mut events) = funded_registry(1_000);
        let ledger_before = usdc.clone();
        let events_before = events.len();

        let err = registry
            .add_adapter(
                Box::new(PausedVenue(LendingAdapter::compound(AdapterId(2)))),
                &mut usdc,
                custody(),
                20,
                &mut events,
            )
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::MigrationFailed {
                leg: MigrationLeg::Deposit,
                ..
            }
        ));

        // cash went back to the outgoing venue; nothing counted twice
        assert_eq!(usdc, ledger_before);
        assert_eq!(usdc.balance_of(&custody()), 0);
        assert_eq!(events.len(), events_before);
        assert_eq!(registry.active().map(|a| a.id()), Some(AdapterId(1)));
        assert_eq!(registry.history().len(), 1);
        assert_eq!(registry.pool_balance(), 1_000);

        registry.withdraw(&mut usdc, custody(), 1_000, &mut events).unwrap();
        assert_eq!(usdc.balance_of(&custody()), 1_000);
        assert_eq!(registry.pool_balance(), 0);
    }

    #[test]
    fn test_failed_deposit_leaves_no_allowance() {
        let mut registry = AdapterRegistry::default();
        let mut usdc = TokenLedger::new("USDC", 6);
        let mut events = EventLog::default();
        usdc.mint(custody(), 10).unwrap();
        let paused = PausedVenue(LendingAdapter::aave(AdapterId(1)));
        let venue_account = paused.account();
        registry
            .add_adapter(Box::new(paused), &mut usdc, custody(), 0, &mut events)
            .unwrap();
        let before = usdc.clone();
        let events_before = events.len();

        assert!(registry.deposit(&mut usdc, custody(), 10, &mut events).is_err());
        assert_eq!(usdc.allowance(&custody(), &venue_account), 0);
        assert_eq!(usdc, before);
        assert_eq!(events.len(), events_before);
    }

    #[test]
    fn test_restore_checkpoint() {
        let (mut registry, mut usdc, mut events) = funded_registry(500);
        let checkpoint = registry.checkpoint();
        registry
            .add_adapter(Box::new(LendingAdapter::compound(AdapterId(2))), &mut usdc, custody(), 20, &mut events)
            .unwrap();

        registry.restore(checkpoint);
        assert_eq!(registry.active().map(|a| a.id()), Some(AdapterId(1)));
        assert_eq!(registry.history().len(), 1);
        // adapter state is restored, cash movements are the ledger's to undo
        assert_eq!(registry.pool_balance(), 500);
    }
}
