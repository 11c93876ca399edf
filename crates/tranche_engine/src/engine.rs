//! Transactional engine facade
//!
//! Each mutating call opens a checkpoint: savepoints on the principal and
//! tranche ledgers, a copy of the active adapter, the recovery snapshot and
//! the event count. The operation then runs against live state. On error
//! the checkpoint is restored, so a failed call has no effect and emits no
//! events. Undo cost tracks the slots an operation wrote, not the number of
//! holders.

use serde::Serialize;

use crate::account::AccountId;
use crate::adapter::YieldAdapter;
use crate::claims::{ClaimProcessor, ClaimReceipt, ClaimRequest};
use crate::config::EngineConfig;
use crate::error::{EngineError, Operation, Result};
use crate::events::{EngineEvent, EventLog};
use crate::ledger::{LedgerSavepoint, SplitReceipt, Tranche, TrancheLedger};
use crate::phase::Phase;
use crate::recovery::{RecoveryEngine, RecoverySnapshot};
use crate::registry::{AdapterRecord, AdapterRegistry, RegistryCheckpoint};
use crate::token::{Savepoint, TokenLedger};
use crate::venues::ReserveState;

/// Everything a transaction may touch
#[derive(Clone, Debug)]
pub struct EngineState {
    pub asset: TokenLedger,
    pub ledger: TrancheLedger,
    pub registry: AdapterRegistry,
    pub recovery: RecoveryEngine,
    pub events: EventLog,
}

/// Undo handle for one transaction
#[derive(Debug)]
struct Checkpoint {
    asset: Savepoint,
    ledger: LedgerSavepoint,
    registry: RegistryCheckpoint,
    recovery: RecoveryEngine,
    events: usize,
}

impl EngineState {
    fn begin(&mut self) -> Checkpoint {
        Checkpoint {
            asset: self.asset.begin(),
            ledger: self.ledger.begin(),
            registry: self.registry.checkpoint(),
            recovery: self.recovery.clone(),
            events: self.events.len(),
        }
    }

    fn commit(&mut self, checkpoint: Checkpoint) {
        self.asset.commit(checkpoint.asset);
        self.ledger.commit(checkpoint.ledger);
    }

    fn rollback(&mut self, checkpoint: Checkpoint) {
        self.asset.rollback(checkpoint.asset);
        self.ledger.rollback(checkpoint.ledger);
        self.registry.restore(checkpoint.registry);
        self.recovery = checkpoint.recovery;
        self.events.truncate(checkpoint.events);
    }
}

/// Read-only view for reporting
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct EngineSnapshot {
    pub now: u64,
    pub phase: Phase,
    pub senior_supply: u128,
    pub junior_supply: u128,
    pub pool_balance: u128,
    pub severity_ppm: Option<u128>,
}

#[derive(Debug)]
pub struct TrancheEngine {
    config: EngineConfig,
    /// Engine-owned address on the principal ledger
    custody: AccountId,
    state: EngineState,
}

impl TrancheEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        let state = EngineState {
            asset: TokenLedger::new(config.asset_symbol.clone(), config.asset_decimals),
            ledger: TrancheLedger::new(config.asset_decimals, u128::from(config.split_granularity)),
            registry: AdapterRegistry::default(),
            recovery: RecoveryEngine::default(),
            events: EventLog::default(),
        };
        Ok(Self {
            config,
            custody: AccountId::derived("tranche-engine/custody"),
            state,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn custody_account(&self) -> AccountId {
        self.custody
    }

    pub fn phase(&self, now: u64) -> Phase {
        self.config.boundaries.phase_at(now)
    }

    pub fn state(&self) -> &EngineState {
        &self.state
    }

    /// Principal asset ledger (external token; holders fund and approve here)
    pub fn asset(&self) -> &TokenLedger {
        &self.state.asset
    }

    pub fn asset_mut(&mut self) -> &mut TokenLedger {
        &mut self.state.asset
    }

    pub fn tranche(&self, tranche: Tranche) -> &TokenLedger {
        self.state.ledger.token(tranche)
    }

    pub fn pool_balance(&self) -> u128 {
        self.state.registry.pool_balance()
    }

    pub fn recovery_snapshot(&self) -> Option<&RecoverySnapshot> {
        self.state.recovery.snapshot()
    }

    pub fn adapter_history(&self) -> &[AdapterRecord] {
        self.state.registry.history()
    }

    pub fn active_adapter(&self) -> Option<&dyn YieldAdapter> {
        self.state.registry.active()
    }

    pub fn snapshot(&self, now: u64) -> EngineSnapshot {
        EngineSnapshot {
            now,
            phase: self.phase(now),
            senior_supply: self.state.ledger.total_supply(Tranche::Senior),
            junior_supply: self.state.ledger.total_supply(Tranche::Junior),
            pool_balance: self.pool_balance(),
            severity_ppm: self.recovery_snapshot().map(|s| s.severity_ppm),
        }
    }

    /// Committed events since the last drain
    pub fn drain_events(&mut self) -> Vec<EngineEvent> {
        self.state.events.drain()
    }

    fn transact<T>(
        &mut self,
        op: impl FnOnce(&mut EngineState, &EngineConfig, AccountId) -> Result<T>,
    ) -> Result<T> {
        let checkpoint = self.state.begin();
        match op(&mut self.state, &self.config, self.custody) {
            Ok(out) => {
                self.state.commit(checkpoint);
                Ok(out)
            }
            Err(e) => {
                self.state.rollback(checkpoint);
                Err(e)
            }
        }
    }

    /// Pull `principal` from `holder`, mint paired AAA/AA and deploy it
    ///
    /// `holder` must have approved [`TrancheEngine::custody_account`] for
    /// `principal` on the asset ledger.
    pub fn split(&mut self, holder: AccountId, principal: u128, now: u64) -> Result<SplitReceipt> {
        let phase = self.phase(now);
        self.transact(|s, _, custody| {
            s.ledger.check_split(principal, phase)?;
            if s.registry.active().is_none() {
                return Err(EngineError::NoActiveAdapter);
            }
            s.asset.transfer_from(custody, holder, custody, principal)?;
            let receipt = s.ledger.split(holder, principal, phase)?;
            s.events.push(EngineEvent::Split { holder, principal });
            s.registry.deposit(&mut s.asset, custody, principal, &mut s.events)?;
            log::debug!("split {} for {}", principal, holder);
            Ok(receipt)
        })
    }

    /// Register an adapter; migrates the pool when one is already active
    pub fn add_adapter(
        &mut self,
        caller: AccountId,
        adapter: Box<dyn YieldAdapter>,
        now: u64,
    ) -> Result<AdapterRecord> {
        if caller != self.config.admin {
            return Err(EngineError::Unauthorized(Operation::AddAdapter));
        }
        self.transact(|s, _, custody| {
            s.registry
                .add_adapter(adapter, &mut s.asset, custody, now, &mut s.events)
        })
    }

    /// Freeze the loss severity (ppm) for this cycle
    pub fn declare_severity(
        &mut self,
        reporter: AccountId,
        severity_ppm: u128,
        now: u64,
    ) -> Result<RecoverySnapshot> {
        if reporter != self.config.reporter {
            return Err(EngineError::Unauthorized(Operation::DeclareSeverity));
        }
        let phase = self.phase(now);
        self.transact(|s, _, _| {
            phase.require(Phase::SettlementGap, Operation::DeclareSeverity)?;
            let snap = s.recovery.declare(severity_ppm, reporter, now)?;
            s.events.push(EngineEvent::SeverityFrozen {
                severity_ppm,
                declared_by: Some(reporter),
                at: now,
            });
            log::info!("severity frozen at {} ppm by {}", severity_ppm, reporter);
            Ok(snap)
        })
    }

    pub fn claim(
        &mut self,
        holder: AccountId,
        tranche: Tranche,
        amount: u128,
        now: u64,
    ) -> Result<ClaimReceipt> {
        let phase = self.phase(now);
        self.transact(|s, _, custody| {
            processor(s, custody).claim(
                phase,
                ClaimRequest {
                    holder,
                    tranche,
                    amount,
                },
                now,
            )
        })
    }

    /// Redeem every open, non-zero tranche balance of `holder` in one
    /// transaction; fails as a whole if any claim fails
    pub fn claim_all(&mut self, holder: AccountId, now: u64) -> Result<Vec<ClaimReceipt>> {
        let phase = self.phase(now);
        if !phase.allows_claim(Tranche::Senior) {
            return Err(EngineError::PhaseViolation {
                op: Operation::ClaimSenior,
                phase,
            });
        }
        self.transact(|s, _, custody| {
            let mut receipts = Vec::new();
            for tranche in Tranche::ALL {
                let amount = s.ledger.balance_of(tranche, &holder);
                if amount == 0 || !phase.allows_claim(tranche) {
                    continue;
                }
                let req = ClaimRequest {
                    holder,
                    tranche,
                    amount,
                };
                receipts.push(processor(s, custody).claim(phase, req, now)?);
            }
            Ok(receipts)
        })
    }

    /// Secondary transfer of tranche tokens (allowed in every phase)
    pub fn transfer_tranche(
        &mut self,
        tranche: Tranche,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<()> {
        self.transact(|s, _, _| s.ledger.transfer(tranche, from, to, amount))
    }

    pub fn approve_tranche(&mut self, tranche: Tranche, owner: AccountId, spender: AccountId, amount: u128) {
        self.state.ledger.approve(tranche, owner, spender, amount)
    }

    pub fn transfer_tranche_from(
        &mut self,
        tranche: Tranche,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<()> {
        self.transact(|s, _, _| s.ledger.transfer_from(tranche, spender, from, to, amount))
    }

    /// Run `f` against the active venue's reserve and the principal ledger
    ///
    /// Stands in for the outside world moving the venue (interest accrual,
    /// impairment, liquidity shocks). Committed only if `f` succeeds.
    pub fn with_active_reserve<T>(
        &mut self,
        f: impl FnOnce(&mut ReserveState, &mut TokenLedger) -> Result<T>,
    ) -> Result<T> {
        self.transact(|s, _, _| {
            let reserve = s.registry.active_reserve_mut()?;
            f(reserve, &mut s.asset)
        })
    }
}

fn processor(s: &mut EngineState, custody: AccountId) -> ClaimProcessor<'_> {
    ClaimProcessor {
        ledger: &mut s.ledger,
        recovery: &mut s.recovery,
        registry: &mut s.registry,
        asset: &mut s.asset,
        custody,
        events: &mut s.events,
    }
}
