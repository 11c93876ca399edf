//! Tranche redemption
//!
//! Order per claim: phase gate, input checks, freeze severity, compute payout,
//! check holder balance and live pool balance, burn, then the external calls
//! (adapter withdraw, payout transfer). Tokens are burned before the adapter
//! is touched, so nothing an adapter does can redeem the same balance twice.

use serde::Serialize;

use crate::account::AccountId;
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventLog};
use crate::ledger::{Tranche, TrancheLedger};
use crate::phase::Phase;
use crate::recovery::RecoveryEngine;
use crate::registry::AdapterRegistry;
use crate::token::TokenLedger;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ClaimRequest {
    pub holder: AccountId,
    pub tranche: Tranche,
    pub amount: u128,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimReceipt {
    pub holder: AccountId,
    pub tranche: Tranche,
    pub burned: u128,
    pub payout: u128,
    pub severity_ppm: u128,
}

/// Borrowed view over everything a claim touches
pub struct ClaimProcessor<'a> {
    pub ledger: &'a mut TrancheLedger,
    pub recovery: &'a mut RecoveryEngine,
    pub registry: &'a mut AdapterRegistry,
    pub asset: &'a mut TokenLedger,
    /// Engine account that receives adapter withdrawals before payout
    pub custody: AccountId,
    pub events: &'a mut EventLog,
}

impl ClaimProcessor<'_> {
    pub fn claim(&mut self, phase: Phase, req: ClaimRequest, now: u64) -> Result<ClaimReceipt> {
        let ClaimRequest {
            holder,
            tranche,
            amount,
        } = req;

        if !phase.allows_claim(tranche) {
            return Err(EngineError::PhaseViolation {
                op: tranche.claim_operation(),
                phase,
            });
        }
        if amount == 0 {
            return Err(EngineError::AmountTooLow);
        }

        let (snapshot, created) = self.recovery.freeze_or_default(now);
        if created {
            log::info!("no severity declared, froze severity 0 at {}", now);
            self.events.push(EngineEvent::SeverityFrozen {
                severity_ppm: snapshot.severity_ppm,
                declared_by: None,
                at: now,
            });
        }
        let payout = snapshot.payout(tranche, amount)?;

        let held = self.ledger.balance_of(tranche, &holder);
        if held < amount {
            return Err(EngineError::InsufficientBalance {
                needed: amount,
                available: held,
            });
        }

        let available = self.registry.pool_balance();
        if available < payout {
            log::warn!(
                "{} claim of {} rejected: payout {} exceeds pool {}",
                tranche,
                amount,
                payout,
                available
            );
            return Err(EngineError::InsufficientPoolFunds {
                requested: payout,
                available,
            });
        }

        // effects
        self.ledger.redeem_burn(tranche, amount, holder)?;

        // interactions
        if payout > 0 {
            self.registry.withdraw(self.asset, self.custody, payout, self.events)?;
            self.asset.transfer(self.custody, holder, payout)?;
        }

        self.events.push(EngineEvent::Claimed {
            holder,
            tranche,
            burned: amount,
            payout,
        });
        log::debug!("{} redeemed {} {} for {}", holder, amount, tranche, payout);

        Ok(ClaimReceipt {
            holder,
            tranche,
            burned: amount,
            payout,
            severity_ppm: snapshot.severity_ppm,
        })
    }
}
