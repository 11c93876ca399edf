//! Paired tranche token bookkeeping
//!
//! `split` mints the principal amount of both AAA and AA to the depositor.
//! Each token is a full face-value claim subject to the waterfall, not a
//! half share. Burns happen per tranche during claims, so supplies may
//! diverge once the claim windows open.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{EngineError, Operation, Result};
use crate::math::checked_add;
use crate::phase::Phase;
use crate::token::{Savepoint, TokenLedger};

pub const SENIOR_SYMBOL: &str = "AAA";
pub const JUNIOR_SYMBOL: &str = "AA";

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tranche {
    /// AAA, absorbs loss only beyond 50% severity
    Senior,
    /// AA, absorbs the first half of any loss
    Junior,
}

impl Tranche {
    pub const ALL: [Tranche; 2] = [Tranche::Senior, Tranche::Junior];

    pub fn symbol(self) -> &'static str {
        match self {
            Tranche::Senior => SENIOR_SYMBOL,
            Tranche::Junior => JUNIOR_SYMBOL,
        }
    }

    pub fn claim_operation(self) -> Operation {
        match self {
            Tranche::Senior => Operation::ClaimSenior,
            Tranche::Junior => Operation::ClaimJunior,
        }
    }
}

impl fmt::Display for Tranche {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SplitReceipt {
    pub holder: AccountId,
    pub senior_minted: u128,
    pub junior_minted: u128,
}

/// Savepoint over both tranche tokens
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LedgerSavepoint {
    senior: Savepoint,
    junior: Savepoint,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrancheLedger {
    senior: TokenLedger,
    junior: TokenLedger,
    granularity: u128,
}

impl TrancheLedger {
    /// `granularity` of 0 or 1 accepts any non-zero amount
    pub fn new(decimals: u8, granularity: u128) -> Self {
        Self {
            senior: TokenLedger::new(SENIOR_SYMBOL, decimals),
            junior: TokenLedger::new(JUNIOR_SYMBOL, decimals),
            granularity: granularity.max(1),
        }
    }

    pub fn granularity(&self) -> u128 {
        self.granularity
    }

    pub fn token(&self, tranche: Tranche) -> &TokenLedger {
        match tranche {
            Tranche::Senior => &self.senior,
            Tranche::Junior => &self.junior,
        }
    }

    fn token_mut(&mut self, tranche: Tranche) -> &mut TokenLedger {
        match tranche {
            Tranche::Senior => &mut self.senior,
            Tranche::Junior => &mut self.junior,
        }
    }

    pub fn total_supply(&self, tranche: Tranche) -> u128 {
        self.token(tranche).total_supply()
    }

    pub fn balance_of(&self, tranche: Tranche, holder: &AccountId) -> u128 {
        self.token(tranche).balance_of(holder)
    }

    pub fn begin(&mut self) -> LedgerSavepoint {
        LedgerSavepoint {
            senior: self.senior.begin(),
            junior: self.junior.begin(),
        }
    }

    pub fn commit(&mut self, savepoint: LedgerSavepoint) {
        self.senior.commit(savepoint.senior);
        self.junior.commit(savepoint.junior);
    }

    pub fn rollback(&mut self, savepoint: LedgerSavepoint) {
        self.senior.rollback(savepoint.senior);
        self.junior.rollback(savepoint.junior);
    }

    /// Validate a split without touching state
    pub fn check_split(&self, principal: u128, phase: Phase) -> Result<()> {
        phase.require(Phase::Issuance, Operation::Split)?;
        if principal == 0 {
            return Err(EngineError::AmountTooLow);
        }
        if principal % self.granularity != 0 {
            return Err(EngineError::InvalidGranularity {
                amount: principal,
                granularity: self.granularity,
            });
        }
        checked_add(self.senior.total_supply(), principal)?;
        checked_add(self.junior.total_supply(), principal)?;
        Ok(())
    }

    /// Mint `principal` of both tranches to `holder`
    pub fn split(&mut self, holder: AccountId, principal: u128, phase: Phase) -> Result<SplitReceipt> {
        self.check_split(principal, phase)?;
        self.senior.mint(holder, principal)?;
        self.junior.mint(holder, principal)?;
        debug_assert_eq!(self.senior.total_supply(), self.junior.total_supply());

        Ok(SplitReceipt {
            holder,
            senior_minted: principal,
            junior_minted: principal,
        })
    }

    /// Burn `amount` of one tranche from `holder`; payout is the caller's job
    pub fn redeem_burn(&mut self, tranche: Tranche, amount: u128, holder: AccountId) -> Result<()> {
        self.token_mut(tranche).burn(holder, amount)
    }

    pub fn transfer(
        &mut self,
        tranche: Tranche,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(tranche).transfer(from, to, amount)
    }

    pub fn approve(&mut self, tranche: Tranche, owner: AccountId, spender: AccountId, amount: u128) {
        self.token_mut(tranche).approve(owner, spender, amount)
    }

    pub fn transfer_from(
        &mut self,
        tranche: Tranche,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<()> {
        self.token_mut(tranche).transfer_from(spender, from, to, amount)
    }
}
