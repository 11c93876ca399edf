//! Fungible token ledger
//!
//! Standard balance/allowance semantics shared by the principal asset and
//! both tranche tokens. All mutations are checked; a failed call changes
//! nothing.
//!
//! Multi-step operations open a [`Savepoint`]. While one is open every write
//! records the value it overwrote, so rolling back costs the number of
//! entries touched, not the number of holders.

use std::collections::BTreeMap;

use crate::account::AccountId;
use crate::error::{EngineError, Result};
use crate::math::{checked_add, checked_sub};

/// Prior value of one overwritten slot
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Undo {
    Supply(u128),
    Balance(AccountId, u128),
    Allowance(AccountId, AccountId, u128),
}

/// Journal position returned by [`TokenLedger::begin`]
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Savepoint(usize);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    symbol: String,
    decimals: u8,
    total_supply: u128,
    balances: BTreeMap<AccountId, u128>,
    /// (owner, spender) -> remaining allowance
    allowances: BTreeMap<(AccountId, AccountId), u128>,
    journal: Vec<Undo>,
    /// Open savepoints; writes are journaled while non-zero
    depth: u32,
}

impl TokenLedger {
    pub fn new(symbol: impl Into<String>, decimals: u8) -> Self {
        Self {
            symbol: symbol.into(),
            decimals,
            ..Self::default()
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    pub fn total_supply(&self) -> u128 {
        self.total_supply
    }

    pub fn balance_of(&self, owner: &AccountId) -> u128 {
        self.balances.get(owner).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &AccountId, spender: &AccountId) -> u128 {
        self.allowances.get(&(*owner, *spender)).copied().unwrap_or(0)
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Start journaling writes; savepoints nest
    pub fn begin(&mut self) -> Savepoint {
        self.depth += 1;
        Savepoint(self.journal.len())
    }

    /// Keep every write since `savepoint`
    pub fn commit(&mut self, savepoint: Savepoint) {
        self.close(savepoint, false);
    }

    /// Restore every slot written since `savepoint`, newest first
    pub fn rollback(&mut self, savepoint: Savepoint) {
        self.close(savepoint, true);
    }

    fn close(&mut self, savepoint: Savepoint, undo: bool) {
        if undo {
            while self.journal.len() > savepoint.0 {
                match self.journal.pop() {
                    Some(Undo::Supply(v)) => self.total_supply = v,
                    Some(Undo::Balance(owner, v)) => Self::put(&mut self.balances, owner, v),
                    Some(Undo::Allowance(owner, spender, v)) => {
                        Self::put(&mut self.allowances, (owner, spender), v)
                    }
                    None => break,
                }
            }
        }
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.journal.clear();
        }
    }

    fn record(&mut self, undo: Undo) {
        if self.depth > 0 {
            self.journal.push(undo);
        }
    }

    fn put<K: Ord>(map: &mut BTreeMap<K, u128>, key: K, amount: u128) {
        if amount == 0 {
            map.remove(&key);
        } else {
            map.insert(key, amount);
        }
    }

    fn set_supply(&mut self, amount: u128) {
        self.record(Undo::Supply(self.total_supply));
        self.total_supply = amount;
    }

    /// Set (not increase) the allowance of `spender` over `owner`'s balance
    pub fn approve(&mut self, owner: AccountId, spender: AccountId, amount: u128) {
        self.record(Undo::Allowance(owner, spender, self.allowance(&owner, &spender)));
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    pub fn transfer(&mut self, from: AccountId, to: AccountId, amount: u128) -> Result<()> {
        if amount == 0 || from == to {
            return self.ensure_balance(&from, amount);
        }
        self.ensure_balance(&from, amount)?;
        let credited = checked_add(self.balance_of(&to), amount)?;
        self.set_balance(from, self.balance_of(&from) - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`
    ///
    /// Allowance is checked before balance.
    pub fn transfer_from(
        &mut self,
        spender: AccountId,
        from: AccountId,
        to: AccountId,
        amount: u128,
    ) -> Result<()> {
        let approved = self.allowance(&from, &spender);
        if approved < amount {
            return Err(EngineError::InsufficientAllowance {
                needed: amount,
                approved,
            });
        }
        self.transfer(from, to, amount)?;
        self.approve(from, spender, approved - amount);
        Ok(())
    }

    pub fn mint(&mut self, to: AccountId, amount: u128) -> Result<()> {
        let supply = checked_add(self.total_supply, amount)?;
        let balance = checked_add(self.balance_of(&to), amount)?;
        self.set_supply(supply);
        self.set_balance(to, balance);
        Ok(())
    }

    pub fn burn(&mut self, from: AccountId, amount: u128) -> Result<()> {
        self.ensure_balance(&from, amount)?;
        let supply = checked_sub(self.total_supply, amount)?;
        self.set_balance(from, self.balance_of(&from) - amount);
        self.set_supply(supply);
        Ok(())
    }

    fn ensure_balance(&self, owner: &AccountId, needed: u128) -> Result<()> {
        let available = self.balance_of(owner);
        if available < needed {
            return Err(EngineError::InsufficientBalance { needed, available });
        }
        Ok(())
    }

    fn set_balance(&mut self, owner: AccountId, amount: u128) {
        self.record(Undo::Balance(owner, self.balance_of(&owner)));
        Self::put(&mut self.balances, owner, amount);
    }
}
