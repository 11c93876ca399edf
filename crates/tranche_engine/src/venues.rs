//! Concrete adapters for the supported lending venues
//!
//! Each venue is modelled as a single reserve whose value per receipt unit
//! moves with an index. Aave receipts start at index 1.0 (rebasing aToken
//! balance); Compound cTokens and Moonwell mTokens start at an exchange rate
//! of 0.02. Interest-rate mechanics stay outside this crate: yield and loss
//! are applied to the index explicitly through [`ReserveState::accrue`] and
//! [`ReserveState::impair`].

use crate::account::AccountId;
use crate::adapter::{ensure_nonzero, ensure_withdrawable, AdapterId, VenueKind, YieldAdapter};
use crate::error::{EngineError, Result};
use crate::math::{checked_add, mul_div_ceil, mul_div_floor, SCALE};
use crate::token::TokenLedger;

/// 1.0 for reserve indices and exchange rates
pub const INDEX_ONE: u128 = 1_000_000_000_000;

/// Initial cToken/mToken exchange rate (0.02 underlying per receipt)
pub const COMPOUND_INITIAL_RATE: u128 = INDEX_ONE / 50;

/// External reserve state of one lending venue
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReserveState {
    /// Address holding the venue's cash on the principal ledger
    account: AccountId,
    /// Underlying value of one receipt unit, scaled by INDEX_ONE
    index: u128,
    total_scaled: u128,
    /// Maximum cash released by a single withdrawal
    liquidity_cap: Option<u128>,
}

impl ReserveState {
    pub fn new(account: AccountId, initial_index: u128) -> Self {
        Self {
            account,
            index: initial_index.max(1),
            total_scaled: 0,
            liquidity_cap: None,
        }
    }

    pub fn account(&self) -> AccountId {
        self.account
    }

    pub fn index(&self) -> u128 {
        self.index
    }

    pub fn total_scaled(&self) -> u128 {
        self.total_scaled
    }

    pub fn value_of(&self, scaled: u128) -> u128 {
        mul_div_floor(scaled, self.index, INDEX_ONE).unwrap_or(u128::MAX)
    }

    /// Cash the venue can release right now
    pub fn liquidity(&self, asset: &TokenLedger) -> u128 {
        let cash = asset.balance_of(&self.account);
        match self.liquidity_cap {
            Some(cap) => cash.min(cap),
            None => cash,
        }
    }

    pub fn set_liquidity_cap(&mut self, cap: Option<u128>) {
        self.liquidity_cap = cap;
    }

    /// Pull `amount` from `from` (approved to `spender`); returns receipt units minted
    pub fn supply(
        &mut self,
        asset: &mut TokenLedger,
        spender: AccountId,
        from: AccountId,
        amount: u128,
    ) -> Result<u128> {
        let scaled = mul_div_floor(amount, INDEX_ONE, self.index).ok_or(EngineError::Overflow)?;
        let total = checked_add(self.total_scaled, scaled)?;
        asset.transfer_from(spender, from, self.account, amount)?;
        self.total_scaled = total;
        Ok(scaled)
    }

    /// Release `amount` to `to` out of a position of `position_scaled`;
    /// returns receipt units burned
    pub fn redeem(
        &mut self,
        asset: &mut TokenLedger,
        to: AccountId,
        amount: u128,
        position_scaled: u128,
    ) -> Result<u128> {
        let available = self.liquidity(asset);
        if available < amount {
            return Err(EngineError::WithdrawFailed {
                requested: amount,
                available,
            });
        }
        let burned = mul_div_ceil(amount, INDEX_ONE, self.index)
            .ok_or(EngineError::Overflow)?
            .min(position_scaled);
        asset.transfer(self.account, to, amount)?;
        self.total_scaled = self.total_scaled.saturating_sub(burned);
        Ok(burned)
    }

    /// Grow the index by `rate_ppm` and mint the backing cash; returns yield
    pub fn accrue(&mut self, asset: &mut TokenLedger, rate_ppm: u128) -> Result<u128> {
        let before = self.value_of(self.total_scaled);
        let growth = mul_div_floor(self.index, rate_ppm, SCALE).ok_or(EngineError::Overflow)?;
        self.index = checked_add(self.index, growth)?;
        let earned = self.value_of(self.total_scaled).saturating_sub(before);
        asset.mint(self.account, earned)?;
        Ok(earned)
    }

    /// Shrink the index by `loss_ppm` and destroy the lost cash; returns loss
    pub fn impair(&mut self, asset: &mut TokenLedger, loss_ppm: u128) -> Result<u128> {
        let before = self.value_of(self.total_scaled);
        let cut = mul_div_floor(self.index, loss_ppm.min(SCALE), SCALE).ok_or(EngineError::Overflow)?;
        self.index = self.index.saturating_sub(cut).max(1);
        let lost = before.saturating_sub(self.value_of(self.total_scaled));
        let burnable = lost.min(asset.balance_of(&self.account));
        asset.burn(self.account, burnable)?;
        Ok(burnable)
    }
}

/// Receipt-token position inside one reserve
#[derive(Clone, Debug, PartialEq, Eq)]
struct Position {
    reserve: ReserveState,
    scaled: u128,
}

impl Position {
    fn new(reserve: ReserveState) -> Self {
        Self { reserve, scaled: 0 }
    }

    fn value(&self) -> u128 {
        self.reserve.value_of(self.scaled)
    }

    fn deposit(
        &mut self,
        asset: &mut TokenLedger,
        spender: AccountId,
        from: AccountId,
        amount: u128,
    ) -> Result<()> {
        ensure_nonzero(amount)?;
        let minted = self.reserve.supply(asset, spender, from, amount)?;
        self.scaled = checked_add(self.scaled, minted)?;
        Ok(())
    }

    fn withdraw(&mut self, asset: &mut TokenLedger, to: AccountId, amount: u128) -> Result<()> {
        ensure_withdrawable(amount, self.value())?;
        let burned = self.reserve.redeem(asset, to, amount, self.scaled)?;
        self.scaled = self.scaled.saturating_sub(burned);
        Ok(())
    }
}

/// Stock adapter over one lending venue
///
/// Aave positions are a rebasing aToken balance kept as a scaled balance
/// over the liquidity index. Compound cTokens and Moonwell mTokens are
/// receipt units times an exchange rate. Both reduce to receipt units
/// against the reserve index; only the starting index differs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LendingAdapter {
    id: AdapterId,
    venue: VenueKind,
    account: AccountId,
    position: Position,
}

impl LendingAdapter {
    /// Fails with `InvalidConfig` for [`VenueKind::Custom`]
    pub fn new(venue: VenueKind, id: AdapterId) -> Result<Self> {
        let (slug, initial_index) = match venue {
            VenueKind::Aave => ("aave", INDEX_ONE),
            VenueKind::Compound => ("compound", COMPOUND_INITIAL_RATE),
            VenueKind::Moonwell => ("moonwell", COMPOUND_INITIAL_RATE),
            VenueKind::Custom => {
                return Err(EngineError::InvalidConfig(
                    "custom venues have no stock adapter",
                ))
            }
        };
        Ok(Self::build(venue, slug, initial_index, id))
    }

    pub fn aave(id: AdapterId) -> Self {
        Self::build(VenueKind::Aave, "aave", INDEX_ONE, id)
    }

    pub fn compound(id: AdapterId) -> Self {
        Self::build(VenueKind::Compound, "compound", COMPOUND_INITIAL_RATE, id)
    }

    pub fn moonwell(id: AdapterId) -> Self {
        Self::build(VenueKind::Moonwell, "moonwell", COMPOUND_INITIAL_RATE, id)
    }

    fn build(venue: VenueKind, slug: &str, initial_index: u128, id: AdapterId) -> Self {
        Self {
            id,
            venue,
            account: AccountId::derived(&format!("adapter/{}/{}", slug, id.0)),
            position: Position::new(ReserveState::new(
                AccountId::derived(&format!("venue/{}/{}", slug, id.0)),
                initial_index,
            )),
        }
    }

    /// aToken scaled balance, or cToken/mToken count
    pub fn receipt_balance(&self) -> u128 {
        self.position.scaled
    }

    /// Liquidity index or exchange rate, scaled by [`INDEX_ONE`]
    pub fn index(&self) -> u128 {
        self.position.reserve.index()
    }
}

impl YieldAdapter for LendingAdapter {
    fn id(&self) -> AdapterId {
        self.id
    }

    fn venue(&self) -> VenueKind {
        self.venue
    }

    fn account(&self) -> AccountId {
        self.account
    }

    fn deposit(&mut self, asset: &mut TokenLedger, from: AccountId, amount: u128) -> Result<()> {
        self.position.deposit(asset, self.account, from, amount)
    }

    fn withdraw(&mut self, asset: &mut TokenLedger, to: AccountId, amount: u128) -> Result<()> {
        self.position.withdraw(asset, to, amount)
    }

    fn balance(&self) -> u128 {
        self.position.value()
    }

    fn boxed_clone(&self) -> Box<dyn YieldAdapter> {
        Box::new(self.clone())
    }

    fn reserve_mut(&mut self) -> Option<&mut ReserveState> {
        Some(&mut self.position.reserve)
    }
}

/// Build the stock adapter for a venue
pub fn adapter_for(venue: VenueKind, id: AdapterId) -> Result<Box<dyn YieldAdapter>> {
    Ok(Box::new(LendingAdapter::new(venue, id)?))
}
