//! Yield adapter capability
//!
//! A uniform deposit/withdraw/balance contract over an external yield venue.
//! Every call into an adapter crosses a trust boundary: callers finish all
//! internal bookkeeping before invoking one.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{EngineError, Result};
use crate::token::TokenLedger;
use crate::venues::ReserveState;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AdapterId(pub u32);

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "adapter#{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueKind {
    Aave,
    Compound,
    Moonwell,
    /// Anything outside the three supported lending venues
    Custom,
}

/// Deposit/withdraw/balance over an external venue
///
/// Contract shared by every implementation:
/// - `deposit(0)` and `withdraw(0)` fail with `AmountTooLow`
/// - `deposit` pulls principal with `transfer_from`, so the payer must have
///   approved [`YieldAdapter::account`] beforehand
/// - `withdraw` fails with `WithdrawFailed` when the position or the venue's
///   liquidity cannot cover the amount
/// - `balance` is read live from the venue and includes accrued yield
pub trait YieldAdapter: fmt::Debug {
    fn id(&self) -> AdapterId;

    fn venue(&self) -> VenueKind;

    /// Address the adapter acts as on the principal ledger
    fn account(&self) -> AccountId;

    fn deposit(&mut self, asset: &mut TokenLedger, from: AccountId, amount: u128) -> Result<()>;

    fn withdraw(&mut self, asset: &mut TokenLedger, to: AccountId, amount: u128) -> Result<()>;

    fn balance(&self) -> u128;

    fn boxed_clone(&self) -> Box<dyn YieldAdapter>;

    /// Venue state for yield/loss simulation, if the adapter exposes one
    fn reserve_mut(&mut self) -> Option<&mut ReserveState> {
        None
    }
}

impl Clone for Box<dyn YieldAdapter> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

pub fn ensure_nonzero(amount: u128) -> Result<()> {
    if amount == 0 {
        return Err(EngineError::AmountTooLow);
    }
    Ok(())
}

/// Shared `withdraw` precondition against the adapter's own position
pub fn ensure_withdrawable(requested: u128, position_value: u128) -> Result<()> {
    ensure_nonzero(requested)?;
    if position_value < requested {
        return Err(EngineError::WithdrawFailed {
            requested,
            available: position_value,
        });
    }
    Ok(())
}
