//! Engine error taxonomy
//!
//! Every rejected precondition has its own variant so callers can branch on
//! cause. No variant is retried internally.

use core::fmt;
use thiserror::Error;

use crate::adapter::AdapterId;
use crate::phase::Phase;

/// Operation names used in phase and authorization errors
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Split,
    AddAdapter,
    DeclareSeverity,
    ClaimSenior,
    ClaimJunior,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Split => "split",
            Operation::AddAdapter => "add_adapter",
            Operation::DeclareSeverity => "declare_severity",
            Operation::ClaimSenior => "claim AAA",
            Operation::ClaimJunior => "claim AA",
        };
        f.write_str(name)
    }
}

/// Which half of an adapter migration failed
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MigrationLeg {
    /// Pulling the full balance out of the outgoing adapter
    Withdraw,
    /// Placing that balance into the incoming adapter
    Deposit,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("{op} is not allowed during the {phase} phase")]
    PhaseViolation { op: Operation, phase: Phase },

    #[error("amount must be greater than zero")]
    AmountTooLow,

    #[error("amount {amount} is not a multiple of the split granularity {granularity}")]
    InvalidGranularity { amount: u128, granularity: u128 },

    #[error("insufficient balance: needed {needed}, available {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    #[error("insufficient allowance: needed {needed}, approved {approved}")]
    InsufficientAllowance { needed: u128, approved: u128 },

    #[error("adapter withdraw of {requested} failed, {available} withdrawable")]
    WithdrawFailed { requested: u128, available: u128 },

    #[error("adapter migration failed during {leg:?}")]
    MigrationFailed {
        leg: MigrationLeg,
        #[source]
        source: Box<EngineError>,
    },

    #[error("pool cannot cover payout {requested}, live balance is {available}")]
    InsufficientPoolFunds { requested: u128, available: u128 },

    #[error("caller is not authorized to {0}")]
    Unauthorized(Operation),

    #[error("severity {0} ppm is outside [0, 1_000_000]")]
    InvalidSeverity(u128),

    #[error("loss severity has already been frozen")]
    SeverityAlreadyDeclared,

    #[error("no yield adapter is active")]
    NoActiveAdapter,

    #[error("adapter {0} is already registered")]
    AdapterAlreadyRegistered(AdapterId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    #[error("arithmetic overflow")]
    Overflow,
}

impl EngineError {
    /// True for failures the caller can fix by waiting or changing input
    pub fn is_caller_recoverable(&self) -> bool {
        matches!(
            self,
            EngineError::PhaseViolation { .. }
                | EngineError::AmountTooLow
                | EngineError::InvalidGranularity { .. }
                | EngineError::InsufficientBalance { .. }
                | EngineError::InsufficientAllowance { .. }
        )
    }
}

pub type Result<T> = core::result::Result<T, EngineError>;
