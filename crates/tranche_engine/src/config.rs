//! Deployment configuration
//!
//! Supplied once when the engine is built and immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{EngineError, Result};
use crate::phase::PhaseBoundaries;

/// Default split granularity (two tranches plus an operational reserve)
pub const DEFAULT_SPLIT_GRANULARITY: u64 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// S, T1, T2, T3
    pub boundaries: PhaseBoundaries,

    /// `split` amounts must be a multiple of this (1 disables the check)
    #[serde(default = "default_granularity")]
    pub split_granularity: u64,

    /// Only account allowed to declare loss severity
    pub reporter: AccountId,

    /// Only account allowed to add or replace yield adapters
    pub admin: AccountId,

    #[serde(default = "default_asset_symbol")]
    pub asset_symbol: String,

    #[serde(default = "default_asset_decimals")]
    pub asset_decimals: u8,
}

fn default_granularity() -> u64 {
    DEFAULT_SPLIT_GRANULARITY
}

fn default_asset_symbol() -> String {
    "USDC".to_string()
}

fn default_asset_decimals() -> u8 {
    6
}

impl EngineConfig {
    pub fn new(boundaries: PhaseBoundaries, reporter: AccountId, admin: AccountId) -> Self {
        Self {
            boundaries,
            split_granularity: DEFAULT_SPLIT_GRANULARITY,
            reporter,
            admin,
            asset_symbol: default_asset_symbol(),
            asset_decimals: default_asset_decimals(),
        }
    }

    pub fn with_granularity(mut self, granularity: u64) -> Self {
        self.split_granularity = granularity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        self.boundaries.validate()?;
        if self.split_granularity == 0 {
            return Err(EngineError::InvalidConfig("split_granularity must be at least 1"));
        }
        if self.asset_symbol.is_empty() {
            return Err(EngineError::InvalidConfig("asset_symbol must not be empty"));
        }
        Ok(())
    }
}
