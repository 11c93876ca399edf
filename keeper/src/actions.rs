//! Executes scheduled actions against the engine

use std::fmt;

use thiserror::Error;
use tranche_engine::{
    adapter_for, AdapterId, AdapterRecord, ClaimReceipt, EngineError, SplitReceipt, TrancheEngine,
};

use crate::config::Action;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{action} rejected: {source}")]
    Rejected {
        action: &'static str,
        #[source]
        source: EngineError,
    },
}

/// What a successful action did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Funded { amount: u128 },
    Split(SplitReceipt),
    Transferred { amount: u128 },
    Migrated(AdapterRecord),
    Accrued { earned: u128 },
    Impaired { lost: u128 },
    Claimed(Vec<ClaimReceipt>),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Funded { amount } => write!(f, "funded {}", amount),
            Outcome::Split(r) => write!(f, "split {} for {}", r.senior_minted, r.holder),
            Outcome::Transferred { amount } => write!(f, "transferred {}", amount),
            Outcome::Migrated(r) => write!(
                f,
                "{} ({:?}) active with {}",
                r.adapter_id, r.venue, r.custody_balance_at_activation
            ),
            Outcome::Accrued { earned } => write!(f, "venue earned {}", earned),
            Outcome::Impaired { lost } => write!(f, "venue lost {}", lost),
            Outcome::Claimed(receipts) => {
                let burned: u128 = receipts.iter().map(|r| r.burned).sum();
                let paid: u128 = receipts.iter().map(|r| r.payout).sum();
                write!(f, "burned {} paid {}", burned, paid)
            }
        }
    }
}

impl Action {
    pub fn name(&self) -> &'static str {
        match self {
            Action::Fund { .. } => "fund",
            Action::Split { .. } => "split",
            Action::Transfer { .. } => "transfer",
            Action::Migrate { .. } => "migrate",
            Action::Accrue { .. } => "accrue",
            Action::Impair { .. } => "impair",
            Action::Claim { .. } => "claim",
            Action::ClaimAll { .. } => "claim_all",
        }
    }
}

/// Run one action at `now`; migrations are signed by the configured admin
pub fn execute(engine: &mut TrancheEngine, action: &Action, now: u64) -> Result<Outcome, ActionError> {
    let rejected = |source: EngineError| ActionError::Rejected {
        action: action.name(),
        source,
    };

    match *action {
        Action::Fund { account, amount } => {
            let amount = u128::from(amount);
            let custody = engine.custody_account();
            let asset = engine.asset_mut();
            asset.mint(account, amount).map_err(rejected)?;
            let approved = asset.allowance(&account, &custody).saturating_add(amount);
            asset.approve(account, custody, approved);
            Ok(Outcome::Funded { amount })
        }
        Action::Split { holder, amount } => engine
            .split(holder, u128::from(amount), now)
            .map(Outcome::Split)
            .map_err(rejected),
        Action::Transfer {
            tranche,
            from,
            to,
            amount,
        } => {
            let amount = u128::from(amount);
            engine
                .transfer_tranche(tranche, from, to, amount)
                .map_err(rejected)?;
            Ok(Outcome::Transferred { amount })
        }
        Action::Migrate { venue, adapter_id } => {
            let adapter = adapter_for(venue, AdapterId(adapter_id)).map_err(rejected)?;
            let admin = engine.config().admin;
            engine
                .add_adapter(admin, adapter, now)
                .map(Outcome::Migrated)
                .map_err(rejected)
        }
        Action::Accrue { rate_ppm } => engine
            .with_active_reserve(|reserve, asset| reserve.accrue(asset, u128::from(rate_ppm)))
            .map(|earned| Outcome::Accrued { earned })
            .map_err(rejected),
        Action::Impair { loss_ppm } => engine
            .with_active_reserve(|reserve, asset| reserve.impair(asset, u128::from(loss_ppm)))
            .map(|lost| Outcome::Impaired { lost })
            .map_err(rejected),
        Action::Claim {
            holder,
            tranche,
            amount,
        } => {
            let amount = match amount {
                Some(a) => u128::from(a),
                None => engine.tranche(tranche).balance_of(&holder),
            };
            engine
                .claim(holder, tranche, amount, now)
                .map(|r| Outcome::Claimed(vec![r]))
                .map_err(rejected)
        }
        Action::ClaimAll { holder } => engine
            .claim_all(holder, now)
            .map(Outcome::Claimed)
            .map_err(rejected),
    }
}
