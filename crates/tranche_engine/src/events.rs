//! Events emitted by committed operations
//!
//! Events are recorded into the staged state of a transaction, so a failed
//! operation emits nothing. Phase crossings are derived from time and are
//! never emitted.

use serde::Serialize;

use crate::account::AccountId;
use crate::adapter::{AdapterId, VenueKind};
use crate::ledger::Tranche;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    Split {
        holder: AccountId,
        principal: u128,
    },
    /// Successful adapter deposit
    Deposited {
        adapter: AdapterId,
        asset: String,
        amount: u128,
    },
    /// Successful adapter withdrawal
    Withdrawn {
        adapter: AdapterId,
        asset: String,
        amount: u128,
    },
    AdapterActivated {
        adapter: AdapterId,
        venue: VenueKind,
        at: u64,
    },
    AdapterMigrated {
        from: AdapterId,
        to: AdapterId,
        amount: u128,
        at: u64,
    },
    SeverityFrozen {
        severity_ppm: u128,
        declared_by: Option<AccountId>,
        at: u64,
    },
    Claimed {
        holder: AccountId,
        tranche: Tranche,
        burned: u128,
        payout: u128,
    },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<EngineEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: EngineEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EngineEvent> {
        self.events.iter()
    }

    /// Drop events recorded after the first `len`
    pub fn truncate(&mut self, len: usize) {
        self.events.truncate(len);
    }

    pub fn drain(&mut self) -> Vec<EngineEvent> {
        core::mem::take(&mut self.events)
    }
}
