//! Tranche settlement engine
//!
//! Splits pooled principal into paired senior ("AAA") and junior ("AA")
//! tranche tokens, keeps the pool in a swappable yield adapter, freezes a
//! recovery curve from a declared loss severity and pays claims against it.
//! Every mutating entry point on [`TrancheEngine`] is all-or-nothing.

pub mod math;
pub mod error;
pub mod account;
pub mod token;
pub mod phase;
pub mod ledger;
pub mod adapter;
pub mod venues;
pub mod registry;
pub mod recovery;
pub mod claims;
pub mod events;
pub mod config;
pub mod engine;
pub mod helpers;

pub use account::*;
pub use adapter::*;
pub use claims::*;
pub use config::*;
pub use engine::*;
pub use error::*;
pub use events::*;
pub use ledger::*;
pub use phase::*;
pub use recovery::*;
pub use registry::*;
pub use token::*;
pub use venues::*;
