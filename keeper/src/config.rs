//! Keeper configuration

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tranche_engine::{AccountId, EngineConfig, PhaseBoundaries, Tranche, VenueKind};

const HOUR: u64 = 3_600;
const DAY: u64 = 24 * HOUR;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Polling interval in seconds
    pub poll_interval_secs: u64,

    /// Simulated seconds per tick (0 = follow the wall clock)
    pub time_warp_secs: u64,

    /// Simulated clock start (unix seconds); ignored on the wall clock
    pub start_ts: u64,

    /// Venue the pool is deployed to before the first tick
    pub initial_adapter: VenueKind,

    /// Loss severity to declare once the settlement gap opens (ppm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity_ppm: Option<u64>,

    pub engine: EngineConfig,

    #[serde(default)]
    pub actions: Vec<ScheduledAction>,
}

/// One action due at `at` (unix seconds)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAction {
    pub at: u64,
    #[serde(flatten)]
    pub action: Action,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Mint principal to `account` and approve the engine for it
    Fund { account: AccountId, amount: u64 },
    Split { holder: AccountId, amount: u64 },
    Transfer {
        tranche: Tranche,
        from: AccountId,
        to: AccountId,
        amount: u64,
    },
    /// Register a new adapter, migrating the pool into it
    Migrate { venue: VenueKind, adapter_id: u32 },
    /// Grow the active venue index
    Accrue { rate_ppm: u64 },
    /// Shrink the active venue index
    Impair { loss_ppm: u64 },
    /// Redeem `amount` (whole balance when absent)
    Claim {
        holder: AccountId,
        tranche: Tranche,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<u64>,
    },
    ClaimAll { holder: AccountId },
}

impl KeeperConfig {
    /// Load configuration from TOML file
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("KEEPER_CONFIG")
            .unwrap_or_else(|_| "keeper-config.toml".to_string());
        Self::load_from(&config_path)
    }

    pub fn load_from(path: &str) -> Result<Self> {
        let expanded = shellexpand::tilde(path);
        let config_str = std::fs::read_to_string(expanded.as_ref())
            .context(format!("Failed to read config file: {}", path))?;

        let config: KeeperConfig = toml::from_str(&config_str)
            .context("Failed to parse config TOML")?;
        config
            .engine
            .validate()
            .context(format!("Invalid engine config in {}", path))?;

        Ok(config)
    }

    /// Nine-day demo cycle with two depositors, a migration and a 10% loss
    pub fn default_demo() -> Self {
        let start = 1_700_000_000;
        let boundaries = PhaseBoundaries {
            issuance_end: start + 2 * DAY,
            insurance_end: start + 7 * DAY,
            settlement_end: start + 8 * DAY,
            senior_claim_end: start + 9 * DAY,
        };
        let keeper = AccountId::derived("keeper");
        let alice = AccountId::derived("alice");
        let bob = AccountId::derived("bob");
        let carol = AccountId::derived("carol");

        let due = |at: u64, action: Action| ScheduledAction { at, action };
        let actions = vec![
            due(start, Action::Fund { account: alice, amount: 600_000 }),
            due(start, Action::Fund { account: bob, amount: 300_000 }),
            due(start + HOUR, Action::Split { holder: alice, amount: 600_000 }),
            due(start + HOUR, Action::Split { holder: bob, amount: 300_000 }),
            due(
                start + DAY,
                Action::Transfer {
                    tranche: Tranche::Junior,
                    from: alice,
                    to: carol,
                    amount: 100_000,
                },
            ),
            due(boundaries.issuance_end + DAY, Action::Accrue { rate_ppm: 20_000 }),
            due(
                boundaries.issuance_end + 2 * DAY,
                Action::Migrate { venue: VenueKind::Compound, adapter_id: 2 },
            ),
            due(boundaries.issuance_end + 3 * DAY, Action::Impair { loss_ppm: 100_000 }),
            due(
                boundaries.settlement_end + HOUR,
                Action::Claim { holder: alice, tranche: Tranche::Senior, amount: None },
            ),
            due(boundaries.senior_claim_end + HOUR, Action::ClaimAll { holder: carol }),
            due(boundaries.senior_claim_end + HOUR, Action::ClaimAll { holder: bob }),
        ];

        Self {
            poll_interval_secs: 1,
            time_warp_secs: 6 * HOUR,
            start_ts: start,
            initial_adapter: VenueKind::Aave,
            severity_ppm: Some(100_000),
            engine: EngineConfig::new(boundaries, keeper, keeper),
            actions,
        }
    }

    /// Write default config to file
    pub fn write_default(path: &str) -> Result<()> {
        let config = Self::default_demo();
        let toml_str = toml::to_string_pretty(&config)
            .context("Failed to serialize config")?;

        std::fs::write(path, toml_str)
            .context(format!("Failed to write config to {}", path))?;

        log::info!("Created default config at {}", path);
        Ok(())
    }
}
