//! Keeper tick: phase tracking, severity feed, scheduled actions, events

use anyhow::{Context, Result};
use tranche_engine::{adapter_for, AdapterId, Phase, TrancheEngine};

use crate::actions::execute;
use crate::clock::Clock;
use crate::config::KeeperConfig;
use crate::schedule::ActionQueue;
use crate::solvency::{assess, SolvencyReport};

/// Id the initial adapter is registered under
pub const INITIAL_ADAPTER_ID: AdapterId = AdapterId(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Running,
    /// Schedule exhausted and final claims open
    Done,
}

pub struct Keeper {
    engine: TrancheEngine,
    schedule: ActionQueue,
    clock: Clock,
    severity_feed: Option<u128>,
    last_phase: Option<Phase>,
    last_now: u64,
}

impl Keeper {
    pub fn new(config: KeeperConfig) -> Result<Self> {
        let clock = Clock::new(config.start_ts, config.time_warp_secs);
        let mut engine = TrancheEngine::new(config.engine).context("Invalid engine config")?;

        let adapter = adapter_for(config.initial_adapter, INITIAL_ADAPTER_ID)
            .context("Unsupported initial adapter")?;
        let admin = engine.config().admin;
        let record = engine
            .add_adapter(admin, adapter, clock.now())
            .context("Failed to activate initial adapter")?;
        log::info!("Pool deployed to {} ({:?})", record.adapter_id, record.venue);

        Ok(Self {
            engine,
            schedule: config.actions.into_iter().collect(),
            clock,
            severity_feed: config.severity_ppm.map(u128::from),
            last_phase: None,
            last_now: clock.now(),
        })
    }

    pub fn engine(&self) -> &TrancheEngine {
        &self.engine
    }

    pub fn pending_actions(&self) -> usize {
        self.schedule.len()
    }

    pub fn report(&self) -> SolvencyReport {
        assess(&self.engine, self.last_now, self.severity_feed)
    }

    pub fn tick(&mut self) -> Progress {
        let now = self.clock.tick();
        self.last_now = now;
        let phase = self.engine.phase(now);

        self.observe_phase(phase);
        if phase == Phase::SettlementGap {
            self.declare_severity(now);
        }

        for scheduled in self.schedule.drain_due(now) {
            match execute(&mut self.engine, &scheduled.action, now) {
                Ok(outcome) => log::info!("{} (due {}): {}", scheduled.action.name(), scheduled.at, outcome),
                Err(e) => log::warn!("{}", e),
            }
        }

        self.publish_events();

        if self.schedule.is_empty() && phase == Phase::FinalClaim {
            Progress::Done
        } else {
            if let Some(next) = self.schedule.next_due_at() {
                log::debug!("{} actions pending, next due at {}", self.schedule.len(), next);
            }
            Progress::Running
        }
    }

    fn observe_phase(&mut self, phase: Phase) {
        if self.last_phase == Some(phase) {
            return;
        }
        match self.last_phase {
            Some(prev) => log::info!("Phase {} -> {}", prev, phase),
            None => log::info!("Starting in phase {}", phase),
        }
        if phase >= Phase::SeniorClaim && self.engine.recovery_snapshot().is_none() {
            log::warn!("Claims open without a declared severity; first claim freezes 0");
        }
        self.last_phase = Some(phase);

        let report = self.report();
        if report.is_short() {
            log::warn!("{}", report);
        } else {
            log::info!("{}", report);
        }
    }

    fn declare_severity(&mut self, now: u64) {
        let Some(severity) = self.severity_feed else {
            return;
        };
        if self.engine.recovery_snapshot().is_some() {
            return;
        }
        let reporter = self.engine.config().reporter;
        if let Err(e) = self.engine.declare_severity(reporter, severity, now) {
            log::error!("Severity declaration failed: {}", e);
            // one attempt per cycle
            self.severity_feed = None;
        }
    }

    fn publish_events(&mut self) {
        for event in self.engine.drain_events() {
            match serde_json::to_string(&event) {
                Ok(json) => log::info!("event {}", json),
                Err(e) => log::warn!("Unserializable event {:?}: {}", event, e),
            }
        }
    }
}
