//! Tick clock: wall time, or simulated time advanced a fixed step per tick

use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    Wall,
    Simulated { next: u64, step: u64 },
}

impl Clock {
    pub fn new(start_ts: u64, time_warp_secs: u64) -> Self {
        if time_warp_secs == 0 {
            Clock::Wall
        } else {
            Clock::Simulated {
                next: start_ts,
                step: time_warp_secs,
            }
        }
    }

    /// Time the next tick will observe
    pub fn now(&self) -> u64 {
        match *self {
            Clock::Wall => wall_secs(),
            Clock::Simulated { next, .. } => next,
        }
    }

    /// Current time for this tick, then advance
    pub fn tick(&mut self) -> u64 {
        match self {
            Clock::Wall => wall_secs(),
            Clock::Simulated { next, step } => {
                let now = *next;
                *next = next.saturating_add(*step);
                now
            }
        }
    }
}

fn wall_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
