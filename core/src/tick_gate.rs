//! Network tick gating.
//!
//! Every participant must execute identical ticks in identical order.
//! The gate withholds any tick the session authority has not sanctioned
//! yet and bounds how fast a lagging client replays.

use crate::{
    error::{SimError, SimResult},
    types::Tick,
};

/// The scheduler's view of the multiplayer session.
pub trait NetworkSession: Send {
    fn is_networked(&self) -> bool;

    /// How many ticks past the local counter are currently safe to run.
    /// Negative means the local simulation is ahead of the authority.
    fn authoritative_tick_budget(&self) -> i64;

    /// Hand the commands queued for `tick` to the session for execution.
    fn submit_commands_for_tick(&mut self, tick: Tick);
}

/// Single-player: every tick is authorized.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineSession;

impl NetworkSession for OfflineSession {
    fn is_networked(&self) -> bool { false }
    fn authoritative_tick_budget(&self) -> i64 { i64::MAX }
    fn submit_commands_for_tick(&mut self, _tick: Tick) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateMode {
    Unsynchronized,
    Networked,
}

#[derive(Debug, Clone)]
pub struct TickGate {
    mode:               GateMode,
    catch_up_threshold: u32,
    /// Highest tick number the last observation allowed.
    authorized_through: i64,
}

impl TickGate {
    pub fn new(mode: GateMode, catch_up_threshold: u32) -> Self {
        Self { mode, catch_up_threshold, authorized_through: 0 }
    }

    pub fn mode(&self) -> GateMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: GateMode) {
        self.mode = mode;
    }

    pub fn catch_up_threshold(&self) -> u32 {
        self.catch_up_threshold
    }

    pub fn authorized_through(&self) -> i64 {
        self.authorized_through
    }

    /// Take in the session's current budget relative to `local`.
    /// A negative budget while networked is a desynchronization.
    pub fn observe(&mut self, local: Tick, budget: i64) -> SimResult<()> {
        if self.mode == GateMode::Networked && budget < 0 {
            return Err(SimError::Desynchronized {
                local,
                authoritative: local as i64 + budget,
            });
        }
        self.authorized_through = (local as i64).saturating_add(budget);
        Ok(())
    }

    pub fn should_process_tick(&self, candidate: Tick) -> bool {
        match self.mode {
            GateMode::Unsynchronized => true,
            GateMode::Networked => (candidate as i64) <= self.authorized_through,
        }
    }

    /// Apply the catch-up rule to a step's requested tick count. When the
    /// local counter trails by more than the threshold, the step runs
    /// exactly the threshold.
    pub fn bound_updates(&self, requested: u32, ticks_behind: i64) -> u32 {
        if self.mode == GateMode::Networked && ticks_behind > self.catch_up_threshold as i64 {
            self.catch_up_threshold
        } else {
            requested
        }
    }
}
