//! Ledger events and deferred presentation errors.
//!
//! RULE: The scheduler records what it decided, not what subsystems did.
//! Two runs with the same seed and inputs must produce identical ledgers.

use crate::{
    calendar::CalendarDate,
    types::{RunId, Tick},
};
use serde::{Deserialize, Serialize};

/// Every scheduler decision worth auditing.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    RunInitialized {
        run_id: RunId,
        seed:   u64,
    },
    TickStarted {
        tick:      Tick,
        secondary: Tick,
        rng_seed:  u64,
    },
    TickInterrupted {
        tick:      Tick,
        subsystem: Option<String>,
        reason:    String,
    },
    DayChanged {
        tick: Tick,
        date: CalendarDate,
    },
    MonthChanged {
        tick:                Tick,
        date:                CalendarDate,
        months_in_challenge: u32,
    },
    QuarterChanged {
        tick: Tick,
        date: CalendarDate,
    },
    YearChanged {
        tick: Tick,
        date: CalendarDate,
    },
    AutosaveWritten {
        tick: Tick,
        path: String,
    },
    AutosaveFailed {
        tick:   Tick,
        reason: String,
    },
    AutosavePruned {
        tick: Tick,
        path: String,
    },
    GameSaved {
        tick: Tick,
        path: String,
    },
}

impl SimEvent {
    /// Stable name for the event_type column of the ledger.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::RunInitialized { .. }  => "run_initialized",
            SimEvent::TickStarted { .. }     => "tick_started",
            SimEvent::TickInterrupted { .. } => "tick_interrupted",
            SimEvent::DayChanged { .. }      => "day_changed",
            SimEvent::MonthChanged { .. }    => "month_changed",
            SimEvent::QuarterChanged { .. }  => "quarter_changed",
            SimEvent::YearChanged { .. }     => "year_changed",
            SimEvent::AutosaveWritten { .. } => "autosave_written",
            SimEvent::AutosaveFailed { .. }  => "autosave_failed",
            SimEvent::AutosavePruned { .. }  => "autosave_pruned",
            SimEvent::GameSaved { .. }       => "game_saved",
        }
    }
}

/// An event as stored in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub tick:       Tick,
    pub source:     String,
    pub event_type: String,
    pub payload:    String,
}

/// A problem raised during a tick that the player has to be told about.
/// Queued by subsystems and handed to the presenter after the tick.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeferredError {
    /// Objects referenced by a loaded game could not be found.
    ObjectLoad { tick: Tick, missing: Vec<String> },
    /// A load failed outright; `title` names the failure.
    LoadFailed { tick: Tick, title: String },
}
