use thiserror::Error;

use crate::types::Tick;

#[derive(Error, Debug)]
pub enum SimError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// The local simulation is ahead of what the session authority has
    /// sanctioned. Peers can no longer be assumed to share state.
    #[error("Desynchronized: local tick {local}, authoritative tick {authoritative}")]
    Desynchronized { local: Tick, authoritative: i64 },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type SimResult<T> = Result<T, SimError>;

/// Raised by a subsystem hook to abandon the rest of the current tick.
///
/// Control flow, not a `SimError`: caught only at the scheduler's step
/// boundary and never terminates the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("tick interrupted: {reason}")]
pub struct TickInterrupt {
    pub reason:    String,
    /// Name of the subsystem that raised it. Filled in by the scheduler.
    pub subsystem: Option<&'static str>,
}

impl TickInterrupt {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into(), subsystem: None }
    }

    pub(crate) fn raised_by(mut self, subsystem: &'static str) -> Self {
        self.subsystem.get_or_insert(subsystem);
        self
    }
}

/// Result type of every subsystem hook.
pub type TickResult = Result<(), TickInterrupt>;
