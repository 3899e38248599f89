//! Snapshot serialization and the persistence seam.
//!
//! The scheduler does not know how a world is saved. It hands its own
//! state and the target path to a `SnapshotWriter`, which owns the
//! save format.

use crate::{
    calendar::{CalendarDate, DayCounter, SnowLine},
    clock::{GameSpeed, SceneMode, TickCounter},
    types::RunId,
};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;

/// Scheduler-owned state that belongs in every save.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerSnapshot {
    pub run_id:              RunId,
    pub ticks:               TickCounter,
    pub day_counter:         DayCounter,
    pub date:                CalendarDate,
    pub snow_line:           SnowLine,
    pub months_in_challenge: u32,
    pub speed:               GameSpeed,
    pub mode:                SceneMode,
}

/// How a save was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveFlags {
    /// Written by the autosave policy rather than the player.
    pub is_autosave:     bool,
    /// Leave open windows alone after saving.
    pub no_window_close: bool,
}

impl SaveFlags {
    pub const AUTOSAVE: SaveFlags = SaveFlags { is_autosave: true, no_window_close: true };
    pub const MANUAL: SaveFlags = SaveFlags { is_autosave: false, no_window_close: false };
}

/// The persistence collaborator.
pub trait SnapshotWriter: Send {
    fn write_snapshot(
        &mut self,
        path: &Path,
        flags: SaveFlags,
        state: &SchedulerSnapshot,
    ) -> std::io::Result<()>;
}

/// Writes the scheduler snapshot as pretty JSON. Used by sim-runner and
/// tests; a real game plugs in its own save codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSnapshotWriter;

#[derive(Serialize)]
struct SaveFile<'a> {
    flags: SaveFlags,
    state: &'a SchedulerSnapshot,
}

impl SnapshotWriter for JsonSnapshotWriter {
    fn write_snapshot(
        &mut self,
        path: &Path,
        flags: SaveFlags,
        state: &SchedulerSnapshot,
    ) -> std::io::Result<()> {
        let json = serde_json::to_vec_pretty(&SaveFile { flags, state })?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(&json)?;
        file.sync_all()
    }
}
