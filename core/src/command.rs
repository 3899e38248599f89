use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::clock::{GameSpeed, SceneMode};

/// Operator commands the scheduler applies between frames.
/// Variants are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "cmd", rename_all = "snake_case")]
pub enum ControlCommand {
    // ── Clock control ─────────────────────────────
    Pause,
    Resume,
    SetSpeed { speed: GameSpeed },

    // ── Scene ─────────────────────────────────────
    SetMode { mode: SceneMode },
    NewScenario,

    // ── Persistence ───────────────────────────────
    SaveGame { path: PathBuf },
}
