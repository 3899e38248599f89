//! Shared primitive types used across the entire scheduler.

use serde::{Deserialize, Serialize};

/// A logic tick number. Tick 0 is the scenario start; the first
/// executed tick is tick 1.
pub type Tick = u32;

/// Stable index of a simulated entity (vehicle, effect, ...).
pub type EntityId = u32;

/// The canonical run identifier.
pub type RunId = String;

/// Generate a fresh run identifier.
pub fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}

/// World-space position of an entity, in map units.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Position {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Linear blend towards `to`. `alpha` is clamped to [0, 1].
    pub fn lerp(self, to: Position, alpha: f32) -> Position {
        let a = alpha.clamp(0.0, 1.0);
        let blend = |from: i32, to: i32| -> i32 {
            (from as f32 + (to - from) as f32 * a).round() as i32
        };
        Position {
            x: blend(self.x, to.x),
            y: blend(self.y, to.y),
            z: blend(self.z, to.z),
        }
    }
}

/// An entity's position as reported by a subsystem.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntityPosition {
    pub id:       EntityId,
    pub position: Position,
}
