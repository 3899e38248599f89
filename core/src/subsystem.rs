//! Subsystem trait and execution slots.
//!
//! RULE: Every subsystem implements SimSubsystem.
//! The scheduler calls update() on each registered subsystem once per
//! authorized tick, in SubsystemSlot order. Registration order only
//! matters between subsystems sharing a slot.

use serde::{Deserialize, Serialize};

use crate::{
    calendar::CalendarDate,
    clock::SceneMode,
    error::TickResult,
    event::DeferredError,
    rng::SubsystemRng,
    types::{EntityPosition, Tick},
};

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per authorized tick.
    ///
    /// Returning `Err(TickInterrupt)` abandons the rest of the tick. The
    /// subsystem must leave the world in a valid state before doing so.
    fn update(&mut self, ctx: &mut TickContext<'_>) -> TickResult;

    /// Called for each calendar boundary the tick crossed.
    fn on_calendar(&mut self, _event: CalendarEvent, _ctx: &mut TickContext<'_>) -> TickResult {
        Ok(())
    }

    /// Periodic index maintenance, run before the calendar check.
    fn compact(&mut self, _tick: Tick) {}

    /// Report entity positions for interpolation.
    fn entity_positions(&self, _out: &mut Vec<EntityPosition>) {}

    /// For downcasting in tests and tooling only.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Fixed execution order of a tick. Later slots may read what earlier
/// slots wrote during the same tick.
///
/// NEVER reorder: the discriminant is also the RNG stream index, and
/// every networked peer must run this exact sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u64)]
pub enum SubsystemSlot {
    World = 0,    // tile maintenance
    Ambient = 1,  // waves, animations
    Town = 2,
    Industry = 3,
    Vehicle = 4,
    Station = 5,
    Effects = 6,
    Company = 7,
    Audio = 8,
    Title = 9,
}

impl SubsystemSlot {
    pub const ALL: [SubsystemSlot; 10] = [
        Self::World,
        Self::Ambient,
        Self::Town,
        Self::Industry,
        Self::Vehicle,
        Self::Station,
        Self::Effects,
        Self::Company,
        Self::Audio,
        Self::Title,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::World => "world",
            Self::Ambient => "ambient",
            Self::Town => "town",
            Self::Industry => "industry",
            Self::Vehicle => "vehicle",
            Self::Station => "station",
            Self::Effects => "effects",
            Self::Company => "company",
            Self::Audio => "audio",
            Self::Title => "title",
        }
    }
}

/// Calendar boundaries, in the order they are delivered within a tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CalendarEvent {
    Day,
    Month,
    /// Monthly economy update. Not delivered after the cutoff year.
    EconomyMonth,
    /// January, April, July and October.
    Quarter,
    Year,
    /// Late daily bookkeeping, after any monthly cascade.
    DayClosed,
}

/// What a subsystem sees during one hook call.
pub struct TickContext<'a> {
    pub tick: Tick,
    pub date: CalendarDate,
    pub mode: SceneMode,
    pub rng:  SubsystemRng,
    deferred: &'a mut Vec<DeferredError>,
}

impl<'a> TickContext<'a> {
    pub fn new(
        tick: Tick,
        date: CalendarDate,
        mode: SceneMode,
        rng: SubsystemRng,
        deferred: &'a mut Vec<DeferredError>,
    ) -> Self {
        Self { tick, date, mode, rng, deferred }
    }

    /// Queue an error for the presentation layer. It is surfaced once
    /// the tick finishes, never in the middle of the sequence.
    pub fn defer_error(&mut self, error: DeferredError) {
        self.deferred.push(error);
    }
}
