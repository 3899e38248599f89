//! Simulation clock: accumulator bookkeeping, tick counters, speed
//! control, and pause.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::types::Tick;

/// Upper bound of `SimClock::ms_since_last_tick`.
pub const MAX_MS_SINCE_LAST_TICK: u16 = 500;

/// Real-time bookkeeping for the scheduler. Owned by `TickScheduler`
/// and mutated only from `TickScheduler::frame`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub accumulator:        Duration,
    pub last_update:        Option<Duration>,
    pub last_tick_time:     Duration,
    pub ms_since_last_tick: u16,
    pub speed:              GameSpeed,
    pub paused:             bool,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit the wall time elapsed since the previous frame, clamped to
    /// `max_delta`. The first call only establishes the reference point.
    /// Returns the credited amount.
    pub fn accumulate(&mut self, now: Duration, max_delta: Duration) -> Duration {
        let credited = match self.last_update {
            Some(last) => now.saturating_sub(last).min(max_delta),
            None => {
                self.last_tick_time = now;
                Duration::ZERO
            }
        };
        self.last_update = Some(now);
        self.accumulator += credited;
        credited
    }

    /// Consume one period from the accumulator if a whole one is available.
    pub fn try_consume(&mut self, period: Duration) -> bool {
        if self.accumulator >= period {
            self.accumulator -= period;
            true
        } else {
            false
        }
    }

    /// Record the start of a scheduler step and return the milliseconds
    /// since the previous one, bounded by `MAX_MS_SINCE_LAST_TICK`.
    pub fn mark_step(&mut self, now: Duration) -> u16 {
        let gap = now.saturating_sub(self.last_tick_time).as_millis();
        self.ms_since_last_tick = gap.min(MAX_MS_SINCE_LAST_TICK as u128) as u16;
        self.last_tick_time = now;
        self.ms_since_last_tick
    }

    /// Fraction of a period sitting in the accumulator, in [0, 1].
    pub fn alpha(&self, period: Duration) -> f32 {
        if period.is_zero() {
            return 1.0;
        }
        (self.accumulator.as_secs_f64() / period.as_secs_f64()).min(1.0) as f32
    }

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn set_speed(&mut self, speed: GameSpeed) {
        self.speed = speed;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameSpeed {
    #[default]
    Normal,      // 1 logic tick per update
    FastForward, // 3
    SuperFast,   // 9
}

impl GameSpeed {
    pub fn multiplier(self) -> u32 {
        match self {
            GameSpeed::Normal      => 1,
            GameSpeed::FastForward => 3,
            GameSpeed::SuperFast   => 9,
        }
    }
}

/// Which scene the simulation is running under.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SceneMode {
    /// Title screen demo world; nothing it does is persisted.
    Title,
    /// Scenario editor; the calendar does not run.
    Editor,
    #[default]
    Playing,
}

impl SceneMode {
    pub fn is_gameplay(self) -> bool {
        self == SceneMode::Playing
    }
}

/// Ticks since scenario start. Both counters move together, once per
/// authorized tick; only a new scenario resets them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TickCounter {
    pub primary:   Tick,
    pub secondary: Tick,
}

impl TickCounter {
    /// The tick number the next authorized tick will carry.
    pub fn next(&self) -> Tick {
        self.primary.wrapping_add(1)
    }

    pub fn advance(&mut self) -> Tick {
        self.primary = self.primary.wrapping_add(1);
        self.secondary = self.secondary.wrapping_add(1);
        self.primary
    }
}

/// Where the scheduler reads wall-clock time from.
pub trait TimeSource: Send {
    /// Monotonic time since an arbitrary fixed origin.
    fn now(&self) -> Duration;

    /// Local calendar time, used for naming save files.
    fn local_datetime(&self) -> NaiveDateTime;
}

/// Real clocks: `Instant` for frame timing, `chrono::Local` for names.
pub struct SystemTimeSource {
    origin: Instant,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self { Self::new() }
}

impl TimeSource for SystemTimeSource {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }

    fn local_datetime(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Deterministic clock driven by hand. Clones share the same time, so a
/// test can keep one handle and give another to the scheduler.
#[derive(Debug, Clone)]
pub struct ManualTimeSource {
    micros: Arc<AtomicU64>,
    epoch:  NaiveDateTime,
}

impl ManualTimeSource {
    pub fn new(epoch: NaiveDateTime) -> Self {
        Self { micros: Arc::new(AtomicU64::new(0)), epoch }
    }

    pub fn advance(&self, by: Duration) {
        self.micros.fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> Duration {
        Duration::from_micros(self.micros.load(Ordering::SeqCst))
    }

    fn local_datetime(&self) -> NaiveDateTime {
        let elapsed = chrono::Duration::microseconds(self.micros.load(Ordering::SeqCst) as i64);
        self.epoch + elapsed
    }
}
