//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use railtick_core::{
    clock::ManualTimeSource,
    config::SchedulerConfig,
    error::{TickInterrupt, TickResult},
    event::DeferredError,
    scheduler::TickScheduler,
    snapshot::{SaveFlags, SchedulerSnapshot, SnapshotWriter},
    subsystem::{CalendarEvent, SimSubsystem, TickContext},
    tick_gate::NetworkSession,
    types::{EntityPosition, Position, Tick},
};

pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn drain(trace: &Trace) -> Vec<String> {
    std::mem::take(&mut *trace.lock().unwrap())
}

pub fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 1)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

/// Scheduler on a manual clock. The first frame has already run, so the
/// next `advance` + `frame` credits exactly the advanced time.
pub fn manual_scheduler(config: SchedulerConfig) -> (TickScheduler, ManualTimeSource) {
    let time = ManualTimeSource::new(epoch());
    let mut scheduler = TickScheduler::new(config)
        .unwrap()
        .with_time_source(Box::new(time.clone()));
    scheduler.frame().unwrap();
    (scheduler, time)
}

/// One day every two ticks. Autosave is off so month boundaries stay
/// off the disk; autosave tests set their own policy afterwards.
pub fn fast_calendar(mut config: SchedulerConfig) -> SchedulerConfig {
    config.calendar.day_fraction_per_tick = 32768;
    config.autosave.frequency_months = 0;
    config
}

/// Writes `"<name>:<tick>"` on update and, if asked, calendar hooks.
pub struct Recorder {
    pub name:         &'static str,
    trace:            Trace,
    interrupt_on:     Option<Tick>,
    record_calendar:  bool,
    interrupt_on_day: bool,
}

impl Recorder {
    pub fn new(name: &'static str, trace: &Trace) -> Self {
        Self {
            name,
            trace: trace.clone(),
            interrupt_on: None,
            record_calendar: false,
            interrupt_on_day: false,
        }
    }

    pub fn interrupting_on(mut self, tick: Tick) -> Self {
        self.interrupt_on = Some(tick);
        self
    }

    pub fn with_calendar(mut self) -> Self {
        self.record_calendar = true;
        self
    }

    pub fn interrupting_on_day(mut self) -> Self {
        self.interrupt_on_day = true;
        self
    }
}

impl SimSubsystem for Recorder {
    fn name(&self) -> &'static str { self.name }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        self.trace.lock().unwrap().push(format!("{}:{}", self.name, ctx.tick));
        if self.interrupt_on == Some(ctx.tick) {
            return Err(TickInterrupt::new("game loaded"));
        }
        Ok(())
    }

    fn on_calendar(&mut self, event: CalendarEvent, ctx: &mut TickContext<'_>) -> TickResult {
        if self.record_calendar {
            self.trace
                .lock()
                .unwrap()
                .push(format!("{}:{event:?}:{}-{:02}", self.name, ctx.date.year, ctx.date.month));
        }
        if self.interrupt_on_day && event == CalendarEvent::Day {
            return Err(TickInterrupt::new("interrupted on day"));
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

/// One entity moving 10 units along x per tick.
pub struct Mover {
    pub x: i32,
}

impl SimSubsystem for Mover {
    fn name(&self) -> &'static str { "mover" }

    fn update(&mut self, _ctx: &mut TickContext<'_>) -> TickResult {
        self.x += 10;
        Ok(())
    }

    fn entity_positions(&self, out: &mut Vec<EntityPosition>) {
        out.push(EntityPosition { id: 1, position: Position::new(self.x, 0, 0) });
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

/// Uses its RNG stream every tick so seeds show up in world state.
#[derive(Default)]
pub struct RandomWalker {
    pub value: u64,
}

impl SimSubsystem for RandomWalker {
    fn name(&self) -> &'static str { "walker" }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        self.value = self.value.wrapping_add(ctx.rng.next_u64_below(1_000));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

/// Queues an object-load error on one tick.
pub struct FaultyLoader {
    pub on_tick: Tick,
}

impl SimSubsystem for FaultyLoader {
    fn name(&self) -> &'static str { "loader" }

    fn update(&mut self, ctx: &mut TickContext<'_>) -> TickResult {
        if ctx.tick == self.on_tick {
            ctx.defer_error(DeferredError::ObjectLoad {
                tick:    ctx.tick,
                missing: vec!["STEAM01".to_string()],
            });
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any { self }
}

pub type Writes = Arc<Mutex<Vec<(PathBuf, SaveFlags)>>>;

/// Records save requests without touching the disk.
pub struct CountingWriter {
    pub writes: Writes,
}

impl SnapshotWriter for CountingWriter {
    fn write_snapshot(
        &mut self,
        path: &Path,
        flags: SaveFlags,
        _state: &SchedulerSnapshot,
    ) -> std::io::Result<()> {
        self.writes.lock().unwrap().push((path.to_path_buf(), flags));
        Ok(())
    }
}

/// Fails every save.
pub struct BrokenWriter;

impl SnapshotWriter for BrokenWriter {
    fn write_snapshot(
        &mut self,
        _path: &Path,
        _flags: SaveFlags,
        _state: &SchedulerSnapshot,
    ) -> std::io::Result<()> {
        Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "disk is read-only"))
    }
}

/// Networked session whose budget the test controls.
#[derive(Clone, Default)]
pub struct ScriptedSession {
    pub budget:    Arc<AtomicI64>,
    pub submitted: Arc<Mutex<Vec<Tick>>>,
}

impl ScriptedSession {
    pub fn set_budget(&self, budget: i64) {
        self.budget.store(budget, Ordering::SeqCst);
    }
}

impl NetworkSession for ScriptedSession {
    fn is_networked(&self) -> bool { true }

    fn authoritative_tick_budget(&self) -> i64 {
        self.budget.load(Ordering::SeqCst)
    }

    fn submit_commands_for_tick(&mut self, tick: Tick) {
        // The budget is relative to the local counter, which just moved.
        self.budget.fetch_sub(1, Ordering::SeqCst);
        self.submitted.lock().unwrap().push(tick);
    }
}
