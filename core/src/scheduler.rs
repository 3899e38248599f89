//! The tick scheduler: turns wall-clock time into simulation ticks.
//!
//! FRAME:
//!   1. Credit elapsed wall time (clamped) to the accumulator.
//!   2. While a whole tick period is available, consume it and run one
//!      step. Variable-rate mode brackets each step with interpolation
//!      captures.
//!   3. Report alpha, interpolated positions and deferred errors.
//!
//! STEP: run 0..N logic ticks. N comes from the lateness of the step,
//! the pause flag, the game speed and networked catch-up. A late step
//! takes the periods of its extra ticks out of the accumulator, so at
//! normal speed every logic tick costs exactly one tick period.
//!
//! TICK (fixed, documented, never reordered):
//!   1. Gate check, counter increment, session command hand-off
//!   2. Record the tick's RNG seed
//!   3. Compaction hooks
//!   4. Calendar check and cascades (not in the editor)
//!   5. Subsystem updates in SubsystemSlot order
//!   6. Drain deferred errors
//!
//! RULES:
//!   - A TickInterrupt abandons the rest of the current step. Counters and
//!     the accumulator are never rolled back.
//!   - Autosave failures are logged, never propagated.
//!   - Nothing inside a tick writes to the ledger; events are buffered and
//!     flushed at the tick boundary.

use std::time::Duration;

use crate::{
    autosave::AutosavePolicy,
    calendar::{Calendar, CalendarDate, DayCounter, SnowLine},
    clock::{GameSpeed, SceneMode, SimClock, SystemTimeSource, TickCounter, TimeSource},
    command::ControlCommand,
    config::SchedulerConfig,
    error::{SimResult, TickInterrupt, TickResult},
    event::{DeferredError, EventLogEntry, SimEvent},
    frame::{FrameReport, Presenter},
    rng::RngBank,
    snapshot::{JsonSnapshotWriter, SaveFlags, SchedulerSnapshot, SnapshotWriter},
    store::SimStore,
    subsystem::{CalendarEvent, SimSubsystem, SubsystemSlot, TickContext},
    tick_gate::{GateMode, NetworkSession, OfflineSession, TickGate},
    tweener::EntityTweener,
    types::{new_run_id, EntityPosition, RunId, Tick},
};

/// How a single logic tick ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    Completed,
    /// The gate did not authorize the candidate tick; nothing ran.
    Withheld,
    Interrupted(TickInterrupt),
}

pub struct TickScheduler {
    pub run_id:          RunId,
    pub clock:           SimClock,
    config:              SchedulerConfig,
    ticks:               TickCounter,
    day_counter:         DayCounter,
    calendar:            Calendar,
    date:                CalendarDate,
    snow_line:           SnowLine,
    months_in_challenge: u32,
    mode:                SceneMode,
    gate:                TickGate,
    autosave:            AutosavePolicy,
    tweener:             EntityTweener,
    rng_bank:            RngBank,
    subsystems:          Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    session:             Box<dyn NetworkSession>,
    writer:              Box<dyn SnapshotWriter>,
    time:                Box<dyn TimeSource>,
    store:               Option<SimStore>,
    pending:             Vec<(&'static str, Tick, SimEvent)>,
    deferred:            Vec<DeferredError>,
    positions:           Vec<EntityPosition>,
}

impl TickScheduler {
    /// A single-player scheduler on the system clock, saving as JSON,
    /// with no ledger. Use the `with_*` methods to swap collaborators.
    pub fn new(config: SchedulerConfig) -> SimResult<Self> {
        config.validate()?;
        let calendar = Calendar::from_config(&config.calendar);
        Ok(Self {
            run_id:              new_run_id(),
            clock:               SimClock::new(),
            ticks:               TickCounter::default(),
            day_counter:         DayCounter::default(),
            date:                calendar.date(0),
            calendar,
            snow_line:           SnowLine::new(&config.calendar),
            months_in_challenge: 0,
            mode:                SceneMode::Playing,
            gate:                TickGate::new(GateMode::Unsynchronized, config.catch_up_threshold),
            autosave:            AutosavePolicy::new(config.autosave.clone()),
            tweener:             EntityTweener::new(),
            rng_bank:            RngBank::new(config.seed),
            subsystems:          Vec::new(),
            session:             Box::new(OfflineSession),
            writer:              Box::new(JsonSnapshotWriter),
            time:                Box::new(SystemTimeSource::new()),
            store:               None,
            pending:             Vec::new(),
            deferred:            Vec::new(),
            positions:           Vec::new(),
            config,
        })
    }

    pub fn with_run_id(mut self, run_id: impl Into<RunId>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn with_session(mut self, session: Box<dyn NetworkSession>) -> Self {
        let mode = if session.is_networked() {
            GateMode::Networked
        } else {
            GateMode::Unsynchronized
        };
        self.gate.set_mode(mode);
        self.session = session;
        self
    }

    pub fn with_writer(mut self, writer: Box<dyn SnapshotWriter>) -> Self {
        self.writer = writer;
        self
    }

    pub fn with_time_source(mut self, time: Box<dyn TimeSource>) -> Self {
        self.time = time;
        self
    }

    /// Attach a ledger. Registers the run and records its seed.
    pub fn with_store(mut self, store: SimStore) -> SimResult<Self> {
        store.insert_run(&self.run_id, self.config.seed, env!("CARGO_PKG_VERSION"))?;
        self.store = Some(store);
        let init = SimEvent::RunInitialized {
            run_id: self.run_id.clone(),
            seed:   self.config.seed,
        };
        self.record("scheduler", 0, init);
        self.flush_ledger()?;
        Ok(self)
    }

    /// Register a subsystem. It runs in `slot` order, after any subsystem
    /// already registered in the same slot.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        let at = self.subsystems.partition_point(|(s, _)| *s <= slot);
        self.subsystems.insert(at, (slot, subsystem));
    }

    // ── Frame loop ─────────────────────────────────────────────

    /// Run one frame at the time source's current time.
    pub fn frame(&mut self) -> SimResult<FrameReport> {
        let now = self.time.now();
        let period = self.tick_period();
        self.clock.accumulate(now, Duration::from_millis(self.config.max_frame_delta_ms));

        let mut report = FrameReport::default();
        if self.config.uncapped_frame_rate {
            while self.clock.try_consume(period) {
                self.capture_positions();
                self.tweener.pre_tick(&self.positions);

                self.step(now, period, &mut report)?;

                // After an interrupt the pre-tick capture is gone and the
                // next render snaps to the new world.
                self.capture_positions();
                self.tweener.post_tick(&self.positions);
            }
            report.alpha = self.clock.alpha(period);
            report.positions = self.tweener.tween(report.alpha);
            report.rendered = true;
        } else {
            self.tweener.reset();
            while self.clock.try_consume(period) {
                self.step(now, period, &mut report)?;
            }
            report.alpha = 1.0;
            report.rendered = report.steps > 0;
        }
        Ok(report)
    }

    /// Blocking main loop. Fixed-rate frames with nothing to do idle in a
    /// short sleep instead of spinning.
    pub fn run(&mut self, presenter: &mut dyn Presenter) -> SimResult<()> {
        log::info!("Starting main loop for run {}", self.run_id);
        let idle = Duration::from_millis(self.config.idle_sleep_ms);
        while presenter.keep_running() {
            for command in presenter.poll_commands() {
                self.apply(command)?;
            }
            let report = self.frame()?;
            for error in &report.deferred_errors {
                presenter.show_error(error);
            }
            if report.rendered {
                presenter.present(&report);
            } else if !self.config.uncapped_frame_rate {
                std::thread::sleep(idle);
            }
        }
        log::info!("Main loop ended at tick {}", self.ticks.primary);
        Ok(())
    }

    /// Run `n` logic ticks immediately, ignoring wall time and pause.
    /// Gating still applies. An interruption ends the run early.
    pub fn simulate_ticks(&mut self, n: u32) -> SimResult<FrameReport> {
        let mut report = FrameReport::default();
        self.run_logic_ticks(n, &mut report)?;
        Ok(report)
    }

    fn step(&mut self, now: Duration, period: Duration, report: &mut FrameReport) -> SimResult<()> {
        report.steps += 1;
        let ms_since_last_tick = self.clock.mark_step(now);
        let base = self.base_updates(ms_since_last_tick, period);
        let updates = self.updates_for_step(base);
        self.run_logic_ticks(updates, report)
    }

    /// Logic ticks this step runs before speed and catch-up. A late step
    /// runs up to `max_updates_per_step` ticks, one period each: the frame
    /// loop consumed the first, the rest come out of the accumulator while
    /// it holds them.
    fn base_updates(&mut self, ms_since_last_tick: u16, period: Duration) -> u32 {
        if self.clock.paused {
            return 0;
        }
        if self.session.is_networked() {
            return 1;
        }
        let max_updates = self.config.max_updates_per_step.max(1);
        let wanted = (ms_since_last_tick / self.config.nominal_tick_ms).clamp(1, max_updates) as u32;
        let mut base = 1;
        while base < wanted && self.clock.try_consume(period) {
            base += 1;
        }
        base
    }

    fn updates_for_step(&self, base: u32) -> u32 {
        let updates = base * self.clock.speed.multiplier();

        if self.session.is_networked() {
            // Catch up to the server, usually right after joining.
            let behind = self.session.authoritative_tick_budget();
            return self.gate.bound_updates(updates, behind);
        }
        updates
    }

    fn run_logic_ticks(&mut self, count: u32, report: &mut FrameReport) -> SimResult<()> {
        for _ in 0..count {
            match self.logic_tick(report)? {
                TickOutcome::Completed => {}
                TickOutcome::Withheld => report.ticks_withheld += 1,
                TickOutcome::Interrupted(interrupt) => {
                    self.tick_interrupted(interrupt, report)?;
                    break;
                }
            }
        }
        Ok(())
    }

    // ── Tick ───────────────────────────────────────────────────

    fn logic_tick(&mut self, report: &mut FrameReport) -> SimResult<TickOutcome> {
        let candidate = self.ticks.next();
        let budget = self.session.authoritative_tick_budget();
        if let Err(e) = self.gate.observe(self.ticks.primary, budget) {
            log::error!("{e}");
            return Err(e);
        }
        if !self.gate.should_process_tick(candidate) {
            log::trace!("tick {candidate} withheld by gate");
            return Ok(TickOutcome::Withheld);
        }

        let tick = self.ticks.advance();
        self.session.submit_commands_for_tick(tick);
        report.ticks_run += 1;

        let started = SimEvent::TickStarted {
            tick,
            secondary: self.ticks.secondary,
            rng_seed:  self.rng_bank.tick_seed(tick),
        };
        self.record("scheduler", tick, started);

        let outcome = match self.run_sequence(tick) {
            Ok(()) => TickOutcome::Completed,
            Err(interrupt) => TickOutcome::Interrupted(interrupt),
        };

        report.deferred_errors.append(&mut self.deferred);
        if outcome == TickOutcome::Completed {
            self.flush_ledger()?;
        }
        Ok(outcome)
    }

    fn run_sequence(&mut self, tick: Tick) -> TickResult {
        for (_, subsystem) in &mut self.subsystems {
            subsystem.compact(tick);
        }

        if self.mode != SceneMode::Editor {
            self.date_tick(tick)?;
        }

        let Self { subsystems, deferred, rng_bank, date, mode, .. } = self;
        for (slot, subsystem) in subsystems.iter_mut() {
            let rng = rng_bank.for_subsystem(tick, *slot);
            let mut ctx = TickContext::new(tick, *date, *mode, rng, deferred);
            subsystem
                .update(&mut ctx)
                .map_err(|interrupt| interrupt.raised_by(subsystem.name()))?;
        }
        Ok(())
    }

    fn tick_interrupted(&mut self, interrupt: TickInterrupt, report: &mut FrameReport) -> SimResult<()> {
        self.tweener.reset();
        log::info!("Tick interrupted: {interrupt}");
        let event = SimEvent::TickInterrupted {
            tick:      self.ticks.primary,
            subsystem: interrupt.subsystem.map(str::to_string),
            reason:    interrupt.reason.clone(),
        };
        self.record("scheduler", self.ticks.primary, event);
        self.flush_ledger()?;
        report.interruptions.push(interrupt);
        Ok(())
    }

    // ── Calendar ───────────────────────────────────────────────

    fn date_tick(&mut self, tick: Tick) -> TickResult {
        if !self.day_counter.advance(self.config.calendar.day_fraction_per_tick) {
            return Ok(());
        }

        // Daily hooks still see the day that just ended.
        self.dispatch_calendar(tick, CalendarEvent::Day)?;

        let transition = self.calendar.transition(self.day_counter.day);
        let today = transition.today;
        self.date = today;
        self.snow_line.update(today.day_of_year, &self.config.calendar);
        self.record("calendar", tick, SimEvent::DayChanged { tick, date: today });

        if transition.month_changed() {
            self.months_in_challenge += 1;
            let event = SimEvent::MonthChanged {
                tick,
                date: today,
                months_in_challenge: self.months_in_challenge,
            };
            self.record("calendar", tick, event);
            log::debug!("tick={tick} new month {} {}", today.month_name(), today.year);
            self.dispatch_calendar(tick, CalendarEvent::Month)?;

            if today.year <= self.config.calendar.economy_cutoff_year {
                self.dispatch_calendar(tick, CalendarEvent::EconomyMonth)?;
            }

            if transition.quarter_started() {
                self.record("calendar", tick, SimEvent::QuarterChanged { tick, date: today });
                self.dispatch_calendar(tick, CalendarEvent::Quarter)?;
            }

            if transition.year_changed() {
                self.record("calendar", tick, SimEvent::YearChanged { tick, date: today });
                log::debug!("tick={tick} new year {}", today.year);
                self.dispatch_calendar(tick, CalendarEvent::Year)?;
            }

            self.autosave_check(tick);
        }

        self.dispatch_calendar(tick, CalendarEvent::DayClosed)
    }

    fn dispatch_calendar(&mut self, tick: Tick, event: CalendarEvent) -> TickResult {
        let Self { subsystems, deferred, rng_bank, date, mode, .. } = self;
        for (slot, subsystem) in subsystems.iter_mut() {
            let rng = rng_bank.for_calendar(tick, *slot, event);
            let mut ctx = TickContext::new(tick, *date, *mode, rng, deferred);
            subsystem
                .on_calendar(event, &mut ctx)
                .map_err(|interrupt| interrupt.raised_by(subsystem.name()))?;
        }
        Ok(())
    }

    fn autosave_check(&mut self, tick: Tick) {
        if !self.autosave.on_month_end(self.mode) {
            return;
        }
        let state = self.snapshot();
        let wall = self.time.local_datetime();
        let outcome = self.autosave.run(self.writer.as_mut(), &state, wall);

        if let Some(path) = outcome.written {
            let path = path.display().to_string();
            self.record("autosave", tick, SimEvent::AutosaveWritten { tick, path });
        }
        if let Some(reason) = outcome.error {
            self.record("autosave", tick, SimEvent::AutosaveFailed { tick, reason });
        }
        for path in outcome.pruned {
            let path = path.display().to_string();
            self.record("autosave", tick, SimEvent::AutosavePruned { tick, path });
        }
    }

    // ── Control ────────────────────────────────────────────────

    pub fn apply(&mut self, command: ControlCommand) -> SimResult<()> {
        match command {
            ControlCommand::Pause => self.clock.pause(),
            ControlCommand::Resume => self.clock.resume(),
            ControlCommand::SetSpeed { speed } => self.clock.set_speed(speed),
            ControlCommand::SetMode { mode } => self.mode = mode,
            ControlCommand::NewScenario => self.new_scenario()?,
            ControlCommand::SaveGame { path } => self.save_game(&path)?,
        }
        Ok(())
    }

    /// Write a manual save. Counts as an autosave for the interval.
    pub fn save_game(&mut self, path: &std::path::Path) -> SimResult<()> {
        let state = self.snapshot();
        self.writer.write_snapshot(path, SaveFlags::MANUAL, &state)?;
        self.autosave.reset();
        let tick = self.ticks.primary;
        let path = path.display().to_string();
        log::info!("Game saved to {path}");
        self.record("scheduler", tick, SimEvent::GameSaved { tick, path });
        self.flush_ledger()
    }

    /// Reset everything a scenario owns. Wall-clock timing carries on.
    /// The gate is re-observed at tick 0, dropping the previous
    /// scenario's authorization window.
    pub fn new_scenario(&mut self) -> SimResult<()> {
        self.ticks = TickCounter::default();
        self.day_counter = DayCounter::default();
        self.date = self.calendar.date(0);
        self.snow_line = SnowLine::new(&self.config.calendar);
        self.months_in_challenge = 0;
        self.autosave.reset();
        self.tweener.reset();
        self.deferred.clear();
        self.pending.clear();
        self.clock.accumulator = Duration::ZERO;
        let budget = self.session.authoritative_tick_budget();
        self.gate.observe(0, budget)
    }

    pub fn set_mode(&mut self, mode: SceneMode) {
        self.mode = mode;
    }

    pub fn set_speed(&mut self, speed: GameSpeed) {
        self.clock.set_speed(speed);
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn config(&self) -> &SchedulerConfig { &self.config }
    pub fn ticks(&self) -> TickCounter { self.ticks }
    pub fn day_counter(&self) -> DayCounter { self.day_counter }
    pub fn date(&self) -> CalendarDate { self.date }
    pub fn snow_line(&self) -> SnowLine { self.snow_line }
    pub fn months_in_challenge(&self) -> u32 { self.months_in_challenge }
    pub fn mode(&self) -> SceneMode { self.mode }
    pub fn autosave(&self) -> &AutosavePolicy { &self.autosave }
    pub fn gate(&self) -> &TickGate { &self.gate }
    pub fn store(&self) -> Option<&SimStore> { self.store.as_ref() }

    pub fn tick_period(&self) -> Duration {
        Duration::from_millis(self.config.tick_period_ms)
    }

    /// Find a registered subsystem by concrete type.
    /// Used by tooling and tests to read subsystem state.
    pub fn subsystem<T: 'static>(&self) -> Option<&T> {
        self.subsystems
            .iter()
            .find_map(|(_, sub)| sub.as_any().downcast_ref::<T>())
    }

    /// Names of registered subsystems in execution order.
    pub fn execution_order(&self) -> Vec<&'static str> {
        self.subsystems.iter().map(|(_, sub)| sub.name()).collect()
    }

    pub fn snapshot(&self) -> SchedulerSnapshot {
        SchedulerSnapshot {
            run_id:              self.run_id.clone(),
            ticks:               self.ticks,
            day_counter:         self.day_counter,
            date:                self.date,
            snow_line:           self.snow_line,
            months_in_challenge: self.months_in_challenge,
            speed:               self.clock.speed,
            mode:                self.mode,
        }
    }

    // ── Internals ──────────────────────────────────────────────

    fn capture_positions(&mut self) {
        self.positions.clear();
        for (_, subsystem) in &self.subsystems {
            subsystem.entity_positions(&mut self.positions);
        }
    }

    fn record(&mut self, source: &'static str, tick: Tick, event: SimEvent) {
        self.pending.push((source, tick, event));
    }

    fn flush_ledger(&mut self) -> SimResult<()> {
        let pending = std::mem::take(&mut self.pending);
        let Some(store) = &self.store else {
            return Ok(());
        };
        let entries = pending
            .into_iter()
            .map(|(source, tick, event)| -> SimResult<EventLogEntry> {
                Ok(EventLogEntry {
                    id:         None,
                    run_id:     self.run_id.clone(),
                    tick,
                    source:     source.to_string(),
                    event_type: event.type_name().to_string(),
                    payload:    serde_json::to_string(&event)?,
                })
            })
            .collect::<SimResult<Vec<_>>>()?;
        store.append_events(&entries)
    }
}
