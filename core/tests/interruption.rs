//! Tick interruption: abandonment of the remaining sequence, counters,
//! interpolation reset and deferred error delivery.

mod common;

use std::time::Duration;

use common::{drain, fast_calendar, manual_scheduler, trace, FaultyLoader, Mover, Recorder, Trace};
use railtick_core::{
    config::SchedulerConfig,
    event::DeferredError,
    scheduler::TickScheduler,
    subsystem::SubsystemSlot,
    types::{EntityPosition, Position},
};

fn four_recorders(t: &Trace, interrupting: &'static str, on_tick: u32) -> TickScheduler {
    let mut scheduler = TickScheduler::new(SchedulerConfig::default()).unwrap();
    for (slot, name) in [
        (SubsystemSlot::World, "world"),
        (SubsystemSlot::Town, "town"),
        (SubsystemSlot::Vehicle, "vehicle"),
        (SubsystemSlot::Station, "station"),
    ] {
        let recorder = Recorder::new(name, t);
        let recorder = if name == interrupting { recorder.interrupting_on(on_tick) } else { recorder };
        scheduler.register(slot, Box::new(recorder));
    }
    scheduler
}

#[test]
fn interrupt_skips_the_rest_of_the_tick() {
    let t = trace();
    let mut scheduler = four_recorders(&t, "vehicle", 1);

    let report = scheduler.simulate_ticks(1).unwrap();
    assert_eq!(drain(&t), ["world:1", "town:1", "vehicle:1"]);
    assert_eq!(report.interruptions.len(), 1);
    assert_eq!(report.interruptions[0].subsystem, Some("vehicle"));
    assert_eq!(report.interruptions[0].reason, "game loaded");

    // The next tick starts from the top of the sequence.
    scheduler.simulate_ticks(1).unwrap();
    assert_eq!(drain(&t), ["world:2", "town:2", "vehicle:2", "station:2"]);
}

#[test]
fn counters_are_not_rolled_back() {
    let t = trace();
    let mut scheduler = four_recorders(&t, "world", 1);

    let report = scheduler.simulate_ticks(1).unwrap();
    assert_eq!(report.ticks_run, 1);
    assert_eq!(scheduler.ticks().primary, 1);
    assert_eq!(scheduler.ticks().secondary, 1);
    assert_eq!(drain(&t), ["world:1"]);
}

#[test]
fn interrupt_abandons_the_rest_of_the_step() {
    let t = trace();
    let (mut scheduler, time) = manual_scheduler(SchedulerConfig::default());
    scheduler.register(SubsystemSlot::World, Box::new(Recorder::new("world", &t).interrupting_on(1)));

    // The first step is late and takes three periods for three ticks.
    // Tick 1 is interrupted, so the other two never run and their periods
    // are not handed back. The last period runs one more step.
    time.advance_ms(100);
    let report = scheduler.frame().unwrap();
    assert_eq!(report.steps, 2);
    assert_eq!(report.ticks_run, 2);
    assert_eq!(report.interruptions.len(), 1);
    assert_eq!(drain(&t), ["world:1", "world:2"]);
    assert_eq!(scheduler.clock.accumulator, Duration::ZERO);
}

#[test]
fn simulate_ticks_stops_at_an_interrupt() {
    let t = trace();
    let mut scheduler = four_recorders(&t, "town", 3);

    let report = scheduler.simulate_ticks(10).unwrap();
    assert_eq!(report.ticks_run, 3);
    assert_eq!(scheduler.ticks().primary, 3);
}

#[test]
fn interrupt_snaps_interpolation_to_the_new_world() {
    let t = trace();
    let mut config = SchedulerConfig::default();
    config.uncapped_frame_rate = true;
    let (mut scheduler, time) = manual_scheduler(config);
    scheduler.register(SubsystemSlot::Vehicle, Box::new(Mover { x: 0 }));
    scheduler.register(SubsystemSlot::Title, Box::new(Recorder::new("loader", &t).interrupting_on(1)));

    time.advance(Duration::from_micros(37_500));
    let report = scheduler.frame().unwrap();
    assert_eq!(report.interruptions.len(), 1);
    assert!(report.rendered);
    // No stale pre-tick position survives, and the entity is still drawn.
    assert_eq!(
        report.positions,
        vec![EntityPosition { id: 1, position: Position::new(10, 0, 0) }]
    );

    // The following tick completes and interpolation resumes.
    time.advance(Duration::from_micros(25_000));
    let report = scheduler.frame().unwrap();
    assert!(report.interruptions.is_empty());
    assert!((report.alpha - 0.5).abs() < 1e-6);
    assert_eq!(report.positions[0].position, Position::new(15, 0, 0));
}

#[test]
fn calendar_hook_can_interrupt() {
    let t = trace();
    let mut scheduler = TickScheduler::new(fast_calendar(SchedulerConfig::default())).unwrap();
    scheduler.register(SubsystemSlot::Company, Box::new(Recorder::new("co", &t).interrupting_on_day()));

    // Day 1 begins on tick 2; the daily hook interrupts before updates.
    let report = scheduler.simulate_ticks(2).unwrap();
    assert_eq!(report.interruptions.len(), 1);
    assert_eq!(report.interruptions[0].subsystem, Some("co"));
    assert_eq!(drain(&t), ["co:1"]);

    scheduler.simulate_ticks(1).unwrap();
    assert_eq!(drain(&t), ["co:3"]);
}

#[test]
fn deferred_errors_surface_once() {
    let mut scheduler = TickScheduler::new(SchedulerConfig::default()).unwrap();
    scheduler.register(SubsystemSlot::Industry, Box::new(FaultyLoader { on_tick: 2 }));

    let report = scheduler.simulate_ticks(5).unwrap();
    assert_eq!(
        report.deferred_errors,
        vec![DeferredError::ObjectLoad { tick: 2, missing: vec!["STEAM01".to_string()] }]
    );

    let report = scheduler.simulate_ticks(5).unwrap();
    assert!(report.deferred_errors.is_empty());
}

#[test]
fn deferred_error_survives_an_interrupted_tick() {
    let t = trace();
    let mut scheduler = TickScheduler::new(SchedulerConfig::default()).unwrap();
    scheduler.register(SubsystemSlot::World, Box::new(FaultyLoader { on_tick: 1 }));
    scheduler.register(SubsystemSlot::Vehicle, Box::new(Recorder::new("vehicle", &t).interrupting_on(1)));

    let report = scheduler.simulate_ticks(1).unwrap();
    assert_eq!(report.interruptions.len(), 1);
    assert_eq!(report.deferred_errors.len(), 1);
}

#[test]
fn slot_order_wins_over_registration_order() {
    let t = trace();
    let mut scheduler = TickScheduler::new(SchedulerConfig::default()).unwrap();
    scheduler.register(SubsystemSlot::Station, Box::new(Recorder::new("station", &t)));
    scheduler.register(SubsystemSlot::World, Box::new(Recorder::new("world", &t)));
    scheduler.register(SubsystemSlot::Vehicle, Box::new(Recorder::new("vehicle", &t)));
    scheduler.register(SubsystemSlot::Town, Box::new(Recorder::new("town", &t)));
    scheduler.register(SubsystemSlot::World, Box::new(Recorder::new("world2", &t)));

    assert_eq!(
        scheduler.execution_order(),
        ["world", "world2", "town", "vehicle", "station"]
    );
    scheduler.simulate_ticks(1).unwrap();
    assert_eq!(drain(&t), ["world:1", "world2:1", "town:1", "vehicle:1", "station:1"]);
}
