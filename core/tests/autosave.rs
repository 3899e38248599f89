//! Autosave tests: interval counting, retention pruning, best-effort
//! failure handling, and counter resets.

mod common;

use std::fs;
use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use common::{fast_calendar, BrokenWriter, CountingWriter, Writes};
use railtick_core::{
    autosave::{autosave_filename, AutosavePolicy},
    clock::SceneMode,
    config::{AutosaveConfig, SchedulerConfig},
    scheduler::TickScheduler,
    snapshot::{JsonSnapshotWriter, SaveFlags},
    store::SimStore,
};

/// Day 212 (1800-08-01) is the seventh month boundary from 1800-01-01.
const TICKS_TO_SEVENTH_MONTH: u32 = 212 * 2;

fn config(dir: &std::path::Path, frequency_months: i32, retention: i32) -> SchedulerConfig {
    let mut config = fast_calendar(SchedulerConfig::default());
    config.autosave = AutosaveConfig {
        frequency_months,
        retention,
        directory: dir.to_path_buf(),
        ..AutosaveConfig::default()
    };
    config
}

fn counting(config: SchedulerConfig) -> (TickScheduler, Writes) {
    let writes: Writes = Arc::new(Mutex::new(Vec::new()));
    let scheduler = TickScheduler::new(config)
        .unwrap()
        .with_writer(Box::new(CountingWriter { writes: writes.clone() }));
    (scheduler, writes)
}

#[test]
fn every_third_month_over_seven_months() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scheduler, writes) = counting(config(dir.path(), 3, 12));

    scheduler.simulate_ticks(TICKS_TO_SEVENTH_MONTH).unwrap();

    let writes = writes.lock().unwrap();
    assert_eq!(scheduler.months_in_challenge(), 7);
    assert_eq!(writes.len(), 2);
    assert!(writes.iter().all(|(_, flags)| *flags == SaveFlags::AUTOSAVE));
    assert!(writes.iter().all(|(path, _)| path.starts_with(dir.path())));
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 1);
}

#[test]
fn policy_alone_counts_the_same_way() {
    let dir = tempfile::tempdir().unwrap();
    let mut policy = AutosavePolicy::new(AutosaveConfig {
        frequency_months: 3,
        directory: dir.path().to_path_buf(),
        ..AutosaveConfig::default()
    });
    let state = TickScheduler::new(SchedulerConfig::default()).unwrap().snapshot();
    let mut writer = JsonSnapshotWriter;
    let wall = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();

    let mut cycles = 0;
    for month in 0..7 {
        if policy.on_month_end(SceneMode::Playing) {
            let outcome = policy.run(&mut writer, &state, wall + chrono::Duration::hours(month));
            assert!(outcome.error.is_none());
            cycles += 1;
        }
    }
    assert_eq!(cycles, 2);
    assert_eq!(policy.months_since_last_autosave(), 1);
}

#[test]
fn retention_keeps_only_the_newest_files() {
    let dir = tempfile::tempdir().unwrap();
    for day in 1..=5 {
        let name = format!("autosave_2024-01-0{day}_00-00-00.sv5");
        fs::write(dir.path().join(name), b"old").unwrap();
    }
    fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();
    fs::write(dir.path().join("manual_save.sv5"), b"keep me").unwrap();

    let mut policy = AutosavePolicy::new(AutosaveConfig {
        frequency_months: 1,
        retention: 3,
        directory: dir.path().to_path_buf(),
        ..AutosaveConfig::default()
    });
    let state = TickScheduler::new(SchedulerConfig::default()).unwrap().snapshot();
    let wall = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap().and_hms_opt(0, 0, 0).unwrap();

    assert!(policy.on_month_end(SceneMode::Playing));
    let outcome = policy.run(&mut JsonSnapshotWriter, &state, wall);
    assert_eq!(outcome.written, Some(dir.path().join(autosave_filename(wall, ".sv5"))));
    assert_eq!(outcome.pruned.len(), 3);

    let mut autosaves: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("autosave_"))
        .collect();
    autosaves.sort();
    assert_eq!(
        autosaves,
        [
            "autosave_2024-01-04_00-00-00.sv5",
            "autosave_2024-01-05_00-00-00.sv5",
            "autosave_2024-01-06_00-00-00.sv5",
        ]
    );
    assert!(dir.path().join("notes.txt").exists());
    assert!(dir.path().join("manual_save.sv5").exists());
}

#[test]
fn failed_autosave_is_logged_not_fatal() {
    let _ = env_logger::builder().is_test(true).try_init();
    let dir = tempfile::tempdir().unwrap();
    let store = SimStore::in_memory().unwrap();
    store.migrate().unwrap();
    let mut scheduler = TickScheduler::new(config(dir.path(), 1, 3))
        .unwrap()
        .with_run_id("broken-writer")
        .with_writer(Box::new(BrokenWriter))
        .with_store(store)
        .unwrap();

    let report = scheduler.simulate_ticks(TICKS_TO_SEVENTH_MONTH).unwrap();
    assert_eq!(report.ticks_run, TICKS_TO_SEVENTH_MONTH);
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 0);

    let store = scheduler.store().unwrap();
    assert_eq!(store.event_count("broken-writer", "autosave_failed").unwrap(), 7);
    assert_eq!(store.event_count("broken-writer", "autosave_written").unwrap(), 0);
}

#[test]
fn manual_save_resets_the_interval() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scheduler, writes) = counting(config(dir.path(), 3, 12));

    // Two month boundaries (days 31 and 59).
    scheduler.simulate_ticks(59 * 2).unwrap();
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 2);

    let path = dir.path().join("my_game.sv5");
    scheduler.save_game(&path).unwrap();
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 0);
    assert_eq!(writes.lock().unwrap().as_slice(), &[(path, SaveFlags::MANUAL)]);

    // Next boundary is one month after the manual save, not three.
    scheduler.simulate_ticks(31 * 2).unwrap();
    assert_eq!(writes.lock().unwrap().len(), 1);
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 1);
}

#[test]
fn title_screen_never_autosaves() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scheduler, writes) = counting(config(dir.path(), 1, 12));
    scheduler.set_mode(SceneMode::Title);

    scheduler.simulate_ticks(TICKS_TO_SEVENTH_MONTH).unwrap();
    assert!(writes.lock().unwrap().is_empty());
    assert_eq!(scheduler.autosave().months_since_last_autosave(), 0);
    assert_eq!(scheduler.months_in_challenge(), 7);
}

#[test]
fn zero_frequency_disables_autosave() {
    let dir = tempfile::tempdir().unwrap();
    let (mut scheduler, writes) = counting(config(dir.path(), 0, 12));
    scheduler.simulate_ticks(TICKS_TO_SEVENTH_MONTH).unwrap();
    assert!(writes.lock().unwrap().is_empty());
}

#[test]
fn json_writer_produces_a_loadable_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut scheduler = TickScheduler::new(fast_calendar(SchedulerConfig::default())).unwrap();
    scheduler.simulate_ticks(10).unwrap();

    let path = dir.path().join("save.json");
    scheduler.save_game(&path).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["flags"]["is_autosave"], false);
    assert_eq!(json["state"]["ticks"]["primary"], 10);
    assert_eq!(json["state"]["day_counter"]["day"], 5);
}
