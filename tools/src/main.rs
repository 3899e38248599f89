//! sim-runner: headless driver for the railtick scheduler.
//!
//! Usage:
//!   sim-runner --seed 12345 --ticks 9600 --db run.db
//!   sim-runner --config scheduler.json --realtime --seconds 10
//!   sim-runner --ipc-mode

mod demo;

use anyhow::{Context, Result};
use railtick_core::{
    command::ControlCommand,
    config::SchedulerConfig,
    event::DeferredError,
    frame::{FrameReport, Presenter},
    scheduler::TickScheduler,
    snapshot::SchedulerSnapshot,
    store::SimStore,
};
use std::env;
use std::io::{self, BufRead, Write};
use std::time::{Duration, Instant};

#[derive(serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IpcCommand {
    GetState,
    Tick { count: u32 },
    Command { command: ControlCommand },
    Quit,
}

#[derive(serde::Serialize)]
struct UiState {
    scheduler: SchedulerSnapshot,
    paused:    bool,
    world:     demo::DemoState,
}

/// Prints a status line about once a second of wall time.
struct ConsolePresenter {
    deadline:    Instant,
    next_status: Instant,
    frames:      u64,
    ticks:       u64,
}

impl ConsolePresenter {
    fn new(run_for: Duration) -> Self {
        let now = Instant::now();
        Self { deadline: now + run_for, next_status: now, frames: 0, ticks: 0 }
    }
}

impl Presenter for ConsolePresenter {
    fn keep_running(&mut self) -> bool {
        Instant::now() < self.deadline
    }

    fn present(&mut self, frame: &FrameReport) {
        self.frames += 1;
        self.ticks += frame.ticks_run as u64;
        let now = Instant::now();
        if now >= self.next_status {
            self.next_status = now + Duration::from_secs(1);
            println!(
                "  frames: {:>6} | ticks: {:>6} | alpha: {:.2} | entities: {}",
                self.frames,
                self.ticks,
                frame.alpha,
                frame.positions.len()
            );
        }
    }

    fn show_error(&mut self, error: &DeferredError) {
        eprintln!("  error: {}", serde_json::to_string(error).unwrap_or_default());
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let ticks = parse_arg(&args, "--ticks", 96u32 * 365);
    let trains = parse_arg(&args, "--trains", 8u32);
    let seconds = parse_arg(&args, "--seconds", 5u64);
    let ipc_mode = args.iter().any(|a| a == "--ipc-mode");
    let realtime = args.iter().any(|a| a == "--realtime");
    let db = string_arg(&args, "--db").unwrap_or(":memory:");

    let mut config = match string_arg(&args, "--config") {
        Some(path) => SchedulerConfig::load(path).with_context(|| format!("loading {path}"))?,
        None => SchedulerConfig::default(),
    };
    config.seed = parse_arg(&args, "--seed", config.seed);
    if let Some(dir) = string_arg(&args, "--autosave-dir") {
        config.autosave.directory = dir.into();
    }
    if args.iter().any(|a| a == "--uncapped") {
        config.uncapped_frame_rate = true;
    }
    let seed = config.seed;

    if !ipc_mode {
        println!("railtick sim-runner");
        println!("  seed:      {seed}");
        println!("  db:        {db}");
        println!("  autosave:  {}", config.autosave.directory.display());
        if realtime {
            println!("  realtime:  {seconds}s");
        } else {
            println!("  ticks:     {ticks}");
        }
        println!();
    }

    let store = SimStore::open(db)?;
    store.migrate()?;

    let run_id = format!("run-{seed}-{}", chrono::Utc::now().format("%Y%m%d%H%M%S"));
    let mut scheduler = TickScheduler::new(config)?
        .with_run_id(run_id.clone())
        .with_store(store)?;
    demo::install(&mut scheduler, trains);

    if ipc_mode {
        run_ipc_loop(&mut scheduler)?;
    } else if realtime {
        let mut presenter = ConsolePresenter::new(Duration::from_secs(seconds));
        scheduler.run(&mut presenter)?;
        print_summary(&scheduler, &run_id)?;
    } else {
        let started = Instant::now();
        let report = scheduler.simulate_ticks(ticks)?;
        for error in &report.deferred_errors {
            log::warn!("Deferred error: {error:?}");
        }
        log::info!("Simulated {} ticks in {:?}", report.ticks_run, started.elapsed());
        print_summary(&scheduler, &run_id)?;
    }

    Ok(())
}

/// One JSON command per stdin line, one JSON state per stdout line.
fn run_ipc_loop(scheduler: &mut TickScheduler) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();

    loop {
        buffer.clear();
        let bytes_read = handle.read_line(&mut buffer)?;
        if bytes_read == 0 {
            break; // EOF
        }

        let cmd: IpcCommand = match serde_json::from_str(&buffer) {
            Ok(c) => c,
            Err(e) => {
                let err_json = serde_json::json!({ "error": e.to_string() });
                writeln!(stdout, "{}", err_json)?;
                stdout.flush()?;
                continue;
            }
        };

        match cmd {
            IpcCommand::Quit => break,
            IpcCommand::Tick { count } => {
                let report = scheduler.simulate_ticks(count)?;
                if !report.interruptions.is_empty() {
                    log::info!("{} interruption(s) during ipc tick", report.interruptions.len());
                }
            }
            IpcCommand::Command { command } => scheduler.apply(command)?,
            IpcCommand::GetState => {}
        }
        writeln!(stdout, "{}", serde_json::to_string(&ui_state(scheduler))?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn ui_state(scheduler: &TickScheduler) -> UiState {
    UiState {
        scheduler: scheduler.snapshot(),
        paused:    scheduler.clock.paused,
        world:     demo::state(scheduler),
    }
}

fn print_summary(scheduler: &TickScheduler, run_id: &str) -> Result<()> {
    let ticks = scheduler.ticks();
    let world = demo::state(scheduler);

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {run_id}");
    println!("  final tick:     {} (secondary {})", ticks.primary, ticks.secondary);
    println!("  date:           {}", scheduler.date());
    println!("  months:         {}", scheduler.months_in_challenge());
    println!("  snow line:      {}", scheduler.snow_line().current);
    println!("  population:     {}", world.population);
    println!("  distance:       {}", world.distance_travelled);

    if let Some(store) = scheduler.store() {
        println!();
        println!("=== LEDGER ===");
        for event_type in [
            "tick_started",
            "tick_interrupted",
            "month_changed",
            "autosave_written",
            "autosave_failed",
            "autosave_pruned",
        ] {
            println!("  {event_type:<17} {}", store.event_count(run_id, event_type)?);
        }
    }
    Ok(())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
