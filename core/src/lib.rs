//! railtick-core: tick scheduler and deterministic simulation driver.
//!
//! Start at [`scheduler::TickScheduler`].

pub mod autosave;
pub mod calendar;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod event;
pub mod frame;
pub mod rng;
pub mod scheduler;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod tick_gate;
pub mod tweener;
pub mod types;
