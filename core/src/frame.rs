//! Per-frame output of the scheduler and the presentation seam.

use crate::{
    command::ControlCommand,
    error::TickInterrupt,
    event::DeferredError,
    types::EntityPosition,
};

/// Everything one call to `TickScheduler::frame` did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameReport {
    /// Tick periods consumed from the accumulator.
    pub steps:           u32,
    /// Logic ticks executed (authorized and started).
    pub ticks_run:       u32,
    /// Tick slots the gate withheld.
    pub ticks_withheld:  u32,
    pub interruptions:   Vec<TickInterrupt>,
    /// Whether the presenter should draw this frame.
    pub rendered:        bool,
    /// Interpolation factor between the last two ticks.
    pub alpha:           f32,
    /// Interpolated entity positions. Empty in fixed-rate mode.
    pub positions:       Vec<EntityPosition>,
    pub deferred_errors: Vec<DeferredError>,
}

/// The presentation collaborator driven by `TickScheduler::run`.
pub trait Presenter {
    /// Return `false` to leave the main loop.
    fn keep_running(&mut self) -> bool;

    /// Commands the operator issued since the last frame.
    fn poll_commands(&mut self) -> Vec<ControlCommand> {
        Vec::new()
    }

    fn present(&mut self, frame: &FrameReport);

    /// Show an error raised during a tick, typically as a modal dialog.
    fn show_error(&mut self, error: &DeferredError);
}
