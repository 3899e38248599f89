//! Autosave policy: month counting, save-and-prune.
//!
//! Autosave is best-effort: a failed write or prune is logged and the
//! tick carries on. The counter resets after every attempt, so the next
//! try comes one full interval later.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

use crate::{
    clock::SceneMode,
    config::AutosaveConfig,
    snapshot::{SaveFlags, SchedulerSnapshot, SnapshotWriter},
};

pub const AUTOSAVE_PREFIX: &str = "autosave_";

#[derive(Debug, Clone)]
pub struct AutosavePolicy {
    config:       AutosaveConfig,
    months_since: u32,
}

/// What one autosave attempt did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AutosaveOutcome {
    pub written: Option<PathBuf>,
    pub error:   Option<String>,
    pub pruned:  Vec<PathBuf>,
}

impl AutosavePolicy {
    pub fn new(config: AutosaveConfig) -> Self {
        Self { config, months_since: 0 }
    }

    pub fn config(&self) -> &AutosaveConfig {
        &self.config
    }

    pub fn months_since_last_autosave(&self) -> u32 {
        self.months_since
    }

    pub fn reset(&mut self) {
        self.months_since = 0;
    }

    /// Count a month boundary. Returns `true` when an autosave is due.
    /// Title and editor scenes neither count nor save.
    pub fn on_month_end(&mut self, mode: SceneMode) -> bool {
        if !mode.is_gameplay() {
            return false;
        }
        self.months_since = self.months_since.saturating_add(1);
        self.config.is_enabled() && self.months_since >= self.config.frequency_months as u32
    }

    /// Write a timestamped autosave, prune old ones, reset the counter.
    pub fn run(
        &mut self,
        writer: &mut dyn SnapshotWriter,
        state: &SchedulerSnapshot,
        wall: NaiveDateTime,
    ) -> AutosaveOutcome {
        let mut outcome = AutosaveOutcome::default();
        let dir = self.config.directory.clone();
        let path = dir.join(autosave_filename(wall, &self.config.extension));

        log::info!("Autosaving game to {}", path.display());
        let written = std::fs::create_dir_all(&dir)
            .and_then(|_| writer.write_snapshot(&path, SaveFlags::AUTOSAVE, state));
        match written {
            Ok(()) => outcome.written = Some(path),
            Err(e) => {
                log::error!("Unable to autosave game: {e}");
                outcome.error = Some(e.to_string());
            }
        }

        match prune_autosaves(&dir, &self.config.extension, self.config.files_to_keep()) {
            Ok(pruned) => outcome.pruned = pruned,
            Err(e) => log::error!("Unable to clean autosaves: {e}"),
        }

        self.reset();
        outcome
    }
}

/// `autosave_YYYY-MM-DD_HH-MM-SS<ext>`. Lexical order is time order.
pub fn autosave_filename(wall: NaiveDateTime, extension: &str) -> String {
    format!("{AUTOSAVE_PREFIX}{}{extension}", wall.format("%Y-%m-%d_%H-%M-%S"))
}

/// Delete the oldest autosaves in `dir` until at most `keep` remain.
/// Only `autosave_*<extension>` files are considered. Returns the
/// deleted paths, oldest first.
pub fn prune_autosaves(dir: &Path, extension: &str, keep: usize) -> std::io::Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let extension = extension.to_ascii_lowercase();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(AUTOSAVE_PREFIX) && name.to_ascii_lowercase().ends_with(&extension) {
            files.push(entry.path());
        }
    }

    let keep = keep.max(1);
    if files.len() <= keep {
        return Ok(Vec::new());
    }
    files.sort();

    let excess = files.len() - keep;
    let mut deleted = Vec::with_capacity(excess);
    for path in files.into_iter().take(excess) {
        log::info!("Deleting old autosave: {}", path.display());
        std::fs::remove_file(&path)?;
        deleted.push(path);
    }
    Ok(deleted)
}
