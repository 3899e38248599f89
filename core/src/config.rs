//! Scheduler configuration: read-only inputs to the tick core.
//!
//! Every field has a default, so a config file only needs to name
//! what it overrides.

use crate::error::{SimError, SimResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Length of one scheduler step, in milliseconds.
    pub tick_period_ms: u64,
    /// Wall time one logic tick nominally represents. Steps that arrive
    /// late want `ms_since_last_tick / nominal_tick_ms` logic ticks and
    /// pay for each extra one with a period from the accumulator.
    pub nominal_tick_ms: u16,
    /// Upper bound on elapsed time credited to the accumulator per frame.
    pub max_frame_delta_ms: u64,
    /// Upper bound on logic ticks per step before the speed multiplier.
    pub max_updates_per_step: u16,
    /// `true` selects variable-rate mode with interpolation.
    pub uncapped_frame_rate: bool,
    /// Networked catch-up bound, in ticks.
    pub catch_up_threshold: u32,
    /// Sleep between frames when fixed-rate mode had nothing to do.
    pub idle_sleep_ms: u64,
    /// Master seed for the per-tick RNG streams.
    pub seed: u64,
    pub calendar: CalendarConfig,
    pub autosave: AutosaveConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period_ms:       25,
            nominal_tick_ms:      31,
            max_frame_delta_ms:   500,
            max_updates_per_step: 3,
            uncapped_frame_rate:  false,
            catch_up_threshold:   4,
            idle_sleep_ms:        1,
            seed:                 0,
            calendar:             CalendarConfig::default(),
            autosave:             AutosaveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CalendarConfig {
    /// Day 0 is January 1st of this year.
    pub epoch_year: i32,
    /// Added to the 16-bit day fraction every tick; a wrap is a new day.
    pub day_fraction_per_tick: u16,
    /// Last calendar year in which the monthly economy update runs.
    pub economy_cutoff_year: i32,
    pub summer_snow_line: u8,
    pub winter_snow_line: u8,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            epoch_year:            1800,
            day_fraction_per_tick: 682,
            economy_cutoff_year:   2029,
            summer_snow_line:      96,
            winter_snow_line:      48,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AutosaveConfig {
    /// Months between autosaves. Zero or negative disables autosave.
    pub frequency_months: i32,
    /// How many autosave files to keep. Values below 1 are treated as 1.
    pub retention: i32,
    pub directory: PathBuf,
    /// File extension including the leading dot.
    pub extension: String,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            frequency_months: 1,
            retention:        12,
            directory:        PathBuf::from("autosave"),
            extension:        ".sv5".to_string(),
        }
    }
}

impl AutosaveConfig {
    pub fn is_enabled(&self) -> bool {
        self.frequency_months > 0
    }

    pub fn files_to_keep(&self) -> usize {
        self.retention.max(1) as usize
    }
}

impl SchedulerConfig {
    /// Load a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> SimResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn from_json(json: &str) -> SimResult<Self> {
        let config: SchedulerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> SimResult<()> {
        if self.tick_period_ms == 0 {
            return Err(SimError::InvalidConfig {
                reason: "tick_period_ms must be at least 1".to_string(),
            });
        }
        if self.nominal_tick_ms == 0 {
            return Err(SimError::InvalidConfig {
                reason: "nominal_tick_ms must be at least 1".to_string(),
            });
        }
        if self.calendar.day_fraction_per_tick == 0 {
            return Err(SimError::InvalidConfig {
                reason: "calendar.day_fraction_per_tick must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
