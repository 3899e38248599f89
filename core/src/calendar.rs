//! In-game calendar.
//!
//! The date is a pure function of the day counter: nothing else feeds
//! into it. Ticks reach the day counter through a 16-bit fraction that
//! wraps once per day.

use chrono::{Datelike, Days, Month, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::config::CalendarConfig;

/// Months on which the quarterly update fires.
pub const QUARTER_MONTHS: [u32; 4] = [1, 4, 7, 10];

/// First day-of-year (0-based) of the summer snow line.
const SUMMER_START_DAY: u32 = 90;
/// First day-of-year (0-based) of the winter snow line.
const WINTER_START_DAY: u32 = 273;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct CalendarDate {
    pub year:        i32,
    /// 1 = January.
    pub month:       u32,
    /// 1-based day of the month.
    pub day:         u32,
    /// 0-based day of the year.
    pub day_of_year: u32,
}

impl CalendarDate {
    fn from_naive(date: NaiveDate) -> Self {
        Self {
            year:        date.year(),
            month:       date.month(),
            day:         date.day(),
            day_of_year: date.ordinal0(),
        }
    }

    pub fn month_name(&self) -> &'static str {
        u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("?")
    }

    pub fn is_quarter_start(&self) -> bool {
        QUARTER_MONTHS.contains(&self.month)
    }
}

impl std::fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Maps day counters to dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    epoch: NaiveDate,
}

impl Calendar {
    pub fn new(epoch_year: i32) -> Self {
        let epoch = NaiveDate::from_ymd_opt(epoch_year, 1, 1).unwrap_or(NaiveDate::MIN);
        Self { epoch }
    }

    pub fn from_config(config: &CalendarConfig) -> Self {
        Self::new(config.epoch_year)
    }

    /// Date of day `day`, counted from January 1st of the epoch year.
    pub fn date(&self, day: u32) -> CalendarDate {
        let date = self
            .epoch
            .checked_add_days(Days::new(day as u64))
            .unwrap_or(NaiveDate::MAX);
        CalendarDate::from_naive(date)
    }

    /// Compare the dates either side of the step from `day - 1` to `day`.
    pub fn transition(&self, day: u32) -> DayTransition {
        DayTransition {
            yesterday: self.date(day.saturating_sub(1)),
            today:     self.date(day),
        }
    }
}

/// The boundary crossed by a single day increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTransition {
    pub yesterday: CalendarDate,
    pub today:     CalendarDate,
}

impl DayTransition {
    pub fn month_changed(&self) -> bool {
        self.today.month != self.yesterday.month || self.year_changed()
    }

    pub fn quarter_started(&self) -> bool {
        self.month_changed() && self.today.is_quarter_start()
    }

    pub fn year_changed(&self) -> bool {
        self.today.year != self.yesterday.year
    }
}

/// Days since the epoch plus the sub-day fraction.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayCounter {
    pub day:      u32,
    pub fraction: u16,
}

impl DayCounter {
    /// Add one tick's worth of day fraction. Returns `true` when this
    /// crossed into a new day.
    pub fn advance(&mut self, fraction_per_tick: u16) -> bool {
        let (fraction, wrapped) = self.fraction.overflowing_add(fraction_per_tick);
        self.fraction = fraction;
        if wrapped {
            self.day = self.day.saturating_add(1);
        }
        wrapped
    }
}

/// Snow line that drifts one unit per day towards its seasonal target.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnowLine {
    pub current: u8,
}

impl SnowLine {
    pub fn new(config: &CalendarConfig) -> Self {
        Self { current: config.winter_snow_line }
    }

    pub fn target(day_of_year: u32, config: &CalendarConfig) -> u8 {
        if (SUMMER_START_DAY..WINTER_START_DAY).contains(&day_of_year) {
            config.summer_snow_line
        } else {
            config.winter_snow_line
        }
    }

    pub fn update(&mut self, day_of_year: u32, config: &CalendarConfig) {
        let target = Self::target(day_of_year, config);
        match self.current.cmp(&target) {
            std::cmp::Ordering::Less    => self.current += 1,
            std::cmp::Ordering::Greater => self.current -= 1,
            std::cmp::Ordering::Equal   => {}
        }
    }
}
