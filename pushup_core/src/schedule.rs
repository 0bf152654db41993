//! The fixed two-week program and the daily target resolver.
//!
//! The program is a 2×7 table of `(intensity, interval)` pairs. Intensity is a
//! fraction of the user's baseline (their max test), interval is the number of
//! minutes between reminders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of weeks in one challenge cycle
pub const WEEKS: u32 = 2;

/// Number of training days per week
pub const DAYS_PER_WEEK: u32 = 7;

/// Total length of the program in days
pub const PROGRAM_DAYS: i64 = (WEEKS * DAYS_PER_WEEK) as i64;

/// One entry of the program table
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProgramDay {
    /// Share of the baseline in whole percent, kept integral so the floor is exact
    pub intensity_percent: u32,
    pub interval_minutes: u32,
}

/// Longest interval any program day uses
pub const MAX_INTERVAL_MINUTES: u32 = 120;

const fn day(intensity_percent: u32, interval_minutes: u32) -> ProgramDay {
    ProgramDay {
        intensity_percent,
        interval_minutes,
    }
}

/// The canonical program table, indexed `[week - 1][day_index]`.
pub const PROGRAM: [[ProgramDay; DAYS_PER_WEEK as usize]; WEEKS as usize] = [
    [
        day(30, 60),
        day(50, 60),
        day(60, 45),
        day(25, 60),
        day(45, 30),
        day(40, 60),
        day(20, 90),
    ],
    [
        day(35, 45),
        day(55, 20),
        day(30, 15),
        day(65, 60),
        day(35, 60),
        day(45, 60),
        day(25, 120),
    ],
];

/// Look up the table entry for a week (1-based) and day index (0-based).
///
/// Out-of-range values are clamped to the edges of the table.
pub fn program_day(week: u32, day_index: u32) -> &'static ProgramDay {
    let w = week.clamp(1, WEEKS) as usize - 1;
    let d = day_index.min(DAYS_PER_WEEK - 1) as usize;
    &PROGRAM[w][d]
}

/// Reps prescribed for one reminder, and how often reminders fire
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyTarget {
    pub reps: u32,
    pub interval_minutes: u32,
}

/// Resolve the target for a given program day.
///
/// Returns `None` while no baseline has been set. On the baseline day (day
/// index 0) before the max test has been logged, the target is the raw
/// baseline. Otherwise it is `floor(baseline * intensity)`, never below one.
pub fn daily_target(
    week: u32,
    day_index: u32,
    baseline: u32,
    baseline_day_uncounted: bool,
) -> Option<DailyTarget> {
    if baseline == 0 {
        return None;
    }

    let entry = program_day(week, day_index);
    let reps = if day_index == 0 && baseline_day_uncounted {
        baseline
    } else {
        ((baseline as u64 * entry.intensity_percent as u64 / 100) as u32).max(1)
    };

    Some(DailyTarget {
        reps,
        interval_minutes: entry.interval_minutes,
    })
}

/// Where in the program a moment in time falls, derived from the start date.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProgramPosition {
    pub days_since_start: i64,
    pub week: u32,
    pub day_index: u32,
    pub completed: bool,
}

impl ProgramPosition {
    /// Compute the position from whole elapsed days since `start`.
    ///
    /// A clock that moved backwards before `start` counts as day zero.
    pub fn at(start: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        let days = (now - start).num_days().max(0);
        Self::from_days(days)
    }

    pub fn from_days(days_since_start: i64) -> Self {
        let days = days_since_start.max(0);
        let per_week = DAYS_PER_WEEK as i64;
        let week = (days / per_week + 1).min(WEEKS as i64) as u32;
        let day_index = if days < PROGRAM_DAYS {
            (days % per_week).min(per_week - 1) as u32
        } else {
            DAYS_PER_WEEK - 1
        };

        Self {
            days_since_start: days,
            week,
            day_index,
            completed: days >= PROGRAM_DAYS,
        }
    }

    /// The position before the challenge has started
    pub fn not_started() -> Self {
        Self::from_days(0)
    }

    /// Human-facing day number within the week (1-based)
    pub fn day_number(&self) -> u32 {
        self.day_index + 1
    }
}
