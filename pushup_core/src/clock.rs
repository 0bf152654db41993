//! Time source and the program's reference time zone.
//!
//! Calendar days, the restricted window and the resume boundary are all
//! evaluated in a fixed reference zone (CET by default), independent of the
//! device's local zone.

use chrono::{DateTime, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use std::cell::Cell;
use std::rc::Rc;

/// Default reference zone for day boundaries
pub const DEFAULT_TIME_ZONE: Tz = chrono_tz::CET;

/// Hour (in the reference zone) at which reminders resume each day
pub const DEFAULT_RESUME_HOUR: u32 = 9;

/// Source of the current instant
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A settable clock. Clones share the same instant.
#[derive(Clone, Debug)]
pub struct ManualClock {
    now: Rc<Cell<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Rc::new(Cell::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        self.now.set(now);
    }

    pub fn advance(&self, by: chrono::Duration) {
        self.now.set(self.now.get() + by);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now.get()
    }
}

/// Reference zone plus the daily resume hour.
///
/// The restricted window is `[00:00, resume_hour:00)` local to `tz`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReferenceTime {
    pub tz: Tz,
    pub resume_hour: u32,
}

impl Default for ReferenceTime {
    fn default() -> Self {
        Self {
            tz: DEFAULT_TIME_ZONE,
            resume_hour: DEFAULT_RESUME_HOUR,
        }
    }
}

impl ReferenceTime {
    pub fn new(tz: Tz, resume_hour: u32) -> Self {
        Self { tz, resume_hour }
    }

    /// Calendar day of `now` in the reference zone
    pub fn local_day(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.tz).date_naive()
    }

    /// Hour of day of `now` in the reference zone
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.tz).hour()
    }

    /// Whether reminders are suppressed at `now`
    pub fn is_restricted(&self, now: DateTime<Utc>) -> bool {
        self.local_hour(now) < self.resume_hour
    }

    /// The next resume boundary.
    ///
    /// Today's boundary if `now` is still before it, otherwise tomorrow's.
    /// Returns `None` when the boundary does not exist in the zone.
    pub fn next_resume_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let local = now.with_timezone(&self.tz);
        let date = if local.hour() < self.resume_hour {
            local.date_naive()
        } else {
            local.date_naive().succ_opt()?
        };
        let boundary = date.and_hms_opt(self.resume_hour, 0, 0)?;
        let at = self.tz.from_local_datetime(&boundary).earliest()?;
        Some(at.with_timezone(&Utc))
    }
}
