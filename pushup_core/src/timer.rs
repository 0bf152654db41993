//! Reminder countdown.
//!
//! The countdown is a tick-driven state machine with no internal thread: the
//! host calls [`Countdown::tick`] once per wall-clock second.
//!
//! ```text
//! Stopped -> Running <-> Paused
//!    ^          |
//!    +--stop()--+
//! ```
//!
//! On reaching zero the countdown reports [`Fired`] and re-arms itself to the
//! full interval, so it runs until explicitly stopped.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimerState {
    #[default]
    Stopped,
    Running,
    Paused,
}

/// Marker returned by [`Countdown::tick`] when the interval elapsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Countdown {
    state: TimerState,
    interval_minutes: u32,
    remaining_secs: u32,
}

impl Countdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a countdown from persisted values.
    ///
    /// Without an interval the countdown comes back stopped. A zero remaining
    /// time on a live countdown is refilled to the full interval, and a
    /// remaining time longer than the interval is cut down to it.
    pub fn restore(state: TimerState, interval_minutes: u32, remaining_secs: u32) -> Self {
        if interval_minutes == 0 {
            return Self::new();
        }

        let mut countdown = Self {
            state,
            interval_minutes,
            remaining_secs,
        };
        countdown.remaining_secs = remaining_secs.min(countdown.interval_secs());
        if state != TimerState::Stopped && remaining_secs == 0 {
            countdown.rewind();
        }
        countdown
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == TimerState::Running
    }

    pub fn is_paused(&self) -> bool {
        self.state == TimerState::Paused
    }

    pub fn interval_minutes(&self) -> u32 {
        self.interval_minutes
    }

    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    pub fn interval_secs(&self) -> u32 {
        self.interval_minutes.max(1).saturating_mul(60)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Arm a fresh countdown for `interval_minutes` and start running.
    pub fn start(&mut self, interval_minutes: u32) {
        self.interval_minutes = interval_minutes.max(1);
        self.remaining_secs = self.interval_secs();
        self.state = TimerState::Running;
    }

    pub fn pause(&mut self) -> bool {
        if self.state != TimerState::Running {
            return false;
        }
        self.state = TimerState::Paused;
        true
    }

    pub fn resume(&mut self) -> bool {
        if self.state != TimerState::Paused {
            return false;
        }
        self.state = TimerState::Running;
        true
    }

    /// Halt from any state and clear the remaining time.
    pub fn stop(&mut self) {
        self.state = TimerState::Stopped;
        self.remaining_secs = 0;
    }

    /// Change the interval used by the next start or re-arm.
    pub fn set_interval(&mut self, interval_minutes: u32) {
        self.interval_minutes = interval_minutes.max(1);
    }

    /// Refill to the full interval without changing state.
    pub fn rewind(&mut self) {
        self.remaining_secs = self.interval_secs();
    }

    /// Advance one second. Only a running countdown moves.
    pub fn tick(&mut self) -> Option<Fired> {
        if self.state != TimerState::Running {
            return None;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);
        if self.remaining_secs == 0 {
            self.rewind();
            return Some(Fired);
        }
        None
    }
}

/// Render a remaining time as `MM:SS`, or `H:MM:SS` from one hour up.
pub fn format_remaining(secs: u32) -> String {
    let hours = secs / 3600;
    let minutes = (secs % 3600) / 60;
    let seconds = secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}
