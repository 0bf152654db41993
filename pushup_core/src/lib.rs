#![forbid(unsafe_code)]

//! Core state engine for the two-week pushup challenge.
//!
//! This crate provides:
//! - The fixed program schedule and daily target resolver
//! - Reminder countdown and resume wake
//! - Day-transition evaluation
//! - The challenge engine that ties them together
//! - Persistence through a pluggable settings store

pub mod error;
pub mod schedule;
pub mod clock;
pub mod timer;
pub mod wake;
pub mod transition;
pub mod history;
pub mod export;
pub mod store;
pub mod persist;
pub mod notify;
pub mod config;
pub mod logging;
pub mod engine;

// Re-export commonly used types
pub use error::{Error, Result};
pub use clock::{Clock, ManualClock, ReferenceTime, SystemClock};
pub use config::Config;
pub use engine::{ChallengeEngine, Status, UiMode};
pub use history::{DailyTotals, DayTotal};
pub use notify::{FixedAnswer, Reminder, ReminderSink};
pub use schedule::{daily_target, DailyTarget, ProgramPosition};
pub use store::{JsonFileStore, MemoryStore, SettingsStore};
pub use timer::TimerState;
pub use wake::WakeToken;
