//! Mapping between the engine's state and the settings store.
//!
//! The engine never touches keys directly: it builds a [`Snapshot`] and hands
//! it to [`save`]. Loading is forgiving, so a value with the wrong type or an
//! unparseable date reads as absent.

use crate::history::{parse_day, DailyTotals, DAY_FORMAT};
use crate::schedule::MAX_INTERVAL_MINUTES;
use crate::store::{keys, SettingsStore};
use crate::timer::TimerState;
use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::Value;

/// Persisted challenge state
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub start_date: Option<DateTime<Utc>>,
    pub baseline: u32,
    pub totals: DailyTotals,
    pub max_test_counted: bool,
    pub challenge_started: bool,
    pub last_updated_day: Option<NaiveDate>,
    pub interval_minutes: u32,
    pub remaining_secs: u32,
    pub target_reps: u32,
    pub timer_state: TimerState,
    pub done_for_day: Option<NaiveDate>,
}

pub fn load(store: &dyn SettingsStore) -> Snapshot {
    Snapshot {
        start_date: store
            .get(keys::START_DATE)
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc)),
        baseline: read_u32(store, keys::BASE_PUSHUPS),
        totals: store
            .get(keys::DAILY_PUSHUP_TOTALS)
            .map(|v| DailyTotals::from_json(&v))
            .unwrap_or_default(),
        max_test_counted: read_bool(store, keys::MAX_TEST_COUNTED),
        challenge_started: read_bool(store, keys::CHALLENGE_STARTED),
        last_updated_day: read_day(store, keys::LAST_UPDATED_DAY),
        interval_minutes: read_interval(store),
        remaining_secs: read_u32(store, keys::TIME_REMAINING_SECONDS),
        target_reps: read_u32(store, keys::CURRENT_PUSHUPS),
        timer_state: store
            .get(keys::TIMER_STATE)
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default(),
        done_for_day: read_day(store, keys::DONE_FOR_TODAY),
    }
}

/// Stage every field of `snapshot`, then commit.
///
/// Absent optional fields remove their key.
pub fn save(store: &mut dyn SettingsStore, snapshot: &Snapshot) -> Result<()> {
    match snapshot.start_date {
        Some(start) => store.set(keys::START_DATE, Value::from(start.to_rfc3339()))?,
        None => store.remove(keys::START_DATE)?,
    }
    store.set(keys::BASE_PUSHUPS, Value::from(snapshot.baseline))?;
    store.set(keys::DAILY_PUSHUP_TOTALS, snapshot.totals.to_json())?;
    store.set(keys::MAX_TEST_COUNTED, Value::from(snapshot.max_test_counted))?;
    store.set(keys::CHALLENGE_STARTED, Value::from(snapshot.challenge_started))?;
    write_day(store, keys::LAST_UPDATED_DAY, snapshot.last_updated_day)?;
    store.set(keys::CURRENT_FREQUENCY, Value::from(snapshot.interval_minutes))?;
    store.set(keys::TIME_REMAINING_SECONDS, Value::from(snapshot.remaining_secs))?;
    store.set(keys::CURRENT_PUSHUPS, Value::from(snapshot.target_reps))?;
    store.set(keys::TIMER_STATE, serde_json::to_value(snapshot.timer_state)?)?;
    write_day(store, keys::DONE_FOR_TODAY, snapshot.done_for_day)?;
    store.commit()
}

/// Remove every key tied to the cycle, then commit.
pub fn clear(store: &mut dyn SettingsStore) -> Result<()> {
    for key in keys::ALL {
        store.remove(key)?;
    }
    store.commit()
}

fn read_u32(store: &dyn SettingsStore, key: &str) -> u32 {
    store
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or(0)
}

/// An interval no program day uses reads as absent
fn read_interval(store: &dyn SettingsStore) -> u32 {
    let minutes = read_u32(store, keys::CURRENT_FREQUENCY);
    if minutes > MAX_INTERVAL_MINUTES {
        tracing::warn!("Ignoring out-of-range reminder interval of {} minutes", minutes);
        return 0;
    }
    minutes
}

fn read_bool(store: &dyn SettingsStore, key: &str) -> bool {
    store.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn read_day(store: &dyn SettingsStore, key: &str) -> Option<NaiveDate> {
    store
        .get(key)
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_day)
}

fn write_day(store: &mut dyn SettingsStore, key: &str, day: Option<NaiveDate>) -> Result<()> {
    match day {
        Some(day) => store.set(key, Value::from(day.format(DAY_FORMAT).to_string())),
        None => store.remove(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::TimeZone;
    use serde_json::json;

    fn sample() -> Snapshot {
        let mut totals = DailyTotals::new();
        totals.add(NaiveDate::from_ymd_opt(2026, 6, 1).unwrap(), 40);
        Snapshot {
            start_date: Some(Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap()),
            baseline: 40,
            totals,
            max_test_counted: true,
            challenge_started: true,
            last_updated_day: NaiveDate::from_ymd_opt(2026, 6, 1),
            interval_minutes: 60,
            remaining_secs: 1234,
            target_reps: 40,
            timer_state: TimerState::Paused,
            done_for_day: None,
        }
    }

    #[test]
    fn test_out_of_range_interval_reads_as_absent() {
        let mut store = MemoryStore::new();
        store.set(keys::CURRENT_FREQUENCY, json!(100_000_000)).unwrap();
        store.set(keys::TIMER_STATE, json!("running")).unwrap();
        assert_eq!(load(&store).interval_minutes, 0);

        store.set(keys::CURRENT_FREQUENCY, json!(121)).unwrap();
        assert_eq!(load(&store).interval_minutes, 0);

        store.set(keys::CURRENT_FREQUENCY, json!(120)).unwrap();
        assert_eq!(load(&store).interval_minutes, 120);
    }

    #[test]
    fn test_saved_snapshot_loads_back() {
        let mut store = MemoryStore::new();
        save(&mut store, &sample()).unwrap();
        assert_eq!(load(&store), sample());
        assert!(store.get(keys::DONE_FOR_TODAY).is_none());
    }

    #[test]
    fn test_empty_store_is_default() {
        let store = MemoryStore::new();
        assert_eq!(load(&store), Snapshot::default());
    }

    #[test]
    fn test_corrupt_values_read_as_absent() {
        let mut store = MemoryStore::new();
        store.set(keys::START_DATE, json!("not a date")).unwrap();
        store.set(keys::BASE_PUSHUPS, json!(-5)).unwrap();
        store.set(keys::MAX_TEST_COUNTED, json!("yes")).unwrap();
        store.set(keys::LAST_UPDATED_DAY, json!(17)).unwrap();
        store.set(keys::TIMER_STATE, json!("sprinting")).unwrap();
        store.set(keys::DAILY_PUSHUP_TOTALS, json!("oops")).unwrap();

        let snapshot = load(&store);
        assert!(snapshot.start_date.is_none());
        assert_eq!(snapshot.baseline, 0);
        assert!(!snapshot.max_test_counted);
        assert!(snapshot.last_updated_day.is_none());
        assert_eq!(snapshot.timer_state, TimerState::Stopped);
        assert!(snapshot.totals.is_empty());
    }

    #[test]
    fn test_clear_removes_all_keys() {
        let mut store = MemoryStore::new();
        save(&mut store, &sample()).unwrap();
        store.set(keys::DONE_FOR_TODAY, json!("2026-06-01")).unwrap();

        clear(&mut store).unwrap();
        assert!(store.is_empty());
    }
}
