//! Daily totals log.
//!
//! One entry per calendar day with the reps performed that day. Entries only
//! grow within a day and are removed only by a full reset.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Day key format used in the persisted map
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Reps performed on one calendar day
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    pub day: NaiveDate,
    pub total: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DailyTotals {
    days: BTreeMap<NaiveDate, u32>,
}

impl DailyTotals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add reps to a day's total, creating the entry on first use.
    pub fn add(&mut self, day: NaiveDate, reps: u32) -> u32 {
        let total = self.days.entry(day).or_insert(0);
        *total = total.saturating_add(reps);
        *total
    }

    pub fn get(&self, day: NaiveDate) -> u32 {
        self.days.get(&day).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    /// All days in ascending order
    pub fn history(&self) -> Vec<DayTotal> {
        self.days
            .iter()
            .map(|(&day, &total)| DayTotal { day, total })
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.days.values().map(|&t| t as u64).sum()
    }

    /// Serialize as a `"YYYY-MM-DD" -> reps` object
    pub fn to_json(&self) -> Value {
        let map: Map<String, Value> = self
            .days
            .iter()
            .map(|(day, total)| (day.format(DAY_FORMAT).to_string(), Value::from(*total)))
            .collect();
        Value::Object(map)
    }

    /// Parse the persisted object, skipping entries that do not parse.
    ///
    /// Keys may be plain dates or full RFC 3339 timestamps.
    pub fn from_json(value: &Value) -> Self {
        let mut totals = Self::new();
        let Some(map) = value.as_object() else {
            tracing::warn!("Daily totals are not an object, ignoring");
            return totals;
        };

        for (key, raw) in map {
            let Some(day) = parse_day(key) else {
                tracing::warn!("Skipping daily total with unreadable day {:?}", key);
                continue;
            };
            let Some(reps) = raw.as_u64().and_then(|r| u32::try_from(r).ok()) else {
                tracing::warn!("Skipping daily total for {} with value {}", day, raw);
                continue;
            };
            totals.add(day, reps);
        }
        totals
    }
}

/// Parse a day key in either `YYYY-MM-DD` or RFC 3339 form
pub fn parse_day(key: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(key, DAY_FORMAT)
        .ok()
        .or_else(|| {
            chrono::DateTime::parse_from_rfc3339(key)
                .ok()
                .map(|dt| dt.date_naive())
        })
}
