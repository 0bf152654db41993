//! CSV export of the daily totals log.

use crate::history::{DayTotal, DAY_FORMAT};
use crate::Result;
use std::path::Path;

#[derive(Debug, serde::Serialize)]
struct CsvRow {
    date: String,
    pushups: u32,
}

impl From<&DayTotal> for CsvRow {
    fn from(entry: &DayTotal) -> Self {
        CsvRow {
            date: entry.day.format(DAY_FORMAT).to_string(),
            pushups: entry.total,
        }
    }
}

/// Write the progress history to `csv_path`, replacing any previous export.
///
/// Returns the number of rows written.
pub fn export_csv(csv_path: &Path, history: &[DayTotal]) -> Result<usize> {
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_path(csv_path)?;

    for entry in history {
        writer.serialize(CsvRow::from(entry))?;
    }
    writer.flush()?;

    tracing::info!("Exported {} days to {:?}", history.len(), csv_path);
    Ok(history.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_export_writes_header_and_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("out").join("progress.csv");

        let history = vec![
            DayTotal {
                day: NaiveDate::from_ymd_opt(2026, 5, 3).unwrap(),
                total: 40,
            },
            DayTotal {
                day: NaiveDate::from_ymd_opt(2026, 5, 4).unwrap(),
                total: 60,
            },
        ];

        let count = export_csv(&csv_path, &history).unwrap();
        assert_eq!(count, 2);

        let content = std::fs::read_to_string(&csv_path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines, vec!["date,pushups", "2026-05-03,40", "2026-05-04,60"]);
    }

    #[test]
    fn test_export_empty_history_has_no_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let csv_path = temp_dir.path().join("progress.csv");

        assert_eq!(export_csv(&csv_path, &[]).unwrap(), 0);
        let content = std::fs::read_to_string(&csv_path).unwrap();
        assert!(content.lines().count() <= 1);
    }
}
