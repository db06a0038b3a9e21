//! Publishing of the weekly payload.

use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::types::WeekPayload;

/// File name of the always-latest copy
pub const CURRENT_FILE: &str = "current.json";

/// Write `<week>.json` and `current.json` into `dir`, creating it if needed.
///
/// Returns the two paths written, week file first.
pub fn write_payload(dir: &Path, payload: &WeekPayload) -> anyhow::Result<(PathBuf, PathBuf)> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let json = serde_json::to_string_pretty(payload).context("Failed to serialize payload")?;

    let week_path = dir.join(format!("{}.json", payload.week));
    let current_path = dir.join(CURRENT_FILE);

    for path in [&week_path, &current_path] {
        fs::write(path, &json).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok((week_path, current_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Sources;

    fn payload(week: &str) -> WeekPayload {
        WeekPayload {
            generated_at: "2025-05-01T00:00:00+00:00".to_string(),
            week: week.to_string(),
            sources: Sources {
                calendar_url: "https://race.netkeiba.com/top/calendar.html?year=2025&month=5"
                    .to_string(),
            },
            races: Vec::new(),
        }
    }

    #[test]
    fn test_write_payload_creates_both_files() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("public").join("data");

        let (week_path, current_path) = write_payload(&out, &payload("2025-05-03")).unwrap();

        assert_eq!(week_path, out.join("2025-05-03.json"));
        assert_eq!(current_path, out.join("current.json"));

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&week_path).unwrap()).unwrap();
        assert_eq!(written["week"], "2025-05-03");
        assert_eq!(written["sources"]["calendarUrl"], payload("").sources.calendar_url);
        assert_eq!(
            fs::read_to_string(&week_path).unwrap(),
            fs::read_to_string(&current_path).unwrap()
        );
    }

    #[test]
    fn test_current_is_overwritten() {
        let dir = tempfile::tempdir().unwrap();

        write_payload(dir.path(), &payload("2025-05-03")).unwrap();
        write_payload(dir.path(), &payload("2025-05-10")).unwrap();

        let current = fs::read_to_string(dir.path().join(CURRENT_FILE)).unwrap();
        let current: WeekPayload = serde_json::from_str(&current).unwrap();
        assert_eq!(current.week, "2025-05-10");
        assert!(dir.path().join("2025-05-03.json").exists());
    }
}
