//! Raw document capture for post-hoc inspection of scraper failures.
//!
//! Layout: `<base_dir>/<YYYYMMDD>/<label>.html`. Writes are best effort; a
//! failed write is logged and otherwise ignored.

use std::path::PathBuf;
use tracing::warn;

/// Debug capture sink; disabled when no directory is configured
#[derive(Debug, Clone, Default)]
pub struct DebugCapture {
    base_dir: Option<PathBuf>,
}

impl DebugCapture {
    /// Create a capture rooted at the given directory
    pub fn new(base_dir: PathBuf) -> Self {
        Self {
            base_dir: Some(base_dir),
        }
    }

    /// Capture that never writes
    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn from_option(base_dir: Option<PathBuf>) -> Self {
        base_dir.map_or_else(Self::disabled, Self::new)
    }

    /// Get capture file path for a key
    fn capture_path(&self, day: &str, label: &str) -> Option<PathBuf> {
        let dir = self.base_dir.as_ref()?.join(sanitize(day));
        Some(dir.join(format!("{}.html", sanitize(label))))
    }

    /// Save a fetched document
    pub fn save(&self, day: &str, label: &str, html: &str) {
        let Some(path) = self.capture_path(day, label) else {
            return;
        };

        let result = path
            .parent()
            .map_or(Ok(()), std::fs::create_dir_all)
            .and_then(|_| std::fs::write(&path, html));

        if let Err(e) = result {
            warn!("Failed to write debug capture {}: {}", path.display(), e);
        }
    }
}

/// Keep capture keys to safe file-name characters
fn sanitize(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_writes_under_day_dir() {
        let dir = tempfile::tempdir().unwrap();
        let capture = DebugCapture::new(dir.path().to_path_buf());

        capture.save("20250504", "race_202505040101", "<html>東京</html>");

        let path = dir.path().join("20250504").join("race_202505040101.html");
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<html>東京</html>");
    }

    #[test]
    fn test_disabled_writes_nothing() {
        let capture = DebugCapture::disabled();
        assert!(capture.capture_path("20250504", "inner").is_none());
        capture.save("20250504", "inner", "<html></html>");
    }

    #[test]
    fn test_labels_are_sanitized() {
        let capture = DebugCapture::new(PathBuf::from("debug"));
        let path = capture.capture_path("2025-05-04", "../sub?group=1").unwrap();
        assert_eq!(path, PathBuf::from("debug/2025-05-04/___sub_group_1.html"));
    }
}
