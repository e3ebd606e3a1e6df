//! Failed plate tracking.
//!
//! Remembers plate files that failed processing so they can be listed and
//! retried later.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::error::StoreError;

/// Maximum number of failed plates to keep in history
const MAX_FAILED_PLATES: usize = 100;

/// A plate file that failed to process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedPlate {
    /// Path to the plate file
    pub path: PathBuf,
    /// Plate id, when the file decoded far enough to have one
    #[serde(default)]
    pub plate_id: Option<String>,
    /// Reason for failure
    pub reason: String,
    /// When the failure occurred
    pub failed_at: DateTime<Utc>,
    /// Number of retry attempts
    #[serde(default)]
    pub retry_count: u32,
}

/// History of failed plates, persisted as one JSON file.
#[derive(Debug, Clone, Default)]
pub struct FailedPlates {
    path: PathBuf,
    plates: HashMap<PathBuf, FailedPlate>,
}

#[derive(Serialize, Deserialize, Default)]
struct FailedPlatesFile {
    plates: Vec<FailedPlate>,
}

impl FailedPlates {
    /// Load the history, starting empty when the file does not exist yet.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let mut failed = Self {
            path: path.to_path_buf(),
            plates: HashMap::new(),
        };
        if !path.exists() {
            return Ok(failed);
        }

        let content = std::fs::read_to_string(path).map_err(|e| StoreError::FileOperation(e.to_string()))?;
        let file: FailedPlatesFile = serde_json::from_str(&content)?;
        failed.plates = file.plates.into_iter().map(|p| (p.path.clone(), p)).collect();
        Ok(failed)
    }

    /// Write the history to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::FileOperation(e.to_string()))?;
        }
        let file = FailedPlatesFile {
            plates: self.all(),
        };
        let content = serde_json::to_string_pretty(&file)?;
        std::fs::write(&self.path, content).map_err(|e| StoreError::FileOperation(e.to_string()))
    }

    /// Record a failure. A plate that fails again keeps its retry count.
    pub fn record_failure(&mut self, path: &Path, plate_id: Option<String>, reason: String) {
        let retry_count = self.plates.get(path).map(|p| p.retry_count).unwrap_or(0);
        self.plates.insert(
            path.to_path_buf(),
            FailedPlate {
                path: path.to_path_buf(),
                plate_id,
                reason,
                failed_at: Utc::now(),
                retry_count,
            },
        );
        self.trim_to_max();
        self.persist();
    }

    /// Forget a plate after it processed successfully.
    pub fn mark_success(&mut self, path: &Path) {
        if self.plates.remove(path).is_some() {
            self.persist();
        }
    }

    /// Count a retry attempt; returns the entry to retry.
    pub fn begin_retry(&mut self, path: &Path) -> Option<FailedPlate> {
        let plate = self.plates.get_mut(path)?;
        plate.retry_count += 1;
        let plate = plate.clone();
        self.persist();
        Some(plate)
    }

    /// All failed plates, most recent first.
    pub fn all(&self) -> Vec<FailedPlate> {
        let mut plates: Vec<FailedPlate> = self.plates.values().cloned().collect();
        plates.sort_by(|a, b| b.failed_at.cmp(&a.failed_at).then_with(|| a.path.cmp(&b.path)));
        plates
    }

    pub fn count(&self) -> usize {
        self.plates.len()
    }

    pub fn clear(&mut self) {
        self.plates.clear();
        self.persist();
    }

    fn persist(&self) {
        if let Err(e) = self.save() {
            warn!(path = %self.path.display(), error = %e, "Failed to save failed plate history");
        }
    }

    /// Drop the oldest entries beyond the cap.
    fn trim_to_max(&mut self) {
        if self.plates.len() <= MAX_FAILED_PLATES {
            return;
        }

        let mut entries: Vec<_> = self.plates.values().collect();
        entries.sort_by(|a, b| a.failed_at.cmp(&b.failed_at));

        let to_remove_count = self.plates.len() - MAX_FAILED_PLATES;
        let paths_to_remove: Vec<PathBuf> = entries
            .into_iter()
            .take(to_remove_count)
            .map(|p| p.path.clone())
            .collect();

        for path in paths_to_remove {
            self.plates.remove(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_record_and_reload() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("failed.json");
        let mut failed = FailedPlates::load(&file).unwrap();
        assert_eq!(failed.count(), 0);

        failed.record_failure(Path::new("/data/a.plate.json"), Some("a".to_string()), "bad json".to_string());
        failed.record_failure(Path::new("/data/b.plate.json"), None, "missing channel".to_string());

        let reloaded = FailedPlates::load(&file).unwrap();
        assert_eq!(reloaded.count(), 2);
        let all = reloaded.all();
        assert!(all[0].failed_at >= all[1].failed_at);
        assert!(all.iter().any(|p| p.plate_id.as_deref() == Some("a")));
    }

    #[test]
    fn test_retry_and_success() {
        let dir = TempDir::new().unwrap();
        let mut failed = FailedPlates::load(&dir.path().join("failed.json")).unwrap();
        let path = Path::new("/data/a.plate.json");
        failed.record_failure(path, None, "boom".to_string());

        assert_eq!(failed.begin_retry(path).unwrap().retry_count, 1);
        failed.record_failure(path, None, "boom again".to_string());
        assert_eq!(failed.all()[0].retry_count, 1);
        assert_eq!(failed.all()[0].reason, "boom again");

        failed.mark_success(path);
        assert_eq!(failed.count(), 0);
        assert!(failed.begin_retry(path).is_none());
    }

    #[test]
    fn test_history_is_capped() {
        let dir = TempDir::new().unwrap();
        let mut failed = FailedPlates::load(&dir.path().join("failed.json")).unwrap();
        for i in 0..(MAX_FAILED_PLATES + 5) {
            failed.record_failure(&PathBuf::from(format!("/data/{}.plate.json", i)), None, "x".to_string());
        }
        assert_eq!(failed.count(), MAX_FAILED_PLATES);

        failed.clear();
        assert_eq!(failed.count(), 0);
    }
}
