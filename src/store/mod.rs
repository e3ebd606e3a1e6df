//! File-backed persistence for plates, metric trees and analysis groups.
//!
//! Every write goes to a hidden temp file first and is then renamed into
//! place, so a reader never sees a half-written record. A metric tree is
//! keyed by (plate, reprocess config) and replaced whole.

pub mod failed;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{AnalysisGroup, PlateMetric, PlateRecord};

pub use failed::{FailedPlate, FailedPlates};

/// Storage seam for the batch driver and the report commands.
#[cfg_attr(test, mockall::automock)]
pub trait MetricStore {
    fn save_plate(&self, plate: &PlateRecord) -> Result<(), StoreError>;

    fn plate(&self, id: &str) -> Result<PlateRecord, StoreError>;

    /// All plates, oldest run first.
    fn plates(&self) -> Result<Vec<PlateRecord>, StoreError>;

    /// Delete any tree stored under the same (plate, reprocess config) key
    /// and store this one in its place.
    fn replace_plate_metric(&self, metric: &PlateMetric) -> Result<(), StoreError>;

    fn plate_metric(&self, plate_id: &str, reprocess_config_id: Option<u32>)
        -> Result<Option<PlateMetric>, StoreError>;

    /// Trees of the given plates under one reprocess config. Plates without
    /// a tree under that config are skipped.
    fn plate_metrics(
        &self,
        plate_ids: &[String],
        reprocess_config_id: Option<u32>,
    ) -> Result<Vec<PlateMetric>, StoreError>;

    fn save_group(&self, group: &AnalysisGroup) -> Result<(), StoreError>;

    fn group(&self, id: &Uuid) -> Result<AnalysisGroup, StoreError>;

    fn groups(&self) -> Result<Vec<AnalysisGroup>, StoreError>;
}

/// Plates of one reader, oldest run first.
pub fn plates_by_reader(store: &dyn MetricStore, reader: &str) -> Result<Vec<PlateRecord>, StoreError> {
    Ok(store
        .plates()?
        .into_iter()
        .filter(|p| p.reader.as_deref() == Some(reader))
        .collect())
}

/// Plates of an analysis group, in group order. Missing plates are skipped.
pub fn plates_in_group(store: &dyn MetricStore, group: &AnalysisGroup) -> Result<Vec<PlateRecord>, StoreError> {
    let mut plates = Vec::with_capacity(group.plate_ids.len());
    for id in &group.plate_ids {
        match store.plate(id) {
            Ok(plate) => plates.push(plate),
            Err(StoreError::NotFound(_)) => warn!(group = %group.id, plate_id = %id, "Group plate not in store"),
            Err(e) => return Err(e),
        }
    }
    Ok(plates)
}

/// Directory-backed JSON store.
///
/// Layout under the root:
/// `plates/<id>.json`, `metrics/<plate>__<rc|original>.json` and
/// `groups/<uuid>.json`.
#[derive(Debug, Clone)]
pub struct JsonMetricStore {
    root: PathBuf,
}

impl JsonMetricStore {
    /// Open a store, creating its directories as needed.
    pub fn open(root: &Path) -> Result<Self, StoreError> {
        let store = Self {
            root: root.to_path_buf(),
        };
        for dir in [store.plates_dir(), store.metrics_dir(), store.groups_dir()] {
            std::fs::create_dir_all(&dir).map_err(|e| StoreError::FileOperation(e.to_string()))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn plates_dir(&self) -> PathBuf {
        self.root.join("plates")
    }

    fn metrics_dir(&self) -> PathBuf {
        self.root.join("metrics")
    }

    fn groups_dir(&self) -> PathBuf {
        self.root.join("groups")
    }

    fn metric_file_name(plate_id: &str, reprocess_config_id: Option<u32>) -> String {
        let rc = match reprocess_config_id {
            Some(id) => format!("rc{}", id),
            None => "original".to_string(),
        };
        format!("{}__{}.json", file_stem(plate_id), rc)
    }

    fn write_json<T: Serialize>(dir: &Path, filename: &str, value: &T) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(value)?;

        let random: u32 = rand::random();
        let temp_path = dir.join(format!(".{}.{:08x}.tmp", filename, random));
        let final_path = dir.join(filename);

        std::fs::write(&temp_path, &json).map_err(|e| StoreError::FileOperation(e.to_string()))?;
        std::fs::rename(&temp_path, &final_path).map_err(|e| StoreError::FileOperation(e.to_string()))?;

        debug!(path = %final_path.display(), "Stored record");
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound(path.display().to_string()))
            }
            Err(e) => return Err(StoreError::FileOperation(e.to_string())),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Every record in a directory. Temp files are ignored.
    fn read_all<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, StoreError> {
        let entries = std::fs::read_dir(dir).map_err(|e| StoreError::FileOperation(e.to_string()))?;
        let mut records = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| StoreError::FileOperation(e.to_string()))?.path();
            let is_record = path.extension().is_some_and(|ext| ext == "json")
                && !path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with('.'));
            if is_record {
                records.push(Self::read_json(&path)?);
            }
        }
        Ok(records)
    }
}

/// Plate ids are used as file names; keep them to one path component.
fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| if c == '/' || c == '\\' || c == ':' { '_' } else { c })
        .collect()
}

impl MetricStore for JsonMetricStore {
    fn save_plate(&self, plate: &PlateRecord) -> Result<(), StoreError> {
        Self::write_json(&self.plates_dir(), &format!("{}.json", file_stem(&plate.id)), plate)
    }

    fn plate(&self, id: &str) -> Result<PlateRecord, StoreError> {
        Self::read_json(&self.plates_dir().join(format!("{}.json", file_stem(id))))
    }

    fn plates(&self) -> Result<Vec<PlateRecord>, StoreError> {
        let mut plates: Vec<PlateRecord> = Self::read_all(&self.plates_dir())?;
        plates.sort_by(|a, b| a.run_time.cmp(&b.run_time).then_with(|| a.id.cmp(&b.id)));
        Ok(plates)
    }

    fn replace_plate_metric(&self, metric: &PlateMetric) -> Result<(), StoreError> {
        let filename = Self::metric_file_name(&metric.plate_id, metric.reprocess_config_id);
        Self::write_json(&self.metrics_dir(), &filename, metric)
    }

    fn plate_metric(
        &self,
        plate_id: &str,
        reprocess_config_id: Option<u32>,
    ) -> Result<Option<PlateMetric>, StoreError> {
        let path = self
            .metrics_dir()
            .join(Self::metric_file_name(plate_id, reprocess_config_id));
        match Self::read_json(&path) {
            Ok(metric) => Ok(Some(metric)),
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn plate_metrics(
        &self,
        plate_ids: &[String],
        reprocess_config_id: Option<u32>,
    ) -> Result<Vec<PlateMetric>, StoreError> {
        let mut metrics = Vec::new();
        for id in plate_ids {
            if let Some(metric) = self.plate_metric(id, reprocess_config_id)? {
                metrics.push(metric);
            }
        }
        Ok(metrics)
    }

    fn save_group(&self, group: &AnalysisGroup) -> Result<(), StoreError> {
        Self::write_json(&self.groups_dir(), &format!("{}.json", group.id), group)
    }

    fn group(&self, id: &Uuid) -> Result<AnalysisGroup, StoreError> {
        Self::read_json(&self.groups_dir().join(format!("{}.json", id)))
    }

    fn groups(&self) -> Result<Vec<AnalysisGroup>, StoreError> {
        let mut groups: Vec<AnalysisGroup> = Self::read_all(&self.groups_dir())?;
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WellMetric;
    use crate::plate::fixtures::record;
    use crate::types::PlateTypeCode;
    use tempfile::TempDir;

    fn open() -> (TempDir, JsonMetricStore) {
        let dir = TempDir::new().unwrap();
        let store = JsonMetricStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_open_creates_layout() {
        let (dir, _store) = open();
        assert!(dir.path().join("plates").is_dir());
        assert!(dir.path().join("metrics").is_dir());
        assert!(dir.path().join("groups").is_dir());
    }

    #[test]
    fn test_plates_round_trip_sorted_by_run_time() {
        let (_dir, store) = open();
        store.save_plate(&record("late", Some(PlateTypeCode::Bcc), 9)).unwrap();
        store.save_plate(&record("early", Some(PlateTypeCode::Bcarry), 2)).unwrap();

        assert_eq!(store.plate("late").unwrap().plate_type, Some(PlateTypeCode::Bcc));
        let ids: Vec<String> = store.plates().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec!["early", "late"]);
        assert!(matches!(store.plate("absent"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_replace_plate_metric_overwrites_whole_tree() {
        let (dir, store) = open();
        let mut first = PlateMetric::new("p1", None);
        first.insert_well(WellMetric::new("A01".parse().unwrap()));
        first.insert_well(WellMetric::new("A02".parse().unwrap()));
        store.replace_plate_metric(&first).unwrap();

        let mut second = PlateMetric::new("p1", None);
        second.insert_well(WellMetric::new("B01".parse().unwrap()));
        store.replace_plate_metric(&second).unwrap();

        let stored = store.plate_metric("p1", None).unwrap().unwrap();
        assert_eq!(stored, second);
        let files = std::fs::read_dir(dir.path().join("metrics")).unwrap().count();
        assert_eq!(files, 1);
    }

    #[test]
    fn test_metrics_are_keyed_by_reprocess_config() {
        let (_dir, store) = open();
        store.replace_plate_metric(&PlateMetric::new("p1", None)).unwrap();
        store.replace_plate_metric(&PlateMetric::new("p1", Some(2))).unwrap();
        store.replace_plate_metric(&PlateMetric::new("p2", Some(2))).unwrap();

        let ids = vec!["p1".to_string(), "p2".to_string(), "p3".to_string()];
        assert_eq!(store.plate_metrics(&ids, None).unwrap().len(), 1);
        assert_eq!(store.plate_metrics(&ids, Some(2)).unwrap().len(), 2);
        assert!(store.plate_metric("p2", None).unwrap().is_none());
    }

    #[test]
    fn test_groups() {
        let (_dir, store) = open();
        let mut group = AnalysisGroup::new("lot 12");
        group.add_plate("p1");
        store.save_group(&group).unwrap();
        store.save_plate(&record("p1", None, 1)).unwrap();

        assert_eq!(store.group(&group.id).unwrap(), group);
        assert_eq!(store.groups().unwrap().len(), 1);
        assert_eq!(plates_in_group(&store, &group).unwrap().len(), 1);
        assert_eq!(plates_by_reader(&store, "dr-1").unwrap().len(), 1);
        assert!(plates_by_reader(&store, "dr-2").unwrap().is_empty());
    }

    #[test]
    fn test_plate_ids_stay_in_one_directory() {
        assert_eq!(file_stem("run/7:a"), "run_7_a");
    }
}
