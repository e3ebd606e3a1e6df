//! Batch driver: load plate files, compute their metric trees and commit
//! them one plate at a time.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::calculators::process::compute_plate_metrics;
use crate::config::EngineConfig;
use crate::error::{QcError, QcResult};
use crate::model::ReprocessConfig;
use crate::plate;
use crate::store::{FailedPlates, MetricStore};

/// Options for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Abort at the first failed plate
    pub stop_on_error: bool,
    /// Recompute plates whose file content is unchanged
    pub force: bool,
}

/// Outcome of a batch run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub processed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Plate ids committed during this run, in input order
    pub committed: Vec<String>,
}

enum PlateOutcome {
    Committed(String),
    Unchanged(String),
}

/// Plate files to process under `input`.
///
/// A file is taken as is; a directory is searched with `pattern`. Results
/// are sorted so runs are repeatable.
pub fn discover_plates(input: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        anyhow::bail!("Input path does not exist: {}", input.display());
    }

    let full_pattern = input.join(pattern);
    let full_pattern = full_pattern.to_string_lossy();
    let mut paths = Vec::new();
    for entry in glob::glob(&full_pattern).with_context(|| format!("Invalid plate glob: {}", pattern))? {
        match entry {
            Ok(path) if path.is_file() => paths.push(path),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Unreadable entry while discovering plates"),
        }
    }
    paths.sort();
    debug!(input = %input.display(), count = paths.len(), "Discovered plate files");
    Ok(paths)
}

/// Process each input file and commit its tree.
///
/// A plate is committed as soon as it is computed; a failure on one plate
/// never rolls back another. Failures are logged, remembered in `failed`
/// and the batch moves on unless `stop_on_error` is set.
pub fn run_batch(
    store: &dyn MetricStore,
    inputs: &[PathBuf],
    reprocess: Option<&ReprocessConfig>,
    failed: &mut FailedPlates,
    engine: &EngineConfig,
    options: &BatchOptions,
) -> BatchReport {
    let mut report = BatchReport::default();

    for path in inputs {
        match process_file(store, path, reprocess, engine, options.force) {
            Ok(PlateOutcome::Committed(plate_id)) => {
                failed.mark_success(path);
                report.processed += 1;
                report.committed.push(plate_id);
            }
            Ok(PlateOutcome::Unchanged(plate_id)) => {
                debug!(plate = %plate_id, "Plate unchanged; skipping");
                failed.mark_success(path);
                report.skipped += 1;
            }
            Err((plate_id, e)) => {
                warn!(
                    plate = %path.display(),
                    plate_id = ?plate_id,
                    error = %e,
                    "Failed to process plate"
                );
                failed.record_failure(path, plate_id, e.to_string());
                report.failed += 1;
                if options.stop_on_error {
                    warn!("Stopping batch at first failure");
                    break;
                }
            }
        }
    }

    info!(
        processed = report.processed,
        failed = report.failed,
        skipped = report.skipped,
        reprocess_config = ?reprocess.map(|rc| rc.code.as_str()),
        "Batch complete"
    );
    report
}

fn process_file(
    store: &dyn MetricStore,
    path: &Path,
    reprocess: Option<&ReprocessConfig>,
    engine: &EngineConfig,
    force: bool,
) -> Result<PlateOutcome, (Option<String>, QcError)> {
    let (mut record, decoded) = plate::load(path).map_err(|e| (None, e.into()))?;
    let plate_id = record.id.clone();
    let with_id = |e: QcError| (Some(plate_id.clone()), e);

    if record.system_version.is_none() {
        record.system_version = Some(engine.default_system_version.clone());
    }

    if !force && is_unchanged(store, &record.id, &record.file_hash, reprocess).map_err(with_id)? {
        return Ok(PlateOutcome::Unchanged(record.id.clone()));
    }

    let metric = compute_plate_metrics(&record, &decoded, reprocess, engine).map_err(|e| with_id(e.into()))?;

    // Tree first: a plate visible in the store always has its metrics.
    store.replace_plate_metric(&metric).map_err(|e| with_id(e.into()))?;
    store.save_plate(&record).map_err(|e| with_id(e.into()))?;

    Ok(PlateOutcome::Committed(plate_id))
}

fn is_unchanged(
    store: &dyn MetricStore,
    plate_id: &str,
    file_hash: &str,
    reprocess: Option<&ReprocessConfig>,
) -> QcResult<bool> {
    let stored = match store.plate(plate_id) {
        Ok(stored) => stored,
        Err(crate::error::StoreError::NotFound(_)) => return Ok(false),
        Err(e) => return Err(e.into()),
    };
    if stored.file_hash != file_hash {
        return Ok(false);
    }
    Ok(store.plate_metric(plate_id, reprocess.map(|rc| rc.id))?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::plate::fixtures::{duplex_well, plate, record, write_plate_file};
    use crate::store::{JsonMetricStore, MockMetricStore};
    use crate::types::PlateTypeCode;
    use tempfile::TempDir;

    fn write_plates(dir: &Path, ids: &[&str]) -> Vec<PathBuf> {
        ids.iter()
            .enumerate()
            .map(|(i, id)| {
                write_plate_file(
                    dir,
                    &format!("{}.plate.json", id),
                    record(id, Some(PlateTypeCode::Bdplex), i as u32 + 1),
                    plate(vec![("A01", duplex_well(Some("NTC"), 0, 0, 0, 50))]),
                )
            })
            .collect()
    }

    #[test]
    fn test_failure_on_one_plate_commits_the_others() {
        let dir = TempDir::new().unwrap();
        let inputs = write_plates(dir.path(), &["p1", "p2", "p3"]);
        let mut failed = FailedPlates::load(&dir.path().join("failed.json")).unwrap();

        let mut store = MockMetricStore::new();
        store
            .expect_plate()
            .returning(|id| Err(StoreError::NotFound(id.to_string())));
        store
            .expect_replace_plate_metric()
            .withf(|m| m.plate_id == "p2")
            .times(1)
            .returning(|_| Err(StoreError::FileOperation("disk full".to_string())));
        store
            .expect_replace_plate_metric()
            .withf(|m| m.plate_id != "p2")
            .times(2)
            .returning(|_| Ok(()));
        store
            .expect_save_plate()
            .withf(|p| p.id != "p2")
            .times(2)
            .returning(|_| Ok(()));

        let report = run_batch(
            &store,
            &inputs,
            None,
            &mut failed,
            &EngineConfig::default(),
            &BatchOptions::default(),
        );

        assert_eq!(report.processed, 2);
        assert_eq!(report.failed, 1);
        assert_eq!(report.committed, vec!["p1".to_string(), "p3".to_string()]);

        let history = failed.all();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].plate_id.as_deref(), Some("p2"));
        assert!(history[0].reason.contains("disk full"));
    }

    #[test]
    fn test_stop_on_error() {
        let dir = TempDir::new().unwrap();
        let mut inputs = write_plates(dir.path(), &["p1", "p3"]);
        let bad = dir.path().join("bad.plate.json");
        std::fs::write(&bad, "{not a plate").unwrap();
        inputs.insert(0, bad.clone());
        let mut failed = FailedPlates::load(&dir.path().join("failed.json")).unwrap();

        let store = MockMetricStore::new();
        let options = BatchOptions {
            stop_on_error: true,
            force: false,
        };
        let report = run_batch(&store, &inputs, None, &mut failed, &EngineConfig::default(), &options);

        assert_eq!(report.failed, 1);
        assert_eq!(report.processed, 0);
        assert_eq!(failed.all()[0].path, bad);
        assert_eq!(failed.all()[0].plate_id, None);
    }

    #[test]
    fn test_unchanged_plates_are_skipped() {
        let dir = TempDir::new().unwrap();
        let plates_dir = dir.path().join("in");
        std::fs::create_dir_all(&plates_dir).unwrap();
        write_plates(&plates_dir, &["p1", "p2"]);
        std::fs::write(plates_dir.join("notes.txt"), "ignored").unwrap();

        let store = JsonMetricStore::open(&dir.path().join("store")).unwrap();
        let mut failed = FailedPlates::load(&dir.path().join("failed.json")).unwrap();
        let inputs = discover_plates(&plates_dir, "*.plate.json").unwrap();
        assert_eq!(inputs.len(), 2);

        let engine = EngineConfig::default();
        let first = run_batch(&store, &inputs, None, &mut failed, &engine, &BatchOptions::default());
        assert_eq!(first.processed, 2);

        let second = run_batch(&store, &inputs, None, &mut failed, &engine, &BatchOptions::default());
        assert_eq!(second.skipped, 2);
        assert_eq!(second.processed, 0);

        let forced = BatchOptions {
            stop_on_error: false,
            force: true,
        };
        let third = run_batch(&store, &inputs, None, &mut failed, &engine, &forced);
        assert_eq!(third.processed, 2);

        assert!(store.plate_metric("p1", None).unwrap().is_some());
        assert_eq!(store.plate("p2").unwrap().system_version.as_deref(), Some("QX100"));
    }

    #[test]
    fn test_discover_single_file_and_missing_dir() {
        let dir = TempDir::new().unwrap();
        let inputs = write_plates(dir.path(), &["p1"]);
        assert_eq!(discover_plates(&inputs[0], "*.plate.json").unwrap(), inputs);
        assert!(discover_plates(&dir.path().join("nope"), "*.plate.json").is_err());
    }
}
