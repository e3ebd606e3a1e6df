//! Export command - write a plate's well metrics as CSV.

use anyhow::{Context, Result};
use std::fs::File;
use std::io;
use std::path::Path;

use crate::config::Config;
use crate::export::{export_well_metrics, ExportFields};
use crate::store::{JsonMetricStore, MetricStore};

/// Run the export command.
pub fn run(
    config: &Config,
    plate_id: &str,
    reprocess: Option<&str>,
    out: Option<&Path>,
    fields: &[String],
) -> Result<()> {
    let rc = config.resolve_reprocess(reprocess)?.map(|rc| rc.id);
    let store = JsonMetricStore::open(&config.store.root)?;

    let metric = store
        .plate_metric(plate_id, rc)?
        .with_context(|| format!("No metrics stored for plate {} under this reprocess config", plate_id))?;

    let fields = if fields.is_empty() {
        ExportFields::all()
    } else {
        ExportFields::from_names(fields)?
    };

    match out {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
            let rows = export_well_metrics(file, std::slice::from_ref(&metric), &fields)?;
            println!("Wrote {} well(s) to {}", rows, path.display());
        }
        None => {
            export_well_metrics(io::stdout().lock(), std::slice::from_ref(&metric), &fields)?;
        }
    }

    Ok(())
}
