//! Process command - compute and store plate metrics.

use anyhow::{Context, Result};
use std::path::Path;

use crate::batch::{discover_plates, run_batch, BatchOptions};
use crate::config::{self, Config};
use crate::store::{FailedPlates, JsonMetricStore};

/// Arguments of `ddqc process`.
#[derive(Debug, Clone)]
pub struct ProcessArgs<'a> {
    pub input: &'a Path,
    pub reprocess: Option<&'a str>,
    pub glob: Option<&'a str>,
    pub force: bool,
    pub stop_on_error: bool,
}

/// Run the process command.
pub fn run(config: &Config, args: ProcessArgs<'_>) -> Result<()> {
    let reprocess = config.resolve_reprocess(args.reprocess)?;
    let pattern = args.glob.unwrap_or(&config.batch.plate_glob);
    let inputs = discover_plates(args.input, pattern)?;

    if inputs.is_empty() {
        println!("No plate files found under {}", args.input.display());
        return Ok(());
    }

    let store = JsonMetricStore::open(&config.store.root)
        .with_context(|| format!("Failed to open store at {}", config.store.root.display()))?;
    let mut failed = FailedPlates::load(&config::paths::failed_plates_file())?;

    let options = BatchOptions {
        stop_on_error: args.stop_on_error || config.batch.stop_on_error,
        force: args.force,
    };

    println!("Processing {} plate file(s)...", inputs.len());
    if let Some(rc) = reprocess {
        println!("Reprocess config: {} ({})", rc.code, rc.name);
    }

    let report = run_batch(&store, &inputs, reprocess, &mut failed, &config.engine, &options);

    println!("{}", "-".repeat(80));
    println!("Processed: {}", report.processed);
    println!("Unchanged: {}", report.skipped);
    println!("Failed:    {}", report.failed);

    if report.failed > 0 {
        println!("\nSee failures with: ddqc failed list");
    }

    Ok(())
}
