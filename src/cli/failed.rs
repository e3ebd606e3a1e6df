//! Failed plates CLI commands.

use anyhow::Result;
use std::io::{self, Write};
use std::path::PathBuf;

use crate::batch::{run_batch, BatchOptions};
use crate::cli::FailedAction;
use crate::config::{self, Config};
use crate::store::{FailedPlates, JsonMetricStore};

/// Run a failed plates command.
pub fn run(config: &Config, action: FailedAction) -> Result<()> {
    let mut failed = FailedPlates::load(&config::paths::failed_plates_file())?;

    match action {
        FailedAction::List => list_failed(&failed),
        FailedAction::Retry { path } => retry_failed(config, &mut failed, &path),
        FailedAction::Clear { confirm } => clear_failed(&mut failed, confirm),
    }
}

fn list_failed(failed: &FailedPlates) -> Result<()> {
    let plates = failed.all();

    if plates.is_empty() {
        println!("No failed plates.");
        return Ok(());
    }

    println!("Failed plates ({}):", plates.len());
    println!("{}", "-".repeat(80));

    for plate in plates {
        println!("Path:       {}", plate.path.display());
        if let Some(id) = &plate.plate_id {
            println!("Plate:      {}", id);
        }
        println!("Reason:     {}", plate.reason);
        println!("Failed at:  {}", plate.failed_at.format("%Y-%m-%d %H:%M:%S UTC"));
        if plate.retry_count > 0 {
            println!("Retries:    {}", plate.retry_count);
        }
        println!("{}", "-".repeat(80));
    }

    println!("\nTo retry a plate: ddqc failed retry <path>");
    println!("To retry all:     ddqc failed retry all");
    println!("To clear list:    ddqc failed clear --confirm");

    Ok(())
}

fn retry_failed(config: &Config, failed: &mut FailedPlates, path: &str) -> Result<()> {
    let targets: Vec<PathBuf> = if path == "all" {
        failed.all().into_iter().map(|p| p.path).collect()
    } else {
        vec![PathBuf::from(path)]
    };

    if targets.is_empty() {
        println!("No failed plates to retry.");
        return Ok(());
    }

    let mut inputs = Vec::with_capacity(targets.len());
    for target in targets {
        if failed.begin_retry(&target).is_some() {
            inputs.push(target);
        } else {
            println!("Plate not in failed list: {}", target.display());
            println!("\nTo process a plate that's not in the failed list,");
            println!("use: ddqc process {}", target.display());
        }
    }
    if inputs.is_empty() {
        return Ok(());
    }

    let store = JsonMetricStore::open(&config.store.root)?;
    let options = BatchOptions {
        stop_on_error: false,
        force: true,
    };

    println!("Retrying {} failed plate(s)...", inputs.len());
    let report = run_batch(&store, &inputs, None, failed, &config.engine, &options);
    println!("Succeeded: {}", report.processed);
    println!("Failed:    {}", report.failed);

    Ok(())
}

fn clear_failed(failed: &mut FailedPlates, confirm: bool) -> Result<()> {
    let count = failed.count();

    if count == 0 {
        println!("No failed plates to clear.");
        return Ok(());
    }

    if !confirm {
        print!("Clear {} failed plate(s)? [y/N] ", count);
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().read_line(&mut input)?;

        if !input.trim().eq_ignore_ascii_case("y") {
            println!("Cancelled.");
            return Ok(());
        }
    }

    failed.clear();
    println!("Cleared {} failed plate(s).", count);

    Ok(())
}
