//! Report command - summary statistics over a set of plates.

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::analysis::{AnalysisGroupMetrics, QueryOptions, Scope};
use crate::cli::ReportScope;
use crate::config::Config;
use crate::store::{JsonMetricStore, MetricStore};

/// Run the report command.
pub fn run(config: &Config, scope: ReportScope, reprocess: Option<&str>) -> Result<()> {
    let rc = config.resolve_reprocess(reprocess)?.map(|rc| rc.id);
    let store = JsonMetricStore::open(&config.store.root)?;
    let metrics = load(&store, config, &scope, rc)?;
    print_report(&metrics);
    Ok(())
}

fn load(
    store: &dyn MetricStore,
    config: &Config,
    scope: &ReportScope,
    rc: Option<u32>,
) -> Result<AnalysisGroupMetrics> {
    let options = QueryOptions::default();
    let metrics = match scope {
        ReportScope::Group { id } => {
            let id: Uuid = id.parse().with_context(|| format!("Invalid group id: {}", id))?;
            let group = store.group(&id)?;
            AnalysisGroupMetrics::for_group(store, &group, rc, &config.limits, options)?
        }
        ReportScope::Reader { id } => AnalysisGroupMetrics::for_reader(store, id, rc, &config.limits, options)?,
        ReportScope::Plate { id } => AnalysisGroupMetrics::for_plate(store, id, rc, &config.limits, options)?,
    };
    Ok(metrics)
}

fn describe(scope: &Scope) -> String {
    match scope {
        Scope::Group(id) => format!("group {}", id),
        Scope::Reader(serial) => format!("reader {}", serial),
        Scope::Plate(id) => format!("plate {}", id),
    }
}

fn print_report(metrics: &AnalysisGroupMetrics) {
    println!();
    println!("Report for {}", describe(&metrics.scope));
    println!("Plates:        {}", metrics.plate_entries().len());
    println!("Limits:        {}", metrics.params.key);
    if let Some(rc) = metrics.reprocess_config_id {
        println!("Reprocess:     {}", rc);
    }
    println!("{}", "-".repeat(80));
    println!(
        "{:<28} {:>12} {:>12} {:>12} {:>12}",
        "Statistic", "Mean", "Stdev", "2.5%", "97.5%"
    );
    for (name, summary) in metrics.headline() {
        println!(
            "{:<28} {:>12.3} {:>12.3} {:>12.3} {:>12.3}",
            name, summary.mean, summary.stdev, summary.ci025, summary.ci975
        );
    }

    let carryover = metrics.total_carryover_stats();
    if carryover.plates > 0 {
        println!("{}", "-".repeat(80));
        println!("Carryover plates:           {}", carryover.plates);
        println!("Carryover peaks:            {}", carryover.carryover_peaks);
        println!("Gated contamination peaks:  {}", carryover.gated_contamination_peaks);
        println!("Contamination peaks:        {}", carryover.contamination_peaks);
        println!("Stealth wells:              {}", carryover.stealth_wells);
    }
    println!();
}
