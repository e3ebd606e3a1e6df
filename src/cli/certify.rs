//! Certify command - run the certification battery for a reader or plate.

use anyhow::{Context, Result};
use std::fs::File;

use crate::analysis::{CertificationReport, DrCertificationMetrics, QueryOptions};
use crate::cli::CertifyTarget;
use crate::config::Config;
use crate::export::export_certification;
use crate::store::JsonMetricStore;

/// Run the certify command.
pub fn run(config: &Config, target: CertifyTarget, csv: Option<&std::path::Path>) -> Result<()> {
    let store = JsonMetricStore::open(&config.store.root)?;

    let (label, cert) = match &target {
        CertifyTarget::Reader { id } => (
            format!("reader {}", id),
            DrCertificationMetrics::for_reader(&store, id, &config.limits, QueryOptions::default())?,
        ),
        CertifyTarget::Plate { id, reprocess } => {
            let rc = config.resolve_reprocess(reprocess.as_deref())?.map(|rc| rc.id);
            (
                format!("plate {}", id),
                DrCertificationMetrics::for_plate(&store, id, rc, &config.limits, QueryOptions::default())?,
            )
        }
    };

    let report = cert.report();
    print_report(&label, &report);

    let (fam_rain, fam_called) = cert.colorcomp_fam_rain();
    let (vic_rain, vic_called) = cert.colorcomp_vic_rain();
    println!("Colorcomp FAM HI rain: {:.4} (threshold: {})", fam_rain, fam_called);
    println!("Colorcomp VIC HI rain: {:.4} (threshold: {})", vic_rain, vic_called);
    println!();

    if let Some(path) = csv {
        let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
        export_certification(file, &report)?;
        println!("Results written to {}", path.display());
    }

    Ok(())
}

fn print_report(label: &str, report: &CertificationReport) {
    println!();
    println!("Certification for {}", label);
    println!("Limits: {}", report.limits_key);
    println!("Plates: {}", report.plates.join(", "));
    println!("{}", "-".repeat(80));
    println!("{:<32} {:<20} {:<20} {}", "Test", "Observed", "Limit", "Result");

    for (name, result) in &report.tests {
        println!(
            "{:<32} {:<20} {:<20} {}",
            name,
            result.observed.to_string(),
            result.description,
            if result.passed { "PASS" } else { "FAIL" }
        );
    }

    println!("{}", "-".repeat(80));
    println!("Passed {} of {} tests.", report.passed_count(), report.tests.len());
    if report.all_passed() {
        println!("Certification PASSED.");
    }
    println!();
}
