//! CSV export of metric trees and certification reports.

use anyhow::{Context, Result};
use std::io::Write;

use crate::analysis::CertificationReport;
use crate::model::{ChannelField, PlateMetric, WellField};
use crate::types::{FAM, VIC};

/// Columns of a well metric export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportFields {
    pub well: Vec<WellField>,
    pub channel: Vec<ChannelField>,
}

impl ExportFields {
    /// Every field the comparison views offer.
    pub fn all() -> Self {
        Self {
            well: WellField::comparable_fields().collect(),
            channel: ChannelField::comparable_fields().collect(),
        }
    }

    /// Fields by snake-case name; each name may be a well or a channel field.
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let mut fields = Self {
            well: Vec::new(),
            channel: Vec::new(),
        };
        for name in names {
            let name = name.as_ref().trim();
            if let Ok(field) = name.parse::<WellField>() {
                fields.well.push(field);
            } else if let Ok(field) = name.parse::<ChannelField>() {
                fields.channel.push(field);
            } else {
                anyhow::bail!("Unknown export field: {}", name);
            }
        }
        Ok(fields)
    }

    fn header(&self) -> Vec<String> {
        let mut header: Vec<String> = ["Plate", "Reprocess Config", "Well", "Sample"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        header.extend(self.well.iter().map(|f| f.display_name().to_string()));
        for prefix in ["FAM", "VIC"] {
            header.extend(self.channel.iter().map(|f| format!("{} {}", prefix, f.display_name())));
        }
        header
    }
}

fn cell(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => v.to_string(),
        _ => String::new(),
    }
}

/// Write one row per well. Absent values are empty cells.
pub fn export_well_metrics<W: Write>(writer: W, plate_metrics: &[PlateMetric], fields: &ExportFields) -> Result<usize> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(fields.header()).context("Failed to write CSV header")?;

    let mut rows = 0;
    for plate in plate_metrics {
        let rc = plate
            .reprocess_config_id
            .map(|id| id.to_string())
            .unwrap_or_default();
        for well in &plate.well_metrics {
            let mut row = vec![
                plate.plate_id.clone(),
                rc.clone(),
                well.well_name.to_string(),
                well.sample().to_string(),
            ];
            row.extend(fields.well.iter().map(|f| cell(f.value(well))));
            for channel in [FAM, VIC] {
                let metric = &well.channels[channel];
                row.extend(fields.channel.iter().map(|f| cell(f.value(metric))));
            }
            csv.write_record(&row)
                .with_context(|| format!("Failed to write row for {} {}", plate.plate_id, well.well_name))?;
            rows += 1;
        }
    }

    csv.flush().context("Failed to flush CSV output")?;
    Ok(rows)
}

/// Write a certification report as `test,observed,description,passed`.
pub fn export_certification<W: Write>(writer: W, report: &CertificationReport) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);
    csv.write_record(["test", "observed", "description", "passed"])?;
    for (name, result) in &report.tests {
        csv.write_record([
            name.as_str(),
            &result.observed.to_string(),
            &result.description,
            if result.passed { "true" } else { "false" },
        ])?;
    }
    csv.flush()?;
    Ok(())
}
