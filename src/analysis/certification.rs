//! Reader certification: the newest plate of each certification layout on a
//! reader, checked against the limits for its hardware generation.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::Serialize;
use tracing::debug;

use super::{
    AnalysisGroupMetrics, PlateEntry, QueryOptions, Scope, SingleWellAmplitudes, Tolerance, ViewKind, WellRef,
    FAM_HI_SAMPLES, HEX_SCALE_FACTOR, VIC_HI_SAMPLES,
};
use crate::config::LimitTable;
use crate::error::StoreError;
use crate::model::WellField;
use crate::store::{plates_by_reader, MetricStore};
use crate::types::{Dyeset, PlateTypeCode, FAM, VIC};

/// Plate layouts that take part in reader certification.
pub const CERTIFICATION_PLATE_TYPES: [PlateTypeCode; 8] = [
    PlateTypeCode::Bcarry,
    PlateTypeCode::Bcc,
    PlateTypeCode::Betaec,
    PlateTypeCode::Mfgco,
    PlateTypeCode::Mfgcc,
    PlateTypeCode::Scc,
    PlateTypeCode::Probeec,
    PlateTypeCode::Evaec,
];

const FAM_LO_SAMPLES: &[&str] = &["FAM 40nM", "FAM LO"];
const VIC_LO_SAMPLES: &[&str] = &["VIC 70nM", "VIC LO"];
const HEX_LO_SAMPLES: &[&str] = &["HEX 40nM", "HEX LO"];

/// The observed value of a certification test.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Observed {
    Number(f64),
    Integer(i64),
    Text(String),
    Missing,
}

impl Observed {
    /// A number, or `Missing` when it is not finite.
    pub fn number(value: f64) -> Self {
        if value.is_finite() {
            Observed::Number(value)
        } else {
            Observed::Missing
        }
    }

    fn ratio(count: usize, total: usize) -> Self {
        Observed::Text(format!("{}/{}", count, total))
    }

    fn hex_scaled(value: f64) -> Self {
        Observed::Text(format!("{} ({} scaled)", value as i64, (value * HEX_SCALE_FACTOR) as i64))
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Number(v) => write!(f, "{:.4}", v),
            Observed::Integer(v) => write!(f, "{}", v),
            Observed::Text(s) => f.write_str(s),
            Observed::Missing => f.write_str("N/A"),
        }
    }
}

/// Outcome of one certification test.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestResult {
    pub observed: Observed,
    /// Human-readable limit, e.g. `> 12000` or `<= 1/48`.
    pub description: String,
    pub passed: bool,
    /// The limit value, for tests that report one.
    pub extra: Option<f64>,
}

impl TestResult {
    fn new(observed: Observed, description: String, passed: bool) -> Self {
        // A test with nothing to observe never passes.
        let passed = passed && observed != Observed::Missing;
        Self {
            observed,
            description,
            passed,
            extra: None,
        }
    }

    fn missing(description: String) -> Self {
        Self::new(Observed::Missing, description, false)
    }

    fn with_extra(mut self, extra: f64) -> Self {
        self.extra = Some(extra);
        self
    }
}

/// Ordered test results of one certification run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CertificationReport {
    pub limits_key: String,
    pub plates: Vec<String>,
    pub tests: Vec<(String, TestResult)>,
}

impl CertificationReport {
    pub fn passed_count(&self) -> usize {
        self.tests.iter().filter(|(_, t)| t.passed).count()
    }

    pub fn all_passed(&self) -> bool {
        self.tests.iter().all(|(_, t)| t.passed)
    }

    pub fn get(&self, name: &str) -> Option<&TestResult> {
        self.tests.iter().find(|(n, _)| n == name).map(|(_, t)| t)
    }
}

fn amplitude_description(limit: i64, variation: i64, qc: bool) -> String {
    format!("{} +/- {}%{}", limit, variation, if qc { " (QC)" } else { "" })
}

fn within(value: f64, limit: i64, variation: i64) -> bool {
    let limit = limit as f64;
    (value - limit).abs() <= limit * variation as f64 / 100.0
}

fn amplitude_result(value: Option<f64>, limit: i64, variation: i64, description: String) -> TestResult {
    match value {
        Some(v) => TestResult::new(Observed::number(v), description, within(v, limit, variation)),
        None => TestResult::missing(description),
    }
}

/// CV test over a (mean, stdev) pair; a zero mean has no CV.
fn cv_result(stats: Option<(f64, f64)>, max_cv: f64) -> TestResult {
    let description = format!("< {:.2}% amplitude mean", 100.0 * max_cv);
    match stats {
        Some((mean, stdev)) if mean > 0.0 => {
            let cv = stdev / mean;
            TestResult::new(Observed::number(cv), description, cv < max_cv)
        }
        _ => TestResult::missing(description),
    }
}

fn blue_hi(s: SingleWellAmplitudes) -> (f64, f64) {
    (s.blue_hi_mean, s.blue_hi_stdev)
}

fn green_hi(s: SingleWellAmplitudes) -> (f64, f64) {
    (s.green_hi_mean, s.green_hi_stdev)
}

/// Newest plate per certification layout. Carryover and multi-well
/// colorcomp layouts each count as one layout; single-well colorcomp keeps
/// the newest plate per dye set.
fn most_recent_per_type(entries: Vec<PlateEntry>) -> Vec<PlateEntry> {
    let mut newest_first: Vec<&PlateEntry> = entries.iter().collect();
    newest_first.sort_by(|a, b| b.plate.run_time.cmp(&a.plate.run_time));

    let mut scc_ids: Vec<&str> = Vec::new();
    for dyeset in [Dyeset::FamVic, Dyeset::FamHex] {
        let found = newest_first.iter().find(|e| {
            e.plate.is_type(PlateTypeCode::Scc)
                && e.metric
                    .well_metrics
                    .iter()
                    .any(|w| w.sample_name.as_deref() == Some(dyeset.sample_name()))
        });
        if let Some(entry) = found {
            if !scc_ids.contains(&entry.plate.id.as_str()) {
                scc_ids.push(&entry.plate.id);
            }
        }
    }
    let scc_ids: HashSet<String> = scc_ids.into_iter().map(str::to_string).collect();

    let mut by_type: BTreeMap<PlateTypeCode, PlateEntry> = BTreeMap::new();
    let mut scc = Vec::new();
    for entry in entries {
        let Some(code) = entry.plate.plate_type else { continue };
        if code == PlateTypeCode::Scc {
            if scc_ids.contains(&entry.plate.id) {
                scc.push(entry);
            }
            continue;
        }
        let key = match code {
            PlateTypeCode::Bcarry => PlateTypeCode::Mfgco,
            PlateTypeCode::Bcc => PlateTypeCode::Mfgcc,
            other => other,
        };
        let replace = by_type
            .get(&key)
            .map_or(true, |old| old.plate.run_time < entry.plate.run_time);
        if replace {
            by_type.insert(key, entry);
        }
    }

    let mut selected: Vec<PlateEntry> = by_type.into_values().collect();
    selected.sort_by(|a, b| a.plate.run_time.cmp(&b.plate.run_time));
    scc.sort_by(|a, b| a.plate.run_time.cmp(&b.plate.run_time));
    selected.extend(scc);
    selected
}

/// Certification view of a reader, or of one plate.
pub struct DrCertificationMetrics {
    metrics: AnalysisGroupMetrics,
    /// Layout of the certified plate; `None` for a whole reader.
    plate_type: Option<PlateTypeCode>,
    qc_plate: bool,
}

impl DrCertificationMetrics {
    /// The newest certification plates of a reader, as originally processed.
    /// Onsite and manufacturing-excluded plates are left out.
    pub fn for_reader(
        store: &dyn MetricStore,
        reader: &str,
        tables: &BTreeMap<String, LimitTable>,
        options: QueryOptions,
    ) -> Result<Self, StoreError> {
        let plates: Vec<_> = plates_by_reader(store, reader)?
            .into_iter()
            .filter(|p| p.plate_type.is_some_and(|code| CERTIFICATION_PLATE_TYPES.contains(&code)))
            .filter(|p| !p.onsite && !p.mfg_exclude)
            .collect();
        let entries = super::load_entries(store, plates, None)?;

        let mut metrics = AnalysisGroupMetrics::from_entries(
            Scope::Reader(reader.to_string()),
            ViewKind::Certification,
            entries,
            None,
            tables,
            options,
        );
        metrics.select_entries(most_recent_per_type);
        debug!(
            reader,
            plates = metrics.plate_entries().len(),
            "Selected certification plates"
        );

        Ok(Self {
            metrics,
            plate_type: None,
            qc_plate: false,
        })
    }

    /// Certification of a single plate under one reprocess config. The
    /// plate filter does not apply.
    pub fn for_plate(
        store: &dyn MetricStore,
        plate_id: &str,
        reprocess_config_id: Option<u32>,
        tables: &BTreeMap<String, LimitTable>,
        mut options: QueryOptions,
    ) -> Result<Self, StoreError> {
        let plate = store.plate(plate_id)?;
        let (plate_type, qc_plate) = (plate.plate_type, plate.qc_plate);
        let entries = match store.plate_metric(plate_id, reprocess_config_id)? {
            Some(metric) => vec![PlateEntry { plate, metric }],
            None => Vec::new(),
        };
        options.filters.plate = None;

        let metrics = AnalysisGroupMetrics::from_entries(
            Scope::Plate(plate_id.to_string()),
            ViewKind::Certification,
            entries,
            reprocess_config_id,
            tables,
            options,
        );
        Ok(Self {
            metrics,
            plate_type,
            qc_plate,
        })
    }

    pub fn metrics(&self) -> &AnalysisGroupMetrics {
        &self.metrics
    }

    /// Reader-wide checks and single-well colorcomp plates read the newest
    /// single-well calibration first.
    fn reads_single_well(&self) -> bool {
        matches!(self.plate_type, None | Some(PlateTypeCode::Scc))
    }

    fn reads_multi_well(&self) -> bool {
        matches!(self.plate_type, Some(PlateTypeCode::Bcc | PlateTypeCode::Mfgcc))
    }

    fn single_well(&self, dyeset: Dyeset) -> Option<SingleWellAmplitudes> {
        self.metrics.singlewell_colorcomp_amplitude_stats(dyeset)
    }

    fn single_well_any(&self) -> Option<SingleWellAmplitudes> {
        self.single_well(Dyeset::FamVic).or_else(|| self.single_well(Dyeset::FamHex))
    }

    fn multi_well(&self, samples: &[&str], channel: usize) -> Option<(f64, f64)> {
        self.metrics
            .colorcomp_amplitude_stats(samples, channel)
            .map(|a| (a.mean, a.stdev))
    }

    fn famvic(&self, channel: usize) -> Option<(f64, f64)> {
        self.metrics.famvic_amplitude_stats(channel).map(|a| (a.mean, a.stdev))
    }

    // Event counts

    fn event_count_mean_of(&self, wells: &[WellRef<'_>], limit: i64) -> TestResult {
        let mean = super::attr_summary(wells, WellField::AcceptedEventCount).mean;
        TestResult::new(Observed::Integer(mean as i64), format!("> {}", limit), mean > limit as f64)
            .with_extra(limit as f64)
    }

    pub fn test_event_count_mean(&self) -> TestResult {
        self.event_count_mean_of(&self.metrics.event_count_wells(), self.metrics.params.low_event_count)
    }

    pub fn test_probe_event_count_mean(&self) -> TestResult {
        self.event_count_mean_of(&self.metrics.probe_event_count_wells(), self.metrics.params.low_event_count)
    }

    pub fn test_eva_event_count_mean(&self) -> TestResult {
        self.event_count_mean_of(
            &self.metrics.eva_event_count_wells(),
            self.metrics.params.low_event_count_eva,
        )
    }

    pub fn test_carryover_event_count_mean(&self) -> TestResult {
        self.event_count_mean_of(
            &self.metrics.carryover_eventful_wells(),
            self.metrics.params.low_event_count,
        )
    }

    fn noncolorcomp_wells(&self) -> Vec<WellRef<'_>> {
        self.metrics
            .well_metrics_excluding_type(&[PlateTypeCode::Bcc, PlateTypeCode::Mfgcc, PlateTypeCode::Scc])
            .into_iter()
            .filter(|w| w.expects_events())
            .collect()
    }

    pub fn test_noncolorcomp_event_count_mean(&self) -> TestResult {
        self.event_count_mean_of(&self.noncolorcomp_wells(), self.metrics.params.low_event_count)
    }

    fn event_count_low_of(&self, wells: &[WellRef<'_>], low_count: i64, tolerance: Tolerance) -> TestResult {
        let low = wells
            .iter()
            .filter(|w| (w.metric.accepted_event_count as i64) < low_count)
            .count();
        TestResult::new(
            Observed::ratio(low, wells.len()),
            tolerance.describe(),
            tolerance.allows(low, wells.len()),
        )
        .with_extra(low_count as f64)
    }

    pub fn test_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(&self.metrics.event_count_wells(), p.low_event_count, p.low_event_fail)
    }

    pub fn test_probe_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(
            &self.metrics.probe_event_count_wells(),
            p.low_event_count,
            p.probe_event_fail,
        )
    }

    pub fn test_eva_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(
            &self.metrics.eva_event_count_wells(),
            p.low_event_count_eva,
            p.eva_event_fail,
        )
    }

    pub fn test_colorcomp_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(&self.metrics.colorcomp_wells(), p.low_event_count, p.cc_low_event_fail)
    }

    pub fn test_carryover_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(
            &self.metrics.carryover_eventful_wells(),
            p.low_event_count,
            p.ncc_low_event_fail,
        )
    }

    pub fn test_noncolorcomp_event_count_low(&self) -> TestResult {
        let p = &self.metrics.params;
        self.event_count_low_of(&self.noncolorcomp_wells(), p.low_event_count, p.ncc_low_event_fail)
    }

    pub fn test_quality_low(&self) -> TestResult {
        let tolerance = self.metrics.params.low_quality_fail;
        let low = self.metrics.low_quality_wells().len();
        let eligible = self.metrics.quality_eligible_wells().len();
        TestResult::new(
            Observed::ratio(low, eligible),
            tolerance.describe(),
            tolerance.allows(low, eligible),
        )
    }

    /// Spread of the singleplex concentration interval relative to its mean.
    pub fn test_singleplex_uniformity(&self) -> TestResult {
        let pct = self.metrics.params.singleplex_uniformity_pct;
        let description = format!("< {}% of mean", pct);
        match self.metrics.all_singleplex_conc_ci95() {
            Some(s) if s.mean != 0.0 => {
                let diff = (s.ci975 - s.ci025) / s.mean;
                TestResult::new(Observed::number(diff), description, diff.abs() < pct as f64 / 100.0)
            }
            _ => TestResult::missing(description),
        }
    }

    // Amplitudes

    pub fn test_fam350_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let variation = if self.qc_plate || self.plate_type == Some(PlateTypeCode::Fvtitr) {
            p.ch1_amp_variation_pct_qc
        } else {
            p.ch1_amp_variation_pct
        };
        let description = amplitude_description(p.fam_amp_350, variation, self.qc_plate);

        let value = if self.reads_single_well() {
            self.single_well_any()
                .map(|s| s.blue_hi_mean)
                .or_else(|| self.multi_well(FAM_HI_SAMPLES, FAM).map(|(m, _)| m))
        } else if self.reads_multi_well() {
            self.multi_well(FAM_HI_SAMPLES, FAM).map(|(m, _)| m)
        } else if self.plate_type == Some(PlateTypeCode::Fvtitr) {
            self.famvic(FAM).map(|(m, _)| m)
        } else {
            None
        };
        amplitude_result(value, p.fam_amp_350, variation, description)
    }

    pub fn test_qc_fam_lo_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let description = amplitude_description(p.fam_amp_lo, p.ch1_amp_variation_pct, true);
        let value = self
            .reads_single_well()
            .then(|| self.single_well_any().map(|s| s.blue_lo_mean))
            .flatten()
            .or_else(|| self.multi_well(FAM_LO_SAMPLES, FAM).map(|(m, _)| m));
        amplitude_result(value, p.fam_amp_lo, p.ch1_amp_variation_pct, description)
    }

    pub fn test_fam350_cv(&self) -> TestResult {
        let max_cv = self.metrics.params.ch1_amp_cv;
        let stats = if self.reads_single_well() {
            self.single_well_any()
                .map(blue_hi)
                .filter(|(mean, _)| *mean > 0.0)
                .or_else(|| self.multi_well(FAM_HI_SAMPLES, FAM))
        } else if self.reads_multi_well() {
            self.multi_well(FAM_HI_SAMPLES, FAM)
        } else if self.plate_type == Some(PlateTypeCode::Fvtitr) {
            self.famvic(FAM)
        } else {
            None
        };
        cv_result(stats, max_cv)
    }

    pub fn test_vic350_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let variation = if self.qc_plate || self.plate_type == Some(PlateTypeCode::Fvtitr) {
            p.ch2_amp_variation_pct_qc
        } else {
            p.ch2_amp_variation_pct
        };
        let description = amplitude_description(p.vic_amp_350, variation, self.qc_plate);

        let value = if self.reads_single_well() {
            self.single_well(Dyeset::FamVic)
                .map(|s| s.green_hi_mean)
                .or_else(|| self.multi_well(VIC_HI_SAMPLES, VIC).map(|(m, _)| m))
        } else if self.reads_multi_well() {
            self.multi_well(VIC_HI_SAMPLES, VIC).map(|(m, _)| m)
        } else if self.plate_type == Some(PlateTypeCode::Fvtitr) {
            self.famvic(VIC).map(|(m, _)| m)
        } else {
            None
        };
        amplitude_result(value, p.vic_amp_350, variation, description)
    }

    pub fn test_qc_vic_lo_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let description = amplitude_description(p.vic_amp_lo, p.ch2_amp_variation_pct, true);
        let value = self
            .reads_single_well()
            .then(|| self.single_well(Dyeset::FamVic).map(|s| s.green_lo_mean))
            .flatten()
            .or_else(|| self.multi_well(VIC_LO_SAMPLES, VIC).map(|(m, _)| m));
        amplitude_result(value, p.vic_amp_lo, p.ch2_amp_variation_pct, description)
    }

    pub fn test_vic350_cv(&self) -> TestResult {
        let max_cv = self.metrics.params.ch2_amp_cv;
        let stats = if self.reads_single_well() {
            self.single_well(Dyeset::FamVic)
                .map(green_hi)
                .filter(|(mean, _)| *mean > 0.0)
                .or_else(|| self.multi_well(VIC_HI_SAMPLES, VIC))
        } else if self.reads_multi_well() {
            self.multi_well(VIC_HI_SAMPLES, VIC)
        } else {
            self.famvic(VIC)
        };
        cv_result(stats, max_cv)
    }

    /// HEX high-cluster amplitude, single-well calibrations only. QC plates
    /// also show the value scaled to the FAM/VIC gain.
    pub fn test_hex350_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let description = amplitude_description(p.hex_amp_350, p.ch1_amp_variation_pct, false);
        let value = self
            .reads_single_well()
            .then(|| self.single_well(Dyeset::FamHex).map(|s| s.green_hi_mean))
            .flatten();
        match value {
            Some(v) => {
                let observed = if self.qc_plate {
                    Observed::hex_scaled(v)
                } else {
                    Observed::number(v)
                };
                TestResult::new(observed, description, within(v, p.hex_amp_350, p.ch1_amp_variation_pct))
            }
            None => TestResult::missing(description),
        }
    }

    pub fn test_qc_hex_lo_amplitude(&self) -> TestResult {
        let p = &self.metrics.params;
        let variation = p.hex_amp_lo_variation_pct_qc;
        let description = amplitude_description(p.hex_amp_lo, variation, true);
        let value = self
            .reads_single_well()
            .then(|| self.single_well(Dyeset::FamHex).map(|s| s.green_lo_mean))
            .flatten()
            .or_else(|| self.multi_well(HEX_LO_SAMPLES, VIC).map(|(m, _)| m));
        match value {
            Some(v) => TestResult::new(Observed::hex_scaled(v), description, within(v, p.hex_amp_lo, variation)),
            None => TestResult::missing(description),
        }
    }

    pub fn test_hex350_cv(&self) -> TestResult {
        let stats = self
            .reads_single_well()
            .then(|| self.single_well(Dyeset::FamHex).map(green_hi))
            .flatten();
        cv_result(stats, self.metrics.params.ch2_amp_cv)
    }

    /// Number of current colorcomp plates whose saved matrix is the identity.
    pub fn test_colorcomp_identity(&self) -> TestResult {
        let mut plates: Vec<&PlateEntry> = Vec::new();
        for dyeset in [Dyeset::FamVic, Dyeset::FamHex] {
            if let Some(entry) = self.metrics.singlewell_colorcomp_plate(dyeset) {
                if !plates.iter().any(|p| p.plate.id == entry.plate.id) {
                    plates.push(entry);
                }
            }
        }
        if plates.is_empty() {
            plates.extend(self.metrics.colorcomp_plate_metrics().last());
        }

        let identity = plates
            .iter()
            .filter(|e| e.plate.color_compensation.is_some_and(|m| m.is_identity()))
            .count();
        TestResult::new(
            Observed::ratio(identity, plates.len()),
            "Must be zero".to_string(),
            identity == 0,
        )
    }

    /// Upper 95% bound of carryover droplets per N stealth wells.
    pub fn test_carryover(&self) -> TestResult {
        let p = &self.metrics.params;
        let description = format!("95% CI < {} per {} wells", p.carryover_per_n_wells, p.carryover_n_wells);
        let peaks: Vec<f64> = self
            .metrics
            .carryover_stealth_wells()
            .iter()
            .filter_map(|w| w.metric.carryover_peaks)
            .map(|c| c as f64)
            .collect();
        let (Some(mean), Some(stdev)) = (crate::stats::mean(&peaks), crate::stats::pstdev(&peaks)) else {
            return TestResult::missing(description);
        };
        let ci95 = mean * p.carryover_n_wells as f64 + 2.0 * stdev;
        TestResult::new(Observed::number(ci95), description, ci95 < p.carryover_per_n_wells as f64)
    }

    pub fn test_widths(&self) -> TestResult {
        let p = &self.metrics.params;
        let description = format!("{} < Avg < {}", p.width_gate_min, p.width_gate_max);
        let mean = self.metrics.mean_width_summary().mean;
        TestResult::new(
            Observed::number(mean),
            description,
            mean > p.width_gate_min && mean < p.width_gate_max,
        )
    }

    /// FAM minus VIC high-cluster width of the newest single-well calibration.
    pub fn test_delta_widths(&self) -> TestResult {
        let p = &self.metrics.params;
        let (min, max, suffix) = if self.qc_plate {
            (p.qc_delta_width_tolerance_min, p.qc_delta_width_tolerance_max, " (QC)")
        } else {
            (p.delta_width_tolerance_min, p.delta_width_tolerance_max, "")
        };
        let description = format!("{} < Avg < {}{}", min, max, suffix);
        let delta = self
            .reads_single_well()
            .then(|| {
                self.metrics
                    .singlewell_colorcomp_delta_widths(Dyeset::FamVic)
                    .or_else(|| self.metrics.singlewell_colorcomp_delta_widths(Dyeset::FamHex))
            })
            .flatten();
        match delta {
            Some(d) => TestResult::new(Observed::number(d), description, d > min && d < max),
            None => TestResult::missing(description),
        }
    }

    /// Mean FAM polydispersity of the eventful carryover wells. Batch QC
    /// carryover plates are held to the tighter limit.
    pub fn test_polydispersity_fam(&self) -> TestResult {
        let p = &self.metrics.params;
        let qc_batch = self.metrics.plate_entries().iter().all(|e| {
            e.plate.qc_plate
                && matches!(
                    e.plate.batch_plate_type,
                    Some(PlateTypeCode::Mfgco | PlateTypeCode::Bcarry)
                )
        });
        let threshold = 100.0
            * if qc_batch {
                p.qc_max_polydispersity
            } else {
                p.max_polydispersity
            };
        let description = format!("Mean < {:.2}%", threshold);

        if self.metrics.carryover_eventful_wells().is_empty() {
            return TestResult::missing(description);
        }
        let pct = self.metrics.polydispersity_carryover_fam_stats().mean * 100.0;
        TestResult::new(Observed::number(pct), description, pct < threshold)
    }

    pub fn test_air_droplet_count(&self) -> TestResult {
        let (with_air, total) = self.metrics.air_droplet_count();
        TestResult::new(Observed::ratio(with_air, total), "Must be zero".to_string(), with_air == 0)
    }

    // Colorcomp summaries

    /// Rain of the multi-well FAM HI well, and whether it got a threshold:
    /// `Yes`, `No`, or `N/A` without such a well.
    pub fn colorcomp_fam_rain(&self) -> (f64, &'static str) {
        rain_label(self.metrics.colorcomp_fam_rain_stats())
    }

    pub fn colorcomp_vic_rain(&self) -> (f64, &'static str) {
        rain_label(self.metrics.colorcomp_vic_rain_stats())
    }

    /// Every test, in report order.
    pub fn report(&self) -> CertificationReport {
        let tests = vec![
            ("event_count_mean", self.test_event_count_mean()),
            ("probe_event_count_mean", self.test_probe_event_count_mean()),
            ("eva_event_count_mean", self.test_eva_event_count_mean()),
            ("carryover_event_count_mean", self.test_carryover_event_count_mean()),
            ("noncolorcomp_event_count_mean", self.test_noncolorcomp_event_count_mean()),
            ("event_count_low", self.test_event_count_low()),
            ("probe_event_count_low", self.test_probe_event_count_low()),
            ("eva_event_count_low", self.test_eva_event_count_low()),
            ("colorcomp_event_count_low", self.test_colorcomp_event_count_low()),
            ("carryover_event_count_low", self.test_carryover_event_count_low()),
            ("noncolorcomp_event_count_low", self.test_noncolorcomp_event_count_low()),
            ("quality_low", self.test_quality_low()),
            ("singleplex_uniformity", self.test_singleplex_uniformity()),
            ("fam350_amplitude", self.test_fam350_amplitude()),
            ("fam350_cv", self.test_fam350_cv()),
            ("vic350_amplitude", self.test_vic350_amplitude()),
            ("vic350_cv", self.test_vic350_cv()),
            ("hex350_amplitude", self.test_hex350_amplitude()),
            ("hex350_cv", self.test_hex350_cv()),
            ("qc_fam_lo_amplitude", self.test_qc_fam_lo_amplitude()),
            ("qc_vic_lo_amplitude", self.test_qc_vic_lo_amplitude()),
            ("qc_hex_lo_amplitude", self.test_qc_hex_lo_amplitude()),
            ("colorcomp_identity", self.test_colorcomp_identity()),
            ("carryover", self.test_carryover()),
            ("widths", self.test_widths()),
            ("delta_widths", self.test_delta_widths()),
            ("polydispersity_fam", self.test_polydispersity_fam()),
            ("air_droplet_count", self.test_air_droplet_count()),
        ];
        CertificationReport {
            limits_key: self.metrics.params.key.clone(),
            plates: self
                .metrics
                .plate_entries()
                .iter()
                .map(|e| e.plate.id.clone())
                .collect(),
            tests: tests.into_iter().map(|(name, t)| (name.to_string(), t)).collect(),
        }
    }
}

fn rain_label(stats: Option<(f64, bool)>) -> (f64, &'static str) {
    match stats {
        Some((rain, true)) => (rain, "Yes"),
        Some((rain, false)) => (rain, "No"),
        None => (0.0, "N/A"),
    }
}
