//! Per-well calculators.

use std::collections::HashSet;

use crate::model::metrics::{CONC_CALC_MODE_CLUSTER, CONC_CALC_MODE_THRESHOLD};
use crate::model::WellMetric;
use crate::peaks::rain::{gap_air, RainThreshold};
use crate::peaks::well::{
    balance_score, cnv_rise_ratio, fragmentation_probability, linkage_2d, narrow_droplet_spacing_count,
    observed_cnv_interval, well_quadrants, DropletClusters, NARROW_NORMALIZED_DROPLET_SPACING,
};
use crate::peaks::{above_min_amplitude_peaks, accepted_peaks, cluster_1d, min_amplitude_peaks, widths};
use crate::plate::DecodedWell;
use crate::stats::{mean, pstdev};
use crate::types::{Channel, FAM, VIC};

use super::tables::{self, CnvTable};
use super::WellMetricCalculator;

pub struct NoopWell;

impl WellMetricCalculator for NoopWell {
    fn compute(&self, _well: &DecodedWell, _metric: &mut WellMetric) {}
}

/// Copy number of `target` against `reference`, and its inverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cnv {
    pub target: Channel,
    pub reference: Channel,
}

impl Cnv {
    pub const DEFAULT: Cnv = Cnv {
        target: FAM,
        reference: VIC,
    };
}

impl WellMetricCalculator for Cnv {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        let cnv = observed_cnv_interval(well, self.target, self.reference);
        metric.cnv = cnv.map(|c| c.cnv);
        metric.cnv_lower_bound = cnv.and_then(|c| c.lower);
        metric.cnv_upper_bound = cnv.and_then(|c| c.upper);

        let inverse = observed_cnv_interval(well, self.reference, self.target);
        metric.inverse_cnv = inverse.map(|c| c.cnv);
        metric.inverse_cnv_lower_bound = inverse.and_then(|c| c.lower);
        metric.inverse_cnv_upper_bound = inverse.and_then(|c| c.upper);

        metric.cnv_calc_mode = if well.clusters_defined {
            CONC_CALC_MODE_CLUSTER
        } else {
            CONC_CALC_MODE_THRESHOLD
        };

        if well.threshold(self.target).is_some() && well.threshold(self.reference).is_some() {
            metric.cnv_rise_ratio = cnv_rise_ratio(well, &accepted_peaks(well), self.target, self.reference);
        }
        metric.clear_undefined_cnv();
    }
}

/// Copy number plus the copy number the layout expects.
pub struct ExpectedCnv(pub CnvTable);

impl WellMetricCalculator for ExpectedCnv {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        Cnv::DEFAULT.compute(well, metric);
        metric.expected_cnv = tables::expected_cnv(self.0, well.sample_name.as_deref());
    }
}

/// Bright VIC events in stealth wells, which carry no dye at all.
#[derive(Debug, Clone, Copy)]
pub struct StealthAirDroplets {
    pub samples: &'static [&'static str],
    pub channel: Channel,
    pub threshold: f64,
}

impl StealthAirDroplets {
    pub const DEFAULT: StealthAirDroplets = StealthAirDroplets {
        samples: tables::STEALTH_SAMPLES,
        channel: VIC,
        threshold: 250.0,
    };
}

impl WellMetricCalculator for StealthAirDroplets {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        if !well.sample_in(self.samples) {
            return;
        }
        let (air, _) = cluster_1d(&well.peaks, self.channel, self.threshold);
        metric.air_droplets = Some(air.len());
        metric.air_droplets_threshold = Some(self.threshold);
    }
}

/// Accepted droplets that sit in gaps of the droplet stream and are too
/// dim to be real droplets.
#[derive(Debug, Clone, Copy)]
pub struct AirDroplets {
    pub samples: &'static [&'static str],
    pub channel: Channel,
}

impl WellMetricCalculator for AirDroplets {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        if !well.sample_in(self.samples) {
            return;
        }
        let accepted: HashSet<u64> = accepted_peaks(well).iter().map(|p| p.time).collect();
        let air = gap_air(well, self.channel, RainThreshold::Called);
        metric.air_droplets = Some(air.iter().filter(|p| accepted.contains(&p.time)).count());
        metric.air_droplets_threshold = well.statistics(VIC).trigger_min_amplitude;
    }
}

/// Staph wells of a carryover layout count gap air droplets; the stealth
/// wells between them count bright VIC events.
pub struct CarryoverAirDroplets;

impl CarryoverAirDroplets {
    const STAPH: AirDroplets = AirDroplets {
        samples: tables::CARRYOVER_STAPH_SAMPLES,
        channel: FAM,
    };
}

impl WellMetricCalculator for CarryoverAirDroplets {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        Self::STAPH.compute(well, metric);
        StealthAirDroplets::DEFAULT.compute(well, metric);
    }
}

/// Observed over expected double positives. Needs both thresholds.
pub struct NullLinkage;

impl WellMetricCalculator for NullLinkage {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        if let Some(quadrants) = well_quadrants(well) {
            metric.null_linkage = linkage_2d(&quadrants);
        }
    }
}

/// Clears null linkage on layouts where it means nothing.
pub struct BlankLinkage;

impl WellMetricCalculator for BlankLinkage {
    fn compute(&self, _well: &DecodedWell, metric: &mut WellMetric) {
        metric.null_linkage = None;
    }
}

pub struct NewDropletClusterWell;

impl WellMetricCalculator for NewDropletClusterWell {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        let scatter = DropletClusters::of(well).and_then(|c| c.diagonal_scatter());
        metric.diagonal_scatter = scatter.map(|(count, _)| count);
        metric.diagonal_scatter_pct = scatter.map(|(_, fraction)| fraction * 100.0);
    }
}

/// Well metrics every well gets, whatever its plate type.
pub struct BaseWellMetrics;

impl WellMetricCalculator for BaseWellMetrics {
    fn compute(&self, well: &DecodedWell, metric: &mut WellMetric) {
        metric.sample_name = well.sample_name.clone();
        metric.experiment_name = well.experiment_name.clone();

        let accepted = accepted_peaks(well);
        metric.accepted_event_count = accepted.len();
        metric.total_event_count = well.peaks.len();

        let above_min_widths = widths(&above_min_amplitude_peaks(well), FAM);
        metric.width_mean = mean(&above_min_widths);
        metric.width_variance = pstdev(&above_min_widths);
        let accepted_widths = widths(&accepted, FAM);
        metric.accepted_width_mean = mean(&accepted_widths);
        metric.accepted_width_stdev = pstdev(&accepted_widths);

        metric.rejected_peaks = well.statistics.rejected_peaks;
        metric.vertical_streak_events = well.statistics.vertical_streak_peaks;
        metric.sum_baseline_mean = well.statistics.sum_baseline_mean;
        metric.sum_baseline_stdev = well.statistics.sum_baseline_stdev;
        metric.min_amplitude_peaks = Some(min_amplitude_peaks(well).len());

        metric.short_interval_count = Some(narrow_droplet_spacing_count(well, NARROW_NORMALIZED_DROPLET_SPACING));
        metric.short_interval_threshold = Some(NARROW_NORMALIZED_DROPLET_SPACING);
        metric.balance_score = balance_score(well);
        metric.fragmentation_probability = fragmentation_probability(well);

        NewDropletClusterWell.compute(well, metric);
        Cnv::DEFAULT.compute(well, metric);
        NullLinkage.compute(well, metric);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{duplex_well, peak, peak_w, peaks_at, well};
    use crate::types::WellName;

    fn name() -> WellName {
        "A01".parse().unwrap()
    }

    fn compute(calc: &dyn WellMetricCalculator, well: &DecodedWell) -> WellMetric {
        let mut metric = WellMetric::new(name());
        calc.compute(well, &mut metric);
        metric
    }

    #[test]
    fn test_cnv_of_balanced_duplex() {
        let w = duplex_well(Some("NA18507 CN2"), 100, 100, 100, 100);
        let metric = compute(&Cnv::DEFAULT, &w);
        assert!((metric.cnv.unwrap() - 2.0).abs() < 1e-9);
        assert!((metric.inverse_cnv.unwrap() - 2.0).abs() < 1e-9);
        assert_eq!(metric.cnv_calc_mode, CONC_CALC_MODE_THRESHOLD);
        assert_eq!(metric.cnv_rise_ratio, None);
    }

    #[test]
    fn test_cnv_needs_thresholds() {
        let w = well(None, peaks_at(10, 0, 9000.0, 1000.0), [Some(5000.0), None]);
        let mut metric = WellMetric::new(name());
        metric.cnv = Some(f64::NAN);
        Cnv::DEFAULT.compute(&w, &mut metric);
        assert_eq!(metric.cnv, None);
        assert_eq!(metric.inverse_cnv_upper_bound, None);
    }

    #[test]
    fn test_cnv_rise_ratio_none_under_four_thousand_peaks() {
        let w = duplex_well(None, 999, 999, 999, 999);
        assert_eq!(compute(&Cnv::DEFAULT, &w).cnv_rise_ratio, None);
    }

    #[test]
    fn test_expected_cnv_from_table() {
        let w = duplex_well(Some("NA18502 CN3"), 10, 10, 10, 10);
        let metric = compute(&ExpectedCnv(tables::CNV_COPY_NUMBERS), &w);
        assert_eq!(metric.expected_cnv, Some(3.0));
        assert!(metric.cnv.is_some());
    }

    #[test]
    fn test_stealth_air_droplets() {
        let peaks = vec![peak(0, 100.0, 300.0), peak(100, 100.0, 250.0), peak(200, 100.0, 800.0)];
        let stealth = well(Some("Stealth"), peaks.clone(), [None, None]);
        let metric = compute(&StealthAirDroplets::DEFAULT, &stealth);
        assert_eq!(metric.air_droplets, Some(2));
        assert_eq!(metric.air_droplets_threshold, Some(250.0));

        let staph = well(Some("Staph"), peaks, [None, None]);
        assert_eq!(compute(&StealthAirDroplets::DEFAULT, &staph).air_droplets, None);
    }

    #[test]
    fn test_air_droplets_only_for_listed_samples() {
        let w = well(Some("Dye"), peaks_at(10, 0, 500.0, 5000.0), [None, None]);
        let calc = AirDroplets {
            samples: &["SA singleplex 1.0"],
            channel: FAM,
        };
        assert_eq!(compute(&calc, &w).air_droplets, None);

        let calc = AirDroplets {
            samples: &["Dye"],
            channel: VIC,
        };
        assert_eq!(compute(&calc, &w).air_droplets, Some(0));
    }

    #[test]
    fn test_null_linkage_of_independent_partitioning() {
        let w = duplex_well(None, 25, 25, 25, 25);
        assert_eq!(compute(&NullLinkage, &w).null_linkage, Some(1.0));

        let single = well(None, peaks_at(10, 0, 9000.0, 1000.0), [Some(5000.0), None]);
        let mut metric = WellMetric::new(name());
        metric.null_linkage = Some(0.7);
        NullLinkage.compute(&single, &mut metric);
        assert_eq!(metric.null_linkage, Some(0.7));
        BlankLinkage.compute(&single, &mut metric);
        assert_eq!(metric.null_linkage, None);
    }

    #[test]
    fn test_base_well_metrics() {
        let mut peaks = peaks_at(8, 0, 9000.0, 1000.0);
        peaks.push(peak_w(10_000, 9000.0, 1000.0, 13.5));
        peaks[8].gated.width = true;
        let mut min_amp = peak(20_000, 50.0, 50.0);
        min_amp.gated.min_amplitude = true;
        peaks.push(min_amp);

        let mut w = well(Some("S.a. 1cpd"), peaks, [Some(5000.0), None]);
        w.statistics.rejected_peaks = Some(3);
        let metric = compute(&BaseWellMetrics, &w);

        assert_eq!(metric.sample_name.as_deref(), Some("S.a. 1cpd"));
        assert_eq!(metric.accepted_event_count, 8);
        assert_eq!(metric.total_event_count, 10);
        assert_eq!(metric.width_mean, Some(9.5));
        assert_eq!(metric.accepted_width_mean, Some(9.0));
        assert_eq!(metric.accepted_width_stdev, Some(0.0));
        assert_eq!(metric.min_amplitude_peaks, Some(1));
        assert_eq!(metric.rejected_peaks, Some(3));
        assert_eq!(metric.short_interval_threshold, Some(1.25));
        assert_eq!(metric.balance_score, None);
        assert_eq!(metric.diagonal_scatter, None);
        assert_eq!(metric.cnv, None);
    }

    #[test]
    fn test_carryover_air_droplets_on_stealth_wells() {
        let peaks = vec![peak(0, 100.0, 300.0), peak(100, 100.0, 100.0), peak(200, 100.0, 900.0)];
        let stealth = well(Some("Stealth"), peaks.clone(), [None, None]);
        let metric = compute(&CarryoverAirDroplets, &stealth);
        assert_eq!(metric.air_droplets, Some(2));
        assert_eq!(metric.air_droplets_threshold, Some(250.0));

        let other = well(Some("NTC"), peaks, [None, None]);
        assert_eq!(compute(&CarryoverAirDroplets, &other).air_droplets, None);
    }
}
