//! Per-channel calculators.

use crate::model::WellChannelMetric;
use crate::peaks::rain::{
    extracluster_peaks, gap_rain, polydisperse_peaks, revb_extracluster_peaks, revb_polydisperse_peaks,
    RainThreshold,
};
use crate::peaks::well::{observed_positives_negatives, quartile_concentration_ratio, separation_value, DropletClusters};
use crate::peaks::{
    above_min_amplitude_peaks, accepted_peaks, amplitudes, cluster_1d, quality_gated_peaks, rain_gates,
    width_gated_peaks, RAIN_PCT_BOUNDARY,
};
use crate::plate::{DecodedChannel, DecodedWell};
use crate::stats::{kurtosis, mean, pstdev, ratio, skew};
use crate::types::{FAM, VIC};

use super::tables::{
    self, ConcentrationTable, ThresholdTable, FAM_HI_SAMPLES, FAM_LO_SAMPLES, STEALTH_SAMPLES, VIC_HI_SAMPLES,
    VIC_LO_SAMPLES,
};
use super::WellChannelMetricCalculator;

/// Wells with fewer droplets than this are too sparse for shape metrics.
pub const MIN_SHAPE_EVENTS: usize = 1000;

/// Amplitude below which a gap droplet on a dye well counts as air.
const DYE_GAP_AIR_AMPLITUDE: f64 = 1000.0;

pub struct NoopChannel;

impl WellChannelMetricCalculator for NoopChannel {
    fn compute(&self, _well: &DecodedWell, _channel: &DecodedChannel, _metric: &mut WellChannelMetric) {}
}

/// Counts droplets above a fixed amplitude in NTC wells.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NtcPositive {
    pub fam_threshold: f64,
    pub vic_threshold: f64,
}

impl NtcPositive {
    pub const DEFAULT: NtcPositive = NtcPositive {
        fam_threshold: 4000.0,
        vic_threshold: 2000.0,
    };
}

impl WellChannelMetricCalculator for NtcPositive {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        if !well.sample().contains("NTC") {
            return;
        }
        let threshold = if channel.channel_num == FAM {
            self.fam_threshold
        } else {
            self.vic_threshold
        };
        let (positives, _) = cluster_1d(&accepted_peaks(well), channel.channel_num, threshold);
        metric.ntc_positives = Some(positives.len());
    }
}

fn is_fam_hi(well: &DecodedWell, channel: &DecodedChannel) -> bool {
    channel.channel_num == FAM && well.sample_in(FAM_HI_SAMPLES)
}

fn is_vic_hi(well: &DecodedWell, channel: &DecodedChannel) -> bool {
    channel.channel_num == VIC && well.sample_in(VIC_HI_SAMPLES)
}

/// A dye well measured on its own dye's channel, at either concentration.
fn is_dye_channel(well: &DecodedWell, channel: &DecodedChannel) -> bool {
    match channel.channel_num {
        FAM => well.sample_in(FAM_HI_SAMPLES) || well.sample_in(FAM_LO_SAMPLES),
        VIC => well.sample_in(VIC_HI_SAMPLES) || well.sample_in(VIC_LO_SAMPLES),
        _ => false,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polydispersity {
    Default,
    /// Only the HI dye well on its own channel.
    ColorComp,
}

impl Polydispersity {
    fn compute_default(well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        if well.peaks.len() < MIN_SHAPE_EVENTS {
            return;
        }
        let ch = channel.channel_num;
        let above_min = above_min_amplitude_peaks(well).len() as f64;
        let poly = polydisperse_peaks(well, ch).count();
        metric.polydispersity = Some(ratio(poly as f64, above_min));

        metric.revb_polydispersity = if well.sum_amplitude_bins.is_empty() {
            None
        } else {
            let poly = revb_polydisperse_peaks(well, ch).count();
            Some(ratio(poly as f64, above_min))
        };
    }
}

impl WellChannelMetricCalculator for Polydispersity {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        match self {
            Polydispersity::Default => Self::compute_default(well, channel, metric),
            Polydispersity::ColorComp => {
                if is_fam_hi(well, channel) || is_vic_hi(well, channel) {
                    Self::compute_default(well, channel, metric);
                } else {
                    metric.polydispersity = None;
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extracluster {
    Default,
    /// Only dye wells on their own channel.
    ColorComp,
}

impl Extracluster {
    fn compute_default(well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        if well.peaks.len() < MIN_SHAPE_EVENTS {
            return;
        }
        let ch = channel.channel_num;
        let above_min = above_min_amplitude_peaks(well).len() as f64;
        metric.extracluster = Some(ratio(extracluster_peaks(well, ch).len() as f64, above_min));

        metric.revb_extracluster = if well.sum_amplitude_bins.is_empty() {
            None
        } else {
            Some(ratio(revb_extracluster_peaks(well, ch).len() as f64, above_min))
        };
    }
}

impl WellChannelMetricCalculator for Extracluster {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        match self {
            Extracluster::Default => Self::compute_default(well, channel, metric),
            Extracluster::ColorComp => {
                if is_dye_channel(well, channel) {
                    Self::compute_default(well, channel, metric);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DyeGapRain {
    Default,
    /// Dim gap droplets of dye wells only.
    ColorComp,
}

impl WellChannelMetricCalculator for DyeGapRain {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let ch = channel.channel_num;
        match self {
            DyeGapRain::Default => {
                if well.peaks.len() < MIN_SHAPE_EVENTS {
                    return;
                }
                metric.gap_rain_droplets = Some(gap_rain(well, ch, RainThreshold::Fixed(0.0)).len());
            }
            DyeGapRain::ColorComp => {
                if !is_dye_channel(well, channel) {
                    return;
                }
                let drops = gap_rain(well, ch, RainThreshold::Fixed(0.0));
                let (_, air) = cluster_1d(&drops, ch, DYE_GAP_AIR_AMPLITUDE);
                metric.gap_rain_droplets = Some(air.len());
            }
        }
    }
}

/// 2D cluster shape on one channel: separation, fliers and rain.
pub struct NewDropletCluster;

impl WellChannelMetricCalculator for NewDropletCluster {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let ch = channel.channel_num;
        let clusters = DropletClusters::of(well);
        let clusters = clusters.as_ref();

        metric.s2d_value = clusters.and_then(|c| c.s2d(ch));
        metric.high_flier_value = clusters.and_then(|c| c.high_fliers(ch)).map(|(count, _)| count);
        metric.low_flier_value = clusters.and_then(|c| c.low_fliers(ch)).map(|(count, _)| count);

        let single = clusters.and_then(|c| c.single_rain(ch));
        metric.single_rain_value = single.map(|(count, _)| count);
        metric.single_rain_pct = single.map(|(_, fraction)| fraction * 100.0);

        let double = clusters.and_then(|c| c.double_rain(ch));
        metric.double_rain_value = double.map(|(count, _)| count);
        metric.double_rain_pct = double.map(|(_, fraction)| fraction * 100.0);
    }
}

/// Expected concentration from the plate layout.
pub struct ExpectedConcentration(pub ConcentrationTable);

impl WellChannelMetricCalculator for ExpectedConcentration {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        metric.expected_concentration =
            tables::expected_concentration(self.0, well.sample_name.as_deref(), channel.channel_num);
    }
}

/// Whether the instrument should have called a threshold.
pub enum ExpectedThreshold {
    Lookup(ThresholdTable),
    /// Dye and colorcomp layouts never expect a threshold.
    Never,
    /// Eventful carryover wells expect a FAM threshold; stealth wells none.
    Carryover,
}

impl WellChannelMetricCalculator for ExpectedThreshold {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let expected = match self {
            ExpectedThreshold::Lookup(table) => {
                tables::threshold_expected(table, well.sample_name.as_deref(), channel.channel_num)
            }
            ExpectedThreshold::Never => false,
            ExpectedThreshold::Carryover => metric.channel_num != VIC && !well.sample_in(STEALTH_SAMPLES),
        };
        metric.auto_threshold_expected = Some(expected);
    }
}

/// Channel metrics every well gets, whatever its plate type.
pub struct BaseChannelMetrics {
    pub ntc: NtcPositive,
}

impl BaseChannelMetrics {
    fn copy_statistics(channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let stats = &channel.statistics;
        metric.target = channel.target.clone();
        metric.min_quality_gating = stats.min_quality_gate;
        metric.min_quality_gating_conf = stats.min_quality_gate_conf;
        metric.min_width_gate = stats.min_width_gate;
        metric.min_width_gate_conf = stats.min_width_gate_conf;
        metric.max_width_gate = stats.max_width_gate;
        metric.max_width_gate_conf = stats.max_width_gate_conf;
        metric.width_gating_sigma = stats.width_gating_sigma;
        metric.threshold = stats.threshold;
        metric.threshold_conf = stats.threshold_conf;
        metric.concentration = stats.concentration;
        metric.conc_lower_bound = stats.concentration_lower_bound;
        metric.conc_upper_bound = stats.concentration_upper_bound;
        metric.conc_calc_mode = stats.concentration_calc_mode.unwrap_or_default();
        metric.baseline_mean = stats.baseline_mean;
        metric.baseline_stdev = stats.baseline_stdev;
        metric.cluster_conf = stats.cluster_conf;
        metric.decision_tree_flags = channel.decision_tree_flags;
    }
}

impl WellChannelMetricCalculator for BaseChannelMetrics {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let ch = channel.channel_num;
        Self::copy_statistics(channel, metric);
        metric.auto_threshold_expected = Some(false);
        metric.clusters_automatic = Some(!well.clusters_defined);

        let accepted = accepted_peaks(well);
        let accepted_amps = amplitudes(&accepted, ch);
        metric.amplitude_mean = mean(&accepted_amps);
        metric.amplitude_stdev = pstdev(&accepted_amps);

        let all_amps = amplitudes(&well.peaks, ch);
        metric.total_events_amplitude_mean = mean(&all_amps);
        metric.total_events_amplitude_stdev = pstdev(&all_amps);

        metric.quality_gated_peaks = Some(quality_gated_peaks(well).len());
        metric.width_gated_peaks = Some(width_gated_peaks(well).len());

        let threshold = metric.called_threshold();
        metric.s_value = threshold.and_then(|t| separation_value(&accepted, ch, t));
        let rain = rain_gates(&accepted, ch, threshold, RAIN_PCT_BOUNDARY);
        metric.rain_p_plus = rain.p_plus;
        metric.rain_p = rain.p;
        metric.rain_p_minus = rain.p_minus;

        NewDropletCluster.compute(well, channel, metric);
        Polydispersity::Default.compute(well, channel, metric);
        Extracluster::Default.compute(well, channel, metric);
        self.ntc.compute(well, channel, metric);

        match observed_positives_negatives(well, ch) {
            Some((positives, negatives)) if !positives.is_empty() || !negatives.is_empty() => {
                let pos_amps = amplitudes(&positives, ch);
                let neg_amps = amplitudes(&negatives, ch);
                metric.positive_peaks = Some(positives.len());
                metric.negative_peaks = Some(negatives.len());
                metric.positive_mean = mean(&pos_amps);
                metric.positive_stdev = pstdev(&pos_amps);
                metric.negative_mean = mean(&neg_amps);
                metric.negative_stdev = pstdev(&neg_amps);
                metric.positive_skew = skew(&pos_amps);
                metric.positive_kurtosis = kurtosis(&pos_amps);
                metric.nonpositive_skew = skew(&neg_amps);
                metric.nonpositive_kurtosis = kurtosis(&neg_amps);
                metric.concentration_rise_ratio = quartile_concentration_ratio(well, &accepted, ch);
            }
            _ => {
                metric.nonpositive_skew = skew(&accepted_amps);
                metric.nonpositive_kurtosis = kurtosis(&accepted_amps);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{duplex_well, peak, peaks_at, well};

    fn compute(calc: &dyn WellChannelMetricCalculator, well: &DecodedWell, ch: usize) -> WellChannelMetric {
        let mut metric = WellChannelMetric::new(ch);
        calc.compute(well, &well.channels[ch], &mut metric);
        metric
    }

    #[test]
    fn test_ntc_positive_only_on_ntc_wells() {
        let peaks = vec![peak(0, 5000.0, 2500.0), peak(100, 3000.0, 1500.0), peak(200, 4500.0, 100.0)];
        let ntc = well(Some("S.a. NTC"), peaks.clone(), [None, None]);
        assert_eq!(compute(&NtcPositive::DEFAULT, &ntc, 0).ntc_positives, Some(2));
        assert_eq!(compute(&NtcPositive::DEFAULT, &ntc, 1).ntc_positives, Some(1));

        let sample = well(Some("S.a. 0.5"), peaks, [None, None]);
        assert_eq!(compute(&NtcPositive::DEFAULT, &sample, 0).ntc_positives, None);
    }

    #[test]
    fn test_polydispersity_skips_sparse_wells() {
        let sparse = well(Some("FAM HI"), peaks_at(999, 0, 9000.0, 500.0), [None, None]);
        let metric = compute(&Polydispersity::Default, &sparse, 0);
        assert_eq!(metric.polydispersity, None);
        assert_eq!(metric.revb_polydispersity, None);
    }

    #[test]
    fn test_polydispersity_counts_wide_droplets() {
        let mut peaks = peaks_at(1000, 0, 9000.0, 500.0);
        for p in peaks.iter_mut().take(10) {
            p.channels[0].width = 12.0;
            p.channels[0].amplitude = 20000.0;
        }
        let w = well(Some("FAM HI"), peaks, [None, None]);
        let metric = compute(&Polydispersity::Default, &w, 0);
        assert!((metric.polydispersity.unwrap() - 0.01).abs() < 1e-12);
        assert_eq!(metric.revb_polydispersity, None);
    }

    #[test]
    fn test_colorcomp_polydispersity_blanks_other_wells() {
        let w = well(Some("FAM LO"), peaks_at(1000, 0, 9000.0, 500.0), [None, None]);
        let mut metric = WellChannelMetric::new(0);
        metric.polydispersity = Some(0.5);
        Polydispersity::ColorComp.compute(&w, &w.channels[0], &mut metric);
        assert_eq!(metric.polydispersity, None);

        let hi = well(Some("VIC 350nM"), peaks_at(1000, 0, 500.0, 9000.0), [None, None]);
        assert_eq!(compute(&Polydispersity::ColorComp, &hi, 1).polydispersity, Some(0.0));
        assert_eq!(compute(&Polydispersity::ColorComp, &hi, 0).polydispersity, None);
    }

    #[test]
    fn test_colorcomp_extracluster_leaves_other_wells() {
        let w = well(Some("VIC LO"), peaks_at(1000, 0, 500.0, 4000.0), [None, None]);
        assert_eq!(compute(&Extracluster::ColorComp, &w, 0).extracluster, None);
        assert_eq!(compute(&Extracluster::ColorComp, &w, 1).extracluster, Some(0.0));
    }

    #[test]
    fn test_new_droplet_cluster_needs_both_thresholds() {
        let w = well(None, peaks_at(10, 0, 9000.0, 1000.0), [Some(5000.0), None]);
        let metric = compute(&NewDropletCluster, &w, 0);
        assert_eq!(metric.s2d_value, None);
        assert_eq!(metric.single_rain_pct, None);

        let duplex = duplex_well(None, 50, 50, 50, 50);
        let metric = compute(&NewDropletCluster, &duplex, 0);
        assert_eq!(metric.high_flier_value, Some(0));
        assert_eq!(metric.single_rain_value, Some(0));
        assert_eq!(metric.single_rain_pct, Some(0.0));
    }

    #[test]
    fn test_expected_concentration_from_table() {
        let w = well(Some("S.a. 0.25"), Vec::new(), [None, None]);
        let calc = ExpectedConcentration(tables::DUPLEX_CONCENTRATIONS);
        assert_eq!(compute(&calc, &w, 0).expected_concentration, Some(250.0));
        assert_eq!(compute(&calc, &w, 1).expected_concentration, Some(1000.0));
    }

    #[test]
    fn test_expected_threshold_variants() {
        let stealth = well(Some("stealth"), Vec::new(), [None, None]);
        let staph = well(Some("Staph"), Vec::new(), [None, None]);
        let carry = ExpectedThreshold::Carryover;
        assert_eq!(compute(&carry, &stealth, 0).auto_threshold_expected, Some(false));
        assert_eq!(compute(&carry, &staph, 0).auto_threshold_expected, Some(true));
        assert_eq!(compute(&carry, &staph, 1).auto_threshold_expected, Some(false));
        assert_eq!(
            compute(&ExpectedThreshold::Never, &staph, 0).auto_threshold_expected,
            Some(false)
        );
        let lookup = ExpectedThreshold::Lookup(tables::TQ200_THRESHOLDS);
        let tq = well(Some("0.5 Ch2"), Vec::new(), [None, None]);
        assert_eq!(compute(&lookup, &tq, 0).auto_threshold_expected, Some(false));
        assert_eq!(compute(&lookup, &tq, 1).auto_threshold_expected, Some(true));
    }

    #[test]
    fn test_base_metrics_split_at_threshold() {
        let w = duplex_well(Some("S.a. 0.5"), 10, 30, 10, 50);
        let base = BaseChannelMetrics { ntc: NtcPositive::DEFAULT };
        let metric = compute(&base, &w, 0);
        assert_eq!(metric.threshold, Some(5000.0));
        assert_eq!(metric.positive_peaks, Some(40));
        assert_eq!(metric.negative_peaks, Some(60));
        assert_eq!(metric.positive_mean, Some(9000.0));
        assert_eq!(metric.negative_stdev, Some(0.0));
        assert_eq!(metric.auto_threshold_expected, Some(false));
        assert_eq!(metric.clusters_automatic, Some(true));
        assert_eq!(metric.quality_gated_peaks, Some(0));
        assert_eq!(metric.concentration_rise_ratio, None);
        assert!(metric.s_value.is_none());
        assert_eq!(metric.rain_p, Some(0.0));
    }

    #[test]
    fn test_base_metrics_without_threshold() {
        let w = well(Some("FAM HI"), peaks_at(20, 0, 9000.0, 500.0), [None, None]);
        let base = BaseChannelMetrics { ntc: NtcPositive::DEFAULT };
        let metric = compute(&base, &w, 0);
        assert_eq!(metric.positive_peaks, None);
        assert_eq!(metric.amplitude_mean, Some(9000.0));
        assert_eq!(metric.total_events_amplitude_stdev, Some(0.0));
        assert_eq!(metric.nonpositive_skew, None);
        assert_eq!(metric.rain_p_plus, Some(0.0));
    }
}
