//! Plate, well and channel metric records.
//!
//! Ratios are stored as fractions in `0..=1`. The `*_pct` accessors
//! scale them on read, so a percentage is never stored twice.

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;
use crate::types::{Channel, WellName};

/// Value substituted for an infinite metric before it is stored.
pub const INFINITY_SUBSTITUTE: f64 = 1_000_000.0;

/// Concentration was called from thresholds.
pub const CONC_CALC_MODE_THRESHOLD: u8 = 0;
/// Concentration was called from 2D clusters.
pub const CONC_CALC_MODE_CLUSTER: u8 = 1;

fn percent(value: Option<f64>) -> Option<f64> {
    value.map(|v| v * 100.0)
}

fn sanitize_real(value: &mut Option<f64>) {
    if let Some(v) = value {
        if v.is_nan() {
            *value = Some(0.0);
        } else if v.is_infinite() {
            *value = Some(INFINITY_SUBSTITUTE.copysign(*v));
        }
    }
}

fn nan_to_none(value: &mut Option<f64>) {
    if value.is_some_and(f64::is_nan) {
        *value = None;
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WellChannelMetric {
    pub channel_num: Channel,
    pub target: Option<String>,

    pub min_quality_gating: Option<f64>,
    pub min_quality_gating_conf: Option<f64>,
    pub min_width_gate: Option<f64>,
    pub min_width_gate_conf: Option<f64>,
    pub max_width_gate: Option<f64>,
    pub max_width_gate_conf: Option<f64>,
    pub width_gating_sigma: Option<f64>,

    pub threshold: Option<f64>,
    pub threshold_conf: Option<f64>,
    /// Threshold assigned during metric computation, not by the instrument.
    pub manual_threshold: Option<f64>,
    pub auto_threshold_expected: Option<bool>,

    pub concentration: Option<f64>,
    pub conc_lower_bound: Option<f64>,
    pub conc_upper_bound: Option<f64>,
    pub conc_calc_mode: u8,
    pub expected_concentration: Option<f64>,

    pub positive_peaks: Option<usize>,
    pub negative_peaks: Option<usize>,
    pub width_gated_peaks: Option<usize>,
    pub quality_gated_peaks: Option<usize>,
    pub false_positive_peaks: Option<usize>,
    pub false_negative_peaks: Option<usize>,
    pub carryover_peaks: Option<usize>,

    pub total_events_amplitude_mean: Option<f64>,
    pub total_events_amplitude_stdev: Option<f64>,
    pub amplitude_mean: Option<f64>,
    pub amplitude_stdev: Option<f64>,
    pub positive_mean: Option<f64>,
    pub positive_stdev: Option<f64>,
    pub negative_mean: Option<f64>,
    pub negative_stdev: Option<f64>,

    pub decision_tree_flags: u32,
    pub s_value: Option<f64>,
    pub rain_p_plus: Option<f64>,
    pub rain_p: Option<f64>,
    pub rain_p_minus: Option<f64>,
    pub positive_skew: Option<f64>,
    pub positive_kurtosis: Option<f64>,
    pub nonpositive_skew: Option<f64>,
    pub nonpositive_kurtosis: Option<f64>,
    pub concentration_rise_ratio: Option<f64>,
    pub baseline_mean: Option<f64>,
    pub baseline_stdev: Option<f64>,

    pub polydispersity: Option<f64>,
    pub revb_polydispersity: Option<f64>,
    pub extracluster: Option<f64>,
    pub revb_extracluster: Option<f64>,
    pub gap_rain_droplets: Option<usize>,
    pub cluster_conf: Option<f64>,
    pub clusters_automatic: Option<bool>,
    pub ntc_positives: Option<usize>,

    pub s2d_value: Option<f64>,
    pub high_flier_value: Option<usize>,
    pub low_flier_value: Option<usize>,
    pub single_rain_value: Option<usize>,
    /// Already scaled to a percentage.
    pub single_rain_pct: Option<f64>,
    pub double_rain_value: Option<usize>,
    /// Already scaled to a percentage.
    pub double_rain_pct: Option<f64>,
    pub width_mean_hi: Option<f64>,
}

impl WellChannelMetric {
    pub fn new(channel_num: Channel) -> Self {
        Self {
            channel_num,
            ..Default::default()
        }
    }

    /// The called threshold, if it is usable as a dividing line.
    pub fn called_threshold(&self) -> Option<f64> {
        self.threshold.filter(|t| *t != 0.0)
    }

    pub fn rain_p_plus_pct(&self) -> Option<f64> {
        percent(self.rain_p_plus)
    }

    pub fn rain_p_pct(&self) -> Option<f64> {
        percent(self.rain_p)
    }

    pub fn rain_p_minus_pct(&self) -> Option<f64> {
        percent(self.rain_p_minus)
    }

    pub fn polydispersity_pct(&self) -> Option<f64> {
        percent(self.polydispersity)
    }

    pub fn revb_polydispersity_pct(&self) -> Option<f64> {
        percent(self.revb_polydispersity)
    }

    pub fn extracluster_pct(&self) -> Option<f64> {
        percent(self.extracluster)
    }

    pub fn revb_extracluster_pct(&self) -> Option<f64> {
        percent(self.revb_extracluster)
    }

    fn accepted_droplets(&self) -> Option<usize> {
        Some(self.positive_peaks? + self.negative_peaks?)
    }

    fn flier_pct(&self, fliers: Option<usize>) -> Option<f64> {
        let fliers = fliers?;
        let accepted = self.accepted_droplets()?;
        if accepted == 0 {
            return Some(0.0);
        }
        Some(fliers as f64 * 100.0 / accepted as f64)
    }

    pub fn high_flier_pct(&self) -> Option<f64> {
        self.flier_pct(self.high_flier_value)
    }

    pub fn low_flier_pct(&self) -> Option<f64> {
        self.flier_pct(self.low_flier_value)
    }

    fn has_positives(&self) -> bool {
        self.positive_peaks.unwrap_or(0) > 0
    }

    /// Negative mean when positives were called, else the mean of all
    /// accepted droplets.
    pub fn nonpositive_mean(&self) -> Option<f64> {
        if self.has_positives() {
            self.negative_mean
        } else {
            self.amplitude_mean
        }
    }

    pub fn nonpositive_stdev(&self) -> Option<f64> {
        if self.has_positives() {
            self.negative_stdev
        } else {
            self.amplitude_stdev
        }
    }

    pub fn mean_pos_neg_ratio(&self) -> Option<f64> {
        self.accepted_droplets()?;
        match (self.positive_mean, self.negative_mean) {
            (Some(pos), Some(neg)) if neg > 0.0 => Some(pos / neg),
            _ => Some(0.0),
        }
    }

    pub fn positive_snr(&self) -> Option<f64> {
        let stdev = self.positive_stdev.filter(|s| *s != 0.0)?;
        if !self.has_positives() {
            return None;
        }
        Some(self.positive_mean? / stdev)
    }

    pub fn nonpositive_snr(&self) -> Option<f64> {
        let stdev = self.nonpositive_stdev().filter(|s| *s != 0.0)?;
        Some(self.nonpositive_mean()? / stdev)
    }

    fn cv_pct(stdev: Option<f64>, mean: Option<f64>) -> Option<f64> {
        let mean = mean.filter(|m| *m != 0.0)?;
        Some(stdev? * 100.0 / mean)
    }

    pub fn total_events_amplitude_cv_pct(&self) -> Option<f64> {
        Self::cv_pct(self.total_events_amplitude_stdev, self.total_events_amplitude_mean)
    }

    pub fn amplitude_cv_pct(&self) -> Option<f64> {
        Self::cv_pct(self.amplitude_stdev, self.amplitude_mean)
    }

    pub fn positive_amplitude_cv_pct(&self) -> Option<f64> {
        if !self.has_positives() {
            return None;
        }
        Self::cv_pct(self.positive_stdev, self.positive_mean)
    }

    pub fn nonpositive_amplitude_cv_pct(&self) -> Option<f64> {
        Self::cv_pct(self.nonpositive_stdev(), self.nonpositive_mean())
    }

    fn reals_mut(&mut self) -> [&mut Option<f64>; 42] {
        [
            &mut self.min_quality_gating,
            &mut self.min_quality_gating_conf,
            &mut self.min_width_gate,
            &mut self.min_width_gate_conf,
            &mut self.max_width_gate,
            &mut self.max_width_gate_conf,
            &mut self.width_gating_sigma,
            &mut self.threshold,
            &mut self.threshold_conf,
            &mut self.manual_threshold,
            &mut self.concentration,
            &mut self.conc_lower_bound,
            &mut self.conc_upper_bound,
            &mut self.expected_concentration,
            &mut self.total_events_amplitude_mean,
            &mut self.total_events_amplitude_stdev,
            &mut self.amplitude_mean,
            &mut self.amplitude_stdev,
            &mut self.positive_mean,
            &mut self.positive_stdev,
            &mut self.negative_mean,
            &mut self.negative_stdev,
            &mut self.s_value,
            &mut self.rain_p_plus,
            &mut self.rain_p,
            &mut self.rain_p_minus,
            &mut self.positive_skew,
            &mut self.positive_kurtosis,
            &mut self.nonpositive_skew,
            &mut self.nonpositive_kurtosis,
            &mut self.concentration_rise_ratio,
            &mut self.baseline_mean,
            &mut self.baseline_stdev,
            &mut self.polydispersity,
            &mut self.revb_polydispersity,
            &mut self.extracluster,
            &mut self.revb_extracluster,
            &mut self.cluster_conf,
            &mut self.s2d_value,
            &mut self.single_rain_pct,
            &mut self.double_rain_pct,
            &mut self.width_mean_hi,
        ]
    }

    /// Replace infinities with a large finite value and NaN with zero.
    pub fn sanitize(&mut self) {
        for value in self.reals_mut() {
            sanitize_real(value);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellMetric {
    pub well_name: WellName,
    #[serde(default)]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub experiment_name: Option<String>,

    #[serde(default)]
    pub accepted_event_count: usize,
    #[serde(default)]
    pub total_event_count: usize,
    #[serde(default)]
    pub width_mean: Option<f64>,
    /// Standard deviation of all droplet widths.
    #[serde(default)]
    pub width_variance: Option<f64>,
    #[serde(default)]
    pub accepted_width_mean: Option<f64>,
    #[serde(default)]
    pub accepted_width_stdev: Option<f64>,

    #[serde(default)]
    pub cnv: Option<f64>,
    #[serde(default)]
    pub cnv_lower_bound: Option<f64>,
    #[serde(default)]
    pub cnv_upper_bound: Option<f64>,
    #[serde(default)]
    pub inverse_cnv: Option<f64>,
    #[serde(default)]
    pub inverse_cnv_lower_bound: Option<f64>,
    #[serde(default)]
    pub inverse_cnv_upper_bound: Option<f64>,
    #[serde(default)]
    pub expected_cnv: Option<f64>,
    #[serde(default)]
    pub cnv_rise_ratio: Option<f64>,
    #[serde(default)]
    pub cnv_calc_mode: u8,

    #[serde(default)]
    pub rejected_peaks: Option<usize>,
    #[serde(default)]
    pub vertical_streak_events: Option<usize>,
    #[serde(default)]
    pub min_amplitude_peaks: Option<usize>,
    #[serde(default)]
    pub null_linkage: Option<f64>,
    #[serde(default)]
    pub balance_score: Option<f64>,
    #[serde(default)]
    pub fragmentation_probability: Option<f64>,
    #[serde(default)]
    pub sum_baseline_mean: Option<f64>,
    #[serde(default)]
    pub sum_baseline_stdev: Option<f64>,
    #[serde(default)]
    pub carryover_peaks: Option<usize>,
    #[serde(default)]
    pub short_interval_count: Option<usize>,
    #[serde(default)]
    pub short_interval_threshold: Option<f64>,
    #[serde(default)]
    pub air_droplets: Option<usize>,
    #[serde(default)]
    pub air_droplets_threshold: Option<f64>,
    #[serde(default)]
    pub diagonal_scatter: Option<usize>,
    /// Already scaled to a percentage.
    #[serde(default)]
    pub diagonal_scatter_pct: Option<f64>,
    #[serde(default)]
    pub delta_widths: Option<f64>,

    pub channels: [WellChannelMetric; 2],
}

impl WellMetric {
    pub fn new(well_name: WellName) -> Self {
        Self {
            well_name,
            sample_name: None,
            experiment_name: None,
            accepted_event_count: 0,
            total_event_count: 0,
            width_mean: None,
            width_variance: None,
            accepted_width_mean: None,
            accepted_width_stdev: None,
            cnv: None,
            cnv_lower_bound: None,
            cnv_upper_bound: None,
            inverse_cnv: None,
            inverse_cnv_lower_bound: None,
            inverse_cnv_upper_bound: None,
            expected_cnv: None,
            cnv_rise_ratio: None,
            cnv_calc_mode: CONC_CALC_MODE_THRESHOLD,
            rejected_peaks: None,
            vertical_streak_events: None,
            min_amplitude_peaks: None,
            null_linkage: None,
            balance_score: None,
            fragmentation_probability: None,
            sum_baseline_mean: None,
            sum_baseline_stdev: None,
            carryover_peaks: None,
            short_interval_count: None,
            short_interval_threshold: None,
            air_droplets: None,
            air_droplets_threshold: None,
            diagonal_scatter: None,
            diagonal_scatter_pct: None,
            delta_widths: None,
            channels: [WellChannelMetric::new(0), WellChannelMetric::new(1)],
        }
    }

    pub fn sample(&self) -> &str {
        self.sample_name.as_deref().unwrap_or("")
    }

    pub fn channel(&self, channel: Channel) -> Result<&WellChannelMetric, MetricsError> {
        self.channels.get(channel).ok_or(MetricsError::MissingChannelMetric {
            well: self.well_name.to_string(),
            channel,
        })
    }

    pub fn channel_mut(&mut self, channel: Channel) -> Result<&mut WellChannelMetric, MetricsError> {
        let well = self.well_name.to_string();
        self.channels
            .get_mut(channel)
            .ok_or(MetricsError::MissingChannelMetric { well, channel })
    }

    pub fn gated_out_event_count(&self) -> usize {
        self.total_event_count.saturating_sub(self.accepted_event_count)
    }

    pub fn gated_out_event_pct(&self) -> f64 {
        if self.total_event_count == 0 {
            return 0.0;
        }
        self.gated_out_event_count() as f64 * 100.0 / self.total_event_count as f64
    }

    /// Events above the trigger minimum amplitude.
    pub fn triggered_event_count(&self) -> usize {
        match self.min_amplitude_peaks {
            Some(min) if min > 0 => self.total_event_count.saturating_sub(min),
            _ => self.total_event_count,
        }
    }

    pub fn total_peak_count(&self) -> usize {
        self.total_event_count + self.rejected_peaks.unwrap_or(0)
    }

    pub fn fragmentation_probability_pct(&self) -> Option<f64> {
        percent(self.fragmentation_probability)
    }

    /// Rejected peaks as a percentage of everything above baseline.
    ///
    /// The denominator counts rejected peaks twice, matching the
    /// historical definition of this metric.
    pub fn rejected_peak_ratio(&self) -> f64 {
        let total = self.total_peak_count();
        if total == 0 {
            return 0.0;
        }
        let rejected = self.rejected_peaks.unwrap_or(0) as f64;
        rejected * 100.0 / (total as f64 + rejected)
    }

    pub fn vertical_streak_ratio(&self) -> Option<f64> {
        let streaks = self.vertical_streak_events?;
        let triggered = self.triggered_event_count();
        if triggered == 0 {
            return Some(0.0);
        }
        Some(streaks as f64 * 100.0 / triggered as f64)
    }

    pub fn width_cv(&self) -> f64 {
        match (self.width_mean, self.width_variance) {
            (Some(mean), Some(sd)) if mean != 0.0 => sd * 100.0 / mean,
            _ => 0.0,
        }
    }

    pub fn accepted_width_cv(&self) -> f64 {
        match (self.accepted_width_mean, self.accepted_width_stdev) {
            (Some(mean), Some(sd)) if mean != 0.0 => sd * 100.0 / mean,
            _ => 0.0,
        }
    }

    pub fn min_amplitude_ratio(&self) -> Option<f64> {
        let below = self.min_amplitude_peaks?;
        let total = self.total_peak_count();
        if total == 0 {
            return Some(0.0);
        }
        Some(below as f64 * 100.0 / total as f64)
    }

    /// Narrow droplet spacings as a percentage of consecutive droplet pairs.
    pub fn short_interval_count_ratio(&self) -> Option<f64> {
        let count = self.short_interval_count?;
        let triggered = self.triggered_event_count();
        if triggered <= 2 {
            return Some(0.0);
        }
        Some(count as f64 * 100.0 / (triggered - 2) as f64)
    }

    /// Cluster confidence is reported per channel but equal for both.
    pub fn cluster_conf(&self) -> Option<f64> {
        self.channels[0].cluster_conf
    }

    /// Difference of the FAM and VIC high-cluster width means of a
    /// single-well calibration.
    pub fn delta_widths(&self) -> Option<f64> {
        self.delta_widths
            .or_else(|| Some(self.channels[0].width_mean_hi? - self.channels[1].width_mean_hi?))
    }

    /// Distance of the width mean above a channel's min width gate, in
    /// width standard deviations.
    pub fn min_width_gate_stdevs(&self, channel: Channel) -> Option<f64> {
        let sd = self.width_variance.filter(|v| *v != 0.0)?;
        let gate = self.channels.get(channel)?.min_width_gate?;
        Some((self.width_mean? - gate) / sd)
    }

    pub fn max_width_gate_stdevs(&self, channel: Channel) -> Option<f64> {
        let sd = self.width_variance.filter(|v| *v != 0.0)?;
        let gate = self.channels.get(channel)?.max_width_gate?;
        Some((gate - self.width_mean?) / sd)
    }

    fn reals_mut(&mut self) -> [&mut Option<f64>; 14] {
        [
            &mut self.width_mean,
            &mut self.width_variance,
            &mut self.accepted_width_mean,
            &mut self.accepted_width_stdev,
            &mut self.expected_cnv,
            &mut self.null_linkage,
            &mut self.balance_score,
            &mut self.fragmentation_probability,
            &mut self.sum_baseline_mean,
            &mut self.sum_baseline_stdev,
            &mut self.short_interval_threshold,
            &mut self.air_droplets_threshold,
            &mut self.diagonal_scatter_pct,
            &mut self.delta_widths,
        ]
    }

    fn cnv_mut(&mut self) -> [&mut Option<f64>; 7] {
        [
            &mut self.cnv,
            &mut self.cnv_lower_bound,
            &mut self.cnv_upper_bound,
            &mut self.inverse_cnv,
            &mut self.inverse_cnv_lower_bound,
            &mut self.inverse_cnv_upper_bound,
            &mut self.cnv_rise_ratio,
        ]
    }

    /// Clear undefined CNV estimates.
    pub fn clear_undefined_cnv(&mut self) {
        for value in self.cnv_mut() {
            nan_to_none(value);
        }
    }

    /// Replace infinities with a large finite value and NaN with zero,
    /// except for copy numbers, where NaN means missing.
    pub fn sanitize(&mut self) {
        self.clear_undefined_cnv();
        for value in self.cnv_mut() {
            sanitize_real(value);
        }
        for value in self.reals_mut() {
            sanitize_real(value);
        }
    }
}

/// All metrics of one plate under one processing configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateMetric {
    pub plate_id: String,
    /// `None` for the plate as originally processed.
    #[serde(default)]
    pub reprocess_config_id: Option<u32>,

    #[serde(default)]
    pub carryover_peaks: Option<usize>,
    #[serde(default)]
    pub gated_contamination_peaks: Option<usize>,
    #[serde(default)]
    pub contamination_peaks: Option<usize>,
    #[serde(default)]
    pub stealth_wells: Option<usize>,
    #[serde(default)]
    pub software_pmt_gain_fam: Option<f64>,
    #[serde(default)]
    pub software_pmt_gain_vic: Option<f64>,

    #[serde(default)]
    pub fam_normal_offset: Option<f64>,
    #[serde(default)]
    pub vic_normal_offset: Option<f64>,
    #[serde(default)]
    pub famvic_normal_offset: Option<f64>,
    #[serde(default)]
    pub famvic_origin_offset: Option<f64>,
    #[serde(default)]
    pub hi_cluster_rain: Option<f64>,
    #[serde(default)]
    pub lo_cluster_rain: Option<f64>,

    /// Sorted by well name.
    #[serde(default)]
    pub well_metrics: Vec<WellMetric>,
}

impl PlateMetric {
    pub fn new(plate_id: &str, reprocess_config_id: Option<u32>) -> Self {
        Self {
            plate_id: plate_id.to_string(),
            reprocess_config_id,
            carryover_peaks: None,
            gated_contamination_peaks: None,
            contamination_peaks: None,
            stealth_wells: None,
            software_pmt_gain_fam: None,
            software_pmt_gain_vic: None,
            fam_normal_offset: None,
            vic_normal_offset: None,
            famvic_normal_offset: None,
            famvic_origin_offset: None,
            hi_cluster_rain: None,
            lo_cluster_rain: None,
            well_metrics: Vec::new(),
        }
    }

    pub fn from_reprocessed(&self) -> bool {
        self.reprocess_config_id.is_some()
    }

    fn position(&self, name: &WellName) -> Option<usize> {
        self.well_metrics
            .binary_search_by(|wm| wm.well_name.cmp(name))
            .ok()
    }

    pub fn well(&self, name: &WellName) -> Option<&WellMetric> {
        self.position(name).map(|idx| &self.well_metrics[idx])
    }

    pub fn well_mut(&mut self, name: &WellName) -> Option<&mut WellMetric> {
        self.position(name).map(move |idx| &mut self.well_metrics[idx])
    }

    /// The well's metric record; its absence means the record graph is
    /// corrupt.
    pub fn require_well_mut(&mut self, name: &WellName) -> Result<&mut WellMetric, MetricsError> {
        let plate = self.plate_id.clone();
        self.well_mut(name).ok_or(MetricsError::MissingWellMetric {
            plate,
            well: name.to_string(),
        })
    }

    /// Insert a well record, keeping wells sorted by name.
    pub fn insert_well(&mut self, metric: WellMetric) {
        match self.well_metrics.binary_search_by(|wm| wm.well_name.cmp(&metric.well_name)) {
            Ok(idx) => self.well_metrics[idx] = metric,
            Err(idx) => self.well_metrics.insert(idx, metric),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn name(s: &str) -> WellName {
        s.parse().unwrap()
    }

    #[test]
    fn test_percent_accessors_track_raw_values() {
        let mut wcm = WellChannelMetric::new(0);
        assert_eq!(wcm.rain_p_plus_pct(), None);
        assert_eq!(wcm.polydispersity_pct(), None);

        wcm.rain_p_plus = Some(0.25);
        wcm.polydispersity = Some(0.0);
        wcm.revb_extracluster = Some(0.015);
        assert_eq!(wcm.rain_p_plus_pct(), Some(25.0));
        assert_eq!(wcm.polydispersity_pct(), Some(0.0));
        assert!((wcm.revb_extracluster_pct().unwrap() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_sanitize_channel() {
        let mut wcm = WellChannelMetric::new(1);
        wcm.s_value = Some(f64::INFINITY);
        wcm.positive_skew = Some(f64::NAN);
        wcm.negative_mean = Some(f64::NEG_INFINITY);
        wcm.amplitude_mean = Some(12.5);
        wcm.sanitize();
        assert_eq!(wcm.s_value, Some(1_000_000.0));
        assert_eq!(wcm.positive_skew, Some(0.0));
        assert_eq!(wcm.negative_mean, Some(-1_000_000.0));
        assert_eq!(wcm.amplitude_mean, Some(12.5));
        assert_eq!(wcm.rain_p, None);
    }

    #[test]
    fn test_cnv_nan_reads_as_missing() {
        let mut wm = WellMetric::new(name("A01"));
        wm.cnv = Some(f64::NAN);
        wm.cnv_upper_bound = Some(f64::INFINITY);
        wm.balance_score = Some(f64::NAN);
        wm.clear_undefined_cnv();
        wm.sanitize();
        assert_eq!(wm.cnv, None);
        assert_eq!(wm.cnv_upper_bound, Some(1_000_000.0));
        assert_eq!(wm.balance_score, Some(0.0));
    }

    #[test]
    fn test_well_ratios_guard_zero() {
        let mut wm = WellMetric::new(name("B02"));
        assert_eq!(wm.gated_out_event_pct(), 0.0);
        assert_eq!(wm.rejected_peak_ratio(), 0.0);
        assert_eq!(wm.vertical_streak_ratio(), None);
        assert_eq!(wm.width_cv(), 0.0);

        wm.total_event_count = 200;
        wm.accepted_event_count = 150;
        wm.min_amplitude_peaks = Some(100);
        wm.vertical_streak_events = Some(10);
        wm.short_interval_count = Some(49);
        assert_eq!(wm.gated_out_event_pct(), 25.0);
        assert_eq!(wm.triggered_event_count(), 100);
        assert_eq!(wm.vertical_streak_ratio(), Some(10.0));
        assert_eq!(wm.short_interval_count_ratio(), Some(50.0));
    }

    #[test]
    fn test_delta_widths_falls_back_to_channels() {
        let mut wm = WellMetric::new(name("C03"));
        assert_eq!(wm.delta_widths(), None);
        wm.channels[0].width_mean_hi = Some(9.5);
        wm.channels[1].width_mean_hi = Some(9.0);
        assert_eq!(wm.delta_widths(), Some(0.5));
    }

    #[test]
    fn test_plate_metric_well_lookup_is_sorted() {
        let mut pm = PlateMetric::new("p1", None);
        pm.insert_well(WellMetric::new(name("B01")));
        pm.insert_well(WellMetric::new(name("A12")));
        pm.insert_well(WellMetric::new(name("A02")));
        let names: Vec<String> = pm.well_metrics.iter().map(|w| w.well_name.to_string()).collect();
        assert_eq!(names, vec!["A02", "A12", "B01"]);
        assert!(pm.well(&name("A12")).is_some());
        assert!(pm.require_well_mut(&name("H12")).is_err());
        assert!(!pm.from_reprocessed());
    }
}
