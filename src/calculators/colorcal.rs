//! Single-well color calibration.
//!
//! A calibration well holds a high and a low concentration of each of two
//! dyes. Droplets are split into four clusters by their angle and distance
//! from the origin in the (VIC, FAM) plane.

use std::f64::consts::FRAC_PI_4;

use crate::model::{WellChannelMetric, WellMetric};
use crate::peaks::accepted_peaks;
use crate::plate::{DecodedChannel, DecodedWell, Peak};
use crate::stats::{mean, pstdev};
use crate::types::{Channel, Dyeset, FAM, VIC};

use super::{WellChannelMetricCalculator, WellMetricCalculator};

/// Loading of one dye in a calibration well.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DyeCalibration {
    pub lo_conc: f64,
    pub hi_conc: f64,
    pub expected_hi_amplitude: f64,
    pub scaled_hi_amplitude: f64,
}

impl DyeCalibration {
    pub fn expected_lo_amplitude(&self) -> f64 {
        self.lo_conc / self.hi_conc * self.expected_hi_amplitude
    }

    /// Geometric mean of the expected low and high amplitudes.
    pub fn magnitude_threshold(&self) -> f64 {
        (self.expected_lo_amplitude() * self.expected_hi_amplitude).sqrt()
    }
}

pub const DYE_FAM: DyeCalibration = DyeCalibration {
    lo_conc: 40.0,
    hi_conc: 350.0,
    expected_hi_amplitude: 20000.0,
    scaled_hi_amplitude: 20000.0,
};

pub const DYE_VIC: DyeCalibration = DyeCalibration {
    lo_conc: 70.0,
    hi_conc: 350.0,
    expected_hi_amplitude: 10000.0,
    scaled_hi_amplitude: 10000.0,
};

pub const DYE_HEX: DyeCalibration = DyeCalibration {
    lo_conc: 70.0,
    hi_conc: 350.0,
    expected_hi_amplitude: 8100.0,
    scaled_hi_amplitude: 10000.0,
};

/// Dye pair loaded into a calibration well of the given dyeset.
pub fn dyes_for(dyeset: Dyeset) -> [DyeCalibration; 2] {
    match dyeset {
        Dyeset::FamVic => [DYE_FAM, DYE_VIC],
        Dyeset::FamHex => [DYE_FAM, DYE_HEX],
    }
}

/// The four clusters of a calibration well.
#[derive(Debug, Default)]
pub struct CalibrationClusters {
    pub blue_hi: Vec<Peak>,
    pub blue_lo: Vec<Peak>,
    pub green_hi: Vec<Peak>,
    pub green_lo: Vec<Peak>,
}

impl CalibrationClusters {
    /// Split the accepted droplets of a well. Droplets at or above 45
    /// degrees belong to the FAM dye, the rest to the second dye.
    pub fn of(well: &DecodedWell, dyes: &[DyeCalibration; 2]) -> Self {
        let mut clusters = CalibrationClusters::default();
        for peak in accepted_peaks(well) {
            let fam = peak.amplitude(FAM);
            let vic = peak.amplitude(VIC);
            let magnitude = vic.hypot(fam);
            if fam.atan2(vic) >= FRAC_PI_4 {
                if magnitude >= dyes[0].magnitude_threshold() {
                    clusters.blue_hi.push(peak);
                } else {
                    clusters.blue_lo.push(peak);
                }
            } else if magnitude >= dyes[1].magnitude_threshold() {
                clusters.green_hi.push(peak);
            } else {
                clusters.green_lo.push(peak);
            }
        }
        clusters
    }
}

fn values(peaks: &[Peak], f: impl Fn(&Peak) -> f64) -> Vec<f64> {
    peaks.iter().map(f).collect()
}

fn fill_cluster_stats(metric: &mut WellChannelMetric, channel: Channel, hi: &[Peak], lo: &[Peak]) {
    let hi_amplitudes = values(hi, |p| p.amplitude(channel));
    let lo_amplitudes = values(lo, |p| p.amplitude(channel));
    metric.positive_peaks = Some(hi.len());
    metric.positive_mean = mean(&hi_amplitudes);
    metric.positive_stdev = pstdev(&hi_amplitudes);
    metric.negative_peaks = Some(lo.len());
    metric.negative_mean = mean(&lo_amplitudes);
    metric.negative_stdev = pstdev(&lo_amplitudes);
    // Width is always read from the FAM detector.
    metric.width_mean_hi = mean(&values(hi, |p| p.width(FAM)));
}

/// Replaces the threshold-based cluster stats of a calibration well with
/// the high/low dye clusters of that channel. Wells whose sample is not a
/// known dyeset are left untouched.
pub struct SingleWellChannelColorComp;

impl WellChannelMetricCalculator for SingleWellChannelColorComp {
    fn compute(&self, well: &DecodedWell, channel: &DecodedChannel, metric: &mut WellChannelMetric) {
        let Ok(dyeset) = well.sample().parse::<Dyeset>() else {
            return;
        };
        let clusters = CalibrationClusters::of(well, &dyes_for(dyeset));
        match channel.channel_num {
            FAM => fill_cluster_stats(metric, FAM, &clusters.blue_hi, &clusters.blue_lo),
            VIC => fill_cluster_stats(metric, VIC, &clusters.green_hi, &clusters.green_lo),
            _ => {}
        }
    }
}

/// Records the width difference between the two high clusters.
pub struct SingleWellColorComp;

impl WellMetricCalculator for SingleWellColorComp {
    fn compute(&self, _well: &DecodedWell, metric: &mut WellMetric) {
        if let (Some(fam), Some(vic)) = (metric.channels[0].width_mean_hi, metric.channels[1].width_mean_hi) {
            metric.delta_widths = Some(fam - vic);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{peak_w, well};

    fn calibration_well(sample: &str) -> DecodedWell {
        let peaks = vec![
            // FAM high and low
            peak_w(0, 19000.0, 1000.0, 11.0),
            peak_w(100, 21000.0, 1000.0, 13.0),
            peak_w(200, 2500.0, 500.0, 9.0),
            // VIC high and low
            peak_w(300, 1000.0, 9500.0, 8.0),
            peak_w(400, 800.0, 1800.0, 9.0),
            peak_w(500, 900.0, 2200.0, 9.0),
        ];
        well(Some(sample), peaks, [None, None])
    }

    #[test]
    fn test_dye_thresholds() {
        assert!((DYE_FAM.expected_lo_amplitude() - 2285.714).abs() < 1e-3);
        assert!((DYE_FAM.magnitude_threshold() - 6761.234).abs() < 1e-3);
        assert!((DYE_VIC.magnitude_threshold() - 4472.136).abs() < 1e-3);
        assert!((DYE_HEX.magnitude_threshold() - 3622.430).abs() < 1e-3);
    }

    #[test]
    fn test_clusters_split_by_angle_and_magnitude() {
        let well = calibration_well("FAM/VIC");
        let clusters = CalibrationClusters::of(&well, &dyes_for(Dyeset::FamVic));
        assert_eq!(clusters.blue_hi.len(), 2);
        assert_eq!(clusters.blue_lo.len(), 1);
        assert_eq!(clusters.green_hi.len(), 1);
        assert_eq!(clusters.green_lo.len(), 2);
    }

    #[test]
    fn test_channel_colorcomp_fills_cluster_stats() {
        let well = calibration_well("FAM/VIC");
        let mut fam = WellChannelMetric::new(FAM);
        SingleWellChannelColorComp.compute(&well, &well.channels[0], &mut fam);
        assert_eq!(fam.positive_peaks, Some(2));
        assert_eq!(fam.positive_mean, Some(20000.0));
        assert_eq!(fam.positive_stdev, Some(1000.0));
        assert_eq!(fam.negative_peaks, Some(1));
        assert_eq!(fam.negative_mean, Some(2500.0));
        assert_eq!(fam.width_mean_hi, Some(12.0));

        let mut vic = WellChannelMetric::new(VIC);
        SingleWellChannelColorComp.compute(&well, &well.channels[1], &mut vic);
        assert_eq!(vic.positive_peaks, Some(1));
        assert_eq!(vic.positive_mean, Some(9500.0));
        assert_eq!(vic.negative_peaks, Some(2));
        assert_eq!(vic.negative_mean, Some(2000.0));
        assert_eq!(vic.width_mean_hi, Some(8.0));
    }

    #[test]
    fn test_unknown_dyeset_is_untouched() {
        let well = calibration_well("EVAGREEN");
        let mut metric = WellChannelMetric::new(FAM);
        metric.positive_peaks = Some(7);
        SingleWellChannelColorComp.compute(&well, &well.channels[0], &mut metric);
        assert_eq!(metric.positive_peaks, Some(7));
        assert_eq!(metric.width_mean_hi, None);
    }

    #[test]
    fn test_delta_widths() {
        let well = calibration_well("FAM/HEX");
        let mut metric = WellMetric::new("A01".parse().unwrap());
        SingleWellColorComp.compute(&well, &mut metric);
        assert_eq!(metric.delta_widths, None);

        metric.channels[0].width_mean_hi = Some(12.0);
        metric.channels[1].width_mean_hi = Some(8.5);
        SingleWellColorComp.compute(&well, &mut metric);
        assert_eq!(metric.delta_widths, Some(3.5));
    }
}
