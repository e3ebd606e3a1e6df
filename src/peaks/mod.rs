//! Droplet classification primitives.
//!
//! Pure functions that partition a well's droplets by gate flags,
//! thresholds, width gates and amplitude bands. Nothing here mutates a
//! metric record; the calculators turn these partitions into metrics.

pub mod frag;
pub mod rain;
pub mod well;

use crate::plate::{DecodedWell, Peak};
use crate::types::{Channel, FAM, VIC};

pub use rain::{rain_gates, RainGates, RAIN_PCT_BOUNDARY};

/// Peaks not rejected by any gate.
pub fn accepted_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks.iter().filter(|p| p.is_accepted()).copied().collect()
}

/// Peaks above the trigger minimum amplitude, gated or not.
pub fn above_min_amplitude_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks
        .iter()
        .filter(|p| !p.gated.min_amplitude)
        .copied()
        .collect()
}

pub fn min_amplitude_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks
        .iter()
        .filter(|p| p.gated.min_amplitude)
        .copied()
        .collect()
}

/// Above-minimum peaks rejected by the width gate.
pub fn width_gated_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks
        .iter()
        .filter(|p| !p.gated.min_amplitude && p.gated.width)
        .copied()
        .collect()
}

/// Above-minimum peaks rejected by the quality gate.
pub fn quality_gated_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks
        .iter()
        .filter(|p| !p.gated.min_amplitude && p.gated.quality)
        .copied()
        .collect()
}

pub fn vertical_streak_peaks(well: &DecodedWell) -> Vec<Peak> {
    well.peaks
        .iter()
        .filter(|p| p.gated.vertical_streak)
        .copied()
        .collect()
}

pub fn amplitudes(peaks: &[Peak], channel: Channel) -> Vec<f64> {
    peaks.iter().map(|p| p.amplitude(channel)).collect()
}

pub fn widths(peaks: &[Peak], channel: Channel) -> Vec<f64> {
    peaks.iter().map(|p| p.width(channel)).collect()
}

/// Split peaks at a threshold: `(amplitude > threshold, the rest)`.
pub fn cluster_1d(peaks: &[Peak], channel: Channel, threshold: f64) -> (Vec<Peak>, Vec<Peak>) {
    peaks
        .iter()
        .copied()
        .partition(|p| p.amplitude(channel) > threshold)
}

/// The four quadrants of a two-threshold split. The first letter is FAM,
/// the second VIC: `pn` is FAM-positive, VIC-negative.
#[derive(Debug, Clone, Default)]
pub struct Quadrants {
    pub pp: Vec<Peak>,
    pub pn: Vec<Peak>,
    pub np: Vec<Peak>,
    pub nn: Vec<Peak>,
}

impl Quadrants {
    pub fn total(&self) -> usize {
        self.pp.len() + self.pn.len() + self.np.len() + self.nn.len()
    }
}

pub fn cluster_2d(peaks: &[Peak], fam_threshold: f64, vic_threshold: f64) -> Quadrants {
    let mut quadrants = Quadrants::default();
    for peak in peaks {
        let fam_pos = peak.amplitude(FAM) > fam_threshold;
        let vic_pos = peak.amplitude(VIC) > vic_threshold;
        match (fam_pos, vic_pos) {
            (true, true) => quadrants.pp.push(*peak),
            (true, false) => quadrants.pn.push(*peak),
            (false, true) => quadrants.np.push(*peak),
            (false, false) => quadrants.nn.push(*peak),
        }
    }
    quadrants
}

/// Peaks whose width on `channel` lies within `[min_gate, max_gate]`,
/// ignoring the instrument's own gating flags.
pub fn width_gated(peaks: &[Peak], min_gate: f64, max_gate: f64, channel: Channel) -> Vec<Peak> {
    peaks
        .iter()
        .filter(|p| {
            let w = p.width(channel);
            w >= min_gate && w <= max_gate
        })
        .copied()
        .collect()
}

/// Peaks whose amplitude on `channel` lies within `[lower, upper]`.
pub fn filter_amplitude_range(peaks: &[Peak], channel: Channel, lower: f64, upper: f64) -> Vec<Peak> {
    peaks
        .iter()
        .filter(|p| {
            let a = p.amplitude(channel);
            a >= lower && a <= upper
        })
        .copied()
        .collect()
}
