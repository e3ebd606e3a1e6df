//! Rain, polydispersity, extracluster and gap classification.
//!
//! Cluster bands are drawn at a fixed fraction around each cluster's mean
//! amplitude. Droplets outside every band are "rain".

use crate::plate::{AmplitudeBin, DecodedWell, Peak};
use crate::stats::mean;
use crate::types::{Channel, FAM, VIC};

use super::{above_min_amplitude_peaks, accepted_peaks, amplitudes};

/// Default band half-width as a fraction of the cluster mean.
pub const RAIN_PCT_BOUNDARY: f64 = 0.3;

/// Minimum spacing, in samples, between non-rain droplets that counts as a gap.
pub const GAP_SIZE: u64 = 10000;

/// Margin trimmed from each side of a gap when looking for air.
pub const GAP_BUFFER: u64 = 250;

/// Air droplets are dim; anything brighter is not air.
pub const AIR_MAX_AMPLITUDE: f64 = 1000.0;

const MAX_SUM_AMPLITUDE: f64 = 32768.0;

/// Which threshold separates the two clusters when drawing rain bands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RainThreshold {
    /// The channel's called threshold; single-cluster if uncalled.
    Called,
    /// An explicit threshold; zero means single-cluster.
    Fixed(f64),
    /// Treat all droplets as one cluster.
    Single,
}

impl RainThreshold {
    fn resolve(self, well: &DecodedWell, channel: Channel) -> Option<f64> {
        match self {
            RainThreshold::Called => well.threshold(channel),
            RainThreshold::Fixed(t) if t != 0.0 => Some(t),
            RainThreshold::Fixed(_) | RainThreshold::Single => None,
        }
    }
}

/// Cluster bands and the fraction of droplets in each rain region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RainGates {
    /// Fraction of droplets above the positive band.
    pub p_plus: Option<f64>,
    /// Fraction of droplets between the two cluster bands.
    pub p: Option<f64>,
    /// Fraction of droplets below the negative band.
    pub p_minus: Option<f64>,
    /// Upper edge of the positive (or only) cluster band.
    pub pos: f64,
    /// `(upper edge of negative band, lower edge of positive band)`,
    /// present only when both clusters are populated.
    pub middle: Option<(f64, f64)>,
    /// Lower edge of the negative (or only) cluster band.
    pub neg: f64,
}

impl RainGates {
    pub fn in_middle(&self, amplitude: f64) -> bool {
        match self.middle {
            Some((low, high)) => amplitude > low && amplitude < high,
            None => false,
        }
    }

    pub fn is_rain(&self, amplitude: f64) -> bool {
        amplitude > self.pos || self.in_middle(amplitude) || amplitude < self.neg
    }

    /// Inside either cluster band.
    pub fn in_cluster(&self, amplitude: f64) -> bool {
        match self.middle {
            Some((low, high)) => {
                (amplitude > high && amplitude < self.pos) || (amplitude > self.neg && amplitude < low)
            }
            None => amplitude > self.neg && amplitude < self.pos,
        }
    }
}

/// Draw cluster bands on `channel` and measure the rain fractions.
pub fn rain_gates(peaks: &[Peak], channel: Channel, threshold: Option<f64>, pct: f64) -> RainGates {
    let amps = amplitudes(peaks, channel);

    let (pos, middle, neg) = match threshold {
        Some(t) => {
            let (above, below): (Vec<f64>, Vec<f64>) = amps.iter().partition(|a| **a > t);
            let pos_mean = mean(&above);
            let neg_mean = mean(&below);
            let middle = match (neg_mean, pos_mean) {
                (Some(n), Some(p)) => Some((n * (1.0 + pct), p * (1.0 - pct))),
                _ => None,
            };
            (
                pos_mean.map_or(f64::INFINITY, |m| m * (1.0 + pct)),
                middle,
                neg_mean.map_or(f64::NEG_INFINITY, |m| m * (1.0 - pct)),
            )
        }
        None => match mean(&amps) {
            Some(m) => (m * (1.0 + pct), None, m * (1.0 - pct)),
            None => (f64::INFINITY, None, f64::NEG_INFINITY),
        },
    };

    let mut gates = RainGates {
        p_plus: None,
        p: None,
        p_minus: None,
        pos,
        middle,
        neg,
    };

    if !amps.is_empty() {
        let total = amps.len() as f64;
        let above = amps.iter().filter(|a| **a > pos).count();
        let between = amps.iter().filter(|a| gates.in_middle(**a)).count();
        let below = amps.iter().filter(|a| **a < neg).count();
        gates.p_plus = Some(above as f64 / total);
        gates.p = Some(between as f64 / total);
        gates.p_minus = Some(below as f64 / total);
    }

    gates
}

/// Split droplets into `(rain, non-rain)` on `channel`.
///
/// Bands are always drawn from accepted droplets; `split_all` chooses
/// whether every droplet or only accepted ones are classified.
pub fn rain_split(
    well: &DecodedWell,
    channel: Channel,
    threshold: RainThreshold,
    pct: f64,
    split_all: bool,
) -> (Vec<Peak>, Vec<Peak>) {
    let accepted = accepted_peaks(well);
    let gates = rain_gates(&accepted, channel, threshold.resolve(well, channel), pct);
    let peaks = if split_all { well.peaks.clone() } else { accepted };
    peaks
        .into_iter()
        .partition(|p| gates.is_rain(p.amplitude(channel)))
}

fn sorted_times(peaks: &[Peak]) -> Vec<u64> {
    let mut times: Vec<u64> = peaks.iter().map(|p| p.time).collect();
    times.sort_unstable();
    times
}

/// `(start, end)` pairs of every stretch longer than `gap_size` between
/// consecutive times, plus the lead-in and the tail.
fn gaps(times: &[u64], gap_size: u64, buffer: u64) -> Vec<(u64, u64)> {
    let mut gaps = Vec::new();
    let (Some(first), Some(last)) = (times.first(), times.last()) else {
        return gaps;
    };
    for pair in times.windows(2) {
        if pair[1] - pair[0] > gap_size {
            gaps.push((pair[0] + buffer, pair[1].saturating_sub(buffer)));
        }
    }
    gaps.push((0, first.saturating_sub(buffer)));
    gaps.push((last + buffer, last.saturating_mul(100)));
    gaps
}

fn in_any_gap(time: u64, gaps: &[(u64, u64)]) -> bool {
    gaps.iter().any(|(b, e)| *b < time && time < *e)
}

/// Rain droplets that fall inside gaps of the non-rain droplet stream.
pub fn gap_rain(well: &DecodedWell, channel: Channel, threshold: RainThreshold) -> Vec<Peak> {
    let (rain, nonrain) = rain_split(well, channel, threshold, RAIN_PCT_BOUNDARY, false);
    let times = sorted_times(&nonrain);
    if times.len() < 2 {
        return Vec::new();
    }
    let gaps = gaps(&times, GAP_SIZE, 0);
    rain.into_iter().filter(|p| in_any_gap(p.time, &gaps)).collect()
}

/// Dim droplets, gated or not, sitting well inside gaps of the droplet stream.
pub fn gap_air(well: &DecodedWell, channel: Channel, threshold: RainThreshold) -> Vec<Peak> {
    let (rain, nonrain) = rain_split(well, channel, threshold, RAIN_PCT_BOUNDARY, true);
    let times = sorted_times(&nonrain);
    if times.len() < 2 {
        return Vec::new();
    }
    let gaps = gaps(&times, GAP_SIZE, GAP_BUFFER);
    rain.into_iter()
        .filter(|p| p.amplitude(channel) < AIR_MAX_AMPLITUDE && in_any_gap(p.time, &gaps))
        .collect()
}

/// Polydisperse droplets in four regions.
#[derive(Debug, Clone, Default)]
pub struct Polydisperse {
    /// Too wide, above the positive band.
    pub pos: Vec<Peak>,
    /// Too wide, between bands.
    pub midhigh: Vec<Peak>,
    /// Too narrow, between bands.
    pub midlow: Vec<Peak>,
    /// Too narrow, below the negative band.
    pub neg: Vec<Peak>,
}

impl Polydisperse {
    pub fn count(&self) -> usize {
        self.pos.len() + self.midhigh.len() + self.midlow.len() + self.neg.len()
    }

    fn extend_from(&mut self, peaks: &[Peak], channel: Channel, gates: &RainGates, min: f64, max: f64) {
        for p in peaks {
            let (a, w) = (p.amplitude(channel), p.width(channel));
            if w > max && a > gates.pos {
                self.pos.push(*p);
            }
            if w > max && gates.in_middle(a) {
                self.midhigh.push(*p);
            }
            if w < min && gates.in_middle(a) {
                self.midlow.push(*p);
            }
            if w < min && a < gates.neg {
                self.neg.push(*p);
            }
        }
    }
}

/// Split peaks into summed-amplitude bins; the last bin runs to the
/// detector ceiling.
pub fn bin_peaks_by_amplitude(peaks: &[Peak], bins: &[AmplitudeBin]) -> Vec<Vec<Peak>> {
    let bounds: Vec<(f64, f64)> = bins
        .iter()
        .enumerate()
        .map(|(i, bin)| {
            let upper = bins.get(i + 1).map_or(MAX_SUM_AMPLITUDE, |b| b.min_amplitude);
            (bin.min_amplitude, upper)
        })
        .collect();

    bounds
        .iter()
        .map(|(lo, hi)| {
            peaks
                .iter()
                .filter(|p| {
                    let sum = p.amplitude(FAM) + p.amplitude(VIC);
                    sum >= *lo && sum < *hi
                })
                .copied()
                .collect()
        })
        .collect()
}

/// Polydisperse droplets judged against the well's widest width gates.
pub fn polydisperse_peaks(well: &DecodedWell, channel: Channel) -> Polydisperse {
    let peaks = above_min_amplitude_peaks(well);
    let gates = rain_gates(&peaks, channel, well.threshold(channel), RAIN_PCT_BOUNDARY);
    let (min, max) = well.static_width_gates();
    let mut result = Polydisperse::default();
    result.extend_from(&peaks, channel, &gates, min, max);
    result
}

/// Polydisperse droplets judged against per-amplitude-bin width gates.
pub fn revb_polydisperse_peaks(well: &DecodedWell, channel: Channel) -> Polydisperse {
    let peaks = above_min_amplitude_peaks(well);
    let gates = rain_gates(&peaks, channel, well.threshold(channel), RAIN_PCT_BOUNDARY);
    let mut result = Polydisperse::default();
    for (binned, bin) in bin_peaks_by_amplitude(&peaks, &well.sum_amplitude_bins)
        .iter()
        .zip(&well.sum_amplitude_bins)
    {
        result.extend_from(binned, channel, &gates, bin.min_width_gate, bin.max_width_gate);
    }
    result
}

fn outside_clusters(peaks: &[Peak], channel: Channel, gates: &RainGates, min: f64, max: f64) -> Vec<Peak> {
    peaks
        .iter()
        .filter(|p| {
            let w = p.width(channel);
            let in_width = w > min && w < max;
            !(in_width && gates.in_cluster(p.amplitude(channel)))
        })
        .copied()
        .collect()
}

/// Droplets outside every cluster band or outside the width gate.
pub fn extracluster_peaks(well: &DecodedWell, channel: Channel) -> Vec<Peak> {
    let peaks = above_min_amplitude_peaks(well);
    let gates = rain_gates(&peaks, channel, well.threshold(channel), RAIN_PCT_BOUNDARY);
    let (min, max) = well.static_width_gates();
    outside_clusters(&peaks, channel, &gates, min, max)
}

/// Extracluster droplets with per-amplitude-bin width gates.
pub fn revb_extracluster_peaks(well: &DecodedWell, channel: Channel) -> Vec<Peak> {
    let peaks = above_min_amplitude_peaks(well);
    let gates = rain_gates(&peaks, channel, well.threshold(channel), RAIN_PCT_BOUNDARY);
    bin_peaks_by_amplitude(&peaks, &well.sum_amplitude_bins)
        .iter()
        .zip(&well.sum_amplitude_bins)
        .flat_map(|(binned, bin)| {
            outside_clusters(binned, channel, &gates, bin.min_width_gate, bin.max_width_gate)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{peak, peak_w, peaks_at, well};

    #[test]
    fn test_rain_gates_two_clusters() {
        let mut peaks = peaks_at(10, 0, 10000.0, 0.0);
        peaks.extend(peaks_at(10, 2000, 1000.0, 0.0));
        peaks.push(peak(5000, 5000.0, 0.0));
        let gates = rain_gates(&peaks, FAM, Some(3000.0), RAIN_PCT_BOUNDARY);

        // The middle droplet drags the positive mean to (100000 + 5000) / 11.
        let pos_mean = 105000.0 / 11.0;
        assert!((gates.pos - pos_mean * 1.3).abs() < 1e-9);
        assert!((gates.neg - 700.0).abs() < 1e-9);
        let (low, high) = gates.middle.unwrap();
        assert!((low - 1300.0).abs() < 1e-9);
        assert!((high - pos_mean * 0.7).abs() < 1e-9);
        assert_eq!(gates.p_plus, Some(0.0));
        assert_eq!(gates.p_minus, Some(0.0));
        assert!((gates.p.unwrap() - 1.0 / 21.0).abs() < 1e-12);
    }

    #[test]
    fn test_rain_gates_single_cluster_has_no_middle() {
        let peaks = peaks_at(10, 0, 1000.0, 0.0);
        let gates = rain_gates(&peaks, FAM, None, RAIN_PCT_BOUNDARY);
        assert_eq!(gates.middle, None);
        assert!(gates.in_cluster(1000.0));
        assert!(gates.is_rain(1400.0));
        assert!(gates.is_rain(600.0));
    }

    #[test]
    fn test_rain_gates_empty() {
        let gates = rain_gates(&[], FAM, Some(3000.0), RAIN_PCT_BOUNDARY);
        assert_eq!(gates.p_plus, None);
        assert!(!gates.is_rain(5000.0));
    }

    #[test]
    fn test_gap_rain_finds_rain_in_gap() {
        let mut peaks = peaks_at(20, 0, 1000.0, 0.0);
        // a dim droplet alone in a long gap
        peaks.push(peak(30000, 100.0, 0.0));
        peaks.extend(peaks_at(20, 60000, 1000.0, 0.0));
        // a dim droplet among the stream is rain but not in a gap
        peaks.push(peak(150, 100.0, 0.0));
        let w = well(None, peaks, [None, None]);

        let rain = gap_rain(&w, FAM, RainThreshold::Single);
        assert_eq!(rain.len(), 1);
        assert_eq!(rain[0].time, 30000);

        let air = gap_air(&w, FAM, RainThreshold::Fixed(0.0));
        assert_eq!(air.len(), 1);
    }

    #[test]
    fn test_polydisperse_regions() {
        let mut peaks = peaks_at(10, 0, 10000.0, 0.0);
        peaks.extend(peaks_at(10, 2000, 1000.0, 0.0));
        // wide and very bright
        peaks.push(peak_w(5000, 20000.0, 0.0, 14.0));
        // narrow and very dim
        peaks.push(peak_w(5100, 100.0, 0.0, 4.0));
        // narrow, between bands
        peaks.push(peak_w(5200, 5000.0, 0.0, 4.0));
        let w = well(None, peaks, [Some(3000.0), None]);

        let poly = polydisperse_peaks(&w, FAM);
        assert_eq!(poly.pos.len(), 1);
        assert_eq!(poly.neg.len(), 1);
        assert_eq!(poly.midlow.len(), 1);
        assert_eq!(poly.midhigh.len(), 0);
        assert_eq!(poly.count(), 3);

        let extra = extracluster_peaks(&w, FAM);
        assert_eq!(extra.len(), 3);
    }

    #[test]
    fn test_bin_peaks_by_amplitude() {
        let bins = [
            AmplitudeBin {
                min_amplitude: 0.0,
                min_width_gate: 7.0,
                max_width_gate: 9.0,
            },
            AmplitudeBin {
                min_amplitude: 5000.0,
                min_width_gate: 8.0,
                max_width_gate: 11.0,
            },
        ];
        let peaks = vec![peak(0, 1000.0, 1000.0), peak(1, 4000.0, 2000.0), peak(2, 40000.0, 0.0)];
        let binned = bin_peaks_by_amplitude(&peaks, &bins);
        assert_eq!(binned[0].len(), 1);
        assert_eq!(binned[1].len(), 1);
    }
}
