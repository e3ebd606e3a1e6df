//! Well-level droplet numerics: concentration, separation, CNV, 2D
//! cluster shape and droplet spacing.

use crate::plate::{DecodedWell, Peak};
use crate::stats::{mean, pstdev};
use crate::types::{Channel, FAM, VIC};

use super::frag::{prob_of_frag, ratio_conf_interval};
use super::{above_min_amplitude_peaks, accepted_peaks, amplitudes, cluster_1d, cluster_2d, Quadrants};

/// Inter-droplet spacing, in mean droplet widths, below which two
/// droplets count as too close.
pub const NARROW_NORMALIZED_DROPLET_SPACING: f64 = 1.25;

/// Accepted peaks required before the quartile ratio is attempted.
pub const QUARTILE_MIN_EVENTS: usize = 4000;

/// Copies per microlitre from positive and negative droplet counts.
///
/// `None` when there are no droplets or no negatives to anchor the
/// Poisson correction.
pub fn concentration(positives: usize, negatives: usize, droplet_volume: f64) -> Option<f64> {
    let total = positives + negatives;
    if total == 0 || negatives == 0 || droplet_volume <= 0.0 {
        return None;
    }
    Some(-(negatives as f64 / total as f64).ln() / droplet_volume)
}

/// Accepted droplets split at the channel's called threshold.
pub fn observed_positives_negatives(well: &DecodedWell, channel: Channel) -> Option<(Vec<Peak>, Vec<Peak>)> {
    let threshold = well.threshold(channel)?;
    Some(cluster_1d(&accepted_peaks(well), channel, threshold))
}

/// Separation of the positive and negative clusters, in summed standard
/// deviations.
pub fn separation_value(peaks: &[Peak], channel: Channel, threshold: f64) -> Option<f64> {
    let (pos, neg) = cluster_1d(peaks, channel, threshold);
    separation(&amplitudes(&pos, channel), &amplitudes(&neg, channel))
}

fn separation(pos: &[f64], neg: &[f64]) -> Option<f64> {
    let spread = pstdev(pos)? + pstdev(neg)?;
    let gap = mean(pos)? - mean(neg)?;
    if spread == 0.0 {
        return None;
    }
    Some(gap / spread)
}

/// Copy number of a target channel against a reference channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CnvInterval {
    pub cnv: f64,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Copy number of `target` relative to `reference` on the accepted
/// droplets of a well.
///
/// Assumes threshold-mode calls on both channels; wells clustered in 2D
/// are measured the same way.
pub fn observed_cnv_interval(well: &DecodedWell, target: Channel, reference: Channel) -> Option<CnvInterval> {
    let peaks = accepted_peaks(well);
    cnv_interval(well, &peaks, target, reference)
}

pub fn cnv_interval(well: &DecodedWell, peaks: &[Peak], target: Channel, reference: Channel) -> Option<CnvInterval> {
    let t_threshold = well.threshold(target)?;
    let r_threshold = well.threshold(reference)?;
    let (t_pos, t_neg) = cluster_1d(peaks, target, t_threshold);
    let (r_pos, r_neg) = cluster_1d(peaks, reference, r_threshold);

    let t_conc = concentration(t_pos.len(), t_neg.len(), well.droplet_volume)?;
    let r_conc = concentration(r_pos.len(), r_neg.len(), well.droplet_volume)?;
    if r_conc == 0.0 {
        return None;
    }

    let n = peaks.len() as f64;
    let (_, low, high) = ratio_conf_interval(r_pos.len() as f64, t_pos.len() as f64, n, n);
    let copies = well.ref_copy_num;
    Some(CnvInterval {
        cnv: t_conc / r_conc * copies,
        lower: finite(low * copies),
        upper: finite(high * copies),
    })
}

/// Concentration of the last quarter of accepted droplets over the first
/// quarter, in event order.
pub fn quartile_concentration_ratio(well: &DecodedWell, peaks: &[Peak], channel: Channel) -> Option<f64> {
    if peaks.len() < QUARTILE_MIN_EVENTS {
        return None;
    }
    let threshold = well.threshold(channel)?;
    let quartile = peaks.len() / 4;
    let first = &peaks[..quartile];
    let last = &peaks[peaks.len() - quartile..];

    let (fp, fnn) = cluster_1d(first, channel, threshold);
    let (lp, lnn) = cluster_1d(last, channel, threshold);
    let fq = concentration(fp.len(), fnn.len(), well.droplet_volume)?;
    let lq = concentration(lp.len(), lnn.len(), well.droplet_volume)?;
    if fq == 0.0 || lq == 0.0 {
        return None;
    }
    Some(lq / fq)
}

/// Accepted droplets needed in each quartile before the CNV rise ratio
/// is attempted.
pub const CNV_QUARTILE_MIN_EVENTS: usize = 1000;

fn split_cnv(well: &DecodedWell, peaks: &[Peak], target: Channel, reference: Channel) -> Option<f64> {
    let (t_pos, t_neg) = cluster_1d(peaks, target, well.threshold(target)?);
    let (r_pos, r_neg) = cluster_1d(peaks, reference, well.threshold(reference)?);
    let t_conc = concentration(t_pos.len(), t_neg.len(), well.droplet_volume)?;
    let r_conc = concentration(r_pos.len(), r_neg.len(), well.droplet_volume)?;
    if r_conc == 0.0 {
        return None;
    }
    Some(t_conc / r_conc * well.ref_copy_num)
}

/// CNV of the last quarter of accepted droplets over the first quarter,
/// in event order.
///
/// Splits on thresholds even when the well was clustered in 2D.
pub fn cnv_rise_ratio(well: &DecodedWell, peaks: &[Peak], target: Channel, reference: Channel) -> Option<f64> {
    let quartile = peaks.len() / 4;
    if quartile < CNV_QUARTILE_MIN_EVENTS {
        return None;
    }
    let first = split_cnv(well, &peaks[..quartile], target, reference)?;
    let last = split_cnv(well, &peaks[peaks.len() - quartile..], target, reference)?;
    if first == 0.0 {
        return None;
    }
    Some(last / first)
}

/// Observed over expected double positives under independent partitioning.
pub fn linkage_2d(quadrants: &Quadrants) -> Option<f64> {
    let n = quadrants.total() as f64;
    if n == 0.0 {
        return None;
    }
    let pp = quadrants.pp.len() as f64;
    let expected = (pp + quadrants.pn.len() as f64) * (pp + quadrants.np.len() as f64) / n;
    if expected == 0.0 {
        return None;
    }
    Some(pp / expected)
}

/// Accepted droplets split into quadrants at both called thresholds.
pub fn well_quadrants(well: &DecodedWell) -> Option<Quadrants> {
    let fam = well.threshold(FAM)?;
    let vic = well.threshold(VIC)?;
    Some(cluster_2d(&accepted_peaks(well), fam, vic))
}

/// Fragmentation probability of the FAM and VIC templates.
pub fn fragmentation_probability(well: &DecodedWell) -> Option<f64> {
    let q = well_quadrants(well)?;
    prob_of_frag(q.pn.len(), q.pp.len(), q.nn.len(), q.np.len()).map(|f| f.probability)
}

/// FAM concentration among VIC-negative droplets over FAM concentration
/// among VIC-positive droplets. Near 1 when the two targets partition
/// independently.
pub fn balance_score(well: &DecodedWell) -> Option<f64> {
    let q = well_quadrants(well)?;
    let vic_neg = concentration(q.pn.len(), q.nn.len(), well.droplet_volume)?;
    let vic_pos = concentration(q.pp.len(), q.np.len(), well.droplet_volume)?;
    if vic_pos == 0.0 {
        return None;
    }
    Some(vic_neg / vic_pos)
}

/// Count of consecutive above-minimum droplets closer than `threshold`
/// mean widths.
pub fn narrow_droplet_spacing_count(well: &DecodedWell, threshold: f64) -> usize {
    let peaks = above_min_amplitude_peaks(well);
    let widths: Vec<f64> = peaks.iter().map(|p| p.width(FAM)).collect();
    let Some(mean_width) = mean(&widths).filter(|w| *w > 0.0) else {
        return 0;
    };
    let mut times: Vec<u64> = peaks.iter().map(|p| p.time).collect();
    times.sort_unstable();
    times
        .windows(2)
        .filter(|pair| ((pair[1] - pair[0]) as f64 / mean_width) < threshold)
        .count()
}

/// Mean plus and minus three standard deviations of one cluster.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    mean: f64,
    sd: f64,
}

impl Band {
    fn of(peaks: &[Peak], channel: Channel) -> Option<Self> {
        let amps = amplitudes(peaks, channel);
        Some(Self {
            mean: mean(&amps)?,
            sd: pstdev(&amps)?,
        })
    }

    fn upper(&self) -> f64 {
        self.mean + 3.0 * self.sd
    }

    fn lower(&self) -> f64 {
        self.mean - 3.0 * self.sd
    }
}

fn joined(a: &[Peak], b: &[Peak]) -> Vec<Peak> {
    a.iter().chain(b).copied().collect()
}

/// 2D cluster geometry of a well with both thresholds called.
#[derive(Debug, Clone)]
pub struct DropletClusters {
    quadrants: Quadrants,
}

/// A droplet count and its fraction of the relevant denominator.
pub type CountFraction = (usize, f64);

impl DropletClusters {
    pub fn of(well: &DecodedWell) -> Option<Self> {
        well_quadrants(well).map(|quadrants| Self { quadrants })
    }

    fn total(&self) -> usize {
        self.quadrants.total()
    }

    /// `(negative, positive)` clusters on `channel` with the other
    /// channel negative (`other_positive == false`) or positive.
    fn pair(&self, channel: Channel, other_positive: bool) -> (&[Peak], &[Peak]) {
        let q = &self.quadrants;
        match (channel, other_positive) {
            (FAM, false) => (&q.nn, &q.pn),
            (FAM, true) => (&q.np, &q.pp),
            (_, false) => (&q.nn, &q.np),
            (_, true) => (&q.pn, &q.pp),
        }
    }

    /// All droplets negative on `channel`, then all positive.
    fn sides(&self, channel: Channel) -> (Vec<Peak>, Vec<Peak>) {
        let (n0, p0) = self.pair(channel, false);
        let (n1, p1) = self.pair(channel, true);
        (joined(n0, n1), joined(p0, p1))
    }

    /// Cluster separation on `channel` among droplets negative on the
    /// other channel.
    pub fn s2d(&self, channel: Channel) -> Option<f64> {
        let (neg, pos) = self.pair(channel, false);
        separation(&amplitudes(pos, channel), &amplitudes(neg, channel))
    }

    /// Droplets brighter than the top cluster's upper band.
    pub fn high_fliers(&self, channel: Channel) -> Option<CountFraction> {
        let (neg, pos) = self.sides(channel);
        let band = Band::of(&pos, channel).or_else(|| Band::of(&neg, channel))?;
        let count = neg
            .iter()
            .chain(&pos)
            .filter(|p| p.amplitude(channel) > band.upper())
            .count();
        Some((count, count as f64 / self.total() as f64))
    }

    /// Droplets dimmer than the negative cluster's lower band.
    pub fn low_fliers(&self, channel: Channel) -> Option<CountFraction> {
        let (neg, _) = self.sides(channel);
        let band = Band::of(&neg, channel)?;
        let count = neg.iter().filter(|p| p.amplitude(channel) < band.lower()).count();
        Some((count, count as f64 / self.total() as f64))
    }

    fn rain_between(&self, channel: Channel, other_positive: bool) -> Option<CountFraction> {
        let (neg, pos) = self.pair(channel, other_positive);
        let low = Band::of(neg, channel)?.upper();
        let high = Band::of(pos, channel)?.lower();
        let population = neg.len() + pos.len();
        let count = neg
            .iter()
            .chain(pos)
            .filter(|p| {
                let a = p.amplitude(channel);
                a > low && a < high
            })
            .count();
        Some((count, count as f64 / population as f64))
    }

    /// Between-cluster droplets on `channel` where the other channel is negative.
    pub fn single_rain(&self, channel: Channel) -> Option<CountFraction> {
        self.rain_between(channel, false)
    }

    /// Between-cluster droplets on `channel` where the other channel is positive.
    pub fn double_rain(&self, channel: Channel) -> Option<CountFraction> {
        self.rain_between(channel, true)
    }

    /// Droplets between the clusters on both channels at once.
    pub fn diagonal_scatter(&self) -> Option<CountFraction> {
        let mut limits = [(0.0, 0.0); 2];
        for (channel, limit) in limits.iter_mut().enumerate() {
            let (neg, pos) = self.sides(channel);
            *limit = (Band::of(&neg, channel)?.upper(), Band::of(&pos, channel)?.lower());
        }
        let q = &self.quadrants;
        let count = [&q.pp, &q.pn, &q.np, &q.nn]
            .iter()
            .flat_map(|set| set.iter())
            .filter(|p| {
                limits.iter().enumerate().all(|(channel, (low, high))| {
                    let a = p.amplitude(channel);
                    a > *low && a < *high
                })
            })
            .count();
        Some((count, count as f64 / self.total() as f64))
    }
}
