//! Plate-level calculators: carryover, colorcomp geometry and false
//! positive/negative counts.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::MetricsError;
use crate::model::{PlateMetric, WellChannelMetric};
use crate::peaks::{
    above_min_amplitude_peaks, accepted_peaks, amplitudes, cluster_1d, cluster_2d, filter_amplitude_range,
    rain_gates, width_gated,
};
use crate::plate::{DecodedPlate, DecodedWell, Peak};
use crate::stats::{mean, pstdev};
use crate::types::{Channel, WellName, FAM, VIC};

use super::tables::{CARRYOVER_EMPTY_SAMPLES, FAM_HI_SAMPLES, FAM_LO_SAMPLES, VIC_HI_SAMPLES, VIC_LO_SAMPLES};
use super::PlateMetricCalculator;

/// Droplets dimmer than this in a stealth well are not contamination.
pub const CONTAMINATION_MIN_AMPLITUDE: f64 = 750.0;

/// Rain band widths for the HI/LO colorcomp 2D rain metric.
const FAM_2D_RAIN_PCT: f64 = 0.0975;
const VIC_2D_RAIN_PCT: f64 = 0.135;

#[derive(Debug, Default)]
struct CarryoverTally {
    contamination: usize,
    gated_contamination: usize,
    carryover: usize,
    wells: usize,
    per_well: BTreeMap<WellName, usize>,
}

impl CarryoverTally {
    fn store(self, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        metric.carryover_peaks = Some(self.carryover);
        metric.gated_contamination_peaks = Some(self.gated_contamination);
        metric.contamination_peaks = Some(self.contamination);
        metric.stealth_wells = Some(self.wells);
        for (name, count) in self.per_well {
            metric.require_well_mut(&name)?.carryover_peaks = Some(count);
        }
        Ok(())
    }
}

/// Carryover into the blank well run right after an eventful well.
///
/// Stealth droplets count as carryover when they are brighter than
/// [`CONTAMINATION_MIN_AMPLITUDE`], inside the eventful well's width gates
/// and above the eventful well's threshold.
#[derive(Debug, Clone, Copy)]
pub struct Carryover {
    pub empty_samples: &'static [&'static str],
    pub channel: Channel,
}

impl Carryover {
    pub const DEFAULT: Carryover = Carryover {
        empty_samples: CARRYOVER_EMPTY_SAMPLES,
        channel: FAM,
    };

    /// `(eventful, stealth)` pairs in row-major order.
    fn pairs<'a>(&self, plate: &'a DecodedPlate) -> Vec<(&'a DecodedWell, &'a WellName, &'a DecodedWell)> {
        let mut pairs = Vec::new();
        let mut eventful: Option<&DecodedWell> = None;
        for (name, well) in &plate.wells {
            if !well.sample_in(self.empty_samples) {
                eventful = Some(well);
            } else if let Some(source) = eventful.take() {
                pairs.push((source, name, well));
            }
        }
        pairs
    }

    fn tally(&self, plate: &DecodedPlate) -> CarryoverTally {
        let mut tally = CarryoverTally::default();
        for (eventful, stealth_name, stealth) in self.pairs(plate) {
            tally.wells += 1;
            let (min_gate, max_gate) = eventful.static_width_gates();

            let peaks = above_min_amplitude_peaks(stealth);
            let (contamination, _) = cluster_1d(&peaks, self.channel, CONTAMINATION_MIN_AMPLITUDE);
            let gated = width_gated(&contamination, min_gate, max_gate, self.channel);
            let carryover = match eventful.threshold(self.channel) {
                Some(threshold) => cluster_1d(&gated, self.channel, threshold).0.len(),
                None => 0,
            };

            tally.contamination += contamination.len();
            tally.gated_contamination += gated.len();
            tally.carryover += carryover;
            tally.per_well.insert(*stealth_name, carryover);
        }
        tally
    }
}

impl PlateMetricCalculator for Carryover {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        let tally = self.tally(plate);
        debug!(
            plate_id = %metric.plate_id,
            stealth_wells = tally.wells,
            carryover = tally.carryover,
            "Computed carryover"
        );
        tally.store(metric)
    }
}

/// Amplitude band and width gates of one dye well.
#[derive(Debug, Clone, Copy)]
struct DyeBand {
    lower: f64,
    upper: f64,
    min_width: f64,
    max_width: f64,
}

/// Carryover on colorcomp plates: droplets in any later non-FAM-HI well
/// that fall inside the ±3σ band of an earlier dye well.
pub struct ColorCompCarryover;

impl ColorCompCarryover {
    fn tally(plate: &DecodedPlate) -> CarryoverTally {
        let mut tally = CarryoverTally::default();
        let mut bands: [Vec<DyeBand>; 2] = [Vec::new(), Vec::new()];

        for (name, well) in &plate.wells {
            let peaks = above_min_amplitude_peaks(well);

            if !well.sample_in(FAM_HI_SAMPLES) {
                tally.wells += 1;
                for (channel, channel_bands) in bands.iter().enumerate() {
                    for band in channel_bands {
                        let contamination = filter_amplitude_range(&peaks, channel, band.lower, band.upper);
                        let carryover = width_gated(&contamination, band.min_width, band.max_width, channel);
                        *tally.per_well.entry(*name).or_insert(0) += carryover.len();
                        tally.contamination += contamination.len();
                        tally.carryover += carryover.len();
                    }
                }
            }

            let channel = if well.sample_in(FAM_HI_SAMPLES) || well.sample_in(FAM_LO_SAMPLES) {
                FAM
            } else if well.sample_in(VIC_HI_SAMPLES) {
                VIC
            } else {
                continue;
            };
            let amps = amplitudes(&peaks, channel);
            if let (Some(m), Some(sd)) = (mean(&amps), pstdev(&amps)) {
                let (min_width, max_width) = well.static_width_gates();
                bands[channel].push(DyeBand {
                    lower: m - 3.0 * sd,
                    upper: m + 3.0 * sd,
                    min_width,
                    max_width,
                });
            }
        }
        tally
    }
}

impl PlateMetricCalculator for ColorCompCarryover {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        Self::tally(plate).store(metric)
    }
}

fn first_accepted(plate: &DecodedPlate, samples: &[&str]) -> Option<Vec<Peak>> {
    plate
        .wells_with_sample(samples)
        .next()
        .map(|(_, well)| accepted_peaks(well))
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Offsets {
    fam_normal: f64,
    vic_normal: f64,
    famvic_normal: f64,
    famvic_origin: f64,
}

/// Mean `(VIC, FAM)` amplitude of a dye well.
fn centroid(peaks: &[Peak]) -> Option<[f64; 2]> {
    Some([mean(&amplitudes(peaks, VIC))?, mean(&amplitudes(peaks, FAM))?])
}

/// Angle and intercept geometry of the FAM and VIC dye lines.
fn colorcomp_offsets(fam_hi: [f64; 2], fam_lo: [f64; 2], vic_hi: [f64; 2], vic_lo: [f64; 2]) -> Offsets {
    let fam = [fam_hi[0] - fam_lo[0], fam_hi[1] - fam_lo[1]];
    let vic = [vic_hi[0] - vic_lo[0], vic_hi[1] - vic_lo[1]];

    let dot = fam[0] * vic[0] + fam[1] * vic[1];
    let angle = (dot / (fam[0].hypot(fam[1]) * vic[0].hypot(vic[1]))).acos().to_degrees();

    let mf = fam[1] / fam[0];
    let mv = vic[1] / vic[0];
    let bf = fam_hi[1] - mf * fam_hi[0];
    let bv = vic_hi[1] - mv * vic_hi[0];
    let xv = (bv - bf) / (mf - mv);
    let xf = mf * xv + bf;

    Offsets {
        fam_normal: (fam[0] / fam[1]).atan().to_degrees(),
        vic_normal: (vic[1] / vic[0]).atan().to_degrees(),
        famvic_normal: (90.0 - angle).abs(),
        famvic_origin: xv.hypot(xf),
    }
}

/// How far the FAM and VIC dye lines are from orthogonal, and how far
/// their intersection is from the origin.
pub struct ColorCompOrthogonal;

impl PlateMetricCalculator for ColorCompOrthogonal {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        let centroids = [FAM_HI_SAMPLES, FAM_LO_SAMPLES, VIC_HI_SAMPLES, VIC_LO_SAMPLES]
            .map(|samples| first_accepted(plate, samples).and_then(|peaks| centroid(&peaks)));

        let offsets = match centroids {
            [Some(fam_hi), Some(fam_lo), Some(vic_hi), Some(vic_lo)] => {
                Some(colorcomp_offsets(fam_hi, fam_lo, vic_hi, vic_lo))
            }
            _ => {
                debug!(plate_id = %metric.plate_id, "Colorcomp plate is missing a dye well");
                None
            }
        };

        metric.fam_normal_offset = offsets.and_then(|o| finite(o.fam_normal));
        metric.vic_normal_offset = offsets.and_then(|o| finite(o.vic_normal));
        metric.famvic_normal_offset = offsets.and_then(|o| finite(o.famvic_normal));
        metric.famvic_origin_offset = offsets.and_then(|o| finite(o.famvic_origin));
        Ok(())
    }
}

/// Fraction of droplets of a FAM/VIC dye pair that sit below both dye
/// clusters at once.
pub struct ColorComp2DRain;

impl ColorComp2DRain {
    fn cluster_rain(plate: &DecodedPlate, fam_samples: &[&str], vic_samples: &[&str]) -> Option<f64> {
        let fam = first_accepted(plate, fam_samples)?;
        let vic = first_accepted(plate, vic_samples)?;
        let fam_low = rain_gates(&fam, FAM, None, FAM_2D_RAIN_PCT).neg;
        let vic_low = rain_gates(&vic, VIC, None, VIC_2D_RAIN_PCT).neg;

        let all: Vec<Peak> = fam.into_iter().chain(vic).collect();
        if all.is_empty() {
            return None;
        }
        let rain = cluster_2d(&all, fam_low, vic_low).nn.len();
        Some(rain as f64 / all.len() as f64)
    }
}

impl PlateMetricCalculator for ColorComp2DRain {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        if let Some(rain) = Self::cluster_rain(plate, FAM_HI_SAMPLES, VIC_HI_SAMPLES) {
            metric.hi_cluster_rain = Some(rain);
        }
        if let Some(rain) = Self::cluster_rain(plate, FAM_LO_SAMPLES, VIC_LO_SAMPLES) {
            metric.lo_cluster_rain = Some(rain);
        }
        Ok(())
    }
}

/// Wells picked by position or by sample name.
#[derive(Debug, Clone, Copy)]
pub enum WellSelection {
    Names(&'static [&'static str]),
    Samples(&'static [&'static str]),
}

impl WellSelection {
    fn resolve(&self, plate: &DecodedPlate) -> Vec<WellName> {
        match self {
            WellSelection::Names(names) => names
                .iter()
                .filter_map(|name| name.parse::<WellName>().ok())
                .filter(|name| plate.wells.contains_key(name))
                .collect(),
            WellSelection::Samples(samples) => plate.wells_with_sample(samples).map(|(name, _)| *name).collect(),
        }
    }
}

/// How the dividing threshold for FP/FN counting is estimated.
#[derive(Debug, Clone, Copy)]
pub enum ThresholdEstimator {
    /// A quarter of the way from the mean NTC amplitude to the mean
    /// saturated amplitude.
    NtcSaturated {
        positive: WellSelection,
        negative: WellSelection,
    },
    /// Mean of the thresholds the instrument called on some wells.
    AverageComputed { wells: WellSelection },
    /// As `AverageComputed`, with wells picked by sample name.
    AverageSample { samples: &'static [&'static str] },
}

impl ThresholdEstimator {
    pub fn estimate(&self, plate: &DecodedPlate, metric: &PlateMetric, channel: Channel) -> Option<f64> {
        let channel_mean = |wells: &WellSelection, pick: fn(&WellChannelMetric) -> Option<f64>| {
            let values: Vec<f64> = wells
                .resolve(plate)
                .iter()
                .filter_map(|name| metric.well(name))
                .filter_map(|wm| wm.channels.get(channel).and_then(pick))
                .collect();
            mean(&values)
        };

        match self {
            ThresholdEstimator::NtcSaturated { positive, negative } => {
                let pos = channel_mean(positive, |wcm| wcm.amplitude_mean)?;
                let neg = channel_mean(negative, |wcm| wcm.amplitude_mean)?;
                Some((3.0 * neg + pos) / 4.0)
            }
            ThresholdEstimator::AverageComputed { wells } => channel_mean(wells, |wcm| wcm.called_threshold()),
            ThresholdEstimator::AverageSample { samples } => {
                channel_mean(&WellSelection::Samples(samples), |wcm| wcm.called_threshold())
            }
        }
    }
}

/// Which side of the estimated threshold counts as a false call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FalseCall {
    Positive,
    Negative,
}

fn count_false_calls(
    plate: &DecodedPlate,
    metric: &mut PlateMetric,
    estimator: &ThresholdEstimator,
    measurement: &WellSelection,
    channels: &[Channel],
    call: FalseCall,
) -> Result<(), MetricsError> {
    let thresholds: Vec<(Channel, f64)> = channels
        .iter()
        .filter_map(|&channel| match estimator.estimate(plate, metric, channel) {
            Some(threshold) => Some((channel, threshold)),
            None => {
                debug!(plate_id = %metric.plate_id, channel, "No basis wells for FP/FN threshold");
                None
            }
        })
        .collect();
    if thresholds.is_empty() {
        return Ok(());
    }

    for name in measurement.resolve(plate) {
        let (Some(well), Some(well_metric)) = (plate.wells.get(&name), metric.well_mut(&name)) else {
            continue;
        };
        let accepted = accepted_peaks(well);
        for &(channel, threshold) in &thresholds {
            let (above, below) = cluster_1d(&accepted, channel, threshold);
            let channel_metric = well_metric.channel_mut(channel)?;
            match call {
                FalseCall::Positive => channel_metric.false_positive_peaks = Some(above.len()),
                FalseCall::Negative => channel_metric.false_negative_peaks = Some(below.len()),
            }
            channel_metric.manual_threshold = Some(threshold);
        }
    }
    Ok(())
}

/// Droplets above an estimated threshold in wells that should be empty.
#[derive(Debug, Clone, Copy)]
pub struct FalsePositive {
    pub estimator: ThresholdEstimator,
    pub measurement: WellSelection,
    pub channels: &'static [Channel],
}

impl PlateMetricCalculator for FalsePositive {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        count_false_calls(
            plate,
            metric,
            &self.estimator,
            &self.measurement,
            self.channels,
            FalseCall::Positive,
        )
    }
}

/// Droplets at or below an estimated threshold in saturated wells.
#[derive(Debug, Clone, Copy)]
pub struct FalseNegative {
    pub estimator: ThresholdEstimator,
    pub measurement: WellSelection,
    pub channels: &'static [Channel],
}

impl PlateMetricCalculator for FalseNegative {
    fn compute(&self, plate: &DecodedPlate, metric: &mut PlateMetric) -> Result<(), MetricsError> {
        count_false_calls(
            plate,
            metric,
            &self.estimator,
            &self.measurement,
            self.channels,
            FalseCall::Negative,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::WellMetric;
    use crate::plate::fixtures::{peak, peak_w, peaks_at, plate, well};

    fn metric_for(decoded: &DecodedPlate) -> PlateMetric {
        let mut pm = PlateMetric::new("p", None);
        for name in decoded.wells.keys() {
            pm.insert_well(WellMetric::new(*name));
        }
        pm
    }

    fn carryover_of(pm: &PlateMetric, name: &str) -> Option<usize> {
        pm.well(&name.parse().unwrap()).and_then(|wm| wm.carryover_peaks)
    }

    #[test]
    fn test_carryover_applies_all_three_masks() {
        // The eventful well has threshold 4000 and width gates [8, 10].
        let eventful = well(Some("S.a. 1cpd"), peaks_at(5, 0, 9000.0, 500.0), [Some(4000.0), None]);
        let stealth_peaks = vec![
            // too dim for contamination
            peak_w(0, 500.0, 100.0, 9.0),
            // contamination under the threshold
            peak_w(100, 2000.0, 100.0, 9.0),
            // contamination outside the width gate
            peak_w(200, 6000.0, 100.0, 12.0),
            peak_w(300, 6000.0, 100.0, 9.0),
            // width gates are inclusive
            peak_w(400, 8000.0, 100.0, 10.0),
        ];
        let stealth = well(Some("Stealth"), stealth_peaks, [None, None]);
        let decoded = plate(vec![("A01", eventful), ("A02", stealth)]);
        let mut pm = metric_for(&decoded);

        Carryover::DEFAULT.compute(&decoded, &mut pm).unwrap();
        assert_eq!(pm.contamination_peaks, Some(4));
        assert_eq!(pm.gated_contamination_peaks, Some(3));
        assert_eq!(pm.carryover_peaks, Some(2));
        assert_eq!(pm.stealth_wells, Some(1));
        assert_eq!(carryover_of(&pm, "A02"), Some(2));
        assert_eq!(carryover_of(&pm, "A01"), None);
    }

    #[test]
    fn test_carryover_pairs_once_per_eventful_well() {
        let eventful = || well(Some("Staph"), peaks_at(3, 0, 9000.0, 500.0), [None, None]);
        let stealth = || well(Some("stealth"), vec![peak(0, 6000.0, 100.0)], [None, None]);
        let decoded = plate(vec![
            ("A01", eventful()),
            ("A02", stealth()),
            ("A03", stealth()),
            ("B01", eventful()),
            ("B02", stealth()),
        ]);
        let mut pm = metric_for(&decoded);
        Carryover::DEFAULT.compute(&decoded, &mut pm).unwrap();

        assert_eq!(pm.stealth_wells, Some(2));
        assert_eq!(pm.contamination_peaks, Some(2));
        // No eventful threshold, so nothing counts as carryover.
        assert_eq!(pm.carryover_peaks, Some(0));
        assert_eq!(carryover_of(&pm, "A02"), Some(0));
        assert_eq!(carryover_of(&pm, "A03"), None);
        assert_eq!(carryover_of(&pm, "B02"), Some(0));
    }

    #[test]
    fn test_carryover_missing_well_metric_is_an_error() {
        let eventful = well(Some("Staph"), peaks_at(3, 0, 9000.0, 500.0), [Some(4000.0), None]);
        let stealth = well(Some("Stealth"), Vec::new(), [None, None]);
        let decoded = plate(vec![("A01", eventful), ("A02", stealth)]);
        let mut pm = PlateMetric::new("p", None);
        pm.insert_well(WellMetric::new("A01".parse().unwrap()));
        assert!(Carryover::DEFAULT.compute(&decoded, &mut pm).is_err());
    }

    #[test]
    fn test_colorcomp_carryover_uses_earlier_dye_bands() {
        let mut fam_hi = peaks_at(10, 0, 10000.0, 1000.0);
        fam_hi.extend(peaks_at(10, 1000, 12000.0, 1000.0));
        let decoded = plate(vec![
            ("A01", well(Some("FAM HI"), fam_hi, [None, None])),
            ("A02", well(Some("VIC LO"), vec![peak(0, 11000.0, 2000.0), peak(100, 500.0, 2000.0)], [None, None])),
            ("A03", well(Some("FAM HI"), vec![peak(0, 11000.0, 2000.0)], [None, None])),
        ]);
        let mut pm = metric_for(&decoded);
        ColorCompCarryover.compute(&decoded, &mut pm).unwrap();

        assert_eq!(pm.stealth_wells, Some(1));
        assert_eq!(pm.carryover_peaks, Some(1));
        assert_eq!(pm.contamination_peaks, Some(1));
        assert_eq!(pm.gated_contamination_peaks, Some(0));
        assert_eq!(carryover_of(&pm, "A02"), Some(1));
        assert_eq!(carryover_of(&pm, "A01"), None);
        assert_eq!(carryover_of(&pm, "A03"), None);
    }

    fn dye_plate() -> DecodedPlate {
        plate(vec![
            ("A01", well(Some("FAM HI"), peaks_at(10, 0, 20000.0, 3000.0), [None, None])),
            ("A02", well(Some("FAM LO"), peaks_at(10, 0, 4000.0, 2000.0), [None, None])),
            ("A03", well(Some("VIC HI"), peaks_at(10, 0, 3000.0, 10000.0), [None, None])),
            ("A04", well(Some("VIC LO"), peaks_at(10, 0, 2000.0, 3000.0), [None, None])),
        ])
    }

    #[test]
    fn test_colorcomp_orthogonal_dye_lines() {
        let decoded = dye_plate();
        let mut pm = metric_for(&decoded);
        ColorCompOrthogonal.compute(&decoded, &mut pm).unwrap();

        let fam = pm.fam_normal_offset.unwrap();
        let vic = pm.vic_normal_offset.unwrap();
        assert!((fam - (1.0f64 / 16.0).atan().to_degrees()).abs() < 1e-9);
        assert!((vic - (1.0f64 / 7.0).atan().to_degrees()).abs() < 1e-9);
        // Both lines lean inwards, so the angle between them closes by both tilts.
        assert!((pm.famvic_normal_offset.unwrap() - (fam + vic)).abs() < 1e-9);
        assert!((pm.famvic_origin_offset.unwrap() - 2618.28).abs() < 0.5);
    }

    #[test]
    fn test_colorcomp_orthogonal_needs_all_dye_wells() {
        let mut decoded = dye_plate();
        decoded.wells.remove(&"A04".parse().unwrap());
        let mut pm = metric_for(&decoded);
        pm.fam_normal_offset = Some(3.0);
        ColorCompOrthogonal.compute(&decoded, &mut pm).unwrap();
        assert_eq!(pm.fam_normal_offset, None);
        assert_eq!(pm.famvic_origin_offset, None);
    }

    #[test]
    fn test_colorcomp_2d_rain() {
        let mut fam_hi = peaks_at(9, 0, 20000.0, 2000.0);
        fam_hi.push(peak(5000, 1000.0, 1000.0));
        let mut decoded = dye_plate();
        decoded.wells.insert("A01".parse().unwrap(), well(Some("FAM HI"), fam_hi, [None, None]));
        decoded.wells.remove(&"A02".parse().unwrap());
        let mut pm = metric_for(&decoded);
        ColorComp2DRain.compute(&decoded, &mut pm).unwrap();
        assert_eq!(pm.hi_cluster_rain, Some(0.05));
        assert_eq!(pm.lo_cluster_rain, None);
    }

    #[test]
    fn test_ntc_saturated_false_positives() {
        let decoded = plate(vec![
            ("A01", well(Some("NTC"), peaks_at(4, 0, 100.0, 1000.0), [None, None])),
            ("A02", well(Some("NA19205"), peaks_at(4, 0, 100.0, 9000.0), [None, None])),
            ("B03", well(Some("NTC"), vec![peak(0, 100.0, 3500.0), peak(100, 100.0, 1000.0)], [None, None])),
        ]);
        let mut pm = metric_for(&decoded);
        for (name, mean) in [("A01", 1000.0), ("A02", 9000.0), ("B03", 2250.0)] {
            pm.well_mut(&name.parse().unwrap()).unwrap().channels[VIC].amplitude_mean = Some(mean);
        }

        let calc = FalsePositive {
            estimator: ThresholdEstimator::NtcSaturated {
                positive: WellSelection::Names(&["A02"]),
                negative: WellSelection::Names(&["A01", "B03"]),
            },
            measurement: WellSelection::Names(&["B03", "B06"]),
            channels: &[VIC],
        };
        calc.compute(&decoded, &mut pm).unwrap();

        // neg = 1625, pos = 9000: (3 * 1625 + 9000) / 4
        let b03 = &pm.well(&"B03".parse().unwrap()).unwrap().channels[VIC];
        assert_eq!(b03.manual_threshold, Some(3468.75));
        assert_eq!(b03.false_positive_peaks, Some(1));
        assert_eq!(b03.false_negative_peaks, None);
    }

    #[test]
    fn test_average_sample_false_positives() {
        let threshold_well = well(Some("1% Mutant, 1cpd WT"), Vec::new(), [Some(3000.0), None]);
        let decoded = plate(vec![
            ("A01", threshold_well),
            ("A02", well(Some("0% Mutant, 1cpd WT"), vec![peak(0, 3500.0, 0.0), peak(100, 3000.0, 0.0)], [None, None])),
        ]);
        let mut pm = metric_for(&decoded);
        pm.well_mut(&"A01".parse().unwrap()).unwrap().channels[FAM].threshold = Some(3000.0);

        let calc = FalsePositive {
            estimator: ThresholdEstimator::AverageSample {
                samples: &["1% Mutant, 1cpd WT"],
            },
            measurement: WellSelection::Samples(&["0% Mutant, 1cpd WT"]),
            channels: &[FAM],
        };
        calc.compute(&decoded, &mut pm).unwrap();
        let a02 = &pm.well(&"A02".parse().unwrap()).unwrap().channels[FAM];
        assert_eq!(a02.false_positive_peaks, Some(1));
        assert_eq!(a02.manual_threshold, Some(3000.0));
    }

    #[test]
    fn test_false_negatives_without_basis_wells() {
        let decoded = plate(vec![("A03", well(None, peaks_at(4, 0, 100.0, 100.0), [None, None]))]);
        let mut pm = metric_for(&decoded);
        let calc = FalseNegative {
            estimator: ThresholdEstimator::NtcSaturated {
                positive: WellSelection::Names(&["A02"]),
                negative: WellSelection::Names(&["A01"]),
            },
            measurement: WellSelection::Names(&["A03"]),
            channels: &[VIC],
        };
        calc.compute(&decoded, &mut pm).unwrap();
        assert_eq!(pm.well_metrics[0].channels[VIC].false_negative_peaks, None);
    }
}
