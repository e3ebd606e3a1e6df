//! Plate processing: the base pass every plate gets, then the calculators
//! its plate type selects.

use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::error::MetricsError;
use crate::model::{PlateMetric, PlateRecord, ReprocessConfig, WellChannelMetric, WellMetric};
use crate::plate::DecodedPlate;
use crate::types::{PlateTypeCode, FAM, VIC};

use super::channel::{
    BaseChannelMetrics, DyeGapRain, ExpectedConcentration, ExpectedThreshold, Extracluster, NtcPositive,
    Polydispersity,
};
use super::colorcal::{SingleWellChannelColorComp, SingleWellColorComp};
use super::plate::{
    Carryover, ColorComp2DRain, ColorCompCarryover, ColorCompOrthogonal, FalseNegative, FalsePositive,
    ThresholdEstimator, WellSelection,
};
use super::tables;
use super::well::{AirDroplets, BaseWellMetrics, CarryoverAirDroplets, Cnv, ExpectedCnv, NullLinkage};
use super::{
    foreach_mixed_well, foreach_mixed_well_channel, foreach_well, foreach_well_channel, PlateMetricCalculator,
    WellChannelMetricCalculator, WellMetricCalculator,
};

type ChannelCalc = Option<&'static dyn WellChannelMetricCalculator>;
type WellCalc = Option<&'static dyn WellMetricCalculator>;
type PlateCalc = Option<&'static dyn PlateMetricCalculator>;

static EXPECTED_CONC_SINGLEPLEX: ExpectedConcentration = ExpectedConcentration(tables::SINGLEPLEX_CONCENTRATIONS);
static EXPECTED_CONC_DUPLEX: ExpectedConcentration = ExpectedConcentration(tables::DUPLEX_CONCENTRATIONS);
static EXPECTED_CONC_STAPH2X10: ExpectedConcentration = ExpectedConcentration(tables::STAPH2X10_CONCENTRATIONS);
static EXPECTED_CONC_GDNR: ExpectedConcentration = ExpectedConcentration(tables::GDNR_CONCENTRATIONS);
static EXPECTED_CONC_EGDNR: ExpectedConcentration = ExpectedConcentration(tables::EGDNR_CONCENTRATIONS);
static EXPECTED_CONC_RED: ExpectedConcentration = ExpectedConcentration(tables::RED_CONCENTRATIONS);
static EXPECTED_CONC_HIGH_DNR: ExpectedConcentration = ExpectedConcentration(tables::HIGH_DNR_CONCENTRATIONS);
static EXPECTED_CONC_CARRYOVER: ExpectedConcentration = ExpectedConcentration(tables::CARRYOVER_CONCENTRATIONS);
static EXPECTED_CONC_DNR200: ExpectedConcentration = ExpectedConcentration(tables::DNR200_CONCENTRATIONS);
static EXPECTED_CONC_DPLEX200: ExpectedConcentration = ExpectedConcentration(tables::DPLEX200_CONCENTRATIONS);
static EXPECTED_CONC_EG200: ExpectedConcentration = ExpectedConcentration(tables::EG200_CONCENTRATIONS);
static EXPECTED_CONC_TQ200: ExpectedConcentration = ExpectedConcentration(tables::TQ200_CONCENTRATIONS);

static CNV_DEFAULT: Cnv = Cnv::DEFAULT;
static EXPECTED_CNV: ExpectedCnv = ExpectedCnv(tables::CNV_COPY_NUMBERS);
static EXPECTED_CNV200: ExpectedCnv = ExpectedCnv(tables::CNV200_COPY_NUMBERS);

static FPFN_FP: FalsePositive = FalsePositive {
    estimator: ThresholdEstimator::NtcSaturated {
        positive: WellSelection::Names(tables::FPFN_POSITIVE_WELLS),
        negative: WellSelection::Names(tables::FPFN_NEGATIVE_WELLS),
    },
    measurement: WellSelection::Names(tables::FPFN_FP_MEASUREMENT_WELLS),
    channels: &[VIC],
};
static FPFN_FN: FalseNegative = FalseNegative {
    estimator: ThresholdEstimator::NtcSaturated {
        positive: WellSelection::Names(tables::FPFN_POSITIVE_WELLS),
        negative: WellSelection::Names(tables::FPFN_NEGATIVE_WELLS),
    },
    measurement: WellSelection::Names(tables::FPFN_FN_MEASUREMENT_WELLS),
    channels: &[VIC],
};
static RED_FP: FalsePositive = FalsePositive {
    estimator: ThresholdEstimator::AverageSample {
        samples: tables::RED_FP_THRESHOLD_SAMPLES,
    },
    measurement: WellSelection::Samples(tables::RED_FP_MEASUREMENT_SAMPLES),
    channels: &[FAM],
};
static AV_FP: FalsePositive = FalsePositive {
    estimator: ThresholdEstimator::AverageSample {
        samples: tables::AV_FP_THRESHOLD_SAMPLES,
    },
    measurement: WellSelection::Samples(tables::AV_FP_MEASUREMENT_SAMPLES),
    channels: &[FAM],
};

static THRESHOLD_NEVER: ExpectedThreshold = ExpectedThreshold::Never;
static THRESHOLD_CARRYOVER: ExpectedThreshold = ExpectedThreshold::Carryover;
static THRESHOLD_SINGLEPLEX: ExpectedThreshold = ExpectedThreshold::Lookup(tables::SINGLEPLEX_THRESHOLDS);
static THRESHOLD_DUPLEX: ExpectedThreshold = ExpectedThreshold::Lookup(tables::DUPLEX_THRESHOLDS);
static THRESHOLD_STAPH2X10: ExpectedThreshold = ExpectedThreshold::Lookup(tables::STAPH2X10_THRESHOLDS);
static THRESHOLD_GDNR: ExpectedThreshold = ExpectedThreshold::Lookup(tables::GDNR_THRESHOLDS);
static THRESHOLD_EGDNR: ExpectedThreshold = ExpectedThreshold::Lookup(tables::EGDNR_THRESHOLDS);
static THRESHOLD_CNV: ExpectedThreshold = ExpectedThreshold::Lookup(tables::CNV_THRESHOLDS);
static THRESHOLD_RED: ExpectedThreshold = ExpectedThreshold::Lookup(tables::RED_THRESHOLDS);
static THRESHOLD_FPFN: ExpectedThreshold = ExpectedThreshold::Lookup(tables::FPFN_THRESHOLDS);
static THRESHOLD_DNR: ExpectedThreshold = ExpectedThreshold::Lookup(tables::DNR_THRESHOLDS);
static THRESHOLD_DNR200: ExpectedThreshold = ExpectedThreshold::Lookup(tables::DNR200_THRESHOLDS);
static THRESHOLD_DPLEX200: ExpectedThreshold = ExpectedThreshold::Lookup(tables::DPLEX200_THRESHOLDS);
static THRESHOLD_EG200: ExpectedThreshold = ExpectedThreshold::Lookup(tables::EG200_THRESHOLDS);
static THRESHOLD_TQ200: ExpectedThreshold = ExpectedThreshold::Lookup(tables::TQ200_THRESHOLDS);

static AIR_SINGLEPLEX: AirDroplets = AirDroplets {
    samples: tables::SINGLEPLEX_AIR_SAMPLES,
    channel: FAM,
};
static AIR_DYE: AirDroplets = AirDroplets {
    samples: tables::DYE_SAMPLES,
    channel: VIC,
};
static AIR_CARRYOVER: CarryoverAirDroplets = CarryoverAirDroplets;

static NULL_LINKAGE: NullLinkage = NullLinkage;
static POLYD_DEFAULT: Polydispersity = Polydispersity::Default;
static POLYD_COLORCOMP: Polydispersity = Polydispersity::ColorComp;
static GAP_RAIN_DEFAULT: DyeGapRain = DyeGapRain::Default;
static GAP_RAIN_COLORCOMP: DyeGapRain = DyeGapRain::ColorComp;
static EXTRAC_DEFAULT: Extracluster = Extracluster::Default;
static EXTRAC_COLORCOMP: Extracluster = Extracluster::ColorComp;

fn expected_concentration(code: PlateTypeCode) -> ChannelCalc {
    use PlateTypeCode::*;
    let calc: &'static ExpectedConcentration = match code {
        Bsplex => &EXPECTED_CONC_SINGLEPLEX,
        Bdplex => &EXPECTED_CONC_DUPLEX,
        Staph2x10 => &EXPECTED_CONC_STAPH2X10,
        Gdnr => &EXPECTED_CONC_GDNR,
        Egdnr => &EXPECTED_CONC_EGDNR,
        Bred => &EXPECTED_CONC_RED,
        Bdnr => &EXPECTED_CONC_HIGH_DNR,
        Bcarry | Mfgco => &EXPECTED_CONC_CARRYOVER,
        Dnr200 => &EXPECTED_CONC_DNR200,
        Dplex200 => &EXPECTED_CONC_DPLEX200,
        Eg200 => &EXPECTED_CONC_EG200,
        Tq200 => &EXPECTED_CONC_TQ200,
        _ => return None,
    };
    Some(calc)
}

fn expected_cnv(code: PlateTypeCode) -> WellCalc {
    match code {
        PlateTypeCode::Bcnv | PlateTypeCode::Gcnv => Some(&EXPECTED_CNV),
        PlateTypeCode::Cnv200 => Some(&EXPECTED_CNV200),
        _ => None,
    }
}

fn false_positive(code: PlateTypeCode) -> PlateCalc {
    match code {
        PlateTypeCode::Bfpfn => Some(&FPFN_FP),
        PlateTypeCode::Bred => Some(&RED_FP),
        PlateTypeCode::Av => Some(&AV_FP),
        _ => None,
    }
}

fn false_negative(code: PlateTypeCode) -> PlateCalc {
    match code {
        PlateTypeCode::Bfpfn => Some(&FPFN_FN),
        _ => None,
    }
}

fn expected_threshold(code: PlateTypeCode) -> ChannelCalc {
    use PlateTypeCode::*;
    let calc: &'static ExpectedThreshold = match code {
        Bdye | Bdye2 | Fam350 | Fm350l | Betaec | Probeec | Evaec | Bcc | Mfgcc => &THRESHOLD_NEVER,
        Bcarry | Mfgco => &THRESHOLD_CARRYOVER,
        Bsplex => &THRESHOLD_SINGLEPLEX,
        Bdplex => &THRESHOLD_DUPLEX,
        Staph2x10 => &THRESHOLD_STAPH2X10,
        Gdnr => &THRESHOLD_GDNR,
        Egdnr => &THRESHOLD_EGDNR,
        Bcnv | Gcnv | Cnv200 => &THRESHOLD_CNV,
        Bred => &THRESHOLD_RED,
        Bfpfn => &THRESHOLD_FPFN,
        Bdnr => &THRESHOLD_DNR,
        Dnr200 => &THRESHOLD_DNR200,
        Dplex200 => &THRESHOLD_DPLEX200,
        Eg200 => &THRESHOLD_EG200,
        Tq200 => &THRESHOLD_TQ200,
        _ => return None,
    };
    Some(calc)
}

fn null_linkage(code: PlateTypeCode) -> WellCalc {
    use PlateTypeCode::*;
    match code {
        Bdplex | Staph2x10 | Bcnv | Gcnv | Cnv200 => Some(&NULL_LINKAGE),
        _ => None,
    }
}

fn air_droplets(code: PlateTypeCode) -> WellCalc {
    let calc: &'static dyn WellMetricCalculator = match code {
        PlateTypeCode::Bsplex => &AIR_SINGLEPLEX,
        PlateTypeCode::Betaec => &AIR_DYE,
        PlateTypeCode::Bcarry | PlateTypeCode::Mfgco => &AIR_CARRYOVER,
        _ => return None,
    };
    Some(calc)
}

fn polydispersity(code: PlateTypeCode) -> ChannelCalc {
    use PlateTypeCode::*;
    match code {
        Betaec | Probeec | Evaec | Bcarry | Mfgco | Bsplex | Staph2x10 | Gdnr | Bdplex | Bcnv | Gcnv | Cnv200 => {
            Some(&POLYD_DEFAULT)
        }
        Bcc | Mfgcc => Some(&POLYD_COLORCOMP),
        _ => None,
    }
}

fn gap_rain(code: PlateTypeCode) -> ChannelCalc {
    match code {
        PlateTypeCode::Betaec => Some(&GAP_RAIN_DEFAULT),
        PlateTypeCode::Bcc | PlateTypeCode::Mfgcc => Some(&GAP_RAIN_COLORCOMP),
        _ => None,
    }
}

fn extracluster(code: PlateTypeCode) -> ChannelCalc {
    match code {
        PlateTypeCode::Betaec => Some(&EXTRAC_DEFAULT),
        PlateTypeCode::Bcc | PlateTypeCode::Mfgcc => Some(&EXTRAC_COLORCOMP),
        _ => None,
    }
}

/// Runs one channel stage: per well layout on mixed plates, else once for
/// the whole plate.
fn channel_stage(
    decoded: &DecodedPlate,
    metric: &mut PlateMetric,
    code: PlateTypeCode,
    select: fn(PlateTypeCode) -> ChannelCalc,
) -> Result<(), MetricsError> {
    if code.is_mixed() {
        foreach_mixed_well_channel(decoded, metric, select)
    } else if let Some(calc) = select(code) {
        foreach_well_channel(decoded, metric, calc)
    } else {
        Ok(())
    }
}

fn well_stage(
    decoded: &DecodedPlate,
    metric: &mut PlateMetric,
    code: PlateTypeCode,
    select: fn(PlateTypeCode) -> WellCalc,
    default: WellCalc,
) -> Result<(), MetricsError> {
    if code.is_mixed() {
        foreach_mixed_well(decoded, metric, select)
    } else if let Some(calc) = select(code).or(default) {
        foreach_well(decoded, metric, calc)
    } else {
        Ok(())
    }
}

/// An empty metric tree with one record per analyzed well.
pub fn make_empty_metrics_tree(
    record: &PlateRecord,
    decoded: &DecodedPlate,
    reprocess: Option<&ReprocessConfig>,
) -> PlateMetric {
    let mut metric = PlateMetric::new(&record.id, reprocess.map(|rc| rc.id));
    for name in decoded.wells.keys() {
        metric.insert_well(WellMetric::new(*name));
    }
    metric
}

/// The metrics every plate gets, whatever its type: channel and well
/// metrics for each analyzed well, carryover and the software PMT gains.
pub fn process_plate(
    record: &PlateRecord,
    decoded: &DecodedPlate,
    reprocess: Option<&ReprocessConfig>,
    engine: &EngineConfig,
) -> Result<PlateMetric, MetricsError> {
    let mut metric = make_empty_metrics_tree(record, decoded, reprocess);
    let base_channel = BaseChannelMetrics {
        ntc: NtcPositive {
            fam_threshold: engine.ntc_fam_threshold,
            vic_threshold: engine.ntc_vic_threshold,
        },
    };

    for (name, well) in &decoded.wells {
        let well_metric = metric.require_well_mut(name)?;
        for channel in &well.channels {
            let channel_metric: &mut WellChannelMetric = well_metric.channel_mut(channel.channel_num)?;
            base_channel.compute(well, channel, channel_metric);
            channel_metric.sanitize();
        }
        BaseWellMetrics.compute(well, well_metric);
        well_metric.sanitize();
        debug!(plate_id = %record.id, well = %name, "Computed base well metrics");
    }

    if record.plate_type.is_some_and(|code| code.is_colorcomp()) {
        ColorCompCarryover.compute(decoded, &mut metric)?;
    } else {
        Carryover::DEFAULT.compute(decoded, &mut metric)?;
    }

    if let Some([fam, vic]) = decoded.software_pmt_gains {
        metric.software_pmt_gain_fam = Some(fam);
        metric.software_pmt_gain_vic = Some(vic);
    }
    Ok(metric)
}

/// Runs the calculators a plate type selects, in a fixed order. Later
/// stages may read what earlier ones wrote (FP/FN reads thresholds).
pub fn fill_plate_type_metrics(
    decoded: &DecodedPlate,
    metric: &mut PlateMetric,
    code: PlateTypeCode,
) -> Result<(), MetricsError> {
    debug!(plate_id = %metric.plate_id, plate_type = %code, "Filling plate type metrics");

    channel_stage(decoded, metric, code, expected_concentration)?;
    well_stage(decoded, metric, code, expected_cnv, Some(&CNV_DEFAULT))?;

    if let Some(calc) = false_positive(code) {
        calc.compute(decoded, metric)?;
    }
    if let Some(calc) = false_negative(code) {
        calc.compute(decoded, metric)?;
    }

    channel_stage(decoded, metric, code, expected_threshold)?;
    well_stage(decoded, metric, code, null_linkage, None)?;
    well_stage(decoded, metric, code, air_droplets, None)?;
    channel_stage(decoded, metric, code, polydispersity)?;
    channel_stage(decoded, metric, code, gap_rain)?;
    channel_stage(decoded, metric, code, extracluster)?;

    if code.is_colorcomp() {
        ColorCompOrthogonal.compute(decoded, metric)?;
        ColorComp2DRain.compute(decoded, metric)?;
    }

    if code == PlateTypeCode::Scc {
        foreach_well_channel(decoded, metric, &SingleWellChannelColorComp)?;
        foreach_well(decoded, metric, &SingleWellColorComp)?;
    }
    Ok(())
}

/// Full metric pass for one plate under one processing configuration.
///
/// Either the whole tree is returned or an error; a partially filled tree
/// never escapes.
pub fn compute_plate_metrics(
    record: &PlateRecord,
    decoded: &DecodedPlate,
    reprocess: Option<&ReprocessConfig>,
    engine: &EngineConfig,
) -> Result<PlateMetric, MetricsError> {
    let mut metric = process_plate(record, decoded, reprocess, engine)?;
    match record.plate_type {
        Some(code) => fill_plate_type_metrics(decoded, &mut metric, code)?,
        None => debug!(plate_id = %record.id, "Plate has no type; base metrics only"),
    }
    info!(
        plate_id = %record.id,
        reprocess_config = ?reprocess.map(|rc| rc.code.as_str()),
        wells = metric.well_metrics.len(),
        "Processed plate"
    );
    Ok(metric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plate::fixtures::{duplex_well, peak_w, plate, record, well};

    fn engine() -> EngineConfig {
        EngineConfig::default()
    }

    fn run(code: Option<PlateTypeCode>, decoded: &DecodedPlate) -> PlateMetric {
        compute_plate_metrics(&record("p1", code, 1), decoded, None, &engine()).unwrap()
    }

    fn name(s: &str) -> crate::types::WellName {
        s.parse().unwrap()
    }

    #[test]
    fn test_empty_tree_has_one_record_per_well() {
        let decoded = plate(vec![
            ("B01", duplex_well(None, 1, 1, 1, 1)),
            ("A02", duplex_well(None, 1, 1, 1, 1)),
        ]);
        let rc = ReprocessConfig {
            id: 4,
            code: "pd2".to_string(),
            name: "Peak detection 2".to_string(),
            peak_detection_version: None,
            trigger_sigma: None,
            width_gating_sigma: None,
            min_amplitudes: None,
        };
        let pm = make_empty_metrics_tree(&record("p1", None, 1), &decoded, Some(&rc));
        assert_eq!(pm.reprocess_config_id, Some(4));
        let names: Vec<String> = pm.well_metrics.iter().map(|wm| wm.well_name.to_string()).collect();
        assert_eq!(names, vec!["A02", "B01"]);
    }

    #[test]
    fn test_process_plate_fills_base_metrics_and_gains() {
        let mut decoded = plate(vec![("A01", duplex_well(Some("NTC"), 0, 0, 0, 20))]);
        decoded.software_pmt_gains = Some([1.1, 0.9]);
        let pm = process_plate(&record("p1", None, 1), &decoded, None, &engine()).unwrap();

        assert_eq!(pm.software_pmt_gain_fam, Some(1.1));
        assert_eq!(pm.software_pmt_gain_vic, Some(0.9));
        assert_eq!(pm.stealth_wells, Some(0));
        let wm = &pm.well_metrics[0];
        assert_eq!(wm.accepted_event_count, 20);
        assert_eq!(wm.channels[0].ntc_positives, Some(0));
        assert_eq!(wm.channels[0].auto_threshold_expected, Some(false));
    }

    #[test]
    fn test_compute_is_repeatable() {
        let decoded = plate(vec![
            ("A01", duplex_well(Some("NA18507 CN2"), 50, 50, 50, 50)),
            ("A02", duplex_well(Some("NTC"), 0, 0, 0, 30)),
        ]);
        let first = run(Some(PlateTypeCode::Bcnv), &decoded);
        let second = run(Some(PlateTypeCode::Bcnv), &decoded);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplex_dispatch() {
        let decoded = plate(vec![("A01", duplex_well(Some("NTC"), 10, 10, 10, 10))]);
        let pm = run(Some(PlateTypeCode::Bdplex), &decoded);
        let wm = &pm.well_metrics[0];
        // NTC on the duplex layout expects a VIC threshold only.
        assert_eq!(wm.channels[0].auto_threshold_expected, Some(false));
        assert_eq!(wm.channels[1].auto_threshold_expected, Some(true));
        assert!(wm.null_linkage.is_some());
    }

    #[test]
    fn test_dye_plate_never_expects_threshold() {
        let decoded = plate(vec![("A01", duplex_well(Some("FAM HI"), 10, 10, 10, 10))]);
        let pm = run(Some(PlateTypeCode::Bdye), &decoded);
        for channel in &pm.well_metrics[0].channels {
            assert_eq!(channel.auto_threshold_expected, Some(false));
        }
    }

    #[test]
    fn test_untyped_plate_gets_base_metrics_only() {
        let decoded = plate(vec![("A01", duplex_well(Some("NTC"), 10, 10, 10, 10))]);
        let pm = run(None, &decoded);
        assert_eq!(pm.well_metrics[0].channels[1].auto_threshold_expected, Some(false));
        assert_eq!(pm.well_metrics[0].accepted_event_count, 40);
    }

    #[test]
    fn test_mixed_plate_dispatches_per_well() {
        let mut duplex = duplex_well(Some("NTC"), 10, 10, 10, 10);
        duplex.experiment_name = Some("Validation-Duplex".to_string());
        let mut dye = duplex_well(Some("NTC"), 10, 10, 10, 10);
        dye.experiment_name = Some("Validation-Dye".to_string());
        let mut stray = duplex_well(Some("NTC"), 10, 10, 10, 10);
        stray.experiment_name = None;
        let decoded = plate(vec![("A01", duplex), ("A02", dye), ("A03", stray)]);

        let pm = run(Some(PlateTypeCode::Av), &decoded);
        assert_eq!(pm.well(&name("A01")).unwrap().channels[1].auto_threshold_expected, Some(true));
        assert_eq!(pm.well(&name("A02")).unwrap().channels[1].auto_threshold_expected, Some(false));
        // No layout: the base pass value stays.
        assert_eq!(pm.well(&name("A03")).unwrap().channels[1].auto_threshold_expected, Some(false));
    }

    #[test]
    fn test_single_well_colorcomp_plate() {
        let peaks = vec![
            peak_w(0, 20000.0, 1000.0, 12.0),
            peak_w(100, 2500.0, 500.0, 9.0),
            peak_w(200, 1000.0, 9500.0, 10.0),
            peak_w(300, 800.0, 1800.0, 9.0),
        ];
        let decoded = plate(vec![("A01", well(Some("FAM/HEX"), peaks, [None, None]))]);
        let pm = run(Some(PlateTypeCode::Scc), &decoded);
        let wm = &pm.well_metrics[0];
        assert_eq!(wm.channels[0].positive_peaks, Some(1));
        assert_eq!(wm.channels[1].positive_peaks, Some(1));
        assert_eq!(wm.delta_widths, Some(2.0));
    }
}
