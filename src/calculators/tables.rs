//! Standard plate layouts: expected values keyed by sample name.
//!
//! Each layout names its samples the same way on every plate of its type,
//! so expected concentrations, copy numbers and threshold calls can be
//! looked up by sample name alone.

use crate::types::Channel;

/// Sample name to expected `[FAM, VIC]` concentration (copies/µL).
pub type ConcentrationTable = &'static [(&'static str, [Option<f64>; 2])];

/// Sample name to whether each channel should get an automatic threshold.
pub type ThresholdTable = &'static [(&'static str, [bool; 2])];

/// Sample name to expected copy number.
pub type CnvTable = &'static [(&'static str, Option<f64>)];

pub const FAM_HI_SAMPLES: &[&str] = &["FAM HI", "FAM 350nM"];
pub const FAM_LO_SAMPLES: &[&str] = &["FAM LO", "FAM 40nM"];
pub const VIC_HI_SAMPLES: &[&str] = &["VIC HI", "VIC 350nM"];
pub const VIC_LO_SAMPLES: &[&str] = &["VIC LO", "VIC 70nM"];

/// Blank wells following an eventful well on carryover layouts.
pub const CARRYOVER_EMPTY_SAMPLES: &[&str] = &["Stealth", "stealth", "Stealth well"];

pub const STEALTH_SAMPLES: &[&str] = &["Stealth", "stealth"];

/// Eventful wells of a carryover layout.
pub const CARRYOVER_STAPH_SAMPLES: &[&str] = &["S.a. 1cpd", "staph", "Staph"];

pub const SINGLEPLEX_AIR_SAMPLES: &[&str] = &["SA singleplex 1.0", "0.5cpd"];

/// Dye wells of the beta event-count layout.
pub const DYE_SAMPLES: &[&str] = &["Dye"];

pub fn expected_concentration(table: ConcentrationTable, sample: Option<&str>, channel: Channel) -> Option<f64> {
    let sample = sample?;
    table
        .iter()
        .find(|(name, _)| *name == sample)
        .and_then(|(_, conc)| conc.get(channel).copied().flatten())
}

/// Unlisted samples are expected to get a threshold.
pub fn threshold_expected(table: ThresholdTable, sample: Option<&str>, channel: Channel) -> bool {
    sample
        .and_then(|sample| table.iter().find(|(name, _)| *name == sample))
        .and_then(|(_, expected)| expected.get(channel).copied())
        .unwrap_or(true)
}

pub fn expected_cnv(table: CnvTable, sample: Option<&str>) -> Option<f64> {
    let sample = sample?;
    table
        .iter()
        .find(|(name, _)| *name == sample)
        .and_then(|(_, cnv)| *cnv)
}

const fn fam(conc: f64) -> [Option<f64>; 2] {
    [Some(conc), None]
}

const fn both(fam: f64, vic: f64) -> [Option<f64>; 2] {
    [Some(fam), Some(vic)]
}

const NONE: [Option<f64>; 2] = [None, None];

pub const DNR200_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC", fam(0.0)),
    ("0.005 cpd", fam(5.0)),
    ("0.010 cpd", fam(10.0)),
    ("0.020 cpd", fam(20.0)),
    ("0.039 cpd", fam(39.0)),
    ("0.078 cpd", fam(78.0)),
    ("0.156 cpd", fam(156.0)),
    ("0.313 cpd", fam(313.0)),
    ("0.625 cpd", fam(625.0)),
    ("1.25 cpd", fam(1250.0)),
    ("2.5 cpd", fam(2500.0)),
    ("5 cpd", fam(5000.0)),
];

pub const DPLEX200_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC/1cpd Ch2", both(0.0, 1000.0)),
    ("0.125 cpd Ch1/1cpd Ch2", both(125.0, 1000.0)),
    ("0.25 cpd Ch1/1cpd Ch2", both(250.0, 1000.0)),
    ("0.5 cpd Ch1/1cpd Ch2", both(500.0, 1000.0)),
    ("1 cpd Ch1/1cpd Ch2", both(1000.0, 1000.0)),
    ("2 cpd Ch1/1cpd Ch2", both(2000.0, 1000.0)),
];

pub const EG200_CONCENTRATIONS: ConcentrationTable = &[("NTC", fam(0.0)), ("0.5", fam(500.0))];

pub const TQ200_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC Ch1", fam(0.0)),
    ("NTC Ch2", [None, Some(0.0)]),
    ("0.5 Ch1", fam(500.0)),
    ("0.5 Ch2", [None, Some(500.0)]),
];

pub const SINGLEPLEX_CONCENTRATIONS: ConcentrationTable =
    &[("SA singleplex 1.0", fam(1000.0)), ("0.5cpd", fam(500.0))];

pub const DUPLEX_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC", both(0.0, 1000.0)),
    ("S.a. 0.125", both(125.0, 1000.0)),
    ("S.a. 0.25", both(250.0, 1000.0)),
    ("S.a. 0.5", both(500.0, 1000.0)),
    ("S.a. 1.02", both(1020.0, 1000.0)),
    ("S.a. 2.0", both(2000.0, 1000.0)),
];

pub const STAPH2X10_CONCENTRATIONS: ConcentrationTable = &[
    ("S.a. NTC", fam(0.0)),
    ("S.a. NTC ", fam(0.0)),
    ("NTC", fam(0.0)),
    ("S.a. 0.008", fam(8.0)),
    ("S.a. 0.0016", fam(16.0)),
    ("S.a. 0.0156", fam(16.0)),
    ("S.a. 0.0031", fam(31.0)),
    ("S.a. 0.0312", fam(31.0)),
    ("S.a. 0.0063", fam(62.0)),
    ("S.a. 0.0625", fam(62.0)),
    ("S.a. 0.125", fam(125.0)),
    ("S.a. 0.25", fam(250.0)),
    ("S.a. 0.250", fam(250.0)),
    ("S.a. 0.5", fam(500.0)),
    ("S.a. 1.0", fam(1000.0)),
    ("S.a. 2.0", fam(2000.0)),
    ("S.a. 4.0", fam(4000.0)),
    ("S.a. 4.00", fam(4000.0)),
    ("S.a. 8.0", fam(8000.0)),
];

pub const GDNR_CONCENTRATIONS: ConcentrationTable = &[
    ("S.a. NTC", both(0.0, 0.0)),
    ("S.a. NTC ", both(0.0, 0.0)),
    ("NTC", both(0.0, 0.0)),
    ("S.a. 0.008", both(8.0, 8.0)),
    ("S.a. 0.0016", both(16.0, 16.0)),
    ("S.a. 0.0156", both(16.0, 16.0)),
    ("S.a. 0.0031", both(31.0, 31.0)),
    ("S.a. 0.0312", both(31.0, 31.0)),
    ("S.a. 0.0063", both(62.0, 62.0)),
    ("S.a. 0.0625", both(62.0, 62.0)),
    ("S.a. 0.125", both(125.0, 125.0)),
    ("S.a. 0.25", both(250.0, 250.0)),
    ("S.a. 0.250", both(250.0, 250.0)),
    ("S.a. 0.5", both(500.0, 500.0)),
    ("S.a. 1.0", both(1000.0, 1000.0)),
    ("S.a. 2.0", both(2000.0, 2000.0)),
    ("S.a. 4.0", both(4000.0, 4000.0)),
    ("S.a. 4.00", both(4000.0, 4000.0)),
    ("S.a. 8.0", both(8000.0, 8000.0)),
];

pub const EGDNR_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC", both(0.0, 0.0)),
    ("RNaseP 0.004", both(4.0, 4.0)),
    ("RNaseP 0.008", both(8.0, 8.0)),
    ("RNaseP 0.016", both(16.0, 16.0)),
    ("RNaseP 0.032", both(32.0, 32.0)),
    ("RNaseP 0.0625", both(63.0, 63.0)),
    ("RNaseP 0.125", both(125.0, 125.0)),
    ("RNaseP 0.25", both(250.0, 250.0)),
    ("RNaseP 0.5", both(500.0, 500.0)),
    ("RNaseP 1.0", both(1000.0, 0.0)),
    ("RNaseP 2.0", both(2000.0, 0.0)),
    ("RNaseP 4.0", both(4000.0, 0.0)),
];

pub const RED_CONCENTRATIONS: ConcentrationTable = &[
    ("NTC", both(0.0, 0.0)),
    ("0% Mutant, 1cpd WT", fam(0.0)),
    ("0.01% Mutant, 1cpd WT", fam(0.1)),
    ("0.05% Mutant, 1cpd WT", fam(0.5)),
    ("0.1% Mutant, 1cpd WT", fam(1.0)),
    ("0.5% Mutant, 1cpd WT", fam(5.0)),
    ("1% Mutant, 1cpd WT", fam(10.0)),
    ("0.01cpd Mutant, 0 WT", fam(10.0)),
    ("0% Mutant, 2cpd WT", fam(0.0)),
    ("0.01% Mutant, 2cpd WT", fam(0.2)),
    ("0.05% Mutant, 2cpd WT", fam(1.0)),
    ("0.1% Mutant, 2cpd WT", fam(2.0)),
    ("0.5% Mutant, 2cpd WT", fam(10.0)),
    ("1% Mutant, 2cpd WT", fam(20.0)),
    ("0.02cpd Mutant, 0 WT", fam(20.0)),
    ("0% Mutant, 2.5cpd WT", fam(0.0)),
    ("0% Mutant, 2.5 cpd WT", fam(0.0)),
    ("0.01% Mutant, 2.5cpd WT", fam(0.25)),
    ("0.05% Mutant, 2.5cpd WT", fam(1.25)),
    ("0.1% Mutant, 2.5cpd WT", fam(2.5)),
    ("0.5% Mutant, 2.5cpd WT", fam(12.5)),
    ("1% Mutant, 2.5cpd WT", fam(25.0)),
    ("0.025 cpd Mutant, 0 WT", fam(25.0)),
    ("0.025cpd Mutant, 0 WT", fam(25.0)),
    ("0% Mutant, 5cpd WT", fam(0.0)),
    ("0.01% Mutant, 5cpd WT", fam(0.5)),
    ("0.05% Mutant, 5cpd WT", fam(2.5)),
    ("0.2% Mutant, 5cpd WT", fam(10.0)),
    ("0.02% Mutant, 5cpd WT", fam(1.0)),
    ("0.002% Mutant, 5cpd WT", fam(0.1)),
    ("0.1% Mutant, 5cpd WT", fam(5.0)),
    ("0.5% Mutant, 5cpd WT", fam(25.0)),
    ("1% Mutant, 5cpd WT", fam(50.0)),
    ("0.05cpd Mutant, 0 WT", fam(50.0)),
];

pub const HIGH_DNR_CONCENTRATIONS: ConcentrationTable = &[
    ("Stealth", NONE),
    ("SA DNR 0.001", fam(1.0)),
    ("SA DNR 0.01", fam(10.0)),
    ("SA DNR 0.1", fam(100.0)),
    ("SA DNR 1.0", fam(1000.0)),
    ("SA DNR 5", fam(5000.0)),
];

pub const CARRYOVER_CONCENTRATIONS: ConcentrationTable = &[
    ("S.a. 1.5cpd", fam(1500.0)),
    ("S.a. 1cpd", fam(1000.0)),
    ("Staph", fam(1000.0)),
    ("staph", fam(1000.0)),
    ("stealth", NONE),
    ("Stealth", NONE),
];

pub const CNV_COPY_NUMBERS: CnvTable = &[
    ("NA11994 CN1", Some(1.0)),
    ("NTC", None),
    ("NA18507 CN2", Some(2.0)),
    ("NA19108 CN2", Some(2.0)),
    ("NA18502 CN3", Some(3.0)),
    ("NA18916 CN6", Some(6.0)),
    ("NA19221 CN4", Some(4.0)),
    ("NA19205 CN5", Some(5.0)),
];

pub const CNV200_COPY_NUMBERS: CnvTable = &[
    ("NTC", None),
    ("CN1", Some(1.0)),
    ("CN2", Some(2.0)),
    ("CN3", Some(3.0)),
    ("CN4", Some(4.0)),
    ("CN5", Some(5.0)),
    ("CN6", Some(6.0)),
    ("CN11", Some(11.0)),
    ("CN13", Some(13.0)),
    (" CN1", Some(1.0)),
    (" CN2", Some(2.0)),
    (" CN3", Some(3.0)),
    (" CN4", Some(4.0)),
    (" CN5", Some(5.0)),
    (" CN6", Some(6.0)),
    (" CN11", Some(11.0)),
    (" CN13", Some(13.0)),
];

const FAM_ONLY: [bool; 2] = [true, false];
const VIC_ONLY: [bool; 2] = [false, true];
const NEITHER: [bool; 2] = [false, false];
const BOTH: [bool; 2] = [true, true];

pub const DNR200_THRESHOLDS: ThresholdTable = &[
    ("NTC", NEITHER),
    ("0.005 cpd", NEITHER),
    ("0.010 cpd", FAM_ONLY),
    ("0.020 cpd", FAM_ONLY),
    ("0.039 cpd", FAM_ONLY),
    ("0.078 cpd", FAM_ONLY),
    ("0.156 cpd", FAM_ONLY),
    ("0.313 cpd", FAM_ONLY),
    ("0.625 cpd", FAM_ONLY),
    ("1.25 cpd", FAM_ONLY),
    ("2.5 cpd", FAM_ONLY),
    ("5 cpd", FAM_ONLY),
];

pub const DPLEX200_THRESHOLDS: ThresholdTable = &[("NTC/1cpd Ch2", VIC_ONLY)];

pub const EG200_THRESHOLDS: ThresholdTable = &[("NTC", NEITHER), ("0.5", FAM_ONLY)];

pub const TQ200_THRESHOLDS: ThresholdTable = &[
    ("NTC Ch1", NEITHER),
    ("NTC Ch2", NEITHER),
    ("0.5 Ch1", FAM_ONLY),
    ("0.5 Ch2", VIC_ONLY),
];

pub const SINGLEPLEX_THRESHOLDS: ThresholdTable =
    &[("SA singleplex 1.0", FAM_ONLY), ("0.5cpd", FAM_ONLY)];

pub const DUPLEX_THRESHOLDS: ThresholdTable = &[("NTC", VIC_ONLY)];

pub const GDNR_THRESHOLDS: ThresholdTable =
    &[("S.a. NTC", NEITHER), ("S.a. NTC ", NEITHER), ("NTC", NEITHER)];

pub const EGDNR_THRESHOLDS: ThresholdTable = &[
    ("NTC", NEITHER),
    ("RNaseP 1.0", FAM_ONLY),
    ("RNaseP 2.0", FAM_ONLY),
    ("RNaseP 4.0", FAM_ONLY),
];

pub const STAPH2X10_THRESHOLDS: ThresholdTable = &[
    ("S.a. NTC", NEITHER),
    ("S.a. NTC ", NEITHER),
    ("NTC", NEITHER),
    ("S.a. 0.008", FAM_ONLY),
    ("S.a. 0.0016", FAM_ONLY),
    ("S.a. 0.0156", FAM_ONLY),
    ("S.a. 0.0031", FAM_ONLY),
    ("S.a. 0.0312", FAM_ONLY),
    ("S.a. 0.0063", FAM_ONLY),
    ("S.a. 0.0625", FAM_ONLY),
    ("S.a. 0.125", FAM_ONLY),
    ("S.a. 0.25", FAM_ONLY),
    ("S.a. 0.250", FAM_ONLY),
    ("S.a. 0.5", FAM_ONLY),
    ("S.a. 1.0", FAM_ONLY),
    ("S.a. 2.0", FAM_ONLY),
    ("S.a. 4.0", FAM_ONLY),
    ("S.a. 4.00", FAM_ONLY),
    ("S.a. 8.0", FAM_ONLY),
];

pub const CNV_THRESHOLDS: ThresholdTable = &[("NTC", NEITHER)];

pub const RED_THRESHOLDS: ThresholdTable = &[
    ("NTC", NEITHER),
    ("0% Mutant, 1cpd WT", NEITHER),
    ("0.01% Mutant, 1cpd WT", NEITHER),
    ("0.05% Mutant, 1cpd WT", NEITHER),
    ("0.1% Mutant, 1cpd WT", FAM_ONLY),
    ("0.5% Mutant, 1cpd WT", FAM_ONLY),
    ("1% Mutant, 1cpd WT", FAM_ONLY),
    ("0.01cpd Mutant, 0 WT", BOTH),
    ("0% Mutant, 2cpd WT", NEITHER),
    ("0.01% Mutant, 2cpd WT", NEITHER),
    ("0.05% Mutant, 2cpd WT", FAM_ONLY),
    ("0.1% Mutant, 2cpd WT", FAM_ONLY),
    ("0.5% Mutant, 2cpd WT", FAM_ONLY),
    ("1% Mutant, 2cpd WT", FAM_ONLY),
    ("0.02cpd Mutant, 0 WT", BOTH),
    ("0% Mutant, 2.5cpd WT", NEITHER),
    ("0% Mutant, 2.5 cpd WT", NEITHER),
    ("0.01% Mutant, 2.5cpd WT", NEITHER),
    ("0.05% Mutant, 2.5cpd WT", FAM_ONLY),
    ("0.1% Mutant, 2.5cpd WT", FAM_ONLY),
    ("0.5% Mutant, 2.5cpd WT", FAM_ONLY),
    ("1% Mutant, 2.5cpd WT", FAM_ONLY),
    ("0.025 cpd Mutant, 0 WT", BOTH),
    ("0.025cpd Mutant, 0 WT", BOTH),
    ("0.01% Mutant, 5cpd WT", NEITHER),
    ("0% Mutant, 5cpd WT", NEITHER),
    ("0.05% Mutant, 5cpd WT", FAM_ONLY),
    ("0.2% Mutant, 5cpd WT", FAM_ONLY),
    ("0.02% Mutant, 5cpd WT", FAM_ONLY),
    ("0.002% Mutant, 5cpd WT", FAM_ONLY),
    ("0.1% Mutant, 5cpd WT", FAM_ONLY),
    ("0.5% Mutant, 5cpd WT", FAM_ONLY),
    ("1% Mutant, 5cpd WT", FAM_ONLY),
    ("0.05cpd Mutant, 0 WT", BOTH),
];

pub const FPFN_THRESHOLDS: ThresholdTable = &[
    ("NTC", NEITHER),
    ("NA19205 7.5ng/uL undigested", VIC_ONLY),
    ("NA19205 3.3ng/uL undigested", VIC_ONLY),
    ("NA19205 50ng/uL digested", NEITHER),
];

pub const DNR_THRESHOLDS: ThresholdTable = &[
    ("Stealth", NEITHER),
    ("SA DNR 0.001", FAM_ONLY),
    ("SA DNR 0.01", FAM_ONLY),
    ("SA DNR 0.1", FAM_ONLY),
    ("SA DNR 1.0", FAM_ONLY),
    ("SA DNR 5", FAM_ONLY),
];

/// Saturated wells of the FP/FN layout.
pub const FPFN_POSITIVE_WELLS: &[&str] = &[
    "A02", "A03", "B01", "A08", "A09", "B07", "E02", "E03", "F01", "E08", "E09", "F07",
];

/// NTC wells of the FP/FN layout.
pub const FPFN_NEGATIVE_WELLS: &[&str] = &[
    "A01", "B03", "B06", "A07", "B09", "B12", "E01", "F03", "F06", "E07", "F09", "F12",
];

pub const FPFN_FP_MEASUREMENT_WELLS: &[&str] = &["B03", "B06", "B09", "B12", "F03", "F06", "F09", "F12"];

pub const FPFN_FN_MEASUREMENT_WELLS: &[&str] = &["A03", "A09", "E03", "E09"];

pub const RED_FP_THRESHOLD_SAMPLES: &[&str] = &["1% Mutant, 1cpd WT", "0.2% Mutant, 5cpd WT"];
pub const RED_FP_MEASUREMENT_SAMPLES: &[&str] = &["0% Mutant, 1cpd WT", "0% Mutant, 5cpd WT"];
pub const AV_FP_THRESHOLD_SAMPLES: &[&str] = &["1% Mutant, 1cpd WT"];
pub const AV_FP_MEASUREMENT_SAMPLES: &[&str] = &["0% Mutant, 1cpd WT"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concentration_lookup() {
        assert_eq!(expected_concentration(DUPLEX_CONCENTRATIONS, Some("S.a. 0.5"), 0), Some(500.0));
        assert_eq!(expected_concentration(DUPLEX_CONCENTRATIONS, Some("S.a. 0.5"), 1), Some(1000.0));
        assert_eq!(expected_concentration(TQ200_CONCENTRATIONS, Some("NTC Ch2"), 0), None);
        assert_eq!(expected_concentration(SINGLEPLEX_CONCENTRATIONS, Some("unknown"), 0), None);
        assert_eq!(expected_concentration(SINGLEPLEX_CONCENTRATIONS, None, 0), None);
    }

    #[test]
    fn test_threshold_lookup_defaults_to_expected() {
        assert!(!threshold_expected(DUPLEX_THRESHOLDS, Some("NTC"), 0));
        assert!(threshold_expected(DUPLEX_THRESHOLDS, Some("NTC"), 1));
        assert!(threshold_expected(DUPLEX_THRESHOLDS, Some("S.a. 0.5"), 0));
        assert!(threshold_expected(DUPLEX_THRESHOLDS, None, 1));
    }

    #[test]
    fn test_cnv_lookup() {
        assert_eq!(expected_cnv(CNV_COPY_NUMBERS, Some("NA18502 CN3")), Some(3.0));
        assert_eq!(expected_cnv(CNV_COPY_NUMBERS, Some("NTC")), None);
        assert_eq!(expected_cnv(CNV200_COPY_NUMBERS, Some(" CN13")), Some(13.0));
    }
}
