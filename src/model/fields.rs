//! Static field registry for metric records.
//!
//! Each record type gets an enum naming its reportable fields, with a
//! display name, whether the comparison views offer it, whether it reads
//! as a percentage, and a typed accessor. Aggregation and CSV export go
//! through these enums instead of looking fields up by string.

use std::fmt;
use std::str::FromStr;

use super::metrics::{PlateMetric, WellChannelMetric, WellMetric};

/// Conversion of a stored metric value to a number for statistics.
pub trait FieldValue {
    fn to_f64(self) -> Option<f64>;
}

impl FieldValue for f64 {
    fn to_f64(self) -> Option<f64> {
        Some(self)
    }
}

impl FieldValue for usize {
    fn to_f64(self) -> Option<f64> {
        Some(self as f64)
    }
}

impl FieldValue for Option<f64> {
    fn to_f64(self) -> Option<f64> {
        self
    }
}

impl FieldValue for Option<usize> {
    fn to_f64(self) -> Option<f64> {
        self.map(|v| v as f64)
    }
}

macro_rules! field_registry {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident for $record:ty {
            $(
                $variant:ident => $field:literal, $display:literal,
                comparable: $comparable:literal, percent: $percent:literal,
                |$r:ident| $value:expr;
            )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $($variant,)*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant,)*];

            /// Snake-case field name, as used on the command line and in CSV keys.
            pub fn name(&self) -> &'static str {
                match self {
                    $($name::$variant => $field,)*
                }
            }

            pub fn display_name(&self) -> &'static str {
                match self {
                    $($name::$variant => $display,)*
                }
            }

            pub fn comparable(&self) -> bool {
                match self {
                    $($name::$variant => $comparable,)*
                }
            }

            pub fn percent(&self) -> bool {
                match self {
                    $($name::$variant => $percent,)*
                }
            }

            pub fn value(&self, record: &$record) -> Option<f64> {
                match self {
                    $($name::$variant => {
                        let $r = record;
                        FieldValue::to_f64($value)
                    })*
                }
            }

            pub fn comparable_fields() -> impl Iterator<Item = $name> {
                Self::ALL.iter().copied().filter(|f| f.comparable())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::ALL
                    .iter()
                    .copied()
                    .find(|f| f.name() == s)
                    .ok_or_else(|| format!("Unknown {} field: {}", stringify!($name), s))
            }
        }
    };
}

field_registry! {
    /// Plate-level fields.
    pub enum PlateField for PlateMetric {
        CarryoverPeaks => "carryover_peaks", "Carryover Peaks",
            comparable: true, percent: false, |r| r.carryover_peaks;
        GatedContaminationPeaks => "gated_contamination_peaks", "Gated Contamination Peaks",
            comparable: true, percent: false, |r| r.gated_contamination_peaks;
        ContaminationPeaks => "contamination_peaks", "Contamination Peaks",
            comparable: true, percent: false, |r| r.contamination_peaks;
        StealthWells => "stealth_wells", "Stealth Wells",
            comparable: false, percent: false, |r| r.stealth_wells;
        SoftwarePmtGainFam => "software_pmt_gain_fam", "Software PMT Gain (FAM)",
            comparable: true, percent: false, |r| r.software_pmt_gain_fam;
        SoftwarePmtGainVic => "software_pmt_gain_vic", "Software PMT Gain (VIC)",
            comparable: true, percent: false, |r| r.software_pmt_gain_vic;
        FamNormalOffset => "fam_normal_offset", "FAM Normal Offset",
            comparable: true, percent: false, |r| r.fam_normal_offset;
        VicNormalOffset => "vic_normal_offset", "VIC Normal Offset",
            comparable: true, percent: false, |r| r.vic_normal_offset;
        FamvicNormalOffset => "famvic_normal_offset", "FAM/VIC Normal Offset",
            comparable: true, percent: false, |r| r.famvic_normal_offset;
        FamvicOriginOffset => "famvic_origin_offset", "FAM/VIC Origin Offset",
            comparable: true, percent: false, |r| r.famvic_origin_offset;
        HiClusterRain => "hi_cluster_rain", "HI Cluster Rain",
            comparable: true, percent: false, |r| r.hi_cluster_rain;
        LoClusterRain => "lo_cluster_rain", "LO Cluster Rain",
            comparable: true, percent: false, |r| r.lo_cluster_rain;
    }
}

field_registry! {
    /// Well-level fields.
    pub enum WellField for WellMetric {
        AcceptedEventCount => "accepted_event_count", "Accepted Events",
            comparable: true, percent: false, |r| r.accepted_event_count;
        TotalEventCount => "total_event_count", "Total Events",
            comparable: true, percent: false, |r| r.total_event_count;
        TriggeredEventCount => "triggered_event_count", "Triggered Events",
            comparable: false, percent: false, |r| r.triggered_event_count();
        GatedOutEventPct => "gated_out_event_pct", "Gated Out Events (%)",
            comparable: true, percent: true, |r| r.gated_out_event_pct();
        WidthMean => "width_mean", "Width Mean",
            comparable: true, percent: false, |r| r.width_mean;
        WidthVariance => "width_variance", "Width Stdev",
            comparable: true, percent: false, |r| r.width_variance;
        WidthCv => "width_cv", "Width CV (%)",
            comparable: false, percent: true, |r| r.width_cv();
        AcceptedWidthMean => "accepted_width_mean", "Accepted Width Mean",
            comparable: true, percent: false, |r| r.accepted_width_mean;
        AcceptedWidthStdev => "accepted_width_stdev", "Accepted Width Stdev",
            comparable: true, percent: false, |r| r.accepted_width_stdev;
        AcceptedWidthCv => "accepted_width_cv", "Accepted Width CV (%)",
            comparable: false, percent: true, |r| r.accepted_width_cv();
        Cnv => "cnv", "CNV",
            comparable: true, percent: false, |r| r.cnv;
        CnvLowerBound => "cnv_lower_bound", "CNV Lower Bound",
            comparable: false, percent: false, |r| r.cnv_lower_bound;
        CnvUpperBound => "cnv_upper_bound", "CNV Upper Bound",
            comparable: false, percent: false, |r| r.cnv_upper_bound;
        InverseCnv => "inverse_cnv", "Inverse CNV",
            comparable: true, percent: false, |r| r.inverse_cnv;
        ExpectedCnv => "expected_cnv", "Expected CNV",
            comparable: false, percent: false, |r| r.expected_cnv;
        CnvRiseRatio => "cnv_rise_ratio", "CNV Rise Ratio (4Q/1Q)",
            comparable: true, percent: false, |r| r.cnv_rise_ratio;
        RejectedPeaks => "rejected_peaks", "Rejected Peaks",
            comparable: true, percent: false, |r| r.rejected_peaks;
        RejectedPeakRatio => "rejected_peak_ratio", "Rejected Peaks (%)",
            comparable: false, percent: true, |r| r.rejected_peak_ratio();
        VerticalStreakEvents => "vertical_streak_events", "Vertical Streak Events",
            comparable: true, percent: false, |r| r.vertical_streak_events;
        VerticalStreakRatio => "vertical_streak_ratio", "Vertical Streak Events (%)",
            comparable: false, percent: true, |r| r.vertical_streak_ratio();
        MinAmplitudePeaks => "min_amplitude_peaks", "Below Min Amplitude Peaks",
            comparable: true, percent: false, |r| r.min_amplitude_peaks;
        MinAmplitudeRatio => "min_amplitude_ratio", "Below Min Amplitude Peaks (%)",
            comparable: false, percent: true, |r| r.min_amplitude_ratio();
        NullLinkage => "null_linkage", "Null Linkage",
            comparable: true, percent: false, |r| r.null_linkage;
        BalanceScore => "balance_score", "B-Score",
            comparable: true, percent: false, |r| r.balance_score;
        FragmentationProbability => "fragmentation_probability", "Fragmentation Probability (%)",
            comparable: true, percent: true, |r| r.fragmentation_probability_pct();
        SumBaselineMean => "sum_baseline_mean", "Summed Baseline Mean",
            comparable: true, percent: false, |r| r.sum_baseline_mean;
        SumBaselineStdev => "sum_baseline_stdev", "Summed Baseline Stdev",
            comparable: true, percent: false, |r| r.sum_baseline_stdev;
        CarryoverPeaks => "carryover_peaks", "Carryover Peaks",
            comparable: true, percent: false, |r| r.carryover_peaks;
        ShortIntervalCount => "short_interval_count", "Narrow Droplet Spacings",
            comparable: true, percent: false, |r| r.short_interval_count;
        ShortIntervalCountRatio => "short_interval_count_ratio", "Narrow Droplet Spacings (%)",
            comparable: false, percent: true, |r| r.short_interval_count_ratio();
        AirDroplets => "air_droplets", "Air Droplets",
            comparable: true, percent: false, |r| r.air_droplets;
        DiagonalScatter => "diagonal_scatter", "Diagonal Scatter",
            comparable: true, percent: false, |r| r.diagonal_scatter;
        DiagonalScatterPct => "diagonal_scatter_pct", "Diagonal Scatter (%)",
            comparable: true, percent: true, |r| r.diagonal_scatter_pct;
        DeltaWidths => "delta_widths", "FAM-VIC Width Delta",
            comparable: true, percent: false, |r| r.delta_widths();
    }
}

field_registry! {
    /// Per-channel fields.
    pub enum ChannelField for WellChannelMetric {
        Threshold => "threshold", "Threshold",
            comparable: true, percent: false, |r| r.threshold;
        ThresholdConf => "threshold_conf", "Threshold Confidence",
            comparable: true, percent: false, |r| r.threshold_conf;
        ManualThreshold => "manual_threshold", "Assigned Threshold",
            comparable: false, percent: false, |r| r.manual_threshold;
        MinWidthGate => "min_width_gate", "Min Width Gate",
            comparable: true, percent: false, |r| r.min_width_gate;
        MaxWidthGate => "max_width_gate", "Max Width Gate",
            comparable: true, percent: false, |r| r.max_width_gate;
        MinQualityGating => "min_quality_gating", "Min Quality Gate",
            comparable: true, percent: false, |r| r.min_quality_gating;
        Concentration => "concentration", "Concentration",
            comparable: true, percent: false, |r| r.concentration;
        ConcLowerBound => "conc_lower_bound", "Concentration Lower Bound",
            comparable: false, percent: false, |r| r.conc_lower_bound;
        ConcUpperBound => "conc_upper_bound", "Concentration Upper Bound",
            comparable: false, percent: false, |r| r.conc_upper_bound;
        ExpectedConcentration => "expected_concentration", "Expected Concentration",
            comparable: false, percent: false, |r| r.expected_concentration;
        PositivePeaks => "positive_peaks", "Positive Peaks",
            comparable: true, percent: false, |r| r.positive_peaks;
        NegativePeaks => "negative_peaks", "Negative Peaks",
            comparable: true, percent: false, |r| r.negative_peaks;
        WidthGatedPeaks => "width_gated_peaks", "Width Gated Peaks",
            comparable: true, percent: false, |r| r.width_gated_peaks;
        QualityGatedPeaks => "quality_gated_peaks", "Quality Gated Peaks",
            comparable: true, percent: false, |r| r.quality_gated_peaks;
        FalsePositivePeaks => "false_positive_peaks", "False Positives",
            comparable: true, percent: false, |r| r.false_positive_peaks;
        FalseNegativePeaks => "false_negative_peaks", "False Negatives",
            comparable: true, percent: false, |r| r.false_negative_peaks;
        CarryoverPeaks => "carryover_peaks", "Carryover Peaks",
            comparable: false, percent: false, |r| r.carryover_peaks;
        TotalEventsAmplitudeMean => "total_events_amplitude_mean", "All Events Amplitude Mean",
            comparable: true, percent: false, |r| r.total_events_amplitude_mean;
        TotalEventsAmplitudeStdev => "total_events_amplitude_stdev", "All Events Amplitude Stdev",
            comparable: true, percent: false, |r| r.total_events_amplitude_stdev;
        TotalEventsAmplitudeCvPct => "total_events_amplitude_cv_pct", "All Events Amplitude CV (%)",
            comparable: false, percent: true, |r| r.total_events_amplitude_cv_pct();
        AmplitudeMean => "amplitude_mean", "Amplitude Mean",
            comparable: true, percent: false, |r| r.amplitude_mean;
        AmplitudeStdev => "amplitude_stdev", "Amplitude Stdev",
            comparable: true, percent: false, |r| r.amplitude_stdev;
        AmplitudeCvPct => "amplitude_cv_pct", "Amplitude CV (%)",
            comparable: false, percent: true, |r| r.amplitude_cv_pct();
        PositiveMean => "positive_mean", "Positive Amplitude Mean",
            comparable: true, percent: false, |r| r.positive_mean;
        PositiveStdev => "positive_stdev", "Positive Amplitude Stdev",
            comparable: true, percent: false, |r| r.positive_stdev;
        PositiveAmplitudeCvPct => "positive_amplitude_cv_pct", "Positive Amplitude CV (%)",
            comparable: false, percent: true, |r| r.positive_amplitude_cv_pct();
        NegativeMean => "negative_mean", "Negative Amplitude Mean",
            comparable: true, percent: false, |r| r.negative_mean;
        NegativeStdev => "negative_stdev", "Negative Amplitude Stdev",
            comparable: true, percent: false, |r| r.negative_stdev;
        NonpositiveMean => "nonpositive_mean", "Nonpositive Amplitude Mean",
            comparable: false, percent: false, |r| r.nonpositive_mean();
        NonpositiveStdev => "nonpositive_stdev", "Nonpositive Amplitude Stdev",
            comparable: false, percent: false, |r| r.nonpositive_stdev();
        NonpositiveAmplitudeCvPct => "nonpositive_amplitude_cv_pct", "Nonpositive Amplitude CV (%)",
            comparable: false, percent: true, |r| r.nonpositive_amplitude_cv_pct();
        MeanPosNegRatio => "mean_pos_neg_ratio", "Positive/Negative Mean Ratio",
            comparable: false, percent: false, |r| r.mean_pos_neg_ratio();
        PositiveSnr => "positive_snr", "Positive SNR",
            comparable: false, percent: false, |r| r.positive_snr();
        NonpositiveSnr => "nonpositive_snr", "Nonpositive SNR",
            comparable: false, percent: false, |r| r.nonpositive_snr();
        SValue => "s_value", "S-Value",
            comparable: true, percent: false, |r| r.s_value;
        RainPPlusPct => "rain_p_plus_pct", "Rain Above Positive (%)",
            comparable: true, percent: true, |r| r.rain_p_plus_pct();
        RainPPct => "rain_p_pct", "Rain Between Clusters (%)",
            comparable: true, percent: true, |r| r.rain_p_pct();
        RainPMinusPct => "rain_p_minus_pct", "Rain Below Negative (%)",
            comparable: true, percent: true, |r| r.rain_p_minus_pct();
        PositiveSkew => "positive_skew", "Positive Skew",
            comparable: true, percent: false, |r| r.positive_skew;
        PositiveKurtosis => "positive_kurtosis", "Positive Kurtosis",
            comparable: true, percent: false, |r| r.positive_kurtosis;
        NonpositiveSkew => "nonpositive_skew", "Nonpositive Skew",
            comparable: true, percent: false, |r| r.nonpositive_skew;
        NonpositiveKurtosis => "nonpositive_kurtosis", "Nonpositive Kurtosis",
            comparable: true, percent: false, |r| r.nonpositive_kurtosis;
        ConcentrationRiseRatio => "concentration_rise_ratio", "Concentration Rise Ratio (4Q/1Q)",
            comparable: true, percent: false, |r| r.concentration_rise_ratio;
        BaselineMean => "baseline_mean", "Baseline Mean",
            comparable: true, percent: false, |r| r.baseline_mean;
        BaselineStdev => "baseline_stdev", "Baseline Stdev",
            comparable: true, percent: false, |r| r.baseline_stdev;
        PolydispersityPct => "polydispersity_pct", "Polydispersity (%)",
            comparable: true, percent: true, |r| r.polydispersity_pct();
        RevbPolydispersityPct => "revb_polydispersity_pct", "Binned Polydispersity (%)",
            comparable: true, percent: true, |r| r.revb_polydispersity_pct();
        ExtraclusterPct => "extracluster_pct", "Extracluster (%)",
            comparable: true, percent: true, |r| r.extracluster_pct();
        RevbExtraclusterPct => "revb_extracluster_pct", "Binned Extracluster (%)",
            comparable: true, percent: true, |r| r.revb_extracluster_pct();
        GapRainDroplets => "gap_rain_droplets", "Gap Rain Droplets",
            comparable: true, percent: false, |r| r.gap_rain_droplets;
        ClusterConf => "cluster_conf", "Cluster Confidence",
            comparable: true, percent: false, |r| r.cluster_conf;
        NtcPositives => "ntc_positives", "NTC Positives",
            comparable: true, percent: false, |r| r.ntc_positives;
        S2dValue => "s2d_value", "S2D Value",
            comparable: true, percent: false, |r| r.s2d_value;
        HighFlierValue => "high_flier_value", "High Fliers",
            comparable: true, percent: false, |r| r.high_flier_value;
        HighFlierPct => "high_flier_pct", "High Fliers (%)",
            comparable: false, percent: true, |r| r.high_flier_pct();
        LowFlierValue => "low_flier_value", "Low Fliers",
            comparable: true, percent: false, |r| r.low_flier_value;
        LowFlierPct => "low_flier_pct", "Low Fliers (%)",
            comparable: false, percent: true, |r| r.low_flier_pct();
        SingleRainValue => "single_rain_value", "Single Rain",
            comparable: true, percent: false, |r| r.single_rain_value;
        SingleRainPct => "single_rain_pct", "Single Rain (%)",
            comparable: true, percent: true, |r| r.single_rain_pct;
        DoubleRainValue => "double_rain_value", "Double Rain",
            comparable: true, percent: false, |r| r.double_rain_value;
        DoubleRainPct => "double_rain_pct", "Double Rain (%)",
            comparable: true, percent: true, |r| r.double_rain_pct;
        WidthMeanHi => "width_mean_hi", "HI Cluster Width Mean",
            comparable: true, percent: false, |r| r.width_mean_hi;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WellName;

    #[test]
    fn test_names_round_trip() {
        for field in WellField::ALL {
            assert_eq!(field.name().parse::<WellField>().unwrap(), *field);
        }
        for field in ChannelField::ALL {
            assert_eq!(field.to_string().parse::<ChannelField>().unwrap(), *field);
        }
        assert!("nonexistent".parse::<PlateField>().is_err());
    }

    #[test]
    fn test_percent_fields_read_scaled_values() {
        let mut wcm = WellChannelMetric::new(0);
        wcm.polydispersity = Some(0.02);
        assert!(ChannelField::PolydispersityPct.percent());
        assert_eq!(ChannelField::PolydispersityPct.value(&wcm), Some(2.0));
        assert_eq!(ChannelField::ExtraclusterPct.value(&wcm), None);
    }

    #[test]
    fn test_counts_read_as_numbers() {
        let mut wm = WellMetric::new("A01".parse::<WellName>().unwrap());
        wm.accepted_event_count = 15000;
        wm.carryover_peaks = None;
        assert_eq!(WellField::AcceptedEventCount.value(&wm), Some(15000.0));
        assert_eq!(WellField::CarryoverPeaks.value(&wm), None);
        assert!(WellField::comparable_fields().all(|f| f.comparable()));
    }
}
