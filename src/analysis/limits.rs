//! Certification limits, resolved per hardware generation.

use crate::config::LimitTable;

/// Caller overrides for the event-count and quality limits.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LimitOverrides {
    pub low_event_count: Option<i64>,
    pub low_event_count_eva: Option<i64>,
    pub low_data_quality: Option<f64>,
    pub accepted_event_cutoff: Option<i64>,
}

/// An allowed fraction of failing wells, e.g. at most 1 in 48.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerance {
    pub numerator: i64,
    pub denominator: f64,
}

impl Tolerance {
    const fn new(numerator: i64, denominator: f64) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    fn or(numerator: Option<i64>, denominator: Option<f64>, default: Tolerance) -> Self {
        Self {
            numerator: numerator.unwrap_or(default.numerator),
            denominator: denominator.unwrap_or(default.denominator),
        }
    }

    /// Whether `failing` out of `total` is within tolerance. An empty
    /// population never passes.
    pub fn allows(&self, failing: usize, total: usize) -> bool {
        if total == 0 {
            return false;
        }
        failing as f64 / total as f64 <= self.numerator as f64 / self.denominator
    }

    pub fn describe(&self) -> String {
        format!("<= {}/{}", self.numerator, self.denominator)
    }
}

/// Every certification limit with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitParams {
    /// The key the limits were looked up under, e.g. `QX200.new`.
    pub key: String,

    pub low_event_count: i64,
    pub low_event_count_eva: i64,
    pub low_data_quality: f64,
    pub accepted_event_cutoff: i64,

    pub low_event_fail: Tolerance,
    pub ncc_low_event_fail: Tolerance,
    pub probe_event_fail: Tolerance,
    pub eva_event_fail: Tolerance,
    pub cc_low_event_fail: Tolerance,
    pub low_quality_fail: Tolerance,

    pub singleplex_uniformity_pct: i64,
    pub carryover_per_n_wells: i64,
    pub carryover_n_wells: i64,

    pub fam_amp_350: i64,
    pub vic_amp_350: i64,
    pub hex_amp_350: i64,
    pub fam_amp_lo: i64,
    pub vic_amp_lo: i64,
    pub hex_amp_lo: i64,
    pub ch1_amp_cv: f64,
    pub ch2_amp_cv: f64,
    pub ch1_amp_variation_pct: i64,
    pub ch1_amp_variation_pct_qc: i64,
    pub ch2_amp_variation_pct: i64,
    pub ch2_amp_variation_pct_qc: i64,
    pub hex_amp_lo_variation_pct_qc: i64,

    pub width_gate_min: f64,
    pub width_gate_max: f64,

    pub qc_max_polydispersity: f64,
    pub max_polydispersity: f64,
    pub delta_width_tolerance_max: f64,
    pub delta_width_tolerance_min: f64,
    pub qc_delta_width_tolerance_max: f64,
    pub qc_delta_width_tolerance_min: f64,
}

/// Limits key for a hardware generation and analysis software string.
///
/// QuantaSoft 1.x releases split at 1.7: `QX200` under `QuantaSoft 1.7.4`
/// becomes `QX200.new`, under `QuantaSoft 1.6.2` it becomes `QX200.old`.
/// Anything that does not parse as a three-part 1.x version keeps the bare
/// system version.
pub fn limits_key(system_version: &str, program_version: Option<&str>) -> String {
    let mut key = system_version.to_string();
    let Some(version) = program_version.and_then(|v| v.split_whitespace().nth(1)) else {
        return key;
    };
    let parts: Vec<&str> = version.split('.').collect();
    if parts.len() <= 2 {
        return key;
    }
    if let (Ok(major), Ok(minor)) = (parts[0].parse::<i64>(), parts[1].parse::<i64>()) {
        if major == 1 {
            key.push_str(if minor >= 7 { ".new" } else { ".old" });
        }
    }
    key
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

impl LimitParams {
    /// Resolve limits from an optional table. Each key missing from the
    /// table takes its built-in default on its own.
    pub fn resolve(key: &str, table: Option<&LimitTable>, overrides: &LimitOverrides) -> Self {
        let empty = LimitTable::default();
        let t = table.unwrap_or(&empty);

        let (width_gate_min, width_gate_max) = match t.width_mean {
            Some(mean) if mean > 0.0 => {
                let variation = t.width_variation_pct.unwrap_or(0.0) / 100.0;
                (round2(mean * (1.0 - variation)), round2(mean * (1.0 + variation)))
            }
            _ => (t.width_gate_min.unwrap_or(8.0), t.width_gate_max.unwrap_or(10.0)),
        };

        Self {
            key: key.to_string(),
            low_event_count: overrides.low_event_count.or(t.low_event_count).unwrap_or(12000),
            low_event_count_eva: overrides
                .low_event_count_eva
                .or(t.low_event_count_eva)
                .unwrap_or(12000),
            low_data_quality: overrides.low_data_quality.or(t.low_data_quality).unwrap_or(0.85),
            accepted_event_cutoff: overrides
                .accepted_event_cutoff
                .or(t.accepted_event_cutoff)
                .unwrap_or(1000),

            low_event_fail: Tolerance::or(
                t.low_event_fail_numerator,
                t.low_event_fail_denominator,
                Tolerance::new(1, 48.0),
            ),
            ncc_low_event_fail: Tolerance::or(
                t.ncc_low_event_fail_numerator,
                t.ncc_low_event_fail_denominator,
                Tolerance::new(1, 48.0),
            ),
            probe_event_fail: Tolerance::or(
                t.probe_event_fail_numerator,
                t.probe_event_fail_denominator,
                Tolerance::new(1, 48.0),
            ),
            eva_event_fail: Tolerance::or(
                t.eva_event_fail_numerator,
                t.eva_event_fail_denominator,
                Tolerance::new(0, 1.0),
            ),
            cc_low_event_fail: Tolerance::or(
                t.cc_low_event_fail_numerator,
                t.cc_low_event_fail_denominator,
                Tolerance::new(0, 4.0),
            ),
            low_quality_fail: Tolerance::or(
                t.low_quality_fail_numerator,
                t.low_quality_fail_denominator,
                Tolerance::new(1, 48.0),
            ),

            singleplex_uniformity_pct: t.singleplex_uniformity_pct.unwrap_or(20),
            carryover_per_n_wells: t.carryover_per_n_wells.unwrap_or(2),
            carryover_n_wells: t.carryover_n_wells.unwrap_or(8),

            fam_amp_350: t.fam_amp_350.unwrap_or(20000),
            vic_amp_350: t.vic_amp_350.unwrap_or(10000),
            hex_amp_350: t.hex_amp_350.unwrap_or(8100),
            fam_amp_lo: t.fam_amp_lo.unwrap_or(2285),
            vic_amp_lo: t.vic_amp_lo.unwrap_or(2000),
            hex_amp_lo: t.hex_amp_lo.unwrap_or(1620),
            ch1_amp_cv: t.ch1_amp_cv.unwrap_or(0.045),
            ch2_amp_cv: t.ch2_amp_cv.unwrap_or(0.045),
            ch1_amp_variation_pct: t.ch1_amp_variation_pct.unwrap_or(10),
            ch1_amp_variation_pct_qc: t.ch1_amp_variation_pct_qc.unwrap_or(5),
            ch2_amp_variation_pct: t.ch2_amp_variation_pct.unwrap_or(10),
            ch2_amp_variation_pct_qc: t.ch2_amp_variation_pct_qc.unwrap_or(5),
            hex_amp_lo_variation_pct_qc: t.hex_amp_lo_variation_pct_qc.unwrap_or(20),

            width_gate_min,
            width_gate_max,

            qc_max_polydispersity: t.qc_max_polydispersity.unwrap_or(0.15),
            max_polydispersity: t.max_polydispersity.unwrap_or(0.30),
            delta_width_tolerance_max: t.delta_width_tolerance_max.unwrap_or(0.5),
            delta_width_tolerance_min: t.delta_width_tolerance_min.unwrap_or(-0.5),
            qc_delta_width_tolerance_max: t.qc_delta_width_tolerance_max.unwrap_or(0.4),
            qc_delta_width_tolerance_min: t.qc_delta_width_tolerance_min.unwrap_or(-0.4),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limits_key_version_suffix() {
        assert_eq!(limits_key("QX200", Some("QuantaSoft 1.7.4.0917")), "QX200.new");
        assert_eq!(limits_key("QX200", Some("QuantaSoft 1.6.6.0320")), "QX200.old");
        assert_eq!(limits_key("QX100", Some("QuantaSoft 2.0.1")), "QX100");
        assert_eq!(limits_key("QX100", Some("QuantaSoft 1.7")), "QX100");
        assert_eq!(limits_key("QX100", Some("QuantaSoft")), "QX100");
        assert_eq!(limits_key("QX100", None), "QX100");
    }

    #[test]
    fn test_defaults_apply_per_key() {
        let table = LimitTable {
            low_event_count: Some(15000),
            carryover_n_wells: Some(16),
            ..Default::default()
        };
        let params = LimitParams::resolve("QX200", Some(&table), &LimitOverrides::default());
        assert_eq!(params.low_event_count, 15000);
        assert_eq!(params.carryover_n_wells, 16);
        assert_eq!(params.carryover_per_n_wells, 2);
        assert_eq!(params.low_event_fail, Tolerance::new(1, 48.0));
        assert_eq!(params.fam_amp_350, 20000);
        assert_eq!((params.width_gate_min, params.width_gate_max), (8.0, 10.0));
    }

    #[test]
    fn test_overrides_win_over_table() {
        let table = LimitTable {
            low_event_count: Some(15000),
            low_data_quality: Some(0.9),
            ..Default::default()
        };
        let overrides = LimitOverrides {
            low_event_count: Some(10000),
            ..Default::default()
        };
        let params = LimitParams::resolve("QX100", Some(&table), &overrides);
        assert_eq!(params.low_event_count, 10000);
        assert_eq!(params.low_data_quality, 0.9);
    }

    #[test]
    fn test_width_gates_derive_from_mean() {
        let table = LimitTable {
            width_mean: Some(9.33),
            width_variation_pct: Some(12.5),
            width_gate_min: Some(1.0),
            ..Default::default()
        };
        let params = LimitParams::resolve("QX200", Some(&table), &LimitOverrides::default());
        assert_eq!(params.width_gate_min, 8.16);
        assert_eq!(params.width_gate_max, 10.5);

        let zero_mean = LimitTable {
            width_mean: Some(0.0),
            width_gate_min: Some(7.5),
            ..Default::default()
        };
        let params = LimitParams::resolve("QX200", Some(&zero_mean), &LimitOverrides::default());
        assert_eq!((params.width_gate_min, params.width_gate_max), (7.5, 10.0));
    }

    #[test]
    fn test_tolerance() {
        let tol = Tolerance::new(1, 48.0);
        assert!(tol.allows(1, 48));
        assert!(!tol.allows(2, 48));
        assert!(!tol.allows(0, 0));
        assert_eq!(tol.describe(), "<= 1/48");
    }

    #[test]
    fn test_fractional_tolerance_description() {
        let tol = Tolerance::new(1, 2.5);
        assert!(tol.allows(1, 3));
        assert!(!tol.allows(1, 2));
        assert_eq!(tol.describe(), "<= 1/2.5");
    }
}
