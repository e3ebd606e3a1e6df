//! Configuration management for ddqc.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ConfigError;
use crate::model::ReprocessConfig;

pub mod paths;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the config file (set after loading)
    #[serde(skip)]
    pub path: PathBuf,

    /// Metric engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Metric store location
    #[serde(default)]
    pub store: StoreConfig,

    /// Batch processing settings
    #[serde(default)]
    pub batch: BatchConfig,

    /// Named peak-detection reprocessing bundles
    #[serde(default)]
    pub reprocess_configs: Vec<ReprocessConfig>,

    /// Certification limits keyed by system version, e.g. `QX200.new`
    #[serde(default)]
    pub limits: BTreeMap<String, LimitTable>,
}

impl Config {
    /// Load configuration from the default path or environment.
    pub fn load() -> Result<Self> {
        let config_path = paths::config_file();
        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()).into());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .map_err(ConfigError::Parse)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.path = path.to_path_buf();
        config.validate()?;

        Ok(config)
    }

    /// Like [`Config::load_from`], but a missing file gives the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self {
                path: path.to_path_buf(),
                ..Self::default()
            });
        }
        Self::load_from(path)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        let mut ids = HashSet::new();
        let mut codes = HashSet::new();
        for rc in &self.reprocess_configs {
            if !ids.insert(rc.id) {
                anyhow::bail!("Duplicate reprocess config id {}", rc.id);
            }
            if rc.code.is_empty() {
                anyhow::bail!("Reprocess config {} has empty code", rc.id);
            }
            if !codes.insert(rc.code.as_str()) {
                anyhow::bail!("Duplicate reprocess config code '{}'", rc.code);
            }
        }

        for (key, table) in &self.limits {
            if key.trim().is_empty() {
                anyhow::bail!("Limits table has empty key");
            }
            table
                .validate()
                .with_context(|| format!("Invalid limits table '{}'", key))?;
        }

        if self.batch.plate_glob.is_empty() {
            anyhow::bail!("batch.plate_glob is empty");
        }

        Ok(())
    }

    pub fn reprocess_config(&self, code: &str) -> Option<&ReprocessConfig> {
        self.reprocess_configs.iter().find(|rc| rc.code == code)
    }

    pub fn reprocess_config_by_id(&self, id: u32) -> Option<&ReprocessConfig> {
        self.reprocess_configs.iter().find(|rc| rc.id == id)
    }

    /// Resolve an optional `--reprocess` code against the configured bundles.
    pub fn resolve_reprocess(&self, code: Option<&str>) -> Result<Option<&ReprocessConfig>> {
        match code {
            None => Ok(None),
            Some(code) => self
                .reprocess_config(code)
                .map(Some)
                .with_context(|| format!("Unknown reprocess config '{}'", code)),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            engine: EngineConfig::default(),
            store: StoreConfig::default(),
            batch: BatchConfig::default(),
            reprocess_configs: Vec::new(),
            limits: BTreeMap::new(),
        }
    }
}

/// Metric engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// FAM amplitude above which an NTC droplet counts as positive
    #[serde(default = "default_ntc_fam_threshold")]
    pub ntc_fam_threshold: f64,

    /// VIC amplitude above which an NTC droplet counts as positive
    #[serde(default = "default_ntc_vic_threshold")]
    pub ntc_vic_threshold: f64,

    /// System version assumed for plates that do not record one
    #[serde(default = "default_system_version")]
    pub default_system_version: String,
}

fn default_ntc_fam_threshold() -> f64 {
    4000.0
}

fn default_ntc_vic_threshold() -> f64 {
    2000.0
}

fn default_system_version() -> String {
    "QX100".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            ntc_fam_threshold: default_ntc_fam_threshold(),
            ntc_vic_threshold: default_ntc_vic_threshold(),
            default_system_version: default_system_version(),
        }
    }
}

/// Metric store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the JSON store
    #[serde(default = "paths::store_dir")]
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: paths::store_dir(),
        }
    }
}

/// Batch processing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Pattern for plate files inside an input directory
    #[serde(default = "default_plate_glob")]
    pub plate_glob: String,

    /// Abort the batch at the first failed plate
    #[serde(default)]
    pub stop_on_error: bool,
}

fn default_plate_glob() -> String {
    "*.plate.json".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            plate_glob: default_plate_glob(),
            stop_on_error: false,
        }
    }
}

/// One versioned table of certification limits. Every key is optional;
/// unset keys fall back to the built-in defaults one by one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LimitTable {
    pub low_event_count: Option<i64>,
    pub low_event_count_eva: Option<i64>,
    pub low_data_quality: Option<f64>,
    pub accepted_event_cutoff: Option<i64>,

    pub low_event_fail_numerator: Option<i64>,
    pub low_event_fail_denominator: Option<f64>,
    pub ncc_low_event_fail_numerator: Option<i64>,
    pub ncc_low_event_fail_denominator: Option<f64>,
    pub probe_event_fail_numerator: Option<i64>,
    pub probe_event_fail_denominator: Option<f64>,
    pub eva_event_fail_numerator: Option<i64>,
    pub eva_event_fail_denominator: Option<f64>,
    pub cc_low_event_fail_numerator: Option<i64>,
    pub cc_low_event_fail_denominator: Option<f64>,
    pub low_quality_fail_numerator: Option<i64>,
    pub low_quality_fail_denominator: Option<f64>,

    pub singleplex_uniformity_pct: Option<i64>,
    pub carryover_per_n_wells: Option<i64>,
    pub carryover_n_wells: Option<i64>,

    pub fam_amp_350: Option<i64>,
    pub vic_amp_350: Option<i64>,
    pub hex_amp_350: Option<i64>,
    pub fam_amp_lo: Option<i64>,
    pub vic_amp_lo: Option<i64>,
    pub hex_amp_lo: Option<i64>,
    pub ch1_amp_cv: Option<f64>,
    pub ch2_amp_cv: Option<f64>,
    pub ch1_amp_variation_pct: Option<i64>,
    pub ch1_amp_variation_pct_qc: Option<i64>,
    pub ch2_amp_variation_pct: Option<i64>,
    pub ch2_amp_variation_pct_qc: Option<i64>,
    pub hex_amp_lo_variation_pct_qc: Option<i64>,

    /// When positive, the width gates derive from this and
    /// `width_variation_pct` instead of `width_gate_min`/`width_gate_max`.
    pub width_mean: Option<f64>,
    pub width_variation_pct: Option<f64>,
    pub width_gate_min: Option<f64>,
    pub width_gate_max: Option<f64>,

    pub qc_max_polydispersity: Option<f64>,
    pub max_polydispersity: Option<f64>,
    pub delta_width_tolerance_max: Option<f64>,
    pub delta_width_tolerance_min: Option<f64>,
    pub qc_delta_width_tolerance_max: Option<f64>,
    pub qc_delta_width_tolerance_min: Option<f64>,
}

impl LimitTable {
    fn validate(&self) -> Result<(), ConfigError> {
        let counts = [
            ("low_event_count", self.low_event_count),
            ("low_event_count_eva", self.low_event_count_eva),
            ("accepted_event_cutoff", self.accepted_event_cutoff),
            ("low_event_fail_numerator", self.low_event_fail_numerator),
            ("ncc_low_event_fail_numerator", self.ncc_low_event_fail_numerator),
            ("probe_event_fail_numerator", self.probe_event_fail_numerator),
            ("eva_event_fail_numerator", self.eva_event_fail_numerator),
            ("cc_low_event_fail_numerator", self.cc_low_event_fail_numerator),
            ("low_quality_fail_numerator", self.low_quality_fail_numerator),
            ("carryover_per_n_wells", self.carryover_per_n_wells),
            ("carryover_n_wells", self.carryover_n_wells),
        ];
        for (name, value) in counts {
            if value.is_some_and(|v| v < 0) {
                return Err(ConfigError::Invalid(format!("{} must not be negative", name)));
            }
        }

        let denominators = [
            ("low_event_fail_denominator", self.low_event_fail_denominator),
            ("ncc_low_event_fail_denominator", self.ncc_low_event_fail_denominator),
            ("probe_event_fail_denominator", self.probe_event_fail_denominator),
            ("eva_event_fail_denominator", self.eva_event_fail_denominator),
            ("cc_low_event_fail_denominator", self.cc_low_event_fail_denominator),
            ("low_quality_fail_denominator", self.low_quality_fail_denominator),
        ];
        for (name, value) in denominators {
            if value == Some(0.0) {
                return Err(ConfigError::Invalid(format!("{} must not be zero", name)));
            }
        }
        Ok(())
    }
}
