//! Decoded plate input.
//!
//! A plate file is the JSON rendition of one instrument run: a header
//! describing the plate, and per-well droplet records with the channel
//! statistics the instrument software already computed.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

use crate::error::PlateError;
use crate::model::PlateRecord;
use crate::types::{Channel, WellName, FAM};

#[cfg(test)]
pub mod fixtures;

/// Default droplet volume in microlitres.
pub const DEFAULT_DROPLET_VOLUME: f64 = 0.00085;

/// One channel of a droplet event.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PeakChannel {
    pub amplitude: f64,
    pub width: f64,
}

/// Gating flags the instrument software set on a droplet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PeakGates {
    #[serde(default)]
    pub min_amplitude: bool,
    #[serde(default)]
    pub width: bool,
    #[serde(default)]
    pub quality: bool,
    #[serde(default)]
    pub vertical_streak: bool,
}

impl PeakGates {
    pub fn any(&self) -> bool {
        self.min_amplitude || self.width || self.quality || self.vertical_streak
    }
}

/// A detected droplet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    /// Detector sample index.
    pub time: u64,
    pub channels: [PeakChannel; 2],
    #[serde(default)]
    pub gated: PeakGates,
}

impl Peak {
    pub fn amplitude(&self, channel: Channel) -> f64 {
        self.channels[channel].amplitude
    }

    pub fn width(&self, channel: Channel) -> f64 {
        self.channels[channel].width
    }

    /// Not rejected by any gate.
    pub fn is_accepted(&self) -> bool {
        !self.gated.any()
    }
}

/// Statistics computed by the instrument software for one channel.
///
/// Any of these may be absent when no threshold was called.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelStatistics {
    pub threshold: Option<f64>,
    pub threshold_conf: Option<f64>,
    pub min_width_gate: Option<f64>,
    pub min_width_gate_conf: Option<f64>,
    pub max_width_gate: Option<f64>,
    pub max_width_gate_conf: Option<f64>,
    pub width_gating_sigma: Option<f64>,
    pub min_quality_gate: Option<f64>,
    pub min_quality_gate_conf: Option<f64>,
    pub concentration: Option<f64>,
    pub concentration_lower_bound: Option<f64>,
    pub concentration_upper_bound: Option<f64>,
    pub concentration_calc_mode: Option<u8>,
    pub baseline_mean: Option<f64>,
    pub baseline_stdev: Option<f64>,
    pub cluster_conf: Option<f64>,
    pub trigger_min_amplitude: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedChannel {
    pub channel_num: Channel,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub decision_tree_flags: u32,
    #[serde(default)]
    pub statistics: ChannelStatistics,
}

/// Width gates for droplets whose summed amplitude falls in one bin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AmplitudeBin {
    pub min_amplitude: f64,
    pub min_width_gate: f64,
    pub max_width_gate: f64,
}

/// Well-level counts the instrument software computed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WellStatistics {
    pub rejected_peaks: Option<usize>,
    pub vertical_streak_peaks: Option<usize>,
    pub sum_baseline_mean: Option<f64>,
    pub sum_baseline_stdev: Option<f64>,
}

fn default_ref_copy_num() -> f64 {
    2.0
}

fn default_droplet_volume() -> f64 {
    DEFAULT_DROPLET_VOLUME
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedWell {
    #[serde(default)]
    pub sample_name: Option<String>,
    #[serde(default)]
    pub experiment_name: Option<String>,
    #[serde(default)]
    pub event_count: u64,
    #[serde(default)]
    pub peaks: Vec<Peak>,
    pub channels: [DecodedChannel; 2],
    #[serde(default)]
    pub sum_amplitude_bins: Vec<AmplitudeBin>,
    #[serde(default)]
    pub clusters_defined: bool,
    #[serde(default = "default_ref_copy_num")]
    pub ref_copy_num: f64,
    #[serde(default = "default_droplet_volume")]
    pub droplet_volume: f64,
    #[serde(default)]
    pub statistics: WellStatistics,
}

impl DecodedWell {
    pub fn statistics(&self, channel: Channel) -> &ChannelStatistics {
        &self.channels[channel].statistics
    }

    /// Called threshold for a channel; a zero threshold counts as uncalled.
    pub fn threshold(&self, channel: Channel) -> Option<f64> {
        self.statistics(channel).threshold.filter(|t| *t != 0.0)
    }

    /// Width gates of the well, read from the FAM channel statistics.
    pub fn static_width_gates(&self) -> (f64, f64) {
        let stats = self.statistics(FAM);
        (
            stats.min_width_gate.unwrap_or(0.0),
            stats.max_width_gate.unwrap_or(f64::MAX),
        )
    }

    pub fn sample(&self) -> &str {
        self.sample_name.as_deref().unwrap_or("")
    }

    pub fn sample_in(&self, names: &[&str]) -> bool {
        names.contains(&self.sample())
    }
}

/// All analyzed wells of a plate, in row-major order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DecodedPlate {
    pub wells: BTreeMap<WellName, DecodedWell>,
    #[serde(default)]
    pub software_pmt_gains: Option<[f64; 2]>,
}

impl DecodedPlate {
    pub fn wells_with_sample<'a>(
        &'a self,
        names: &'a [&'a str],
    ) -> impl Iterator<Item = (&'a WellName, &'a DecodedWell)> + 'a {
        self.wells.iter().filter(move |(_, w)| w.sample_in(names))
    }
}

/// On-disk plate file layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlateFile {
    pub plate: PlateRecord,
    pub wells: BTreeMap<WellName, DecodedWell>,
    #[serde(default)]
    pub software_pmt_gains: Option<[f64; 2]>,
}

/// Hex SHA-256 digest of plate file contents.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// Decode a plate from raw file contents.
///
/// A plate without an explicit id is identified by the first 16 hex
/// characters of its content hash.
pub fn decode(bytes: &[u8], source: &str) -> Result<(PlateRecord, DecodedPlate), PlateError> {
    let file: PlateFile = serde_json::from_slice(bytes).map_err(|e| PlateError::Decode {
        path: source.to_string(),
        source: e,
    })?;

    for (name, well) in &file.wells {
        for (idx, channel) in well.channels.iter().enumerate() {
            if channel.channel_num != idx {
                return Err(PlateError::MissingChannel {
                    well: name.to_string(),
                    channel: idx,
                });
            }
        }
    }

    let mut record = file.plate;
    record.file_hash = content_hash(bytes);
    if record.id.is_empty() {
        record.id = record.file_hash[..16].to_string();
    }

    debug!(
        plate_id = %record.id,
        wells = file.wells.len(),
        "Decoded plate"
    );

    Ok((
        record,
        DecodedPlate {
            wells: file.wells,
            software_pmt_gains: file.software_pmt_gains,
        },
    ))
}

/// Read and decode a plate file.
pub fn load(path: &Path) -> Result<(PlateRecord, DecodedPlate), PlateError> {
    let bytes = std::fs::read(path).map_err(|e| PlateError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    decode(&bytes, &path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "plate": {"name": "carry 1", "plate_type": "bcarry", "run_time": "2024-03-01T10:00:00Z"},
        "wells": {
            "A01": {
                "sample_name": "S.a. 1cpd",
                "event_count": 2,
                "peaks": [
                    {"time": 10, "channels": [{"amplitude": 9000, "width": 9}, {"amplitude": 1000, "width": 9}]},
                    {"time": 40, "channels": [{"amplitude": 500, "width": 9}, {"amplitude": 900, "width": 9}],
                     "gated": {"width": true}}
                ],
                "channels": [
                    {"channel_num": 0, "statistics": {"threshold": 4000.0, "min_width_gate": 8.0, "max_width_gate": 10.0}},
                    {"channel_num": 1}
                ]
            }
        },
        "software_pmt_gains": [1.0, 1.1]
    }"#;

    #[test]
    fn test_decode_assigns_hash_id() {
        let (record, plate) = decode(MINIMAL.as_bytes(), "mem").unwrap();
        assert_eq!(record.id.len(), 16);
        assert_eq!(record.file_hash.len(), 64);
        assert!(record.file_hash.starts_with(&record.id));

        let well = &plate.wells[&"A01".parse().unwrap()];
        assert_eq!(well.peaks.len(), 2);
        assert!(well.peaks[0].is_accepted());
        assert!(!well.peaks[1].is_accepted());
        assert_eq!(well.threshold(0), Some(4000.0));
        assert_eq!(well.threshold(1), None);
        assert_eq!(well.static_width_gates(), (8.0, 10.0));
        assert_eq!(well.ref_copy_num, 2.0);
    }

    #[test]
    fn test_decode_rejects_swapped_channels() {
        let swapped = MINIMAL
            .replace("\"channel_num\": 0", "\"channel_num\": 9")
            .replace("{\"channel_num\": 1}", "{\"channel_num\": 0}");
        let err = decode(swapped.as_bytes(), "mem").unwrap_err();
        assert!(matches!(err, PlateError::MissingChannel { .. }));
    }

    #[test]
    fn test_decode_reports_bad_json() {
        let err = decode(b"{not json", "bad.plate.json").unwrap_err();
        assert!(err.to_string().contains("bad.plate.json"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load(Path::new("/nonexistent/plate.json")).unwrap_err();
        assert!(matches!(err, PlateError::Io { .. }));
    }
}
