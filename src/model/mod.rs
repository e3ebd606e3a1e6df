//! Persisted records: plates, metric trees, analysis groups and
//! reprocess configurations.

pub mod fields;
pub mod metrics;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::PlateTypeCode;

pub use fields::{ChannelField, PlateField, WellField};
pub use metrics::{PlateMetric, WellChannelMetric, WellMetric};

/// 2x2 color compensation matrix applied by the instrument software.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorCompMatrix {
    pub m11: f64,
    pub m12: f64,
    pub m21: f64,
    pub m22: f64,
}

impl ColorCompMatrix {
    pub const IDENTITY: ColorCompMatrix = ColorCompMatrix {
        m11: 1.0,
        m12: 0.0,
        m21: 0.0,
        m22: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }
}

/// Plate header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub plate_type: Option<PlateTypeCode>,
    pub run_time: DateTime<Utc>,
    /// Reader (box2) the plate ran on.
    #[serde(default)]
    pub reader: Option<String>,
    /// Hardware generation, e.g. `QX100` or `QX200`.
    #[serde(default)]
    pub system_version: Option<String>,
    /// Analysis software string, e.g. `QuantaSoft 1.7.4.0917`.
    #[serde(default)]
    pub program_version: Option<String>,
    #[serde(default)]
    pub qc_plate: bool,
    #[serde(default)]
    pub onsite: bool,
    #[serde(default)]
    pub mfg_exclude: bool,
    #[serde(default)]
    pub batch_plate_type: Option<PlateTypeCode>,
    #[serde(default)]
    pub color_compensation: Option<ColorCompMatrix>,
    #[serde(default)]
    pub file_hash: String,
}

impl PlateRecord {
    pub fn is_type(&self, code: PlateTypeCode) -> bool {
        self.plate_type == Some(code)
    }
}

/// A user-curated set of plates, compared together in reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisGroup {
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub plate_ids: Vec<String>,
    #[serde(default)]
    pub reprocess_config_ids: Vec<u32>,
}

fn default_active() -> bool {
    true
}

impl AnalysisGroup {
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            active: true,
            plate_ids: Vec::new(),
            reprocess_config_ids: Vec::new(),
        }
    }

    /// Add a plate once.
    pub fn add_plate(&mut self, plate_id: &str) -> bool {
        if self.plate_ids.iter().any(|p| p == plate_id) {
            return false;
        }
        self.plate_ids.push(plate_id.to_string());
        true
    }

    /// The reprocess config, if this group is associated with it.
    /// An unassociated config resolves to `None`.
    pub fn resolve_reprocess(&self, reprocess_config_id: Option<u32>) -> Option<u32> {
        reprocess_config_id.filter(|id| self.reprocess_config_ids.contains(id))
    }
}

/// Signal-processing parameters a plate was reanalyzed with. Immutable
/// once defined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReprocessConfig {
    pub id: u32,
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub peak_detection_version: Option<String>,
    #[serde(default)]
    pub trigger_sigma: Option<f64>,
    #[serde(default)]
    pub width_gating_sigma: Option<f64>,
    #[serde(default)]
    pub min_amplitudes: Option<[f64; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plate_record_defaults() {
        let record: PlateRecord =
            serde_json::from_str(r#"{"run_time": "2024-05-01T08:30:00Z", "plate_type": "mfgcc"}"#).unwrap();
        assert!(record.id.is_empty());
        assert!(record.is_type(PlateTypeCode::Mfgcc));
        assert!(!record.onsite);
        assert_eq!(record.color_compensation, None);
    }

    #[test]
    fn test_group_membership() {
        let mut group = AnalysisGroup::new("lot 7");
        assert!(group.active);
        assert!(group.add_plate("p1"));
        assert!(!group.add_plate("p1"));
        assert_eq!(group.plate_ids, vec!["p1".to_string()]);

        group.reprocess_config_ids.push(3);
        assert_eq!(group.resolve_reprocess(Some(3)), Some(3));
        assert_eq!(group.resolve_reprocess(Some(4)), None);
        assert_eq!(group.resolve_reprocess(None), None);
    }

    #[test]
    fn test_colorcomp_identity() {
        assert!(ColorCompMatrix::IDENTITY.is_identity());
        let m = ColorCompMatrix {
            m12: 0.2,
            ..ColorCompMatrix::IDENTITY
        };
        assert!(!m.is_identity());
    }
}
