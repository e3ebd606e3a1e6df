//! Synthetic plate builders for tests.

use chrono::{TimeZone, Utc};
use std::path::PathBuf;

use super::*;
use crate::types::PlateTypeCode;

pub fn peak_w(time: u64, fam: f64, vic: f64, width: f64) -> Peak {
    Peak {
        time,
        channels: [
            PeakChannel {
                amplitude: fam,
                width,
            },
            PeakChannel {
                amplitude: vic,
                width,
            },
        ],
        gated: PeakGates::default(),
    }
}

pub fn peak(time: u64, fam: f64, vic: f64) -> Peak {
    peak_w(time, fam, vic, 9.0)
}

/// `count` accepted droplets at fixed amplitudes, spaced 100 samples apart.
pub fn peaks_at(count: usize, start: u64, fam: f64, vic: f64) -> Vec<Peak> {
    (0..count)
        .map(|i| peak(start + 100 * i as u64, fam, vic))
        .collect()
}

pub fn channel(num: Channel, threshold: Option<f64>) -> DecodedChannel {
    DecodedChannel {
        channel_num: num,
        target: None,
        decision_tree_flags: 0,
        statistics: ChannelStatistics {
            threshold,
            min_width_gate: Some(8.0),
            max_width_gate: Some(10.0),
            ..Default::default()
        },
    }
}

pub fn well(sample: Option<&str>, peaks: Vec<Peak>, thresholds: [Option<f64>; 2]) -> DecodedWell {
    DecodedWell {
        sample_name: sample.map(str::to_string),
        experiment_name: None,
        event_count: peaks.len() as u64,
        peaks,
        channels: [channel(0, thresholds[0]), channel(1, thresholds[1])],
        sum_amplitude_bins: Vec::new(),
        clusters_defined: false,
        ref_copy_num: 2.0,
        droplet_volume: DEFAULT_DROPLET_VOLUME,
        statistics: WellStatistics::default(),
    }
}

/// Duplex well: `pp`, `pn`, `np`, `nn` droplets in the four quadrants.
pub fn duplex_well(sample: Option<&str>, pp: usize, pn: usize, np: usize, nn: usize) -> DecodedWell {
    let mut peaks = Vec::new();
    let mut t = 0;
    for (count, fam, vic) in [
        (pp, 9000.0, 7000.0),
        (pn, 9000.0, 1500.0),
        (np, 2000.0, 7000.0),
        (nn, 2000.0, 1500.0),
    ] {
        peaks.extend(peaks_at(count, t, fam, vic));
        t += 100 * count as u64;
    }
    well(sample, peaks, [Some(5000.0), Some(4000.0)])
}

pub fn plate(wells: Vec<(&str, DecodedWell)>) -> DecodedPlate {
    DecodedPlate {
        wells: wells
            .into_iter()
            .map(|(name, well)| (name.parse().expect("well name"), well))
            .collect(),
        software_pmt_gains: None,
    }
}

pub fn record(id: &str, code: Option<PlateTypeCode>, day: u32) -> PlateRecord {
    PlateRecord {
        id: id.to_string(),
        name: format!("plate {}", id),
        plate_type: code,
        run_time: Utc
            .with_ymd_and_hms(2024, 1, day, 12, 0, 0)
            .single()
            .expect("valid date"),
        reader: Some("dr-1".to_string()),
        system_version: Some("QX100".to_string()),
        program_version: None,
        qc_plate: false,
        onsite: false,
        mfg_exclude: false,
        batch_plate_type: None,
        color_compensation: None,
        file_hash: String::new(),
    }
}

/// Write a plate file the way the instrument export would.
pub fn write_plate_file(dir: &Path, file_name: &str, record: PlateRecord, decoded: DecodedPlate) -> PathBuf {
    let file = PlateFile {
        plate: record,
        wells: decoded.wells,
        software_pmt_gains: decoded.software_pmt_gains,
    };
    let path = dir.join(file_name);
    std::fs::write(&path, serde_json::to_vec_pretty(&file).expect("serialize plate")).expect("write plate");
    path
}
