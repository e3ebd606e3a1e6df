//! Path utilities for ddqc.
//!
//! Defines standard locations for configuration, logs and the metric store.

use std::path::PathBuf;

/// Base data directory.
///
/// On Linux: `~/.local/share/ddqc`
pub fn data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "ddpcr-qc", "ddqc")
        .map(|p| p.data_dir().to_path_buf())
        .unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".local")
                .join("share")
                .join("ddqc")
        })
}

/// Configuration file path. `DDQC_CONFIG` overrides the default.
pub fn config_file() -> PathBuf {
    if let Ok(path) = std::env::var("DDQC_CONFIG") {
        return PathBuf::from(path);
    }

    data_dir().join("config.toml")
}

/// Log directory, created on first use.
pub fn log_dir() -> std::io::Result<PathBuf> {
    let path = data_dir().join("logs");
    std::fs::create_dir_all(&path)?;
    Ok(path)
}

/// Default root of the metric store.
pub fn store_dir() -> PathBuf {
    data_dir().join("store")
}

/// History of plates that failed processing.
pub fn failed_plates_file() -> PathBuf {
    data_dir().join("failed_plates.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_are_under_data_dir() {
        let base = data_dir();
        assert!(store_dir().starts_with(&base));
        assert!(failed_plates_file().starts_with(&base));
        assert_eq!(store_dir().file_name().unwrap(), "store");
    }
}
