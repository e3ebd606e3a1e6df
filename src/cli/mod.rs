//! CLI command definitions and handlers.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

pub mod certify;
pub mod config;
pub mod export;
pub mod failed;
pub mod group;
pub mod process;
pub mod report;

/// ddPCR QC - plate metrics, run statistics and reader certification.
#[derive(Parser, Debug)]
#[command(name = "ddqc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Log level
    #[arg(long, default_value = "info", env = "DDQC_LOG_LEVEL")]
    pub log_level: LogLevel,

    /// Path to config file
    #[arg(long, env = "DDQC_CONFIG")]
    pub config_path: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Config file in effect: `--config-path` or the default location.
    pub fn config_file(&self) -> PathBuf {
        self.config_path
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(crate::config::paths::config_file)
    }
}

#[derive(Debug, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Compute and store metrics for a plate file or a directory of plates
    Process {
        /// Plate file or directory
        input: PathBuf,

        /// Reprocess config code to compute metrics under
        #[arg(long)]
        reprocess: Option<String>,

        /// File pattern inside a directory (defaults to batch.plate_glob)
        #[arg(long)]
        glob: Option<String>,

        /// Recompute plates whose content is unchanged
        #[arg(long)]
        force: bool,

        /// Abort at the first failed plate
        #[arg(long)]
        stop_on_error: bool,
    },

    /// Print summary statistics for a group, reader or plate
    Report {
        #[command(subcommand)]
        scope: ReportScope,

        /// Reprocess config code
        #[arg(long, global = true)]
        reprocess: Option<String>,
    },

    /// Run the certification test battery
    Certify {
        #[command(subcommand)]
        target: CertifyTarget,

        /// Also write the results as CSV
        #[arg(long, global = true)]
        csv: Option<PathBuf>,
    },

    /// Export well metrics of a plate as CSV
    Export {
        /// Plate id
        plate_id: String,

        /// Reprocess config code
        #[arg(long)]
        reprocess: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Comma-separated field names (all comparable fields when omitted)
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
    },

    /// Manage analysis groups
    Group {
        #[command(subcommand)]
        action: GroupAction,
    },

    /// Manage plates that failed processing
    Failed {
        #[command(subcommand)]
        action: FailedAction,
    },

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ReportScope {
    /// Plates of an analysis group
    Group {
        /// Group id
        id: String,
    },

    /// Every plate run on one reader
    Reader {
        /// Reader serial
        id: String,
    },

    /// A single plate
    Plate {
        /// Plate id
        id: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum CertifyTarget {
    /// Certify a reader from its most recent certification plates
    Reader {
        /// Reader serial
        id: String,
    },

    /// Certify from a single plate
    Plate {
        /// Plate id
        id: String,

        /// Reprocess config code
        #[arg(long)]
        reprocess: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum GroupAction {
    /// Create a new group
    Create {
        /// Group name
        name: String,
    },

    /// Add a plate to a group
    Add {
        /// Group id
        group: String,

        /// Plate id
        plate: String,
    },

    /// Associate a reprocess config with a group
    Associate {
        /// Group id
        group: String,

        /// Reprocess config code
        reprocess: String,
    },

    /// List all groups
    List,

    /// Mark a group inactive
    Deactivate {
        /// Group id
        group: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum FailedAction {
    /// List plates that failed processing
    List,

    /// Retry a failed plate (or "all")
    Retry {
        /// Plate file path, or "all"
        path: String,
    },

    /// Clear the failed plate history
    Clear {
        /// Skip confirmation prompt
        #[arg(long)]
        confirm: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate configuration file
    Validate,

    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from(["ddqc", "process", "plates", "--reprocess", "rc2", "--force"]).unwrap();
        match cli.command {
            Command::Process {
                input,
                reprocess,
                glob,
                force,
                stop_on_error,
            } => {
                assert_eq!(input, PathBuf::from("plates"));
                assert_eq!(reprocess.as_deref(), Some("rc2"));
                assert!(glob.is_none());
                assert!(force);
                assert!(!stop_on_error);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_export_fields() {
        let cli = Cli::try_parse_from([
            "ddqc",
            "--config-path",
            "/tmp/ddqc.toml",
            "export",
            "p1",
            "--fields",
            "width_mean,concentration",
        ])
        .unwrap();
        assert_eq!(cli.config_file(), PathBuf::from("/tmp/ddqc.toml"));
        match cli.command {
            Command::Export { plate_id, fields, .. } => {
                assert_eq!(plate_id, "p1");
                assert_eq!(fields, vec!["width_mean", "concentration"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_report_and_certify() {
        let cli = Cli::try_parse_from(["ddqc", "report", "reader", "dr-1", "--reprocess", "rc2"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Report {
                scope: ReportScope::Reader { .. },
                reprocess: Some(_)
            }
        ));

        let cli = Cli::try_parse_from(["ddqc", "certify", "plate", "p1", "--csv", "out.csv"]).unwrap();
        match cli.command {
            Command::Certify {
                target: CertifyTarget::Plate { id, reprocess },
                csv,
            } => {
                assert_eq!(id, "p1");
                assert!(reprocess.is_none());
                assert_eq!(csv, Some(PathBuf::from("out.csv")));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_unknown_command_is_rejected() {
        assert!(Cli::try_parse_from(["ddqc", "run"]).is_err());
    }
}
