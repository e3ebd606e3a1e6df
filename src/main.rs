//! ddPCR QC
//!
//! Computes per-plate, per-well and per-channel quality metrics for droplet
//! digital PCR plates, stores them, and aggregates them into run statistics
//! and reader certification reports.

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod analysis;
mod batch;
mod calculators;
mod cli;
mod config;
mod crash;
mod error;
mod export;
mod model;
mod peaks;
mod plate;
mod stats;
mod store;
mod types;

use cli::{Cli, Command};

fn main() {
    if let Err(e) = real_main() {
        eprintln!("ddqc error: {:?}", e);
        std::process::exit(1);
    }
}

fn real_main() -> Result<()> {
    crash::install_panic_hook();

    let cli = Cli::parse();

    // Batch runs keep a rolling log file; everything else logs to the console
    let _guard = match &cli.command {
        Command::Process { .. } | Command::Failed { .. } => init_file_logging(&cli)?,
        _ => init_console_logging(&cli)?,
    };

    info!(version = env!("CARGO_PKG_VERSION"), "ddqc starting");

    let config_file = cli.config_file();
    match cli.command {
        Command::Config { action } => cli::config::run(&config_file, action),
        Command::Version => {
            println!("ddqc {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        command => {
            let config = config::Config::load_or_default(&config_file)?;
            dispatch(&config, command)
        }
    }
}

fn dispatch(config: &config::Config, command: Command) -> Result<()> {
    match command {
        Command::Process {
            input,
            reprocess,
            glob,
            force,
            stop_on_error,
        } => cli::process::run(
            config,
            cli::process::ProcessArgs {
                input: &input,
                reprocess: reprocess.as_deref(),
                glob: glob.as_deref(),
                force,
                stop_on_error,
            },
        ),
        Command::Report { scope, reprocess } => cli::report::run(config, scope, reprocess.as_deref()),
        Command::Certify { target, csv } => cli::certify::run(config, target, csv.as_deref()),
        Command::Export {
            plate_id,
            reprocess,
            out,
            fields,
        } => cli::export::run(config, &plate_id, reprocess.as_deref(), out.as_deref(), &fields),
        Command::Group { action } => cli::group::run(config, action),
        Command::Failed { action } => cli::failed::run(config, action),
        Command::Config { .. } | Command::Version => Ok(()),
    }
}

fn init_console_logging(cli: &Cli) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();

    Ok(None)
}

fn init_file_logging(cli: &Cli) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config::paths::log_dir()?;

    let file_appender = tracing_appender::rolling::Builder::new()
        .rotation(tracing_appender::rolling::Rotation::DAILY)
        .filename_prefix("ddqc")
        .filename_suffix("log")
        .max_log_files(10)
        .build(&log_dir)?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level.as_str()));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    Ok(Some(guard))
}
