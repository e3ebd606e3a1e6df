//! Panic reporting.
//!
//! A panic while processing plates writes a crash report next to the logs
//! and prints its location, so the failing batch can be reproduced.

use std::backtrace::Backtrace;
use std::fs;
use std::panic::PanicHookInfo;
use std::path::PathBuf;

use crate::config::paths;

/// Install the panic hook.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = Backtrace::force_capture();
        let report = build_crash_report(panic_info, &backtrace);
        match write_crash_report(&report) {
            Some(path) => eprintln!("ddqc crashed. Crash report saved to {}", path.display()),
            None => eprintln!("{}", report),
        }
    }));
}

fn panic_message(panic_info: &PanicHookInfo) -> String {
    if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

fn build_crash_report(panic_info: &PanicHookInfo, backtrace: &Backtrace) -> String {
    let version = env!("CARGO_PKG_VERSION");
    let timestamp = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    let message = panic_message(panic_info);
    let location = panic_info
        .location()
        .map(|loc| format!("{}:{}:{}", loc.file(), loc.line(), loc.column()))
        .unwrap_or_else(|| "unknown location".to_string());
    let args = std::env::args().collect::<Vec<_>>().join(" ");

    format!(
        r#"ddqc crash report
=================

Version: {version}
Timestamp: {timestamp}
OS: {os} ({arch})
Command: {args}

Panic message:
{message}

Location:
{location}

Backtrace:
{backtrace}
"#,
        os = std::env::consts::OS,
        arch = std::env::consts::ARCH,
    )
}

fn write_crash_report(report: &str) -> Option<PathBuf> {
    let log_dir = paths::log_dir().ok()?;
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = log_dir.join(format!("crash_{}.txt", timestamp));
    fs::write(&path, report).ok()?;
    Some(path)
}
