#![deny(missing_docs)]
//! Shared logging utilities for the page watcher workspace.
//!
//! This crate provides the `watch_*` logging macros used across the codebase,
//! the logger initializers for the binary, and a minimal test initializer.
//! Every line emitted through the macros is prefixed with the number of the
//! check cycle that produced it.

use std::fs::File;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

#[doc(hidden)]
pub use log as __log;

/// Cycle counter shared by every thread of the process.
/// The scheduler may resume on any runtime worker, so this is not thread-local.
static CURRENT_CYCLE: AtomicU64 = AtomicU64::new(0);

/// Sets the number of the check cycle currently running.
/// Called by the scheduler once before each cycle.
pub fn set_cycle(cycle: u64) {
    CURRENT_CYCLE.store(cycle, Ordering::Relaxed);
}

/// Retrieves the number of the check cycle currently running.
/// Returns 0 before the first cycle has started.
pub fn current_cycle() -> u64 {
    CURRENT_CYCLE.load(Ordering::Relaxed)
}

/// Logs a trace-level message tagged with the current cycle.
#[macro_export]
macro_rules! watch_trace {
    ($($arg:tt)*) => {{
        $crate::__log::trace!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the current cycle.
#[macro_export]
macro_rules! watch_debug {
    ($($arg:tt)*) => {{
        $crate::__log::debug!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the current cycle.
#[macro_export]
macro_rules! watch_info {
    ($($arg:tt)*) => {{
        $crate::__log::info!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the current cycle.
#[macro_export]
macro_rules! watch_warn {
    ($($arg:tt)*) => {{
        $crate::__log::warn!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the current cycle.
#[macro_export]
macro_rules! watch_error {
    ($($arg:tt)*) => {{
        $crate::__log::error!("[cycle {}] {}", $crate::current_cycle(), format_args!($($arg)*));
    }};
}

/// Destination for log output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogDestination {
    /// Write to the terminal (stdout/stderr).
    #[default]
    Terminal,
    /// Write to the given log file only.
    File,
    /// Write to both the terminal and the log file.
    Both,
}

/// Initialize the global logger.
///
/// `log_file` is only used for `LogDestination::File` and `Both`. If the file
/// cannot be created the error is reported on stderr and terminal output is
/// kept when available. Calling this twice is harmless; the second call is a
/// no-op.
pub fn initialize(destination: LogDestination, level: LevelFilter, log_file: &Path) {
    let config = build_config();

    let loggers: Vec<Box<dyn SharedLogger>> = match destination {
        LogDestination::Terminal => vec![terminal_logger(level, config)],
        LogDestination::File => match create_file_logger(level, config.clone(), log_file) {
            Some(file_logger) => vec![file_logger],
            None => vec![terminal_logger(level, config)],
        },
        LogDestination::Both => {
            let mut loggers = vec![terminal_logger(level, config.clone())];
            if let Some(file_logger) = create_file_logger(level, config, log_file) {
                loggers.push(file_logger);
            }
            loggers
        }
    };

    let _ = CombinedLogger::init(loggers);
}

/// Initializes a simple terminal logger for use in unit tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .build()
}

fn terminal_logger(level: LevelFilter, config: Config) -> Box<dyn SharedLogger> {
    TermLogger::new(level, config, TerminalMode::Mixed, ColorChoice::Auto)
}

fn create_file_logger(
    level: LevelFilter,
    config: Config,
    log_file: &Path,
) -> Option<Box<dyn SharedLogger>> {
    match File::create(log_file) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: Could not create log file at {:?}: {}", log_file, err);
            None
        }
    }
}
