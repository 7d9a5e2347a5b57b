// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for PDG tools
//!
//! Console output is always on. With the `file-logging` feature and a `log_dir`, each run also
//! writes to its own timestamped folder and old run folders are pruned.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingConfig};

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps file writers alive; dropping it flushes them.
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Folder this run logs to, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Installs the global tracing subscriber.
///
/// The filter starts from `config.level` and raises every crate named in `debug_flags` to
/// debug. Fails if a global subscriber is already installed.
///
/// Creates a run folder per call when file logging is active:
/// ```text
/// ./logs/
///   └── run_20250101_120000/
///       └── pdg.log
/// ```
pub fn init_logging(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = vec![console_layer(config, build_filter(debug_flags, config)?)];
    let guard = file_output(debug_flags, config, &mut layers)?;

    Registry::default()
        .with(layers)
        .try_init()
        .context("Failed to install the tracing subscriber (one is already installed)")?;
    Ok(guard)
}

/// Initialize logging with default settings
pub fn init_logging_default(debug_flags: &CrateDebugFlags) -> Result<LoggingGuard> {
    init_logging(debug_flags, &LoggingConfig::default())
}

/// Builds the `EnvFilter` for `debug_flags` on top of `config.level`.
pub fn build_filter(debug_flags: &CrateDebugFlags, config: &LoggingConfig) -> Result<EnvFilter> {
    let directives = debug_flags.to_filter_string(&config.level);
    EnvFilter::try_new(&directives).with_context(|| format!("Invalid log filter: {}", directives))
}

fn console_layer(config: &LoggingConfig, filter: EnvFilter) -> BoxedLayer {
    let layer = tracing_subscriber::fmt::layer()
        .with_target(config.with_target)
        .with_file(false)
        .with_line_number(false);
    match config.format {
        LogFormat::Text => layer.with_filter(filter).boxed(),
        LogFormat::Compact => layer.compact().with_filter(filter).boxed(),
    }
}

#[cfg(feature = "file-logging")]
fn file_output(
    debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
    layers: &mut Vec<BoxedLayer>,
) -> Result<LoggingGuard> {
    let Some(base_log_dir) = &config.log_dir else {
        return Ok(LoggingGuard {
            _file_guards: Vec::new(),
            log_dir: None,
        });
    };

    let run_folder = base_log_dir.join(run_folder_name(Utc::now()));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    cleanup_old_runs(base_log_dir, config.retention_runs)?;

    let appender = tracing_appender::rolling::never(&run_folder, "pdg.log");
    let (writer, file_guard) = tracing_appender::non_blocking(appender);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(build_filter(debug_flags, config)?)
        .boxed();
    layers.push(file_layer);

    Ok(LoggingGuard {
        _file_guards: vec![file_guard],
        log_dir: Some(run_folder),
    })
}

#[cfg(not(feature = "file-logging"))]
fn file_output(
    _debug_flags: &CrateDebugFlags,
    config: &LoggingConfig,
    _layers: &mut Vec<BoxedLayer>,
) -> Result<LoggingGuard> {
    if let Some(log_dir) = &config.log_dir {
        eprintln!(
            "Warning: ignoring log directory {} (built without the file-logging feature)",
            log_dir.display()
        );
    }
    Ok(LoggingGuard { log_dir: None })
}

/// Folder name for a run started at `started`, e.g. `run_20250101_120000`.
pub fn run_folder_name(started: DateTime<Utc>) -> String {
    format!("{}{}", RUN_PREFIX, started.format(RUN_TIMESTAMP_FORMAT))
}

/// Removes all but the `keep` most recent run folders under `base_log_dir`.
///
/// Entries that are not run folders are left alone. Returns the number of folders removed.
pub fn cleanup_old_runs(base_log_dir: &Path, keep: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<(PathBuf, NaiveDateTime)> = Vec::new();
    let entries = std::fs::read_dir(base_log_dir)
        .with_context(|| format!("Failed to list log directory: {}", base_log_dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let started = path
            .file_name()
            .and_then(|name| name.to_str())
            .and_then(|name| name.strip_prefix(RUN_PREFIX))
            .and_then(|stamp| NaiveDateTime::parse_from_str(stamp, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(started) = started {
            runs.push((path, started));
        }
    }

    if runs.len() <= keep {
        return Ok(0);
    }
    // Oldest first
    runs.sort_by_key(|(_, started)| *started);
    let excess = runs.len() - keep;

    let mut removed = 0;
    for (path, _) in runs.iter().take(excess) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }
    Ok(removed)
}
