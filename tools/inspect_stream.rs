// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Stream inspector.

Lists the top level units of a serialized PDG stream (objects with their class tag and body
length, back references, strings, blobs and external references) without needing any of the
stream's types.

Usage:
    inspect_stream <stream-file> [--untagged] [--config <path>] [--debug-<crate>] [--debug-all]

The stream settings come from `--config`, else from a `pdg_serialization.toml` found by the
usual search, else the defaults. `--untagged` overrides `stream.tags_enabled`.
*/

use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use pdg::config::{
    apply_cli_overrides, apply_environment_overrides, find_config_file, load_config,
    validate_config, PdgConfig,
};
use pdg::observability::{debug_flags_help, init_logging_default, parse_debug_flags};
use pdg::serialization::inspect::{scan_stream, UnitKind};
use pdg::serialization::StreamConfig;
use tracing::{debug, info};

struct Options {
    stream_path: PathBuf,
    config_path: Option<PathBuf>,
    untagged: bool,
}

fn usage() -> String {
    format!(
        "Usage: inspect_stream <stream-file> [--untagged] [--config <path>]\n\n{}",
        debug_flags_help()
    )
}

fn parse_args() -> Result<Option<Options>> {
    let mut stream_path = None;
    let mut config_path = None;
    let mut untagged = false;

    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(None),
            "--untagged" => untagged = true,
            "--config" => {
                let path = args.next().context("--config needs a path")?;
                config_path = Some(PathBuf::from(path));
            }
            other if other.starts_with("--debug-") => {}
            other if other.starts_with('-') => bail!("Unknown argument: {}\n\n{}", other, usage()),
            other => {
                if stream_path.is_some() {
                    bail!("Only one stream file can be inspected at a time");
                }
                stream_path = Some(PathBuf::from(other));
            }
        }
    }

    let stream_path = stream_path.with_context(usage)?;
    Ok(Some(Options {
        stream_path,
        config_path,
        untagged,
    }))
}

fn stream_config(options: &Options) -> Result<StreamConfig> {
    let mut overrides = HashMap::new();
    if options.untagged {
        overrides.insert("stream_tags".to_string(), "false".to_string());
    }

    let config_path = match &options.config_path {
        Some(path) => Some(path.clone()),
        None => find_config_file().ok(),
    };
    let config = match config_path {
        Some(path) => {
            debug!("[INSPECT] Loading configuration from {}", path.display());
            load_config(Some(path.as_path()), Some(&overrides))
                .with_context(|| format!("Failed to load configuration {}", path.display()))?
        }
        None => {
            let mut config = PdgConfig::default();
            apply_environment_overrides(&mut config)?;
            apply_cli_overrides(&mut config, &overrides)?;
            validate_config(&config)?;
            config
        }
    };
    Ok(config.stream)
}

fn main() -> Result<()> {
    let Some(options) = parse_args()? else {
        println!("{}", usage());
        return Ok(());
    };
    let _logging = init_logging_default(&parse_debug_flags())?;

    let config = stream_config(&options)?;
    let bytes = fs::read(&options.stream_path)
        .with_context(|| format!("Failed to read {}", options.stream_path.display()))?;
    info!(
        "[INSPECT] {} ({} bytes, tags {})",
        options.stream_path.display(),
        bytes.len(),
        if config.tags_enabled { "on" } else { "off" }
    );

    let report = scan_stream(&bytes, config)
        .with_context(|| format!("{} is not a readable stream", options.stream_path.display()))?;

    if let Some(version) = report.version {
        println!("stream version {}", version);
    }
    for unit in &report.units {
        println!("{}", unit);
    }

    let objects = report
        .units
        .iter()
        .filter(|unit| matches!(unit.kind, UnitKind::Object { .. }))
        .count();
    println!(
        "{} top level units, {} objects",
        report.units.len(),
        objects
    );
    Ok(())
}
