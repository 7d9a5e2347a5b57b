// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `pdg_serialization.toml`.

use crate::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Newest stream format version understood by this release.
pub const CURRENT_STREAM_VERSION: u8 = 1;

/// Default growth step of a serializer's buffer, in bytes.
pub const DEFAULT_BLOCK_SIZE: usize = 1024;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PdgConfig {
    pub stream: StreamConfig,
}

/// Options fixed for the lifetime of one serialized stream.
///
/// Both ends of a stream must agree on `tags_enabled`, since it changes the byte layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Emit the stream header, the `str`/`mem`/`ptr` tags and the per-object registry check.
    pub tags_enabled: bool,
    /// Version byte written into (and expected from) the stream header.
    pub version: u8,
    /// Growth step of the write buffer.
    pub block_size: usize,
    /// What the convenience entry points do with errors.
    pub error_mode: ErrorMode,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            tags_enabled: true,
            version: CURRENT_STREAM_VERSION,
            block_size: DEFAULT_BLOCK_SIZE,
            error_mode: ErrorMode::Propagate,
        }
    }
}

impl StreamConfig {
    /// A default configuration with the optional tags switched off.
    pub fn untagged() -> Self {
        Self {
            tags_enabled: false,
            ..Self::default()
        }
    }
}

/// Error policy for decoding and encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorMode {
    /// Errors are returned to the caller.
    #[default]
    Propagate,
    /// Errors are logged and replaced with default values.
    LogAndDefault,
}

impl Display for ErrorMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorMode::Propagate => write!(f, "propagate"),
            ErrorMode::LogAndDefault => write!(f, "log_and_default"),
        }
    }
}

impl FromStr for ErrorMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "propagate" => Ok(ErrorMode::Propagate),
            "log_and_default" | "log-and-default" | "lenient" => Ok(ErrorMode::LogAndDefault),
            other => Err(ConfigError::InvalidValue(format!(
                "unknown error mode '{}', expected 'propagate' or 'log_and_default'",
                other
            ))),
        }
    }
}
