// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Ensures configuration values are within ranges the serialization engine accepts.

use crate::{ConfigError, ConfigResult, PdgConfig, CURRENT_STREAM_VERSION};

/// Validation errors that can occur during config validation
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    ZeroBlockSize,
    UnsupportedVersion { version: u8 },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ZeroBlockSize => write!(f, "stream.block_size must be greater than 0"),
            Self::UnsupportedVersion { version } => write!(
                f,
                "stream.version = {} is outside the supported range (1-{})",
                version, CURRENT_STREAM_VERSION
            ),
        }
    }
}

/// Validate the complete configuration
///
/// Checks that the write block size is non-zero and that the stream version is one
/// this release can both write and read.
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` listing every failed check
pub fn validate_config(config: &PdgConfig) -> ConfigResult<()> {
    let errors = collect_errors(config);
    if errors.is_empty() {
        return Ok(());
    }

    let error_messages = errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::ValidationError(format!(
        "Configuration validation failed:\n{}",
        error_messages
    )))
}

fn collect_errors(config: &PdgConfig) -> Vec<ConfigValidationError> {
    let mut errors = Vec::new();
    let stream = &config.stream;

    if stream.block_size == 0 {
        errors.push(ConfigValidationError::ZeroBlockSize);
    }
    if stream.version == 0 || stream.version > CURRENT_STREAM_VERSION {
        errors.push(ConfigValidationError::UnsupportedVersion {
            version: stream.version,
        });
    }

    errors
}
