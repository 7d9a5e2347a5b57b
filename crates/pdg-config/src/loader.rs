// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{validate_config, ConfigError, ConfigResult, ErrorMode, PdgConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// File name searched for when no explicit path is given.
pub const CONFIG_FILE_NAME: &str = "pdg_serialization.toml";

/// Find the PDG configuration file
///
/// Search order:
/// 1. `PDG_CONFIG_PATH` environment variable
/// 2. Current working directory: `./pdg_serialization.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("PDG_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        }
        return Err(ConfigError::FileNotFound(format!(
            "Config file specified by PDG_CONFIG_PATH not found: {}",
            path.display()
        )));
    }

    let mut search_paths = Vec::new();
    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));
        let mut current = cwd.as_path();
        for _ in 0..5 {
            match current.parent() {
                Some(parent) => {
                    search_paths.push(parent.join(CONFIG_FILE_NAME));
                    current = parent;
                }
                None => break,
            }
        }
    }

    if let Some(found) = search_paths.iter().find(|path| path.exists()) {
        return Ok(found.clone());
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "PDG configuration file '{}' not found in any of these locations:\n{}\n\nSet PDG_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, will search for config file.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Returns
///
/// Validated `PdgConfig` with all overrides applied
///
/// # Errors
///
/// Returns error if config file is not found, contains invalid TOML, an override has an
/// unparsable value, or the result fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<PdgConfig> {
    let config_file = match config_path {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };

    let content = fs::read_to_string(&config_file)?;
    let mut config: PdgConfig = toml::from_str(&content)?;

    apply_environment_overrides(&mut config)?;
    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `PDG_STREAM_TAGS` -> `stream.tags_enabled`
/// - `PDG_STREAM_VERSION` -> `stream.version`
/// - `PDG_STREAM_BLOCK_SIZE` -> `stream.block_size`
/// - `PDG_STREAM_ERROR_MODE` -> `stream.error_mode`
pub fn apply_environment_overrides(config: &mut PdgConfig) -> ConfigResult<()> {
    let overrides = [
        ("PDG_STREAM_TAGS", "stream_tags"),
        ("PDG_STREAM_VERSION", "stream_version"),
        ("PDG_STREAM_BLOCK_SIZE", "stream_block_size"),
        ("PDG_STREAM_ERROR_MODE", "stream_error_mode"),
    ];
    for (variable, key) in overrides {
        if let Ok(value) = env::var(variable) {
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"stream_tags": "false", "stream_block_size": "4096"}`)
///
/// Unrecognized keys are ignored.
pub fn apply_cli_overrides(
    config: &mut PdgConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        apply_override(config, key, value)?;
    }
    Ok(())
}

fn apply_override(config: &mut PdgConfig, key: &str, value: &str) -> ConfigResult<()> {
    let stream = &mut config.stream;
    match key {
        "stream_tags" => stream.tags_enabled = parse_flag(key, value)?,
        "stream_version" => stream.version = parse_number(key, value)?,
        "stream_block_size" => stream.block_size = parse_number(key, value)?,
        "stream_error_mode" => stream.error_mode = value.parse::<ErrorMode>()?,
        _ => {}
    }
    Ok(())
}

fn parse_flag(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} expects a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value.trim().parse::<T>().map_err(|_| {
        ConfigError::InvalidValue(format!("{} expects a number, got '{}'", key, value))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const STREAM_VARIABLES: [&str; 4] = [
        "PDG_STREAM_TAGS",
        "PDG_STREAM_VERSION",
        "PDG_STREAM_BLOCK_SIZE",
        "PDG_STREAM_ERROR_MODE",
    ];

    fn clear_stream_variables() {
        for variable in STREAM_VARIABLES {
            env::remove_var(variable);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("PDG_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("PDG_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("does_not_exist.toml");

        env::set_var("PDG_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("PDG_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_stream_variables();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[stream]").unwrap();
        writeln!(file, "tags_enabled = false").unwrap();
        writeln!(file, "block_size = 256").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert!(!config.stream.tags_enabled);
        assert_eq!(config.stream.block_size, 256);
        assert_eq!(config.stream.version, 1);
        assert_eq!(config.stream.error_mode, ErrorMode::Propagate);
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_stream_variables();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[stream]").unwrap();
        writeln!(file, "block_size = 0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_stream_variables();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&config_path, "[stream\nblock_size = ").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = PdgConfig::default();

        env::set_var("PDG_STREAM_TAGS", "no");
        env::set_var("PDG_STREAM_BLOCK_SIZE", "4096");
        env::set_var("PDG_STREAM_ERROR_MODE", "log_and_default");

        let result = apply_environment_overrides(&mut config);
        clear_stream_variables();

        assert!(result.is_ok());
        assert!(!config.stream.tags_enabled);
        assert_eq!(config.stream.block_size, 4096);
        assert_eq!(config.stream.error_mode, ErrorMode::LogAndDefault);
    }

    #[test]
    fn test_environment_override_bad_value() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let mut config = PdgConfig::default();

        env::set_var("PDG_STREAM_BLOCK_SIZE", "lots");
        let result = apply_environment_overrides(&mut config);
        clear_stream_variables();

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = PdgConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("stream_tags".to_string(), "false".to_string());
        cli_args.insert("stream_block_size".to_string(), "64".to_string());
        cli_args.insert("unrelated".to_string(), "ignored".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert!(!config.stream.tags_enabled);
        assert_eq!(config.stream.block_size, 64);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[stream]").unwrap();
        writeln!(file, "block_size = 128").unwrap();
        writeln!(file, "error_mode = \"propagate\"").unwrap();

        env::set_var("PDG_STREAM_BLOCK_SIZE", "512");
        env::set_var("PDG_STREAM_ERROR_MODE", "log_and_default");

        let mut cli_args = HashMap::new();
        cli_args.insert("stream_block_size".to_string(), "2048".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_stream_variables();
        let config = config.unwrap();

        // CLI wins for block size, env wins for error mode (no CLI override)
        assert_eq!(config.stream.block_size, 2048);
        assert_eq!(config.stream.error_mode, ErrorMode::LogAndDefault);
    }
}
