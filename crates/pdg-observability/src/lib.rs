// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # pdg-observability
//!
//! Logging setup shared by the PDG tools.
//!
//! Library crates only emit `tracing` events; binaries call [`init_logging`] once with the
//! per-crate debug flags from their command line.
//!
//! ## Features
//! - `file-logging`: also write every run to a timestamped log folder (desktop only)

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod config;
pub mod init;

pub use cli::*;
pub use config::*;
pub use init::*;

/// Known PDG crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "pdg",
    "pdg-serialization",
    "pdg-config",
    "pdg-structures",
    "pdg-observability",
    "inspect_stream",
];
