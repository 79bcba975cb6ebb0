// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration module for OpenPilot.
//!
//! Handles the [`AIConfig`] value, its validation, partial updates, and
//! loading from multiple sources:
//! - Global config: ~/.openpilot/config.json
//! - Workspace config: .openpilot.json, .openpilot/config.json, openpilot.config.json or .openpilot.yaml
//! - Environment: `OPENPILOT_PROVIDER`, `OPENPILOT_MODEL`, `OPENPILOT_API_KEY`, `OPENPILOT_API_URL`
//! - CLI options: command-line arguments
//!
//! Configuration is merged with precedence (CLI > env > workspace > global > defaults).

mod loader;
mod merger;
mod types;

pub use loader::{
    get_global_config_dir, get_global_config_path, load_config_file, load_global_config,
    load_workspace_config, CONFIG_FILES, GLOBAL_CONFIG_DIR, GLOBAL_CONFIG_FILE,
};

pub use merger::{AIConfigPatch, CliOptions, ENV_API_KEY, ENV_API_URL, ENV_MODEL, ENV_PROVIDER};

pub use types::{AIConfig, AIProvider, DEFAULT_TIMEOUT_MS};

use crate::error::ConfigError;
use std::path::Path;

/// Load and merge all configuration sources for a workspace.
///
/// This is the main entry point for configuration loading. The result is
/// validated.
pub fn load_config(workspace_root: &Path, cli_options: CliOptions) -> Result<AIConfig, ConfigError> {
    let global = load_global_config()?.unwrap_or_default();
    let workspace = load_workspace_config(workspace_root)?.unwrap_or_default();

    let patch = global
        .overlay(workspace)
        .overlay(AIConfigPatch::from_env())
        .overlay(cli_options.into());

    AIConfig::default().merge(&patch)
}
