// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Configuration loading from files.
//!
//! Config files hold an [`AIConfigPatch`] in JSON or YAML. They are read-only
//! input; the core never writes them.

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::merger::AIConfigPatch;

/// Workspace config file names to search for (in order).
pub const CONFIG_FILES: &[&str] = &[
    ".openpilot.json",
    ".openpilot/config.json",
    "openpilot.config.json",
    ".openpilot.yaml",
];

/// Global config directory name.
pub const GLOBAL_CONFIG_DIR: &str = ".openpilot";

/// Global config file name.
pub const GLOBAL_CONFIG_FILE: &str = "config.json";

/// Get the global config directory path.
pub fn get_global_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(GLOBAL_CONFIG_DIR))
}

/// Get the global config file path.
pub fn get_global_config_path() -> Option<PathBuf> {
    get_global_config_dir().map(|dir| dir.join(GLOBAL_CONFIG_FILE))
}

/// Load global configuration from ~/.openpilot/config.json.
pub fn load_global_config() -> Result<Option<AIConfigPatch>, ConfigError> {
    let path = match get_global_config_path() {
        Some(p) => p,
        None => return Ok(None),
    };

    if !path.exists() {
        return Ok(None);
    }

    load_config_file(&path).map(Some)
}

/// Load workspace configuration from the workspace root.
///
/// The first file in [`CONFIG_FILES`] that exists wins.
pub fn load_workspace_config(workspace_root: &Path) -> Result<Option<AIConfigPatch>, ConfigError> {
    for filename in CONFIG_FILES {
        let path = workspace_root.join(filename);
        if path.exists() {
            tracing::debug!(path = %path.display(), "Loading workspace config");
            return load_config_file(&path).map(Some);
        }
    }
    Ok(None)
}

/// Load a configuration file (JSON or YAML).
pub fn load_config_file(path: &Path) -> Result<AIConfigPatch, ConfigError> {
    let content = std::fs::read_to_string(path)?;

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match extension.to_lowercase().as_str() {
        "yaml" | "yml" => serde_yaml::from_str(&content).map_err(ConfigError::from),
        _ => serde_json::from_str(&content).map_err(ConfigError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_files_order() {
        assert_eq!(CONFIG_FILES[0], ".openpilot.json");
    }

    #[test]
    fn test_global_config_dir() {
        if let Some(dir) = get_global_config_dir() {
            assert!(dir.ends_with(".openpilot"));
        }
    }

    #[test]
    fn test_load_workspace_config_not_found() {
        let temp = TempDir::new().unwrap();
        let result = load_workspace_config(temp.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_load_workspace_config_json() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".openpilot.json"),
            r#"{"provider": "openai", "model": "gpt-4o", "temperature": 0.3}"#,
        )
        .unwrap();

        let patch = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(patch.provider.as_deref(), Some("openai"));
        assert_eq!(patch.model.as_deref(), Some("gpt-4o"));
        assert_eq!(patch.temperature, Some(0.3));
    }

    #[test]
    fn test_load_workspace_config_yaml() {
        let temp = TempDir::new().unwrap();
        std::fs::write(
            temp.path().join(".openpilot.yaml"),
            "provider: ollama\nmodel: codellama\napiUrl: http://gpu-box:11434\n",
        )
        .unwrap();

        let patch = load_workspace_config(temp.path()).unwrap().unwrap();
        assert_eq!(patch.provider.as_deref(), Some("ollama"));
        assert_eq!(patch.api_url, Some(Some("http://gpu-box:11434".to_string())));
    }

    #[test]
    fn test_load_invalid_json() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(".openpilot.json");
        std::fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            load_config_file(&path),
            Err(ConfigError::JsonError(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        assert!(matches!(
            load_config_file(&temp.path().join("missing.json")),
            Err(ConfigError::NotFound(_))
        ));
    }
}
