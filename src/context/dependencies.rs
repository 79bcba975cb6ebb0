// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Dependency extraction from root manifests.
//!
//! Each manifest is parsed on its own; a failure is logged and contributes
//! no dependencies without affecting the others.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::types::{Dependency, Ecosystem};

/// Version recorded when a manifest gives none.
pub const ANY_VERSION: &str = "*";

static REQUIREMENT_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9_.-]+)([><=!~]+.*)?$").ok());

/// Collect dependencies from every recognized manifest under `root`.
pub fn extract_dependencies(root: &Path) -> Vec<Dependency> {
    let mut dependencies = Vec::new();

    if let Some(content) = read_manifest(root, "package.json") {
        match parse_package_json(&content) {
            Ok(deps) => dependencies.extend(deps),
            Err(e) => tracing::warn!(error = %e, "Error reading package.json"),
        }
    }

    if let Some(content) = read_manifest(root, "requirements.txt") {
        dependencies.extend(parse_requirements(&content));
    }

    if let Some(content) = read_manifest(root, "Cargo.toml") {
        match parse_cargo_toml(&content) {
            Ok(deps) => dependencies.extend(deps),
            Err(e) => tracing::warn!(error = %e, "Error reading Cargo.toml"),
        }
    }

    dependencies
}

fn read_manifest(root: &Path, name: &str) -> Option<String> {
    let path = root.join(name);
    if !path.is_file() {
        return None;
    }
    match std::fs::read_to_string(&path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to read manifest");
            None
        }
    }
}

/// Add `dep`, or overwrite the version of an entry with the same name in place.
fn upsert(deps: &mut Vec<Dependency>, dep: Dependency) {
    match deps.iter_mut().find(|d| d.name == dep.name) {
        Some(existing) => existing.version = dep.version,
        None => deps.push(dep),
    }
}

/// Parse `dependencies` and `devDependencies` from a package.json. A name in
/// both sections is listed once, with the `devDependencies` version.
pub fn parse_package_json(content: &str) -> Result<Vec<Dependency>, serde_json::Error> {
    let manifest: Value = serde_json::from_str(content)?;
    let mut deps = Vec::new();

    for section in ["dependencies", "devDependencies"] {
        if let Some(Value::Object(entries)) = manifest.get(section) {
            for (name, version) in entries {
                let version = match version {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                upsert(
                    &mut deps,
                    Dependency {
                        name: name.clone(),
                        version,
                        ecosystem: Ecosystem::Npm,
                    },
                );
            }
        }
    }

    Ok(deps)
}

/// Parse a pip requirements list. Comments, blank lines and unrecognized lines
/// are skipped.
pub fn parse_requirements(content: &str) -> Vec<Dependency> {
    let Some(re) = REQUIREMENT_LINE.as_ref() else {
        return Vec::new();
    };

    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| re.captures(line))
        .map(|caps| Dependency {
            name: caps[1].to_string(),
            version: caps
                .get(2)
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| ANY_VERSION.to_string()),
            ecosystem: Ecosystem::Pip,
        })
        .collect()
}

/// Parse `[dependencies]` and `[dev-dependencies]` from a Cargo.toml. As with
/// package.json, the dev entry wins when a crate appears in both.
pub fn parse_cargo_toml(content: &str) -> Result<Vec<Dependency>, toml::de::Error> {
    let manifest: toml::Table = toml::from_str(content)?;
    let mut deps = Vec::new();

    for section in ["dependencies", "dev-dependencies"] {
        if let Some(toml::Value::Table(entries)) = manifest.get(section) {
            for (name, spec) in entries {
                let version = match spec {
                    toml::Value::String(v) => v.clone(),
                    toml::Value::Table(t) => t
                        .get("version")
                        .and_then(|v| v.as_str())
                        .unwrap_or(ANY_VERSION)
                        .to_string(),
                    _ => ANY_VERSION.to_string(),
                };
                upsert(
                    &mut deps,
                    Dependency {
                        name: name.clone(),
                        version,
                        ecosystem: Ecosystem::Cargo,
                    },
                );
            }
        }
    }

    Ok(deps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_package_json() {
        let deps = parse_package_json(
            r#"{
                "name": "web",
                "dependencies": {"react": "^18.2.0"},
                "devDependencies": {"typescript": "~5.3.0"}
            }"#,
        )
        .unwrap();

        assert_eq!(deps.len(), 2);
        assert!(deps
            .iter()
            .any(|d| d.name == "react" && d.version == "^18.2.0" && d.ecosystem == Ecosystem::Npm));
        assert!(deps.iter().any(|d| d.name == "typescript"));
    }

    #[test]
    fn test_package_json_dev_version_wins() {
        let deps = parse_package_json(
            r#"{
                "dependencies": {"lodash": "^4.0.0", "react": "^18.2.0"},
                "devDependencies": {"lodash": "4.17.21"}
            }"#,
        )
        .unwrap();

        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].name, "lodash");
        assert_eq!(deps[0].version, "4.17.21");
        assert_eq!(deps[1].name, "react");
    }

    #[test]
    fn test_parse_requirements() {
        let deps = parse_requirements(
            "# web stack\nflask>=2.0\n\nrequests\nnumpy==1.26.4\n-e git+https://example.com/x.git\n",
        );

        assert_eq!(deps.len(), 3);
        assert_eq!(deps[0].name, "flask");
        assert_eq!(deps[0].version, ">=2.0");
        assert_eq!(deps[1].name, "requests");
        assert_eq!(deps[1].version, "*");
        assert_eq!(deps[2].version, "==1.26.4");
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::Pip));
    }

    #[test]
    fn test_parse_cargo_toml() {
        let deps = parse_cargo_toml(
            r#"
[package]
name = "demo"

[dependencies]
serde = { version = "1.0", features = ["derive"] }
regex = "1"
local = { path = "../local" }

[dev-dependencies]
tempfile = "3"
"#,
        )
        .unwrap();

        assert_eq!(deps.len(), 4);
        let serde = deps.iter().find(|d| d.name == "serde").unwrap();
        assert_eq!(serde.version, "1.0");
        let local = deps.iter().find(|d| d.name == "local").unwrap();
        assert_eq!(local.version, "*");
        assert!(deps.iter().all(|d| d.ecosystem == Ecosystem::Cargo));
    }

    #[test]
    fn test_extract_dependencies_failure_is_isolated() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("package.json"), "{ broken").unwrap();
        std::fs::write(temp.path().join("requirements.txt"), "django>=4\n").unwrap();

        let deps = extract_dependencies(temp.path());
        assert_eq!(deps.len(), 1);
        assert_eq!(deps[0].name, "django");
    }

    #[test]
    fn test_extract_dependencies_none() {
        let temp = TempDir::new().unwrap();
        assert!(extract_dependencies(temp.path()).is_empty());
    }
}
