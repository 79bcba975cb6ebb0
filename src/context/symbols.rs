// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Lightweight import and symbol detection.
//!
//! Line-oriented regex heuristics per language, good enough to enrich a
//! prompt. Not a parser: multi-line declarations and macros are missed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::types::{Position, SymbolInfo, SymbolKind};

/// Compile `(pattern, kind)` pairs, dropping any pattern that fails.
fn compile_all(specs: &[(&str, SymbolKind)]) -> Vec<(Regex, SymbolKind)> {
    specs
        .iter()
        .filter_map(|(pattern, kind)| match Regex::new(pattern) {
            Ok(re) => Some((re, *kind)),
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Invalid symbol pattern");
                None
            }
        })
        .collect()
}

fn compile_imports(specs: &[&str]) -> Vec<Regex> {
    specs.iter().filter_map(|p| Regex::new(p).ok()).collect()
}

/// Per-language symbol patterns. Each has a `name` capture group.
struct LanguagePatterns {
    typescript: Vec<(Regex, SymbolKind)>,
    rust: Vec<(Regex, SymbolKind)>,
    python: Vec<(Regex, SymbolKind)>,
    go: Vec<(Regex, SymbolKind)>,
    java: Vec<(Regex, SymbolKind)>,
}

impl LanguagePatterns {
    fn new() -> Self {
        Self {
            typescript: compile_all(&[
                (r"^\s*(?:export\s+)?(?:default\s+)?(?:async\s+)?function\s*\*?\s+(?P<name>\w+)", SymbolKind::Function),
                (r"^\s*(?:export\s+)?(?:default\s+)?(?:abstract\s+)?class\s+(?P<name>\w+)", SymbolKind::Class),
                (r"^\s*(?:export\s+)?interface\s+(?P<name>\w+)", SymbolKind::Interface),
                (r"^\s*(?:export\s+)?(?:const\s+)?enum\s+(?P<name>\w+)", SymbolKind::Enum),
                (r"^\s*(?:export\s+)?const\s+(?P<name>\w+)\s*=\s*(?:async\s+)?(?:\([^)]*\)|\w+)\s*=>", SymbolKind::Function),
            ]),
            rust: compile_all(&[
                (r"^(?P<indent>\s*)(?:pub(?:\s*\([^)]*\))?\s+)?(?:const\s+)?(?:async\s+)?(?:unsafe\s+)?fn\s+(?P<name>\w+)", SymbolKind::Function),
                (r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?struct\s+(?P<name>\w+)", SymbolKind::Struct),
                (r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?enum\s+(?P<name>\w+)", SymbolKind::Enum),
                (r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?trait\s+(?P<name>\w+)", SymbolKind::Interface),
                (r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?mod\s+(?P<name>\w+)", SymbolKind::Module),
                (r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?(?:const|static)\s+(?P<name>[A-Z_][A-Z0-9_]*)\s*:", SymbolKind::Constant),
            ]),
            python: compile_all(&[
                (r"^(?P<indent>\s*)(?:async\s+)?def\s+(?P<name>\w+)", SymbolKind::Function),
                (r"^\s*class\s+(?P<name>\w+)", SymbolKind::Class),
            ]),
            go: compile_all(&[
                (r"^func\s+\(\s*(?:\w+\s+)?\*?(?P<container>\w+)[^)]*\)\s*(?P<name>\w+)", SymbolKind::Method),
                (r"^func\s+(?P<name>\w+)", SymbolKind::Function),
                (r"^type\s+(?P<name>\w+)\s+struct", SymbolKind::Struct),
                (r"^type\s+(?P<name>\w+)\s+interface", SymbolKind::Interface),
            ]),
            java: compile_all(&[
                (r"^\s*(?:public|private|protected)?\s*(?:abstract\s+)?(?:final\s+)?(?:static\s+)?class\s+(?P<name>\w+)", SymbolKind::Class),
                (r"^\s*(?:public\s+)?interface\s+(?P<name>\w+)", SymbolKind::Interface),
                (r"^\s*(?:public\s+)?enum\s+(?P<name>\w+)", SymbolKind::Enum),
                (r"^\s+(?:(?:public|private|protected|static|final|synchronized|abstract)\s+)+[\w<>\[\],\s]+?\s+(?P<name>\w+)\s*\([^)]*\)\s*(?:throws\s+[\w.,\s]+)?\{?\s*$", SymbolKind::Method),
            ]),
        }
    }

    fn get(&self, language: &str) -> &[(Regex, SymbolKind)] {
        match language {
            "typescript" | "typescriptreact" | "javascript" | "javascriptreact" => &self.typescript,
            "rust" => &self.rust,
            "python" => &self.python,
            "go" => &self.go,
            "java" => &self.java,
            _ => &[],
        }
    }
}

struct ImportPatterns {
    typescript: Vec<Regex>,
    rust: Vec<Regex>,
    python: Vec<Regex>,
    go: Vec<Regex>,
    java: Vec<Regex>,
}

impl ImportPatterns {
    fn new() -> Self {
        Self {
            typescript: compile_imports(&[
                r#"^\s*import\s+(?:[^'"]*?\s+from\s+)?['"](?P<path>[^'"]+)['"]"#,
                r#"^\s*export\s+[^'"]*?\s+from\s+['"](?P<path>[^'"]+)['"]"#,
                r#"require\(\s*['"](?P<path>[^'"]+)['"]\s*\)"#,
            ]),
            rust: compile_imports(&[
                r"^\s*(?:pub(?:\s*\([^)]*\))?\s+)?use\s+(?P<path>[^;]+);",
                r"^\s*extern\s+crate\s+(?P<path>\w+)",
            ]),
            python: compile_imports(&[
                r"^\s*from\s+(?P<path>[\w.]+)\s+import\b",
                r"^\s*import\s+(?P<path>[\w.]+)",
            ]),
            go: compile_imports(&[
                r#"^\s*import\s+(?:\w+\s+)?"(?P<path>[^"]+)""#,
            ]),
            java: compile_imports(&[
                r"^\s*import\s+(?:static\s+)?(?P<path>[\w.*]+)\s*;",
            ]),
        }
    }

    fn get(&self, language: &str) -> &[Regex] {
        match language {
            "typescript" | "typescriptreact" | "javascript" | "javascriptreact" => &self.typescript,
            "rust" => &self.rust,
            "python" => &self.python,
            "go" => &self.go,
            "java" => &self.java,
            _ => &[],
        }
    }
}

static SYMBOL_PATTERNS: Lazy<LanguagePatterns> = Lazy::new(LanguagePatterns::new);
static IMPORT_PATTERNS: Lazy<ImportPatterns> = Lazy::new(ImportPatterns::new);
static GO_BLOCK_IMPORT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#"^\s*(?:[\w.]+\s+)?"(?P<path>[^"]+)""#).ok());
static RUST_IMPL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^impl(?:\s*<[^>]*>)?\s+(?:[\w:]+(?:<[^>]*>)?\s+for\s+)?(?P<name>\w+)").ok()
});

/// Whether symbol and import detection knows this language.
pub fn is_supported(language: &str) -> bool {
    !SYMBOL_PATTERNS.get(language).is_empty()
}

/// Extract imported module paths, in first-seen order without duplicates.
pub fn extract_imports(content: &str, language: &str) -> Vec<String> {
    let patterns = IMPORT_PATTERNS.get(language);
    let mut imports: Vec<String> = Vec::new();
    let mut push = |path: &str| {
        let path = path.trim().to_string();
        if !path.is_empty() && !imports.contains(&path) {
            imports.push(path);
        }
    };

    let mut in_go_block = false;
    for line in content.lines() {
        if language == "go" {
            let trimmed = line.trim();
            if trimmed.starts_with("import (") {
                in_go_block = true;
                continue;
            }
            if in_go_block {
                if trimmed.starts_with(')') {
                    in_go_block = false;
                } else if let Some(caps) = GO_BLOCK_IMPORT.as_ref().and_then(|re| re.captures(line)) {
                    push(&caps["path"]);
                }
                continue;
            }
        }

        for re in patterns {
            if let Some(caps) = re.captures(line) {
                push(&caps["path"]);
                break;
            }
        }
    }

    imports
}

/// Extract declared symbols with 0-indexed positions.
///
/// Indented functions inside a Rust `impl` or a Python `class` are reported
/// as methods of that container.
pub fn extract_symbols(content: &str, language: &str) -> Vec<SymbolInfo> {
    let patterns = SYMBOL_PATTERNS.get(language);
    if patterns.is_empty() {
        return Vec::new();
    }

    let mut symbols = Vec::new();
    let mut container: Option<String> = None;

    for (line_no, line) in content.lines().enumerate() {
        let top_level = !line.starts_with(char::is_whitespace);

        if language == "rust" {
            if let Some(caps) = RUST_IMPL.as_ref().and_then(|re| re.captures(line)) {
                container = Some(caps["name"].to_string());
                continue;
            }
        }
        if top_level && !line.trim().is_empty() && !line.starts_with('}') && language != "go" {
            // A new top-level item ends the previous container unless it opens one.
            if !(language == "python" && line.starts_with("class ")) {
                container = None;
            }
        }

        for (re, kind) in patterns {
            let Some(caps) = re.captures(line) else {
                continue;
            };
            let Some(name) = caps.name("name") else {
                continue;
            };

            let indented = caps.name("indent").is_some_and(|m| !m.as_str().is_empty());
            let (kind, container_name) = match (kind, caps.name("container")) {
                (_, Some(explicit)) => (*kind, Some(explicit.as_str().to_string())),
                (SymbolKind::Function, None) if indented && container.is_some() => {
                    (SymbolKind::Method, container.clone())
                }
                _ => (*kind, None),
            };

            if kind == SymbolKind::Class && language == "python" {
                container = Some(name.as_str().to_string());
            }

            symbols.push(SymbolInfo {
                name: name.as_str().to_string(),
                kind,
                location: Position {
                    line: line_no,
                    character: name.start(),
                },
                container_name,
            });
            break;
        }
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typescript_imports() {
        let source = r#"import React from 'react';
import { useState } from "react";
import './styles.css';
export { helper } from './helper';
const fs = require('fs');
"#;
        let imports = extract_imports(source, "typescriptreact");
        assert_eq!(imports, vec!["react", "./styles.css", "./helper", "fs"]);
    }

    #[test]
    fn test_python_imports() {
        let source = "import os\nfrom typing import List\nimport numpy as np\n";
        assert_eq!(extract_imports(source, "python"), vec!["os", "typing", "numpy"]);
    }

    #[test]
    fn test_rust_imports() {
        let source = "use std::path::Path;\npub use crate::types::{A, B};\nextern crate alloc;\n";
        assert_eq!(
            extract_imports(source, "rust"),
            vec!["std::path::Path", "crate::types::{A, B}", "alloc"]
        );
    }

    #[test]
    fn test_go_import_block() {
        let source = "package main\n\nimport (\n\t\"fmt\"\n\tlog \"github.com/sirupsen/logrus\"\n)\n\nimport \"os\"\n";
        assert_eq!(
            extract_imports(source, "go"),
            vec!["fmt", "github.com/sirupsen/logrus", "os"]
        );
    }

    #[test]
    fn test_java_imports() {
        let source = "package a;\nimport java.util.List;\nimport static org.junit.Assert.*;\n";
        assert_eq!(
            extract_imports(source, "java"),
            vec!["java.util.List", "org.junit.Assert.*"]
        );
    }

    #[test]
    fn test_rust_symbols_with_impl_container() {
        let source = r#"pub struct Engine {
    state: u32,
}

impl Engine {
    pub fn new() -> Self {
        Self { state: 0 }
    }
}

pub async fn run() {}
const MAX_SIZE: usize = 10;
"#;
        let symbols = extract_symbols(source, "rust");
        let names: Vec<_> = symbols.iter().map(|s| (s.name.as_str(), s.kind)).collect();
        assert_eq!(
            names,
            vec![
                ("Engine", SymbolKind::Struct),
                ("new", SymbolKind::Method),
                ("run", SymbolKind::Function),
                ("MAX_SIZE", SymbolKind::Constant),
            ]
        );
        assert_eq!(symbols[1].container_name.as_deref(), Some("Engine"));
        assert_eq!(symbols[1].location, Position { line: 5, character: 11 });
        assert!(symbols[2].container_name.is_none());
    }

    #[test]
    fn test_python_methods() {
        let source = "class Greeter:\n    def greet(self):\n        pass\n\ndef main():\n    pass\n";
        let symbols = extract_symbols(source, "python");
        assert_eq!(symbols.len(), 3);
        assert_eq!(symbols[0].kind, SymbolKind::Class);
        assert_eq!(symbols[1].kind, SymbolKind::Method);
        assert_eq!(symbols[1].container_name.as_deref(), Some("Greeter"));
        assert_eq!(symbols[2].kind, SymbolKind::Function);
        assert!(symbols[2].container_name.is_none());
    }

    #[test]
    fn test_go_method_receiver() {
        let source = "func (s *Server) Start() error {\n}\n\nfunc main() {\n}\n";
        let symbols = extract_symbols(source, "go");
        assert_eq!(symbols[0].name, "Start");
        assert_eq!(symbols[0].kind, SymbolKind::Method);
        assert_eq!(symbols[0].container_name.as_deref(), Some("Server"));
        assert_eq!(symbols[1].name, "main");
        assert_eq!(symbols[1].kind, SymbolKind::Function);
    }

    #[test]
    fn test_typescript_symbols() {
        let source = "export class Api {}\nexport interface Props {}\nexport const add = (a, b) => a + b;\nfunction helper() {}\n";
        let names: Vec<_> = extract_symbols(source, "typescript")
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Api", "Props", "add", "helper"]);
    }

    #[test]
    fn test_unsupported_language() {
        assert!(!is_supported("markdown"));
        assert!(extract_symbols("# Title", "markdown").is_empty());
        assert!(extract_imports("# Title", "markdown").is_empty());
    }
}
