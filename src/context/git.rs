// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Minimal git metadata read straight from the `.git` directory.

use std::path::{Path, PathBuf};

use crate::types::GitInfo;

const BRANCH_REF_PREFIX: &str = "ref: refs/heads/";

/// Read branch and commit for the repository at `root`.
///
/// Returns `None` when there is no readable git metadata.
pub fn read_git_info(root: &Path) -> Option<GitInfo> {
    let git_dir = resolve_git_dir(root)?;
    let head = std::fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    if let Some(branch) = head.strip_prefix(BRANCH_REF_PREFIX) {
        let commit = resolve_ref(&git_dir, &format!("refs/heads/{}", branch)).unwrap_or_default();
        return Some(GitInfo {
            branch: branch.to_string(),
            commit,
            detached: false,
        });
    }

    if is_object_id(head) {
        return Some(GitInfo {
            branch: "HEAD".to_string(),
            commit: head.to_string(),
            detached: true,
        });
    }

    tracing::debug!(head = %head, "Unrecognized HEAD contents");
    None
}

/// Locate the git directory, following a worktree `gitdir:` pointer once.
fn resolve_git_dir(root: &Path) -> Option<PathBuf> {
    let dot_git = root.join(".git");
    if dot_git.is_dir() {
        return Some(dot_git);
    }
    if dot_git.is_file() {
        let content = std::fs::read_to_string(&dot_git).ok()?;
        let target = content.trim().strip_prefix("gitdir:")?.trim();
        let target = PathBuf::from(target);
        let target = if target.is_absolute() {
            target
        } else {
            root.join(target)
        };
        return target.is_dir().then_some(target);
    }
    None
}

/// Resolve a ref from its loose file, falling back to `packed-refs`.
fn resolve_ref(git_dir: &Path, refname: &str) -> Option<String> {
    if let Ok(loose) = std::fs::read_to_string(git_dir.join(refname)) {
        let loose = loose.trim();
        if is_object_id(loose) {
            return Some(loose.to_string());
        }
    }

    let packed = std::fs::read_to_string(git_dir.join("packed-refs")).ok()?;
    packed
        .lines()
        .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
        .filter_map(|line| line.split_once(' '))
        .find(|(_, name)| *name == refname)
        .map(|(sha, _)| sha.to_string())
}

fn is_object_id(s: &str) -> bool {
    (s.len() == 40 || s.len() == 64) && s.chars().all(|c| c.is_ascii_hexdigit())
}
