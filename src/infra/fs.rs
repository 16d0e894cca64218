//! # File System Operations Module / 文件系统操作模块
//!
//! This module provides path utilities for watch directories and for
//! matching changed files against a suite's watch glob.
//!
//! 此模块为监视目录提供路径工具，并将变化的文件与套件的监视模式进行匹配。

use anyhow::{Context, Result};
use glob::{MatchOptions, Pattern};
use std::fs;
use std::path::{Path, PathBuf};

/// Glob options used for watch patterns: `*` also crosses directory
/// separators, so `*.py` matches files at any depth.
pub const WATCH_MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: false,
    require_literal_leading_dot: false,
};

/// Expands `~` and environment variables in a configured watch directory
/// and anchors relative paths at `base`.
///
/// # Arguments
/// * `raw` - The configured directory, `None` meaning `base` itself
/// * `base` - Directory relative paths are resolved against
///
/// # Returns
/// The absolute directory, canonicalized when it exists
pub fn resolve_watch_dir(raw: Option<&str>, base: &Path) -> Result<PathBuf> {
    let expanded = match raw {
        Some(raw) => shellexpand::full(raw)
            .with_context(|| format!("Failed to expand watch directory: {raw}"))?
            .into_owned(),
        None => String::from("."),
    };

    let path = PathBuf::from(expanded);
    let path = if path.is_absolute() {
        path
    } else {
        base.join(path)
    };

    Ok(absolute_path(&path).unwrap_or(path))
}

/// Whether `changed` lies inside `dir` and matches `pattern`, either by its
/// path relative to `dir` or by its file name alone.
pub fn matches_watch_glob(changed: &Path, dir: &Path, pattern: &Pattern) -> bool {
    let Ok(relative) = changed.strip_prefix(dir) else {
        return false;
    };

    if pattern.matches_path_with(relative, WATCH_MATCH_OPTIONS) {
        return true;
    }

    relative
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| pattern.matches_with(name, WATCH_MATCH_OPTIONS))
}

/// Gets the absolute path from a potentially relative path.
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}
