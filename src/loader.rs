//! Load a source tree from disk into a [`SourceCache`].
//!
//! Files are discovered with `walkdir` in file-name order, filtered by
//! extension and by exclude globs, and keyed by their root-relative path
//! with `/` separators. Excluded directories are pruned before the walk
//! enters them. Files that are not valid UTF-8 are skipped.

use std::fs;
use std::io;
use std::path::{Component, Path};

use globset::{Glob, GlobSet, GlobSetBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::cache::SourceCache;
use crate::error::{PinpointError, PinpointResult};

/// Directories never descended into, matched by name at any depth.
pub const DEFAULT_EXCLUDE_DIRS: &[&str] = &[
    ".git",
    ".dart_tool",
    "build",
    "node_modules",
    "target",
];

/// Which files a directory load picks up.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    /// File extensions to load, without the leading dot.
    pub extensions: Vec<String>,
    /// Additional glob patterns to skip, matched against root-relative paths.
    pub exclude: Vec<String>,
    pub follow_symlinks: bool,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        LoaderOptions {
            extensions: vec!["dart".to_string()],
            exclude: Vec::new(),
            follow_symlinks: false,
        }
    }
}

/// Summary of one directory load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub loaded: usize,
    /// Matching files skipped because they are not valid UTF-8.
    pub skipped: usize,
}

/// Load every matching file under `root` into `cache`.
///
/// Re-loading a path replaces its text. Fails when `root` is not a
/// directory, an exclude pattern is invalid or the walk hits an I/O error.
pub fn load_directory(
    root: &Path,
    options: &LoaderOptions,
    cache: &mut SourceCache,
) -> PinpointResult<LoadSummary> {
    if !root.is_dir() {
        return Err(PinpointError::source_not_found(root.display().to_string()));
    }

    let exclusions = build_glob_set(&options.exclude)?;
    let excluded = |relative: &Path| {
        let skip = should_exclude(relative) || exclusions.is_match(to_key(relative));
        if skip {
            debug!("excluded {}", relative.display());
        }
        skip
    };

    let mut summary = LoadSummary::default();
    let walker = WalkDir::new(root)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.path().strip_prefix(root).is_ok_and(excluded));
    for entry in walker {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }

        let full_path = entry.path();
        let relative = full_path
            .strip_prefix(root)
            .map_err(|e| PinpointError::internal(e.to_string()))?;
        if !has_extension(relative, &options.extensions) {
            continue;
        }
        let relative_str = to_key(relative);

        match fs::read_to_string(full_path) {
            Ok(content) => {
                cache.add_source(&relative_str, content);
                summary.loaded += 1;
            }
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                warn!("skipping {}: not valid UTF-8", relative_str);
                summary.skipped += 1;
            }
            Err(err) => return Err(err.into()),
        }
    }

    debug!(
        loaded = summary.loaded,
        skipped = summary.skipped,
        "loaded sources from {}",
        root.display()
    );
    Ok(summary)
}

/// Root-relative key with `/` separators.
fn to_key(relative: &Path) -> String {
    relative
        .to_string_lossy()
        .replace(std::path::MAIN_SEPARATOR, "/")
}

/// Whether any component of `relative` names a default-excluded directory.
fn should_exclude(relative: &Path) -> bool {
    relative.components().any(|component| match component {
        Component::Normal(name) => DEFAULT_EXCLUDE_DIRS.iter().any(|dir| name == *dir),
        _ => false,
    })
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| extensions.iter().any(|wanted| wanted == ext))
}

/// Build a GlobSet from a list of pattern strings.
fn build_glob_set(patterns: &[String]) -> PinpointResult<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern).map_err(|e| {
            PinpointError::invalid_args(format!("invalid glob pattern '{}': {}", pattern, e))
        })?;
        builder.add(glob);
    }
    builder
        .build()
        .map_err(|e| PinpointError::invalid_args(format!("invalid glob patterns: {}", e)))
}
