use glob::Pattern;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::{Error, Result};
use crate::fragment::{self, RepairOutcome};
use crate::progress::ProgressReporter;

/// Name of the directory this tool writes merged files into.
pub const OUTPUT_DIR_NAME: &str = "output";

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WalkStats {
    pub fragments: usize,
    pub repaired: usize,
    pub mismatched: usize,
    pub failed: usize,
}

/// Repair every fragment under `cache_root`.
///
/// A fragment that fails to classify or copy is logged and counted; an error
/// listing a directory stops the walk.
pub fn walk(
    cache_root: &Path,
    ignore_globs: &[String],
    reporter: &dyn ProgressReporter,
) -> Result<WalkStats> {
    let ignore_patterns = compile_patterns(ignore_globs);
    let mut stats = WalkStats::default();

    reporter.on_walk_start(cache_root);
    let start = Instant::now();

    let walker = WalkDir::new(cache_root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored(entry, &ignore_patterns));

    for entry_result in walker {
        let entry = entry_result.map_err(|source| Error::Walk {
            path: source
                .path()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| cache_root.to_path_buf()),
            source,
        })?;

        if !entry.file_type().is_file() || !fragment::is_fragment(entry.path()) {
            continue;
        }
        stats.fragments += 1;
        let source = entry.path();

        let (role, destination) = match fragment::classify(source) {
            Ok(classified) => classified,
            Err(e) => {
                warn!("Skipping {}: {}", source.display(), e);
                stats.failed += 1;
                continue;
            }
        };

        match fragment::repair(source, &destination) {
            Ok(RepairOutcome::Repaired(_)) => {
                info!("Repaired {} stream: {}", role, destination.display());
                stats.repaired += 1;
                reporter.on_fragment_repaired(source, role);
            }
            Ok(RepairOutcome::SentinelMismatch) => stats.mismatched += 1,
            Err(e) => {
                error!("Failed to repair {}: {}", source.display(), e);
                stats.failed += 1;
            }
        }
    }

    let duration = start.elapsed();
    debug!(
        "Walk completed in {:.2}s: {:?}",
        duration.as_secs_f64(),
        stats
    );
    reporter.on_walk_complete(stats.repaired, duration.as_secs_f64());
    Ok(stats)
}

/// Every directory below `root`, excluding any whose path under `root`
/// mentions the output directory and any matching `ignore_globs`.
pub fn find_session_dirs(root: &Path, ignore_globs: &[String]) -> Result<Vec<PathBuf>> {
    let ignore_patterns = compile_patterns(ignore_globs);
    let mut dirs = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            !is_output_path(root, entry.path()) && !is_ignored(entry, &ignore_patterns)
        });

    for entry_result in walker {
        let entry = entry_result.map_err(|source| Error::Walk {
            path: root.to_path_buf(),
            source,
        })?;
        if entry.file_type().is_dir() {
            dirs.push(entry.into_path());
        }
    }

    Ok(dirs)
}

fn is_output_path(root: &Path, path: &Path) -> bool {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .contains(OUTPUT_DIR_NAME)
}

fn compile_patterns(globs: &[String]) -> Vec<Pattern> {
    globs
        .iter()
        .filter_map(|glob| match Pattern::new(glob) {
            Ok(p) => Some(p),
            Err(e) => {
                error!("Invalid glob pattern '{}': {}", glob, e);
                None
            }
        })
        .collect()
}

fn is_ignored(entry: &DirEntry, patterns: &[Pattern]) -> bool {
    patterns.iter().any(|pattern| pattern.matches_path(entry.path()))
}
