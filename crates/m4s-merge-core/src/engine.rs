use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::EngineSettings;
use crate::error::{Error, Result};
use crate::mux::{self, Ffmpeg, MergeOutcome, MuxerBinary};
use crate::progress::ProgressReporter;
use crate::scanner;
use crate::session::{self, Resolution, SessionInfo};
use crate::subtitle::SubtitleSource;

pub use crate::session::SkipReason;

pub struct Engine {
    settings: EngineSettings,
    muxer: Box<dyn MuxerBinary>,
    subtitles: Option<Box<dyn SubtitleSource>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedSession {
    pub path: PathBuf,
    pub reason: SkipReason,
}

#[derive(Debug, Default)]
pub struct RunSummary {
    pub repaired: usize,
    pub skipped: Vec<SkippedSession>,
    pub outputs: Vec<PathBuf>,
    /// Output directory of the last merged session.
    pub output_dir: Option<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    fn skip(&mut self, path: &Path, reason: SkipReason, reporter: &dyn ProgressReporter) {
        reporter.on_session_skipped(path, reason);
        self.skipped.push(SkippedSession {
            path: path.to_path_buf(),
            reason,
        });
    }
}

impl Engine {
    pub fn new(settings: EngineSettings, muxer: Box<dyn MuxerBinary>) -> Self {
        Self {
            settings,
            muxer,
            subtitles: None,
        }
    }

    pub fn with_subtitles(mut self, source: Box<dyn SubtitleSource>) -> Self {
        self.subtitles = Some(source);
        self
    }

    /// Run the whole pipeline:
    /// 1. Repair every fragment under the cache root
    /// 2. Find session directories
    /// 3. Resolve each session, then merge the ready ones one at a time
    pub fn run(&self, reporter: &dyn ProgressReporter) -> Result<RunSummary> {
        let start = Instant::now();
        let root = &self.settings.cache_root;
        if !root.is_dir() {
            return Err(Error::CacheRootMissing(root.clone()));
        }

        info!("Repairing fragments under {}", root.display());
        let walk_stats = scanner::walk(root, &self.settings.ignore_patterns, reporter)?;

        let sessions = discover_sessions(root, &self.settings.ignore_patterns)?;
        info!("{} session directories found", sessions.len());

        let mut summary = RunSummary {
            repaired: walk_stats.repaired,
            ..RunSummary::default()
        };
        let mut ready = Vec::new();
        for (index, dir) in sessions.iter().enumerate() {
            reporter.on_session_start(dir, index, sessions.len());
            match session::resolve(dir, self.subtitles.as_deref()) {
                Resolution::Ready(resolved) => ready.push(resolved),
                Resolution::Skipped(reason) => summary.skip(dir, reason, reporter),
            }
        }

        if !ready.is_empty() {
            let ffmpeg = Ffmpeg::new(self.muxer.executable()?, self.settings.mux.clone());
            for resolved in &ready {
                match mux::merge(resolved, &ffmpeg)? {
                    MergeOutcome::Merged(output) => {
                        reporter.on_merge_complete(&output);
                        summary.output_dir = Some(mux::output_root(&resolved.dir));
                        summary.outputs.push(output);
                    }
                    MergeOutcome::OutputExists(_) => {
                        summary.skip(&resolved.dir, SkipReason::OutputExists, reporter)
                    }
                    MergeOutcome::Failed(_) => {
                        summary.skip(&resolved.dir, SkipReason::MuxFailed, reporter)
                    }
                }
            }
        }

        summary.elapsed = start.elapsed();
        debug!(
            "Run completed in {:.2}s: {} merged, {} skipped",
            summary.elapsed.as_secs_f64(),
            summary.outputs.len(),
            summary.skipped.len()
        );
        Ok(summary)
    }
}

/// Session directories below `root`, or `root` itself when it is a session.
pub fn discover_sessions(root: &Path, ignore_globs: &[String]) -> Result<Vec<PathBuf>> {
    let dirs = scanner::find_session_dirs(root, ignore_globs)?;
    if dirs.is_empty() && SessionInfo::locate(root).is_some() {
        debug!("{} is itself a session directory", root.display());
        return Ok(vec![root.to_path_buf()]);
    }
    Ok(dirs)
}
