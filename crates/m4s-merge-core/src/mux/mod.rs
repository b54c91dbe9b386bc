mod binary;
mod ffmpeg;

pub use binary::{file_sha256, search_path, ConfiguredBinary, MuxerBinary, FFMPEG_NAME};
pub use ffmpeg::{Ffmpeg, MuxReport, RunningMux};

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use crate::error::{Error, Result};
use crate::scanner::OUTPUT_DIR_NAME;
use crate::session::ResolvedSession;
use crate::subtitle;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxOptions {
    pub overwrite: bool,
    /// Output container extension without the dot.
    pub container: String,
}

impl MuxOptions {
    pub fn overwrite_flag(&self) -> &'static str {
        if self.overwrite {
            "-y"
        } else {
            "-n"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Merged(PathBuf),
    OutputExists(PathBuf),
    Failed(PathBuf),
}

/// `<parent of session>/output`
pub fn output_root(session_dir: &Path) -> PathBuf {
    session_dir
        .parent()
        .unwrap_or(session_dir)
        .join(OUTPUT_DIR_NAME)
}

/// Where the merged file for `session` is written.
pub fn output_path(session: &ResolvedSession, container: &str) -> PathBuf {
    let title = if session.info.title.is_empty() {
        session
            .dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".to_string())
    } else {
        session.info.title.clone()
    };
    output_root(&session.dir)
        .join(session.info.group_dir_name())
        .join(format!("{}.{}", title, container))
}

fn ensure_dir(path: &Path) -> Result<()> {
    match fs::create_dir(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists && path.is_dir() => Ok(()),
        Err(source) => Err(Error::OutputDir {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Merge one session's streams. Only directory creation and muxer start-up
/// failures are returned as errors; a muxer that runs and fails yields
/// `MergeOutcome::Failed`.
pub fn merge(session: &ResolvedSession, ffmpeg: &Ffmpeg) -> Result<MergeOutcome> {
    let output = output_path(session, &ffmpeg.options().container);
    let group_dir = output.parent().unwrap_or(&output);

    ensure_dir(&output_root(&session.dir))?;
    ensure_dir(group_dir)?;

    let running = ffmpeg.spawn(&session.video, &session.audio, &output)?;

    if let Some(source) = &session.subtitle {
        match subtitle::copy_beside(source, &output) {
            Ok(target) => info!("Subtitle copied to {}", target.display()),
            Err(e) => error!("Failed to copy subtitle {}: {}", source.display(), e),
        }
    }

    let report = running.wait();
    let name = output.file_name().unwrap_or_default().to_string_lossy().into_owned();

    if report.succeeded() {
        info!("Merged: {}", name);
        Ok(MergeOutcome::Merged(output))
    } else if report.output_exists {
        warn!("Skipping existing file: {}", name);
        Ok(MergeOutcome::OutputExists(output))
    } else {
        match &report.status {
            Ok(status) => error!("Merge failed for {}: {}", name, status),
            Err(e) => error!("Merge failed for {}: {}", name, e),
        }
        Ok(MergeOutcome::Failed(output))
    }
}
