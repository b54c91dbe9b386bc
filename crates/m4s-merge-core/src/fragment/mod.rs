pub mod classify;
pub mod repair;

pub use classify::{classify, PlayManifest};
pub use repair::{repair, RepairOutcome};

use std::fmt;
use std::path::Path;

/// Extension of the raw cache fragments.
pub const FRAGMENT_EXTENSION: &str = "m4s";
pub const VIDEO_SUFFIX: &str = "-video.mp4";
pub const AUDIO_SUFFIX: &str = "-audio.m4a";
/// Play manifest filenames, current first.
pub const PLAY_MANIFEST_NAMES: [&str; 2] = [".playurl", "playurl.json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamRole {
    Video,
    Audio,
}

impl StreamRole {
    pub fn suffix(self) -> &'static str {
        match self {
            StreamRole::Video => VIDEO_SUFFIX,
            StreamRole::Audio => AUDIO_SUFFIX,
        }
    }
}

impl fmt::Display for StreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamRole::Video => f.write_str("video"),
            StreamRole::Audio => f.write_str("audio"),
        }
    }
}

pub fn is_fragment(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case(FRAGMENT_EXTENSION))
        .unwrap_or(false)
}
