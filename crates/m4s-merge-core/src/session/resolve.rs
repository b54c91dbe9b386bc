use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::info::SessionInfo;
use crate::fragment::{AUDIO_SUFFIX, VIDEO_SUFFIX};
use crate::subtitle::SubtitleSource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Session manifest status is not `completed`.
    Incomplete,
    /// Session manifest missing or unparsable.
    ManifestUnavailable,
    /// No repaired video or audio stream in the session.
    MissingStreams,
    /// Muxer refused to overwrite an existing output.
    OutputExists,
    /// Muxer exited with an error.
    MuxFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::Incomplete => "download not completed",
            SkipReason::ManifestUnavailable => "session info unavailable",
            SkipReason::MissingStreams => "repaired streams not found",
            SkipReason::OutputExists => "output already exists",
            SkipReason::MuxFailed => "muxer failed",
        };
        f.write_str(text)
    }
}

/// A session whose streams can be merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub dir: PathBuf,
    pub info: SessionInfo,
    pub video: PathBuf,
    pub audio: PathBuf,
    pub subtitle: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Ready(ResolvedSession),
    Skipped(SkipReason),
}

/// Decide whether `session_dir` is ready to merge.
///
/// The walk is depth-first with file names sorted within each directory; the
/// first video and first audio match win. When `subtitles` is set, every
/// directory visited is offered to it, and the last subtitle produced is kept.
pub fn resolve(session_dir: &Path, subtitles: Option<&dyn SubtitleSource>) -> Resolution {
    let info = match SessionInfo::load(session_dir) {
        Ok(info) => info,
        Err(e) => {
            warn!("{}", e);
            return Resolution::Skipped(SkipReason::ManifestUnavailable);
        }
    };

    if !info.is_completed() {
        warn!(
            "Download not completed, skipping {} ({}-{})",
            session_dir.display(),
            info.title,
            info.owner
        );
        return Resolution::Skipped(SkipReason::Incomplete);
    }

    let mut video: Option<PathBuf> = None;
    let mut audio: Option<PathBuf> = None;
    let mut subtitle: Option<PathBuf> = None;

    for entry in WalkDir::new(session_dir).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading {}: {}", session_dir.display(), e);
                return Resolution::Skipped(SkipReason::MissingStreams);
            }
        };

        if entry.file_type().is_dir() {
            if let Some(source) = subtitles {
                if let Some(path) = fetch_subtitle(source, entry.path()) {
                    subtitle = Some(path);
                }
            }
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        if video.is_none() && name.ends_with(VIDEO_SUFFIX) {
            video = Some(entry.path().to_path_buf());
        } else if audio.is_none() && name.ends_with(AUDIO_SUFFIX) {
            audio = Some(entry.path().to_path_buf());
        }
    }

    match (video, audio) {
        (Some(video), Some(audio)) => {
            debug!(
                "Session {} streams: {} + {}",
                session_dir.display(),
                video.display(),
                audio.display()
            );
            Resolution::Ready(ResolvedSession {
                dir: session_dir.to_path_buf(),
                info,
                video,
                audio,
                subtitle,
            })
        }
        _ => {
            warn!(
                "Repaired audio and video not found in {}",
                session_dir.display()
            );
            Resolution::Skipped(SkipReason::MissingStreams)
        }
    }
}

fn fetch_subtitle(source: &dyn SubtitleSource, dir: &Path) -> Option<PathBuf> {
    let id = dir.file_name()?.to_string_lossy().into_owned();
    match source.fetch(dir, &id) {
        Ok(path) => {
            info!("Subtitle ready: {}", path.display());
            Some(path)
        }
        Err(e) => {
            warn!("Danmaku download failed for {}: {}", id, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use std::cell::RefCell;
    use std::fs;
    use tempfile::tempdir;

    const COMPLETED: &str =
        r#"{"groupTitle":"Group","title":"Title","uname":"Owner","status":"completed"}"#;

    struct RecordingSource {
        calls: RefCell<Vec<String>>,
        fail: bool,
        fail_ids: &'static [&'static str],
    }

    impl SubtitleSource for RecordingSource {
        fn fetch(&self, dir: &Path, id: &str) -> Result<PathBuf> {
            self.calls.borrow_mut().push(id.to_string());
            if self.fail || self.fail_ids.contains(&id) {
                return Err(Error::Io(std::io::Error::other("offline")));
            }
            let path = dir.join(format!("{}.ass", id));
            fs::write(&path, "[Script Info]")?;
            Ok(path)
        }
    }

    fn session_with(files: &[&str], info: &str) -> tempfile::TempDir {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("videoInfo.json"), info).unwrap();
        for file in files {
            fs::write(tmp.path().join(file), b"data").unwrap();
        }
        tmp
    }

    #[test]
    fn test_resolve_ready() {
        let tmp = session_with(&["1-video.mp4", "2-audio.m4a"], COMPLETED);
        match resolve(tmp.path(), None) {
            Resolution::Ready(session) => {
                assert_eq!(session.video, tmp.path().join("1-video.mp4"));
                assert_eq!(session.audio, tmp.path().join("2-audio.m4a"));
                assert_eq!(session.info.title, "Title");
                assert!(session.subtitle.is_none());
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_first_in_sorted_walk_order_wins() {
        let tmp = session_with(
            &["b-video.mp4", "a-video.mp4", "z-audio.m4a", "c-audio.m4a"],
            COMPLETED,
        );
        match resolve(tmp.path(), None) {
            Resolution::Ready(session) => {
                assert_eq!(session.video, tmp.path().join("a-video.mp4"));
                assert_eq!(session.audio, tmp.path().join("c-audio.m4a"));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_descends_into_directory_before_later_siblings() {
        let tmp = session_with(&["a-video.mp4", "b-audio.m4a"], COMPLETED);
        fs::create_dir_all(tmp.path().join("a")).unwrap();
        fs::write(tmp.path().join("a/x-video.mp4"), b"data").unwrap();

        match resolve(tmp.path(), None) {
            Resolution::Ready(session) => {
                assert_eq!(session.video, tmp.path().join("a/x-video.mp4"));
                assert_eq!(session.audio, tmp.path().join("b-audio.m4a"));
            }
            other => panic!("expected ready, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_incomplete_is_skipped_even_with_streams() {
        let info = r#"{"groupTitle":"G","title":"T","uname":"O","status":"downloading"}"#;
        let tmp = session_with(&["1-video.mp4", "2-audio.m4a"], info);
        assert_eq!(
            resolve(tmp.path(), None),
            Resolution::Skipped(SkipReason::Incomplete)
        );
    }

    #[test]
    fn test_resolve_missing_manifest_and_streams() {
        let tmp = tempdir().unwrap();
        assert_eq!(
            resolve(tmp.path(), None),
            Resolution::Skipped(SkipReason::ManifestUnavailable)
        );

        let tmp = session_with(&["1-video.mp4"], COMPLETED);
        assert_eq!(
            resolve(tmp.path(), None),
            Resolution::Skipped(SkipReason::MissingStreams)
        );
    }

    #[test]
    fn test_resolve_fetches_subtitle_named_after_directory() {
        let tmp = tempdir().unwrap();
        let session = tmp.path().join("998877");
        fs::create_dir_all(&session).unwrap();
        fs::write(session.join("videoInfo.json"), COMPLETED).unwrap();
        fs::write(session.join("1-video.mp4"), b"v").unwrap();
        fs::write(session.join("1-audio.m4a"), b"a").unwrap();

        let source = RecordingSource {
            calls: RefCell::new(Vec::new()),
            fail: false,
            fail_ids: &[],
        };
        match resolve(&session, Some(&source)) {
            Resolution::Ready(resolved) => {
                assert_eq!(resolved.subtitle, Some(session.join("998877.ass")));
            }
            other => panic!("expected ready, got {:?}", other),
        }
        assert_eq!(*source.calls.borrow(), vec!["998877".to_string()]);
    }

    #[test]
    fn test_resolve_subtitle_failure_is_not_fatal() {
        let tmp = session_with(&["1-video.mp4", "1-audio.m4a"], COMPLETED);
        let source = RecordingSource {
            calls: RefCell::new(Vec::new()),
            fail: true,
            fail_ids: &[],
        };
        match resolve(tmp.path(), Some(&source)) {
            Resolution::Ready(resolved) => assert!(resolved.subtitle.is_none()),
            other => panic!("expected ready, got {:?}", other),
        }
        assert_eq!(source.calls.borrow().len(), 1);
    }

    #[test]
    fn test_resolve_fetches_every_directory_and_keeps_last_subtitle() {
        let tmp = tempdir().unwrap();
        let session = tmp.path().join("998877");
        fs::create_dir_all(session.join("1")).unwrap();
        fs::create_dir_all(session.join("2")).unwrap();
        fs::write(session.join("videoInfo.json"), COMPLETED).unwrap();
        fs::write(session.join("1-video.mp4"), b"v").unwrap();
        fs::write(session.join("1-audio.m4a"), b"a").unwrap();

        let source = RecordingSource {
            calls: RefCell::new(Vec::new()),
            fail: false,
            fail_ids: &["2"],
        };
        match resolve(&session, Some(&source)) {
            Resolution::Ready(resolved) => {
                assert_eq!(resolved.subtitle, Some(session.join("1").join("1.ass")));
            }
            other => panic!("expected ready, got {:?}", other),
        }
        assert_eq!(
            *source.calls.borrow(),
            vec!["998877".to_string(), "1".to_string(), "2".to_string()]
        );
    }
}
