use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::trace;

use super::{StreamRole, PLAY_MANIFEST_NAMES};
use crate::error::{Error, Result};

/// Stream identifiers selected by the client for one session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayManifest {
    pub video_id: String,
    pub audio_id: String,
}

impl PlayManifest {
    /// Read the play manifest that sits next to `fragment`.
    pub fn for_fragment(fragment: &Path) -> Result<PlayManifest> {
        let dir = fragment.parent().unwrap_or_else(|| Path::new("."));
        let path = PLAY_MANIFEST_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| Error::ManifestUnavailable {
                path: dir.join(PLAY_MANIFEST_NAMES[0]),
                reason: "file not found".to_string(),
            })?;

        let raw = fs::read(&path).map_err(|e| Error::ManifestUnavailable {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        PlayManifest::parse(&raw).map_err(|reason| Error::ManifestUnavailable { path, reason })
    }

    /// Accepts `data.dash.{video,audio}`, a top-level `dash`, or top-level arrays.
    pub fn parse(raw: &[u8]) -> std::result::Result<PlayManifest, String> {
        let json: Value = serde_json::from_slice(raw).map_err(|e| e.to_string())?;

        let dash = ["/data/dash", "/dash", ""]
            .iter()
            .filter_map(|pointer| json.pointer(pointer))
            .find(|node| node.get("video").is_some() || node.get("audio").is_some())
            .ok_or_else(|| "no dash stream lists".to_string())?;

        let video_id = first_stream_id(dash, "video")?;
        let audio_id = first_stream_id(dash, "audio")?;
        Ok(PlayManifest { video_id, audio_id })
    }

    /// Audio when a delimited token of the file stem equals the audio id.
    /// Names without any exact token fall back to substring containment.
    pub fn role_of(&self, file_name: &str) -> StreamRole {
        let stem = file_name.rsplit_once('.').map_or(file_name, |(stem, _)| stem);
        let tokens: Vec<&str> = stem.split(|c: char| !c.is_ascii_alphanumeric()).collect();

        if tokens.iter().any(|t| *t == self.audio_id) {
            return StreamRole::Audio;
        }
        if tokens.iter().any(|t| *t == self.video_id) {
            return StreamRole::Video;
        }
        if file_name.contains(&self.audio_id) {
            StreamRole::Audio
        } else {
            StreamRole::Video
        }
    }
}

fn first_stream_id(dash: &Value, kind: &str) -> std::result::Result<String, String> {
    let id = dash
        .get(kind)
        .and_then(Value::as_array)
        .and_then(|streams| streams.first())
        .and_then(|stream| stream.get("id"))
        .ok_or_else(|| format!("missing {} stream id", kind))?;

    match id {
        Value::Number(n) => Ok(n.to_string()),
        Value::String(s) if !s.is_empty() => Ok(s.clone()),
        _ => Err(format!("invalid {} stream id: {}", kind, id)),
    }
}

/// Decide the fragment's role and where its repaired copy goes.
pub fn classify(fragment: &Path) -> Result<(StreamRole, PathBuf)> {
    let manifest = PlayManifest::for_fragment(fragment)?;
    let file_name = fragment
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();

    let role = manifest.role_of(&file_name);
    let destination = destination_for(fragment, role);
    trace!("{} classified as {}", fragment.display(), role);
    Ok((role, destination))
}

/// `dir/name.m4s` becomes `dir/name-video.mp4` or `dir/name-audio.m4a`.
pub fn destination_for(fragment: &Path, role: StreamRole) -> PathBuf {
    let stem = fragment
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    fragment.with_file_name(format!("{}{}", stem, role.suffix()))
}
