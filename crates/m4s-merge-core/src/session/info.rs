use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use super::sanitize::sanitize_file_name;
use crate::error::{Error, Result};

/// Session manifest filenames, current format first.
pub const SESSION_INFO_NAMES: [&str; 2] = ["videoInfo.json", ".videoInfo"];
pub const COMPLETED_STATUS: &str = "completed";

/// Title, owner and download state of one session, sanitized for paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub group_title: String,
    pub title: String,
    pub owner: String,
    pub status: String,
}

impl SessionInfo {
    pub fn locate(session_dir: &Path) -> Option<PathBuf> {
        SESSION_INFO_NAMES
            .iter()
            .map(|name| session_dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    pub fn load(session_dir: &Path) -> Result<SessionInfo> {
        let path = SessionInfo::locate(session_dir).ok_or_else(|| Error::SessionInfo {
            path: session_dir.join(SESSION_INFO_NAMES[0]),
            reason: "file not found".to_string(),
        })?;
        let raw = fs::read(&path).map_err(|e| Error::SessionInfo {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        SessionInfo::parse(&raw).map_err(|reason| Error::SessionInfo { path, reason })
    }

    /// Missing or non-string fields read as empty.
    pub fn parse(raw: &[u8]) -> std::result::Result<SessionInfo, String> {
        let json: Value = serde_json::from_slice(raw).map_err(|e| e.to_string())?;
        if !json.is_object() {
            return Err("expected a JSON object".to_string());
        }
        let field = |key: &str| sanitize_file_name(json.get(key).and_then(Value::as_str).unwrap_or(""));

        Ok(SessionInfo {
            group_title: field("groupTitle"),
            title: field("title"),
            owner: field("uname"),
            status: field("status"),
        })
    }

    pub fn is_completed(&self) -> bool {
        self.status == COMPLETED_STATUS
    }

    /// Name of the per-owner folder under the output directory.
    pub fn group_dir_name(&self) -> String {
        format!("{}-{}", self.group_title, self.owner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_sanitizes_fields() {
        let raw = r#"{"groupTitle":"【合集】A/B","title":" Ep: 1 ","uname":"up|name","status":"completed"}"#;
        let info = SessionInfo::parse(raw.as_bytes()).unwrap();
        assert_eq!(info.group_title, "[合集]A_B");
        assert_eq!(info.title, "Ep： 1");
        assert_eq!(info.owner, "up_name");
        assert!(info.is_completed());
        assert_eq!(info.group_dir_name(), "[合集]A_B-up_name");
    }

    #[test]
    fn test_parse_missing_fields_are_empty() {
        let info = SessionInfo::parse(br#"{"title":"t","status":1}"#).unwrap();
        assert_eq!(info.group_title, "");
        assert_eq!(info.status, "");
        assert!(!info.is_completed());
    }

    #[test]
    fn test_parse_rejects_non_object() {
        assert!(SessionInfo::parse(b"[1,2]").is_err());
        assert!(SessionInfo::parse(b"{").is_err());
    }

    #[test]
    fn test_load_prefers_current_name() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".videoInfo"), r#"{"title":"legacy"}"#).unwrap();
        assert_eq!(SessionInfo::load(dir.path()).unwrap().title, "legacy");

        fs::write(dir.path().join("videoInfo.json"), r#"{"title":"current"}"#).unwrap();
        assert_eq!(SessionInfo::load(dir.path()).unwrap().title, "current");
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            SessionInfo::load(dir.path()),
            Err(Error::SessionInfo { .. })
        ));
    }
}
