use sha2::{Digest, Sha256};
use std::env;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{Error, Result};

#[cfg(windows)]
pub const FFMPEG_NAME: &str = "ffmpeg.exe";
#[cfg(not(windows))]
pub const FFMPEG_NAME: &str = "ffmpeg";

/// Provides a validated path to a muxer executable.
pub trait MuxerBinary {
    fn executable(&self) -> Result<PathBuf>;
}

/// Uses the configured path, or the first `ffmpeg` on `PATH`. When a digest
/// is configured the binary must match it.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredBinary {
    pub path: Option<PathBuf>,
    pub sha256: Option<String>,
}

impl MuxerBinary for ConfiguredBinary {
    fn executable(&self) -> Result<PathBuf> {
        let path = match &self.path {
            Some(path) if path.is_file() => path.clone(),
            Some(path) => {
                return Err(Error::MuxerUnavailable(format!(
                    "{} does not exist",
                    path.display()
                )))
            }
            None => search_path(FFMPEG_NAME).ok_or_else(|| {
                Error::MuxerUnavailable(format!("{} not found on PATH", FFMPEG_NAME))
            })?,
        };

        if let Some(expected) = &self.sha256 {
            let actual = file_sha256(&path)?;
            if !actual.eq_ignore_ascii_case(expected.trim()) {
                return Err(Error::MuxerUnavailable(format!(
                    "{} checksum mismatch (expected {}, got {})",
                    path.display(),
                    expected,
                    actual
                )));
            }
            debug!("{} checksum verified", path.display());
        }

        info!("Using muxer {}", path.display());
        Ok(path)
    }
}

pub fn search_path(name: &str) -> Option<PathBuf> {
    let paths = env::var_os("PATH")?;
    env::split_paths(&paths)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    const ABC_SHA256: &str = "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad";

    #[test]
    fn test_file_sha256() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bin");
        fs::write(&path, b"abc").unwrap();
        assert_eq!(file_sha256(&path).unwrap(), ABC_SHA256);
    }

    #[test]
    fn test_configured_binary_checks_digest() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ffmpeg");
        fs::write(&path, b"abc").unwrap();

        let ok = ConfiguredBinary {
            path: Some(path.clone()),
            sha256: Some(ABC_SHA256.to_uppercase()),
        };
        assert_eq!(ok.executable().unwrap(), path);

        let bad = ConfiguredBinary {
            path: Some(path),
            sha256: Some("00".repeat(32)),
        };
        assert!(matches!(bad.executable(), Err(Error::MuxerUnavailable(_))));
    }

    #[test]
    fn test_configured_binary_missing_path() {
        let dir = tempdir().unwrap();
        let binary = ConfiguredBinary {
            path: Some(dir.path().join("missing")),
            sha256: None,
        };
        assert!(matches!(binary.executable(), Err(Error::MuxerUnavailable(_))));
    }
}
