use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Error walking {}: {source}", path.display())]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Cache root not found: {}", .0.display())]
    CacheRootMissing(PathBuf),

    #[error("Play manifest unavailable for {}: {reason}", path.display())]
    ManifestUnavailable { path: PathBuf, reason: String },

    #[error("Session info unreadable at {}: {reason}", path.display())]
    SessionInfo { path: PathBuf, reason: String },

    #[error("Unable to create output directory {}: {source}", path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Subtitle unavailable: {0}")]
    Subtitle(String),

    #[error("Muxer unavailable: {0}")]
    MuxerUnavailable(String),

    #[error("Failed to start muxer {}: {source}", path.display())]
    MuxerSpawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
