use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::mux::MuxOptions;

pub const CONFIG_FILE_NAME: &str = "m4s-merge";
pub const ENV_PREFIX: &str = "M4S_MERGE";

/// Values read from `m4s-merge.toml` and `M4S_MERGE_*` environment variables.
/// Command-line flags are applied on top by the binary.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
    #[serde(default)]
    pub ffmpeg_path: Option<PathBuf>,
    /// Expected SHA-256 (hex) of the muxer executable.
    #[serde(default)]
    pub ffmpeg_sha256: Option<String>,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default = "default_true")]
    pub danmaku: bool,
    #[serde(default = "default_container")]
    pub container: String,
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    #[serde(default = "default_true")]
    pub open_output: bool,
    #[serde(default = "default_true")]
    pub pause_on_exit: bool,
}

fn default_true() -> bool {
    true
}

fn default_container() -> String {
    "mp4".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cache_path: None,
            ffmpeg_path: None,
            ffmpeg_sha256: None,
            overwrite: false,
            danmaku: true,
            container: default_container(),
            ignore_patterns: Vec::new(),
            open_output: true,
            pause_on_exit: true,
        }
    }
}

pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let builder = Config::builder()
        .add_source(ConfigFile::with_name(CONFIG_FILE_NAME).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("ignore_patterns"),
        )
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

impl AppConfig {
    /// Freeze the configuration into the value handed to the engine.
    pub fn engine_settings(&self, cache_root: PathBuf) -> EngineSettings {
        EngineSettings {
            cache_root,
            ignore_patterns: self.ignore_patterns.clone(),
            mux: MuxOptions {
                overwrite: self.overwrite,
                container: self.container.trim_start_matches('.').to_string(),
            },
        }
    }
}

/// Immutable per-run settings. Each stage borrows only the part it needs.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub cache_root: PathBuf,
    pub ignore_patterns: Vec<String>,
    pub mux: MuxOptions,
}
