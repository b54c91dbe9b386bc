use clap::Parser;
use m4s_merge_core::AppConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "m4s-merge", version)]
#[command(about = "Repair cached m4s fragments and merge them into playable files", long_about = None)]
pub struct Cli {
    /// Cache directory to process (defaults to ~/Videos/bilibili)
    #[arg(short = 'c', long = "cache")]
    pub cache_path: Option<PathBuf>,

    /// ffmpeg executable to use instead of the one on PATH
    #[arg(short = 'f', long = "ffmpeg")]
    pub ffmpeg_path: Option<PathBuf>,

    /// Overwrite files that were merged before
    #[arg(short = 'o', long)]
    pub overwrite: bool,

    /// Do not download danmaku subtitles
    #[arg(short = 'a', long = "no-danmaku")]
    pub no_danmaku: bool,

    /// Output container extension
    #[arg(long)]
    pub container: Option<String>,

    /// Do not open the output folder when done
    #[arg(long)]
    pub no_open: bool,

    /// Exit without waiting for Enter
    #[arg(long)]
    pub no_pause: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    pub print_config: bool,
}

impl Cli {
    /// Flags win over file and environment values.
    pub fn apply(&self, config: &mut AppConfig) {
        if let Some(path) = &self.cache_path {
            config.cache_path = Some(path.clone());
        }
        if let Some(path) = &self.ffmpeg_path {
            config.ffmpeg_path = Some(path.clone());
        }
        if let Some(container) = &self.container {
            config.container = container.clone();
        }
        if self.overwrite {
            config.overwrite = true;
        }
        if self.no_danmaku {
            config.danmaku = false;
        }
        if self.no_open {
            config.open_output = false;
        }
        if self.no_pause {
            config.pause_on_exit = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let cli = Cli::parse_from(["m4s-merge", "-o", "-a", "-c", "/cache", "--container", "mkv", "--no-pause"]);
        let mut config = AppConfig::default();
        cli.apply(&mut config);

        assert!(config.overwrite);
        assert!(!config.danmaku);
        assert!(!config.pause_on_exit);
        assert!(config.open_output);
        assert_eq!(config.cache_path, Some(PathBuf::from("/cache")));
        assert_eq!(config.container, "mkv");
    }

    #[test]
    fn test_no_flags_keep_config() {
        let cli = Cli::parse_from(["m4s-merge"]);
        let mut config = AppConfig {
            overwrite: true,
            ..AppConfig::default()
        };
        cli.apply(&mut config);
        assert!(config.overwrite);
        assert!(config.danmaku);
    }
}
