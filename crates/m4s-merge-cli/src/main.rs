mod commands;
mod danmaku;
mod instance;
mod logging;
mod notify;
mod progress;
mod shell;

use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::process;

use anyhow::{anyhow, bail, Context};
use chrono::Local;
use clap::Parser;
use colored::*;
use commands::Cli;
use danmaku::DanmakuSource;
use dotenv::dotenv;
use instance::InstanceLock;
use m4s_merge_core::config::load_configuration;
use m4s_merge_core::fragment::is_fragment;
use m4s_merge_core::mux::ConfiguredBinary;
use m4s_merge_core::{AppConfig, Engine, RunSummary};
use progress::CliReporter;
use tracing::{error, info, warn};
use walkdir::WalkDir;

const LOCK_NAME: &str = "m4s-merge";

fn main() {
    dotenv().ok();

    let guard = logging::init_logger();
    let args = Cli::parse();
    let mut pause = !args.no_pause;

    let result = panic::catch_unwind(AssertUnwindSafe(|| run(&args, &mut pause)));

    let code = match result {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            notify::fatal(&format!("{:#}", err));
            1
        }
        Err(_) => {
            error!("Run aborted by an unexpected panic");
            1
        }
    };

    drop(guard);
    if pause {
        notify::wait_for_enter();
    }
    process::exit(code);
}

fn run(args: &Cli, pause: &mut bool) -> anyhow::Result<()> {
    let mut config = load_configuration().context("Error loading configuration")?;
    args.apply(&mut config);
    *pause = config.pause_on_exit;

    if args.print_config {
        println!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    let _lock = InstanceLock::acquire(LOCK_NAME).context("Only one instance can run at a time")?;

    let cache_root = match &config.cache_path {
        Some(path) => path.clone(),
        None => default_cache_root()?,
    };
    info!("Cache directory: {}", cache_root.display());

    let engine = build_engine(&config, cache_root)?;
    let reporter = CliReporter::new();
    let summary = engine.run(&reporter)?;

    print_summary(&summary);

    if config.open_output {
        if let Some(dir) = &summary.output_dir {
            shell::open_folder(dir);
        }
    }

    Ok(())
}

fn build_engine(config: &AppConfig, cache_root: PathBuf) -> anyhow::Result<Engine> {
    let binary = ConfiguredBinary {
        path: config.ffmpeg_path.clone(),
        sha256: config.ffmpeg_sha256.clone(),
    };
    let engine = Engine::new(config.engine_settings(cache_root), Box::new(binary));

    if !config.danmaku {
        return Ok(engine);
    }
    let source = DanmakuSource::new().context("Failed to set up danmaku download")?;
    Ok(engine.with_subtitles(Box::new(source)))
}

/// `~/Videos/bilibili`, accepted only if it holds at least one fragment.
fn default_cache_root() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| anyhow!("Unable to determine the home directory"))?;
    let root = home.join("Videos").join("bilibili");
    if !has_fragments(&root) {
        bail!(
            "No m4s files found in the default cache directory {}; pass the cache directory with --cache",
            root.display()
        );
    }
    Ok(root)
}

fn has_fragments(root: &Path) -> bool {
    WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .any(|entry| entry.file_type().is_file() && is_fragment(entry.path()))
}

fn print_summary(summary: &RunSummary) {
    info!("==========================================");
    if !summary.skipped.is_empty() {
        let lines: Vec<String> = summary
            .skipped
            .iter()
            .map(|s| format!("{} ({})", s.path.display(), s.reason))
            .collect();
        info!("Skipped directories:\n{}", lines.join("\n"));
    }
    if summary.outputs.is_empty() {
        warn!("No files were merged!");
    } else {
        let lines: Vec<String> = summary
            .outputs
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        info!("Merged files:\n{}", lines.join("\n"));
    }
    info!(
        "{} merged, {} skipped, {} streams repaired in {} (finished {})",
        format!("{}", summary.outputs.len()).cyan(),
        format!("{}", summary.skipped.len()).red(),
        summary.repaired,
        format!("{:.2}s", summary.elapsed.as_secs_f64()).green(),
        Local::now().format("%Y-%m-%d %H:%M:%S"),
    );
    info!("==========================================");
}
