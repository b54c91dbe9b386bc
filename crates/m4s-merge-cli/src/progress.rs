use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use m4s_merge_core::fragment::StreamRole;
use m4s_merge_core::{ProgressReporter, SkipReason};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// CLI progress reporter.
///
/// - Repair phase: spinner with a running count
/// - Merge phase: one status line per session, since ffmpeg shares the console
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    repaired: AtomicUsize,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            repaired: AtomicUsize::new(0),
        }
    }

    fn finish_bar(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_walk_start(&self, cache_root: &Path) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.set_message(format!("Repairing fragments in {}...", cache_root.display()));
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.replace(pb) {
                old.finish_and_clear();
            }
        }
    }

    fn on_fragment_repaired(&self, _fragment: &Path, role: StreamRole) {
        let count = self.repaired.fetch_add(1, Ordering::Relaxed) + 1;
        if let Ok(guard) = self.bar.lock() {
            if let Some(pb) = guard.as_ref() {
                pb.set_message(format!("Repairing... {} streams done (last: {})", count, role));
            }
        }
    }

    fn on_walk_complete(&self, repaired: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  {} Repair complete: {} streams in {:.2}s",
            "✓".green(),
            repaired,
            duration_secs
        );
    }

    fn on_session_skipped(&self, session: &Path, reason: SkipReason) {
        eprintln!(
            "  {} {} ({})",
            "-".yellow(),
            session.display(),
            reason.to_string().yellow()
        );
    }

    fn on_merge_complete(&self, output: &Path) {
        eprintln!("  {} {}", "✓".green(), output.display());
    }
}
