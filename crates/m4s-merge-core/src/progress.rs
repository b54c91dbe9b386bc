use std::path::Path;

use crate::engine::SkipReason;
use crate::fragment::StreamRole;

/// Trait for reporting run progress.
///
/// The CLI implements it with an indicatif spinner and coloured status lines.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_walk_start(&self, _cache_root: &Path) {}
    fn on_fragment_repaired(&self, _fragment: &Path, _role: StreamRole) {}
    fn on_walk_complete(&self, _repaired: usize, _duration_secs: f64) {}
    fn on_session_start(&self, _session: &Path, _index: usize, _total: usize) {}
    fn on_session_skipped(&self, _session: &Path, _reason: SkipReason) {}
    fn on_merge_complete(&self, _output: &Path) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
