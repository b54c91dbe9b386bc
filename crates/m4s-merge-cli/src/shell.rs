use std::path::Path;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

#[cfg(target_os = "windows")]
const OPENER: &str = "explorer";
#[cfg(target_os = "macos")]
const OPENER: &str = "open";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const OPENER: &str = "xdg-open";

/// Show `dir` in the system file browser without waiting for it.
pub fn open_folder(dir: &Path) {
    match Command::new(OPENER)
        .arg(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
    {
        Ok(_) => debug!("Opened {} with {}", dir.display(), OPENER),
        Err(e) => warn!("Could not open {}: {}", dir.display(), e),
    }
}
