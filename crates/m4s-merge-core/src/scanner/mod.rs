mod walk;

pub use walk::{find_session_dirs, walk, WalkStats, OUTPUT_DIR_NAME};
