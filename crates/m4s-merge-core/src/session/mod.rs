mod info;
mod resolve;
mod sanitize;

pub use info::{SessionInfo, COMPLETED_STATUS, SESSION_INFO_NAMES};
pub use resolve::{resolve, Resolution, ResolvedSession, SkipReason};
pub use sanitize::{sanitize_file_name, FORBIDDEN_CHARS};
