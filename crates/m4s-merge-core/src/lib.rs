pub mod config;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod mux;
pub mod progress;
pub mod scanner;
pub mod session;
pub mod subtitle;

pub use config::{AppConfig, EngineSettings};
pub use engine::{Engine, RunSummary, SkipReason, SkippedSession};
pub use error::{Error, Result};
pub use progress::{ProgressReporter, SilentReporter};
pub use subtitle::SubtitleSource;
