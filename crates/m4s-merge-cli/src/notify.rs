use colored::*;
use std::io::{self, Write};
use tracing::error;

/// Report an error that ends the run.
pub fn fatal(message: &str) {
    error!("{}", message);
    eprintln!();
    eprintln!("{}", format!("  ✗ {}", message).red().bold());
    eprintln!();
}

/// Block until the operator presses Enter so the console stays readable.
pub fn wait_for_enter() {
    print!("Press Enter to exit...");
    let _ = io::stdout().flush();
    let mut input = String::new();
    let _ = io::stdin().read_line(&mut input);
}
