use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

/// Environment variable holding a tracing filter directive, e.g. `kata=debug`
pub const LOG_ENV: &str = "KATA_LOG";

/// Install a file-backed subscriber. The terminal is owned by the TUI, so
/// log lines never go to stdout or stderr.
pub fn init(path: &Path, default_level: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    // a subscriber may already be installed (tests, repeated init); keep the first
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .try_init();

    Ok(())
}
