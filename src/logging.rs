//! Log output setup for the command-line tool.
//!
//! Diagnostics always go to stderr. A run that works on a report also
//! writes them to a session log inside the report directory.

use std::fs::{self, File};
use std::path::Path;
use std::sync::Mutex;

use tracing::{debug, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Default filter directive; `RUST_LOG` takes precedence when set.
pub fn default_directive(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

/// Install the global subscriber. Returns false if one was already installed.
///
/// A session log that cannot be created is reported and skipped.
pub fn init_logging(verbose: bool, session_log: Option<&Path>) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let (file, open_error) = match session_log.map(open_session_log) {
        Some(Ok(file)) => (Some(file), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let file_layer = file.map(|file| {
        fmt::layer()
            .with_ansi(false)
            .with_target(false)
            .with_writer(Mutex::new(file))
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(file_layer)
        .try_init()
        .is_ok();

    if let (Some(path), Some(error)) = (session_log, open_error) {
        warn!(path = %path.display(), %error, "cannot open session log, continuing without it");
    } else if let Some(path) = session_log {
        debug!(path = %path.display(), "writing session log");
    }
    installed
}

fn open_session_log(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    File::create(path)
}
