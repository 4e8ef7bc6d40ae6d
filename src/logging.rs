//! Process-wide logging.
//!
//! Records go to the console and, when a log directory is given, to
//! `<dir>/server.log` without ANSI colors. `RUST_LOG` overrides the default
//! filter.

use std::fs::{File, OpenOptions};
use std::panic;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::error;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Name of the log file inside the log directory.
pub const LOG_FILE_NAME: &str = "server.log";

/// Default filter directives.
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "studyshala=debug,tower_http=debug"
    } else {
        "studyshala=info,tower_http=info"
    }
}

/// Create the log directory if needed and open the log file for appending.
pub fn open_log_file(log_dir: &Path) -> std::io::Result<(PathBuf, File)> {
    std::fs::create_dir_all(log_dir)?;
    let path = log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;
    Ok((path, file))
}

/// Initialize the tracing subscriber.
///
/// Returns the path of the log file when one was opened. Calling this more
/// than once leaves the first subscriber in place.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> std::io::Result<Option<PathBuf>> {
    let (log_path, file_layer) = match log_dir {
        Some(dir) => {
            let (path, file) = open_log_file(dir)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(Arc::new(file));
            (Some(path), Some(layer))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose))),
        )
        .with(fmt::layer())
        .with(file_layer)
        .try_init();

    Ok(log_path)
}

/// Route panic messages through the logger instead of stderr.
pub fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| format!("{}:{}", l.file(), l.line()))
            .unwrap_or_else(|| "unknown".to_string());
        error!(location = %location, panic = %panic_message(info.payload()), "Panic");
    }));
}

/// Best-effort text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
