use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// A second init leaves the first subscriber in place; say so through it.
fn installed(result: Result<(), Box<dyn Error + Send + Sync>>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "logging already initialised, keeping existing subscriber");
            false
        }
    }
}

/// Logs to stderr; used when no terminal UI owns the screen.
///
/// Returns whether this call installed the global subscriber.
pub fn init_stderr(default_level: &str) -> bool {
    installed(
        tracing_subscriber::fmt()
            .with_env_filter(filter(default_level))
            .with_writer(std::io::stderr)
            .try_init(),
    )
}

/// Appends logs to `path` so they do not draw over the terminal UI.
pub fn init_file(path: &Path, default_level: &str) -> std::io::Result<bool> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(installed(
        tracing_subscriber::fmt()
            .with_env_filter(filter(default_level))
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .try_init(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_init_keeps_the_first_subscriber() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("app.log");

        init_stderr("warn");
        assert!(!init_stderr("warn"));
        assert!(!init_file(&log, "debug").unwrap());
        assert!(log.exists());
    }
}
