//! Tracing setup.
//!
//! The terminal belongs to the CLI channel, so logs go to `orpheus.log` in
//! the configured log directory when there is one. Without a log directory
//! only warnings reach stderr unless `RUST_LOG` says otherwise.

use std::path::Path;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::FlowConfig;

pub const LOG_FILE_NAME: &str = "orpheus.log";

fn env_filter(default: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// Install the global subscriber. Keep the returned guard alive for the
/// life of the process so buffered file logs are flushed.
pub fn init(config: &FlowConfig) -> anyhow::Result<Option<WorkerGuard>> {
    match &config.log_dir {
        Some(dir) => init_file(dir).map(Some),
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter("warn"))
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;
            Ok(None)
        }
    }
}

fn init_file(dir: &Path) -> anyhow::Result<WorkerGuard> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let file_appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(env_filter("info"))
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_logging_writes_to_log_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        let config = FlowConfig {
            log_dir: Some(dir.clone()),
            ..FlowConfig::default()
        };

        let guard = init(&config).unwrap();
        assert!(guard.is_some());
        tracing::warn!("logging smoke test");
        drop(guard);

        assert!(dir.join(LOG_FILE_NAME).exists());
    }
}
