use crate::errors::{AppError, AppResult};
use std::path::Path;
use std::sync::OnceLock;
use tracing_appender::non_blocking::WorkerGuard;

pub const LOG_FILE_PREFIX: &str = "ideanode.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the process-wide JSON subscriber writing to `<data_dir>/logs`.
/// `RUST_LOG` overrides the default `info` filter. Later calls are no-ops.
pub fn init_tracing(data_dir: &Path) -> AppResult<()> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }
    let log_dir = data_dir.join("logs");
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .json()
        .with_writer(non_blocking)
        .try_init()
        .map_err(|error| AppError::Internal(format!("failed to install tracing subscriber: {error}")))
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn creates_log_dir_and_tolerates_repeat_calls() {
        let dir = tempfile::tempdir().expect("tempdir");
        // Another test binary may already own the global subscriber.
        let _ = init_tracing(dir.path());
        assert!(init_tracing(dir.path()).is_ok());
        assert!(dir.path().join("logs").is_dir());
    }
}
