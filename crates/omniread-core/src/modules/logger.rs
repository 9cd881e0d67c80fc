//! Logging setup: console plus daily-rolling file under the data directory.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, SystemTime};

use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::paths::get_log_dir;

const LOG_FILE_PREFIX: &str = "omniread.log";
const DEFAULT_RETENTION_DAYS: u64 = 7;

static FILE_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

struct LocalTimer;

impl fmt::time::FormatTime for LocalTimer {
    fn format_time(&self, w: &mut fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().to_rfc3339())
    }
}

/// Install the global subscriber. Falls back to console-only logging when the
/// log directory is unavailable; calling it twice is a no-op.
pub fn init_logger() {
    match get_log_dir() {
        Ok(dir) => init_logger_in(&dir),
        Err(e) => {
            eprintln!("Failed to initialize log directory: {}", e);
            let _ = tracing_subscriber::registry()
                .with(default_filter())
                .with(fmt::Layer::new().with_target(false).with_timer(LocalTimer))
                .try_init();
        },
    }
}

/// Install the global subscriber writing rolling files into `log_dir`.
pub fn init_logger_in(log_dir: &Path) {
    let _ = tracing_log::LogTracer::init();

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::Layer::new()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true)
        .with_timer(LocalTimer);
    let file_layer = fmt::Layer::new()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_timer(LocalTimer);

    let installed = tracing_subscriber::registry()
        .with(default_filter())
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }
    let _ = FILE_GUARD.set(guard);

    info!("Log system initialized (console + {})", log_dir.display());
    if let Err(e) = cleanup_old_logs(log_dir, DEFAULT_RETENTION_DAYS) {
        warn!("Failed to cleanup old logs: {}", e);
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Delete log files in `log_dir` last modified more than `days_to_keep` days ago.
pub fn cleanup_old_logs(log_dir: &Path, days_to_keep: u64) -> std::io::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let retention = Duration::from_secs(days_to_keep * 24 * 60 * 60);
    let cutoff = SystemTime::now().checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted = 0;
    for entry in fs::read_dir(log_dir)?.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => continue,
        };
        if modified < cutoff {
            match fs::remove_file(&path) {
                Ok(()) => {
                    deleted += 1;
                    info!("Deleted old log file (expired): {:?}", path.file_name());
                },
                Err(e) => warn!("Failed to delete old log file {:?}: {}", path, e),
            }
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_fresh_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("omniread.log.2026-10-19"), "fresh").expect("write");

        let deleted = cleanup_old_logs(dir.path(), 7).expect("cleanup");
        assert_eq!(deleted, 0);
        assert!(dir.path().join("omniread.log.2026-10-19").exists());
    }

    #[test]
    fn test_cleanup_zero_retention_removes_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        fs::write(dir.path().join("old.log"), "stale").expect("write");
        std::thread::sleep(Duration::from_millis(20));

        let deleted = cleanup_old_logs(dir.path(), 0).expect("cleanup");
        assert_eq!(deleted, 1);
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().expect("tempdir");
        let missing = dir.path().join("nope");
        assert_eq!(cleanup_old_logs(&missing, 7).expect("cleanup"), 0);
    }
}
