//! Logging setup for the engine and its command-line tools.
//!
//! Installs a global tracing subscriber writing to stderr, optionally teeing
//! into a per-launch log file. Log files carry a sortable UTC timestamp in
//! their name, which doubles as the retention order: the oldest engine logs
//! are removed once the bounded count is reached. Files that do not match
//! the engine's naming scheme are never touched.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::OnceLock,
};

use time::{OffsetDateTime, format_description::FormatItem, macros::format_description};
use tracing_appender::{non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{EnvFilter, Registry, fmt, prelude::*};

/// Per-launch log files retained besides the one being created.
const RETAINED_LOG_FILES: usize = 9;
const LOG_FILE_PREFIX: &str = "sonoscope";

static LOG_GUARD: OnceLock<Option<WorkerGuard>> = OnceLock::new();

/// Errors that may occur while initializing logging.
#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    /// Failed to create or access the log directory.
    #[error("Failed to prepare log directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to enumerate existing log files for pruning.
    #[error("Failed to read log directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to remove an obsolete log file.
    #[error("Failed to remove old log file {path}: {source}")]
    RemoveFile {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to format a timestamp for the log filename.
    #[error("Failed to format log filename time: {0}")]
    FormatTime(time::error::Format),
    /// Failed to set the global tracing subscriber.
    #[error("Failed to install global tracing subscriber: {0}")]
    SetGlobal(tracing::subscriber::SetGlobalDefaultError),
}

/// Initialize tracing to stderr only.
///
/// Subsequent calls are no-ops. Failures are returned so callers can degrade
/// gracefully without aborting startup.
pub fn init() -> Result<(), LoggingError> {
    install(None)
}

/// Initialize tracing to stderr plus a per-launch log file under `log_dir`.
pub fn init_with_log_dir(log_dir: &Path) -> Result<(), LoggingError> {
    install(Some(log_dir))
}

fn install(log_dir: Option<&Path>) -> Result<(), LoggingError> {
    if LOG_GUARD.get().is_some() {
        return Ok(());
    }

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let timer = utc_timer();
    let stderr_layer = fmt::layer()
        .with_timer(timer.clone())
        .with_writer(std::io::stderr);

    let guard = match log_dir {
        Some(log_dir) => {
            fs::create_dir_all(log_dir).map_err(|source| LoggingError::CreateDir {
                path: log_dir.to_path_buf(),
                source,
            })?;
            prune_old_logs(log_dir, RETAINED_LOG_FILES)?;
            let file_name = log_file_name(OffsetDateTime::now_utc())?;
            let log_path = log_dir.join(&file_name);

            let (file_writer, guard) =
                tracing_appender::non_blocking(rolling::never(log_dir, &file_name));
            let file_layer = fmt::layer()
                .with_ansi(false)
                .with_timer(timer)
                .with_writer(file_writer);

            let subscriber = Registry::default()
                .with(filter)
                .with(stderr_layer)
                .with(file_layer);
            tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
            tracing::info!(path = %log_path.display(), "Logging initialized");
            Some(guard)
        }
        None => {
            let subscriber = Registry::default().with(filter).with(stderr_layer);
            tracing::subscriber::set_global_default(subscriber).map_err(LoggingError::SetGlobal)?;
            None
        }
    };
    let _ = LOG_GUARD.set(guard);
    Ok(())
}

/// Remove engine log files beyond the `keep` newest.
///
/// Ordering comes from the timestamp embedded in the file name, so retention
/// does not depend on filesystem modification times.
fn prune_old_logs(dir: &Path, keep: usize) -> Result<(), LoggingError> {
    let entries = fs::read_dir(dir).map_err(|source| LoggingError::ReadDir {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|ft| ft.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| is_engine_log_name(name))
        .collect();
    if names.len() <= keep {
        return Ok(());
    }

    names.sort_unstable();
    let obsolete = names.len() - keep;
    for name in names.drain(..obsolete) {
        let path = dir.join(name);
        fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile { path, source })?;
    }
    Ok(())
}

/// `sonoscope-<stamp>.log`, where the stamp is digits and dashes only.
fn is_engine_log_name(name: &str) -> bool {
    name.strip_prefix(LOG_FILE_PREFIX)
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_suffix(".log"))
        .is_some_and(|stamp| {
            !stamp.is_empty() && stamp.chars().all(|c| c.is_ascii_digit() || c == '-')
        })
}

fn log_file_name(now: OffsetDateTime) -> Result<String, LoggingError> {
    const STAMP_FORMAT: &[FormatItem<'_>] =
        format_description!("[year][month][day]-[hour][minute][second]");
    let stamp = now.format(STAMP_FORMAT).map_err(LoggingError::FormatTime)?;
    Ok(format!("{LOG_FILE_PREFIX}-{stamp}.log"))
}

/// UTC wall clock for log lines; the engine never logs in local time, so
/// lines and file names stay mutually ordered.
fn utc_timer() -> fmt::time::UtcTime<&'static [FormatItem<'static>]> {
    const DISPLAY_FORMAT: &[FormatItem<'static>] =
        format_description!("[year]-[month]-[day] [hour]:[minute]:[second]Z");
    fmt::time::UtcTime::new(DISPLAY_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn log_file_names_embed_a_sortable_utc_stamp() {
        let fixed = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let name = log_file_name(fixed).unwrap();
        assert_eq!(name, "sonoscope-20231114-221320.log");
        assert!(is_engine_log_name(&name));
        let later = log_file_name(fixed + time::Duration::seconds(61)).unwrap();
        assert!(later > name);
    }

    #[test]
    fn only_engine_log_names_match_the_scheme() {
        assert!(is_engine_log_name("sonoscope-20230101-000000.log"));
        assert!(!is_engine_log_name("unrelated.log"));
        assert!(!is_engine_log_name("sonoscope.toml"));
        assert!(!is_engine_log_name("sonoscope-.log"));
        assert!(!is_engine_log_name("sonoscope-notes.log"));
    }

    #[test]
    fn prune_keeps_newest_logs_and_ignores_other_files() {
        let dir = tempdir().unwrap();
        for day in 1..=12 {
            let name = format!("sonoscope-202301{day:02}-120000.log");
            fs::write(dir.path().join(name), b"").unwrap();
        }
        fs::write(dir.path().join("unrelated.log"), b"").unwrap();
        fs::write(dir.path().join("sonoscope.toml"), b"").unwrap();

        prune_old_logs(dir.path(), RETAINED_LOG_FILES).unwrap();

        let mut remaining: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect();
        remaining.sort_unstable();
        assert!(remaining.contains(&"unrelated.log".to_string()));
        assert!(remaining.contains(&"sonoscope.toml".to_string()));

        let engine_logs: Vec<&String> = remaining
            .iter()
            .filter(|name| is_engine_log_name(name))
            .collect();
        assert_eq!(engine_logs.len(), RETAINED_LOG_FILES);
        // The three oldest launches are gone.
        assert_eq!(engine_logs[0], "sonoscope-20230104-120000.log");
    }
}
