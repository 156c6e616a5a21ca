use std::{
    fs::{self, DirEntry},
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use anyhow::{Context, Result, anyhow};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{self, RollingFileAppender},
};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, filter::LevelFilter, fmt, layer::SubscriberExt,
    util::SubscriberInitExt,
};
use uuid::Uuid;

use crate::config::{LoggingConfig, LoggingRotation};

const SERVICE_NAME: &str = "uspace-em";
const LOG_FILE_PREFIX: &str = "uspace-em.log";
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps the non-blocking writer alive; drop it last so buffered events flush.
pub struct LoggingGuard {
    _worker_guard: WorkerGuard,
    run_id: String,
}

impl LoggingGuard {
    pub fn run_id(&self) -> &str {
        &self.run_id
    }
}

/// Installs the global subscriber: one flattened JSON event per line in the
/// rolling file, plus warnings on stderr for whoever runs the server.
pub fn init_tracing(logging_config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = parse_filter(&logging_config.filter)?;
    let log_dir = prepare_log_dir(&logging_config.dir)?;
    let retention_warnings = purge_expired_logs(
        &log_dir,
        LOG_FILE_PREFIX,
        retention_cutoff(SystemTime::now(), logging_config.retention_days),
    );

    let (writer, worker_guard) =
        tracing_appender::non_blocking(rolling_appender(&log_dir, &logging_config.rotation));
    let mut layers: Vec<BoxedLayer> = vec![
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .with_timer(fmt::time::UtcTime::rfc_3339())
            .with_ansi(false)
            .with_writer(writer)
            .with_filter(filter)
            .boxed(),
    ];
    if logging_config.stderr_warn_enabled {
        layers.push(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_writer(std::io::stderr)
                .with_filter(LevelFilter::WARN)
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(ErrorLayer::default())
        .try_init()
        .context("failed to install the uspace-em tracing subscriber")?;

    let guard = LoggingGuard {
        _worker_guard: worker_guard,
        run_id: Uuid::now_v7().to_string(),
    };
    tracing::info!(
        target: "logging",
        service = SERVICE_NAME,
        version = env!("CARGO_PKG_VERSION"),
        run_id = %guard.run_id,
        log_dir = %log_dir.display(),
        "logging_initialized"
    );
    for warning in retention_warnings {
        tracing::warn!(target: "logging", warning = %warning, "expired_log_cleanup_failed");
    }
    Ok(guard)
}

fn parse_filter(filter: &str) -> Result<EnvFilter> {
    if filter.trim().is_empty() {
        return Err(anyhow!("logging.filter cannot be empty"));
    }
    EnvFilter::try_new(filter)
        .with_context(|| format!("failed to parse logging.filter '{}'", filter))
}

fn prepare_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.as_os_str().is_empty() {
        return Err(anyhow!("logging.dir cannot be empty"));
    }
    let log_dir = absolute_log_dir(dir)?;
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create logging directory {}", log_dir.display()))?;
    Ok(log_dir)
}

fn rolling_appender(log_dir: &Path, rotation: &LoggingRotation) -> RollingFileAppender {
    match rotation {
        LoggingRotation::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
        LoggingRotation::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
    }
}

fn absolute_log_dir(dir: &Path) -> Result<PathBuf> {
    if dir.is_absolute() {
        return Ok(dir.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .context("failed to read current working directory for logging.dir resolution")?;
    Ok(cwd.join(dir))
}

fn retention_cutoff(now: SystemTime, retention_days: usize) -> SystemTime {
    let retention = Duration::from_secs((retention_days as u64).saturating_mul(SECONDS_PER_DAY));
    now.checked_sub(retention).unwrap_or(SystemTime::UNIX_EPOCH)
}

/// Removes rotated log files last modified at or before `cutoff`.
/// Problems are collected as warnings so logging can still start.
fn purge_expired_logs(log_dir: &Path, prefix: &str, cutoff: SystemTime) -> Vec<String> {
    let entries = match fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(err) => {
            return vec![format!(
                "failed to scan logging directory {}: {}",
                log_dir.display(),
                err
            )];
        }
    };

    let mut warnings = Vec::new();
    for entry in entries {
        let outcome = entry
            .map_err(|err| format!("failed to iterate logging directory entries: {err}"))
            .and_then(|entry| expired_log_path(&entry, prefix, cutoff));

        match outcome {
            Ok(Some(path)) => {
                if let Err(err) = fs::remove_file(&path) {
                    warnings.push(format!(
                        "failed to remove expired log file {}: {}",
                        path.display(),
                        err
                    ));
                }
            }
            Ok(None) => {}
            Err(warning) => warnings.push(warning),
        }
    }
    warnings
}

fn expired_log_path(
    entry: &DirEntry,
    prefix: &str,
    cutoff: SystemTime,
) -> Result<Option<PathBuf>, String> {
    if !entry.file_name().to_string_lossy().starts_with(prefix) {
        return Ok(None);
    }

    let path = entry.path();
    let metadata = entry
        .metadata()
        .map_err(|err| format!("failed to stat {}: {}", path.display(), err))?;
    if !metadata.is_file() {
        return Ok(None);
    }

    let modified = metadata
        .modified()
        .map_err(|err| format!("failed to read mtime for {}: {}", path.display(), err))?;
    Ok((modified <= cutoff).then_some(path))
}
