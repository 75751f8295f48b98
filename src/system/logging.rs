//! Logging system initialization
//!
//! Sets up `tracing` according to `LoggingConfig`: stdout or a log file
//! (optionally rotated daily), text or JSON output, written through a
//! non-blocking worker.

use std::io::Write;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

const DEFAULT_LOG_FILE: &str = "stashlink.log";

/// 根据配置创建日志输出目标；文件无法打开时回退到 stdout
fn build_writer(config: &LoggingConfig) -> Box<dyn Write + Send + Sync> {
    let Some(log_file) = config.file.as_deref().filter(|f| !f.is_empty()) else {
        return Box::new(std::io::stdout());
    };

    if config.enable_rotation {
        let path = Path::new(log_file);
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        let filename = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or(DEFAULT_LOG_FILE);

        match rolling::Builder::new()
            .rotation(rolling::Rotation::DAILY)
            .filename_prefix(filename.trim_end_matches(".log"))
            .filename_suffix("log")
            .max_log_files(config.max_backups.max(1) as usize)
            .build(dir)
        {
            Ok(appender) => Box::new(appender),
            Err(e) => {
                eprintln!(
                    "[WARN] Failed to create rolling log appender in {}: {}, logging to stdout",
                    dir.display(),
                    e
                );
                Box::new(std::io::stdout())
            }
        }
    } else {
        match std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_file)
        {
            Ok(file) => Box::new(file),
            Err(e) => {
                eprintln!(
                    "[WARN] Failed to open log file {}: {}, logging to stdout",
                    log_file, e
                );
                Box::new(std::io::stdout())
            }
        }
    }
}

/// Initialize logging system based on configuration
///
/// The returned `WorkerGuard` must be kept alive for the duration of the
/// program so buffered log lines are flushed on exit. Calling this twice
/// keeps the first subscriber.
pub fn init_logging(config: &LoggingConfig) -> WorkerGuard {
    let writer = build_writer(config);
    let (non_blocking_writer, guard) = tracing_appender::non_blocking(writer);

    // RUST_LOG 优先于配置文件
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let to_console = config.file.as_ref().is_none_or(|f| f.is_empty());
    let subscriber_builder = tracing_subscriber::fmt()
        .with_writer(non_blocking_writer)
        .with_env_filter(filter)
        .with_level(true)
        .with_ansi(to_console);

    let result = if config.format == "json" {
        subscriber_builder.json().try_init()
    } else {
        subscriber_builder.try_init()
    };

    if let Err(e) = result {
        eprintln!("[WARN] Logging already initialized: {}", e);
    }

    guard
}
