use crate::error::TokenFitError;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Initialize logging system
///
/// Sets up logging to both stderr and file. Stdout is left to the
/// command output.
///
/// # Arguments
/// * `log_dir` - Directory where log files will be stored
/// * `log_level` - Log level (trace, debug, info, warn, error)
pub fn setup_logging(log_dir: &Path, log_level: &str) -> Result<(), TokenFitError> {
    // Create log directory
    if !log_dir.exists() {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            TokenFitError::config(format!(
                "Failed to create log directory {}: {}",
                log_dir.display(),
                e
            ))
        })?;
    }

    // Log file path
    let log_file_path = log_dir.join("tokenfit.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file_path)
        .map_err(|e| {
            TokenFitError::config(format!(
                "Failed to open log file {}: {}",
                log_file_path.display(),
                e
            ))
        })?;

    let env_filter = build_filter(log_level);

    // Console output layer
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_filter(env_filter.clone());

    // File output layer
    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false) // Remove ANSI color codes in files
        .with_filter(env_filter);

    // Initialize subscriber
    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| TokenFitError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::info!("Logging initialized: level={}, log_file={}", log_level, log_file_path.display());

    Ok(())
}

/// Simple logging setup (stderr only)
///
/// Used by the CLI when no log directory is given
pub fn setup_console_logging(log_level: &str) -> Result<(), TokenFitError> {
    let env_filter = build_filter(log_level);

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| TokenFitError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("Console logging initialized: level={}", log_level);

    Ok(())
}

/// Build the log filter
///
/// `RUST_LOG` takes precedence. Otherwise `log_level` is used as a full
/// filter directive (`info`, `tokenfit_segment=debug,warn`, ...); a
/// string that does not parse falls back to its bare level.
fn build_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new(parse_log_level(log_level).as_str()))
}

/// Parse string to tracing Level
pub fn parse_log_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => {
            eprintln!("Invalid log level '{}', defaulting to INFO", level);
            Level::INFO
        }
    }
}
