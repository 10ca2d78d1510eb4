//! Logging initialization for the client.
//!
//! Wraps the observability crate so every entry point logs the same way:
//! structured JSONL under the client's logs directory, with credentials
//! redacted before they reach disk.

use crate::Paths;

/// Initialize the logging system.
///
/// - Structured JSONL output to `<base_dir>/logs/farmstead.jsonl`
/// - Log level from RUST_LOG env var or the provided default
/// - Warnings and errors echoed to stderr when `verbose` is set
///
/// ```ignore
/// init_logging("info", &paths, false);
/// tracing::info!("client started");
/// ```
pub fn init_logging(level: &str, paths: &Paths, verbose: bool) {
    observability::init_with_config(observability::LogConfig {
        service_name: "farmstead".into(),
        default_level: parse_level(level).to_string().to_ascii_lowercase(),
        log_path: Some(paths.log_file()),
        also_stderr: verbose,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
