//! Tracing setup for embedding applications. The reactor itself only ever
//! emits `tracing` events (`rule_registered`, `rule_firing`,
//! `reactor_fatal_error`, ...); this module is the one opinionated way to
//! wire those into a subscriber, but using it is entirely optional.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Installs a global `tracing` subscriber from `config`: pretty text or
/// JSON output, with the configured level as the default directive
/// (overridable at runtime via `RUST_LOG`).
pub fn init_tracing(config: &LoggingConfig) {
    let default_level = parse_level(&config.level);
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);

    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// As [`init_tracing`], but writes to a daily-rotating file under
/// `directory` instead of stdout. The returned guard must be held for the
/// process lifetime — dropping it stops the background flush worker.
pub fn init_tracing_to_file(config: &LoggingConfig, directory: &Path, file_prefix: &str) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(directory, file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let default_level = parse_level(&config.level);
    let env_filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(writer);

    if config.format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    guard
}

fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        "off" => LevelFilter::OFF,
        _ => LevelFilter::INFO,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_falls_back_to_info() {
        assert_eq!(parse_level("chatty"), LevelFilter::INFO);
    }

    #[test]
    fn recognizes_standard_levels() {
        assert_eq!(parse_level("DEBUG"), LevelFilter::DEBUG);
        assert_eq!(parse_level("error"), LevelFilter::ERROR);
    }
}
