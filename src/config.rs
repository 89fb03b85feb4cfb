//! Configuration System
//!
//! Provides hierarchical configuration loading from:
//! - reactor.toml (default configuration)
//! - reactor.local.toml (local overrides, git-ignored)
//! - Environment variables (REACTOR_* prefix)
//!
//! ## Example
//!
//! ```toml
//! # reactor.toml
//! [logging]
//! level = "debug"
//! format = "json"
//! ```
//!
//! Environment variable overrides:
//! ```bash
//! REACTOR_LOGGING__LEVEL=debug
//! ```

use figment::{Figment, providers::{Env, Format, Toml}};
use serde::{Deserialize, Serialize};

/// Top-level configuration for an embedding application. The `Reactor` type
/// itself takes no config struct directly — callers pull `logging` out of
/// this and wire it into [`crate::logging::init_tracing`] at startup.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReactorConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (text, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "text".to_string() }

impl ReactorConfig {
    /// Load configuration from default locations
    ///
    /// Merges in order:
    /// 1. reactor.toml (base configuration)
    /// 2. reactor.local.toml (local overrides, git-ignored)
    /// 3. Environment variables (REACTOR_* prefix)
    pub fn load() -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file("reactor.toml"))
            .merge(Toml::file("reactor.local.toml"))
            .merge(Env::prefixed("REACTOR_").split("__"))
            .extract()
    }

    /// Load configuration from a specific file path
    pub fn from_file(path: &str) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("REACTOR_").split("__"))
            .extract()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReactorConfig::default();
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, "text");
    }

    #[test]
    fn test_config_serialization() {
        let config = ReactorConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        assert!(toml_str.contains("[logging]"));
    }
}
