//! Tracing/logging initialization.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

/// `logging.*` section of the platform configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Default directive when `RUST_LOG` is not set.
    #[serde(default = "default_filter")]
    pub filter: String,
    /// JSON lines when true, human-readable output otherwise.
    #[serde(default = "default_json")]
    pub json: bool,
}

fn default_filter() -> String {
    "info".to_string()
}

fn default_json() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            json: default_json(),
        }
    }
}

impl LoggingConfig {
    /// `RUST_LOG` wins over the configured filter; an unparsable filter falls back to `info`.
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.filter))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// Initialize tracing/logging for the process.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init() {
    init_with(&LoggingConfig::default());
}

pub fn init_with(config: &LoggingConfig) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(config.env_filter())
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_target(false);

    // try_init fails once a global subscriber exists; that is the no-op case.
    let _ = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_keys() {
        let cfg: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg, LoggingConfig::default());

        let cfg: LoggingConfig = serde_json::from_str(r#"{"json": false}"#).unwrap();
        assert_eq!(cfg.filter, "info");
        assert!(!cfg.json);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init();
        init_with(&LoggingConfig {
            filter: "debug".into(),
            json: false,
        });
    }
}
