//! Platform configuration.
//!
//! Loaded in layers, later ones winning:
//! 1. Defaults in code
//! 2. An optional TOML file
//! 3. Environment variables with the `BISTRO_` prefix and `__` between sections
//!    (e.g. `BISTRO_DISPATCH__MAX_CONCURRENCY_RETRIES=10`)

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

use bistro_observability::LoggingConfig;

/// Largest scale a `rust_decimal::Decimal` can carry.
const MAX_DECIMAL_PLACES: u32 = 28;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DispatchConfig {
    /// Reload-and-retry attempts after an optimistic concurrency conflict.
    pub max_concurrency_retries: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CostingConfig {
    /// Scale applied to money figures on cost sheets.
    pub currency_decimal_places: u32,
}

/// Main platform configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PlatformConfig {
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
    pub costing: CostingConfig,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            logging: LoggingConfig::default(),
            dispatch: DispatchConfig {
                max_concurrency_retries: 5,
            },
            costing: CostingConfig {
                currency_decimal_places: 2,
            },
        }
    }
}

impl PlatformConfig {
    /// Defaults, then `path` if it exists, then the environment.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = defaults()?;
        if let Some(path) = path {
            builder = builder.add_source(File::with_name(path).required(false));
        }
        finish(builder.add_source(environment()))
    }

    /// Defaults overridden by the environment only.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Defaults overridden by an inline TOML document (no environment).
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        finish(defaults()?.add_source(File::from_str(toml, FileFormat::Toml)))
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.costing.currency_decimal_places > MAX_DECIMAL_PLACES {
            return Err(ConfigError::Invalid(format!(
                "costing.currency_decimal_places must be at most {MAX_DECIMAL_PLACES}"
            )));
        }
        Ok(self)
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let d = PlatformConfig::default();
    Ok(config::Config::builder()
        .set_default("logging.filter", d.logging.filter)?
        .set_default("logging.json", d.logging.json)?
        .set_default("dispatch.max_concurrency_retries", i64::from(d.dispatch.max_concurrency_retries))?
        .set_default("costing.currency_decimal_places", i64::from(d.costing.currency_decimal_places))?)
}

fn environment() -> Environment {
    Environment::with_prefix("BISTRO")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<PlatformConfig, ConfigError> {
    let cfg: PlatformConfig = builder.build()?.try_deserialize()?;
    cfg.validate()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let cfg = PlatformConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, PlatformConfig::default());
        assert_eq!(cfg.dispatch.max_concurrency_retries, 5);
        assert_eq!(cfg.costing.currency_decimal_places, 2);
        assert_eq!(cfg.logging.filter, "info");
    }

    #[test]
    fn file_values_override_defaults_per_key() {
        let cfg = PlatformConfig::from_toml_str(
            r#"
            [logging]
            json = false

            [dispatch]
            max_concurrency_retries = 12
            "#,
        )
        .unwrap();

        assert!(!cfg.logging.json);
        assert_eq!(cfg.logging.filter, "info");
        assert_eq!(cfg.dispatch.max_concurrency_retries, 12);
        assert_eq!(cfg.costing.currency_decimal_places, 2);
    }

    #[test]
    fn out_of_range_scale_is_rejected() {
        let err = PlatformConfig::from_toml_str("[costing]\ncurrency_decimal_places = 40").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let cfg = PlatformConfig::load(Some("does/not/exist/bistro")).unwrap();
        assert_eq!(cfg.costing, PlatformConfig::default().costing);
    }
}
