//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AppConfig;
use crate::config::validation::validate_config;
use crate::error::ConfigError;

/// Load and validate configuration: defaults, then the optional TOML file,
/// then the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let config = match path {
        Some(path) => read_file(path)?,
        None => AppConfig::default(),
    };
    let config = apply_env(config, |key| std::env::var(key).ok())?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML configuration file without validating it.
pub fn read_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Overlay the recognized environment variables onto `config`.
///
/// `lookup` abstracts `std::env::var` so callers can supply a fixed map.
pub fn apply_env<F>(mut config: AppConfig, lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(env) = lookup("ENV") {
        config.environment = env;
    }

    if let Some(level) = lookup("LOG_LEVEL") {
        config.observability.log_level =
            level.parse().map_err(|e: crate::config::schema::ParseLogLevelError| {
                ConfigError::InvalidEnv {
                    var: "LOG_LEVEL",
                    value: level.clone(),
                    reason: e.to_string(),
                }
            })?;
    }

    if let Some(port) = lookup("PORT") {
        config.server.port = port.trim().parse().map_err(|e: std::num::ParseIntError| {
            ConfigError::InvalidEnv {
                var: "PORT",
                value: port.clone(),
                reason: e.to_string(),
            }
        })?;
    }

    if let Some(url) = lookup("DATABASE_URL") {
        config.database.url = url;
    }

    if config.environment.is_empty() {
        config.environment = "development".to_string();
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::LogLevel;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_env() {
        let config = apply_env(AppConfig::default(), env(&[])).unwrap();
        assert_eq!(config.environment, "development");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.observability.log_level, LogLevel::Info);
        assert_eq!(
            config.database.url,
            "postgres://postgres:postgres@db:5432/branchdb"
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = apply_env(
            AppConfig::default(),
            env(&[
                ("ENV", "production"),
                ("LOG_LEVEL", "ERROR"),
                ("PORT", "9100"),
                ("DATABASE_URL", "postgres://localhost/test"),
            ]),
        )
        .unwrap();

        assert_eq!(config.environment, "production");
        assert_eq!(config.observability.log_level, LogLevel::Error);
        assert_eq!(config.server.port, 9100);
        assert_eq!(config.database.url, "postgres://localhost/test");
    }

    #[test]
    fn test_invalid_env_values() {
        let err = apply_env(AppConfig::default(), env(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "PORT", .. }));

        let err = apply_env(AppConfig::default(), env(&[("LOG_LEVEL", "loud")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnv { var: "LOG_LEVEL", .. }));
    }

    #[test]
    fn test_read_missing_file() {
        let err = read_file(Path::new("/nonexistent/branch-loans.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
