//! TOML configuration for the keyword store, logging and the save resolver.
//!
//! # Responsibility
//! - Locate the config file (explicit path, `GOTOWORD_CONFIG`, working dir).
//! - Parse it with defaults for every missing field.
//! - Reject values the resolver cannot run with.
//!
//! # Invariants
//! - A missing config file yields `Config::default()`; only an explicitly
//!   requested file must exist.

use crate::save::resolver::ResolverConfig;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub const CONFIG_ENV_VAR: &str = "GOTOWORD_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "gotoword.toml";
pub const DEFAULT_DATABASE_FILE: &str = "keywords.db";

/// Configuration loading failure.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse { path: PathBuf, source: toml::de::Error },
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse config `{}`: {source}", path.display())
            }
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Invalid(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub resolver: ResolverConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATABASE_FILE),
        }
    }
}

/// File logging settings. Logging stays off while `dir` is unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `trace|debug|info|warn|error`; the build-mode default when unset.
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
}

/// Picks the config file: `explicit`, then `env_value`, then
/// `./gotoword.toml`. The flag reports whether the file was asked for.
pub fn resolve_config_path(explicit: Option<&Path>, env_value: Option<&str>) -> (PathBuf, bool) {
    if let Some(path) = explicit {
        return (path.to_path_buf(), true);
    }
    match env_value.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => (PathBuf::from(value), true),
        None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
    }
}

/// Loads the config selected by `resolve_config_path`, reading
/// `GOTOWORD_CONFIG` from the environment.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let env_value = std::env::var(CONFIG_ENV_VAR).ok();
    let (path, required) = resolve_config_path(explicit, env_value.as_deref());
    load_config_file(&path, required)
}

/// Loads `path`; a missing optional file yields defaults.
pub fn load_config_file(path: &Path, required: bool) -> Result<Config, ConfigError> {
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = toml::from_str::<Config>(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

/// Parses config text without touching the filesystem.
pub fn parse_config(contents: &str) -> Result<Config, ConfigError> {
    let config = toml::from_str::<Config>(contents).map_err(|source| ConfigError::Parse {
        path: PathBuf::from("<inline>"),
        source,
    })?;
    validate(&config)?;
    Ok(config)
}

pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.resolver.max_prompt_attempts == 0 {
        return Err(ConfigError::Invalid(
            "resolver.max_prompt_attempts must be at least 1".to_string(),
        ));
    }
    if config.database.path.as_os_str().is_empty() {
        return Err(ConfigError::Invalid(
            "database.path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        load_config_file, parse_config, resolve_config_path, Config, ConfigError,
        DEFAULT_CONFIG_FILE,
    };
    use crate::save::resolver::ExhaustedAnswers;
    use std::path::{Path, PathBuf};

    #[test]
    fn empty_config_yields_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.resolver.max_prompt_attempts, 5);
        assert!(config.resolver.describe_new_contexts);
        assert_eq!(config.database.path, PathBuf::from("keywords.db"));
    }

    #[test]
    fn sections_override_defaults() {
        let config = parse_config(
            r#"
            [database]
            path = "/tmp/words.db"

            [logging]
            level = "warn"

            [resolver]
            max_prompt_attempts = 2
            on_answers_exhausted = "fail"
            "#,
        )
        .unwrap();
        assert_eq!(config.database.path, PathBuf::from("/tmp/words.db"));
        assert_eq!(config.logging.level.as_deref(), Some("warn"));
        assert_eq!(config.logging.dir, None);
        assert_eq!(config.resolver.max_prompt_attempts, 2);
        assert!(config.resolver.describe_new_contexts);
        assert_eq!(config.resolver.on_answers_exhausted, ExhaustedAnswers::Fail);
    }

    #[test]
    fn zero_attempts_is_rejected() {
        let err = parse_config("[resolver]\nmax_prompt_attempts = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn unknown_exhausted_policy_is_a_parse_error() {
        let err = parse_config("[resolver]\non_answers_exhausted = \"guess\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn lookup_prefers_flag_then_env() {
        let flag = Path::new("/etc/flag.toml");
        assert_eq!(
            resolve_config_path(Some(flag), Some("/etc/env.toml")),
            (flag.to_path_buf(), true)
        );
        assert_eq!(
            resolve_config_path(None, Some("/etc/env.toml")),
            (PathBuf::from("/etc/env.toml"), true)
        );
        assert_eq!(
            resolve_config_path(None, Some("  ")),
            (PathBuf::from(DEFAULT_CONFIG_FILE), false)
        );
    }

    #[test]
    fn missing_optional_file_yields_defaults_but_required_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        assert_eq!(load_config_file(&path, false).unwrap(), Config::default());
        assert!(matches!(
            load_config_file(&path, true),
            Err(ConfigError::Io { .. })
        ));
    }

    #[test]
    fn file_on_disk_is_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gotoword.toml");
        std::fs::write(&path, "[resolver]\ndescribe_new_contexts = false\n").unwrap();
        let config = load_config_file(&path, true).unwrap();
        assert!(!config.resolver.describe_new_contexts);
    }
}
