
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::solver::suggest::{DEFAULT_LIMIT, MAX_LIMIT};
use crate::{Language, NormalizationMode, RetryPolicy, Rules};

/// Engine wide settings.
///
/// Every field has a default, so an empty file (or none) is a valid
/// configuration. Environment variables prefixed with `BALDA_` override the
/// file, nested fields use a double underscore (`BALDA_RETRY__MAX_ATTEMPTS`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub language: Language,
    pub normalization: NormalizationMode,
    pub min_word_length: usize,
    /// Suggestions returned when the caller gives no limit
    pub suggestion_limit: usize,
    /// Suggestions returned at most, whatever the caller asks
    pub suggestion_max_limit: usize,
    pub retry: RetryPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            normalization: NormalizationMode::default(),
            min_word_length: 2,
            suggestion_limit: DEFAULT_LIMIT,
            suggestion_max_limit: MAX_LIMIT,
            retry: RetryPolicy::default(),
        }
    }
}

impl EngineConfig {
    /// Reads `file` if given (any format the `config` crate knows, the
    /// extension may be omitted), then the environment.
    pub fn load(file: Option<&str>) -> Result<Self, ConfigError> {
        let mut s = Config::new();

        if let Some(f) = file {
            s.merge(File::with_name(f))?;
        }

        s.merge(Environment::with_prefix("BALDA").separator("__"))?;

        Self::finish(s)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let mut s = Config::new();
        s.merge(File::from_str(text, FileFormat::Toml))?;
        Self::finish(s)
    }

    fn finish(s: Config) -> Result<Self, ConfigError> {
        let conf: Self = s.try_into()?;
        conf.check()?;
        log::debug!("engine configuration: {:?}", conf);
        Ok(conf)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.min_word_length == 0 {
            return Err(ConfigError::Message("min_word_length must be at least 1".to_owned()));
        }
        if self.suggestion_max_limit > MAX_LIMIT {
            log::warn!(
                "suggestion_max_limit {} is above the engine bound, {} will be used",
                self.suggestion_max_limit,
                MAX_LIMIT
            );
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Message("retry.max_attempts must be at least 1".to_owned()));
        }
        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Message(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".to_owned(),
            ));
        }
        Ok(())
    }

    /// The validator settings
    pub fn rules(&self) -> Rules {
        Rules {
            min_word_length: self.min_word_length,
            normalization: self.normalization,
        }
    }
}

#[test]
fn test_defaults() {
    let conf = EngineConfig::from_toml("").unwrap();
    assert_eq!(conf, EngineConfig::default());
    assert_eq!(conf.language, Language::Russian);
    assert_eq!(conf.normalization, NormalizationMode::Exact);
    assert_eq!(conf.min_word_length, 2);
    assert_eq!(conf.suggestion_limit, 10);
    assert_eq!(conf.suggestion_max_limit, 50);
    assert_eq!(conf.retry.max_attempts, 5);
}

#[test]
fn test_partial_file() {
    let conf = EngineConfig::from_toml(
        r#"
        language = "english"
        normalization = "fold_yo"
        min_word_length = 3

        [retry]
        max_attempts = 2
        "#,
    )
    .unwrap();
    assert_eq!(conf.language, Language::English);
    assert_eq!(conf.normalization, NormalizationMode::FoldYo);
    assert_eq!(conf.rules().min_word_length, 3);
    assert_eq!(conf.retry.max_attempts, 2);
    // untouched fields keep their default
    assert_eq!(conf.retry.max_delay_ms, RetryPolicy::default().max_delay_ms);
    assert_eq!(conf.suggestion_limit, 10);
}

#[test]
fn test_rejects_nonsense() {
    assert!(EngineConfig::from_toml("min_word_length = 0").is_err());
    assert!(EngineConfig::from_toml("[retry]\nmax_attempts = 0").is_err());
    assert!(EngineConfig::from_toml("[retry]\nbase_delay_ms = 900\nmax_delay_ms = 10").is_err());
    assert!(EngineConfig::from_toml("language = \"klingon\"").is_err());
}

#[test]
fn test_missing_file() {
    assert!(EngineConfig::load(Some("/nonexistent/balda-config")).is_err());
}
