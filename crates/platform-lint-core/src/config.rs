//! Configuration types for platform-lint.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level configuration for platform-lint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Preset to use (e.g., "recommended", "strict", "minimal").
    #[serde(default)]
    pub preset: Option<String>,

    /// Per-rule configurations.
    #[serde(default)]
    pub rules: HashMap<String, RuleConfig>,

    /// File the configuration was loaded from; diagnostics about the
    /// configuration point here.
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Creates a new default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::parse(&content)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })
    }

    /// Adds or replaces the configuration of one rule.
    #[must_use]
    pub fn with_rule(mut self, name: impl Into<String>, rule: RuleConfig) -> Self {
        self.rules.insert(name.into(), rule);
        self
    }

    /// Checks if a rule is enabled.
    #[must_use]
    pub fn is_rule_enabled(&self, rule_name: &str) -> bool {
        self.rules
            .get(rule_name)
            .map_or(true, |c| c.enabled.unwrap_or(true))
    }

    /// Gets the severity override for a rule.
    #[must_use]
    pub fn rule_severity(&self, rule_name: &str) -> Option<crate::Severity> {
        self.rules.get(rule_name).and_then(|c| c.severity)
    }

    /// Path diagnostics about this configuration are reported against.
    #[must_use]
    pub fn source_path(&self) -> PathBuf {
        self.source
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }
}

/// Conventional configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "platform-lint.toml";

/// Per-rule configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleConfig {
    /// Whether this rule is enabled.
    #[serde(default)]
    pub enabled: Option<bool>,

    /// Severity override for this rule.
    #[serde(default)]
    pub severity: Option<crate::Severity>,

    /// Rule-specific options as key-value pairs.
    #[serde(flatten)]
    pub options: HashMap<String, toml::Value>,
}

impl RuleConfig {
    /// Creates an empty rule configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a rule-specific option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<toml::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Option keys, sorted.
    #[must_use]
    pub fn option_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.options.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// Fails on the first option key (in sorted order) not listed in `known`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownOption`] naming the key.
    pub fn reject_unknown(&self, rule: &str, known: &[&str]) -> Result<(), ConfigError> {
        match self.option_keys().into_iter().find(|k| !known.contains(k)) {
            Some(key) => Err(ConfigError::UnknownOption {
                rule: rule.to_string(),
                key: key.to_string(),
            }),
            None => Ok(()),
        }
    }

    /// Reads a string option, failing if it is present but not a string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] for non-string values.
    pub fn string(&self, rule: &str, key: &str) -> Result<Option<String>, ConfigError> {
        match self.options.get(key) {
            None => Ok(None),
            Some(toml::Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ConfigError::InvalidOption {
                rule: rule.to_string(),
                key: key.to_string(),
                message: format!("expected a string, found `{other}`"),
            }),
        }
    }

    /// Reads a fully qualified name option.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a string or not a well-formed name.
    pub fn qualified_name(&self, rule: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let Some(value) = self.string(rule, key)? else {
            return Ok(None);
        };
        validate_qualified_name(rule, key, &value)?;
        Ok(Some(value))
    }

    /// Reads an array of fully qualified names.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not an array of well-formed names.
    pub fn qualified_names(
        &self,
        rule: &str,
        key: &str,
    ) -> Result<Option<Vec<String>>, ConfigError> {
        let Some(value) = self.options.get(key) else {
            return Ok(None);
        };
        let invalid = || ConfigError::InvalidOption {
            rule: rule.to_string(),
            key: key.to_string(),
            message: "expected an array of strings".to_string(),
        };
        let array = value.as_array().ok_or_else(invalid)?;
        let mut names = Vec::with_capacity(array.len());
        for item in array {
            let name = item.as_str().ok_or_else(invalid)?;
            validate_qualified_name(rule, key, name)?;
            names.push(name.to_string());
        }
        Ok(Some(names))
    }

    /// Reads a simple identifier option (e.g. a parameter name).
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a string or not an identifier.
    pub fn identifier(&self, rule: &str, key: &str) -> Result<Option<String>, ConfigError> {
        let Some(value) = self.string(rule, key)? else {
            return Ok(None);
        };
        if !is_identifier(&value) {
            return Err(ConfigError::InvalidName {
                rule: rule.to_string(),
                key: key.to_string(),
                value,
            });
        }
        Ok(Some(value))
    }
}

fn is_identifier(segment: &str) -> bool {
    let mut chars = segment.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// Checks that `value` is a dot-separated sequence of identifiers.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidName`] otherwise.
pub fn validate_qualified_name(rule: &str, key: &str, value: &str) -> Result<(), ConfigError> {
    if value.split('.').all(is_identifier) {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            rule: rule.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// IO error reading config file.
    #[error("Failed to read config file {path}: {source}")]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// Parse error in config file.
    #[error("Failed to parse config: {message}")]
    Parse {
        /// Parse error message.
        message: String,
    },

    /// A rule section names a rule that is not registered.
    #[error("Unknown rule `{rule}`")]
    UnknownRule {
        /// Rule name as written.
        rule: String,
    },

    /// The preset name is not known.
    #[error("Unknown preset `{preset}`")]
    UnknownPreset {
        /// Preset name as written.
        preset: String,
    },

    /// A rule section has an option the rule does not understand.
    #[error("Unknown option `{key}` for rule `{rule}`")]
    UnknownOption {
        /// Rule name.
        rule: String,
        /// Offending key.
        key: String,
    },

    /// An option has the wrong shape.
    #[error("Invalid option `{key}` for rule `{rule}`: {message}")]
    InvalidOption {
        /// Rule name.
        rule: String,
        /// Offending key.
        key: String,
        /// What was wrong.
        message: String,
    },

    /// A designated name is malformed.
    #[error("Invalid name `{value}` for option `{key}` of rule `{rule}`")]
    InvalidName {
        /// Rule name.
        rule: String,
        /// Offending key.
        key: String,
        /// Offending value.
        value: String,
    },
}
