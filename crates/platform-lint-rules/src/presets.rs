//! Rule presets for common configurations.

use crate::{
    InternalApiBoundary, MandatoryCallUnderSkip, NonVoidMemoization, ProducingStateAssignment,
    RequiredTag, RestrictedOperator,
};
use platform_lint_core::{Config, ConfigError, Engine, RuleBox};
use tracing::debug;

/// Preset configurations for platform-lint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Preset {
    /// The platform rules.
    Recommended,
    /// Every available rule.
    Strict,
    /// Minimal rules for gradual adoption.
    Minimal,
}

impl Preset {
    /// Returns the rules for this preset.
    #[must_use]
    pub fn rules(self) -> Vec<RuleBox> {
        match self {
            Self::Recommended => recommended_rules(),
            Self::Strict => strict_rules(),
            Self::Minimal => minimal_rules(),
        }
    }

    /// Looks up a preset by its configuration name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "recommended" => Some(Self::Recommended),
            "strict" => Some(Self::Strict),
            "minimal" => Some(Self::Minimal),
            _ => None,
        }
    }

    /// Preset named by `config`, [`Preset::Recommended`] when none is named.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownPreset`] for an unknown name.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        match config.preset.as_deref() {
            None => Ok(Self::Recommended),
            Some(name) => Self::from_name(name).ok_or_else(|| ConfigError::UnknownPreset {
                preset: name.to_string(),
            }),
        }
    }
}

/// Returns the recommended set of rules.
///
/// Includes:
/// - `internal-api-boundary` (PL001/PL002) - Keeps internal platform APIs internal
/// - `required-tag` (PL003/PL004) - Requires trace tags on remote operations
/// - `mandatory-call-under-skip` (PL005) - Requires the failure handler
/// - `non-void-memoization` (PL006) - Forbids memoizing `Unit`
/// - `restricted-operator` (PL007) - Forbids stream operators in the restricted scope
#[must_use]
pub fn recommended_rules() -> Vec<RuleBox> {
    vec![
        Box::new(InternalApiBoundary::new()),
        Box::new(RequiredTag::new()),
        Box::new(MandatoryCallUnderSkip::new()),
        Box::new(NonVoidMemoization::new()),
        Box::new(RestrictedOperator::new()),
    ]
}

/// Returns the strict set of rules.
///
/// Includes all recommended rules plus:
/// - `producing-state-assignment` (PL008) - Requires producers to assign `value`
#[must_use]
pub fn strict_rules() -> Vec<RuleBox> {
    let mut rules = recommended_rules();
    rules.push(Box::new(ProducingStateAssignment::new()));
    rules
}

/// Returns the minimal set of rules.
///
/// For gradual adoption, only includes:
/// - `internal-api-boundary`
#[must_use]
pub fn minimal_rules() -> Vec<RuleBox> {
    vec![Box::new(InternalApiBoundary::new())]
}

/// Returns all available rules.
#[must_use]
pub fn all_rules() -> Vec<RuleBox> {
    strict_rules()
}

/// Builds an engine for `config` with the rules of its preset.
///
/// An unknown preset falls back to [`Preset::Recommended`] and is reported
/// as a configuration diagnostic on every pass. Sections for rules outside
/// the preset are ignored.
#[must_use]
pub fn engine(config: Config) -> Engine {
    let builder = Engine::builder();
    let (preset, builder) = match Preset::from_config(&config) {
        Ok(preset) => (preset, builder),
        Err(e) => (Preset::Recommended, builder.config_error(e)),
    };
    debug!(?preset, "Selected preset");
    builder
        .rules(preset.rules())
        .known_rules(all_rules().iter().map(|r| r.name()))
        .config(config)
        .build()
}
