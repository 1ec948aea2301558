//! # platform-lint-rules
//!
//! Built-in platform architecture rules for platform-lint.
//!
//! Every rule reads designated names (annotations, base types, functions)
//! from an explicit names struct with the platform's defaults, overridable
//! per rule in `platform-lint.toml`.
//!
//! ## Available Rules
//!
//! | Code | Name | Description |
//! |------|------|-------------|
//! | PL001 | `internal-api-boundary` | Internal API marker used outside the platform module |
//! | PL002 | `internal-api-boundary` | Internal platform API injected outside the platform module |
//! | PL003 | `required-tag` | Remote operation without a trace tag parameter |
//! | PL004 | `required-tag` | Trace tag typed as a subtype of the tag type |
//! | PL005 | `mandatory-call-under-skip` | Failure handler missing while preconditions may fail |
//! | PL006 | `non-void-memoization` | Memoization call returning `Unit` |
//! | PL007 | `restricted-operator` | Stream operator inside the restricted scope |
//! | PL008 | `producing-state-assignment` | Producer lambda never assigns `value` |
//!
//! ## Usage
//!
//! ```ignore
//! use platform_lint_core::{Config, SymbolTable};
//! use platform_lint_rules::{engine, RequiredTag};
//!
//! let engine = engine(Config::from_file(path)?);
//! let table = SymbolTable::from_units(&units).with_library(&library);
//! let result = engine.analyze(&units, &table);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod internal_api_boundary;
mod mandatory_call;
mod names;
mod non_void_memoization;
mod presets;
mod producing_state;
mod required_tag;
mod restricted_operator;

pub use internal_api_boundary::{BoundaryNames, InternalApiBoundary};
pub use mandatory_call::{MandatoryCallNames, MandatoryCallUnderSkip};
pub use names::{argument_named, FunctionName};
pub use non_void_memoization::NonVoidMemoization;
pub use presets::{all_rules, engine, minimal_rules, recommended_rules, strict_rules, Preset};
pub use producing_state::{ProducingStateAssignment, ProducingStateNames};
pub use required_tag::{RequiredTag, TagNames};
pub use restricted_operator::RestrictedOperator;

/// Rule codes, by rule module.
pub mod codes {
    pub use crate::internal_api_boundary::{
        CODE as ANNOTATION_MISUSE, USAGE_CODE as INTERNAL_USAGE,
    };
    pub use crate::mandatory_call::CODE as MANDATORY_CALL;
    pub use crate::non_void_memoization::CODE as VOID_MEMOIZATION;
    pub use crate::producing_state::CODE as PRODUCING_STATE;
    pub use crate::required_tag::{CODE as MISSING_TAG, WRONG_TYPE_CODE as WRONG_TAG_TYPE};
    pub use crate::restricted_operator::CODE as RESTRICTED_OPERATOR;
}

/// Re-export core types for convenience.
pub use platform_lint_core::{Rule, Severity, Violation};
