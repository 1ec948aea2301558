//! # platform-lint-core
//!
//! Core framework for rule-based static analysis of a declaration model.
//!
//! The host runtime parses sources and decodes compiled libraries into the
//! node model of [`model`]; this crate dispatches those nodes to rules and
//! collects their findings. It includes:
//!
//! - [`model`]: declarations, members, calls and expressions with source ranges
//! - [`ResolutionOracle`] and the in-memory [`SymbolTable`]
//! - [`Fix`] and [`TextEdit`] for automatic corrections
//! - [`Rule`] trait and the [`Engine`] that runs rules
//! - [`Violation`] for representing lint findings
//!
//! ## Example
//!
//! ```ignore
//! use platform_lint_core::{Engine, SymbolTable};
//!
//! let engine = Engine::builder()
//!     .rule(MyRule::new())
//!     .config(config)
//!     .build();
//!
//! let table = SymbolTable::from_units(&units).with_library(&library);
//! let result = engine.analyze(&units, &table);
//! println!("{}", result.format_report(Severity::Warning));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod engine;
pub mod model;
mod oracle;
pub mod patch;
mod rule;
pub mod text;
mod types;

pub use config::{validate_qualified_name, Config, ConfigError, RuleConfig, DEFAULT_CONFIG_FILE};
pub use context::UnitContext;
pub use engine::{Engine, EngineBuilder, CONFIG_CODE, CONFIG_RULE};
pub use oracle::{ResolutionOracle, ResolvedMember, SymbolTable};
pub use patch::{Fix, PatchError, TextEdit};
pub use rule::{Node, NodeKind, Rule, RuleBox};
pub use types::{
    Label, LintResult, Location, Severity, Suggestion, Violation, ViolationDiagnostic,
};
