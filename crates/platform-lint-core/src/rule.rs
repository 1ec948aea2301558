//! Rule trait and the nodes rules are dispatched on.

use crate::config::{ConfigError, RuleConfig};
use crate::context::UnitContext;
use crate::model::{Call, Declaration, Member};
use crate::types::{Severity, Violation};

/// Kinds of nodes a rule can ask to be visited with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Every declaration, facades included.
    Declaration,
    /// Every method of every declaration.
    Method,
    /// Every call, however deeply nested.
    Call,
}

/// A node handed to [`Rule::check`].
#[derive(Debug, Clone, Copy)]
pub enum Node<'a> {
    /// A declaration.
    Declaration(&'a Declaration),
    /// A method and its owner.
    Method {
        /// Declaration owning the method.
        owner: &'a Declaration,
        /// The method.
        member: &'a Member,
    },
    /// A call and the declaration it appears in.
    Call {
        /// Declaration containing the call.
        owner: &'a Declaration,
        /// The call.
        call: &'a Call,
    },
}

impl Node<'_> {
    /// Kind of this node.
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Declaration(_) => NodeKind::Declaration,
            Self::Method { .. } => NodeKind::Method,
            Self::Call { .. } => NodeKind::Call,
        }
    }
}

/// A lint rule over the declaration model.
///
/// Rules are stateless across nodes: all inputs arrive through the context
/// and the node, so a rule may be checked from several threads at once.
///
/// # Example
///
/// ```ignore
/// use platform_lint_core::{Node, NodeKind, Rule, UnitContext, Violation};
///
/// pub struct NoEmptyObjects;
///
/// impl Rule for NoEmptyObjects {
///     fn name(&self) -> &'static str { "no-empty-objects" }
///     fn code(&self) -> &'static str { "PL100" }
///     fn interests(&self) -> &'static [NodeKind] { &[NodeKind::Declaration] }
///
///     fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
///         // ...
///         Vec::new()
///     }
/// }
/// ```
pub trait Rule: Send + Sync {
    /// Returns the kebab-case name of this rule (e.g., "required-tag").
    fn name(&self) -> &'static str;

    /// Returns the primary rule code (e.g., "PL003").
    fn code(&self) -> &'static str;

    /// Returns a brief description of what this rule checks.
    fn description(&self) -> &'static str {
        ""
    }

    /// Returns the default severity for violations from this rule.
    fn default_severity(&self) -> Severity {
        Severity::Error
    }

    /// Node kinds this rule wants to see.
    fn interests(&self) -> &'static [NodeKind];

    /// Applies rule-specific options.
    ///
    /// The default accepts no options.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown keys or malformed values.
    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(self.name(), &[])
    }

    /// Checks one node and returns any violations found.
    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation>;
}

/// Type alias for boxed Rule trait objects.
pub type RuleBox = Box<dyn Rule>;
