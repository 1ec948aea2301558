//! Rule to forbid stream operators inside a restricted scope.
//!
//! # Rationale
//!
//! The gating function runs its block on every recomposition. Building a
//! stream pipeline there (`flowOf(2).map { ... }`) creates a new stream on
//! each run, so stream operators are not allowed inside the block.
//!
//! # Detected Patterns
//!
//! Within the argument bound to the block parameter, the first call that
//!
//! - has a receiver whose type is the stream type or a subtype of it, and
//! - targets a stream operator: a function returning the stream type (or a
//!   subtype), or an extension declared on exactly the stream type.
//!
//! Source and compiled declarations are treated the same. Unresolved calls
//! are skipped. No fix is offered.
//!
//! # Configuration
//!
//! ```toml
//! [rules.restricted-operator]
//! gate = "me.jansv.runtime.restrictedFlowCalls"
//! block_parameter = "block"
//! stream = "kotlinx.coroutines.flow.Flow"
//! ```

use crate::names::{argument_named, FunctionName};
use platform_lint_core::model::{simple_name, Call};
use platform_lint_core::{
    ConfigError, Node, NodeKind, ResolutionOracle, Rule, RuleConfig, Severity, UnitContext,
    Violation,
};
use std::ops::ControlFlow;

/// Rule code for restricted-operator.
pub const CODE: &str = "PL007";

/// Rule name for restricted-operator.
pub const NAME: &str = "restricted-operator";

/// Forbids stream operators inside the gating function's block.
#[derive(Debug, Clone)]
pub struct RestrictedOperator {
    /// Severity level.
    pub severity: Severity,
    /// The gating function.
    pub gate: FunctionName,
    /// Name of the gate's block parameter.
    pub block_parameter: String,
    /// The stream type.
    pub stream: String,
}

impl Default for RestrictedOperator {
    fn default() -> Self {
        Self::new()
    }
}

impl RestrictedOperator {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            gate: FunctionName::parse("me.jansv.runtime.restrictedFlowCalls"),
            block_parameter: "block".to_string(),
            stream: "kotlinx.coroutines.flow.Flow".to_string(),
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the stream type.
    #[must_use]
    pub fn stream(mut self, qualified_name: impl Into<String>) -> Self {
        self.stream = qualified_name.into();
        self
    }

    fn is_stream_operator(&self, oracle: &dyn ResolutionOracle, call: &Call) -> bool {
        let on_stream = call
            .receiver_type
            .as_ref()
            .is_some_and(|ty| oracle.is_subtype_of(ty, &self.stream));
        if !on_stream {
            return false;
        }
        let Some(target) = oracle.resolve_call(call) else {
            return false;
        };
        let returns_stream = target
            .member
            .declared_type
            .as_ref()
            .is_some_and(|ty| oracle.is_subtype_of(ty, &self.stream));
        let extends_stream = target
            .member
            .receiver
            .as_ref()
            .is_some_and(|ty| oracle.is_type(ty, &self.stream));
        returns_stream || extends_stream
    }
}

impl Rule for RestrictedOperator {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Forbids stream operators inside the restricted scope"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Call]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(NAME, &["gate", "block_parameter", "stream"])?;
        if let Some(gate) = config.qualified_name(NAME, "gate")? {
            self.gate = FunctionName::parse(&gate);
        }
        if let Some(block_parameter) = config.identifier(NAME, "block_parameter")? {
            self.block_parameter = block_parameter;
        }
        if let Some(stream) = config.qualified_name(NAME, "stream")? {
            self.stream = stream;
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Call { call, .. } = node else {
            return Vec::new();
        };
        if call.name != self.gate.name {
            return Vec::new();
        }
        let Some(target) = self.gate.resolve(ctx.oracle, call) else {
            return Vec::new();
        };
        let Some(block) = argument_named(call, &target, &self.block_parameter) else {
            return Vec::new();
        };

        let mut found = None;
        let _ = block.value.walk_calls(&mut |inner| {
            if self.is_stream_operator(ctx.oracle, inner) {
                found = Some(inner);
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        found
            .map(|operator| {
                ctx.violation(
                    CODE,
                    NAME,
                    self.severity,
                    [operator.report_range()],
                    format!(
                        "{} operator `{}` must not be invoked within `{} {{ }}`",
                        simple_name(&self.stream),
                        operator.name,
                        self.gate.name
                    ),
                )
            })
            .into_iter()
            .collect()
    }
}
