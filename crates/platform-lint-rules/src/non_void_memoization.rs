//! Rule to forbid memoizing a void result.
//!
//! # Rationale
//!
//! A memoization call caches the value its calculation returns. When that
//! value is the unit type, nothing is cached and the call is almost always
//! a mistake (`remember { state.update() }` meant as a side effect).
//!
//! # Detected Patterns
//!
//! A call to the memoization function whose own static type is void:
//!
//! - with a single void type argument: `remember<Unit> { ... }`
//! - with a calculation that is not a lambda literal
//! - with a lambda whose last statement is void or has no known type,
//!   including the empty lambda `remember { }`
//!
//! Calls whose static type is unknown are never reported. No fix is
//! offered since the intended value cannot be inferred.
//!
//! # Configuration
//!
//! ```toml
//! [rules.non-void-memoization]
//! function = "me.jansv.runtime.remember"
//! void_types = ["kotlin.Unit", "void", "java.lang.Void"]
//! ```

use crate::names::FunctionName;
use platform_lint_core::model::{Call, Expr, TypeRef};
use platform_lint_core::{
    ConfigError, Node, NodeKind, ResolvedMember, Rule, RuleConfig, Severity, UnitContext,
    Violation,
};

/// Rule code for non-void-memoization.
pub const CODE: &str = "PL006";

/// Rule name for non-void-memoization.
pub const NAME: &str = "non-void-memoization";

/// Forbids memoization calls that return the unit type.
#[derive(Debug, Clone)]
pub struct NonVoidMemoization {
    /// Severity level.
    pub severity: Severity,
    /// The memoization function.
    pub function: FunctionName,
    /// Types treated as void.
    pub void_types: Vec<String>,
}

impl Default for NonVoidMemoization {
    fn default() -> Self {
        Self::new()
    }
}

impl NonVoidMemoization {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            function: FunctionName::parse("me.jansv.runtime.remember"),
            void_types: vec![
                "kotlin.Unit".to_string(),
                "void".to_string(),
                "java.lang.Void".to_string(),
            ],
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Sets the memoization function.
    #[must_use]
    pub fn function(mut self, qualified_name: &str) -> Self {
        self.function = FunctionName::parse(qualified_name);
        self
    }

    fn is_void(&self, type_ref: &TypeRef) -> bool {
        type_ref
            .qualified_name()
            .is_some_and(|name| self.void_types.iter().any(|v| v == name))
    }

    /// Whether the calculation argument yields no value.
    fn calculation_is_void(
        &self,
        ctx: &UnitContext<'_>,
        call: &Call,
        target: &ResolvedMember<'_>,
    ) -> bool {
        if let [type_argument] = call.type_arguments.as_slice() {
            if self.is_void(type_argument) {
                return true;
            }
        }

        let calculation = target
            .member
            .user_parameters()
            .len()
            .checked_sub(1)
            .and_then(|index| call.argument_for(index));

        match calculation.map(|argument| &argument.value) {
            Some(Expr::Lambda(lambda)) => lambda
                .statements
                .last()
                .and_then(|statement| ctx.oracle.static_type_of(statement))
                .filter(|ty| ty.qualified_name().is_some())
                .map_or(true, |ty| self.is_void(ty)),
            _ => true,
        }
    }
}

impl Rule for NonVoidMemoization {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Forbids memoization calls that return the unit type"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Call]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(NAME, &["function", "void_types"])?;
        if let Some(function) = config.qualified_name(NAME, "function")? {
            self.function = FunctionName::parse(&function);
        }
        if let Some(void_types) = config.qualified_names(NAME, "void_types")? {
            self.void_types = void_types;
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Call { call, .. } = node else {
            return Vec::new();
        };
        if call.name != self.function.name {
            return Vec::new();
        }
        let Some(target) = self.function.resolve(ctx.oracle, call) else {
            return Vec::new();
        };
        let returns_void = call
            .static_type
            .as_ref()
            .is_some_and(|ty| self.is_void(ty));
        if !returns_void || !self.calculation_is_void(ctx, call, &target) {
            return Vec::new();
        }

        vec![ctx.violation(
            CODE,
            NAME,
            self.severity,
            [call.report_range()],
            format!("`{}` calls must not return `Unit`", self.function.name),
        )]
    }
}
