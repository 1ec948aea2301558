//! Rule to require the producer of a produced state to assign its value.
//!
//! # Rationale
//!
//! A producing-state call returns an observable state whose value is only
//! ever what the producer lambda assigns. A producer that never assigns
//! `value` yields a state stuck at its initial value.
//!
//! # Detection
//!
//! Inside the argument bound to the producer parameter, either of these
//! satisfies the rule:
//!
//! - an assignment to `value` resolving to a member of a mutable-state type
//! - a call handing the scope on, i.e. to a function taking a parameter (or
//!   extension receiver) of the scope type or exactly the mutable-state type
//!
//! Otherwise `PL008` is reported at the call. No fix is offered.
//!
//! # Configuration
//!
//! ```toml
//! [rules.producing-state-assignment]
//! function = "me.jansv.runtime.producingState"
//! producer_parameter = "producer"
//! scope = "me.jansv.runtime.ProducingStateScope"
//! mutable_state = "me.jansv.runtime.MutableState"
//! property = "value"
//! ```

use crate::names::{argument_named, FunctionName};
use platform_lint_core::model::{Expr, TypeRef};
use platform_lint_core::{
    ConfigError, Node, NodeKind, ResolutionOracle, Rule, RuleConfig, Severity, UnitContext,
    Violation,
};
use std::ops::ControlFlow;

/// Rule code for producing-state-assignment.
pub const CODE: &str = "PL008";

/// Rule name for producing-state-assignment.
pub const NAME: &str = "producing-state-assignment";

/// Designated names used by [`ProducingStateAssignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProducingStateNames {
    /// The producing-state function.
    pub function: FunctionName,
    /// Name of its producer parameter.
    pub producer_parameter: String,
    /// Receiver type of the producer lambda.
    pub scope: String,
    /// Mutable state type declaring the property.
    pub mutable_state: String,
    /// Property the producer must assign.
    pub property: String,
}

impl Default for ProducingStateNames {
    fn default() -> Self {
        Self {
            function: FunctionName::parse("me.jansv.runtime.producingState"),
            producer_parameter: "producer".to_string(),
            scope: "me.jansv.runtime.ProducingStateScope".to_string(),
            mutable_state: "me.jansv.runtime.MutableState".to_string(),
            property: "value".to_string(),
        }
    }
}

/// Requires producer lambdas to assign the produced value.
#[derive(Debug, Clone)]
pub struct ProducingStateAssignment {
    /// Severity level.
    pub severity: Severity,
    /// Designated names.
    pub names: ProducingStateNames,
}

impl Default for ProducingStateAssignment {
    fn default() -> Self {
        Self::new()
    }
}

impl ProducingStateAssignment {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            names: ProducingStateNames::default(),
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    fn assigns_property(&self, oracle: &dyn ResolutionOracle, expr: &Expr) -> bool {
        let Expr::Assign(assign) = expr else {
            return false;
        };
        let Expr::Reference(reference) = assign.target.as_ref() else {
            return false;
        };
        reference.name == self.names.property
            && reference.target.as_ref().is_some_and(|target| {
                oracle.is_subtype_of(&TypeRef::resolved(&*target.owner), &self.names.mutable_state)
            })
    }

    fn passes_scope(&self, oracle: &dyn ResolutionOracle, expr: &Expr) -> bool {
        let Expr::Call(call) = expr else {
            return false;
        };
        let Some(target) = oracle.resolve_call(call) else {
            return false;
        };
        target
            .member
            .parameters
            .iter()
            .map(|p| &p.type_ref)
            .chain(target.member.receiver.as_ref())
            .any(|ty| {
                oracle.is_subtype_of(ty, &self.names.scope)
                    || oracle.is_type(ty, &self.names.mutable_state)
            })
    }
}

impl Rule for ProducingStateAssignment {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires producer lambdas to assign the produced value"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Call]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(
            NAME,
            &["function", "producer_parameter", "scope", "mutable_state", "property"],
        )?;
        if let Some(function) = config.qualified_name(NAME, "function")? {
            self.names.function = FunctionName::parse(&function);
        }
        if let Some(producer_parameter) = config.identifier(NAME, "producer_parameter")? {
            self.names.producer_parameter = producer_parameter;
        }
        if let Some(scope) = config.qualified_name(NAME, "scope")? {
            self.names.scope = scope;
        }
        if let Some(mutable_state) = config.qualified_name(NAME, "mutable_state")? {
            self.names.mutable_state = mutable_state;
        }
        if let Some(property) = config.identifier(NAME, "property")? {
            self.names.property = property;
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Call { call, .. } = node else {
            return Vec::new();
        };
        if call.name != self.names.function.name {
            return Vec::new();
        }
        let Some(target) = self.names.function.resolve(ctx.oracle, call) else {
            return Vec::new();
        };
        let Some(producer) = argument_named(call, &target, &self.names.producer_parameter) else {
            return Vec::new();
        };

        let satisfied = producer
            .value
            .walk(&mut |expr| {
                if self.assigns_property(ctx.oracle, expr) || self.passes_scope(ctx.oracle, expr) {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .is_break();
        if satisfied {
            return Vec::new();
        }

        vec![ctx.violation(
            CODE,
            NAME,
            self.severity,
            [call.report_range()],
            format!(
                "`{}` calls should assign `{}` inside the {} lambda",
                self.names.function.name, self.names.property, self.names.producer_parameter
            ),
        )]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_lint_core::model::{
        Argument, Call, CompilationUnit, Declaration, Member, MemberRef, Parameter, Reference,
        SuperTypeEntry,
    };
    use platform_lint_core::{Engine, SymbolTable};

    const STATE: &str = "me.jansv.runtime.State";
    const MUTABLE: &str = "me.jansv.runtime.MutableState";
    const SCOPE: &str = "me.jansv.runtime.ProducingStateScope";

    fn library() -> Vec<Declaration> {
        let any = || TypeRef::resolved("kotlin.Any");
        vec![
            Declaration::interface(STATE).with_member(Member::field("value", any())),
            Declaration::interface(MUTABLE)
                .with_supertype(SuperTypeEntry::new(TypeRef::resolved(STATE)))
                .with_member(Member::field("value", any())),
            Declaration::interface(SCOPE)
                .with_supertype(SuperTypeEntry::new(TypeRef::resolved(MUTABLE))),
            Declaration::facade("me.jansv.runtime.ProducingStateKt").with_member(
                Member::method("producingState")
                    .with_parameter(Parameter::new("initialValue", any()))
                    .with_parameter(Parameter::new(
                        "producer",
                        TypeRef::resolved("kotlin.jvm.functions.Function1"),
                    ))
                    .with_declared_type(TypeRef::resolved(STATE)),
            ),
            Declaration::facade("app.HelpersKt")
                .with_member(
                    Member::method("fill")
                        .with_parameter(Parameter::new("target", TypeRef::resolved(MUTABLE))),
                )
                .with_member(
                    Member::method("load").with_receiver(TypeRef::resolved(SCOPE)),
                )
                .with_member(
                    Member::method("read")
                        .with_parameter(Parameter::new("source", TypeRef::resolved(STATE))),
                ),
        ]
    }

    fn producing_state(producer: Vec<Expr>) -> Call {
        Call::new("producingState")
            .with_target(MemberRef::new("me.jansv.runtime.ProducingStateKt", "producingState"))
            .with_argument(Argument::bound(Expr::literal("0", None), 0))
            .with_argument(Argument::bound(Expr::lambda(producer), 1))
    }

    fn value_of(owner: &str) -> Expr {
        Expr::Reference(Reference {
            name: "value".to_string(),
            target: Some(MemberRef::new(owner, "value")),
            ..Reference::default()
        })
    }

    fn helper(name: &str) -> Expr {
        Call::new(name)
            .with_target(MemberRef::new("app.HelpersKt", name))
            .into()
    }

    fn check_call(call: Call) -> Vec<Violation> {
        let library = library();
        let units = vec![CompilationUnit::new("app/Screen.kt").with_declaration(
            Declaration::facade("app.ScreenKt")
                .with_member(Member::method("Screen").with_statement(call.into())),
        )];
        let table = SymbolTable::from_units(&units).with_library(&library);
        Engine::builder()
            .rule(ProducingStateAssignment::new())
            .build()
            .analyze(&units, &table)
            .violations
    }

    #[test]
    fn test_empty_producer_is_flagged() {
        let violations = check_call(producing_state(Vec::new()));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, CODE);
        assert_eq!(
            violations[0].message,
            "`producingState` calls should assign `value` inside the producer lambda"
        );
    }

    #[test]
    fn test_value_assignment_satisfies() {
        let assign = Expr::assign(value_of(SCOPE), Expr::literal("1", None));
        assert!(check_call(producing_state(vec![assign])).is_empty());
    }

    #[test]
    fn test_assignment_to_other_value_is_flagged() {
        let assign = Expr::assign(value_of("app.Holder"), Expr::literal("1", None));
        assert_eq!(check_call(producing_state(vec![assign])).len(), 1);
    }

    #[test]
    fn test_passing_scope_satisfies() {
        assert!(check_call(producing_state(vec![helper("fill")])).is_empty());
        assert!(check_call(producing_state(vec![helper("load")])).is_empty());
    }

    #[test]
    fn test_read_only_state_parameter_does_not_satisfy() {
        assert_eq!(check_call(producing_state(vec![helper("read")])).len(), 1);
    }

    #[test]
    fn test_unresolved_function_is_ignored() {
        let call = Call::new("producingState")
            .with_argument(Argument::new(Expr::lambda(Vec::new())));
        assert!(check_call(call).is_empty());
    }
}
