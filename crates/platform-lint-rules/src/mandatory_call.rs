//! Rule to require the failure handler on view models that evaluate preconditions.
//!
//! # Rationale
//!
//! The view-model base type takes a precondition object. Passing the skip
//! sentinel means no precondition ever fails; any wider static type means
//! one may, and the subclass must then register a failure handler by calling
//! the mandatory method somewhere in its body.
//!
//! # Detection
//!
//! Subclasses are assumed to skip preconditions. Each call that directly
//! invokes a base-type constructor is inspected: the argument bound to the
//! precondition parameter disproves skipping unless its *static* type is
//! exactly the sentinel. `p: UiPreconditions = SkipPreconditions` therefore
//! still disproves skipping; `p: SkipPreconditions` does not. Delegating
//! `this(...)` calls are ignored, since they route through a constructor
//! that makes the direct call.
//!
//! When skipping is disproved and no call anywhere in the declaration
//! resolves to the mandatory method of the base type, `PL005` is reported
//! with a fix that inserts an `init` block making the call.
//!
//! # Configuration
//!
//! ```toml
//! [rules.mandatory-call-under-skip]
//! base = "me.jansv.viewmodel.AbstractViewModel"
//! preconditions = "me.jansv.viewmodel.UiPreconditions"
//! sentinel = "me.jansv.viewmodel.SkipPreconditions"
//! method = "onUncaughtException"
//! ```

use platform_lint_core::model::{Call, Declaration, DeclarationKind, MemberKind, TypeRef};
use platform_lint_core::patch::init_block;
use platform_lint_core::{
    ConfigError, Fix, Label, Node, NodeKind, Rule, RuleConfig, Severity, UnitContext, Violation,
};
use std::ops::ControlFlow;
use tracing::debug;

/// Rule code for mandatory-call-under-skip.
pub const CODE: &str = "PL005";

/// Rule name for mandatory-call-under-skip.
pub const NAME: &str = "mandatory-call-under-skip";

/// Designated names used by [`MandatoryCallUnderSkip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MandatoryCallNames {
    /// Base type whose subclasses are checked.
    pub base: String,
    /// Interface type of the precondition constructor parameter.
    pub preconditions: String,
    /// Sentinel type meaning "skip preconditions".
    pub sentinel: String,
    /// Method of the base type subclasses must call.
    pub method: String,
}

impl Default for MandatoryCallNames {
    fn default() -> Self {
        Self {
            base: "me.jansv.viewmodel.AbstractViewModel".to_string(),
            preconditions: "me.jansv.viewmodel.UiPreconditions".to_string(),
            sentinel: "me.jansv.viewmodel.SkipPreconditions".to_string(),
            method: "onUncaughtException".to_string(),
        }
    }
}

/// Requires the mandatory method call unless preconditions are provably skipped.
#[derive(Debug, Clone)]
pub struct MandatoryCallUnderSkip {
    /// Severity level.
    pub severity: Severity,
    /// Designated names.
    pub names: MandatoryCallNames,
}

impl Default for MandatoryCallUnderSkip {
    fn default() -> Self {
        Self::new()
    }
}

/// A direct base-constructor call whose precondition argument is not the sentinel.
struct Disproof<'a> {
    call: &'a Call,
    static_type: &'a TypeRef,
}

impl MandatoryCallUnderSkip {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            names: MandatoryCallNames::default(),
        }
    }

    /// Sets the severity level.
    #[must_use]
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Replaces the designated names.
    #[must_use]
    pub fn names(mut self, names: MandatoryCallNames) -> Self {
        self.names = names;
        self
    }

    /// Calls made directly by the declaration's constructors: supertype-list
    /// calls of the primary constructor, then secondary constructor delegations.
    fn constructor_calls<'a>(decl: &'a Declaration) -> impl Iterator<Item = &'a Call> {
        decl.supertypes
            .iter()
            .filter_map(|entry| entry.call.as_ref())
            .chain(decl.constructors().filter_map(|c| c.delegation.as_ref()))
    }

    fn disproofs<'a>(&self, ctx: &UnitContext<'_>, decl: &'a Declaration) -> Vec<Disproof<'a>> {
        let oracle = ctx.oracle;
        let mut disproofs = Vec::new();

        for call in Self::constructor_calls(decl) {
            let Some(target) = oracle.resolve_call(call) else {
                continue;
            };
            if target.member.kind != MemberKind::Constructor
                || target.owner.qualified_name != self.names.base
            {
                continue;
            }

            let argument = call.arguments.iter().find(|argument| {
                argument
                    .parameter
                    .and_then(|index| target.member.parameters.get(index))
                    .is_some_and(|p| oracle.is_subtype_of(&p.type_ref, &self.names.preconditions))
            });
            let Some(static_type) = argument.and_then(|a| oracle.static_type_of(&a.value)) else {
                continue;
            };

            if !oracle.is_type(static_type, &self.names.sentinel) {
                disproofs.push(Disproof { call, static_type });
            }
        }
        disproofs
    }

    fn calls_mandatory_method(&self, ctx: &UnitContext<'_>, decl: &Declaration) -> bool {
        decl.walk_calls(&mut |call| {
            let found = call.name == self.names.method
                && ctx.oracle.resolve_call(call).is_some_and(|target| {
                    target.owner.qualified_name == self.names.base
                        && target.member.name == self.names.method
                });
            if found {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
        .is_break()
    }

    /// Inserts `init { method { ... } }` at the top of the body, opening a body if needed.
    fn init_block_fix(&self, ctx: &UnitContext<'_>, decl: &Declaration) -> Option<Fix> {
        let outer = decl.range.map_or_else(String::new, |r| ctx.indent_of(r));
        let statement = format!("{} {{ /* handle failure */ }}", self.names.method);

        let (offset, text) = match &decl.body {
            Some(body) => (body.open_brace?.end.offset, init_block(&statement, &outer, false)),
            None => {
                let last = decl.supertypes.last()?.range?;
                (last.end.offset, init_block(&statement, &outer, true))
            }
        };

        Some(Fix::insertion(
            format!("Insert `{}` call", self.names.method),
            offset,
            text,
        ))
    }
}

impl Rule for MandatoryCallUnderSkip {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires a failure handler when preconditions are not skipped"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Declaration]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(NAME, &["base", "preconditions", "sentinel", "method"])?;
        if let Some(base) = config.qualified_name(NAME, "base")? {
            self.names.base = base;
        }
        if let Some(preconditions) = config.qualified_name(NAME, "preconditions")? {
            self.names.preconditions = preconditions;
        }
        if let Some(sentinel) = config.qualified_name(NAME, "sentinel")? {
            self.names.sentinel = sentinel;
        }
        if let Some(method) = config.identifier(NAME, "method")? {
            self.names.method = method;
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Declaration(decl) = node else {
            return Vec::new();
        };
        if decl.qualified_name == self.names.base
            || matches!(decl.kind, DeclarationKind::Interface | DeclarationKind::Facade)
            || !ctx.oracle.declaration_is_subtype_of(decl, &self.names.base)
        {
            return Vec::new();
        }

        let disproofs = self.disproofs(ctx, decl);
        if disproofs.is_empty() {
            debug!(declaration = %decl.qualified_name, "Preconditions skipped");
            return Vec::new();
        }
        if self.calls_mandatory_method(ctx, decl) {
            return Vec::new();
        }

        let fix = self.init_block_fix(ctx, decl);
        if fix.is_none() {
            debug!(declaration = %decl.qualified_name, "Abandoned init block insertion");
        }

        let mut violation = ctx
            .violation(
                CODE,
                NAME,
                self.severity,
                [decl.name_range, decl.range],
                format!("`{}` must call `{}`", decl.name, self.names.method),
            )
            .with_fix(fix);
        for disproof in &disproofs {
            violation = violation.with_label(Label::new(
                ctx.location([disproof.call.range]),
                format!(
                    "preconditions passed with static type `{}`",
                    disproof.static_type.text
                ),
            ));
        }

        vec![violation]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use platform_lint_core::model::{
        Argument, CallKind, CompilationUnit, Expr, Member, MemberRef, Parameter, SuperTypeEntry,
    };
    use platform_lint_core::Engine;

    const BASE: &str = "me.jansv.viewmodel.AbstractViewModel";
    const PRE: &str = "me.jansv.viewmodel.UiPreconditions";
    const SKIP: &str = "me.jansv.viewmodel.SkipPreconditions";

    fn viewmodel_unit() -> CompilationUnit {
        let preconditions = Parameter::new("preconditions", TypeRef::resolved(PRE));
        CompilationUnit::new("viewmodel/AbstractViewModel.kt")
            .with_declaration(Declaration::interface(PRE))
            .with_declaration(
                Declaration::object(SKIP)
                    .with_supertype(SuperTypeEntry::new(TypeRef::resolved(PRE))),
            )
            .with_declaration(
                Declaration::class(BASE)
                    .with_member(Member::constructor().with_parameter(preconditions))
                    .with_member(Member::method("onUncaughtException")),
            )
    }

    fn base_call(argument_type: Option<&str>) -> Call {
        Call::new("AbstractViewModel")
            .with_kind(CallKind::SuperConstructor)
            .with_target(MemberRef::constructor(BASE))
            .with_argument(Argument::bound(
                Expr::reference("p", argument_type.map(TypeRef::resolved)),
                0,
            ))
    }

    fn subclass(argument_type: Option<&str>) -> Declaration {
        Declaration::class("app.ViewModel1").with_supertype(
            SuperTypeEntry::new(TypeRef::resolved(BASE)).with_call(base_call(argument_type)),
        )
    }

    fn check_decl(decl: Declaration) -> Vec<Violation> {
        let units = vec![
            viewmodel_unit(),
            CompilationUnit::new("app/ViewModel1.kt").with_declaration(decl),
        ];
        Engine::builder()
            .rule(MandatoryCallUnderSkip::new())
            .build()
            .analyze_units(&units)
            .violations
    }

    fn mandatory_call() -> Expr {
        Call::new("onUncaughtException")
            .with_target(MemberRef::new(BASE, "onUncaughtException"))
            .into()
    }

    #[test]
    fn test_interface_static_type_disproves_skipping() {
        let violations = check_decl(subclass(Some(PRE)));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].code, CODE);
        assert_eq!(
            violations[0].message,
            "`ViewModel1` must call `onUncaughtException`"
        );
        assert_eq!(violations[0].labels.len(), 1);
        assert!(violations[0].labels[0].message.contains("`UiPreconditions`"));
    }

    #[test]
    fn test_sentinel_static_type_skips() {
        assert!(check_decl(subclass(Some(SKIP))).is_empty());
    }

    #[test]
    fn test_unknown_static_type_is_inconclusive() {
        assert!(check_decl(subclass(None)).is_empty());
    }

    #[test]
    fn test_call_in_init_block_satisfies() {
        let init = Member::initializer().with_statement(mandatory_call());
        let decl = subclass(Some(PRE)).with_member(init);
        assert!(check_decl(decl).is_empty());
    }

    #[test]
    fn test_call_in_method_satisfies() {
        let decl = subclass(Some(PRE))
            .with_member(Member::method("observeExceptions").with_statement(mandatory_call()));
        assert!(check_decl(decl).is_empty());
    }

    #[test]
    fn test_same_named_call_elsewhere_does_not_satisfy() {
        let decl = subclass(Some(PRE)).with_member(
            Member::initializer().with_statement(
                Call::new("onUncaughtException")
                    .with_target(MemberRef::new("app.Other", "onUncaughtException"))
                    .into(),
            ),
        );
        assert_eq!(check_decl(decl).len(), 1);
    }

    #[test]
    fn test_delegating_constructor_is_ignored() {
        let decl = subclass(Some(PRE)).with_member(
            Member::constructor().with_delegation(
                Call::new("this")
                    .with_kind(CallKind::DelegatingConstructor)
                    .with_target(MemberRef::constructor("app.ViewModel1"))
                    .with_argument(Argument::bound(
                        Expr::reference("SkipPreconditions", Some(TypeRef::resolved(SKIP))),
                        0,
                    )),
            ),
        );
        assert_eq!(check_decl(decl).len(), 1);
    }

    #[test]
    fn test_transitive_subclass_is_checked() {
        let middle = Declaration::class("app.Middle").with_supertype(
            SuperTypeEntry::new(TypeRef::resolved(BASE)).with_call(base_call(Some(SKIP))),
        );
        let leaf = Declaration::class("app.Leaf").with_supertype(
            SuperTypeEntry::new(TypeRef::resolved("app.Middle"))
                .with_call(Call::new("Middle").with_target(MemberRef::constructor("app.Middle"))),
        );
        let units = vec![
            viewmodel_unit(),
            CompilationUnit::new("app/Screens.kt")
                .with_declaration(middle)
                .with_declaration(leaf),
        ];
        let violations = Engine::builder()
            .rule(MandatoryCallUnderSkip::new())
            .build()
            .analyze_units(&units)
            .violations;
        assert!(violations.is_empty());
    }

    #[test]
    fn test_base_itself_is_skipped() {
        let violations = Engine::builder()
            .rule(MandatoryCallUnderSkip::new())
            .build()
            .analyze_units(&[viewmodel_unit()])
            .violations;
        assert!(violations.is_empty());
    }

    #[test]
    fn test_fix_abandoned_without_ranges() {
        let violations = check_decl(subclass(Some(PRE)));
        assert!(violations[0].fix().is_none());
    }
}
