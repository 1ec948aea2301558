//! Fixture builders shared by the integration tests.
//!
//! Source fixtures are small Kotlin snippets; the builders locate the
//! snippets' parts with [`SourceText`] and attach the ranges a host would.

#![allow(dead_code)]

use platform_lint_core::model::{
    Annotation, Argument, Call, CallKind, CompilationUnit, Declaration, Expr, Member, MemberRef,
    Origin, Parameter, Range, SuperTypeEntry, TypeRef,
};
use platform_lint_core::text::SourceText;
use platform_lint_core::{Engine, LintResult, ResolutionOracle, SymbolTable};

pub const GET: &str = "retrofit2.http.GET";
pub const TAG: &str = "retrofit2.http.Tag";
pub const TRACE_OP: &str = "me.jansv.internallib.NetworkTraceOp";

pub const VIEW_MODEL: &str = "me.jansv.viewmodel.AbstractViewModel";
pub const PRECONDITIONS: &str = "me.jansv.viewmodel.UiPreconditions";
pub const SKIP: &str = "me.jansv.viewmodel.SkipPreconditions";

pub const FLOW: &str = "kotlinx.coroutines.flow.Flow";
pub const UNIT: &str = "kotlin.Unit";

/// Platform and library declarations, as a host would decode them from
/// compiled artifacts.
pub fn platform_library(origin: Origin) -> Vec<Declaration> {
    let any = || TypeRef::resolved("kotlin.Any");
    let function0 = || TypeRef::resolved("kotlin.jvm.functions.Function0");
    let preconditions = || Parameter::new("preconditions", TypeRef::resolved(PRECONDITIONS));
    vec![
        Declaration::class(TRACE_OP),
        Declaration::interface(PRECONDITIONS),
        Declaration::object(SKIP)
            .with_supertype(SuperTypeEntry::new(TypeRef::resolved(PRECONDITIONS))),
        Declaration::class(VIEW_MODEL)
            .with_member(Member::constructor().with_parameter(preconditions()))
            .with_member(
                Member::constructor()
                    .with_parameter(preconditions())
                    .with_parameter(Parameter::new(
                        "savedStateHandle",
                        TypeRef::resolved("androidx.lifecycle.SavedStateHandle"),
                    )),
            )
            .with_member(
                Member::method("onUncaughtException")
                    .with_parameter(Parameter::new("handler", function0())),
            ),
        Declaration::facade("me.jansv.runtime.RememberKt").with_member(
            Member::method("remember").with_parameter(Parameter::new("calculation", function0())),
        ),
        Declaration::facade("me.jansv.runtime.RestrictedFlowCallsKt").with_member(
            Member::method("restrictedFlowCalls")
                .with_parameter(Parameter::new("block", function0()))
                .with_declared_type(TypeRef::resolved(UNIT)),
        ),
        Declaration::interface(FLOW),
        Declaration::facade("kotlinx.coroutines.flow.FlowKt").with_member(
            Member::method("map")
                .with_receiver(TypeRef::resolved(FLOW))
                .with_parameter(Parameter::new("transform", function0()))
                .with_declared_type(TypeRef::resolved(FLOW)),
        ),
        Declaration::facade("me.jansv.runtime.ProducingStateKt").with_member(
            Member::method("producingState")
                .with_parameter(Parameter::new("initialValue", any()))
                .with_parameter(Parameter::new("producer", function0())),
        ),
    ]
    .into_iter()
    .map(|decl| decl.with_origin(origin))
    .collect()
}

/// Runs `engine` over `units`, resolving against the units and `library`.
pub fn run(engine: &Engine, units: &[CompilationUnit], library: &[Declaration]) -> LintResult {
    let table = SymbolTable::from_units(units).with_library(library);
    run_with(engine, units, &table)
}

/// Runs `engine` over `units` against `oracle`.
pub fn run_with(
    engine: &Engine,
    units: &[CompilationUnit],
    oracle: &dyn ResolutionOracle,
) -> LintResult {
    engine.analyze(units, oracle)
}

/// Locates parts of a fixture source.
pub struct Fixture<'a> {
    pub source: SourceText<'a>,
}

impl<'a> Fixture<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            source: SourceText::new(content),
        }
    }

    pub fn content(&self) -> &'a str {
        self.source.content()
    }

    /// Range of `needle`, which must occur in the fixture.
    pub fn range(&self, needle: &str) -> Range {
        self.source
            .find(needle)
            .unwrap_or_else(|| panic!("`{needle}` not found in fixture"))
    }

    /// Range of the parameter list opening right after `name`.
    pub fn parameter_list(&self, name: &str) -> Range {
        let open = self.range(&format!("{name}(")).end.offset - 1;
        let close = self.content()[open..]
            .find(')')
            .map(|i| open + i + 1)
            .unwrap_or_else(|| panic!("unclosed parameter list after `{name}`"));
        self.source.range(open, close)
    }

    /// A `kotlin.*`-typed parameter written as `name: Type` in the fixture.
    pub fn parameter(&self, written: &str) -> Parameter {
        let (name, ty) = written
            .split_once(": ")
            .unwrap_or_else(|| panic!("`{written}` is not `name: Type`"));
        let type_range = self.range(written);
        let type_start = type_range.start.offset + name.len() + 2;
        Parameter::new(
            name,
            TypeRef::resolved(format!("kotlin.{ty}"))
                .with_range(self.source.range(type_start, type_range.end.offset)),
        )
        .with_range(type_range)
    }

    /// A `@GET` method declared as `fun name(...)` with the given parameters.
    pub fn remote_method(&self, name: &str, parameters: &[&str]) -> Member {
        let start = self.range(&format!("fun {name}("));
        let list = self.parameter_list(name);
        let mut member = Member::method(name)
            .with_annotation(Annotation::new(GET))
            .with_range(Range::new(start.start, list.end))
            .with_name_range(self.range(&format!("{name}(")))
            .with_parameter_list(list);
        for written in parameters {
            member = member.with_parameter(self.parameter(written));
        }
        member
    }

    /// A tag parameter written as `name: Type` in the fixture, typed as `ty`.
    pub fn tag_parameter(&self, written: &str, ty: &str) -> Parameter {
        let (name, _) = written
            .split_once(": ")
            .unwrap_or_else(|| panic!("`{written}` is not `name: Type`"));
        Parameter::new(name, TypeRef::resolved(ty))
            .with_annotation(Annotation::new(TAG))
            .with_range(self.range(written))
    }
}

/// A call to the view-model constructor taking only the preconditions.
pub fn view_model_call(argument: Expr) -> Call {
    Call::new("AbstractViewModel")
        .with_kind(CallKind::SuperConstructor)
        .with_target(MemberRef::constructor(VIEW_MODEL))
        .with_argument(Argument::bound(argument, 0))
}
