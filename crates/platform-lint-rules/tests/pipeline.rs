//! Integration test: all rules end-to-end via the engine.
//!
//! Covers the properties that hold across rules: stable output across
//! passes, identical answers for source and compiled declarations,
//! silence on unresolved code, and configuration problems surfacing as
//! diagnostics without stopping unrelated rules.

mod common;

use common::{platform_library, view_model_call, FLOW, PRECONDITIONS, SKIP, UNIT, VIEW_MODEL};
use platform_lint_core::model::{
    Annotation, Argument, Call, CallKind, CompilationUnit, Declaration, Expr, Member, MemberRef,
    Origin, Parameter, SuperTypeEntry, TypeRef,
};
use platform_lint_core::{Config, Engine, Severity, CONFIG_CODE};
use platform_lint_rules::{all_rules, codes, engine, recommended_rules};

fn remember_unit() -> Call {
    Call::new("remember")
        .with_target(MemberRef::new("me.jansv.runtime.RememberKt", "remember"))
        .with_argument(Argument::bound(Expr::lambda(Vec::new()), 0))
        .with_static_type(TypeRef::resolved(UNIT))
}

fn restricted_map() -> Call {
    let map = Call::new("map")
        .with_target(MemberRef::new("kotlinx.coroutines.flow.FlowKt", "map"))
        .with_receiver(Expr::reference("numbers", Some(TypeRef::resolved(FLOW))));
    Call::new("restrictedFlowCalls")
        .with_target(MemberRef::new(
            "me.jansv.runtime.RestrictedFlowCallsKt",
            "restrictedFlowCalls",
        ))
        .with_argument(Argument::bound(Expr::lambda(vec![map.into()]), 0))
}

fn producing_state_without_assignment() -> Call {
    Call::new("producingState")
        .with_target(MemberRef::new(
            "me.jansv.runtime.ProducingStateKt",
            "producingState",
        ))
        .with_argument(Argument::bound(Expr::literal("0", None), 0))
        .with_argument(Argument::bound(Expr::lambda(Vec::new()), 1))
}

/// One unit with a finding for every rule.
fn app_units() -> Vec<CompilationUnit> {
    let screen = Declaration::facade("app.ScreenKt").with_member(
        Member::method("Screen")
            .with_statement(remember_unit().into())
            .with_statement(restricted_map().into())
            .with_statement(producing_state_without_assignment().into()),
    );
    let api = Declaration::interface("app.Api").with_member(
        Member::method("users").with_annotation(Annotation::new("retrofit2.http.GET")),
    );
    let view_model = Declaration::class("app.HomeViewModel").with_supertype(
        SuperTypeEntry::new(TypeRef::resolved(VIEW_MODEL)).with_call(view_model_call(
            Expr::reference("p", Some(TypeRef::resolved(PRECONDITIONS))),
        )),
    );
    let misuse = Declaration::class("app.Leaky")
        .with_module_path("app")
        .with_annotation(Annotation::new(
            "de.zalando.lounge.annotations.InternalPlatformApi",
        ));

    vec![CompilationUnit::new("app/src/Home.kt")
        .with_declaration(screen)
        .with_declaration(api)
        .with_declaration(view_model)
        .with_declaration(misuse)]
}

fn codes_of(result: &platform_lint_core::LintResult) -> Vec<&str> {
    result.violations.iter().map(|v| v.code.as_str()).collect()
}

#[test]
fn every_rule_reports_its_finding() {
    let engine = Engine::builder().rules(all_rules()).build();
    let units = app_units();
    let result = common::run(&engine, &units, &platform_library(Origin::Compiled));

    let mut found = codes_of(&result);
    found.sort_unstable();
    assert_eq!(
        found,
        vec![
            codes::ANNOTATION_MISUSE,
            codes::MISSING_TAG,
            codes::MANDATORY_CALL,
            codes::VOID_MEMOIZATION,
            codes::RESTRICTED_OPERATOR,
            codes::PRODUCING_STATE,
        ]
    );
    assert!(result.has_errors());
}

#[test]
fn repeated_passes_are_identical() {
    let engine = Engine::builder().rules(all_rules()).build();
    let units = app_units();
    let library = platform_library(Origin::Compiled);

    let first = common::run(&engine, &units, &library);
    let second = common::run(&engine, &units, &library);
    assert_eq!(
        serde_json::to_string(&first.violations).unwrap(),
        serde_json::to_string(&second.violations).unwrap()
    );
}

#[test]
fn source_and_compiled_declarations_agree() {
    let engine = Engine::builder().rules(all_rules()).build();
    let units = app_units();

    let compiled = common::run(&engine, &units, &platform_library(Origin::Compiled));
    let source = common::run(&engine, &units, &platform_library(Origin::Source));
    assert_eq!(compiled.violations, source.violations);
}

#[test]
fn unresolved_code_is_never_flagged() {
    let strip = |call: Call| Call { target: None, ..call };
    let units = vec![CompilationUnit::new("app/src/Home.kt")
        .with_declaration(
            Declaration::facade("app.ScreenKt").with_member(
                Member::method("Screen")
                    .with_statement(strip(remember_unit()).into())
                    .with_statement(strip(restricted_map()).into())
                    .with_statement(strip(producing_state_without_assignment()).into()),
            ),
        )
        .with_declaration(
            Declaration::class("app.HomeViewModel").with_supertype(
                SuperTypeEntry::new(TypeRef::unresolved("AbstractViewModel")).with_call(
                    Call::new("AbstractViewModel").with_argument(Argument::new(
                        Expr::reference("p", Some(TypeRef::resolved(PRECONDITIONS))),
                    )),
                ),
            ),
        )];

    let engine = Engine::builder().rules(all_rules()).build();
    let result = common::run(&engine, &units, &platform_library(Origin::Compiled));
    assert!(result.violations.is_empty(), "{:#?}", result.violations);
}

#[test]
fn skipping_view_model_needs_no_handler() {
    let units = vec![CompilationUnit::new("app/src/Home.kt").with_declaration(
        Declaration::class("app.HomeViewModel")
            .with_supertype(
                SuperTypeEntry::new(TypeRef::resolved(VIEW_MODEL)).with_call(view_model_call(
                    Expr::reference("SkipPreconditions", Some(TypeRef::resolved(SKIP))),
                )),
            ),
    )];
    let engine = Engine::builder().rules(all_rules()).build();
    let result = common::run(&engine, &units, &platform_library(Origin::Compiled));
    assert!(result.violations.is_empty());
}

#[test]
fn secondary_constructor_does_not_hide_primary_base_call() {
    let two_args = |preconditions: Expr| {
        Call::new("AbstractViewModel")
            .with_target(MemberRef::constructor(VIEW_MODEL).with_overload(1))
            .with_argument(Argument::bound(preconditions, 0))
            .with_argument(Argument::bound(Expr::reference("s", None), 1))
    };
    let view_model = Declaration::class("app.DetailViewModel")
        .with_supertype(
            SuperTypeEntry::new(TypeRef::resolved(VIEW_MODEL)).with_call(two_args(
                Expr::reference("p", Some(TypeRef::resolved(PRECONDITIONS))),
            )),
        )
        .with_member(
            Member::constructor()
                .with_parameter(Parameter::new("p", TypeRef::resolved(PRECONDITIONS)))
                .with_parameter(Parameter::new(
                    "s",
                    TypeRef::resolved("androidx.lifecycle.SavedStateHandle"),
                )),
        )
        .with_member(
            Member::constructor()
                .with_parameter(Parameter::new(
                    "s",
                    TypeRef::resolved("androidx.lifecycle.SavedStateHandle"),
                ))
                .with_delegation(
                    Call::new("this")
                        .with_kind(CallKind::DelegatingConstructor)
                        .with_target(MemberRef::constructor("app.DetailViewModel"))
                        .with_argument(Argument::bound(
                            Expr::reference("SkipPreconditions", Some(TypeRef::resolved(SKIP))),
                            0,
                        )),
                ),
        );
    let units = vec![CompilationUnit::new("app/src/Detail.kt").with_declaration(view_model)];

    let engine = Engine::builder().rules(all_rules()).build();
    let result = common::run(&engine, &units, &platform_library(Origin::Compiled));
    assert_eq!(codes_of(&result), vec![codes::MANDATORY_CALL]);
}

#[test]
fn configuration_error_reported_once_per_pass() {
    let config = Config::parse(
        r#"
[rules.required-tag]
tag_bse = "me.jansv.internallib.NetworkTraceOp"

[rules.non-void-memoization]
severity = "warning"
"#,
    )
    .unwrap();
    let engine = Engine::builder()
        .rules(recommended_rules())
        .config(config)
        .build();
    assert!(!engine.rule_names().contains(&"required-tag"));

    let units = app_units();
    let library = platform_library(Origin::Compiled);
    for _ in 0..2 {
        let result = common::run(&engine, &units, &library);
        let config_errors = result.by_code(CONFIG_CODE);
        assert_eq!(config_errors.len(), 1);
        assert!(config_errors[0].message.contains("tag_bse"));
        assert_eq!(result.violations[0].code, CONFIG_CODE);

        assert!(result.by_code(codes::MISSING_TAG).is_empty());
        let memo = result.by_code(codes::VOID_MEMOIZATION);
        assert_eq!(memo.len(), 1);
        assert_eq!(memo[0].severity, Severity::Warning);
    }
}

#[test]
fn disabled_rule_is_skipped() {
    let config = Config::parse(
        r#"
preset = "strict"

[rules.producing-state-assignment]
enabled = false
"#,
    )
    .unwrap();
    let engine = engine(config);
    let result = common::run(&engine, &app_units(), &platform_library(Origin::Compiled));

    assert!(result.by_code(codes::PRODUCING_STATE).is_empty());
    assert_eq!(result.by_code(codes::RESTRICTED_OPERATOR).len(), 1);
}

#[test]
fn designated_names_are_substitutable() {
    let config = Config::parse(
        r#"
[rules.non-void-memoization]
function = "app.cache.memo"
"#,
    )
    .unwrap();
    let library = vec![Declaration::facade("app.cache.MemoKt").with_member(
        Member::method("memo").with_parameter(Parameter::new(
            "calculation",
            TypeRef::resolved("kotlin.jvm.functions.Function0"),
        )),
    )];
    let memo = Call::new("memo")
        .with_target(MemberRef::new("app.cache.MemoKt", "memo"))
        .with_argument(Argument::bound(Expr::lambda(Vec::new()), 0))
        .with_static_type(TypeRef::resolved(UNIT));
    let units = vec![CompilationUnit::new("app/src/Home.kt").with_declaration(
        Declaration::facade("app.ScreenKt")
            .with_member(Member::method("Screen").with_statement(memo.into())),
    )];

    let engine = engine(config);
    let result = common::run(&engine, &units, &library);
    assert_eq!(codes_of(&result), vec![codes::VOID_MEMOIZATION]);
    assert_eq!(
        result.violations[0].message,
        "`memo` calls must not return `Unit`"
    );
}
