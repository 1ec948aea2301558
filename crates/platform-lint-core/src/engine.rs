//! Rule engine: dispatches nodes to rules and collects diagnostics.

use crate::config::{Config, ConfigError};
use crate::context::UnitContext;
use crate::model::{CompilationUnit, MemberKind};
use crate::oracle::{ResolutionOracle, SymbolTable};
use crate::rule::{Node, Rule, RuleBox};
use crate::types::{LintResult, Location, Severity, Violation};

use std::collections::HashSet;
use std::ops::ControlFlow;
use tracing::{debug, info, warn};

/// Code of diagnostics raised for configuration problems.
pub const CONFIG_CODE: &str = "PL000";

/// Rule name attached to configuration diagnostics.
pub const CONFIG_RULE: &str = "configuration";

/// Builder for configuring an [`Engine`].
#[derive(Default)]
pub struct EngineBuilder {
    rules: Vec<RuleBox>,
    known_rules: Vec<&'static str>,
    config: Option<Config>,
    config_errors: Vec<ConfigError>,
}

impl EngineBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule to the engine.
    #[must_use]
    pub fn rule<R: Rule + 'static>(mut self, rule: R) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Adds a boxed rule to the engine.
    #[must_use]
    pub fn rule_box(mut self, rule: RuleBox) -> Self {
        self.rules.push(rule);
        self
    }

    /// Adds several boxed rules.
    #[must_use]
    pub fn rules<I>(mut self, rules: I) -> Self
    where
        I: IntoIterator<Item = RuleBox>,
    {
        self.rules.extend(rules);
        self
    }

    /// Declares rule names that exist but are not registered with this engine.
    ///
    /// Configuration sections for these rules are ignored instead of being
    /// reported as unknown.
    #[must_use]
    pub fn known_rules<I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'static str>,
    {
        self.known_rules.extend(names);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = Some(config);
        self
    }

    /// Records a configuration problem found outside the engine (e.g. an unknown preset).
    #[must_use]
    pub fn config_error(mut self, error: ConfigError) -> Self {
        self.config_errors.push(error);
        self
    }

    /// Builds the engine.
    ///
    /// Each rule with a configuration section is configured here. A rule that
    /// rejects its options is dropped and the problem becomes a configuration
    /// diagnostic; the other rules are unaffected.
    #[must_use]
    pub fn build(self) -> Engine {
        let config = self.config.unwrap_or_default();
        let mut issues = self.config_errors;

        let registered: HashSet<&str> = self.rules.iter().map(|r| r.name()).collect();
        let known: HashSet<&str> = self.known_rules.iter().copied().collect();
        let mut sections: Vec<&String> = config.rules.keys().collect();
        sections.sort();
        for name in sections {
            if registered.contains(name.as_str()) {
                continue;
            }
            if known.contains(name.as_str()) {
                debug!(rule = %name, "Configuration names a rule that is not registered");
            } else {
                warn!(rule = %name, "Configuration names an unknown rule");
                issues.push(ConfigError::UnknownRule { rule: name.clone() });
            }
        }

        let mut rules = Vec::with_capacity(self.rules.len());
        for mut rule in self.rules {
            if let Some(rule_config) = config.rules.get(rule.name()) {
                if let Err(e) = rule.configure(rule_config) {
                    warn!(rule = rule.name(), error = %e, "Rule disabled by configuration error");
                    issues.push(e);
                    continue;
                }
            }
            rules.push(rule);
        }

        let path = config.source_path();
        let config_violations = issues
            .iter()
            .map(|e| {
                Violation::new(
                    CONFIG_CODE,
                    CONFIG_RULE,
                    Severity::Error,
                    Location::new(path.clone(), 0, 0),
                    e.to_string(),
                )
            })
            .collect();

        Engine {
            rules,
            config,
            config_violations,
        }
    }
}

/// Runs rules over compilation units.
///
/// Use [`Engine::builder()`] to construct an instance. An engine holds no
/// per-pass state and can run any number of passes, from several threads.
pub struct Engine {
    rules: Vec<RuleBox>,
    config: Config,
    config_violations: Vec<Violation>,
}

impl Engine {
    /// Creates a new builder for configuring an engine.
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::new()
    }

    /// Returns the number of registered rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Names of the registered rules, in registration order.
    #[must_use]
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    /// Diagnostics about the configuration, reported once per pass.
    #[must_use]
    pub fn config_violations(&self) -> &[Violation] {
        &self.config_violations
    }

    /// Analyzes units, resolving names against the units themselves.
    #[must_use]
    pub fn analyze_units(&self, units: &[CompilationUnit]) -> LintResult {
        let table = SymbolTable::from_units(units);
        self.analyze(units, &table)
    }

    /// Analyzes units against the given oracle.
    ///
    /// Diagnostics come back sorted by file, then position. Configuration
    /// diagnostics come first.
    #[must_use]
    pub fn analyze(&self, units: &[CompilationUnit], oracle: &dyn ResolutionOracle) -> LintResult {
        info!(
            units = units.len(),
            rules = self.rules.len(),
            "Starting analysis"
        );

        let mut result = LintResult::new();
        for unit in units {
            result.violations.extend(self.analyze_unit(unit, oracle));
            result.units_checked += 1;
        }

        result.violations.sort_by(|a, b| {
            a.location
                .file
                .cmp(&b.location.file)
                .then(a.location.offset.cmp(&b.location.offset))
                .then(a.location.line.cmp(&b.location.line))
                .then(a.location.column.cmp(&b.location.column))
                .then(a.code.cmp(&b.code))
        });
        // Without a range, equal diagnostics may still come from distinct nodes.
        result
            .violations
            .dedup_by(|a, b| a.location.line != 0 && a == b);
        result
            .violations
            .splice(0..0, self.config_violations.iter().cloned());

        info!(
            "Analysis complete: {} violations in {} units",
            result.violations.len(),
            result.units_checked
        );

        result
    }

    /// Analyzes a single unit and returns its violations, unsorted.
    #[must_use]
    pub fn analyze_unit(
        &self,
        unit: &CompilationUnit,
        oracle: &dyn ResolutionOracle,
    ) -> Vec<Violation> {
        debug!("Analyzing: {}", unit.path.display());

        let ctx = UnitContext::new(unit, oracle);
        let active: Vec<&dyn Rule> = self
            .rules
            .iter()
            .filter(|rule| {
                let enabled = self.config.is_rule_enabled(rule.name());
                if !enabled {
                    debug!("Skipping disabled rule: {}", rule.name());
                }
                enabled
            })
            .map(AsRef::as_ref)
            .collect();

        let mut violations = Vec::new();
        for decl in &unit.declarations {
            self.dispatch(&ctx, &active, Node::Declaration(decl), &mut violations);

            for member in decl.members.iter().filter(|m| m.kind == MemberKind::Method) {
                let node = Node::Method {
                    owner: decl,
                    member,
                };
                self.dispatch(&ctx, &active, node, &mut violations);
            }

            let _ = decl.walk_calls(&mut |call| {
                let node = Node::Call { owner: decl, call };
                self.dispatch(&ctx, &active, node, &mut violations);
                ControlFlow::Continue(())
            });
        }

        violations
    }

    fn dispatch(
        &self,
        ctx: &UnitContext<'_>,
        rules: &[&dyn Rule],
        node: Node<'_>,
        out: &mut Vec<Violation>,
    ) {
        let kind = node.kind();
        for rule in rules {
            if rule.interests().contains(&kind) {
                let found = rule.check(ctx, node);
                out.extend(self.apply_severity_override(rule.name(), found));
            }
        }
    }

    /// Applies severity overrides from configuration.
    fn apply_severity_override(
        &self,
        rule_name: &str,
        mut violations: Vec<Violation>,
    ) -> Vec<Violation> {
        if let Some(severity) = self.config.rule_severity(rule_name) {
            for v in &mut violations {
                v.severity = severity;
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleConfig;
    use crate::model::{Call, Declaration, Member, Position, Range};
    use crate::rule::NodeKind;

    /// Reports every call named `flagged`; accepts a `name` option.
    struct FlagCalls {
        name: String,
    }

    impl FlagCalls {
        fn new() -> Self {
            Self {
                name: "flagged".to_string(),
            }
        }
    }

    impl Rule for FlagCalls {
        fn name(&self) -> &'static str {
            "flag-calls"
        }
        fn code(&self) -> &'static str {
            "T001"
        }
        fn interests(&self) -> &'static [NodeKind] {
            &[NodeKind::Call]
        }
        fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
            config.reject_unknown(self.name(), &["name"])?;
            if let Some(name) = config.identifier(self.name(), "name")? {
                self.name = name;
            }
            Ok(())
        }
        fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
            let Node::Call { call, .. } = node else {
                return Vec::new();
            };
            if call.name != self.name {
                return Vec::new();
            }
            vec![ctx.violation(
                self.code(),
                self.name(),
                Severity::Warning,
                [call.range],
                "flagged call",
            )]
        }
    }

    /// Reports every declaration.
    struct FlagDeclarations;

    impl Rule for FlagDeclarations {
        fn name(&self) -> &'static str {
            "flag-declarations"
        }
        fn code(&self) -> &'static str {
            "T002"
        }
        fn interests(&self) -> &'static [NodeKind] {
            &[NodeKind::Declaration]
        }
        fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
            let Node::Declaration(decl) = node else {
                return Vec::new();
            };
            vec![ctx.violation(
                self.code(),
                self.name(),
                Severity::Error,
                [decl.range],
                "declaration",
            )]
        }
    }

    fn at(offset: usize) -> Range {
        Range::new(
            Position::new(1, offset + 1, offset),
            Position::new(1, offset + 2, offset + 1),
        )
    }

    fn units() -> Vec<CompilationUnit> {
        vec![
            CompilationUnit::new("b.kt").with_declaration(
                Declaration::class("app.B").with_range(at(0)).with_member(
                    Member::method("run")
                        .with_statement(Call::new("flagged").with_range(at(30)).into())
                        .with_statement(Call::new("flagged").with_range(at(10)).into()),
                ),
            ),
            CompilationUnit::new("a.kt")
                .with_declaration(Declaration::class("app.A").with_range(at(0))),
        ]
    }

    #[test]
    fn test_dispatch_and_sort() {
        let engine = Engine::builder()
            .rule(FlagCalls::new())
            .rule(FlagDeclarations)
            .build();
        let result = engine.analyze_units(&units());

        assert_eq!(result.units_checked, 2);
        let summary: Vec<(String, usize, &str)> = result
            .violations
            .iter()
            .map(|v| {
                let file = v.location.file.display().to_string();
                (file, v.location.offset, v.code.as_str())
            })
            .collect();
        assert_eq!(
            summary,
            vec![
                ("a.kt".to_string(), 0, "T002"),
                ("b.kt".to_string(), 0, "T002"),
                ("b.kt".to_string(), 10, "T001"),
                ("b.kt".to_string(), 30, "T001"),
            ]
        );
    }

    #[test]
    fn test_disabled_rule_is_skipped() {
        let config = Config::new().with_rule(
            "flag-declarations",
            RuleConfig {
                enabled: Some(false),
                ..RuleConfig::default()
            },
        );
        let engine = Engine::builder()
            .rule(FlagCalls::new())
            .rule(FlagDeclarations)
            .config(config)
            .build();
        let result = engine.analyze_units(&units());

        assert!(result.by_code("T002").is_empty());
        assert_eq!(result.by_code("T001").len(), 2);
    }

    #[test]
    fn test_severity_override() {
        let config = Config::new().with_rule(
            "flag-calls",
            RuleConfig {
                severity: Some(Severity::Info),
                ..RuleConfig::default()
            },
        );
        let engine = Engine::builder()
            .rule(FlagCalls::new())
            .config(config)
            .build();
        let result = engine.analyze_units(&units());

        assert!(result
            .violations
            .iter()
            .all(|v| v.severity == Severity::Info));
    }

    #[test]
    fn test_options_reach_rule() {
        let config = Config::new().with_rule(
            "flag-calls",
            RuleConfig::new().with_option("name", "other"),
        );
        let engine = Engine::builder()
            .rule(FlagCalls::new())
            .config(config)
            .build();

        assert!(engine.analyze_units(&units()).violations.is_empty());
    }

    #[test]
    fn test_bad_option_disables_only_that_rule() {
        let config = Config::new().with_rule(
            "flag-calls",
            RuleConfig::new().with_option("colour", "red"),
        );
        let engine = Engine::builder()
            .rule(FlagCalls::new())
            .rule(FlagDeclarations)
            .config(config)
            .build();

        assert_eq!(engine.rule_names(), vec!["flag-declarations"]);
        let result = engine.analyze_units(&units());
        let config_errors = result.by_code(CONFIG_CODE);
        assert_eq!(config_errors.len(), 1);
        assert_eq!(result.violations[0].code, CONFIG_CODE);
        assert!(result.violations[0].message.contains("colour"));
        assert_eq!(result.by_code("T002").len(), 2);
    }

    #[test]
    fn test_config_diagnostic_once_per_pass() {
        let config = Config::new().with_rule("no-such-rule", RuleConfig::new());
        let engine = Engine::builder()
            .rule(FlagDeclarations)
            .config(config)
            .build();

        let first = engine.analyze_units(&units());
        let second = engine.analyze_units(&units());
        assert_eq!(first.by_code(CONFIG_CODE).len(), 1);
        assert_eq!(first, second);
    }

    #[test]
    fn test_known_but_unregistered_rule_is_not_an_error() {
        let config = Config::new()
            .with_rule(
                "flag-calls",
                RuleConfig {
                    enabled: Some(false),
                    ..RuleConfig::default()
                },
            )
            .with_rule("no-such-rule", RuleConfig::new());
        let engine = Engine::builder()
            .rule(FlagDeclarations)
            .known_rules(["flag-calls", "flag-declarations"])
            .config(config)
            .build();

        let config_errors = engine.config_violations();
        assert_eq!(config_errors.len(), 1);
        assert!(config_errors[0].message.contains("no-such-rule"));
    }

    #[test]
    fn test_duplicates_are_removed_only_when_located() {
        let unit = CompilationUnit::new("c.kt").with_declaration(
            Declaration::class("app.C").with_member(
                Member::method("run")
                    .with_statement(Call::new("flagged").into())
                    .with_statement(Call::new("flagged").into())
                    .with_statement(Call::new("flagged").with_range(at(5)).into())
                    .with_statement(Call::new("flagged").with_range(at(5)).into()),
            ),
        );
        let engine = Engine::builder().rule(FlagCalls::new()).build();
        let result = engine.analyze_units(&[unit]);

        let lines: Vec<usize> = result.violations.iter().map(|v| v.location.line).collect();
        assert_eq!(lines, vec![0, 0, 1]);
    }

    #[test]
    fn test_engine_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Engine>();
    }
}
