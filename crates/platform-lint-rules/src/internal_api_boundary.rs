//! Rule to keep internal platform APIs inside the platform module.
//!
//! # Rationale
//!
//! Declarations carrying the internal-API marker annotation are
//! implementation details of the platform. Feature code must not depend on
//! them, and the marker itself only makes sense on platform declarations.
//!
//! # Detected Patterns
//!
//! Only declarations outside the restricted module are checked.
//!
//! - `PL001`: the declaration itself carries the marker annotation
//! - `PL002`: an injected field, or a parameter of an injected constructor,
//!   has a type that carries the marker and lives in the restricted module
//!
//! # Configuration
//!
//! ```toml
//! [rules.internal-api-boundary]
//! marker = "de.zalando.lounge.annotations.InternalPlatformApi"
//! injection = "javax.inject.Inject"
//! restricted_module = "platform"
//! ```

use platform_lint_core::model::{simple_name, Declaration, MemberKind, Range, TypeRef};
use platform_lint_core::{
    ConfigError, Node, NodeKind, Rule, RuleConfig, Severity, Suggestion, UnitContext, Violation,
};
use std::path::PathBuf;
use tracing::debug;

/// Rule code for internal-API annotation misuse.
pub const CODE: &str = "PL001";

/// Rule code for restricted internal-API usage.
pub const USAGE_CODE: &str = "PL002";

/// Rule name for internal-api-boundary.
pub const NAME: &str = "internal-api-boundary";

/// Designated names used by [`InternalApiBoundary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryNames {
    /// Marker annotation for internal platform APIs.
    pub marker: String,
    /// Annotation marking injected fields and constructors.
    pub injection: String,
    /// Module path prefix of the platform module.
    pub restricted_module: PathBuf,
}

impl Default for BoundaryNames {
    fn default() -> Self {
        Self {
            marker: "de.zalando.lounge.annotations.InternalPlatformApi".to_string(),
            injection: "javax.inject.Inject".to_string(),
            restricted_module: PathBuf::from("platform"),
        }
    }
}

/// Reports internal platform APIs used or declared outside the platform module.
#[derive(Debug, Clone)]
pub struct InternalApiBoundary {
    /// Severity level.
    pub severity: Severity,
    /// Designated names.
    pub names: BoundaryNames,
}

impl Default for InternalApiBoundary {
    fn default() -> Self {
        Self::new()
    }
}

impl InternalApiBoundary {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            names: BoundaryNames::default(),
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
    pub fn names(mut self, names: BoundaryNames) -> Self {
        self.names = names;
        self
    }

    fn in_restricted_module(&self, decl: &Declaration) -> bool {
        decl.module_path.starts_with(&self.names.restricted_module)
    }

    fn check_annotation(&self, ctx: &UnitContext<'_>, decl: &Declaration) -> Option<Violation> {
        let annotation = decl
            .annotations
            .iter()
            .find(|a| a.qualified_name == self.names.marker)?;

        Some(ctx.violation(
            CODE,
            NAME,
            self.severity,
            [annotation.range, decl.name_range, decl.range],
            format!(
                "Only classes in `{}` can be annotated with `{}`",
                self.names.restricted_module.display(),
                simple_name(&self.names.marker)
            ),
        ))
    }

    fn check_usage(
        &self,
        ctx: &UnitContext<'_>,
        type_ref: &TypeRef,
        fallback: Option<Range>,
    ) -> Option<Violation> {
        let target = ctx.oracle.resolve(type_ref)?;
        if !ctx.oracle.has_annotation(target, &self.names.marker)
            || !self.in_restricted_module(target)
        {
            return None;
        }

        Some(
            ctx.violation(
                USAGE_CODE,
                NAME,
                self.severity,
                [type_ref.range, fallback],
                format!("`{}` is a platform internal API", target.name),
            )
            .with_suggestion(Suggestion::new("Depend on a public platform API instead")),
        )
    }
}

impl Rule for InternalApiBoundary {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Keeps internal platform APIs inside the platform module"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Declaration]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(NAME, &["marker", "injection", "restricted_module"])?;
        if let Some(marker) = config.qualified_name(NAME, "marker")? {
            self.names.marker = marker;
        }
        if let Some(injection) = config.qualified_name(NAME, "injection")? {
            self.names.injection = injection;
        }
        if let Some(module) = config.string(NAME, "restricted_module")? {
            if module.trim().is_empty() {
                return Err(ConfigError::InvalidName {
                    rule: NAME.to_string(),
                    key: "restricted_module".to_string(),
                    value: module,
                });
            }
            self.names.restricted_module = PathBuf::from(module);
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Declaration(decl) = node else {
            return Vec::new();
        };
        if self.in_restricted_module(decl) {
            debug!(declaration = %decl.qualified_name, "Inside restricted module");
            return Vec::new();
        }

        let mut violations: Vec<Violation> = self.check_annotation(ctx, decl).into_iter().collect();

        for member in &decl.members {
            if !ctx.oracle.has_annotation(member, &self.names.injection) {
                continue;
            }
            match member.kind {
                MemberKind::Field => {
                    if let Some(ty) = &member.declared_type {
                        violations.extend(self.check_usage(ctx, ty, member.range));
                    }
                }
                MemberKind::Constructor => {
                    for parameter in member.user_parameters() {
                        violations.extend(self.check_usage(
                            ctx,
                            &parameter.type_ref,
                            parameter.range,
                        ));
                    }
                }
                MemberKind::Method | MemberKind::Initializer => {}
            }
        }

        violations
    }
}
