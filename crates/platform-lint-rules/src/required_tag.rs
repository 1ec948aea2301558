//! Rule to require a trace tag parameter on remote operations.
//!
//! # Rationale
//!
//! Every remote operation (a method carrying one of the HTTP method
//! annotations) must take a parameter annotated with the tag marker whose
//! type is the trace-operation base type. Tags are later looked up by their
//! exact static type, so a tag typed as a subtype of the base is silently
//! never found.
//!
//! # Detected Patterns
//!
//! - `PL003`: no tag parameter typed as the base type or a subtype of it
//! - `PL004`: a tag parameter typed as a strict subtype of the base type
//!
//! Both come with fixes. The inserted parameter follows the existing list
//! layout:
//!
//! ```text
//! fun a()              -> fun a(@Tag tag: NetworkTraceOp)
//! fun a(x: Int)        -> fun a(x: Int, @Tag tag: NetworkTraceOp)
//! fun a(               -> fun a(
//!     x: Int,                 x: Int,
//!     y: Int                  y: Int,
//! )                           @Tag tag: NetworkTraceOp
//!                         )
//! ```
//!
//! The continuation parameter of suspending functions is never considered
//! a user parameter.
//!
//! # Configuration
//!
//! ```toml
//! [rules.required-tag]
//! remote_operations = ["retrofit2.http.GET", "retrofit2.http.POST"]
//! tag_marker = "retrofit2.http.Tag"
//! tag_base = "me.jansv.internallib.NetworkTraceOp"
//! parameter_name = "tag"
//! ```

use platform_lint_core::model::{simple_name, Declaration, Member, Parameter};
use platform_lint_core::patch::{indent_step, list_item_insertion, spans_lines, ListShape};
use platform_lint_core::{
    ConfigError, Fix, Node, NodeKind, Rule, RuleConfig, Severity, UnitContext, Violation,
};
use tracing::debug;

/// Rule code for a missing tag parameter.
pub const CODE: &str = "PL003";

/// Rule code for a tag parameter of the wrong type.
pub const WRONG_TYPE_CODE: &str = "PL004";

/// Rule name for required-tag.
pub const NAME: &str = "required-tag";

/// Designated names used by [`RequiredTag`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNames {
    /// Annotations marking remote operations.
    pub remote_operations: Vec<String>,
    /// Annotation marking the tag parameter.
    pub tag_marker: String,
    /// Required type of the tag parameter.
    pub tag_base: String,
}

impl Default for TagNames {
    fn default() -> Self {
        Self {
            remote_operations: ["GET", "POST", "PUT", "DELETE"]
                .iter()
                .map(|verb| format!("retrofit2.http.{verb}"))
                .collect(),
            tag_marker: "retrofit2.http.Tag".to_string(),
            tag_base: "me.jansv.internallib.NetworkTraceOp".to_string(),
        }
    }
}

/// Requires remote operations to take a tag parameter of exactly the base type.
#[derive(Debug, Clone)]
pub struct RequiredTag {
    /// Severity level.
    pub severity: Severity,
    /// Designated names.
    pub names: TagNames,
    /// Name given to inserted tag parameters.
    pub parameter_name: String,
}

impl Default for RequiredTag {
    fn default() -> Self {
        Self::new()
    }
}

impl RequiredTag {
    /// Creates a new rule with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            severity: Severity::Error,
            names: TagNames::default(),
            parameter_name: "tag".to_string(),
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
    pub fn names(mut self, names: TagNames) -> Self {
        self.names = names;
        self
    }

    fn is_remote_operation(&self, ctx: &UnitContext<'_>, member: &Member) -> bool {
        self.names
            .remote_operations
            .iter()
            .any(|annotation| ctx.oracle.has_annotation(member, annotation))
    }

    fn is_tag(&self, ctx: &UnitContext<'_>, parameter: &Parameter) -> bool {
        ctx.oracle.has_annotation(parameter, &self.names.tag_marker)
    }

    fn base_simple_name(&self) -> &str {
        simple_name(&self.names.tag_base)
    }

    /// First of `tag`, `tag1`, `tag2`, ... not already used by a parameter.
    fn fresh_parameter_name(&self, parameters: &[Parameter]) -> String {
        let taken = |name: &str| parameters.iter().any(|p| p.name == name);
        if !taken(&self.parameter_name) {
            return self.parameter_name.clone();
        }
        (1..)
            .map(|n| format!("{}{n}", self.parameter_name))
            .find(|name| !taken(name))
            .unwrap_or_default()
    }

    fn missing_tag(
        &self,
        ctx: &UnitContext<'_>,
        owner: &Declaration,
        member: &Member,
    ) -> Violation {
        let fix = self.insert_tag_fix(ctx, member);
        if fix.is_none() {
            debug!(
                method = %member.name,
                owner = %owner.qualified_name,
                "Abandoned tag insertion: parameter ranges unknown"
            );
        }

        ctx.violation(
            CODE,
            NAME,
            self.severity,
            [member.name_range, member.range],
            format!(
                "`{}` is missing a `{}` tag parameter",
                member.name,
                self.base_simple_name()
            ),
        )
        .with_fix(fix)
    }

    /// Builds the fix inserting `@TagMarker name: TagBase` into the parameter list.
    fn insert_tag_fix(&self, ctx: &UnitContext<'_>, member: &Member) -> Option<Fix> {
        let list = member.parameter_list?;
        let parameters = member.user_parameters();

        let (offset, shape) = match parameters.last() {
            None => {
                let outer = member.range.map_or_else(String::new, |r| ctx.indent_of(r));
                let shape = ListShape {
                    has_items: false,
                    multiline: !list.is_single_line(),
                    indent: format!("{outer}{}", indent_step(&outer)),
                };
                (list.start.offset + 1, shape)
            }
            Some(last) => {
                let last_range = last.range?;
                let multiline = if parameters.len() == 1 {
                    !list.is_single_line()
                } else {
                    let lines: Option<Vec<usize>> = parameters
                        .iter()
                        .map(|p| p.range.map(|r| r.start.line))
                        .collect();
                    spans_lines(lines?)
                };
                let shape = ListShape {
                    has_items: true,
                    multiline,
                    indent: ctx.indent_of(last_range),
                };
                (last_range.end.offset, shape)
            }
        };

        let item = format!(
            "@{} {}: {}",
            self.names.tag_marker,
            self.fresh_parameter_name(parameters),
            self.names.tag_base
        );
        Some(Fix::insertion(
            format!("Insert a `{}` tag", self.base_simple_name()),
            offset,
            list_item_insertion(&shape, &item),
        ))
    }

    fn wrong_tag_types(&self, ctx: &UnitContext<'_>, member: &Member) -> Vec<Violation> {
        member
            .user_parameters()
            .iter()
            .filter(|p| self.is_tag(ctx, p))
            .filter(|p| {
                ctx.oracle.is_subtype_of(&p.type_ref, &self.names.tag_base)
                    && !ctx.oracle.is_type(&p.type_ref, &self.names.tag_base)
            })
            .map(|p| {
                let fix = p.type_ref.range.map(|range| {
                    Fix::replacement(
                        format!("Change to `{}`", self.base_simple_name()),
                        range,
                        self.names.tag_base.clone(),
                    )
                });
                ctx.violation(
                    WRONG_TYPE_CODE,
                    NAME,
                    self.severity,
                    [p.type_ref.range, p.range],
                    format!("Trace tag must have `{}` type", self.base_simple_name()),
                )
                .with_fix(fix)
            })
            .collect()
    }
}

impl Rule for RequiredTag {
    fn name(&self) -> &'static str {
        NAME
    }

    fn code(&self) -> &'static str {
        CODE
    }

    fn description(&self) -> &'static str {
        "Requires remote operations to take a trace tag parameter"
    }

    fn default_severity(&self) -> Severity {
        self.severity
    }

    fn interests(&self) -> &'static [NodeKind] {
        &[NodeKind::Method]
    }

    fn configure(&mut self, config: &RuleConfig) -> Result<(), ConfigError> {
        config.reject_unknown(
            NAME,
            &["remote_operations", "tag_marker", "tag_base", "parameter_name"],
        )?;
        if let Some(annotations) = config.qualified_names(NAME, "remote_operations")? {
            self.names.remote_operations = annotations;
        }
        if let Some(marker) = config.qualified_name(NAME, "tag_marker")? {
            self.names.tag_marker = marker;
        }
        if let Some(base) = config.qualified_name(NAME, "tag_base")? {
            self.names.tag_base = base;
        }
        if let Some(name) = config.identifier(NAME, "parameter_name")? {
            self.parameter_name = name;
        }
        Ok(())
    }

    fn check(&self, ctx: &UnitContext<'_>, node: Node<'_>) -> Vec<Violation> {
        let Node::Method { owner, member } = node else {
            return Vec::new();
        };
        if !self.is_remote_operation(ctx, member) {
            return Vec::new();
        }

        let has_tag = member.user_parameters().iter().any(|p| {
            self.is_tag(ctx, p) && ctx.oracle.is_subtype_of(&p.type_ref, &self.names.tag_base)
        });
        if !has_tag {
            return vec![self.missing_tag(ctx, owner, member)];
        }

        self.wrong_tag_types(ctx, member)
    }
}
