//! Designated function names shared by the call-based rules.

use platform_lint_core::model::{package_of, simple_name, Argument, Call};
use platform_lint_core::{ResolutionOracle, ResolvedMember};
use std::fmt;

/// A function designated by fully qualified name, e.g. `me.jansv.runtime.remember`.
///
/// Matches any member with that name owned by a declaration (class, object
/// or file facade) in that package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionName {
    /// Package of the function.
    pub package: String,
    /// Simple name of the function.
    pub name: String,
}

impl FunctionName {
    /// Splits a fully qualified name at its last dot.
    #[must_use]
    pub fn parse(qualified_name: &str) -> Self {
        Self {
            package: package_of(qualified_name).to_string(),
            name: simple_name(qualified_name).to_string(),
        }
    }

    /// Returns true if the resolved member is this function.
    #[must_use]
    pub fn matches(&self, resolved: &ResolvedMember<'_>) -> bool {
        resolved.member.name == self.name && resolved.owner.package == self.package
    }

    /// Resolves `call` and returns its target if it is this function.
    #[must_use]
    pub fn resolve<'o>(
        &self,
        oracle: &'o dyn ResolutionOracle,
        call: &Call,
    ) -> Option<ResolvedMember<'o>> {
        oracle
            .resolve_call(call)
            .filter(|resolved| self.matches(resolved))
    }
}

impl fmt::Display for FunctionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{}.{}", self.package, self.name)
        }
    }
}

/// Returns the argument bound to the target's parameter called `parameter`.
#[must_use]
pub fn argument_named<'c>(
    call: &'c Call,
    resolved: &ResolvedMember<'_>,
    parameter: &str,
) -> Option<&'c Argument> {
    call.arguments.iter().find(|argument| {
        argument
            .parameter
            .and_then(|index| resolved.member.parameters.get(index))
            .is_some_and(|p| p.name == parameter)
    })
}
