//! Context types for rule execution.

use crate::model::{CompilationUnit, Range};
use crate::oracle::ResolutionOracle;
use crate::types::{Location, Violation};
use crate::Severity;

/// Context provided to rules while checking one compilation unit.
#[derive(Clone, Copy)]
pub struct UnitContext<'a> {
    /// The unit being checked.
    pub unit: &'a CompilationUnit,
    /// Resolution queries for the whole pass.
    pub oracle: &'a dyn ResolutionOracle,
}

impl<'a> UnitContext<'a> {
    /// Creates a new unit context.
    #[must_use]
    pub fn new(unit: &'a CompilationUnit, oracle: &'a dyn ResolutionOracle) -> Self {
        Self { unit, oracle }
    }

    /// Location in this unit for the first known range, or line 0 when none is known.
    #[must_use]
    pub fn location<I>(&self, ranges: I) -> Location
    where
        I: IntoIterator<Item = Option<Range>>,
    {
        match ranges.into_iter().flatten().next() {
            Some(range) => Location::from_range(self.unit.path.clone(), range),
            None => Location::new(self.unit.path.clone(), 0, 0),
        }
    }

    /// Leading whitespace of the line where `range` starts.
    ///
    /// Without the unit's source this is one space per column before `range`.
    #[must_use]
    pub fn indent_of(&self, range: Range) -> String {
        let line = self.unit.source.as_deref().and_then(|source| {
            let before = source.get(..range.start.offset)?;
            let line_start = before.rfind('\n').map_or(0, |i| i + 1);
            source.get(line_start..)
        });
        match line {
            Some(line) => line
                .chars()
                .take_while(|c| *c == ' ' || *c == '\t')
                .collect(),
            None => " ".repeat(range.start.column.saturating_sub(1)),
        }
    }

    /// Creates a violation in this unit.
    #[must_use]
    pub fn violation(
        &self,
        code: &str,
        rule: &str,
        severity: Severity,
        ranges: impl IntoIterator<Item = Option<Range>>,
        message: impl Into<String>,
    ) -> Violation {
        Violation::new(code, rule, severity, self.location(ranges), message)
    }
}

impl std::fmt::Debug for UnitContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitContext")
            .field("unit", &self.unit.path)
            .finish_non_exhaustive()
    }
}
