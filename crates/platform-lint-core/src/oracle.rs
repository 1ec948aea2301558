//! Symbol and type resolution.
//!
//! Rules never follow names on their own; every question about what a name
//! refers to goes through a [`ResolutionOracle`]. A failed resolution is
//! a normal outcome (`None` or `false`), never an error.
//!
//! [`SymbolTable`] is the in-memory oracle built from compilation units and
//! library declarations.

use crate::model::{
    Annotated, Call, CompilationUnit, Declaration, Expr, Member, MemberRef, TypeRef,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// A member together with the declaration that owns it.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedMember<'a> {
    /// Owning declaration.
    pub owner: &'a Declaration,
    /// The member itself.
    pub member: &'a Member,
}

/// Answers resolution and type queries for the rules.
///
/// Only [`declaration`](Self::declaration) is required; the remaining queries
/// have default implementations expressed in terms of it.
pub trait ResolutionOracle: Send + Sync {
    /// Looks up a declaration by fully qualified name.
    fn declaration(&self, qualified_name: &str) -> Option<&Declaration>;

    /// Resolves a type reference to its declaration.
    fn resolve(&self, type_ref: &TypeRef) -> Option<&Declaration> {
        type_ref
            .qualified_name()
            .and_then(|name| self.declaration(name))
    }

    /// Resolves a member reference.
    fn resolve_member(&self, target: &MemberRef) -> Option<ResolvedMember<'_>> {
        let owner = self.declaration(&target.owner)?;
        let member = owner.member_named(&target.name, target.overload)?;
        Some(ResolvedMember { owner, member })
    }

    /// Resolves the target of a call.
    fn resolve_call(&self, call: &Call) -> Option<ResolvedMember<'_>> {
        call.target
            .as_ref()
            .and_then(|target| self.resolve_member(target))
    }

    /// Returns true if the reference resolves to exactly `qualified_name`.
    fn is_type(&self, type_ref: &TypeRef, qualified_name: &str) -> bool {
        type_ref.qualified_name() == Some(qualified_name)
    }

    /// Returns true if the reference resolves to `qualified_name` or a subtype of it.
    fn is_subtype_of(&self, type_ref: &TypeRef, qualified_name: &str) -> bool {
        self.is_type(type_ref, qualified_name)
            || self
                .resolve(type_ref)
                .is_some_and(|decl| self.declaration_is_subtype_of(decl, qualified_name))
    }

    /// Returns true if `declaration` is `qualified_name` or inherits from it.
    ///
    /// Follows supertype lists transitively. Unresolvable supertypes still
    /// match by their recorded name but are not followed further, and cycles
    /// in the hierarchy terminate.
    fn declaration_is_subtype_of(&self, declaration: &Declaration, qualified_name: &str) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut pending: Vec<&Declaration> = vec![declaration];

        while let Some(current) = pending.pop() {
            if current.qualified_name == qualified_name {
                return true;
            }
            if !visited.insert(current.qualified_name.as_str()) {
                continue;
            }
            for entry in &current.supertypes {
                if entry.type_ref.qualified_name() == Some(qualified_name) {
                    return true;
                }
                if let Some(parent) = self.resolve(&entry.type_ref) {
                    pending.push(parent);
                }
            }
        }
        false
    }

    /// Returns true if the node carries an annotation with the given qualified name.
    fn has_annotation(&self, target: &dyn Annotated, qualified_name: &str) -> bool {
        target.annotation(qualified_name).is_some()
    }

    /// Static type of an expression, if the host could determine it.
    fn static_type_of<'e>(&self, expr: &'e Expr) -> Option<&'e TypeRef> {
        expr.static_type()
    }
}

/// Declarations indexed by fully qualified name.
///
/// Borrows the declarations; build one per analysis pass.
#[derive(Debug, Default)]
pub struct SymbolTable<'a> {
    declarations: HashMap<&'a str, &'a Declaration>,
}

impl<'a> SymbolTable<'a> {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every declaration of the given units.
    #[must_use]
    pub fn from_units(units: &'a [CompilationUnit]) -> Self {
        let mut table = Self::new();
        for unit in units {
            table.insert_unit(unit);
        }
        table
    }

    /// Adds library declarations (compiled origin).
    #[must_use]
    pub fn with_library(mut self, declarations: &'a [Declaration]) -> Self {
        for decl in declarations {
            self.insert(decl);
        }
        self
    }

    /// Indexes every declaration of a unit.
    pub fn insert_unit(&mut self, unit: &'a CompilationUnit) {
        for decl in &unit.declarations {
            self.insert(decl);
        }
    }

    /// Indexes one declaration. The first declaration registered under a name wins.
    pub fn insert(&mut self, declaration: &'a Declaration) {
        let name = declaration.qualified_name.as_str();
        if self.declarations.contains_key(name) {
            debug!(declaration = name, "Duplicate declaration ignored");
            return;
        }
        self.declarations.insert(name, declaration);
    }

    /// Number of indexed declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Returns true if nothing is indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

impl ResolutionOracle for SymbolTable<'_> {
    fn declaration(&self, qualified_name: &str) -> Option<&Declaration> {
        self.declarations.get(qualified_name).copied()
    }
}
