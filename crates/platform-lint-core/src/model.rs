//! Declaration and expression node model.
//!
//! The host runtime builds one snapshot of these nodes per compilation unit
//! and hands it to the [`Engine`](crate::Engine). Nodes are plain data: the
//! engine and the rules only read them, and every derived fact is recomputed
//! on each pass.
//!
//! Source ranges are optional on every node. A missing range means the host
//! could not locate the node; rules still report what they can determine but
//! abandon fix synthesis that depends on the missing range.

use serde::{Deserialize, Serialize};
use std::ops::ControlFlow;
use std::path::PathBuf;

/// Member name used for constructors.
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// Name given to the synthetic continuation parameter of suspending functions.
pub const CONTINUATION_NAME: &str = "$completion";

/// Fully qualified name of the continuation type.
pub const CONTINUATION_FQN: &str = "kotlin.coroutines.Continuation";

// ────────────────────────────────────────────
// Positions
// ────────────────────────────────────────────

/// A point in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Position {
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Byte offset in the file (0-indexed).
    pub offset: usize,
}

impl Position {
    /// Creates a new position.
    #[must_use]
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

/// A half-open source range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Range {
    /// First position covered by the range.
    pub start: Position,
    /// Position just past the range.
    pub end: Position,
}

impl Range {
    /// Creates a new range.
    #[must_use]
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Returns true if the range starts and ends on the same line.
    #[must_use]
    pub fn is_single_line(&self) -> bool {
        self.start.line == self.end.line
    }

    /// Length of the range in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset)
    }

    /// Returns true if the range covers no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ────────────────────────────────────────────
// Annotations and type references
// ────────────────────────────────────────────

/// An annotation applied to a declaration, member or parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Fully qualified name of the annotation class.
    pub qualified_name: String,
    /// Range of the annotation, `@` included.
    #[serde(default)]
    pub range: Option<Range>,
}

impl Annotation {
    /// Creates an annotation without a source range.
    #[must_use]
    pub fn new(qualified_name: impl Into<String>) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            range: None,
        }
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// Nodes that carry annotations.
pub trait Annotated {
    /// Annotations in source order.
    fn annotations(&self) -> &[Annotation];

    /// Returns the first annotation with the given qualified name.
    fn annotation(&self, qualified_name: &str) -> Option<&Annotation> {
        self.annotations()
            .iter()
            .find(|a| a.qualified_name == qualified_name)
    }
}

/// A reference to a type as written in source.
///
/// `target` holds the fully qualified name the host resolved the reference
/// to; `None` means the reference could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Text as written (e.g. `UiPreconditions`).
    pub text: String,
    /// Resolved fully qualified name.
    #[serde(default)]
    pub target: Option<String>,
    /// Range of the written type.
    #[serde(default)]
    pub range: Option<Range>,
}

impl TypeRef {
    /// Creates a resolved reference whose text is the simple name of `qualified_name`.
    #[must_use]
    pub fn resolved(qualified_name: impl Into<String>) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            text: simple_name(&qualified_name).to_string(),
            target: Some(qualified_name),
            range: None,
        }
    }

    /// Creates an unresolved reference.
    #[must_use]
    pub fn unresolved(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            target: None,
            range: None,
        }
    }

    /// Overrides the written text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Resolved fully qualified name, if any.
    #[must_use]
    pub fn qualified_name(&self) -> Option<&str> {
        self.target.as_deref()
    }
}

/// Returns the last dot-separated segment of a qualified name.
#[must_use]
pub fn simple_name(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map_or(qualified_name, |(_, name)| name)
}

/// Returns everything before the last dot of a qualified name.
#[must_use]
pub fn package_of(qualified_name: &str) -> &str {
    qualified_name
        .rsplit_once('.')
        .map_or("", |(package, _)| package)
}

// ────────────────────────────────────────────
// Declarations
// ────────────────────────────────────────────

/// Kind of a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// `class Foo`
    Class,
    /// `interface Foo`
    Interface,
    /// `object Foo`
    Object,
    /// Container for top-level functions of a file (e.g. `FooKt`).
    Facade,
}

/// Where a declaration was read from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Parsed from source text of the analyzed project.
    #[default]
    Source,
    /// Decoded from a compiled artifact's metadata.
    Compiled,
}

/// One entry of a declaration's supertype list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperTypeEntry {
    /// The supertype.
    pub type_ref: TypeRef,
    /// Super-constructor call made by the primary constructor, e.g. `Base(p)`.
    #[serde(default)]
    pub call: Option<Call>,
    /// Range of the whole entry, call arguments included.
    #[serde(default)]
    pub range: Option<Range>,
}

impl SuperTypeEntry {
    /// Creates an entry without a constructor call.
    #[must_use]
    pub fn new(type_ref: TypeRef) -> Self {
        Self {
            type_ref,
            call: None,
            range: None,
        }
    }

    /// Sets the super-constructor call.
    #[must_use]
    pub fn with_call(mut self, call: Call) -> Self {
        self.call = Some(call);
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

/// The `{ ... }` body of a declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeclarationBody {
    /// Range of the opening brace.
    #[serde(default)]
    pub open_brace: Option<Range>,
}

/// A class-like declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// Fully qualified name.
    pub qualified_name: String,
    /// Simple name.
    pub name: String,
    /// Package the declaration lives in.
    #[serde(default)]
    pub package: String,
    /// Declaration kind.
    pub kind: DeclarationKind,
    /// Source or compiled origin.
    #[serde(default)]
    pub origin: Origin,
    /// Annotations in source order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Supertype list in source order.
    #[serde(default)]
    pub supertypes: Vec<SuperTypeEntry>,
    /// Members in source order.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Module path relative to the project root (e.g. `platform/runtime`).
    #[serde(default)]
    pub module_path: PathBuf,
    /// Range of the whole declaration.
    #[serde(default)]
    pub range: Option<Range>,
    /// Range of the declaration's name identifier.
    #[serde(default)]
    pub name_range: Option<Range>,
    /// Body, if the declaration has braces.
    #[serde(default)]
    pub body: Option<DeclarationBody>,
}

impl Declaration {
    /// Creates a declaration, deriving the simple name and package from `qualified_name`.
    #[must_use]
    pub fn new(qualified_name: impl Into<String>, kind: DeclarationKind) -> Self {
        let qualified_name = qualified_name.into();
        Self {
            name: simple_name(&qualified_name).to_string(),
            package: package_of(&qualified_name).to_string(),
            qualified_name,
            kind,
            origin: Origin::Source,
            annotations: Vec::new(),
            supertypes: Vec::new(),
            members: Vec::new(),
            module_path: PathBuf::new(),
            range: None,
            name_range: None,
            body: None,
        }
    }

    /// Creates a class declaration.
    #[must_use]
    pub fn class(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, DeclarationKind::Class)
    }

    /// Creates an interface declaration.
    #[must_use]
    pub fn interface(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, DeclarationKind::Interface)
    }

    /// Creates an object declaration.
    #[must_use]
    pub fn object(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, DeclarationKind::Object)
    }

    /// Creates a facade holding top-level functions.
    #[must_use]
    pub fn facade(qualified_name: impl Into<String>) -> Self {
        Self::new(qualified_name, DeclarationKind::Facade)
    }

    /// Sets the origin.
    #[must_use]
    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Overrides the package derived from the qualified name.
    #[must_use]
    pub fn with_package(mut self, package: impl Into<String>) -> Self {
        self.package = package.into();
        self
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds a supertype entry.
    #[must_use]
    pub fn with_supertype(mut self, entry: SuperTypeEntry) -> Self {
        self.supertypes.push(entry);
        self
    }

    /// Adds a member.
    #[must_use]
    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    /// Sets the module path.
    #[must_use]
    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_path = path.into();
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Sets the name range.
    #[must_use]
    pub fn with_name_range(mut self, range: Range) -> Self {
        self.name_range = Some(range);
        self
    }

    /// Marks the declaration as having a body opened at `open_brace`.
    #[must_use]
    pub fn with_body(mut self, open_brace: Option<Range>) -> Self {
        self.body = Some(DeclarationBody { open_brace });
        self
    }

    /// Constructors, primary first when the host orders them so.
    pub fn constructors(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.kind == MemberKind::Constructor)
    }

    /// The `overload`-th member named `name`, in declaration order.
    pub fn member_named(&self, name: &str, overload: usize) -> Option<&Member> {
        self.members
            .iter()
            .filter(|m| m.name == name)
            .nth(overload)
    }

    /// Walks every call made anywhere inside the declaration, in source order.
    ///
    /// Covers super-constructor calls of the supertype list followed by each
    /// member's calls.
    pub fn walk_calls<'a, F>(&'a self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Call) -> ControlFlow<()>,
    {
        for entry in &self.supertypes {
            if let Some(call) = &entry.call {
                call.walk_calls(visit)?;
            }
        }
        for member in &self.members {
            member.walk_calls(visit)?;
        }
        ControlFlow::Continue(())
    }
}

impl Annotated for Declaration {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

// ────────────────────────────────────────────
// Members and parameters
// ────────────────────────────────────────────

/// Kind of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Field or property.
    Field,
    /// Primary or secondary constructor.
    Constructor,
    /// Method or function.
    Method,
    /// `init { ... }` block.
    Initializer,
}

/// A member of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member kind.
    pub kind: MemberKind,
    /// Name ([`CONSTRUCTOR_NAME`] for constructors).
    pub name: String,
    /// Annotations in source order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Formal parameters, the synthetic continuation included.
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    /// Range of the parameter list, parentheses included.
    #[serde(default)]
    pub parameter_list: Option<Range>,
    /// Extension receiver type.
    #[serde(default)]
    pub receiver: Option<TypeRef>,
    /// Field type or method return type.
    #[serde(default)]
    pub declared_type: Option<TypeRef>,
    /// Statements of the body, or the field initializer.
    #[serde(default)]
    pub body: Option<Vec<Expr>>,
    /// Explicit `super(...)`/`this(...)` call of a secondary constructor.
    #[serde(default)]
    pub delegation: Option<Call>,
    /// Whether the last parameter is the synthetic continuation.
    #[serde(default)]
    pub synthetic_continuation: bool,
    /// Range of the whole member, annotations included.
    #[serde(default)]
    pub range: Option<Range>,
    /// Range of the member's name identifier.
    #[serde(default)]
    pub name_range: Option<Range>,
}

impl Member {
    /// Creates a member with no parameters or body.
    #[must_use]
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            annotations: Vec::new(),
            parameters: Vec::new(),
            parameter_list: None,
            receiver: None,
            declared_type: None,
            body: None,
            delegation: None,
            synthetic_continuation: false,
            range: None,
            name_range: None,
        }
    }

    /// Creates a field of the given type.
    #[must_use]
    pub fn field(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self::new(MemberKind::Field, name).with_declared_type(type_ref)
    }

    /// Creates a method.
    #[must_use]
    pub fn method(name: impl Into<String>) -> Self {
        Self::new(MemberKind::Method, name)
    }

    /// Creates a constructor.
    #[must_use]
    pub fn constructor() -> Self {
        Self::new(MemberKind::Constructor, CONSTRUCTOR_NAME)
    }

    /// Creates an `init` block.
    #[must_use]
    pub fn initializer() -> Self {
        Self::new(MemberKind::Initializer, "init")
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Adds a parameter, keeping the synthetic continuation last.
    #[must_use]
    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        if self.synthetic_continuation && !self.parameters.is_empty() {
            let last = self.parameters.len() - 1;
            self.parameters.insert(last, parameter);
        } else {
            self.parameters.push(parameter);
        }
        self
    }

    /// Sets the parameter list range.
    #[must_use]
    pub fn with_parameter_list(mut self, range: Range) -> Self {
        self.parameter_list = Some(range);
        self
    }

    /// Sets the extension receiver.
    #[must_use]
    pub fn with_receiver(mut self, receiver: TypeRef) -> Self {
        self.receiver = Some(receiver);
        self
    }

    /// Sets the field type or return type.
    #[must_use]
    pub fn with_declared_type(mut self, type_ref: TypeRef) -> Self {
        self.declared_type = Some(type_ref);
        self
    }

    /// Appends a statement to the body, creating the body if needed.
    #[must_use]
    pub fn with_statement(mut self, statement: Expr) -> Self {
        self.body.get_or_insert_with(Vec::new).push(statement);
        self
    }

    /// Sets the constructor delegation call.
    #[must_use]
    pub fn with_delegation(mut self, call: Call) -> Self {
        self.delegation = Some(call);
        self
    }

    /// Marks the member as suspending, appending the synthetic continuation parameter.
    #[must_use]
    pub fn suspending(mut self) -> Self {
        if !self.synthetic_continuation {
            self.parameters.push(Parameter::new(
                CONTINUATION_NAME,
                TypeRef::resolved(CONTINUATION_FQN),
            ));
            self.synthetic_continuation = true;
        }
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Sets the name range.
    #[must_use]
    pub fn with_name_range(mut self, range: Range) -> Self {
        self.name_range = Some(range);
        self
    }

    /// Parameters written by the user, without the synthetic continuation.
    #[must_use]
    pub fn user_parameters(&self) -> &[Parameter] {
        match self.parameters.split_last() {
            Some((_, rest)) if self.synthetic_continuation => rest,
            _ => &self.parameters,
        }
    }

    /// Walks every call made inside the member, in source order.
    ///
    /// Covers the delegation call, parameter default values and the body.
    pub fn walk_calls<'a, F>(&'a self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Call) -> ControlFlow<()>,
    {
        if let Some(call) = &self.delegation {
            call.walk_calls(visit)?;
        }
        for parameter in &self.parameters {
            if let Some(default) = &parameter.default_value {
                default.walk_calls(visit)?;
            }
        }
        for statement in self.body.iter().flatten() {
            statement.walk_calls(visit)?;
        }
        ControlFlow::Continue(())
    }
}

impl Annotated for Member {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

/// A formal parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name.
    pub name: String,
    /// Declared type; its range is the type annotation's range.
    pub type_ref: TypeRef,
    /// Annotations in source order.
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    /// Default value expression.
    #[serde(default)]
    pub default_value: Option<Expr>,
    /// Range of the whole parameter, annotations included.
    #[serde(default)]
    pub range: Option<Range>,
}

impl Parameter {
    /// Creates a parameter.
    #[must_use]
    pub fn new(name: impl Into<String>, type_ref: TypeRef) -> Self {
        Self {
            name: name.into(),
            type_ref,
            annotations: Vec::new(),
            default_value: None,
            range: None,
        }
    }

    /// Adds an annotation.
    #[must_use]
    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }

    /// Sets the default value.
    #[must_use]
    pub fn with_default(mut self, value: Expr) -> Self {
        self.default_value = Some(value);
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }
}

impl Annotated for Parameter {
    fn annotations(&self) -> &[Annotation] {
        &self.annotations
    }
}

// ────────────────────────────────────────────
// Calls and expressions
// ────────────────────────────────────────────

/// Identifies a resolved member: the `overload`-th member called `name` in `owner`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MemberRef {
    /// Qualified name of the owning declaration.
    pub owner: String,
    /// Member name.
    pub name: String,
    /// Index among same-named members of the owner.
    #[serde(default)]
    pub overload: usize,
}

impl MemberRef {
    /// References the first member called `name` in `owner`.
    #[must_use]
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
            overload: 0,
        }
    }

    /// References the first constructor of `owner`.
    #[must_use]
    pub fn constructor(owner: impl Into<String>) -> Self {
        Self::new(owner, CONSTRUCTOR_NAME)
    }

    /// Selects another overload.
    #[must_use]
    pub fn with_overload(mut self, overload: usize) -> Self {
        self.overload = overload;
        self
    }
}

/// How a call is made.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallKind {
    /// Ordinary function, method or constructor call.
    #[default]
    Regular,
    /// Call to a superclass constructor.
    SuperConstructor,
    /// `this(...)` call to a sibling constructor.
    DelegatingConstructor,
}

/// An argument of a call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    /// Argument expression.
    pub value: Expr,
    /// Index of the formal parameter of the resolved target this argument binds to.
    #[serde(default)]
    pub parameter: Option<usize>,
}

impl Argument {
    /// Creates an argument with no known parameter binding.
    #[must_use]
    pub fn new(value: Expr) -> Self {
        Self {
            value,
            parameter: None,
        }
    }

    /// Creates an argument bound to the formal parameter at `parameter`.
    #[must_use]
    pub fn bound(value: Expr, parameter: usize) -> Self {
        Self {
            value,
            parameter: Some(parameter),
        }
    }
}

/// A call expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Call {
    /// Callee name as written.
    pub name: String,
    /// Resolved target; `None` when unresolved.
    #[serde(default)]
    pub target: Option<MemberRef>,
    /// Call kind.
    #[serde(default)]
    pub kind: CallKind,
    /// Explicit receiver expression (`receiver.name(...)`).
    #[serde(default)]
    pub receiver: Option<Box<Expr>>,
    /// Static type of the receiver, explicit or implicit.
    #[serde(default)]
    pub receiver_type: Option<TypeRef>,
    /// Arguments in source order, trailing lambda included.
    #[serde(default)]
    pub arguments: Vec<Argument>,
    /// Explicit type arguments.
    #[serde(default)]
    pub type_arguments: Vec<TypeRef>,
    /// Static result type of the call.
    #[serde(default)]
    pub static_type: Option<TypeRef>,
    /// Range of the whole call.
    #[serde(default)]
    pub range: Option<Range>,
    /// Range of the callee name.
    #[serde(default)]
    pub name_range: Option<Range>,
}

impl Call {
    /// Creates an unresolved call.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            target: None,
            kind: CallKind::Regular,
            receiver: None,
            receiver_type: None,
            arguments: Vec::new(),
            type_arguments: Vec::new(),
            static_type: None,
            range: None,
            name_range: None,
        }
    }

    /// Sets the resolved target.
    #[must_use]
    pub fn with_target(mut self, target: MemberRef) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the call kind.
    #[must_use]
    pub fn with_kind(mut self, kind: CallKind) -> Self {
        self.kind = kind;
        self
    }

    /// Sets the explicit receiver, taking the receiver type from its static type.
    #[must_use]
    pub fn with_receiver(mut self, receiver: Expr) -> Self {
        if self.receiver_type.is_none() {
            self.receiver_type = receiver.static_type().cloned();
        }
        self.receiver = Some(Box::new(receiver));
        self
    }

    /// Sets the receiver type.
    #[must_use]
    pub fn with_receiver_type(mut self, type_ref: TypeRef) -> Self {
        self.receiver_type = Some(type_ref);
        self
    }

    /// Adds an argument.
    #[must_use]
    pub fn with_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(argument);
        self
    }

    /// Adds an explicit type argument.
    #[must_use]
    pub fn with_type_argument(mut self, type_ref: TypeRef) -> Self {
        self.type_arguments.push(type_ref);
        self
    }

    /// Sets the static result type.
    #[must_use]
    pub fn with_static_type(mut self, type_ref: TypeRef) -> Self {
        self.static_type = Some(type_ref);
        self
    }

    /// Sets the source range.
    #[must_use]
    pub fn with_range(mut self, range: Range) -> Self {
        self.range = Some(range);
        self
    }

    /// Sets the name range.
    #[must_use]
    pub fn with_name_range(mut self, range: Range) -> Self {
        self.name_range = Some(range);
        self
    }

    /// Returns the argument bound to the formal parameter at `parameter`.
    #[must_use]
    pub fn argument_for(&self, parameter: usize) -> Option<&Argument> {
        self.arguments
            .iter()
            .find(|a| a.parameter == Some(parameter))
    }

    /// Name range, falling back to the whole call.
    #[must_use]
    pub fn report_range(&self) -> Option<Range> {
        self.name_range.or(self.range)
    }

    /// Walks this call and every call nested in it, in source order.
    ///
    /// The receiver chain comes first, then this call, then its arguments.
    pub fn walk_calls<'a, F>(&'a self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Call) -> ControlFlow<()>,
    {
        if let Some(receiver) = &self.receiver {
            receiver.walk_calls(visit)?;
        }
        visit(self)?;
        for argument in &self.arguments {
            argument.value.walk_calls(visit)?;
        }
        ControlFlow::Continue(())
    }
}

/// A lambda literal, e.g. `{ x -> x + 1 }`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Lambda {
    /// Body statements in order.
    #[serde(default)]
    pub statements: Vec<Expr>,
    /// Function type of the lambda.
    #[serde(default)]
    pub static_type: Option<TypeRef>,
    /// Source range, braces included.
    #[serde(default)]
    pub range: Option<Range>,
}

/// A simple name reference, e.g. `value` or `preconditions`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// Name as written.
    pub name: String,
    /// Resolved member, when the name refers to one.
    #[serde(default)]
    pub target: Option<MemberRef>,
    /// Static type.
    #[serde(default)]
    pub static_type: Option<TypeRef>,
    /// Source range.
    #[serde(default)]
    pub range: Option<Range>,
}

/// An assignment `target = value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assign {
    /// Assigned location.
    pub target: Box<Expr>,
    /// Assigned value.
    pub value: Box<Expr>,
    /// Source range.
    #[serde(default)]
    pub range: Option<Range>,
}

/// A literal constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Literal {
    /// Literal text as written.
    pub text: String,
    /// Static type.
    #[serde(default)]
    pub static_type: Option<TypeRef>,
    /// Source range.
    #[serde(default)]
    pub range: Option<Range>,
}

/// Any other expression; only its children and type matter to the rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Other {
    /// Sub-expressions in source order.
    #[serde(default)]
    pub children: Vec<Expr>,
    /// Static type.
    #[serde(default)]
    pub static_type: Option<TypeRef>,
    /// Source range.
    #[serde(default)]
    pub range: Option<Range>,
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Expr {
    /// Call expression.
    Call(Call),
    /// Lambda literal.
    Lambda(Lambda),
    /// Name reference.
    Reference(Reference),
    /// Assignment.
    Assign(Assign),
    /// Literal.
    Literal(Literal),
    /// Anything else.
    Other(Other),
}

impl Expr {
    /// Creates a name reference with the given static type.
    #[must_use]
    pub fn reference(name: impl Into<String>, static_type: Option<TypeRef>) -> Self {
        Self::Reference(Reference {
            name: name.into(),
            target: None,
            static_type,
            range: None,
        })
    }

    /// Creates a lambda with the given statements.
    #[must_use]
    pub fn lambda(statements: Vec<Expr>) -> Self {
        Self::Lambda(Lambda {
            statements,
            ..Lambda::default()
        })
    }

    /// Creates a literal of the given type.
    #[must_use]
    pub fn literal(text: impl Into<String>, static_type: Option<TypeRef>) -> Self {
        Self::Literal(Literal {
            text: text.into(),
            static_type,
            range: None,
        })
    }

    /// Creates an assignment.
    #[must_use]
    pub fn assign(target: Expr, value: Expr) -> Self {
        Self::Assign(Assign {
            target: Box::new(target),
            value: Box::new(value),
            range: None,
        })
    }

    /// Static type recorded by the host, if any.
    #[must_use]
    pub fn static_type(&self) -> Option<&TypeRef> {
        match self {
            Self::Call(call) => call.static_type.as_ref(),
            Self::Lambda(lambda) => lambda.static_type.as_ref(),
            Self::Reference(reference) => reference.static_type.as_ref(),
            Self::Literal(literal) => literal.static_type.as_ref(),
            Self::Other(other) => other.static_type.as_ref(),
            Self::Assign(_) => None,
        }
    }

    /// Source range, if known.
    #[must_use]
    pub fn range(&self) -> Option<Range> {
        match self {
            Self::Call(call) => call.range,
            Self::Lambda(lambda) => lambda.range,
            Self::Reference(reference) => reference.range,
            Self::Assign(assign) => assign.range,
            Self::Literal(literal) => literal.range,
            Self::Other(other) => other.range,
        }
    }

    /// Walks this expression and all sub-expressions, in source order.
    ///
    /// Return [`ControlFlow::Break`] from `visit` to stop the walk early.
    pub fn walk<'a, F>(&'a self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Expr) -> ControlFlow<()>,
    {
        match self {
            Self::Call(call) => {
                if let Some(receiver) = &call.receiver {
                    receiver.walk(visit)?;
                }
                visit(self)?;
                for argument in &call.arguments {
                    argument.value.walk(visit)?;
                }
            }
            Self::Lambda(lambda) => {
                visit(self)?;
                for statement in &lambda.statements {
                    statement.walk(visit)?;
                }
            }
            Self::Assign(assign) => {
                visit(self)?;
                assign.target.walk(visit)?;
                assign.value.walk(visit)?;
            }
            Self::Other(other) => {
                visit(self)?;
                for child in &other.children {
                    child.walk(visit)?;
                }
            }
            Self::Reference(_) | Self::Literal(_) => visit(self)?,
        }
        ControlFlow::Continue(())
    }

    /// Walks every call nested in this expression, in source order.
    pub fn walk_calls<'a, F>(&'a self, visit: &mut F) -> ControlFlow<()>
    where
        F: FnMut(&'a Call) -> ControlFlow<()>,
    {
        self.walk(&mut |expr: &'a Expr| match expr {
            Self::Call(call) => visit(call),
            _ => ControlFlow::Continue(()),
        })
    }
}

impl From<Call> for Expr {
    fn from(call: Call) -> Self {
        Self::Call(call)
    }
}

// ────────────────────────────────────────────
// Compilation units
// ────────────────────────────────────────────

/// Declarations parsed from one source file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilationUnit {
    /// File path relative to the project root.
    pub path: PathBuf,
    /// Declarations in source order; top-level functions live in a facade.
    #[serde(default)]
    pub declarations: Vec<Declaration>,
    /// File content, when the host provides it. Synthesized code copies its indentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl CompilationUnit {
    /// Creates an empty unit.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            declarations: Vec::new(),
            source: None,
        }
    }

    /// Attaches the file content.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Adds a declaration.
    #[must_use]
    pub fn with_declaration(mut self, declaration: Declaration) -> Self {
        self.declarations.push(declaration);
        self
    }
}
