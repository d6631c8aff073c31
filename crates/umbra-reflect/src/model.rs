//! The declarative model produced by reflection hosts.
//!
//! Every value here is a read-only view borrowing from an immutable
//! [`Program`](umbra_parser::Program). Node identity is the node's span, which
//! is unique across a program because all files share one source map.

use std::fmt;
use std::path::PathBuf;

use indexmap::IndexMap;
use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{BytePos, SourceFile, Span, Spanned};

/// Identity of a syntax node: its span in the shared source map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(pub BytePos, pub BytePos);

impl From<Span> for NodeKey {
    fn from(span: Span) -> Self {
        NodeKey(span.lo, span.hi)
    }
}

impl NodeKey {
    pub fn of<T: Spanned>(node: &T) -> Self {
        node.span().into()
    }
}

/// The syntax node a declaration points at.
#[derive(Clone, Copy)]
pub enum DeclarationNode<'a> {
    /// A whole source file, standing for the module's exports object
    Module(&'a SourceFile),
    /// `var x = ...` (or a bare `var x;`)
    Var(&'a ast::VarDeclarator),
    /// `function f() {}`
    Function(&'a ast::FnDecl),
    /// A named or anonymous function expression
    FnExpr(&'a ast::FnExpr),
    /// `class C {}`
    Class(&'a ast::ClassDecl),
    /// `class {}` in expression position
    ClassExpr(&'a ast::ClassExpr),
    /// A function parameter
    Param(&'a ast::Param),
    /// An ES `import` declaration that brought a binding into scope
    Import(&'a ast::ImportDecl),
    /// An assignment such as `exports.Foo = ...`
    Assign(&'a ast::AssignExpr),
    /// Any other expression (an inline value, a namespace member, a call)
    Expr(&'a ast::Expr),
    /// A bare identifier with no declaration of its own
    Ident(&'a ast::Ident),
}

impl<'a> DeclarationNode<'a> {
    pub fn span(&self) -> Span {
        match self {
            DeclarationNode::Module(file) => file.span,
            DeclarationNode::Var(node) => node.span,
            DeclarationNode::Function(node) => node.function.span,
            DeclarationNode::FnExpr(node) => node.function.span,
            DeclarationNode::Class(node) => node.class.span,
            DeclarationNode::ClassExpr(node) => node.class.span,
            DeclarationNode::Param(node) => node.span,
            DeclarationNode::Import(node) => node.span,
            DeclarationNode::Assign(node) => node.span,
            DeclarationNode::Expr(node) => node.span(),
            DeclarationNode::Ident(node) => node.span,
        }
    }

    pub fn key(&self) -> NodeKey {
        self.span().into()
    }

    fn tag(&self) -> &'static str {
        match self {
            DeclarationNode::Module(_) => "Module",
            DeclarationNode::Var(_) => "Var",
            DeclarationNode::Function(_) => "Function",
            DeclarationNode::FnExpr(_) => "FnExpr",
            DeclarationNode::Class(_) => "Class",
            DeclarationNode::ClassExpr(_) => "ClassExpr",
            DeclarationNode::Param(_) => "Param",
            DeclarationNode::Import(_) => "Import",
            DeclarationNode::Assign(_) => "Assign",
            DeclarationNode::Expr(_) => "Expr",
            DeclarationNode::Ident(_) => "Ident",
        }
    }

    /// The name this node declares, when it declares exactly one.
    pub fn name(&self) -> Option<String> {
        match self {
            DeclarationNode::Var(node) => match &node.name {
                ast::Pat::Ident(ident) => Some(ident.id.sym.to_string()),
                _ => None,
            },
            DeclarationNode::Function(node) => Some(node.ident.sym.to_string()),
            DeclarationNode::FnExpr(node) => node.ident.as_ref().map(|i| i.sym.to_string()),
            DeclarationNode::Class(node) => Some(node.ident.sym.to_string()),
            DeclarationNode::ClassExpr(node) => node.ident.as_ref().map(|i| i.sym.to_string()),
            DeclarationNode::Param(node) => match &node.pat {
                ast::Pat::Ident(ident) => Some(ident.id.sym.to_string()),
                _ => None,
            },
            DeclarationNode::Assign(node) => crate::patterns::exports_assignment_target(node)
                .map(|name| name.to_string()),
            DeclarationNode::Ident(node) => Some(node.sym.to_string()),
            DeclarationNode::Module(_) | DeclarationNode::Import(_) | DeclarationNode::Expr(_) => {
                None
            }
        }
    }

    /// The source file, when this node stands for a whole module.
    pub fn as_module(&self) -> Option<&'a SourceFile> {
        match self {
            DeclarationNode::Module(file) => Some(file),
            _ => None,
        }
    }
}

impl PartialEq for DeclarationNode<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DeclarationNode::Module(a), DeclarationNode::Module(b)) => a.id == b.id,
            _ => self.tag() == other.tag() && self.key() == other.key(),
        }
    }
}

impl fmt::Debug for DeclarationNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeclarationNode::Module(file) => write!(f, "Module({})", file.path.display()),
            other => {
                let span = other.span();
                write!(f, "{}({}..{})", other.tag(), span.lo.0, span.hi.0)
            }
        }
    }
}

/// Compiler-emitted helpers and globals that get special treatment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownDeclaration {
    JsGlobalObject,
    TsHelperAssign,
    TsHelperSpread,
    TsHelperSpreadArray,
    TsHelperSpreadArrays,
    TsHelperRead,
}

/// One member of a downleveled enum, in textual order.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumMember<'a> {
    pub name: String,
    pub initializer: &'a ast::Expr,
}

/// Structured identity recovered for a concrete declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum SpecialIdentity<'a> {
    DownleveledEnum(Vec<EnumMember<'a>>),
}

#[derive(Debug, Clone)]
pub enum DeclarationKind<'a> {
    /// The node is the authoritative declaration
    Concrete {
        identity: Option<SpecialIdentity<'a>>,
    },
    /// The node is the export assignment itself
    Inline {
        implementation: Option<&'a ast::Expr>,
    },
    /// The declaration could not be located in the program
    Missing,
}

impl PartialEq for DeclarationKind<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                DeclarationKind::Concrete { identity: a },
                DeclarationKind::Concrete { identity: b },
            ) => a == b,
            (
                DeclarationKind::Inline { implementation: a },
                DeclarationKind::Inline { implementation: b },
            ) => a.map(NodeKey::of) == b.map(NodeKey::of),
            (DeclarationKind::Missing, DeclarationKind::Missing) => true,
            _ => false,
        }
    }
}

/// The result of resolving an identifier or expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration<'a> {
    pub kind: DeclarationKind<'a>,
    pub node: DeclarationNode<'a>,
    pub known: Option<KnownDeclaration>,
    /// The module the declaration was reached through, when resolution
    /// crossed a module boundary
    pub via_module: Option<String>,
}

impl<'a> Declaration<'a> {
    pub fn concrete(node: DeclarationNode<'a>) -> Self {
        Self {
            kind: DeclarationKind::Concrete { identity: None },
            node,
            known: None,
            via_module: None,
        }
    }

    pub fn inline(node: DeclarationNode<'a>, implementation: Option<&'a ast::Expr>) -> Self {
        Self {
            kind: DeclarationKind::Inline { implementation },
            node,
            known: None,
            via_module: None,
        }
    }

    pub fn missing(node: DeclarationNode<'a>) -> Self {
        Self {
            kind: DeclarationKind::Missing,
            node,
            known: None,
            via_module: None,
        }
    }

    pub fn with_known(mut self, known: Option<KnownDeclaration>) -> Self {
        self.known = known;
        self
    }

    pub fn with_via_module(mut self, via_module: Option<String>) -> Self {
        self.via_module = via_module;
        self
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self.kind, DeclarationKind::Concrete { .. })
    }

    pub fn identity(&self) -> Option<&SpecialIdentity<'a>> {
        match &self.kind {
            DeclarationKind::Concrete { identity } => identity.as_ref(),
            _ => None,
        }
    }

    pub fn implementation(&self) -> Option<&'a ast::Expr> {
        match &self.kind {
            DeclarationKind::Inline { implementation } => *implementation,
            _ => None,
        }
    }
}

/// Ordered name to declaration mapping of a module's exports.
///
/// Insertion order is first-discovered order; re-inserting a name replaces
/// the value in place.
pub type ExportTable<'a> = IndexMap<String, Declaration<'a>>;

/// Where a class lives in a file's shape index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ShapeRef {
    pub file: umbra_parser::FileId,
    pub index: usize,
}

/// A class recovered from emitted code.
#[derive(Debug, Clone)]
pub struct ClassSymbol<'a> {
    pub name: String,
    /// The outer binding (`var Foo = ...`, `exports.Foo = ...`, `class Foo`)
    pub declaration: DeclarationNode<'a>,
    /// The node holding the constructor logic (inner function or class)
    pub implementation: DeclarationNode<'a>,
    /// The wrapping IIFE, for downleveled classes
    pub iife: Option<&'a ast::Function>,
    pub(crate) shape: ShapeRef,
}

impl PartialEq for ClassSymbol<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape
    }
}

/// The module and exported name a binding was imported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub name: String,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Decorator<'a> {
    pub name: String,
    /// The expression naming the decorator (`Directive` or `core.Directive`)
    pub identifier: &'a ast::Expr,
    pub import: Option<Import>,
    /// The syntax the decorator was read from
    pub node: &'a ast::Expr,
    pub args: Vec<&'a ast::Expr>,
}

impl PartialEq for Decorator<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.import == other.import
            && NodeKey::of(self.node) == NodeKey::of(other.node)
            && self.args.len() == other.args.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassMemberKind {
    Constructor,
    Getter,
    Setter,
    Property,
    Method,
    Accessor,
}

/// The syntax a class member was read from.
#[derive(Debug, Clone, Copy)]
pub enum MemberNode<'a> {
    /// `Foo.prototype.x = ...` or `Foo.x = ...`
    Assign(&'a ast::AssignExpr),
    /// `Object.defineProperty(Foo.prototype, "x", {...})`
    DefineProperty(&'a ast::CallExpr),
    /// A member of a native class body
    ClassMember(&'a ast::ClassMember),
    /// An ES5 constructor function
    Constructor(&'a ast::FnDecl),
    /// A `propDecorators` entry for a property that is never assigned
    PropDecorators(&'a ast::KeyValueProp),
    /// A `__decorate(...)` call for a property that is never assigned
    DecorateCall(&'a ast::CallExpr),
}

impl MemberNode<'_> {
    pub fn span(&self) -> Span {
        match self {
            MemberNode::Assign(node) => node.span,
            MemberNode::DefineProperty(node) => node.span,
            MemberNode::ClassMember(node) => node.span(),
            MemberNode::Constructor(node) => node.function.span,
            MemberNode::PropDecorators(node) => node.span(),
            MemberNode::DecorateCall(node) => node.span,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClassMember<'a> {
    pub name: String,
    pub kind: ClassMemberKind,
    pub is_static: bool,
    pub decorators: Option<Vec<Decorator<'a>>>,
    pub node: MemberNode<'a>,
    /// The assigned value for properties
    pub value: Option<&'a ast::Expr>,
    /// The function body for methods and accessors
    pub implementation: Option<&'a ast::Function>,
}

/// Why a parameter's type cannot be referenced as a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueUnavailable {
    /// No type was recorded for the parameter
    MissingType,
    /// The recorded type is not an identifier or a member chain of identifiers
    Unsupported,
}

#[derive(Debug, Clone)]
pub enum TypeValueReference<'a> {
    /// A value declared in the same module
    Local(&'a ast::Expr),
    /// A value imported from another module
    Imported {
        imported_name: String,
        module_name: String,
        value_declaration: Option<DeclarationNode<'a>>,
    },
    Unavailable(ValueUnavailable),
}

impl PartialEq for TypeValueReference<'_> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (TypeValueReference::Local(a), TypeValueReference::Local(b)) => {
                NodeKey::of(*a) == NodeKey::of(*b)
            }
            (
                TypeValueReference::Imported {
                    imported_name: a_name,
                    module_name: a_module,
                    ..
                },
                TypeValueReference::Imported {
                    imported_name: b_name,
                    module_name: b_module,
                    ..
                },
            ) => a_name == b_name && a_module == b_module,
            (TypeValueReference::Unavailable(a), TypeValueReference::Unavailable(b)) => a == b,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CtorParameter<'a> {
    /// `None` for destructured parameters
    pub name: Option<String>,
    pub node: &'a ast::Pat,
    pub decorators: Option<Vec<Decorator<'a>>>,
    pub type_value_reference: TypeValueReference<'a>,
    /// The expression recorded as the parameter's type, if any
    pub type_expression: Option<&'a ast::Expr>,
}

/// A function parameter with its (possibly downleveled) default value.
#[derive(Debug, Clone)]
pub struct Parameter<'a> {
    pub name: Option<String>,
    pub node: &'a ast::Pat,
    pub initializer: Option<&'a ast::Expr>,
}

#[derive(Debug, Clone)]
pub struct FunctionDefinition<'a> {
    pub node: DeclarationNode<'a>,
    /// Body statements without the downleveled default-parameter checks;
    /// `None` when the function has no body available
    pub body: Option<Vec<&'a ast::Stmt>>,
    pub parameters: Vec<Parameter<'a>>,
    pub known: Option<KnownDeclaration>,
}

/// What kind of declaration a typings file exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DtsKind {
    Class,
    Function,
    Variable,
    Interface,
    TypeAlias,
    Enum,
    Namespace,
}

/// A declaration exported by a `.d.ts` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DtsDeclaration {
    pub path: PathBuf,
    pub name: String,
    pub kind: DtsKind,
    pub span: Span,
}
