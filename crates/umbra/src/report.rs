//! Serializable views of the reflected model, printed as text or JSON.

use std::fmt::Write as _;

use serde::Serialize;
use umbra_parser::{Program, Span};
use umbra_reflect::{
    ClassMember, ClassMemberKind, CtorParameter, Declaration, DeclarationKind, DeclarationNode, Decorator,
    DtsDeclaration, SpecialIdentity, TypeValueReference, UmdModule,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Location {
    pub path: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn of(program: &Program, span: Span) -> Option<Self> {
        let file = program.file_at(span.lo)?;
        let position = program.line_column(span.lo);
        Some(Self {
            path: file.path.display().to_string(),
            line: position.line,
            column: position.column,
        })
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.path, self.line, self.column)
    }
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ExportEntry {
    pub name: String,
    /// `concrete`, `inline` or `missing`
    pub kind: &'static str,
    pub node: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub via_module: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub known: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enum_members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typings: Option<Location>,
}

impl ExportEntry {
    pub fn new(program: &Program, name: &str, declaration: &Declaration<'_>) -> Self {
        let location = match declaration.node {
            DeclarationNode::Module(_) => None,
            node => Location::of(program, node.span()),
        };
        Self {
            name: name.to_string(),
            kind: declaration_kind(&declaration.kind),
            node: node_kind(&declaration.node),
            location,
            via_module: declaration.via_module.clone(),
            known: declaration.known.map(|known| format!("{:?}", known)),
            enum_members: declaration.identity().map(|identity| match identity {
                SpecialIdentity::DownleveledEnum(members) => {
                    members.iter().map(|member| member.name.clone()).collect()
                }
            }),
            typings: None,
        }
    }

    pub fn with_typings(mut self, program: &Program, dts: Option<&DtsDeclaration>) -> Self {
        self.typings = dts.and_then(|dts| Location::of(program, dts.span));
        self
    }
}

fn declaration_kind(kind: &DeclarationKind<'_>) -> &'static str {
    match kind {
        DeclarationKind::Concrete { .. } => "concrete",
        DeclarationKind::Inline { .. } => "inline",
        DeclarationKind::Missing => "missing",
    }
}

pub fn node_kind(node: &DeclarationNode<'_>) -> &'static str {
    match node {
        DeclarationNode::Module(_) => "module",
        DeclarationNode::Var(_) => "variable",
        DeclarationNode::Function(_) | DeclarationNode::FnExpr(_) => "function",
        DeclarationNode::Class(_) | DeclarationNode::ClassExpr(_) => "class",
        DeclarationNode::Param(_) => "parameter",
        DeclarationNode::Import(_) => "import",
        DeclarationNode::Assign(_) => "assignment",
        DeclarationNode::Expr(_) => "expression",
        DeclarationNode::Ident(_) => "identifier",
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportsReport {
    pub path: String,
    pub format: &'static str,
    pub exports: Vec<ExportEntry>,
}

impl ExportsReport {
    pub fn to_text(&self) -> String {
        let mut out = format!("{} ({})\n", self.path, self.format);
        if self.exports.is_empty() {
            out.push_str("  no exports\n");
        }
        for entry in &self.exports {
            let _ = write!(out, "  {} [{} {}]", entry.name, entry.kind, entry.node);
            if let Some(via) = &entry.via_module {
                let _ = write!(out, " via '{}'", via);
            }
            if let Some(known) = &entry.known {
                let _ = write!(out, " known {}", known);
            }
            if let Some(members) = &entry.enum_members {
                let _ = write!(out, " enum {{ {} }}", members.join(", "));
            }
            if let Some(location) = &entry.location {
                let _ = write!(out, " at {}", location);
            }
            if let Some(typings) = &entry.typings {
                let _ = write!(out, " typed at {}", typings);
            }
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DecoratorReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<String>,
    pub args: usize,
}

impl DecoratorReport {
    pub fn new(decorator: &Decorator<'_>) -> Self {
        Self {
            name: decorator.name.clone(),
            import: decorator
                .import
                .as_ref()
                .map(|import| format!("{} from '{}'", import.name, import.from)),
            args: decorator.args.len(),
        }
    }

    fn all(decorators: Option<&Vec<Decorator<'_>>>) -> Vec<Self> {
        decorators
            .map(|decorators| decorators.iter().map(Self::new).collect())
            .unwrap_or_default()
    }
}

impl std::fmt::Display for DecoratorReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "@{}", self.name)?;
        if self.args > 0 {
            write!(f, "({} args)", self.args)?;
        }
        if let Some(import) = &self.import {
            write!(f, " <{}>", import)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberReport {
    pub name: String,
    pub kind: &'static str,
    pub is_static: bool,
    pub decorators: Vec<DecoratorReport>,
}

impl MemberReport {
    pub fn new(member: &ClassMember<'_>) -> Self {
        Self {
            name: member.name.clone(),
            kind: match member.kind {
                ClassMemberKind::Constructor => "constructor",
                ClassMemberKind::Getter => "getter",
                ClassMemberKind::Setter => "setter",
                ClassMemberKind::Property => "property",
                ClassMemberKind::Method => "method",
                ClassMemberKind::Accessor => "accessor",
            },
            is_static: member.is_static,
            decorators: DecoratorReport::all(member.decorators.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParameterReport {
    pub name: Option<String>,
    /// The parameter's type as a value reference, when there is one
    #[serde(rename = "type")]
    pub type_reference: String,
    pub decorators: Vec<DecoratorReport>,
}

impl ParameterReport {
    pub fn new(program: &Program, parameter: &CtorParameter<'_>) -> Self {
        let type_reference = match &parameter.type_value_reference {
            TypeValueReference::Local(expr) => {
                let span = umbra_parser::Spanned::span(*expr);
                program.source_text(span).unwrap_or_default()
            }
            TypeValueReference::Imported {
                imported_name,
                module_name,
                ..
            } => format!("{} from '{}'", imported_name, module_name),
            TypeValueReference::Unavailable(reason) => format!("unavailable ({:?})", reason),
        };
        Self {
            name: parameter.name.clone(),
            type_reference,
            decorators: DecoratorReport::all(parameter.decorators.as_ref()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    pub internal_name: String,
    pub adjacent_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_class: Option<String>,
    /// `None` when the class carries no decorator metadata at all
    pub decorators: Option<Vec<DecoratorReport>>,
    pub members: Vec<MemberReport>,
    /// `None` for a synthesized constructor
    pub constructor: Option<Vec<ParameterReport>>,
}

impl ClassReport {
    pub fn to_text(&self) -> String {
        let mut out = format!("class {}", self.name);
        if let Some(base) = &self.base_class {
            let _ = write!(out, " extends {}", base);
        }
        if let Some(location) = &self.location {
            let _ = write!(out, " at {}", location);
        }
        out.push('\n');
        if self.internal_name != self.name {
            let _ = writeln!(out, "  internal name: {}", self.internal_name);
        }
        if let Some(decorators) = &self.decorators {
            for decorator in decorators {
                let _ = writeln!(out, "  {}", decorator);
            }
        }
        match &self.constructor {
            None => out.push_str("  constructor: synthesized\n"),
            Some(parameters) => {
                let _ = writeln!(out, "  constructor({} params)", parameters.len());
                for parameter in parameters {
                    let name = parameter.name.as_deref().unwrap_or("<pattern>");
                    let _ = write!(out, "    {}: {}", name, parameter.type_reference);
                    for decorator in &parameter.decorators {
                        let _ = write!(out, " {}", decorator);
                    }
                    out.push('\n');
                }
            }
        }
        for member in &self.members {
            let prefix = if member.is_static { "static " } else { "" };
            let _ = write!(out, "  {}{} {}", prefix, member.kind, member.name);
            for decorator in &member.decorators {
                let _ = write!(out, " {}", decorator);
            }
            out.push('\n');
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Wrapper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct DependencyReport {
    pub parameter: String,
    pub index: usize,
    pub specifier: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct WrapperReport {
    pub path: String,
    pub branches: Vec<String>,
    pub amd_dependencies: Vec<String>,
    pub dependencies: Vec<DependencyReport>,
    pub statements: usize,
}

impl WrapperReport {
    pub fn new(path: String, module: &UmdModule<'_>) -> Self {
        Self {
            path,
            branches: module
                .factory_calls
                .iter()
                .map(|call| format!("{:?}", call.branch))
                .collect(),
            amd_dependencies: module.amd_dependencies.iter().map(|dep| dep.to_string()).collect(),
            dependencies: module
                .imports
                .iter()
                .map(|import| DependencyReport {
                    parameter: import.parameter.sym.to_string(),
                    index: import.index,
                    specifier: import.specifier.to_string(),
                })
                .collect(),
            statements: module.statements().len(),
        }
    }

    pub fn to_text(&self) -> String {
        let mut out = format!("{}\n", self.path);
        let _ = writeln!(out, "  branches: {}", self.branches.join(", "));
        if !self.amd_dependencies.is_empty() {
            let _ = writeln!(out, "  define: [{}]", self.amd_dependencies.join(", "));
        }
        for dependency in &self.dependencies {
            let _ = writeln!(
                out,
                "  #{} {} = require('{}')",
                dependency.index, dependency.parameter, dependency.specifier
            );
        }
        let _ = writeln!(out, "  {} factory statements", self.statements);
        out
    }
}
