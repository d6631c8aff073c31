//! Reflection over plain ES modules and scripts.
//!
//! This host answers from lexical bindings and `import`/`export`
//! declarations only. The UMD host builds on it and consults it whenever its
//! own rules have nothing to say.

use std::rc::Rc;

use once_cell::unsync::OnceCell;
use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{Program, SourceFile};

use crate::dts::DtsIndex;
use crate::error::ReflectionError;
use crate::host::{ExportCache, FileIndexes, ReflectionHost};
use crate::index::{Binding, ClassOuter, ClassShape, FileIndex};
use crate::model::{
    Declaration, DeclarationKind, DeclarationNode, DtsDeclaration, EnumMember, ExportTable, Import,
    KnownDeclaration, NodeKey, SpecialIdentity,
};
use crate::patterns::{
    as_ident, as_member, ident_name, known_helper, member_name, require_call, strip_parens,
};

/// How many `var X; X = Y;` hops are followed before giving up.
const MAX_ALIAS_DEPTH: usize = 16;

pub struct EsmReflectionHost<'a> {
    program: &'a Program,
    indexes: FileIndexes<'a>,
    exports: ExportCache<'a>,
    dts: OnceCell<DtsIndex>,
}

impl<'a> EsmReflectionHost<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            indexes: FileIndexes::new(program),
            exports: ExportCache::new(),
            dts: OnceCell::new(),
        }
    }

    pub(crate) fn index_of(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>> {
        self.indexes.get(file)
    }

    pub(crate) fn resolve_identifier<H>(&self, host: &H, ident: &'a ast::Ident) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let file = self.program.file_at(ident.span.lo)?;
        let index = self.indexes.get(file);
        let Some(bindings) = index.resolve(ident) else {
            return free_identifier(ident);
        };
        let binding = primary_binding(bindings)?;
        self.declaration_of_binding(host, &index, binding, 0)
    }

    fn declaration_of_binding<H>(
        &self,
        host: &H,
        index: &FileIndex<'a>,
        binding: Binding<'a>,
        depth: usize,
    ) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let name = ident_name(binding.ident());
        let declaration = match binding {
            Binding::Import { decl, specifier } => {
                return self.declaration_of_import(host, index.file, decl, specifier)
            }
            Binding::Var { declarator, .. } => {
                if let Some(class) = index.aliased_class(declarator) {
                    return Some(class_declaration(index.class(class)));
                }
                if let Some(shape) = index.enum_at(NodeKey::from(declarator.span)) {
                    return Some(enum_declaration(
                        DeclarationNode::Var(declarator),
                        &shape.iife.members,
                    ));
                }
                if declarator.init.is_none() && depth < MAX_ALIAS_DEPTH {
                    // `var X; X = Y;` stands for `Y`
                    let aliased = index
                        .assignments_to(declarator)
                        .into_iter()
                        .filter_map(|assign| as_ident(&assign.right))
                        .find_map(|target| primary_binding(index.resolve(target)?));
                    if let Some(target) = aliased {
                        if NodeKey::of(target.ident()) != NodeKey::of(binding.ident()) {
                            return self.declaration_of_binding(host, index, target, depth + 1);
                        }
                    }
                }
                Declaration::concrete(DeclarationNode::Var(declarator))
            }
            Binding::Function(decl) => {
                if let Some(class) = index.class_at(NodeKey::from(decl.function.span)) {
                    return Some(class_declaration(index.class(class)));
                }
                Declaration::concrete(DeclarationNode::Function(decl))
            }
            Binding::Class(decl) => Declaration::concrete(DeclarationNode::Class(decl)),
            Binding::Param { param, ident, .. } => {
                if let Some(shape) = index.enum_at(NodeKey::from(ident.span)) {
                    return Some(enum_declaration(
                        DeclarationNode::Param(param),
                        &shape.iife.members,
                    ));
                }
                Declaration::concrete(DeclarationNode::Param(param))
            }
            Binding::FnExprName(expr, _) => Declaration::concrete(DeclarationNode::FnExpr(expr)),
            Binding::ClassExprName(expr, _) => {
                if let Some(class) = index.class_at(NodeKey::from(expr.class.span)) {
                    return Some(class_declaration(index.class(class)));
                }
                Declaration::concrete(DeclarationNode::ClassExpr(expr))
            }
            Binding::Destructured { ident, .. } | Binding::Pattern(ident) => {
                Declaration::concrete(DeclarationNode::Ident(ident))
            }
        };
        Some(declaration.with_known(known_helper(name)))
    }

    fn declaration_of_import<H>(
        &self,
        host: &H,
        file: &'a SourceFile,
        decl: &'a ast::ImportDecl,
        specifier: &'a ast::ImportSpecifier,
    ) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let source = decl.src.value.as_str()?;
        let Some(target) = self.program.resolve_module(source, file) else {
            log::debug!("unresolved import '{}' in {}", source, file.path.display());
            return Some(Declaration::missing(DeclarationNode::Import(decl)));
        };
        let via = is_bare(source).then(|| source.to_string());

        let imported = match specifier {
            ast::ImportSpecifier::Namespace(_) => {
                return Some(
                    Declaration::concrete(DeclarationNode::Module(target)).with_via_module(via),
                )
            }
            ast::ImportSpecifier::Default(_) => "default",
            ast::ImportSpecifier::Named(named) => match &named.imported {
                Some(name) => export_name(name)?,
                None => ident_name(&named.local),
            },
        };
        let found = host
            .get_exports_of_module(target)
            .and_then(|table| table.get(imported).cloned());
        Some(match found {
            Some(declaration) => inherit_via(declaration, via),
            None => Declaration::missing(DeclarationNode::Import(decl)),
        })
    }

    pub(crate) fn resolve_expression<H>(&self, host: &H, expr: &'a ast::Expr) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        match strip_parens(expr) {
            ast::Expr::Ident(ident) => host.get_declaration_of_identifier(ident),
            ast::Expr::Member(member) => self.resolve_member(host, member, expr),
            ast::Expr::Call(_) => {
                let specifier = require_call(expr)?;
                let file = self.program.file_at(expr_span(expr).lo)?;
                Some(match self.program.resolve_module(specifier, file) {
                    Some(target) => Declaration::concrete(DeclarationNode::Module(target))
                        .with_via_module(is_bare(specifier).then(|| specifier.to_string())),
                    None => Declaration::missing(DeclarationNode::Expr(strip_parens(expr))),
                })
            }
            _ => None,
        }
    }

    /// `namespace.NAME`, looked up in the namespace module's export table.
    fn resolve_member<H>(
        &self,
        host: &H,
        member: &'a ast::MemberExpr,
        expr: &'a ast::Expr,
    ) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let name = member_name(member)?;
        let namespace = host.get_declaration_of_expression(&member.obj)?;
        let expr = strip_parens(expr);
        let helper = || {
            known_helper(name)
                .map(|known| Declaration::inline(DeclarationNode::Expr(expr), None).with_known(Some(known)))
        };

        if namespace.kind == DeclarationKind::Missing {
            return Some(helper().unwrap_or_else(|| Declaration::missing(DeclarationNode::Expr(expr))));
        }
        let module = namespace.node.as_module()?;
        match host
            .get_exports_of_module(module)
            .and_then(|table| table.get(name).cloned())
        {
            Some(declaration) => Some(inherit_via(declaration, namespace.via_module)),
            None => helper(),
        }
    }

    pub(crate) fn import_of_identifier(&self, ident: &'a ast::Ident) -> Option<Import> {
        let file = self.program.file_at(ident.span.lo)?;
        let index = self.indexes.get(file);
        let binding = primary_binding(index.resolve(ident)?)?;
        let Binding::Import { decl, specifier } = binding else {
            return None;
        };
        let name = match specifier {
            ast::ImportSpecifier::Named(named) => match &named.imported {
                Some(name) => export_name(name)?,
                None => ident_name(&named.local),
            },
            ast::ImportSpecifier::Default(_) => "default",
            ast::ImportSpecifier::Namespace(_) => return None,
        };
        Some(Import {
            name: name.to_string(),
            from: decl.src.value.as_str()?.to_string(),
        })
    }

    pub(crate) fn import_of_expression<H>(&self, host: &H, expr: &'a ast::Expr) -> Option<Import>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        if let Some(ident) = as_ident(expr) {
            return host.get_import_of_identifier(ident);
        }
        let member = as_member(expr)?;
        let namespace = as_ident(&member.obj)?;
        let file = self.program.file_at(namespace.span.lo)?;
        let index = self.indexes.get(file);
        match primary_binding(index.resolve(namespace)?)? {
            Binding::Import {
                decl,
                specifier: ast::ImportSpecifier::Namespace(_),
            } => Some(Import {
                name: member_name(member)?.to_string(),
                from: decl.src.value.as_str()?.to_string(),
            }),
            _ => None,
        }
    }

    pub(crate) fn exports_of_module<H>(&self, host: &H, file: &'a SourceFile) -> Option<ExportTable<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let items = file.module_items()?;
        self.exports
            .get_or_build(file, || Some(self.build_exports(host, file, items)))
    }

    fn build_exports<H>(&self, host: &H, file: &'a SourceFile, items: &'a [ast::ModuleItem]) -> ExportTable<'a>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let mut table = ExportTable::new();
        for item in items {
            let ast::ModuleItem::ModuleDecl(decl) = item else {
                continue;
            };
            match decl {
                ast::ModuleDecl::ExportDecl(export) => match &export.decl {
                    ast::Decl::Class(class) => {
                        table.insert(
                            class.ident.sym.to_string(),
                            Declaration::concrete(DeclarationNode::Class(class)),
                        );
                    }
                    ast::Decl::Fn(function) => {
                        table.insert(
                            function.ident.sym.to_string(),
                            Declaration::concrete(DeclarationNode::Function(function))
                                .with_known(known_helper(ident_name(&function.ident))),
                        );
                    }
                    ast::Decl::Var(var) => {
                        for declarator in &var.decls {
                            let ast::Pat::Ident(binding) = &declarator.name else {
                                continue;
                            };
                            if let Some(declaration) = host.get_declaration_of_identifier(&binding.id) {
                                table.insert(binding.id.sym.to_string(), declaration);
                            }
                        }
                    }
                    _ => {}
                },
                ast::ModuleDecl::ExportNamed(named) => match &named.src {
                    None => {
                        for specifier in &named.specifiers {
                            let ast::ExportSpecifier::Named(specifier) = specifier else {
                                continue;
                            };
                            let ast::ModuleExportName::Ident(orig) = &specifier.orig else {
                                continue;
                            };
                            let exported = match &specifier.exported {
                                Some(name) => export_name(name),
                                None => Some(ident_name(orig)),
                            };
                            if let (Some(exported), Some(declaration)) =
                                (exported, host.get_declaration_of_identifier(orig))
                            {
                                table.insert(exported.to_string(), declaration);
                            }
                        }
                    }
                    Some(src) => {
                        let Some(source) = src.value.as_str() else {
                            continue;
                        };
                        let Some(target) = self.program.resolve_module(source, file) else {
                            log::debug!("unresolved re-export '{}' in {}", source, file.path.display());
                            continue;
                        };
                        let via = is_bare(source).then(|| source.to_string());
                        let target_table = host.get_exports_of_module(target);
                        for specifier in &named.specifiers {
                            match specifier {
                                ast::ExportSpecifier::Named(specifier) => {
                                    let Some(orig) = export_name(&specifier.orig) else {
                                        continue;
                                    };
                                    let exported = match &specifier.exported {
                                        Some(name) => export_name(name),
                                        None => Some(orig),
                                    };
                                    let found = target_table.as_ref().and_then(|t| t.get(orig));
                                    if let (Some(exported), Some(declaration)) = (exported, found) {
                                        table.insert(
                                            exported.to_string(),
                                            inherit_via(declaration.clone(), via.clone()),
                                        );
                                    }
                                }
                                ast::ExportSpecifier::Namespace(namespace) => {
                                    if let Some(exported) = export_name(&namespace.name) {
                                        table.insert(
                                            exported.to_string(),
                                            Declaration::concrete(DeclarationNode::Module(target))
                                                .with_via_module(via.clone()),
                                        );
                                    }
                                }
                                ast::ExportSpecifier::Default(_) => {}
                            }
                        }
                    }
                },
                ast::ModuleDecl::ExportAll(all) => {
                    let Some(source) = all.src.value.as_str() else {
                        continue;
                    };
                    let Some(target) = self.program.resolve_module(source, file) else {
                        log::debug!("unresolved re-export '{}' in {}", source, file.path.display());
                        continue;
                    };
                    let via = is_bare(source).then(|| source.to_string());
                    for (name, declaration) in host.get_exports_of_module(target).into_iter().flatten() {
                        if name != "default" {
                            table.insert(name, inherit_via(declaration, via.clone()));
                        }
                    }
                }
                ast::ModuleDecl::ExportDefaultDecl(default) => match &default.decl {
                    ast::DefaultDecl::Class(class) => {
                        table.insert(
                            "default".to_string(),
                            Declaration::concrete(DeclarationNode::ClassExpr(class)),
                        );
                    }
                    ast::DefaultDecl::Fn(function) => {
                        table.insert(
                            "default".to_string(),
                            Declaration::concrete(DeclarationNode::FnExpr(function)),
                        );
                    }
                    ast::DefaultDecl::TsInterfaceDecl(_) => {}
                },
                ast::ModuleDecl::ExportDefaultExpr(default) => {
                    let expr = strip_parens(&default.expr);
                    let declaration = match expr {
                        ast::Expr::Ident(ident) => host.get_declaration_of_identifier(ident),
                        _ => None,
                    };
                    table.insert(
                        "default".to_string(),
                        declaration.unwrap_or_else(|| {
                            Declaration::inline(DeclarationNode::Expr(expr), Some(expr))
                        }),
                    );
                }
                _ => {}
            }
        }
        table
    }

    pub(crate) fn dts_declaration(
        &self,
        declaration: &Declaration<'a>,
    ) -> Result<Option<DtsDeclaration>, ReflectionError> {
        if self.program.typings_root().is_none() {
            return Ok(None);
        }
        let text = || {
            self.program
                .source_text(declaration.node.span())
                .unwrap_or_default()
        };
        if declaration.kind == DeclarationKind::Missing {
            return Err(ReflectionError::UnresolvedDeclaration { text: text() });
        }
        let Some(name) = declaration.node.name() else {
            return Err(ReflectionError::UnnamedDeclaration { text: text() });
        };

        let dts = self.dts.get_or_init(|| DtsIndex::build(self.program));
        let source = self.program.file_at(declaration.node.span().lo);
        Ok(dts.lookup(self.program, source, &name).cloned())
    }
}

impl<'a> ReflectionHost<'a> for EsmReflectionHost<'a> {
    fn program(&self) -> &'a Program {
        self.program
    }

    fn file_index(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>> {
        self.indexes.get(file)
    }

    fn get_declaration_of_identifier(&self, ident: &'a ast::Ident) -> Option<Declaration<'a>> {
        self.resolve_identifier(self, ident)
    }

    fn get_declaration_of_expression(&self, expr: &'a ast::Expr) -> Option<Declaration<'a>> {
        self.resolve_expression(self, expr)
    }

    fn get_import_of_identifier(&self, ident: &'a ast::Ident) -> Option<Import> {
        self.import_of_identifier(ident)
    }

    fn get_import_of_expression(&self, expr: &'a ast::Expr) -> Option<Import> {
        self.import_of_expression(self, expr)
    }

    fn get_exports_of_module(&self, file: &'a SourceFile) -> Option<ExportTable<'a>> {
        self.exports_of_module(self, file)
    }

    fn get_dts_declaration(
        &self,
        declaration: &Declaration<'a>,
    ) -> Result<Option<DtsDeclaration>, ReflectionError> {
        self.dts_declaration(declaration)
    }
}

/// Free identifiers that still mean something: compiler helpers left
/// undeclared and the global `Object`.
fn free_identifier(ident: &ast::Ident) -> Option<Declaration<'_>> {
    let name = ident_name(ident);
    let known = match known_helper(name) {
        Some(known) => known,
        None if name == "Object" => KnownDeclaration::JsGlobalObject,
        None => return None,
    };
    Some(Declaration::inline(DeclarationNode::Ident(ident), None).with_known(Some(known)))
}

/// With several declaration sites (`var X; ... var X = 1;`) prefer one that
/// carries a value.
pub(crate) fn primary_binding<'a>(bindings: &[Binding<'a>]) -> Option<Binding<'a>> {
    bindings
        .iter()
        .find(|binding| !binding.is_bare_var())
        .or_else(|| bindings.first())
        .copied()
}

/// The declaration standing for a class: an `exports.X = ...` class is
/// inline, anything else is its outer binding.
pub(crate) fn class_declaration<'a>(shape: &ClassShape<'a>) -> Declaration<'a> {
    match shape.outer {
        ClassOuter::Exports(assign, _) => {
            Declaration::inline(DeclarationNode::Assign(assign), Some(&*assign.right))
        }
        _ => Declaration::concrete(shape.declaration()),
    }
}

fn enum_declaration<'a>(node: DeclarationNode<'a>, members: &[EnumMember<'a>]) -> Declaration<'a> {
    Declaration {
        kind: DeclarationKind::Concrete {
            identity: Some(SpecialIdentity::DownleveledEnum(members.to_vec())),
        },
        node,
        known: None,
        via_module: None,
    }
}

/// Keep the innermost module a declaration was re-exported through.
pub(crate) fn inherit_via<'a>(declaration: Declaration<'a>, via: Option<String>) -> Declaration<'a> {
    match declaration.via_module {
        Some(_) => declaration,
        None => declaration.with_via_module(via),
    }
}

pub(crate) fn is_bare(specifier: &str) -> bool {
    !specifier.starts_with('.') && !specifier.starts_with('/')
}

fn export_name(name: &ast::ModuleExportName) -> Option<&str> {
    match name {
        ast::ModuleExportName::Ident(ident) => Some(ident_name(ident)),
        ast::ModuleExportName::Str(s) => s.value.as_str(),
    }
}

fn expr_span(expr: &ast::Expr) -> umbra_parser::Span {
    umbra_parser::Spanned::span(expr)
}
