//! Per-file binder and shape index.
//!
//! One walk over a file builds:
//! - lexical scopes with the bindings declared in each,
//! - the scope every identifier reference sits in,
//! - the class and enum shapes found in statement lists,
//! - the alias links (`Foo_1`, `var X; X = ...`) between them.
//!
//! Reflection hosts answer every "what does this refer to" question from
//! this index instead of re-walking the tree.

use std::collections::HashMap;

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{SourceFile, Spanned};

use crate::model::{DeclarationNode, NodeKey};
use crate::patterns::{
    alias_chain, as_assignment, assign_target_ident, class_iife, enum_iife, exports_assignment_target,
    ident_name, strip_parens, ClassIife, EnumIife, Iife,
};

pub type ScopeId = usize;

/// A name introduced into a scope.
#[derive(Debug, Clone, Copy)]
pub enum Binding<'a> {
    Var {
        declarator: &'a ast::VarDeclarator,
        ident: &'a ast::Ident,
    },
    Function(&'a ast::FnDecl),
    Class(&'a ast::ClassDecl),
    Param {
        function: &'a ast::Function,
        index: usize,
        param: &'a ast::Param,
        ident: &'a ast::Ident,
        /// The function is a function expression
        expression: bool,
    },
    FnExprName(&'a ast::FnExpr, &'a ast::Ident),
    ClassExprName(&'a ast::ClassExpr, &'a ast::Ident),
    Import {
        decl: &'a ast::ImportDecl,
        specifier: &'a ast::ImportSpecifier,
    },
    /// A name bound by destructuring a variable initializer
    Destructured {
        declarator: &'a ast::VarDeclarator,
        ident: &'a ast::Ident,
    },
    /// Catch clause, arrow and destructured parameters
    Pattern(&'a ast::Ident),
}

impl<'a> Binding<'a> {
    pub fn ident(&self) -> &'a ast::Ident {
        match *self {
            Binding::Var { ident, .. } => ident,
            Binding::Function(decl) => &decl.ident,
            Binding::Class(decl) => &decl.ident,
            Binding::Param { ident, .. } => ident,
            Binding::FnExprName(_, ident) => ident,
            Binding::ClassExprName(_, ident) => ident,
            Binding::Import { specifier, .. } => match specifier {
                ast::ImportSpecifier::Named(named) => &named.local,
                ast::ImportSpecifier::Default(default) => &default.local,
                ast::ImportSpecifier::Namespace(namespace) => &namespace.local,
            },
            Binding::Destructured { ident, .. } | Binding::Pattern(ident) => ident,
        }
    }

    /// The node reported as this binding's declaration.
    pub fn node(&self) -> DeclarationNode<'a> {
        match *self {
            Binding::Var { declarator, .. } => DeclarationNode::Var(declarator),
            Binding::Function(decl) => DeclarationNode::Function(decl),
            Binding::Class(decl) => DeclarationNode::Class(decl),
            Binding::Param { param, .. } => DeclarationNode::Param(param),
            Binding::FnExprName(expr, _) => DeclarationNode::FnExpr(expr),
            Binding::ClassExprName(expr, _) => DeclarationNode::ClassExpr(expr),
            Binding::Import { decl, .. } => DeclarationNode::Import(decl),
            Binding::Destructured { ident, .. } | Binding::Pattern(ident) => DeclarationNode::Ident(ident),
        }
    }

    /// `var x;` with no initializer.
    pub fn is_bare_var(&self) -> bool {
        matches!(self, Binding::Var { declarator, .. } if declarator.init.is_none())
    }

    pub fn declarator(&self) -> Option<&'a ast::VarDeclarator> {
        match *self {
            Binding::Var { declarator, .. } => Some(declarator),
            _ => None,
        }
    }
}

#[derive(Debug)]
struct Scope<'a> {
    parent: Option<ScopeId>,
    /// The function owning this scope, for function scopes
    function: Option<&'a ast::Function>,
    bindings: HashMap<&'a str, Vec<Binding<'a>>>,
}

/// The outer binding of a class.
#[derive(Debug, Clone, Copy)]
pub enum ClassOuter<'a> {
    /// `var Foo = ...`
    Var(&'a ast::VarDeclarator, &'a ast::Ident),
    /// `exports.Foo = ...`
    Exports(&'a ast::AssignExpr, &'a str),
    /// `Foo = ...` for a previously declared `var Foo;`
    Assign(&'a ast::AssignExpr, &'a ast::Ident),
    /// `class Foo {}`
    Class(&'a ast::ClassDecl),
}

#[derive(Debug, Clone, Copy)]
pub enum ClassBody<'a> {
    /// A constructor function wrapped in an IIFE
    Es5 {
        inner: &'a ast::FnDecl,
        iife: Iife<'a>,
    },
    /// Native `class` syntax
    Native {
        class: &'a ast::Class,
        expr: Option<&'a ast::ClassExpr>,
    },
}

/// A class found in a statement list.
#[derive(Debug, Clone)]
pub struct ClassShape<'a> {
    pub outer: ClassOuter<'a>,
    pub body: ClassBody<'a>,
    pub aliases: Vec<&'a ast::Ident>,
    /// Statements that may hold static assignments for the class: the IIFE
    /// body for downleveled classes, the following siblings otherwise
    pub statements: Vec<&'a ast::Stmt>,
    /// Every name the class goes by inside `statements`
    pub names: Vec<&'a str>,
}

impl<'a> ClassShape<'a> {
    /// The outer binding name.
    pub fn name(&self) -> &'a str {
        match self.outer {
            ClassOuter::Var(_, ident) | ClassOuter::Assign(_, ident) => ident_name(ident),
            ClassOuter::Exports(_, name) => name,
            ClassOuter::Class(decl) => ident_name(&decl.ident),
        }
    }

    /// The name of the inner function or class, if it has one.
    pub fn internal_name(&self) -> Option<&'a str> {
        match self.body {
            ClassBody::Es5 { inner, .. } => Some(ident_name(&inner.ident)),
            ClassBody::Native { expr: Some(expr), .. } => expr.ident.as_ref().map(ident_name),
            ClassBody::Native { expr: None, .. } => Some(self.name()),
        }
    }

    pub fn declaration(&self) -> DeclarationNode<'a> {
        match self.outer {
            ClassOuter::Var(declarator, _) => DeclarationNode::Var(declarator),
            ClassOuter::Exports(assign, _) | ClassOuter::Assign(assign, _) => {
                DeclarationNode::Assign(assign)
            }
            ClassOuter::Class(decl) => DeclarationNode::Class(decl),
        }
    }

    pub fn implementation(&self) -> DeclarationNode<'a> {
        match self.body {
            ClassBody::Es5 { inner, .. } => DeclarationNode::Function(inner),
            ClassBody::Native { expr: Some(expr), .. } => DeclarationNode::ClassExpr(expr),
            ClassBody::Native { expr: None, .. } => self.declaration(),
        }
    }

    pub fn iife(&self) -> Option<Iife<'a>> {
        match self.body {
            ClassBody::Es5 { iife, .. } => Some(iife),
            ClassBody::Native { .. } => None,
        }
    }
}

/// An enum IIFE statement.
#[derive(Debug, Clone)]
pub struct EnumShape<'a> {
    pub stmt: &'a ast::Stmt,
    pub iife: EnumIife<'a>,
}

/// Statements following a class declaration.
#[derive(Clone, Copy)]
enum Following<'a> {
    Stmts(&'a [ast::Stmt]),
    Items(&'a [ast::ModuleItem]),
}

impl<'a> Following<'a> {
    fn collect(self) -> Vec<&'a ast::Stmt> {
        match self {
            Following::Stmts(stmts) => stmts.iter().collect(),
            Following::Items(items) => items
                .iter()
                .filter_map(|item| match item {
                    ast::ModuleItem::Stmt(stmt) => Some(stmt),
                    ast::ModuleItem::ModuleDecl(_) => None,
                })
                .collect(),
        }
    }
}

/// Bindings, references and shapes of one file.
#[derive(Debug)]
pub struct FileIndex<'a> {
    pub file: &'a SourceFile,
    scopes: Vec<Scope<'a>>,
    ident_scopes: HashMap<NodeKey, ScopeId>,
    references: Vec<&'a ast::Ident>,
    /// Function span to the call that immediately invokes it
    iife_calls: HashMap<NodeKey, &'a ast::CallExpr>,
    /// `x = ...` assignments to plain identifiers
    assignments: Vec<(&'a ast::Ident, &'a ast::AssignExpr)>,
    classes: Vec<ClassShape<'a>>,
    class_keys: HashMap<NodeKey, usize>,
    /// `var Foo_1;` declarators aliasing a class
    class_aliases: HashMap<NodeKey, usize>,
    enums: Vec<EnumShape<'a>>,
    enum_keys: HashMap<NodeKey, usize>,
}

impl<'a> FileIndex<'a> {
    pub fn build(file: &'a SourceFile) -> Self {
        let index = FileIndex {
            file,
            scopes: vec![Scope {
                parent: None,
                function: None,
                bindings: HashMap::new(),
            }],
            ident_scopes: HashMap::new(),
            references: Vec::new(),
            iife_calls: HashMap::new(),
            assignments: Vec::new(),
            classes: Vec::new(),
            class_keys: HashMap::new(),
            class_aliases: HashMap::new(),
            enums: Vec::new(),
            enum_keys: HashMap::new(),
        };
        let mut binder = Binder {
            index,
            scope: 0,
            function_scope: 0,
        };
        match &file.syntax {
            ast::Program::Script(script) => binder.visit_stmts(&script.body),
            ast::Program::Module(module) => binder.visit_module_items(&module.body),
        }

        let mut index = binder.index;
        index.link();
        log::debug!(
            "indexed {}: {} scopes, {} references, {} classes, {} enums",
            file.path.display(),
            index.scopes.len(),
            index.references.len(),
            index.classes.len(),
            index.enums.len()
        );
        index
    }

    /// Connect shapes to the `var` declarations they assign.
    fn link(&mut self) {
        let mut class_keys = Vec::new();
        let mut class_aliases = Vec::new();
        for (i, shape) in self.classes.iter().enumerate() {
            if let ClassOuter::Assign(_, ident) = shape.outer {
                if let Some(declarator) = self.var_declarator_of(ident) {
                    class_keys.push((NodeKey::from(declarator.span), i));
                }
            }
            for alias in &shape.aliases {
                if let Some(declarator) = self.var_declarator_of(alias) {
                    class_aliases.push((NodeKey::from(declarator.span), i));
                }
            }
        }
        for (key, i) in class_keys {
            self.class_keys.entry(key).or_insert(i);
        }
        self.class_aliases.extend(class_aliases);

        let mut enum_keys = Vec::new();
        for (i, shape) in self.enums.iter().enumerate() {
            if let Some(local) = shape.iife.local {
                if let Some(declarator) = self.var_declarator_of(local) {
                    enum_keys.push((NodeKey::from(declarator.span), i));
                }
            }
        }
        self.enum_keys.extend(enum_keys);
    }

    fn var_declarator_of(&self, ident: &ast::Ident) -> Option<&'a ast::VarDeclarator> {
        self.resolve(ident)?
            .iter()
            .find_map(|binding| binding.declarator())
    }

    pub fn scope_of(&self, ident: &ast::Ident) -> ScopeId {
        self.ident_scopes
            .get(&NodeKey::from(ident.span))
            .copied()
            .unwrap_or(0)
    }

    /// Look a name up starting at `scope` and walking outwards.
    pub fn lookup(&self, mut scope: ScopeId, name: &str) -> Option<&[Binding<'a>]> {
        loop {
            let current = &self.scopes[scope];
            if let Some(bindings) = current.bindings.get(name) {
                return Some(bindings);
            }
            scope = current.parent?;
        }
    }

    /// The bindings an identifier refers to; `None` for free identifiers.
    pub fn resolve(&self, ident: &ast::Ident) -> Option<&[Binding<'a>]> {
        self.lookup(self.scope_of(ident), ident_name(ident))
    }

    /// The function owning the nearest function scope around `scope`.
    pub fn enclosing_function(&self, mut scope: ScopeId) -> Option<&'a ast::Function> {
        loop {
            let current = &self.scopes[scope];
            if let Some(function) = current.function {
                return Some(function);
            }
            scope = current.parent?;
        }
    }

    /// Identifier references in source order.
    pub fn references(&self) -> &[&'a ast::Ident] {
        &self.references
    }

    pub fn references_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'a ast::Ident> + 's {
        self.references
            .iter()
            .copied()
            .filter(move |ident| ident_name(ident) == name)
    }

    pub fn iife_call(&self, function: &ast::Function) -> Option<&'a ast::CallExpr> {
        self.iife_calls.get(&NodeKey::from(function.span)).copied()
    }

    /// Assignments `x = value` whose target resolves to `declarator`.
    pub fn assignments_to(&self, declarator: &ast::VarDeclarator) -> Vec<&'a ast::AssignExpr> {
        let key = NodeKey::from(declarator.span);
        self.assignments
            .iter()
            .filter(|(ident, _)| {
                self.var_declarator_of(ident)
                    .map_or(false, |d| NodeKey::from(d.span) == key)
            })
            .map(|(_, assign)| *assign)
            .collect()
    }

    pub fn classes(&self) -> &[ClassShape<'a>] {
        &self.classes
    }

    pub fn class(&self, index: usize) -> &ClassShape<'a> {
        &self.classes[index]
    }

    /// The class whose outer or inner node is `key`.
    pub fn class_at(&self, key: NodeKey) -> Option<usize> {
        self.class_keys.get(&key).copied()
    }

    /// The class a `var Foo_1;` alias declarator stands for.
    pub fn aliased_class(&self, declarator: &ast::VarDeclarator) -> Option<usize> {
        self.class_aliases
            .get(&NodeKey::from(declarator.span))
            .copied()
    }

    pub fn enums(&self) -> &[EnumShape<'a>] {
        &self.enums
    }

    /// The enum whose IIFE parameter or `var` declaration is `key`.
    pub fn enum_at(&self, key: NodeKey) -> Option<&EnumShape<'a>> {
        self.enum_keys.get(&key).map(|i| &self.enums[*i])
    }
}

struct Binder<'a> {
    index: FileIndex<'a>,
    scope: ScopeId,
    function_scope: ScopeId,
}

impl<'a> Binder<'a> {
    fn push_scope(&mut self, function: Option<&'a ast::Function>) -> ScopeId {
        let id = self.index.scopes.len();
        self.index.scopes.push(Scope {
            parent: Some(self.scope),
            function,
            bindings: HashMap::new(),
        });
        id
    }

    /// Run `f` inside a new scope; function scopes also receive `var`s.
    fn with_scope(&mut self, function_scope: bool, function: Option<&'a ast::Function>, f: impl FnOnce(&mut Self)) {
        let scope = self.push_scope(function);
        let saved = (self.scope, self.function_scope);
        self.scope = scope;
        if function_scope {
            self.function_scope = scope;
        }
        f(self);
        (self.scope, self.function_scope) = saved;
    }

    fn declare(&mut self, scope: ScopeId, binding: Binding<'a>) {
        let ident = binding.ident();
        self.index
            .ident_scopes
            .insert(NodeKey::from(ident.span), self.scope);
        self.index.scopes[scope]
            .bindings
            .entry(ident_name(ident))
            .or_default()
            .push(binding);
    }

    fn reference(&mut self, ident: &'a ast::Ident) {
        self.index
            .ident_scopes
            .insert(NodeKey::from(ident.span), self.scope);
        self.index.references.push(ident);
    }

    fn visit_module_items(&mut self, items: &'a [ast::ModuleItem]) {
        for (i, item) in items.iter().enumerate() {
            let following = Following::Items(&items[i + 1..]);
            match item {
                ast::ModuleItem::Stmt(stmt) => {
                    self.detect_shapes(stmt, following);
                    self.visit_stmt(stmt);
                }
                ast::ModuleItem::ModuleDecl(decl) => self.visit_module_decl(decl, following),
            }
        }
    }

    fn visit_module_decl(&mut self, decl: &'a ast::ModuleDecl, following: Following<'a>) {
        match decl {
            ast::ModuleDecl::Import(import) => {
                for specifier in &import.specifiers {
                    self.declare(
                        0,
                        Binding::Import {
                            decl: import,
                            specifier,
                        },
                    );
                }
            }
            ast::ModuleDecl::ExportDecl(export) => {
                if let ast::Decl::Class(class) = &export.decl {
                    self.add_native_class(ClassOuter::Class(class), &class.class, None, Vec::new(), following);
                }
                if let ast::Decl::Var(var) = &export.decl {
                    self.detect_var_shapes(var, following);
                }
                self.visit_decl(&export.decl);
            }
            ast::ModuleDecl::ExportNamed(named) if named.src.is_none() => {
                for specifier in &named.specifiers {
                    if let ast::ExportSpecifier::Named(named) = specifier {
                        if let ast::ModuleExportName::Ident(ident) = &named.orig {
                            self.reference(ident);
                        }
                    }
                }
            }
            ast::ModuleDecl::ExportDefaultDecl(default) => match &default.decl {
                ast::DefaultDecl::Class(class) => self.visit_class_expr(class),
                ast::DefaultDecl::Fn(function) => self.visit_fn_expr(function),
                ast::DefaultDecl::TsInterfaceDecl(_) => {}
            },
            ast::ModuleDecl::ExportDefaultExpr(default) => self.visit_expr(&default.expr),
            _ => {}
        }
    }

    fn visit_stmts(&mut self, stmts: &'a [ast::Stmt]) {
        for (i, stmt) in stmts.iter().enumerate() {
            self.detect_shapes(stmt, Following::Stmts(&stmts[i + 1..]));
            self.visit_stmt(stmt);
        }
    }

    fn visit_block(&mut self, block: &'a ast::BlockStmt) {
        self.with_scope(false, None, |this| this.visit_stmts(&block.stmts));
    }

    fn visit_stmt(&mut self, stmt: &'a ast::Stmt) {
        match stmt {
            ast::Stmt::Block(block) => self.visit_block(block),
            ast::Stmt::Expr(expr) => self.visit_expr(&expr.expr),
            ast::Stmt::Return(ret) => {
                if let Some(arg) = &ret.arg {
                    self.visit_expr(arg);
                }
            }
            ast::Stmt::If(if_stmt) => {
                self.visit_expr(&if_stmt.test);
                self.visit_stmt(&if_stmt.cons);
                if let Some(alt) = &if_stmt.alt {
                    self.visit_stmt(alt);
                }
            }
            ast::Stmt::Labeled(labeled) => self.visit_stmt(&labeled.body),
            ast::Stmt::Switch(switch) => {
                self.visit_expr(&switch.discriminant);
                self.with_scope(false, None, |this| {
                    for case in &switch.cases {
                        if let Some(test) = &case.test {
                            this.visit_expr(test);
                        }
                        this.visit_stmts(&case.cons);
                    }
                });
            }
            ast::Stmt::Throw(throw) => self.visit_expr(&throw.arg),
            ast::Stmt::Try(try_stmt) => {
                self.visit_block(&try_stmt.block);
                if let Some(handler) = &try_stmt.handler {
                    self.with_scope(false, None, |this| {
                        if let Some(param) = &handler.param {
                            this.bind_pat(param, this.scope, None);
                        }
                        this.visit_stmts(&handler.body.stmts);
                    });
                }
                if let Some(finalizer) = &try_stmt.finalizer {
                    self.visit_block(finalizer);
                }
            }
            ast::Stmt::While(while_stmt) => {
                self.visit_expr(&while_stmt.test);
                self.visit_stmt(&while_stmt.body);
            }
            ast::Stmt::DoWhile(do_while) => {
                self.visit_stmt(&do_while.body);
                self.visit_expr(&do_while.test);
            }
            ast::Stmt::For(for_stmt) => self.with_scope(false, None, |this| {
                match &for_stmt.init {
                    Some(ast::VarDeclOrExpr::VarDecl(var)) => this.visit_var_decl(var),
                    Some(ast::VarDeclOrExpr::Expr(expr)) => this.visit_expr(expr),
                    None => {}
                }
                if let Some(test) = &for_stmt.test {
                    this.visit_expr(test);
                }
                if let Some(update) = &for_stmt.update {
                    this.visit_expr(update);
                }
                this.visit_stmt(&for_stmt.body);
            }),
            ast::Stmt::ForIn(for_in) => self.with_scope(false, None, |this| {
                this.visit_for_head(&for_in.left);
                this.visit_expr(&for_in.right);
                this.visit_stmt(&for_in.body);
            }),
            ast::Stmt::ForOf(for_of) => self.with_scope(false, None, |this| {
                this.visit_for_head(&for_of.left);
                this.visit_expr(&for_of.right);
                this.visit_stmt(&for_of.body);
            }),
            ast::Stmt::With(with) => {
                self.visit_expr(&with.obj);
                self.visit_stmt(&with.body);
            }
            ast::Stmt::Decl(decl) => self.visit_decl(decl),
            _ => {}
        }
    }

    fn visit_for_head(&mut self, head: &'a ast::ForHead) {
        match head {
            ast::ForHead::VarDecl(var) => self.visit_var_decl(var),
            ast::ForHead::Pat(pat) => self.visit_pat_refs(pat),
            ast::ForHead::UsingDecl(_) => {}
        }
    }

    fn visit_decl(&mut self, decl: &'a ast::Decl) {
        match decl {
            ast::Decl::Fn(function) => {
                self.declare(self.function_scope, Binding::Function(function));
                self.visit_function(&function.function, None, false);
            }
            ast::Decl::Class(class) => {
                self.declare(self.scope, Binding::Class(class));
                self.visit_class(&class.class);
            }
            ast::Decl::Var(var) => self.visit_var_decl(var),
            _ => {}
        }
    }

    fn visit_var_decl(&mut self, var: &'a ast::VarDecl) {
        let scope = match var.kind {
            ast::VarDeclKind::Var => self.function_scope,
            ast::VarDeclKind::Let | ast::VarDeclKind::Const => self.scope,
        };
        for declarator in &var.decls {
            self.bind_pat(&declarator.name, scope, Some(declarator));
            if let Some(init) = &declarator.init {
                self.visit_expr(init);
            }
        }
    }

    fn bind_pat(&mut self, pat: &'a ast::Pat, scope: ScopeId, declarator: Option<&'a ast::VarDeclarator>) {
        match pat {
            ast::Pat::Ident(binding) => {
                let ident = &binding.id;
                let binding = match declarator {
                    Some(declarator) if declarator.name.span() == binding.span() => {
                        Binding::Var { declarator, ident }
                    }
                    Some(declarator) => Binding::Destructured { declarator, ident },
                    None => Binding::Pattern(ident),
                };
                self.declare(scope, binding);
            }
            ast::Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.bind_pat(elem, scope, declarator);
                }
            }
            ast::Pat::Rest(rest) => self.bind_pat(&rest.arg, scope, declarator),
            ast::Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ast::ObjectPatProp::KeyValue(kv) => {
                            if let ast::PropName::Computed(computed) = &kv.key {
                                self.visit_expr(&computed.expr);
                            }
                            self.bind_pat(&kv.value, scope, declarator);
                        }
                        ast::ObjectPatProp::Assign(assign) => {
                            let ident = &assign.key.id;
                            self.declare(
                                scope,
                                match declarator {
                                    Some(declarator) => Binding::Destructured { declarator, ident },
                                    None => Binding::Pattern(ident),
                                },
                            );
                            if let Some(value) = &assign.value {
                                self.visit_expr(value);
                            }
                        }
                        ast::ObjectPatProp::Rest(rest) => self.bind_pat(&rest.arg, scope, declarator),
                    }
                }
            }
            ast::Pat::Assign(assign) => {
                self.bind_pat(&assign.left, scope, declarator);
                self.visit_expr(&assign.right);
            }
            ast::Pat::Expr(expr) => self.visit_expr(expr),
            ast::Pat::Invalid(_) => {}
        }
    }

    /// Identifiers in an assignment pattern are references, not bindings.
    fn visit_pat_refs(&mut self, pat: &'a ast::Pat) {
        match pat {
            ast::Pat::Ident(binding) => self.reference(&binding.id),
            ast::Pat::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.visit_pat_refs(elem);
                }
            }
            ast::Pat::Rest(rest) => self.visit_pat_refs(&rest.arg),
            ast::Pat::Object(object) => {
                for prop in &object.props {
                    match prop {
                        ast::ObjectPatProp::KeyValue(kv) => self.visit_pat_refs(&kv.value),
                        ast::ObjectPatProp::Assign(assign) => {
                            self.reference(&assign.key.id);
                            if let Some(value) = &assign.value {
                                self.visit_expr(value);
                            }
                        }
                        ast::ObjectPatProp::Rest(rest) => self.visit_pat_refs(&rest.arg),
                    }
                }
            }
            ast::Pat::Assign(assign) => {
                self.visit_pat_refs(&assign.left);
                self.visit_expr(&assign.right);
            }
            ast::Pat::Expr(expr) => self.visit_expr(expr),
            ast::Pat::Invalid(_) => {}
        }
    }

    fn visit_function(
        &mut self,
        function: &'a ast::Function,
        name: Option<(&'a ast::FnExpr, &'a ast::Ident)>,
        expression: bool,
    ) {
        self.with_scope(true, Some(function), |this| {
            if let Some((expr, ident)) = name {
                this.declare(this.scope, Binding::FnExprName(expr, ident));
            }
            for (index, param) in function.params.iter().enumerate() {
                match &param.pat {
                    ast::Pat::Ident(binding) => this.declare(
                        this.scope,
                        Binding::Param {
                            function,
                            index,
                            param,
                            ident: &binding.id,
                            expression,
                        },
                    ),
                    other => this.bind_pat(other, this.scope, None),
                }
                for decorator in &param.decorators {
                    this.visit_expr(&decorator.expr);
                }
            }
            if let Some(body) = &function.body {
                this.visit_stmts(&body.stmts);
            }
        });
    }

    fn visit_fn_expr(&mut self, fn_expr: &'a ast::FnExpr) {
        let name = fn_expr.ident.as_ref().map(|ident| (fn_expr, ident));
        self.visit_function(&fn_expr.function, name, true);
    }

    fn visit_arrow(&mut self, arrow: &'a ast::ArrowExpr) {
        self.with_scope(true, None, |this| {
            for param in &arrow.params {
                this.bind_pat(param, this.scope, None);
            }
            match &*arrow.body {
                ast::BlockStmtOrExpr::BlockStmt(block) => this.visit_stmts(&block.stmts),
                ast::BlockStmtOrExpr::Expr(expr) => this.visit_expr(expr),
            }
        });
    }

    /// A getter or setter body with optional parameters.
    fn visit_accessor(&mut self, params: &[&'a ast::Pat], body: Option<&'a ast::BlockStmt>) {
        self.with_scope(true, None, |this| {
            for param in params {
                this.bind_pat(param, this.scope, None);
            }
            if let Some(body) = body {
                this.visit_stmts(&body.stmts);
            }
        });
    }

    fn visit_class_expr(&mut self, class: &'a ast::ClassExpr) {
        self.with_scope(false, None, |this| {
            if let Some(ident) = &class.ident {
                this.declare(this.scope, Binding::ClassExprName(class, ident));
            }
            this.visit_class(&class.class);
        });
    }

    fn visit_class(&mut self, class: &'a ast::Class) {
        for decorator in &class.decorators {
            self.visit_expr(&decorator.expr);
        }
        if let Some(super_class) = &class.super_class {
            self.visit_expr(super_class);
        }
        for member in &class.body {
            match member {
                ast::ClassMember::Constructor(ctor) => self.with_scope(true, None, |this| {
                    for param in &ctor.params {
                        match param {
                            ast::ParamOrTsParamProp::Param(param) => {
                                for decorator in &param.decorators {
                                    this.visit_expr(&decorator.expr);
                                }
                                this.bind_pat(&param.pat, this.scope, None);
                            }
                            ast::ParamOrTsParamProp::TsParamProp(prop) => match &prop.param {
                                ast::TsParamPropParam::Ident(binding) => {
                                    this.declare(this.scope, Binding::Pattern(&binding.id))
                                }
                                ast::TsParamPropParam::Assign(assign) => {
                                    this.bind_pat(&assign.left, this.scope, None);
                                    this.visit_expr(&assign.right);
                                }
                            },
                        }
                    }
                    if let Some(body) = &ctor.body {
                        this.visit_stmts(&body.stmts);
                    }
                }),
                ast::ClassMember::Method(method) => {
                    self.visit_prop_name(&method.key);
                    for decorator in &method.function.decorators {
                        self.visit_expr(&decorator.expr);
                    }
                    self.visit_function(&method.function, None, false);
                }
                ast::ClassMember::PrivateMethod(method) => self.visit_function(&method.function, None, false),
                ast::ClassMember::ClassProp(prop) => {
                    self.visit_prop_name(&prop.key);
                    for decorator in &prop.decorators {
                        self.visit_expr(&decorator.expr);
                    }
                    if let Some(value) = &prop.value {
                        self.visit_expr(value);
                    }
                }
                ast::ClassMember::PrivateProp(prop) => {
                    if let Some(value) = &prop.value {
                        self.visit_expr(value);
                    }
                }
                ast::ClassMember::StaticBlock(block) => self.visit_block(&block.body),
                ast::ClassMember::AutoAccessor(accessor) => {
                    for decorator in &accessor.decorators {
                        self.visit_expr(&decorator.expr);
                    }
                    if let Some(value) = &accessor.value {
                        self.visit_expr(value);
                    }
                }
                _ => {}
            }
        }
    }

    fn visit_prop_name(&mut self, name: &'a ast::PropName) {
        if let ast::PropName::Computed(computed) = name {
            self.visit_expr(&computed.expr);
        }
    }

    fn visit_expr(&mut self, expr: &'a ast::Expr) {
        match expr {
            ast::Expr::Ident(ident) => self.reference(ident),
            ast::Expr::Array(array) => {
                for elem in array.elems.iter().flatten() {
                    self.visit_expr(&elem.expr);
                }
            }
            ast::Expr::Object(object) => self.visit_object(object),
            ast::Expr::Fn(fn_expr) => self.visit_fn_expr(fn_expr),
            ast::Expr::Unary(unary) => self.visit_expr(&unary.arg),
            ast::Expr::Update(update) => self.visit_expr(&update.arg),
            ast::Expr::Bin(bin) => {
                self.visit_expr(&bin.left);
                self.visit_expr(&bin.right);
            }
            ast::Expr::Assign(assign) => {
                match &assign.left {
                    ast::AssignTarget::Simple(simple) => match simple {
                        ast::SimpleAssignTarget::Ident(binding) => {
                            self.reference(&binding.id);
                            if assign.op == ast::AssignOp::Assign {
                                self.index.assignments.push((&binding.id, assign));
                            }
                        }
                        ast::SimpleAssignTarget::Member(member) => self.visit_member(member),
                        ast::SimpleAssignTarget::Paren(paren) => self.visit_expr(&paren.expr),
                        _ => {}
                    },
                    ast::AssignTarget::Pat(pat) => match pat {
                        ast::AssignTargetPat::Array(array) => {
                            for elem in array.elems.iter().flatten() {
                                self.visit_pat_refs(elem);
                            }
                        }
                        ast::AssignTargetPat::Object(object) => {
                            for prop in &object.props {
                                if let ast::ObjectPatProp::KeyValue(kv) = prop {
                                    self.visit_pat_refs(&kv.value);
                                }
                            }
                        }
                        ast::AssignTargetPat::Invalid(_) => {}
                    },
                }
                self.visit_expr(&assign.right);
            }
            ast::Expr::Member(member) => self.visit_member(member),
            ast::Expr::SuperProp(super_prop) => {
                if let ast::SuperProp::Computed(computed) = &super_prop.prop {
                    self.visit_expr(&computed.expr);
                }
            }
            ast::Expr::Cond(cond) => {
                self.visit_expr(&cond.test);
                self.visit_expr(&cond.cons);
                self.visit_expr(&cond.alt);
            }
            ast::Expr::Call(call) => {
                if let ast::Callee::Expr(callee) = &call.callee {
                    if let ast::Expr::Fn(fn_expr) = strip_parens(callee) {
                        self.index
                            .iife_calls
                            .insert(NodeKey::from(fn_expr.function.span), call);
                    }
                    self.visit_expr(callee);
                }
                for arg in &call.args {
                    self.visit_expr(&arg.expr);
                }
            }
            ast::Expr::New(new) => {
                self.visit_expr(&new.callee);
                for arg in new.args.iter().flatten() {
                    self.visit_expr(&arg.expr);
                }
            }
            ast::Expr::Seq(seq) => {
                for expr in &seq.exprs {
                    self.visit_expr(expr);
                }
            }
            ast::Expr::Tpl(tpl) => {
                for expr in &tpl.exprs {
                    self.visit_expr(expr);
                }
            }
            ast::Expr::TaggedTpl(tagged) => {
                self.visit_expr(&tagged.tag);
                for expr in &tagged.tpl.exprs {
                    self.visit_expr(expr);
                }
            }
            ast::Expr::Arrow(arrow) => self.visit_arrow(arrow),
            ast::Expr::Class(class) => self.visit_class_expr(class),
            ast::Expr::Yield(yield_expr) => {
                if let Some(arg) = &yield_expr.arg {
                    self.visit_expr(arg);
                }
            }
            ast::Expr::Await(await_expr) => self.visit_expr(&await_expr.arg),
            ast::Expr::Paren(paren) => self.visit_expr(&paren.expr),
            ast::Expr::OptChain(chain) => match &*chain.base {
                ast::OptChainBase::Member(member) => self.visit_member(member),
                ast::OptChainBase::Call(call) => {
                    self.visit_expr(&call.callee);
                    for arg in &call.args {
                        self.visit_expr(&arg.expr);
                    }
                }
            },
            ast::Expr::TsAs(cast) => self.visit_expr(&cast.expr),
            ast::Expr::TsNonNull(non_null) => self.visit_expr(&non_null.expr),
            ast::Expr::TsTypeAssertion(assertion) => self.visit_expr(&assertion.expr),
            ast::Expr::TsConstAssertion(assertion) => self.visit_expr(&assertion.expr),
            ast::Expr::TsSatisfies(satisfies) => self.visit_expr(&satisfies.expr),
            _ => {}
        }
    }

    fn visit_member(&mut self, member: &'a ast::MemberExpr) {
        self.visit_expr(&member.obj);
        if let ast::MemberProp::Computed(computed) = &member.prop {
            self.visit_expr(&computed.expr);
        }
    }

    fn visit_object(&mut self, object: &'a ast::ObjectLit) {
        for prop in &object.props {
            let prop = match prop {
                ast::PropOrSpread::Spread(spread) => {
                    self.visit_expr(&spread.expr);
                    continue;
                }
                ast::PropOrSpread::Prop(prop) => prop,
            };
            match &**prop {
                ast::Prop::Shorthand(ident) => self.reference(ident),
                ast::Prop::KeyValue(kv) => {
                    self.visit_prop_name(&kv.key);
                    self.visit_expr(&kv.value);
                }
                ast::Prop::Assign(assign) => self.visit_expr(&assign.value),
                ast::Prop::Getter(getter) => {
                    self.visit_prop_name(&getter.key);
                    self.visit_accessor(&[], getter.body.as_ref());
                }
                ast::Prop::Setter(setter) => {
                    self.visit_prop_name(&setter.key);
                    self.visit_accessor(&[&*setter.param], setter.body.as_ref());
                }
                ast::Prop::Method(method) => {
                    self.visit_prop_name(&method.key);
                    self.visit_function(&method.function, None, false);
                }
            }
        }
    }

    // -----------------------------------------------------------------------
    // Shapes
    // -----------------------------------------------------------------------

    fn detect_shapes(&mut self, stmt: &'a ast::Stmt, following: Following<'a>) {
        match stmt {
            ast::Stmt::Decl(ast::Decl::Var(var)) => self.detect_var_shapes(var, following),
            ast::Stmt::Decl(ast::Decl::Class(class)) => {
                self.add_native_class(ClassOuter::Class(class), &class.class, None, Vec::new(), following)
            }
            ast::Stmt::Expr(expr) => {
                if let Some(assign) = as_assignment(&expr.expr) {
                    if let Some(name) = exports_assignment_target(assign) {
                        self.detect_class_value(ClassOuter::Exports(assign, name), &assign.right, following);
                    } else if let Some(ident) = assign_target_ident(assign) {
                        self.detect_class_value(ClassOuter::Assign(assign, ident), &assign.right, following);
                    }
                }
                if let Some(iife) = enum_iife(stmt) {
                    self.add_enum(stmt, iife);
                }
            }
            _ => {}
        }
    }

    fn detect_var_shapes(&mut self, var: &'a ast::VarDecl, following: Following<'a>) {
        for declarator in &var.decls {
            if let (ast::Pat::Ident(binding), Some(init)) = (&declarator.name, &declarator.init) {
                self.detect_class_value(ClassOuter::Var(declarator, &binding.id), init, following);
            }
        }
    }

    fn detect_class_value(&mut self, outer: ClassOuter<'a>, value: &'a ast::Expr, following: Following<'a>) {
        if let Some(ClassIife {
            iife,
            inner,
            aliases,
        }) = class_iife(value)
        {
            let statements: Vec<&'a ast::Stmt> = iife
                .function
                .body
                .as_ref()
                .map(|body| body.stmts.iter().collect())
                .unwrap_or_default();
            self.add_class(ClassShape {
                outer,
                body: ClassBody::Es5 { inner, iife },
                aliases,
                statements,
                names: vec![ident_name(&inner.ident)],
            });
            return;
        }

        let (aliases, implementation) = alias_chain(value);
        if let ast::Expr::Class(class_expr) = implementation {
            self.add_native_class(outer, &class_expr.class, Some(class_expr), aliases, following);
        }
    }

    fn add_native_class(
        &mut self,
        outer: ClassOuter<'a>,
        class: &'a ast::Class,
        expr: Option<&'a ast::ClassExpr>,
        aliases: Vec<&'a ast::Ident>,
        following: Following<'a>,
    ) {
        let mut names = Vec::new();
        if let Some(ident) = expr.and_then(|expr| expr.ident.as_ref()) {
            names.push(ident_name(ident));
        }
        self.add_class(ClassShape {
            outer,
            body: ClassBody::Native { class, expr },
            aliases,
            statements: following.collect(),
            names,
        });
    }

    fn add_class(&mut self, mut shape: ClassShape<'a>) {
        let outer_name = shape.name();
        let alias_names: Vec<&'a str> = shape.aliases.iter().map(|alias| ident_name(alias)).collect();
        for name in std::iter::once(outer_name).chain(alias_names) {
            if !shape.names.contains(&name) {
                shape.names.push(name);
            }
        }

        let index = self.index.classes.len();
        let declaration = shape.declaration().key();
        let implementation = shape.implementation().key();
        self.index.class_keys.insert(declaration, index);
        self.index.class_keys.insert(implementation, index);
        if let ClassBody::Es5 { inner, .. } = shape.body {
            self.index.class_keys.insert(NodeKey::from(inner.ident.span), index);
        }
        log::trace!("class shape '{}' at {:?}", outer_name, declaration);
        self.index.classes.push(shape);
    }

    fn add_enum(&mut self, stmt: &'a ast::Stmt, iife: EnumIife<'a>) {
        let index = self.index.enums.len();
        self.index
            .enum_keys
            .insert(NodeKey::from(iife.param.span), index);
        self.index.enum_keys.insert(NodeKey::of(stmt), index);
        self.index.enums.push(EnumShape { stmt, iife });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_parser::Program;

    fn index_of(program: &Program) -> FileIndex<'_> {
        FileIndex::build(program.files().next().unwrap())
    }

    fn program(source: &str) -> Program {
        let mut program = Program::new();
        program.add_source("/test.js", source).unwrap();
        program
    }

    #[test]
    fn test_var_hoisting_and_shadowing() {
        let program = program(
            r#"
            var a = 1;
            function f(a) {
                return a;
            }
            function g() {
                { var b = 2; }
                return [a, b];
            }
            "#,
        );
        let index = index_of(&program);
        let refs: Vec<_> = index.references_named("a").collect();
        assert_eq!(refs.len(), 2);

        // `a` inside `f` is the parameter
        assert!(matches!(index.resolve(refs[0]).unwrap()[0], Binding::Param { index: 0, .. }));
        // `a` inside `g` is the top-level var
        assert!(matches!(index.resolve(refs[1]).unwrap()[0], Binding::Var { .. }));

        let b = index.references_named("b").next().unwrap();
        assert!(matches!(index.resolve(b).unwrap()[0], Binding::Var { .. }));
    }

    #[test]
    fn test_block_scoped_let() {
        let program = program(
            r#"
            let x = 1;
            { let x = 2; use(x); }
            use(x);
            "#,
        );
        let index = index_of(&program);
        let refs: Vec<_> = index.references_named("x").collect();
        let inner = index.resolve(refs[0]).unwrap()[0].declarator().unwrap();
        let outer = index.resolve(refs[1]).unwrap()[0].declarator().unwrap();
        assert_ne!(inner.span, outer.span);
        assert!(index.resolve(index.references_named("use").next().unwrap()).is_none());
    }

    #[test]
    fn test_multiple_declaration_sites() {
        let program = program("var X; X = 1; var X = 2; use(X);");
        let index = index_of(&program);
        let x = index.references_named("X").last().unwrap();
        assert_eq!(index.resolve(x).unwrap().len(), 2);
    }

    #[test]
    fn test_class_shapes() {
        let program = program(
            r#"
            var Foo = Foo_1 = (function (_super) {
                __extends(Foo, _super);
                function Foo() {}
                Foo.bar = Foo_1;
                return Foo;
            }(Base));
            var Foo_1;
            exports.Bar = (function () { function Bar() {} return Bar; }());
            class Baz {}
            Baz.decorators = [];
            "#,
        );
        let index = index_of(&program);
        assert_eq!(index.classes().len(), 3);

        let foo = index.class(0);
        assert_eq!(foo.name(), "Foo");
        assert_eq!(foo.names, vec!["Foo", "Foo_1"]);
        assert!(matches!(foo.body, ClassBody::Es5 { .. }));
        assert_eq!(foo.statements.len(), 4);
        assert_eq!(index.class_at(foo.implementation().key()), Some(0));

        let alias = match &program.files().next().unwrap().statements()[1] {
            ast::Stmt::Decl(ast::Decl::Var(var)) => &var.decls[0],
            _ => unreachable!(),
        };
        assert_eq!(index.aliased_class(alias), Some(0));

        let bar = index.class(1);
        assert_eq!(bar.name(), "Bar");
        assert!(matches!(bar.declaration(), DeclarationNode::Assign(_)));

        let baz = index.class(2);
        assert!(matches!(baz.body, ClassBody::Native { .. }));
        assert_eq!(baz.statements.len(), 1);
    }

    #[test]
    fn test_enum_shapes_link_to_var() {
        let program = program(
            r#"
            var E;
            (function (E) { E[E["A"] = 0] = "A"; })(E || (E = {}));
            "#,
        );
        let index = index_of(&program);
        assert_eq!(index.enums().len(), 1);

        let declarator = match &program.files().next().unwrap().statements()[0] {
            ast::Stmt::Decl(ast::Decl::Var(var)) => &var.decls[0],
            _ => unreachable!(),
        };
        let shape = index.enum_at(NodeKey::from(declarator.span)).unwrap();
        assert_eq!(shape.iife.members[0].name, "A");
    }

    #[test]
    fn test_iife_calls_and_assignments() {
        let program = program(
            r#"
            (function (x) { return x; })(1);
            var y;
            y = 2;
            "#,
        );
        let index = index_of(&program);
        let file = program.files().next().unwrap();
        let function = match crate::patterns::expr_of_stmt(file.statements()[0]) {
            Some(ast::Expr::Call(call)) => match &call.callee {
                ast::Callee::Expr(callee) => match strip_parens(callee) {
                    ast::Expr::Fn(f) => &*f.function,
                    _ => unreachable!(),
                },
                _ => unreachable!(),
            },
            _ => unreachable!(),
        };
        assert!(index.iife_call(function).is_some());

        let declarator = match file.statements()[1] {
            ast::Stmt::Decl(ast::Decl::Var(var)) => &var.decls[0],
            _ => unreachable!(),
        };
        assert_eq!(index.assignments_to(declarator).len(), 1);
    }
}
