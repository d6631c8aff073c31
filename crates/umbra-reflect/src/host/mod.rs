//! The reflection interface and the class extractors shared by every host.
//!
//! Hosts differ in how they resolve identifiers and enumerate exports. Class
//! shapes are recognized the same way everywhere, so the class operations are
//! provided methods that go back through the host for every resolution step.

mod classes;
mod decorators;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{FileId, Program, SourceFile, Span};

use crate::error::ReflectionError;
use crate::index::FileIndex;
use crate::model::{
    ClassMember, ClassSymbol, CtorParameter, Declaration, DeclarationNode, Decorator, DtsDeclaration,
    ExportTable, FunctionDefinition, Import,
};

/// Uniform view over a module's declarations, regardless of module format.
pub trait ReflectionHost<'a> {
    fn program(&self) -> &'a Program;

    /// The bindings and shapes of one file.
    fn file_index(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>>;

    /// Find the authoritative declaration of an identifier.
    fn get_declaration_of_identifier(&self, ident: &'a ast::Ident) -> Option<Declaration<'a>>;

    /// Like [`get_declaration_of_identifier`](Self::get_declaration_of_identifier)
    /// but also follows `ns.NAME` through imported namespaces and `require(...)`.
    fn get_declaration_of_expression(&self, expr: &'a ast::Expr) -> Option<Declaration<'a>>;

    fn get_import_of_identifier(&self, ident: &'a ast::Ident) -> Option<Import>;

    /// The import behind an identifier or a `namespace.Name` access.
    fn get_import_of_expression(&self, expr: &'a ast::Expr) -> Option<Import>;

    /// The ordered export table of a module, or `None` when the host does not
    /// understand the file's module format.
    fn get_exports_of_module(&self, file: &'a SourceFile) -> Option<ExportTable<'a>>;

    /// Match a runtime declaration to its public typings declaration.
    fn get_dts_declaration(
        &self,
        declaration: &Declaration<'a>,
    ) -> Result<Option<DtsDeclaration>, ReflectionError>;

    fn file_of(&self, span: Span) -> Option<&'a SourceFile> {
        self.program().file_at(span.lo)
    }

    fn get_class_symbol(&self, node: DeclarationNode<'a>) -> Option<ClassSymbol<'a>> {
        classes::class_symbol(self, node).map(|class| class.symbol)
    }

    fn is_class(&self, node: DeclarationNode<'a>) -> bool {
        classes::class_symbol(self, node).is_some()
    }

    fn get_decorators_of_declaration(
        &self,
        node: DeclarationNode<'a>,
    ) -> Result<Option<Vec<Decorator<'a>>>, ReflectionError> {
        let class = classes::require_class(self, node, "get_decorators_of_declaration")?;
        Ok(decorators::class_decorators(self, &class))
    }

    fn get_members_of_class(
        &self,
        node: DeclarationNode<'a>,
    ) -> Result<Vec<ClassMember<'a>>, ReflectionError> {
        let class = classes::require_class(self, node, "get_members_of_class")?;
        Ok(classes::members_of_class(self, &class))
    }

    /// `Ok(None)` when the constructor only forwards its arguments to the
    /// base class and so has no parameter list of its own.
    fn get_constructor_parameters(
        &self,
        node: DeclarationNode<'a>,
    ) -> Result<Option<Vec<CtorParameter<'a>>>, ReflectionError> {
        let class = classes::require_class(self, node, "get_constructor_parameters")?;
        Ok(classes::constructor_parameters(self, &class))
    }

    fn has_base_class(&self, node: DeclarationNode<'a>) -> Result<bool, ReflectionError> {
        let class = classes::require_class(self, node, "has_base_class")?;
        Ok(classes::base_class_expression(&class).is_some())
    }

    fn get_base_class_expression(
        &self,
        node: DeclarationNode<'a>,
    ) -> Result<Option<&'a ast::Expr>, ReflectionError> {
        let class = classes::require_class(self, node, "get_base_class_expression")?;
        Ok(classes::base_class_expression(&class))
    }

    /// The name the class has inside its own implementation.
    fn get_internal_name_of_class(&self, node: DeclarationNode<'a>) -> Result<String, ReflectionError> {
        let class = classes::require_class(self, node, "get_internal_name_of_class")?;
        let shape = class.shape();
        Ok(shape.internal_name().unwrap_or_else(|| shape.name()).to_string())
    }

    /// The name the class is bound to next to other top-level statements.
    fn get_adjacent_name_of_class(&self, node: DeclarationNode<'a>) -> Result<String, ReflectionError> {
        let class = classes::require_class(self, node, "get_adjacent_name_of_class")?;
        Ok(class.shape().name().to_string())
    }

    fn get_definition_of_function(&self, node: DeclarationNode<'a>) -> Option<FunctionDefinition<'a>> {
        classes::definition_of_function(self, node)
    }

    /// The value a variable ends up holding: its initializer, or the first
    /// later `X = value;` assignment for a bare `var X;`.
    fn get_variable_value(&self, declarator: &'a ast::VarDeclarator) -> Option<&'a ast::Expr> {
        if let Some(init) = declarator.init.as_deref() {
            return Some(init);
        }
        let file = self.file_of(declarator.span)?;
        let index = self.file_index(file);
        let assignments = index.assignments_to(declarator);
        assignments.first().map(|assign| &*assign.right)
    }
}

/// Lazily built [`FileIndex`] per file.
pub struct FileIndexes<'a> {
    program: &'a Program,
    cache: RefCell<HashMap<FileId, Rc<FileIndex<'a>>>>,
}

impl<'a> FileIndexes<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            program,
            cache: RefCell::new(HashMap::new()),
        }
    }

    pub fn get(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>> {
        if let Some(index) = self.cache.borrow().get(&file.id) {
            return Rc::clone(index);
        }
        let index = Rc::new(FileIndex::build(file));
        self.cache.borrow_mut().insert(file.id, Rc::clone(&index));
        index
    }

    pub fn program(&self) -> &'a Program {
        self.program
    }
}

/// Memoized export tables with a guard against re-export cycles.
///
/// Only tables whose build never hit a cycle are memoized. A table built
/// inside a cycle depends on where the cycle was entered, so it is rebuilt
/// on every query and each module sees the cycle cut at itself.
pub(crate) struct ExportCache<'a> {
    tables: RefCell<HashMap<FileId, Option<ExportTable<'a>>>>,
    in_progress: RefCell<HashSet<FileId>>,
    cuts: Cell<usize>,
}

impl<'a> ExportCache<'a> {
    pub fn new() -> Self {
        Self {
            tables: RefCell::new(HashMap::new()),
            in_progress: RefCell::new(HashSet::new()),
            cuts: Cell::new(0),
        }
    }

    /// Whether the table of `file` is being built further up the stack.
    pub fn is_in_progress(&self, file: &SourceFile) -> bool {
        self.in_progress.borrow().contains(&file.id)
    }

    /// Return the cached table or build it. A file reached again while its
    /// own table is being built yields `None`, cutting the cycle there.
    pub fn get_or_build(
        &self,
        file: &'a SourceFile,
        build: impl FnOnce() -> Option<ExportTable<'a>>,
    ) -> Option<ExportTable<'a>> {
        if let Some(table) = self.tables.borrow().get(&file.id) {
            return table.clone();
        }
        if !self.in_progress.borrow_mut().insert(file.id) {
            log::trace!("re-export cycle cut at {}", file.path.display());
            self.cuts.set(self.cuts.get() + 1);
            return None;
        }
        let cuts_before = self.cuts.get();
        let table = build();
        self.in_progress.borrow_mut().remove(&file.id);
        log::debug!(
            "exports of {}: {} entries",
            file.path.display(),
            table.as_ref().map_or(0, |table| table.len())
        );
        if self.cuts.get() == cuts_before {
            self.tables.borrow_mut().insert(file.id, table.clone());
        }
        table
    }
}
