//! Reflection over files wrapped in the universal module wrapper.
//!
//! Inside a UMD factory the module's imports are factory parameters and its
//! exports are assignments to the `exports` parameter. This host recognizes
//! those and hands every other question to the ES host it wraps.

mod exports;
mod resolve;

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{FileId, Program, SourceFile};

use crate::error::ReflectionError;
use crate::esm::EsmReflectionHost;
use crate::host::{ExportCache, ReflectionHost};
use crate::index::FileIndex;
use crate::model::{Declaration, DtsDeclaration, ExportTable, Import};
use crate::umd::{self, UmdModule};

pub struct UmdReflectionHost<'a> {
    base: EsmReflectionHost<'a>,
    modules: RefCell<HashMap<FileId, Option<Rc<UmdModule<'a>>>>>,
    exports: ExportCache<'a>,
}

impl<'a> UmdReflectionHost<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            base: EsmReflectionHost::new(program),
            modules: RefCell::new(HashMap::new()),
            exports: ExportCache::new(),
        }
    }

    /// The host used for everything that is not UMD specific.
    pub fn base(&self) -> &EsmReflectionHost<'a> {
        &self.base
    }

    /// The parsed wrapper of a file, computed once per file.
    pub fn get_umd_module(&self, file: &'a SourceFile) -> Option<Rc<UmdModule<'a>>> {
        if let Some(module) = self.modules.borrow().get(&file.id) {
            return module.clone();
        }
        let module = umd::parse_file(file).map(Rc::new);
        if module.is_none() {
            log::trace!("{} is not a UMD module", file.path.display());
        }
        self.modules.borrow_mut().insert(file.id, module.clone());
        module
    }

    /// The statements of the factory body.
    pub fn get_module_statements(&self, file: &'a SourceFile) -> Option<&'a [ast::Stmt]> {
        self.get_umd_module(file).map(|module| module.statements())
    }

    pub fn is_umd_file(&self, file: &'a SourceFile) -> bool {
        self.get_umd_module(file).is_some()
    }
}

impl<'a> ReflectionHost<'a> for UmdReflectionHost<'a> {
    fn program(&self) -> &'a Program {
        self.base.program()
    }

    fn file_index(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>> {
        self.base.index_of(file)
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
        self.base.dts_declaration(declaration)
    }
}
