//! One host for a whole program mixing module formats.

use std::rc::Rc;

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{Program, SourceFile};

use crate::error::ReflectionError;
use crate::esm::EsmReflectionHost;
use crate::host::ReflectionHost;
use crate::index::FileIndex;
use crate::model::{Declaration, DtsDeclaration, ExportTable, Import};
use crate::umd_host::UmdReflectionHost;

/// Sends each question to the host that understands the file it is about:
/// typings and ES modules to the ES host, UMD bundles to the UMD host.
///
/// Every resolution step goes back through this host, so an ES module
/// importing a UMD bundle resolves through the UMD rules and vice versa.
pub struct DelegatingReflectionHost<'a> {
    umd: UmdReflectionHost<'a>,
}

enum Format {
    Esm,
    Umd,
}

impl<'a> DelegatingReflectionHost<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self {
            umd: UmdReflectionHost::new(program),
        }
    }

    pub fn umd(&self) -> &UmdReflectionHost<'a> {
        &self.umd
    }

    pub fn esm(&self) -> &EsmReflectionHost<'a> {
        self.umd.base()
    }

    fn format_of(&self, file: &'a SourceFile) -> Format {
        if !file.is_typings() && self.umd.is_umd_file(file) {
            Format::Umd
        } else {
            Format::Esm
        }
    }

    fn format_at(&self, span: umbra_parser::Span) -> Format {
        match self.program().file_at(span.lo) {
            Some(file) => self.format_of(file),
            None => Format::Esm,
        }
    }
}

impl<'a> ReflectionHost<'a> for DelegatingReflectionHost<'a> {
    fn program(&self) -> &'a Program {
        self.umd.program()
    }

    fn file_index(&self, file: &'a SourceFile) -> Rc<FileIndex<'a>> {
        self.umd.file_index(file)
    }

    fn get_declaration_of_identifier(&self, ident: &'a ast::Ident) -> Option<Declaration<'a>> {
        match self.format_at(ident.span) {
            Format::Umd => self.umd.resolve_identifier(self, ident),
            Format::Esm => self.esm().resolve_identifier(self, ident),
        }
    }

    fn get_declaration_of_expression(&self, expr: &'a ast::Expr) -> Option<Declaration<'a>> {
        match self.format_at(umbra_parser::Spanned::span(expr)) {
            Format::Umd => self.umd.resolve_expression(self, expr),
            Format::Esm => self.esm().resolve_expression(self, expr),
        }
    }

    fn get_import_of_identifier(&self, ident: &'a ast::Ident) -> Option<Import> {
        match self.format_at(ident.span) {
            Format::Umd => self.umd.import_of_identifier(ident),
            Format::Esm => self.esm().import_of_identifier(ident),
        }
    }

    fn get_import_of_expression(&self, expr: &'a ast::Expr) -> Option<Import> {
        match self.format_at(umbra_parser::Spanned::span(expr)) {
            Format::Umd => self.umd.import_of_expression(self, expr),
            Format::Esm => self.esm().import_of_expression(self, expr),
        }
    }

    fn get_exports_of_module(&self, file: &'a SourceFile) -> Option<ExportTable<'a>> {
        match self.format_of(file) {
            Format::Umd => self.umd.exports_of_module(self, file),
            Format::Esm => self.esm().exports_of_module(self, file),
        }
    }

    fn get_dts_declaration(
        &self,
        declaration: &Declaration<'a>,
    ) -> Result<Option<DtsDeclaration>, ReflectionError> {
        self.esm().dts_declaration(declaration)
    }
}
