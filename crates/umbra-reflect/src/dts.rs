//! Cross-reference between runtime declarations and the typings shipped
//! next to them.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{FileId, Program, SourceFile, Span};

use crate::model::{DtsDeclaration, DtsKind};

type DtsExports = IndexMap<String, DtsDeclaration>;

/// Export maps of every typings file in a program.
#[derive(Debug, Default)]
pub(crate) struct DtsIndex {
    exports: HashMap<FileId, DtsExports>,
    /// Typings files in registration order, for the fallback scan
    order: Vec<FileId>,
}

impl DtsIndex {
    pub fn build(program: &Program) -> Self {
        let mut builder = Builder {
            program,
            done: HashMap::new(),
            visiting: HashSet::new(),
            cuts: 0,
        };
        let order: Vec<FileId> = program.typings_files().map(|file| file.id).collect();
        let exports = program
            .typings_files()
            .map(|file| (file.id, builder.exports_of(file)))
            .collect();
        log::debug!("indexed {} typings files", order.len());
        Self { exports, order }
    }

    /// Find `name` for a declaration living in `source`.
    ///
    /// The typings file at the same relative path wins, then the public
    /// entry point, then any typings file exporting the name.
    pub fn lookup(&self, program: &Program, source: Option<&SourceFile>, name: &str) -> Option<&DtsDeclaration> {
        let typings_root = program.typings_root()?;

        if let Some(path) = source.and_then(|source| sibling_typings(program, source)) {
            if let Some(found) = self.find_in(program, &path, name) {
                return Some(found);
            }
        }
        if let Some(found) = self.find_in(program, &typings_root.join("index.d.ts"), name) {
            return Some(found);
        }
        self.order
            .iter()
            .filter_map(|id| self.exports.get(id))
            .find_map(|exports| exports.get(name))
    }

    fn find_in(&self, program: &Program, path: &Path, name: &str) -> Option<&DtsDeclaration> {
        let file = program.file_by_path(path)?;
        self.exports.get(&file.id)?.get(name)
    }
}

/// `<typings root>/<path relative to the source root>.d.ts`
fn sibling_typings(program: &Program, source: &SourceFile) -> Option<PathBuf> {
    let source_root = program.source_root()?;
    let typings_root = program.typings_root()?;
    let stem = PathBuf::from(source.path_without_extension());
    let relative = stem.strip_prefix(source_root).ok()?;
    let mut path = typings_root.join(relative).into_os_string();
    path.push(".d.ts");
    Some(PathBuf::from(path))
}

struct Builder<'p> {
    program: &'p Program,
    /// Export maps that did not depend on a cut cycle
    done: HashMap<FileId, DtsExports>,
    visiting: HashSet<FileId>,
    cuts: usize,
}

impl Builder<'_> {
    fn exports_of(&mut self, file: &SourceFile) -> DtsExports {
        if let Some(exports) = self.done.get(&file.id) {
            return exports.clone();
        }
        if !self.visiting.insert(file.id) {
            log::trace!("typings re-export cycle cut at {}", file.path.display());
            self.cuts += 1;
            return DtsExports::new();
        }
        let cuts_before = self.cuts;

        let mut exports = DtsExports::new();
        if let Some(items) = file.module_items() {
            let locals = local_declarations(file, items);
            for item in items {
                if let ast::ModuleItem::ModuleDecl(decl) = item {
                    self.collect(file, decl, &locals, &mut exports);
                }
            }
        }

        self.visiting.remove(&file.id);
        if self.cuts == cuts_before {
            self.done.insert(file.id, exports.clone());
        }
        exports
    }

    fn collect(&mut self, file: &SourceFile, decl: &ast::ModuleDecl, locals: &DtsExports, exports: &mut DtsExports) {
        match decl {
            ast::ModuleDecl::ExportDecl(export) => {
                for declaration in declared_names(file, &export.decl) {
                    exports.insert(declaration.name.clone(), declaration);
                }
            }
            ast::ModuleDecl::ExportNamed(named) => {
                let source = match &named.src {
                    Some(src) => {
                        let Some(target) = src
                            .value
                            .as_str()
                            .and_then(|spec| self.program.resolve_module(spec, file))
                        else {
                            return;
                        };
                        self.exports_of(target)
                    }
                    None => locals.clone(),
                };
                for specifier in &named.specifiers {
                    let ast::ExportSpecifier::Named(specifier) = specifier else {
                        continue;
                    };
                    let orig = export_name(&specifier.orig);
                    let exported = specifier.exported.as_ref().map_or(orig.clone(), export_name);
                    if let Some(found) = source.get(&orig) {
                        exports.insert(exported, found.clone());
                    }
                }
            }
            ast::ModuleDecl::ExportAll(all) => {
                let Some(target) = all
                    .src
                    .value
                    .as_str()
                    .and_then(|spec| self.program.resolve_module(spec, file))
                else {
                    return;
                };
                for (name, declaration) in self.exports_of(target) {
                    exports.entry(name).or_insert(declaration);
                }
            }
            _ => {}
        }
    }
}

/// Declarations made at the top level without `export`, for later
/// `export { X }` lists.
fn local_declarations(file: &SourceFile, items: &[ast::ModuleItem]) -> DtsExports {
    let mut locals = DtsExports::new();
    for item in items {
        let decl = match item {
            ast::ModuleItem::Stmt(ast::Stmt::Decl(decl)) => decl,
            ast::ModuleItem::ModuleDecl(ast::ModuleDecl::ExportDecl(export)) => &export.decl,
            _ => continue,
        };
        for declaration in declared_names(file, decl) {
            locals.insert(declaration.name.clone(), declaration);
        }
    }
    locals
}

fn declared_names(file: &SourceFile, decl: &ast::Decl) -> Vec<DtsDeclaration> {
    let entry = |ident: &ast::Ident, kind: DtsKind, span: Span| DtsDeclaration {
        path: file.path.clone(),
        name: ident.sym.to_string(),
        kind,
        span,
    };
    match decl {
        ast::Decl::Class(class) => vec![entry(&class.ident, DtsKind::Class, class.class.span)],
        ast::Decl::Fn(function) => vec![entry(&function.ident, DtsKind::Function, function.function.span)],
        ast::Decl::Var(var) => var
            .decls
            .iter()
            .filter_map(|declarator| match &declarator.name {
                ast::Pat::Ident(ident) => Some(entry(&ident.id, DtsKind::Variable, declarator.span)),
                _ => None,
            })
            .collect(),
        ast::Decl::TsInterface(interface) => {
            vec![entry(&interface.id, DtsKind::Interface, interface.span)]
        }
        ast::Decl::TsTypeAlias(alias) => vec![entry(&alias.id, DtsKind::TypeAlias, alias.span)],
        ast::Decl::TsEnum(decl) => vec![entry(&decl.id, DtsKind::Enum, decl.span)],
        ast::Decl::TsModule(module) => match &module.id {
            ast::TsModuleName::Ident(ident) => vec![entry(ident, DtsKind::Namespace, module.span)],
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

fn export_name(name: &ast::ModuleExportName) -> String {
    match name {
        ast::ModuleExportName::Ident(ident) => ident.sym.to_string(),
        ast::ModuleExportName::Str(s) => s.value.as_str().unwrap_or_default().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program() -> Program {
        let mut program = Program::new();
        program.set_source_root("/pkg/esm");
        program.set_typings_root("/pkg/typings");
        program
            .add_source(
                "/pkg/typings/index.d.ts",
                "export * from './api';\nexport { Widget as PublicWidget } from './widget';",
            )
            .unwrap();
        program
            .add_source(
                "/pkg/typings/api.d.ts",
                "export declare class Api {}\nexport declare function make(): Api;\ninterface Hidden {}\nexport { Hidden };",
            )
            .unwrap();
        program
            .add_source("/pkg/typings/widget.d.ts", "export declare class Widget {}")
            .unwrap();
        program
            .add_source("/pkg/typings/internal/util.d.ts", "export declare const helper: number;")
            .unwrap();
        program
            .add_source("/pkg/esm/widget.js", "export class Widget {}")
            .unwrap();
        program
    }

    #[test]
    fn test_sibling_file_wins() {
        let program = program();
        let index = DtsIndex::build(&program);
        let source = program.file_by_path("/pkg/esm/widget.js");

        let found = index.lookup(&program, source, "Widget").unwrap();
        assert_eq!(found.path, PathBuf::from("/pkg/typings/widget.d.ts"));
        assert_eq!(found.kind, DtsKind::Class);
    }

    #[test]
    fn test_entry_point_reexports() {
        let program = program();
        let index = DtsIndex::build(&program);

        let found = index.lookup(&program, None, "make").unwrap();
        assert_eq!(found.kind, DtsKind::Function);
        assert_eq!(found.path, PathBuf::from("/pkg/typings/api.d.ts"));

        let renamed = index.lookup(&program, None, "PublicWidget").unwrap();
        assert_eq!(renamed.name, "Widget");

        let local = index.lookup(&program, None, "Hidden").unwrap();
        assert_eq!(local.kind, DtsKind::Interface);
    }

    #[test]
    fn test_fallback_scan() {
        let program = program();
        let index = DtsIndex::build(&program);

        let found = index.lookup(&program, None, "helper").unwrap();
        assert_eq!(found.path, PathBuf::from("/pkg/typings/internal/util.d.ts"));
        assert_eq!(found.kind, DtsKind::Variable);
        assert!(index.lookup(&program, None, "Nope").is_none());
    }

    #[test]
    fn test_js_specifier_in_typings_reaches_typings() {
        let mut program = Program::new();
        program.set_typings_root("/pkg");
        program.add_source("/pkg/index.d.ts", "export * from './api.js';").unwrap();
        program.add_source("/pkg/api.js", "export class Api {}").unwrap();
        program.add_source("/pkg/api.d.ts", "export declare class Api {}").unwrap();
        let index = DtsIndex::build(&program);

        let found = index.lookup(&program, None, "Api").unwrap();
        assert_eq!(found.path, PathBuf::from("/pkg/api.d.ts"));
        assert_eq!(found.kind, DtsKind::Class);
    }

    #[test]
    fn test_reexport_cycle_reaches_both_files() {
        let mut program = Program::new();
        program.set_typings_root("/pkg/typings");
        program
            .add_source("/pkg/typings/a.d.ts", "export * from './b';\nexport declare const a: number;")
            .unwrap();
        program
            .add_source("/pkg/typings/b.d.ts", "export * from './a';\nexport declare const b: number;")
            .unwrap();
        let index = DtsIndex::build(&program);

        for path in ["/pkg/typings/a.d.ts", "/pkg/typings/b.d.ts"] {
            let file = program.file_by_path(path).unwrap();
            let mut names: Vec<_> = index.exports[&file.id].keys().map(String::as_str).collect();
            names.sort_unstable();
            assert_eq!(names, vec!["a", "b"], "exports of {}", path);
        }
    }
}
