//! A set of parsed files sharing one source map.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use swc_common::{sync::Lrc, BytePos, SourceMap, SourceMapper, Span};
use swc_ecma_ast as ast;
use walkdir::WalkDir;

use crate::error::ParseError;
use crate::{file_kind_for_path, parse_into};

/// Unique identifier for a file in a [`Program`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// Which grammar a file was parsed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Emitted JavaScript (script or module goal)
    JavaScript,
    /// TypeScript declaration file (`.d.ts`)
    Typings,
}

/// A parsed file.
#[derive(Debug)]
pub struct SourceFile {
    /// Identifier within the owning program
    pub id: FileId,
    /// Normalized path the file was registered under
    pub path: PathBuf,
    /// Grammar the file was parsed with
    pub kind: FileKind,
    /// The syntax tree
    pub syntax: ast::Program,
    /// Span covering the whole file in the shared source map
    pub span: Span,
}

impl SourceFile {
    /// Top-level statements, skipping module declarations.
    pub fn statements(&self) -> Vec<&ast::Stmt> {
        match &self.syntax {
            ast::Program::Script(script) => script.body.iter().collect(),
            ast::Program::Module(module) => module
                .body
                .iter()
                .filter_map(|item| match item {
                    ast::ModuleItem::Stmt(stmt) => Some(stmt),
                    ast::ModuleItem::ModuleDecl(_) => None,
                })
                .collect(),
        }
    }

    /// Module items when the file was parsed with the module goal.
    pub fn module_items(&self) -> Option<&[ast::ModuleItem]> {
        match &self.syntax {
            ast::Program::Module(module) => Some(&module.body),
            ast::Program::Script(_) => None,
        }
    }

    /// Whether a source position falls inside this file.
    pub fn contains(&self, pos: BytePos) -> bool {
        self.span.lo <= pos && pos <= self.span.hi
    }

    pub fn is_typings(&self) -> bool {
        self.kind == FileKind::Typings
    }

    /// The path with its `.js` / `.d.ts` extension removed.
    pub fn path_without_extension(&self) -> String {
        let path = self.path.to_string_lossy();
        for ext in [".d.ts", ".umd.js", ".js", ".mjs", ".cjs"] {
            if let Some(stripped) = path.strip_suffix(ext) {
                return stripped.to_string();
            }
        }
        path.into_owned()
    }
}

/// A 1-indexed line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// An in-memory collection of parsed files.
///
/// All files share one SWC source map, so node spans are unique across the
/// whole program and can be used as node identities.
pub struct Program {
    source_map: Lrc<SourceMap>,
    files: Vec<SourceFile>,
    by_path: HashMap<PathBuf, FileId>,
    /// Bare specifier -> file path, consulted before `node_modules` lookup
    path_mappings: BTreeMap<String, PathBuf>,
    source_root: Option<PathBuf>,
    typings_root: Option<PathBuf>,
}

impl Default for Program {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("files", &self.files.iter().map(|f| &f.path).collect::<Vec<_>>())
            .field("path_mappings", &self.path_mappings)
            .field("source_root", &self.source_root)
            .field("typings_root", &self.typings_root)
            .finish()
    }
}

impl Program {
    pub fn new() -> Self {
        Self {
            source_map: Default::default(),
            files: Vec::new(),
            by_path: HashMap::new(),
            path_mappings: BTreeMap::new(),
            source_root: None,
            typings_root: None,
        }
    }

    /// Parse `source` and register it under `path`.
    ///
    /// Registering the same path twice makes the newer file the one that
    /// module resolution finds.
    pub fn add_source(
        &mut self,
        path: impl AsRef<Path>,
        source: impl AsRef<str>,
    ) -> Result<FileId, ParseError> {
        let path = normalize_path(path.as_ref());
        let kind = file_kind_for_path(&path);
        let filename = path.to_string_lossy().into_owned();
        let (syntax, span) = parse_into(&self.source_map, source.as_ref(), &filename, kind)?;

        let id = FileId(self.files.len() as u32);
        log::debug!("registered {} as {:?} ({:?})", filename, id, kind);
        self.by_path.insert(path.clone(), id);
        self.files.push(SourceFile {
            id,
            path,
            kind,
            syntax,
            span,
        });
        Ok(id)
    }

    /// Read and register a file from disk.
    pub fn load_file(&mut self, path: &Path) -> Result<FileId> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Ok(self.add_source(path, source)?)
    }

    /// Register every `.js` and `.d.ts` file below `root`.
    pub fn load_dir(&mut self, root: &Path) -> Result<Vec<FileId>> {
        let mut paths: Vec<PathBuf> = WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .map(|e| e.into_path())
            .filter(|p| p.is_file() && is_reflectable(p))
            .collect();
        paths.sort();

        let mut ids = Vec::with_capacity(paths.len());
        for path in paths {
            ids.push(self.load_file(&path)?);
        }
        Ok(ids)
    }

    pub fn file(&self, id: FileId) -> &SourceFile {
        &self.files[id.0 as usize]
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_by_path(&self, path: impl AsRef<Path>) -> Option<&SourceFile> {
        let path = normalize_path(path.as_ref());
        self.by_path.get(&path).map(|id| self.file(*id))
    }

    /// The file whose text contains `pos`.
    pub fn file_at(&self, pos: BytePos) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.contains(pos))
    }

    /// The source text covered by a span.
    pub fn source_text(&self, span: Span) -> Option<String> {
        self.source_map.span_to_snippet(span).ok()
    }

    pub fn line_column(&self, pos: BytePos) -> LineColumn {
        let loc = self.source_map.lookup_char_pos(pos);
        LineColumn {
            line: loc.line,
            column: loc.col.0 + 1,
        }
    }

    /// Map a bare module specifier to a file path.
    pub fn map_path(&mut self, specifier: impl Into<String>, path: impl AsRef<Path>) {
        self.path_mappings
            .insert(specifier.into(), normalize_path(path.as_ref()));
    }

    pub(crate) fn path_mapping(&self, specifier: &str) -> Option<&Path> {
        self.path_mappings.get(specifier).map(|p| p.as_path())
    }

    pub fn set_source_root(&mut self, root: impl AsRef<Path>) {
        self.source_root = Some(normalize_path(root.as_ref()));
    }

    pub fn source_root(&self) -> Option<&Path> {
        self.source_root.as_deref()
    }

    pub fn set_typings_root(&mut self, root: impl AsRef<Path>) {
        self.typings_root = Some(normalize_path(root.as_ref()));
    }

    pub fn typings_root(&self) -> Option<&Path> {
        self.typings_root.as_deref()
    }

    /// Typings files below the typings root, in registration order.
    pub fn typings_files(&self) -> impl Iterator<Item = &SourceFile> {
        let root = self.typings_root.clone();
        self.files.iter().filter(move |f| {
            f.is_typings()
                && root
                    .as_ref()
                    .map_or(true, |root| f.path.starts_with(root))
        })
    }

    /// Resolve a module specifier written in `from`.
    pub fn resolve_module(&self, specifier: &str, from: &SourceFile) -> Option<&SourceFile> {
        let id = crate::resolve::resolve_module(self, specifier, from)?;
        Some(self.file(id))
    }

    pub(crate) fn lookup_path(&self, path: &Path) -> Option<FileId> {
        self.by_path.get(path).copied()
    }
}

fn is_reflectable(path: &Path) -> bool {
    let name = path.to_string_lossy();
    name.ends_with(".js") || name.ends_with(".d.ts")
}

/// Lexically normalize a path: drop `.` and fold `..` without touching disk.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spans_are_disjoint_between_files() {
        let mut program = Program::new();
        let a = program.add_source("/pkg/a.js", "var a = 1;").unwrap();
        let b = program.add_source("/pkg/b.js", "var b = 2;").unwrap();

        let a = program.file(a);
        let b = program.file(b);
        assert!(a.span.hi < b.span.lo);
        assert_eq!(program.file_at(b.span.lo).map(|f| f.id), Some(b.id));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path(Path::new("/pkg/src/../lib/./a.js")),
            PathBuf::from("/pkg/lib/a.js")
        );
    }

    #[test]
    fn test_source_text_and_position() {
        let mut program = Program::new();
        let id = program.add_source("/a.js", "var a = 1;\nvar b = 2;").unwrap();
        let file = program.file(id);
        let stmts = file.statements();
        assert_eq!(stmts.len(), 2);

        let span = swc_common::Spanned::span(stmts[1]);
        assert_eq!(program.source_text(span).as_deref(), Some("var b = 2;"));
        assert_eq!(program.line_column(span.lo), LineColumn { line: 2, column: 1 });
    }

    #[test]
    fn test_path_without_extension() {
        let mut program = Program::new();
        let js = program.add_source("/pkg/a.js", "").unwrap();
        let dts = program.add_source("/pkg/a.d.ts", "export declare const a: number;").unwrap();
        assert_eq!(program.file(js).path_without_extension(), "/pkg/a");
        assert_eq!(program.file(dts).path_without_extension(), "/pkg/a");
    }

    #[test]
    fn test_load_dir_collects_js_and_typings() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.js"), "exports.a = 1;").unwrap();
        fs::write(dir.path().join("index.d.ts"), "export declare const a: number;").unwrap();
        fs::write(dir.path().join("README.md"), "# docs").unwrap();

        let mut program = Program::new();
        let ids = program.load_dir(dir.path()).unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(program.typings_files().count(), 1);
    }
}
