//! JavaScript parser wrapper using SWC
//!
//! This crate parses downleveled JavaScript bundles and TypeScript declaration
//! files into SWC syntax trees that share one [`SourceMap`], and groups them in
//! a [`Program`] that can resolve module specifiers between files.

mod error;
mod program;
mod resolve;

use std::path::Path;

use swc_common::{input::StringInput, sync::Lrc, FileName, SourceMap};
use swc_ecma_parser::{lexer::Lexer, EsSyntax, Parser, Syntax, TsSyntax};

pub use error::ParseError;
pub use program::{FileId, FileKind, LineColumn, Program, SourceFile};

// Re-export AST types for consumers that need to inspect the AST
pub use swc_ecma_ast;

// Re-export span utilities for consumers that key caches on node positions
pub use swc_common::{BytePos, Span, Spanned};

/// Pick the syntax a file is parsed with from its path.
pub fn file_kind_for_path(path: &Path) -> FileKind {
    if path.to_string_lossy().ends_with(".d.ts") {
        FileKind::Typings
    } else {
        FileKind::JavaScript
    }
}

fn syntax_for(kind: FileKind) -> Syntax {
    match kind {
        FileKind::JavaScript => Syntax::Es(EsSyntax {
            decorators: true,
            decorators_before_export: true,
            ..Default::default()
        }),
        FileKind::Typings => Syntax::Typescript(TsSyntax {
            tsx: false,
            decorators: true,
            dts: true,
            no_early_errors: true,
            disallow_ambiguous_jsx_like: false,
        }),
    }
}

/// Parse a source text into a syntax tree registered in `source_map`.
///
/// The returned span covers the whole file; spans of nodes inside the tree
/// never overlap with spans of other files in the same source map.
pub(crate) fn parse_into(
    source_map: &Lrc<SourceMap>,
    source: &str,
    filename: &str,
    kind: FileKind,
) -> Result<(swc_ecma_ast::Program, Span), ParseError> {
    let source_file = source_map.new_source_file(
        Lrc::new(FileName::Custom(filename.to_string())),
        source.to_string(),
    );

    let lexer = Lexer::new(
        syntax_for(kind),
        swc_ecma_ast::EsVersion::Es2022,
        StringInput::from(&*source_file),
        None,
    );

    let mut parser = Parser::new_from(lexer);

    let program = parser.parse_program().map_err(|e| {
        let loc = source_map.lookup_char_pos(e.span().lo);
        ParseError::Syntax {
            path: filename.to_string(),
            line: loc.line,
            column: loc.col.0 + 1,
            message: e.kind().msg().to_string(),
        }
    })?;

    // Recoverable errors do not prevent reflection; surface them in the log
    for error in parser.take_errors() {
        let loc = source_map.lookup_char_pos(error.span().lo);
        log::warn!(
            "{}:{}:{}: {}",
            filename,
            loc.line,
            loc.col.0 + 1,
            error.kind().msg()
        );
    }

    Ok((program, Span::new(source_file.start_pos, source_file.end_pos)))
}

/// Parse a single JavaScript source into a standalone syntax tree.
///
/// Useful when only one file is inspected; use [`Program::add_source`] when
/// module specifiers need to resolve between files.
pub fn parse_javascript(source: &str, filename: &str) -> Result<swc_ecma_ast::Program, ParseError> {
    let source_map: Lrc<SourceMap> = Default::default();
    parse_into(&source_map, source, filename, FileKind::JavaScript).map(|(program, _)| program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_umd_wrapper() {
        let source = r#"
            (function (global, factory) {
                typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports) :
                typeof define === 'function' && define.amd ? define('lib', ['exports'], factory) :
                (factory(global.lib = {}));
            }(this, (function (exports) { 'use strict';
                exports.a = 1;
            })));
        "#;

        let program = parse_javascript(source, "lib.umd.js").unwrap();
        let body_len = match &program {
            swc_ecma_ast::Program::Script(script) => script.body.len(),
            swc_ecma_ast::Program::Module(module) => module.body.len(),
        };
        assert_eq!(body_len, 1);
    }

    #[test]
    fn test_parse_decorated_class() {
        let source = r#"
            import { Component } from 'core';
            @Component({ selector: 'app' })
            export class App {}
        "#;

        let program = parse_javascript(source, "app.js").unwrap();
        assert!(matches!(program, swc_ecma_ast::Program::Module(_)));
    }

    #[test]
    fn test_parse_error_location() {
        let err = parse_javascript("var x = ;", "broken.js").unwrap_err();
        match err {
            ParseError::Syntax { path, line, .. } => {
                assert_eq!(path, "broken.js");
                assert_eq!(line, 1);
            }
        }
    }

    #[test]
    fn test_file_kind_for_path() {
        assert_eq!(file_kind_for_path(Path::new("/pkg/index.d.ts")), FileKind::Typings);
        assert_eq!(file_kind_for_path(Path::new("/pkg/index.js")), FileKind::JavaScript);
    }
}
