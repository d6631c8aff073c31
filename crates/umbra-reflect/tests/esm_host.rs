//! ES module host: imports, export tables, native classes and typings.

use std::path::PathBuf;

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{Program, SourceFile};
use umbra_reflect::{
    ClassMemberKind, Declaration, DeclarationKind, DeclarationNode, DtsKind, EsmReflectionHost, Import,
    ReflectionError, ReflectionHost, TypeValueReference,
};

const CORE: &str = r#"
export class Directive {}
export function inject(token) { return token; }
export const VERSION = '1.0.0';
"#;

const LIB: &str = r#"
import { Directive as Dir } from 'core';
import * as core from 'core';
import { Missing } from './nowhere';
export { Dir };
export { inject as injectToken, VERSION } from 'core';
export * from './shared';
export default [core.Directive, Dir, Missing, core.inject];
"#;

const SHARED: &str = r#"
export const shared = 1;
export default 'ignored';
"#;

fn program(files: &[(&str, &str)]) -> Program {
    let mut program = Program::new();
    for (path, source) in files {
        program.add_source(path, source).unwrap();
    }
    program
}

fn file<'a>(program: &'a Program, path: &str) -> &'a SourceFile {
    program.file_by_path(path).unwrap()
}

fn export<'a>(host: &EsmReflectionHost<'a>, file: &'a SourceFile, name: &str) -> Declaration<'a> {
    let table = host.get_exports_of_module(file).unwrap();
    table.get(name).cloned().unwrap_or_else(|| panic!("'{name}' is not exported"))
}

/// Elements of the array a module exports as default.
fn default_elements<'a>(host: &EsmReflectionHost<'a>, file: &'a SourceFile) -> Vec<&'a ast::Expr> {
    let default = export(host, file, "default");
    let Some(ast::Expr::Array(array)) = default.implementation() else {
        panic!("default export is not an array literal");
    };
    array.elems.iter().flatten().map(|element| &*element.expr).collect()
}

fn library() -> Program {
    let mut program = program(&[
        ("/src/lib.js", LIB),
        ("/src/shared.js", SHARED),
        ("/node_modules/core/index.js", CORE),
    ]);
    program.map_path("core", "/node_modules/core/index.js");
    program
}

#[test]
fn test_export_table_order_and_via() {
    let program = library();
    let host = EsmReflectionHost::new(&program);
    let lib = file(&program, "/src/lib.js");

    let table = host.get_exports_of_module(lib).unwrap();
    let names: Vec<_> = table.keys().map(String::as_str).collect();
    assert_eq!(names, vec!["Dir", "injectToken", "VERSION", "shared", "default"]);

    let dir = &table["Dir"];
    assert!(matches!(dir.node, DeclarationNode::Class(_)));
    assert_eq!(dir.via_module.as_deref(), Some("core"));

    let inject = &table["injectToken"];
    assert!(matches!(inject.node, DeclarationNode::Function(_)));
    assert_eq!(inject.via_module.as_deref(), Some("core"));

    // Relative re-exports carry no module name
    assert_eq!(table["shared"].via_module, None);
    assert!(matches!(table["default"].kind, DeclarationKind::Inline { .. }));
}

#[test]
fn test_imports_of_expressions() {
    let program = library();
    let host = EsmReflectionHost::new(&program);
    let elements = default_elements(&host, file(&program, "/src/lib.js"));

    let directive = Some(Import {
        name: "Directive".to_string(),
        from: "core".to_string(),
    });
    assert_eq!(host.get_import_of_expression(elements[0]), directive);
    assert_eq!(host.get_import_of_expression(elements[1]), directive);
    assert_eq!(
        host.get_import_of_expression(elements[2]),
        Some(Import {
            name: "Missing".to_string(),
            from: "./nowhere".to_string(),
        })
    );

    let core = file(&program, "/node_modules/core/index.js");
    let namespaced = host.get_declaration_of_expression(elements[0]).unwrap();
    assert_eq!(namespaced.node, export(&host, core, "Directive").node);
    assert_eq!(namespaced.via_module.as_deref(), Some("core"));

    let function = host.get_declaration_of_expression(elements[3]).unwrap();
    assert!(host.get_definition_of_function(function.node).is_some());
}

#[test]
fn test_unresolved_import_is_missing() {
    let program = library();
    let host = EsmReflectionHost::new(&program);
    let elements = default_elements(&host, file(&program, "/src/lib.js"));

    let ast::Expr::Ident(missing) = elements[2] else {
        panic!("expected an identifier");
    };
    let declaration = host.get_declaration_of_identifier(missing).unwrap();
    assert_eq!(declaration.kind, DeclarationKind::Missing);
    assert!(matches!(declaration.node, DeclarationNode::Import(_)));
}

#[test]
fn test_scripts_have_no_export_table() {
    let program = program(&[("/src/script.js", "var a = 1;")]);
    let host = EsmReflectionHost::new(&program);
    assert!(host.get_exports_of_module(file(&program, "/src/script.js")).is_none());
}

const CLASSES: &str = r#"
import { Directive, Renderer } from 'core';
class Empty {}
class Forwarding extends Base {
    constructor() {
        super(...arguments);
    }
}
class Widget extends Base {
    constructor(renderer, { size }) {
        super();
    }
    ngOnInit() {}
    get size() { return 1; }
    static create() { return new Widget(); }
}
Widget.count = 0;
Widget.decorators = [{ type: Directive, args: [{ selector: 'widget' }] }];
Widget.ctorParameters = () => [{ type: Renderer }, { type: undefined }];
function notAClass() {}
export { Empty, Forwarding, Widget, notAClass };
"#;

#[test]
fn test_native_constructor_parameters() {
    let program = program(&[("/src/classes.js", CLASSES)]);
    let host = EsmReflectionHost::new(&program);
    let classes = file(&program, "/src/classes.js");

    let empty = export(&host, classes, "Empty");
    let params = host.get_constructor_parameters(empty.node).unwrap();
    assert!(params.unwrap().is_empty());

    let forwarding = export(&host, classes, "Forwarding");
    assert!(host.get_constructor_parameters(forwarding.node).unwrap().is_none());

    let widget = export(&host, classes, "Widget");
    let params = host.get_constructor_parameters(widget.node).unwrap().unwrap();
    assert_eq!(params.len(), 2);
    assert_eq!(params[0].name.as_deref(), Some("renderer"));
    assert_eq!(params[1].name, None);
    match &params[0].type_value_reference {
        TypeValueReference::Imported { imported_name, module_name, .. } => {
            assert_eq!(imported_name, "Renderer");
            assert_eq!(module_name, "core");
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_native_class_members_and_decorators() {
    let program = program(&[("/src/classes.js", CLASSES)]);
    let host = EsmReflectionHost::new(&program);
    let widget = export(&host, file(&program, "/src/classes.js"), "Widget");

    assert!(host.has_base_class(widget.node).unwrap());
    assert!(matches!(
        host.get_base_class_expression(widget.node).unwrap(),
        Some(ast::Expr::Ident(_))
    ));
    assert_eq!(host.get_internal_name_of_class(widget.node).unwrap(), "Widget");

    let members = host.get_members_of_class(widget.node).unwrap();
    let summary: Vec<_> = members
        .iter()
        .map(|m| (m.name.as_str(), m.kind, m.is_static))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("constructor", ClassMemberKind::Constructor, false),
            ("ngOnInit", ClassMemberKind::Method, false),
            ("size", ClassMemberKind::Getter, false),
            ("create", ClassMemberKind::Method, true),
            ("count", ClassMemberKind::Property, true),
        ]
    );

    let decorators = host.get_decorators_of_declaration(widget.node).unwrap().unwrap();
    assert_eq!(decorators.len(), 1);
    assert_eq!(decorators[0].name, "Directive");
    assert_eq!(decorators[0].import.as_ref().map(|i| i.from.as_str()), Some("core"));

    let empty = export(&host, file(&program, "/src/classes.js"), "Empty");
    assert!(!host.has_base_class(empty.node).unwrap());
    assert!(host.get_decorators_of_declaration(empty.node).unwrap().is_none());
}

#[test]
fn test_class_operations_reject_functions() {
    let program = program(&[("/src/classes.js", CLASSES)]);
    let host = EsmReflectionHost::new(&program);
    let function = export(&host, file(&program, "/src/classes.js"), "notAClass");

    assert!(!host.is_class(function.node));
    assert!(matches!(
        host.get_constructor_parameters(function.node),
        Err(ReflectionError::NotAClass { operation: "get_constructor_parameters", .. })
    ));
}

#[test]
fn test_dts_without_typings_root() {
    let program = library();
    let host = EsmReflectionHost::new(&program);
    let core = file(&program, "/node_modules/core/index.js");
    let directive = export(&host, core, "Directive");
    assert_eq!(host.get_dts_declaration(&directive), Ok(None));
}

#[test]
fn test_dts_declarations() {
    let mut program = program(&[
        ("/pkg/src/lib.js", LIB),
        ("/pkg/src/shared.js", SHARED),
        ("/node_modules/core/index.js", CORE),
        ("/pkg/typings/shared.d.ts", "export declare const shared: number;"),
        (
            "/pkg/typings/index.d.ts",
            "export { Directive as Dir } from './directive';\nexport declare const shared: string;",
        ),
        ("/pkg/typings/directive.d.ts", "export declare class Directive {}"),
    ]);
    program.map_path("core", "/node_modules/core/index.js");
    program.set_source_root("/pkg/src");
    program.set_typings_root("/pkg/typings");
    let host = EsmReflectionHost::new(&program);
    let lib = file(&program, "/pkg/src/lib.js");
    let shared_js = file(&program, "/pkg/src/shared.js");

    // The sibling typings file wins over the entry point
    let shared = export(&host, shared_js, "shared");
    let dts = host.get_dts_declaration(&shared).unwrap().unwrap();
    assert_eq!(dts.kind, DtsKind::Variable);
    assert_eq!(dts.path, PathBuf::from("/pkg/typings/shared.d.ts"));

    // Names the entry point re-exports are found through it
    let elements = default_elements(&host, lib);
    let ast::Expr::Ident(dir) = elements[1] else {
        panic!("expected an identifier");
    };
    let dir_local = Declaration::concrete(DeclarationNode::Ident(dir));
    let dts = host.get_dts_declaration(&dir_local).unwrap().unwrap();
    assert_eq!(dts.kind, DtsKind::Class);
    assert_eq!(dts.name, "Directive");
    assert_eq!(dts.path, PathBuf::from("/pkg/typings/directive.d.ts"));

    let default = export(&host, lib, "default");
    assert!(matches!(
        host.get_dts_declaration(&default),
        Err(ReflectionError::UnnamedDeclaration { .. })
    ));

    let ast::Expr::Ident(missing) = elements[2] else {
        panic!("expected an identifier");
    };
    let missing = host.get_declaration_of_identifier(missing).unwrap();
    assert!(matches!(
        host.get_dts_declaration(&missing),
        Err(ReflectionError::UnresolvedDeclaration { .. })
    ));
}
