//! A program mixing ES modules, a UMD bundle and typings.

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::{Program, SourceFile};
use umbra_reflect::{
    Declaration, DeclarationNode, DelegatingReflectionHost, DtsKind, Import, ReflectionHost,
};

const CORE: &str = r#"
export class Component {}
export class Renderer {}
"#;

const WIDGETS: &str = r#"(function (global, factory) {
    typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require('core')) :
    typeof define === 'function' && define.amd ? define('widgets', ['exports', 'core'], factory) :
    (global = global || self, factory(global.widgets = {}, global.core));
}(this, (function (exports, core) { 'use strict';
    var Widget = (function () {
        function Widget(renderer) {}
        Widget.decorators = [{ type: core.Component, args: [{ selector: 'widget' }] }];
        Widget.ctorParameters = function () { return [{ type: core.Renderer }]; };
        return Widget;
    }());
    exports.Widget = Widget;
    Object.defineProperty(exports, "Component", { enumerable: true, get: function () { return core.Component; } });
})));
"#;

const APP: &str = r#"
import { Widget, Component } from 'widgets';
import * as widgets from 'widgets';
export { Widget };
export default [widgets.Widget, Component];
"#;

fn program() -> Program {
    let mut program = Program::new();
    for (path, source) in [
        ("/app/main.js", APP),
        ("/node_modules/widgets/bundles/widgets.umd.js", WIDGETS),
        ("/node_modules/core/index.js", CORE),
        ("/app/typings/index.d.ts", "export declare class Widget {}"),
    ] {
        program.add_source(path, source).unwrap();
    }
    program.map_path("widgets", "/node_modules/widgets/bundles/widgets.umd.js");
    program.map_path("core", "/node_modules/core/index.js");
    program.set_source_root("/app");
    program.set_typings_root("/app/typings");
    program
}

fn file<'a>(program: &'a Program, path: &str) -> &'a SourceFile {
    program.file_by_path(path).unwrap()
}

fn export<'a>(host: &DelegatingReflectionHost<'a>, file: &'a SourceFile, name: &str) -> Declaration<'a> {
    let table = host.get_exports_of_module(file).unwrap();
    table.get(name).cloned().unwrap_or_else(|| panic!("'{name}' is not exported"))
}

#[test]
fn test_esm_import_of_umd_class() {
    let program = program();
    let host = DelegatingReflectionHost::new(&program);
    let app = file(&program, "/app/main.js");
    let bundle = file(&program, "/node_modules/widgets/bundles/widgets.umd.js");

    let widget = export(&host, app, "Widget");
    assert_eq!(widget.node, export(&host, bundle, "Widget").node);
    assert_eq!(widget.via_module.as_deref(), Some("widgets"));
    assert!(host.is_class(widget.node));

    // Class questions about the imported node use the UMD rules
    let decorators = host.get_decorators_of_declaration(widget.node).unwrap().unwrap();
    assert_eq!(decorators.len(), 1);
    assert_eq!(
        decorators[0].import,
        Some(Import {
            name: "Component".to_string(),
            from: "core".to_string(),
        })
    );
    let params = host.get_constructor_parameters(widget.node).unwrap().unwrap();
    assert_eq!(params.len(), 1);
}

#[test]
fn test_umd_reexport_of_esm_class() {
    let program = program();
    let host = DelegatingReflectionHost::new(&program);
    let bundle = file(&program, "/node_modules/widgets/bundles/widgets.umd.js");
    let core = file(&program, "/node_modules/core/index.js");

    let component = export(&host, bundle, "Component");
    assert!(matches!(component.node, DeclarationNode::Class(_)));
    assert_eq!(component.node, export(&host, core, "Component").node);
    assert_eq!(component.via_module.as_deref(), Some("core"));
}

#[test]
fn test_namespace_import_of_umd_bundle() {
    let program = program();
    let host = DelegatingReflectionHost::new(&program);
    let app = file(&program, "/app/main.js");

    let default = export(&host, app, "default");
    let Some(ast::Expr::Array(array)) = default.implementation() else {
        panic!("default export is not an array literal");
    };
    let elements: Vec<&ast::Expr> = array.elems.iter().flatten().map(|e| &*e.expr).collect();

    let widget = host.get_declaration_of_expression(elements[0]).unwrap();
    assert!(host.is_class(widget.node));
    assert_eq!(widget.via_module.as_deref(), Some("widgets"));

    // An import of a re-export crosses both module formats and keeps the
    // innermost module name
    let component = host.get_declaration_of_expression(elements[1]).unwrap();
    assert!(matches!(component.node, DeclarationNode::Class(_)));
    assert_eq!(component.via_module.as_deref(), Some("core"));
}

#[test]
fn test_typings_through_the_delegating_host() {
    let program = program();
    let host = DelegatingReflectionHost::new(&program);
    let app = file(&program, "/app/main.js");

    let typings = file(&program, "/app/typings/index.d.ts");
    assert!(host.get_exports_of_module(typings).is_some());

    let widget = export(&host, app, "Widget");
    let dts = host.get_dts_declaration(&widget).unwrap().unwrap();
    assert_eq!(dts.kind, DtsKind::Class);
    assert_eq!(dts.name, "Widget");
}

#[test]
fn test_sub_hosts_are_reachable() {
    let program = program();
    let host = DelegatingReflectionHost::new(&program);

    assert!(host.umd().is_umd_file(file(&program, "/node_modules/widgets/bundles/widgets.umd.js")));
    assert!(!host.umd().is_umd_file(file(&program, "/app/main.js")));
    assert!(host.esm().get_exports_of_module(file(&program, "/app/main.js")).is_some());
}
