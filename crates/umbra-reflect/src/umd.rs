//! Recognition of the universal module wrapper.
//!
//! ```js
//! (function (global, factory) {
//!     typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require('a')) :
//!     typeof define === 'function' && define.amd ? define('lib', ['exports', 'a'], factory) :
//!     (global = global || self, factory(global.lib = {}, global.a));
//! }(this, (function (exports, a) { 'use strict'; ... })));
//! ```

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::SourceFile;

use crate::patterns::{
    array_elements, callee_expr, expr_of_stmt, ident_name, iife, is_directive, is_ident,
    plain_args, require_call, string_value, strip_parens,
};

/// A factory parameter bound to a `require(...)` dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UmdImport<'a> {
    pub parameter: &'a ast::Ident,
    /// Position of the parameter in the factory signature
    pub index: usize,
    pub specifier: &'a str,
}

/// The branch of the wrapper a factory call sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FactoryBranch {
    CommonJs,
    Amd,
    Global,
}

/// A place the wrapper hands control to the factory.
#[derive(Debug, Clone, Copy)]
pub struct FactoryCall<'a> {
    pub branch: FactoryBranch,
    /// `factory(...)`, or `define(...)` for the AMD branch
    pub call: &'a ast::CallExpr,
}

#[derive(Debug, Clone)]
pub struct UmdModule<'a> {
    pub wrapper_call: &'a ast::CallExpr,
    pub wrapper_fn: &'a ast::Function,
    pub factory_fn: &'a ast::Function,
    pub factory_calls: Vec<FactoryCall<'a>>,
    /// The dependency array passed to `define`, if the AMD branch has one
    pub amd_dependencies: Vec<&'a str>,
    pub imports: Vec<UmdImport<'a>>,
}

impl<'a> UmdModule<'a> {
    pub fn factory_call(&self, branch: FactoryBranch) -> Option<&'a ast::CallExpr> {
        self.factory_calls
            .iter()
            .find(|call| call.branch == branch)
            .map(|call| call.call)
    }

    /// Dependency specifiers in factory parameter order.
    pub fn dependencies(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.imports.iter().map(|import| import.specifier)
    }

    /// The specifier bound to a factory parameter.
    pub fn binding_of(&self, parameter: &str) -> Option<&'a str> {
        self.imports
            .iter()
            .find(|import| ident_name(import.parameter) == parameter)
            .map(|import| import.specifier)
    }

    pub fn import_of_parameter(&self, parameter: &ast::Ident) -> Option<&UmdImport<'a>> {
        self.imports
            .iter()
            .find(|import| import.parameter.span == parameter.span)
    }

    /// The statements of the factory body.
    pub fn statements(&self) -> &'a [ast::Stmt] {
        self.factory_fn
            .body
            .as_ref()
            .map(|body| body.stmts.as_slice())
            .unwrap_or_default()
    }
}

/// The statement a file's wrapper should be found in: the first statement
/// after any directive prologue.
pub fn wrapper_statement(file: &SourceFile) -> Option<&ast::Stmt> {
    file.statements().into_iter().find(|stmt| !is_directive(stmt))
}

pub fn parse_file(file: &SourceFile) -> Option<UmdModule<'_>> {
    parse_wrapper(wrapper_statement(file)?)
}

/// Recognize a universal module wrapper. `None` means the statement is not a
/// wrapper, which callers treat as "not a UMD module".
pub fn parse_wrapper(stmt: &ast::Stmt) -> Option<UmdModule<'_>> {
    let wrapper = iife(expr_of_stmt(stmt)?)?;
    let args = plain_args(wrapper.call)?;

    // The factory is the function-valued argument
    let (factory_index, factory_fn) = args.iter().enumerate().find_map(|(i, arg)| {
        match strip_parens(arg) {
            ast::Expr::Fn(fn_expr) => Some((i, &*fn_expr.function)),
            _ => None,
        }
    })?;
    let factory_param = match &wrapper.function.params.get(factory_index)?.pat {
        ast::Pat::Ident(ident) => ident_name(&ident.id),
        _ => return None,
    };

    let mut factory_calls = Vec::new();
    for stmt in &wrapper.function.body.as_ref()?.stmts {
        collect_stmt(stmt, factory_param, FactoryBranch::Global, &mut factory_calls);
    }
    if factory_calls.is_empty() {
        log::trace!("wrapper never hands control to '{}'", factory_param);
        return None;
    }

    let amd_dependencies = factory_calls
        .iter()
        .find(|call| call.branch == FactoryBranch::Amd)
        .and_then(|call| amd_dependency_array(call.call))
        .unwrap_or_default();

    let imports = factory_calls
        .iter()
        .find(|call| call.branch == FactoryBranch::CommonJs)
        .map(|call| imports_of(factory_fn, call.call))
        .unwrap_or_default();

    Some(UmdModule {
        wrapper_call: wrapper.call,
        wrapper_fn: wrapper.function,
        factory_fn,
        factory_calls,
        amd_dependencies,
        imports,
    })
}

/// Align `require('x')` arguments with factory parameters by position.
/// Parameters without a matching `require` get no entry.
fn imports_of<'a>(factory_fn: &'a ast::Function, call: &'a ast::CallExpr) -> Vec<UmdImport<'a>> {
    call.args
        .iter()
        .enumerate()
        .filter_map(|(index, arg)| {
            let specifier = require_call(&arg.expr)?;
            let parameter = match &factory_fn.params.get(index)?.pat {
                ast::Pat::Ident(ident) => &ident.id,
                _ => return None,
            };
            Some(UmdImport {
                parameter,
                index,
                specifier,
            })
        })
        .collect()
}

fn amd_dependency_array(define: &ast::CallExpr) -> Option<Vec<&str>> {
    plain_args(define)?
        .into_iter()
        .find_map(array_elements)
        .map(|elements| elements.into_iter().filter_map(string_value).collect())
}

fn collect_stmt<'a>(
    stmt: &'a ast::Stmt,
    factory: &str,
    branch: FactoryBranch,
    out: &mut Vec<FactoryCall<'a>>,
) {
    match stmt {
        ast::Stmt::Expr(expr) => collect_expr(&expr.expr, factory, branch, out),
        ast::Stmt::Return(ret) => {
            if let Some(arg) = &ret.arg {
                collect_expr(arg, factory, branch, out);
            }
        }
        ast::Stmt::Block(block) => {
            for stmt in &block.stmts {
                collect_stmt(stmt, factory, branch, out);
            }
        }
        ast::Stmt::If(if_stmt) => {
            let cons_branch = branch_of_test(&if_stmt.test).unwrap_or(branch);
            collect_stmt(&if_stmt.cons, factory, cons_branch, out);
            if let Some(alt) = &if_stmt.alt {
                collect_stmt(alt, factory, branch, out);
            }
        }
        ast::Stmt::Decl(ast::Decl::Var(var)) => {
            for decl in &var.decls {
                if let Some(init) = &decl.init {
                    collect_expr(init, factory, branch, out);
                }
            }
        }
        _ => {}
    }
}

fn collect_expr<'a>(
    expr: &'a ast::Expr,
    factory: &str,
    branch: FactoryBranch,
    out: &mut Vec<FactoryCall<'a>>,
) {
    match strip_parens(expr) {
        ast::Expr::Cond(cond) => {
            let cons_branch = branch_of_test(&cond.test).unwrap_or(branch);
            collect_expr(&cond.cons, factory, cons_branch, out);
            collect_expr(&cond.alt, factory, branch, out);
        }
        ast::Expr::Bin(bin)
            if matches!(bin.op, ast::BinaryOp::LogicalAnd | ast::BinaryOp::LogicalOr) =>
        {
            // `typeof exports === 'object' && factory(exports)`
            let right_branch = match bin.op {
                ast::BinaryOp::LogicalAnd => branch_of_test(&bin.left).unwrap_or(branch),
                _ => branch,
            };
            collect_expr(&bin.left, factory, branch, out);
            collect_expr(&bin.right, factory, right_branch, out);
        }
        ast::Expr::Seq(seq) => {
            for expr in &seq.exprs {
                collect_expr(expr, factory, branch, out);
            }
        }
        ast::Expr::Assign(assign) => collect_expr(&assign.right, factory, branch, out),
        ast::Expr::Call(call) => {
            let Some(callee) = callee_expr(call) else {
                return;
            };
            if is_ident(callee, factory) {
                out.push(FactoryCall { branch, call });
            } else if is_ident(callee, "define") && passes_factory(call, factory) {
                out.push(FactoryCall {
                    branch: FactoryBranch::Amd,
                    call,
                });
            } else {
                for arg in &call.args {
                    collect_expr(&arg.expr, factory, branch, out);
                }
            }
        }
        _ => {}
    }
}

fn passes_factory(call: &ast::CallExpr, factory: &str) -> bool {
    call.args.iter().any(|arg| is_ident(&arg.expr, factory))
}

/// Which module system a wrapper test checks for.
fn branch_of_test(test: &ast::Expr) -> Option<FactoryBranch> {
    let mut names = Vec::new();
    tested_globals(test, &mut names);
    if names.iter().any(|name| *name == "exports" || *name == "module") {
        Some(FactoryBranch::CommonJs)
    } else if names.iter().any(|name| *name == "define") {
        Some(FactoryBranch::Amd)
    } else {
        None
    }
}

/// Globals probed by a test: `typeof X` operands and `define.amd` objects.
fn tested_globals<'a>(expr: &'a ast::Expr, out: &mut Vec<&'a str>) {
    match strip_parens(expr) {
        ast::Expr::Unary(unary) if unary.op == ast::UnaryOp::TypeOf => {
            if let ast::Expr::Ident(ident) = strip_parens(&unary.arg) {
                out.push(ident_name(ident));
            }
        }
        ast::Expr::Bin(bin) => {
            tested_globals(&bin.left, out);
            tested_globals(&bin.right, out);
        }
        ast::Expr::Member(member) => {
            if let ast::Expr::Ident(ident) = strip_parens(&member.obj) {
                out.push(ident_name(ident));
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_parser::Program;

    const CANONICAL: &str = r#"
        (function (global, factory) {
            typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require('@angular/core'), require('./utils')) :
            typeof define === 'function' && define.amd ? define('lib', ['exports', '@angular/core', './utils'], factory) :
            (global = global || self, factory(global.lib = {}, global.ng.core, global.utils));
        }(this, (function (exports, core, utils) { 'use strict';
            exports.a = 1;
        })));
    "#;

    fn parse(source: &str) -> Program {
        let mut program = Program::new();
        program.add_source("/pkg/index.js", source).unwrap();
        program
    }

    #[test]
    fn test_canonical_wrapper() {
        let program = parse(CANONICAL);
        let module = parse_file(program.files().next().unwrap()).unwrap();

        assert_eq!(module.factory_calls.len(), 3);
        assert!(module.factory_call(FactoryBranch::CommonJs).is_some());
        assert!(module.factory_call(FactoryBranch::Amd).is_some());
        assert!(module.factory_call(FactoryBranch::Global).is_some());
        assert_eq!(module.amd_dependencies, vec!["exports", "@angular/core", "./utils"]);

        let deps: Vec<_> = module.dependencies().collect();
        assert_eq!(deps, vec!["@angular/core", "./utils"]);
        assert_eq!(module.binding_of("core"), Some("@angular/core"));
        assert_eq!(module.binding_of("utils"), Some("./utils"));
        assert_eq!(module.binding_of("exports"), None);
        assert_eq!(module.imports[0].index, 1);
        assert_eq!(module.statements().len(), 2);
    }

    #[test]
    fn test_parse_is_idempotent() {
        let program = parse(CANONICAL);
        let file = program.files().next().unwrap();
        let first = parse_file(file).unwrap();
        let second = parse_file(file).unwrap();

        assert_eq!(first.imports, second.imports);
        assert_eq!(first.amd_dependencies, second.amd_dependencies);
        assert_eq!(first.factory_fn.span, second.factory_fn.span);
    }

    #[test]
    fn test_outer_call_parentheses() {
        let program = parse(
            r#"
            (function (root, factory) {
                if (typeof exports === 'object') { factory(exports, require('a')); }
                else if (typeof define === 'function' && define.amd) { define(['exports', 'a'], factory); }
                else { factory(root.lib = {}, root.a); }
            })(this, function (exports, a) {
                exports.b = a.b;
            });
            "#,
        );
        let module = parse_file(program.files().next().unwrap()).unwrap();
        assert_eq!(module.binding_of("a"), Some("a"));
        assert_eq!(module.factory_calls.len(), 3);
    }

    #[test]
    fn test_partial_dependency_list() {
        let program = parse(
            r#"
            (function (global, factory) {
                typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require('a')) :
                typeof define === 'function' && define.amd ? define(['exports', 'a', 'b'], factory) :
                factory(global.lib = {}, global.a, global.b);
            }(this, function (exports, a, b) {}));
            "#,
        );
        let module = parse_file(program.files().next().unwrap()).unwrap();
        assert_eq!(module.imports.len(), 1);
        assert_eq!(module.binding_of("b"), None);
    }

    #[test]
    fn test_not_a_wrapper() {
        let program = parse("exports.a = 1;");
        assert!(parse_file(program.files().next().unwrap()).is_none());

        let program = parse("(function () { var x = 1; }());");
        assert!(parse_file(program.files().next().unwrap()).is_none());
    }

    #[test]
    fn test_directive_prologue_is_skipped() {
        let program = parse(&format!("'use strict';\n{}", CANONICAL));
        assert!(parse_file(program.files().next().unwrap()).is_some());
    }
}
