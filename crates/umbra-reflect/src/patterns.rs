//! Stateless recognizers for the shapes emitted by downlevel compilers.
//!
//! Each function looks at one node and either extracts the pieces of a known
//! shape or returns `None`. None of them resolve identifiers; callers that
//! need to know what an identifier refers to ask a reflection host.

use umbra_parser::swc_ecma_ast as ast;

use crate::model::{EnumMember, KnownDeclaration};

/// Static properties that carry decorator metadata rather than members.
pub const DECORATOR_PROPERTIES: &[&str] = &["decorators", "propDecorators", "ctorParameters"];

pub fn ident_name(ident: &ast::Ident) -> &str {
    &ident.sym
}

/// Remove any number of wrapping parentheses.
pub fn strip_parens(mut expr: &ast::Expr) -> &ast::Expr {
    while let ast::Expr::Paren(paren) = expr {
        expr = &paren.expr;
    }
    expr
}

pub fn as_ident(expr: &ast::Expr) -> Option<&ast::Ident> {
    match strip_parens(expr) {
        ast::Expr::Ident(ident) => Some(ident),
        _ => None,
    }
}

pub fn is_ident(expr: &ast::Expr, name: &str) -> bool {
    as_ident(expr).map_or(false, |ident| ident_name(ident) == name)
}

pub fn string_value(expr: &ast::Expr) -> Option<&str> {
    match strip_parens(expr) {
        ast::Expr::Lit(ast::Lit::Str(s)) => s.value.as_str(),
        _ => None,
    }
}

/// `undefined` or `void 0`
pub fn is_undefined(expr: &ast::Expr) -> bool {
    match strip_parens(expr) {
        ast::Expr::Ident(ident) => ident_name(ident) == "undefined",
        ast::Expr::Unary(unary) => unary.op == ast::UnaryOp::Void,
        _ => false,
    }
}

pub fn is_null(expr: &ast::Expr) -> bool {
    matches!(strip_parens(expr), ast::Expr::Lit(ast::Lit::Null(_)))
}

pub fn prop_name(name: &ast::PropName) -> Option<String> {
    match name {
        ast::PropName::Ident(ident) => Some(ident.sym.to_string()),
        ast::PropName::Str(s) => s.value.as_str().map(str::to_string),
        ast::PropName::Num(n) => Some(n.value.to_string()),
        ast::PropName::Computed(computed) => string_value(&computed.expr).map(str::to_string),
        ast::PropName::BigInt(_) => None,
    }
}

/// The static name of a member access: `a.b` or `a["b"]`.
pub fn member_name(member: &ast::MemberExpr) -> Option<&str> {
    match &member.prop {
        ast::MemberProp::Ident(ident) => Some(&*ident.sym),
        ast::MemberProp::Computed(computed) => string_value(&computed.expr),
        ast::MemberProp::PrivateName(_) => None,
    }
}

pub fn as_member(expr: &ast::Expr) -> Option<&ast::MemberExpr> {
    match strip_parens(expr) {
        ast::Expr::Member(member) => Some(member),
        _ => None,
    }
}

pub fn as_call(expr: &ast::Expr) -> Option<&ast::CallExpr> {
    match strip_parens(expr) {
        ast::Expr::Call(call) => Some(call),
        _ => None,
    }
}

pub fn callee_expr(call: &ast::CallExpr) -> Option<&ast::Expr> {
    match &call.callee {
        ast::Callee::Expr(callee) => Some(strip_parens(callee)),
        _ => None,
    }
}

/// Plain call arguments; `None` when any argument is spread.
pub fn plain_args(call: &ast::CallExpr) -> Option<Vec<&ast::Expr>> {
    call.args
        .iter()
        .map(|arg| match arg.spread {
            Some(_) => None,
            None => Some(&*arg.expr),
        })
        .collect()
}

pub fn expr_of_stmt(stmt: &ast::Stmt) -> Option<&ast::Expr> {
    match stmt {
        ast::Stmt::Expr(expr_stmt) => Some(strip_parens(&expr_stmt.expr)),
        _ => None,
    }
}

/// A plain `=` assignment, looking through parentheses.
pub fn as_assignment(expr: &ast::Expr) -> Option<&ast::AssignExpr> {
    match strip_parens(expr) {
        ast::Expr::Assign(assign) if assign.op == ast::AssignOp::Assign => Some(assign),
        _ => None,
    }
}

pub fn assign_target_ident(assign: &ast::AssignExpr) -> Option<&ast::Ident> {
    match &assign.left {
        ast::AssignTarget::Simple(ast::SimpleAssignTarget::Ident(binding)) => Some(&binding.id),
        _ => None,
    }
}

pub fn assign_target_member(assign: &ast::AssignExpr) -> Option<&ast::MemberExpr> {
    match &assign.left {
        ast::AssignTarget::Simple(ast::SimpleAssignTarget::Member(member)) => Some(member),
        _ => None,
    }
}

/// The directive prologue: `'use strict';` and friends.
pub fn is_directive(stmt: &ast::Stmt) -> bool {
    matches!(stmt, ast::Stmt::Expr(e) if matches!(&*e.expr, ast::Expr::Lit(ast::Lit::Str(_))))
}

// ---------------------------------------------------------------------------
// Helper names
// ---------------------------------------------------------------------------

/// Remove a bundler disambiguation suffix: `__spread$1` becomes `__spread`.
pub fn strip_dollar_suffix(name: &str) -> &str {
    match name.rfind('$') {
        Some(pos)
            if pos > 0
                && pos + 1 < name.len()
                && name[pos + 1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            &name[..pos]
        }
        _ => name,
    }
}

/// Recognize a compiler helper by name.
pub fn known_helper(name: &str) -> Option<KnownDeclaration> {
    match strip_dollar_suffix(name) {
        "__assign" => Some(KnownDeclaration::TsHelperAssign),
        "__spread" => Some(KnownDeclaration::TsHelperSpread),
        "__spreadArray" => Some(KnownDeclaration::TsHelperSpreadArray),
        "__spreadArrays" => Some(KnownDeclaration::TsHelperSpreadArrays),
        "__read" => Some(KnownDeclaration::TsHelperRead),
        _ => None,
    }
}

/// The helper name used by a callee: `__decorate`, `tslib_1.__decorate`
/// and `__decorate$1` all name `__decorate`.
pub fn helper_name(callee: &ast::Expr) -> Option<&str> {
    match strip_parens(callee) {
        ast::Expr::Ident(ident) => Some(strip_dollar_suffix(ident_name(ident))),
        ast::Expr::Member(member) if as_ident(&member.obj).is_some() => {
            member_name(member).map(strip_dollar_suffix)
        }
        _ => None,
    }
}

fn is_helper_call<'a>(expr: &'a ast::Expr, name: &str) -> Option<&'a ast::CallExpr> {
    let call = as_call(expr)?;
    (helper_name(callee_expr(call)?)? == name).then_some(call)
}

// ---------------------------------------------------------------------------
// Exports
// ---------------------------------------------------------------------------

/// `exports.NAME` or `exports["NAME"]`
pub fn exports_member(expr: &ast::Expr) -> Option<&str> {
    let member = as_member(expr)?;
    if !is_ident(&member.obj, "exports") {
        return None;
    }
    member_name(member)
}

/// The exported name assigned by `exports.NAME = ...`.
pub fn exports_assignment_target(assign: &ast::AssignExpr) -> Option<&str> {
    if assign.op != ast::AssignOp::Assign {
        return None;
    }
    let member = assign_target_member(assign)?;
    if !is_ident(&member.obj, "exports") {
        return None;
    }
    member_name(member)
}

/// `exports.A = exports.B = value`
#[derive(Debug, Clone)]
pub struct ExportsAssignment<'a> {
    /// Every `exports.X` target in the chain, outermost first
    pub targets: Vec<(&'a str, &'a ast::AssignExpr)>,
    pub value: &'a ast::Expr,
}

pub fn exports_assignment(expr: &ast::Expr) -> Option<ExportsAssignment<'_>> {
    let mut targets = Vec::new();
    let mut current = strip_parens(expr);
    while let Some(assign) = as_assignment(current) {
        match exports_assignment_target(assign) {
            Some(name) => targets.push((name, assign)),
            None => break,
        }
        current = strip_parens(&assign.right);
    }
    if targets.is_empty() {
        return None;
    }
    Some(ExportsAssignment {
        targets,
        value: current,
    })
}

pub fn exports_statement(stmt: &ast::Stmt) -> Option<ExportsAssignment<'_>> {
    exports_assignment(expr_of_stmt(stmt)?)
}

/// `Object.defineProperty(TARGET, "NAME", { ... })`
#[derive(Debug, Clone, Copy)]
pub struct DefineProperty<'a> {
    pub call: &'a ast::CallExpr,
    pub target: &'a ast::Expr,
    pub name: &'a str,
    pub descriptor: &'a ast::ObjectLit,
}

pub fn define_property(expr: &ast::Expr) -> Option<DefineProperty<'_>> {
    let call = as_call(expr)?;
    let callee = as_member(callee_expr(call)?)?;
    if !is_ident(&callee.obj, "Object") || member_name(callee)? != "defineProperty" {
        return None;
    }
    let args = plain_args(call)?;
    if args.len() != 3 {
        return None;
    }
    let descriptor = match strip_parens(args[2]) {
        ast::Expr::Object(object) => object,
        _ => return None,
    };
    Some(DefineProperty {
        call,
        target: strip_parens(args[0]),
        name: string_value(args[1])?,
        descriptor,
    })
}

/// A property of an object literal, with its value expression or function.
#[derive(Debug, Clone, Copy)]
pub enum PropertyValue<'a> {
    Value(&'a ast::KeyValueProp),
    Method(&'a ast::MethodProp),
    Getter(&'a ast::GetterProp),
    Setter(&'a ast::SetterProp),
}

/// Named properties of an object literal in source order, spreads skipped.
pub fn object_properties(object: &ast::ObjectLit) -> Vec<(String, PropertyValue<'_>)> {
    object
        .props
        .iter()
        .filter_map(|prop| match prop {
            ast::PropOrSpread::Prop(prop) => Some(prop),
            ast::PropOrSpread::Spread(_) => None,
        })
        .filter_map(|prop| match &**prop {
            ast::Prop::KeyValue(kv) => Some((prop_name(&kv.key)?, PropertyValue::Value(kv))),
            ast::Prop::Method(method) => {
                Some((prop_name(&method.key)?, PropertyValue::Method(method)))
            }
            ast::Prop::Getter(getter) => {
                Some((prop_name(&getter.key)?, PropertyValue::Getter(getter)))
            }
            ast::Prop::Setter(setter) => {
                Some((prop_name(&setter.key)?, PropertyValue::Setter(setter)))
            }
            ast::Prop::Shorthand(_) | ast::Prop::Assign(_) => None,
        })
        .collect()
}

/// The value of `name: value` in an object literal.
pub fn object_value<'a>(object: &'a ast::ObjectLit, name: &str) -> Option<&'a ast::Expr> {
    object_properties(object)
        .into_iter()
        .find_map(|(key, value)| match value {
            PropertyValue::Value(kv) if key == name => Some(&*kv.value),
            _ => None,
        })
}

/// A function-valued property: `get: function () {}`, `get() {}`, or an arrow.
pub fn object_function<'a>(object: &'a ast::ObjectLit, name: &str) -> Option<FunctionLike<'a>> {
    object_properties(object)
        .into_iter()
        .find_map(|(key, value)| match value {
            _ if key != name => None,
            PropertyValue::Value(kv) => function_like(&kv.value),
            PropertyValue::Method(method) => Some(FunctionLike::Function(&method.function)),
            PropertyValue::Getter(_) | PropertyValue::Setter(_) => None,
        })
}

/// A function expression or an arrow function.
#[derive(Debug, Clone, Copy)]
pub enum FunctionLike<'a> {
    Function(&'a ast::Function),
    Arrow(&'a ast::ArrowExpr),
}

impl<'a> FunctionLike<'a> {
    /// The single returned expression: `return X;` as the only statement, or
    /// an arrow with an expression body.
    pub fn returned_expr(&self) -> Option<&'a ast::Expr> {
        let stmts = match *self {
            FunctionLike::Function(function) => &function.body.as_ref()?.stmts,
            FunctionLike::Arrow(arrow) => match &*arrow.body {
                ast::BlockStmtOrExpr::Expr(expr) => return Some(strip_parens(expr)),
                ast::BlockStmtOrExpr::BlockStmt(block) => &block.stmts,
            },
        };
        match stmts.as_slice() {
            [ast::Stmt::Return(ret)] => ret.arg.as_deref().map(strip_parens),
            _ => None,
        }
    }
}

pub fn function_like(expr: &ast::Expr) -> Option<FunctionLike<'_>> {
    match strip_parens(expr) {
        ast::Expr::Fn(fn_expr) => Some(FunctionLike::Function(&fn_expr.function)),
        ast::Expr::Arrow(arrow) => Some(FunctionLike::Arrow(arrow)),
        _ => None,
    }
}

/// `Object.defineProperty(exports, "NAME", { get: function () { return X; } })`
#[derive(Debug, Clone, Copy)]
pub struct DefinePropertyReexport<'a> {
    pub call: &'a ast::CallExpr,
    pub name: &'a str,
    pub getter_value: &'a ast::Expr,
}

pub fn define_property_reexport(stmt: &ast::Stmt) -> Option<DefinePropertyReexport<'_>> {
    let define = define_property(expr_of_stmt(stmt)?)?;
    if !is_ident(define.target, "exports") {
        return None;
    }
    let getter = object_function(define.descriptor, "get")?;
    Some(DefinePropertyReexport {
        call: define.call,
        name: define.name,
        getter_value: getter.returned_expr()?,
    })
}

/// The module argument of a wildcard re-export.
///
/// Accepted forms:
/// - `__export(X)`
/// - `__exportStar(X, exports)` and `tslib_1.__exportStar(X, exports)`
/// - `for (var p in X) if (!exports.hasOwnProperty(p)) exports[p] = X[p];`
pub fn wildcard_reexport(stmt: &ast::Stmt) -> Option<&ast::Expr> {
    if let ast::Stmt::ForIn(for_in) = stmt {
        return wildcard_loop(for_in);
    }

    let call = as_call(expr_of_stmt(stmt)?)?;
    let args = plain_args(call)?;
    match helper_name(callee_expr(call)?)? {
        "__export" if args.len() == 1 => Some(strip_parens(args[0])),
        "__exportStar" if args.len() == 2 && is_ident(args[1], "exports") => {
            Some(strip_parens(args[0]))
        }
        _ => None,
    }
}

fn wildcard_loop(for_in: &ast::ForInStmt) -> Option<&ast::Expr> {
    let key = match &for_in.left {
        ast::ForHead::VarDecl(var) => match var.decls.as_slice() {
            [decl] => match &decl.name {
                ast::Pat::Ident(ident) => ident_name(&ident.id),
                _ => return None,
            },
            _ => return None,
        },
        ast::ForHead::Pat(pat) => match &**pat {
            ast::Pat::Ident(ident) => ident_name(&ident.id),
            _ => return None,
        },
        _ => return None,
    };
    let source = strip_parens(&for_in.right);

    let mut body: &ast::Stmt = &for_in.body;
    if let ast::Stmt::Block(block) = body {
        match block.stmts.as_slice() {
            [single] => body = single,
            _ => return None,
        }
    }
    if let ast::Stmt::If(if_stmt) = body {
        if if_stmt.alt.is_some() {
            return None;
        }
        body = &*if_stmt.cons;
        if let ast::Stmt::Block(block) = body {
            match block.stmts.as_slice() {
                [single] => body = single,
                _ => return None,
            }
        }
    }

    // exports[p] = X[p]
    let assign = as_assignment(expr_of_stmt(body)?)?;
    let target = assign_target_member(assign)?;
    let value = as_member(&assign.right)?;
    let is_keyed = |member: &ast::MemberExpr| match &member.prop {
        ast::MemberProp::Computed(computed) => is_ident(&computed.expr, key),
        _ => false,
    };
    if !is_ident(&target.obj, "exports") || !is_keyed(target) || !is_keyed(value) {
        return None;
    }
    if !same_reference(&value.obj, source) {
        return None;
    }
    Some(source)
}

/// Structural equality for identifiers and member chains.
fn same_reference(a: &ast::Expr, b: &ast::Expr) -> bool {
    match (strip_parens(a), strip_parens(b)) {
        (ast::Expr::Ident(a), ast::Expr::Ident(b)) => a.sym == b.sym,
        (ast::Expr::Member(a), ast::Expr::Member(b)) => {
            member_name(a).is_some()
                && member_name(a) == member_name(b)
                && same_reference(&a.obj, &b.obj)
        }
        (ast::Expr::Call(a), ast::Expr::Call(b)) => {
            require_call_expr(a).is_some() && require_call_expr(a) == require_call_expr(b)
        }
        _ => false,
    }
}

/// `require('x')`: exactly one string argument.
pub fn require_call(expr: &ast::Expr) -> Option<&str> {
    require_call_expr(as_call(expr)?)
}

fn require_call_expr(call: &ast::CallExpr) -> Option<&str> {
    if !is_ident(callee_expr(call)?, "require") {
        return None;
    }
    match plain_args(call)?.as_slice() {
        [arg] => string_value(arg),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Classes
// ---------------------------------------------------------------------------

/// Strip `A_1 = B_1 = <impl>` and return the aliases with the implementation.
pub fn alias_chain(expr: &ast::Expr) -> (Vec<&ast::Ident>, &ast::Expr) {
    let mut aliases = Vec::new();
    let mut current = strip_parens(expr);
    while let Some(assign) = as_assignment(current) {
        match assign_target_ident(assign) {
            Some(ident) => aliases.push(ident),
            None => break,
        }
        current = strip_parens(&assign.right);
    }
    (aliases, current)
}

/// An immediately invoked function expression.
#[derive(Debug, Clone, Copy)]
pub struct Iife<'a> {
    pub call: &'a ast::CallExpr,
    pub function: &'a ast::Function,
}

/// `(function () {...}())`, `(function () {...})()` and `!function () {...}()`.
pub fn iife(expr: &ast::Expr) -> Option<Iife<'_>> {
    let expr = match strip_parens(expr) {
        ast::Expr::Unary(unary) if unary.op == ast::UnaryOp::Bang => strip_parens(&unary.arg),
        other => other,
    };
    let call = as_call(expr)?;
    match callee_expr(call)? {
        ast::Expr::Fn(fn_expr) => Some(Iife {
            call,
            function: &fn_expr.function,
        }),
        _ => None,
    }
}

/// A downleveled class:
///
/// ```js
/// var Foo = Foo_1 = /** @class */ (function (_super) {
///     __extends(Foo, _super);
///     function Foo() {}
///     return Foo;
/// }(Base));
/// ```
#[derive(Debug, Clone)]
pub struct ClassIife<'a> {
    pub iife: Iife<'a>,
    pub inner: &'a ast::FnDecl,
    pub aliases: Vec<&'a ast::Ident>,
}

pub fn class_iife(expr: &ast::Expr) -> Option<ClassIife<'_>> {
    let (aliases, implementation) = alias_chain(expr);
    let iife = iife(implementation)?;
    let stmts = &iife.function.body.as_ref()?.stmts;

    let returned = match stmts.last()? {
        ast::Stmt::Return(ret) => as_ident(ret.arg.as_deref()?)?,
        _ => return None,
    };
    let inner = stmts.iter().find_map(|stmt| match stmt {
        ast::Stmt::Decl(ast::Decl::Fn(fn_decl)) if fn_decl.ident.sym == returned.sym => {
            Some(fn_decl)
        }
        _ => None,
    })?;

    Some(ClassIife {
        iife,
        inner,
        aliases,
    })
}

/// `{ type: Ident | ns.Ident, args: [...] }` from a decorator metadata array.
#[derive(Debug, Clone)]
pub struct DecoratorObject<'a> {
    pub node: &'a ast::Expr,
    pub type_expr: &'a ast::Expr,
    /// Empty when `args` is absent or not an array literal
    pub args: Vec<&'a ast::Expr>,
}

/// An identifier or a member chain ending in an identifier.
pub fn is_reference(expr: &ast::Expr) -> bool {
    match strip_parens(expr) {
        ast::Expr::Ident(_) => true,
        ast::Expr::Member(member) => {
            matches!(member.prop, ast::MemberProp::Ident(_)) && is_reference(&member.obj)
        }
        _ => false,
    }
}

pub fn decorator_object(expr: &ast::Expr) -> Option<DecoratorObject<'_>> {
    let object = match strip_parens(expr) {
        ast::Expr::Object(object) => object,
        _ => return None,
    };
    let type_expr = strip_parens(object_value(object, "type")?);
    if !is_reference(type_expr) {
        return None;
    }
    let args = object_value(object, "args")
        .and_then(array_elements)
        .unwrap_or_default();
    Some(DecoratorObject {
        node: expr,
        type_expr,
        args,
    })
}

/// Elements of an array literal; holes and spreads are skipped.
pub fn array_elements(expr: &ast::Expr) -> Option<Vec<&ast::Expr>> {
    match strip_parens(expr) {
        ast::Expr::Array(array) => Some(
            array
                .elems
                .iter()
                .flatten()
                .filter(|elem| elem.spread.is_none())
                .map(|elem| &*elem.expr)
                .collect(),
        ),
        _ => None,
    }
}

/// `NAME.prop = value` where NAME is one of `names`.
#[derive(Debug, Clone, Copy)]
pub struct StaticAssignment<'a> {
    pub assign: &'a ast::AssignExpr,
    pub property: &'a str,
    pub value: &'a ast::Expr,
    /// True for `NAME.prototype.prop = value`
    pub on_prototype: bool,
}

pub fn static_assignment<'a>(stmt: &'a ast::Stmt, names: &[&str]) -> Option<StaticAssignment<'a>> {
    let assign = as_assignment(expr_of_stmt(stmt)?)?;
    let target = assign_target_member(assign)?;
    let property = member_name(target)?;
    let (_, value) = alias_chain(&assign.right);

    if let Some(owner) = as_ident(&target.obj) {
        if names.contains(&ident_name(owner)) && property != "prototype" {
            return Some(StaticAssignment {
                assign,
                property,
                value,
                on_prototype: false,
            });
        }
        return None;
    }
    if is_prototype_of(&target.obj, names) {
        return Some(StaticAssignment {
            assign,
            property,
            value,
            on_prototype: true,
        });
    }
    None
}

/// `NAME.prototype`
pub fn is_prototype_of(expr: &ast::Expr, names: &[&str]) -> bool {
    as_member(expr).map_or(false, |member| {
        member_name(member) == Some("prototype")
            && as_ident(&member.obj).map_or(false, |owner| names.contains(&ident_name(owner)))
    })
}

/// `Object.defineProperty(NAME.prototype, "x", { get: ..., set: ... })`
#[derive(Debug, Clone, Copy)]
pub struct PropertyAccessor<'a> {
    pub call: &'a ast::CallExpr,
    pub name: &'a str,
    pub is_static: bool,
    pub getter: Option<&'a ast::Function>,
    pub setter: Option<&'a ast::Function>,
}

pub fn property_accessor<'a>(stmt: &'a ast::Stmt, names: &[&str]) -> Option<PropertyAccessor<'a>> {
    let define = define_property(expr_of_stmt(stmt)?)?;
    let is_static = match as_ident(define.target) {
        Some(owner) if names.contains(&ident_name(owner)) => true,
        Some(_) => return None,
        None if is_prototype_of(define.target, names) => false,
        None => return None,
    };
    let function_of = |name: &str| match object_function(define.descriptor, name)? {
        FunctionLike::Function(function) => Some(function),
        FunctionLike::Arrow(_) => None,
    };
    let getter = function_of("get");
    let setter = function_of("set");
    if getter.is_none() && setter.is_none() {
        return None;
    }
    Some(PropertyAccessor {
        call: define.call,
        name: define.name,
        is_static,
        getter,
        setter,
    })
}

// ---------------------------------------------------------------------------
// Decorator helpers
// ---------------------------------------------------------------------------

/// A `__decorate([...], target, ...)` call.
#[derive(Debug, Clone)]
pub struct DecorateCall<'a> {
    pub call: &'a ast::CallExpr,
    pub decorators: Vec<&'a ast::Expr>,
    pub target: &'a ast::Expr,
    /// The member key for member decorators
    pub member: Option<&'a str>,
}

pub fn decorate_call(expr: &ast::Expr) -> Option<DecorateCall<'_>> {
    let call = is_helper_call(expr, "__decorate")?;
    let args = plain_args(call)?;
    if args.len() < 2 {
        return None;
    }
    let member = match args.get(2) {
        Some(key) => Some(string_value(key)?),
        None => None,
    };
    Some(DecorateCall {
        call,
        decorators: array_elements(args[0])?,
        target: strip_parens(args[1]),
        member,
    })
}

/// `NAME = __decorate([...], NAME)`, possibly through an alias chain.
pub fn class_decorate_statement<'a>(stmt: &'a ast::Stmt, names: &[&str]) -> Option<DecorateCall<'a>> {
    let assign = as_assignment(expr_of_stmt(stmt)?)?;
    let target = assign_target_ident(assign)?;
    if !names.contains(&ident_name(target)) {
        return None;
    }
    let (_, value) = alias_chain(&assign.right);
    let decorate = decorate_call(value)?;
    let decorated = as_ident(decorate.target)?;
    (names.contains(&ident_name(decorated)) && decorate.member.is_none()).then_some(decorate)
}

/// `__decorate([...], NAME.prototype, "key", null)` or with `NAME` for statics.
pub fn member_decorate_statement<'a>(
    stmt: &'a ast::Stmt,
    names: &[&str],
) -> Option<(DecorateCall<'a>, bool)> {
    let decorate = decorate_call(expr_of_stmt(stmt)?)?;
    decorate.member?;
    let is_static = match as_ident(decorate.target) {
        Some(owner) if names.contains(&ident_name(owner)) => true,
        Some(_) => return None,
        None if is_prototype_of(decorate.target, names) => false,
        None => return None,
    };
    Some((decorate, is_static))
}

/// `__param(0, Inject(X))`
pub fn param_decorator(expr: &ast::Expr) -> Option<(usize, &ast::Expr)> {
    let call = is_helper_call(expr, "__param")?;
    match plain_args(call)?.as_slice() {
        [index, decorator] => match strip_parens(index) {
            ast::Expr::Lit(ast::Lit::Num(n))
                if n.value >= 0.0 && n.value <= f64::from(u32::MAX) && n.value.fract() == 0.0 =>
            {
                Some((n.value as usize, strip_parens(decorator)))
            }
            _ => None,
        },
        _ => None,
    }
}

/// `__metadata("design:paramtypes", [...])`
pub fn metadata_call(expr: &ast::Expr) -> Option<(&str, &ast::Expr)> {
    let call = is_helper_call(expr, "__metadata")?;
    match plain_args(call)?.as_slice() {
        [key, value] => Some((string_value(key)?, strip_parens(value))),
        _ => None,
    }
}

/// A decorator application as written in a `__decorate` array or in native
/// decorator syntax: `Dec(args)` or a bare `Dec`.
pub fn decorator_application(expr: &ast::Expr) -> Option<(&ast::Expr, Vec<&ast::Expr>)> {
    match strip_parens(expr) {
        ast::Expr::Call(call) => {
            let callee = callee_expr(call)?;
            is_reference(callee).then(|| (callee, plain_args(call).unwrap_or_default()))
        }
        other if is_reference(other) => Some((other, Vec::new())),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Constructors
// ---------------------------------------------------------------------------

/// The argument list forwarded by a synthesized super call:
/// `_super !== null && _super.apply(this, ARGS) || this` or
/// `_super.apply(this, ARGS) || this`.
pub fn super_apply_arguments(expr: &ast::Expr) -> Option<&ast::Expr> {
    let bin = match strip_parens(expr) {
        ast::Expr::Bin(bin) if bin.op == ast::BinaryOp::LogicalOr => bin,
        _ => return None,
    };
    if !matches!(strip_parens(&bin.right), ast::Expr::This(_)) {
        return None;
    }
    let apply = match strip_parens(&bin.left) {
        ast::Expr::Bin(guard) if guard.op == ast::BinaryOp::LogicalAnd => {
            if !is_super_null_check(&guard.left) {
                return None;
            }
            strip_parens(&guard.right)
        }
        other => other,
    };

    let call = as_call(apply)?;
    let callee = as_member(callee_expr(call)?)?;
    if member_name(callee)? != "apply" || as_ident(&callee.obj).is_none() {
        return None;
    }
    match plain_args(call)?.as_slice() {
        [this, args] if matches!(strip_parens(this), ast::Expr::This(_)) => {
            Some(strip_parens(args))
        }
        _ => None,
    }
}

fn is_super_null_check(expr: &ast::Expr) -> bool {
    match strip_parens(expr) {
        ast::Expr::Bin(bin) => {
            matches!(bin.op, ast::BinaryOp::NotEqEq | ast::BinaryOp::NotEq)
                && as_ident(&bin.left).is_some()
                && is_null(&bin.right)
        }
        _ => false,
    }
}

/// The forwarded arguments of a constructor body that only delegates to its
/// base class. Accepted bodies start with either
/// `return <super call>;` or `var _this = <super call>;` (then any number
/// of `_this.x = ...;` statements and a final `return _this;`).
pub fn synthesized_super_call(stmts: &[ast::Stmt]) -> Option<&ast::Expr> {
    match stmts.first()? {
        ast::Stmt::Return(ret) => super_apply_arguments(ret.arg.as_deref()?),
        ast::Stmt::Decl(ast::Decl::Var(var)) => {
            let [decl] = var.decls.as_slice() else {
                return None;
            };
            let this_name = match &decl.name {
                ast::Pat::Ident(ident) => ident_name(&ident.id),
                _ => return None,
            };
            let args = super_apply_arguments(decl.init.as_deref()?)?;

            let (last, middle) = stmts[1..].split_last()?;
            let returns_this = matches!(last, ast::Stmt::Return(ret)
                if ret.arg.as_deref().map_or(false, |arg| is_ident(arg, this_name)));
            let assigns_this = middle.iter().all(|stmt| {
                expr_of_stmt(stmt)
                    .and_then(as_assignment)
                    .and_then(assign_target_member)
                    .map_or(false, |member| is_ident(&member.obj, this_name))
            });
            (returns_this && assigns_this).then_some(args)
        }
        _ => None,
    }
}

/// `super(...arguments)` as the first statement of a native constructor.
pub fn is_native_super_spread(stmts: &[ast::Stmt]) -> bool {
    let Some(call) = stmts.first().and_then(expr_of_stmt).and_then(as_call) else {
        return false;
    };
    matches!(call.callee, ast::Callee::Super(_))
        && matches!(call.args.as_slice(), [arg] if arg.spread.is_some() && is_ident(&arg.expr, "arguments"))
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// `(function (E) { E[E["A"] = 0] = "A"; })(E || (E = {}))` and the UMD
/// variants `(E = exports.E || (exports.E = {}))` and
/// `(exports.E || (exports.E = {}))`.
#[derive(Debug, Clone)]
pub struct EnumIife<'a> {
    pub iife: Iife<'a>,
    pub param: &'a ast::Ident,
    /// The local the enum object is stored in, if any
    pub local: Option<&'a ast::Ident>,
    /// The exported name, for `exports.E || (exports.E = {})`
    pub exported: Option<&'a str>,
    pub members: Vec<EnumMember<'a>>,
}

pub fn enum_iife(stmt: &ast::Stmt) -> Option<EnumIife<'_>> {
    let iife = iife(expr_of_stmt(stmt)?)?;
    let param = match iife.function.params.as_slice() {
        [param] => match &param.pat {
            ast::Pat::Ident(ident) => &ident.id,
            _ => return None,
        },
        _ => return None,
    };
    let (local, exported) = match plain_args(iife.call)?.as_slice() {
        [arg] => enum_argument(arg)?,
        _ => return None,
    };

    let stmts = &iife.function.body.as_ref()?.stmts;
    let members = stmts
        .iter()
        .map(|stmt| enum_member(stmt, ident_name(param)))
        .collect::<Option<Vec<_>>>()?;
    if members.is_empty() {
        return None;
    }
    Some(EnumIife {
        iife,
        param,
        local,
        exported,
        members,
    })
}

type EnumTarget<'a> = (Option<&'a ast::Ident>, Option<&'a str>);

fn enum_argument(arg: &ast::Expr) -> Option<EnumTarget<'_>> {
    // E = exports.E || (exports.E = {})
    if let Some(assign) = as_assignment(arg) {
        let local = assign_target_ident(assign)?;
        let (inner_local, exported) = enum_argument(&assign.right)?;
        if inner_local.is_some() {
            return None;
        }
        return Some((Some(local), exported));
    }

    let bin = match strip_parens(arg) {
        ast::Expr::Bin(bin) if bin.op == ast::BinaryOp::LogicalOr => bin,
        _ => return None,
    };
    let init = as_assignment(&bin.right)?;
    if !matches!(strip_parens(&init.right), ast::Expr::Object(o) if o.props.is_empty()) {
        return None;
    }
    match (as_ident(&bin.left), exports_member(&bin.left)) {
        (Some(local), _) if assign_target_ident(init).map(|t| t.sym == local.sym) == Some(true) => {
            Some((Some(local), None))
        }
        (_, Some(name)) if exports_assignment_target(init) == Some(name) => Some((None, Some(name))),
        _ => None,
    }
}

/// `E[E["A"] = 0] = "A";` or `E["A"] = "a";`
fn enum_member<'a>(stmt: &'a ast::Stmt, param: &str) -> Option<EnumMember<'a>> {
    let assign = as_assignment(expr_of_stmt(stmt)?)?;
    let target = assign_target_member(assign)?;
    if !is_ident(&target.obj, param) {
        return None;
    }
    let key = match &target.prop {
        ast::MemberProp::Computed(computed) => strip_parens(&computed.expr),
        ast::MemberProp::Ident(ident) => {
            return Some(EnumMember {
                name: ident.sym.to_string(),
                initializer: strip_parens(&assign.right),
            })
        }
        ast::MemberProp::PrivateName(_) => return None,
    };

    if let Some(name) = string_value(key) {
        return Some(EnumMember {
            name: name.to_string(),
            initializer: strip_parens(&assign.right),
        });
    }

    // E[E["A"] = 0] = "A"
    let inner = as_assignment(key)?;
    let inner_target = assign_target_member(inner)?;
    if !is_ident(&inner_target.obj, param) {
        return None;
    }
    Some(EnumMember {
        name: member_name(inner_target)?.to_string(),
        initializer: strip_parens(&inner.right),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_parser::parse_javascript;

    fn statements(source: &str) -> Vec<ast::Stmt> {
        match parse_javascript(source, "test.js").unwrap() {
            ast::Program::Script(script) => script.body,
            ast::Program::Module(module) => module
                .body
                .into_iter()
                .filter_map(|item| match item {
                    ast::ModuleItem::Stmt(stmt) => Some(stmt),
                    ast::ModuleItem::ModuleDecl(_) => None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_strip_dollar_suffix() {
        assert_eq!(strip_dollar_suffix("__spread$1"), "__spread");
        assert_eq!(strip_dollar_suffix("__spread$12"), "__spread");
        assert_eq!(strip_dollar_suffix("__spread"), "__spread");
        assert_eq!(strip_dollar_suffix("a$b"), "a$b");
        assert_eq!(strip_dollar_suffix("$1"), "$1");
    }

    #[test]
    fn test_known_helper() {
        assert_eq!(known_helper("__assign"), Some(KnownDeclaration::TsHelperAssign));
        assert_eq!(known_helper("__spreadArray$2"), Some(KnownDeclaration::TsHelperSpreadArray));
        assert_eq!(known_helper("__spreadArrays"), Some(KnownDeclaration::TsHelperSpreadArrays));
        assert_eq!(known_helper("__read"), Some(KnownDeclaration::TsHelperRead));
        assert_eq!(known_helper("__extends"), None);
    }

    #[test]
    fn test_exports_assignment_chain() {
        let stmts = statements("exports.b = exports.a = void 0;");
        let assignment = exports_statement(&stmts[0]).unwrap();
        let names: Vec<_> = assignment.targets.iter().map(|(name, _)| *name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert!(is_undefined(assignment.value));

        let stmts = statements("(exports.c = 1);");
        assert!(exports_statement(&stmts[0]).is_some());

        let stmts = statements("module.exports.c = 1;");
        assert!(exports_statement(&stmts[0]).is_none());
    }

    #[test]
    fn test_define_property_reexport() {
        let stmts = statements(
            r#"
            Object.defineProperty(exports, "a", { enumerable: true, get: function () { return b.a; } });
            Object.defineProperty(exports, "c", { get() { return d; } });
            Object.defineProperty(exports, "__esModule", { value: true });
            "#,
        );
        let first = define_property_reexport(&stmts[0]).unwrap();
        assert_eq!(first.name, "a");
        assert!(matches!(first.getter_value, ast::Expr::Member(_)));

        let second = define_property_reexport(&stmts[1]).unwrap();
        assert_eq!(second.name, "c");
        assert!(is_ident(second.getter_value, "d"));

        assert!(define_property_reexport(&stmts[2]).is_none());
    }

    #[test]
    fn test_wildcard_reexport_forms() {
        let stmts = statements(
            r#"
            __export(a);
            __exportStar(require('./b'), exports);
            tslib_1.__exportStar(c, exports);
            for (var p in d) if (!exports.hasOwnProperty(p)) exports[p] = d[p];
            for (var k in e) { exports[k] = e[k]; }
            for (var q in f) if (!exports.hasOwnProperty(q)) exports[q] = g[q];
            __exportStar(h, other);
            "#,
        );
        assert!(is_ident(wildcard_reexport(&stmts[0]).unwrap(), "a"));
        assert_eq!(require_call(wildcard_reexport(&stmts[1]).unwrap()), Some("./b"));
        assert!(is_ident(wildcard_reexport(&stmts[2]).unwrap(), "c"));
        assert!(is_ident(wildcard_reexport(&stmts[3]).unwrap(), "d"));
        assert!(is_ident(wildcard_reexport(&stmts[4]).unwrap(), "e"));
        assert!(wildcard_reexport(&stmts[5]).is_none());
        assert!(wildcard_reexport(&stmts[6]).is_none());
    }

    #[test]
    fn test_require_call() {
        let stmts = statements("require('a'); require(a); require('a', 'b'); req('a');");
        let results: Vec<_> = stmts
            .iter()
            .map(|s| require_call(expr_of_stmt(s).unwrap()))
            .collect();
        assert_eq!(results, vec![Some("a"), None, None, None]);
    }

    #[test]
    fn test_class_iife_with_aliases() {
        let stmts = statements(
            r#"
            var Foo = Foo_1 = (function (_super) {
                __extends(Foo, _super);
                function Foo() {}
                return Foo;
            }(Base));
            var Bar = (function () { function Bar() {} return Bar; })();
            var NotAClass = (function () { return 1; }());
            "#,
        );
        let init = |i: usize| match &stmts[i] {
            ast::Stmt::Decl(ast::Decl::Var(var)) => var.decls[0].init.as_deref().unwrap(),
            _ => unreachable!(),
        };

        let foo = class_iife(init(0)).unwrap();
        assert_eq!(ident_name(&foo.inner.ident), "Foo");
        assert_eq!(foo.aliases.len(), 1);
        assert_eq!(ident_name(foo.aliases[0]), "Foo_1");
        assert_eq!(foo.iife.call.args.len(), 1);

        let bar = class_iife(init(1)).unwrap();
        assert!(bar.aliases.is_empty());
        assert!(bar.iife.function.params.is_empty());

        assert!(class_iife(init(2)).is_none());
    }

    #[test]
    fn test_decorator_object_tolerance() {
        let stmts = statements(
            r#"
            [
                { type: Directive, args: [{ selector: 'a' }] },
                { type: core.Input },
                { type: Output, args: 'not-an-array' },
                { args: [] },
                { type: 'string' },
                Directive,
            ];
            "#,
        );
        let elements = array_elements(expr_of_stmt(&stmts[0]).unwrap()).unwrap();
        let accepted: Vec<_> = elements.iter().filter_map(|e| decorator_object(e)).collect();
        assert_eq!(accepted.len(), 3);
        assert_eq!(accepted[0].args.len(), 1);
        assert!(accepted[1].args.is_empty());
        assert!(accepted[2].args.is_empty());
    }

    #[test]
    fn test_synthesized_super_call_forms() {
        let sources = [
            "function A() { return _super !== null && _super.apply(this, arguments) || this; }",
            "function A() { return _super.apply(this, __spread(arguments)) || this; }",
            "function A() { var _this = _super.apply(this, arguments) || this; _this.x = 1; return _this; }",
        ];
        for source in sources {
            let stmts = statements(source);
            let body = match &stmts[0] {
                ast::Stmt::Decl(ast::Decl::Fn(f)) => &f.function.body.as_ref().unwrap().stmts,
                _ => unreachable!(),
            };
            assert!(synthesized_super_call(body).is_some(), "{}", source);
        }

        let stmts = statements(
            "function A() { var _this = _super.apply(this, arguments) || this; foo(); return _this; }",
        );
        let body = match &stmts[0] {
            ast::Stmt::Decl(ast::Decl::Fn(f)) => &f.function.body.as_ref().unwrap().stmts,
            _ => unreachable!(),
        };
        assert!(synthesized_super_call(body).is_none());
    }

    #[test]
    fn test_enum_iife() {
        let stmts = statements(
            r#"
            (function (E) { E[E["A"] = 0] = "A"; E[E["B"] = 1] = "B"; })(E || (E = {}));
            (function (S) { S["X"] = "x"; })(S = exports.S || (exports.S = {}));
            (function (T) { T["Y"] = "y"; })(exports.T || (exports.T = {}));
            (function (N) { console.log(N); })(N || (N = {}));
            (function (Z) { Z["A"] = 0; })();
            "#,
        );

        let e = enum_iife(&stmts[0]).unwrap();
        assert_eq!(ident_name(e.local.unwrap()), "E");
        let names: Vec<_> = e.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);

        let s = enum_iife(&stmts[1]).unwrap();
        assert_eq!(ident_name(s.local.unwrap()), "S");
        assert_eq!(s.exported, Some("S"));
        assert_eq!(string_value(s.members[0].initializer), Some("x"));

        let t = enum_iife(&stmts[2]).unwrap();
        assert!(t.local.is_none());
        assert_eq!(t.exported, Some("T"));

        assert!(enum_iife(&stmts[3]).is_none());
        assert!(enum_iife(&stmts[4]).is_none());
    }

    #[test]
    fn test_decorate_calls() {
        let stmts = statements(
            r#"
            Foo = Foo_1 = __decorate([Dec(), __metadata("design:paramtypes", [A])], Foo);
            tslib_1.__decorate([Input()], Foo.prototype, "x", void 0);
            __decorate$1([Output()], Foo, "y", null);
            "#,
        );
        let class_decorate = class_decorate_statement(&stmts[0], &["Foo"]).unwrap();
        assert_eq!(class_decorate.decorators.len(), 2);
        let (key, types) = metadata_call(class_decorate.decorators[1]).unwrap();
        assert_eq!(key, "design:paramtypes");
        assert_eq!(array_elements(types).unwrap().len(), 1);

        let (member, is_static) = member_decorate_statement(&stmts[1], &["Foo"]).unwrap();
        assert_eq!(member.member, Some("x"));
        assert!(!is_static);

        let (member, is_static) = member_decorate_statement(&stmts[2], &["Foo"]).unwrap();
        assert_eq!(member.member, Some("y"));
        assert!(is_static);
    }

    #[test]
    fn test_param_decorator() {
        let stmts = statements("__param(1, Inject(TOKEN));");
        let (index, decorator) = param_decorator(expr_of_stmt(&stmts[0]).unwrap()).unwrap();
        assert_eq!(index, 1);
        let (callee, args) = decorator_application(decorator).unwrap();
        assert!(is_ident(callee, "Inject"));
        assert_eq!(args.len(), 1);

        let stmts = statements("__param(1e20, Inject(A));\n__param(-1, Inject(A));\n__param(0.5, Inject(A));");
        for stmt in &stmts {
            assert!(param_decorator(expr_of_stmt(stmt).unwrap()).is_none());
        }
    }
}
