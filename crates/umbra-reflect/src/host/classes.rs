//! Class symbols, members, constructor parameters and function definitions.

use std::rc::Rc;

use umbra_parser::swc_ecma_ast as ast;

use super::decorators::{self, MemberDecorators, ParamInfo};
use super::ReflectionHost;
use crate::error::ReflectionError;
use crate::index::{ClassBody, ClassShape, FileIndex};
use crate::model::{
    ClassMember, ClassMemberKind, ClassSymbol, CtorParameter, DeclarationNode, FunctionDefinition,
    KnownDeclaration, MemberNode, Parameter, ShapeRef, TypeValueReference, ValueUnavailable,
};
use crate::patterns::{
    as_assignment, as_call, as_ident, assign_target_ident, callee_expr, expr_of_stmt, function_like,
    ident_name, is_ident, is_native_super_spread, is_reference, is_undefined, known_helper,
    plain_args, property_accessor, static_assignment, strip_parens, synthesized_super_call,
    FunctionLike, StaticAssignment, DECORATOR_PROPERTIES,
};

/// A class symbol together with the index holding its shape.
pub(crate) struct ResolvedClass<'a> {
    pub symbol: ClassSymbol<'a>,
    index: Rc<FileIndex<'a>>,
}

impl<'a> ResolvedClass<'a> {
    pub fn shape(&self) -> &ClassShape<'a> {
        self.index.class(self.symbol.shape.index)
    }
}

pub(crate) fn class_symbol<'a, H>(host: &H, node: DeclarationNode<'a>) -> Option<ResolvedClass<'a>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let file = host.file_of(node.span())?;
    let index = host.file_index(file);
    let shape_index = index.class_at(node.key()).or_else(|| match node {
        DeclarationNode::Var(declarator) => index.aliased_class(declarator),
        _ => None,
    })?;

    let shape = index.class(shape_index);
    let symbol = ClassSymbol {
        name: shape.name().to_string(),
        declaration: shape.declaration(),
        implementation: shape.implementation(),
        iife: shape.iife().map(|iife| iife.function),
        shape: ShapeRef {
            file: file.id,
            index: shape_index,
        },
    };
    Some(ResolvedClass { symbol, index })
}

/// Class-only operations refuse nodes that have no class shape at all.
pub(crate) fn require_class<'a, H>(
    host: &H,
    node: DeclarationNode<'a>,
    operation: &'static str,
) -> Result<ResolvedClass<'a>, ReflectionError>
where
    H: ReflectionHost<'a> + ?Sized,
{
    class_symbol(host, node).ok_or_else(|| ReflectionError::NotAClass {
        operation,
        text: host.program().source_text(node.span()).unwrap_or_default(),
    })
}

pub(crate) fn base_class_expression<'a>(class: &ResolvedClass<'a>) -> Option<&'a ast::Expr> {
    match class.shape().body {
        ClassBody::Es5 { iife, .. } => {
            // Only a single IIFE parameter receives the base class
            if iife.function.params.len() != 1 {
                return None;
            }
            iife.call.args.first().map(|arg| strip_parens(&arg.expr))
        }
        ClassBody::Native { class, .. } => class.super_class.as_deref(),
    }
}

// ---------------------------------------------------------------------------
// Members
// ---------------------------------------------------------------------------

pub(crate) fn members_of_class<'a, H>(host: &H, class: &ResolvedClass<'a>) -> Vec<ClassMember<'a>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let shape = class.shape();
    let mut members = Vec::new();

    if let ClassBody::Native { class: body, .. } = shape.body {
        members.extend(body.body.iter().filter_map(native_member));
    }
    for &stmt in &shape.statements {
        if let Some(assignment) = static_assignment(stmt, &shape.names) {
            let native = matches!(shape.body, ClassBody::Native { .. });
            // Prototype assignments after a native class are not part of it
            if assignment.on_prototype && native {
                continue;
            }
            if !assignment.on_prototype && DECORATOR_PROPERTIES.contains(&assignment.property) {
                continue;
            }
            members.push(assigned_member(assignment));
        } else if let Some(accessor) = property_accessor(stmt, &shape.names) {
            for (kind, function) in [
                (ClassMemberKind::Getter, accessor.getter),
                (ClassMemberKind::Setter, accessor.setter),
            ] {
                if let Some(function) = function {
                    members.push(ClassMember {
                        name: accessor.name.to_string(),
                        kind,
                        is_static: accessor.is_static,
                        decorators: None,
                        node: MemberNode::DefineProperty(accessor.call),
                        value: None,
                        implementation: Some(function),
                    });
                }
            }
        }
    }

    apply_member_decorators(members, decorators::member_decorators(host, shape))
}

fn assigned_member(assignment: StaticAssignment<'_>) -> ClassMember<'_> {
    let (kind, implementation, value) = match function_like(assignment.value) {
        Some(FunctionLike::Function(function)) => (ClassMemberKind::Method, Some(function), None),
        Some(FunctionLike::Arrow(_)) => (ClassMemberKind::Method, None, Some(assignment.value)),
        None => (ClassMemberKind::Property, None, Some(assignment.value)),
    };
    ClassMember {
        name: assignment.property.to_string(),
        kind,
        is_static: !assignment.on_prototype,
        decorators: None,
        node: MemberNode::Assign(assignment.assign),
        value,
        implementation,
    }
}

fn native_member(member: &ast::ClassMember) -> Option<ClassMember<'_>> {
    let node = MemberNode::ClassMember(member);
    let (name, kind, is_static, value, implementation) = match member {
        ast::ClassMember::Constructor(_) => (
            "constructor".to_string(),
            ClassMemberKind::Constructor,
            false,
            None,
            None,
        ),
        ast::ClassMember::Method(method) => {
            let kind = match method.kind {
                ast::MethodKind::Method => ClassMemberKind::Method,
                ast::MethodKind::Getter => ClassMemberKind::Getter,
                ast::MethodKind::Setter => ClassMemberKind::Setter,
            };
            (
                crate::patterns::prop_name(&method.key)?,
                kind,
                method.is_static,
                None,
                Some(&*method.function),
            )
        }
        ast::ClassMember::ClassProp(prop) => (
            crate::patterns::prop_name(&prop.key)?,
            ClassMemberKind::Property,
            prop.is_static,
            prop.value.as_deref(),
            None,
        ),
        ast::ClassMember::AutoAccessor(accessor) => {
            let name = match &accessor.key {
                ast::Key::Public(key) => crate::patterns::prop_name(key)?,
                ast::Key::Private(_) => return None,
            };
            (
                name,
                ClassMemberKind::Accessor,
                accessor.is_static,
                accessor.value.as_deref(),
                None,
            )
        }
        _ => return None,
    };
    Some(ClassMember {
        name,
        kind,
        is_static,
        decorators: None,
        node,
        value,
        implementation,
    })
}

/// Attach decorators to the first member of each name; decorator entries
/// left over describe properties that are never assigned.
fn apply_member_decorators<'a>(
    mut members: Vec<ClassMember<'a>>,
    mut decorated: Vec<MemberDecorators<'a>>,
) -> Vec<ClassMember<'a>> {
    for member in &mut members {
        if member.kind == ClassMemberKind::Constructor {
            continue;
        }
        let position = decorated.iter().position(|entry| {
            entry.name == member.name && entry.is_static.map_or(true, |s| s == member.is_static)
        });
        if let Some(position) = position {
            member.decorators = Some(decorated.remove(position).decorators);
        }
    }

    members.extend(decorated.into_iter().map(|entry| ClassMember {
        name: entry.name,
        kind: ClassMemberKind::Property,
        is_static: entry.is_static.unwrap_or(false),
        decorators: Some(entry.decorators),
        node: entry.node,
        value: None,
        implementation: None,
    }));
    members
}

// ---------------------------------------------------------------------------
// Constructor parameters
// ---------------------------------------------------------------------------

pub(crate) fn constructor_parameters<'a, H>(
    host: &H,
    class: &ResolvedClass<'a>,
) -> Option<Vec<CtorParameter<'a>>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let shape = class.shape();
    let params: Vec<&'a ast::Pat> = match shape.body {
        ClassBody::Es5 { inner, .. } => {
            let function = &*inner.function;
            if function.params.is_empty() && is_synthesized_es5_constructor(host, function) {
                log::trace!("'{}' has a synthesized constructor", shape.name());
                return None;
            }
            function.params.iter().map(|param| &param.pat).collect()
        }
        ClassBody::Native { class: body, .. } => {
            let Some(ctor) = body.body.iter().find_map(|member| match member {
                ast::ClassMember::Constructor(ctor) => Some(ctor),
                _ => None,
            }) else {
                return Some(Vec::new());
            };
            let stmts = ctor.body.as_ref().map(|body| body.stmts.as_slice());
            if ctor.params.is_empty() && stmts.map_or(false, is_native_super_spread) {
                log::trace!("'{}' has a synthesized constructor", shape.name());
                return None;
            }
            ctor.params
                .iter()
                .filter_map(|param| match param {
                    ast::ParamOrTsParamProp::Param(param) => Some(&param.pat),
                    ast::ParamOrTsParamProp::TsParamProp(_) => None,
                })
                .collect()
        }
    };

    let info = decorators::constructor_param_info(host, shape, params.len()).unwrap_or_default();
    let parameters = params
        .into_iter()
        .enumerate()
        .map(|(i, pat)| {
            let ParamInfo {
                type_expression,
                decorators,
            } = info.get(i).cloned().unwrap_or_default();
            CtorParameter {
                name: match pat {
                    ast::Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                    _ => None,
                },
                node: pat,
                decorators,
                type_value_reference: type_value_reference(host, type_expression),
                type_expression,
            }
        })
        .collect();
    Some(parameters)
}

/// A constructor whose body is nothing but a super call forwarding
/// `arguments`, directly or through a spread helper.
fn is_synthesized_es5_constructor<'a, H>(host: &H, function: &'a ast::Function) -> bool
where
    H: ReflectionHost<'a> + ?Sized,
{
    let Some(body) = &function.body else {
        return false;
    };
    let Some(args) = synthesized_super_call(&body.stmts) else {
        return false;
    };
    is_ident(args, "arguments") || is_spread_of_arguments(host, args)
}

fn helper_call<'a, H>(host: &H, expr: &'a ast::Expr) -> Option<(KnownDeclaration, Vec<&'a ast::Expr>)>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let call = as_call(expr)?;
    let known = host.get_declaration_of_expression(callee_expr(call)?)?.known?;
    Some((known, plain_args(call)?))
}

fn is_spread_of_arguments<'a, H>(host: &H, expr: &'a ast::Expr) -> bool
where
    H: ReflectionHost<'a> + ?Sized,
{
    let Some((known, args)) = helper_call(host, expr) else {
        return false;
    };
    match (known, args.as_slice()) {
        (KnownDeclaration::TsHelperSpread | KnownDeclaration::TsHelperSpreadArrays, [arg]) => {
            is_ident(arg, "arguments")
        }
        (KnownDeclaration::TsHelperSpreadArray, [first, second, rest @ ..]) => {
            let empty = matches!(strip_parens(first), ast::Expr::Array(array) if array.elems.is_empty());
            let pack = match rest {
                [] => true,
                [flag] => matches!(strip_parens(flag), ast::Expr::Lit(ast::Lit::Bool(b)) if !b.value),
                _ => false,
            };
            empty && pack && (is_ident(second, "arguments") || is_read_of_arguments(host, *second))
        }
        _ => false,
    }
}

fn is_read_of_arguments<'a, H>(host: &H, expr: &'a ast::Expr) -> bool
where
    H: ReflectionHost<'a> + ?Sized,
{
    matches!(
        helper_call(host, expr),
        Some((KnownDeclaration::TsHelperRead, args)) if matches!(args.as_slice(), [arg] if is_ident(arg, "arguments"))
    )
}

fn type_value_reference<'a, H>(host: &H, type_expression: Option<&'a ast::Expr>) -> TypeValueReference<'a>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let Some(expr) = type_expression.filter(|expr| !is_undefined(expr)) else {
        return TypeValueReference::Unavailable(ValueUnavailable::MissingType);
    };
    if !is_reference(expr) {
        return TypeValueReference::Unavailable(ValueUnavailable::Unsupported);
    }
    match host.get_import_of_expression(expr) {
        Some(import) => TypeValueReference::Imported {
            imported_name: import.name,
            module_name: import.from,
            value_declaration: host.get_declaration_of_expression(expr).map(|decl| decl.node),
        },
        None => TypeValueReference::Local(strip_parens(expr)),
    }
}

// ---------------------------------------------------------------------------
// Functions
// ---------------------------------------------------------------------------

pub(crate) fn definition_of_function<'a, H>(
    host: &H,
    node: DeclarationNode<'a>,
) -> Option<FunctionDefinition<'a>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let (function, known) = match node {
        DeclarationNode::Function(decl) => (
            FunctionLike::Function(&decl.function),
            known_helper(ident_name(&decl.ident)),
        ),
        DeclarationNode::FnExpr(expr) => (FunctionLike::Function(&expr.function), None),
        DeclarationNode::Var(declarator) => {
            let function = function_like(host.get_variable_value(declarator)?)?;
            let known = match &declarator.name {
                ast::Pat::Ident(binding) => known_helper(ident_name(&binding.id)),
                _ => None,
            };
            (function, known)
        }
        DeclarationNode::Ident(ident) => {
            // Undeclared helpers still have a well-known behaviour
            let known = known_helper(ident_name(ident))?;
            return Some(FunctionDefinition {
                node,
                body: None,
                parameters: Vec::new(),
                known: Some(known),
            });
        }
        _ => return None,
    };

    let (params, stmts): (Vec<&'a ast::Pat>, Option<&'a [ast::Stmt]>) = match function {
        FunctionLike::Function(function) => (
            function.params.iter().map(|param| &param.pat).collect(),
            function.body.as_ref().map(|body| body.stmts.as_slice()),
        ),
        FunctionLike::Arrow(arrow) => (
            arrow.params.iter().collect(),
            match &*arrow.body {
                ast::BlockStmtOrExpr::BlockStmt(block) => Some(block.stmts.as_slice()),
                ast::BlockStmtOrExpr::Expr(_) => None,
            },
        ),
    };

    let mut parameters: Vec<Parameter<'a>> = params
        .into_iter()
        .map(|pat| {
            let (name, initializer) = match pat {
                ast::Pat::Ident(binding) => (Some(binding.id.sym.to_string()), None),
                ast::Pat::Assign(assign) => (
                    match &*assign.left {
                        ast::Pat::Ident(binding) => Some(binding.id.sym.to_string()),
                        _ => None,
                    },
                    Some(&*assign.right),
                ),
                _ => (None, None),
            };
            Parameter {
                name,
                node: pat,
                initializer,
            }
        })
        .collect();

    let body = stmts.map(|stmts| {
        stmts
            .iter()
            .filter(|stmt| match default_parameter_check(*stmt) {
                Some((name, init)) => {
                    match parameters.iter_mut().find(|p| p.name.as_deref() == Some(name)) {
                        Some(parameter) => {
                            parameter.initializer = Some(init);
                            false
                        }
                        None => true,
                    }
                }
                None => true,
            })
            .collect()
    });

    Some(FunctionDefinition {
        node,
        body,
        parameters,
        known,
    })
}

/// `if (a === void 0) { a = init; }`, the ES5 form of a default parameter.
fn default_parameter_check(stmt: &ast::Stmt) -> Option<(&str, &ast::Expr)> {
    let ast::Stmt::If(if_stmt) = stmt else {
        return None;
    };
    if if_stmt.alt.is_some() {
        return None;
    }
    let test = match strip_parens(&if_stmt.test) {
        ast::Expr::Bin(bin) if bin.op == ast::BinaryOp::EqEqEq => bin,
        _ => return None,
    };
    let name = ident_name(as_ident(&test.left)?);
    if !is_undefined(&test.right) {
        return None;
    }

    let body = match &*if_stmt.cons {
        ast::Stmt::Block(block) => match block.stmts.as_slice() {
            [single] => single,
            _ => return None,
        },
        other => other,
    };
    let assign = as_assignment(expr_of_stmt(body)?)?;
    if ident_name(assign_target_ident(assign)?) != name {
        return None;
    }
    Some((name, &*assign.right))
}
