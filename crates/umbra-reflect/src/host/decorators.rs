//! Decorator metadata in its two emitted forms: static properties
//! (`Foo.decorators = [...]`, `propDecorators`, `ctorParameters`) and
//! `__decorate(...)` helper calls.

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::Spanned;

use super::classes::ResolvedClass;
use super::ReflectionHost;
use crate::index::ClassShape;
use crate::model::{Decorator, MemberNode};
use crate::patterns::{
    array_elements, as_ident, as_member, class_decorate_statement, decorator_application,
    decorator_object, function_like, helper_name, member_decorate_statement, member_name,
    metadata_call, object_properties, object_value, param_decorator, static_assignment,
    strip_parens, DecoratorObject, PropertyValue,
};

/// Decorators found for one member name.
pub(crate) struct MemberDecorators<'a> {
    pub name: String,
    /// `None` when the metadata does not say which side the member is on
    pub is_static: Option<bool>,
    pub decorators: Vec<Decorator<'a>>,
    pub node: MemberNode<'a>,
}

/// What the class metadata records about one constructor parameter.
#[derive(Debug, Clone, Default)]
pub(crate) struct ParamInfo<'a> {
    pub type_expression: Option<&'a ast::Expr>,
    pub decorators: Option<Vec<Decorator<'a>>>,
}

fn reference_name(expr: &ast::Expr) -> String {
    if let Some(ident) = as_ident(expr) {
        return ident.sym.to_string();
    }
    as_member(expr)
        .and_then(member_name)
        .unwrap_or_default()
        .to_string()
}

fn from_object<'a, H>(host: &H, object: DecoratorObject<'a>) -> Decorator<'a>
where
    H: ReflectionHost<'a> + ?Sized,
{
    Decorator {
        name: reference_name(object.type_expr),
        identifier: object.type_expr,
        import: host.get_import_of_expression(object.type_expr),
        node: object.node,
        args: object.args,
    }
}

/// A decorator applied through `__decorate`: `Dec` or `Dec(args)`.
fn from_application<'a, H>(host: &H, expr: &'a ast::Expr) -> Option<Decorator<'a>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let (callee, args) = decorator_application(expr)?;
    if matches!(helper_name(callee), Some("__param" | "__metadata")) {
        return None;
    }
    Some(Decorator {
        name: reference_name(callee),
        identifier: callee,
        import: host.get_import_of_expression(callee),
        node: strip_parens(expr),
        args,
    })
}

/// Read a `[{ type: X, args: [...] }, ...]` array, dropping malformed entries.
fn decorator_array<'a, H>(host: &H, array: &'a ast::Expr) -> Option<Vec<Decorator<'a>>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let elements = array_elements(array)?;
    let decorators = elements
        .into_iter()
        .filter_map(|element| match decorator_object(element) {
            Some(object) => Some(from_object(host, object)),
            None => {
                log::debug!("skipping malformed decorator entry");
                None
            }
        })
        .collect();
    Some(decorators)
}

/// A static property such as `Foo.decorators = ...` in the class statements.
fn static_property<'a>(shape: &ClassShape<'a>, property: &str) -> Option<&'a ast::Expr> {
    shape.statements.iter().find_map(|&stmt| {
        static_assignment(stmt, &shape.names)
            .filter(|assignment| !assignment.on_prototype && assignment.property == property)
            .map(|assignment| assignment.value)
    })
}

pub(crate) fn class_decorators<'a, H>(host: &H, class: &ResolvedClass<'a>) -> Option<Vec<Decorator<'a>>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    let shape = class.shape();
    if let Some(value) = static_property(shape, "decorators") {
        return decorator_array(host, value);
    }

    let mut found = false;
    let mut decorators = Vec::new();
    for &stmt in &shape.statements {
        if let Some(decorate) = class_decorate_statement(stmt, &shape.names) {
            found = true;
            decorators.extend(
                decorate
                    .decorators
                    .into_iter()
                    .filter_map(|expr| from_application(host, expr)),
            );
        }
    }
    found.then_some(decorators)
}

pub(crate) fn member_decorators<'a, H>(host: &H, shape: &ClassShape<'a>) -> Vec<MemberDecorators<'a>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    if let Some(value) = static_property(shape, "propDecorators") {
        let ast::Expr::Object(object) = strip_parens(value) else {
            log::debug!("'{}.propDecorators' is not an object literal", shape.name());
            return Vec::new();
        };
        return object_properties(object)
            .into_iter()
            .filter_map(|(name, value)| match value {
                PropertyValue::Value(kv) => Some(MemberDecorators {
                    name,
                    is_static: None,
                    decorators: decorator_array(host, &kv.value)?,
                    node: MemberNode::PropDecorators(kv),
                }),
                _ => None,
            })
            .collect();
    }

    let mut entries: Vec<MemberDecorators<'a>> = Vec::new();
    for &stmt in &shape.statements {
        let Some((decorate, is_static)) = member_decorate_statement(stmt, &shape.names) else {
            continue;
        };
        let Some(name) = decorate.member else {
            continue;
        };
        let decorators: Vec<_> = decorate
            .decorators
            .iter()
            .copied()
            .filter_map(|expr| from_application(host, expr))
            .collect();
        match entries
            .iter_mut()
            .find(|entry| entry.name == name && entry.is_static == Some(is_static))
        {
            Some(entry) => entry.decorators.extend(decorators),
            None => entries.push(MemberDecorators {
                name: name.to_string(),
                is_static: Some(is_static),
                decorators,
                node: MemberNode::DecorateCall(decorate.call),
            }),
        }
    }
    entries
}

/// Per-parameter metadata from `ctorParameters`, or from `__param` and
/// `design:paramtypes` entries of a class `__decorate` call.
///
/// `__param` entries for positions past the constructor's `arity` are
/// dropped.
pub(crate) fn constructor_param_info<'a, H>(
    host: &H,
    shape: &ClassShape<'a>,
    arity: usize,
) -> Option<Vec<ParamInfo<'a>>>
where
    H: ReflectionHost<'a> + ?Sized,
{
    if let Some(value) = static_property(shape, "ctorParameters") {
        let elements = array_elements(value).or_else(|| {
            function_like(value)
                .and_then(|function| function.returned_expr())
                .and_then(array_elements)
        });
        let Some(elements) = elements else {
            let text = host.program().source_text(value.span()).unwrap_or_default();
            log::warn!(
                "invalid constructor parameter metadata for '{}': {}",
                shape.name(),
                text
            );
            return None;
        };
        let info = elements
            .into_iter()
            .map(|element| match strip_parens(element) {
                ast::Expr::Object(object) => ParamInfo {
                    type_expression: object_value(object, "type").map(strip_parens),
                    decorators: object_value(object, "decorators")
                        .and_then(|decorators| decorator_array(host, decorators)),
                },
                _ => ParamInfo::default(),
            })
            .collect();
        return Some(info);
    }

    let mut found = false;
    let mut info: Vec<ParamInfo<'a>> = Vec::new();
    for &stmt in &shape.statements {
        let Some(decorate) = class_decorate_statement(stmt, &shape.names) else {
            continue;
        };
        for &expr in &decorate.decorators {
            if let Some((index, decorator)) = param_decorator(expr) {
                found = true;
                if index >= arity {
                    log::debug!("'{}': __param index {} out of range", shape.name(), index);
                    continue;
                }
                if info.len() <= index {
                    info.resize_with(index + 1, ParamInfo::default);
                }
                if let Some(decorator) = from_application(host, decorator) {
                    info[index].decorators.get_or_insert_with(Vec::new).push(decorator);
                }
            } else if let Some(("design:paramtypes", types)) = metadata_call(expr) {
                let Some(types) = array_elements(types) else {
                    continue;
                };
                found = true;
                if info.len() < types.len() {
                    info.resize_with(types.len(), ParamInfo::default);
                }
                for (slot, type_expression) in info.iter_mut().zip(types) {
                    slot.type_expression = Some(strip_parens(type_expression));
                }
            }
        }
    }
    found.then_some(info)
}
