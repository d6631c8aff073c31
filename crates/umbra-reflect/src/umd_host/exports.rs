//! The export table of a UMD factory.

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::SourceFile;

use super::UmdReflectionHost;
use crate::esm::is_bare;
use crate::host::ReflectionHost;
use crate::model::{Declaration, DeclarationKind, DeclarationNode, ExportTable, SpecialIdentity};
use crate::patterns::{
    as_assignment, as_ident, as_member, define_property_reexport, enum_iife, exports_assignment_target,
    exports_member, exports_statement, expr_of_stmt, plain_args, require_call, strip_parens, wildcard_reexport, EnumIife,
};
use crate::umd::UmdModule;

impl<'a> UmdReflectionHost<'a> {
    pub(crate) fn exports_of_module<H>(&self, host: &H, file: &'a SourceFile) -> Option<ExportTable<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let Some(module) = self.get_umd_module(file) else {
            return self.base.exports_of_module(host, file);
        };
        self.exports
            .get_or_build(file, || Some(self.build_exports(host, file, &module)))
    }

    fn build_exports<H>(&self, host: &H, file: &'a SourceFile, module: &UmdModule<'a>) -> ExportTable<'a>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let mut table = ExportTable::new();
        for stmt in module.statements() {
            if let Some(assignment) = exports_statement(stmt) {
                for (name, assign) in assignment.targets {
                    let declaration = self.exported_value(host, assign, assignment.value);
                    table.insert(name.to_string(), declaration);
                }
            } else if let Some(reexport) = define_property_reexport(stmt) {
                let declaration = host
                    .get_declaration_of_expression(reexport.getter_value)
                    .unwrap_or_else(|| {
                        let node = expr_of_stmt(stmt).map_or(reexport.getter_value, strip_parens);
                        Declaration::inline(DeclarationNode::Expr(node), Some(reexport.getter_value))
                    });
                table.insert(reexport.name.to_string(), declaration);
            } else if let Some(source) = wildcard_reexport(stmt) {
                self.merge_wildcard(host, file, source, &mut table);
            } else if let Some(enum_shape) = enum_iife(stmt) {
                if let Some(name) = enum_shape.exported {
                    if let Some(declaration) = exported_enum(&enum_shape) {
                        table.insert(name.to_string(), declaration);
                    }
                }
            }
        }
        table
    }

    /// `exports.NAME = value`: a reference to something declared elsewhere
    /// resolves there, anything else is the assignment itself.
    fn exported_value<H>(&self, host: &H, assign: &'a ast::AssignExpr, value: &'a ast::Expr) -> Declaration<'a>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let resolved = if let Some(ident) = as_ident(value) {
            host.get_declaration_of_identifier(ident)
        } else if exports_member(value).is_some() {
            host.get_declaration_of_expression(value)
        } else if let Some(member) = as_member(value) {
            let from_namespace = as_ident(&member.obj)
                .and_then(|namespace| self.namespace_of(namespace))
                .is_some();
            if from_namespace {
                host.get_declaration_of_expression(value)
            } else {
                None
            }
        } else {
            None
        };
        resolved.unwrap_or_else(|| Declaration::inline(DeclarationNode::Assign(assign), Some(value)))
    }

    fn merge_wildcard<H>(&self, host: &H, file: &'a SourceFile, source: &'a ast::Expr, table: &mut ExportTable<'a>)
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let (target, via) = match require_call(source) {
            Some(specifier) => match self.program().resolve_module(specifier, file) {
                Some(target) => (target, is_bare(specifier).then(|| specifier.to_string())),
                None => {
                    log::debug!("unresolved re-export '{}' in {}", specifier, file.path.display());
                    return;
                }
            },
            None => {
                let Some(namespace) = host.get_declaration_of_expression(source) else {
                    return;
                };
                let Some(target) = namespace.node.as_module() else {
                    log::debug!("wildcard re-export of a non-module in {}", file.path.display());
                    return;
                };
                (target, namespace.via_module)
            }
        };
        if target.id == file.id {
            return;
        }

        let Some(exports) = host.get_exports_of_module(target) else {
            return;
        };
        // Entries keep the module they were first re-exported through
        let via = via.unwrap_or_else(|| target.path_without_extension());
        for (name, declaration) in exports {
            let declaration = match declaration.via_module {
                Some(_) => declaration,
                None => declaration.with_via_module(Some(via.clone())),
            };
            table.insert(name, declaration);
        }
    }
}

/// The entry of `(function (E) {...})(exports.E || (exports.E = {}))`,
/// pointing at the `exports.E = {}` assignment.
fn exported_enum<'a>(shape: &EnumIife<'a>) -> Option<Declaration<'a>> {
    let assign = exports_initializer(shape)?;
    Some(Declaration {
        kind: DeclarationKind::Concrete {
            identity: Some(SpecialIdentity::DownleveledEnum(shape.members.clone())),
        },
        node: DeclarationNode::Assign(assign),
        known: None,
        via_module: None,
    })
}

fn exports_initializer<'a>(shape: &EnumIife<'a>) -> Option<&'a ast::AssignExpr> {
    let args = plain_args(shape.iife.call)?;
    let mut arg = strip_parens(args.first().copied()?);
    // E = exports.E || (exports.E = {})
    if let Some(assign) = as_assignment(arg) {
        arg = strip_parens(&assign.right);
    }
    let ast::Expr::Bin(bin) = arg else {
        return None;
    };
    let init = as_assignment(&bin.right)?;
    exports_assignment_target(init).map(|_| init)
}
