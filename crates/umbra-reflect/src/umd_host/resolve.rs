//! UMD rules for identifiers, expressions and imports.

use umbra_parser::swc_ecma_ast as ast;
use umbra_parser::SourceFile;

use super::UmdReflectionHost;
use crate::esm::{is_bare, primary_binding};
use crate::host::ReflectionHost;
use crate::index::Binding;
use crate::model::{Declaration, DeclarationNode, Import};
use crate::patterns::{
    as_ident, as_member, exports_member, ident_name, member_name, prop_name, require_call,
    strip_parens,
};
use crate::umd::UmdModule;

/// Where a local namespace binding comes from.
pub(super) enum ModuleBinding<'a> {
    /// A factory parameter bound to `require('x')` in the CommonJS branch
    Parameter(&'a ast::Param, &'a str),
    /// `var x = require('x')`
    Require(&'a ast::VarDeclarator, &'a str),
}

impl<'a> ModuleBinding<'a> {
    fn specifier(&self) -> &'a str {
        match *self {
            ModuleBinding::Parameter(_, specifier) | ModuleBinding::Require(_, specifier) => specifier,
        }
    }

    fn node(&self) -> DeclarationNode<'a> {
        match *self {
            ModuleBinding::Parameter(param, _) => DeclarationNode::Param(param),
            ModuleBinding::Require(declarator, _) => DeclarationNode::Var(declarator),
        }
    }
}

fn is_factory_param(module: &UmdModule<'_>, binding: &Binding<'_>) -> bool {
    matches!(binding, Binding::Param { function, .. } if function.span == module.factory_fn.span)
}

impl<'a> UmdReflectionHost<'a> {
    fn module_binding(&self, module: &UmdModule<'a>, binding: Binding<'a>) -> Option<ModuleBinding<'a>> {
        match binding {
            Binding::Param { param, ident, .. } if is_factory_param(module, &binding) => {
                let import = module.import_of_parameter(ident)?;
                Some(ModuleBinding::Parameter(param, import.specifier))
            }
            Binding::Var { declarator, .. } => {
                let specifier = require_call(declarator.init.as_deref()?)?;
                Some(ModuleBinding::Require(declarator, specifier))
            }
            _ => None,
        }
    }

    /// The namespace binding behind a local identifier, if it is one.
    pub(super) fn namespace_of(&self, ident: &'a ast::Ident) -> Option<ModuleBinding<'a>> {
        let file = self.program().file_at(ident.span.lo)?;
        let module = self.get_umd_module(file)?;
        let index = self.base.index_of(file);
        let binding = primary_binding(index.resolve(ident)?)?;
        self.module_binding(&module, binding)
    }

    fn module_declaration(&self, file: &'a SourceFile, binding: &ModuleBinding<'a>) -> Declaration<'a> {
        let specifier = binding.specifier();
        match self.program().resolve_module(specifier, file) {
            Some(target) => Declaration::concrete(DeclarationNode::Module(target))
                .with_via_module(is_bare(specifier).then(|| specifier.to_string())),
            None => {
                log::debug!("unresolved dependency '{}' in {}", specifier, file.path.display());
                Declaration::missing(binding.node())
            }
        }
    }

    pub(crate) fn resolve_identifier<H>(&self, host: &H, ident: &'a ast::Ident) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let file = self.program().file_at(ident.span.lo)?;
        let Some(module) = self.get_umd_module(file) else {
            return self.base.resolve_identifier(host, ident);
        };
        let index = self.base.index_of(file);
        let binding = index.resolve(ident).and_then(primary_binding);

        if ident_name(ident) == "exports" {
            return Some(match binding {
                None => Declaration::concrete(DeclarationNode::Module(file)),
                Some(binding) if is_factory_param(&module, &binding) => {
                    Declaration::concrete(DeclarationNode::Module(file))
                }
                Some(binding) => Declaration::concrete(binding.node()),
            });
        }

        if let Some(namespace) = binding.and_then(|binding| self.module_binding(&module, binding)) {
            return Some(self.module_declaration(file, &namespace));
        }
        self.base.resolve_identifier(host, ident)
    }

    pub(crate) fn resolve_expression<H>(&self, host: &H, expr: &'a ast::Expr) -> Option<Declaration<'a>>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        if exports_member(expr).is_some() {
            // `exports.X` read while the table of its own module is being
            // built stands for the exports object
            let object = as_member(expr).map(|member| &*member.obj)?;
            let exports = host.get_declaration_of_expression(object)?;
            if let Some(file) = exports.node.as_module() {
                if self.exports.is_in_progress(file) {
                    return Some(Declaration::concrete(DeclarationNode::Module(file)));
                }
            }
        }
        self.base.resolve_expression(host, expr)
    }

    pub(crate) fn import_of_identifier(&self, ident: &'a ast::Ident) -> Option<Import> {
        let file = self.program().file_at(ident.span.lo)?;
        if self.get_umd_module(file).is_none() {
            return self.base.import_of_identifier(ident);
        }
        let index = self.base.index_of(file);
        match primary_binding(index.resolve(ident)?)? {
            // const { a: b } = require('x')
            Binding::Destructured { declarator, ident } => {
                let from = require_call(declarator.init.as_deref()?)?;
                let ast::Pat::Object(pattern) = &declarator.name else {
                    return None;
                };
                Some(Import {
                    name: destructured_key(pattern, ident)?,
                    from: from.to_string(),
                })
            }
            _ => self.base.import_of_identifier(ident),
        }
    }

    pub(crate) fn import_of_expression<H>(&self, host: &H, expr: &'a ast::Expr) -> Option<Import>
    where
        H: ReflectionHost<'a> + ?Sized,
    {
        let expr = strip_parens(expr);
        if let Some(ident) = as_ident(expr) {
            return host.get_import_of_identifier(ident);
        }
        if let Some(member) = as_member(expr) {
            if let Some(namespace) = as_ident(&member.obj).and_then(|ident| self.namespace_of(ident)) {
                return Some(Import {
                    name: member_name(member)?.to_string(),
                    from: namespace.specifier().to_string(),
                });
            }
        }
        self.base.import_of_expression(host, expr)
    }
}

/// The property an identifier was destructured from.
fn destructured_key(pattern: &ast::ObjectPat, ident: &ast::Ident) -> Option<String> {
    pattern.props.iter().find_map(|prop| match prop {
        ast::ObjectPatProp::KeyValue(kv) => match &*kv.value {
            ast::Pat::Ident(binding) if binding.id.span == ident.span => prop_name(&kv.key),
            _ => None,
        },
        ast::ObjectPatProp::Assign(assign) if assign.key.id.span == ident.span => {
            Some(assign.key.id.sym.to_string())
        }
        _ => None,
    })
}
