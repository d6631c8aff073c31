//! Classes command - print the class model recovered from a module

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use umbra_parser::SourceFile;
use umbra_reflect::{DelegatingReflectionHost, ReflectionHost};

use super::{Project, ProjectArgs};
use crate::report::{ClassReport, DecoratorReport, Location, MemberReport, ParameterReport};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ClassesArgs {
    /// Module to inspect
    pub input: PathBuf,

    /// Only report the class with this name
    #[arg(long)]
    pub name: Option<String>,
}

pub fn build_reports<'a>(
    host: &DelegatingReflectionHost<'a>,
    file: &'a SourceFile,
    only: Option<&str>,
) -> Result<Vec<ClassReport>> {
    let program = host.program();
    let index = host.file_index(file);

    let mut reports = Vec::new();
    for shape in index.classes() {
        if only.map_or(false, |name| name != shape.name()) {
            continue;
        }
        let node = shape.declaration();
        let Some(symbol) = host.get_class_symbol(node) else {
            continue;
        };

        let base_class = host
            .get_base_class_expression(node)?
            .and_then(|expr| program.source_text(umbra_parser::Spanned::span(expr)));
        let decorators = host.get_decorators_of_declaration(node)?;
        let members = host.get_members_of_class(node)?;
        let constructor = host.get_constructor_parameters(node)?;

        reports.push(ClassReport {
            name: symbol.name.clone(),
            location: Location::of(program, symbol.declaration.span()),
            internal_name: host.get_internal_name_of_class(node)?,
            adjacent_name: host.get_adjacent_name_of_class(node)?,
            base_class,
            decorators: decorators.map(|decorators| decorators.iter().map(DecoratorReport::new).collect()),
            members: members.iter().map(MemberReport::new).collect(),
            constructor: constructor.map(|parameters| {
                parameters
                    .iter()
                    .map(|parameter| ParameterReport::new(program, parameter))
                    .collect()
            }),
        });
    }
    log::debug!("{} classes in {}", reports.len(), file.path.display());
    Ok(reports)
}

pub fn run(args: ClassesArgs, project: &ProjectArgs, format: OutputFormat) -> Result<()> {
    let project = Project::load(project, &args.input)?;
    let file = project.input_file()?;
    let host = DelegatingReflectionHost::new(&project.program);

    let reports = build_reports(&host, file, args.name.as_deref())?;
    match format {
        OutputFormat::Text => {
            if reports.is_empty() {
                println!("No classes found in {}.", file.path.display());
            }
            for report in &reports {
                print!("{}", report.to_text());
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_parser::Program;

    const BUNDLE: &str = r#"(function (global, factory) {
    typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports, require('@angular/core')) :
    typeof define === 'function' && define.amd ? define('lib', ['exports', '@angular/core'], factory) :
    (global = global || self, factory(global.lib = {}, global.ng.core));
}(this, (function (exports, core) { 'use strict';
    var Base = (function () {
        function Base() {}
        return Base;
    }());
    var Child = (function (_super) {
        __extends(Child, _super);
        function Child() {
            return _super !== null && _super.apply(this, arguments) || this;
        }
        Child.prototype.ngOnInit = function () {};
        Child.decorators = [{ type: core.Component, args: [{ selector: 'child' }] }];
        Child.propDecorators = { value: [{ type: core.Input }] };
        return Child;
    }(Base));
    exports.Base = Base;
    exports.Child = Child;
})));
"#;

    fn program() -> Program {
        let mut program = Program::new();
        program.add_source("/pkg/lib.umd.js", BUNDLE).unwrap();
        program
    }

    #[test]
    fn test_class_reports() {
        let program = program();
        let host = DelegatingReflectionHost::new(&program);
        let file = program.file_by_path("/pkg/lib.umd.js").unwrap();

        let reports = build_reports(&host, file, None).unwrap();
        let names: Vec<_> = reports.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Base", "Child"]);

        let base = &reports[0];
        assert!(base.decorators.is_none());
        assert_eq!(base.constructor.as_ref().map(Vec::len), Some(0));

        let child = &reports[1];
        assert_eq!(child.base_class.as_deref(), Some("Base"));
        assert!(child.constructor.is_none());
        let decorators = child.decorators.as_ref().unwrap();
        assert_eq!(decorators[0].name, "Component");
        assert_eq!(decorators[0].import.as_deref(), Some("Component from '@angular/core'"));
        let members: Vec<_> = child.members.iter().map(|m| (m.name.as_str(), m.kind)).collect();
        assert_eq!(members, vec![("ngOnInit", "method"), ("value", "property")]);

        let text = child.to_text();
        assert!(text.starts_with("class Child extends Base"));
        assert!(text.contains("constructor: synthesized"));
        assert!(text.contains("property value @Input"));
    }

    #[test]
    fn test_name_filter() {
        let program = program();
        let host = DelegatingReflectionHost::new(&program);
        let file = program.file_by_path("/pkg/lib.umd.js").unwrap();

        let reports = build_reports(&host, file, Some("Child")).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(build_reports(&host, file, Some("Nope")).unwrap().is_empty());
    }
}
