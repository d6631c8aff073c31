//! Exports command - print the export table of a module

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use umbra_parser::SourceFile;
use umbra_reflect::{DelegatingReflectionHost, ReflectionHost};

use super::{Project, ProjectArgs};
use crate::report::{ExportEntry, ExportsReport};
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct ExportsArgs {
    /// Module to inspect
    pub input: PathBuf,

    /// Also match each export against the package typings
    #[arg(long)]
    pub dts: bool,
}

pub fn build_report<'a>(
    host: &DelegatingReflectionHost<'a>,
    file: &'a SourceFile,
    with_dts: bool,
) -> Result<ExportsReport> {
    let program = host.program();
    let format = if host.umd().is_umd_file(file) { "umd" } else { "esm" };
    let table = host
        .get_exports_of_module(file)
        .ok_or_else(|| anyhow!("{} is neither an ES module nor a UMD bundle", file.path.display()))?;

    let mut exports = Vec::with_capacity(table.len());
    for (name, declaration) in &table {
        let mut entry = ExportEntry::new(program, name, declaration);
        if with_dts {
            match host.get_dts_declaration(declaration) {
                Ok(dts) => entry = entry.with_typings(program, dts.as_ref()),
                Err(err) => log::warn!("'{}': {}", name, err),
            }
        }
        exports.push(entry);
    }

    Ok(ExportsReport {
        path: file.path.display().to_string(),
        format,
        exports,
    })
}

pub fn run(args: ExportsArgs, project: &ProjectArgs, format: OutputFormat) -> Result<()> {
    let project = Project::load(project, &args.input)?;
    let file = project.input_file()?;
    let host = DelegatingReflectionHost::new(&project.program);

    let report = build_report(&host, file, args.dts)?;
    match format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbra_parser::Program;

    const BUNDLE: &str = r#"(function (global, factory) {
    typeof exports === 'object' && typeof module !== 'undefined' ? factory(exports) :
    typeof define === 'function' && define.amd ? define('lib', ['exports'], factory) :
    (global = global || self, factory(global.lib = {}));
}(this, (function (exports) { 'use strict';
    var Foo = (function () {
        function Foo() {}
        return Foo;
    }());
    exports.Foo = Foo;
    exports.VERSION = '1.0.0';
    (function (Color) {
        Color[Color["Red"] = 0] = "Red";
    })(exports.Color || (exports.Color = {}));
})));
"#;

    #[test]
    fn test_umd_export_report() {
        let mut program = Program::new();
        program.add_source("/pkg/lib.umd.js", BUNDLE).unwrap();
        program.add_source("/pkg/typings/index.d.ts", "export declare class Foo {}").unwrap();
        program.set_source_root("/pkg");
        program.set_typings_root("/pkg/typings");
        let host = DelegatingReflectionHost::new(&program);
        let file = program.file_by_path("/pkg/lib.umd.js").unwrap();

        let report = build_report(&host, file, true).unwrap();
        assert_eq!(report.format, "umd");
        let names: Vec<_> = report.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Foo", "VERSION", "Color"]);
        assert_eq!(report.exports[0].node, "variable");
        assert!(report.exports[0].typings.is_some());
        assert_eq!(report.exports[1].kind, "inline");
        assert_eq!(report.exports[2].enum_members, Some(vec!["Red".to_string()]));

        let text = report.to_text();
        assert!(text.starts_with("/pkg/lib.umd.js (umd)"));
        assert!(text.contains("Color [concrete assignment] enum { Red }"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["exports"][1]["name"], "VERSION");
        assert!(json["exports"][1].get("via_module").is_none());
    }

    #[test]
    fn test_scripts_are_rejected() {
        let mut program = Program::new();
        program.add_source("/pkg/plain.js", "var a = 1;").unwrap();
        let host = DelegatingReflectionHost::new(&program);
        let file = program.file_by_path("/pkg/plain.js").unwrap();
        assert!(build_report(&host, file, false).is_err());
    }
}
