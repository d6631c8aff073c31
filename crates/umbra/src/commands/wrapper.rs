//! Wrapper command - show how a UMD bundle wires its factory

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Args;
use umbra_parser::SourceFile;
use umbra_reflect::UmdReflectionHost;

use super::{Project, ProjectArgs};
use crate::report::WrapperReport;
use crate::OutputFormat;

#[derive(Args, Debug)]
pub struct WrapperArgs {
    /// Bundle to inspect
    pub input: PathBuf,
}

pub fn build_report<'a>(host: &UmdReflectionHost<'a>, file: &'a SourceFile) -> Result<WrapperReport> {
    let module = host
        .get_umd_module(file)
        .ok_or_else(|| anyhow!("{} is not wrapped in a UMD wrapper", file.path.display()))?;
    Ok(WrapperReport::new(file.path.display().to_string(), &module))
}

pub fn run(args: WrapperArgs, project: &ProjectArgs, format: OutputFormat) -> Result<()> {
    let project = Project::load(project, &args.input)?;
    let file = project.input_file()?;
    let host = UmdReflectionHost::new(&project.program);

    let report = build_report(&host, file)?;
    match format {
        OutputFormat::Text => print!("{}", report.to_text()),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
    }
    Ok(())
}
