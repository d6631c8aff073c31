//! Umbra - reflection over downleveled JavaScript bundles
//!
//! CLI driver that prints the exports, classes and wrapper structure the
//! reflection hosts recover from UMD bundles and ES modules.

mod commands;
mod config;
mod report;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};

/// Inspect the declarations of compiled JavaScript packages
#[derive(Parser, Debug)]
#[command(name = "umbra")]
#[command(author, version, about = "Inspect the reflected declarations of UMD bundles")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    project: commands::ProjectArgs,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress everything but errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the exports of a module
    Exports(commands::exports::ExportsArgs),

    /// Describe the classes declared in a module
    Classes(commands::classes::ClassesArgs),

    /// Show the UMD wrapper of a bundle and its dependencies
    Wrapper(commands::wrapper::WrapperArgs),
}

fn log_level(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(cli.verbose, cli.quiet)))
        .format_timestamp(None)
        .init();

    let Some(command) = cli.command else {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        cmd.print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Exports(args) => commands::exports::run(args, &cli.project, cli.format),
        Commands::Classes(args) => commands::classes::run(args, &cli.project, cli.format),
        Commands::Wrapper(args) => commands::wrapper::run(args, &cli.project, cli.format),
    }
}
