//! CLI command implementations

pub mod classes;
pub mod exports;
pub mod wrapper;

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use umbra_parser::{Program, SourceFile};

use crate::config::Config;

/// Options shared by every command that loads a package.
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Path to umbra.toml (default: searched upwards from the input file)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Directory whose files make up the program (overrides the config)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Directory holding the package's public typings
    #[arg(long, global = true)]
    pub typings: Option<PathBuf>,

    /// Map a bare module specifier to a file, as SPECIFIER=PATH
    #[arg(long = "path", value_name = "SPECIFIER=PATH", value_parser = parse_mapping, global = true)]
    pub paths: Vec<(String, PathBuf)>,
}

pub(crate) fn parse_mapping(value: &str) -> Result<(String, PathBuf), String> {
    match value.split_once('=') {
        Some((specifier, path)) if !specifier.is_empty() && !path.is_empty() => {
            Ok((specifier.to_string(), PathBuf::from(path)))
        }
        _ => Err(format!("expected SPECIFIER=PATH, got '{}'", value)),
    }
}

/// A loaded program and the file a command was asked about.
pub struct Project {
    pub program: Program,
    pub input: PathBuf,
}

impl Project {
    pub fn load(args: &ProjectArgs, input: &Path) -> Result<Self> {
        let input = input
            .canonicalize()
            .with_context(|| format!("cannot open {}", input.display()))?;
        let input_dir = input.parent().unwrap_or_else(|| Path::new("/")).to_path_buf();

        let config = match &args.config {
            Some(path) => Some(Config::load(path)?),
            None => Config::discover(&input_dir)?,
        };
        let root = match (&args.root, &config) {
            (Some(root), _) => root.clone(),
            (None, Some(config)) => config.package.root.clone(),
            (None, None) => input_dir,
        };
        let config = config.unwrap_or_default();
        let root = root
            .canonicalize()
            .with_context(|| format!("cannot open package root {}", root.display()))?;

        let mut program = Program::new();
        let loaded = program.load_dir(&root)?;
        log::info!("loaded {} files from {}", loaded.len(), root.display());
        if program.file_by_path(&input).is_none() {
            program.load_file(&input)?;
        }

        program.set_source_root(&root);
        if let Some(typings) = args.typings.as_ref().or(config.package.typings.as_ref()) {
            let typings = typings.canonicalize().unwrap_or_else(|_| typings.clone());
            if !typings.starts_with(&root) {
                program.load_dir(&typings)?;
            }
            program.set_typings_root(&typings);
        }
        for (specifier, path) in config.paths.iter().chain(args.paths.iter().map(|(s, p)| (s, p))) {
            let path = path.canonicalize().unwrap_or_else(|_| path.clone());
            if program.file_by_path(&path).is_none() && path.is_file() {
                program.load_file(&path)?;
            }
            program.map_path(specifier.clone(), &path);
        }

        Ok(Self { program, input })
    }

    pub fn input_file(&self) -> Result<&SourceFile> {
        self.program
            .file_by_path(&self.input)
            .ok_or_else(|| anyhow!("{} is not part of the program", self.input.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_mapping() {
        assert_eq!(
            parse_mapping("core=vendor/core.js"),
            Ok(("core".to_string(), PathBuf::from("vendor/core.js")))
        );
        assert!(parse_mapping("core").is_err());
        assert!(parse_mapping("=vendor/core.js").is_err());
        assert!(parse_mapping("core=").is_err());
    }

    #[test]
    fn test_load_project_from_config() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("dist");
        fs::create_dir_all(root.join("bundles")).unwrap();
        fs::create_dir_all(dir.path().join("vendor")).unwrap();
        fs::write(root.join("bundles/lib.umd.js"), "exports.a = 1;").unwrap();
        fs::write(root.join("index.js"), "export const b = 2;").unwrap();
        fs::write(dir.path().join("vendor/core.js"), "export class Core {}").unwrap();
        fs::write(
            dir.path().join("umbra.toml"),
            "[package]\nroot = \"dist\"\n[paths]\ncore = \"vendor/core.js\"\n",
        )
        .unwrap();

        let project = Project::load(&ProjectArgs::default(), &root.join("bundles/lib.umd.js")).unwrap();
        assert_eq!(project.program.len(), 3);
        let input = project.input_file().unwrap();
        let core = project.program.resolve_module("core", input).unwrap();
        assert!(core.path.ends_with("vendor/core.js"));
    }

    #[test]
    fn test_load_project_without_config() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("a.js"), "exports.a = 1;").unwrap();
        fs::write(dir.path().join("b.js"), "exports.b = require('./a');").unwrap();

        let args = ProjectArgs {
            root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let project = Project::load(&args, &dir.path().join("b.js")).unwrap();
        assert_eq!(project.program.len(), 2);
        assert!(project.input_file().unwrap().path.ends_with("b.js"));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Project::load(&ProjectArgs::default(), &dir.path().join("missing.js")).is_err());
    }
}
