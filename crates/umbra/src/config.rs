//! Project configuration loaded from `umbra.toml`.
//!
//! ```toml
//! [package]
//! root = "dist"
//! typings = "dist/typings"
//!
//! [paths]
//! "@angular/core" = "node_modules/@angular/core/bundles/core.umd.js"
//! ```
//!
//! Relative paths are taken from the directory holding the config file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

pub const CONFIG_FILE: &str = "umbra.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub package: PackageConfig,

    /// Bare module specifier to file path
    #[serde(default)]
    pub paths: BTreeMap<String, PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageConfig {
    /// Directory whose `.js` and `.d.ts` files make up the program
    #[serde(default = "default_root")]
    pub root: PathBuf,

    /// Directory holding the package's public typings
    pub typings: Option<PathBuf>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            typings: None,
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

impl Config {
    pub fn parse(source: &str) -> Result<Self> {
        toml::from_str(source).context("invalid umbra.toml")
    }

    /// Read a config file and anchor its relative paths at the file's
    /// directory.
    pub fn load(path: &Path) -> Result<Self> {
        let source = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config = Self::parse(&source).with_context(|| format!("in {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        log::debug!("loaded config from {}", path.display());
        Ok(config.anchored_at(base))
    }

    /// Look for `umbra.toml` in `start` and its ancestors.
    pub fn discover(start: &Path) -> Result<Option<Self>> {
        for dir in start.ancestors() {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
        }
        Ok(None)
    }

    fn anchored_at(mut self, base: &Path) -> Self {
        self.package.root = base.join(&self.package.root);
        self.package.typings = self.package.typings.map(|typings| base.join(typings));
        for path in self.paths.values_mut() {
            *path = base.join(&*path);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config = Config::parse(
            r#"
            [package]
            root = "dist"
            typings = "dist/typings"

            [paths]
            "@angular/core" = "node_modules/core.umd.js"
            rxjs = "node_modules/rxjs/index.js"
            "#,
        )
        .unwrap();
        assert_eq!(config.package.root, PathBuf::from("dist"));
        assert_eq!(config.package.typings, Some(PathBuf::from("dist/typings")));
        assert_eq!(config.paths.len(), 2);
        assert_eq!(
            config.paths["@angular/core"],
            PathBuf::from("node_modules/core.umd.js")
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.package.root, PathBuf::from("."));
        assert!(config.package.typings.is_none());
        assert!(config.paths.is_empty());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(Config::parse("[package]\nentry = \"main.js\"").is_err());
        assert!(Config::parse("[build]\nout_dir = \"dist\"").is_err());
    }

    #[test]
    fn test_load_anchors_relative_paths() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "[package]\nroot = \"dist\"\ntypings = \"types\"\n[paths]\ncore = \"vendor/core.js\"\n",
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.package.root, dir.path().join("dist"));
        assert_eq!(config.package.typings, Some(dir.path().join("types")));
        assert_eq!(config.paths["core"], dir.path().join("vendor/core.js"));
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[package]\nroot = \"lib\"\n").unwrap();
        let nested = dir.path().join("lib/bundles");
        fs::create_dir_all(&nested).unwrap();

        let config = Config::discover(&nested).unwrap().unwrap();
        assert_eq!(config.package.root, dir.path().join("lib"));
    }
}
