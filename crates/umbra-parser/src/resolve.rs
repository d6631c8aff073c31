//! Module specifier resolution over the files registered in a [`Program`].
//!
//! Nothing here touches the disk: candidates are probed against the paths the
//! program already knows about.

use std::path::{Path, PathBuf};

use crate::program::{normalize_path, FileId, FileKind, Program, SourceFile};

pub(crate) fn resolve_module(program: &Program, specifier: &str, from: &SourceFile) -> Option<FileId> {
    let resolved = if is_relative(specifier) {
        let dir = from.path.parent().unwrap_or_else(|| Path::new("/"));
        resolve_with_extensions(program, &dir.join(specifier), from.kind)
    } else {
        resolve_bare(program, specifier, from)
    };

    match resolved {
        Some(id) => log::trace!(
            "resolved '{}' from {} to {}",
            specifier,
            from.path.display(),
            program.file(id).path.display()
        ),
        None => log::debug!(
            "could not resolve '{}' from {}",
            specifier,
            from.path.display()
        ),
    }
    resolved
}

pub(crate) fn is_relative(specifier: &str) -> bool {
    specifier.starts_with("./") || specifier.starts_with("../") || specifier == "." || specifier == ".."
}

fn resolve_bare(program: &Program, specifier: &str, from: &SourceFile) -> Option<FileId> {
    if let Some(path) = program.path_mapping(specifier) {
        if let Some(id) = resolve_with_extensions(program, path, from.kind) {
            return Some(id);
        }
    }

    let (package_name, subpath) = parse_package_specifier(specifier);
    if subpath.is_some() {
        if let Some(base) = program.path_mapping(&package_name) {
            let base = base.join(subpath.as_deref().unwrap_or_default());
            if let Some(id) = resolve_with_extensions(program, &base, from.kind) {
                return Some(id);
            }
        }
    }

    if let Some(root) = program.source_root() {
        if let Some(id) = resolve_with_extensions(program, &root.join(specifier), from.kind) {
            return Some(id);
        }
    }

    // Walk up from the importing file looking for node_modules/<package>
    let mut current = from.path.parent().map(Path::to_path_buf);
    while let Some(dir) = current {
        let mut package_dir = dir.join("node_modules").join(&package_name);
        if let Some(subpath) = &subpath {
            package_dir.push(subpath);
        }
        if let Some(id) = resolve_with_extensions(program, &package_dir, from.kind) {
            return Some(id);
        }
        current = dir.parent().map(Path::to_path_buf);
    }

    None
}

/// Parse a package specifier into (package_name, subpath)
pub(crate) fn parse_package_specifier(specifier: &str) -> (String, Option<String>) {
    let parts: Vec<&str> = if specifier.starts_with('@') {
        specifier.splitn(3, '/').collect()
    } else {
        specifier.splitn(2, '/').collect()
    };

    match (specifier.starts_with('@'), parts.as_slice()) {
        (true, [scope, name]) => (format!("{}/{}", scope, name), None),
        (true, [scope, name, rest]) => (format!("{}/{}", scope, name), Some(rest.to_string())),
        (false, [name, rest]) => (name.to_string(), Some(rest.to_string())),
        _ => (specifier.to_string(), None),
    }
}

/// Probe a base path with the extensions of the importing file's kind first.
fn resolve_with_extensions(program: &Program, base: &Path, kind: FileKind) -> Option<FileId> {
    let base = normalize_path(base);

    // `./a.js` written in a typings file refers to `./a.d.ts`
    if kind == FileKind::Typings {
        if let Some(stem) = base.to_string_lossy().strip_suffix(".js") {
            if let Some(id) = program.lookup_path(Path::new(&format!("{}.d.ts", stem))) {
                return Some(id);
            }
        }
    }
    if let Some(id) = program.lookup_path(&base) {
        return Some(id);
    }

    let extensions: &[&str] = match kind {
        FileKind::JavaScript => &[".js", ".d.ts"],
        FileKind::Typings => &[".d.ts", ".js"],
    };

    let base_str = base.to_string_lossy();
    for ext in extensions {
        let candidate = PathBuf::from(format!("{}{}", base_str, ext));
        if let Some(id) = program.lookup_path(&candidate) {
            return Some(id);
        }
    }
    for ext in extensions {
        let candidate = base.join(format!("index{}", ext));
        if let Some(id) = program.lookup_path(&candidate) {
            return Some(id);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(files: &[&str]) -> Program {
        let mut program = Program::new();
        for path in files {
            let source = if path.ends_with(".d.ts") {
                "export declare const x: number;"
            } else {
                "exports.x = 1;"
            };
            program.add_source(path, source).unwrap();
        }
        program
    }

    fn resolve<'a>(program: &'a Program, specifier: &str, from: &str) -> Option<&'a Path> {
        let from = program.file_by_path(from).unwrap();
        program.resolve_module(specifier, from).map(|f| f.path.as_path())
    }

    #[test]
    fn test_parse_package_specifier() {
        assert_eq!(parse_package_specifier("lodash"), ("lodash".to_string(), None));
        assert_eq!(
            parse_package_specifier("lodash/fp"),
            ("lodash".to_string(), Some("fp".to_string()))
        );
        assert_eq!(
            parse_package_specifier("@angular/core"),
            ("@angular/core".to_string(), None)
        );
        assert_eq!(
            parse_package_specifier("@angular/core/testing"),
            ("@angular/core".to_string(), Some("testing".to_string()))
        );
    }

    #[test]
    fn test_relative_resolution() {
        let program = program(&["/pkg/index.js", "/pkg/a.js", "/pkg/sub/index.js", "/pkg/sub/b.js"]);
        assert_eq!(resolve(&program, "./a", "/pkg/index.js"), Some(Path::new("/pkg/a.js")));
        assert_eq!(resolve(&program, "./a.js", "/pkg/index.js"), Some(Path::new("/pkg/a.js")));
        assert_eq!(resolve(&program, "./sub", "/pkg/index.js"), Some(Path::new("/pkg/sub/index.js")));
        assert_eq!(resolve(&program, "../a", "/pkg/sub/b.js"), Some(Path::new("/pkg/a.js")));
        assert_eq!(resolve(&program, "./missing", "/pkg/index.js"), None);
    }

    #[test]
    fn test_typings_prefer_typings() {
        let program = program(&["/pkg/a.js", "/pkg/a.d.ts", "/pkg/index.d.ts"]);
        assert_eq!(resolve(&program, "./a", "/pkg/index.d.ts"), Some(Path::new("/pkg/a.d.ts")));
        assert_eq!(resolve(&program, "./a.js", "/pkg/index.d.ts"), Some(Path::new("/pkg/a.d.ts")));
    }

    #[test]
    fn test_bare_resolution() {
        let mut program = program(&[
            "/app/src/main.js",
            "/app/node_modules/lib/index.js",
            "/app/node_modules/@scope/pkg/sub.js",
            "/vendor/core.umd.js",
        ]);
        program.map_path("@angular/core", "/vendor/core.umd.js");

        assert_eq!(
            resolve(&program, "lib", "/app/src/main.js"),
            Some(Path::new("/app/node_modules/lib/index.js"))
        );
        assert_eq!(
            resolve(&program, "@scope/pkg/sub", "/app/src/main.js"),
            Some(Path::new("/app/node_modules/@scope/pkg/sub.js"))
        );
        assert_eq!(
            resolve(&program, "@angular/core", "/app/src/main.js"),
            Some(Path::new("/vendor/core.umd.js"))
        );
        assert_eq!(resolve(&program, "unknown", "/app/src/main.js"), None);
    }
}
