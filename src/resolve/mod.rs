//! Package location on the Go build search path.
//!
//! Search order for an import path:
//! 1. the enclosing module (go.mod) and its local `replace` targets
//! 2. the module's `vendor/` directory
//! 3. the module cache, for modules listed under `require`
//! 4. every `GOPATH/src` entry
//! 5. `GOROOT/src`
//!
//! The generator only needs two answers from this layer: where a package
//! lives, and what its package clause says (the conventional import name).

use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::config::BuildConfig;
use crate::error::{GenerateError, Result};
use crate::model::{is_exported, Declaration};
use crate::parser::GoParser;

mod gomod;

pub use gomod::{GoModule, GoVersion};

/// Locates Go packages by import path.
pub trait PackageLocator {
    /// Directory holding the package, if it can be found.
    fn locate(&self, import_path: &str) -> Option<PathBuf>;

    /// Package clause name of the package, if it can be found.
    fn package_name(&self, import_path: &str) -> Option<String>;

    /// Exported top-level names of the package, if it can be read.
    fn exported_names(&self, import_path: &str) -> Option<BTreeSet<String>>;

    /// Language version generated code has to compile under. None when
    /// nothing pins it, in which case the toolchain's own version applies.
    fn language_version(&self) -> Option<GoVersion> {
        None
    }
}

/// Toolchain directories discovered from the environment.
#[derive(Debug, Clone, Default)]
pub struct GoEnv {
    pub go_root: Option<PathBuf>,
    pub go_path: Vec<PathBuf>,
    pub mod_cache: Option<PathBuf>,
}

impl GoEnv {
    /// Resolve GOROOT/GOPATH/GOMODCACHE from config, environment, then the toolchain.
    pub fn discover(build: &BuildConfig) -> Self {
        let env_path = |key: &str| std::env::var_os(key).filter(|v| !v.is_empty()).map(PathBuf::from);

        let mut go_root = build.go_root.clone().or_else(|| env_path("GOROOT"));
        let mut go_path: Vec<PathBuf> = match &build.go_path {
            Some(list) => list.clone(),
            None => env_path("GOPATH")
                .map(|p| std::env::split_paths(&p).collect())
                .unwrap_or_default(),
        };
        let mut mod_cache = env_path("GOMODCACHE");

        if go_root.is_none() || go_path.is_empty() || mod_cache.is_none() {
            if let Some(queried) = query_go_env() {
                go_root = go_root.or(queried.go_root);
                if go_path.is_empty() {
                    go_path = queried.go_path;
                }
                mod_cache = mod_cache.or(queried.mod_cache);
            }
        }

        if go_path.is_empty() {
            if let Some(home) = env_path("HOME") {
                go_path.push(home.join("go"));
            }
        }
        if mod_cache.is_none() {
            mod_cache = go_path.first().map(|gp| gp.join("pkg").join("mod"));
        }

        Self {
            go_root,
            go_path,
            mod_cache,
        }
    }
}

/// Ask the installed toolchain. Returns None when `go` is unavailable.
fn query_go_env() -> Option<GoEnv> {
    let output = Command::new("go")
        .args(["env", "GOROOT", "GOPATH", "GOMODCACHE"])
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut lines = stdout.lines().map(str::trim);
    let non_empty = |s: Option<&str>| s.filter(|v| !v.is_empty()).map(PathBuf::from);

    let go_root = non_empty(lines.next());
    let go_path = lines
        .next()
        .map(|p| std::env::split_paths(p).collect())
        .unwrap_or_default();
    let mod_cache = non_empty(lines.next());
    debug!(?go_root, ?go_path, ?mod_cache, "queried go env");

    Some(GoEnv {
        go_root,
        go_path,
        mod_cache,
    })
}

/// The build search path used to locate packages.
pub struct BuildContext {
    env: GoEnv,
    module: Option<GoModule>,
    parser: GoParser,
}

impl BuildContext {
    /// Build a context from explicit parts.
    pub fn new(env: GoEnv, module: Option<GoModule>) -> Result<Self> {
        Ok(Self {
            env,
            module,
            parser: GoParser::new()?,
        })
    }

    /// Discover the module enclosing `start` (or the configured module root).
    pub fn discover(build: &BuildConfig, start: &Path) -> Result<Self> {
        let module = match &build.module_root {
            Some(root) => Some(GoModule::load(root)?),
            None => GoModule::find_enclosing(start)?,
        };
        if let Some(m) = &module {
            debug!(module = m.module_path(), root = %m.root().display(), "using module");
        }
        Self::new(GoEnv::discover(build), module)
    }

    pub fn module(&self) -> Option<&GoModule> {
        self.module.as_ref()
    }

    /// Resolve the generator's target: an existing directory or an import path.
    ///
    /// Returns the import path and the package directory.
    pub fn resolve_target(&self, target: &str) -> Result<(String, PathBuf)> {
        let as_dir = Path::new(target);
        let looks_like_dir = target.starts_with('.') || as_dir.is_absolute();

        if looks_like_dir && as_dir.is_dir() {
            let dir = as_dir
                .canonicalize()
                .map_err(|e| GenerateError::io(as_dir, e))?;
            let import_path = self.import_path_of(&dir).ok_or_else(|| GenerateError::Resolve {
                import_path: target.to_string(),
            })?;
            return Ok((import_path, dir));
        }

        match self.locate(target) {
            Some(dir) => Ok((target.to_string(), dir)),
            None => Err(GenerateError::Resolve {
                import_path: target.to_string(),
            }),
        }
    }

    /// Import path of a package directory, via the module or GOPATH.
    fn import_path_of(&self, dir: &Path) -> Option<String> {
        let in_module = self.module.as_ref().and_then(|m| m.import_path_of(dir));
        if in_module.is_some() {
            return in_module;
        }

        self.env.go_path.iter().find_map(|gp| {
            let src = gp.join("src").canonicalize().ok()?;
            let rel = dir.strip_prefix(&src).ok()?;
            let path = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>()
                .join("/");
            (!path.is_empty()).then_some(path)
        })
    }

    fn candidates(&self, import_path: &str) -> Vec<PathBuf> {
        let mut dirs = Vec::new();

        if let Some(module) = &self.module {
            dirs.extend(module.local_dir(import_path));
            dirs.extend(module.replaced_dir(import_path));
            dirs.push(join_import(&module.root().join("vendor"), import_path));

            if let (Some(cache), Some((required, version))) =
                (&self.env.mod_cache, module.required_module(import_path))
            {
                let rest = &import_path[required.len()..];
                let versioned = format!("{}@{}", escape_module_path(required), version);
                dirs.push(join_import(&cache.join(versioned), rest));
            }
        }

        for gp in &self.env.go_path {
            dirs.push(join_import(&gp.join("src"), import_path));
        }
        if let Some(root) = &self.env.go_root {
            dirs.push(join_import(&root.join("src"), import_path));
        }

        dirs
    }
}

impl PackageLocator for BuildContext {
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        if import_path.is_empty() || import_path == "C" {
            return None;
        }
        self.candidates(import_path).into_iter().find(|d| has_go_files(d))
    }

    fn package_name(&self, import_path: &str) -> Option<String> {
        match self.locate(import_path) {
            Some(dir) => package_name_in(&self.parser, &dir),
            // Without a GOROOT the standard library cannot be read; its package
            // names always match the last path element.
            None if self.env.go_root.is_none() && is_stdlib_path(import_path) => {
                import_path.rsplit('/').next().map(str::to_string)
            }
            None => None,
        }
    }

    fn exported_names(&self, import_path: &str) -> Option<BTreeSet<String>> {
        let dir = self.locate(import_path)?;
        exported_names_in(&self.parser, &dir)
    }

    fn language_version(&self) -> Option<GoVersion> {
        self.module.as_ref().map(GoModule::go_version)
    }
}

/// A fixed set of packages, for tests and callers that already know the layout.
#[derive(Debug, Clone, Default)]
pub struct StaticLocator {
    packages: HashMap<String, (PathBuf, String)>,
    exports: HashMap<String, BTreeSet<String>>,
    language: Option<GoVersion>,
}

impl StaticLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, import_path: &str, dir: impl Into<PathBuf>, name: &str) -> Self {
        self.packages
            .insert(import_path.to_string(), (dir.into(), name.to_string()));
        self
    }

    /// Declare the exported names of a package.
    pub fn with_exports(mut self, import_path: &str, names: &[&str]) -> Self {
        self.exports.insert(
            import_path.to_string(),
            names.iter().map(|n| n.to_string()).collect(),
        );
        self
    }

    pub fn with_language(mut self, version: GoVersion) -> Self {
        self.language = Some(version);
        self
    }
}

impl PackageLocator for StaticLocator {
    fn locate(&self, import_path: &str) -> Option<PathBuf> {
        self.packages.get(import_path).map(|(dir, _)| dir.clone())
    }

    fn package_name(&self, import_path: &str) -> Option<String> {
        self.packages.get(import_path).map(|(_, name)| name.clone())
    }

    fn exported_names(&self, import_path: &str) -> Option<BTreeSet<String>> {
        self.exports.get(import_path).cloned()
    }

    fn language_version(&self) -> Option<GoVersion> {
        self.language
    }
}

/// Package clause of the first non-test Go file in `dir`.
fn package_name_in(parser: &GoParser, dir: &Path) -> Option<String> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_go_source(p))
        .collect();
    files.sort();

    files.iter().find_map(|path| {
        let source = fs::read(path).ok()?;
        parser
            .package_name(&source)
            .filter(|name| !name.ends_with("_test") && name != "documentation")
    })
}

/// Exported top-level names over every non-test file of the package in `dir`.
fn exported_names_in(parser: &GoParser, dir: &Path) -> Option<BTreeSet<String>> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| is_go_source(p))
        .collect();
    files.sort();

    let mut names = BTreeSet::new();
    for path in files {
        let file = match parser.parse_file(&path) {
            Ok(file) => file,
            Err(e) => {
                debug!(file = %path.display(), error = %e, "skipping unparsable file");
                continue;
            }
        };
        if file.package.ends_with("_test") {
            continue;
        }
        for decl in &file.declarations {
            let declared: Vec<&str> = match decl {
                Declaration::Values(group) => group.members.iter().map(|m| m.name.as_str()).collect(),
                Declaration::Types(group) => group.specs.iter().map(|s| s.name.as_str()).collect(),
                Declaration::Function(f) => vec![f.name.as_str()],
                Declaration::Imports(_) => Vec::new(),
            };
            names.extend(declared.into_iter().filter(|n| is_exported(n)).map(str::to_string));
        }
    }
    Some(names)
}

fn has_go_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| entries.filter_map(|e| e.ok()).any(|e| is_go_source(&e.path())))
        .unwrap_or(false)
}

/// A non-test `.go` file.
pub(crate) fn is_go_source(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    path.is_file() && name.ends_with(".go") && !name.ends_with("_test.go")
}

/// Standard library paths have no dot in their first element.
pub fn is_stdlib_path(import_path: &str) -> bool {
    let first = import_path.split('/').next().unwrap_or("");
    !first.is_empty() && !first.contains('.')
}

/// Module cache escaping: upper-case letters become '!' + lower case.
pub fn escape_module_path(module: &str) -> String {
    let mut escaped = String::with_capacity(module.len());
    for c in module.chars() {
        if c.is_ascii_uppercase() {
            escaped.push('!');
            escaped.push(c.to_ascii_lowercase());
        } else {
            escaped.push(c);
        }
    }
    escaped
}

fn join_import(base: &Path, import_path: &str) -> PathBuf {
    import_path
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}
