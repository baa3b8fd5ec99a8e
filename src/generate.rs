//! Generation run: locate the package, load it, transform it, write the output.
//!
//! A run is sequential and fail-fast. Files written before a fatal error
//! stay on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use globset::GlobSet;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, Result};
use crate::model::{file_name_of, Mode, Package, SourceFile};
use crate::parser::GoParser;
use crate::proxy::{build_proxy, Exclusion};
use crate::render::render_file;
use crate::resolve::{BuildContext, PackageLocator};

lazy_static! {
    /// Go's marker for machine-generated files.
    static ref GENERATED_MARKER: Regex =
        Regex::new(r"(?m)^// Code generated .* DO NOT EDIT\.$").unwrap();
}

/// Summary of one run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub import_path: String,
    pub package: String,
    pub mode: Mode,
    /// Alias the original package is imported under.
    pub alias: String,
    pub output_dir: PathBuf,
    /// Files written, sidecar included.
    pub written: Vec<PathBuf>,
    /// Source files that produced no output, with the reason.
    pub skipped_files: Vec<SkippedFile>,
    pub exclusions: Vec<Exclusion>,
    pub unresolved_imports: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedFile {
    pub file: String,
    pub reason: String,
}

impl SkippedFile {
    fn new(file: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            reason: reason.into(),
        }
    }
}

/// Runs the generator with one configuration.
#[derive(Debug, Clone)]
pub struct Generator {
    config: GeneratorConfig,
    mode: Mode,
    force: bool,
}

impl Generator {
    pub fn new(config: GeneratorConfig, mode: Mode) -> Self {
        Self {
            config,
            mode,
            force: false,
        }
    }

    /// Allow overwriting output files that were not generated by a tool.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Generate the proxy of `target` (an import path or a package directory)
    /// into `out_dir`, resolving against the discovered build context.
    pub fn run(&self, target: &str, out_dir: &Path) -> Result<GenerationReport> {
        let start = if Path::new(target).is_dir() {
            PathBuf::from(target)
        } else {
            std::env::current_dir().map_err(|e| GenerateError::io(".", e))?
        };
        let context = BuildContext::discover(&self.config.build, &start)?;
        let (import_path, dir) = context.resolve_target(target)?;
        info!(%import_path, dir = %dir.display(), "resolved package");
        self.run_with(&context, &import_path, &dir, out_dir)
    }

    /// Generate the proxy of the package in `dir`, known as `import_path`.
    pub fn run_with(
        &self,
        locator: &dyn PackageLocator,
        import_path: &str,
        dir: &Path,
        out_dir: &Path,
    ) -> Result<GenerationReport> {
        let parser = GoParser::new()?;
        let exclude = self
            .config
            .exclude_set()
            .map_err(|message| GenerateError::Config {
                path: PathBuf::from("exclude_files"),
                message,
            })?;

        let loaded = load_package(&parser, import_path, dir, &exclude)?;
        let package = loaded.package;
        let mut skipped_files = loaded.skipped;

        let proxy = build_proxy(&package, locator, &self.config, self.mode)?;

        fs::create_dir_all(out_dir).map_err(|e| GenerateError::io(out_dir, e))?;

        let mut written = Vec::new();
        for file in &proxy.files {
            let path = out_dir.join(&file.file_name);
            self.write_output(&path, &render_file(file))?;
            written.push(path);
        }

        let sidecar_path = out_dir.join(&self.config.sidecar_file);
        match &proxy.sidecar {
            Some(source) => {
                self.write_output(&sidecar_path, source)?;
                written.push(sidecar_path);
            }
            None => remove_stale_sidecar(&sidecar_path)?,
        }

        for file in &package.files {
            let name = file.file_name();
            if !proxy.files.iter().any(|f| f.file_name == name) {
                skipped_files.push(SkippedFile::new(name, "no exported symbols to proxy"));
            }
        }
        skipped_files.sort_by(|a, b| a.file.cmp(&b.file));

        Ok(GenerationReport {
            import_path: proxy.import_path,
            package: proxy.package,
            mode: self.mode,
            alias: proxy.alias,
            output_dir: out_dir.to_path_buf(),
            written,
            skipped_files,
            exclusions: proxy.exclusions,
            unresolved_imports: proxy.unresolved_imports,
        })
    }

    /// Write `content`, refusing to clobber hand-written files unless forced.
    fn write_output(&self, path: &Path, content: &str) -> Result<()> {
        if !self.force && path.exists() && !is_generated_file(path)? {
            return Err(GenerateError::OutputConflict {
                path: path.to_path_buf(),
            });
        }
        fs::write(path, content).map_err(|e| GenerateError::io(path, e))?;
        info!(path = %path.display(), "wrote proxy file");
        Ok(())
    }
}

/// Whether the file at `path` carries a "Code generated ... DO NOT EDIT." line.
pub fn is_generated_file(path: &Path) -> Result<bool> {
    let content = fs::read_to_string(path).map_err(|e| GenerateError::io(path, e))?;
    Ok(GENERATED_MARKER.is_match(&content))
}

fn remove_stale_sidecar(path: &Path) -> Result<()> {
    if path.is_file() && is_generated_file(path)? {
        fs::remove_file(path).map_err(|e| GenerateError::io(path, e))?;
        info!(path = %path.display(), "removed hook runtime left by an instrumented run");
    }
    Ok(())
}

struct LoadedPackage {
    package: Package,
    skipped: Vec<SkippedFile>,
}

/// Parse the non-test files of `dir` and pick the package to proxy.
fn load_package(
    parser: &GoParser,
    import_path: &str,
    dir: &Path,
    exclude: &GlobSet,
) -> Result<LoadedPackage> {
    let mut skipped = Vec::new();
    let mut by_package: BTreeMap<String, Vec<SourceFile>> = BTreeMap::new();

    let walker = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(dir).to_path_buf();
            GenerateError::io(path, std::io::Error::from(e))
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() {
            continue;
        }
        let name = file_name_of(path);
        if !name.ends_with(".go") || name.ends_with("_test.go") {
            continue;
        }
        if exclude.is_match(&name) {
            debug!(file = %name, "excluded by config");
            skipped.push(SkippedFile::new(name, "excluded by config"));
            continue;
        }

        let file = parser.parse_file(path)?;
        debug!(file = %name, package = %file.package, "parsed");
        by_package.entry(file.package.clone()).or_default().push(file);
    }

    by_package.retain(|name, files| {
        if name.ends_with("_test") {
            skipped.extend(
                files
                    .iter()
                    .map(|f| SkippedFile::new(f.file_name(), "external test package")),
            );
            return false;
        }
        true
    });

    // Most files wins; BTreeMap order breaks ties by name.
    let chosen = by_package
        .iter()
        .max_by(|(a_name, a), (b_name, b)| a.len().cmp(&b.len()).then_with(|| b_name.cmp(a_name)))
        .map(|(name, _)| name.clone())
        .ok_or_else(|| GenerateError::NoPackage {
            dir: dir.to_path_buf(),
        })?;

    let mut files = Vec::new();
    for (name, group) in by_package {
        if name == chosen {
            files = group;
            continue;
        }
        warn!(package = %name, chosen = %chosen, "directory holds several packages, skipping one");
        skipped.extend(
            group
                .iter()
                .map(|f| SkippedFile::new(f.file_name(), format!("belongs to package {}", name))),
        );
    }

    Ok(LoadedPackage {
        package: Package {
            name: chosen,
            import_path: import_path.to_string(),
            dir: dir.to_path_buf(),
            files,
        },
        skipped,
    })
}
