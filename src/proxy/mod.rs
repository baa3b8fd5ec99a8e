//! The proxy transformation engine.
//!
//! ```text
//! Package ──▶ PackageScope ──▶ choose_alias ──▶ Assembler (per file)
//!                                                  │
//!                 ┌────────────────────────────────┼──────────────────┐
//!                 ▼                                ▼                  ▼
//!            classify ──▶ rewrite (var/const/type) │ synth (func)  ImportResolver
//!                                                  ▼
//!                                              ProxyFile ──▶ render
//! ```
//!
//! Everything here is pure: inputs are borrowed, outputs are freshly built,
//! and nothing touches the filesystem. [`crate::generate`] does the I/O.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::error::{GenerateError, Result};
use crate::model::{Declaration, Mode, Package, ProxyFile};
use crate::resolve::{GoVersion, PackageLocator};

mod assemble;
mod classify;
mod imports;
mod rewrite;
mod sidecar;
mod synth;

pub use assemble::{Assembler, FileOutcome};
pub use classify::{check_function, classify, declared_names, omitted_types, PackageScope, Verdict};
pub use imports::{ImportResolver, ImportTable};
pub use rewrite::{alias_types, alias_values};
pub use sidecar::{render_sidecar, reserved_identifiers};
pub use synth::{bind, forward};

/// Why an exported symbol was left out of the proxy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ExclusionReason {
    /// The signature mentions an unexported type of the original package.
    UnexportedType(String),
    /// A parameter has no name, so it cannot be passed through.
    UnnamedParameter,
    /// A parameter is named `_`, so it cannot be passed through.
    BlankParameter,
    /// Generic functions cannot be bound as values without instantiation.
    GenericFunctionInNoopMode,
    /// Generic type aliases need a newer language version than the module declares.
    GenericTypeAlias(String),
    /// The signature names a type the proxy leaves out.
    OmittedType(String),
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::UnexportedType(name) => {
                write!(f, "signature uses unexported type {}", name)
            }
            ExclusionReason::UnnamedParameter => write!(f, "unnamed parameter"),
            ExclusionReason::BlankParameter => write!(f, "blank parameter name"),
            ExclusionReason::GenericFunctionInNoopMode => {
                write!(f, "generic function cannot be aliased in noop mode")
            }
            ExclusionReason::GenericTypeAlias(version) => write!(
                f,
                "generic type alias needs go {}, module declares go {}",
                GoVersion::GENERIC_ALIASES,
                version
            ),
            ExclusionReason::OmittedType(name) => {
                write!(f, "signature uses type {} which the proxy omits", name)
            }
        }
    }
}

/// An exported symbol that was not forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Exclusion {
    pub file: String,
    pub symbol: String,
    pub reason: ExclusionReason,
}

/// Settings shared by every file of one generation run.
#[derive(Debug, Clone, Copy)]
pub struct ProxyContext<'a> {
    pub scope: &'a PackageScope,
    /// Synthetic alias of the original package.
    pub alias: &'a str,
    pub mode: Mode,
    /// Name of the hook helper emitted in the sidecar.
    pub hook_function: &'a str,
}

/// The complete output of one package, not yet written anywhere.
#[derive(Debug, Clone)]
pub struct ProxyPackage {
    pub package: String,
    pub import_path: String,
    pub alias: String,
    pub files: Vec<ProxyFile>,
    /// Hook runtime source, instrumented mode only.
    pub sidecar: Option<String>,
    pub exclusions: Vec<Exclusion>,
    /// Imports that could not be located on the build search path.
    pub unresolved_imports: Vec<String>,
}

/// Transform a parsed package into its proxy.
pub fn build_proxy(
    package: &Package,
    locator: &dyn PackageLocator,
    config: &GeneratorConfig,
    mode: Mode,
) -> Result<ProxyPackage> {
    let scope = PackageScope::from_package(package).with_language(locator.language_version());

    if mode == Mode::Instrumented {
        check_reserved(package, config)?;
    }

    let table = ImportTable::build(package, locator);
    let alias = choose_alias(package, &scope, &table, &config.alias_prefix);
    debug!(
        package = %package.name,
        %alias,
        %mode,
        generic_aliases = scope.allows_generic_aliases(),
        "building proxy"
    );

    let ctx = ProxyContext {
        scope: &scope,
        alias: &alias,
        mode,
        hook_function: &config.hook_function,
    };
    let assembler = Assembler::new(ctx, &table, &package.import_path, &config.tool_identity);

    let mut files = Vec::new();
    let mut exclusions = Vec::new();
    for file in &package.files {
        let outcome = assembler.assemble(file);
        exclusions.extend(outcome.exclusions);
        files.extend(outcome.artifact);
    }

    let sidecar = match mode {
        Mode::Instrumented => Some(render_sidecar(config, &package.name)),
        Mode::Noop => None,
    };

    Ok(ProxyPackage {
        package: package.name.clone(),
        import_path: package.import_path.clone(),
        alias,
        files,
        sidecar,
        exclusions,
        unresolved_imports: table.unresolved(),
    })
}

/// Pick `<prefix><package>` unless something in the package already uses it;
/// then append 1, 2, ... until it is free. Import names count, since the
/// synthetic import shares the file block with kept imports.
pub fn choose_alias(
    package: &Package,
    scope: &PackageScope,
    table: &ImportTable,
    prefix: &str,
) -> String {
    let mut taken: HashSet<&str> = HashSet::new();
    for decl in package.declarations() {
        if let Declaration::Imports(entries) = decl {
            for entry in entries.iter().filter(|e| !e.is_dot() && !e.is_blank()) {
                let name = match &entry.alias {
                    Some(alias) => Some(alias.as_str()),
                    None => table.conventional_name(&entry.path),
                };
                taken.extend(name);
            }
        }
        if let Declaration::Function(f) = decl {
            if !f.exported {
                continue;
            }
            taken.extend(f.type_param_names());
            for group in f.params.iter().chain(f.results.iter()) {
                taken.extend(group.names.iter().map(String::as_str));
            }
        }
    }

    let base = format!("{}{}", prefix, package.name);
    let free = |candidate: &str| !taken.contains(candidate) && !scope.declares(candidate);
    if free(base.as_str()) {
        return base;
    }
    (1..)
        .map(|n| format!("{}{}", base, n))
        .find(|candidate| free(candidate.as_str()))
        .unwrap_or(base)
}

/// The sidecar's identifiers and file name must not clash with the package.
fn check_reserved(package: &Package, config: &GeneratorConfig) -> Result<()> {
    let reserved = reserved_identifiers(config);

    for file in &package.files {
        if file.file_name() == config.sidecar_file {
            return Err(GenerateError::ReservedName {
                name: config.sidecar_file.clone(),
                file: file.file_name(),
            });
        }
        for decl in &file.declarations {
            let mut names = declared_names(decl);
            if let Declaration::Function(f) = decl {
                names.extend(f.type_param_names());
                names.extend(
                    f.params
                        .iter()
                        .chain(f.results.iter())
                        .flat_map(|p| p.names.iter().map(String::as_str)),
                );
            }
            if let Some(name) = reserved.iter().find(|r| names.contains(&r.as_str())) {
                return Err(GenerateError::ReservedName {
                    name: name.clone(),
                    file: file.file_name(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{Function, ImportEntry, ParamGroup, SourceFile, TypeExpr, TypeParam};
    use crate::resolve::StaticLocator;

    fn function(name: &str, params: Vec<ParamGroup>) -> Declaration {
        Declaration::Function(Function {
            name: name.to_string(),
            exported: crate::model::is_exported(name),
            doc: None,
            type_params: vec![],
            params,
            results: vec![],
            body: None,
        })
    }

    fn alias_for(pkg: &Package, locator: &StaticLocator) -> String {
        let scope = PackageScope::from_package(pkg);
        let table = ImportTable::build(pkg, locator);
        choose_alias(pkg, &scope, &table, "__")
    }

    fn package(declarations: Vec<Declaration>) -> Package {
        Package {
            name: "shapes".to_string(),
            import_path: "example.com/shapes".to_string(),
            dir: PathBuf::from("/src/shapes"),
            files: vec![SourceFile {
                path: PathBuf::from("/src/shapes/shapes.go"),
                package: "shapes".to_string(),
                leading_comments: vec![],
                has_package_doc: false,
                declarations,
            }],
        }
    }

    #[test]
    fn test_choose_alias_default() {
        let pkg = package(vec![function("Area", vec![])]);
        assert_eq!(alias_for(&pkg, &StaticLocator::new()), "__shapes");
    }

    #[test]
    fn test_choose_alias_avoids_parameter_and_top_level_names() {
        let pkg = package(vec![
            function(
                "Area",
                vec![ParamGroup::named(["__shapes"], TypeExpr::named("int"))],
            ),
            function("__shapes1", vec![]),
        ]);
        assert_eq!(alias_for(&pkg, &StaticLocator::new()), "__shapes2");
    }

    #[test]
    fn test_choose_alias_avoids_import_names() {
        let locator = StaticLocator::new().with("example.com/legacy", "/src/legacy", "__shapes1");
        let pkg = package(vec![
            Declaration::Imports(vec![
                ImportEntry::new(Some("__shapes"), "example.com/old/shapes"),
                ImportEntry::new(None, "example.com/legacy"),
                ImportEntry::new(Some("_"), "embed"),
            ]),
            function("Area", vec![]),
        ]);
        assert_eq!(alias_for(&pkg, &locator), "__shapes2");
    }

    #[test]
    fn test_reserved_identifier_is_fatal() {
        let pkg = package(vec![function("SetProxyInvocationHandler", vec![])]);
        let err = check_reserved(&pkg, &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GenerateError::ReservedName { ref name, .. } if name == "SetProxyInvocationHandler"));
    }

    #[test]
    fn test_reserved_result_and_type_parameter_names() {
        let named_result = Declaration::Function(Function {
            name: "Area".into(),
            exported: true,
            doc: None,
            type_params: vec![],
            params: vec![],
            results: vec![ParamGroup::named(["__invokeHandler"], TypeExpr::named("int"))],
            body: None,
        });
        let err = check_reserved(&package(vec![named_result]), &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GenerateError::ReservedName { ref name, .. } if name == "__invokeHandler"));

        let type_param = Declaration::Function(Function {
            name: "Keys".into(),
            exported: true,
            doc: None,
            type_params: vec![TypeParam {
                names: vec!["__invokeHandler".into()],
                constraint: TypeExpr::named("any"),
            }],
            params: vec![],
            results: vec![],
            body: None,
        });
        let err = check_reserved(&package(vec![type_param]), &GeneratorConfig::default()).unwrap_err();
        assert!(matches!(err, GenerateError::ReservedName { ref name, .. } if name == "__invokeHandler"));
    }
}
