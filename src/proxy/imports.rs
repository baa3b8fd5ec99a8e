//! Import resolution and dead-import elimination.
//!
//! [`ImportTable`] is built once per package and maps every unaliased import
//! path to the name it is referred to by (its package clause), and every
//! dot-imported path to the names it exports. It is read-only afterwards. [`ImportResolver`] works on one file: it learns the
//! file's imports, records which qualifiers the kept signatures mention, and
//! finally returns only the imports that are still needed.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use tracing::{debug, warn};

use super::classify::is_predeclared;
use super::PackageScope;
use crate::model::{Declaration, Function, ImportEntry, Package, TypeExpr, TypeSpec};
use crate::resolve::PackageLocator;

/// Package-wide cache: import path -> conventional name, and dot-imported
/// path -> exported names.
#[derive(Debug, Clone, Default)]
pub struct ImportTable {
    names: BTreeMap<String, Option<String>>,
    dot_exports: BTreeMap<String, Option<BTreeSet<String>>>,
}

impl ImportTable {
    /// Resolve every unaliased and dot import of the package once.
    pub fn build(package: &Package, locator: &dyn PackageLocator) -> Self {
        let mut names = BTreeMap::new();
        let mut dot_exports = BTreeMap::new();
        for decl in package.declarations() {
            let Declaration::Imports(entries) = decl else {
                continue;
            };
            for entry in entries.iter().filter(|e| e.is_dot()) {
                if dot_exports.contains_key(&entry.path) {
                    continue;
                }
                let exports = locator.exported_names(&entry.path);
                if exports.is_none() {
                    debug!(path = %entry.path, "cannot read dot import, keeping it when unsure");
                }
                dot_exports.insert(entry.path.clone(), exports);
            }
            for entry in entries.iter().filter(|e| e.alias.is_none()) {
                if names.contains_key(&entry.path) {
                    continue;
                }
                let name = locator.package_name(&entry.path);
                match &name {
                    Some(name) => debug!(path = %entry.path, %name, "resolved import"),
                    None => warn!(path = %entry.path, "cannot resolve import, dropping it"),
                }
                names.insert(entry.path.clone(), name);
            }
        }
        Self { names, dot_exports }
    }

    /// Name an unaliased import is referred to by, when it could be resolved.
    pub fn conventional_name(&self, path: &str) -> Option<&str> {
        self.names.get(path).and_then(|n| n.as_deref())
    }

    /// Exported names of a dot-imported package, when it could be read.
    pub fn dot_exports(&self, path: &str) -> Option<&BTreeSet<String>> {
        self.dot_exports.get(path).and_then(|e| e.as_ref())
    }

    /// Import paths that could not be located, sorted.
    pub fn unresolved(&self) -> Vec<String> {
        self.names
            .iter()
            .filter(|(_, name)| name.is_none())
            .map(|(path, _)| path.clone())
            .collect()
    }
}

/// Per-file import bookkeeping.
#[derive(Debug)]
pub struct ImportResolver<'t> {
    table: &'t ImportTable,
    /// Qualifier -> the import that introduces it.
    known: HashMap<String, ImportEntry>,
    dots: Vec<ImportEntry>,
    used: HashSet<String>,
    /// Bare names neither predeclared nor declared by the package.
    bare: BTreeSet<String>,
}

impl<'t> ImportResolver<'t> {
    pub fn new(table: &'t ImportTable) -> Self {
        Self {
            table,
            known: HashMap::new(),
            dots: Vec::new(),
            used: HashSet::new(),
            bare: BTreeSet::new(),
        }
    }

    /// Learn the imports of one import group.
    pub fn register(&mut self, entries: &[ImportEntry]) {
        for entry in entries {
            if entry.is_blank() {
                continue;
            }
            if entry.is_dot() {
                self.dots.push(entry.clone());
                continue;
            }
            let qualifier = match &entry.alias {
                Some(alias) => Some(alias.as_str()),
                None => self.table.conventional_name(&entry.path),
            };
            if let Some(qualifier) = qualifier {
                self.known.insert(qualifier.to_string(), entry.clone());
            }
        }
    }

    /// Record the qualifiers a kept function's signature needs.
    pub fn note_function(&mut self, f: &Function, scope: &PackageScope) {
        let own = f.type_param_names();
        for ty in f.signature_types() {
            self.note(ty, &own, scope);
        }
    }

    /// Record the qualifiers a kept generic type's constraints need.
    pub fn note_type_spec(&mut self, spec: &TypeSpec, scope: &PackageScope) {
        let own: Vec<&str> = spec
            .type_params
            .iter()
            .flat_map(|tp| tp.names.iter().map(String::as_str))
            .collect();
        for tp in &spec.type_params {
            self.note(&tp.constraint, &own, scope);
        }
    }

    fn note(&mut self, ty: &TypeExpr, type_params: &[&str], scope: &PackageScope) {
        ty.walk(&mut |t| match t {
            TypeExpr::Qualified { package, .. } => {
                self.used.insert(package.clone());
            }
            TypeExpr::Named(name) => {
                if !is_predeclared(name)
                    && !scope.declares(name)
                    && !type_params.contains(&name.as_str())
                {
                    self.bare.insert(name.clone());
                }
            }
            _ => {}
        });
    }

    /// Imports the generated file needs, sorted by path then alias.
    ///
    /// A dot import is kept when it exports one of the bare names. Dot
    /// imports whose exports are unknown are kept only while some bare name
    /// is not accounted for by another one.
    pub fn finish(self) -> Vec<ImportEntry> {
        let table = self.table;
        let bare = &self.bare;
        let unclaimed = bare.iter().any(|name| {
            !self
                .dots
                .iter()
                .any(|d| table.dot_exports(&d.path).is_some_and(|e| e.contains(name)))
        });
        let dots = self.dots.iter().filter(|d| match table.dot_exports(&d.path) {
            Some(exports) => bare.iter().any(|name| exports.contains(name)),
            None => unclaimed,
        });

        let mut out: Vec<ImportEntry> = self
            .known
            .iter()
            .filter(|(qualifier, _)| self.used.contains(*qualifier))
            .map(|(_, entry)| entry.clone())
            .chain(dots.cloned())
            .collect();
        out.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.alias.cmp(&b.alias)));
        out.dedup();
        out
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::model::{ParamGroup, SourceFile};
    use crate::resolve::StaticLocator;

    fn package(imports: Vec<ImportEntry>) -> Package {
        Package {
            name: "shapes".into(),
            import_path: "example.com/shapes".into(),
            dir: PathBuf::from("/src/shapes"),
            files: vec![SourceFile {
                path: PathBuf::from("/src/shapes/a.go"),
                package: "shapes".into(),
                leading_comments: vec![],
                has_package_doc: false,
                declarations: vec![Declaration::Imports(imports)],
            }],
        }
    }

    fn function(params: Vec<ParamGroup>) -> Function {
        Function {
            name: "Draw".into(),
            exported: true,
            doc: None,
            type_params: vec![],
            params,
            results: vec![],
            body: None,
        }
    }

    #[test]
    fn test_table_resolves_unaliased_imports() {
        let locator = StaticLocator::new()
            .with("fmt", "/go/src/fmt", "fmt")
            .with("example.com/geom", "/src/geom", "geometry");
        let pkg = package(vec![
            ImportEntry::new(None, "fmt"),
            ImportEntry::new(None, "example.com/geom"),
            ImportEntry::new(None, "example.com/missing"),
            ImportEntry::new(Some("u"), "example.com/units"),
        ]);

        let table = ImportTable::build(&pkg, &locator);
        assert_eq!(table.conventional_name("example.com/geom"), Some("geometry"));
        assert_eq!(table.conventional_name("example.com/units"), None);
        assert_eq!(table.unresolved(), vec!["example.com/missing".to_string()]);
    }

    #[test]
    fn test_only_referenced_imports_survive() {
        let locator = StaticLocator::new().with("fmt", "/go/src/fmt", "fmt");
        let imports = vec![
            ImportEntry::new(None, "fmt"),
            ImportEntry::new(Some("a"), "pkg/a"),
            ImportEntry::new(Some("_"), "embed"),
        ];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &locator);
        let scope = PackageScope::from_package(&pkg);

        let mut resolver = ImportResolver::new(&table);
        resolver.register(&imports);
        resolver.note_function(
            &function(vec![ParamGroup::named(
                ["m"],
                TypeExpr::Map {
                    key: Box::new(TypeExpr::named("string")),
                    value: Box::new(TypeExpr::Pointer(Box::new(TypeExpr::qualified("a", "Thing")))),
                },
            )]),
            &scope,
        );

        assert_eq!(resolver.finish(), vec![ImportEntry::new(Some("a"), "pkg/a")]);
    }

    #[test]
    fn test_dot_import_kept_for_unknown_bare_names() {
        let imports = vec![ImportEntry::new(Some("."), "example.com/units")];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &StaticLocator::new());
        let scope = PackageScope::from_package(&pkg);

        let mut plain = ImportResolver::new(&table);
        plain.register(&imports);
        plain.note_function(&function(vec![ParamGroup::named(["n"], TypeExpr::named("int"))]), &scope);
        assert!(plain.finish().is_empty());

        let mut dotted = ImportResolver::new(&table);
        dotted.register(&imports);
        dotted.note_function(&function(vec![ParamGroup::named(["m"], TypeExpr::named("Meters"))]), &scope);
        assert_eq!(dotted.finish(), imports);
    }

    #[test]
    fn test_only_the_dot_import_supplying_a_name_survives() {
        let locator = StaticLocator::new()
            .with_exports("example.com/units", &["Meters", "Feet"])
            .with_exports("example.com/colors", &["Red"]);
        let imports = vec![
            ImportEntry::new(Some("."), "example.com/colors"),
            ImportEntry::new(Some("."), "example.com/units"),
        ];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &locator);
        let scope = PackageScope::from_package(&pkg);

        let mut resolver = ImportResolver::new(&table);
        resolver.register(&imports);
        resolver.note_function(
            &function(vec![ParamGroup::named(["m"], TypeExpr::named("Meters"))]),
            &scope,
        );
        assert_eq!(
            resolver.finish(),
            vec![ImportEntry::new(Some("."), "example.com/units")]
        );
    }

    #[test]
    fn test_unreadable_dot_import_kept_only_for_unclaimed_names() {
        let locator = StaticLocator::new().with_exports("example.com/units", &["Meters"]);
        let imports = vec![
            ImportEntry::new(Some("."), "example.com/opaque"),
            ImportEntry::new(Some("."), "example.com/units"),
        ];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &locator);
        let scope = PackageScope::from_package(&pkg);

        let mut claimed = ImportResolver::new(&table);
        claimed.register(&imports);
        claimed.note_function(&function(vec![ParamGroup::named(["m"], TypeExpr::named("Meters"))]), &scope);
        assert_eq!(claimed.finish(), vec![ImportEntry::new(Some("."), "example.com/units")]);

        let mut unclaimed = ImportResolver::new(&table);
        unclaimed.register(&imports);
        unclaimed.note_function(&function(vec![ParamGroup::named(["c"], TypeExpr::named("Color"))]), &scope);
        assert_eq!(unclaimed.finish(), vec![ImportEntry::new(Some("."), "example.com/opaque")]);
    }

    #[test]
    fn test_array_length_qualifier_keeps_import() {
        let locator = StaticLocator::new().with("example.com/limits", "/src/limits", "limits");
        let imports = vec![ImportEntry::new(None, "example.com/limits")];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &locator);
        let scope = PackageScope::from_package(&pkg);

        let mut resolver = ImportResolver::new(&table);
        resolver.register(&imports);
        resolver.note_function(
            &function(vec![ParamGroup::named(
                ["buf"],
                TypeExpr::Array {
                    len: "limits.Max + len(x)".into(),
                    len_refs: vec![
                        TypeExpr::qualified("limits", "Max"),
                        TypeExpr::named("len"),
                        TypeExpr::named("x"),
                    ],
                    elem: Box::new(TypeExpr::named("byte")),
                },
            )]),
            &scope,
        );
        // `x` is unknown, but there is no dot import to supply it.
        assert_eq!(resolver.finish(), imports);
    }

    #[test]
    fn test_output_is_sorted() {
        let locator = StaticLocator::new()
            .with("time", "/go/src/time", "time")
            .with("io", "/go/src/io", "io");
        let imports = vec![ImportEntry::new(None, "time"), ImportEntry::new(None, "io")];
        let pkg = package(imports.clone());
        let table = ImportTable::build(&pkg, &locator);
        let scope = PackageScope::from_package(&pkg);

        let mut resolver = ImportResolver::new(&table);
        resolver.register(&imports);
        resolver.note_function(
            &function(vec![
                ParamGroup::named(["d"], TypeExpr::qualified("time", "Duration")),
                ParamGroup::named(["w"], TypeExpr::qualified("io", "Writer")),
            ]),
            &scope,
        );
        assert_eq!(
            resolver.finish(),
            vec![ImportEntry::new(None, "io"), ImportEntry::new(None, "time")]
        );
    }
}
