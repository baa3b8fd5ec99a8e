//! Symbol classification: which top-level declarations make it into the proxy.

use std::collections::HashSet;

use phf::phf_set;

use super::{rewrite, synth, ExclusionReason, ProxyContext};
use crate::model::{is_exported, Declaration, Function, Mode, Package, TypeExpr, TypeGroup};
use crate::resolve::GoVersion;

/// Go's predeclared type names.
pub(crate) static PREDECLARED_TYPES: phf::Set<&'static str> = phf_set! {
    "any", "bool", "byte", "comparable", "complex64", "complex128", "error",
    "float32", "float64", "int", "int8", "int16", "int32", "int64", "rune",
    "string", "uint", "uint8", "uint16", "uint32", "uint64", "uintptr",
};

/// Predeclared constants and builtin functions that can appear in an array length.
pub(crate) static PREDECLARED_VALUES: phf::Set<&'static str> = phf_set! {
    "true", "false", "iota", "nil", "cap", "complex", "imag", "len", "max",
    "min", "real",
};

pub(crate) fn is_predeclared(name: &str) -> bool {
    PREDECLARED_TYPES.contains(name) || PREDECLARED_VALUES.contains(name)
}

/// Package-wide knowledge the classifier needs: which names are declared
/// at the top level, which exported types are generic, and the language
/// version the proxy is compiled under.
#[derive(Debug, Clone, Default)]
pub struct PackageScope {
    identifiers: HashSet<String>,
    generic_types: HashSet<String>,
    language: Option<GoVersion>,
}

impl PackageScope {
    pub fn from_package(package: &Package) -> Self {
        let mut scope = Self::default();
        for decl in package.declarations() {
            if let Declaration::Types(group) = decl {
                scope.generic_types.extend(
                    group
                        .specs
                        .iter()
                        .filter(|s| s.exported && !s.type_params.is_empty())
                        .map(|s| s.name.clone()),
                );
            }
            scope
                .identifiers
                .extend(declared_names(decl).into_iter().map(str::to_string));
        }
        scope
    }

    /// Pin the language version the proxy must compile under.
    pub fn with_language(mut self, language: Option<GoVersion>) -> Self {
        self.language = language;
        self
    }

    pub fn language(&self) -> Option<GoVersion> {
        self.language
    }

    /// Whether `name` is declared at the package's top level.
    pub fn declares(&self, name: &str) -> bool {
        self.identifiers.contains(name)
    }

    /// A top-level symbol of the original package that the proxy cannot name.
    pub fn is_inaccessible(&self, name: &str) -> bool {
        !is_exported(name) && self.identifiers.contains(name)
    }

    /// Whether generic types can be re-declared as aliases.
    pub fn allows_generic_aliases(&self) -> bool {
        self.language
            .map(|v| v.supports_generic_aliases())
            .unwrap_or(true)
    }

    /// An exported type the proxy leaves out.
    pub fn omits_type(&self, name: &str) -> bool {
        !self.allows_generic_aliases() && self.generic_types.contains(name)
    }
}

/// The first symbol in `ty` the proxy cannot reproduce: an unexported
/// package-level name, or the text of a literal type with unexported members.
/// Names in `type_params` shadow package-level ones.
pub(crate) fn first_inaccessible(
    ty: &TypeExpr,
    type_params: &[&str],
    scope: &PackageScope,
) -> Option<String> {
    let mut found = None;
    ty.walk(&mut |t| {
        if found.is_some() {
            return;
        }
        match t {
            TypeExpr::Named(name)
                if scope.is_inaccessible(name) && !type_params.contains(&name.as_str()) =>
            {
                found = Some(name.clone());
            }
            TypeExpr::Literal { text, hidden, .. } if !hidden.is_empty() => {
                found = Some(text.clone());
            }
            _ => {}
        }
    });
    found
}

/// Top-level names a declaration introduces.
pub fn declared_names(decl: &Declaration) -> Vec<&str> {
    match decl {
        Declaration::Values(group) => group.members.iter().map(|m| m.name.as_str()).collect(),
        Declaration::Types(group) => group.specs.iter().map(|s| s.name.as_str()).collect(),
        Declaration::Function(f) => vec![f.name.as_str()],
        Declaration::Imports(_) => Vec::new(),
    }
}

/// Outcome of classifying one declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict<T> {
    /// Kept, rewritten for the proxy.
    Keep(T),
    /// Nothing exported here.
    Skip,
    /// Exported, but cannot be forwarded.
    Exclude {
        symbol: String,
        reason: ExclusionReason,
    },
}

/// Exported types of a group the proxy leaves out, with the reason.
pub fn omitted_types(group: &TypeGroup, scope: &PackageScope) -> Vec<(String, ExclusionReason)> {
    let Some(language) = scope.language() else {
        return Vec::new();
    };
    group
        .specs
        .iter()
        .filter(|s| scope.omits_type(&s.name))
        .map(|s| {
            (
                s.name.clone(),
                ExclusionReason::GenericTypeAlias(language.to_string()),
            )
        })
        .collect()
}

/// Classify a declaration and build its proxy counterpart.
///
/// Import groups are always skipped; the assembler feeds them to the
/// import resolver instead.
pub fn classify(decl: &Declaration, ctx: &ProxyContext<'_>) -> Verdict<Declaration> {
    match decl {
        Declaration::Values(group) => match rewrite::alias_values(group, ctx.alias) {
            Some(out) => Verdict::Keep(Declaration::Values(out)),
            None => Verdict::Skip,
        },
        Declaration::Types(group) => match rewrite::alias_types(group, ctx.alias, ctx.scope) {
            Some(out) => Verdict::Keep(Declaration::Types(out)),
            None => Verdict::Skip,
        },
        Declaration::Imports(_) => Verdict::Skip,
        Declaration::Function(f) => {
            if !f.exported {
                return Verdict::Skip;
            }
            if let Err(reason) = check_function(f, ctx.scope, ctx.mode) {
                return Verdict::Exclude {
                    symbol: f.name.clone(),
                    reason,
                };
            }
            match ctx.mode {
                Mode::Instrumented => Verdict::Keep(Declaration::Function(synth::forward(
                    f,
                    ctx.alias,
                    Some(ctx.hook_function),
                ))),
                Mode::Noop => Verdict::Keep(Declaration::Values(synth::bind(f, ctx.alias))),
            }
        }
    }
}

/// Decide whether an exported function can be proxied in `mode`.
///
/// Any mode rejects signatures mentioning unexported symbols of the package.
/// Forwarding calls additionally need every parameter to have a usable name
/// and every named type to exist in the proxy; value bindings need a
/// non-generic function.
pub fn check_function(f: &Function, scope: &PackageScope, mode: Mode) -> Result<(), ExclusionReason> {
    let type_params = f.type_param_names();

    if let Some(name) = f
        .signature_types()
        .find_map(|ty| first_inaccessible(ty, &type_params, scope))
    {
        return Err(ExclusionReason::UnexportedType(name));
    }

    match mode {
        Mode::Instrumented => {
            let mut omitted = None;
            for ty in f.signature_types() {
                ty.walk(&mut |t| {
                    if let TypeExpr::Named(name) = t {
                        if omitted.is_none()
                            && scope.omits_type(name)
                            && !type_params.contains(&name.as_str())
                        {
                            omitted = Some(name.clone());
                        }
                    }
                });
            }
            if let Some(name) = omitted {
                return Err(ExclusionReason::OmittedType(name));
            }

            for group in &f.params {
                if group.names.is_empty() {
                    return Err(ExclusionReason::UnnamedParameter);
                }
                if group.names.iter().any(|n| n == "_") {
                    return Err(ExclusionReason::BlankParameter);
                }
            }
        }
        Mode::Noop => {
            if !f.type_params.is_empty() {
                return Err(ExclusionReason::GenericFunctionInNoopMode);
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};

    use super::*;
    use crate::model::{Stmt, ValueKeyword};
    use crate::parser::GoParser;

    fn package(source: &str) -> Package {
        let file = GoParser::new()
            .unwrap()
            .parse_source(Path::new("shapes.go"), source.as_bytes().to_vec())
            .unwrap();
        Package {
            name: file.package.clone(),
            import_path: "example.com/shapes".to_string(),
            dir: PathBuf::from("/src/shapes"),
            files: vec![file],
        }
    }

    fn function<'p>(pkg: &'p Package, name: &str) -> &'p Function {
        pkg.declarations()
            .find_map(|d| match d {
                Declaration::Function(f) if f.name == name => Some(f),
                _ => None,
            })
            .unwrap()
    }

    const SOURCE: &str = r#"package shapes

type shape struct{}
type Circle struct{ R float64 }

func Area(c Circle) float64 { return 0 }
func Build() *shape { return nil }
func Many(xs map[string][]shape) {}
func Ignore(int) {}
func Blank(_ string) {}
func Pick[shape any](s shape) shape { return s }
func Each[T any](xs []T, f func(T)) {}
func helper() {}
"#;

    #[test]
    fn test_accepts_exported_types() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        assert!(check_function(function(&pkg, "Area"), &scope, Mode::Instrumented).is_ok());
    }

    #[test]
    fn test_rejects_unexported_types_at_any_depth() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        for name in ["Build", "Many"] {
            for mode in [Mode::Instrumented, Mode::Noop] {
                assert_eq!(
                    check_function(function(&pkg, name), &scope, mode),
                    Err(ExclusionReason::UnexportedType("shape".to_string())),
                    "{} in {} mode",
                    name,
                    mode
                );
            }
        }
    }

    #[test]
    fn test_type_parameter_shadows_local_type() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        assert!(check_function(function(&pkg, "Pick"), &scope, Mode::Instrumented).is_ok());
    }

    #[test]
    fn test_unnamed_and_blank_parameters() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        assert_eq!(
            check_function(function(&pkg, "Ignore"), &scope, Mode::Instrumented),
            Err(ExclusionReason::UnnamedParameter)
        );
        assert_eq!(
            check_function(function(&pkg, "Blank"), &scope, Mode::Instrumented),
            Err(ExclusionReason::BlankParameter)
        );
        assert!(check_function(function(&pkg, "Ignore"), &scope, Mode::Noop).is_ok());
    }

    #[test]
    fn test_generic_functions_in_noop_mode() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        assert_eq!(
            check_function(function(&pkg, "Each"), &scope, Mode::Noop),
            Err(ExclusionReason::GenericFunctionInNoopMode)
        );
    }

    #[test]
    fn test_classify_dispatch() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        let ctx = ProxyContext {
            scope: &scope,
            alias: "__shapes",
            mode: Mode::Instrumented,
            hook_function: "__invokeHandler",
        };

        let helper = Declaration::Function(function(&pkg, "helper").clone());
        assert_eq!(classify(&helper, &ctx), Verdict::Skip);

        let build = Declaration::Function(function(&pkg, "Build").clone());
        assert!(matches!(classify(&build, &ctx), Verdict::Exclude { ref symbol, .. } if symbol == "Build"));

        let area = Declaration::Function(function(&pkg, "Area").clone());
        match classify(&area, &ctx) {
            Verdict::Keep(Declaration::Function(f)) => {
                assert!(matches!(f.body.as_deref(), Some([Stmt::Expr(_), Stmt::Return(_)])));
            }
            other => panic!("expected forwarded function, got {:?}", other),
        }

        let noop = ProxyContext {
            mode: Mode::Noop,
            ..ctx
        };
        match classify(&area, &noop) {
            Verdict::Keep(Declaration::Values(group)) => {
                assert_eq!(group.keyword, ValueKeyword::Var);
                assert_eq!(group.members[0].name, "Area");
            }
            other => panic!("expected binding, got {:?}", other),
        }
    }

    #[test]
    fn test_scope() {
        let pkg = package(SOURCE);
        let scope = PackageScope::from_package(&pkg);
        assert!(scope.declares("helper"));
        assert!(scope.is_inaccessible("shape"));
        assert!(scope.is_inaccessible("helper"));
        assert!(!scope.is_inaccessible("Circle"));
        assert!(!scope.is_inaccessible("int"));
    }

    const HIDDEN: &str = r#"package shapes

const size = 4
const Size = 8

type Pair[K comparable, V any] struct{}

func Arr(a [size]int) {}
func Wide(a [Size * 2]int) {}
func Lit(s struct{ x int }) {}
func Open(s struct{ X int }) {}
func Face(v interface{ area() float64 }) {}
func Nested(m map[string][]struct{ X [size]byte }) {}
func First[K comparable, V any](p Pair[K, V]) K { var k K; return k }
func Shadow[Pair any](p Pair) {}
"#;

    #[test]
    fn test_rejects_unexported_array_length() {
        let pkg = package(HIDDEN);
        let scope = PackageScope::from_package(&pkg);
        for name in ["Arr", "Nested"] {
            assert_eq!(
                check_function(function(&pkg, name), &scope, Mode::Instrumented),
                Err(ExclusionReason::UnexportedType("size".to_string())),
                "{}",
                name
            );
        }
        assert!(check_function(function(&pkg, "Wide"), &scope, Mode::Instrumented).is_ok());
    }

    #[test]
    fn test_rejects_literals_with_unexported_members() {
        let pkg = package(HIDDEN);
        let scope = PackageScope::from_package(&pkg);
        assert_eq!(
            check_function(function(&pkg, "Lit"), &scope, Mode::Noop),
            Err(ExclusionReason::UnexportedType("struct{ x int }".to_string()))
        );
        assert_eq!(
            check_function(function(&pkg, "Face"), &scope, Mode::Instrumented),
            Err(ExclusionReason::UnexportedType("interface{ area() float64 }".to_string()))
        );
        assert!(check_function(function(&pkg, "Open"), &scope, Mode::Instrumented).is_ok());
    }

    #[test]
    fn test_generic_types_omitted_before_go_1_24() {
        let pkg = package(HIDDEN);
        let old = PackageScope::from_package(&pkg).with_language(Some(GoVersion::new(1, 22)));
        assert!(old.omits_type("Pair"));
        assert_eq!(
            check_function(function(&pkg, "First"), &old, Mode::Instrumented),
            Err(ExclusionReason::OmittedType("Pair".to_string()))
        );
        assert!(check_function(function(&pkg, "Shadow"), &old, Mode::Instrumented).is_ok());

        let group = pkg
            .declarations()
            .find_map(|d| match d {
                Declaration::Types(g) => Some(g),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            omitted_types(group, &old),
            vec![(
                "Pair".to_string(),
                ExclusionReason::GenericTypeAlias("1.22".to_string())
            )]
        );
    }

    #[test]
    fn test_generic_types_kept_from_go_1_24() {
        let pkg = package(HIDDEN);
        for language in [Some(GoVersion::new(1, 24)), None] {
            let scope = PackageScope::from_package(&pkg).with_language(language);
            assert!(!scope.omits_type("Pair"));
            assert!(check_function(function(&pkg, "First"), &scope, Mode::Instrumented).is_ok());
        }
    }
}
