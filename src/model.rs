//! Owned syntax model for Go packages and generated proxy files.
//!
//! The parser lowers tree-sitter trees into these types, the proxy
//! transformer reads them and builds fresh output trees of the same types,
//! and the printer renders the output trees back into Go source. Inputs are
//! never mutated.

use std::fmt;
use std::path::{Path, PathBuf};

/// Returns whether a Go identifier is exported (first character is upper case).
pub fn is_exported(name: &str) -> bool {
    name.chars().next().map(char::is_uppercase).unwrap_or(false)
}

/// A parsed Go package: all non-test files sharing one package clause.
#[derive(Debug, Clone)]
pub struct Package {
    /// Package clause name (e.g. "shapes").
    pub name: String,
    /// Import path the package is reachable under.
    pub import_path: String,
    /// Directory holding the package sources.
    pub dir: PathBuf,
    /// Files in file-name order.
    pub files: Vec<SourceFile>,
}

impl Package {
    /// Iterate over every top-level declaration of every file.
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.files.iter().flat_map(|f| f.declarations.iter())
    }
}

/// One Go source file.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path the file was read from.
    pub path: PathBuf,
    /// Package clause name.
    pub package: String,
    /// Comments before the package clause. Empty strings mark blank-line gaps.
    pub leading_comments: Vec<String>,
    /// Whether the last leading comment sits directly above the package clause.
    pub has_package_doc: bool,
    /// Top-level declarations in source order.
    pub declarations: Vec<Declaration>,
}

impl SourceFile {
    /// Base name of the file (e.g. "shapes.go").
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum Declaration {
    /// `var` or `const` group.
    Values(ValueGroup),
    /// `type` group.
    Types(TypeGroup),
    /// `import` group.
    Imports(Vec<ImportEntry>),
    /// Plain function (methods are not modelled).
    Function(Function),
}

/// Keyword introducing a value group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKeyword {
    Var,
    Const,
}

impl ValueKeyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKeyword::Var => "var",
            ValueKeyword::Const => "const",
        }
    }
}

/// A `var` / `const` declaration, flattened to one member per name.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueGroup {
    pub keyword: ValueKeyword,
    pub doc: Option<String>,
    pub members: Vec<Member>,
}

/// One name bound by a value group.
#[derive(Debug, Clone, PartialEq)]
pub struct Member {
    pub name: String,
    pub exported: bool,
    /// Explicit type annotation, if any.
    pub ty: Option<TypeExpr>,
    /// Initializer, if any.
    pub value: Option<Expr>,
}

impl Member {
    pub fn new(name: impl Into<String>, ty: Option<TypeExpr>, value: Option<Expr>) -> Self {
        let name = name.into();
        Self {
            exported: is_exported(&name),
            name,
            ty,
            value,
        }
    }
}

/// A `type` declaration group.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeGroup {
    pub doc: Option<String>,
    pub specs: Vec<TypeSpec>,
}

/// One type name bound by a type group.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeSpec {
    pub name: String,
    pub exported: bool,
    pub type_params: Vec<TypeParam>,
    pub definition: TypeExpr,
    /// `type A = B` rather than `type A B`.
    pub is_alias: bool,
}

/// A type parameter group such as `K comparable` or `T, U any`.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeParam {
    pub names: Vec<String>,
    pub constraint: TypeExpr,
}

/// A top-level function.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub exported: bool,
    pub doc: Option<String>,
    pub type_params: Vec<TypeParam>,
    pub params: Vec<ParamGroup>,
    pub results: Vec<ParamGroup>,
    /// Only generated functions carry a body.
    pub body: Option<Vec<Stmt>>,
}

impl Function {
    /// Whether the last parameter is variadic.
    pub fn is_variadic(&self) -> bool {
        self.params
            .last()
            .map(|p| matches!(p.ty, TypeExpr::Variadic(_)))
            .unwrap_or(false)
    }

    /// Names of all type parameters in declaration order.
    pub fn type_param_names(&self) -> Vec<&str> {
        self.type_params
            .iter()
            .flat_map(|tp| tp.names.iter().map(String::as_str))
            .collect()
    }

    /// Every type expression appearing in the signature.
    pub fn signature_types(&self) -> impl Iterator<Item = &TypeExpr> {
        self.type_params
            .iter()
            .map(|tp| &tp.constraint)
            .chain(self.params.iter().map(|p| &p.ty))
            .chain(self.results.iter().map(|r| &r.ty))
    }
}

/// Parameters (or results) sharing one type: `a, b int`. Unnamed when `names` is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    pub names: Vec<String>,
    pub ty: TypeExpr,
}

impl ParamGroup {
    pub fn unnamed(ty: TypeExpr) -> Self {
        Self { names: Vec::new(), ty }
    }

    pub fn named<S: Into<String>>(names: impl IntoIterator<Item = S>, ty: TypeExpr) -> Self {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            ty,
        }
    }
}

/// Channel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A type expression.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeExpr {
    /// Bare identifier: `int`, `Config`, `shape`.
    Named(String),
    /// Package-qualified identifier: `time.Duration`.
    Qualified { package: String, name: String },
    /// `...T` on a final parameter.
    Variadic(Box<TypeExpr>),
    Pointer(Box<TypeExpr>),
    Slice(Box<TypeExpr>),
    /// `[N]T`. `len_refs` holds the identifiers the length mentions, as
    /// `Named` or `Qualified`.
    Array {
        len: String,
        len_refs: Vec<TypeExpr>,
        elem: Box<TypeExpr>,
    },
    Map { key: Box<TypeExpr>, value: Box<TypeExpr> },
    Chan { dir: ChanDir, elem: Box<TypeExpr> },
    Func { params: Vec<ParamGroup>, results: Vec<ParamGroup> },
    /// Instantiated generic type: `List[int]`.
    Generic { base: Box<TypeExpr>, args: Vec<TypeExpr> },
    /// Struct/interface literals and constraint unions, kept as source text
    /// together with the type names they mention. `hidden` lists unexported
    /// field and method names, which tie the type to its declaring package.
    Literal {
        text: String,
        refs: Vec<TypeExpr>,
        hidden: Vec<String>,
    },
}

impl TypeExpr {
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr::Named(name.into())
    }

    pub fn qualified(package: impl Into<String>, name: impl Into<String>) -> Self {
        TypeExpr::Qualified {
            package: package.into(),
            name: name.into(),
        }
    }

    /// Visit this expression and every nested type expression, depth first.
    pub fn walk<'a>(&'a self, visit: &mut dyn FnMut(&'a TypeExpr)) {
        visit(self);
        match self {
            TypeExpr::Named(_) | TypeExpr::Qualified { .. } => {}
            TypeExpr::Variadic(inner) | TypeExpr::Pointer(inner) | TypeExpr::Slice(inner) => {
                inner.walk(visit)
            }
            TypeExpr::Array { len_refs, elem, .. } => {
                for r in len_refs {
                    r.walk(visit);
                }
                elem.walk(visit);
            }
            TypeExpr::Chan { elem, .. } => elem.walk(visit),
            TypeExpr::Map { key, value } => {
                key.walk(visit);
                value.walk(visit);
            }
            TypeExpr::Func { params, results } => {
                for group in params.iter().chain(results.iter()) {
                    group.ty.walk(visit);
                }
            }
            TypeExpr::Generic { base, args } => {
                base.walk(visit);
                for arg in args {
                    arg.walk(visit);
                }
            }
            TypeExpr::Literal { refs, .. } => {
                for r in refs {
                    r.walk(visit);
                }
            }
        }
    }
}

/// An import spec.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImportEntry {
    /// Explicit name: an alias, `.` or `_`.
    pub alias: Option<String>,
    /// Import path without quotes.
    pub path: String,
}

impl ImportEntry {
    pub fn new(alias: Option<&str>, path: impl Into<String>) -> Self {
        Self {
            alias: alias.map(str::to_string),
            path: path.into(),
        }
    }

    pub fn is_dot(&self) -> bool {
        self.alias.as_deref() == Some(".")
    }

    pub fn is_blank(&self) -> bool {
        self.alias.as_deref() == Some("_")
    }
}

/// Expressions the generator emits. Parsed initializers are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Ident(String),
    /// `pkg.Name`
    Selector { package: String, name: String },
    Call {
        func: Box<Expr>,
        type_args: Vec<TypeExpr>,
        args: Vec<Expr>,
        /// Final argument expanded with `...`.
        spread: bool,
    },
    Str(String),
    Int(i64),
    /// Original source text of a parsed expression.
    Source(String),
}

impl Expr {
    pub fn selector(package: impl Into<String>, name: impl Into<String>) -> Self {
        Expr::Selector {
            package: package.into(),
            name: name.into(),
        }
    }
}

/// Statements the generator emits.
#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Return(Vec<Expr>),
}

/// A generated proxy file, built once and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyFile {
    /// Output base name, identical to the source file's.
    pub file_name: String,
    pub package: String,
    /// Header comment lines; empty strings are blank lines.
    pub header: Vec<String>,
    /// Whether the final header comment documents the package clause.
    pub header_is_package_doc: bool,
    /// Imports needed by forwarded signatures, sorted.
    pub imports: Vec<ImportEntry>,
    /// Import of the original package under its synthetic alias.
    pub original: ImportEntry,
    pub declarations: Vec<Declaration>,
}

/// Generation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Forward every call through the hook.
    Instrumented,
    /// Plain aliases, no hook.
    Noop,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Instrumented => write!(f, "instrumented"),
            Mode::Noop => write!(f, "noop"),
        }
    }
}
