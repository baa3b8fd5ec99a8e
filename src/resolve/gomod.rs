//! go.mod parsing.
//!
//! Only the directives that matter for locating packages and for the
//! language level of generated code are read: `module`, `go`, `require`
//! and `replace`.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{GenerateError, Result};

/// A Go language version such as `1.22`. Patch levels and pre-release
/// suffixes are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoVersion {
    pub major: u32,
    pub minor: u32,
}

impl GoVersion {
    /// Assumed for a go.mod without a `go` directive.
    pub const MODULE_DEFAULT: GoVersion = GoVersion::new(1, 16);
    /// First version accepting type parameters on alias declarations.
    pub const GENERIC_ALIASES: GoVersion = GoVersion::new(1, 24);

    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse "1.22", "1.22.3", "1.23rc1" or "go1.21".
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let text = text.strip_prefix("go").unwrap_or(text);
        let mut parts = text.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = parts.next().and_then(leading_number).unwrap_or(0);
        Some(Self::new(major, minor))
    }

    pub fn supports_generic_aliases(&self) -> bool {
        *self >= Self::GENERIC_ALIASES
    }
}

impl fmt::Display for GoVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// A parsed go.mod file together with the directory it lives in.
#[derive(Debug, Clone)]
pub struct GoModule {
    /// Directory containing go.mod.
    root: PathBuf,
    /// Module path (e.g. "example.com/proxytest").
    module_path: String,
    /// The `go` directive, if present.
    go_version: Option<GoVersion>,
    /// Required modules: module path -> version.
    requires: HashMap<String, String>,
    /// Replace directives: module path -> local path or replacement module.
    replaces: HashMap<String, String>,
}

impl GoModule {
    /// Parse `<root>/go.mod`. The root is canonicalized when possible.
    pub fn load(root: &Path) -> Result<Self> {
        let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        let root = root.as_path();
        let go_mod = root.join("go.mod");
        let content = fs::read_to_string(&go_mod).map_err(|e| GenerateError::io(&go_mod, e))?;
        Self::parse(root, &content).ok_or_else(|| GenerateError::Parse {
            file: go_mod,
            line: 1,
            column: 1,
            message: "no module directive".to_string(),
        })
    }

    /// Walk up from `start` to the nearest directory holding a go.mod.
    pub fn find_enclosing(start: &Path) -> Result<Option<Self>> {
        for dir in start.ancestors() {
            if dir.join("go.mod").is_file() {
                return Self::load(dir).map(Some);
            }
        }
        Ok(None)
    }

    /// Parse go.mod content. Returns None without a module directive.
    pub fn parse(root: &Path, content: &str) -> Option<Self> {
        let mut module_path = String::new();
        let mut go_version = None;
        let mut requires = HashMap::new();
        let mut replaces = HashMap::new();

        let mut in_require_block = false;
        let mut in_replace_block = false;

        for line in content.lines() {
            let line = line.split("//").next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("module ") {
                module_path = rest.trim().trim_matches('"').to_string();
                continue;
            }
            if let Some(rest) = line.strip_prefix("go ") {
                go_version = GoVersion::parse(rest);
                continue;
            }

            if line == "require (" {
                in_require_block = true;
                continue;
            }
            if line == "replace (" {
                in_replace_block = true;
                continue;
            }
            if line == ")" {
                in_require_block = false;
                in_replace_block = false;
                continue;
            }

            if let Some(rest) = line.strip_prefix("require ") {
                if let Some((module, version)) = parse_require(rest) {
                    requires.insert(module, version);
                }
                continue;
            }
            if let Some(rest) = line.strip_prefix("replace ") {
                if let Some((from, to)) = parse_replace(rest) {
                    replaces.insert(from, to);
                }
                continue;
            }

            if in_require_block {
                if let Some((module, version)) = parse_require(line) {
                    requires.insert(module, version);
                }
            } else if in_replace_block {
                if let Some((from, to)) = parse_replace(line) {
                    replaces.insert(from, to);
                }
            }
        }

        if module_path.is_empty() {
            return None;
        }

        Some(Self {
            root: root.to_path_buf(),
            module_path,
            go_version,
            requires,
            replaces,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn module_path(&self) -> &str {
        &self.module_path
    }

    /// Language version of the module's code.
    pub fn go_version(&self) -> GoVersion {
        self.go_version.unwrap_or(GoVersion::MODULE_DEFAULT)
    }

    /// Directory of an import path inside this module, if it belongs to it.
    pub fn local_dir(&self, import_path: &str) -> Option<PathBuf> {
        let rest = strip_module(import_path, &self.module_path)?;
        Some(join_rest(&self.root, rest))
    }

    /// Directory of an import path redirected to a local path by `replace`.
    pub fn replaced_dir(&self, import_path: &str) -> Option<PathBuf> {
        let (from, to) = self.longest_match(self.replaces.iter(), import_path)?;
        if !is_local_path(to) {
            return None;
        }
        let rest = strip_module(import_path, from)?;
        Some(join_rest(&self.root.join(to), rest))
    }

    /// The required module containing an import path, with its version.
    pub fn required_module(&self, import_path: &str) -> Option<(&str, &str)> {
        self.longest_match(self.requires.iter(), import_path)
            .map(|(m, v)| (m.as_str(), v.as_str()))
    }

    /// Import path of a directory inside this module.
    pub fn import_path_of(&self, dir: &Path) -> Option<String> {
        let rel = dir.strip_prefix(&self.root).ok()?;
        let rel = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().to_string())
            .collect::<Vec<_>>()
            .join("/");
        if rel.is_empty() {
            Some(self.module_path.clone())
        } else {
            Some(format!("{}/{}", self.module_path, rel))
        }
    }

    fn longest_match<'a>(
        &self,
        entries: impl Iterator<Item = (&'a String, &'a String)>,
        import_path: &str,
    ) -> Option<(&'a String, &'a String)> {
        entries
            .filter(|(module, _)| strip_module(import_path, module).is_some())
            .max_by_key(|(module, _)| module.len())
    }
}

/// Parse a require line: "golang.org/x/text v0.14.0 // indirect"
fn parse_require(line: &str) -> Option<(String, String)> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    match parts.as_slice() {
        [module, version, ..] => Some((module.to_string(), version.to_string())),
        [module] => Some((module.to_string(), String::new())),
        [] => None,
    }
}

/// Parse a replace line: "example.com/lib => ../lib"
fn parse_replace(line: &str) -> Option<(String, String)> {
    let (from, to) = line.split_once("=>")?;
    let from = from.split_whitespace().next()?.to_string();
    let to = to.split_whitespace().next()?.to_string();
    Some((from, to))
}

/// Remainder of `import_path` below `module`: "" for the module itself.
fn strip_module<'a>(import_path: &'a str, module: &str) -> Option<&'a str> {
    if import_path == module {
        return Some("");
    }
    import_path
        .strip_prefix(module)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn join_rest(base: &Path, rest: &str) -> PathBuf {
    rest.split('/')
        .filter(|s| !s.is_empty())
        .fold(base.to_path_buf(), |acc, part| acc.join(part))
}

fn is_local_path(target: &str) -> bool {
    target.starts_with("./") || target.starts_with("../") || target.starts_with('/')
}

#[cfg(test)]
mod tests {
    use super::*;

    const GO_MOD: &str = r#"
module example.com/app

go 1.22

require (
    golang.org/x/text v0.14.0 // indirect
    github.com/Foo/bar v1.2.3
)

require example.com/single v0.1.0

replace example.com/lib => ../lib
replace (
    github.com/Foo/bar => github.com/fork/bar v1.2.4
)
"#;

    fn module() -> GoModule {
        GoModule::parse(Path::new("/work/app"), GO_MOD).unwrap()
    }

    #[test]
    fn test_parse_directives() {
        let m = module();
        assert_eq!(m.module_path(), "example.com/app");
        assert_eq!(
            m.required_module("golang.org/x/text/unicode/norm"),
            Some(("golang.org/x/text", "v0.14.0"))
        );
        assert_eq!(m.required_module("example.com/single"), Some(("example.com/single", "v0.1.0")));
        assert_eq!(m.required_module("golang.org/x/textual"), None);
    }

    #[test]
    fn test_local_dir() {
        let m = module();
        assert_eq!(m.local_dir("example.com/app"), Some(PathBuf::from("/work/app")));
        assert_eq!(
            m.local_dir("example.com/app/internal/shapes"),
            Some(PathBuf::from("/work/app/internal/shapes"))
        );
        assert_eq!(m.local_dir("example.com/application"), None);
    }

    #[test]
    fn test_replaced_dir_only_for_local_targets() {
        let m = module();
        assert_eq!(
            m.replaced_dir("example.com/lib/sub"),
            Some(PathBuf::from("/work/app/../lib/sub"))
        );
        assert_eq!(m.replaced_dir("github.com/Foo/bar"), None);
    }

    #[test]
    fn test_import_path_of() {
        let m = module();
        assert_eq!(
            m.import_path_of(Path::new("/work/app/pkg/geom")),
            Some("example.com/app/pkg/geom".to_string())
        );
        assert_eq!(m.import_path_of(Path::new("/elsewhere")), None);
    }

    #[test]
    fn test_missing_module_directive() {
        assert!(GoModule::parse(Path::new("/x"), "go 1.21\n").is_none());
    }

    #[test]
    fn test_go_directive() {
        assert_eq!(module().go_version(), GoVersion::new(1, 22));
        assert!(!module().go_version().supports_generic_aliases());

        let bare = GoModule::parse(Path::new("/x"), "module example.com/x\n").unwrap();
        assert_eq!(bare.go_version(), GoVersion::MODULE_DEFAULT);

        let newer = GoModule::parse(Path::new("/x"), "module example.com/x\n\ngo 1.24.1\n").unwrap();
        assert!(newer.go_version().supports_generic_aliases());
    }

    #[test]
    fn test_parse_go_version() {
        assert_eq!(GoVersion::parse("1.22"), Some(GoVersion::new(1, 22)));
        assert_eq!(GoVersion::parse("1.23rc1"), Some(GoVersion::new(1, 23)));
        assert_eq!(GoVersion::parse("go1.21.4"), Some(GoVersion::new(1, 21)));
        assert_eq!(GoVersion::parse("2"), Some(GoVersion::new(2, 0)));
        assert_eq!(GoVersion::parse("latest"), None);
        assert_eq!(GoVersion::new(1, 24).to_string(), "1.24");
    }
}
