//! Tree-sitter front end that lowers Go source files into [`crate::model`].
//!
//! Parsing is strict: a tree containing ERROR or MISSING nodes is a fatal
//! [`GenerateError::Parse`] pointing at the first offending node.

use std::fs;
use std::path::{Path, PathBuf};

use streaming_iterator::StreamingIterator;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, Tree};

use crate::error::{GenerateError, Result};
use crate::model::{ImportEntry, SourceFile};

mod go;

/// Tree-sitter query for the package clause.
const PACKAGE_QUERY: &str = r#"
(package_clause
  (package_identifier) @package_name
)
"#;

/// Tree-sitter query for import specs, grouped or not.
const IMPORT_QUERY: &str = r#"
(import_spec
  name: (_)? @alias
  path: (_) @path
) @import
"#;

/// Holds a parsed tree together with the bytes it was parsed from.
pub struct ParsedFile {
    pub tree: Tree,
    pub source: Vec<u8>,
    pub path: PathBuf,
}

impl ParsedFile {
    /// Get text for a tree-sitter node.
    pub fn node_text(&self, node: Node) -> &str {
        node.utf8_text(&self.source).unwrap_or("")
    }
}

/// Go parser with its queries compiled once.
pub struct GoParser {
    language: Language,
    package_query: Query,
    import_query: Query,
}

impl GoParser {
    /// Create a parser for Go sources.
    pub fn new() -> Result<Self> {
        let language: Language = tree_sitter_go::LANGUAGE.into();
        let package_query = Query::new(&language, PACKAGE_QUERY)
            .map_err(|e| GenerateError::Language(e.to_string()))?;
        let import_query = Query::new(&language, IMPORT_QUERY)
            .map_err(|e| GenerateError::Language(e.to_string()))?;
        Ok(Self {
            language,
            package_query,
            import_query,
        })
    }

    /// tree_sitter::Parser is not Sync, so one is created per parse.
    fn create_parser(&self) -> Result<Parser> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language)
            .map_err(|e| GenerateError::Language(e.to_string()))?;
        Ok(parser)
    }

    /// Parse source bytes, failing on any syntax error.
    pub fn parse(&self, path: &Path, source: Vec<u8>) -> Result<ParsedFile> {
        let mut parser = self.create_parser()?;
        let tree = parser.parse(&source, None).ok_or_else(|| GenerateError::Parse {
            file: path.to_path_buf(),
            line: 1,
            column: 1,
            message: "parser produced no tree".to_string(),
        })?;

        let parsed = ParsedFile {
            tree,
            source,
            path: path.to_path_buf(),
        };

        if let Some(bad) = first_error(parsed.tree.root_node()) {
            let pos = bad.start_position();
            let message = if bad.is_missing() {
                format!("missing {}", bad.kind())
            } else {
                let snippet: String = parsed.node_text(bad).chars().take(24).collect();
                format!("syntax error near {:?}", snippet)
            };
            return Err(GenerateError::Parse {
                file: path.to_path_buf(),
                line: pos.row + 1,
                column: pos.column + 1,
                message,
            });
        }

        Ok(parsed)
    }

    /// Read, parse and lower a file from disk.
    pub fn parse_file(&self, path: &Path) -> Result<SourceFile> {
        let source = fs::read(path).map_err(|e| GenerateError::io(path, e))?;
        self.parse_source(path, source)
    }

    /// Parse and lower in-memory source.
    pub fn parse_source(&self, path: &Path, source: Vec<u8>) -> Result<SourceFile> {
        let parsed = self.parse(path, source)?;
        go::lower_file(self, &parsed)
    }

    /// Package clause name of a source, without failing on syntax errors elsewhere.
    pub fn package_name(&self, source: &[u8]) -> Option<String> {
        let mut parser = self.create_parser().ok()?;
        let tree = parser.parse(source, None)?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.package_query, tree.root_node(), source);

        if let Some(m) = matches.next() {
            for capture in m.captures {
                let name = self.package_query.capture_names()[capture.index as usize];
                if name == "package_name" {
                    return capture.node.utf8_text(source).ok().map(str::to_string);
                }
            }
        }
        None
    }

    /// Extract the import specs under an import declaration node.
    fn imports_in(&self, parsed: &ParsedFile, decl: Node) -> Vec<ImportEntry> {
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.import_query, decl, &parsed.source[..]);
        let mut imports = Vec::new();

        while let Some(m) = matches.next() {
            let mut alias = None;
            let mut path = None;
            for capture in m.captures {
                match self.import_query.capture_names()[capture.index as usize] {
                    "alias" => alias = Some(parsed.node_text(capture.node)),
                    "path" => path = Some(unquote(parsed.node_text(capture.node))),
                    _ => {}
                }
            }
            if let Some(path) = path {
                imports.push(ImportEntry::new(alias, path));
            }
        }

        imports
    }
}

/// Strip the quotes of an interpreted or raw string literal.
fn unquote(literal: &str) -> String {
    literal.trim_matches(|c| c == '"' || c == '`').to_string()
}

/// Depth-first search for the first ERROR or MISSING node.
fn first_error(node: Node) -> Option<Node> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(bad) = first_error(child) {
            return Some(bad);
        }
    }
    None
}
