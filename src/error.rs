//! Fatal errors of a generation run.
//!
//! Every variant aborts the run. Per-symbol exclusions are not errors; they
//! are reported through [`crate::proxy::Exclusion`].

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort proxy generation.
#[derive(Error, Debug)]
pub enum GenerateError {
    #[error("cannot find package {import_path:?} on the build search path")]
    Resolve { import_path: String },

    #[error("{}:{line}:{column}: {message}", file.display())]
    Parse {
        file: PathBuf,
        line: usize,
        column: usize,
        message: String,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {message}", path.display())]
    Config { path: PathBuf, message: String },

    #[error("identifier {name:?} in {file} is reserved for the generated hook runtime")]
    ReservedName { name: String, file: String },

    #[error("refusing to overwrite {} (not a generated file, use --force)", path.display())]
    OutputConflict { path: PathBuf },

    #[error("no Go package found in {}", dir.display())]
    NoPackage { dir: PathBuf },

    #[error("failed to load Go grammar: {0}")]
    Language(String),
}

impl GenerateError {
    /// Wrap an I/O error with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GenerateError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, GenerateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = GenerateError::Parse {
            file: PathBuf::from("pkg/a.go"),
            line: 3,
            column: 7,
            message: "syntax error".to_string(),
        };
        assert_eq!(err.to_string(), "pkg/a.go:3:7: syntax error");
    }

    #[test]
    fn test_resolve_error_display() {
        let err = GenerateError::Resolve {
            import_path: "example.com/missing".to_string(),
        };
        assert!(err.to_string().contains("\"example.com/missing\""));
    }
}
