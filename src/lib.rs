//! gen-proxy - instrumented proxy generator for Go packages.
//!
//! Given a Go package, gen-proxy writes a new package with the same public
//! surface in which every exported function first calls a hook with its name
//! and a call id, then forwards to the original. The original package is
//! imported under a synthetic alias.
//!
//! # Architecture
//!
//! - `parser`: tree-sitter front end lowering Go files into `model`
//! - `resolve`: locating packages on the Go build search path
//! - `proxy`: the transformation (classify, rewrite, synthesize, assemble)
//! - `render`: printing generated files back to Go source
//! - `runtime`: the hook contract the generated sidecar implements
//! - `generate`: the run driver doing all file I/O
//! - `config`, `report`, `cli`: configuration, run summary, front end

pub mod cli;
pub mod config;
pub mod error;
pub mod generate;
pub mod model;
pub mod parser;
pub mod proxy;
pub mod render;
pub mod report;
pub mod resolve;
pub mod runtime;

pub use config::GeneratorConfig;
pub use error::{GenerateError, Result};
pub use generate::{GenerationReport, Generator};
pub use model::Mode;
pub use proxy::{build_proxy, ProxyPackage};
pub use render::render_file;
pub use resolve::{BuildContext, GoEnv, GoModule, GoVersion, PackageLocator, StaticLocator};
pub use runtime::{HookHandle, UNASSIGNED_CALL_ID};
