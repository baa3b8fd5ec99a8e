//! Generator configuration.
//!
//! Every field is optional in the YAML file; missing fields fall back to the
//! defaults below.
//!
//! ```yaml
//! tool_identity: gen-proxy
//! alias_prefix: "__"
//! sidecar_file: proxy__.go
//! exclude_files:
//!   - "*_generated.go"
//! build:
//!   go_root: /usr/local/go
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{GenerateError, Result};

/// Default config file names searched in the working directory.
pub const DEFAULT_CONFIG_NAMES: &[&str] = &["gen-proxy.yaml", ".gen-proxy.yaml"];

/// Top-level generator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Tool name written into the generated-code marker.
    pub tool_identity: String,
    /// Prefix of the synthetic alias under which the original package is imported.
    pub alias_prefix: String,
    /// File name of the hook runtime sidecar.
    pub sidecar_file: String,
    /// Name of the hook invocation helper.
    pub hook_function: String,
    /// Name of the package-private call id counter.
    pub counter_var: String,
    /// Name of the exported hook function type.
    pub handler_type: String,
    /// Name of the exported function installing the hook.
    pub handler_setter: String,
    /// Glob patterns (matched against file names) of sources to leave out.
    pub exclude_files: Vec<String>,
    pub build: BuildConfig,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            tool_identity: "gen-proxy".to_string(),
            alias_prefix: "__".to_string(),
            sidecar_file: "proxy__.go".to_string(),
            hook_function: "__invokeHandler".to_string(),
            counter_var: "__callId".to_string(),
            handler_type: "ProxyInvocationHandler".to_string(),
            handler_setter: "SetProxyInvocationHandler".to_string(),
            exclude_files: Vec::new(),
            build: BuildConfig::default(),
        }
    }
}

/// Overrides for the Go build search path.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BuildConfig {
    pub go_root: Option<PathBuf>,
    pub go_path: Option<Vec<PathBuf>>,
    /// Directory containing the go.mod to resolve against.
    pub module_root: Option<PathBuf>,
}

impl GeneratorConfig {
    /// Parse a config from a YAML file.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| GenerateError::io(path, e))?;
        let config: GeneratorConfig =
            serde_yaml::from_str(&content).map_err(|e| GenerateError::Config {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        config.validate().map_err(|message| GenerateError::Config {
            path: path.to_path_buf(),
            message,
        })?;
        Ok(config)
    }

    /// Look for a default config file in `dir`.
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        DEFAULT_CONFIG_NAMES
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Check that generated identifiers are usable Go identifiers.
    pub fn validate(&self) -> std::result::Result<(), String> {
        let identifiers = [
            ("alias_prefix", &self.alias_prefix),
            ("hook_function", &self.hook_function),
            ("counter_var", &self.counter_var),
            ("handler_type", &self.handler_type),
            ("handler_setter", &self.handler_setter),
        ];
        for (field, value) in identifiers {
            if !is_identifier(value) {
                return Err(format!("{} {:?} is not a Go identifier", field, value));
            }
        }
        if !self.sidecar_file.ends_with(".go") || self.sidecar_file.ends_with("_test.go") {
            return Err(format!(
                "sidecar_file {:?} must be a non-test .go file name",
                self.sidecar_file
            ));
        }
        self.exclude_set().map(|_| ())
    }

    /// Compile `exclude_files` into a matcher.
    pub fn exclude_set(&self) -> std::result::Result<GlobSet, String> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude_files {
            let glob = Glob::new(pattern).map_err(|e| format!("exclude_files: {}", e))?;
            builder.add(glob);
        }
        builder.build().map_err(|e| format!("exclude_files: {}", e))
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_alphanumeric())
}
