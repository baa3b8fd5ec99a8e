//! Command-line interface for gen-proxy.

use clap::Parser;
use std::path::PathBuf;
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::generate::Generator;
use crate::model::Mode;
use crate::report;

/// Exit codes.
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 2;

/// Generate an instrumented proxy of a Go package.
///
/// Every exported function of the package is re-exported through a hook
/// that sees the function name and a call id before the call is forwarded
/// to the original package. Variables, constants and types become aliases
/// of the originals. In noop mode functions are plain aliases too and no
/// hook runtime is emitted.
#[derive(Parser)]
#[command(name = "gen-proxy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Import path of the package, or a directory holding it
    pub package: String,

    /// Directory the proxy package is written to
    pub output: PathBuf,

    /// Pass "noop" to emit plain aliases without instrumentation
    pub mode: Option<String>,

    /// Path to config YAML file (default: auto-discover)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output format for the run summary: pretty or json
    #[arg(short, long, default_value = "pretty")]
    pub format: String,

    /// Overwrite existing files that were not generated
    #[arg(long)]
    pub force: bool,

    /// Log every parsed file and declaration
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse the positional mode argument.
pub fn parse_mode(mode: Option<&str>) -> Option<Mode> {
    match mode {
        None => Some(Mode::Instrumented),
        Some("noop") => Some(Mode::Noop),
        Some(_) => None,
    }
}

/// Load the configured or discovered config file, else defaults.
fn load_config(explicit: Option<&PathBuf>) -> anyhow::Result<GeneratorConfig> {
    if let Some(path) = explicit {
        return Ok(GeneratorConfig::parse_file(path)?);
    }
    let cwd = std::env::current_dir()?;
    match GeneratorConfig::discover(&cwd) {
        Some(path) => {
            debug!(config = %path.display(), "using discovered config");
            Ok(GeneratorConfig::parse_file(path)?)
        }
        None => Ok(GeneratorConfig::default()),
    }
}

/// Run the generator.
pub fn run(cli: &Cli) -> anyhow::Result<i32> {
    if cli.format != "pretty" && cli.format != "json" {
        eprintln!("Error: invalid format {:?}, must be 'pretty' or 'json'", cli.format);
        return Ok(EXIT_ERROR);
    }

    let mode = match parse_mode(cli.mode.as_deref()) {
        Some(mode) => mode,
        None => {
            eprintln!(
                "Error: invalid mode {:?}, the only accepted value is 'noop'",
                cli.mode.as_deref().unwrap_or_default()
            );
            return Ok(EXIT_ERROR);
        }
    };

    let config = load_config(cli.config.as_ref())?;
    let generator = Generator::new(config, mode).force(cli.force);
    let report = generator.run(&cli.package, &cli.output)?;

    match cli.format.as_str() {
        "json" => report::write_json(&report)?,
        _ => report::write_pretty(&report),
    }

    Ok(EXIT_SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mode() {
        assert_eq!(parse_mode(None), Some(Mode::Instrumented));
        assert_eq!(parse_mode(Some("noop")), Some(Mode::Noop));
        assert_eq!(parse_mode(Some("fast")), None);
    }

    #[test]
    fn test_positional_arguments() {
        let cli = Cli::try_parse_from(["gen-proxy", "example.com/shapes", "out", "noop", "--force"]).unwrap();
        assert_eq!(cli.package, "example.com/shapes");
        assert_eq!(cli.output, PathBuf::from("out"));
        assert_eq!(cli.mode.as_deref(), Some("noop"));
        assert!(cli.force);
        assert_eq!(cli.format, "pretty");
    }

    #[test]
    fn test_missing_output_is_rejected() {
        assert!(Cli::try_parse_from(["gen-proxy", "example.com/shapes"]).is_err());
    }
}
