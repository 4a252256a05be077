// zonetool CLI - redistribute coarse zone attributes through fine zones

mod exit_codes;
mod run;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use exit_codes::{io_exit_code, zone_exit_code, EXIT_CONFIG, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};
use zonetool_engine::{ZoneConfig, ZoneError};
use zonetool_io::IoError;

#[derive(Parser)]
#[command(name = "zonetool")]
#[command(about = "Disaggregate coarse zone attributes onto fine zones and re-aggregate them")]
#[command(version)]
struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace coarse zones listed in the lookup with re-aggregated fine zones
    #[command(after_help = "\
Examples:
  zonetool run coarse.csv fine.csv lookup.csv merged.csv
  zonetool run coarse.csv fine.csv lookup.csv merged.tsv --config zones.toml
  zonetool run coarse.csv fine.csv lookup.csv merged.csv --json > summary.json")]
    Run {
        /// Coarse zone table (CSV/TSV)
        coarse: PathBuf,

        /// Fine zone table (CSV/TSV)
        fine: PathBuf,

        /// Zone correspondence lookup (old coarse, fine, new coarse)
        lookup: PathBuf,

        /// Output table (.csv or .tsv)
        output: PathBuf,

        /// TOML config (zone field, lookup columns, ratio pairs)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print the run summary as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Write the run summary JSON to a file
        #[arg(long, value_name = "FILE")]
        summary: Option<PathBuf>,
    },

    /// Validate a config file without running
    #[command(after_help = "\
Examples:
  zonetool validate --config zones.toml")]
    Validate {
        /// TOML config to check (defaults are always valid)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<ZoneError> for CliError {
    fn from(err: ZoneError) -> Self {
        let code = zone_exit_code(&err);
        let hint = match &err {
            ZoneError::UnpairedField { .. } => {
                Some("declare the pair under [[ratios.pairs]] or set ratios.infer = false".to_string())
            }
            ZoneError::DuplicateZone { .. } => {
                Some("new zone IDs in the lookup must not reuse IDs being replaced".to_string())
            }
            ZoneError::NoMatchingCoarseZones(_) => {
                Some("check that the lookup's old-zone column matches the coarse table's zone IDs".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        Self { code: io_exit_code(&err), message: err.to_string(), hint: None }
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

/// Load the config file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<ZoneConfig, CliError> {
    let Some(path) = path else {
        return Ok(ZoneConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read config {}: {e}", path.display())))?;
    ZoneConfig::from_toml(&text).map_err(|e| CliError {
        code: EXIT_CONFIG,
        message: format!("{}: {e}", path.display()),
        hint: None,
    })
}

fn cmd_validate(config: Option<PathBuf>) -> Result<(), CliError> {
    let cfg = load_config(config.as_deref())?;
    eprintln!(
        "config ok: zone field '{}', lookup columns {}/{}/{}, ratio prefixes {}/{}{}",
        cfg.zones.field,
        cfg.lookup.old_coarse,
        cfg.lookup.fine,
        cfg.lookup.new_coarse,
        cfg.ratios.count_prefix,
        cfg.ratios.total_prefix,
        if cfg.ratios.infer { "" } else { " (inference off)" },
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    debug!(verbose = cli.verbose, "zonetool started");

    let result = match cli.command {
        Commands::Run { coarse, fine, lookup, output, config, json, summary } => {
            run::cmd_run(coarse, fine, lookup, output, config, json, summary)
        }
        Commands::Validate { config } => cmd_validate(config),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}
