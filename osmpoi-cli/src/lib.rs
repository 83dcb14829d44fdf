//! Command-line interface for indexing OSM extracts into a POI database.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{ArgAction, Parser, Subcommand};

mod error;
mod index;

pub use error::CliError;

use index::{IndexArgs, IndexOutcome, run_index};

const ARG_PBF: &str = "pbf";
const ARG_OUTPUT: &str = "output";
const ARG_STORE_PATH: &str = "store-path";
const ARG_BATCH_SIZE: &str = "batch-size";
const ARG_MAX_DEPENDENCIES: &str = "max-dependencies";
const ARG_FLUSH_THRESHOLD: &str = "flush-threshold";
const ARG_DIAGNOSTICS_DIR: &str = "diagnostics-dir";
const ARG_ITEM: &str = "item";
const ARG_NODES_ON_DISK: &str = "nodes-on-disk";
const ENV_PBF: &str = "OSMPOI_CMDS_INDEX_PBF";

/// Run the osmpoi CLI with the current process arguments and environment.
///
/// # Errors
///
/// Returns [`CliError`] when argument parsing, configuration or indexing
/// fails.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.verbose);
    match cli.command {
        Command::Index(args) => {
            let outcome = run_index(args)?;
            write_summary(&mut io::stdout().lock(), &outcome)?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "osmpoi",
    about = "Extract points of interest from OpenStreetMap extracts",
    version
)]
struct Cli {
    /// Raise log verbosity; repeat for trace output.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify the POIs of one or more PBF extracts and store them.
    Index(IndexArgs),
}

/// Install `env_logger`, letting `RUST_LOG` override the verbosity flag.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env = env_logger::Env::default().default_filter_or(level);
    let installed = env_logger::Builder::from_env(env)
        .format_module_path(false)
        .try_init();
    if installed.is_err() {
        log::debug!("logger already installed");
    }
}

fn write_summary(out: &mut impl Write, outcome: &IndexOutcome) -> Result<(), CliError> {
    writeln!(out, "{}", outcome.report).map_err(CliError::WriteSummary)?;
    writeln!(out, "POIs written to {}", outcome.output).map_err(CliError::WriteSummary)
}

#[cfg(test)]
mod tests;
