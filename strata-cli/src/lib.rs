//! Command-line interface applying OSM change files to materialised tables.
#![forbid(unsafe_code)]

use clap::{Parser, Subcommand};

mod apply;
mod error;
mod logging;

pub use error::CliError;

use apply::ApplyArgs;

const ARG_STATE: &str = "state";
const ARG_CHANGES: &str = "changes";
const ARG_MAPPING: &str = "mapping";
const ARG_DATABASE: &str = "database";
const ARG_EXPIRE_TILES: &str = "expire-tiles";
const ARG_EXPIRE_ZOOM: &str = "expire-zoom";
const ARG_LIMIT_TO: &str = "limit-to";
const ARG_WORKERS: &str = "workers";
const ENV_STATE: &str = "STRATA_CMDS_APPLY_STATE";
const ENV_CHANGES: &str = "STRATA_CMDS_APPLY_CHANGES";
const ENV_MAPPING: &str = "STRATA_CMDS_APPLY_MAPPING";
const ENV_DATABASE: &str = "STRATA_CMDS_APPLY_DATABASE";

/// Run the Strata CLI with the current process arguments and environment.
///
/// # Errors
/// Returns a [`CliError`] describing the first failure.
pub fn run() -> Result<(), CliError> {
    logging::init();
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Apply(args) => apply::run_apply(args),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "strata",
    about = "Incremental updates of materialised OSM tables",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply a change file to the row database and cached state.
    Apply(ApplyArgs),
}

#[cfg(test)]
mod tests;
