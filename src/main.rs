//! moe-sampler: inspect how a MoE model's schedule is split between experts.
//!
//! Subcommands:
//! - `split`: the high- and low-noise sigma halves
//! - `plan`: which expert runs which steps, and with which flags
//!
//! Output is JSON on stdout; logs go to stderr.

use serde::Serialize;
use tracing::debug;

use moe_sampler::cli::{plan_command, split_command, Cli, Command};
use moe_sampler::error::{ErrorCode, Result, SamplerError};
use moe_sampler::logging::init_tracing;

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_tracing()?;

    let cli = Cli::parse_args();
    let config = cli.load_config()?;
    debug!("Using config from {}", cli.config_path().display());

    match &cli.command {
        Command::Split(args) => print_json(&split_command(args, &config)?),
        Command::Plan(args) => print_json(&plan_command(args, &config)?),
    }
}

/// Writes `value` to stdout as pretty JSON.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).map_err(|e| {
        SamplerError::with_source(ErrorCode::InvalidParameter, "Cannot serialize output", e)
    })?;
    println!("{}", text);
    Ok(())
}
