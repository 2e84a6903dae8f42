//! `schoolcomms` command-line entry point.
//!
//! # Responsibility
//! - Load configuration, initialize logging and open the store once.
//! - Dispatch subcommands to core services; the scheduler runs
//!   `schoolcomms daily-summary` for the periodic digest.

mod args;
mod commands;

use anyhow::Context as _;
use args::Cli;
use clap::Parser;
use log::info;
use schoolcomms_core::{init_logging, AppConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging.level, &config.logging.dir).context("initializing logging")?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        schoolcomms_core::core_version()
    );

    commands::run(cli, config)
}
