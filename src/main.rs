//! `quack` command-line entry point.
use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use quack::cli::Cli;
use quack::commands::{self, Request};
use quack::exec::SystemExecutor;
use quack::logging::{self, Logger};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    logging::init_subscriber(args.verbose);

    let log = Arc::new(Logger::new());
    let version = option_env!("QUACK_VERSION").unwrap_or(env!("CARGO_PKG_VERSION"));
    log.debug(&format!("quack {version}"));

    let request = Request::from_cli(&args)?;
    commands::run(&request, log.clone(), Arc::new(SystemExecutor))?;
    log.print_summary();

    let failed = log.failure_count();
    if failed > 0 {
        anyhow::bail!("{failed} module(s) failed");
    }
    Ok(())
}
