//! Flowsplit CLI
//!
//! User-mode simulator for the split-tunneling classification engine.

mod args;
mod logging;
mod sim;

use anyhow::{Context, Result};
use clap::Parser;
use fsplit_core::config::Config;
use tracing::error;

use args::Args;

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Config comes first: its logging preferences feed subscriber setup
    let config = match &args.config {
        Some(path) => Config::load(path).with_context(|| format!("Failed to load config: {}", path))?,
        None => Config::default(),
    };
    config.validate().context("Invalid configuration")?;

    // Initialize logging
    logging::init(&args, &config.logging)?;

    if !args.quiet {
        print_banner();
    }

    let result = sim::execute(&args, config);

    if let Err(ref e) = result {
        error!("Fatal error: {:#}", e);
    }

    result
}

fn print_banner() {
    use colored::Colorize;

    println!();
    println!("  {}", "Flowsplit".green().bold());
    println!("  {}", "Split-tunneling classification simulator".white());
    println!();
}
