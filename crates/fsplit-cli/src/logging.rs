//! Logging initialization
//!
//! CLI flags take precedence; the config file's `[logging]` section fills in
//! whatever the command line left unspecified.

use anyhow::{Context, Result};
use fsplit_core::config::LoggingConfig;
use std::fs::File;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::args::{Args, LogFormat};

fn directive_for(args: &Args, logging: &LoggingConfig) -> Result<Directive> {
    if args.quiet {
        return Ok(Level::ERROR.into());
    }
    match args.verbose {
        0 => logging
            .level
            .parse()
            .with_context(|| format!("Invalid log level in config: {}", logging.level)),
        1 => Ok(Level::DEBUG.into()),
        _ => Ok(Level::TRACE.into()),
    }
}

fn format_for(args: &Args, logging: &LoggingConfig) -> LogFormat {
    args.log_format.unwrap_or(if logging.json_format {
        LogFormat::Json
    } else {
        LogFormat::Text
    })
}

fn log_file(args: &Args) -> Result<Option<File>> {
    args.log_file
        .as_ref()
        .map(|path| File::create(path).with_context(|| format!("Failed to create log file: {}", path)))
        .transpose()
}

/// Initialize logging from CLI arguments and config preferences
pub fn init(args: &Args, logging: &LoggingConfig) -> Result<()> {
    let env_filter = EnvFilter::builder()
        .with_default_directive(directive_for(args, logging)?)
        .from_env_lossy();

    let registry = tracing_subscriber::registry().with(env_filter);
    let file = log_file(args)?;

    match format_for(args, logging) {
        LogFormat::Text => {
            let console = fmt::layer()
                .with_target(args.verbose >= 2)
                .with_file(args.verbose >= 3)
                .with_line_number(args.verbose >= 3);
            match file {
                Some(file) => registry
                    .with(console)
                    .with(fmt::layer().with_ansi(false).with_writer(file))
                    .init(),
                None => registry.with(console).init(),
            }
        }
        LogFormat::Json => match file {
            Some(file) => registry
                .with(fmt::layer().json())
                .with(fmt::layer().json().with_writer(file))
                .init(),
            None => registry.with(fmt::layer().json()).init(),
        },
        LogFormat::Compact => registry.with(fmt::layer().compact()).init(),
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn args(argv: &[&str]) -> Args {
        Args::parse_from(std::iter::once("fsplit").chain(argv.iter().copied()))
    }

    fn rendered(directive: Result<Directive>) -> String {
        directive.unwrap().to_string()
    }

    #[test]
    fn test_config_level_is_the_default() {
        let mut logging = LoggingConfig::default();
        logging.level = "debug".to_string();

        let directive = rendered(directive_for(&args(&[]), &logging));
        assert_eq!(directive, Directive::from(Level::DEBUG).to_string());
        assert_ne!(directive, Directive::from(Level::INFO).to_string());
    }

    #[test]
    fn test_flags_override_config_level() {
        let mut logging = LoggingConfig::default();
        logging.level = "warn".to_string();

        let directive = rendered(directive_for(&args(&["-v"]), &logging));
        assert_eq!(directive, Directive::from(Level::DEBUG).to_string());

        let directive = rendered(directive_for(&args(&["--quiet"]), &logging));
        assert_eq!(directive, Directive::from(Level::ERROR).to_string());
    }

    #[test]
    fn test_invalid_config_level_is_rejected() {
        let mut logging = LoggingConfig::default();
        logging.level = "chatty".to_string();

        assert!(directive_for(&args(&[]), &logging).is_err());
    }

    #[test]
    fn test_config_json_preference_fills_format_gap() {
        let mut logging = LoggingConfig::default();
        logging.json_format = true;

        assert_eq!(format_for(&args(&[]), &logging), LogFormat::Json);
        assert_eq!(format_for(&args(&["--log-format", "compact"]), &logging), LogFormat::Compact);

        logging.json_format = false;
        assert_eq!(format_for(&args(&[]), &logging), LogFormat::Text);
    }
}
