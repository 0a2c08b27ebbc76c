//! Command-line argument parsing

use clap::{Parser, ValueEnum};

/// Flowsplit - split-tunneling classification simulator
///
/// Drives the classification engine in user mode: registers the callout
/// purpose-sets against an in-memory filter engine, replays synthetic
/// bind/connect/accept events for the given processes, and reports the
/// verdict each event received.
#[derive(Parser, Debug)]
#[command(name = "fsplit")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE")]
    pub config: Option<String>,

    /// Process id to treat as split (repeatable)
    #[arg(short = 's', long = "split", value_name = "PID")]
    pub split: Vec<u32>,

    /// Process id whose classification is initially unknown (repeatable)
    #[arg(short = 'u', long = "unknown", value_name = "PID")]
    pub unknown: Vec<u32>,

    /// Process id to treat as outside the split set (repeatable)
    #[arg(short = 'o', long = "other", value_name = "PID")]
    pub other: Vec<u32>,

    /// Maximum number of binds held suspended at once
    #[arg(long, value_name = "N", default_value_t = fsplit_engine::QueueArbiter::DEFAULT_CAPACITY)]
    pub pend_capacity: usize,

    /// Resolve unknown processes as split after the first pass and replay
    /// their suspended binds
    #[arg(short = 'r', long)]
    pub resolve: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Output format for logs (defaults to the config file's preference)
    #[arg(long, value_enum)]
    pub log_format: Option<LogFormat>,

    /// Log file path
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<String>,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable text
    Text,
    /// JSON format
    Json,
    /// Compact format
    Compact,
}
