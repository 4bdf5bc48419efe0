//! Command-line configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use trending::prelude::ErrorBars;

/// Trending dashboard harness
#[derive(Parser, Clone, Debug)]
#[command(name = "trending-cli")]
#[command(about = "Wire a trending dashboard layout through its range groups")]
pub struct Config {
    /// Output format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Command {
    /// Load a layout file and print every plot's title, markup and fetch URL
    Layout(LayoutArgs),

    /// Print the title and series names derived from channel paths
    Names {
        /// Slash-delimited channel paths
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

#[derive(clap::Args, Clone, Debug)]
pub struct LayoutArgs {
    /// Path to the JSON layout file
    pub file: PathBuf,

    /// Group the overrides below are written to (default: every group)
    #[arg(long)]
    pub group: Option<String>,

    /// Range token, e.g. `1h`, `3 days` or `{"start":0,"end":1000}`
    #[arg(long)]
    pub range: Option<String>,

    /// Error bar mode
    #[arg(long, value_parser = parse_error_bars)]
    pub error_bars: Option<ErrorBars>,

    /// Show times in UTC
    #[arg(long)]
    pub utc: Option<bool>,

    /// Number of bins per request
    #[arg(long)]
    pub bins: Option<u32>,

    /// Data source name
    #[arg(long)]
    pub source: Option<String>,

    /// Evaluate relative ranges at this instant (epoch milliseconds)
    #[arg(long)]
    pub now: Option<i64>,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

fn parse_error_bars(s: &str) -> Result<ErrorBars, String> {
    s.parse().map_err(|_| format!("expected NONE, MINMAX or RMS, got {s:?}"))
}
