//! Trending dashboard harness
//!
//! Loads a dashboard layout, attaches its plots to range groups and prints
//! what each plot would fetch. Group overrides given on the command line go
//! through the same synchronizer a page uses, so every plot in the group
//! follows.

mod config;
mod error;
mod layout;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trending::prelude::{derive_names, now_millis};

use crate::config::{Command, Config, LayoutArgs, OutputFormat};
use crate::layout::{GroupOverrides, Layout, PlotReport, Session};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trending_cli=info,ccs_trending=info".into()),
        )
        .init();

    let config = Config::parse();
    match &config.command {
        Command::Layout(args) => run_layout(args, config.format)?,
        Command::Names { paths } => print_names(paths, config.format)?,
    }
    Ok(())
}

fn run_layout(args: &LayoutArgs, format: OutputFormat) -> anyhow::Result<()> {
    let layout = Layout::load(&args.file)?;
    let session = Session::build(&layout)?;

    let overrides = GroupOverrides {
        range: args.range.as_deref().map(Into::into),
        error_bars: args.error_bars,
        use_utc: args.utc,
        n_bins: args.bins,
        source: args.source.clone(),
    };
    if !overrides.is_empty() {
        let fan_out = session.apply(args.group.as_deref(), &overrides)?;
        info!(
            notified = fan_out.notified,
            failed = fan_out.failed,
            "Applied overrides"
        );
    }

    let now = args.now.unwrap_or_else(now_millis);
    let reports = session.report(now);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&reports)?),
        OutputFormat::Text => reports.iter().for_each(print_report),
    }
    Ok(())
}

fn print_report(report: &PlotReport) {
    println!("{} [{}] {}", report.id, report.group, report.title);
    println!("  range:  {} ({})", report.window, report.preset);
    println!("  series: {}", report.names.join(", "));
    println!("  markup: {}", report.markup);
    println!("  fetch:  {}", report.url);
}

fn print_names(paths: &[String], format: OutputFormat) -> anyhow::Result<()> {
    let paths: Vec<Vec<String>> = paths
        .iter()
        .map(|p| p.split('/').map(str::to_string).collect())
        .collect();
    let naming = derive_names(&paths);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&naming)?),
        OutputFormat::Text => {
            println!("{}", naming.title);
            for name in &naming.names {
                println!("  {name}");
            }
        }
    }
    Ok(())
}
