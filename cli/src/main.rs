//! # Tessera Operator Tool
//!
//! Entry point for the `tessera` binary. Parses CLI arguments, initializes
//! logging, and dispatches to a subcommand:
//!
//! - `simulate` runs a scripted session against a fresh issuer kit and
//!   prints a conservation report
//! - `version` prints build version information

mod cli;
mod logging;
mod session;

use anyhow::{bail, Context, Result};
use clap::Parser;

use tessera_ledger::LedgerMetrics;

use cli::{Commands, ReportFormat, SimulateArgs, TesseraCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TesseraCli::parse();
    logging::init_logging(&cli.log_level, cli.log_format);

    match cli.command {
        Commands::Simulate(args) => simulate(args).await,
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Builds a kit from the arguments, runs the session and prints the report.
async fn simulate(args: SimulateArgs) -> Result<()> {
    let metrics = if args.metrics {
        Some(LedgerMetrics::new().context("failed to register ledger metrics")?)
    } else {
        None
    };

    let kit = session::build_kit(&args, metrics.clone())?;
    tracing::info!(
        brand = %kit.brand.alleged_name(),
        asset_kind = %kit.brand.asset_kind(),
        mint = args.mint,
        ways = args.ways,
        withdraw = args.withdraw,
        "starting session"
    );

    let report = session::run(&kit, &args).await?;
    match args.format {
        ReportFormat::Pretty => print!("{}", report.render_pretty()),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        ),
    }

    if let Some(metrics) = metrics {
        print!("{}", metrics.encode().context("failed to encode metrics")?);
    }

    if !report.conserved {
        bail!("conservation violated for brand {}", report.brand);
    }
    Ok(())
}

fn print_version() {
    println!("tessera {}", env!("CARGO_PKG_VERSION"));
    println!("ledger limits:");
    println!(
        "  max payments per operation: {}",
        tessera_ledger::config::DEFAULT_MAX_PAYMENTS_PER_OPERATION
    );
    println!(
        "  max alleged name length:    {}",
        tessera_ledger::config::MAX_ALLEGED_NAME_LENGTH
    );
}
