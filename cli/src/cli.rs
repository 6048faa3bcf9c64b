//! # CLI Interface
//!
//! Command-line structure for the `tessera` binary, built with `clap`
//! derive. Every session flag has an environment fallback.

use clap::{Parser, Subcommand, ValueEnum};
use tessera_ledger::AssetKind;

use crate::logging::LogFormat;

/// Tessera payment ledger operator tool.
#[derive(Parser, Debug)]
#[command(
    name = "tessera",
    about = "Tessera payment ledger operator tool",
    version,
    propagate_version = true
)]
pub struct TesseraCli {
    /// Log output format.
    #[arg(long, global = true, env = "TESSERA_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(long, global = true, env = "TESSERA_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an asset class and run a scripted mint, split, deposit,
    /// withdraw, combine, claim and burn session against it.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Report rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Pretty,
    Json,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug)]
pub struct SimulateArgs {
    /// Alleged name of the brand.
    #[arg(long, env = "TESSERA_BRAND", default_value = "moola")]
    pub brand: String,

    /// Asset kind: nat, set, copySet or copyBag.
    #[arg(long, env = "TESSERA_ASSET_KIND", default_value = "nat")]
    pub asset_kind: AssetKind,

    /// Decimal places advertised in the brand's display info.
    #[arg(long, env = "TESSERA_DECIMAL_PLACES", allow_negative_numbers = true)]
    pub decimal_places: Option<i32>,

    /// Units minted at the start of the session.
    #[arg(long, env = "TESSERA_MINT", default_value_t = 1000)]
    pub mint: u64,

    /// Number of payments the minted payment is split into.
    #[arg(long, env = "TESSERA_WAYS", default_value_t = 10)]
    pub ways: u64,

    /// Units withdrawn from the purse and later burned.
    #[arg(long, env = "TESSERA_WITHDRAW", default_value_t = 7)]
    pub withdraw: u64,

    /// Cap on payments or amounts named by one operation.
    #[arg(long, env = "TESSERA_MAX_PAYMENTS", default_value_t = tessera_ledger::config::DEFAULT_MAX_PAYMENTS_PER_OPERATION)]
    pub max_payments: usize,

    /// Report format.
    #[arg(long, env = "TESSERA_REPORT_FORMAT", value_enum, default_value_t = ReportFormat::Pretty)]
    pub format: ReportFormat,

    /// Append Prometheus text metrics after the report.
    #[arg(long, env = "TESSERA_METRICS")]
    pub metrics: bool,
}
