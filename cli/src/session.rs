//! # Scripted Ledger Session
//!
//! Drives one issuer kit through every kind of operation and reports
//! whether value was conserved: everything minted must be accounted for by
//! the purse balance plus what was burned.
//!
//! Units are mapped onto the kit's asset kind so the same script works for
//! every kind. For Nat a range of units is a quantity, for Set and CopySet
//! it is the set of those unit numbers, and for CopyBag it is a bag holding
//! one key with that multiplicity.

use anyhow::{ensure, Context, Result};
use serde::Serialize;
use std::ops::Range;
use tracing::info;

use tessera_ledger::{
    amount, Amount, AmountShape, AssetKind, AssetValue, DisplayInfo, IssuerKit, IssuerKitBuilder,
    Key, LedgerConfig, LedgerMetrics,
};

use crate::cli::SimulateArgs;

/// Bag key used for CopyBag sessions.
const BAG_UNIT: &str = "unit";

/// Outcome of one scripted step.
#[derive(Debug, Serialize)]
pub struct Step {
    pub op: &'static str,
    pub detail: String,
}

/// Summary of a finished session.
#[derive(Debug, Serialize)]
pub struct SessionReport {
    pub brand: String,
    pub asset_kind: AssetKind,
    pub display_info: DisplayInfo,
    pub minted: String,
    pub burned: String,
    pub purse_balance: String,
    pub conserved: bool,
    pub double_spend_rejected: String,
    pub steps: Vec<Step>,
}

impl SessionReport {
    /// Human-readable multi-line rendering.
    pub fn render_pretty(&self) -> String {
        let mut out = format!(
            "brand:          {} ({})\n",
            self.brand, self.asset_kind
        );
        for (i, step) in self.steps.iter().enumerate() {
            out.push_str(&format!("  {:>2}. {:<12} {}\n", i + 1, step.op, step.detail));
        }
        out.push_str(&format!("minted:         {}\n", self.minted));
        out.push_str(&format!("burned:         {}\n", self.burned));
        out.push_str(&format!("purse balance:  {}\n", self.purse_balance));
        out.push_str(&format!("double spend:   rejected ({})\n", self.double_spend_rejected));
        out.push_str(&format!(
            "conservation:   {}\n",
            if self.conserved { "ok" } else { "VIOLATED" }
        ));
        out
    }
}

/// Builds the kit described by `args`.
pub fn build_kit(args: &SimulateArgs, metrics: Option<LedgerMetrics>) -> Result<IssuerKit> {
    let display_info = match args.decimal_places {
        Some(places) => DisplayInfo::with_decimal_places(places),
        None => DisplayInfo::default(),
    };
    let mut builder = IssuerKitBuilder::new(args.brand.as_str())
        .asset_kind(args.asset_kind)
        .display_info(display_info)
        .config(LedgerConfig {
            max_payments_per_operation: args.max_payments,
            ..LedgerConfig::default()
        })
        .shutdown_with_failure(|reason| {
            tracing::error!(%reason, "ledger halted");
            Ok(())
        });
    if let Some(metrics) = metrics {
        builder = builder.metrics(metrics);
    }
    builder.build().context("failed to create issuer kit")
}

/// The amount covering `range` in the kit's asset kind.
fn units(kit: &IssuerKit, range: Range<u64>) -> Result<Amount> {
    let count = range.end.saturating_sub(range.start);
    let value = match kit.brand.asset_kind() {
        AssetKind::Nat => AssetValue::from(count),
        AssetKind::Set | AssetKind::CopySet => AssetValue::set(range.map(Key::Nat)),
        AssetKind::CopyBag => AssetValue::bag([(BAG_UNIT, count)])?,
    };
    Ok(amount::make(&kit.brand, value)?)
}

/// Splits `0..total` into `ways` contiguous ranges; the last one absorbs
/// the remainder.
fn partition(total: u64, ways: u64) -> Vec<Range<u64>> {
    let chunk = total / ways;
    (0..ways)
        .map(|i| {
            let start = i * chunk;
            let end = if i + 1 == ways { total } else { start + chunk };
            start..end
        })
        .collect()
}

/// Runs the scripted session.
pub async fn run(kit: &IssuerKit, args: &SimulateArgs) -> Result<SessionReport> {
    ensure!(args.ways >= 1, "--ways must be at least 1");
    ensure!(args.ways <= args.mint, "--ways cannot exceed --mint");
    ensure!(args.withdraw <= args.mint, "--withdraw cannot exceed --mint");

    let issuer = &kit.issuer;
    let mut steps = Vec::new();

    let minted = units(kit, 0..args.mint)?;
    let original = kit.mint.mint_payment(&minted)?;
    steps.push(Step {
        op: "mint",
        detail: format!("{minted}"),
    });

    let parts = partition(args.mint, args.ways)
        .into_iter()
        .map(|range| units(kit, range))
        .collect::<Result<Vec<_>>>()?;
    let pieces = issuer.split_many(&original, &parts).await?;
    steps.push(Step {
        op: "split_many",
        detail: format!("{} payments", pieces.len()),
    });

    let purse = kit.issuer.make_empty_purse();
    for piece in &pieces {
        purse.deposit(piece, None)?;
    }
    steps.push(Step {
        op: "deposit",
        detail: format!("purse holds {}", purse.current_amount()),
    });

    let double_spend = purse
        .deposit(&pieces[0], None)
        .err()
        .context("depositing a consumed payment was accepted")?;
    steps.push(Step {
        op: "deposit",
        detail: format!("replay rejected: {double_spend}"),
    });

    let to_burn = units(kit, 0..args.withdraw)?;
    let withdrawn = purse.withdraw(&to_burn)?;
    steps.push(Step {
        op: "withdraw",
        detail: format!("{to_burn}"),
    });

    let half = units(kit, 0..args.withdraw / 2)?;
    let (left, right) = issuer.split(&withdrawn, &half).await?;
    let combined = issuer
        .combine([left, right], Some(&AmountShape::Exact(to_burn.clone())))
        .await?;
    steps.push(Step {
        op: "combine",
        detail: format!("split and recombined {to_burn}"),
    });

    let claimed = issuer.claim(combined, None).await?;
    let burned = issuer
        .burn(&claimed, Some(&AmountShape::Exact(to_burn.clone())))
        .await?;
    steps.push(Step {
        op: "burn",
        detail: format!("{burned}"),
    });

    let balance = purse.current_amount();
    let accounted = amount::add(&balance, &burned)?;
    let conserved = amount::is_equal(&accounted, &minted)?;
    info!(
        brand = %kit.brand.alleged_name(),
        minted = %minted,
        burned = %burned,
        balance = %balance,
        conserved,
        "session finished"
    );

    Ok(SessionReport {
        brand: kit.brand.alleged_name().to_string(),
        asset_kind: kit.brand.asset_kind(),
        display_info: kit.display_info.clone(),
        minted: minted.to_string(),
        burned: burned.to_string(),
        purse_balance: balance.to_string(),
        conserved,
        double_spend_rejected: double_spend.kind().to_string(),
        steps,
    })
}
