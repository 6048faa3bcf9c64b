//! # Issuer Kits
//!
//! Creating an asset class produces four things at once: the [`Brand`] that
//! identifies it, the [`Issuer`] that anyone may use to handle its payments,
//! the [`Mint`] that creates new value, and the normalized [`DisplayInfo`].
//! Construction is all-or-nothing: arguments are validated before the
//! ledger exists, and nothing is handed out until every piece is wired.

use std::fmt;
use std::sync::Arc;
use tracing::info;

use super::ledger::{LedgerParts, PaymentLedger, ShutdownHandler};
use super::{Issuer, Mint};
use crate::amount::{AssetKind, DisplayInfo};
use crate::brand::Brand;
use crate::config::{LedgerConfig, MAX_ALLEGED_NAME_LENGTH, MAX_DECIMAL_PLACES};
use crate::error::{BoxError, LedgerError};
use crate::metrics::LedgerMetrics;

/// Everything produced by creating one asset class.
#[derive(Debug, Clone)]
pub struct IssuerKit {
    pub brand: Brand,
    pub issuer: Issuer,
    pub mint: Mint,
    pub display_info: DisplayInfo,
}

/// Creates a new asset class with default configuration, no metrics, and no
/// shutdown handler.
///
/// # Arguments
///
/// * `alleged_name` - Display name for the brand. Not unique, not trusted.
/// * `asset_kind` - Algebra the brand's amounts follow.
/// * `display_info` - Presentation hints. Its asset kind is overwritten with
///   `asset_kind`.
///
/// # Errors
///
/// Returns [`LedgerError::Validation`] if the name is empty or too long, or
/// if the decimal places are out of range.
pub fn make_issuer_kit(
    alleged_name: &str,
    asset_kind: AssetKind,
    display_info: DisplayInfo,
) -> Result<IssuerKit, LedgerError> {
    IssuerKitBuilder::new(alleged_name)
        .asset_kind(asset_kind)
        .display_info(display_info)
        .build()
}

// ---------------------------------------------------------------------------
// IssuerKitBuilder
// ---------------------------------------------------------------------------

/// Configures an issuer kit beyond what [`make_issuer_kit`] offers.
///
/// ```
/// use tessera_ledger::{AssetKind, IssuerKitBuilder, LedgerConfig};
///
/// let kit = IssuerKitBuilder::new("moola")
///     .asset_kind(AssetKind::Nat)
///     .config(LedgerConfig { max_payments_per_operation: 16, ..LedgerConfig::default() })
///     .shutdown_with_failure(|reason| {
///         eprintln!("moola ledger halted: {reason}");
///         Ok(())
///     })
///     .build()
///     .unwrap();
/// assert_eq!(kit.issuer.alleged_name(), "moola");
/// ```
pub struct IssuerKitBuilder {
    alleged_name: String,
    asset_kind: AssetKind,
    display_info: DisplayInfo,
    config: LedgerConfig,
    shutdown: Option<ShutdownHandler>,
    metrics: Option<LedgerMetrics>,
}

impl IssuerKitBuilder {
    pub fn new(alleged_name: impl Into<String>) -> Self {
        Self {
            alleged_name: alleged_name.into(),
            asset_kind: AssetKind::default(),
            display_info: DisplayInfo::default(),
            config: LedgerConfig::default(),
            shutdown: None,
            metrics: None,
        }
    }

    pub fn asset_kind(mut self, asset_kind: AssetKind) -> Self {
        self.asset_kind = asset_kind;
        self
    }

    pub fn display_info(mut self, display_info: DisplayInfo) -> Self {
        self.display_info = display_info;
        self
    }

    pub fn config(mut self, config: LedgerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn metrics(mut self, metrics: LedgerMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Installs a callback that runs when a commit fails after the ledger
    /// started to change.
    ///
    /// The callback runs after the ledger lock is released, so it may call
    /// back into the same issuer, mint or purses. With quarantine enabled the
    /// ledger is already quarantined by then: [`Issuer::is_live`] still
    /// answers, and every other operation fails with
    /// [`LedgerError::Quarantined`]. If the callback itself fails, its error
    /// is reported alongside the original one in [`LedgerError::Fatal`].
    pub fn shutdown_with_failure<F>(mut self, handler: F) -> Self
    where
        F: Fn(&LedgerError) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        self.shutdown = Some(Arc::new(handler));
        self
    }

    /// Validates the arguments and builds the kit.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if any argument is out of range.
    pub fn build(self) -> Result<IssuerKit, LedgerError> {
        validate_alleged_name(&self.alleged_name)?;
        if let Some(places) = self.display_info.decimal_places {
            validate_decimal_places(places)?;
        }
        if self.config.max_payments_per_operation < 2 {
            return Err(LedgerError::Validation(format!(
                "max_payments_per_operation must be at least 2, got {}",
                self.config.max_payments_per_operation
            )));
        }

        let display_info = self.display_info.normalized(self.asset_kind);
        let ledger = PaymentLedger::new(LedgerParts {
            alleged_name: self.alleged_name,
            asset_kind: self.asset_kind,
            display_info: display_info.clone(),
            config: self.config,
            shutdown: self.shutdown,
            metrics: self.metrics,
        });

        let kit = IssuerKit {
            brand: ledger.brand().clone(),
            issuer: Issuer::new(Arc::clone(&ledger)),
            mint: Mint::new(ledger),
            display_info,
        };
        info!(
            brand = %kit.brand.alleged_name(),
            asset_kind = %kit.brand.asset_kind(),
            "created issuer kit"
        );
        Ok(kit)
    }
}

impl fmt::Debug for IssuerKitBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuerKitBuilder")
            .field("alleged_name", &self.alleged_name)
            .field("asset_kind", &self.asset_kind)
            .field("display_info", &self.display_info)
            .field("config", &self.config)
            .field("shutdown", &self.shutdown.is_some())
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_alleged_name(name: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::Validation(
            "alleged name must not be empty".into(),
        ));
    }
    let length = name.chars().count();
    if length > MAX_ALLEGED_NAME_LENGTH {
        return Err(LedgerError::Validation(format!(
            "alleged name is {length} characters, limit is {MAX_ALLEGED_NAME_LENGTH}"
        )));
    }
    Ok(())
}

fn validate_decimal_places(places: i32) -> Result<(), LedgerError> {
    if !(-MAX_DECIMAL_PLACES..=MAX_DECIMAL_PLACES).contains(&places) {
        return Err(LedgerError::Validation(format!(
            "decimal places {places} outside ±{MAX_DECIMAL_PLACES}"
        )));
    }
    Ok(())
}
