//! # Error Taxonomy
//!
//! Every failure the ledger can report falls into one of two camps:
//!
//! - **Recoverable**: validation, liveness, conservation, aliasing, shape
//!   and algebra failures. These are always raised before the commit point,
//!   so the table is untouched and the caller may retry with corrected input.
//! - **Fatal**: anything that goes wrong after the first table mutation of
//!   a commit. The ledger can no longer vouch for its own state; the failure
//!   handler is invoked and (by default) the ledger is quarantined.

use thiserror::Error;

use crate::amount::AmountError;
use crate::payment::PaymentId;

/// Error type returned by host-supplied callbacks (shutdown handlers,
/// balance stores).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

// ---------------------------------------------------------------------------
// BalanceStoreError
// ---------------------------------------------------------------------------

/// A purse balance store refused to record a new balance.
#[derive(Debug, Error)]
#[error("purse balance store failure: {0}")]
pub struct BalanceStoreError(pub String);

// ---------------------------------------------------------------------------
// LedgerError
// ---------------------------------------------------------------------------

/// Errors surfaced by issuers, mints, purses and the payment ledger itself.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Malformed arguments: bad names, out-of-range display info, unknown
    /// asset kinds.
    #[error("invalid argument: {0}")]
    Validation(String),

    /// More payments or amounts were supplied to one operation than the
    /// ledger is configured to accept.
    #[error("too many entries for one operation: {count} exceeds the limit of {limit}")]
    TooManyPayments {
        /// Number of entries supplied.
        count: usize,
        /// Configured maximum.
        limit: usize,
    },

    /// The payment is not in this ledger's table: never registered, already
    /// consumed, or belonging to another brand.
    #[error("{payment} was not a live payment for brand {brand}")]
    NotLive {
        /// Alleged name of the ledger's brand.
        brand: String,
        /// The payment that was looked up.
        payment: PaymentId,
    },

    /// The sum of the consumed payments differs from the sum of the new
    /// amounts.
    #[error("rights were not conserved for brand {brand}: inputs {inputs}, outputs {outputs}")]
    Conservation {
        /// Alleged name of the ledger's brand.
        brand: String,
        /// Rendered total of the consumed payments.
        inputs: String,
        /// Rendered total of the requested outputs.
        outputs: String,
    },

    /// The same payment appeared more than once among the inputs.
    #[error("payments must be distinct for brand {brand}: {payment} appears more than once")]
    Aliased {
        /// Alleged name of the ledger's brand.
        brand: String,
        /// The repeated payment.
        payment: PaymentId,
    },

    /// An amount shape assertion did not hold.
    #[error("amount {amount} does not match shape {shape}")]
    ShapeMismatch {
        /// Rendered shape.
        shape: String,
        /// Rendered amount that failed the check.
        amount: String,
    },

    /// The amount algebra rejected an operation (brand mismatch, underflow,
    /// overflow, malformed value).
    #[error(transparent)]
    Amount(#[from] AmountError),

    /// A purse was asked for more than it holds.
    #[error("withdrawal of {requested} failed because the purse only contained {available}")]
    InsufficientBalance {
        /// Rendered amount requested.
        requested: String,
        /// Rendered purse balance at the time of the request.
        available: String,
    },

    /// A purse balance store failed. Only ever observed wrapped in
    /// [`LedgerError::Fatal`].
    #[error(transparent)]
    BalanceStore(#[from] BalanceStoreError),

    /// An internal ledger invariant did not hold during a commit. Only ever
    /// observed wrapped in [`LedgerError::Fatal`].
    #[error("ledger invariant violated: {0}")]
    Invariant(String),

    /// A commit failed after the table had started to change. The ledger
    /// must be considered untrustworthy.
    #[error("fatal failure in the {brand} ledger: {source}")]
    Fatal {
        /// Alleged name of the ledger's brand.
        brand: String,
        /// The failure that interrupted the commit.
        #[source]
        source: Box<LedgerError>,
        /// Message of the error raised by the shutdown handler, if it
        /// failed too.
        shutdown_error: Option<String>,
    },

    /// The ledger suffered a fatal failure earlier and refuses further work.
    #[error("the {brand} ledger is quarantined after a fatal failure")]
    Quarantined {
        /// Alleged name of the ledger's brand.
        brand: String,
    },
}

impl LedgerError {
    /// Stable, low-cardinality label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) | Self::TooManyPayments { .. } => "validation",
            Self::NotLive { .. } => "liveness",
            Self::Conservation { .. } => "conservation",
            Self::Aliased { .. } => "aliasing",
            Self::ShapeMismatch { .. } => "shape_mismatch",
            Self::Amount(_) => "amount",
            Self::InsufficientBalance { .. } => "insufficient_balance",
            Self::BalanceStore(_) => "balance_store",
            Self::Invariant(_) => "invariant",
            Self::Fatal { .. } => "fatal",
            Self::Quarantined { .. } => "quarantined",
        }
    }

    /// Returns `true` for failures that leave the ledger in an undefined
    /// state. Every other error guarantees the table was not modified.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. } | Self::Quarantined { .. })
    }
}
