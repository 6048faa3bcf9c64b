//! # Ledger Configuration & Constants
//!
//! Limits that bound what a single operation may ask of a ledger, and the
//! policy knobs for what happens after a fatal failure. Everything tunable
//! lives in [`LedgerConfig`]; everything that is not lives here as a
//! constant.

// ---------------------------------------------------------------------------
// Kit Validation
// ---------------------------------------------------------------------------

/// Longest alleged name an issuer kit accepts, in characters.
pub const MAX_ALLEGED_NAME_LENGTH: usize = 100;

/// Bound on `DisplayInfo::decimal_places`, in either direction.
pub const MAX_DECIMAL_PLACES: i32 = 100;

// ---------------------------------------------------------------------------
// Operation Limits
// ---------------------------------------------------------------------------

/// Default cap on the number of payments (for `combine`) or amounts (for
/// `split_many`) a single operation may name. Keeps the time spent holding
/// the ledger lock bounded.
pub const DEFAULT_MAX_PAYMENTS_PER_OPERATION: usize = 256;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Namespace prefix for every Prometheus metric the ledger registers.
pub const METRICS_NAMESPACE: &str = "tessera";

// ---------------------------------------------------------------------------
// LedgerConfig
// ---------------------------------------------------------------------------

/// Per-ledger tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Maximum number of input payments or output amounts in one operation.
    pub max_payments_per_operation: usize,

    /// When `true`, a fatal failure permanently disables the ledger: every
    /// later operation fails with `LedgerError::Quarantined` without
    /// touching the table.
    pub quarantine_on_fatal: bool,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            max_payments_per_operation: DEFAULT_MAX_PAYMENTS_PER_OPERATION,
            quarantine_on_fatal: true,
        }
    }
}
