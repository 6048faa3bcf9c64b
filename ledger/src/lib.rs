//! # Tessera Ledger
//!
//! Capability-style digital assets with enforced conservation of value.
//!
//! Each asset class is created as an [`IssuerKit`]: a [`Brand`] naming it, a
//! [`Mint`] that can create value, and an [`Issuer`] that anyone may use to
//! verify and transform [`Payment`]s. Balances never live on the payments
//! themselves. One payment ledger per brand maps every live payment to its
//! [`Amount`], and every transformation is checked to neither create nor
//! destroy value before the table is touched.
//!
//! ## Modules
//!
//! - **amount**: Amount algebra for fungible, set and bag-valued assets.
//! - **brand**: Unforgeable asset-class identity.
//! - **payment**: Bearer handles into the ledger.
//! - **issuer**: The payment ledger, its issuer and mint, and kit
//!   construction.
//! - **purse**: Running balances that absorb and emit payments.
//! - **config**: Limits and failure policy.
//! - **metrics**: Prometheus counters for ledger activity.
//! - **error**: The error taxonomy.
//!
//! ## Example
//!
//! ```
//! use tessera_ledger::{amount, make_issuer_kit, AssetKind, DisplayInfo};
//!
//! # futures::executor::block_on(async {
//! let kit = make_issuer_kit("moola", AssetKind::Nat, DisplayInfo::default()).unwrap();
//! let hundred = amount::make(&kit.brand, 100u64).unwrap();
//! let payment = kit.mint.mint_payment(&hundred).unwrap();
//!
//! let thirty = amount::make(&kit.brand, 30u64).unwrap();
//! let (a, b) = kit.issuer.split(&payment, &thirty).await.unwrap();
//! assert!(!kit.issuer.is_live(&payment).await);
//!
//! let purse = kit.issuer.make_empty_purse();
//! purse.deposit(&a, None).unwrap();
//! purse.deposit(&b, None).unwrap();
//! assert_eq!(purse.current_amount(), hundred);
//! # });
//! ```

pub mod amount;
pub mod brand;
pub mod config;
pub mod error;
pub mod issuer;
pub mod metrics;
pub mod payment;
pub mod purse;

pub use amount::{Amount, AmountError, AmountShape, AssetKind, AssetValue, DisplayInfo, Key};
pub use brand::Brand;
pub use config::LedgerConfig;
pub use error::{BalanceStoreError, BoxError, LedgerError};
pub use issuer::kit::{make_issuer_kit, IssuerKit, IssuerKitBuilder};
pub use issuer::{Issuer, Mint};
pub use metrics::LedgerMetrics;
pub use payment::{Payment, PaymentId};
pub use purse::{BalanceStore, DepositFacet, MemoryBalanceStore, Purse};
