//! # Issuer & Mint
//!
//! Capability wrappers around one [`PaymentLedger`]. Neither owns any state
//! of its own; both are cheap to clone and safe to share between tasks.
//!
//! The [`Issuer`] is the public face of a brand: anyone holding it can
//! inspect payments and transform them (claim, combine, split, burn) without
//! ever changing the brand's total supply. The [`Mint`] is the privileged
//! capability that creates value and should be held only by the asset's
//! creator.
//!
//! Every operation that takes a payment accepts anything implementing
//! `IntoFuture<Output = Payment>`, so a payment that is still being produced
//! elsewhere can be passed directly. Inputs are resolved first; only then is
//! the ledger consulted.

pub mod kit;
pub(crate) mod ledger;

use futures::future::join_all;
use std::fmt;
use std::future::{ready, IntoFuture, Ready};
use std::sync::Arc;

use crate::amount::{Amount, AmountShape, AssetKind, DisplayInfo};
use crate::brand::Brand;
use crate::error::LedgerError;
use crate::payment::Payment;
use crate::purse::{BalanceStore, MemoryBalanceStore, Purse};

use self::ledger::PaymentLedger;

// ---------------------------------------------------------------------------
// Issuer
// ---------------------------------------------------------------------------

/// The public capability for one brand's payments.
#[derive(Clone)]
pub struct Issuer {
    ledger: Arc<PaymentLedger>,
}

impl Issuer {
    pub(crate) fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub(crate) fn is_backed_by(&self, ledger: &Arc<PaymentLedger>) -> bool {
        Arc::ptr_eq(&self.ledger, ledger)
    }

    pub fn brand(&self) -> &Brand {
        self.ledger.brand()
    }

    pub fn alleged_name(&self) -> &str {
        self.ledger.alleged_name()
    }

    pub fn asset_kind(&self) -> AssetKind {
        self.ledger.asset_kind()
    }

    pub fn display_info(&self) -> &DisplayInfo {
        self.ledger.brand().display_info()
    }

    /// `true` once a fatal failure has disabled this issuer.
    pub fn is_quarantined(&self) -> bool {
        self.ledger.is_quarantined()
    }

    /// A purse holding nothing, backed by in-memory storage.
    pub fn make_empty_purse(&self) -> Purse {
        let store = MemoryBalanceStore::new(self.ledger.empty_amount().clone());
        Purse::new(Arc::clone(&self.ledger), Arc::new(store))
    }

    /// A purse whose balance lives in caller-supplied storage. The store
    /// must start out holding an empty amount of this brand.
    pub fn make_purse_with_store<S>(&self, store: S) -> Result<Purse, LedgerError>
    where
        S: BalanceStore + 'static,
    {
        let initial = crate::amount::coerce(self.brand(), &store.current_amount())?;
        if !crate::amount::is_empty(&initial) {
            return Err(LedgerError::Validation(format!(
                "a new purse must start empty, store holds {initial}"
            )));
        }
        Ok(Purse::new(Arc::clone(&self.ledger), Arc::new(store)))
    }

    /// Whether `payment` is currently live in this issuer's ledger.
    pub async fn is_live<P>(&self, payment: P) -> bool
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        self.ledger.is_live(&payment)
    }

    /// The amount a live payment is worth.
    pub async fn get_amount_of<P>(&self, payment: P) -> Result<Amount, LedgerError>
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        self.ledger.get_amount_of(&payment)
    }

    /// Destroys a payment and returns what it was worth. The brand's total
    /// supply shrinks by that amount.
    pub async fn burn<P>(
        &self,
        payment: P,
        shape: Option<&AmountShape>,
    ) -> Result<Amount, LedgerError>
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        self.ledger.burn(&payment, shape)
    }

    /// Exchanges a payment for a fresh one of the same amount. Any other
    /// holder of the old payment is left holding nothing.
    pub async fn claim<P>(
        &self,
        payment: P,
        shape: Option<&AmountShape>,
    ) -> Result<Payment, LedgerError>
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        self.ledger.claim(&payment, shape)
    }

    /// Merges several payments into one. The same payment may not appear
    /// twice.
    pub async fn combine<I, P>(
        &self,
        payments: I,
        total_shape: Option<&AmountShape>,
    ) -> Result<Payment, LedgerError>
    where
        I: IntoIterator<Item = P>,
        P: IntoFuture<Output = Payment>,
    {
        let payments = join_all(payments.into_iter().map(IntoFuture::into_future)).await;
        self.ledger.combine(&payments, total_shape)
    }

    /// Splits a payment in two: one worth `amount_a`, the other worth the
    /// remainder.
    pub async fn split<P>(
        &self,
        payment: P,
        amount_a: &Amount,
    ) -> Result<(Payment, Payment), LedgerError>
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        let [a, b] = self.ledger.split(&payment, amount_a)?;
        Ok((a, b))
    }

    /// Splits a payment into one payment per entry of `amounts`, which must
    /// add up to exactly the payment's balance.
    pub async fn split_many<P>(
        &self,
        payment: P,
        amounts: &[Amount],
    ) -> Result<Vec<Payment>, LedgerError>
    where
        P: IntoFuture<Output = Payment>,
    {
        let payment = payment.await;
        self.ledger.split_many(&payment, amounts)
    }
}

impl PartialEq for Issuer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.ledger, &other.ledger)
    }
}

impl Eq for Issuer {}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("brand", &self.alleged_name())
            .field("asset_kind", &self.asset_kind())
            .finish()
    }
}

impl fmt::Display for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Alleged: {} issuer]", self.alleged_name())
    }
}

impl IntoFuture for Issuer {
    type Output = Issuer;
    type IntoFuture = Ready<Issuer>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self)
    }
}

impl IntoFuture for &Issuer {
    type Output = Issuer;
    type IntoFuture = Ready<Issuer>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.clone())
    }
}

// ---------------------------------------------------------------------------
// Mint
// ---------------------------------------------------------------------------

/// The capability to create new value of one brand.
#[derive(Clone)]
pub struct Mint {
    ledger: Arc<PaymentLedger>,
}

impl Mint {
    pub(crate) fn new(ledger: Arc<PaymentLedger>) -> Self {
        Self { ledger }
    }

    pub fn issuer(&self) -> Issuer {
        Issuer::new(Arc::clone(&self.ledger))
    }

    /// Creates a payment worth `new_amount` out of nothing.
    pub fn mint_payment(&self, new_amount: &Amount) -> Result<Payment, LedgerError> {
        self.ledger.mint_payment(new_amount)
    }
}

impl fmt::Debug for Mint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mint")
            .field("brand", &self.ledger.alleged_name())
            .finish()
    }
}

impl fmt::Display for Mint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Alleged: {} mint]", self.ledger.alleged_name())
    }
}
