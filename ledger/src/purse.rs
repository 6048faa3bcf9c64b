//! # Purses
//!
//! A [`Purse`] holds a running balance of one brand and exchanges value with
//! payments: depositing consumes a payment into the balance, withdrawing
//! carves a fresh payment out of it. Both go through the payment ledger, so
//! the table update and the balance update form one critical section.
//!
//! Where the balance lives is pluggable through [`BalanceStore`]. The
//! default [`MemoryBalanceStore`] keeps it in a `tokio::sync::watch` channel,
//! which doubles as a change notifier.

use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

use crate::amount::{Amount, AmountShape};
use crate::brand::Brand;
use crate::error::{BalanceStoreError, LedgerError};
use crate::issuer::ledger::PaymentLedger;
use crate::payment::Payment;

// ---------------------------------------------------------------------------
// BalanceStore
// ---------------------------------------------------------------------------

/// Storage for a purse balance.
///
/// Implementations are called with the ledger locked. `set_amount` is invoked
/// only after the conservation checks passed and the ledger has already
/// started to change; an error there is treated as a fatal ledger failure.
pub trait BalanceStore: Send + Sync {
    /// The balance as last recorded.
    fn current_amount(&self) -> Amount;

    /// Records a new balance.
    fn set_amount(&self, amount: Amount) -> Result<(), BalanceStoreError>;

    /// A receiver that observes every recorded balance, if the store
    /// supports notification.
    fn subscribe(&self) -> Option<watch::Receiver<Amount>> {
        None
    }
}

/// In-memory balance storage that notifies subscribers of every change.
#[derive(Debug)]
pub struct MemoryBalanceStore {
    sender: watch::Sender<Amount>,
}

impl MemoryBalanceStore {
    pub fn new(initial: Amount) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }
}

impl BalanceStore for MemoryBalanceStore {
    fn current_amount(&self) -> Amount {
        self.sender.borrow().clone()
    }

    fn set_amount(&self, amount: Amount) -> Result<(), BalanceStoreError> {
        self.sender.send_replace(amount);
        Ok(())
    }

    fn subscribe(&self) -> Option<watch::Receiver<Amount>> {
        Some(self.sender.subscribe())
    }
}

// ---------------------------------------------------------------------------
// Purse
// ---------------------------------------------------------------------------

/// A balance of one brand. Clones share the same balance.
#[derive(Clone)]
pub struct Purse {
    ledger: Arc<PaymentLedger>,
    store: Arc<dyn BalanceStore>,
}

impl Purse {
    pub(crate) fn new(ledger: Arc<PaymentLedger>, store: Arc<dyn BalanceStore>) -> Self {
        Self { ledger, store }
    }

    pub fn alleged_brand(&self) -> &Brand {
        self.ledger.brand()
    }

    pub fn current_amount(&self) -> Amount {
        self.store.current_amount()
    }

    /// Consumes `payment` into this purse and returns the amount added.
    ///
    /// Takes the payment by reference, already in hand: a purse never waits
    /// on a payment that is still being produced.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::NotLive`] if the payment was already consumed or
    ///   belongs to another brand.
    /// - [`LedgerError::ShapeMismatch`] if `shape` rejects its balance.
    /// - [`LedgerError::Fatal`] if the balance store fails after the payment
    ///   was consumed.
    pub fn deposit(
        &self,
        payment: &Payment,
        shape: Option<&AmountShape>,
    ) -> Result<Amount, LedgerError> {
        self.ledger.deposit(self.store.as_ref(), payment, shape)
    }

    /// Withdraws `amount` into a new payment.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InsufficientBalance`] if the purse holds less than
    /// `amount`; the purse is left untouched.
    pub fn withdraw(&self, amount: &Amount) -> Result<Payment, LedgerError> {
        self.ledger.withdraw(self.store.as_ref(), amount)
    }

    /// A capability that can only add to this purse.
    pub fn deposit_facet(&self) -> DepositFacet {
        DepositFacet {
            purse: self.clone(),
        }
    }

    /// Observe balance changes, when the backing store supports it.
    pub fn subscribe_amount(&self) -> Option<watch::Receiver<Amount>> {
        self.store.subscribe()
    }
}

impl fmt::Debug for Purse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Purse")
            .field("brand", &self.ledger.alleged_name())
            .field("balance", &self.current_amount().to_string())
            .finish()
    }
}

impl fmt::Display for Purse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Alleged: {} purse]", self.ledger.alleged_name())
    }
}

// ---------------------------------------------------------------------------
// DepositFacet
// ---------------------------------------------------------------------------

/// Deposit-only view of a purse, safe to hand to counterparties.
#[derive(Clone)]
pub struct DepositFacet {
    purse: Purse,
}

impl DepositFacet {
    pub fn receive(
        &self,
        payment: &Payment,
        shape: Option<&AmountShape>,
    ) -> Result<Amount, LedgerError> {
        self.purse.deposit(payment, shape)
    }
}

impl fmt::Debug for DepositFacet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DepositFacet")
            .field("brand", &self.purse.ledger.alleged_name())
            .finish()
    }
}
