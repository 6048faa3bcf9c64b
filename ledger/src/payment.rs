//! # Payments
//!
//! A [`Payment`] is an opaque bearer handle. It holds no balance of its own:
//! whatever it is worth lives in exactly one payment ledger, keyed by the
//! payment's [`PaymentId`]. Cloning a payment creates an alias; whichever
//! holder consumes it first wins, and every other alias is dead from then on.
//!
//! Payments implement [`IntoFuture`] as already-resolved values, so every
//! issuer operation that accepts an eventual payment also accepts one that is
//! in hand.
//!
//! A payment exposes nothing but its alleged brand. Its id stays inside the
//! crate and is never handed out as a token:
//!
//! ```compile_fail
//! fn peek(payment: &tessera_ledger::Payment) {
//!     let _ = payment.id();
//! }
//! ```

use std::fmt;
use std::future::{ready, IntoFuture, Ready};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use uuid::Uuid;

use crate::brand::Brand;

// ---------------------------------------------------------------------------
// PaymentId
// ---------------------------------------------------------------------------

/// Identity of a payment. Never reused, so a consumed payment can never come
/// back to life.
///
/// Ids surface only in logs and in error values. Holding one grants no
/// authority: there is no way to turn an id back into a [`Payment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaymentId(Uuid);

impl PaymentId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "payment:{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Payment
// ---------------------------------------------------------------------------

/// A bearer right to whatever amount the ledger records for it.
#[derive(Clone)]
pub struct Payment {
    inner: Arc<PaymentInner>,
}

struct PaymentInner {
    id: PaymentId,
    alleged_name: String,
    brand: Brand,
}

/// Creates a fresh, unregistered payment. The caller (the payment ledger)
/// must register it in its table within the same commit.
pub(crate) fn make_payment(alleged_name: &str, brand: &Brand) -> Payment {
    Payment {
        inner: Arc::new(PaymentInner {
            id: PaymentId::generate(),
            alleged_name: alleged_name.to_string(),
            brand: brand.clone(),
        }),
    }
}

impl Payment {
    /// The brand this payment claims to be denominated in. Only the brand's
    /// issuer can confirm it.
    pub fn alleged_brand(&self) -> &Brand {
        &self.inner.brand
    }

    /// Table key and log label.
    pub(crate) fn id(&self) -> PaymentId {
        self.inner.id
    }
}

impl PartialEq for Payment {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl Eq for Payment {}

impl Hash for Payment {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.id.hash(state);
    }
}

impl fmt::Debug for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Payment")
            .field("id", &self.inner.id)
            .field("brand", &self.inner.alleged_name)
            .finish()
    }
}

impl fmt::Display for Payment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Alleged: {} payment]", self.inner.alleged_name)
    }
}

impl IntoFuture for Payment {
    type Output = Payment;
    type IntoFuture = Ready<Payment>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self)
    }
}

impl IntoFuture for &Payment {
    type Output = Payment;
    type IntoFuture = Ready<Payment>;

    fn into_future(self) -> Self::IntoFuture {
        ready(self.clone())
    }
}
