//! # Brands
//!
//! A [`Brand`] is the unforgeable identity of one asset class. Two brands
//! are equal only if they are the same object, no matter what they call
//! themselves: the alleged name is display metadata, not identity.
//!
//! Each brand is born inside its payment ledger's allocation (see
//! [`Arc::new_cyclic`]) and keeps a weak back-reference to it. That
//! reference cannot be upgraded until the ledger has finished constructing,
//! so [`Brand::is_my_issuer`] can never observe a half-built issuer.

use std::fmt;
use std::future::IntoFuture;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use crate::amount::{AssetKind, DisplayInfo};
use crate::issuer::ledger::PaymentLedger;
use crate::issuer::Issuer;

/// Identity tag for one asset class.
#[derive(Clone)]
pub struct Brand {
    inner: Arc<BrandInner>,
}

struct BrandInner {
    alleged_name: String,
    display_info: DisplayInfo,
    ledger: Weak<PaymentLedger>,
}

impl Brand {
    pub(crate) fn new(
        alleged_name: &str,
        display_info: DisplayInfo,
        ledger: Weak<PaymentLedger>,
    ) -> Self {
        Self {
            inner: Arc::new(BrandInner {
                alleged_name: alleged_name.to_string(),
                display_info,
                ledger,
            }),
        }
    }

    /// A brand with no issuer behind it, for exercising the algebra in
    /// isolation.
    #[cfg(test)]
    pub(crate) fn detached(alleged_name: &str, display_info: DisplayInfo) -> Self {
        Self::new(alleged_name, display_info, Weak::new())
    }

    /// Resolves `alleged_issuer` and reports whether it is the issuer this
    /// brand was created with. Anything else, including an issuer with the
    /// same alleged name, resolves to `false`.
    pub async fn is_my_issuer<I>(&self, alleged_issuer: I) -> bool
    where
        I: IntoFuture<Output = Issuer>,
    {
        let issuer = alleged_issuer.await;
        self.issued_by(&issuer)
    }

    pub(crate) fn issued_by(&self, issuer: &Issuer) -> bool {
        match self.inner.ledger.upgrade() {
            Some(ledger) => issuer.is_backed_by(&ledger),
            None => false,
        }
    }

    /// The name the brand's creator gave it. Not unique, not trusted.
    pub fn alleged_name(&self) -> &str {
        &self.inner.alleged_name
    }

    /// Presentation hints, with the canonical asset kind.
    pub fn display_info(&self) -> &DisplayInfo {
        &self.inner.display_info
    }

    /// The brand's asset kind.
    pub fn asset_kind(&self) -> AssetKind {
        self.inner.display_info.asset_kind
    }
}

impl PartialEq for Brand {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Brand {}

impl Hash for Brand {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::ptr::hash(Arc::as_ptr(&self.inner), state);
    }
}

impl fmt::Debug for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brand")
            .field("alleged_name", &self.inner.alleged_name)
            .field("asset_kind", &self.asset_kind())
            .finish()
    }
}

impl fmt::Display for Brand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Alleged: {} brand]", self.inner.alleged_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_by_reference_not_name() {
        let a = Brand::detached("moola", DisplayInfo::default());
        let b = Brand::detached("moola", DisplayInfo::default());
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn display_uses_alleged_name() {
        let brand = Brand::detached("simoleans", DisplayInfo::default());
        assert_eq!(brand.to_string(), "[Alleged: simoleans brand]");
        assert_eq!(brand.asset_kind(), AssetKind::Nat);
    }
}
