//! Asset values and the immutable [`Amount`] record.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use super::kind::AssetKind;
use super::math::AmountError;
use crate::brand::Brand;

// ---------------------------------------------------------------------------
// Key
// ---------------------------------------------------------------------------

/// An element of a set or bag value.
///
/// Keys are plain data with a total order so that set and bag values have a
/// canonical form regardless of insertion order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// A numeric element, e.g. a seat number.
    Nat(u64),
    /// A textual element, e.g. a ticket name.
    Text(String),
    /// A compound element.
    Tuple(Vec<Key>),
}

impl From<u64> for Key {
    fn from(n: u64) -> Self {
        Self::Nat(n)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nat(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Tuple(parts) => {
                f.write_str("(")?;
                for (i, part) in parts.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{part}")?;
                }
                f.write_str(")")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// AssetValue
// ---------------------------------------------------------------------------

/// The value half of an [`Amount`]. Which variant is legal depends on the
/// brand's [`AssetKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetValue {
    /// A quantity in smallest units ([`AssetKind::Nat`]).
    Nat(u128),
    /// Distinct elements ([`AssetKind::Set`], [`AssetKind::CopySet`]).
    Set(BTreeSet<Key>),
    /// Elements with non-zero multiplicities ([`AssetKind::CopyBag`]).
    Bag(BTreeMap<Key, u64>),
}

impl AssetValue {
    /// Builds a set value. Duplicate elements collapse.
    pub fn set<I, K>(elements: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<Key>,
    {
        Self::Set(elements.into_iter().map(Into::into).collect())
    }

    /// Builds a bag value. Repeated keys have their counts summed and
    /// zero-count entries are dropped.
    ///
    /// Fails with [`AmountError::Overflow`] if the summed count of one key
    /// exceeds `u64::MAX`.
    pub fn bag<I, K>(entries: I) -> Result<Self, AmountError>
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<Key>,
    {
        let mut bag = BTreeMap::new();
        for (key, count) in entries {
            let key = key.into();
            let slot: &mut u64 = bag.entry(key.clone()).or_default();
            let total = slot.checked_add(count).ok_or_else(|| AmountError::Overflow {
                left: format!("{key} x{slot}"),
                right: format!("{key} x{count}"),
            })?;
            *slot = total;
        }
        bag.retain(|_, count| *count > 0);
        Ok(Self::Bag(bag))
    }

    /// The identity value for `kind`.
    pub fn empty(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Nat => Self::Nat(0),
            AssetKind::Set | AssetKind::CopySet => Self::Set(BTreeSet::new()),
            AssetKind::CopyBag => Self::Bag(BTreeMap::new()),
        }
    }

    /// Returns `true` if this is the identity value of its variant.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Nat(n) => *n == 0,
            Self::Set(set) => set.is_empty(),
            Self::Bag(bag) => bag.is_empty(),
        }
    }

    /// Returns `true` if the variant is the one `kind` prescribes.
    pub fn fits(&self, kind: AssetKind) -> bool {
        matches!(
            (self, kind),
            (Self::Nat(_), AssetKind::Nat)
                | (Self::Set(_), AssetKind::Set | AssetKind::CopySet)
                | (Self::Bag(_), AssetKind::CopyBag)
        )
    }
}

impl From<u128> for AssetValue {
    fn from(n: u128) -> Self {
        Self::Nat(n)
    }
}

impl From<u64> for AssetValue {
    fn from(n: u64) -> Self {
        Self::Nat(n.into())
    }
}

impl fmt::Display for AssetValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nat(n) => write!(f, "{n}"),
            Self::Set(set) => {
                f.write_str("{")?;
                for (i, key) in set.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}")?;
                }
                f.write_str("}")
            }
            Self::Bag(bag) => {
                f.write_str("{")?;
                for (i, (key, count)) in bag.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{key}×{count}")?;
                }
                f.write_str("}")
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

/// A quantity of one specific asset class: a `(brand, value)` pair.
///
/// Amounts are immutable. The fields are private so that every amount in
/// circulation was produced by [`make`](super::make), by
/// [`make_empty`](super::make_empty), or by the algebra itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Amount {
    brand: Brand,
    value: AssetValue,
}

impl Amount {
    pub(crate) fn from_parts(brand: Brand, value: AssetValue) -> Self {
        Self { brand, value }
    }

    /// The brand this amount is denominated in.
    pub fn brand(&self) -> &Brand {
        &self.brand
    }

    /// The raw value.
    pub fn value(&self) -> &AssetValue {
        &self.value
    }

    /// Shortcut for fungible amounts.
    pub fn as_nat(&self) -> Option<u128> {
        match self.value {
            AssetValue::Nat(n) => Some(n),
            _ => None,
        }
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.brand.alleged_name())
    }
}
