//! Amount shapes: optional assertions callers attach to consuming
//! operations ("burn this payment, but only if it holds exactly 7 moola").

use std::fmt;

use super::kind::AssetKind;
use super::math;
use super::value::Amount;
use crate::brand::Brand;
use crate::error::LedgerError;

/// A pattern an [`Amount`] can be checked against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmountShape {
    /// Matches every amount.
    Any,
    /// Matches exactly this amount.
    Exact(Amount),
    /// Matches any amount of this brand.
    Brand(Brand),
    /// Matches any amount whose value fits this kind.
    Kind(AssetKind),
    /// Matches amounts of the same brand that are `>=` the bound.
    AtLeast(Amount),
    /// Matches amounts of the same brand that are `<=` the bound.
    AtMost(Amount),
    /// Matches the empty amount of any brand.
    Empty,
}

impl AmountShape {
    /// Returns `true` if `amount` fits this shape. Comparisons across brands
    /// never match.
    pub fn matches(&self, amount: &Amount) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(expected) => expected == amount,
            Self::Brand(brand) => amount.brand() == brand,
            Self::Kind(kind) => amount.value().fits(*kind),
            Self::AtLeast(min) => math::is_gte(amount, min).unwrap_or(false),
            Self::AtMost(max) => math::is_gte(max, amount).unwrap_or(false),
            Self::Empty => math::is_empty(amount),
        }
    }

    /// Like [`matches`](Self::matches), but fails with
    /// [`LedgerError::ShapeMismatch`].
    pub fn must_match(&self, amount: &Amount) -> Result<(), LedgerError> {
        if self.matches(amount) {
            Ok(())
        } else {
            Err(LedgerError::ShapeMismatch {
                shape: self.to_string(),
                amount: amount.to_string(),
            })
        }
    }
}

impl From<Amount> for AmountShape {
    fn from(amount: Amount) -> Self {
        Self::Exact(amount)
    }
}

impl fmt::Display for AmountShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::Exact(amount) => write!(f, "exactly {amount}"),
            Self::Brand(brand) => write!(f, "any {brand}"),
            Self::Kind(kind) => write!(f, "any {kind} value"),
            Self::AtLeast(amount) => write!(f, "at least {amount}"),
            Self::AtMost(amount) => write!(f, "at most {amount}"),
            Self::Empty => f.write_str("empty"),
        }
    }
}

/// Checks an optional shape; `None` always passes.
pub(crate) fn check(amount: &Amount, shape: Option<&AmountShape>) -> Result<(), LedgerError> {
    match shape {
        Some(shape) => shape.must_match(amount),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::kind::DisplayInfo;
    use crate::amount::AssetValue;

    fn moola() -> Brand {
        Brand::detached("moola", DisplayInfo::default())
    }

    #[test]
    fn exact_shape_matches_only_equal_amounts() {
        let b = moola();
        let six = math::make(&b, 6u128).unwrap();
        let seven = math::make(&b, 7u128).unwrap();
        let shape = AmountShape::from(six.clone());
        assert!(shape.matches(&six));
        let err = shape.must_match(&seven).unwrap_err();
        assert_eq!(err.kind(), "shape_mismatch");
        assert_eq!(
            err.to_string(),
            "amount 7 moola does not match shape exactly 6 moola"
        );
    }

    #[test]
    fn bounds_are_inclusive() {
        let b = moola();
        let five = math::make(&b, 5u128).unwrap();
        assert!(AmountShape::AtLeast(five.clone()).matches(&five));
        assert!(AmountShape::AtMost(five.clone()).matches(&five));
        let four = math::make(&b, 4u128).unwrap();
        assert!(!AmountShape::AtLeast(five).matches(&four));
    }

    #[test]
    fn bounds_never_match_foreign_brands() {
        let a = moola();
        let b = moola();
        let bound = math::make(&a, 0u128).unwrap();
        let other = math::make(&b, 10u128).unwrap();
        assert!(!AmountShape::AtLeast(bound).matches(&other));
        assert!(!AmountShape::Brand(a).matches(&other));
    }

    #[test]
    fn kind_and_empty_shapes() {
        let b = moola();
        let zero = math::make_empty(&b, AssetKind::Nat);
        assert!(AmountShape::Empty.matches(&zero));
        assert!(AmountShape::Kind(AssetKind::Nat).matches(&zero));
        assert!(!AmountShape::Kind(AssetKind::CopyBag).matches(&zero));
        assert!(!AssetValue::from(1u64).fits(AssetKind::CopyBag));
    }

    #[test]
    fn missing_shape_always_passes() {
        let b = moola();
        let one = math::make(&b, 1u128).unwrap();
        assert!(check(&one, None).is_ok());
        assert!(check(&one, Some(&AmountShape::Any)).is_ok());
    }
}
