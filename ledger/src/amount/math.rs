//! Pure arithmetic over amounts.
//!
//! Every function here is total over well-formed input and never touches
//! ledger state. Binary operations insist that both operands carry the same
//! brand; mixing brands is always a bug in the caller.

use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use super::kind::AssetKind;
use super::value::{Amount, AssetValue, Key};
use crate::brand::Brand;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures raised by the amount algebra.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
    /// Operands (or an amount and the expected brand) disagree on brand.
    #[error("brand mismatch: expected {expected}, found {found}")]
    BrandMismatch {
        /// Alleged name of the brand that was required.
        expected: String,
        /// Alleged name of the brand that was supplied.
        found: String,
    },

    /// The value variant is not the one the brand's asset kind prescribes.
    #[error("value {value} is not valid for asset kind {kind}")]
    KindMismatch {
        /// The brand's asset kind.
        kind: AssetKind,
        /// Rendered offending value.
        value: String,
    },

    /// Subtraction would produce a negative quantity, or remove elements
    /// that are not present.
    #[error("cannot subtract {right} from {left}: the result would be negative")]
    Underflow {
        /// Rendered minuend.
        left: String,
        /// Rendered subtrahend.
        right: String,
    },

    /// Addition exceeded the representable range.
    #[error("amount overflow adding {left} and {right}")]
    Overflow {
        /// Rendered left operand.
        left: String,
        /// Rendered right operand.
        right: String,
    },

    /// Two set values being added share an element.
    #[error("set values must be disjoint: {0} is present in both")]
    DuplicateElement(Key),

    /// A bag value carries a zero multiplicity.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

/// Makes an amount of `brand`, checking the value against the brand's kind.
pub fn make(brand: &Brand, value: impl Into<AssetValue>) -> Result<Amount, AmountError> {
    let value = value.into();
    check_value(brand, &value)?;
    Ok(Amount::from_parts(brand.clone(), value))
}

/// Normalizes an untrusted amount into one guaranteed to belong to `brand`.
pub fn coerce(brand: &Brand, amount: &Amount) -> Result<Amount, AmountError> {
    assert_brand(brand, amount)?;
    check_value(brand, amount.value())?;
    Ok(amount.clone())
}

/// The identity element of `add` for `brand`.
pub fn make_empty(brand: &Brand, kind: AssetKind) -> Amount {
    Amount::from_parts(brand.clone(), AssetValue::empty(kind))
}

/// Returns `true` if `amount` is the identity element of its kind.
pub fn is_empty(amount: &Amount) -> bool {
    amount.value().is_empty()
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// `left + right`.
///
/// Nat values use checked addition. Set values must be disjoint. Bag values
/// sum multiplicities.
pub fn add(left: &Amount, right: &Amount) -> Result<Amount, AmountError> {
    let brand = same_brand(left, right)?;
    let value = match (left.value(), right.value()) {
        (AssetValue::Nat(l), AssetValue::Nat(r)) => {
            AssetValue::Nat(l.checked_add(*r).ok_or_else(|| AmountError::Overflow {
                left: left.to_string(),
                right: right.to_string(),
            })?)
        }
        (AssetValue::Set(l), AssetValue::Set(r)) => {
            if let Some(dup) = l.intersection(r).next() {
                return Err(AmountError::DuplicateElement(dup.clone()));
            }
            AssetValue::Set(l.union(r).cloned().collect())
        }
        (AssetValue::Bag(l), AssetValue::Bag(r)) => {
            let mut sum = l.clone();
            for (key, count) in r {
                let slot = sum.entry(key.clone()).or_insert(0);
                *slot = slot.checked_add(*count).ok_or_else(|| AmountError::Overflow {
                    left: left.to_string(),
                    right: right.to_string(),
                })?;
            }
            AssetValue::Bag(sum)
        }
        _ => return Err(kind_mismatch(brand, right.value())),
    };
    Ok(Amount::from_parts(brand.clone(), value))
}

/// `left - right`. Fails with [`AmountError::Underflow`] unless
/// `left >= right`.
pub fn subtract(left: &Amount, right: &Amount) -> Result<Amount, AmountError> {
    let brand = same_brand(left, right)?;
    let underflow = || AmountError::Underflow {
        left: left.to_string(),
        right: right.to_string(),
    };
    let value = match (left.value(), right.value()) {
        (AssetValue::Nat(l), AssetValue::Nat(r)) => {
            AssetValue::Nat(l.checked_sub(*r).ok_or_else(underflow)?)
        }
        (AssetValue::Set(l), AssetValue::Set(r)) => {
            if !r.is_subset(l) {
                return Err(underflow());
            }
            AssetValue::Set(l.difference(r).cloned().collect::<BTreeSet<_>>())
        }
        (AssetValue::Bag(l), AssetValue::Bag(r)) => {
            let mut rest: BTreeMap<Key, u64> = l.clone();
            for (key, count) in r {
                let held = rest.get(key).copied().unwrap_or(0);
                let left_over = held.checked_sub(*count).ok_or_else(underflow)?;
                if left_over == 0 {
                    rest.remove(key);
                } else {
                    rest.insert(key.clone(), left_over);
                }
            }
            AssetValue::Bag(rest)
        }
        _ => return Err(kind_mismatch(brand, right.value())),
    };
    Ok(Amount::from_parts(brand.clone(), value))
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// `left == right` for two amounts of the same brand.
pub fn is_equal(left: &Amount, right: &Amount) -> Result<bool, AmountError> {
    let brand = same_brand(left, right)?;
    match (left.value(), right.value()) {
        (AssetValue::Nat(_), AssetValue::Nat(_))
        | (AssetValue::Set(_), AssetValue::Set(_))
        | (AssetValue::Bag(_), AssetValue::Bag(_)) => Ok(left.value() == right.value()),
        _ => Err(kind_mismatch(brand, right.value())),
    }
}

/// `left >= right`: for sets and bags, `right` is contained in `left`.
pub fn is_gte(left: &Amount, right: &Amount) -> Result<bool, AmountError> {
    let brand = same_brand(left, right)?;
    match (left.value(), right.value()) {
        (AssetValue::Nat(l), AssetValue::Nat(r)) => Ok(l >= r),
        (AssetValue::Set(l), AssetValue::Set(r)) => Ok(r.is_subset(l)),
        (AssetValue::Bag(l), AssetValue::Bag(r)) => Ok(r
            .iter()
            .all(|(key, count)| l.get(key).copied().unwrap_or(0) >= *count)),
        _ => Err(kind_mismatch(brand, right.value())),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn same_brand<'a>(left: &'a Amount, right: &Amount) -> Result<&'a Brand, AmountError> {
    assert_brand(left.brand(), right)?;
    Ok(left.brand())
}

fn assert_brand(brand: &Brand, amount: &Amount) -> Result<(), AmountError> {
    if amount.brand() != brand {
        return Err(AmountError::BrandMismatch {
            expected: brand.alleged_name().to_string(),
            found: amount.brand().alleged_name().to_string(),
        });
    }
    Ok(())
}

fn check_value(brand: &Brand, value: &AssetValue) -> Result<(), AmountError> {
    if !value.fits(brand.asset_kind()) {
        return Err(kind_mismatch(brand, value));
    }
    if let AssetValue::Bag(bag) = value {
        if let Some((key, _)) = bag.iter().find(|(_, count)| **count == 0) {
            return Err(AmountError::InvalidValue(format!(
                "bag entry {key} has a zero count"
            )));
        }
    }
    Ok(())
}

fn kind_mismatch(brand: &Brand, value: &AssetValue) -> AmountError {
    AmountError::KindMismatch {
        kind: brand.asset_kind(),
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amount::kind::DisplayInfo;

    fn brand(kind: AssetKind) -> Brand {
        Brand::detached("moola", DisplayInfo::default().normalized(kind))
    }

    fn nat(brand: &Brand, n: u128) -> Amount {
        make(brand, n).unwrap()
    }

    #[test]
    fn nat_add_and_subtract() {
        let b = brand(AssetKind::Nat);
        let sum = add(&nat(&b, 3), &nat(&b, 4)).unwrap();
        assert_eq!(sum.as_nat(), Some(7));
        let rest = subtract(&sum, &nat(&b, 7)).unwrap();
        assert!(is_empty(&rest));
    }

    #[test]
    fn nat_subtract_underflow_rejected() {
        let b = brand(AssetKind::Nat);
        let err = subtract(&nat(&b, 3), &nat(&b, 4)).unwrap_err();
        assert!(matches!(err, AmountError::Underflow { .. }));
    }

    #[test]
    fn nat_add_overflow_rejected() {
        let b = brand(AssetKind::Nat);
        let err = add(&nat(&b, u128::MAX), &nat(&b, 1)).unwrap_err();
        assert!(matches!(err, AmountError::Overflow { .. }));
    }

    #[test]
    fn empty_is_additive_identity() {
        let b = brand(AssetKind::Nat);
        let empty = make_empty(&b, AssetKind::Nat);
        let five = nat(&b, 5);
        assert!(is_equal(&add(&empty, &five).unwrap(), &five).unwrap());
    }

    #[test]
    fn set_add_requires_disjoint_operands() {
        let b = brand(AssetKind::CopySet);
        let ab = make(&b, AssetValue::set(["a", "b"])).unwrap();
        let bc = make(&b, AssetValue::set(["b", "c"])).unwrap();
        assert_eq!(
            add(&ab, &bc).unwrap_err(),
            AmountError::DuplicateElement(Key::from("b"))
        );
    }

    #[test]
    fn set_subtract_requires_subset() {
        let b = brand(AssetKind::CopySet);
        let ab = make(&b, AssetValue::set(["a", "b"])).unwrap();
        let a = make(&b, AssetValue::set(["a"])).unwrap();
        let c = make(&b, AssetValue::set(["c"])).unwrap();
        assert_eq!(
            subtract(&ab, &a).unwrap(),
            make(&b, AssetValue::set(["b"])).unwrap()
        );
        assert!(matches!(
            subtract(&ab, &c).unwrap_err(),
            AmountError::Underflow { .. }
        ));
        assert!(is_gte(&ab, &a).unwrap());
        assert!(!is_gte(&ab, &c).unwrap());
    }

    #[test]
    fn bag_arithmetic_tracks_multiplicities() {
        let b = brand(AssetKind::CopyBag);
        let three = make(&b, AssetValue::bag([("ticket", 3)]).unwrap()).unwrap();
        let one = make(&b, AssetValue::bag([("ticket", 1)]).unwrap()).unwrap();
        let four = add(&three, &one).unwrap();
        assert_eq!(four, make(&b, AssetValue::bag([("ticket", 4)]).unwrap()).unwrap());
        let none = subtract(&four, &four).unwrap();
        assert!(is_empty(&none));
        assert!(subtract(&one, &three).is_err());
    }

    #[test]
    fn brands_never_mix() {
        let a = brand(AssetKind::Nat);
        let b = brand(AssetKind::Nat);
        let err = add(&nat(&a, 1), &nat(&b, 1)).unwrap_err();
        assert!(matches!(err, AmountError::BrandMismatch { .. }));
        assert!(coerce(&a, &nat(&b, 1)).is_err());
        assert!(coerce(&a, &nat(&a, 1)).is_ok());
    }

    #[test]
    fn make_rejects_value_of_wrong_kind() {
        let b = brand(AssetKind::CopySet);
        let err = make(&b, 5u128).unwrap_err();
        assert!(matches!(err, AmountError::KindMismatch { .. }));
    }
}
