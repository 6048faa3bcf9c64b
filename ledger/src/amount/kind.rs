//! Asset kinds and display metadata.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

// ---------------------------------------------------------------------------
// AssetKind
// ---------------------------------------------------------------------------

/// The algebraic shape of a brand's values.
///
/// The kind is fixed when the issuer kit is created and decides which
/// [`AssetValue`](super::AssetValue) variant every amount of the brand uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetKind {
    /// Fungible quantities: natural numbers in smallest units.
    #[default]
    Nat,
    /// Distinct, non-fungible elements. Kept for older issuers; new ones
    /// should prefer [`AssetKind::CopySet`].
    Set,
    /// Distinct, non-fungible elements.
    CopySet,
    /// Semi-fungible elements with multiplicities.
    CopyBag,
}

impl AssetKind {
    /// Every recognized kind, in declaration order.
    pub const ALL: [AssetKind; 4] = [Self::Nat, Self::Set, Self::CopySet, Self::CopyBag];

    /// Canonical lowercase-camel name, matching the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Nat => "nat",
            Self::Set => "set",
            Self::CopySet => "copySet",
            Self::CopyBag => "copyBag",
        }
    }

    /// Returns `true` for kinds whose values are plain quantities.
    pub fn is_fungible(&self) -> bool {
        matches!(self, Self::Nat)
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetKind {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                LedgerError::Validation(format!(
                    "unrecognized asset kind {s:?}; expected one of nat, set, copySet, copyBag"
                ))
            })
    }
}

// ---------------------------------------------------------------------------
// DisplayInfo
// ---------------------------------------------------------------------------

/// Presentation hints for a brand. Never consulted by the ledger's
/// arithmetic; the `asset_kind` field is overwritten with the canonical kind
/// when the kit is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayInfo {
    /// Asset kind of the brand.
    #[serde(default)]
    pub asset_kind: AssetKind,

    /// Number of decimal places a UI should shift by when rendering a
    /// [`AssetKind::Nat`] value. `None` means "render as an integer".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimal_places: Option<i32>,
}

impl DisplayInfo {
    /// Display info with the given decimal places and a default kind.
    pub fn with_decimal_places(decimal_places: i32) -> Self {
        Self {
            decimal_places: Some(decimal_places),
            ..Self::default()
        }
    }

    pub(crate) fn normalized(self, asset_kind: AssetKind) -> Self {
        Self { asset_kind, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_canonical_name() {
        for kind in AssetKind::ALL {
            assert_eq!(kind.as_str().parse::<AssetKind>().unwrap(), kind);
        }
    }

    #[test]
    fn rejects_unknown_kind() {
        let err = "fungible".parse::<AssetKind>().unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn serde_names_match_canonical_names() {
        let json = serde_json::to_string(&AssetKind::CopyBag).unwrap();
        assert_eq!(json, "\"copyBag\"");
    }

    #[test]
    fn normalization_overrides_kind_and_keeps_decimals() {
        let info = DisplayInfo {
            asset_kind: AssetKind::CopySet,
            decimal_places: Some(6),
        };
        let normalized = info.normalized(AssetKind::Nat);
        assert_eq!(normalized.asset_kind, AssetKind::Nat);
        assert_eq!(normalized.decimal_places, Some(6));
    }

    #[test]
    fn display_info_omits_missing_decimals() {
        let json = serde_json::to_string(&DisplayInfo::default()).unwrap();
        assert_eq!(json, r#"{"assetKind":"nat"}"#);
    }
}
