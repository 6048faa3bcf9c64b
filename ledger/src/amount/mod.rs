//! # Amount Algebra
//!
//! Amounts are the ledger's unit of account: an immutable `(brand, value)`
//! pair whose value shape is dictated by the brand's [`AssetKind`].
//!
//! ```text
//! kind.rs    AssetKind and DisplayInfo
//! value.rs   Key, AssetValue and the Amount record
//! math.rs    make / coerce / add / subtract / is_equal / is_gte
//! shape.rs   AmountShape assertions for optional pre-commit checks
//! ```
//!
//! The ledger never inspects values directly; every balance computation
//! goes through [`math`], so supporting a new kind means teaching `math`
//! about it and nothing else.

pub mod kind;
pub mod math;
pub mod shape;
pub mod value;

pub use kind::{AssetKind, DisplayInfo};
pub use math::{add, coerce, is_empty, is_equal, is_gte, make, make_empty, subtract, AmountError};
pub use shape::AmountShape;
pub use value::{Amount, AssetValue, Key};
