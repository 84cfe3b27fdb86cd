//! Exact unsigned integers for on-chain quantities and prices.
//!
//! Every amount that crosses the chain boundary is a `uint256`, so the
//! engine carries [`Amount`] (a `U256`) end to end. Quote notionals are the
//! product of two `uint256` values and are carried as [`Notional`] (a `U512`),
//! which can hold any single product without overflow.
//!
//! Both types serialize as decimal strings. Deserialization also accepts
//! unsigned JSON integers for convenience; floats are always rejected.

use std::fmt;
use std::str::FromStr;

use primitive_types::{U256, U512};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::VenuebookError;

/// A non-negative `uint256` amount in the smallest on-chain unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Amount(pub U256);

/// Prices are fixed-point integers whose scale is defined by the venue.
pub type Price = Amount;

/// Base-asset quantities.
pub type Quantity = Amount;

impl Amount {
    pub const ZERO: Self = Self(U256([0, 0, 0, 0]));
    pub const MAX: Self = Self(U256::MAX);

    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(U256([value, 0, 0, 0]))
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    #[must_use]
    pub fn checked_sub(self, rhs: Self) -> Option<Self> {
        self.0.checked_sub(rhs.0).map(Self)
    }

    #[must_use]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    /// Subtraction clamped at zero.
    #[must_use]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    /// Full-width product; two `uint256` values always fit in `uint512`.
    #[must_use]
    pub fn full_mul(self, rhs: Self) -> Notional {
        Notional(self.0.full_mul(rhs.0))
    }
}

impl From<u64> for Amount {
    fn from(value: u64) -> Self {
        Self::from_u64(value)
    }
}

impl From<U256> for Amount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl FromStr for Amount {
    type Err = VenuebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(VenuebookError::InvalidAmount(s.to_string()));
        }
        U256::from_dec_str(s)
            .map(Self)
            .map_err(|_| VenuebookError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A quote-currency notional (`quantity × price`), wide enough for any
/// single `uint256 × uint256` product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Default)]
pub struct Notional(pub U512);

impl Notional {
    pub const ZERO: Self = Self(U512([0, 0, 0, 0, 0, 0, 0, 0]));

    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self)
    }

    /// Narrow back to a `uint256` when the value fits (e.g. to submit on-chain).
    #[must_use]
    pub fn to_amount(self) -> Option<Amount> {
        U256::try_from(self.0).ok().map(Amount)
    }
}

impl From<Amount> for Notional {
    fn from(value: Amount) -> Self {
        Self(U512::from(value.0))
    }
}

impl FromStr for Notional {
    type Err = VenuebookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(VenuebookError::InvalidAmount(s.to_string()));
        }
        U512::from_dec_str(s)
            .map(Self)
            .map_err(|_| VenuebookError::InvalidAmount(s.to_string()))
    }
}

impl fmt::Display for Notional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Serde: decimal strings on the wire
// ---------------------------------------------------------------------------

macro_rules! decimal_string_serde {
    ($ty:ty, $visitor:ident, $expecting:literal) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        struct $visitor;

        impl Visitor<'_> for $visitor {
            type Value = $ty;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str($expecting)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                v.parse().map_err(E::custom)
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(Amount::from_u64(v).into())
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                deserializer.deserialize_any($visitor)
            }
        }
    };
}

decimal_string_serde!(Amount, AmountVisitor, "a uint256 as a decimal string");
decimal_string_serde!(Notional, NotionalVisitor, "a uint512 as a decimal string");
