//! models/amount.rs
//! Fixed two-decimal money amount, kept exact as integer minor units.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Up to 19 integer digits, as in a `NUMERIC(19,2)` column.
pub const MAX_INTEGER_DIGITS: usize = 19;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid amount {0:?}: expected digits with exactly two decimals")]
pub struct AmountError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount {
    minor_units: u128,
}

impl FromStr for Amount {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let err = || AmountError(s.to_string());

        let (int_part, frac_part) = raw.split_once('.').ok_or_else(err)?;
        let digits_only = |p: &str| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit());
        if !digits_only(int_part) || int_part.len() > MAX_INTEGER_DIGITS {
            return Err(err());
        }
        if frac_part.len() != 2 || !digits_only(frac_part) {
            return Err(err());
        }

        let whole: u128 = int_part.parse().map_err(|_| err())?;
        let cents: u128 = frac_part.parse().map_err(|_| err())?;
        Ok(Amount {
            minor_units: whole * 100 + cents,
        })
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.minor_units / 100, self.minor_units % 100)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
