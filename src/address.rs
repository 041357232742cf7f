//! Account addresses
//!
//! Addresses are `0x` followed by 40 hex digits. Mixed-case checksums are
//! accepted but never verified, so comparisons are case-insensitive.

use alloy_primitives::Address as RawAddress;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::AddressError;

const ADDRESS_HEX_LEN: usize = 40;

/// A 20-byte account address
///
/// Keeps the string exactly as the provider (or user) supplied it, so the
/// clipboard export and display match what the wallet shows.
#[derive(Clone, Debug)]
pub struct Address {
    raw: String,
    inner: RawAddress,
}

impl Address {
    /// Parse an address, accepting any letter case
    pub fn parse(s: &str) -> Result<Self, AddressError> {
        let digits = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or(AddressError::MissingPrefix)?;

        if digits.len() != ADDRESS_HEX_LEN {
            return Err(AddressError::InvalidLength(digits.len()));
        }

        let inner = RawAddress::from_str(digits).map_err(|_| AddressError::InvalidHex)?;

        Ok(Self {
            raw: s.to_string(),
            inner,
        })
    }

    /// Syntactic check only
    pub fn is_valid(s: &str) -> bool {
        Self::parse(s).is_ok()
    }

    /// The address as originally supplied
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Lower-case `0x`-prefixed form
    pub fn to_lowercase_hex(&self) -> String {
        format!("0x{}", hex::encode(self.inner.as_slice()))
    }

    pub fn as_primitive(&self) -> &RawAddress {
        &self.inner
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl Eq for Address {}

impl std::hash::Hash for Address {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Address::parse(&s).map_err(serde::de::Error::custom)
    }
}
