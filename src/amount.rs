//! Native-currency amounts in fixed-point base units
//!
//! All arithmetic and comparisons happen on 256-bit integer wei. Conversion
//! to and from the human unit (ether, 18 decimals) happens only at the display
//! boundary, through alloy's unit helpers.

use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::AmountError;

/// Decimal places between the human unit and base units
pub const DECIMALS: u32 = 18;

const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// An amount of native currency in base units
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wei(pub U256);

impl Wei {
    pub const ZERO: Wei = Wei(U256::ZERO);

    pub fn new(base_units: U256) -> Self {
        Self(base_units)
    }

    pub fn from_wei(base_units: u128) -> Self {
        Self(U256::from(base_units))
    }

    /// Whole ether, for fixtures and tests
    pub fn from_ether(ether: u64) -> Self {
        Self(U256::from(ether) * U256::from(WEI_PER_ETHER))
    }

    pub fn base_units(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn checked_add(self, other: Wei) -> Option<Wei> {
        self.0.checked_add(other.0).map(Wei)
    }

    pub fn checked_sub(self, other: Wei) -> Option<Wei> {
        self.0.checked_sub(other.0).map(Wei)
    }

    /// Parse a decimal ether string into exact base units
    ///
    /// Accepts `"1"`, `"1.5"`, `".5"`, `"1."`; rejects signs, exponents,
    /// separators and more than 18 fractional digits.
    pub fn parse_ether(input: &str) -> Result<Self, AmountError> {
        let s = input.trim();
        if s.is_empty() {
            return Err(AmountError::Empty);
        }

        if let Some(c) = s.chars().find(|c| !c.is_ascii_digit() && *c != '.') {
            return Err(AmountError::InvalidCharacter(c));
        }

        let (whole, frac) = match s.split_once('.') {
            Some((w, f)) => {
                if f.contains('.') {
                    return Err(AmountError::InvalidCharacter('.'));
                }
                (w, f)
            }
            None => (s, ""),
        };

        if whole.is_empty() && frac.is_empty() {
            return Err(AmountError::Empty);
        }
        if frac.len() > DECIMALS as usize {
            return Err(AmountError::TooManyDecimals(frac.len()));
        }

        let whole = if whole.is_empty() { "0" } else { whole };
        let normalized = if frac.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, frac)
        };

        parse_ether(&normalized)
            .map(Wei)
            .map_err(|_| AmountError::Overflow)
    }

    /// Parse a JSON-RPC hex quantity (`"0x1bc16d674ec80000"`)
    pub fn from_hex_quantity(quantity: &str) -> Result<Self, AmountError> {
        let digits = quantity
            .strip_prefix("0x")
            .filter(|d| !d.is_empty())
            .ok_or_else(|| AmountError::InvalidQuantity(quantity.to_string()))?;
        U256::from_str_radix(digits, 16)
            .map(Wei)
            .map_err(|_| AmountError::InvalidQuantity(quantity.to_string()))
    }

    /// Hex quantity form for JSON-RPC requests
    pub fn to_hex_quantity(&self) -> String {
        format!("0x{:x}", self.0)
    }

    /// Full-precision ether string with trailing zeros trimmed (`"0.01"`, `"2"`)
    pub fn format_ether(&self) -> String {
        let (whole, frac) = self.split_ether();
        let frac = frac.trim_end_matches('0');
        if frac.is_empty() {
            whole
        } else {
            format!("{}.{}", whole, frac)
        }
    }

    /// Ether string with exactly `places` decimals, truncated toward zero
    ///
    /// Truncation keeps the displayed balance from ever exceeding what the
    /// validator will accept.
    pub fn format_ether_fixed(&self, places: u32) -> String {
        let places = places.min(DECIMALS) as usize;
        let (whole, frac) = self.split_ether();
        if places == 0 {
            return whole;
        }
        let frac: String = frac.chars().chain(std::iter::repeat('0')).take(places).collect();
        format!("{}.{}", whole, frac)
    }

    fn split_ether(&self) -> (String, String) {
        let formatted = format_ether(self.0);
        match formatted.split_once('.') {
            Some((whole, frac)) => (whole.to_string(), frac.to_string()),
            None => (formatted, String::new()),
        }
    }
}

impl From<U256> for Wei {
    fn from(base_units: U256) -> Self {
        Self(base_units)
    }
}

impl fmt::Display for Wei {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} wei", self.0)
    }
}
