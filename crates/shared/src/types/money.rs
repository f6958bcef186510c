//! Payout currencies.
//!
//! CRITICAL: Amounts are always `rust_decimal::Decimal`, never floats.

use serde::{Deserialize, Serialize};

/// ISO 4217 currencies the storefront sells and pays out in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Central African CFA franc
    Xaf,
    /// West African CFA franc
    Xof,
    /// Nigerian Naira
    Ngn,
    /// Ghanaian Cedi
    Ghs,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
}

impl Currency {
    /// Returns the ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Xaf => "XAF",
            Self::Xof => "XOF",
            Self::Ngn => "NGN",
            Self::Ghs => "GHS",
            Self::Usd => "USD",
            Self::Eur => "EUR",
        }
    }

    /// Number of decimal places of the currency's minor unit.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::Xaf | Self::Xof => 0,
            Self::Ngn | Self::Ghs | Self::Usd | Self::Eur => 2,
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "XAF" => Ok(Self::Xaf),
            "XOF" => Ok(Self::Xof),
            "NGN" => Ok(Self::Ngn),
            "GHS" => Ok(Self::Ghs),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
