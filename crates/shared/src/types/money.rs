//! Exact money handling.
//!
//! Amounts are `Decimal` in the domain and signed 64-bit minor units in
//! storage, so every backend stores them exactly. Floats never touch a balance.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Number of fractional digits kept by the ledger.
pub const LEDGER_SCALE: u32 = 8;

const UNITS_PER_WHOLE: Decimal = Decimal::from_parts(100_000_000, 0, 0, false, 0);

/// Errors converting between decimal amounts and ledger minor units.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// The amount carries more fractional digits than the ledger keeps.
    #[error("amount {0} has more than {LEDGER_SCALE} fractional digits")]
    TooPrecise(Decimal),

    /// The amount does not fit in ledger storage.
    #[error("amount {0} is out of range")]
    OutOfRange(Decimal),
}

/// Converts a decimal amount to ledger minor units.
///
/// # Errors
///
/// Returns an error if the amount has more than [`LEDGER_SCALE`] fractional
/// digits or does not fit in an `i64` of minor units. Nothing is rounded.
pub fn to_minor_units(amount: Decimal) -> Result<i64, MoneyError> {
    if amount.normalize().scale() > LEDGER_SCALE {
        return Err(MoneyError::TooPrecise(amount));
    }

    amount
        .checked_mul(UNITS_PER_WHOLE)
        .and_then(|units| units.to_i64())
        .ok_or(MoneyError::OutOfRange(amount))
}

/// Converts ledger minor units back to a decimal amount.
#[must_use]
pub fn from_minor_units(units: i64) -> Decimal {
    Decimal::new(units, LEDGER_SCALE).normalize()
}

/// Currencies accepted for gateway deposits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Bitcoin
    Btc,
    /// Ether
    Eth,
    /// Litecoin
    Ltc,
    /// Tether
    Usdt,
}

impl Currency {
    /// Returns the ticker symbol.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Btc => "BTC",
            Self::Eth => "ETH",
            Self::Ltc => "LTC",
            Self::Usdt => "USDT",
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
            "BTC" => Ok(Self::Btc),
            "ETH" => Ok(Self::Eth),
            "LTC" => Ok(Self::Ltc),
            "USDT" => Ok(Self::Usdt),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
