//! Asset amounts (§6): `(int64 amount, 8-byte symbol code with precision in
//! the low byte)`. `Balance` in the data model is realized as this type
//! wherever a balance, stake, or transferable amount is mentioned.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::{DeipError, ValidationError};

/// A packed `(precision, ticker)` symbol. Ticker is up to 7 ASCII
/// uppercase characters, right-padded with zero bytes; precision sits in
/// the low byte, matching the wire layout in §6.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetSymbol {
    precision: u8,
    ticker: [u8; 7],
}

impl AssetSymbol {
    pub fn new(ticker: &str, precision: u8) -> Result<Self, DeipError> {
        if ticker.is_empty() || ticker.len() > 7 || !ticker.bytes().all(|b| b.is_ascii_uppercase())
        {
            return Err(ValidationError::Other(format!("invalid asset ticker: {ticker}")).into());
        }
        let mut bytes = [0u8; 7];
        bytes[..ticker.len()].copy_from_slice(ticker.as_bytes());
        Ok(Self { precision, ticker: bytes })
    }

    pub fn precision(&self) -> u8 {
        self.precision
    }

    pub fn ticker(&self) -> &str {
        let end = self.ticker.iter().position(|&b| b == 0).unwrap_or(7);
        std::str::from_utf8(&self.ticker[..end]).unwrap_or("")
    }

    /// Packs into the 8-byte wire code: low byte precision, 7 ticker bytes.
    pub fn to_wire_bytes(&self) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0] = self.precision;
        out[1..8].copy_from_slice(&self.ticker);
        out
    }
}

impl fmt::Debug for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ticker())
    }
}

/// The chain's single core asset, used for transferable balances, staking,
/// vesting, and budgets unless a research token sale introduces a
/// security-token symbol of its own.
pub fn core_asset_symbol() -> AssetSymbol {
    AssetSymbol::new(crate::constants::CORE_ASSET_SYMBOL, crate::constants::CORE_ASSET_PRECISION)
        .expect("core asset symbol constants are valid")
}

/// A signed fixed-precision amount tagged with its symbol. Arithmetic
/// between mismatched symbols is a programmer error the evaluator layer
/// must never attempt — `checked_add`/`checked_sub` return `None` on
/// mismatch instead of panicking.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: AssetSymbol,
}

impl Asset {
    pub fn new(amount: i64, symbol: AssetSymbol) -> Self {
        Self { amount, symbol }
    }

    pub fn core(amount: i64) -> Self {
        Self { amount, symbol: core_asset_symbol() }
    }

    pub fn zero(symbol: AssetSymbol) -> Self {
        Self { amount: 0, symbol }
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn checked_add(&self, other: &Asset) -> Result<Asset, DeipError> {
        if self.symbol != other.symbol {
            return Err(ValidationError::AssetSymbolMismatch {
                expected: self.symbol.ticker().to_string(),
                got: other.symbol.ticker().to_string(),
            }
            .into());
        }
        Ok(Asset { amount: self.amount.checked_add(other.amount).unwrap_or(i64::MAX), symbol: self.symbol })
    }

    pub fn checked_sub(&self, other: &Asset) -> Result<Asset, DeipError> {
        if self.symbol != other.symbol {
            return Err(ValidationError::AssetSymbolMismatch {
                expected: self.symbol.ticker().to_string(),
                got: other.symbol.ticker().to_string(),
            }
            .into());
        }
        if self.amount < other.amount {
            return Err(crate::error::EvaluationError::InsufficientBalance {
                need: other.amount,
                have: self.amount,
            }
            .into());
        }
        Ok(Asset { amount: self.amount - other.amount, symbol: self.symbol })
    }
}

impl Add for Asset {
    type Output = Asset;
    fn add(self, rhs: Asset) -> Asset {
        self.checked_add(&rhs).expect("asset symbols must match")
    }
}

impl Sub for Asset {
    type Output = Asset;
    fn sub(self, rhs: Asset) -> Asset {
        self.checked_sub(&rhs).expect("asset symbols must match and balance must suffice")
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.symbol.precision() as u32;
        let scale = 10i64.pow(p);
        write!(f, "{}.{:0width$} {}", self.amount / scale, (self.amount % scale).abs(), self.symbol.ticker(), width = p as usize)
    }
}
