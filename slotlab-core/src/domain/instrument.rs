use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Instrument metadata needed to express price moves in pips.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    pub symbol: String,
    /// Smallest meaningful price increment, e.g. `0.0001` for EURUSD.
    pub pip: Decimal,
    /// Swap rate applied to long positions held over the Tuesday rollover.
    #[serde(default)]
    pub swap_long: Decimal,
    /// Swap rate applied to short positions held over the Tuesday rollover.
    #[serde(default)]
    pub swap_short: Decimal,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, pip: Decimal, swap_long: Decimal, swap_short: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            pip,
            swap_long,
            swap_short,
        }
    }

    /// Convert a raw price difference into pips.
    pub fn to_pips(&self, price_delta: Decimal) -> Decimal {
        price_delta / self.pip
    }

    pub fn validate(&self) -> Result<(), InstrumentError> {
        if self.symbol.trim().is_empty() {
            return Err(InstrumentError::EmptySymbol);
        }
        if self.pip <= Decimal::ZERO {
            return Err(InstrumentError::InvalidPip {
                symbol: self.symbol.clone(),
                pip: self.pip,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum InstrumentError {
    #[error("instrument symbol must not be empty")]
    EmptySymbol,
    #[error("instrument {symbol}: pip must be positive, got {pip}")]
    InvalidPip { symbol: String, pip: Decimal },
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn to_pips_scales_by_pip() {
        let eurusd = Instrument::new("EURUSD", dec!(0.0001), dec!(0), dec!(0));
        assert_eq!(eurusd.to_pips(dec!(0.0025)), dec!(25));
    }

    #[test]
    fn validate_rejects_zero_pip() {
        let bad = Instrument::new("EURUSD", dec!(0), dec!(0), dec!(0));
        assert!(matches!(bad.validate(), Err(InstrumentError::InvalidPip { .. })));
    }

    #[test]
    fn validate_rejects_blank_symbol() {
        let bad = Instrument::new("  ", dec!(0.01), dec!(0), dec!(0));
        assert_eq!(bad.validate(), Err(InstrumentError::EmptySymbol));
    }
}
