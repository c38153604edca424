use serde::{Deserialize, Serialize};
use std::fmt;

use super::order::OrderType;

/// Directional read of an indicator, or of a whole bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    Bullish,
    Bearish,
    #[default]
    Neutral,
}

impl Signal {
    /// The order a signal opens: Bullish buys, Bearish sells, Neutral opens nothing.
    pub fn order_type(&self) -> Option<OrderType> {
        match self {
            Signal::Bullish => Some(OrderType::Buy),
            Signal::Bearish => Some(OrderType::Sell),
            Signal::Neutral => None,
        }
    }

    pub fn is_neutral(&self) -> bool {
        matches!(self, Signal::Neutral)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Bullish => "BULLISH",
            Signal::Bearish => "BEARISH",
            Signal::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_type_mapping() {
        assert_eq!(Signal::Bullish.order_type(), Some(OrderType::Buy));
        assert_eq!(Signal::Bearish.order_type(), Some(OrderType::Sell));
        assert_eq!(Signal::Neutral.order_type(), None);
    }

    #[test]
    fn serializes_screaming_case() {
        assert_eq!(serde_json::to_string(&Signal::Bullish).unwrap(), "\"BULLISH\"");
    }
}
