//! Tick: a single bid/ask quote, the raw unit of market data.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// One accepted bid/ask quote.
///
/// Both sides are always present: the tick source forward-fills a missing side
/// before a tick is ever constructed. Equality and ordering look at the
/// timestamp only, so two quotes at the same instant are the same tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: NaiveDateTime,
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Tick {
    pub fn new(timestamp: NaiveDateTime, bid: Decimal, ask: Decimal) -> Self {
        Self {
            timestamp,
            bid,
            ask,
        }
    }

    /// `bid - ask`. Negative in a normal market, so adding it to a running
    /// profit charges the spread as a cost.
    pub fn spread(&self) -> Decimal {
        self.bid - self.ask
    }
}

impl PartialEq for Tick {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for Tick {}

impl PartialOrd for Tick {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Tick {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp.cmp(&other.timestamp)
    }
}

/// A tick together with the tick accepted immediately before it.
///
/// `previous` is `None` only for the very first tick of a stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPair {
    pub current: Tick,
    pub previous: Option<Tick>,
}
