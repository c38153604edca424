//! Candlestick, the sealed price bar, and the builder that accumulates it.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::signal::Signal;
use super::tick::Tick;
use crate::indicators::{IndicatorKind, IndicatorResult};

/// A sealed OHLC bar with the indicator state attached to it.
///
/// Prices are bids. `timestamp` is the bar-open boundary, `calculated_tick_time`
/// the timestamp of the tick that crossed into the next bar and sealed this one.
/// Identity is the bar timestamp; the indicator payload is filled in by the
/// aggregator while the bar sits at the head of the lookback window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candlestick {
    pub timestamp: NaiveDateTime,
    pub calculated_tick_time: NaiveDateTime,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub indicators: Vec<IndicatorResult>,
    pub signal: Signal,
}

impl Candlestick {
    pub fn indicator(&self, kind: IndicatorKind) -> Option<&IndicatorResult> {
        self.indicators.iter().find(|r| r.kind == kind)
    }

    pub fn indicator_mut(&mut self, kind: IndicatorKind) -> Option<&mut IndicatorResult> {
        self.indicators.iter_mut().find(|r| r.kind == kind)
    }

    /// Signal of one indicator; Neutral when the indicator is not attached.
    pub fn indicator_signal(&self, kind: IndicatorKind) -> Signal {
        self.indicator(kind).map(|r| r.signal).unwrap_or_default()
    }

    /// Convenience lookup of a named indicator field.
    pub fn field(&self, kind: IndicatorKind, key: &str) -> Option<Decimal> {
        self.indicator(kind).and_then(|r| r.get(key))
    }
}

impl PartialEq for Candlestick {
    fn eq(&self, other: &Self) -> bool {
        self.timestamp == other.timestamp
    }
}

impl Eq for Candlestick {}

/// The in-progress bar. Holds prices only; it becomes a [`Candlestick`] when
/// sealed, so indicator state can never be read from an unfinished bar.
#[derive(Debug, Clone)]
pub struct BarBuilder {
    timestamp: NaiveDateTime,
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    tick_count: usize,
}

impl BarBuilder {
    pub fn start(timestamp: NaiveDateTime, first: &Tick) -> Self {
        Self {
            timestamp,
            open: first.bid,
            high: first.bid,
            low: first.bid,
            close: first.bid,
            tick_count: 1,
        }
    }

    pub fn update(&mut self, tick: &Tick) {
        self.high = self.high.max(tick.bid);
        self.low = self.low.min(tick.bid);
        self.close = tick.bid;
        self.tick_count += 1;
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn tick_count(&self) -> usize {
        self.tick_count
    }

    /// Freeze prices into a candlestick carrying one empty result per indicator.
    pub fn seal(self, sealed_by: &Tick, kinds: &[IndicatorKind]) -> Candlestick {
        Candlestick {
            timestamp: self.timestamp,
            calculated_tick_time: sealed_by.timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            indicators: kinds.iter().map(|&k| IndicatorResult::new(k)).collect(),
            signal: Signal::Neutral,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn tick(second: u32, bid: Decimal) -> Tick {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(10, 0, second)
            .unwrap();
        Tick::new(ts, bid, bid + dec!(0.0002))
    }

    #[test]
    fn builder_tracks_ohlc_from_bids() {
        let first = tick(0, dec!(1.10));
        let mut bar = BarBuilder::start(first.timestamp, &first);
        bar.update(&tick(1, dec!(1.12)));
        bar.update(&tick(2, dec!(1.08)));
        bar.update(&tick(3, dec!(1.11)));

        let sealed = bar.seal(&tick(59, dec!(1.2)), &[IndicatorKind::Adx, IndicatorKind::Rsi]);
        assert_eq!(sealed.open, dec!(1.10));
        assert_eq!(sealed.high, dec!(1.12));
        assert_eq!(sealed.low, dec!(1.08));
        assert_eq!(sealed.close, dec!(1.11));
        assert_eq!(sealed.calculated_tick_time, tick(59, dec!(0)).timestamp);
        assert_eq!(sealed.indicators.len(), 2);
        assert_eq!(sealed.signal, Signal::Neutral);
    }

    #[test]
    fn sealed_bar_starts_neutral_per_indicator() {
        let first = tick(0, dec!(1.10));
        let sealed = BarBuilder::start(first.timestamp, &first)
            .seal(&tick(1, dec!(1.1)), &[IndicatorKind::Adx]);
        assert_eq!(sealed.indicator_signal(IndicatorKind::Adx), Signal::Neutral);
        assert!(sealed.indicator(IndicatorKind::Rsi).is_none());
    }
}
