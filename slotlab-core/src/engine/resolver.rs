//! Composite signal per bar and the signal events that open simulated trades.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Candlestick, OrderType, Signal, TimeScope, Timeframe};
use crate::indicators::IndicatorKind;

/// Bullish only when every indicator is Bullish, Bearish only when every one is
/// Bearish, Neutral otherwise.
pub fn composite(bar: &Candlestick) -> Signal {
    let mut signals = IndicatorKind::ALL.iter().map(|&k| bar.indicator_signal(k));
    match signals.next() {
        Some(first) if !first.is_neutral() && signals.all(|s| s == first) => first,
        _ => Signal::Neutral,
    }
}

/// Which non-neutral bars become signal events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalEventPolicy {
    /// A run of consecutive bars with the same signal yields one event, at the
    /// first bar of the run.
    #[default]
    CollapseRuns,
    /// Every non-neutral bar is an event.
    EveryBar,
}

/// A non-neutral bar selected for backtesting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalEvent {
    pub bar_timestamp: NaiveDateTime,
    /// Timestamp of the tick that sealed the bar; trades open here.
    pub opened_at: NaiveDateTime,
    pub signal: Signal,
    pub order_type: OrderType,
    pub scope: TimeScope,
}

/// Turns the sealed bar stream into signal events.
#[derive(Debug, Clone)]
pub struct SignalResolver {
    policy: SignalEventPolicy,
    timeframe: Timeframe,
    previous: Signal,
}

impl SignalResolver {
    pub fn new(policy: SignalEventPolicy, timeframe: Timeframe) -> Self {
        Self {
            policy,
            timeframe,
            previous: Signal::Neutral,
        }
    }

    /// Observe the next sealed bar.
    pub fn observe(&mut self, bar: &Candlestick) -> Option<SignalEvent> {
        let previous = std::mem::replace(&mut self.previous, bar.signal);
        let order_type = bar.signal.order_type()?;
        if self.policy == SignalEventPolicy::CollapseRuns && bar.signal == previous {
            return None;
        }
        Some(SignalEvent {
            bar_timestamp: bar.timestamp,
            opened_at: bar.calculated_tick_time,
            signal: bar.signal,
            order_type,
            scope: TimeScope::of(bar.calculated_tick_time, &self.timeframe),
        })
    }
}

/// Resolve events for a full bar sequence.
pub fn signal_events(
    bars: &[Candlestick],
    policy: SignalEventPolicy,
    timeframe: &Timeframe,
) -> Vec<SignalEvent> {
    let mut resolver = SignalResolver::new(policy, timeframe.clone());
    bars.iter().filter_map(|bar| resolver.observe(bar)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::IndicatorResult;
    use chrono::{NaiveDate, Weekday};
    use rust_decimal::Decimal;

    fn bar(minute: u32, adx: Signal, rsi: Signal) -> Candlestick {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, minute, 0)
            .unwrap();
        let mut adx_result = IndicatorResult::new(IndicatorKind::Adx);
        adx_result.signal = adx;
        let mut rsi_result = IndicatorResult::new(IndicatorKind::Rsi);
        rsi_result.signal = rsi;
        let mut bar = Candlestick {
            timestamp: ts,
            calculated_tick_time: ts + chrono::Duration::minutes(1),
            open: Decimal::ONE,
            high: Decimal::ONE,
            low: Decimal::ONE,
            close: Decimal::ONE,
            indicators: vec![adx_result, rsi_result],
            signal: Signal::Neutral,
        };
        bar.signal = composite(&bar);
        bar
    }

    #[test]
    fn composite_requires_agreement() {
        use Signal::*;
        assert_eq!(bar(0, Bullish, Bullish).signal, Bullish);
        assert_eq!(bar(0, Bearish, Bearish).signal, Bearish);
        assert_eq!(bar(0, Bullish, Bearish).signal, Neutral);
        assert_eq!(bar(0, Bullish, Neutral).signal, Neutral);
        assert_eq!(bar(0, Neutral, Neutral).signal, Neutral);
    }

    #[test]
    fn collapse_keeps_first_bar_of_each_run() {
        use Signal::*;
        let bars = vec![
            bar(0, Bullish, Bullish),
            bar(1, Bullish, Bullish),
            bar(2, Bearish, Bearish),
            bar(3, Neutral, Bullish),
            bar(4, Bearish, Bearish),
            bar(5, Bearish, Bearish),
        ];
        let events = signal_events(&bars, SignalEventPolicy::CollapseRuns, &Timeframe::m15());
        let kept: Vec<_> = events.iter().map(|e| e.bar_timestamp).collect();
        assert_eq!(kept, vec![bars[0].timestamp, bars[2].timestamp, bars[4].timestamp]);
        assert_eq!(events[0].order_type, OrderType::Buy);
        assert_eq!(events[1].order_type, OrderType::Sell);
    }

    #[test]
    fn every_bar_keeps_all_non_neutral() {
        use Signal::*;
        let bars = vec![
            bar(0, Bullish, Bullish),
            bar(1, Bullish, Bullish),
            bar(2, Neutral, Neutral),
        ];
        let events = signal_events(&bars, SignalEventPolicy::EveryBar, &Timeframe::m15());
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn scope_comes_from_sealing_tick() {
        let event = signal_events(
            &[bar(0, Signal::Bullish, Signal::Bullish)],
            SignalEventPolicy::default(),
            &Timeframe::m15(),
        )
        .remove(0);
        assert_eq!(event.opened_at, event.bar_timestamp + chrono::Duration::minutes(1));
        assert_eq!(event.scope, TimeScope::new(Weekday::Mon, 2));
    }
}
