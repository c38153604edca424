//! Candlestick aggregation: tick pairs in, sealed bars with indicators out.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::domain::{BarBuilder, Candlestick, Tick, TickPair, Timeframe};
use crate::indicators::{IndicatorError, IndicatorKind, IndicatorSettings};

use super::resolver;

/// Folds ticks into fixed-duration bars for one timeframe.
///
/// Owns the lookback window (newest first, capped at the largest indicator
/// lookback). When a tick crosses into a new bar the in-progress bar is sealed,
/// pushed to the front of the window, every indicator is calculated on it and
/// its composite signal resolved. Only then is it returned.
#[derive(Debug, Clone)]
pub struct CandlestickAggregator {
    timeframe: Timeframe,
    settings: IndicatorSettings,
    capacity: usize,
    window: VecDeque<Candlestick>,
    building: Option<BarBuilder>,
    last_tick: Option<Tick>,
    sealed: usize,
}

/// The state a consumer would need to resume aggregation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorSnapshot {
    pub timeframe: Timeframe,
    /// Lookback window, newest first.
    pub window: Vec<Candlestick>,
    pub last_tick: Option<Tick>,
}

impl CandlestickAggregator {
    pub fn new(timeframe: Timeframe, settings: IndicatorSettings) -> Self {
        let capacity = settings.max_lookback().max(1);
        Self {
            timeframe,
            settings,
            capacity,
            window: VecDeque::with_capacity(capacity + 1),
            building: None,
            last_tick: None,
            sealed: 0,
        }
    }

    pub fn timeframe(&self) -> &Timeframe {
        &self.timeframe
    }

    /// Number of bars sealed so far.
    pub fn sealed_count(&self) -> usize {
        self.sealed
    }

    /// Feed one tick. Returns the bar sealed by this tick, if any.
    pub fn push(&mut self, pair: &TickPair) -> Result<Option<Candlestick>, IndicatorError> {
        let tick = pair.current;
        let bar_start = self.timeframe.bar_start(tick.timestamp);
        self.last_tick = Some(tick);

        let sealed = match self.building.take() {
            None => {
                self.building = Some(BarBuilder::start(bar_start, &tick));
                return Ok(None);
            }
            Some(mut bar) if bar.timestamp() == bar_start => {
                bar.update(&tick);
                self.building = Some(bar);
                return Ok(None);
            }
            Some(bar) => bar.seal(&tick, &IndicatorKind::ALL),
        };

        self.building = Some(BarBuilder::start(bar_start, &tick));
        self.seal(sealed).map(Some)
    }

    /// Feed a whole stream, collecting every sealed bar.
    pub fn run<'a, I>(&mut self, pairs: I) -> Result<Vec<Candlestick>, IndicatorError>
    where
        I: IntoIterator<Item = &'a TickPair>,
    {
        let mut bars = Vec::new();
        for pair in pairs {
            if let Some(bar) = self.push(pair)? {
                bars.push(bar);
            }
        }
        Ok(bars)
    }

    pub fn snapshot(&self) -> AggregatorSnapshot {
        AggregatorSnapshot {
            timeframe: self.timeframe.clone(),
            window: self.window.iter().cloned().collect(),
            last_tick: self.last_tick,
        }
    }

    fn seal(&mut self, bar: Candlestick) -> Result<Candlestick, IndicatorError> {
        self.window.push_front(bar);
        self.window.truncate(self.capacity);

        let window = self.window.make_contiguous();
        for kind in IndicatorKind::ALL {
            kind.calculate(window, &self.settings)?;
        }
        let newest = &mut window[0];
        newest.signal = resolver::composite(newest);
        self.sealed += 1;

        debug!(
            timeframe = %self.timeframe,
            bar = %newest.timestamp,
            signal = %newest.signal,
            "sealed bar"
        );
        Ok(newest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Signal;
    use chrono::{NaiveDate, NaiveDateTime};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn pairs(ticks: &[(NaiveDateTime, Decimal)]) -> Vec<TickPair> {
        let mut previous = None;
        ticks
            .iter()
            .map(|&(ts, bid)| {
                let current = Tick::new(ts, bid, bid + dec!(0.0001));
                let pair = TickPair { current, previous };
                previous = Some(current);
                pair
            })
            .collect()
    }

    #[test]
    fn first_tick_never_seals() {
        let mut agg = CandlestickAggregator::new(Timeframe::m15(), IndicatorSettings::default());
        let stream = pairs(&[(at(9, 0, 0), dec!(1.1))]);
        assert!(agg.push(&stream[0]).unwrap().is_none());
        assert_eq!(agg.sealed_count(), 0);
    }

    #[test]
    fn crossing_a_boundary_seals_previous_bar() {
        let mut agg = CandlestickAggregator::new(Timeframe::m15(), IndicatorSettings::default());
        let stream = pairs(&[
            (at(9, 0, 0), dec!(1.1000)),
            (at(9, 5, 0), dec!(1.1030)),
            (at(9, 10, 0), dec!(1.0990)),
            (at(9, 14, 59), dec!(1.1010)),
            (at(9, 15, 0), dec!(1.2000)),
        ]);
        let bars = agg.run(&stream).unwrap();
        assert_eq!(bars.len(), 1);
        let bar = &bars[0];
        assert_eq!(bar.timestamp, at(9, 0, 0));
        assert_eq!(bar.calculated_tick_time, at(9, 15, 0));
        assert_eq!(bar.open, dec!(1.1000));
        assert_eq!(bar.high, dec!(1.1030));
        assert_eq!(bar.low, dec!(1.0990));
        assert_eq!(bar.close, dec!(1.1010));
        assert_eq!(bar.signal, Signal::Neutral);
    }

    #[test]
    fn window_is_capped_at_lookback() {
        let settings = IndicatorSettings {
            period: 3,
            ..Default::default()
        };
        let mut agg = CandlestickAggregator::new(Timeframe::m15(), settings);
        let ticks: Vec<_> = (0..10u32)
            .map(|i| (at(9 + i / 4, (i % 4) * 15, 0), Decimal::from(100 + i)))
            .collect();
        let bars = agg.run(&pairs(&ticks)).unwrap();
        assert_eq!(bars.len(), 9);

        let snapshot = agg.snapshot();
        assert_eq!(snapshot.window.len(), 3);
        assert_eq!(snapshot.window[0], bars[8]);
        assert_eq!(snapshot.window[2], bars[6]);
        assert_eq!(snapshot.last_tick.map(|t| t.timestamp), Some(ticks[9].0));
    }

    #[test]
    fn gap_spanning_several_periods_seals_once() {
        let mut agg = CandlestickAggregator::new(Timeframe::m15(), IndicatorSettings::default());
        let stream = pairs(&[(at(9, 0, 0), dec!(1)), (at(11, 40, 0), dec!(2))]);
        let bars = agg.run(&stream).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].calculated_tick_time, at(11, 40, 0));
    }
}
