//! Technical indicators computed over the aggregator's lookback window.
//!
//! The set is closed: [`IndicatorKind`] names every indicator and dispatches to
//! its calculation. Each calculation receives the window newest-first, reads the
//! results already stored on older bars, and writes into the newest bar only.
//! Values fill in incrementally; a field stays absent until enough history
//! exists to compute it.

pub mod adx;
pub mod rsi;

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candlestick, Signal};

/// Decimal places kept after every division.
pub const DIVISION_SCALE: u32 = 10;

/// The indicators a candlestick carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IndicatorKind {
    Adx,
    Rsi,
}

impl IndicatorKind {
    pub const ALL: [IndicatorKind; 2] = [IndicatorKind::Adx, IndicatorKind::Rsi];

    pub fn name(&self) -> &'static str {
        match self {
            IndicatorKind::Adx => "ADX",
            IndicatorKind::Rsi => "RSI",
        }
    }

    /// Data keys in report order.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            IndicatorKind::Adx => adx::FIELDS,
            IndicatorKind::Rsi => rsi::FIELDS,
        }
    }

    /// Number of bars the calculation reads, newest included.
    pub fn required_lookback(&self, settings: &IndicatorSettings) -> usize {
        match self {
            IndicatorKind::Adx | IndicatorKind::Rsi => settings.period,
        }
    }

    /// Calculate this indicator for the newest bar of `window`.
    pub fn calculate(
        &self,
        window: &mut [Candlestick],
        settings: &IndicatorSettings,
    ) -> Result<(), IndicatorError> {
        match self {
            IndicatorKind::Adx => adx::calculate(window, settings),
            IndicatorKind::Rsi => rsi::calculate(window, settings),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Named numeric fields of one indicator on one bar, plus its signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorResult {
    pub kind: IndicatorKind,
    pub data: BTreeMap<String, Decimal>,
    pub signal: Signal,
}

impl IndicatorResult {
    pub fn new(kind: IndicatorKind) -> Self {
        Self {
            kind,
            data: BTreeMap::new(),
            signal: Signal::Neutral,
        }
    }

    pub fn get(&self, key: &str) -> Option<Decimal> {
        self.data.get(key).copied()
    }

    pub fn insert(&mut self, key: &str, value: Decimal) {
        self.data.insert(key.to_string(), value);
    }
}

/// Period and signal thresholds shared by the indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub period: usize,
    pub adx_trend_line: Decimal,
    pub rsi_overbought: Decimal,
    pub rsi_oversold: Decimal,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            period: 14,
            adx_trend_line: Decimal::from(50),
            rsi_overbought: Decimal::from(70),
            rsi_oversold: Decimal::from(30),
        }
    }
}

impl IndicatorSettings {
    pub fn validate(&self) -> Result<(), IndicatorError> {
        if self.period < 2 {
            return Err(IndicatorError::InvalidPeriod(self.period));
        }
        if self.rsi_oversold > self.rsi_overbought {
            return Err(IndicatorError::InvertedRsiBands {
                oversold: self.rsi_oversold,
                overbought: self.rsi_overbought,
            });
        }
        Ok(())
    }

    /// Largest lookback any indicator needs; the aggregator's window capacity.
    pub fn max_lookback(&self) -> usize {
        IndicatorKind::ALL
            .iter()
            .map(|k| k.required_lookback(self))
            .max()
            .unwrap_or(self.period)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum IndicatorError {
    #[error("{0} calculated over an empty window")]
    EmptyWindow(IndicatorKind),
    #[error("bar {timestamp} carries no {kind} result")]
    MissingResult {
        kind: IndicatorKind,
        timestamp: NaiveDateTime,
    },
    #[error("{kind}: arithmetic overflow in {step}")]
    Overflow {
        kind: IndicatorKind,
        step: &'static str,
    },
    #[error("indicator period must be at least 2, got {0}")]
    InvalidPeriod(usize),
    #[error("RSI oversold level {oversold} is above overbought level {overbought}")]
    InvertedRsiBands {
        oversold: Decimal,
        overbought: Decimal,
    },
}

/// Median of a set of values; the mean of the two middle values for even counts.
pub fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / Decimal::TWO)
    }
}

/// `numerator / denominator` rounded to [`DIVISION_SCALE`]; `None` on a zero
/// denominator or overflow.
pub(crate) fn divide(numerator: Decimal, denominator: Decimal) -> Option<Decimal> {
    numerator
        .checked_div(denominator)
        .map(|q| q.round_dp(DIVISION_SCALE))
}

/// `key` on the newest bar followed by the same key on `older`, up to `count`
/// values in total. `None` if any of those bars lacks the value.
pub(crate) fn window_values(
    newest: Decimal,
    older: &[Candlestick],
    kind: IndicatorKind,
    key: &str,
    count: usize,
) -> Option<Vec<Decimal>> {
    let mut values = Vec::with_capacity(count);
    values.push(newest);
    for bar in older.iter().take(count.saturating_sub(1)) {
        values.push(bar.field(kind, key)?);
    }
    Some(values)
}

pub(crate) fn result_mut(
    bar: &mut Candlestick,
    kind: IndicatorKind,
) -> Result<&mut IndicatorResult, IndicatorError> {
    let timestamp = bar.timestamp;
    bar.indicator_mut(kind)
        .ok_or(IndicatorError::MissingResult { kind, timestamp })
}

/// Feed OHLC rows through a lookback window the way the aggregator does and
/// return every bar after calculation, oldest first.
#[cfg(test)]
pub fn run_series(
    kind: IndicatorKind,
    rows: &[(Decimal, Decimal, Decimal, Decimal)],
    settings: &IndicatorSettings,
) -> Vec<Candlestick> {
    use std::collections::VecDeque;

    let base = chrono::NaiveDate::from_ymd_opt(2024, 3, 4)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let capacity = settings.max_lookback();
    let mut window: VecDeque<Candlestick> = VecDeque::with_capacity(capacity + 1);
    let mut out = Vec::with_capacity(rows.len());

    for (i, &(open, high, low, close)) in rows.iter().enumerate() {
        let timestamp = base + chrono::Duration::minutes(15 * i as i64);
        window.push_front(Candlestick {
            timestamp,
            calculated_tick_time: timestamp + chrono::Duration::minutes(15),
            open,
            high,
            low,
            close,
            indicators: vec![IndicatorResult::new(kind)],
            signal: Signal::Neutral,
        });
        window.truncate(capacity);
        kind.calculate(window.make_contiguous(), settings).unwrap();
        out.push(window[0].clone());
    }
    out
}

/// Rows whose open is the previous close and whose range is ±`spread` around
/// the body.
#[cfg(test)]
pub fn rows_from_closes(
    closes: &[Decimal],
    spread: Decimal,
) -> Vec<(Decimal, Decimal, Decimal, Decimal)> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            (open, open.max(close) + spread, open.min(close) - spread, close)
        })
        .collect()
}
