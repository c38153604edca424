//! Relative Strength Index (RSI).
//!
//! Per-bar gain/loss against the previous close. The first full window seeds the
//! averages with the median of its gains and losses; later bars apply Wilder
//! smoothing `avg = (prevAvg × (period − 1) + current) / period`.
//! RSI = 100 − 100 / (1 + avgGain / avgLoss); avgLoss == 0 → RSI = 100.

use rust_decimal::Decimal;

use super::{
    divide, median, result_mut, window_values, IndicatorError, IndicatorKind, IndicatorSettings,
};
use crate::domain::{Candlestick, Signal};

pub const GAIN: &str = "gain";
pub const LOSS: &str = "loss";
pub const AVERAGE_GAIN: &str = "averageGain";
pub const AVERAGE_LOSS: &str = "averageLoss";
pub const RSI: &str = "rsi";

pub const FIELDS: &[&str] = &[GAIN, LOSS, AVERAGE_GAIN, AVERAGE_LOSS, RSI];

const KIND: IndicatorKind = IndicatorKind::Rsi;

pub fn calculate(window: &mut [Candlestick], settings: &IndicatorSettings) -> Result<(), IndicatorError> {
    let (current, older) = window
        .split_first_mut()
        .ok_or(IndicatorError::EmptyWindow(KIND))?;
    let older: &[Candlestick] = older;
    let Some(previous) = older.first() else {
        return Ok(());
    };

    let change = current.close - previous.close;
    let gain = change.max(Decimal::ZERO);
    let loss = (-change).max(Decimal::ZERO);

    let result = result_mut(current, KIND)?;
    result.insert(GAIN, gain);
    result.insert(LOSS, loss);

    let period = settings.period;
    if older.len() + 1 < period {
        return Ok(());
    }
    let (Some(gains), Some(losses)) = (
        window_values(gain, older, KIND, GAIN, period),
        window_values(loss, older, KIND, LOSS, period),
    ) else {
        return Ok(());
    };

    let (average_gain, average_loss) = match (
        previous.field(KIND, AVERAGE_GAIN),
        previous.field(KIND, AVERAGE_LOSS),
    ) {
        (Some(prev_gain), Some(prev_loss)) => (
            smooth(prev_gain, gain, period)?,
            smooth(prev_loss, loss, period)?,
        ),
        _ => match (median(&gains), median(&losses)) {
            (Some(g), Some(l)) => (g, l),
            _ => return Ok(()),
        },
    };

    let rsi = relative_strength(average_gain, average_loss)?;
    result.insert(AVERAGE_GAIN, average_gain);
    result.insert(AVERAGE_LOSS, average_loss);
    result.insert(RSI, rsi);
    result.signal = signal(rsi, settings);

    Ok(())
}

fn smooth(previous: Decimal, current: Decimal, period: usize) -> Result<Decimal, IndicatorError> {
    let period = Decimal::from(period);
    previous
        .checked_mul(period - Decimal::ONE)
        .and_then(|v| v.checked_add(current))
        .and_then(|v| divide(v, period))
        .ok_or(IndicatorError::Overflow {
            kind: KIND,
            step: "wilder smoothing",
        })
}

fn relative_strength(average_gain: Decimal, average_loss: Decimal) -> Result<Decimal, IndicatorError> {
    if average_loss.is_zero() {
        return Ok(Decimal::ONE_HUNDRED);
    }
    divide(average_gain, average_loss)
        .and_then(|rs| divide(Decimal::ONE_HUNDRED, Decimal::ONE + rs))
        .map(|v| Decimal::ONE_HUNDRED - v)
        .ok_or(IndicatorError::Overflow {
            kind: KIND,
            step: "relative strength",
        })
}

fn signal(rsi: Decimal, settings: &IndicatorSettings) -> Signal {
    if rsi > settings.rsi_overbought {
        Signal::Bullish
    } else if rsi < settings.rsi_oversold {
        Signal::Bearish
    } else {
        Signal::Neutral
    }
}
