//! ADX: Average Directional Index over a fixed window.
//!
//! Steps, per newest bar:
//! 1. TR1 = max(high − low, |high − prevClose|, |low − prevClose|), +DM1 and −DM1
//! 2. Once every bar of a full window carries TR1/DM1: sum each over the window
//! 3. +DI = 100 × Σ+DM / ΣTR, −DI = 100 × Σ−DM / ΣTR
//! 4. DX = 100 × |+DI − −DI| / (+DI + −DI)
//! 5. Once every bar of a full window carries DX: ADX = median of the window's DX
//!
//! The median in step 5 replaces Wilder's smoothing.

use rust_decimal::Decimal;

use super::{divide, result_mut, window_values, IndicatorError, IndicatorKind, IndicatorSettings};
use crate::domain::{Candlestick, Signal};

pub const TR1: &str = "tr1";
pub const PLUS_DM1: &str = "+dm1";
pub const MINUS_DM1: &str = "-dm1";
pub const PLUS_DI: &str = "+di(P)";
pub const MINUS_DI: &str = "-di(P)";
pub const DX: &str = "dx";
pub const ADX: &str = "adx";

pub const FIELDS: &[&str] = &[TR1, PLUS_DM1, MINUS_DM1, PLUS_DI, MINUS_DI, DX, ADX];

const KIND: IndicatorKind = IndicatorKind::Adx;

pub fn calculate(window: &mut [Candlestick], settings: &IndicatorSettings) -> Result<(), IndicatorError> {
    let (current, older) = window
        .split_first_mut()
        .ok_or(IndicatorError::EmptyWindow(KIND))?;
    let older: &[Candlestick] = older;
    let Some(previous) = older.first() else {
        return Ok(());
    };

    let tr = true_range(current, previous);
    let (plus_dm, minus_dm) = directional_movement(current, previous);

    let result = result_mut(current, KIND)?;
    result.insert(TR1, tr);
    result.insert(PLUS_DM1, plus_dm);
    result.insert(MINUS_DM1, minus_dm);

    let period = settings.period;
    if older.len() + 1 < period {
        return Ok(());
    }

    let (Some(trs), Some(plus_dms), Some(minus_dms)) = (
        window_values(tr, older, KIND, TR1, period),
        window_values(plus_dm, older, KIND, PLUS_DM1, period),
        window_values(minus_dm, older, KIND, MINUS_DM1, period),
    ) else {
        return Ok(());
    };

    let tr_sum = checked_sum(&trs)?;
    let plus_di = directional_index(checked_sum(&plus_dms)?, tr_sum)?;
    let minus_di = directional_index(checked_sum(&minus_dms)?, tr_sum)?;
    let dx = directional_index((plus_di - minus_di).abs(), plus_di + minus_di)?;

    result.insert(PLUS_DI, plus_di);
    result.insert(MINUS_DI, minus_di);
    result.insert(DX, dx);

    let Some(dxs) = window_values(dx, older, KIND, DX, period) else {
        return Ok(());
    };
    let Some(adx) = super::median(&dxs) else {
        return Ok(());
    };
    result.insert(ADX, adx);
    result.signal = signal(adx, plus_di, minus_di, settings.adx_trend_line);

    Ok(())
}

pub fn true_range(current: &Candlestick, previous: &Candlestick) -> Decimal {
    (current.high - current.low)
        .max((current.high - previous.close).abs())
        .max((current.low - previous.close).abs())
}

/// (+DM, −DM). The larger move wins if positive; an exact tie goes to +DM.
pub fn directional_movement(current: &Candlestick, previous: &Candlestick) -> (Decimal, Decimal) {
    let up = current.high - previous.high;
    let down = previous.low - current.low;
    let plus = if up >= down && up > Decimal::ZERO { up } else { Decimal::ZERO };
    let minus = if down > up && down > Decimal::ZERO { down } else { Decimal::ZERO };
    (plus, minus)
}

fn signal(adx: Decimal, plus_di: Decimal, minus_di: Decimal, trend_line: Decimal) -> Signal {
    if adx <= trend_line {
        return Signal::Neutral;
    }
    match plus_di.cmp(&minus_di) {
        std::cmp::Ordering::Greater => Signal::Bullish,
        std::cmp::Ordering::Less => Signal::Bearish,
        std::cmp::Ordering::Equal => Signal::Neutral,
    }
}

/// `100 × part / whole`, zero when `whole` is zero.
fn directional_index(part: Decimal, whole: Decimal) -> Result<Decimal, IndicatorError> {
    if whole.is_zero() {
        return Ok(Decimal::ZERO);
    }
    divide(part, whole)
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .ok_or(IndicatorError::Overflow {
            kind: KIND,
            step: "directional index",
        })
}

fn checked_sum(values: &[Decimal]) -> Result<Decimal, IndicatorError> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
        .ok_or(IndicatorError::Overflow {
            kind: KIND,
            step: "window sum",
        })
}
