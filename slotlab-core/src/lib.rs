//! SlotLab Core: tick source, candlestick aggregation, indicators, signal resolution.
//!
//! This crate contains the streaming half of the pipeline:
//! - Domain types (ticks, candlesticks, instruments, timeframes, time scopes)
//! - MT5 tick file reader with forward-fill and ordering guarantees
//! - Candlestick aggregator owning a bounded lookback window
//! - Closed indicator set (ADX, RSI) calculated incrementally per sealed bar
//! - Composite signal resolution and signal-event selection

pub mod data;
pub mod domain;
pub mod engine;
pub mod indicators;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything shared across replay workers is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::Tick>();
        require_sync::<domain::Tick>();
        require_send::<domain::TickPair>();
        require_sync::<domain::TickPair>();
        require_send::<domain::Candlestick>();
        require_sync::<domain::Candlestick>();
        require_send::<domain::Instrument>();
        require_sync::<domain::Instrument>();
        require_send::<domain::Timeframe>();
        require_sync::<domain::Timeframe>();
        require_send::<domain::TimeScope>();
        require_sync::<domain::TimeScope>();

        // Indicators
        require_send::<indicators::IndicatorResult>();
        require_sync::<indicators::IndicatorResult>();
        require_send::<indicators::IndicatorSettings>();
        require_sync::<indicators::IndicatorSettings>();

        // Engine
        require_send::<engine::CandlestickAggregator>();
        require_sync::<engine::CandlestickAggregator>();
        require_send::<engine::SignalEvent>();
        require_sync::<engine::SignalEvent>();
    }
}
