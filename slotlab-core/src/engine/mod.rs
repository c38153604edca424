//! Streaming engine: tick pairs → sealed candlesticks → signal events.
//!
//! Strictly sequential within one (instrument, timeframe) unit:
//!
//! 1. The aggregator folds ticks into the in-progress bar
//! 2. A boundary-crossing tick seals the bar into the lookback window
//! 3. Indicators calculate on the newest bar, then the composite signal resolves
//! 4. The resolver turns non-neutral bars into signal events

pub mod aggregator;
pub mod resolver;

pub use aggregator::{AggregatorSnapshot, CandlestickAggregator};
pub use resolver::{composite, signal_events, SignalEvent, SignalEventPolicy, SignalResolver};
