//! Domain types for SlotLab

pub mod candle;
pub mod instrument;
pub mod order;
pub mod signal;
pub mod tick;
pub mod timeframe;

pub use candle::{BarBuilder, Candlestick};
pub use instrument::{Instrument, InstrumentError};
pub use order::OrderType;
pub use signal::Signal;
pub use tick::{Tick, TickPair};
pub use timeframe::{TimeScope, Timeframe, TimeframeError};
