//! Tick ingestion

pub mod ticks;

pub use ticks::{
    load_ticks, parse_line, symbol_from_path, tick_pairs, RawTick, TickCleaner, TickParseError,
    TickReader, TickSeries, TickSourceError, TickStats,
};
