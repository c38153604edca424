//! MetaTrader 5 tick export reader.
//!
//! Tab-separated `DATE\tTIME\tBID\tASK[\tLAST\tVOLUME\tFLAGS]` with an optional
//! `<DATE>` header row. Empty BID/ASK cells carry the previous value forward;
//! nothing is emitted until both sides are known. Lines with neither side, and
//! lines whose timestamp does not advance past the last accepted tick, are
//! dropped without updating the carried prices. Malformed lines are logged and
//! skipped.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{Tick, TickPair};

const HEADER_PREFIX: &str = "<DATE>";
const TIMESTAMP_FORMAT: &str = "%Y.%m.%d %H:%M:%S%.f";

/// One parsed line before forward-filling. `None` sides were empty cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawTick {
    pub timestamp: NaiveDateTime,
    pub bid: Option<Decimal>,
    pub ask: Option<Decimal>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TickParseError {
    #[error("missing {0} column")]
    MissingField(&'static str),
    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
    #[error("invalid {field} price '{value}'")]
    InvalidPrice { field: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum TickSourceError {
    #[error("tick source {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Parse one line. Header and blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<RawTick>, TickParseError> {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() || line.starts_with(HEADER_PREFIX) {
        return Ok(None);
    }

    let mut parts = line.split('\t');
    let date = parts.next().ok_or(TickParseError::MissingField("DATE"))?;
    let time = parts
        .next()
        .filter(|t| !t.is_empty())
        .ok_or(TickParseError::MissingField("TIME"))?;
    let stamp = format!("{date} {time}");
    let timestamp = NaiveDateTime::parse_from_str(&stamp, TIMESTAMP_FORMAT)
        .map_err(|_| TickParseError::InvalidTimestamp(stamp.clone()))?;

    let bid = parse_price(parts.next(), "BID")?;
    let ask = parse_price(parts.next(), "ASK")?;

    Ok(Some(RawTick { timestamp, bid, ask }))
}

fn parse_price(cell: Option<&str>, field: &'static str) -> Result<Option<Decimal>, TickParseError> {
    match cell.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<Decimal>()
            .map(Some)
            .map_err(|_| TickParseError::InvalidPrice {
                field,
                value: value.to_string(),
            }),
    }
}

/// Counters gathered while reading a tick source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickStats {
    pub lines: usize,
    pub accepted: usize,
    pub malformed: usize,
    pub out_of_order: usize,
    /// Lines seen before both bid and ask were known.
    pub incomplete: usize,
    /// Lines with neither bid nor ask (LAST/VOLUME-only records).
    #[serde(default)]
    pub empty: usize,
}

/// Forward-fills missing sides and enforces strictly increasing timestamps.
#[derive(Debug, Clone, Default)]
pub struct TickCleaner {
    bid: Option<Decimal>,
    ask: Option<Decimal>,
    last: Option<Tick>,
    stats: TickStats,
}

impl TickCleaner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> TickStats {
        self.stats
    }

    /// Accept a parsed line, returning the tick pair it produces, if any.
    ///
    /// Quote-less and non-advancing lines are dropped before they can touch
    /// the forward-fill state.
    pub fn accept(&mut self, raw: RawTick) -> Option<TickPair> {
        if raw.bid.is_none() && raw.ask.is_none() {
            self.stats.empty += 1;
            return None;
        }
        if let Some(last) = self.last {
            if raw.timestamp <= last.timestamp {
                self.stats.out_of_order += 1;
                return None;
            }
        }

        if let Some(bid) = raw.bid {
            self.bid = Some(bid);
        }
        if let Some(ask) = raw.ask {
            self.ask = Some(ask);
        }
        let (Some(bid), Some(ask)) = (self.bid, self.ask) else {
            self.stats.incomplete += 1;
            return None;
        };

        let current = Tick::new(raw.timestamp, bid, ask);
        let pair = TickPair {
            current,
            previous: self.last,
        };
        self.last = Some(current);
        self.stats.accepted += 1;
        Some(pair)
    }

    fn record_malformed(&mut self) {
        self.stats.malformed += 1;
    }

    fn record_line(&mut self) {
        self.stats.lines += 1;
    }
}

/// Streaming reader yielding accepted tick pairs.
///
/// Malformed lines are skipped with a warning; an I/O failure is yielded once
/// and ends the stream.
pub struct TickReader<R> {
    lines: io::Lines<R>,
    path: PathBuf,
    line_no: usize,
    cleaner: TickCleaner,
    failed: bool,
}

impl<R: BufRead> TickReader<R> {
    pub fn new(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            lines: reader.lines(),
            path: path.into(),
            line_no: 0,
            cleaner: TickCleaner::new(),
            failed: false,
        }
    }

    pub fn stats(&self) -> TickStats {
        self.cleaner.stats()
    }
}

impl TickReader<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, TickSourceError> {
        let file = File::open(path).map_err(|source| TickSourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file), path))
    }
}

impl<R: BufRead> Iterator for TickReader<R> {
    type Item = Result<TickPair, TickSourceError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(source) => {
                    self.failed = true;
                    return Some(Err(TickSourceError::Io {
                        path: self.path.clone(),
                        source,
                    }));
                }
            };
            self.line_no += 1;
            self.cleaner.record_line();

            match parse_line(&line) {
                Ok(Some(raw)) => {
                    if let Some(pair) = self.cleaner.accept(raw) {
                        return Some(Ok(pair));
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        path = %self.path.display(),
                        line = self.line_no,
                        error = %e,
                        "skipping malformed tick line"
                    );
                    self.cleaner.record_malformed();
                }
            }
        }
    }
}

/// A fully loaded tick file.
#[derive(Debug, Clone)]
pub struct TickSeries {
    pub ticks: Vec<Tick>,
    pub stats: TickStats,
}

/// Load every accepted tick of a file into memory.
pub fn load_ticks(path: &Path) -> Result<TickSeries, TickSourceError> {
    let mut reader = TickReader::open(path)?;
    let mut ticks = Vec::new();
    for pair in reader.by_ref() {
        ticks.push(pair?.current);
    }
    let stats = reader.stats();
    debug!(
        path = %path.display(),
        accepted = stats.accepted,
        malformed = stats.malformed,
        out_of_order = stats.out_of_order,
        empty = stats.empty,
        "loaded ticks"
    );
    Ok(TickSeries { ticks, stats })
}

/// Pair every tick with its predecessor.
pub fn tick_pairs(ticks: &[Tick]) -> impl Iterator<Item = TickPair> + '_ {
    ticks.iter().enumerate().map(move |(i, &current)| TickPair {
        current,
        previous: i.checked_sub(1).map(|p| ticks[p]),
    })
}

/// Symbol prefix of a tick file name: `EURUSD_2024.csv` → `EURUSD`.
pub fn symbol_from_path(path: &Path) -> Option<String> {
    let stem = path.file_name()?.to_str()?;
    let symbol = stem.split('_').next()?;
    if symbol.is_empty() || symbol == stem {
        None
    } else {
        Some(symbol.to_string())
    }
}
