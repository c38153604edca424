//! Unit runner: one (instrument, timeframe) pair end to end, and the fan-out
//! over a directory of tick files.
//!
//! Entry points:
//! - `build_bars()`: ticks → sealed bars plus the final lookback snapshot.
//! - `process_unit()`: ticks → bars → events → replay → selected trades. No I/O.
//! - `Runner::run_directory()`: every tick file × configured timeframe, with
//!   artifacts written per unit and failures isolated per unit.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, info, warn};

use slotlab_core::data::{load_ticks, symbol_from_path, tick_pairs, TickSourceError, TickStats};
use slotlab_core::domain::{Candlestick, Instrument, Tick, Timeframe};
use slotlab_core::engine::{signal_events, AggregatorSnapshot, CandlestickAggregator, SignalEvent};
use slotlab_core::indicators::{IndicatorError, IndicatorSettings};

use crate::config::{ConfigError, ProcessorConfig};
use crate::export::save_artifacts;
use crate::grid::{GridError, RiskGrid};
use crate::selector::{SlotSelector, Trade};
use crate::simulator::{Simulator, SlotStatistics};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("tick source error: {0}")]
    Ticks(#[from] TickSourceError),
    #[error("indicator error: {0}")]
    Indicators(#[from] IndicatorError),
    #[error("risk grid error: {0}")]
    Grid(#[from] GridError),
    #[error("no instrument configured for symbol '{0}'")]
    UnknownSymbol(String),
    #[error("failed to list {path}: {source}")]
    ListDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Everything one processing unit produces.
#[derive(Debug, Clone)]
pub struct UnitResult {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub tick_count: usize,
    pub tick_stats: TickStats,
    pub bars: Vec<Candlestick>,
    pub events: Vec<SignalEvent>,
    pub statistics: SlotStatistics,
    pub trades: Vec<Trade>,
    pub snapshot: AggregatorSnapshot,
}

impl UnitResult {
    pub fn summary(&self, output_dir: Option<PathBuf>) -> UnitSummary {
        UnitSummary {
            ticks: self.tick_count,
            malformed: self.tick_stats.malformed,
            bars: self.bars.len(),
            events: self.events.len(),
            scopes: self.statistics.len(),
            trades: self.trades.len(),
            open_outcomes: self.statistics.open_outcomes(),
            output_dir,
        }
    }
}

/// Counts reported for a completed unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub ticks: usize,
    pub malformed: usize,
    pub bars: usize,
    pub events: usize,
    pub scopes: usize,
    pub trades: usize,
    pub open_outcomes: usize,
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitStatus {
    Completed(UnitSummary),
    Failed(String),
}

/// Outcome of one (instrument, timeframe) unit in a directory run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub source: PathBuf,
    pub symbol: String,
    pub timeframe: String,
    pub status: UnitStatus,
}

impl UnitReport {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, UnitStatus::Failed(_))
    }
}

/// Fold ticks into sealed bars. Also returns the lookback window left at the end.
pub fn build_bars(
    ticks: &[Tick],
    timeframe: &Timeframe,
    settings: &IndicatorSettings,
) -> Result<(Vec<Candlestick>, AggregatorSnapshot), IndicatorError> {
    let mut aggregator = CandlestickAggregator::new(timeframe.clone(), settings.clone());
    let mut bars = Vec::new();
    for pair in tick_pairs(ticks) {
        if let Some(bar) = aggregator.push(&pair)? {
            bars.push(bar);
        }
    }
    Ok((bars, aggregator.snapshot()))
}

/// Run one unit on pre-loaded ticks. No I/O.
///
/// The config, instrument and timeframe are validated first.
pub fn process_unit(
    ticks: &[Tick],
    tick_stats: TickStats,
    instrument: &Instrument,
    timeframe: &Timeframe,
    config: &ProcessorConfig,
    parallel: bool,
) -> Result<UnitResult, RunError> {
    config.validate()?;
    instrument.validate().map_err(ConfigError::from)?;
    timeframe.validate().map_err(ConfigError::from)?;

    let (bars, snapshot) = build_bars(ticks, timeframe, &config.indicators)?;
    let events = signal_events(&bars, config.simulation.signal_events, timeframe);

    let grid = RiskGrid::from_sweep(&config.sweep)?;
    let statistics = Simulator::new(grid, instrument.clone())
        .with_open_spread(config.simulation.charge_open_spread)
        .with_parallelism(parallel)
        .run(ticks, &events);
    let trades = SlotSelector::from(&config.selection).select(&statistics, timeframe);

    Ok(UnitResult {
        symbol: instrument.symbol.clone(),
        timeframe: timeframe.clone(),
        tick_count: ticks.len(),
        tick_stats,
        bars,
        events,
        statistics,
        trades,
        snapshot,
    })
}

/// Drives every unit of a directory run.
pub struct Runner {
    config: ProcessorConfig,
    parallel: bool,
}

impl Runner {
    pub fn new(config: ProcessorConfig) -> Self {
        let parallel = config.simulation.parallel;
        Self { config, parallel }
    }

    /// Enables or disables parallel execution across units and events.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Tick files in `input_dir` whose symbol prefix is configured, sorted by name.
    pub fn tick_files(&self, input_dir: &Path) -> Result<Vec<(PathBuf, Instrument)>, RunError> {
        let list_err = |source| RunError::ListDir {
            path: input_dir.to_path_buf(),
            source,
        };
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(input_dir).map_err(list_err)? {
            let path = entry.map_err(list_err)?.path();
            if path.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut files = Vec::new();
        for path in paths {
            let Some(symbol) = symbol_from_path(&path) else {
                warn!(path = %path.display(), "skipping file without symbol prefix");
                continue;
            };
            match self.config.instrument(&symbol) {
                Some(instrument) => files.push((path, instrument.clone())),
                None => warn!(path = %path.display(), %symbol, "skipping unconfigured symbol"),
            }
        }
        Ok(files)
    }

    /// Process every tick file × timeframe and write each unit's artifacts under
    /// `output_dir`. A failing unit is reported; its siblings still run.
    pub fn run_directory(&self, input_dir: &Path, output_dir: &Path) -> Result<Vec<UnitReport>, RunError> {
        self.config.validate()?;
        let files = self.tick_files(input_dir)?;
        info!(
            files = files.len(),
            timeframes = self.config.timeframes.len(),
            parallel = self.parallel,
            "starting run"
        );

        let reports: Vec<Vec<UnitReport>> = if self.parallel {
            files
                .par_iter()
                .map(|(path, instrument)| self.run_file(path, instrument, output_dir))
                .collect()
        } else {
            files
                .iter()
                .map(|(path, instrument)| self.run_file(path, instrument, output_dir))
                .collect()
        };
        Ok(reports.into_iter().flatten().collect())
    }

    /// Load one file once and run every configured timeframe on it.
    fn run_file(&self, path: &Path, instrument: &Instrument, output_dir: &Path) -> Vec<UnitReport> {
        let series = match load_ticks(path) {
            Ok(series) => series,
            Err(e) => {
                error!(path = %path.display(), error = %e, "failed to load ticks");
                let message = e.to_string();
                return self
                    .config
                    .timeframes
                    .iter()
                    .map(|tf| self.report(path, instrument, tf, UnitStatus::Failed(message.clone())))
                    .collect();
            }
        };
        let ticks: Arc<[Tick]> = series.ticks.into();
        let stats = series.stats;

        let run_unit = |timeframe: &Timeframe| {
            let status = match self.run_unit(&ticks, stats, instrument, timeframe, output_dir) {
                Ok(summary) => {
                    info!(
                        symbol = %instrument.symbol,
                        %timeframe,
                        bars = summary.bars,
                        events = summary.events,
                        trades = summary.trades,
                        open = summary.open_outcomes,
                        "unit completed"
                    );
                    UnitStatus::Completed(summary)
                }
                Err(e) => {
                    error!(symbol = %instrument.symbol, %timeframe, error = %e, "unit failed");
                    UnitStatus::Failed(e.to_string())
                }
            };
            self.report(path, instrument, timeframe, status)
        };

        if self.parallel {
            self.config.timeframes.par_iter().map(run_unit).collect()
        } else {
            self.config.timeframes.iter().map(run_unit).collect()
        }
    }

    fn run_unit(
        &self,
        ticks: &[Tick],
        stats: TickStats,
        instrument: &Instrument,
        timeframe: &Timeframe,
        output_dir: &Path,
    ) -> anyhow::Result<UnitSummary> {
        let result = process_unit(ticks, stats, instrument, timeframe, &self.config, self.parallel)?;
        let dir = save_artifacts(&result, &self.config.fingerprint(), output_dir)?;
        Ok(result.summary(Some(dir)))
    }

    fn report(&self, path: &Path, instrument: &Instrument, timeframe: &Timeframe, status: UnitStatus) -> UnitReport {
        UnitReport {
            source: path.to_path_buf(),
            symbol: instrument.symbol.clone(),
            timeframe: timeframe.name.clone(),
            status,
        }
    }
}
