//! Serializable processor configuration.
//!
//! Every constant the pipeline uses lives here and is passed into each
//! component at construction. Loaded from TOML; every section is optional and
//! falls back to the defaults below.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use slotlab_core::domain::{Instrument, InstrumentError, Timeframe, TimeframeError};
use slotlab_core::engine::SignalEventPolicy;
use slotlab_core::indicators::{IndicatorError, IndicatorSettings};

/// Deterministic content hash of a configuration.
pub type ConfigFingerprint = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("failed to render config TOML: {0}")]
    Render(#[from] toml::ser::Error),
    #[error("config has no instruments")]
    NoInstruments,
    #[error("config has no timeframes")]
    NoTimeframes,
    #[error("duplicate instrument symbol '{0}'")]
    DuplicateInstrument(String),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    #[error(transparent)]
    Timeframe(#[from] TimeframeError),
    #[error(transparent)]
    Indicators(#[from] IndicatorError),
    #[error("sweep: {0}")]
    Sweep(String),
    #[error("selection: {name} must lie in [0, 1], got {value}")]
    Fraction { name: &'static str, value: Decimal },
}

/// Full configuration of a processing run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    pub instruments: Vec<Instrument>,
    pub timeframes: Vec<Timeframe>,
    pub indicators: IndicatorSettings,
    pub sweep: SweepConfig,
    pub selection: SelectionConfig,
    pub simulation: SimulationConfig,
}

/// Take-profit / stop-loss grid bounds, in pips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub tp_min: Decimal,
    pub tp_max: Decimal,
    pub tp_step: Decimal,
    /// SL = −TP × risk_multiplier, truncated to whole pips.
    pub risk_multiplier: Decimal,
}

/// Slot selection policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Minimum resolved outcomes as a fraction of the slot's signal events.
    pub min_coverage: Decimal,
    /// Minimum wins / (wins + losses).
    pub hit_target: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Charge the spread on the tick a trade opens on.
    pub charge_open_spread: bool,
    pub signal_events: SignalEventPolicy,
    pub parallel: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            instruments: vec![Instrument::new(
                "EURUSD",
                Decimal::new(1, 4),
                Decimal::new(-7, 1),
                Decimal::new(2, 1),
            )],
            timeframes: vec![Timeframe::m15()],
            indicators: IndicatorSettings::default(),
            sweep: SweepConfig::default(),
            selection: SelectionConfig::default(),
            simulation: SimulationConfig::default(),
        }
    }
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            tp_min: Decimal::from(50),
            tp_max: Decimal::from(500),
            tp_step: Decimal::from(5),
            risk_multiplier: Decimal::new(15, 1),
        }
    }
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            min_coverage: Decimal::new(6, 1),
            hit_target: Decimal::new(6, 1),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            charge_open_spread: true,
            signal_events: SignalEventPolicy::CollapseRuns,
            parallel: true,
        }
    }
}

impl ProcessorConfig {
    /// Load and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.instruments.is_empty() {
            return Err(ConfigError::NoInstruments);
        }
        for (i, instrument) in self.instruments.iter().enumerate() {
            instrument.validate()?;
            if self.instruments[..i].iter().any(|o| o.symbol == instrument.symbol) {
                return Err(ConfigError::DuplicateInstrument(instrument.symbol.clone()));
            }
        }
        if self.timeframes.is_empty() {
            return Err(ConfigError::NoTimeframes);
        }
        for timeframe in &self.timeframes {
            timeframe.validate()?;
        }
        self.indicators.validate()?;
        self.sweep.validate()?;
        self.selection.validate()?;
        Ok(())
    }

    pub fn instrument(&self, symbol: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.symbol == symbol)
    }

    /// BLAKE3 hash of the canonical JSON form.
    ///
    /// Two configs with identical values share a fingerprint; it is recorded in
    /// every run manifest.
    pub fn fingerprint(&self) -> ConfigFingerprint {
        // Plain data with string-keyed maps only; serialization cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        blake3::hash(json.as_bytes()).to_hex().to_string()
    }
}

impl SweepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tp_step <= Decimal::ZERO {
            return Err(ConfigError::Sweep(format!(
                "tp_step must be positive, got {}",
                self.tp_step
            )));
        }
        if self.tp_min <= Decimal::ZERO {
            return Err(ConfigError::Sweep(format!(
                "tp_min must be positive, got {}",
                self.tp_min
            )));
        }
        if self.tp_max < self.tp_min {
            return Err(ConfigError::Sweep(format!(
                "tp_max {} is below tp_min {}",
                self.tp_max, self.tp_min
            )));
        }
        if self.risk_multiplier <= Decimal::ZERO {
            return Err(ConfigError::Sweep(format!(
                "risk_multiplier must be positive, got {}",
                self.risk_multiplier
            )));
        }
        Ok(())
    }
}

impl SelectionConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("min_coverage", self.min_coverage),
            ("hit_target", self.hit_target),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return Err(ConfigError::Fraction { name, value });
            }
        }
        Ok(())
    }
}
