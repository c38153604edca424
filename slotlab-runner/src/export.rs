//! Report export: CSV and JSON artifacts for one processing unit.
//!
//! Artifacts per unit, under `<output>/<SYMBOL>_<TIMEFRAME>/`:
//! - `bars.csv`: OHLC, every indicator field, per-indicator and composite signal
//! - `slots.csv`: outcome counts per (time scope, risk configuration)
//! - `trades.csv` / `trades.json`: the selected trade per time scope
//! - `memory.json`: lookback window and last tick at end of stream
//! - `manifest.json`: run metadata with schema versioning
//!
//! Manifests with an unknown schema version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use slotlab_core::data::TickStats;
use slotlab_core::domain::Candlestick;
use slotlab_core::engine::AggregatorSnapshot;
use slotlab_core::indicators::IndicatorKind;

use crate::config::ConfigFingerprint;
use crate::runner::{UnitResult, SCHEMA_VERSION};
use crate::selector::Trade;
use crate::simulator::SlotStatistics;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Metadata written next to every unit's reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub timeframe: String,
    pub config_fingerprint: ConfigFingerprint,
    pub tick_count: usize,
    pub tick_stats: TickStats,
    pub bar_count: usize,
    pub event_count: usize,
    pub scope_count: usize,
    pub trade_count: usize,
    /// Outcomes still open at end of stream; excluded from hit percentages.
    pub open_outcomes: usize,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl RunManifest {
    pub fn from_result(result: &UnitResult, fingerprint: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            symbol: result.symbol.clone(),
            timeframe: result.timeframe.name.clone(),
            config_fingerprint: fingerprint.to_string(),
            tick_count: result.tick_count,
            tick_stats: result.tick_stats,
            bar_count: result.bars.len(),
            event_count: result.events.len(),
            scope_count: result.statistics.len(),
            trade_count: result.trades.len(),
            open_outcomes: result.statistics.open_outcomes(),
        }
    }
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Bar report. Indicator columns are `<KIND>.<field>`; fields not yet
/// calculated (warm-up) are left empty.
pub fn export_bars_csv(bars: &[Candlestick]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<String> = [
        "timestamp",
        "calculated_tick_time",
        "open",
        "high",
        "low",
        "close",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    for kind in IndicatorKind::ALL {
        for field in kind.field_names() {
            header.push(format!("{kind}.{field}"));
        }
        header.push(format!("{kind}.signal"));
    }
    header.push("signal".to_string());
    wtr.write_record(&header)?;

    for bar in bars {
        let mut row = vec![
            bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            bar.calculated_tick_time.format(TIMESTAMP_FORMAT).to_string(),
            bar.open.to_string(),
            bar.high.to_string(),
            bar.low.to_string(),
            bar.close.to_string(),
        ];
        for kind in IndicatorKind::ALL {
            for field in kind.field_names() {
                row.push(bar.field(kind, field).map(|v| v.to_string()).unwrap_or_default());
            }
            row.push(bar.indicator_signal(kind).to_string());
        }
        row.push(bar.signal.to_string());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per (time scope, risk configuration).
pub fn export_slots_csv(stats: &SlotStatistics) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "weekday",
        "hour_bucket",
        "events",
        "take_profit",
        "stop_loss",
        "wins",
        "losses",
        "open",
        "total",
        "hit_percentage",
        "total_profit",
    ])?;

    for scope in stats.scopes() {
        for g in &scope.groups {
            wtr.write_record([
                &scope.scope.weekday.to_string(),
                &scope.scope.hour_bucket.to_string(),
                &scope.events.to_string(),
                &g.risk.take_profit.to_string(),
                &g.risk.stop_loss.to_string(),
                &g.wins.to_string(),
                &g.losses.to_string(),
                &g.open.to_string(),
                &g.samples().to_string(),
                &g.hit_percentage().to_string(),
                &g.total_profit.to_string(),
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "weekday",
        "hour_bucket",
        "slot_start",
        "slot_end",
        "take_profit",
        "stop_loss",
        "take_profit_count",
        "stop_loss_count",
        "total_count",
        "event_count",
        "hit_percentage",
        "total_profit",
    ])?;

    for t in trades {
        wtr.write_record([
            &t.scope.weekday.to_string(),
            &t.scope.hour_bucket.to_string(),
            &t.slot_start.to_string(),
            &t.slot_end.to_string(),
            &t.risk.take_profit.to_string(),
            &t.risk.stop_loss.to_string(),
            &t.take_profit_count.to_string(),
            &t.stop_loss_count.to_string(),
            &t.total_count.to_string(),
            &t.event_count.to_string(),
            &t.hit_percentage.to_string(),
            &t.total_profit.to_string(),
        ])?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── JSON export ────────────────────────────────────────────────────

pub fn export_trades_json(trades: &[Trade]) -> Result<String> {
    serde_json::to_string_pretty(trades).context("failed to serialize trades to JSON")
}

pub fn export_memory_json(snapshot: &AggregatorSnapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).context("failed to serialize lookback snapshot")
}

pub fn export_manifest_json(manifest: &RunManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize run manifest")
}

/// Parse a manifest, rejecting unknown schema versions.
pub fn import_manifest_json(json: &str) -> Result<RunManifest> {
    let manifest: RunManifest =
        serde_json::from_str(json).context("failed to deserialize run manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Directory name of a unit's artifacts.
pub fn unit_dir_name(symbol: &str, timeframe: &str) -> String {
    format!("{symbol}_{timeframe}")
}

/// Write the full artifact set of one unit. Returns the unit directory.
pub fn save_artifacts(result: &UnitResult, fingerprint: &str, output_dir: &Path) -> Result<PathBuf> {
    let unit_dir = output_dir.join(unit_dir_name(&result.symbol, &result.timeframe.name));
    std::fs::create_dir_all(&unit_dir)
        .with_context(|| format!("failed to create artifact dir: {}", unit_dir.display()))?;

    let files = [
        ("bars.csv", export_bars_csv(&result.bars)?),
        ("slots.csv", export_slots_csv(&result.statistics)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("trades.json", export_trades_json(&result.trades)?),
        ("memory.json", export_memory_json(&result.snapshot)?),
        (
            "manifest.json",
            export_manifest_json(&RunManifest::from_result(result, fingerprint))?,
        ),
    ];
    for (name, content) in files {
        let path = unit_dir.join(name);
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    Ok(unit_dir)
}

/// Load the manifest of a unit directory.
pub fn load_manifest(dir: &Path) -> Result<RunManifest> {
    let path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    import_manifest_json(&json)
}
