//! SlotLab Runner: risk-grid replay, slot selection, unit orchestration, export.
//!
//! This crate builds on `slotlab-core` to provide:
//! - TOML processor configuration with validation and fingerprinting
//! - The take-profit / stop-loss risk grid
//! - Tick replay of signal events with per-slot outcome statistics
//! - Slot selection of the configuration to trade
//! - Directory runs over every (instrument, timeframe) unit
//! - CSV/JSON report artifacts

pub mod config;
pub mod export;
pub mod grid;
pub mod runner;
pub mod selector;
pub mod simulator;

pub use config::{
    ConfigError, ConfigFingerprint, ProcessorConfig, SelectionConfig, SimulationConfig,
    SweepConfig,
};
pub use export::{load_manifest, save_artifacts, RunManifest};
pub use grid::{GridError, RiskConfig, RiskGrid};
pub use runner::{
    build_bars, process_unit, RunError, Runner, UnitReport, UnitResult, UnitStatus, UnitSummary,
    SCHEMA_VERSION,
};
pub use selector::{SlotSelector, Trade};
pub use simulator::{
    EventReplay, OrderStatus, OutcomeGroup, PreTrade, ScopeStatistics, Simulator, SlotStatistics,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<ProcessorConfig>();
        assert_sync::<ProcessorConfig>();
    }

    #[test]
    fn grid_and_simulator_are_send_sync() {
        assert_send::<RiskGrid>();
        assert_sync::<RiskGrid>();
        assert_send::<Simulator>();
        assert_sync::<Simulator>();
    }

    #[test]
    fn results_are_send_sync() {
        assert_send::<UnitResult>();
        assert_sync::<UnitResult>();
        assert_send::<UnitReport>();
        assert_sync::<UnitReport>();
        assert_send::<SlotStatistics>();
        assert_sync::<SlotStatistics>();
    }

    #[test]
    fn runner_is_send_sync() {
        assert_send::<Runner>();
        assert_sync::<Runner>();
    }
}
