//! Tick-replay backtest of signal events against the risk grid.
//!
//! Every event replays the shared tick sequence from its open timestamp. One
//! running profit is tracked per event, and a single cursor walks the grid:
//! the entry under the cursor is the only one that can resolve next, because
//! a wider take-profit cannot be hit before a narrower one and a wider
//! stop-loss cannot be breached before a tighter one. Replay ends once the
//! cursor has passed the last grid entry.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use slotlab_core::domain::{Instrument, Signal, Tick, TimeScope};
use slotlab_core::engine::SignalEvent;
use slotlab_core::indicators::DIVISION_SCALE;

use crate::grid::{RiskConfig, RiskGrid};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Open,
    TakeProfit,
    StopLoss,
}

/// One (event, risk configuration) outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreTrade {
    pub risk: RiskConfig,
    pub scope: TimeScope,
    pub signal: Signal,
    pub opened_at: NaiveDateTime,
    /// Profit in pips at resolution, or at end of stream while still open.
    pub profit: Decimal,
    pub status: OrderStatus,
    pub resolved_at: Option<NaiveDateTime>,
}

impl PreTrade {
    fn open(risk: RiskConfig, event: &SignalEvent) -> Self {
        Self {
            risk,
            scope: event.scope,
            signal: event.signal,
            opened_at: event.opened_at,
            profit: Decimal::ZERO,
            status: OrderStatus::Open,
            resolved_at: None,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == OrderStatus::Open
    }

    fn resolve(&mut self, status: OrderStatus, profit: Decimal, at: NaiveDateTime) {
        debug_assert!(self.is_open(), "terminal outcome resolved twice");
        self.status = status;
        self.profit = profit;
        self.resolved_at = Some(at);
    }
}

/// Result of replaying one event over the whole grid. `outcomes[i]` belongs to
/// grid entry `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReplay {
    pub event: SignalEvent,
    pub outcomes: Vec<PreTrade>,
    /// Number of grid entries resolved; entries from here on are still open.
    pub cursor: usize,
    pub ticks_replayed: usize,
}

/// Wins, losses and open outcomes of one risk configuration within one scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeGroup {
    pub risk: RiskConfig,
    pub wins: usize,
    pub losses: usize,
    pub open: usize,
    /// Sum of profit over resolved outcomes.
    pub total_profit: Decimal,
}

impl OutcomeGroup {
    fn new(risk: RiskConfig) -> Self {
        Self {
            risk,
            wins: 0,
            losses: 0,
            open: 0,
            total_profit: Decimal::ZERO,
        }
    }

    fn record(&mut self, outcome: &PreTrade) {
        match outcome.status {
            OrderStatus::TakeProfit => self.wins += 1,
            OrderStatus::StopLoss => self.losses += 1,
            OrderStatus::Open => {
                self.open += 1;
                return;
            }
        }
        self.total_profit += outcome.profit;
    }

    /// Resolved outcomes: wins + losses.
    pub fn samples(&self) -> usize {
        self.wins + self.losses
    }

    /// wins / (wins + losses); zero when nothing resolved.
    pub fn hit_percentage(&self) -> Decimal {
        let samples = self.samples();
        if samples == 0 {
            return Decimal::ZERO;
        }
        (Decimal::from(self.wins) / Decimal::from(samples)).round_dp(DIVISION_SCALE)
    }
}

/// Outcome groups of one time scope, indexed like the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeStatistics {
    pub scope: TimeScope,
    /// Signal events that fell in this scope.
    pub events: usize,
    pub groups: Vec<OutcomeGroup>,
}

/// Outcome groups for every time scope that saw at least one event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotStatistics {
    scopes: BTreeMap<TimeScope, ScopeStatistics>,
}

impl SlotStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, replay: &EventReplay) {
        let scope = replay.event.scope;
        let stats = self.scopes.entry(scope).or_insert_with(|| ScopeStatistics {
            scope,
            events: 0,
            groups: replay
                .outcomes
                .iter()
                .map(|o| OutcomeGroup::new(o.risk))
                .collect(),
        });
        stats.events += 1;
        for (group, outcome) in stats.groups.iter_mut().zip(&replay.outcomes) {
            group.record(outcome);
        }
    }

    pub fn get(&self, scope: &TimeScope) -> Option<&ScopeStatistics> {
        self.scopes.get(scope)
    }

    /// Scopes in Monday-first order.
    pub fn scopes(&self) -> impl Iterator<Item = &ScopeStatistics> {
        self.scopes.values()
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Outcomes still open at end of stream, across all scopes and configurations.
    pub fn open_outcomes(&self) -> usize {
        self.scopes
            .values()
            .flat_map(|s| s.groups.iter())
            .map(|g| g.open)
            .sum()
    }
}

/// Replays signal events for one instrument against one grid.
#[derive(Debug, Clone)]
pub struct Simulator {
    grid: RiskGrid,
    instrument: Instrument,
    charge_open_spread: bool,
    parallel: bool,
}

impl Simulator {
    pub fn new(grid: RiskGrid, instrument: Instrument) -> Self {
        Self {
            grid,
            instrument,
            charge_open_spread: true,
            parallel: true,
        }
    }

    /// Enables or disables charging the spread on the opening tick.
    pub fn with_open_spread(mut self, charge: bool) -> Self {
        self.charge_open_spread = charge;
        self
    }

    /// Enables or disables parallel replay of events.
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn grid(&self) -> &RiskGrid {
        &self.grid
    }

    /// Replay one event. `ticks` must be sorted by timestamp.
    pub fn replay(&self, ticks: &[Tick], event: &SignalEvent) -> EventReplay {
        let mut outcomes: Vec<PreTrade> =
            self.grid.iter().map(|&risk| PreTrade::open(risk, event)).collect();
        let n = outcomes.len();

        let start = ticks.partition_point(|t| t.timestamp < event.opened_at);
        let mut previous: Option<Tick> = None;
        let mut profit = Decimal::ZERO;
        let mut cursor = 0;
        let mut replayed = 0;

        for tick in &ticks[start..] {
            if cursor == n {
                break;
            }
            replayed += 1;
            if tick.timestamp == event.opened_at {
                if self.charge_open_spread {
                    profit = self.instrument.to_pips(tick.spread());
                }
            } else if let Some(last) = previous {
                profit += event.order_type.profit(&last, tick, &self.instrument);
            }
            previous = Some(*tick);
            cursor = settle(&mut outcomes, cursor, profit, tick.timestamp);
        }

        for outcome in &mut outcomes[cursor..] {
            outcome.profit = profit;
        }

        EventReplay {
            event: event.clone(),
            outcomes,
            cursor,
            ticks_replayed: replayed,
        }
    }

    /// Replay every event and group the outcomes by time scope.
    pub fn run(&self, ticks: &[Tick], events: &[SignalEvent]) -> SlotStatistics {
        let replays: Vec<EventReplay> = if self.parallel {
            events.par_iter().map(|e| self.replay(ticks, e)).collect()
        } else {
            events.iter().map(|e| self.replay(ticks, e)).collect()
        };

        let mut stats = SlotStatistics::new();
        for replay in &replays {
            stats.record(replay);
        }
        debug!(
            symbol = %self.instrument.symbol,
            events = events.len(),
            scopes = stats.len(),
            open = stats.open_outcomes(),
            "replay finished"
        );
        stats
    }
}

/// Resolve every entry from `cursor` on that `profit` already decides.
fn settle(outcomes: &mut [PreTrade], mut cursor: usize, profit: Decimal, at: NaiveDateTime) -> usize {
    while let Some(outcome) = outcomes.get_mut(cursor) {
        let status = if profit >= outcome.risk.take_profit {
            OrderStatus::TakeProfit
        } else if profit <= outcome.risk.stop_loss {
            OrderStatus::StopLoss
        } else {
            break;
        };
        outcome.resolve(status, profit, at);
        cursor += 1;
    }
    cursor
}
