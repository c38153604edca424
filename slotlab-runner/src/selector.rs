//! Per-slot selection of the risk configuration to trade.

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use slotlab_core::domain::{TimeScope, Timeframe};

use crate::config::SelectionConfig;
use crate::grid::RiskConfig;
use crate::simulator::{OutcomeGroup, ScopeStatistics, SlotStatistics};

/// Final recommendation for one time scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub risk: RiskConfig,
    pub scope: TimeScope,
    pub slot_start: NaiveTime,
    pub slot_end: NaiveTime,
    pub take_profit_count: usize,
    pub stop_loss_count: usize,
    /// Resolved outcomes (take-profit + stop-loss).
    pub total_count: usize,
    /// Signal events in the scope.
    pub event_count: usize,
    pub hit_percentage: Decimal,
    pub total_profit: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SlotSelector {
    min_coverage: Decimal,
    hit_target: Decimal,
}

impl SlotSelector {
    pub fn new(min_coverage: Decimal, hit_target: Decimal) -> Self {
        Self {
            min_coverage,
            hit_target,
        }
    }

    /// True when `group` has enough resolved samples and a high enough hit rate.
    pub fn qualifies(&self, group: &OutcomeGroup, events: usize) -> bool {
        let required = self.min_coverage * Decimal::from(events);
        Decimal::from(group.samples()) >= required && group.hit_percentage() >= self.hit_target
    }

    /// Smallest-TP qualifying configuration of one scope, if any.
    pub fn select_scope(&self, stats: &ScopeStatistics, timeframe: &Timeframe) -> Option<Trade> {
        // Groups are in grid order, so the first match has the smallest TP.
        let group = stats
            .groups
            .iter()
            .find(|g| self.qualifies(g, stats.events))?;
        Some(Trade {
            risk: group.risk,
            scope: stats.scope,
            slot_start: stats.scope.slot_start(timeframe),
            slot_end: stats.scope.slot_end(timeframe),
            take_profit_count: group.wins,
            stop_loss_count: group.losses,
            total_count: group.samples(),
            event_count: stats.events,
            hit_percentage: group.hit_percentage(),
            total_profit: group.total_profit,
        })
    }

    /// One Trade per scope that has a qualifying configuration, Monday first.
    pub fn select(&self, stats: &SlotStatistics, timeframe: &Timeframe) -> Vec<Trade> {
        stats
            .scopes()
            .filter_map(|s| self.select_scope(s, timeframe))
            .collect()
    }
}

impl From<&SelectionConfig> for SlotSelector {
    fn from(config: &SelectionConfig) -> Self {
        Self::new(config.min_coverage, config.hit_target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use rust_decimal_macros::dec;

    fn group(tp: i64, wins: usize, losses: usize, open: usize) -> OutcomeGroup {
        OutcomeGroup {
            risk: RiskConfig::new(Decimal::from(tp), Decimal::from(-tp)),
            wins,
            losses,
            open,
            total_profit: Decimal::from(tp) * Decimal::from(wins)
                - Decimal::from(tp) * Decimal::from(losses),
        }
    }

    fn scope_stats(groups: Vec<OutcomeGroup>, events: usize) -> ScopeStatistics {
        ScopeStatistics {
            scope: TimeScope::new(Weekday::Mon, 2),
            events,
            groups,
        }
    }

    #[test]
    fn picks_smallest_qualifying_take_profit() {
        // Ten configurations; the first three fall short, the remaining seven qualify.
        let mut groups = vec![
            group(10, 3, 7, 0),
            group(20, 5, 5, 0),
            group(30, 4, 1, 5),
        ];
        for tp in 4..=10 {
            groups.push(group(tp * 10, 7, 3, 0));
        }
        let stats = scope_stats(groups, 10);

        let trade = SlotSelector::from(&SelectionConfig::default())
            .select_scope(&stats, &Timeframe::m15())
            .unwrap();
        assert_eq!(trade.risk.take_profit, dec!(40));
        assert_eq!(trade.take_profit_count, 7);
        assert_eq!(trade.stop_loss_count, 3);
        assert_eq!(trade.total_count, 10);
        assert_eq!(trade.event_count, 10);
        assert_eq!(trade.hit_percentage, dec!(0.7));
        assert_eq!(trade.total_profit, dec!(160));
        assert_eq!(trade.slot_start, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        assert_eq!(trade.slot_end, NaiveTime::from_hms_opt(11, 59, 59).unwrap());
    }

    #[test]
    fn coverage_counts_only_resolved_outcomes() {
        let selector = SlotSelector::new(dec!(0.6), dec!(0.6));
        // 5 of 10 resolved: below 60% coverage despite a perfect hit rate.
        assert!(!selector.qualifies(&group(10, 5, 0, 5), 10));
        assert!(selector.qualifies(&group(10, 6, 0, 4), 10));
    }

    #[test]
    fn hit_target_is_inclusive() {
        let selector = SlotSelector::new(dec!(0), dec!(0.6));
        assert!(selector.qualifies(&group(10, 3, 2, 0), 5));
        assert!(!selector.qualifies(&group(10, 2, 2, 0), 4));
    }

    #[test]
    fn no_qualifying_configuration_yields_no_trade() {
        let stats = scope_stats(vec![group(10, 1, 9, 0), group(20, 0, 0, 10)], 10);
        let selector = SlotSelector::new(dec!(0.6), dec!(0.6));
        assert!(selector.select_scope(&stats, &Timeframe::m15()).is_none());
    }

    #[test]
    fn zero_coverage_and_target_accepts_unresolved_group() {
        let stats = scope_stats(vec![group(10, 0, 0, 3)], 3);
        let trade = SlotSelector::new(dec!(0), dec!(0))
            .select_scope(&stats, &Timeframe::m15())
            .unwrap();
        assert_eq!(trade.hit_percentage, dec!(0));
        assert_eq!(trade.total_count, 0);
    }
}
