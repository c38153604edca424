//! Risk configurations and the sorted take-profit / stop-loss grid.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::SweepConfig;

/// A (take-profit, stop-loss) pair in pips. Take-profit is positive,
/// stop-loss is zero or negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RiskConfig {
    pub take_profit: Decimal,
    pub stop_loss: Decimal,
}

impl RiskConfig {
    pub fn new(take_profit: Decimal, stop_loss: Decimal) -> Self {
        Self {
            take_profit,
            stop_loss,
        }
    }
}

impl fmt::Display for RiskConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TP {} / SL {}", self.take_profit, self.stop_loss)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum GridError {
    #[error("risk grid is empty")]
    Empty,
    #[error("grid index {index}: take-profit {take_profit} must be positive")]
    NonPositiveTakeProfit { index: usize, take_profit: Decimal },
    #[error("grid index {index}: stop-loss {stop_loss} must not be positive")]
    PositiveStopLoss { index: usize, stop_loss: Decimal },
    #[error("grid index {index}: take-profit does not increase")]
    TakeProfitNotIncreasing { index: usize },
    #[error("grid index {index}: stop-loss tightens as take-profit widens")]
    StopLossNotWidening { index: usize },
    #[error("invalid sweep bounds: {0}")]
    InvalidSweep(String),
}

/// Grid sorted by take-profit, strictly increasing, with stop-losses that never
/// tighten. A trade resolves grid entries strictly in index order, which is what
/// lets the replay walk it with a single cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskGrid {
    configs: Vec<RiskConfig>,
}

impl RiskGrid {
    pub fn new(configs: Vec<RiskConfig>) -> Result<Self, GridError> {
        if configs.is_empty() {
            return Err(GridError::Empty);
        }
        for (index, config) in configs.iter().enumerate() {
            if config.take_profit <= Decimal::ZERO {
                return Err(GridError::NonPositiveTakeProfit {
                    index,
                    take_profit: config.take_profit,
                });
            }
            if config.stop_loss > Decimal::ZERO {
                return Err(GridError::PositiveStopLoss {
                    index,
                    stop_loss: config.stop_loss,
                });
            }
        }
        for (offset, pair) in configs.windows(2).enumerate() {
            let index = offset + 1;
            if pair[1].take_profit <= pair[0].take_profit {
                return Err(GridError::TakeProfitNotIncreasing { index });
            }
            if pair[1].stop_loss > pair[0].stop_loss {
                return Err(GridError::StopLossNotWidening { index });
            }
        }
        Ok(Self { configs })
    }

    /// TP from `tp_min` to `tp_max` in `tp_step` steps; SL = −trunc(TP × multiplier).
    pub fn from_sweep(sweep: &SweepConfig) -> Result<Self, GridError> {
        sweep
            .validate()
            .map_err(|e| GridError::InvalidSweep(e.to_string()))?;

        let mut configs = Vec::new();
        let mut take_profit = sweep.tp_min;
        while take_profit <= sweep.tp_max {
            let stop_loss = -(take_profit * sweep.risk_multiplier).trunc();
            configs.push(RiskConfig::new(take_profit, stop_loss));
            take_profit += sweep.tp_step;
        }
        Self::new(configs)
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&RiskConfig> {
        self.configs.get(index)
    }

    pub fn configs(&self) -> &[RiskConfig] {
        &self.configs
    }

    pub fn iter(&self) -> impl Iterator<Item = &RiskConfig> {
        self.configs.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn default_sweep_spans_50_to_500() {
        let grid = RiskGrid::from_sweep(&SweepConfig::default()).unwrap();
        assert_eq!(grid.len(), 91);
        assert_eq!(grid.get(0), Some(&RiskConfig::new(dec!(50), dec!(-75))));
        assert_eq!(grid.get(90), Some(&RiskConfig::new(dec!(500), dec!(-750))));
    }

    #[test]
    fn stop_loss_truncates_to_whole_pips() {
        let sweep = SweepConfig {
            tp_min: dec!(55),
            tp_max: dec!(55),
            tp_step: dec!(5),
            risk_multiplier: dec!(1.5),
        };
        let grid = RiskGrid::from_sweep(&sweep).unwrap();
        // 55 × 1.5 = 82.5
        assert_eq!(grid.get(0).unwrap().stop_loss, dec!(-82));
    }

    #[test]
    fn rejects_non_increasing_take_profit() {
        let err = RiskGrid::new(vec![
            RiskConfig::new(dec!(10), dec!(-10)),
            RiskConfig::new(dec!(10), dec!(-20)),
        ])
        .unwrap_err();
        assert_eq!(err, GridError::TakeProfitNotIncreasing { index: 1 });
    }

    #[test]
    fn rejects_tightening_stop_loss() {
        let err = RiskGrid::new(vec![
            RiskConfig::new(dec!(10), dec!(-20)),
            RiskConfig::new(dec!(20), dec!(-10)),
        ])
        .unwrap_err();
        assert_eq!(err, GridError::StopLossNotWidening { index: 1 });
    }

    #[test]
    fn rejects_empty_and_bad_signs() {
        assert_eq!(RiskGrid::new(vec![]).unwrap_err(), GridError::Empty);
        assert!(matches!(
            RiskGrid::new(vec![RiskConfig::new(dec!(0), dec!(-1))]),
            Err(GridError::NonPositiveTakeProfit { .. })
        ));
        assert!(matches!(
            RiskGrid::new(vec![RiskConfig::new(dec!(5), dec!(1))]),
            Err(GridError::PositiveStopLoss { .. })
        ));
    }
}
