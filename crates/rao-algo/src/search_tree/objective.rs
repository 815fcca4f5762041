//! Objective function of the search: worst-case margin over optimized cnecs.
//!
//! Both engines minimize a *cost* defined as the negated minimum margin
//! (`cost = -min_margin`); a snapshot is secure iff the cost is non-positive.

use std::collections::HashMap;

use rao_core::{ActionId, Cnec, Kilovolts, Megawatts, NetworkAction, Side, Unit};

/// Margin convention of the objective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MarginConvention {
    /// Margin in physical units.
    #[default]
    Absolute,
    /// Margin divided by the threshold magnitude; dimensionless, weights
    /// heavily and lightly loaded elements equally.
    RelativeToThreshold,
}

/// Objective configuration of a search-tree run.
#[derive(Debug, Clone, Default)]
pub struct ObjectiveConfig {
    /// Unit margins are reported and compared in (flow cnecs only; voltage
    /// cnecs always use kV).
    pub unit: Unit,
    pub convention: MarginConvention,
    /// Minimum objective improvement a child must bring over its parent to
    /// be retained. Guards against thrashing between near-equivalent
    /// topologies.
    pub improvement_threshold: f64,
    /// Per-action cost overrides; actions absent from the map use their own
    /// declared cost.
    pub cost_weights: HashMap<ActionId, f64>,
}

impl ObjectiveConfig {
    pub fn action_cost(&self, action: &NetworkAction) -> f64 {
        self.cost_weights.get(&action.id).copied().unwrap_or(action.cost)
    }
}

/// Margin of one monitored side of a cnec for a given flow (MW working
/// units), in the configured unit and convention.
pub fn cnec_margin(cnec: &Cnec, side: Side, flow_mw: f64, config: &ObjectiveConfig) -> f64 {
    let mut worst = f64::INFINITY;
    for t in cnec.thresholds_mw(side) {
        let mut margin = t.margin(flow_mw);
        match config.convention {
            MarginConvention::Absolute => {
                if t.unit == Unit::Megawatt && config.unit == Unit::Ampere {
                    margin = Megawatts(margin)
                        .to_amperes(Kilovolts(cnec.nominal_voltage_kv))
                        .value();
                }
            }
            MarginConvention::RelativeToThreshold => {
                let scale = t
                    .max
                    .map(f64::abs)
                    .unwrap_or(0.0)
                    .max(t.min.map(f64::abs).unwrap_or(0.0))
                    .max(1.0);
                margin /= scale;
            }
        }
        worst = worst.min(margin);
    }
    worst
}

#[cfg(test)]
mod tests {
    use super::*;
    use rao_core::{CnecId, State, Threshold};

    fn cnec(max_mw: f64) -> Cnec {
        Cnec {
            id: CnecId::new(0),
            name: "cnec".into(),
            element: "ne".into(),
            state: State::preventive(),
            thresholds: vec![Threshold::max_only(Unit::Megawatt, max_mw, Side::Left)],
            nominal_voltage_kv: 400.0,
            optimized: true,
            monitored: true,
        }
    }

    #[test]
    fn test_absolute_margin_in_mw() {
        let config = ObjectiveConfig::default();
        assert_eq!(cnec_margin(&cnec(100.0), Side::Left, 80.0, &config), 20.0);
        assert_eq!(cnec_margin(&cnec(100.0), Side::Left, 130.0, &config), -30.0);
    }

    #[test]
    fn test_absolute_margin_converted_to_amperes() {
        let config = ObjectiveConfig {
            unit: Unit::Ampere,
            ..Default::default()
        };
        let margin = cnec_margin(&cnec(100.0), Side::Left, 80.0, &config);
        // 20 MW at 400 kV ≈ 28.87 A
        assert!((margin - 28.87).abs() < 0.01);
    }

    #[test]
    fn test_relative_margin_scaled_by_threshold() {
        let config = ObjectiveConfig {
            convention: MarginConvention::RelativeToThreshold,
            ..Default::default()
        };
        let margin = cnec_margin(&cnec(200.0), Side::Left, 150.0, &config);
        assert!((margin - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_cost_weight_override() {
        let action = NetworkAction {
            id: ActionId::new(3),
            name: "na".into(),
            elementary_actions: vec![],
            cost: 7.0,
            usage_rules: vec![],
        };
        let mut config = ObjectiveConfig::default();
        assert_eq!(config.action_cost(&action), 7.0);
        config.cost_weights.insert(ActionId::new(3), 1.5);
        assert_eq!(config.action_cost(&action), 1.5);
    }
}
