//! In-memory result artifacts handed to external exporters.
//!
//! The core never writes files; `RaoResult` and the dichotomy's probe
//! history are plain serializable structures consumed by the out-of-scope
//! CNE/JSON exporters.

use serde::{Deserialize, Serialize};

use rao_core::{ActionId, CnecId, Side, State};

/// Global or per-state outcome of an optimization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaoStatus {
    /// Optimization completed; margins may still be negative.
    Success,
    /// The hard (monitored) constraints admit no feasible setpoints; the
    /// reported setpoints are the fallback linearization point.
    Infeasible,
    /// Sensitivity evaluation failed at the root of a state.
    Failure,
}

/// Margin of one monitored (cnec, side) pair after optimization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CnecMargin {
    pub cnec: CnecId,
    pub side: Side,
    /// Margin in the objective unit; negative means a residual violation.
    pub margin: f64,
}

/// Chosen setpoint of one range action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Setpoint {
    pub action: ActionId,
    pub setpoint: f64,
}

/// Outcome of the search-tree optimizer for one state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateOptimization {
    pub state: State,
    pub status: RaoStatus,
    /// Network actions retained by the best leaf, sorted by id.
    pub activated_network_actions: Vec<ActionId>,
    pub setpoints: Vec<Setpoint>,
    pub margins: Vec<CnecMargin>,
    /// Negated minimum margin of the best leaf (the minimized cost). `None`
    /// when the state evaluation failed or nothing was optimized; the
    /// sentinel stays representable in JSON where a non-finite float is not.
    pub objective: Option<f64>,
    /// Minimum margin over the state's optimized cnecs. `None` when no
    /// optimized cnec was evaluated.
    pub min_margin: Option<f64>,
    /// Best objective after each expanded depth, root first.
    pub objective_per_depth: Vec<f64>,
    pub leaves_evaluated: usize,
    /// Expansion was truncated by the time budget; the result is degraded
    /// but valid.
    pub time_budget_exceeded: bool,
}

impl StateOptimization {
    /// A state with nothing to monitor: trivially optimal.
    pub fn empty(state: State) -> Self {
        Self {
            state,
            status: RaoStatus::Success,
            activated_network_actions: Vec::new(),
            setpoints: Vec::new(),
            margins: Vec::new(),
            objective: None,
            min_margin: None,
            objective_per_depth: Vec::new(),
            leaves_evaluated: 0,
            time_budget_exceeded: false,
        }
    }

    /// A state whose root evaluation failed.
    pub fn failed(state: State) -> Self {
        Self {
            state,
            status: RaoStatus::Failure,
            activated_network_actions: Vec::new(),
            setpoints: Vec::new(),
            margins: Vec::new(),
            objective: None,
            min_margin: None,
            objective_per_depth: Vec::new(),
            leaves_evaluated: 0,
            time_budget_exceeded: false,
        }
    }
}

/// Terminal artifact of a full run over every state of the CRAC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaoResult {
    pub status: RaoStatus,
    pub states: Vec<StateOptimization>,
}

impl RaoResult {
    /// Aggregate per-state outcomes; Failure dominates Infeasible dominates
    /// Success.
    pub fn from_states(states: Vec<StateOptimization>) -> Self {
        let mut status = RaoStatus::Success;
        for s in &states {
            match s.status {
                RaoStatus::Failure => {
                    status = RaoStatus::Failure;
                    break;
                }
                RaoStatus::Infeasible => status = RaoStatus::Infeasible,
                RaoStatus::Success => {}
            }
        }
        Self { status, states }
    }

    /// Worst margin across all states.
    pub fn min_margin(&self) -> Option<f64> {
        self.states
            .iter()
            .filter_map(|s| s.min_margin)
            .reduce(f64::min)
    }

    /// Secure iff the run completed and no optimized margin is negative. A
    /// run that optimized nothing is trivially secure.
    pub fn is_secure(&self) -> bool {
        self.status == RaoStatus::Success && self.min_margin().map_or(true, |m| m >= 0.0)
    }
}
