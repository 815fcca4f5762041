//! Linear sub-solver: continuous range-action setpoints for a fixed topology.
//!
//! Builds and solves the LP
//!
//! ```text
//! maximize   m                                    (minimum margin)
//! subject to ref_c + Σ_i s_ci · (sp_i - cur_i) + m ≤ max_c   (optimized cnecs)
//!            ref_c + Σ_i s_ci · (sp_i - cur_i) - m ≥ min_c
//!            ref_c + Σ_i s_ci · (sp_i - cur_i)     ≤ max_c   (monitored cnecs)
//!            ref_c + Σ_i s_ci · (sp_i - cur_i)     ≥ min_c
//!            lower_i ≤ sp_i ≤ upper_i              (intersected ranges)
//! ```
//!
//! The reported objective is the negated optimal `m`, so that both layers of
//! the stack minimize a cost (`cost = -min_margin`, secure iff `cost ≤ 0`).
//!
//! All thresholds and reference values are converted to MW (kV for voltage
//! elements) *before* the problem is built; no unit conversion happens here.

use std::collections::HashMap;

use good_lp::{
    constraint, default_solver, variable, variables, Expression, ResolutionError, Solution,
    SolverModel,
};
use tracing::debug;

use rao_core::{ActionId, Cnec, CnecId, CoreResult, RangeAction, RaoError, Side};

use crate::sensitivity::SensitivityResult;

/// One continuous decision variable of the sub-problem.
#[derive(Debug, Clone)]
pub struct RangeActionVar {
    pub action: ActionId,
    /// Linearization-point setpoint (parent leaf's choice, or the initial
    /// setpoint at the root).
    pub current: f64,
    pub lower: f64,
    pub upper: f64,
}

/// One (cnec, side) flow constraint, fully resolved to working units.
#[derive(Debug, Clone)]
pub struct FlowConstraint {
    pub cnec: CnecId,
    pub side: Side,
    pub reference_flow: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub optimized: bool,
    pub monitored: bool,
    /// Sensitivity per range action, aligned with the problem's action list.
    pub sensitivities: Vec<f64>,
}

/// The assembled sub-problem.
#[derive(Debug, Clone, Default)]
pub struct LinearProblem {
    pub actions: Vec<RangeActionVar>,
    pub constraints: Vec<FlowConstraint>,
}

impl LinearProblem {
    /// Linearized flow of every constraint at the given setpoints. Actions
    /// missing from the map stay at their linearization point.
    pub fn flows_at(&self, setpoints: &HashMap<ActionId, f64>) -> Vec<(&FlowConstraint, f64)> {
        self.constraints
            .iter()
            .map(|c| {
                let mut flow = c.reference_flow;
                for (action, &s) in self.actions.iter().zip(c.sensitivities.iter()) {
                    let sp = setpoints.get(&action.action).copied().unwrap_or(action.current);
                    flow += s * (sp - action.current);
                }
                (c, flow)
            })
            .collect()
    }
}

/// LP outcome, mirroring the backend statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinearStatus {
    Optimal,
    /// No setpoint assignment satisfies the monitored-cnec constraints. The
    /// caller falls back to the linearization-point setpoints.
    Infeasible,
    /// Numerical breakdown in the backend.
    Error,
}

/// Solved setpoints and the achieved objective.
#[derive(Debug, Clone)]
pub struct LinearSolution {
    pub status: LinearStatus,
    pub setpoints: HashMap<ActionId, f64>,
    /// Minimum margin achieved over optimized cnecs (MW).
    pub min_margin: f64,
    /// Negated minimum margin; the cost both engines minimize.
    pub objective: f64,
}

impl LinearSolution {
    fn failed(status: LinearStatus) -> Self {
        Self {
            status,
            setpoints: HashMap::new(),
            min_margin: f64::NEG_INFINITY,
            objective: f64::INFINITY,
        }
    }

    /// Snap PST setpoints to their nearest feasible tap. Continuous actions
    /// are left untouched.
    pub fn round_to_taps(&mut self, actions: &[&RangeAction]) -> CoreResult<()> {
        for action in actions {
            if !action.is_pst() {
                continue;
            }
            if let Some(sp) = self.setpoints.get_mut(&action.id) {
                *sp = action.nearest_feasible(*sp)?;
            }
        }
        Ok(())
    }
}

/// Assemble the sub-problem from a leaf's evaluation context.
///
/// `current_setpoints` holds the linearization-point setpoint per range
/// action; actions missing from the map sit at their initial setpoint.
pub fn build_problem(
    cnecs: &[&Cnec],
    range_actions: &[&RangeAction],
    current_setpoints: &HashMap<ActionId, f64>,
    sensitivity: &SensitivityResult,
) -> CoreResult<LinearProblem> {
    let mut actions = Vec::with_capacity(range_actions.len());
    for action in range_actions {
        let (lower, upper) = action.effective_bounds()?;
        let current = current_setpoints
            .get(&action.id)
            .copied()
            .unwrap_or(action.initial_setpoint)
            .clamp(lower, upper);
        actions.push(RangeActionVar {
            action: action.id,
            current,
            lower,
            upper,
        });
    }

    let mut constraints = Vec::new();
    for cnec in cnecs {
        for side in cnec.sides() {
            let Some(reference_flow) = sensitivity.reference_flow(cnec.id, side) else {
                return Err(RaoError::Validation(format!(
                    "no reference flow for cnec '{}' side {:?}",
                    cnec.name, side
                )));
            };
            // Collapse the side's thresholds to the tightest bounds, already
            // in working units.
            let mut min: Option<f64> = None;
            let mut max: Option<f64> = None;
            for t in cnec.thresholds_mw(side) {
                if let Some(lo) = t.min {
                    min = Some(min.map_or(lo, |m: f64| m.max(lo)));
                }
                if let Some(hi) = t.max {
                    max = Some(max.map_or(hi, |m: f64| m.min(hi)));
                }
            }
            let sensitivities = actions
                .iter()
                .map(|a| sensitivity.coefficient(cnec.id, side, a.action))
                .collect();
            constraints.push(FlowConstraint {
                cnec: cnec.id,
                side,
                reference_flow,
                min,
                max,
                optimized: cnec.optimized,
                monitored: cnec.monitored,
                sensitivities,
            });
        }
    }

    Ok(LinearProblem {
        actions,
        constraints,
    })
}

/// Bound of the margin variable, derived from the problem data. The margin
/// only needs to span the largest margin any constraint can realize; with a
/// one-sided threshold it is what keeps the LP bounded, and keeping it near
/// the data's magnitude keeps the conic backend well scaled.
fn margin_cap(problem: &LinearProblem) -> f64 {
    let mut cap = 1.0_f64;
    for c in &problem.constraints {
        let reach: f64 = problem
            .actions
            .iter()
            .zip(c.sensitivities.iter())
            .map(|(a, &s)| s.abs() * (a.upper - a.lower))
            .sum();
        let mut magnitude = c.reference_flow.abs() + reach;
        if let Some(min) = c.min {
            magnitude += min.abs();
        }
        if let Some(max) = c.max {
            magnitude += max.abs();
        }
        cap = cap.max(magnitude);
    }
    2.0 * cap
}

/// Solve the sub-problem. Failures are encoded in the returned status, never
/// panicked or silently dropped.
pub fn solve_linear(problem: &LinearProblem) -> LinearSolution {
    let mut vars = variables!();

    let mut setpoint_vars = Vec::with_capacity(problem.actions.len());
    for action in &problem.actions {
        if action.lower > action.upper {
            return LinearSolution::failed(LinearStatus::Error);
        }
        let v = vars.add(variable().min(action.lower).max(action.upper));
        setpoint_vars.push(v);
    }
    let cap = margin_cap(problem);
    let margin = vars.add(variable().min(-cap).max(cap));

    let mut model = vars.maximise(margin).using(default_solver);

    for c in &problem.constraints {
        // Flow at the candidate setpoints, linearized around the reference.
        let mut flow = Expression::from(c.reference_flow);
        for ((action, var), &s) in problem
            .actions
            .iter()
            .zip(setpoint_vars.iter())
            .zip(c.sensitivities.iter())
        {
            if s != 0.0 {
                flow += s * (*var - action.current);
            }
        }

        if c.optimized {
            if let Some(max) = c.max {
                model = model.with(constraint!(flow.clone() + margin <= max));
            }
            if let Some(min) = c.min {
                model = model.with(constraint!(flow.clone() - margin >= min));
            }
        }
        if c.monitored {
            if let Some(max) = c.max {
                model = model.with(constraint!(flow.clone() <= max));
            }
            if let Some(min) = c.min {
                model = model.with(constraint!(flow.clone() >= min));
            }
        }
    }

    let solution = match model.solve() {
        Ok(s) => s,
        Err(ResolutionError::Infeasible) => {
            debug!("linear sub-problem infeasible");
            return LinearSolution::failed(LinearStatus::Infeasible);
        }
        Err(e) => {
            debug!(error = ?e, "linear sub-problem solver error");
            return LinearSolution::failed(LinearStatus::Error);
        }
    };

    let mut setpoints = HashMap::with_capacity(problem.actions.len());
    for (action, var) in problem.actions.iter().zip(setpoint_vars.iter()) {
        // Clamp away backend round-off at the bounds.
        let sp = solution.value(*var).clamp(action.lower, action.upper);
        setpoints.insert(action.action, sp);
    }
    let min_margin = solution.value(margin);

    LinearSolution {
        status: LinearStatus::Optimal,
        setpoints,
        min_margin,
        objective: -min_margin,
    }
}
