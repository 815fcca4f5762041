//! Breadth-first search-tree optimizer over remedial-action combinations.
//!
//! At each depth the optimizer takes the best leaf found so far, generates
//! one child per not-yet-activated available network action, fixes each
//! child's range-action setpoints with the linear sub-solver, and evaluates
//! margins through the sensitivity adapter. Children of a depth are
//! evaluated in parallel and compared only after all of them complete, so
//! the chosen leaf is deterministic regardless of worker scheduling.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use rayon::prelude::*;
use tracing::{debug, info, warn};

use rao_core::{
    ActionId, AvailabilityContext, Cnec, CoreResult, Crac, RangeAction, RaoError, State,
};

use crate::linear::{build_problem, solve_linear, LinearStatus};
use crate::results::{CnecMargin, RaoStatus, Setpoint, StateOptimization};
use crate::sensitivity::SensitivityAdapter;

use super::leaf::{LeafArena, LeafEvaluation, LeafId, LeafStatus};
use super::objective::{cnec_margin, ObjectiveConfig};
use crate::traits::NetworkHandle;

/// Search limits of a tree-search run.
#[derive(Debug, Clone)]
pub struct SearchTreeConfig {
    /// Maximum number of activated network actions (tree depth).
    pub max_depth: usize,
    /// Cap on sibling leaves evaluated at one depth.
    pub max_children_per_depth: usize,
    /// Global time budget; checked cooperatively at depth boundaries.
    pub time_budget: Option<Duration>,
    /// Worker pool size for sibling evaluation; 0 uses the global rayon
    /// pool.
    pub worker_threads: usize,
}

impl Default for SearchTreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 5,
            max_children_per_depth: 32,
            time_budget: None,
            worker_threads: 0,
        }
    }
}

/// Write-back payload of one leaf evaluation.
struct LeafOutcome {
    status: LeafStatus,
    evaluation: Option<LeafEvaluation>,
    setpoints: HashMap<ActionId, f64>,
}

impl LeafOutcome {
    fn failed(linearization: &HashMap<ActionId, f64>) -> Self {
        Self {
            status: LeafStatus::Failed,
            evaluation: None,
            setpoints: linearization.clone(),
        }
    }
}

/// The search-tree remedial-action optimizer.
pub struct SearchTreeRao {
    adapter: SensitivityAdapter,
    search: SearchTreeConfig,
    objective: ObjectiveConfig,
}

impl SearchTreeRao {
    pub fn new(
        adapter: SensitivityAdapter,
        search: SearchTreeConfig,
        objective: ObjectiveConfig,
    ) -> Self {
        Self {
            adapter,
            search,
            objective,
        }
    }

    pub fn objective_config(&self) -> &ObjectiveConfig {
        &self.objective
    }

    /// Optimize the remedial actions of one state.
    ///
    /// Always returns a result object; sensitivity failure at the root and
    /// an infeasible root sub-problem are reported through the result's
    /// status, not as errors. `Err` is reserved for invalid inputs and
    /// configuration problems.
    pub fn optimize(
        &self,
        network: &dyn NetworkHandle,
        crac: &Crac,
        state: State,
    ) -> CoreResult<StateOptimization> {
        let start = Instant::now();

        let cnecs = crac.cnecs_for(&state);
        if cnecs.is_empty() {
            debug!(state = %state, "no monitored element, nothing to optimize");
            return Ok(StateOptimization::empty(state));
        }
        let ctx = AvailabilityContext::for_state(&state);
        let network_actions = crac.available_network_actions(&ctx);
        let range_actions = crac.available_range_actions(&ctx);

        let pool = match self.search.worker_threads {
            0 => None,
            n => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| RaoError::Config(format!("worker pool: {e}")))?,
            ),
        };

        let mut arena = LeafArena::with_root();
        let root_id = arena.root_id();

        let root_outcome = self.evaluate_leaf(
            network,
            crac,
            &state,
            &cnecs,
            &range_actions,
            &[],
            &HashMap::new(),
        );
        let root_failed = root_outcome.status == LeafStatus::Failed;
        self.write_back(&mut arena, root_id, root_outcome);

        if root_failed {
            warn!(state = %state, "root leaf evaluation failed, aborting state");
            return Ok(StateOptimization::failed(state));
        }
        if let Some(eval) = &arena.get(root_id).evaluation {
            if eval.lp_status == LinearStatus::Infeasible {
                // Hard constraints are unsatisfiable even before any
                // topology change; nothing the expansion finds can be
                // trusted through this linearization.
                warn!(state = %state, "root sub-problem infeasible");
                let history = vec![arena.get(root_id).objective()];
                return Ok(self.assemble(state, &arena, root_id, &range_actions, history, false));
            }
        }

        let mut best = root_id;
        let mut history = vec![arena.get(root_id).objective()];
        let mut truncated = false;

        for depth in 1..=self.search.max_depth {
            if let Some(budget) = self.search.time_budget {
                if start.elapsed() >= budget {
                    info!(state = %state, depth, "time budget exhausted, truncating expansion");
                    truncated = true;
                    break;
                }
            }

            let best_leaf = arena.get(best);
            let candidates: Vec<_> = network_actions
                .iter()
                .filter(|a| !best_leaf.activated.contains(&a.id))
                .take(self.search.max_children_per_depth)
                .collect();
            if candidates.is_empty() {
                debug!(state = %state, depth, "all network actions exhausted");
                break;
            }

            let parent_setpoints = best_leaf.setpoints.clone();
            let parent_objective = best_leaf.objective();

            let jobs: Vec<(LeafId, Vec<ActionId>)> = candidates
                .iter()
                .map(|a| {
                    let id = arena.add_child(best, a.id, self.objective.action_cost(a));
                    (id, arena.get(id).activated.clone())
                })
                .collect();

            let evaluate = |(id, activated): &(LeafId, Vec<ActionId>)| {
                (
                    *id,
                    self.evaluate_leaf(
                        network,
                        crac,
                        &state,
                        &cnecs,
                        &range_actions,
                        activated,
                        &parent_setpoints,
                    ),
                )
            };
            // Collecting is the synchronization barrier: children are only
            // compared once every sibling has completed.
            let outcomes: Vec<(LeafId, LeafOutcome)> = match &pool {
                Some(p) => p.install(|| jobs.par_iter().map(evaluate).collect()),
                None => jobs.par_iter().map(evaluate).collect(),
            };
            for (id, outcome) in outcomes {
                self.write_back(&mut arena, id, outcome);
            }

            let mut chosen: Option<LeafId> = None;
            for (id, _) in &jobs {
                let leaf = arena.get(*id);
                if !leaf.is_evaluated() {
                    continue;
                }
                if leaf.objective() >= parent_objective - self.objective.improvement_threshold {
                    continue;
                }
                chosen = Some(match chosen {
                    None => *id,
                    Some(current) => self.better_leaf(&arena, current, *id),
                });
            }

            match chosen {
                None => {
                    info!(state = %state, depth, "no child improves on the current best leaf");
                    break;
                }
                Some(id) => {
                    let objective = arena.get(id).objective();
                    info!(
                        state = %state,
                        depth,
                        objective,
                        activated = arena.get(id).activated.len(),
                        "improving leaf retained"
                    );
                    history.push(objective);
                    best = id;
                }
            }
        }

        Ok(self.assemble(state, &arena, best, &range_actions, history, truncated))
    }

    /// Deterministic comparison of two evaluated leaves: objective, then
    /// fewer activated actions, then lower aggregate cost, then lower id.
    fn better_leaf(&self, arena: &LeafArena, a: LeafId, b: LeafId) -> LeafId {
        let la = arena.get(a);
        let lb = arena.get(b);
        let key_a = (la.objective(), la.activated.len(), la.cost, la.id.value());
        let key_b = (lb.objective(), lb.activated.len(), lb.cost, lb.id.value());
        if key_b
            .partial_cmp(&key_a)
            .map(|o| o == std::cmp::Ordering::Less)
            .unwrap_or(false)
        {
            b
        } else {
            a
        }
    }

    fn write_back(&self, arena: &mut LeafArena, id: LeafId, outcome: LeafOutcome) {
        let leaf = arena.get_mut(id);
        leaf.status = outcome.status;
        leaf.evaluation = outcome.evaluation;
        leaf.setpoints = outcome.setpoints;
    }

    /// Evaluate one leaf: apply its topology to a scratch network, run the
    /// sensitivity adapter, fix range-action setpoints with the LP, and
    /// compute margins at the chosen setpoints.
    #[allow(clippy::too_many_arguments)]
    fn evaluate_leaf(
        &self,
        base: &dyn NetworkHandle,
        crac: &Crac,
        state: &State,
        cnecs: &[&Cnec],
        range_actions: &[&RangeAction],
        activated: &[ActionId],
        linearization: &HashMap<ActionId, f64>,
    ) -> LeafOutcome {
        let mut scratch = base.scratch_copy();
        for id in activated {
            let Some(action) = crac.network_action(*id) else {
                warn!(action = id.value(), "activated action missing from crac");
                return LeafOutcome::failed(linearization);
            };
            if let Err(e) = scratch.apply(action) {
                warn!(action = %action.name, error = %e, "network action application failed");
                return LeafOutcome::failed(linearization);
            }
        }

        let sensitivity =
            self.adapter
                .evaluate(scratch.as_ref(), state, activated, cnecs, range_actions);
        if sensitivity.is_failure() {
            return LeafOutcome::failed(linearization);
        }

        let problem = match build_problem(cnecs, range_actions, linearization, &sensitivity) {
            Ok(p) => p,
            Err(e) => {
                warn!(state = %state, error = %e, "sub-problem construction failed");
                return LeafOutcome::failed(linearization);
            }
        };
        let mut solution = solve_linear(&problem);
        if solution.status == LinearStatus::Optimal {
            if let Err(e) = solution.round_to_taps(range_actions) {
                warn!(state = %state, error = %e, "tap rounding failed");
                return LeafOutcome::failed(linearization);
            }
        }
        let (lp_status, setpoints) = match solution.status {
            LinearStatus::Optimal => (LinearStatus::Optimal, solution.setpoints),
            // Infeasible sub-problem: revert to the linearization point
            // (parent's setpoints; initial setpoints at the root).
            LinearStatus::Infeasible => (
                LinearStatus::Infeasible,
                problem
                    .actions
                    .iter()
                    .map(|a| (a.action, a.current))
                    .collect(),
            ),
            LinearStatus::Error => return LeafOutcome::failed(linearization),
        };

        let mut margins = Vec::new();
        let mut min_margin = f64::INFINITY;
        for (constraint, flow) in problem.flows_at(&setpoints) {
            let Some(cnec) = cnecs.iter().find(|c| c.id == constraint.cnec) else {
                continue;
            };
            let margin = cnec_margin(cnec, constraint.side, flow, &self.objective);
            margins.push(CnecMargin {
                cnec: constraint.cnec,
                side: constraint.side,
                margin,
            });
            if constraint.optimized {
                min_margin = min_margin.min(margin);
            }
        }
        let objective = if min_margin.is_finite() {
            -min_margin
        } else {
            0.0
        };

        LeafOutcome {
            status: LeafStatus::Evaluated,
            evaluation: Some(LeafEvaluation {
                objective,
                min_margin,
                margins,
                lp_status,
                sensitivity_status: sensitivity.status,
            }),
            setpoints,
        }
    }

    fn assemble(
        &self,
        state: State,
        arena: &LeafArena,
        best: LeafId,
        range_actions: &[&RangeAction],
        history: Vec<f64>,
        truncated: bool,
    ) -> StateOptimization {
        let leaf = arena.get(best);
        let Some(eval) = &leaf.evaluation else {
            return StateOptimization::failed(state);
        };
        let status = if eval.lp_status == LinearStatus::Infeasible {
            RaoStatus::Infeasible
        } else {
            RaoStatus::Success
        };
        let setpoints = range_actions
            .iter()
            .map(|ra| Setpoint {
                action: ra.id,
                setpoint: leaf
                    .setpoints
                    .get(&ra.id)
                    .copied()
                    .unwrap_or(ra.initial_setpoint),
            })
            .collect();
        StateOptimization {
            state,
            status,
            activated_network_actions: leaf.activated.clone(),
            setpoints,
            margins: eval.margins.clone(),
            objective: Some(eval.objective),
            min_margin: eval.min_margin.is_finite().then_some(eval.min_margin),
            objective_per_depth: history,
            leaves_evaluated: arena.len(),
            time_budget_exceeded: truncated,
        }
    }
}
