//! End-to-end workflows stitching the engines together.
//!
//! `run_rao` optimizes every state of a crac with one provider and folds
//! the per-state results into a [`RaoResult`]. `max_secure_exchange` drives
//! the dichotomy with a full RAO run per probe; the optimizer is in control
//! flow only through its verdict.

use tracing::{info, warn};

use rao_core::{CoreResult, Crac};

use crate::dichotomy::{
    find_max_secure_value, DichotomyConfig, DichotomyResult, SecurityVerdict,
};
use crate::registry::RaoProvider;
use crate::results::{RaoResult, RaoStatus, StateOptimization};
use crate::traits::NetworkHandle;

/// Optimize every state of the crac, preventive first, then each distinct
/// post-contingency state. A state whose optimization errors out is folded
/// in as a failed state instead of aborting the run.
pub fn run_rao(provider: &dyn RaoProvider, network: &dyn NetworkHandle, crac: &Crac) -> RaoResult {
    let mut states = Vec::new();
    for state in crac.states() {
        let result = match provider.optimize(network, crac, state) {
            Ok(r) => r,
            Err(e) => {
                warn!(state = %state, error = %e, "state optimization errored");
                StateOptimization::failed(state)
            }
        };
        states.push(result);
    }
    let result = RaoResult::from_states(states);
    info!(
        status = ?result.status,
        min_margin = ?result.min_margin(),
        "rao run complete"
    );
    result
}

/// Translate an aggregated RAO result into a dichotomy verdict.
pub fn security_verdict(result: &RaoResult) -> SecurityVerdict {
    match result.status {
        RaoStatus::Failure => SecurityVerdict::Failure,
        _ if result.is_secure() => SecurityVerdict::Secure,
        _ => SecurityVerdict::Unsecure,
    }
}

/// Maximum exchange level for which the network, after remedial-action
/// optimization, is secure.
///
/// `shift` materializes the network at a probed exchange level; a shift
/// error is reported to the dichotomy as a probe failure, which it retries
/// at a perturbed level before concluding.
pub fn max_secure_exchange(
    provider: &dyn RaoProvider,
    crac: &Crac,
    low: f64,
    high: f64,
    config: &DichotomyConfig,
    mut shift: impl FnMut(f64) -> CoreResult<Box<dyn NetworkHandle>>,
) -> CoreResult<DichotomyResult> {
    let result = find_max_secure_value(low, high, config, |value| match shift(value) {
        Ok(network) => security_verdict(&run_rao(provider, network.as_ref(), crac)),
        Err(e) => {
            warn!(value, error = %e, "network shift failed");
            SecurityVerdict::Failure
        }
    })?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{CnecMargin, Setpoint};
    use rao_core::{
        Cnec, CnecId, Instant, NetworkAction, RaoError, Side, State, Threshold, Unit,
    };
    use std::any::Any;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Clone, Default)]
    struct NullNetwork;

    impl NetworkHandle for NullNetwork {
        fn apply(&mut self, _: &NetworkAction) -> CoreResult<()> {
            Ok(())
        }
        fn revert(&mut self, _: &NetworkAction) -> CoreResult<()> {
            Ok(())
        }
        fn scratch_copy(&self) -> Box<dyn NetworkHandle> {
            Box::new(self.clone())
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    /// Provider answering from a fixed per-state margin table.
    struct TableProvider {
        margins: HashMap<State, f64>,
        error_states: Vec<State>,
        calls: Mutex<Vec<State>>,
    }

    impl TableProvider {
        fn new(margins: HashMap<State, f64>) -> Self {
            Self {
                margins,
                error_states: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl RaoProvider for TableProvider {
        fn id(&self) -> &'static str {
            "table"
        }

        fn optimize(
            &self,
            _network: &dyn NetworkHandle,
            _crac: &Crac,
            state: State,
        ) -> CoreResult<StateOptimization> {
            self.calls.lock().unwrap().push(state);
            if self.error_states.contains(&state) {
                return Err(RaoError::SensitivityFailure {
                    state: state.to_string(),
                    reason: "forced".into(),
                });
            }
            let margin = self.margins.get(&state).copied().unwrap_or(100.0);
            Ok(StateOptimization {
                state,
                status: RaoStatus::Success,
                activated_network_actions: Vec::new(),
                setpoints: Vec::<Setpoint>::new(),
                margins: vec![CnecMargin {
                    cnec: CnecId::new(0),
                    side: Side::Left,
                    margin,
                }],
                objective: Some(-margin),
                min_margin: Some(margin),
                objective_per_depth: vec![-margin],
                leaves_evaluated: 1,
                time_budget_exceeded: false,
            })
        }
    }

    fn two_state_crac() -> Crac {
        let mut crac = Crac::new("wf");
        let co = crac.add_contingency("line loss", vec!["l1".into()]);
        let curative = State::after(co, Instant::Curative);
        for (id, state) in [(0, State::preventive()), (1, curative)] {
            crac.add_cnec(Cnec {
                id: CnecId::new(id),
                name: format!("cnec {id}"),
                element: "line".into(),
                state,
                thresholds: vec![Threshold::max_only(Unit::Megawatt, 100.0, Side::Left)],
                nominal_voltage_kv: 400.0,
                optimized: true,
                monitored: false,
            })
            .unwrap();
        }
        crac
    }

    #[test]
    fn test_run_rao_covers_every_state() {
        let crac = two_state_crac();
        let provider = TableProvider::new(HashMap::new());
        let result = run_rao(&provider, &NullNetwork, &crac);
        assert_eq!(result.states.len(), 2);
        assert_eq!(result.status, RaoStatus::Success);
        // Preventive is optimized first.
        assert_eq!(provider.calls.lock().unwrap()[0], State::preventive());
    }

    #[test]
    fn test_state_error_becomes_failed_state() {
        let crac = two_state_crac();
        let mut provider = TableProvider::new(HashMap::new());
        provider.error_states.push(State::preventive());
        let result = run_rao(&provider, &NullNetwork, &crac);
        assert_eq!(result.status, RaoStatus::Failure);
        assert_eq!(result.states.len(), 2);
    }

    #[test]
    fn test_security_verdict_mapping() {
        let crac = two_state_crac();
        let secure = run_rao(
            &TableProvider::new(HashMap::new()),
            &NullNetwork,
            &crac,
        );
        assert_eq!(security_verdict(&secure), SecurityVerdict::Secure);

        let mut margins = HashMap::new();
        margins.insert(State::preventive(), -20.0);
        let unsecure = run_rao(&TableProvider::new(margins), &NullNetwork, &crac);
        assert_eq!(security_verdict(&unsecure), SecurityVerdict::Unsecure);

        let mut failing = TableProvider::new(HashMap::new());
        failing.error_states.push(State::preventive());
        let failed = run_rao(&failing, &NullNetwork, &crac);
        assert_eq!(security_verdict(&failed), SecurityVerdict::Failure);
    }

    /// Provider whose post-optimization margin shrinks linearly with the
    /// probed exchange; secure up to 600 MW.
    struct ExchangeProvider {
        level: Mutex<f64>,
    }

    impl RaoProvider for ExchangeProvider {
        fn id(&self) -> &'static str {
            "exchange"
        }

        fn optimize(
            &self,
            _network: &dyn NetworkHandle,
            _crac: &Crac,
            state: State,
        ) -> CoreResult<StateOptimization> {
            let margin = 600.0 - *self.level.lock().unwrap();
            Ok(StateOptimization {
                min_margin: Some(margin),
                objective: Some(-margin),
                ..StateOptimization::empty(state)
            })
        }
    }

    #[test]
    fn test_max_secure_exchange_finds_limit() {
        let crac = two_state_crac();
        let provider = ExchangeProvider {
            level: Mutex::new(0.0),
        };
        let config = DichotomyConfig {
            epsilon: 1.0,
            ..Default::default()
        };
        let result = max_secure_exchange(&provider, &crac, 0.0, 1000.0, &config, |value| {
            *provider.level.lock().unwrap() = value;
            Ok(Box::new(NullNetwork) as Box<dyn NetworkHandle>)
        })
        .unwrap();
        assert!(result.converged);
        assert!(result.best_secure <= 600.0);
        assert!(600.0 - result.best_secure <= 1.0);
    }

    #[test]
    fn test_shift_error_surfaces_as_capacity_not_found_at_low() {
        let crac = two_state_crac();
        let provider = TableProvider::new(HashMap::new());
        let config = DichotomyConfig::default();
        let err = max_secure_exchange(&provider, &crac, 0.0, 1000.0, &config, |_| {
            Err(RaoError::Validation("no shift data".into()))
        })
        .unwrap_err();
        assert!(matches!(err, RaoError::CapacityNotFound { .. }));
    }
}
