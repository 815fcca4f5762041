//! Sensitivity Adapter: wraps the external sensitivity engine.
//!
//! Adds two behaviors on top of the raw engine:
//!
//! 1. **Fallback retry:** a failed run is retried once with a configured
//!    fallback parameter set before the state is declared failed.
//! 2. **Caching:** results are cached per (state, activated-action-set)
//!    signature within a run, so sibling leaves sharing an identical
//!    activation history up to the current depth hit the engine only once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use rao_core::{ActionId, Cnec, CnecId, RangeAction, Side, State};

use crate::traits::{NetworkHandle, RawSensitivity, SensitivityEngine, SensitivityParams};

/// Per-state computation status of a sensitivity result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensitivityStatus {
    /// Primary parameter set succeeded.
    Success,
    /// Primary run failed; the fallback parameter set succeeded.
    Fallback,
    /// Both attempts failed. Every leaf evaluated under this state is
    /// invalid.
    Failure,
}

/// Sensitivity coefficients and reference flows for one state, plus the
/// computation status.
#[derive(Debug, Clone)]
pub struct SensitivityResult {
    raw: RawSensitivity,
    pub status: SensitivityStatus,
}

impl SensitivityResult {
    pub fn new(raw: RawSensitivity, status: SensitivityStatus) -> Self {
        Self { raw, status }
    }

    pub fn failed() -> Self {
        Self {
            raw: RawSensitivity::default(),
            status: SensitivityStatus::Failure,
        }
    }

    pub fn is_failure(&self) -> bool {
        self.status == SensitivityStatus::Failure
    }

    /// Reference flow at the linearization point, MW (kV for voltage
    /// elements).
    pub fn reference_flow(&self, cnec: CnecId, side: Side) -> Option<f64> {
        self.raw.reference_flows.get(&(cnec, side)).copied()
    }

    /// Sensitivity of a monitored side to a range action's setpoint. Missing
    /// entries mean the action does not influence the element.
    pub fn coefficient(&self, cnec: CnecId, side: Side, action: ActionId) -> f64 {
        self.raw
            .coefficients
            .get(&(cnec, side, action))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Adapter configuration: primary parameters and an optional fallback set.
#[derive(Debug, Clone, Default)]
pub struct SensitivityConfig {
    pub primary: SensitivityParams,
    pub fallback: Option<SensitivityParams>,
}

type CacheKey = (State, Vec<ActionId>);

/// Wraps a [`SensitivityEngine`] with fallback retry and per-run caching.
///
/// The cache is shared across the rayon workers of a search; it lives for the
/// lifetime of the adapter, i.e. one tree-search run.
pub struct SensitivityAdapter {
    engine: Arc<dyn SensitivityEngine>,
    config: SensitivityConfig,
    cache: Mutex<HashMap<CacheKey, Arc<SensitivityResult>>>,
}

impl SensitivityAdapter {
    pub fn new(engine: Arc<dyn SensitivityEngine>, config: SensitivityConfig) -> Self {
        Self {
            engine,
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Evaluate sensitivities for a state with the given network actions
    /// already applied to `network`.
    ///
    /// Never errors: a double failure is encoded as a result with
    /// [`SensitivityStatus::Failure`], which the caller must treat as
    /// invalidating the leaf.
    pub fn evaluate(
        &self,
        network: &dyn NetworkHandle,
        state: &State,
        activated: &[ActionId],
        cnecs: &[&Cnec],
        range_actions: &[&RangeAction],
    ) -> Arc<SensitivityResult> {
        let mut signature: Vec<ActionId> = activated.to_vec();
        signature.sort_unstable();
        let key = (*state, signature);

        if let Some(hit) = self.cache.lock().expect("sensitivity cache poisoned").get(&key) {
            debug!(state = %state, "sensitivity cache hit");
            return Arc::clone(hit);
        }

        let result = Arc::new(self.compute(network, state, cnecs, range_actions));
        self.cache
            .lock()
            .expect("sensitivity cache poisoned")
            .insert(key, Arc::clone(&result));
        result
    }

    fn compute(
        &self,
        network: &dyn NetworkHandle,
        state: &State,
        cnecs: &[&Cnec],
        range_actions: &[&RangeAction],
    ) -> SensitivityResult {
        match self
            .engine
            .run(network, state, cnecs, range_actions, &self.config.primary)
        {
            Ok(raw) => SensitivityResult {
                raw,
                status: SensitivityStatus::Success,
            },
            Err(primary_err) => {
                let Some(fallback) = &self.config.fallback else {
                    warn!(state = %state, error = %primary_err, "sensitivity run failed, no fallback configured");
                    return SensitivityResult::failed();
                };
                warn!(
                    state = %state,
                    error = %primary_err,
                    fallback = %fallback.label,
                    "sensitivity run failed, retrying with fallback parameters"
                );
                match self.engine.run(network, state, cnecs, range_actions, fallback) {
                    Ok(raw) => SensitivityResult {
                        raw,
                        status: SensitivityStatus::Fallback,
                    },
                    Err(fallback_err) => {
                        warn!(state = %state, error = %fallback_err, "fallback sensitivity run failed");
                        SensitivityResult::failed()
                    }
                }
            }
        }
    }

    /// Number of distinct (state, action-set) signatures computed so far.
    pub fn cache_len(&self) -> usize {
        self.cache.lock().expect("sensitivity cache poisoned").len()
    }
}
