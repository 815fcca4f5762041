//! Narrow interfaces to the excluded collaborators.
//!
//! The engines never touch a concrete network model or sensitivity solver;
//! they reach them through these object-safe traits. Implementations are
//! supplied by the caller (production adapters or test doubles).

use std::collections::HashMap;

use rao_core::{ActionId, Cnec, CnecId, CoreResult, NetworkAction, RangeAction, Side, State};

/// Working copy of the network on which network actions are applied.
///
/// Sibling leaves evaluate on independent scratch copies (`scratch_copy`), so
/// the base handle is only ever read during a search. Implementations decide
/// whether a copy is a deep clone or a stack of reversible deltas.
pub trait NetworkHandle: Send + Sync {
    /// Apply a discrete network action to this working copy.
    fn apply(&mut self, action: &NetworkAction) -> CoreResult<()>;

    /// Revert a previously applied network action.
    fn revert(&mut self, action: &NetworkAction) -> CoreResult<()>;

    /// Independent working copy for a child-leaf evaluation.
    fn scratch_copy(&self) -> Box<dyn NetworkHandle>;

    /// Escape hatch for engine implementations that need their concrete
    /// network type back.
    fn as_any(&self) -> &dyn std::any::Any;
}

/// Parameter set handed to the external sensitivity engine. A second,
/// typically more robust set can be configured as fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensitivityParams {
    /// Label reported in logs and diagnostics.
    pub label: String,
    /// Distribute the slack over generators instead of a single reference.
    pub distributed_slack: bool,
}

impl Default for SensitivityParams {
    fn default() -> Self {
        Self {
            label: "default".into(),
            distributed_slack: true,
        }
    }
}

/// Raw output of one sensitivity-engine run: reference flows at the
/// linearization point and one coefficient per (cnec, side, range action).
#[derive(Debug, Clone, Default)]
pub struct RawSensitivity {
    /// Reference flow in MW (kV for voltage elements) per monitored side.
    pub reference_flows: HashMap<(CnecId, Side), f64>,
    /// Sensitivity of each monitored side to each range action's setpoint,
    /// in monitored-unit per setpoint-unit.
    pub coefficients: HashMap<(CnecId, Side, ActionId), f64>,
}

/// External sensitivity-analysis engine, consumed only through the
/// [`SensitivityAdapter`](crate::sensitivity::SensitivityAdapter).
pub trait SensitivityEngine: Send + Sync {
    fn run(
        &self,
        network: &dyn NetworkHandle,
        state: &State,
        cnecs: &[&Cnec],
        range_actions: &[&RangeAction],
        params: &SensitivityParams,
    ) -> CoreResult<RawSensitivity>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits_are_object_safe() {
        // This test passes if it compiles - traits must be object-safe
        fn _accepts_network(_n: &dyn NetworkHandle) {}
        fn _accepts_engine(_e: &dyn SensitivityEngine) {}
    }

    #[test]
    fn test_trait_objects_are_send_sync() {
        fn _assert_send<T: Send + ?Sized>() {}
        fn _assert_sync<T: Sync + ?Sized>() {}

        _assert_send::<Box<dyn NetworkHandle>>();
        _assert_sync::<Box<dyn NetworkHandle>>();
        _assert_send::<Box<dyn SensitivityEngine>>();
        _assert_sync::<Box<dyn SensitivityEngine>>();
    }

    #[test]
    fn test_default_params() {
        let params = SensitivityParams::default();
        assert_eq!(params.label, "default");
        assert!(params.distributed_slack);
    }
}
