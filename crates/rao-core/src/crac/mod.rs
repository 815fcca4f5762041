//! CRAC read model: Contingency list, Remedial Actions, and additional
//! Constraints.
//!
//! The [`Crac`] owns the contingencies, the optimization states, the
//! monitored elements (CNECs) and the remedial actions of a study. It is
//! populated once (by the out-of-scope importers) and read-only for the
//! duration of an optimization run.

pub mod action;
pub mod cnec;
pub mod state;
pub mod usage;

pub use action::{ActionId, NetworkAction, Range, RangeAction, RangeType, TapTable};
pub use cnec::{Cnec, CnecId, Side, Threshold};
pub use state::{Contingency, ContingencyId, Instant, State};
pub use usage::{any_rule_grants, AvailabilityContext, UsageRule};

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, RaoError};

/// The read model handed to the optimization engines.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Crac {
    pub name: String,
    contingencies: Vec<Contingency>,
    cnecs: Vec<Cnec>,
    network_actions: Vec<NetworkAction>,
    range_actions: Vec<RangeAction>,
}

impl Crac {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Register a contingency; the returned id is its index.
    pub fn add_contingency(
        &mut self,
        name: impl Into<String>,
        elements: Vec<String>,
    ) -> ContingencyId {
        let id = ContingencyId::new(self.contingencies.len());
        self.contingencies.push(Contingency::new(id, name, elements));
        id
    }

    /// Register a CNEC. The caller-supplied id inside `cnec` is overwritten
    /// with the next free index.
    pub fn add_cnec(&mut self, mut cnec: Cnec) -> CoreResult<CnecId> {
        if cnec.thresholds.is_empty() {
            return Err(RaoError::Validation(format!(
                "cnec '{}' has no threshold",
                cnec.name
            )));
        }
        let id = CnecId::new(self.cnecs.len());
        cnec.id = id;
        self.cnecs.push(cnec);
        Ok(id)
    }

    pub fn add_network_action(&mut self, mut action: NetworkAction) -> ActionId {
        let id = ActionId::new(self.network_actions.len() + self.range_actions.len());
        action.id = id;
        self.network_actions.push(action);
        id
    }

    pub fn add_range_action(&mut self, mut action: RangeAction) -> ActionId {
        let id = ActionId::new(self.network_actions.len() + self.range_actions.len());
        action.id = id;
        self.range_actions.push(action);
        id
    }

    pub fn contingencies(&self) -> &[Contingency] {
        &self.contingencies
    }

    pub fn contingency(&self, id: ContingencyId) -> Option<&Contingency> {
        self.contingencies.get(id.value())
    }

    pub fn cnecs(&self) -> &[Cnec] {
        &self.cnecs
    }

    pub fn cnec(&self, id: CnecId) -> Option<&Cnec> {
        self.cnecs.get(id.value())
    }

    pub fn network_actions(&self) -> &[NetworkAction] {
        &self.network_actions
    }

    pub fn range_actions(&self) -> &[RangeAction] {
        &self.range_actions
    }

    pub fn network_action(&self, id: ActionId) -> Option<&NetworkAction> {
        self.network_actions.iter().find(|a| a.id == id)
    }

    pub fn range_action(&self, id: ActionId) -> Option<&RangeAction> {
        self.range_actions.iter().find(|a| a.id == id)
    }

    /// All states appearing in the CRAC: the preventive state plus every
    /// distinct post-contingency state carried by a CNEC, in instant order.
    pub fn states(&self) -> Vec<State> {
        let mut states = vec![State::preventive()];
        for cnec in &self.cnecs {
            if !states.contains(&cnec.state) {
                states.push(cnec.state);
            }
        }
        states.sort();
        states
    }

    /// CNECs monitored at the given state.
    pub fn cnecs_for(&self, state: &State) -> Vec<&Cnec> {
        self.cnecs.iter().filter(|c| &c.state == state).collect()
    }

    /// Network actions whose usage rules grant availability in the context.
    pub fn available_network_actions(&self, ctx: &AvailabilityContext) -> Vec<&NetworkAction> {
        self.network_actions
            .iter()
            .filter(|a| a.is_available(ctx))
            .collect()
    }

    /// Range actions whose usage rules grant availability in the context.
    pub fn available_range_actions(&self, ctx: &AvailabilityContext) -> Vec<&RangeAction> {
        self.range_actions
            .iter()
            .filter(|a| a.is_available(ctx))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Unit;

    fn sample_crac() -> Crac {
        let mut crac = Crac::new("test");
        let co = crac.add_contingency("loss of line A", vec!["line-a".into()]);
        let curative = State::after(co, Instant::Curative);

        crac.add_cnec(Cnec {
            id: CnecId::new(0),
            name: "cnec preventive".into(),
            element: "line-b".into(),
            state: State::preventive(),
            thresholds: vec![Threshold::max_only(Unit::Megawatt, 100.0, Side::Left)],
            nominal_voltage_kv: 400.0,
            optimized: true,
            monitored: true,
        })
        .unwrap();
        crac.add_cnec(Cnec {
            id: CnecId::new(0),
            name: "cnec curative".into(),
            element: "line-b".into(),
            state: curative,
            thresholds: vec![Threshold::max_only(Unit::Megawatt, 120.0, Side::Left)],
            nominal_voltage_kv: 400.0,
            optimized: true,
            monitored: true,
        })
        .unwrap();

        crac.add_network_action(NetworkAction {
            id: ActionId::new(0),
            name: "open coupler".into(),
            elementary_actions: vec!["coupler-1".into()],
            cost: 0.0,
            usage_rules: vec![UsageRule::OnState {
                state: State::preventive(),
            }],
        });
        crac.add_range_action(RangeAction {
            id: ActionId::new(0),
            name: "pst".into(),
            element: "pst-1".into(),
            initial_setpoint: 0.0,
            ranges: vec![Range::absolute(-10.0, 10.0)],
            taps: None,
            cost: 1.0,
            usage_rules: vec![UsageRule::OnContingency {
                contingency: co,
                instant: Instant::Curative,
            }],
        });
        crac
    }

    #[test]
    fn test_states_ordered_preventive_first() {
        let crac = sample_crac();
        let states = crac.states();
        assert_eq!(states.len(), 2);
        assert!(states[0].is_preventive());
        assert_eq!(states[1].instant, Instant::Curative);
    }

    #[test]
    fn test_cnecs_filtered_by_state() {
        let crac = sample_crac();
        let prev = State::preventive();
        assert_eq!(crac.cnecs_for(&prev).len(), 1);
        assert_eq!(crac.cnecs_for(&prev)[0].name, "cnec preventive");
    }

    #[test]
    fn test_availability_filtering() {
        let crac = sample_crac();
        let prev = State::preventive();
        let cur = crac.states()[1];

        let prev_ctx = AvailabilityContext::for_state(&prev);
        assert_eq!(crac.available_network_actions(&prev_ctx).len(), 1);
        assert_eq!(crac.available_range_actions(&prev_ctx).len(), 0);

        let cur_ctx = AvailabilityContext::for_state(&cur);
        assert_eq!(crac.available_network_actions(&cur_ctx).len(), 0);
        assert_eq!(crac.available_range_actions(&cur_ctx).len(), 1);
    }

    #[test]
    fn test_action_ids_unique_across_kinds() {
        let crac = sample_crac();
        assert_ne!(crac.network_actions()[0].id, crac.range_actions()[0].id);
        assert!(crac.network_action(crac.range_actions()[0].id).is_none());
    }

    #[test]
    fn test_cnec_requires_threshold() {
        let mut crac = Crac::new("empty");
        let bad = Cnec {
            id: CnecId::new(0),
            name: "no threshold".into(),
            element: "x".into(),
            state: State::preventive(),
            thresholds: vec![],
            nominal_voltage_kv: 400.0,
            optimized: true,
            monitored: true,
        };
        assert!(crac.add_cnec(bad).is_err());
    }
}
