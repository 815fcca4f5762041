//! Usage rules: when a remedial action may be activated.
//!
//! Each rule kind grants availability for a particular scope (a state, a
//! contingency, a monitored element, a country). An action is available as
//! soon as any of its rules grants it.

use serde::{Deserialize, Serialize};

use super::cnec::CnecId;
use super::state::{ContingencyId, Instant, State};

/// The tuple against which usage rules are evaluated.
#[derive(Debug, Clone, Copy)]
pub struct AvailabilityContext<'a> {
    pub state: &'a State,
    /// Monitored element the availability question is asked for, if any.
    pub cnec: Option<CnecId>,
    /// Country of the constrained element, if known.
    pub country: Option<&'a str>,
}

impl<'a> AvailabilityContext<'a> {
    pub fn for_state(state: &'a State) -> Self {
        Self {
            state,
            cnec: None,
            country: None,
        }
    }
}

/// Closed set of usage-rule kinds, each with its own evaluation arm,
/// reduced by [`any_rule_grants`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UsageRule {
    /// Available at exactly this state.
    OnState { state: State },
    /// Available at the given instant after the given contingency.
    OnContingency {
        contingency: ContingencyId,
        instant: Instant,
    },
    /// Available at the given instant when the question concerns this CNEC.
    OnCnec { cnec: CnecId, instant: Instant },
    /// Available at the given instant for elements in this country.
    OnCountry { country: String, instant: Instant },
}

impl UsageRule {
    /// Whether this single rule grants availability in the given context.
    pub fn grants(&self, ctx: &AvailabilityContext) -> bool {
        match self {
            UsageRule::OnState { state } => state == ctx.state,
            UsageRule::OnContingency {
                contingency,
                instant,
            } => ctx.state.instant == *instant && ctx.state.contingency == Some(*contingency),
            UsageRule::OnCnec { cnec, instant } => {
                ctx.state.instant == *instant && ctx.cnec == Some(*cnec)
            }
            UsageRule::OnCountry { country, instant } => {
                ctx.state.instant == *instant && ctx.country == Some(country.as_str())
            }
        }
    }
}

/// "Any rule grants availability" reduction. An action with no rules is
/// never available.
pub fn any_rule_grants(rules: &[UsageRule], ctx: &AvailabilityContext) -> bool {
    rules.iter().any(|r| r.grants(ctx))
}
