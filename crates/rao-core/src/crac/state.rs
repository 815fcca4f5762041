//! Decision instants, contingencies, and optimization states.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, RaoError};

/// Numeric identifier of a contingency inside a [`Crac`](super::Crac).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContingencyId(pub usize);

impl ContingencyId {
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

/// A contingency: one or more network elements out of service.
///
/// The semantics of the outage (which terminals open) belong to the network
/// collaborator; the read model only carries the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contingency {
    pub id: ContingencyId,
    pub name: String,
    /// Identifiers of the outaged network elements.
    pub elements: Vec<String>,
}

impl Contingency {
    pub fn new(id: ContingencyId, name: impl Into<String>, elements: Vec<String>) -> Self {
        Self {
            id,
            name: name.into(),
            elements,
        }
    }
}

/// Decision instant at which constraints are checked and actions applied.
///
/// Instants are totally ordered: `Preventive < Outage < Auto < Curative`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub enum Instant {
    /// Before any contingency occurs.
    #[default]
    Preventive,
    /// Immediately after a contingency, before any action.
    Outage,
    /// After automatic (uncontrolled) actions have acted.
    Auto,
    /// After curative (operator-controlled) actions.
    Curative,
}

impl std::fmt::Display for Instant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Instant::Preventive => write!(f, "preventive"),
            Instant::Outage => write!(f, "outage"),
            Instant::Auto => write!(f, "auto"),
            Instant::Curative => write!(f, "curative"),
        }
    }
}

impl Instant {
    /// All instants in order.
    pub const ALL: [Instant; 4] = [
        Instant::Preventive,
        Instant::Outage,
        Instant::Auto,
        Instant::Curative,
    ];
}

/// A pair (decision instant, optional contingency). Immutable once created.
///
/// The preventive state carries no contingency; every post-contingency state
/// must carry one. [`State::new`] enforces this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub instant: Instant,
    pub contingency: Option<ContingencyId>,
}

impl State {
    /// The unique preventive state.
    pub const fn preventive() -> Self {
        Self {
            instant: Instant::Preventive,
            contingency: None,
        }
    }

    /// Create a state, validating the instant/contingency pairing.
    pub fn new(instant: Instant, contingency: Option<ContingencyId>) -> CoreResult<Self> {
        match (instant, contingency) {
            (Instant::Preventive, Some(_)) => Err(RaoError::Validation(
                "preventive state cannot carry a contingency".into(),
            )),
            (Instant::Preventive, None) => Ok(Self::preventive()),
            (_, None) => Err(RaoError::Validation(format!(
                "{} state requires a contingency",
                instant
            ))),
            (instant, contingency) => Ok(Self {
                instant,
                contingency,
            }),
        }
    }

    /// Create a post-contingency state without validation overhead.
    pub const fn after(contingency: ContingencyId, instant: Instant) -> Self {
        Self {
            instant,
            contingency: Some(contingency),
        }
    }

    pub fn is_preventive(&self) -> bool {
        self.instant == Instant::Preventive
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.contingency {
            Some(c) => write!(f, "{}@co{}", self.instant, c.value()),
            None => write!(f, "{}", self.instant),
        }
    }
}
