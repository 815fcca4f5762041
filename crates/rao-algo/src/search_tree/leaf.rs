//! Search-tree leaves and their arena.
//!
//! A leaf is a candidate remedial-action combination: a set of activated
//! network actions plus the range-action setpoints chosen by the linear
//! sub-solver under that topology. Leaves live in an arena indexed by
//! [`LeafId`]; each stores its parent's index, so the tree is acyclic by
//! construction and needs no back-pointers.

use std::collections::HashMap;

use rao_core::ActionId;

use crate::linear::LinearStatus;
use crate::results::CnecMargin;
use crate::sensitivity::SensitivityStatus;

/// Index of a leaf in its [`LeafArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub usize);

impl LeafId {
    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

/// Lifecycle of a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeafStatus {
    /// Created during expansion, not yet evaluated.
    Created,
    /// Evaluation complete; objective and margins are cached.
    Evaluated,
    /// Sensitivity or LP evaluation failed; excluded from comparison.
    Failed,
}

/// Cached evaluation of a leaf.
#[derive(Debug, Clone)]
pub struct LeafEvaluation {
    /// Cost minimized by the search: negated minimum margin over optimized
    /// cnecs.
    pub objective: f64,
    /// Minimum margin over optimized cnecs, in the objective unit.
    pub min_margin: f64,
    /// Margin per monitored (cnec, side).
    pub margins: Vec<CnecMargin>,
    pub lp_status: LinearStatus,
    pub sensitivity_status: SensitivityStatus,
}

/// A node of the search tree.
#[derive(Debug, Clone)]
pub struct Leaf {
    pub id: LeafId,
    pub parent: Option<LeafId>,
    pub depth: usize,
    /// Activated network actions, sorted by id.
    pub activated: Vec<ActionId>,
    /// Range-action setpoints chosen for this leaf. Empty means every action
    /// sits at its initial setpoint.
    pub setpoints: HashMap<ActionId, f64>,
    /// Aggregate activation cost of the network actions.
    pub cost: f64,
    pub status: LeafStatus,
    pub evaluation: Option<LeafEvaluation>,
}

impl Leaf {
    /// Objective for comparison; failed or unevaluated leaves compare worst.
    pub fn objective(&self) -> f64 {
        match (&self.status, &self.evaluation) {
            (LeafStatus::Evaluated, Some(eval)) => eval.objective,
            _ => f64::INFINITY,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        self.status == LeafStatus::Evaluated
    }
}

/// Arena owning every leaf of one search. The parent of a leaf always has a
/// smaller index, so the structure is a strict tree.
#[derive(Debug, Default)]
pub struct LeafArena {
    leaves: Vec<Leaf>,
}

impl LeafArena {
    /// Create an arena holding only the root leaf (no activated actions).
    pub fn with_root() -> Self {
        let root = Leaf {
            id: LeafId(0),
            parent: None,
            depth: 0,
            activated: Vec::new(),
            setpoints: HashMap::new(),
            cost: 0.0,
            status: LeafStatus::Created,
            evaluation: None,
        };
        Self { leaves: vec![root] }
    }

    pub const fn root_id(&self) -> LeafId {
        LeafId(0)
    }

    /// Add a child of `parent` activating one more network action. The
    /// child inherits the parent's setpoints as its linearization point.
    pub fn add_child(&mut self, parent: LeafId, action: ActionId, action_cost: f64) -> LeafId {
        let id = LeafId(self.leaves.len());
        let parent_leaf = &self.leaves[parent.value()];
        let mut activated = parent_leaf.activated.clone();
        activated.push(action);
        activated.sort_unstable();
        let leaf = Leaf {
            id,
            parent: Some(parent),
            depth: parent_leaf.depth + 1,
            activated,
            setpoints: parent_leaf.setpoints.clone(),
            cost: parent_leaf.cost + action_cost,
            status: LeafStatus::Created,
            evaluation: None,
        };
        self.leaves.push(leaf);
        id
    }

    pub fn get(&self, id: LeafId) -> &Leaf {
        &self.leaves[id.value()]
    }

    pub fn get_mut(&mut self, id: LeafId) -> &mut Leaf {
        &mut self.leaves[id.value()]
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}
