//! Search-tree optimization of discrete remedial actions.
//!
//! A leaf is a combination of activated network actions together with the
//! range-action setpoints the linear sub-solver chose under that topology.
//! [`SearchTreeRao`] expands the tree breadth-first from the best leaf of
//! the previous depth, which keeps the number of sensitivity runs linear in
//! depth times the number of candidate actions.

pub mod leaf;
pub mod objective;
pub mod optimizer;

pub use leaf::{Leaf, LeafArena, LeafEvaluation, LeafId, LeafStatus};
pub use objective::{cnec_margin, MarginConvention, ObjectiveConfig};
pub use optimizer::{SearchTreeConfig, SearchTreeRao};
