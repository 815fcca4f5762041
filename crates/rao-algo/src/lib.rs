//! # rao-algo: Remedial-action optimization engines
//!
//! Algorithmic layer of the RAO stack. The domain read model (crac, units,
//! errors) lives in `rao-core`; this crate hosts the engines that consume
//! it:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`traits`] | Collaborator seams: [`NetworkHandle`], [`SensitivityEngine`] |
//! | [`sensitivity`] | Adapter with fallback retry and per-run caching |
//! | [`linear`] | Continuous sub-problem: LP over range-action setpoints |
//! | [`search_tree`] | Breadth-first optimizer over network-action combinations |
//! | [`dichotomy`] | Bisection for the maximum secure exchange level |
//! | [`registry`] | Provider registry keyed by engine id |
//! | [`workflows`] | Multi-state runs and the exchange-capacity workflow |
//! | [`results`] | Per-state and aggregated result types |
//!
//! The LP backend is selected at build time through cargo features
//! (`solver-clarabel` by default, `solver-highs` as an alternative); the
//! engines only see the solver through `good_lp`.

pub mod dichotomy;
pub mod linear;
pub mod registry;
pub mod results;
pub mod search_tree;
pub mod sensitivity;
pub mod traits;
pub mod workflows;

pub use dichotomy::{
    find_max_secure_value, DichotomyConfig, DichotomyResult, Probe, SecurityVerdict,
};
pub use linear::{build_problem, solve_linear, LinearProblem, LinearSolution, LinearStatus};
pub use registry::{OptimizerRegistry, RaoProvider};
pub use results::{CnecMargin, RaoResult, RaoStatus, Setpoint, StateOptimization};
pub use search_tree::{MarginConvention, ObjectiveConfig, SearchTreeConfig, SearchTreeRao};
pub use sensitivity::{
    SensitivityAdapter, SensitivityConfig, SensitivityResult, SensitivityStatus,
};
pub use traits::{NetworkHandle, RawSensitivity, SensitivityEngine, SensitivityParams};
pub use workflows::{max_secure_exchange, run_rao, security_verdict};
