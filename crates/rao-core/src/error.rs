//! Unified error types for the remedial-action optimization stack.
//!
//! This module provides a common error type [`RaoError`] covering the failure
//! modes of the two engines (search-tree optimization and dichotomy) and their
//! collaborators. Local error types in algorithm crates convert into
//! `RaoError` at API boundaries.
//!
//! # Example
//!
//! ```ignore
//! use rao_core::{RaoError, CoreResult};
//!
//! fn check_bounds(min: f64, max: f64) -> CoreResult<()> {
//!     if min > max {
//!         return Err(RaoError::Validation(format!("empty range [{min}, {max}]")));
//!     }
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for remedial-action optimization.
///
/// The first five variants form the error taxonomy of the engines; the last
/// two cover input validation and configuration problems detected before any
/// computation starts.
#[derive(Error, Debug)]
pub enum RaoError {
    /// Sensitivity computation failed for a state after the fallback retry.
    /// Every leaf evaluated under that state is invalid.
    #[error("sensitivity computation failed for state {state}: {reason}")]
    SensitivityFailure { state: String, reason: String },

    /// The continuous sub-problem has no feasible setpoint assignment.
    /// Recovered per leaf by reverting to the parent's setpoints.
    #[error("linear sub-problem infeasible: {0}")]
    LpInfeasible(String),

    /// The LP backend failed numerically (not an infeasibility verdict).
    #[error("LP solver error: {0}")]
    LpSolverError(String),

    /// The search-tree time budget ran out. Expansion is truncated but the
    /// best leaf found so far is still returned by the optimizer.
    #[error("search time budget exceeded after {elapsed_ms} ms")]
    TimeBudgetExceeded { elapsed_ms: u128 },

    /// The dichotomy's lowest probe is itself insecure; no secure exchange
    /// value exists in the requested bracket.
    #[error("no secure exchange value found: lowest probe {value:.1} is not secure")]
    CapacityNotFound { value: f64 },

    /// Input data validation errors.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Convenience type alias for Results using RaoError.
pub type CoreResult<T> = Result<T, RaoError>;

impl From<anyhow::Error> for RaoError {
    fn from(err: anyhow::Error) -> Self {
        RaoError::Validation(err.to_string())
    }
}
