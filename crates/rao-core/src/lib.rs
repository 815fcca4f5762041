//! # rao-core: Domain read model for remedial-action optimization
//!
//! This crate provides the shared vocabulary of the remedial-action
//! optimization (RAO) stack:
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`crac`] | Read-only CRAC model: states, contingencies, CNECs, remedial actions, usage rules |
//! | [`units`] | Unit-safe newtypes (MW, A, kV) and explicit conversions |
//! | [`error`] | Unified [`RaoError`] taxonomy |
//!
//! The CRAC (Contingency list, Remedial Actions, and additional Constraints)
//! is populated by external importers (out of scope here) and is immutable
//! for the duration of an optimization run. The algorithmic engines live in
//! the `rao-algo` crate.

pub mod crac;
pub mod error;
pub mod units;

pub use crac::{
    any_rule_grants, ActionId, AvailabilityContext, Cnec, CnecId, Contingency, ContingencyId,
    Crac, Instant, NetworkAction, Range, RangeAction, RangeType, Side, State, TapTable, Threshold,
    UsageRule,
};
pub use error::{CoreResult, RaoError};
pub use units::{Amperes, Kilovolts, Megawatts, Unit};
