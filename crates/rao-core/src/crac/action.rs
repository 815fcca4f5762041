//! Remedial actions: discrete network actions and continuous range actions.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, RaoError};

use super::usage::{AvailabilityContext, UsageRule};

/// Numeric identifier of a remedial action inside a [`Crac`](super::Crac).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub usize);

impl ActionId {
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

/// A discrete, binary apply-or-not remedial action (topology change, HVDC
/// mode switch, ...). The network collaborator interprets the elementary
/// action identifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkAction {
    pub id: ActionId,
    pub name: String,
    /// Elementary switching operations, opaque to the optimizer.
    pub elementary_actions: Vec<String>,
    /// Activation cost used for tie-breaking in leaf comparison.
    pub cost: f64,
    pub usage_rules: Vec<UsageRule>,
}

impl NetworkAction {
    pub fn is_available(&self, ctx: &AvailabilityContext) -> bool {
        super::usage::any_rule_grants(&self.usage_rules, ctx)
    }
}

/// How a [`Range`] is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RangeType {
    /// Bounds are absolute setpoint values.
    Absolute,
    /// Bounds are offsets from the action's initial setpoint.
    RelativeToInitial,
}

/// An admissible setpoint interval for a range action.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Range {
    pub min: f64,
    pub max: f64,
    pub range_type: RangeType,
}

impl Range {
    pub fn absolute(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            range_type: RangeType::Absolute,
        }
    }

    pub fn relative_to_initial(min: f64, max: f64) -> Self {
        Self {
            min,
            max,
            range_type: RangeType::RelativeToInitial,
        }
    }

    /// Resolve to absolute bounds given the initial setpoint.
    fn resolve(&self, initial_setpoint: f64) -> (f64, f64) {
        match self.range_type {
            RangeType::Absolute => (self.min, self.max),
            RangeType::RelativeToInitial => {
                (initial_setpoint + self.min, initial_setpoint + self.max)
            }
        }
    }
}

/// Tap-to-setpoint table of a phase-shifting transformer. Taps are integer
/// positions `min_tap..=max_tap`; `setpoints[i]` is the setpoint (phase angle)
/// of tap `min_tap + i`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TapTable {
    pub min_tap: i32,
    pub max_tap: i32,
    pub setpoints: Vec<f64>,
}

impl TapTable {
    pub fn new(min_tap: i32, setpoints: Vec<f64>) -> CoreResult<Self> {
        if setpoints.is_empty() {
            return Err(RaoError::Validation("empty tap table".into()));
        }
        Ok(Self {
            min_tap,
            max_tap: min_tap + setpoints.len() as i32 - 1,
            setpoints,
        })
    }

    pub fn setpoint(&self, tap: i32) -> Option<f64> {
        if tap < self.min_tap || tap > self.max_tap {
            return None;
        }
        Some(self.setpoints[(tap - self.min_tap) as usize])
    }

    /// Tap whose setpoint is nearest to the requested value.
    pub fn nearest_tap(&self, setpoint: f64) -> i32 {
        let mut best = self.min_tap;
        let mut best_dist = f64::INFINITY;
        for (i, sp) in self.setpoints.iter().enumerate() {
            let dist = (sp - setpoint).abs();
            if dist < best_dist {
                best_dist = dist;
                best = self.min_tap + i as i32;
            }
        }
        best
    }

    fn setpoint_bounds(&self) -> (f64, f64) {
        let mut lo = f64::INFINITY;
        let mut hi = f64::NEG_INFINITY;
        for &sp in &self.setpoints {
            lo = lo.min(sp);
            hi = hi.max(sp);
        }
        (lo, hi)
    }
}

/// A continuous remedial action: a setpoint adjustable inside the
/// intersection of its ranges (tap changer angle, HVDC power, ...).
///
/// When `taps` is present the action is a PST range action: the feasible
/// setpoints are discrete, and a solved continuous setpoint is rounded to the
/// nearest tap.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RangeAction {
    pub id: ActionId,
    pub name: String,
    /// Identifier of the adjusted network element (PST, HVDC line, ...).
    pub element: String,
    pub initial_setpoint: f64,
    pub ranges: Vec<Range>,
    pub taps: Option<TapTable>,
    /// Per-unit-of-movement cost used for tie-breaking.
    pub cost: f64,
    pub usage_rules: Vec<UsageRule>,
}

impl RangeAction {
    pub fn is_available(&self, ctx: &AvailabilityContext) -> bool {
        super::usage::any_rule_grants(&self.usage_rules, ctx)
    }

    pub fn is_pst(&self) -> bool {
        self.taps.is_some()
    }

    /// Effective setpoint bounds: the intersection of every range (relative
    /// ranges resolved against the initial setpoint), further intersected
    /// with the tap table's reachable setpoints for PSTs.
    pub fn effective_bounds(&self) -> CoreResult<(f64, f64)> {
        let mut lo = f64::NEG_INFINITY;
        let mut hi = f64::INFINITY;
        for range in &self.ranges {
            let (rlo, rhi) = range.resolve(self.initial_setpoint);
            lo = lo.max(rlo);
            hi = hi.min(rhi);
        }
        if let Some(taps) = &self.taps {
            let (tlo, thi) = taps.setpoint_bounds();
            lo = lo.max(tlo);
            hi = hi.min(thi);
        }
        if lo > hi {
            return Err(RaoError::Validation(format!(
                "range action '{}' has empty admissible range [{lo}, {hi}]",
                self.name
            )));
        }
        Ok((lo, hi))
    }

    /// Snap a continuous setpoint to the nearest feasible value: clamp into
    /// the effective bounds, then round to the nearest tap for PSTs.
    pub fn nearest_feasible(&self, setpoint: f64) -> CoreResult<f64> {
        let (lo, hi) = self.effective_bounds()?;
        let clamped = setpoint.clamp(lo, hi);
        match &self.taps {
            None => Ok(clamped),
            Some(taps) => {
                let tap = taps.nearest_tap(clamped);
                // The rounded tap may sit a half-step outside the range
                // bounds; re-clamp onto the bound in that case.
                let sp = taps.setpoint(tap).unwrap_or(clamped);
                Ok(sp.clamp(lo, hi))
            }
        }
    }
}
