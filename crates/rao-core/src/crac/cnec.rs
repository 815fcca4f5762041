//! Monitored elements (CNECs) and their thresholds.
//!
//! A CNEC is a network branch or bus voltage watched at a given state. Its
//! security margin is the distance between the observed value and the nearest
//! threshold bound, positive when inside the limits.

use serde::{Deserialize, Serialize};

use crate::error::{CoreResult, RaoError};
use crate::units::{Amperes, Kilovolts, Unit};

use super::state::State;

/// Numeric identifier of a CNEC inside a [`Crac`](super::Crac).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CnecId(pub usize);

impl CnecId {
    #[inline]
    pub const fn new(id: usize) -> Self {
        Self(id)
    }

    #[inline]
    pub const fn value(self) -> usize {
        self.0
    }
}

/// Monitored side of a branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// A threshold on a monitored element: unit, optional bounds, monitored side.
///
/// At least one of `min`/`max` must be present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    pub unit: Unit,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub side: Side,
}

impl Threshold {
    pub fn new(unit: Unit, min: Option<f64>, max: Option<f64>, side: Side) -> CoreResult<Self> {
        if min.is_none() && max.is_none() {
            return Err(RaoError::Validation(
                "threshold must have at least one bound".into(),
            ));
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                return Err(RaoError::Validation(format!(
                    "threshold min {lo} exceeds max {hi}"
                )));
            }
        }
        Ok(Self {
            unit,
            min,
            max,
            side,
        })
    }

    /// Upper-bound-only threshold, the common case for flow limits.
    pub fn max_only(unit: Unit, max: f64, side: Side) -> Self {
        Self {
            unit,
            min: None,
            max: Some(max),
            side,
        }
    }

    /// Margin of a value against this threshold, in the threshold's unit.
    /// Positive inside the bounds, negative outside. Missing bounds do not
    /// constrain.
    pub fn margin(&self, value: f64) -> f64 {
        let upper = self.max.map(|m| m - value).unwrap_or(f64::INFINITY);
        let lower = self.min.map(|m| value - m).unwrap_or(f64::INFINITY);
        upper.min(lower)
    }
}

/// Critical Network Element and Contingency: a branch flow or bus voltage
/// monitored at exactly one [`State`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cnec {
    pub id: CnecId,
    pub name: String,
    /// Identifier of the monitored network element.
    pub element: String,
    pub state: State,
    pub thresholds: Vec<Threshold>,
    /// Nominal voltage of the element, used to convert ampere thresholds to MW.
    pub nominal_voltage_kv: f64,
    /// Whether the element's margin enters the objective function.
    pub optimized: bool,
    /// Whether the element's limits are enforced as hard constraints.
    pub monitored: bool,
}

impl Cnec {
    /// Thresholds on the given side, with flow bounds converted to megawatts.
    /// Voltage (kV) thresholds are returned unchanged; voltage elements are
    /// compared in kV throughout.
    pub fn thresholds_mw(&self, side: Side) -> impl Iterator<Item = Threshold> + '_ {
        let v = Kilovolts(self.nominal_voltage_kv);
        self.thresholds
            .iter()
            .filter(move |t| t.side == side)
            .map(move |t| match t.unit {
                Unit::Megawatt | Unit::Kilovolt => t.clone(),
                Unit::Ampere => Threshold {
                    unit: Unit::Megawatt,
                    min: t.min.map(|a| Amperes(a).to_megawatts(v).value()),
                    max: t.max.map(|a| Amperes(a).to_megawatts(v).value()),
                    side: t.side,
                },
            })
    }

    /// Worst margin of a flow (MW) over all thresholds of the given side.
    pub fn margin_mw(&self, side: Side, flow_mw: f64) -> f64 {
        self.thresholds_mw(side)
            .map(|t| t.margin(flow_mw))
            .fold(f64::INFINITY, f64::min)
    }

    /// Monitored sides, deduplicated in order.
    pub fn sides(&self) -> Vec<Side> {
        let mut sides = Vec::new();
        for t in &self.thresholds {
            if !sides.contains(&t.side) {
                sides.push(t.side);
            }
        }
        sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flow_cnec(max_mw: f64) -> Cnec {
        Cnec {
            id: CnecId::new(0),
            name: "line FR-BE".into(),
            element: "ne-1".into(),
            state: State::preventive(),
            thresholds: vec![Threshold::max_only(Unit::Megawatt, max_mw, Side::Left)],
            nominal_voltage_kv: 400.0,
            optimized: true,
            monitored: true,
        }
    }

    #[test]
    fn test_threshold_needs_a_bound() {
        assert!(Threshold::new(Unit::Megawatt, None, None, Side::Left).is_err());
        assert!(Threshold::new(Unit::Megawatt, Some(10.0), Some(-10.0), Side::Left).is_err());
    }

    #[test]
    fn test_margin_sign_convention() {
        let t = Threshold::new(Unit::Megawatt, Some(-100.0), Some(100.0), Side::Left).unwrap();
        assert_eq!(t.margin(60.0), 40.0);
        assert_eq!(t.margin(120.0), -20.0);
        assert_eq!(t.margin(-120.0), -20.0);
    }

    #[test]
    fn test_max_only_margin_unbounded_below() {
        let t = Threshold::max_only(Unit::Megawatt, 100.0, Side::Left);
        assert_eq!(t.margin(-1e9), 100.0 + 1e9);
    }

    #[test]
    fn test_ampere_threshold_converted_to_mw() {
        let mut cnec = flow_cnec(0.0);
        cnec.thresholds = vec![Threshold::max_only(Unit::Ampere, 1000.0, Side::Left)];
        let converted: Vec<_> = cnec.thresholds_mw(Side::Left).collect();
        assert_eq!(converted.len(), 1);
        // √3 · 400 kV · 1000 A ≈ 692.8 MW
        assert!((converted[0].max.unwrap() - 692.82).abs() < 0.01);
        assert_eq!(converted[0].unit, Unit::Megawatt);
    }

    #[test]
    fn test_worst_margin_over_thresholds() {
        let mut cnec = flow_cnec(100.0);
        cnec.thresholds.push(
            Threshold::new(Unit::Megawatt, Some(-80.0), Some(80.0), Side::Left).unwrap(),
        );
        // Flow of 90 MW: margin 10 against the 100 MW limit, -10 against 80
        assert_eq!(cnec.margin_mw(Side::Left, 90.0), -10.0);
    }

    #[test]
    fn test_sides_deduplicated() {
        let mut cnec = flow_cnec(100.0);
        cnec.thresholds
            .push(Threshold::max_only(Unit::Megawatt, 90.0, Side::Left));
        cnec.thresholds
            .push(Threshold::max_only(Unit::Megawatt, 90.0, Side::Right));
        assert_eq!(cnec.sides(), vec![Side::Left, Side::Right]);
    }
}
