//! Plot axes: which coordinate goes on each axis, and its displayed range.

use core::fmt;

use hf_core::{Interval, Real, RealVariable, TimeVariable, Valuation};
use serde::{Deserialize, Serialize};

/// Quantity shown along an axis.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Coordinate {
    Time,
    Variable(String),
}

impl Coordinate {
    pub fn name(&self) -> &str {
        match self {
            Coordinate::Time => TimeVariable.name(),
            Coordinate::Variable(name) => name,
        }
    }

    pub fn value(&self, time: Real, state: &Valuation<Real>) -> Option<Real> {
        match self {
            Coordinate::Time => Some(time),
            Coordinate::Variable(name) => state.get(name).copied(),
        }
    }

    pub fn range(&self, time: Interval, state: &Valuation<Interval>) -> Option<Interval> {
        match self {
            Coordinate::Time => Some(time),
            Coordinate::Variable(name) => state.get(name).copied(),
        }
    }
}

impl From<&TimeVariable> for Coordinate {
    fn from(_: &TimeVariable) -> Self {
        Coordinate::Time
    }
}

impl From<&RealVariable> for Coordinate {
    fn from(variable: &RealVariable) -> Self {
        Coordinate::Variable(variable.name().to_string())
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `lower <= coordinate <= upper`
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AxisBound {
    pub coordinate: Coordinate,
    pub lower: Real,
    pub upper: Real,
}

impl AxisBound {
    pub fn new(lower: Real, coordinate: impl Into<Coordinate>, upper: Real) -> Self {
        Self {
            coordinate: coordinate.into(),
            lower,
            upper,
        }
    }
}

impl fmt::Display for AxisBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<={}<={}", self.lower, self.coordinate, self.upper)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Axes2d {
    pub x: AxisBound,
    pub y: AxisBound,
}

impl Axes2d {
    pub fn new(x: AxisBound, y: AxisBound) -> Self {
        Self { x, y }
    }

    /// `x-y` label used in artifact names, e.g. `t-i_L`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.x.coordinate, self.y.coordinate)
    }
}

impl fmt::Display for Axes2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Axes2d({}, {})", self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn axes_label_and_display() {
        let i_l = RealVariable::new("i_L");
        let axes = Axes2d::new(
            AxisBound::new(0.0, &TimeVariable, 0.02),
            AxisBound::new(-1.0, &i_l, 25.0),
        );
        assert_eq!(axes.label(), "t-i_L");
        assert_eq!(axes.to_string(), "Axes2d(0<=t<=0.02, -1<=i_L<=25)");
    }

    #[test]
    fn coordinate_values() {
        let mut state = Valuation::new();
        state.insert("v_C", 12.0);
        assert_eq!(Coordinate::Time.value(0.5, &state), Some(0.5));
        assert_eq!(Coordinate::Variable("v_C".into()).value(0.5, &state), Some(12.0));
        assert_eq!(Coordinate::Variable("i_L".into()).value(0.5, &state), None);
    }
}
