//! Initial sets: a product location plus bounds on the continuous state.

use core::fmt;
use std::collections::BTreeSet;

use hf_core::{DiscreteLocation, Interval, Real, RealVariable, Valuation};

use crate::composite::CompositeHybridAutomaton;
use crate::error::{AutomatonError, AutomatonResult};

/// Constraint on one continuous variable.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum VariableBound {
    /// `x == value`; treated as the degenerate interval `[value, value]`.
    Equal(Real),
    /// `lower <= x <= upper`.
    Between(Real, Real),
}

impl VariableBound {
    pub fn interval(&self) -> Interval {
        match *self {
            VariableBound::Equal(v) => Interval::point(v),
            VariableBound::Between(lo, hi) => Interval::new(lo, hi),
        }
    }
}

/// `x == value`
pub fn equal(variable: &RealVariable, value: Real) -> (RealVariable, VariableBound) {
    (variable.clone(), VariableBound::Equal(value))
}

/// `lower <= x <= upper`
pub fn between(lower: Real, variable: &RealVariable, upper: Real) -> (RealVariable, VariableBound) {
    (variable.clone(), VariableBound::Between(lower, upper))
}

#[derive(Clone, Debug, PartialEq)]
pub struct HybridBoundedConstraintSet {
    location: DiscreteLocation,
    bounds: Vec<(RealVariable, VariableBound)>,
}

impl HybridBoundedConstraintSet {
    /// Build an initial set from component locations and variable bounds.
    pub fn new<'a>(
        locations: impl IntoIterator<Item = &'a DiscreteLocation>,
        bounds: Vec<(RealVariable, VariableBound)>,
    ) -> AutomatonResult<Self> {
        let location = DiscreteLocation::product(locations)?;
        let mut seen = BTreeSet::new();
        for (var, bound) in &bounds {
            if !seen.insert(var.name()) {
                return Err(AutomatonError::InvalidInitialSet {
                    what: format!("variable '{var}' constrained twice"),
                });
            }
            let (lo, hi) = match *bound {
                VariableBound::Equal(v) => (v, v),
                VariableBound::Between(lo, hi) => (lo, hi),
            };
            if !lo.is_finite() || !hi.is_finite() {
                return Err(AutomatonError::InvalidInitialSet {
                    what: format!("bound on '{var}' is not finite"),
                });
            }
            if lo > hi {
                return Err(AutomatonError::InvalidInitialSet {
                    what: format!("bound on '{var}' is empty ({lo} > {hi})"),
                });
            }
        }
        Ok(Self { location, bounds })
    }

    pub fn location(&self) -> &DiscreteLocation {
        &self.location
    }

    pub fn bounds(&self) -> &[(RealVariable, VariableBound)] {
        &self.bounds
    }

    pub fn bounding_box(&self) -> Valuation<Interval> {
        self.bounds
            .iter()
            .map(|(var, bound)| (var.name().to_string(), bound.interval()))
            .collect()
    }

    pub fn midpoint(&self) -> Valuation<Real> {
        self.bounding_box().midpoint()
    }

    /// Check the set against `system`: the location must exist and exactly
    /// the state variables active there must be constrained.
    pub fn check_against(&self, system: &CompositeHybridAutomaton) -> AutomatonResult<()> {
        system.check_location_exists(&self.location)?;
        let expected: BTreeSet<String> = system
            .state_variables(&self.location)?
            .into_iter()
            .map(|v| v.name().to_string())
            .collect();
        let given: BTreeSet<String> = self
            .bounds
            .iter()
            .map(|(v, _)| v.name().to_string())
            .collect();
        if let Some(missing) = expected.difference(&given).next() {
            return Err(AutomatonError::InvalidInitialSet {
                what: format!("state variable '{missing}' is unconstrained at {}", self.location),
            });
        }
        if let Some(extra) = given.difference(&expected).next() {
            return Err(AutomatonError::InvalidInitialSet {
                what: format!("'{extra}' is not a state variable at {}", self.location),
            });
        }
        Ok(())
    }
}

impl fmt::Display for HybridBoundedConstraintSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .bounds
            .iter()
            .map(|(v, b)| match b {
                VariableBound::Equal(x) => format!("{v}=={x}"),
                VariableBound::Between(lo, hi) => format!("{lo}<={v}<={hi}"),
            })
            .collect();
        write!(f, "{}: {{{}}}", self.location, parts.join(", "))
    }
}
