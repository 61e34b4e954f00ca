//! Hybrid time horizons.

use core::fmt;

use hf_core::Real;

use crate::error::{AutomatonError, AutomatonResult};

/// Evolution horizon: maximum continuous time and maximum number of
/// discrete events. Evolution stops at whichever bound is reached first.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HybridTime {
    continuous: Real,
    discrete: usize,
}

impl HybridTime {
    pub fn new(continuous: Real, discrete: usize) -> AutomatonResult<Self> {
        if !continuous.is_finite() {
            return Err(AutomatonError::InvalidTime {
                what: "continuous time must be finite",
            });
        }
        if continuous < 0.0 {
            return Err(AutomatonError::InvalidTime {
                what: "continuous time must be non-negative",
            });
        }
        Ok(Self {
            continuous,
            discrete,
        })
    }

    pub fn continuous_time(&self) -> Real {
        self.continuous
    }

    pub fn discrete_time(&self) -> usize {
        self.discrete
    }
}

impl fmt::Display for HybridTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.continuous, self.discrete)
    }
}
