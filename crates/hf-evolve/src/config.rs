//! Evolver options.

use core::fmt;

use crate::error::{EvolveError, EvolveResult};

/// How indeterminate guards are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Semantics {
    /// Best effort: jump only when a guard clearly holds, follow the
    /// midpoint otherwise. Cheap, not an over-approximation.
    Lower,
    /// Every behaviour from the initial set is contained in the result.
    #[default]
    Upper,
}

impl fmt::Display for Semantics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Semantics::Lower => f.write_str("lower"),
            Semantics::Upper => f.write_str("upper"),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EvolverConfiguration {
    /// Largest enclosure radius tolerated before evolution is aborted.
    pub maximum_enclosure_radius: f64,
    /// Grid step of the flow tube (seconds).
    pub maximum_step_size: f64,
    /// Picard iterations allowed when searching for an a priori box.
    pub maximum_picard_iterations: usize,
    /// Relative widening applied between Picard iterations.
    pub picard_inflation: f64,
}

impl Default for EvolverConfiguration {
    fn default() -> Self {
        Self {
            maximum_enclosure_radius: f64::INFINITY,
            maximum_step_size: 1e-3,
            maximum_picard_iterations: 16,
            picard_inflation: 0.125,
        }
    }
}

impl EvolverConfiguration {
    pub fn set_maximum_enclosure_radius(&mut self, radius: f64) -> &mut Self {
        self.maximum_enclosure_radius = radius;
        self
    }

    pub fn set_maximum_step_size(&mut self, step: f64) -> &mut Self {
        self.maximum_step_size = step;
        self
    }

    pub fn validate(&self) -> EvolveResult<()> {
        if !(self.maximum_enclosure_radius > 0.0) {
            return Err(EvolveError::InvalidArg {
                what: "maximum_enclosure_radius must be positive",
            });
        }
        if !(self.maximum_step_size > 0.0) || !self.maximum_step_size.is_finite() {
            return Err(EvolveError::InvalidArg {
                what: "maximum_step_size must be positive and finite",
            });
        }
        if self.maximum_picard_iterations == 0 {
            return Err(EvolveError::InvalidArg {
                what: "maximum_picard_iterations must be positive",
            });
        }
        if !(self.picard_inflation > 0.0) {
            return Err(EvolveError::InvalidArg {
                what: "picard_inflation must be positive",
            });
        }
        Ok(())
    }
}

impl fmt::Display for EvolverConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EvolverConfiguration(maximum_enclosure_radius={}, maximum_step_size={}, maximum_picard_iterations={})",
            self.maximum_enclosure_radius, self.maximum_step_size, self.maximum_picard_iterations
        )
    }
}
