//! Outward-rounded interval arithmetic.
//!
//! Every operation rounds its result with `next_down`/`next_up` so that the
//! computed interval always contains the exact real result of the operation
//! applied to any points of the operands.

use core::fmt;
use core::ops::{Add, Div, Mul, Neg, Sub};
use std::f64::consts::{FRAC_PI_2, PI, TAU};

use crate::Real;
use crate::error::{HfError, HfResult};

/// Closed interval `[lower, upper]` over the extended reals.
#[derive(Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Interval {
    lower: Real,
    upper: Real,
}

impl Interval {
    /// Create an interval; panics in debug builds if `lower > upper`.
    pub fn new(lower: Real, upper: Real) -> Self {
        debug_assert!(lower <= upper, "interval bounds out of order");
        Self { lower, upper }
    }

    /// Checked constructor.
    pub fn try_new(lower: Real, upper: Real) -> HfResult<Self> {
        if lower.is_nan() || upper.is_nan() {
            return Err(HfError::InvalidArg {
                what: "interval bound is NaN",
            });
        }
        if lower > upper {
            return Err(HfError::InvalidArg {
                what: "interval lower bound exceeds upper bound",
            });
        }
        Ok(Self { lower, upper })
    }

    /// Degenerate interval `[x, x]`.
    pub fn point(x: Real) -> Self {
        Self { lower: x, upper: x }
    }

    pub fn entire() -> Self {
        Self {
            lower: Real::NEG_INFINITY,
            upper: Real::INFINITY,
        }
    }

    fn rounded(lower: Real, upper: Real) -> Self {
        if lower.is_nan() || upper.is_nan() {
            return Self::entire();
        }
        Self {
            lower: lower.next_down(),
            upper: upper.next_up(),
        }
    }

    pub fn lower(&self) -> Real {
        self.lower
    }

    pub fn upper(&self) -> Real {
        self.upper
    }

    pub fn width(&self) -> Real {
        self.upper - self.lower
    }

    pub fn radius(&self) -> Real {
        0.5 * self.width()
    }

    pub fn midpoint(&self) -> Real {
        if self.lower.is_infinite() || self.upper.is_infinite() {
            return 0.5 * self.lower + 0.5 * self.upper;
        }
        self.lower + 0.5 * (self.upper - self.lower)
    }

    /// Largest absolute value in the interval.
    pub fn mag(&self) -> Real {
        self.lower.abs().max(self.upper.abs())
    }

    pub fn is_point(&self) -> bool {
        self.lower == self.upper
    }

    pub fn is_bounded(&self) -> bool {
        self.lower.is_finite() && self.upper.is_finite()
    }

    pub fn contains(&self, x: Real) -> bool {
        self.lower <= x && x <= self.upper
    }

    pub fn is_subset_of(&self, other: &Interval) -> bool {
        other.lower <= self.lower && self.upper <= other.upper
    }

    /// Smallest interval containing both operands.
    pub fn hull(&self, other: &Interval) -> Interval {
        Interval {
            lower: self.lower.min(other.lower),
            upper: self.upper.max(other.upper),
        }
    }

    pub fn intersection(&self, other: &Interval) -> Option<Interval> {
        let lower = self.lower.max(other.lower);
        let upper = self.upper.min(other.upper);
        (lower <= upper).then_some(Interval { lower, upper })
    }

    /// Widen by `delta` on both sides.
    pub fn inflate(&self, delta: Real) -> Interval {
        Interval::rounded(self.lower - delta, self.upper + delta)
    }

    /// Split at the midpoint.
    pub fn bisect(&self) -> (Interval, Interval) {
        let mid = self.midpoint();
        (
            Interval {
                lower: self.lower,
                upper: mid,
            },
            Interval {
                lower: mid,
                upper: self.upper,
            },
        )
    }

    pub fn cos(&self) -> Interval {
        if !self.is_bounded() || self.width() >= TAU {
            return Interval::new(-1.0, 1.0);
        }
        let (cl, cu) = (self.lower.cos(), self.upper.cos());
        let mut lower = cl.min(cu);
        let mut upper = cl.max(cu);

        // Maxima of cos at 2k*pi, minima at (2k+1)*pi.
        let k_max = (self.lower / TAU).ceil();
        if k_max * TAU <= self.upper {
            upper = 1.0;
        }
        let k_min = ((self.lower - PI) / TAU).ceil();
        if k_min * TAU + PI <= self.upper {
            lower = -1.0;
        }
        let widened = Interval::rounded(lower, upper);
        Interval {
            lower: widened.lower.max(-1.0),
            upper: widened.upper.min(1.0),
        }
    }

    pub fn sin(&self) -> Interval {
        (*self - Interval::point(FRAC_PI_2)).cos()
    }

    /// Square root of the non-negative part of the interval.
    pub fn sqrt(&self) -> Interval {
        let lower = self.lower.max(0.0);
        let upper = self.upper.max(0.0);
        Interval::rounded(lower.sqrt(), upper.sqrt()).clamp_below(0.0)
    }

    fn clamp_below(self, floor: Real) -> Interval {
        Interval {
            lower: self.lower.max(floor),
            upper: self.upper.max(floor),
        }
    }
}

impl Add for Interval {
    type Output = Interval;

    fn add(self, rhs: Interval) -> Interval {
        Interval::rounded(self.lower + rhs.lower, self.upper + rhs.upper)
    }
}

impl Sub for Interval {
    type Output = Interval;

    fn sub(self, rhs: Interval) -> Interval {
        Interval::rounded(self.lower - rhs.upper, self.upper - rhs.lower)
    }
}

impl Mul for Interval {
    type Output = Interval;

    fn mul(self, rhs: Interval) -> Interval {
        let products = [
            self.lower * rhs.lower,
            self.lower * rhs.upper,
            self.upper * rhs.lower,
            self.upper * rhs.upper,
        ];
        if products.iter().any(|p| p.is_nan()) {
            return Interval::entire();
        }
        let lower = products.iter().copied().fold(Real::INFINITY, Real::min);
        let upper = products.iter().copied().fold(Real::NEG_INFINITY, Real::max);
        Interval::rounded(lower, upper)
    }
}

impl Div for Interval {
    type Output = Interval;

    fn div(self, rhs: Interval) -> Interval {
        if rhs.contains(0.0) {
            return Interval::entire();
        }
        let reciprocal = Interval::rounded(1.0 / rhs.upper, 1.0 / rhs.lower);
        self * reciprocal
    }
}

impl Neg for Interval {
    type Output = Interval;

    fn neg(self) -> Interval {
        Interval {
            lower: -self.upper,
            upper: -self.lower,
        }
    }
}

impl From<Real> for Interval {
    fn from(x: Real) -> Self {
        Interval::point(x)
    }
}

impl fmt::Debug for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.lower, self.upper)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.lower, self.upper)
    }
}
