//! Interval enclosures of the flow of one composite location.
//!
//! Over a step of length `h`, an a priori box `B` with
//! `X + [0,h]·f(B) ⊆ B` contains every solution starting in `X`. The set at
//! the end of the step is enclosed both by `X + h·f(B)` and by the
//! second-order expansion `X + h·f(X) + h²/2·(Df·f)(B)`; the step keeps
//! their intersection.

use hf_automaton::{CompositeHybridAutomaton, CompositeTransition};
use hf_core::{DiscreteLocation, Expr, Interval, Real, Valuation};

use crate::error::{EvolveError, EvolveResult};

/// Result of a successful a priori search.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowStep {
    /// Encloses every state reached during the step.
    pub apriori: Valuation<Interval>,
    /// Encloses every state reached at the end of the step.
    pub end: Valuation<Interval>,
}

#[derive(Clone, Debug)]
pub struct IntervalFlow {
    location: DiscreteLocation,
    rates: Vec<(String, Expr)>,
    /// Second time derivative of each variable along the flow.
    curvatures: Vec<(String, Expr)>,
}

impl IntervalFlow {
    pub fn new(system: &CompositeHybridAutomaton, location: &DiscreteLocation) -> EvolveResult<Self> {
        let rates: Vec<(String, Expr)> = system
            .dynamics(location)?
            .into_iter()
            .map(|eq| (eq.variable.name().to_string(), eq.expr))
            .collect();
        let curvatures = rates
            .iter()
            .map(|(name, rate)| (name.clone(), rate.lie_derivative(&rates)))
            .collect();
        Ok(Self {
            location: location.clone(),
            rates,
            curvatures,
        })
    }

    pub fn location(&self) -> &DiscreteLocation {
        &self.location
    }

    /// Interval evaluation of the vector field over `region`.
    pub fn derivative(&self, region: &Valuation<Interval>) -> EvolveResult<Valuation<Interval>> {
        let env = region.lookup();
        self.rates
            .iter()
            .map(|(name, rate)| {
                rate.evaluate::<Interval>(&env)
                    .map(|value| (name.clone(), value))
                    .map_err(EvolveError::from)
            })
            .collect()
    }

    /// `x + factor·f(region)`, variable by variable.
    ///
    /// With `region` an a priori box of the flow from `x` over `[0, T]` and
    /// `factor ⊆ [0, T]`, this encloses the states reached after any
    /// duration in `factor`.
    pub fn advance(
        &self,
        x: &Valuation<Interval>,
        factor: Interval,
        region: &Valuation<Interval>,
    ) -> EvolveResult<Valuation<Interval>> {
        let rates = self.derivative(region)?;
        shifted(x, factor, &rates)
    }

    /// `x + h·f(x) + h²/2·(Df·f)(region)`.
    fn second_order(
        &self,
        x: &Valuation<Interval>,
        h: Real,
        region: &Valuation<Interval>,
    ) -> EvolveResult<Valuation<Interval>> {
        let first = self.advance(x, Interval::point(h), x)?;
        let env = region.lookup();
        let curvature = self
            .curvatures
            .iter()
            .map(|(name, expr)| {
                expr.evaluate::<Interval>(&env)
                    .map(|value| (name.clone(), value))
                    .map_err(EvolveError::from)
            })
            .collect::<EvolveResult<Valuation<Interval>>>()?;
        let half_square = Interval::point(h) * Interval::point(h) * Interval::point(0.5);
        shifted(&first, half_square, &curvature)
    }

    /// Enclose the flow from `x` over `[0, h]` by Picard iteration.
    pub fn step(
        &self,
        x: &Valuation<Interval>,
        h: Real,
        iterations: usize,
        inflation: Real,
        time: Real,
    ) -> EvolveResult<FlowStep> {
        let span = Interval::new(0.0, h);
        let mut apriori = widen(&self.advance(x, span, x)?, inflation);
        for _ in 0..iterations {
            let candidate = self.advance(x, span, &apriori)?;
            if candidate.is_subset_of(&apriori) {
                let euler = self.advance(x, Interval::point(h), &candidate)?;
                let end = narrowed(&euler, &self.second_order(x, h, &candidate)?);
                return Ok(FlowStep {
                    apriori: candidate,
                    end,
                });
            }
            apriori = widen(&apriori.hull(&candidate), inflation);
        }
        Err(EvolveError::PicardNonConvergence {
            iterations,
            time,
            location: self.location.to_string(),
        })
    }
}

/// `x + factor·rates`, variable by variable.
fn shifted(
    x: &Valuation<Interval>,
    factor: Interval,
    rates: &Valuation<Interval>,
) -> EvolveResult<Valuation<Interval>> {
    let mut out = x.clone();
    for (name, rate) in rates.iter() {
        let start = x.get(name).copied().ok_or_else(|| {
            EvolveError::Evaluation(hf_core::HfError::UnknownVariable {
                name: name.to_string(),
            })
        })?;
        out.insert(name, start + factor * *rate);
    }
    Ok(out)
}

/// Intersection of two enclosures of the same set. A variable whose
/// intervals do not meet keeps the value from `a`.
fn narrowed(a: &Valuation<Interval>, b: &Valuation<Interval>) -> Valuation<Interval> {
    a.iter()
        .map(|(name, iv)| {
            let value = b
                .get(name)
                .and_then(|other| iv.intersection(other))
                .unwrap_or(*iv);
            (name.to_string(), value)
        })
        .collect()
}

/// Widen every interval by a fraction of its width plus a few ulps.
pub(crate) fn widen(region: &Valuation<Interval>, inflation: Real) -> Valuation<Interval> {
    region.map(|iv| iv.inflate(inflation * iv.width() + Real::EPSILON * (1.0 + iv.mag())))
}

/// Image of `region` under the resets of `transition`, restricted to the
/// variables of the target location. Variables without a reset keep their
/// values.
pub fn apply_reset(
    transition: &CompositeTransition,
    region: &Valuation<Interval>,
    target_variables: &[String],
) -> EvolveResult<Valuation<Interval>> {
    let env = region.lookup();
    let mut image = region.clone();
    for reset in &transition.resets {
        image.insert(reset.variable.name(), reset.expr.evaluate::<Interval>(&env)?);
    }
    target_variables
        .iter()
        .map(|name| {
            image.get(name).copied().map(|iv| (name.clone(), iv)).ok_or_else(|| {
                EvolveError::Evaluation(hf_core::HfError::UnknownVariable { name: name.clone() })
            })
        })
        .collect()
}
