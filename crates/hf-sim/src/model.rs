//! Continuous dynamics of one composite location.

use hf_automaton::CompositeHybridAutomaton;
use hf_core::{DiscreteLocation, Expr, Real, Valuation};

use crate::error::{SimError, SimResult};

/// Trait for continuous-time models advanced by an [`crate::Integrator`].
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Vector arithmetic for integration: add states, scale by scalar
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Compute state derivative dxdt = f(t, x).
    fn rhs(&self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;
}

/// Flow equations of a composite location, with the state stored as a
/// vector ordered like [`ModeFlow::names`].
#[derive(Clone, Debug)]
pub struct ModeFlow {
    names: Vec<String>,
    rates: Vec<Expr>,
}

impl ModeFlow {
    pub fn new(system: &CompositeHybridAutomaton, location: &DiscreteLocation) -> SimResult<Self> {
        let dynamics = system.dynamics(location)?;
        let (names, rates): (Vec<String>, Vec<Expr>) = dynamics
            .into_iter()
            .map(|eq| (eq.variable.name().to_string(), eq.expr))
            .unzip();
        Ok(Self { names, rates })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn dimension(&self) -> usize {
        self.names.len()
    }

    /// Pack the values of this location's variables into a state vector.
    pub fn pack(&self, values: &Valuation<Real>) -> SimResult<Vec<Real>> {
        self.names
            .iter()
            .map(|n| {
                values.get(n).copied().ok_or_else(|| {
                    SimError::Evaluation(hf_core::HfError::UnknownVariable { name: n.clone() })
                })
            })
            .collect()
    }

    pub fn unpack(&self, x: &[Real]) -> Valuation<Real> {
        self.names
            .iter()
            .cloned()
            .zip(x.iter().copied())
            .collect()
    }

    /// Lookup closure over a packed state vector.
    pub fn lookup<'a>(&'a self, x: &'a [Real]) -> impl Fn(&str) -> Option<Real> + 'a {
        move |name: &str| {
            self.names
                .iter()
                .position(|n| n == name)
                .and_then(|i| x.get(i).copied())
        }
    }
}

impl TransientModel for ModeFlow {
    type State = Vec<Real>;

    fn rhs(&self, _t: f64, x: &Self::State) -> SimResult<Self::State> {
        let env = self.lookup(x);
        self.rates
            .iter()
            .map(|rate| rate.evaluate::<Real>(&env).map_err(SimError::from))
            .collect()
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        a.iter().map(|x| x * scale).collect()
    }
}
