//! Fixed-step time integrators.

use crate::error::SimResult;
use crate::model::TransientModel;

/// One fixed step of an explicit scheme.
pub trait Integrator {
    /// State of `model` at `t + dt`, starting from `x` at `t`.
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Classical fourth-order Runge-Kutta.
    #[default]
    RK4,
    ForwardEuler,
}

impl IntegratorType {
    pub fn step<M: TransientModel>(
        self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        match self {
            IntegratorType::RK4 => RK4.step(model, t, x, dt),
            IntegratorType::ForwardEuler => ForwardEuler.step(model, t, x, dt),
        }
    }
}

/// `x + sum(w_i * k_i)`
fn combine<M: TransientModel>(model: &M, x: &M::State, terms: &[(&M::State, f64)]) -> M::State {
    terms
        .iter()
        .fold(x.clone(), |acc, (k, w)| model.add(&acc, &model.scale(k, *w)))
}

#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let half = 0.5 * dt;
        let k1 = model.rhs(t, x)?;
        let k2 = model.rhs(t + half, &combine(model, x, &[(&k1, half)]))?;
        let k3 = model.rhs(t + half, &combine(model, x, &[(&k2, half)]))?;
        let k4 = model.rhs(t + dt, &combine(model, x, &[(&k3, dt)]))?;
        let (sixth, third) = (dt / 6.0, dt / 3.0);
        Ok(combine(
            model,
            x,
            &[(&k1, sixth), (&k2, third), (&k3, third), (&k4, sixth)],
        ))
    }
}

/// First order, one derivative evaluation per step.
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let rate = model.rhs(t, x)?;
        Ok(combine(model, x, &[(&rate, dt)]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// dx/dt = -x
    struct Decay;

    impl TransientModel for Decay {
        type State = f64;

        fn rhs(&self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(-x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }
    }

    #[test]
    fn rk4_matches_exponential_decay() {
        let mut x = 1.0;
        let dt = 0.01;
        for i in 0..100 {
            x = RK4.step(&Decay, i as f64 * dt, &x, dt).unwrap();
        }
        assert!((x - (-1.0f64).exp()).abs() < 1e-9);
    }

    #[test]
    fn euler_is_first_order() {
        let x = ForwardEuler.step(&Decay, 0.0, &1.0, 0.1).unwrap();
        assert!((x - 0.9).abs() < 1e-15);
        let y = IntegratorType::ForwardEuler.step(&Decay, 0.0, &1.0, 0.1).unwrap();
        assert_eq!(x, y);
    }
}
