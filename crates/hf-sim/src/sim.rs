//! Hybrid simulator and trajectory recording.

use core::fmt;

use hf_automaton::{
    CompositeHybridAutomaton, CompositeTransition, HybridBoundedConstraintSet, HybridTime,
};
use hf_core::{DiscreteLocation, Real, Valuation};

use crate::error::{SimError, SimResult};
use crate::integrator::IntegratorType;
use crate::model::ModeFlow;

/// Options for simulation runs.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulatorConfiguration {
    /// Fixed time step (seconds)
    pub step_size: f64,
    /// Integrator type (default: RK4)
    pub integrator: IntegratorType,
    /// Width of the time bracket at which crossing bisection stops (seconds)
    pub crossing_tolerance: f64,
    /// Maximum bisection rounds per guard crossing
    pub max_bisections: usize,
    /// Record every N-th step (decimation); transitions are always recorded
    pub record_every: usize,
}

impl Default for SimulatorConfiguration {
    fn default() -> Self {
        Self {
            step_size: 1e-3,
            integrator: IntegratorType::default(),
            crossing_tolerance: 1e-12,
            max_bisections: 64,
            record_every: 1,
        }
    }
}

impl SimulatorConfiguration {
    pub fn set_step_size(&mut self, step_size: f64) -> &mut Self {
        self.step_size = step_size;
        self
    }

    pub fn set_integrator(&mut self, integrator: IntegratorType) -> &mut Self {
        self.integrator = integrator;
        self
    }

    pub fn validate(&self) -> SimResult<()> {
        if !(self.step_size > 0.0) || !self.step_size.is_finite() {
            return Err(SimError::InvalidArg {
                what: "step_size must be positive",
            });
        }
        if !(self.crossing_tolerance > 0.0) {
            return Err(SimError::InvalidArg {
                what: "crossing_tolerance must be positive",
            });
        }
        if self.record_every == 0 {
            return Err(SimError::InvalidArg {
                what: "record_every must be positive",
            });
        }
        Ok(())
    }
}

impl fmt::Display for SimulatorConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SimulatorConfiguration(step_size={}, integrator={:?}, crossing_tolerance={}, max_bisections={}, record_every={})",
            self.step_size,
            self.integrator,
            self.crossing_tolerance,
            self.max_bisections,
            self.record_every
        )
    }
}

/// One sample of a hybrid trajectory.
#[derive(Clone, Debug, PartialEq)]
pub struct HybridPoint {
    pub time: Real,
    /// Number of discrete events taken so far.
    pub events: usize,
    pub location: DiscreteLocation,
    pub state: Valuation<Real>,
}

/// Samples of a simulated trajectory in time order. A transition shows up as
/// two samples with the same time, before and after the jump.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HybridTrajectory {
    points: Vec<HybridPoint>,
}

impl HybridTrajectory {
    pub fn points(&self) -> &[HybridPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &HybridPoint> {
        self.points.iter()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<&HybridPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&HybridPoint> {
        self.points.last()
    }

    pub fn final_time(&self) -> Real {
        self.points.last().map_or(0.0, |p| p.time)
    }

    pub fn event_count(&self) -> usize {
        self.points.last().map_or(0, |p| p.events)
    }
}

/// Flow and urgent transitions of the location currently being simulated.
struct ActiveMode {
    location: DiscreteLocation,
    flow: ModeFlow,
    urgent: Vec<CompositeTransition>,
}

impl ActiveMode {
    fn enter(system: &CompositeHybridAutomaton, location: DiscreteLocation) -> SimResult<Self> {
        let flow = ModeFlow::new(system, &location)?;
        let urgent = system
            .transitions(&location)?
            .into_iter()
            .filter(CompositeTransition::is_urgent)
            .collect();
        Ok(Self {
            location,
            flow,
            urgent,
        })
    }

    /// First urgent transition whose guard holds at `x`.
    fn enabled(&self, x: &[Real]) -> SimResult<Option<&CompositeTransition>> {
        let env = self.flow.lookup(x);
        for transition in &self.urgent {
            let holds = match &transition.guard {
                Some(guard) => guard.holds(&env)?,
                None => true,
            };
            if holds {
                return Ok(Some(transition));
            }
        }
        Ok(None)
    }

    fn point(&self, time: Real, events: usize, x: &[Real]) -> HybridPoint {
        HybridPoint {
            time,
            events,
            location: self.location.clone(),
            state: self.flow.unpack(x),
        }
    }
}

/// Computes one best-estimate trajectory of a composite automaton.
///
/// The trajectory starts from the midpoint of the initial set. Urgent
/// transitions fire as soon as their guard holds; crossings inside a step
/// are located by bisection. Permissive transitions are never forced.
pub struct HybridSimulator<'a> {
    system: &'a CompositeHybridAutomaton,
    configuration: SimulatorConfiguration,
}

impl<'a> HybridSimulator<'a> {
    pub fn new(system: &'a CompositeHybridAutomaton) -> Self {
        Self {
            system,
            configuration: SimulatorConfiguration::default(),
        }
    }

    pub fn configuration(&self) -> &SimulatorConfiguration {
        &self.configuration
    }

    pub fn configuration_mut(&mut self) -> &mut SimulatorConfiguration {
        &mut self.configuration
    }

    /// Simulate from `initial_set` until `final_time`.
    ///
    /// Never reports a time beyond `final_time.continuous_time()` nor more
    /// events than `final_time.discrete_time()`: a transition that would
    /// exceed the event bound ends the trajectory instead.
    pub fn orbit(
        &self,
        initial_set: &HybridBoundedConstraintSet,
        final_time: &HybridTime,
    ) -> SimResult<HybridTrajectory> {
        let config = &self.configuration;
        config.validate()?;
        initial_set.check_against(self.system)?;

        let t_end = final_time.continuous_time();
        let max_events = final_time.discrete_time();

        let mut mode = ActiveMode::enter(self.system, initial_set.location().clone())?;
        let mut x = mode.flow.pack(&initial_set.midpoint())?;
        let mut t = 0.0;
        let mut events = 0usize;
        let mut step = 0usize;
        let mut points = vec![mode.point(t, events, &x)];
        let mut recorded = true;

        'evolution: loop {
            while let Some(transition) = mode.enabled(&x)?.cloned() {
                if events >= max_events {
                    tracing::debug!(t, events, "discrete horizon reached");
                    break 'evolution;
                }
                if !recorded {
                    points.push(mode.point(t, events, &x));
                }
                let values = self.apply_reset(&transition, &mode, &x)?;
                mode = ActiveMode::enter(self.system, transition.target.clone())?;
                x = mode.flow.pack(&values)?;
                events += 1;
                tracing::debug!(t, event = %transition.event, location = %mode.location, "transition");
                points.push(mode.point(t, events, &x));
                recorded = true;
            }

            if t >= t_end {
                break;
            }

            let remaining = t_end - t;
            let h = config.step_size.min(remaining);
            let x_next = config.integrator.step(&mode.flow, t, &x, h)?;
            let (dt, x_new, crossed) = if mode.enabled(&x_next)?.is_some() {
                let (dt, x_cross) = self.locate_crossing(&mode, t, &x, h, x_next)?;
                (dt, x_cross, true)
            } else {
                (h, x_next, false)
            };

            t = if dt >= remaining { t_end } else { t + dt };
            x = x_new;
            if x.iter().any(|v| !v.is_finite()) {
                return Err(SimError::NonFinite {
                    what: format!("state {} at {}", mode.flow.unpack(&x), mode.location),
                    time: t,
                });
            }

            step += 1;
            recorded = crossed || step % config.record_every == 0;
            if recorded {
                points.push(mode.point(t, events, &x));
            }
        }

        if !recorded {
            points.push(mode.point(t, events, &x));
        }

        tracing::debug!(
            points = points.len(),
            events,
            final_time = t,
            "simulation finished"
        );
        Ok(HybridTrajectory { points })
    }

    /// Values right after `transition`. Variables without a reset keep
    /// their value.
    fn apply_reset(
        &self,
        transition: &CompositeTransition,
        mode: &ActiveMode,
        x: &[Real],
    ) -> SimResult<Valuation<Real>> {
        let env = mode.flow.lookup(x);
        let mut values = mode.flow.unpack(x);
        for reset in &transition.resets {
            let value = reset.expr.evaluate::<Real>(&env)?;
            values.insert(reset.variable.name(), value);
        }
        Ok(values)
    }

    /// Bisect the step `[t, t+h]` for the earliest time at which an urgent
    /// guard holds. Returns the elapsed time and the state at that time.
    fn locate_crossing(
        &self,
        mode: &ActiveMode,
        t: Real,
        x: &[Real],
        h: Real,
        x_end: Vec<Real>,
    ) -> SimResult<(Real, Vec<Real>)> {
        let config = &self.configuration;
        let start = x.to_vec();
        let (mut lo, mut hi) = (0.0, h);
        let mut x_hi = x_end;
        for _ in 0..config.max_bisections {
            if hi - lo <= config.crossing_tolerance {
                break;
            }
            let mid = 0.5 * (lo + hi);
            let x_mid = config.integrator.step(&mode.flow, t, &start, mid)?;
            if mode.enabled(&x_mid)?.is_some() {
                hi = mid;
                x_hi = x_mid;
            } else {
                lo = mid;
            }
        }
        Ok((hi, x_hi))
    }
}
