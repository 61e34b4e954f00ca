//! Flow-tube evolution of a composite hybrid automaton.

use std::collections::BTreeMap;

use hf_automaton::{
    AutomatonError, CompositeHybridAutomaton, CompositeTransition, HybridBoundedConstraintSet,
    HybridTime,
};
use hf_core::{DiscreteLocation, Interval, Predicate, Real, Tribool, Valuation};

use crate::config::{EvolverConfiguration, Semantics};
use crate::enclosure::{Enclosure, Orbit};
use crate::error::{EvolveError, EvolveResult};
use crate::flow::{IntervalFlow, apply_reset, widen};

/// Bisections of a step while locating a guard crossing.
const MAX_CROSSING_DEPTH: usize = 16;

/// Bisections of a box while restricting it to a guard.
const GUARD_SPLIT_DEPTH: usize = 8;

/// Flow, outgoing transitions and variables of one composite location.
struct LocationData {
    flow: IntervalFlow,
    transitions: Vec<CompositeTransition>,
    variables: Vec<String>,
}

type Modes = BTreeMap<DiscreteLocation, LocationData>;

type EnclosureMap = BTreeMap<DiscreteLocation, Enclosure>;

fn merge_into(map: &mut EnclosureMap, enclosure: Enclosure) {
    match map.get_mut(&enclosure.location) {
        Some(existing) => existing.merge(&enclosure),
        None => {
            map.insert(enclosure.location.clone(), enclosure);
        }
    }
}

/// Widen the event range recorded for `location`, if any.
fn note_events(map: &mut EnclosureMap, location: &DiscreteLocation, events: (usize, usize)) {
    if let Some(existing) = map.get_mut(location) {
        existing.events = (
            existing.events.0.min(events.0),
            existing.events.1.max(events.1),
        );
    }
}

fn guard_state(
    transition: &CompositeTransition,
    region: &Valuation<Interval>,
) -> EvolveResult<Tribool> {
    match &transition.guard {
        Some(guard) => Ok(guard.decide::<Interval>(&region.lookup())?),
        None => Ok(Tribool::True),
    }
}

fn jumped(events: (usize, usize), max_events: usize) -> Option<(usize, usize)> {
    (events.0 < max_events).then(|| (events.0 + 1, (events.1 + 1).min(max_events)))
}

fn bisect_widest(
    region: &Valuation<Interval>,
) -> Option<(Valuation<Interval>, Valuation<Interval>)> {
    let (name, iv) = region
        .iter()
        .max_by(|a, b| a.1.width().total_cmp(&b.1.width()))
        .map(|(name, iv)| (name.to_string(), *iv))?;
    if !(iv.width() > 0.0) {
        return None;
    }
    let (lo, hi) = iv.bisect();
    let mut left = region.clone();
    left.insert(name.clone(), lo);
    let mut right = region.clone();
    right.insert(name, hi);
    Some((left, right))
}

/// Hull of the parts of `region` on which `predicate` may hold, found by
/// bisecting along the widest variable; `None` if it holds nowhere.
fn possible_region(
    predicate: &Predicate,
    region: &Valuation<Interval>,
) -> EvolveResult<Option<Valuation<Interval>>> {
    let mut kept: Option<Valuation<Interval>> = None;
    let mut pieces = vec![(region.clone(), 0usize)];
    while let Some((piece, depth)) = pieces.pop() {
        match predicate.decide::<Interval>(&piece.lookup())? {
            Tribool::False => continue,
            Tribool::Indeterminate if depth < GUARD_SPLIT_DEPTH => {
                if let Some((left, right)) = bisect_widest(&piece) {
                    pieces.push((left, depth + 1));
                    pieces.push((right, depth + 1));
                    continue;
                }
            }
            _ => {}
        }
        kept = Some(match kept {
            Some(hull) => hull.hull(&piece),
            None => piece,
        });
    }
    Ok(kept)
}

/// Part of `region` from which `transition` may be taken.
fn guard_region(
    transition: &CompositeTransition,
    region: &Valuation<Interval>,
) -> EvolveResult<Option<Valuation<Interval>>> {
    match &transition.guard {
        Some(guard) => possible_region(guard, region),
        None => Ok(Some(region.clone())),
    }
}

/// The grid step being computed and the sets it produces.
struct GridStep {
    t: Real,
    t_next: Real,
    max_events: usize,
    reach: EnclosureMap,
    next: EnclosureMap,
}

impl GridStep {
    fn h(&self) -> Real {
        self.t_next - self.t
    }

    fn add_reach(
        &mut self,
        location: &DiscreteLocation,
        events: (usize, usize),
        state: Valuation<Interval>,
    ) {
        let span = Interval::new(self.t, self.t_next);
        merge_into(
            &mut self.reach,
            Enclosure::new(span, location.clone(), events, state),
        );
    }

    fn add_next(
        &mut self,
        location: &DiscreteLocation,
        events: (usize, usize),
        state: Valuation<Interval>,
    ) {
        let at_end = Interval::point(self.t_next);
        merge_into(
            &mut self.next,
            Enclosure::new(at_end, location.clone(), events, state),
        );
    }
}

/// Computes a flow tube of time-stamped enclosures on a fixed time grid.
///
/// Sets in the same location at the same grid time are merged, so the tube
/// holds at most one enclosure per location and step. A set on which an
/// urgent guard definitely holds jumps as a whole. Under
/// [`Semantics::Upper`] a step whose a priori box may meet a guard is
/// bisected in time around the crossing; every sub-step on which the guard
/// may hold spawns a branch from the part of its box inside the guard.
pub struct GeneralHybridEvolver<'a> {
    system: &'a CompositeHybridAutomaton,
    configuration: EvolverConfiguration,
}

impl<'a> GeneralHybridEvolver<'a> {
    pub fn new(system: &'a CompositeHybridAutomaton) -> Self {
        Self {
            system,
            configuration: EvolverConfiguration::default(),
        }
    }

    pub fn configuration(&self) -> &EvolverConfiguration {
        &self.configuration
    }

    pub fn configuration_mut(&mut self) -> &mut EvolverConfiguration {
        &mut self.configuration
    }

    pub fn system(&self) -> &CompositeHybridAutomaton {
        self.system
    }

    /// Evolve `initial_set` up to `final_time`.
    ///
    /// No enclosure extends past `final_time.continuous_time()`. A jump that
    /// would exceed `final_time.discrete_time()` events is discarded and the
    /// set it started from is reported as final.
    pub fn orbit(
        &self,
        initial_set: &HybridBoundedConstraintSet,
        final_time: &HybridTime,
        semantics: Semantics,
    ) -> EvolveResult<Orbit> {
        let config = &self.configuration;
        config.validate()?;
        initial_set.check_against(self.system)?;
        let modes = self.location_data()?;

        let t_end = final_time.continuous_time();
        let max_events = final_time.discrete_time();
        tracing::debug!(%config, %semantics, t_end, max_events, "starting evolution");

        let start = Enclosure::new(
            Interval::point(0.0),
            initial_set.location().clone(),
            (0, 0),
            initial_set.bounding_box(),
        );
        let mut current = EnclosureMap::new();
        current.insert(start.location.clone(), start);

        let mut orbit = Orbit::default();
        let mut t = 0.0;
        let mut steps = 0usize;
        loop {
            current = self.settle(&modes, current, t, semantics, max_events, &mut orbit)?;
            orbit.evolve.extend(current.values().cloned());
            if current.is_empty() {
                break;
            }
            if t >= t_end {
                orbit.final_enclosures.extend(current.into_values());
                break;
            }

            let t_next = if config.maximum_step_size >= t_end - t {
                t_end
            } else {
                t + config.maximum_step_size
            };
            let mut grid = GridStep {
                t,
                t_next,
                max_events,
                reach: EnclosureMap::new(),
                next: EnclosureMap::new(),
            };
            for enclosure in current.values() {
                self.advance(&modes, enclosure, semantics, &mut grid)?;
            }
            orbit.reach.extend(grid.reach.into_values());
            current = grid.next;
            t = t_next;

            steps += 1;
            if steps % 1000 == 0 {
                let radius = current.values().map(Enclosure::radius).fold(0.0, Real::max);
                tracing::debug!(t, steps, sets = current.len(), radius, "evolution progress");
            }
        }

        tracing::debug!(
            steps,
            reach = orbit.reach.len(),
            finals = orbit.final_enclosures.len(),
            "evolution finished"
        );
        Ok(orbit)
    }

    fn location_data(&self) -> EvolveResult<Modes> {
        let mut modes = BTreeMap::new();
        for location in self.system.locations()? {
            let data = LocationData {
                flow: IntervalFlow::new(self.system, &location)?,
                transitions: self.system.transitions(&location)?,
                variables: self
                    .system
                    .state_variables(&location)?
                    .iter()
                    .map(|v| v.name().to_string())
                    .collect(),
            };
            modes.insert(location, data);
        }
        Ok(modes)
    }

    fn mode<'m>(
        &self,
        modes: &'m Modes,
        location: &DiscreteLocation,
    ) -> EvolveResult<&'m LocationData> {
        modes.get(location).ok_or_else(|| {
            EvolveError::Model(AutomatonError::UnknownLocation {
                composite: self.system.name().to_string(),
                location: location.to_string(),
            })
        })
    }

    fn check_radius(
        &self,
        state: &Valuation<Interval>,
        time: Real,
        location: &DiscreteLocation,
    ) -> EvolveResult<()> {
        let radius = state.radius();
        let maximum = self.configuration.maximum_enclosure_radius;
        if radius > maximum || radius.is_nan() {
            tracing::warn!(time, %location, radius, maximum, "enclosure too large");
            return Err(EvolveError::EnclosureRadiusExceeded {
                radius,
                maximum,
                time,
                location: location.to_string(),
            });
        }
        Ok(())
    }

    /// Transition that must be taken by the whole set right now.
    fn forced<'m>(
        &self,
        mode: &'m LocationData,
        state: &Valuation<Interval>,
        semantics: Semantics,
    ) -> EvolveResult<Option<&'m CompositeTransition>> {
        for transition in mode.transitions.iter().filter(|t| t.is_urgent()) {
            let forced = match guard_state(transition, state)? {
                Tribool::True => true,
                Tribool::False => false,
                Tribool::Indeterminate => match (semantics, &transition.guard) {
                    (Semantics::Lower, Some(guard)) => guard.holds(&state.midpoint().lookup())?,
                    _ => false,
                },
            };
            if forced {
                return Ok(Some(transition));
            }
        }
        Ok(None)
    }

    /// Apply forced jumps at time `t` until no set is forced any more.
    fn settle(
        &self,
        modes: &Modes,
        current: EnclosureMap,
        t: Real,
        semantics: Semantics,
        max_events: usize,
        orbit: &mut Orbit,
    ) -> EvolveResult<EnclosureMap> {
        let mut pending: Vec<Enclosure> = current.into_values().collect();
        let mut settled = EnclosureMap::new();
        while let Some(enclosure) = pending.pop() {
            let mode = self.mode(modes, &enclosure.location)?;
            let Some(transition) = self.forced(mode, &enclosure.state, semantics)? else {
                merge_into(&mut settled, enclosure);
                continue;
            };
            let Some(events) = jumped(enclosure.events, max_events) else {
                tracing::debug!(t, location = %enclosure.location, "event bound reached");
                orbit.final_enclosures.push(enclosure);
                continue;
            };
            let target = self.mode(modes, &transition.target)?;
            let state = apply_reset(transition, &enclosure.state, &target.variables)?;
            self.check_radius(&state, t, &transition.target)?;
            tracing::trace!(t, event = %transition.event, target = %transition.target, "forced jump");
            pending.push(Enclosure::new(
                enclosure.time,
                transition.target.clone(),
                events,
                state,
            ));
        }
        Ok(settled)
    }

    /// Flow one enclosure over the grid step, adding its reach set and its
    /// end set; under upper semantics also every jump branch.
    fn advance(
        &self,
        modes: &Modes,
        enclosure: &Enclosure,
        semantics: Semantics,
        grid: &mut GridStep,
    ) -> EvolveResult<()> {
        let config = &self.configuration;
        let mode = self.mode(modes, &enclosure.location)?;
        if semantics == Semantics::Upper {
            let window = (0.0, grid.h());
            if let Some(end) = self.cross(modes, mode, enclosure, &enclosure.state, window, 0, grid)? {
                grid.add_next(&enclosure.location, enclosure.events, end);
            }
            return Ok(());
        }

        let step = mode.flow.step(
            &enclosure.state,
            grid.h(),
            config.maximum_picard_iterations,
            config.picard_inflation,
            grid.t,
        )?;
        self.check_radius(&step.apriori, grid.t, &enclosure.location)?;
        grid.add_reach(&enclosure.location, enclosure.events, step.apriori);
        grid.add_next(&enclosure.location, enclosure.events, step.end);
        Ok(())
    }

    /// Whether some transition may leave `mode` from `region`.
    fn may_jump(
        &self,
        mode: &LocationData,
        region: &Valuation<Interval>,
        events: (usize, usize),
        max_events: usize,
    ) -> EvolveResult<bool> {
        if jumped(events, max_events).is_none() {
            return Ok(false);
        }
        for transition in &mode.transitions {
            if guard_state(transition, region)?.possibly() {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Flow `start` over the sub-interval `window` of the grid step, which
    /// is given relative to the step start. Windows whose a priori box may
    /// meet a guard are halved until the box is no wider than twice the
    /// start set. Returns what is still in the location at the end of the
    /// window, or `None` once every point has been forced out.
    #[allow(clippy::too_many_arguments)]
    fn cross(
        &self,
        modes: &Modes,
        mode: &LocationData,
        enclosure: &Enclosure,
        start: &Valuation<Interval>,
        (from, to): (Real, Real),
        depth: usize,
        grid: &mut GridStep,
    ) -> EvolveResult<Option<Valuation<Interval>>> {
        let config = &self.configuration;
        let location = &enclosure.location;
        let step = mode.flow.step(
            start,
            to - from,
            config.maximum_picard_iterations,
            config.picard_inflation,
            grid.t + from,
        )?;
        self.check_radius(&step.apriori, grid.t + from, location)?;
        let may_jump = self.may_jump(mode, &step.apriori, enclosure.events, grid.max_events)?;

        let straddles = step.apriori.radius() > 2.0 * start.radius();
        if may_jump && depth < MAX_CROSSING_DEPTH && straddles {
            let middle = from + 0.5 * (to - from);
            let Some(halfway) =
                self.cross(modes, mode, enclosure, start, (from, middle), depth + 1, grid)?
            else {
                return Ok(None);
            };
            return self.cross(modes, mode, enclosure, &halfway, (middle, to), depth + 1, grid);
        }

        grid.add_reach(location, enclosure.events, step.apriori.clone());
        if !may_jump {
            return Ok(Some(step.end));
        }
        self.spread(modes, location, &step.apriori, enclosure.events, (from, to), grid)?;
        self.surviving(mode, &step.end)
    }

    /// Part of `end` not yet forced out by an urgent guard: a state on
    /// which an urgent guard holds has already jumped.
    fn surviving(
        &self,
        mode: &LocationData,
        end: &Valuation<Interval>,
    ) -> EvolveResult<Option<Valuation<Interval>>> {
        let mut survivors = end.clone();
        for transition in mode.transitions.iter().filter(|t| t.is_urgent()) {
            let Some(guard) = &transition.guard else {
                return Ok(None);
            };
            match possible_region(&guard.clone().negate(), &survivors)? {
                Some(region) => survivors = region,
                None => return Ok(None),
            }
        }
        Ok(Some(survivors))
    }

    /// Follow the jumps out of `region`, taken during `window` of the grid
    /// step, and every further jump they enable before the step ends.
    ///
    /// Each target keeps the hull of the start sets flowed so far; a start
    /// set already covered is not flowed again. A target reached again with
    /// a larger set is widened, and the chain fails once a target has been
    /// widened more often than the Picard iteration bound.
    fn spread(
        &self,
        modes: &Modes,
        location: &DiscreteLocation,
        region: &Valuation<Interval>,
        events: (usize, usize),
        window: (Real, Real),
        grid: &mut GridStep,
    ) -> EvolveResult<()> {
        let config = &self.configuration;
        let h = grid.h();
        let mut explored: BTreeMap<DiscreteLocation, (Valuation<Interval>, (Real, Real))> =
            BTreeMap::new();
        let mut widenings: BTreeMap<DiscreteLocation, usize> = BTreeMap::new();
        let mut branches = vec![(location.clone(), region.clone(), events, window)];
        while let Some((location, region, events, window)) = branches.pop() {
            let source = self.mode(modes, &location)?;
            for transition in &source.transitions {
                let Some(jump_events) = jumped(events, grid.max_events) else {
                    continue;
                };
                let Some(active) = guard_region(transition, &region)? else {
                    continue;
                };
                let target = self.mode(modes, &transition.target)?;
                let mut start = apply_reset(transition, &active, &target.variables)?;
                let mut window = window;
                if let Some((seen, seen_window)) = explored.get(&transition.target) {
                    if start.is_subset_of(seen)
                        && seen_window.0 <= window.0
                        && window.1 <= seen_window.1
                    {
                        note_events(&mut grid.reach, &transition.target, jump_events);
                        note_events(&mut grid.next, &transition.target, jump_events);
                        continue;
                    }
                    let count = widenings.entry(transition.target.clone()).or_insert(0);
                    *count += 1;
                    if *count > config.maximum_picard_iterations {
                        return Err(EvolveError::JumpChainNonConvergence {
                            widenings: *count,
                            time: grid.t,
                            location: transition.target.to_string(),
                        });
                    }
                    start = widen(&seen.hull(&start), config.picard_inflation);
                    window = (seen_window.0.min(window.0), seen_window.1.max(window.1));
                }
                explored.insert(transition.target.clone(), (start.clone(), window));

                let remaining = h - window.0;
                let flowed = target.flow.step(
                    &start,
                    remaining,
                    config.maximum_picard_iterations,
                    config.picard_inflation,
                    grid.t + window.0,
                )?;
                self.check_radius(&flowed.apriori, grid.t + window.0, &transition.target)?;
                let end = target.flow.advance(
                    &start,
                    Interval::new((h - window.1).max(0.0), remaining),
                    &flowed.apriori,
                )?;
                tracing::trace!(
                    t = grid.t,
                    event = %transition.event,
                    target = %transition.target,
                    "jump branch"
                );
                grid.add_reach(&transition.target, jump_events, flowed.apriori.clone());
                grid.add_next(&transition.target, jump_events, end);
                branches.push((
                    transition.target.clone(),
                    flowed.apriori,
                    jump_events,
                    (window.0, h),
                ));
            }
        }
        Ok(())
    }
}
