use hf_automaton::{
    CompositeHybridAutomaton, EventKind, HybridAutomaton, HybridBoundedConstraintSet, HybridTime,
    between, equal,
};
use hf_core::expr::{dot, next};
use hf_core::{DiscreteEvent, Expr, Interval, RealVariable, StringVariable};
use hf_evolve::{EvolveError, GeneralHybridEvolver, Orbit, Semantics};
use hf_sim::{HybridPoint, HybridSimulator};

fn sawtooth() -> CompositeHybridAutomaton {
    let ramp = StringVariable::new("ramp");
    let x = RealVariable::new("x");
    let mut a = HybridAutomaton::new(ramp.name());
    a.new_mode(ramp.at("up"), vec![dot(&x, 1.0)]).unwrap();
    a.new_mode(ramp.at("down"), vec![dot(&x, -1.0)]).unwrap();
    a.new_transition(
        &ramp.at("up"),
        &DiscreteEvent::new("peak"),
        &ramp.at("down"),
        Some(Expr::from(&x).ge(1.0)),
        vec![next(&x, &x)],
        EventKind::Urgent,
    )
    .unwrap();
    a.new_transition(
        &ramp.at("down"),
        &DiscreteEvent::new("trough"),
        &ramp.at("up"),
        Some(Expr::from(&x).le(0.0)),
        vec![next(&x, &x)],
        EventKind::Urgent,
    )
    .unwrap();
    CompositeHybridAutomaton::new("sawtooth", vec![a]).unwrap()
}

fn initial() -> HybridBoundedConstraintSet {
    let up = StringVariable::new("ramp").at("up");
    HybridBoundedConstraintSet::new([&up], vec![equal(&RealVariable::new("x"), 0.5)]).unwrap()
}

fn covered(orbit: &Orbit, point: &HybridPoint, tolerance: f64) -> bool {
    orbit
        .reach
        .iter()
        .chain(&orbit.final_enclosures)
        .filter(|e| e.location == point.location)
        .filter(|e| e.time.inflate(tolerance).contains(point.time))
        .any(|e| {
            point.state.iter().all(|(name, value)| {
                e.state
                    .get(name)
                    .is_some_and(|iv| iv.inflate(tolerance).contains(*value))
            })
        })
}

#[test]
fn upper_semantics_contains_simulated_trajectory() {
    let system = sawtooth();
    let horizon = HybridTime::new(3.25, 100).unwrap();

    let mut evolver = GeneralHybridEvolver::new(&system);
    evolver
        .configuration_mut()
        .set_maximum_enclosure_radius(10.0)
        .set_maximum_step_size(0.01);
    let orbit = evolver.orbit(&initial(), &horizon, Semantics::Upper).unwrap();

    let mut simulator = HybridSimulator::new(&system);
    simulator.configuration_mut().set_step_size(0.001);
    let trajectory = simulator.orbit(&initial(), &horizon).unwrap();

    assert_eq!(trajectory.event_count(), 3);
    for point in trajectory.iter() {
        assert!(
            covered(&orbit, point, 1e-9),
            "simulated point t={} {} {} not covered",
            point.time,
            point.location,
            point.state
        );
    }
}

#[test]
fn respects_hybrid_time_bounds() {
    let system = sawtooth();
    let mut evolver = GeneralHybridEvolver::new(&system);
    evolver.configuration_mut().set_maximum_step_size(0.01);

    let orbit = evolver
        .orbit(&initial(), &HybridTime::new(2.0, 100).unwrap(), Semantics::Upper)
        .unwrap();
    assert!(orbit.final_time() <= 2.0);
    assert!(!orbit.final_enclosures.is_empty());
    assert!(orbit.final_enclosures.iter().all(|e| e.time.upper() <= 2.0));

    let orbit = evolver
        .orbit(&initial(), &HybridTime::new(10.0, 1).unwrap(), Semantics::Upper)
        .unwrap();
    assert!(orbit.max_events() <= 1);
    // The second switch is blocked, so evolution ends well before t=10.
    assert!(orbit.final_time() < 2.0);
    assert!(!orbit.final_enclosures.is_empty());
}

#[test]
fn lower_semantics_follows_a_single_branch() {
    let system = sawtooth();
    let mut evolver = GeneralHybridEvolver::new(&system);
    evolver.configuration_mut().set_maximum_step_size(0.01);

    let orbit = evolver
        .orbit(&initial(), &HybridTime::new(3.25, 100).unwrap(), Semantics::Lower)
        .unwrap();
    assert_eq!(orbit.final_time(), 3.25);
    assert_eq!(orbit.max_events(), 3);
    assert!(orbit.reach.iter().all(|e| e.events.0 == e.events.1));
    assert_eq!(orbit.final_enclosures.len(), 1);
}

#[test]
fn signals_enclosure_radius_overflow() {
    let mode = StringVariable::new("m");
    let x = RealVariable::new("x");
    let mut a = HybridAutomaton::new(mode.name());
    a.new_mode(mode.at("a"), vec![dot(&x, &x)]).unwrap();
    let system = CompositeHybridAutomaton::new("growth", vec![a]).unwrap();
    let set = HybridBoundedConstraintSet::new([&mode.at("a")], vec![between(0.0, &x, 1.0)]).unwrap();

    let mut evolver = GeneralHybridEvolver::new(&system);
    evolver
        .configuration_mut()
        .set_maximum_enclosure_radius(2.0)
        .set_maximum_step_size(0.01);
    let err = evolver
        .orbit(&set, &HybridTime::new(5.0, 0).unwrap(), Semantics::Upper)
        .unwrap_err();
    match err {
        EvolveError::EnclosureRadiusExceeded { radius, maximum, time, .. } => {
            assert_eq!(maximum, 2.0);
            assert!(radius > 2.0);
            assert!(time > 1.0 && time < 2.0, "overflow at t={time}");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn band_spanning_set_stays_bounded() {
    let system = sawtooth();
    let up = StringVariable::new("ramp").at("up");
    let x = RealVariable::new("x");
    let set = HybridBoundedConstraintSet::new([&up], vec![between(-0.5, &x, 1.5)]).unwrap();

    let mut evolver = GeneralHybridEvolver::new(&system);
    evolver
        .configuration_mut()
        .set_maximum_enclosure_radius(10.0)
        .set_maximum_step_size(0.01);
    let orbit = evolver
        .orbit(&set, &HybridTime::new(3.0, 100).unwrap(), Semantics::Upper)
        .unwrap();

    assert_eq!(orbit.final_time(), 3.0);
    assert!(orbit.max_events() <= 100);
    assert!(!orbit.final_enclosures.is_empty());
    let band = Interval::new(-0.1, 1.1);
    for enclosure in &orbit.final_enclosures {
        let value = enclosure.state.get("x").unwrap();
        assert!(
            value.is_subset_of(&band),
            "{} holds x in {value}",
            enclosure.location
        );
    }
}
