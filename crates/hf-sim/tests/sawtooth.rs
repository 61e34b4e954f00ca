use hf_automaton::{
    CompositeHybridAutomaton, EventKind, HybridAutomaton, HybridBoundedConstraintSet, HybridTime,
    between, equal,
};
use hf_core::expr::{dot, next};
use hf_core::{DiscreteEvent, Expr, RealVariable, StringVariable};
use hf_sim::{HybridSimulator, SimError};
use proptest::prelude::*;

/// x rises at unit rate to 1, then falls at unit rate to 0, and so on.
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
        vec![],
        EventKind::Urgent,
    )
    .unwrap();
    CompositeHybridAutomaton::new("sawtooth", vec![a]).unwrap()
}

fn initial(x0: f64) -> HybridBoundedConstraintSet {
    let up = StringVariable::new("ramp").at("up");
    HybridBoundedConstraintSet::new([&up], vec![equal(&RealVariable::new("x"), x0)]).unwrap()
}

#[test]
fn switches_at_guard_crossings() {
    let system = sawtooth();
    let mut simulator = HybridSimulator::new(&system);
    simulator.configuration_mut().set_step_size(0.01);

    let horizon = HybridTime::new(3.25, 100).unwrap();
    let trajectory = simulator.orbit(&initial(0.5), &horizon).unwrap();

    assert_eq!(trajectory.event_count(), 3);
    assert_eq!(trajectory.final_time(), 3.25);
    for point in trajectory.iter() {
        let x = point.state.get("x").copied().unwrap();
        assert!((-1e-9..=1.0 + 1e-9).contains(&x), "x={x} at t={}", point.time);
        assert!(point.time <= 3.25);
    }

    // Each jump is recorded before and after, at the crossing time.
    let jumps: Vec<_> = trajectory
        .points()
        .windows(2)
        .filter(|w| w[0].events != w[1].events)
        .map(|w| (w[0].time, w[1].time))
        .collect();
    assert_eq!(jumps.len(), 3);
    for ((before, after), expected) in jumps.iter().zip([0.5, 1.5, 2.5]) {
        assert_eq!(before, after);
        assert!((before - expected).abs() < 1e-9, "jump at {before}");
    }

    let last = trajectory.last().unwrap();
    assert_eq!(last.location, StringVariable::new("ramp").at("down"));
    assert!((last.state.get("x").unwrap() - 0.25).abs() < 1e-9);
}

#[test]
fn stops_at_event_limit() {
    let system = sawtooth();
    let mut simulator = HybridSimulator::new(&system);
    simulator.configuration_mut().set_step_size(0.01);

    let horizon = HybridTime::new(10.0, 1).unwrap();
    let trajectory = simulator.orbit(&initial(0.5), &horizon).unwrap();

    assert_eq!(trajectory.event_count(), 1);
    assert!(trajectory.iter().all(|p| p.events <= 1));
    assert!((trajectory.final_time() - 1.5).abs() < 1e-9);
}

#[test]
fn starts_from_midpoint_of_initial_box() {
    let system = sawtooth();
    let simulator = HybridSimulator::new(&system);
    let up = StringVariable::new("ramp").at("up");
    let set = HybridBoundedConstraintSet::new(
        [&up],
        vec![between(0.2, &RealVariable::new("x"), 0.4)],
    )
    .unwrap();
    let trajectory = simulator
        .orbit(&set, &HybridTime::new(0.0, 0).unwrap())
        .unwrap();
    assert_eq!(trajectory.len(), 1);
    let first = trajectory.first().unwrap();
    assert_eq!(first.time, 0.0);
    assert!((first.state.get("x").unwrap() - 0.3).abs() < 1e-15);
}

#[test]
fn record_every_decimates_flow_samples() {
    let system = sawtooth();
    let mut simulator = HybridSimulator::new(&system);
    simulator.configuration_mut().set_step_size(0.01);
    simulator.configuration_mut().record_every = 10;

    let trajectory = simulator
        .orbit(&initial(0.0), &HybridTime::new(0.5, 10).unwrap())
        .unwrap();
    assert!(trajectory.len() < 15);
    assert_eq!(trajectory.final_time(), 0.5);
}

#[test]
fn reports_blow_up() {
    let mode = StringVariable::new("m");
    let x = RealVariable::new("x");
    let mut a = HybridAutomaton::new(mode.name());
    a.new_mode(mode.at("a"), vec![dot(&x, Expr::from(&x) * &x)])
        .unwrap();
    let system = CompositeHybridAutomaton::new("blowup", vec![a]).unwrap();
    let mut simulator = HybridSimulator::new(&system);
    simulator.configuration_mut().set_step_size(0.01);

    let set = HybridBoundedConstraintSet::new([&mode.at("a")], vec![equal(&x, 1.0)]).unwrap();
    let err = simulator
        .orbit(&set, &HybridTime::new(5.0, 0).unwrap())
        .unwrap_err();
    assert!(matches!(err, SimError::NonFinite { .. }));
}

#[test]
fn rejects_initial_set_for_unknown_location() {
    let system = sawtooth();
    let simulator = HybridSimulator::new(&system);
    let set = HybridBoundedConstraintSet::new(
        [&StringVariable::new("ramp").at("sideways")],
        vec![equal(&RealVariable::new("x"), 0.0)],
    )
    .unwrap();
    assert!(matches!(
        simulator.orbit(&set, &HybridTime::new(1.0, 1).unwrap()),
        Err(SimError::Model(_))
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn never_exceeds_hybrid_time(
        t_end in 0.0f64..6.0,
        max_events in 0usize..5,
        step in 1e-3f64..0.2,
        x0 in 0.0f64..1.0,
    ) {
        let system = sawtooth();
        let mut simulator = HybridSimulator::new(&system);
        simulator.configuration_mut().set_step_size(step);
        let trajectory = simulator
            .orbit(&initial(x0), &HybridTime::new(t_end, max_events).unwrap())
            .unwrap();
        prop_assert!(trajectory.final_time() <= t_end);
        prop_assert!(trajectory.event_count() <= max_events);
        prop_assert!(trajectory.points().windows(2).all(|w| w[0].time <= w[1].time));
    }
}
