use std::path::PathBuf;

use hf_automaton::{GuardOverlap, guard_overlap};
use hf_buck::{
    BuckParameters, BuckSymbols, EvolutionSettings, InitialCondition, RunConfig, RunMode,
    SimulationSettings, finite_time_evolution, get_controller, get_converter,
    get_evolution_final_time, get_final_time, get_initial_set, get_system, plot_domain,
    simulate_evolution,
};
use hf_core::{Predicate, Real, Valuation};
use hf_evolve::Orbit;
use hf_plot::{PlotData, Plotter};
use hf_sim::HybridPoint;
use proptest::prelude::*;

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("hf-buck-{}-{test}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn controller_guards(parameters: &BuckParameters) -> (Predicate, Predicate) {
    let symbols = BuckSymbols::default();
    let controller = get_controller(
        &parameters.circuit_constants(),
        &parameters.control_constants(),
        &symbols,
    )
    .unwrap();
    let guard = |event: &str| {
        controller
            .transitions()
            .iter()
            .find(|t| t.event.name() == event)
            .and_then(|t| t.guard.clone())
            .unwrap()
    };
    (guard("turn_on"), guard("turn_off"))
}

fn covered(orbit: &Orbit, point: &HybridPoint, time_tolerance: Real, tolerance: Real) -> bool {
    orbit
        .reach
        .iter()
        .chain(&orbit.final_enclosures)
        .filter(|e| e.location == point.location)
        .filter(|e| e.time.inflate(time_tolerance).contains(point.time))
        .any(|e| {
            point.state.iter().all(|(name, value)| {
                e.state
                    .get(name)
                    .is_some_and(|iv| iv.inflate(tolerance).contains(*value))
            })
        })
}

#[test]
fn converter_and_controller_share_events() {
    let p = BuckParameters::default();
    let symbols = BuckSymbols::default();
    let converter = get_converter(&p.circuit_constants(), &symbols).unwrap();
    let controller =
        get_controller(&p.circuit_constants(), &p.control_constants(), &symbols).unwrap();
    assert_eq!(converter.events(), controller.events());
    assert_eq!(converter.events().len(), 2);
}

#[test]
fn rebuilding_gives_equal_system() {
    let symbols = BuckSymbols::default();
    let first = get_system(&BuckParameters::default(), &symbols).unwrap();
    let second = get_system(&BuckParameters::default(), &symbols).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.name(), "buck_converter");
    assert_eq!(first.locations().unwrap().len(), 4);
}

#[test]
fn zero_hysteresis_guards_touch() {
    let p = BuckParameters {
        hysteresis: 0.0,
        ..BuckParameters::default()
    };
    let (on, off) = controller_guards(&p);
    let overlap = guard_overlap(&on, &off, &plot_domain(&BuckSymbols::default()), 1e-3).unwrap();
    assert!(matches!(overlap, GuardOverlap::Possible { .. }));
}

#[test]
fn hysteresis_band_separates_guards() {
    let (on, off) = controller_guards(&BuckParameters::default());
    let overlap = guard_overlap(&on, &off, &plot_domain(&BuckSymbols::default()), 1e-3).unwrap();
    assert!(overlap.is_disjoint());
}

proptest! {
    #[test]
    fn guards_never_hold_together(i_l in -1.0f64..25.0, v_c in -5.0f64..60.0) {
        let (on, off) = controller_guards(&BuckParameters::default());
        let mut point = Valuation::new();
        point.insert("i_L", i_l);
        point.insert("v_C", v_c);
        let env = point.lookup();
        prop_assert!(!(on.holds(&env).unwrap() && off.holds(&env).unwrap()));
    }
}

#[test]
fn simulation_respects_horizon_and_initial_set() {
    let symbols = BuckSymbols::default();
    let system = get_system(&BuckParameters::default(), &symbols).unwrap();
    let initial_set = get_initial_set(&symbols, &InitialCondition::default()).unwrap();
    let final_time = get_final_time().unwrap();
    let plotter = Plotter::new(scratch_dir("simulation")).unwrap();

    let trajectory = simulate_evolution(
        &system,
        &initial_set,
        &final_time,
        &symbols,
        &plotter,
        &SimulationSettings::default(),
    )
    .unwrap();

    let first = trajectory.first().unwrap();
    assert_eq!(first.time, 0.0);
    assert_eq!(&first.location, initial_set.location());
    assert_eq!(first.state.get("i_L"), Some(&0.0));
    assert_eq!(first.state.get("v_C"), Some(&0.0));
    assert!(trajectory.final_time() <= 2e-2);
    assert!(trajectory.event_count() > 0);
    assert!(trajectory.event_count() <= 15000);
    assert!(trajectory.iter().all(|p| p.time <= 2e-2));

    for name in ["simulation_t-i_L", "simulation_t-v_C", "simulation_i_L-v_C"] {
        let artifact = plotter.load(name).unwrap();
        assert!(matches!(artifact.data, PlotData::Polyline { ref points } if points.len() == trajectory.len()));
    }
}

#[test]
fn forward_euler_simulation_switches_like_rk4() {
    let symbols = BuckSymbols::default();
    let system = get_system(&BuckParameters::default(), &symbols).unwrap();
    let initial_set = get_initial_set(&symbols, &InitialCondition::default()).unwrap();
    let plotter = Plotter::new(scratch_dir("forward_euler")).unwrap();
    let config = RunConfig::from_yaml_str(
        "
simulation:
  integrator: forward_euler
  final_time: 3.27e-3
",
    )
    .unwrap();
    let horizon = config.simulation.horizon().unwrap();

    let euler = simulate_evolution(
        &system,
        &initial_set,
        &horizon,
        &symbols,
        &plotter,
        &config.simulation,
    )
    .unwrap();
    let rk4 = simulate_evolution(
        &system,
        &initial_set,
        &horizon,
        &symbols,
        &plotter,
        &SimulationSettings {
            final_time: 3.27e-3,
            ..SimulationSettings::default()
        },
    )
    .unwrap();

    assert!(euler.event_count() > 0);
    assert!(euler.final_time() <= 3.27e-3 + 1e-12);
    assert!(euler.final_time().is_finite());
    assert_ne!(euler, rk4);
    let (a, b) = (euler.last().unwrap(), rk4.last().unwrap());
    let v_a = a.state.get("v_C").unwrap();
    let v_b = b.state.get("v_C").unwrap();
    assert!((v_a - v_b).abs() < 1.0, "v_C {v_a} vs {v_b}");
}

#[test]
fn evolution_encloses_simulated_trajectory() {
    let symbols = BuckSymbols::default();
    let system = get_system(&BuckParameters::default(), &symbols).unwrap();
    let initial_set = get_initial_set(&symbols, &InitialCondition::default()).unwrap();
    let final_time = get_evolution_final_time().unwrap();
    let plotter = Plotter::new(scratch_dir("evolution")).unwrap();

    let orbit = finite_time_evolution(
        &system,
        &initial_set,
        &final_time,
        &symbols,
        &plotter,
        &EvolutionSettings::default(),
    )
    .unwrap();
    assert!(orbit.final_time() <= 3.27e-3 + 1e-12);
    assert!(orbit.max_events() <= 15000);
    assert!(!orbit.final_enclosures.is_empty());
    for enclosure in &orbit.final_enclosures {
        assert!(
            enclosure.radius() < 5.0,
            "final enclosure in {} has radius {}",
            enclosure.location,
            enclosure.radius()
        );
    }

    let simulation = SimulationSettings {
        final_time: 3.27e-3,
        ..SimulationSettings::default()
    };
    let trajectory = simulate_evolution(
        &system,
        &initial_set,
        &simulation.horizon().unwrap(),
        &symbols,
        &plotter,
        &simulation,
    )
    .unwrap();
    assert!(trajectory.event_count() > 0);
    for point in trajectory.iter().step_by(7).chain(trajectory.last()) {
        assert!(
            covered(&orbit, point, 1e-9, 1e-6),
            "simulated point t={} {} {} not covered",
            point.time,
            point.location,
            point.state
        );
    }

    for name in [
        "finite_time_evolution_t-i_L",
        "finite_time_evolution_t-v_C",
        "finite_time_evolution_i_L-v_C",
    ] {
        let artifact = plotter.load(name).unwrap();
        assert!(!artifact.data.is_empty());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(6))]

    #[test]
    fn drivers_stay_within_hybrid_time(t_end in 1e-5f64..2e-3, max_events in 0usize..4) {
        let config = RunConfig {
            simulation: SimulationSettings {
                final_time: t_end,
                max_events,
                ..SimulationSettings::default()
            },
            evolution: EvolutionSettings {
                final_time: t_end / 4.0,
                max_events,
                ..EvolutionSettings::default()
            },
            output_dir: scratch_dir("horizon"),
            ..RunConfig::default()
        };
        let summary = hf_buck::run(&config, RunMode::Both).unwrap();
        prop_assert_eq!(summary.artifacts.len(), 6);

        let trajectory = summary.simulation.unwrap();
        prop_assert!(trajectory.final_time() <= t_end);
        prop_assert!(trajectory.event_count() <= max_events);

        let orbit = summary.evolution.unwrap();
        prop_assert!(orbit.final_time() <= t_end / 4.0 + 1e-12);
        prop_assert!(orbit.max_events() <= max_events);
    }
}
