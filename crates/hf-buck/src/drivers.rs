//! The two evolution drivers and the run entry point.

use std::path::PathBuf;
use std::time::Instant;

use hf_automaton::{CompositeHybridAutomaton, HybridBoundedConstraintSet, HybridTime};
use hf_core::TimeVariable;
use hf_evolve::{GeneralHybridEvolver, Orbit, Semantics};
use hf_plot::{AxisBound, Axes2d, Plotter};
use hf_sim::{HybridSimulator, HybridTrajectory};

use crate::config::{EvolutionSettings, RunConfig, RunMode, SimulationSettings};
use crate::error::BuckResult;
use crate::model::{get_initial_set, get_system};
use crate::parameters::BuckSymbols;

/// The three named projections `t-i_L`, `t-v_C` and `i_L-v_C`.
pub fn projections(
    prefix: &str,
    final_time: &HybridTime,
    symbols: &BuckSymbols,
) -> Vec<(String, Axes2d)> {
    let t = AxisBound::new(0.0, &TimeVariable, final_time.continuous_time());
    let i_l = AxisBound::new(-1.0, &symbols.i_l, 25.0);
    let v_c = AxisBound::new(-5.0, &symbols.v_c, 60.0);
    [
        Axes2d::new(t.clone(), i_l.clone()),
        Axes2d::new(t, v_c.clone()),
        Axes2d::new(i_l, v_c),
    ]
    .into_iter()
    .map(|axes| (format!("{prefix}_{}", axes.label()), axes))
    .collect()
}

/// Simulate one trajectory from the midpoint of `initial_set` and plot its
/// three projections.
pub fn simulate_evolution(
    system: &CompositeHybridAutomaton,
    initial_set: &HybridBoundedConstraintSet,
    final_time: &HybridTime,
    symbols: &BuckSymbols,
    plotter: &Plotter,
    settings: &SimulationSettings,
) -> BuckResult<HybridTrajectory> {
    let mut simulator = HybridSimulator::new(system);
    simulator
        .configuration_mut()
        .set_step_size(settings.step_size)
        .set_integrator(settings.integrator.into());
    tracing::info!("{}", simulator.configuration());

    tracing::info!("Computing simulation trajectory...");
    let trajectory = simulator.orbit(initial_set, final_time)?;
    tracing::info!(
        points = trajectory.len(),
        events = trajectory.event_count(),
        final_time = trajectory.final_time(),
        "simulation finished"
    );

    tracing::info!("Plotting simulation trajectory...");
    for (name, axes) in projections("simulation", final_time, symbols) {
        plotter.plot_trajectory(&name, &axes, &trajectory)?;
    }
    tracing::info!("Done.");
    Ok(trajectory)
}

/// Compute an outer approximation of the reachable set under upper
/// semantics and plot the three projections of the flow tube.
pub fn finite_time_evolution(
    system: &CompositeHybridAutomaton,
    initial_set: &HybridBoundedConstraintSet,
    final_time: &HybridTime,
    symbols: &BuckSymbols,
    plotter: &Plotter,
    settings: &EvolutionSettings,
) -> BuckResult<Orbit> {
    let mut evolver = GeneralHybridEvolver::new(system);
    evolver
        .configuration_mut()
        .set_maximum_enclosure_radius(settings.maximum_enclosure_radius)
        .set_maximum_step_size(settings.maximum_step_size);
    tracing::info!("{}", evolver.configuration());

    tracing::info!("Computing evolution flow tube...");
    let orbit = evolver.orbit(initial_set, final_time, Semantics::Upper)?;
    tracing::info!(
        reach = orbit.reach.len(),
        final_enclosures = orbit.final_enclosures.len(),
        final_time = orbit.final_time(),
        max_events = orbit.max_events(),
        "evolution finished"
    );

    tracing::info!("Plotting...");
    for (name, axes) in projections("finite_time_evolution", final_time, symbols) {
        plotter.plot_orbit(&name, &axes, &orbit)?;
    }
    tracing::info!("Done.");
    Ok(orbit)
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub simulation: Option<HybridTrajectory>,
    pub evolution: Option<Orbit>,
    /// Artifacts written, in order.
    pub artifacts: Vec<PathBuf>,
    pub simulation_time_s: f64,
    pub evolution_time_s: f64,
}

/// Run the drivers selected by `mode`. Each driver builds its own system
/// and initial set from `config`.
pub fn run(config: &RunConfig, mode: RunMode) -> BuckResult<RunSummary> {
    config.validate()?;
    let symbols = BuckSymbols::default();
    let plotter = Plotter::new(&config.output_dir)?;
    let mut summary = RunSummary::default();

    if mode.simulates() {
        let start = Instant::now();
        let system = get_system(&config.parameters, &symbols)?;
        let initial_set = get_initial_set(&symbols, &config.initial)?;
        let final_time = config.simulation.horizon()?;
        let trajectory = simulate_evolution(
            &system,
            &initial_set,
            &final_time,
            &symbols,
            &plotter,
            &config.simulation,
        )?;
        summary.simulation_time_s = start.elapsed().as_secs_f64();
        summary.simulation = Some(trajectory);
        summary.artifacts.extend(
            projections("simulation", &final_time, &symbols)
                .iter()
                .map(|(name, _)| plotter.artifact_path(name)),
        );
    }

    if mode.evolves() {
        let start = Instant::now();
        let system = get_system(&config.parameters, &symbols)?;
        let initial_set = get_initial_set(&symbols, &config.initial)?;
        let final_time = config.evolution.horizon()?;
        let orbit = finite_time_evolution(
            &system,
            &initial_set,
            &final_time,
            &symbols,
            &plotter,
            &config.evolution,
        )?;
        summary.evolution_time_s = start.elapsed().as_secs_f64();
        summary.evolution = Some(orbit);
        summary.artifacts.extend(
            projections("finite_time_evolution", &final_time, &symbols)
                .iter()
                .map(|(name, _)| plotter.artifact_path(name)),
        );
    }

    tracing::info!(
        %mode,
        artifacts = summary.artifacts.len(),
        simulation_s = summary.simulation_time_s,
        evolution_s = summary.evolution_time_s,
        "run complete"
    );
    Ok(summary)
}
