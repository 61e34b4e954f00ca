//! hf-buck: hybrid model of a DC-DC buck converter under hysteresis
//! (sliding-surface) control, and the two evolution drivers.
//!
//! Contains:
//! - parameters (circuit and controller constants, shared symbols)
//! - model (converter/controller automata, composite system, initial set, horizons)
//! - drivers (simulation and verified evolution, each with three projections)
//! - config (explicit run configuration loaded from YAML)
//! - error (BuckError wrapping the engine errors)

pub mod config;
pub mod drivers;
pub mod error;
pub mod model;
pub mod parameters;

pub use config::{
    EvolutionSettings, InitialBound, InitialCondition, RunConfig, RunMode, SimulationIntegrator,
    SimulationSettings,
};
pub use drivers::{RunSummary, finite_time_evolution, projections, run, simulate_evolution};
pub use error::{BuckError, BuckResult};
pub use model::{
    get_controller, get_converter, get_evolution_final_time, get_final_time, get_initial_set,
    get_system, plot_domain, sliding_surface,
};
pub use parameters::{BuckParameters, BuckSymbols, CircuitConstants, ControlConstants, LocationTags};
