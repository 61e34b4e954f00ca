//! Errors surfaced by model construction, the drivers and configuration.

use hf_automaton::AutomatonError;
use hf_core::HfError;
use hf_evolve::EvolveError;
use hf_plot::PlotError;
use hf_sim::SimError;
use thiserror::Error;

pub type BuckResult<T> = Result<T, BuckError>;

#[derive(Error, Debug)]
pub enum BuckError {
    #[error("Model error: {0}")]
    Model(#[from] AutomatonError),

    #[error("Expression error: {0}")]
    Core(#[from] HfError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),

    #[error("Evolution error: {0}")]
    Evolution(#[from] EvolveError),

    #[error("Plot error: {0}")]
    Plot(#[from] PlotError),

    #[error("Invalid configuration: {what}")]
    Config { what: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
