//! Error types for simulation operations.

use hf_automaton::AutomatonError;
use hf_core::HfError;
use thiserror::Error;

/// Errors encountered during hybrid simulation.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite state at t={time}: {what}")]
    NonFinite { what: String, time: f64 },

    #[error("Model error: {0}")]
    Model(#[from] AutomatonError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] HfError),
}

pub type SimResult<T> = Result<T, SimError>;
