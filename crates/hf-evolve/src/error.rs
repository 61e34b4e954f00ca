//! Error types for verified evolution.

use hf_automaton::AutomatonError;
use hf_core::HfError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EvolveError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Enclosure radius {radius} exceeds maximum {maximum} at t={time} in {location}")]
    EnclosureRadiusExceeded {
        radius: f64,
        maximum: f64,
        time: f64,
        location: String,
    },

    #[error("No a priori enclosure found after {iterations} Picard iterations at t={time} in {location}")]
    PicardNonConvergence {
        iterations: usize,
        time: f64,
        location: String,
    },

    #[error("Jump branches did not settle after {widenings} widenings at t={time} in {location}")]
    JumpChainNonConvergence {
        widenings: usize,
        time: f64,
        location: String,
    },

    #[error("Model error: {0}")]
    Model(#[from] AutomatonError),

    #[error("Evaluation error: {0}")]
    Evaluation(#[from] HfError),
}

pub type EvolveResult<T> = Result<T, EvolveError>;
