//! Error types for model construction.
//!
//! Every variant names the automaton, location or event at fault: these
//! errors mean the model was assembled incorrectly.

use hf_core::HfError;
use thiserror::Error;

pub type AutomatonResult<T> = Result<T, AutomatonError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutomatonError {
    #[error("Automaton '{automaton}': location {location} is not scoped by '{automaton}'")]
    ForeignLocation { automaton: String, location: String },

    #[error("Automaton '{automaton}': mode {location} declared twice")]
    DuplicateMode { automaton: String, location: String },

    #[error("Automaton '{automaton}': {role} location {location} of event '{event}' has no mode")]
    UndeclaredLocation {
        automaton: String,
        location: String,
        event: String,
        role: &'static str,
    },

    #[error("Automaton '{automaton}': event '{event}' declared twice from location {location}")]
    DuplicateTransition {
        automaton: String,
        location: String,
        event: String,
    },

    #[error("Automaton '{automaton}': variable '{variable}' has two derivatives in {location}")]
    DuplicateDynamics {
        automaton: String,
        location: String,
        variable: String,
    },

    #[error("Automaton '{automaton}': variable '{variable}' reset twice by event '{event}'")]
    DuplicateReset {
        automaton: String,
        event: String,
        variable: String,
    },

    #[error("Composite '{composite}': component '{component}' appears twice")]
    DuplicateComponent { composite: String, component: String },

    #[error("Composite '{composite}': variable '{variable}' has dynamics in both '{first}' and '{second}' at {location}")]
    ConflictingDynamics {
        composite: String,
        location: String,
        variable: String,
        first: String,
        second: String,
    },

    #[error("Composite '{composite}': variable '{variable}' reset by both '{first}' and '{second}' on event '{event}'")]
    ConflictingResets {
        composite: String,
        event: String,
        variable: String,
        first: String,
        second: String,
    },

    #[error("Composite '{composite}': variable '{variable}' used by '{component}' at {location} has no dynamics")]
    UnknownVariable {
        composite: String,
        component: String,
        location: String,
        variable: String,
    },

    #[error("Composite '{composite}': location {location} is not a location of the system")]
    UnknownLocation { composite: String, location: String },

    #[error("Composite '{composite}': urgent events '{first}' and '{second}' may both be forced at {location}")]
    OverlappingUrgentGuards {
        composite: String,
        location: String,
        first: String,
        second: String,
    },

    #[error("Invalid initial set: {what}")]
    InvalidInitialSet { what: String },

    #[error("Invalid hybrid time: {what}")]
    InvalidTime { what: &'static str },

    #[error(transparent)]
    Core(#[from] HfError),
}
