//! Verified evolution for hybridflow.
//!
//! Provides:
//! - Interval flow of one composite location (Picard a priori boxes, second-order end sets)
//! - GeneralHybridEvolver producing a flow tube under lower or upper semantics
//! - Enclosures and orbits consumed by the plotting layer

pub mod config;
pub mod enclosure;
pub mod error;
pub mod evolver;
pub mod flow;

pub use config::{EvolverConfiguration, Semantics};
pub use enclosure::{Enclosure, Orbit};
pub use error::{EvolveError, EvolveResult};
pub use evolver::GeneralHybridEvolver;
pub use flow::{FlowStep, IntervalFlow, apply_reset};
