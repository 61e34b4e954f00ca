//! Hybrid simulation for hybridflow.
//!
//! Provides:
//! - Per-location flow models compiled from composite automata
//! - Fixed-step RK4 / forward Euler integrators
//! - Urgent-event detection with crossing-time bisection
//! - HybridSimulator producing a single best-estimate trajectory

pub mod error;
pub mod integrator;
pub mod model;
pub mod sim;

pub use error::{SimError, SimResult};
pub use integrator::{ForwardEuler, Integrator, IntegratorType, RK4};
pub use model::{ModeFlow, TransientModel};
pub use sim::{HybridPoint, HybridSimulator, HybridTrajectory, SimulatorConfiguration};
