//! Hybrid automata for hybridflow.
//!
//! Provides:
//! - Modes (location + flow equations) and transitions (event, guard, reset, urgency)
//! - Hybrid automata with declaration-time consistency checks
//! - Parallel composition synchronised on shared events
//! - Urgent-guard non-blocking validation by interval branch-and-bound
//! - Initial sets and hybrid time horizons consumed by the evolution engines

pub mod automaton;
pub mod composite;
pub mod error;
pub mod initial;
pub mod time;
pub mod validate;

pub use automaton::{EventKind, HybridAutomaton, Mode, Transition};
pub use composite::{CompositeHybridAutomaton, CompositeTransition};
pub use error::{AutomatonError, AutomatonResult};
pub use initial::{HybridBoundedConstraintSet, VariableBound, between, equal};
pub use time::HybridTime;
pub use validate::{GuardOverlap, check_urgent_nonblocking, guard_overlap};
