//! hf-core: shared foundation for hybridflow.
//!
//! Contains:
//! - numeric (Real, finiteness check, decimal truncation)
//! - interval (outward-rounded interval arithmetic)
//! - symbols (variables, constants, events, locations)
//! - expr (expression and predicate trees, generic evaluation)
//! - valuation (variable name -> value maps)
//! - units (uom SI types + constructors for circuit quantities)
//! - error (shared error types)

pub mod error;
pub mod expr;
pub mod interval;
pub mod numeric;
pub mod symbols;
pub mod units;
pub mod valuation;

// Re-exports: nice ergonomics for downstream crates
pub use error::{HfError, HfResult};
pub use expr::{
    Arithmetic, BinaryOp, CmpOp, DottedAssignment, Expr, ExprVisitor, Predicate, PrimedAssignment,
    Tribool, UnaryOp,
};
pub use interval::Interval;
pub use numeric::*;
pub use symbols::*;
pub use valuation::Valuation;
