//! Execution module.
//!
//! This module wraps kernel dispatch: type unification around a single
//! invocation, and multi-pass orchestration of separable filters.

pub mod temporaries;
pub mod unifier;
pub mod separable;

pub use temporaries::TemporaryArrays;
pub use unifier::{PlannedPromotion, TypeUnifier};
pub use separable::{AxisPass, SeparableFilter, SeparableKernel};
