//! Frontend of the circuit toolchain.
//!
//! Circuits are described with a [`CircuitBuilder`], frozen into a [`ConstraintGraph`], and
//! compiled into a [`stratum_core::LayeredCircuit`] together with an [`InputSolver`] that turns
//! an [`Assignment`] of the inputs into a [`stratum_core::Witness`].

pub mod assignment;
pub mod builder;
pub mod compiler;
pub mod error;
pub mod graph;
pub mod solver;

pub use assignment::Assignment;
pub use builder::{Circuit, CircuitBuilder, ConstPool};
pub use compiler::{CompileOptions, CompileResult, compile, compile_for};
pub use error::{AssertionFailures, BuildError, CompilationError, SolverError};
pub use graph::{Constraint, ConstraintGraph, NamedConstraint, Node, Variable};
pub use solver::InputSolver;
