//! Example circuits built on the stratum frontend.
//!
//! Each example implements [`ExampleCircuit`] and is driven by [`Cli`], which compiles it, writes
//! the circuit, solves an instance, writes the witness and checks the pair.

use anyhow::Result;
use stratum_field::Field;
use stratum_frontend::{Assignment, CircuitBuilder};

pub mod circuits;
pub mod cli;

pub use cli::Cli;

/// A circuit that can be driven from the command line.
///
/// `Params` shape the circuit and are fixed at build time, `Instance` holds the input values of one
/// solve.
pub trait ExampleCircuit: Sized {
	type Field: Field;
	type Params: clap::Args;
	type Instance: clap::Args;

	fn build(params: Self::Params, builder: &mut CircuitBuilder<Self::Field>) -> Result<Self>;

	/// Assigns every input of the circuit from `instance`.
	fn assign(&self, instance: Self::Instance, assignment: &mut Assignment) -> Result<()>;
}
