//! Compilation of constraint graphs into layered circuits.
//!
//! Compilation runs in three passes:
//!
//! 1. lowering: graph nodes become canonical expressions of degree at most two, and constraints
//!    become wires that must evaluate to zero, with hint wires where the prover has to supply
//!    auxiliary values;
//! 2. a soundness check that every public input influences some assertion;
//! 3. layout: wires are placed into layers and numbered, and the expressions are emitted as gates.

use cranelift_entity::{EntityRef, SecondaryMap};
use stratum_core::LayeredCircuit;
use stratum_field::{Field, FieldId};

use crate::{
	error::CompilationError,
	graph::ConstraintGraph,
	solver::InputSolver,
};

pub(crate) mod expr;
mod layout;
pub(crate) mod lower;

#[cfg(test)]
mod tests;

use expr::WireId;
use lower::{Program, Step};

/// Knobs of the compiler.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompileOptions {
	/// Width of the operands of `assert_is_less_or_equal`, in bits.
	pub comparison_bits: u32,
	/// Whether structurally identical expressions share a wire.
	pub deduplicate: bool,
}

impl Default for CompileOptions {
	fn default() -> Self {
		Self {
			comparison_bits: 64,
			deduplicate: true,
		}
	}
}

/// A layered circuit together with the solver producing its witnesses.
#[derive(Clone, Debug)]
pub struct CompileResult<F> {
	pub layered_circuit: LayeredCircuit<F>,
	pub input_solver: InputSolver<F>,
}

/// Compiles `graph` into a layered circuit over `F`.
///
/// The output depends on the graph and the options only: compiling the same graph twice yields
/// identical circuits.
pub fn compile<F: Field>(
	graph: &ConstraintGraph<F>,
	options: &CompileOptions,
) -> Result<CompileResult<F>, CompilationError> {
	let _span = tracing::info_span!(
		"compile",
		field = %F::ID,
		n_constraints = graph.constraints().len()
	)
	.entered();

	let program = lower::lower(graph, options)?;
	check_inputs_constrained(graph, &program)?;
	let (layered_circuit, placement) = layout::layout(&program)?;

	tracing::debug!(
		depth = layered_circuit.depth(),
		n_wires = layered_circuit.n_wires(),
		n_gates = layered_circuit.n_gates(),
		n_mul_gates = layered_circuit.n_mul_gates(),
		n_assertions = layered_circuit.assertions().len(),
		"compiled layered circuit"
	);

	let input_solver = InputSolver::new(graph, program, placement, &layered_circuit);
	Ok(CompileResult {
		layered_circuit,
		input_solver,
	})
}

/// Like [`compile`], but first checks that `F` is the field identified by `field`.
pub fn compile_for<F: Field>(
	field: FieldId,
	graph: &ConstraintGraph<F>,
	options: &CompileOptions,
) -> Result<CompileResult<F>, CompilationError> {
	if field != F::ID {
		return Err(CompilationError::FieldMismatch {
			expected: F::ID,
			found: field,
		});
	}
	compile(graph, options)
}

/// Rejects public inputs that no assertion depends on: any value would satisfy the circuit for
/// them. Unused private inputs are merely reported.
fn check_inputs_constrained<F: Field>(
	graph: &ConstraintGraph<F>,
	program: &Program<F>,
) -> Result<(), CompilationError> {
	let mut constrained = SecondaryMap::<WireId, bool>::with_capacity(program.steps.len());
	for assertion in &program.assertions {
		constrained[assertion.wire] = true;
	}
	for (wire, step) in program.steps.iter().rev() {
		if !constrained[wire] {
			continue;
		}
		if let Step::Derived(expr) = step {
			for input in expr.wires() {
				constrained[input] = true;
			}
		}
	}

	// Inputs are the first wires created by lowering.
	for (pos, &var) in program.inputs.iter().enumerate() {
		if constrained[WireId::new(pos)] {
			continue;
		}
		let name = graph.input_name(var).unwrap_or_default();
		if pos < program.n_public {
			return Err(CompilationError::UnconstrainedPublicInput {
				name: name.to_string(),
			});
		}
		tracing::warn!(input = name, "private input is not constrained by any assertion");
	}
	Ok(())
}
