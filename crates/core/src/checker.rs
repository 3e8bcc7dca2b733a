//! Independent satisfiability checker.
//!
//! Re-evaluates every gate of a [`LayeredCircuit`] from the values stored in a [`Witness`] and
//! compares the result against the stored value of the gate's output wire. This deliberately does
//! not reuse the input solver: a solver bug that produces an invalid witness must not be able to
//! hide behind a shared evaluation routine.

use rayon::prelude::*;
use stratum_field::Field;

use crate::{
	error::CheckFailure,
	layered_circuit::{Layer, LayeredCircuit, WireIndex},
	witness::Witness,
};

/// Verifies that every instance of the witness satisfies the circuit.
///
/// Instances are checked in parallel. When several instances fail, the failure of the instance
/// with the lowest index is reported.
pub fn verify_witness<F: Field>(
	circuit: &LayeredCircuit<F>,
	witness: &Witness<F>,
) -> Result<(), CheckFailure> {
	let _span = tracing::debug_span!("verify_witness", n_instances = witness.n_instances()).entered();

	if witness.n_wires() != circuit.n_wires() {
		return Err(CheckFailure::ShapeMismatch {
			expected: circuit.n_wires(),
			actual: witness.n_wires(),
		});
	}
	if witness.n_instances() == 0 {
		return Err(CheckFailure::NoInstances);
	}

	let results = (0..witness.n_instances())
		.into_par_iter()
		.map(|instance| verify_instance(circuit, instance, witness.instance(instance)))
		.collect::<Vec<_>>();
	results.into_iter().collect()
}

/// Returns whether the witness satisfies the circuit.
pub fn check_circuit<F: Field>(circuit: &LayeredCircuit<F>, witness: &Witness<F>) -> bool {
	match verify_witness(circuit, witness) {
		Ok(()) => true,
		Err(failure) => {
			tracing::debug!(%failure, "witness check failed");
			false
		}
	}
}

fn verify_instance<F: Field>(
	circuit: &LayeredCircuit<F>,
	instance: usize,
	values: &[F],
) -> Result<(), CheckFailure> {
	for layer in circuit.layers() {
		let expected = eval_layer(layer, values);
		let actual = &values[layer.wire_range()];
		if let Some(pos) = expected.iter().zip(actual).position(|(e, a)| e != a) {
			return Err(CheckFailure::WireMismatch {
				instance,
				wire: WireIndex(layer.offset + pos as u32),
			});
		}
	}

	for &wire in circuit.assertions() {
		if !values[wire.as_usize()].is_zero() {
			return Err(CheckFailure::AssertionFailed { instance, wire });
		}
	}
	Ok(())
}

/// Computes the value of each wire of `layer` from the values of the preceding layers.
fn eval_layer<F: Field>(layer: &Layer<F>, values: &[F]) -> Vec<F> {
	let offset = layer.offset as usize;
	let mut out = vec![F::ZERO; layer.n_wires as usize];
	for gate in &layer.mul {
		let [a, b] = gate.inputs;
		out[gate.output.as_usize() - offset] +=
			gate.coef * values[a.as_usize()] * values[b.as_usize()];
	}
	for gate in &layer.add {
		out[gate.output.as_usize() - offset] += gate.coef * values[gate.input.as_usize()];
	}
	for gate in &layer.cst {
		out[gate.output.as_usize() - offset] += gate.coef;
	}
	out
}
