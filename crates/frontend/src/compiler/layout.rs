//! Assignment of lowered wires to layers and global wire indices.

use cranelift_entity::SecondaryMap;
use itertools::Itertools;
use stratum_core::{
	AddGate, CircuitError, ConstGate, InputLayout, Layer, LayeredCircuit, MulGate, WireIndex,
};
use stratum_field::Field;

use super::{
	expr::{Term, WireId},
	lower::{Program, Step},
};

/// Places every wire of `program` and emits the gates of the layered circuit.
///
/// Inputs and hints form layer 0. A derived wire lives one layer above the deepest wire its
/// expression reads. Within a layer, wires keep their creation order, which makes the numbering
/// a function of the graph alone.
pub fn layout<F: Field>(
	program: &Program<F>,
) -> Result<(LayeredCircuit<F>, SecondaryMap<WireId, WireIndex>), CircuitError> {
	if program.steps.len() > u32::MAX as usize {
		return Err(CircuitError::TooManyWires);
	}

	let mut depth = SecondaryMap::<WireId, usize>::with_capacity(program.steps.len());
	for (wire, step) in program.steps.iter() {
		let d = match step {
			Step::Input(_) | Step::Hint(_) => 0,
			Step::Derived(expr) => 1 + expr.wires().map(|w| depth[w]).max().unwrap_or(0),
		};
		depth[wire] = d;
	}

	// Creation order already puts public inputs before private inputs, so a stable sort by depth
	// yields the `[public | private | hint]` input layer.
	let order = program
		.steps
		.keys()
		.sorted_by_key(|&wire| depth[wire])
		.collect::<Vec<_>>();
	let mut index = SecondaryMap::with_capacity(order.len());
	for (i, &wire) in order.iter().enumerate() {
		index[wire] = WireIndex(i as u32);
	}

	let n_hint = program
		.steps
		.values()
		.filter(|step| matches!(step, Step::Hint(_)))
		.count();
	let input_layout = InputLayout {
		n_public: program.n_public,
		n_private: program.inputs.len() - program.n_public,
		n_hint,
	};

	let mut layers = Vec::new();
	let gated = order.iter().copied().skip(input_layout.n_inputs());
	for (_, wires) in &gated.chunk_by(|&wire| depth[wire]) {
		let wires = wires.collect::<Vec<_>>();
		let mut layer = Layer {
			offset: index[wires[0]].0,
			n_wires: wires.len() as u32,
			..Layer::default()
		};
		for wire in wires {
			let Step::Derived(expr) = &program.steps[wire] else {
				unreachable!("only derived wires live above the input layer");
			};
			let output = index[wire];
			let mut driven = false;
			for (term, coef) in expr.terms() {
				driven = true;
				match term {
					Term::Const => layer.cst.push(ConstGate { output, coef }),
					Term::Linear(input) => layer.add.push(AddGate {
						input: index[input],
						output,
						coef,
					}),
					Term::Quadratic(a, b) => {
						let (a, b) = (index[a], index[b]);
						layer.mul.push(MulGate {
							inputs: [a.min(b), a.max(b)],
							output,
							coef,
						});
					}
				}
			}
			if !driven {
				layer.cst.push(ConstGate {
					output,
					coef: F::ZERO,
				});
			}
		}
		layer.mul.sort_by_key(|gate| (gate.output, gate.inputs));
		layer.add.sort_by_key(|gate| (gate.output, gate.input));
		layer.cst.sort_by_key(|gate| gate.output);
		layers.push(layer);
	}

	let assertions = program
		.assertions
		.iter()
		.map(|assertion| index[assertion.wire])
		.collect();

	let circuit = LayeredCircuit::new(input_layout, layers, assertions)?;
	debug_assert_eq!(circuit.n_wires(), program.steps.len());
	Ok((circuit, index))
}
