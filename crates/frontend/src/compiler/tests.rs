use proptest::prelude::*;
use rand::{Rng, SeedableRng as _, rngs::StdRng};
use stratum_core::{AddGate, InputLayout, MulGate, WireIndex, check_circuit};
use stratum_field::{Bn254Scalar, M31};

use super::*;
use crate::{Assignment, CircuitBuilder, SolverError};

fn options() -> CompileOptions {
	CompileOptions::default()
}

#[test]
fn product_layout() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let y = b.add_private("y");
	let z = b.add_public("z");
	let xy = b.mul(x, y);
	b.assert_is_equal("product", xy, z);
	let graph = b.build().unwrap();

	let CompileResult {
		layered_circuit: circuit,
		..
	} = compile(&graph, &options()).unwrap();
	assert_eq!(
		*circuit.input_layout(),
		InputLayout {
			n_public: 1,
			n_private: 2,
			n_hint: 0,
		}
	);
	assert_eq!(circuit.depth(), 2);
	let layer = &circuit.layers()[0];
	assert_eq!((layer.offset, layer.n_wires), (3, 1));
	assert_eq!(
		layer.mul,
		[MulGate {
			inputs: [WireIndex(1), WireIndex(2)],
			output: WireIndex(3),
			coef: M31::ONE,
		}]
	);
	assert_eq!(
		layer.add,
		[AddGate {
			input: WireIndex(0),
			output: WireIndex(3),
			coef: -M31::ONE,
		}]
	);
	assert_eq!(circuit.assertions(), &[WireIndex(3)]);
}

#[test]
fn hints_live_in_the_input_layer() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let y = b.add_public("y");
	b.assert_is_different("distinct", x, y);
	let graph = b.build().unwrap();

	let circuit = compile(&graph, &options()).unwrap().layered_circuit;
	assert_eq!(
		*circuit.input_layout(),
		InputLayout {
			n_public: 1,
			n_private: 1,
			n_hint: 1,
		}
	);
	// x - y on layer 1, (x - y) * inverse - 1 on layer 2.
	assert_eq!(circuit.depth(), 3);
	assert_eq!(circuit.n_wires(), 5);
	assert_eq!(
		circuit.layers()[1].mul,
		[MulGate {
			inputs: [WireIndex(2), WireIndex(3)],
			output: WireIndex(4),
			coef: M31::ONE,
		}]
	);
	assert_eq!(circuit.assertions(), &[WireIndex(4)]);
}

#[test]
fn is_different_from_itself() {
	let mut b = CircuitBuilder::<M31>::new();
	let seven = b.constant(7);
	b.assert_is_different("same", seven, seven);
	let graph = b.build().unwrap();
	assert_eq!(
		compile(&graph, &options()).unwrap_err(),
		CompilationError::Unsatisfiable {
			name: "same".into()
		}
	);

	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let zero = b.constant(0);
	let also_x = b.add(x, zero);
	b.assert_is_different("same", x, also_x);
	let graph = b.build().unwrap();
	assert!(matches!(
		compile(&graph, &options()),
		Err(CompilationError::Unsatisfiable { .. })
	));
}

#[test]
fn constant_assertions_are_decided_at_compile_time() {
	let mut b = CircuitBuilder::<M31>::new();
	let one = b.constant(1);
	let two = b.constant(2);
	let three = b.add(one, two);
	let expected = b.constant(3);
	b.assert_is_equal("sum", three, expected);
	b.assert_is_less_or_equal("order", one, two);
	b.assert_is_different("distinct", one, two);
	b.assert_is_bool("bit", one);
	let graph = b.build().unwrap();
	let circuit = compile(&graph, &options().with_bits(16)).unwrap().layered_circuit;
	assert!(circuit.assertions().is_empty());
	assert_eq!(circuit.n_wires(), 0);

	for (a, b_, expect_ok) in [(1, 2, true), (2, 2, true), (2, 1, false)] {
		let mut b = CircuitBuilder::<M31>::new();
		let (a, b_) = (b.constant(a), b.constant(b_));
		b.assert_is_less_or_equal("le", a, b_);
		let graph = b.build().unwrap();
		assert_eq!(compile(&graph, &options().with_bits(16)).is_ok(), expect_ok);
	}

	let mut b = CircuitBuilder::<M31>::new();
	let (one, two) = (b.constant(1), b.constant(2));
	b.assert_is_equal("eq", one, two);
	let graph = b.build().unwrap();
	assert!(matches!(
		compile(&graph, &options()),
		Err(CompilationError::Unsatisfiable { name }) if name == "eq"
	));
}

#[test]
fn comparison_width_must_leave_headroom() {
	let graph = || {
		let mut b = CircuitBuilder::<M31>::new();
		let x = b.add_private("x");
		let y = b.add_public("y");
		b.assert_is_less_or_equal("le", x, y);
		b.build().unwrap()
	};
	assert_eq!(
		compile(&graph(), &options()).unwrap_err(),
		CompilationError::ComparisonTooWide {
			bits: 64,
			field: FieldId::Mersenne31,
		}
	);
	assert!(compile(&graph(), &options().with_bits(30)).is_err());
	assert!(compile(&graph(), &options().with_bits(29)).is_ok());
	assert_eq!(
		compile(&graph(), &options().with_bits(u32::MAX)).unwrap_err(),
		CompilationError::ComparisonTooWide {
			bits: u32::MAX,
			field: FieldId::Mersenne31,
		}
	);
}

#[test]
fn comparison_constant_out_of_range() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_public("x");
	let limit = b.constant(256);
	b.assert_is_less_or_equal("limit", x, limit);
	let graph = b.build().unwrap();
	assert_eq!(
		compile(&graph, &options().with_bits(8)).unwrap_err(),
		CompilationError::ConstantOutOfRange {
			name: "limit".into(),
			bits: 8,
		}
	);
	assert!(compile(&graph, &options().with_bits(9)).is_ok());
}

#[test]
fn unconstrained_inputs() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let _y = b.add_public("y");
	b.assert_is_bool("bit", x);
	let graph = b.build().unwrap();
	assert_eq!(
		compile(&graph, &options()).unwrap_err(),
		CompilationError::UnconstrainedPublicInput { name: "y".into() }
	);

	// A public input whose contribution cancels out is not constrained either.
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let y = b.add_public("y");
	let t = b.add(x, y);
	let t = b.sub(t, y);
	b.assert_is_bool("bit", t);
	let graph = b.build().unwrap();
	assert!(matches!(
		compile(&graph, &options()),
		Err(CompilationError::UnconstrainedPublicInput { .. })
	));

	// Unused private inputs are tolerated.
	let mut b = CircuitBuilder::<M31>::new();
	let _x = b.add_private("x");
	let y = b.add_public("y");
	b.assert_is_bool("bit", y);
	let graph = b.build().unwrap();
	let circuit = compile(&graph, &options()).unwrap().layered_circuit;
	assert_eq!(circuit.input_layout().n_private, 1);
}

#[test]
fn inputs_used_only_by_hints_are_still_constrained() {
	// The inverse hint reads x - y, and the assertion pins that difference down.
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_public("x");
	let y = b.add_public("y");
	b.assert_is_different("distinct", x, y);
	assert!(compile(&b.build().unwrap(), &options()).is_ok());
}

#[test]
fn deduplication() {
	let graph = || {
		let mut b = CircuitBuilder::<M31>::new();
		let x = b.add_private("x");
		let y = b.add_private("y");
		let z = b.add_public("z");
		let s1 = b.add(x, y);
		let s2 = b.add(y, x);
		let p1 = b.mul(s1, z);
		let p2 = b.mul(s2, z);
		b.assert_is_zero("p1", p1);
		b.assert_is_zero("p2", p2);
		b.build().unwrap()
	};
	let shared = compile(&graph(), &options()).unwrap().layered_circuit;
	let separate = compile(
		&graph(),
		&CompileOptions {
			deduplicate: false,
			..options()
		},
	)
	.unwrap()
	.layered_circuit;
	// With deduplication x + y is materialized once, and both assertions share one wire.
	assert_eq!(shared.n_wires(), 3 + 2);
	assert_eq!(separate.n_wires(), 3 + 4);
	assert_eq!(shared.assertions()[0], shared.assertions()[1]);
}

#[test]
fn dead_nodes_are_not_lowered() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_private("x");
	let y = b.add_public("y");
	let xx = b.mul(x, x);
	let _unused = b.mul(xx, x);
	b.assert_is_equal("eq", x, y);
	let graph = b.build().unwrap();
	let circuit = compile(&graph, &options()).unwrap().layered_circuit;
	assert_eq!(circuit.n_mul_gates(), 0);
	assert_eq!(circuit.n_wires(), 3);
}

#[test]
fn compilation_is_deterministic() {
	let graph = || {
		let mut b = CircuitBuilder::<Bn254Scalar>::new();
		let prev = b.add_public("prev");
		let next = b.add_public("next");
		let secret = b.add_private("secret");
		let one = b.constant(1);
		let succ = b.add(prev, one);
		b.assert_is_equal("succ", next, succ);
		b.assert_is_less_or_equal("ordered", prev, next);
		let sq = b.mul(secret, secret);
		let zero = b.constant(0);
		b.assert_is_different("nonzero", sq, zero);
		b.build().unwrap()
	};
	let first = compile(&graph(), &options()).unwrap().layered_circuit;
	let second = compile(&graph(), &options()).unwrap().layered_circuit;
	assert_eq!(first.to_bytes().unwrap(), second.to_bytes().unwrap());
}

#[test]
fn field_is_checked() {
	let mut b = CircuitBuilder::<M31>::new();
	let x = b.add_public("x");
	b.assert_is_zero("zero", x);
	let graph = b.build().unwrap();
	assert_eq!(
		compile_for(FieldId::Bn254Scalar, &graph, &options()).unwrap_err(),
		CompilationError::FieldMismatch {
			expected: FieldId::Mersenne31,
			found: FieldId::Bn254Scalar,
		}
	);
	assert!(compile_for(FieldId::Mersenne31, &graph, &options()).is_ok());
}

#[test]
fn less_or_equal_random() {
	let mut b = CircuitBuilder::<Bn254Scalar>::new();
	let x = b.add_private("x");
	let y = b.add_public("y");
	b.assert_is_less_or_equal("le", x, y);
	let graph = b.build().unwrap();
	let result = compile(&graph, &options().with_bits(16)).unwrap();

	let mut rng = StdRng::seed_from_u64(42);
	for _ in 0..200 {
		let a = rng.random_range(0..1u64 << 16);
		let c = rng.random_range(0..1u64 << 16);
		let mut assignment = Assignment::new();
		assignment.set(x, a).set(y, c);
		let solved = result
			.input_solver
			.solve(&result.layered_circuit, &assignment, 1);
		if a <= c {
			let witness = solved.unwrap();
			assert!(check_circuit(&result.layered_circuit, &witness));
		} else {
			assert!(matches!(solved, Err(SolverError::Unsatisfied(_))));
		}
	}

	// Operands must fit into the comparison width.
	let mut assignment = Assignment::new();
	assignment.set(x, 1).set(y, 1 << 16);
	assert!(
		result
			.input_solver
			.solve(&result.layered_circuit, &assignment, 1)
			.is_err()
	);
}

impl CompileOptions {
	fn with_bits(self, comparison_bits: u32) -> Self {
		Self {
			comparison_bits,
			..self
		}
	}
}

#[derive(Debug, Clone)]
enum Op {
	Add(usize, usize),
	Sub(usize, usize),
	Mul(usize, usize),
	Neg(usize),
	MulConst(usize, u32),
	Const(u32),
}

fn op() -> impl Strategy<Value = Op> {
	prop_oneof![
		(any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Add(a, b)),
		(any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Sub(a, b)),
		(any::<usize>(), any::<usize>()).prop_map(|(a, b)| Op::Mul(a, b)),
		any::<usize>().prop_map(Op::Neg),
		(any::<usize>(), any::<u32>()).prop_map(|(a, k)| Op::MulConst(a, k)),
		any::<u32>().prop_map(Op::Const),
	]
}

proptest! {
	#[test]
	fn random_arithmetic(
		inputs in proptest::collection::vec(0u32..M31::MODULUS, 3),
		ops in proptest::collection::vec(op(), 1..24),
		deduplicate in any::<bool>(),
	) {
		let mut b = CircuitBuilder::<M31>::new();
		let mut vars = Vec::new();
		let mut values = Vec::new();
		for (i, &value) in inputs.iter().enumerate() {
			vars.push(b.add_private(format!("x{i}")));
			values.push(M31::from_u64(value as u64));
		}
		for op in ops {
			let n = vars.len();
			let (var, value) = match op {
				Op::Add(i, j) => (b.add(vars[i % n], vars[j % n]), values[i % n] + values[j % n]),
				Op::Sub(i, j) => (b.sub(vars[i % n], vars[j % n]), values[i % n] - values[j % n]),
				Op::Mul(i, j) => (b.mul(vars[i % n], vars[j % n]), values[i % n] * values[j % n]),
				Op::Neg(i) => (b.neg(vars[i % n]), -values[i % n]),
				Op::MulConst(i, k) => {
					let k = M31::from_u64(k as u64);
					(b.mul_const(vars[i % n], k), values[i % n] * k)
				}
				Op::Const(k) => {
					let k = M31::from_u64(k as u64);
					(b.constant_value(k), k)
				}
			};
			vars.push(var);
			values.push(value);
		}
		let out = b.add_public("out");
		b.assert_is_equal("out", vars[vars.len() - 1], out);
		let graph = b.build().unwrap();

		let result = compile(&graph, &CompileOptions { deduplicate, ..options() }).unwrap();
		let mut assignment = Assignment::new();
		for (i, &value) in inputs.iter().enumerate() {
			assignment.set(vars[i], value as u64);
		}
		let expected = values[values.len() - 1];
		assignment.set_biguint(out, expected.to_biguint());
		let witness = result.input_solver.solve(&result.layered_circuit, &assignment, 2).unwrap();
		prop_assert!(check_circuit(&result.layered_circuit, &witness));
		let public = witness.public_inputs(result.layered_circuit.input_layout(), 1);
		prop_assert_eq!(public, &[expected]);

		assignment.set_biguint(out, (expected + M31::ONE).to_biguint());
		let solved = result.input_solver.solve(&result.layered_circuit, &assignment, 1);
		prop_assert!(matches!(solved, Err(SolverError::Unsatisfied(_))));
	}
}
