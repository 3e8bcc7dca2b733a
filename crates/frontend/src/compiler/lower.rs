//! Lowering of a constraint graph into a straight-line program of wires.
//!
//! Every wire is either an input, a hint computed by the solver, or a materialized expression of
//! degree at most two over earlier wires. Constraints become wires that must evaluate to zero.

use std::collections::HashMap;

use cranelift_entity::{EntityRef, PrimaryMap, SecondaryMap};
use stratum_field::{BigUint, Field};

use super::{
	CompileOptions,
	expr::{Expr, Term, WireId},
};
use crate::{
	error::CompilationError,
	graph::{Constraint, ConstraintGraph, NamedConstraint, Node, Variable},
};

/// Prover-side computation producing a layer-0 wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Hint {
	/// Inverse of the source value, or zero if it has none.
	Inverse(WireId),
	/// Bit `index` of the canonical representative of the source value.
	Bit { source: WireId, index: u32 },
}

impl Hint {
	pub fn evaluate<F: Field>(&self, values: &[F]) -> F {
		match *self {
			Hint::Inverse(source) => values[source.index()].inverse().unwrap_or(F::ZERO),
			Hint::Bit { source, index } => {
				if values[source.index()].bit(index as u64) {
					F::ONE
				} else {
					F::ZERO
				}
			}
		}
	}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step<F> {
	/// The declared input at this position, public inputs first.
	Input(usize),
	Hint(Hint),
	Derived(Expr<F>),
}

/// A wire that must be zero, and the index of the constraint it came from.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Assertion {
	pub wire: WireId,
	pub constraint: usize,
}

#[derive(Clone, Debug)]
pub struct Program<F> {
	pub steps: PrimaryMap<WireId, Step<F>>,
	pub inputs: Vec<Variable>,
	pub n_public: usize,
	pub assertions: Vec<Assertion>,
}

pub fn lower<F: Field>(
	graph: &ConstraintGraph<F>,
	options: &CompileOptions,
) -> Result<Program<F>, CompilationError> {
	let mut lowering = Lowering {
		options,
		steps: PrimaryMap::new(),
		cache: HashMap::new(),
		exprs: SecondaryMap::new(),
		assertions: Vec::new(),
	};

	let inputs = graph
		.public_inputs()
		.iter()
		.chain(graph.private_inputs())
		.copied()
		.collect::<Vec<_>>();
	for (pos, &var) in inputs.iter().enumerate() {
		let wire = lowering.steps.push(Step::Input(pos));
		lowering.exprs[var] = Some(Expr::wire(wire));
	}

	let live = live_variables(graph);
	for (var, node) in graph.nodes.iter() {
		if !live[var] || node.is_input() {
			continue;
		}
		let expr = lowering.node(node);
		lowering.exprs[var] = Some(expr);
	}

	for (index, constraint) in graph.constraints().iter().enumerate() {
		lowering.constraint(index, constraint)?;
	}

	tracing::debug!(
		n_wires = lowering.steps.len(),
		n_assertions = lowering.assertions.len(),
		n_cached = lowering.cache.len(),
		"lowered constraint graph"
	);

	Ok(Program {
		steps: lowering.steps,
		n_public: graph.public_inputs().len(),
		inputs,
		assertions: lowering.assertions,
	})
}

/// Marks the variables some constraint depends on.
fn live_variables<F>(graph: &ConstraintGraph<F>) -> SecondaryMap<Variable, bool> {
	let mut live = SecondaryMap::with_capacity(graph.n_variables());
	for constraint in graph.constraints() {
		for var in constraint.constraint.operands() {
			live[var] = true;
		}
	}
	// Operands precede their users, so a single backwards sweep suffices.
	for var in graph.nodes.keys().rev() {
		if live[var] {
			for operand in graph.nodes[var].operands() {
				live[operand] = true;
			}
		}
	}
	live
}

struct Lowering<'a, F: Clone> {
	options: &'a CompileOptions,
	steps: PrimaryMap<WireId, Step<F>>,
	cache: HashMap<Expr<F>, WireId>,
	exprs: SecondaryMap<Variable, Option<Expr<F>>>,
	assertions: Vec<Assertion>,
}

impl<F: Field> Lowering<'_, F> {
	fn expr(&self, var: Variable) -> Expr<F> {
		match &self.exprs[var] {
			Some(expr) => expr.clone(),
			None => unreachable!("{var:?} is used before it is lowered"),
		}
	}

	fn node(&mut self, node: &Node<F>) -> Expr<F> {
		match *node {
			Node::Public { .. } | Node::Private { .. } => {
				unreachable!("inputs are lowered up front")
			}
			Node::Constant(value) => Expr::constant(value),
			Node::Add(a, b) => self.expr(a).add(&self.expr(b)),
			Node::Sub(a, b) => self.expr(a).sub(&self.expr(b)),
			Node::Mul(a, b) => {
				let (a, b) = (self.expr(a), self.expr(b));
				self.mul(&a, &b)
			}
			Node::Neg(a) => self.expr(a).scale(-F::ONE),
			Node::MulConst(a, k) => self.expr(a).scale(k),
		}
	}

	fn mul(&mut self, a: &Expr<F>, b: &Expr<F>) -> Expr<F> {
		if let Some(k) = a.as_constant() {
			return b.scale(k);
		}
		if let Some(k) = b.as_constant() {
			return a.scale(k);
		}
		let (wa, ka) = self.operand(a);
		let (wb, kb) = self.operand(b);
		Expr::product(wa, wb, ka * kb)
	}

	/// Writes `expr` as `k * w` for a single wire `w`, materializing it if needed.
	fn operand(&mut self, expr: &Expr<F>) -> (WireId, F) {
		match expr.as_scaled_wire() {
			Some(scaled) => scaled,
			None => (self.materialize(expr), F::ONE),
		}
	}

	/// Returns a wire carrying the value of `expr`.
	fn materialize(&mut self, expr: &Expr<F>) -> WireId {
		if let Some((wire, coef)) = expr.as_scaled_wire() {
			if coef == F::ONE {
				return wire;
			}
		}
		if self.options.deduplicate {
			if let Some(&wire) = self.cache.get(expr) {
				return wire;
			}
		}
		let wire = self.steps.push(Step::Derived(expr.clone()));
		if self.options.deduplicate {
			self.cache.insert(expr.clone(), wire);
		}
		wire
	}

	fn hint(&mut self, hint: Hint) -> WireId {
		self.steps.push(Step::Hint(hint))
	}

	fn constraint(
		&mut self,
		index: usize,
		constraint: &NamedConstraint,
	) -> Result<(), CompilationError> {
		let name = &constraint.name;
		match constraint.constraint {
			Constraint::IsEqual(a, b) => {
				let diff = self.expr(a).sub(&self.expr(b));
				self.assert_zero(index, name, &diff)
			}
			Constraint::IsZero(a) => {
				let value = self.expr(a);
				self.assert_zero(index, name, &value)
			}
			Constraint::IsBool(a) => {
				let value = self.expr(a);
				let square = self.mul(&value, &value);
				self.assert_zero(index, name, &square.sub(&value))
			}
			Constraint::IsDifferent(a, b) => {
				let diff = self.expr(a).sub(&self.expr(b));
				match diff.as_constant() {
					Some(residue) if residue.is_zero() => Err(unsatisfiable(name)),
					Some(_) => Ok(()),
					None => {
						// diff = k * w with k non-zero, so w has an inverse iff diff does.
						let (wire, _) = self.operand(&diff);
						let inverse = self.hint(Hint::Inverse(wire));
						let check = Expr::product(wire, inverse, F::ONE)
							.sub(&Expr::constant(F::ONE));
						self.assert_zero(index, name, &check)
					}
				}
			}
			Constraint::IsLessOrEqual(a, b) => {
				let (a, b) = (self.expr(a), self.expr(b));
				self.less_or_equal(index, name, &a, &b)
			}
		}
	}

	/// Proves `a <= b` by showing that `a`, `b` and `b - a` all fit into `K` bits.
	///
	/// If `b < a` then `b - a` wraps around to at least `p - 2^K`, which is not below `2^K` as long
	/// as `2^(K + 1) < p`.
	fn less_or_equal(
		&mut self,
		index: usize,
		name: &str,
		a: &Expr<F>,
		b: &Expr<F>,
	) -> Result<(), CompilationError> {
		let bits = self.options.comparison_bits;
		// p < 2^MODULUS_BITS, so wider comparisons fail without building the bound.
		if bits as u64 + 1 >= F::MODULUS_BITS as u64 {
			return Err(CompilationError::ComparisonTooWide { bits, field: F::ID });
		}
		let bound = BigUint::from(1u8) << bits;
		if F::modulus() <= &bound << 1u32 {
			return Err(CompilationError::ComparisonTooWide { bits, field: F::ID });
		}

		for side in [a, b] {
			if let Some(value) = side.as_constant() {
				if value.to_biguint() >= bound {
					return Err(CompilationError::ConstantOutOfRange {
						name: name.to_string(),
						bits,
					});
				}
			}
		}
		for side in [a, b] {
			if side.as_constant().is_none() {
				self.range_check(index, name, side, bits)?;
			}
		}

		let diff = b.sub(a);
		match diff.as_constant() {
			Some(residue) if residue.to_biguint() >= bound => Err(unsatisfiable(name)),
			Some(_) => Ok(()),
			None => self.range_check(index, name, &diff, bits),
		}
	}

	/// Constrains `value` to `[0, 2^bits)` through a decomposition into hinted bits.
	fn range_check(
		&mut self,
		index: usize,
		name: &str,
		value: &Expr<F>,
		bits: u32,
	) -> Result<(), CompilationError> {
		let source = self.materialize(value);
		let mut recomposed = Expr::zero();
		let mut weight = F::ONE;
		for i in 0..bits {
			let bit = self.hint(Hint::Bit { source, index: i });
			let boolean = Expr::product(bit, bit, F::ONE).sub(&Expr::wire(bit));
			self.assert_zero(index, name, &boolean)?;
			recomposed.add_term(Term::Linear(bit), weight);
			weight += weight;
		}
		self.assert_zero(index, name, &recomposed.sub(&Expr::wire(source)))
	}

	fn assert_zero(
		&mut self,
		index: usize,
		name: &str,
		expr: &Expr<F>,
	) -> Result<(), CompilationError> {
		match expr.as_constant() {
			Some(residue) if residue.is_zero() => Ok(()),
			Some(_) => Err(unsatisfiable(name)),
			None => {
				let wire = self.materialize(expr);
				self.assertions.push(Assertion {
					wire,
					constraint: index,
				});
				Ok(())
			}
		}
	}
}

fn unsatisfiable(name: &str) -> CompilationError {
	CompilationError::Unsatisfiable {
		name: name.to_string(),
	}
}
