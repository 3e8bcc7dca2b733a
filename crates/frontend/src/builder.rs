use std::collections::{HashMap, HashSet};

use cranelift_entity::PrimaryMap;
use itertools::Itertools;
use stratum_field::Field;

use crate::{
	error::BuildError,
	graph::{Constraint, ConstraintGraph, NamedConstraint, Node, Variable},
};

/// Deduplicates constants: each distinct value gets a single variable.
#[derive(Debug)]
pub struct ConstPool<F> {
	pool: HashMap<F, Variable>,
}

impl<F: Field> ConstPool<F> {
	pub fn new() -> Self {
		Self {
			pool: HashMap::new(),
		}
	}

	pub fn get(&self, value: F) -> Option<Variable> {
		self.pool.get(&value).copied()
	}

	pub fn insert(&mut self, value: F, var: Variable) {
		let prev = self.pool.insert(value, var);
		assert!(prev.is_none());
	}

	pub fn len(&self) -> usize {
		self.pool.len()
	}

	pub fn is_empty(&self) -> bool {
		self.pool.is_empty()
	}
}

impl<F: Field> Default for ConstPool<F> {
	fn default() -> Self {
		Self::new()
	}
}

/// Records variables, arithmetic and constraints into a [`ConstraintGraph`].
///
/// The builder is owned by the code defining the circuit and consumed by [`Self::build`]. Errors
/// caused by misuse of a variable are deferred: the offending call still returns a variable, and
/// the first such error is reported by [`Self::build`].
#[derive(Debug)]
pub struct CircuitBuilder<F> {
	nodes: PrimaryMap<Variable, Node<F>>,
	public: Vec<Variable>,
	private: Vec<Variable>,
	constraints: Vec<NamedConstraint>,
	const_pool: ConstPool<F>,
	input_names: HashSet<String>,
	scope: Vec<String>,
	error: Option<BuildError>,
}

impl<F: Field> Default for CircuitBuilder<F> {
	fn default() -> Self {
		Self {
			nodes: PrimaryMap::new(),
			public: Vec::new(),
			private: Vec::new(),
			constraints: Vec::new(),
			const_pool: ConstPool::new(),
			input_names: HashSet::new(),
			scope: Vec::new(),
			error: None,
		}
	}
}

impl<F: Field> CircuitBuilder<F> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Freezes the recorded graph.
	pub fn build(self) -> Result<ConstraintGraph<F>, BuildError> {
		if let Some(err) = self.error {
			return Err(err);
		}
		tracing::debug!(
			n_variables = self.nodes.len(),
			n_public = self.public.len(),
			n_private = self.private.len(),
			n_constraints = self.constraints.len(),
			"constraint graph built"
		);
		Ok(ConstraintGraph {
			nodes: self.nodes,
			public: self.public,
			private: self.private,
			constraints: self.constraints,
		})
	}

	/// Runs `f` with assertion names prefixed by `name.`.
	pub fn scope<R>(&mut self, name: impl Into<String>, f: impl FnOnce(&mut Self) -> R) -> R {
		self.scope.push(name.into());
		let result = f(self);
		self.scope.pop();
		result
	}

	pub fn add_public(&mut self, name: impl Into<String>) -> Variable {
		let name = self.declare(name.into());
		let var = self.nodes.push(Node::Public { name });
		self.public.push(var);
		var
	}

	pub fn add_private(&mut self, name: impl Into<String>) -> Variable {
		let name = self.declare(name.into());
		let var = self.nodes.push(Node::Private { name });
		self.private.push(var);
		var
	}

	fn declare(&mut self, name: String) -> String {
		if !self.input_names.insert(name.clone()) {
			self.fail(BuildError::DuplicateInput { name: name.clone() });
		}
		name
	}

	pub fn constant(&mut self, value: u64) -> Variable {
		self.constant_value(F::from_u64(value))
	}

	/// Adds a constant given as a decimal or `0x`-prefixed hexadecimal literal.
	///
	/// Fails if the literal is malformed or not smaller than the field modulus.
	pub fn constant_str(&mut self, literal: &str) -> Result<Variable, BuildError> {
		let value = F::from_literal(literal)?;
		Ok(self.constant_value(value))
	}

	pub fn constant_value(&mut self, value: F) -> Variable {
		if let Some(var) = self.const_pool.get(value) {
			return var;
		}
		let var = self.nodes.push(Node::Constant(value));
		self.const_pool.insert(value, var);
		var
	}

	/// Returns the value of `var` if it is a constant.
	pub fn const_value(&self, var: Variable) -> Option<F> {
		match self.nodes.get(var)? {
			Node::Constant(value) => Some(*value),
			_ => None,
		}
	}

	pub fn add(&mut self, a: Variable, b: Variable) -> Variable {
		self.binary(a, b, |x, y| x + y, Node::Add)
	}

	pub fn sub(&mut self, a: Variable, b: Variable) -> Variable {
		self.binary(a, b, |x, y| x - y, Node::Sub)
	}

	pub fn mul(&mut self, a: Variable, b: Variable) -> Variable {
		self.binary(a, b, |x, y| x * y, Node::Mul)
	}

	pub fn neg(&mut self, a: Variable) -> Variable {
		self.check(a);
		match self.const_value(a) {
			Some(x) => self.constant_value(-x),
			None => self.nodes.push(Node::Neg(a)),
		}
	}

	/// Multiplies `a` by a field constant.
	pub fn mul_const(&mut self, a: Variable, k: F) -> Variable {
		self.check(a);
		match self.const_value(a) {
			Some(x) => self.constant_value(x * k),
			None => self.nodes.push(Node::MulConst(a, k)),
		}
	}

	fn binary(
		&mut self,
		a: Variable,
		b: Variable,
		fold: impl FnOnce(F, F) -> F,
		node: impl FnOnce(Variable, Variable) -> Node<F>,
	) -> Variable {
		self.check(a);
		self.check(b);
		match (self.const_value(a), self.const_value(b)) {
			(Some(x), Some(y)) => self.constant_value(fold(x, y)),
			_ => self.nodes.push(node(a, b)),
		}
	}

	pub fn assert_is_equal(&mut self, name: impl AsRef<str>, a: Variable, b: Variable) {
		self.assert(name.as_ref(), Constraint::IsEqual(a, b));
	}

	pub fn assert_is_different(&mut self, name: impl AsRef<str>, a: Variable, b: Variable) {
		self.assert(name.as_ref(), Constraint::IsDifferent(a, b));
	}

	/// Asserts `a <= b` where both sides are compared as unsigned integers.
	///
	/// Both sides must fit into the comparison width configured at compile time.
	pub fn assert_is_less_or_equal(&mut self, name: impl AsRef<str>, a: Variable, b: Variable) {
		self.assert(name.as_ref(), Constraint::IsLessOrEqual(a, b));
	}

	pub fn assert_is_bool(&mut self, name: impl AsRef<str>, a: Variable) {
		self.assert(name.as_ref(), Constraint::IsBool(a));
	}

	pub fn assert_is_zero(&mut self, name: impl AsRef<str>, a: Variable) {
		self.assert(name.as_ref(), Constraint::IsZero(a));
	}

	fn assert(&mut self, name: &str, constraint: Constraint) {
		for var in constraint.operands() {
			self.check(var);
		}
		let name = self
			.scope
			.iter()
			.map(String::as_str)
			.chain([name])
			.join(".");
		self.constraints.push(NamedConstraint { name, constraint });
	}

	fn check(&mut self, var: Variable) {
		if self.nodes.get(var).is_none() {
			self.fail(BuildError::ForeignVariable { variable: var });
		}
	}

	fn fail(&mut self, err: BuildError) {
		self.error.get_or_insert(err);
	}
}

/// A circuit described declaratively on top of a [`CircuitBuilder`].
///
/// Implementors keep the variables they declare so that assignments can be produced for them.
pub trait Circuit<F: Field>: Sized {
	fn define(builder: &mut CircuitBuilder<F>) -> Result<Self, BuildError>;

	/// Defines the circuit on a fresh builder and freezes the graph.
	fn build() -> Result<(Self, ConstraintGraph<F>), BuildError> {
		let mut builder = CircuitBuilder::new();
		let circuit = Self::define(&mut builder)?;
		let graph = builder.build()?;
		Ok((circuit, graph))
	}
}

#[cfg(test)]
mod tests {
	use stratum_field::{Bn254Scalar, M31, ParseLiteralError};

	use super::*;

	#[test]
	fn inputs_in_declaration_order() {
		let mut b = CircuitBuilder::<M31>::new();
		let x = b.add_private("x");
		let y = b.add_public("y");
		let z = b.add_public("z");
		let graph = b.build().unwrap();
		assert_eq!(graph.public_inputs(), &[y, z]);
		assert_eq!(graph.private_inputs(), &[x]);
		assert_eq!(graph.input("z"), Some(z));
		assert_eq!(graph.input_name(x), Some("x"));
	}

	#[test]
	fn constants_are_pooled() {
		let mut b = CircuitBuilder::<M31>::new();
		let one = b.constant(1);
		assert_eq!(b.constant_str("0x1").unwrap(), one);
		assert_ne!(b.constant(2), one);
	}

	#[test]
	fn constant_arithmetic_is_folded() {
		let mut b = CircuitBuilder::<M31>::new();
		let two = b.constant(2);
		let three = b.constant(3);
		let five = b.add(two, three);
		assert_eq!(b.const_value(five), Some(M31::from_u64(5)));
		let six = b.mul(two, three);
		assert_eq!(six, b.constant(6));
		let minus_one = b.sub(two, three);
		assert_eq!(b.const_value(minus_one), Some(-M31::ONE));
		let graph = b.build().unwrap();
		assert!(
			graph
				.nodes
				.values()
				.all(|node| matches!(node, Node::Constant(_)))
		);
	}

	#[test]
	fn out_of_range_literal() {
		let mut b = CircuitBuilder::<Bn254Scalar>::new();
		let err = b
			.constant_str("0x30644e72e131a029b85045b68181585d2833e84879b9709143e1f593f0000001")
			.unwrap_err();
		assert!(matches!(err, BuildError::Literal(ParseLiteralError::OutOfRange { .. })));
		assert!(matches!(
			b.constant_str("12z"),
			Err(BuildError::Literal(ParseLiteralError::Malformed { .. }))
		));
	}

	#[test]
	fn scoped_assertion_names() {
		let mut b = CircuitBuilder::<M31>::new();
		let x = b.add_public("x");
		b.scope("header", |b| {
			b.scope("gas", |b| b.assert_is_zero("used", x));
			b.assert_is_bool("flag", x);
		});
		b.assert_is_zero("top", x);
		let graph = b.build().unwrap();
		let names: Vec<_> = graph.constraints().iter().map(|c| c.name.as_str()).collect();
		assert_eq!(names, ["header.gas.used", "header.flag", "top"]);
	}

	#[test]
	fn foreign_variable_is_reported_on_build() {
		let mut other = CircuitBuilder::<M31>::new();
		for i in 0..4 {
			other.add_private(format!("w{i}"));
		}
		let foreign = other.add_private("foreign");

		let mut b = CircuitBuilder::<M31>::new();
		let x = b.add_public("x");
		let sum = b.add(x, foreign);
		b.assert_is_zero("sum", sum);
		assert_eq!(b.build().unwrap_err(), BuildError::ForeignVariable { variable: foreign });
	}

	#[test]
	fn duplicate_input_name() {
		let mut b = CircuitBuilder::<M31>::new();
		b.add_public("x");
		b.add_private("x");
		assert_eq!(
			b.build().unwrap_err(),
			BuildError::DuplicateInput { name: "x".into() }
		);
	}

	#[test]
	fn circuit_trait() {
		struct Square {
			x: Variable,
			y: Variable,
		}

		impl<F: Field> Circuit<F> for Square {
			fn define(b: &mut CircuitBuilder<F>) -> Result<Self, BuildError> {
				let x = b.add_private("x");
				let y = b.add_public("y");
				let xx = b.mul(x, x);
				b.assert_is_equal("square", xx, y);
				Ok(Self { x, y })
			}
		}

		let (square, graph) = <Square as Circuit<M31>>::build().unwrap();
		assert_eq!(graph.private_inputs(), &[square.x]);
		assert_eq!(graph.public_inputs(), &[square.y]);
		assert_eq!(graph.constraints().len(), 1);
	}
}
