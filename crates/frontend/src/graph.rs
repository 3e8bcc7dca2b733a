//! The frozen constraint graph produced by [`crate::CircuitBuilder::build`].

use cranelift_entity::{PrimaryMap, entity_impl};
use smallvec::{SmallVec, smallvec};

/// A variable of the constraint graph.
///
/// Variables are handed out by a [`crate::CircuitBuilder`] and are only meaningful for the graph
/// that builder produces.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Variable(u32);
entity_impl!(Variable);

/// How the value of a variable is obtained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node<F> {
	/// A public input. Its value is visible to anyone checking the circuit.
	Public { name: String },
	/// A private input, known only to whoever solves the circuit.
	Private { name: String },
	Constant(F),
	Add(Variable, Variable),
	Sub(Variable, Variable),
	Mul(Variable, Variable),
	Neg(Variable),
	MulConst(Variable, F),
}

impl<F> Node<F> {
	/// The variables this node reads.
	pub fn operands(&self) -> SmallVec<[Variable; 2]> {
		match *self {
			Node::Public { .. } | Node::Private { .. } | Node::Constant(_) => SmallVec::new(),
			Node::Add(a, b) | Node::Sub(a, b) | Node::Mul(a, b) => smallvec![a, b],
			Node::Neg(a) | Node::MulConst(a, _) => smallvec![a],
		}
	}

	pub fn is_input(&self) -> bool {
		matches!(self, Node::Public { .. } | Node::Private { .. })
	}
}

/// A relation between variables that every satisfying assignment must uphold.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Constraint {
	/// `a == b`
	IsEqual(Variable, Variable),
	/// `a != b`
	IsDifferent(Variable, Variable),
	/// `a <= b`, comparing canonical representatives as integers.
	IsLessOrEqual(Variable, Variable),
	/// `a ∈ {0, 1}`
	IsBool(Variable),
	/// `a == 0`
	IsZero(Variable),
}

impl Constraint {
	pub fn operands(&self) -> SmallVec<[Variable; 2]> {
		match *self {
			Constraint::IsEqual(a, b)
			| Constraint::IsDifferent(a, b)
			| Constraint::IsLessOrEqual(a, b) => smallvec![a, b],
			Constraint::IsBool(a) | Constraint::IsZero(a) => smallvec![a],
		}
	}

	/// Short name of the relation, used in diagnostics.
	pub fn kind(&self) -> &'static str {
		match self {
			Constraint::IsEqual(..) => "is_equal",
			Constraint::IsDifferent(..) => "is_different",
			Constraint::IsLessOrEqual(..) => "is_less_or_equal",
			Constraint::IsBool(..) => "is_bool",
			Constraint::IsZero(..) => "is_zero",
		}
	}
}

/// A constraint together with the dotted assertion name it was recorded under.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NamedConstraint {
	pub name: String,
	pub constraint: Constraint,
}

/// Variables, the nodes defining them and the ordered list of constraints.
///
/// Operands of a node always have a smaller index than the node itself, so iterating the nodes in
/// index order is a topological order.
#[derive(Clone, Debug)]
pub struct ConstraintGraph<F> {
	pub(crate) nodes: PrimaryMap<Variable, Node<F>>,
	pub(crate) public: Vec<Variable>,
	pub(crate) private: Vec<Variable>,
	pub(crate) constraints: Vec<NamedConstraint>,
}

impl<F> ConstraintGraph<F> {
	pub fn node(&self, var: Variable) -> &Node<F> {
		&self.nodes[var]
	}

	pub fn n_variables(&self) -> usize {
		self.nodes.len()
	}

	/// Public inputs in declaration order.
	pub fn public_inputs(&self) -> &[Variable] {
		&self.public
	}

	/// Private inputs in declaration order.
	pub fn private_inputs(&self) -> &[Variable] {
		&self.private
	}

	pub fn constraints(&self) -> &[NamedConstraint] {
		&self.constraints
	}

	/// The declaration name of an input variable.
	pub fn input_name(&self, var: Variable) -> Option<&str> {
		match self.nodes.get(var)? {
			Node::Public { name } | Node::Private { name } => Some(name),
			_ => None,
		}
	}

	/// Looks up an input by its declaration name.
	pub fn input(&self, name: &str) -> Option<Variable> {
		self.public
			.iter()
			.chain(&self.private)
			.copied()
			.find(|&var| self.input_name(var) == Some(name))
	}
}
