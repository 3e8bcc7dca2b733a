//! Canonical expressions of degree at most two over materialized wires.

use std::collections::BTreeMap;

use cranelift_entity::entity_impl;
use smallvec::SmallVec;
use stratum_field::Field;

/// A wire created during lowering, numbered in creation order.
///
/// Creation order is a topological order: the expression of a wire only refers to wires created
/// before it.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WireId(u32);
entity_impl!(WireId);

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Term {
	Const,
	Linear(WireId),
	/// Product of two wires, ordered so that the first is not greater than the second.
	Quadratic(WireId, WireId),
}

impl Term {
	pub fn quadratic(a: WireId, b: WireId) -> Self {
		if a <= b {
			Term::Quadratic(a, b)
		} else {
			Term::Quadratic(b, a)
		}
	}

	fn wires(&self) -> SmallVec<[WireId; 2]> {
		match *self {
			Term::Const => SmallVec::new(),
			Term::Linear(w) => SmallVec::from_slice(&[w]),
			Term::Quadratic(a, b) => SmallVec::from_slice(&[a, b]),
		}
	}
}

/// A sum of terms with non-zero coefficients.
///
/// The representation is canonical: two expressions denoting the same polynomial compare equal
/// and hash equally, which is what the materialization cache relies on.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Expr<F> {
	terms: BTreeMap<Term, F>,
}

impl<F: Field> Expr<F> {
	pub fn zero() -> Self {
		Self {
			terms: BTreeMap::new(),
		}
	}

	pub fn constant(value: F) -> Self {
		let mut expr = Self::zero();
		expr.add_term(Term::Const, value);
		expr
	}

	pub fn wire(wire: WireId) -> Self {
		let mut expr = Self::zero();
		expr.add_term(Term::Linear(wire), F::ONE);
		expr
	}

	pub fn product(a: WireId, b: WireId, coef: F) -> Self {
		let mut expr = Self::zero();
		expr.add_term(Term::quadratic(a, b), coef);
		expr
	}

	pub fn add_term(&mut self, term: Term, coef: F) {
		let entry = self.terms.entry(term).or_insert(F::ZERO);
		*entry += coef;
		if entry.is_zero() {
			self.terms.remove(&term);
		}
	}

	pub fn add(&self, other: &Self) -> Self {
		let mut sum = self.clone();
		for (&term, &coef) in &other.terms {
			sum.add_term(term, coef);
		}
		sum
	}

	pub fn sub(&self, other: &Self) -> Self {
		self.add(&other.scale(-F::ONE))
	}

	pub fn scale(&self, k: F) -> Self {
		if k.is_zero() {
			return Self::zero();
		}
		Self {
			terms: self
				.terms
				.iter()
				.map(|(&term, &coef)| (term, coef * k))
				.collect(),
		}
	}

	/// The value of the expression if it contains no wire.
	pub fn as_constant(&self) -> Option<F> {
		match self.terms.len() {
			0 => Some(F::ZERO),
			1 => self.terms.get(&Term::Const).copied(),
			_ => None,
		}
	}

	/// Decomposes `k * w` into `(w, k)`.
	pub fn as_scaled_wire(&self) -> Option<(WireId, F)> {
		let mut terms = self.terms.iter();
		match (terms.next(), terms.next()) {
			(Some((&Term::Linear(w), &coef)), None) => Some((w, coef)),
			_ => None,
		}
	}

	pub fn terms(&self) -> impl Iterator<Item = (Term, F)> + '_ {
		self.terms.iter().map(|(&term, &coef)| (term, coef))
	}

	/// Wires referenced by the expression, possibly with repetitions.
	pub fn wires(&self) -> impl Iterator<Item = WireId> + '_ {
		self.terms.keys().flat_map(Term::wires)
	}

	/// Evaluates the expression, reading wire values indexed by [`WireId`].
	pub fn evaluate(&self, values: &[F]) -> F {
		let value = |w: WireId| values[w.as_u32() as usize];
		self.terms
			.iter()
			.map(|(term, &coef)| match *term {
				Term::Const => coef,
				Term::Linear(w) => coef * value(w),
				Term::Quadratic(a, b) => coef * value(a) * value(b),
			})
			.fold(F::ZERO, |acc, x| acc + x)
	}
}
