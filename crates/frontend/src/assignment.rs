use std::collections::{BTreeMap, btree_map};

use stratum_field::{BigUint, ParseLiteralError, parse_literal};

use crate::graph::Variable;

/// Values of the input variables of a constraint graph.
///
/// Values are unbounded integers; they are reduced to field elements by the solver, which rejects
/// values that are not smaller than the modulus.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Assignment {
	values: BTreeMap<Variable, BigUint>,
}

impl Assignment {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&mut self, var: Variable, value: u64) -> &mut Self {
		self.set_biguint(var, BigUint::from(value))
	}

	pub fn set_biguint(&mut self, var: Variable, value: BigUint) -> &mut Self {
		self.values.insert(var, value);
		self
	}

	/// Assigns a decimal or `0x`-prefixed hexadecimal literal.
	pub fn set_str(&mut self, var: Variable, literal: &str) -> Result<&mut Self, ParseLiteralError> {
		let value = parse_literal(literal)?;
		Ok(self.set_biguint(var, value))
	}

	pub fn get(&self, var: Variable) -> Option<&BigUint> {
		self.values.get(&var)
	}

	pub fn len(&self) -> usize {
		self.values.len()
	}

	pub fn is_empty(&self) -> bool {
		self.values.is_empty()
	}

	/// Assigned variables in increasing order.
	pub fn iter(&self) -> btree_map::Iter<'_, Variable, BigUint> {
		self.values.iter()
	}
}
