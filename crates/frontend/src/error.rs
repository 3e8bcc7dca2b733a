use std::fmt;

use stratum_core::CircuitError;
use stratum_field::{FieldId, ParseLiteralError};

use crate::graph::Variable;

/// Errors raised while recording a constraint graph.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
	#[error("invalid constant: {0}")]
	Literal(#[from] ParseLiteralError),
	#[error("variable {variable:?} does not belong to this builder")]
	ForeignVariable { variable: Variable },
	#[error("input {name:?} is declared more than once")]
	DuplicateInput { name: String },
}

/// Errors raised while lowering a constraint graph into a layered circuit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompilationError {
	#[error("assertion {name:?} can never hold")]
	Unsatisfiable { name: String },
	#[error("public input {name:?} is not constrained by any assertion")]
	UnconstrainedPublicInput { name: String },
	#[error("{bits}-bit comparisons are unsound over {field}")]
	ComparisonTooWide { bits: u32, field: FieldId },
	#[error("assertion {name:?} compares a constant that does not fit into {bits} bits")]
	ConstantOutOfRange { name: String, bits: u32 },
	#[error("graph was built over {expected}, but {found} was requested")]
	FieldMismatch { expected: FieldId, found: FieldId },
	#[error("compiled circuit is malformed: {0}")]
	InvalidCircuit(#[from] CircuitError),
}

/// Errors raised while solving a witness.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SolverError {
	#[error("input {name:?} has no assigned value")]
	MissingInput { name: String },
	#[error("value assigned to input {name:?} is not smaller than the field modulus")]
	OutOfDomain { name: String },
	#[error("variable {variable:?} is assigned a value but is not an input")]
	NotAnInput { variable: Variable },
	#[error("multiplicity must be at least one")]
	ZeroMultiplicity,
	#[error("the circuit was not produced alongside this solver")]
	CircuitMismatch,
	#[error(transparent)]
	Unsatisfied(#[from] AssertionFailures),
	#[error("instance {index}: {source}")]
	Instance {
		index: usize,
		#[source]
		source: Box<SolverError>,
	},
}

/// Assertions that did not hold for an assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssertionFailures {
	/// Failure messages, capped at [`crate::solver::MAX_ASSERTION_MESSAGES`].
	pub messages: Vec<String>,
	/// Total count of failed assertions, which may exceed `messages.len()`.
	pub total_count: usize,
}

impl fmt::Display for AssertionFailures {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "assertions failed:")?;
		for message in &self.messages {
			write!(f, "\n{message}")?;
		}
		if self.total_count > self.messages.len() {
			write!(f, "\n(some assertions are omitted, total: {})", self.total_count)?;
		}
		Ok(())
	}
}

impl std::error::Error for AssertionFailures {}
