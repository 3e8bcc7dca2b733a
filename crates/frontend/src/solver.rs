//! Witness generation for compiled circuits.

use std::collections::HashMap;

use cranelift_entity::{PrimaryMap, SecondaryMap};
use rayon::prelude::*;
use stratum_core::{LayeredCircuit, WireIndex, Witness};
use stratum_field::Field;

use crate::{
	assignment::Assignment,
	compiler::{
		expr::WireId,
		lower::{Program, Step},
	},
	error::{AssertionFailures, SolverError},
	graph::{ConstraintGraph, Variable},
};

/// Upper bound on the number of failure messages kept by [`AssertionFailures`].
pub const MAX_ASSERTION_MESSAGES: usize = 100;

#[derive(Clone, Debug)]
struct InputSlot {
	var: Variable,
	name: String,
}

/// Computes witnesses for the layered circuit it was compiled together with.
///
/// The solver runs the lowered program to obtain the inputs and hints of layer 0, then evaluates
/// the layered circuit gate by gate and checks its assertions.
#[derive(Clone, Debug)]
pub struct InputSolver<F> {
	inputs: Vec<InputSlot>,
	positions: HashMap<Variable, usize>,
	steps: PrimaryMap<WireId, Step<F>>,
	placement: SecondaryMap<WireId, WireIndex>,
	messages: Vec<String>,
	assertion_sources: Vec<usize>,
	/// The circuit compiled together with this solver.
	circuit: LayeredCircuit<F>,
}

impl<F: Field> InputSolver<F> {
	pub(crate) fn new(
		graph: &ConstraintGraph<F>,
		program: Program<F>,
		placement: SecondaryMap<WireId, WireIndex>,
		circuit: &LayeredCircuit<F>,
	) -> Self {
		let inputs = program
			.inputs
			.iter()
			.map(|&var| InputSlot {
				var,
				name: graph.input_name(var).unwrap_or_default().to_string(),
			})
			.collect::<Vec<_>>();
		let positions = inputs
			.iter()
			.enumerate()
			.map(|(pos, slot)| (slot.var, pos))
			.collect();
		let messages = graph
			.constraints()
			.iter()
			.map(|c| format!("{} failed: {}", c.name, c.constraint.kind()))
			.collect();
		let assertion_sources = program
			.assertions
			.iter()
			.map(|assertion| assertion.constraint)
			.collect();
		Self {
			inputs,
			positions,
			steps: program.steps,
			placement,
			messages,
			assertion_sources,
			circuit: circuit.clone(),
		}
	}

	/// Names of the inputs, public inputs first, in declaration order.
	pub fn input_names(&self) -> impl Iterator<Item = &str> {
		self.inputs.iter().map(|slot| slot.name.as_str())
	}

	/// Solves `circuit` for `assignment` and replicates the result `multiplicity` times.
	pub fn solve(
		&self,
		circuit: &LayeredCircuit<F>,
		assignment: &Assignment,
		multiplicity: usize,
	) -> Result<Witness<F>, SolverError> {
		let _span = tracing::info_span!("solve", multiplicity).entered();
		if multiplicity == 0 {
			return Err(SolverError::ZeroMultiplicity);
		}
		self.check_circuit(circuit)?;

		let inputs = self.read_inputs(assignment)?;
		let n_wires = circuit.n_wires();
		let mut witness = Witness::new(multiplicity, n_wires);
		if n_wires > 0 {
			let (first, rest) = witness.values_mut().split_at_mut(n_wires);
			self.solve_instance(circuit, &inputs, first)?;
			let first = &*first;
			rest.par_chunks_mut(n_wires)
				.for_each(|instance| instance.copy_from_slice(first));
		}
		Ok(witness)
	}

	/// Solves one instance per assignment, in parallel.
	///
	/// Instance `i` of the witness corresponds to `assignments[i]`. If several instances fail, the
	/// error of the lowest index is returned.
	pub fn solve_batch(
		&self,
		circuit: &LayeredCircuit<F>,
		assignments: &[Assignment],
	) -> Result<Witness<F>, SolverError> {
		let _span = tracing::info_span!("solve_batch", n_instances = assignments.len()).entered();
		if assignments.is_empty() {
			return Err(SolverError::ZeroMultiplicity);
		}
		self.check_circuit(circuit)?;

		let n_wires = circuit.n_wires();
		let mut witness = Witness::new(assignments.len(), n_wires);
		if n_wires == 0 {
			// Nothing to fill, but the assignments must still name inputs only.
			for (index, assignment) in assignments.iter().enumerate() {
				self.read_inputs(assignment)
					.map_err(|source| SolverError::Instance {
						index,
						source: Box::new(source),
					})?;
			}
			return Ok(witness);
		}
		let results = witness
			.values_mut()
			.par_chunks_mut(n_wires)
			.zip(assignments.par_iter())
			.enumerate()
			.map(|(index, (values, assignment))| {
				self.read_inputs(assignment)
					.and_then(|inputs| self.solve_instance(circuit, &inputs, values))
					.map_err(|source| SolverError::Instance {
						index,
						source: Box::new(source),
					})
			})
			.collect::<Vec<_>>();
		results.into_iter().collect::<Result<(), _>>()?;
		Ok(witness)
	}

	fn check_circuit(&self, circuit: &LayeredCircuit<F>) -> Result<(), SolverError> {
		if *circuit != self.circuit {
			return Err(SolverError::CircuitMismatch);
		}
		Ok(())
	}

	/// Converts the assigned literals into field elements, in input order.
	fn read_inputs(&self, assignment: &Assignment) -> Result<Vec<F>, SolverError> {
		if let Some((&variable, _)) = assignment
			.iter()
			.find(|(var, _)| !self.positions.contains_key(*var))
		{
			return Err(SolverError::NotAnInput { variable });
		}
		self.inputs
			.iter()
			.map(|slot| {
				let value = assignment
					.get(slot.var)
					.ok_or_else(|| SolverError::MissingInput {
						name: slot.name.clone(),
					})?;
				F::from_biguint(value).ok_or_else(|| SolverError::OutOfDomain {
					name: slot.name.clone(),
				})
			})
			.collect()
	}

	/// Fills the zero-initialized wire vector `values` of a single instance.
	fn solve_instance(
		&self,
		circuit: &LayeredCircuit<F>,
		inputs: &[F],
		values: &mut [F],
	) -> Result<(), SolverError> {
		let mut program_values = Vec::with_capacity(self.steps.len());
		for step in self.steps.values() {
			let value = match step {
				Step::Input(pos) => inputs[*pos],
				Step::Hint(hint) => hint.evaluate(&program_values),
				Step::Derived(expr) => expr.evaluate(&program_values),
			};
			program_values.push(value);
		}

		for (wire, step) in self.steps.iter() {
			if matches!(step, Step::Input(_) | Step::Hint(_)) {
				values[self.placement[wire].as_usize()] = program_values[wire.as_u32() as usize];
			}
		}

		for layer in circuit.layers() {
			for gate in &layer.mul {
				let [a, b] = gate.inputs;
				let term = gate.coef * values[a.as_usize()] * values[b.as_usize()];
				values[gate.output.as_usize()] += term;
			}
			for gate in &layer.add {
				let term = gate.coef * values[gate.input.as_usize()];
				values[gate.output.as_usize()] += term;
			}
			for gate in &layer.cst {
				values[gate.output.as_usize()] += gate.coef;
			}
		}
		// The gates must reproduce every wire the program placed.
		let reproduced = self.steps.keys().all(|wire| {
			values[self.placement[wire].as_usize()] == program_values[wire.as_u32() as usize]
		});
		if !reproduced {
			return Err(SolverError::CircuitMismatch);
		}

		let mut failed = vec![false; self.messages.len()];
		let mut failures = AssertionFailures {
			messages: Vec::new(),
			total_count: 0,
		};
		for (wire, &constraint) in circuit.assertions().iter().zip(&self.assertion_sources) {
			if values[wire.as_usize()].is_zero() || failed[constraint] {
				continue;
			}
			failed[constraint] = true;
			failures.total_count += 1;
			if failures.messages.len() < MAX_ASSERTION_MESSAGES {
				failures.messages.push(self.messages[constraint].clone());
			}
		}
		if failures.total_count > 0 {
			return Err(failures.into());
		}
		Ok(())
	}
}
