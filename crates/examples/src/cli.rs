use std::{
	fs,
	marker::PhantomData,
	path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Args, Command, FromArgMatches};
use stratum_core::{LayeredCircuit, Witness, verify_witness};
use stratum_frontend::{Assignment, CircuitBuilder, CompileOptions, compile};

use crate::ExampleCircuit;

/// File the compiled circuit is written to, inside the output directory.
pub const CIRCUIT_FILE: &str = "circuit.txt";
/// File the solved witness is written to, inside the output directory.
pub const WITNESS_FILE: &str = "witness.txt";

/// A CLI builder for circuit examples that handles all command-line parsing and execution.
///
/// Examples only need to implement [`ExampleCircuit`], derive [`Args`] for their `Params` and
/// `Instance`, and call `Cli::new("name").run()` from `main`:
///
/// ```rust,ignore
/// fn main() -> Result<()> {
///     let _tracing_guard = tracing_profile::init_tracing()?;
///
///     Cli::<MyExample>::new("my_circuit")
///         .about("Description of my circuit")
///         .run()
/// }
/// ```
pub struct Cli<E: ExampleCircuit> {
	command: Command,
	_phantom: PhantomData<E>,
}

impl<E: ExampleCircuit> Cli<E> {
	pub fn new(name: &'static str) -> Self {
		let mut command = Command::new(name);

		command = command
			.arg(
				Arg::new("out_dir")
					.short('o')
					.long("out-dir")
					.value_name("DIR")
					.help("Directory the circuit and witness files are written to")
					.default_value(".")
					.value_parser(clap::value_parser!(PathBuf)),
			)
			.arg(
				Arg::new("multiplicity")
					.short('m')
					.long("multiplicity")
					.value_name("N")
					.help("Number of copies of the instance in the witness")
					.default_value("1")
					.value_parser(clap::value_parser!(u32).range(1..)),
			)
			.arg(
				Arg::new("comparison_bits")
					.long("comparison-bits")
					.value_name("BITS")
					.help("Width of the operands of less-or-equal assertions")
					.default_value("64")
					.value_parser(clap::value_parser!(u32).range(1..)),
			)
			.arg(
				Arg::new("no_dedup")
					.long("no-dedup")
					.help("Do not share wires between identical expressions")
					.action(ArgAction::SetTrue),
			);

		command = E::Params::augment_args(command);
		command = E::Instance::augment_args(command);

		Self {
			command,
			_phantom: PhantomData,
		}
	}

	pub fn about(mut self, about: &'static str) -> Self {
		self.command = self.command.about(about);
		self
	}

	pub fn long_about(mut self, long_about: &'static str) -> Self {
		self.command = self.command.long_about(long_about);
		self
	}

	fn run_with_matches(matches: clap::ArgMatches) -> Result<()> {
		let out_dir = matches
			.get_one::<PathBuf>("out_dir")
			.cloned()
			.unwrap_or_else(|| PathBuf::from("."));
		let multiplicity = matches.get_one::<u32>("multiplicity").copied().unwrap_or(1);
		let options = CompileOptions {
			comparison_bits: matches
				.get_one::<u32>("comparison_bits")
				.copied()
				.unwrap_or(CompileOptions::default().comparison_bits),
			deduplicate: !matches.get_flag("no_dedup"),
		};

		let params = E::Params::from_arg_matches(&matches)?;
		let instance = E::Instance::from_arg_matches(&matches)?;

		let build_scope = tracing::info_span!("Building circuit").entered();
		let mut builder = CircuitBuilder::new();
		let example = E::build(params, &mut builder)?;
		let graph = builder.build()?;
		drop(build_scope);

		let result = compile(&graph, &options)?;
		let circuit = result.layered_circuit;
		let circuit_path = out_dir.join(CIRCUIT_FILE);
		fs::write(&circuit_path, circuit.to_bytes()?)
			.with_context(|| format!("writing {}", circuit_path.display()))?;

		let witness_generation = tracing::info_span!("Generating witness").entered();
		let mut assignment = Assignment::new();
		tracing::info_span!("Input assignment")
			.in_scope(|| example.assign(instance, &mut assignment))?;
		let witness = result
			.input_solver
			.solve(&circuit, &assignment, multiplicity as usize)?;
		drop(witness_generation);

		let witness_path = out_dir.join(WITNESS_FILE);
		fs::write(&witness_path, witness.to_bytes()?)
			.with_context(|| format!("writing {}", witness_path.display()))?;

		check_files::<E>(&circuit_path, &witness_path)?;
		tracing::info!(
			circuit = %circuit_path.display(),
			witness = %witness_path.display(),
			n_wires = circuit.n_wires(),
			n_instances = witness.n_instances(),
			"circuit satisfied"
		);
		Ok(())
	}

	/// Parse arguments and run the circuit example.
	///
	/// This builds and compiles the circuit, writes it to the output directory, solves the
	/// instance given on the command line, writes the witness, and finally checks the circuit
	/// against the witness as read back from disk.
	pub fn run(self) -> Result<()> {
		let matches = self.command.get_matches();
		Self::run_with_matches(matches)
	}

	/// Like [`Cli::run`], with explicit argument strings instead of `std::env::args()`.
	pub fn run_from<I, T>(self, args: I) -> Result<()>
	where
		I: IntoIterator<Item = T>,
		T: Into<std::ffi::OsString> + Clone,
	{
		let matches = self.command.try_get_matches_from(args)?;
		Self::run_with_matches(matches)
	}
}

/// Reads back both artifacts and checks that the witness satisfies the circuit.
fn check_files<E: ExampleCircuit>(circuit_path: &Path, witness_path: &Path) -> Result<()> {
	let _scope = tracing::info_span!("Checking").entered();
	let circuit = LayeredCircuit::<E::Field>::from_bytes(&fs::read(circuit_path)?)?;
	let witness = Witness::<E::Field>::from_bytes(&fs::read(witness_path)?)?;
	verify_witness(&circuit, &witness)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use stratum_core::check_circuit;
	use stratum_field::Bn254Scalar;

	use super::*;
	use crate::circuits::header::HeaderExample;

	fn out_dir(name: &str) -> PathBuf {
		let dir = std::env::temp_dir().join(format!("stratum-{name}-{}", std::process::id()));
		fs::create_dir_all(&dir).unwrap();
		dir
	}

	#[test]
	fn header_artifacts_are_written() {
		let dir = out_dir("header");
		Cli::<HeaderExample>::new("header")
			.run_from(["header", "--out-dir", dir.to_str().unwrap(), "--multiplicity", "3"])
			.unwrap();

		let circuit =
			LayeredCircuit::<Bn254Scalar>::from_bytes(&fs::read(dir.join(CIRCUIT_FILE)).unwrap())
				.unwrap();
		let witness =
			Witness::<Bn254Scalar>::from_bytes(&fs::read(dir.join(WITNESS_FILE)).unwrap()).unwrap();
		assert_eq!(witness.n_instances(), 3);
		assert!(check_circuit(&circuit, &witness));
		fs::remove_dir_all(dir).unwrap();
	}

	#[test]
	fn invalid_instance_is_reported() {
		let dir = out_dir("stale");
		let err = Cli::<HeaderExample>::new("header")
			.run_from([
				"header",
				"--out-dir",
				dir.to_str().unwrap(),
				"--current-timestamp",
				"20240825",
			])
			.unwrap_err();
		assert!(err.to_string().contains("timestamp.parent_distinct"));
		// The circuit is written before solving.
		assert!(dir.join(CIRCUIT_FILE).exists());
		assert!(!dir.join(WITNESS_FILE).exists());
		fs::remove_dir_all(dir).unwrap();
	}

	#[test]
	fn arguments_are_validated() {
		assert!(
			Cli::<HeaderExample>::new("header")
				.run_from(["header", "--multiplicity", "0"])
				.is_err()
		);
	}
}
