use anyhow::Result;
use stratum_examples::{Cli, circuits::header::HeaderExample};

fn main() -> Result<()> {
	let _tracing_guard = tracing_profile::init_tracing()?;

	Cli::<HeaderExample>::new("header")
		.about("Block header validation: height, timestamps, hashes, gas and difficulty")
		.long_about(
			"Compiles the block header circuit, writes circuit.txt, solves the given header \
			 (the built-in one by default), writes witness.txt and checks the witness against \
			 the circuit.",
		)
		.run()
}
