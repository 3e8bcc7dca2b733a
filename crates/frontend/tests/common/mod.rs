//! Shared circuits for the integration tests.

use stratum_field::Field;
use stratum_frontend::{CircuitBuilder, CompileOptions, CompileResult, Variable, compile};

/// `next == prev + 1`, with both heights public.
pub struct Succession {
	pub prev: Variable,
	pub next: Variable,
}

impl Succession {
	pub fn compile<F: Field>() -> (Self, CompileResult<F>) {
		let mut b = CircuitBuilder::new();
		let prev = b.add_public("prev");
		let next = b.add_public("next");
		let one = b.constant(1);
		let succ = b.add(prev, one);
		b.assert_is_equal("height", next, succ);
		let graph = b.build().unwrap();
		let result = compile(&graph, &CompileOptions::default()).unwrap();
		(Self { prev, next }, result)
	}
}

/// `prev < next` expressed as `prev + 1 <= next`, and `next != forbidden`.
pub struct StrictOrder {
	pub prev: Variable,
	pub next: Variable,
	pub forbidden: Variable,
}

impl StrictOrder {
	pub fn compile<F: Field>() -> (Self, CompileResult<F>) {
		let mut b = CircuitBuilder::new();
		let prev = b.add_public("prev");
		let next = b.add_public("next");
		let forbidden = b.add_private("forbidden");
		b.scope("timestamp", |b| {
			let one = b.constant(1);
			let lower = b.add(prev, one);
			b.assert_is_less_or_equal("ordered", lower, next);
			b.assert_is_different("fresh", next, forbidden);
		});
		let graph = b.build().unwrap();
		let result = compile(&graph, &CompileOptions::default()).unwrap();
		(
			Self {
				prev,
				next,
				forbidden,
			},
			result,
		)
	}
}
