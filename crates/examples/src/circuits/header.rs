//! Validation of a block header against its parent.
//!
//! The circuit checks the rules a proof-of-authority chain applies to a new header: the height
//! increments by one, timestamps strictly increase and do not run ahead of the current time, the
//! header links to the expected parent, fields unused by the consensus engine hold fixed values,
//! gas usage stays within the limit, and the difficulty marks an in-turn or out-of-turn signer.
//!
//! Hashes are 256-bit values and do not fit into a BN254 scalar, so each one is carried as two
//! 128-bit limbs.

use anyhow::{Result, ensure};
use clap::Args;
use stratum_field::{BigUint, Bn254Scalar, Field, parse_literal};
use stratum_frontend::{Assignment, CircuitBuilder, Variable};

use crate::ExampleCircuit;

type F = Bn254Scalar;

/// Hash of the empty uncle list.
pub const EMPTY_UNCLE_HASH: &str =
	"0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347";

/// Difficulty of a block sealed by the in-turn signer.
pub const DIFF_IN_TURN: u64 = 2;
/// Difficulty of a block sealed by an out-of-turn signer.
pub const DIFF_NO_TURN: u64 = 1;

const LIMB_BITS: u32 = 128;

/// A 256-bit hash as high and low 128-bit limbs.
#[derive(Clone, Copy, Debug)]
pub struct HashVars {
	pub hi: Variable,
	pub lo: Variable,
}

impl HashVars {
	fn public(builder: &mut CircuitBuilder<F>, name: &str) -> Self {
		Self {
			hi: builder.add_public(format!("{name}.hi")),
			lo: builder.add_public(format!("{name}.lo")),
		}
	}

	fn private(builder: &mut CircuitBuilder<F>, name: &str) -> Self {
		Self {
			hi: builder.add_private(format!("{name}.hi")),
			lo: builder.add_private(format!("{name}.lo")),
		}
	}

	fn constant(builder: &mut CircuitBuilder<F>, literal: &str) -> Result<Self> {
		let [hi, lo] = split_hash(literal)?;
		Ok(Self {
			hi: builder.constant_value(limb_value(&hi)?),
			lo: builder.constant_value(limb_value(&lo)?),
		})
	}

	fn assert_is_equal(&self, builder: &mut CircuitBuilder<F>, name: &str, other: &Self) {
		builder.assert_is_equal(format!("{name}.hi"), self.hi, other.hi);
		builder.assert_is_equal(format!("{name}.lo"), self.lo, other.lo);
	}

	fn assign(&self, assignment: &mut Assignment, literal: &str) -> Result<()> {
		let [hi, lo] = split_hash(literal)?;
		assignment.set_biguint(self.hi, hi).set_biguint(self.lo, lo);
		Ok(())
	}
}

/// Splits a hash literal into its high and low 128-bit limbs.
pub fn split_hash(literal: &str) -> Result<[BigUint; 2]> {
	let value = parse_literal(literal)?;
	ensure!(value.bits() <= 2 * LIMB_BITS as u64, "hash {literal} is wider than 256 bits");
	let mask = (BigUint::from(1u8) << LIMB_BITS) - 1u8;
	Ok([&value >> LIMB_BITS, value & mask])
}

fn limb_value(limb: &BigUint) -> Result<F> {
	F::from_biguint(limb).ok_or_else(|| anyhow::anyhow!("limb {limb} does not fit the field"))
}

/// Block header validation example circuit.
pub struct HeaderExample {
	pre_height: Variable,
	current_height: Variable,
	pre_timestamp: Variable,
	current_timestamp: Variable,
	now_time: Variable,
	parent_hash: HashVars,
	prev_hash: HashVars,
	mix_hash: HashVars,
	uncle_hash: HashVars,
	gas_limit: Variable,
	gas_used: Variable,
	nonce: Variable,
	difficulty: Variable,
}

#[derive(Args, Debug, Clone)]
pub struct Params {
	/// Upper bound on the gas limit of a block
	#[arg(long, default_value_t = i64::MAX as u64)]
	pub max_gas_limit: u64,
}

/// Header fields, as decimal or `0x`-prefixed hexadecimal literals.
#[derive(Args, Debug, Clone)]
pub struct Instance {
	/// Height of the parent block
	#[arg(long, default_value = "101")]
	pub pre_height: String,

	/// Height of the new block
	#[arg(long, default_value = "102")]
	pub current_height: String,

	/// Timestamp of the parent block
	#[arg(long, default_value = "20240825")]
	pub pre_timestamp: String,

	/// Timestamp of the new block
	#[arg(long, default_value = "20240826")]
	pub current_timestamp: String,

	/// Current time of the validating node
	#[arg(long, default_value = "20240827")]
	pub now_time: String,

	/// Parent hash recorded in the new header
	#[arg(
		long,
		default_value = "0xa89c9362b8200c39ec24fadc310391e752f476fa91c407f6d3f5ff2e8bced15c"
	)]
	pub parent_hash: String,

	/// Hash of the parent block
	#[arg(
		long,
		default_value = "0xa89c9362b8200c39ec24fadc310391e752f476fa91c407f6d3f5ff2e8bced15c"
	)]
	pub prev_hash: String,

	#[arg(long, default_value = EMPTY_UNCLE_HASH)]
	pub uncle_hash: String,

	#[arg(long, default_value = "0x0")]
	pub mix_hash: String,

	#[arg(long, default_value = "140000000")]
	pub gas_limit: String,

	#[arg(long, default_value = "8486644")]
	pub gas_used: String,

	#[arg(long, default_value = "0x0")]
	pub nonce: String,

	/// 2 for the in-turn signer, 1 otherwise
	#[arg(long, default_value = "2")]
	pub difficulty: String,
}

impl ExampleCircuit for HeaderExample {
	type Field = F;
	type Params = Params;
	type Instance = Instance;

	fn build(params: Params, builder: &mut CircuitBuilder<F>) -> Result<Self> {
		let parent_hash = HashVars::public(builder, "parent_hash");
		let prev_hash = HashVars::public(builder, "prev_hash");

		let example = Self {
			pre_height: builder.add_private("pre_height"),
			current_height: builder.add_private("current_height"),
			pre_timestamp: builder.add_private("pre_timestamp"),
			current_timestamp: builder.add_private("current_timestamp"),
			now_time: builder.add_private("now_time"),
			parent_hash,
			prev_hash,
			mix_hash: HashVars::private(builder, "mix_hash"),
			uncle_hash: HashVars::private(builder, "uncle_hash"),
			gas_limit: builder.add_private("gas_limit"),
			gas_used: builder.add_private("gas_used"),
			nonce: builder.add_private("nonce"),
			difficulty: builder.add_private("difficulty"),
		};

		builder.scope("height", |b| example.check_height(b));
		builder.scope("timestamp", |b| example.check_timestamp(b));
		builder.scope("hash", |b| example.check_hashes(b))?;
		builder.scope("gas", |b| example.check_gas(b, params.max_gas_limit));
		builder.scope("nonce", |b| {
			let zero = b.constant(0);
			b.assert_is_equal("zero", example.nonce, zero);
		});
		builder.scope("difficulty", |b| example.check_difficulty(b));

		Ok(example)
	}

	fn assign(&self, instance: Instance, assignment: &mut Assignment) -> Result<()> {
		assignment
			.set_str(self.pre_height, &instance.pre_height)?
			.set_str(self.current_height, &instance.current_height)?
			.set_str(self.pre_timestamp, &instance.pre_timestamp)?
			.set_str(self.current_timestamp, &instance.current_timestamp)?
			.set_str(self.now_time, &instance.now_time)?
			.set_str(self.gas_limit, &instance.gas_limit)?
			.set_str(self.gas_used, &instance.gas_used)?
			.set_str(self.nonce, &instance.nonce)?
			.set_str(self.difficulty, &instance.difficulty)?;
		self.parent_hash.assign(assignment, &instance.parent_hash)?;
		self.prev_hash.assign(assignment, &instance.prev_hash)?;
		self.uncle_hash.assign(assignment, &instance.uncle_hash)?;
		self.mix_hash.assign(assignment, &instance.mix_hash)?;
		Ok(())
	}
}

impl HeaderExample {
	fn check_height(&self, b: &mut CircuitBuilder<F>) {
		let one = b.constant(1);
		let expected = b.add(self.pre_height, one);
		b.assert_is_equal("succession", self.current_height, expected);
	}

	/// Both steps `pre < current` and `current < now` are strict.
	fn check_timestamp(&self, b: &mut CircuitBuilder<F>) {
		b.assert_is_less_or_equal("parent_not_after", self.pre_timestamp, self.current_timestamp);
		b.assert_is_different("parent_distinct", self.pre_timestamp, self.current_timestamp);
		b.assert_is_less_or_equal("not_in_future", self.current_timestamp, self.now_time);
		b.assert_is_different("now_distinct", self.current_timestamp, self.now_time);
	}

	fn check_hashes(&self, b: &mut CircuitBuilder<F>) -> Result<()> {
		self.parent_hash.assert_is_equal(b, "parent", &self.prev_hash);

		let empty_uncles = HashVars::constant(b, EMPTY_UNCLE_HASH)?;
		self.uncle_hash.assert_is_equal(b, "uncle", &empty_uncles);

		let zero = HashVars::constant(b, "0x0")?;
		self.mix_hash.assert_is_equal(b, "mix", &zero);
		Ok(())
	}

	fn check_gas(&self, b: &mut CircuitBuilder<F>, max_gas_limit: u64) {
		let max = b.constant(max_gas_limit);
		b.assert_is_less_or_equal("limit", self.gas_limit, max);
		b.assert_is_less_or_equal("used", self.gas_used, self.gas_limit);
	}

	/// `(d - 2) * (d - 1) == 0`.
	fn check_difficulty(&self, b: &mut CircuitBuilder<F>) {
		let in_turn = b.constant(DIFF_IN_TURN);
		let no_turn = b.constant(DIFF_NO_TURN);
		let a = b.sub(self.difficulty, in_turn);
		let c = b.sub(self.difficulty, no_turn);
		let product = b.mul(a, c);
		b.assert_is_zero("in_turn_or_no_turn", product);
	}
}
