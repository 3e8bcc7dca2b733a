use std::{
	fmt::{self, Debug},
	hash::Hash,
	ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_bigint::BigUint;
use stratum_utils::{DeserializeBytes, SerializeBytes};

use crate::literal::{ParseLiteralError, parse_literal};

/// Stable tag identifying a field in serialized artifacts.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FieldId {
	/// The scalar field of the BN254 curve.
	Bn254Scalar = 1,
	/// The prime field of order `2^31 - 1`.
	Mersenne31 = 2,
}

impl FieldId {
	pub fn tag(self) -> u8 {
		self as u8
	}

	pub fn from_tag(tag: u8) -> Option<Self> {
		match tag {
			1 => Some(FieldId::Bn254Scalar),
			2 => Some(FieldId::Mersenne31),
			_ => None,
		}
	}
}

impl fmt::Display for FieldId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FieldId::Bn254Scalar => write!(f, "bn254-scalar"),
			FieldId::Mersenne31 => write!(f, "mersenne-31"),
		}
	}
}

/// A prime field.
///
/// Elements have a unique canonical representative in `[0, modulus)`. Conversions from integers
/// never reduce silently: [`Field::from_biguint`] rejects values outside of the canonical range.
pub trait Field:
	Copy
	+ Clone
	+ Default
	+ Debug
	+ Eq
	+ Hash
	+ Send
	+ Sync
	+ 'static
	+ Add<Output = Self>
	+ Sub<Output = Self>
	+ Mul<Output = Self>
	+ Neg<Output = Self>
	+ AddAssign
	+ SubAssign
	+ MulAssign
	+ SerializeBytes
	+ DeserializeBytes
{
	const ID: FieldId;
	const ZERO: Self;
	const ONE: Self;
	/// The number of bytes of the canonical little-endian encoding.
	const BYTE_LEN: usize;
	/// The number of bits of the modulus.
	const MODULUS_BITS: u32;

	fn modulus() -> BigUint;

	fn from_u64(value: u64) -> Self;

	/// Returns `None` if `value` is not smaller than the modulus.
	fn from_biguint(value: &BigUint) -> Option<Self>;

	fn to_biguint(&self) -> BigUint;

	/// Multiplicative inverse, `None` for zero.
	fn inverse(&self) -> Option<Self>;

	fn is_zero(&self) -> bool {
		*self == Self::ZERO
	}

	fn square(&self) -> Self {
		*self * *self
	}

	/// Returns `2^n`.
	fn pow2(n: u32) -> Self {
		let mut acc = Self::ONE;
		let two = Self::from_u64(2);
		for _ in 0..n {
			acc *= two;
		}
		acc
	}

	/// Parses a decimal or `0x`-prefixed hexadecimal literal.
	fn from_literal(literal: &str) -> Result<Self, ParseLiteralError> {
		let value = parse_literal(literal)?;
		Self::from_biguint(&value).ok_or_else(|| ParseLiteralError::OutOfRange {
			literal: literal.to_string(),
			field: Self::ID,
		})
	}

	/// Returns bit `i` of the canonical representative.
	fn bit(&self, i: u64) -> bool {
		self.to_biguint().bit(i)
	}
}
