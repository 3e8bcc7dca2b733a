use std::{
	fmt,
	ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use num_bigint::BigUint;
use stratum_utils::{
	DeserializeBytes, SerializationError, SerializeBytes,
	bytes::{Buf, BufMut},
};

use crate::{Field, FieldId};

const P: u32 = (1 << 31) - 1;

/// An element of the Mersenne-31 field, `GF(2^31 - 1)`.
///
/// The inner value is always the canonical representative in `[0, P)`.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct M31(u32);

impl M31 {
	pub const MODULUS: u32 = P;

	/// Creates an element from a canonical value, returning `None` if `value >= P`.
	pub const fn new(value: u32) -> Option<Self> {
		if value < P { Some(M31(value)) } else { None }
	}

	pub const fn value(self) -> u32 {
		self.0
	}

	#[inline]
	fn reduce_u64(value: u64) -> Self {
		// 2^31 = 1 mod P, so folding the high bits onto the low bits reduces the value.
		let folded = (value & P as u64) + (value >> 31);
		let folded = (folded & P as u64) + (folded >> 31);
		let folded = folded as u32;
		M31(if folded >= P { folded - P } else { folded })
	}

	fn pow(self, mut exp: u32) -> Self {
		let mut base = self;
		let mut acc = M31(1);
		while exp > 0 {
			if exp & 1 == 1 {
				acc *= base;
			}
			base *= base;
			exp >>= 1;
		}
		acc
	}
}

impl fmt::Debug for M31 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "M31({})", self.0)
	}
}

impl fmt::Display for M31 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl Add for M31 {
	type Output = Self;

	#[inline]
	fn add(self, rhs: Self) -> Self {
		let sum = self.0 + rhs.0;
		M31(if sum >= P { sum - P } else { sum })
	}
}

impl Sub for M31 {
	type Output = Self;

	#[inline]
	fn sub(self, rhs: Self) -> Self {
		if self.0 >= rhs.0 {
			M31(self.0 - rhs.0)
		} else {
			M31(self.0 + P - rhs.0)
		}
	}
}

impl Mul for M31 {
	type Output = Self;

	#[inline]
	fn mul(self, rhs: Self) -> Self {
		Self::reduce_u64(self.0 as u64 * rhs.0 as u64)
	}
}

impl Neg for M31 {
	type Output = Self;

	#[inline]
	fn neg(self) -> Self {
		if self.0 == 0 { self } else { M31(P - self.0) }
	}
}

impl AddAssign for M31 {
	fn add_assign(&mut self, rhs: Self) {
		*self = *self + rhs;
	}
}

impl SubAssign for M31 {
	fn sub_assign(&mut self, rhs: Self) {
		*self = *self - rhs;
	}
}

impl MulAssign for M31 {
	fn mul_assign(&mut self, rhs: Self) {
		*self = *self * rhs;
	}
}

impl Field for M31 {
	const ID: FieldId = FieldId::Mersenne31;
	const ZERO: Self = M31(0);
	const ONE: Self = M31(1);
	const BYTE_LEN: usize = 4;
	const MODULUS_BITS: u32 = 31;

	fn modulus() -> BigUint {
		BigUint::from(P)
	}

	fn from_u64(value: u64) -> Self {
		Self::reduce_u64(value)
	}

	fn from_biguint(value: &BigUint) -> Option<Self> {
		let value: u32 = value.try_into().ok()?;
		M31::new(value)
	}

	fn to_biguint(&self) -> BigUint {
		BigUint::from(self.0)
	}

	fn inverse(&self) -> Option<Self> {
		// Fermat: a^(P-2) = a^-1.
		(self.0 != 0).then(|| self.pow(P - 2))
	}

	fn bit(&self, i: u64) -> bool {
		i < 32 && (self.0 >> i) & 1 == 1
	}
}

impl SerializeBytes for M31 {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.0.serialize(write_buf)
	}
}

impl DeserializeBytes for M31 {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError> {
		let value = u32::deserialize(read_buf)?;
		M31::new(value).ok_or(SerializationError::NonCanonicalFieldElement)
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use stratum_utils::bytes::BytesMut;

	use super::*;

	fn any_m31() -> impl Strategy<Value = M31> {
		(0..P).prop_map(M31)
	}

	#[test]
	fn wraparound() {
		let max = M31(P - 1);
		assert_eq!(max + M31::ONE, M31::ZERO);
		assert_eq!(M31::ZERO - M31::ONE, max);
		assert_eq!(-M31::ONE, max);
		assert_eq!(max * max, M31::ONE);
	}

	#[test]
	fn from_u64_reduces() {
		assert_eq!(M31::from_u64(P as u64), M31::ZERO);
		assert_eq!(M31::from_u64(u64::MAX), M31::from_u64(u64::MAX % P as u64));
	}

	#[test]
	fn zero_has_no_inverse() {
		assert_eq!(M31::ZERO.inverse(), None);
	}

	#[test]
	fn non_canonical_encoding_is_rejected() {
		let mut buf = BytesMut::new();
		P.serialize(&mut buf).unwrap();
		assert_eq!(
			M31::deserialize(buf.freeze()),
			Err(SerializationError::NonCanonicalFieldElement)
		);
	}

	#[test]
	fn literal_range() {
		assert_eq!(M31::from_literal("2147483646").unwrap(), M31(P - 1));
		assert!(M31::from_literal("2147483647").is_err());
	}

	proptest! {
		#[test]
		fn mul_matches_u64_reference(a in any_m31(), b in any_m31()) {
			let expected = (a.0 as u64 * b.0 as u64 % P as u64) as u32;
			prop_assert_eq!((a * b).0, expected);
		}

		#[test]
		fn inverse(a in any_m31()) {
			prop_assume!(a != M31::ZERO);
			prop_assert_eq!(a * a.inverse().unwrap(), M31::ONE);
		}

		#[test]
		fn sub_then_add(a in any_m31(), b in any_m31()) {
			prop_assert_eq!(a - b + b, a);
		}
	}
}
