use std::{
	fmt,
	ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign},
};

use ark_bn254::Fr;
use ark_ff::{AdditiveGroup, BigInteger, PrimeField};
use num_bigint::BigUint;
use stratum_utils::{
	DeserializeBytes, SerializationError, SerializeBytes,
	bytes::{Buf, BufMut},
	serialization::{assert_enough_data_for, assert_enough_space_for},
};

use crate::{Field, FieldId};

const BYTE_LEN: usize = 32;

/// An element of the scalar field of the BN254 curve.
///
/// Arithmetic is delegated to `ark-bn254`; the wrapper gives the type the workspace byte layout,
/// 32 canonical little-endian bytes.
#[derive(Copy, Clone, Default, PartialEq, Eq, Hash)]
pub struct Bn254Scalar(Fr);

impl fmt::Debug for Bn254Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "Bn254Scalar({})", self.0)
	}
}

impl fmt::Display for Bn254Scalar {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Display::fmt(&self.0, f)
	}
}

macro_rules! impl_binary_op {
	($trait:ident, $method:ident, $assign_trait:ident, $assign_method:ident) => {
		impl $trait for Bn254Scalar {
			type Output = Self;

			#[inline]
			fn $method(self, rhs: Self) -> Self {
				Self($trait::$method(self.0, rhs.0))
			}
		}

		impl $assign_trait for Bn254Scalar {
			#[inline]
			fn $assign_method(&mut self, rhs: Self) {
				$assign_trait::$assign_method(&mut self.0, rhs.0);
			}
		}
	};
}

impl_binary_op!(Add, add, AddAssign, add_assign);
impl_binary_op!(Sub, sub, SubAssign, sub_assign);
impl_binary_op!(Mul, mul, MulAssign, mul_assign);

impl Neg for Bn254Scalar {
	type Output = Self;

	#[inline]
	fn neg(self) -> Self {
		Self(-self.0)
	}
}

impl Field for Bn254Scalar {
	const ID: FieldId = FieldId::Bn254Scalar;
	const ZERO: Self = Self(<Fr as AdditiveGroup>::ZERO);
	const ONE: Self = Self(<Fr as ark_ff::Field>::ONE);
	const BYTE_LEN: usize = BYTE_LEN;
	const MODULUS_BITS: u32 = Fr::MODULUS_BIT_SIZE;

	fn modulus() -> BigUint {
		Fr::MODULUS.into()
	}

	fn from_u64(value: u64) -> Self {
		Self(Fr::from(value))
	}

	fn from_biguint(value: &BigUint) -> Option<Self> {
		let bigint = value.clone().try_into().ok()?;
		Fr::from_bigint(bigint).map(Self)
	}

	fn to_biguint(&self) -> BigUint {
		self.0.into_bigint().into()
	}

	fn inverse(&self) -> Option<Self> {
		ark_ff::Field::inverse(&self.0).map(Self)
	}

	fn bit(&self, i: u64) -> bool {
		i < 256 && self.0.into_bigint().get_bit(i as usize)
	}
}

impl SerializeBytes for Bn254Scalar {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		assert_enough_space_for(&write_buf, BYTE_LEN)?;
		let bytes = self.0.into_bigint().to_bytes_le();
		debug_assert_eq!(bytes.len(), BYTE_LEN);
		write_buf.put_slice(&bytes);
		Ok(())
	}
}

impl DeserializeBytes for Bn254Scalar {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		assert_enough_data_for(&read_buf, BYTE_LEN)?;
		let mut bytes = [0u8; BYTE_LEN];
		read_buf.copy_to_slice(&mut bytes);
		let value = BigUint::from_bytes_le(&bytes);
		Self::from_biguint(&value).ok_or(SerializationError::NonCanonicalFieldElement)
	}
}
