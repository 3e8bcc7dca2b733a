use stratum_field::Field;
use stratum_utils::{
	DeserializeBytes, SerializationError, SerializeBytes,
	bytes::{Buf, BufMut, BytesMut},
	serialization::assert_enough_data_for,
};

use crate::{
	consts::WITNESS_MAGIC,
	layered_circuit::{InputLayout, WireIndex, deserialize_header, serialize_header},
};

/// Values of every wire of a layered circuit, for one or more instances.
///
/// The values are stored instance-major: instance `i` occupies
/// `values[i * n_wires..(i + 1) * n_wires]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Witness<F> {
	n_instances: usize,
	n_wires: usize,
	values: Vec<F>,
}

impl<F: Field> Witness<F> {
	/// Creates a zero-filled witness.
	pub fn new(n_instances: usize, n_wires: usize) -> Self {
		Self {
			n_instances,
			n_wires,
			values: vec![F::ZERO; n_instances * n_wires],
		}
	}

	/// Builds a witness from per-instance wire vectors, all of length `n_wires`.
	///
	/// # Panics
	///
	/// Panics if any instance has a different length.
	pub fn from_instances(n_wires: usize, instances: impl IntoIterator<Item = Vec<F>>) -> Self {
		let mut values = Vec::new();
		let mut n_instances = 0;
		for instance in instances {
			assert_eq!(instance.len(), n_wires, "instance {n_instances} has the wrong length");
			values.extend(instance);
			n_instances += 1;
		}
		Self {
			n_instances,
			n_wires,
			values,
		}
	}

	/// The multiplicity of the witness.
	pub fn n_instances(&self) -> usize {
		self.n_instances
	}

	/// The number of wires of a single instance.
	pub fn n_wires(&self) -> usize {
		self.n_wires
	}

	pub fn instance(&self, index: usize) -> &[F] {
		&self.values[index * self.n_wires..(index + 1) * self.n_wires]
	}

	pub fn instance_mut(&mut self, index: usize) -> &mut [F] {
		&mut self.values[index * self.n_wires..(index + 1) * self.n_wires]
	}

	pub fn instances(&self) -> impl Iterator<Item = &[F]> {
		// `chunks_exact` panics on a zero chunk size; a zero-wire witness has no visible values.
		self.values.chunks_exact(self.n_wires.max(1))
	}

	pub fn get(&self, instance: usize, wire: WireIndex) -> F {
		self.instance(instance)[wire.as_usize()]
	}

	pub fn set(&mut self, instance: usize, wire: WireIndex, value: F) {
		self.instance_mut(instance)[wire.as_usize()] = value;
	}

	/// The public inputs of the given instance.
	pub fn public_inputs(&self, layout: &InputLayout, instance: usize) -> &[F] {
		&self.instance(instance)[layout.public_range()]
	}

	/// All values, instance-major.
	pub fn values(&self) -> &[F] {
		&self.values
	}

	pub fn values_mut(&mut self) -> &mut [F] {
		&mut self.values
	}

	pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
		let mut buf = BytesMut::new();
		self.serialize(&mut buf)?;
		Ok(buf.to_vec())
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
		Self::deserialize(bytes)
	}
}

impl<F: Field> SerializeBytes for Witness<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		serialize_header::<F>(&WITNESS_MAGIC, &mut write_buf)?;
		self.n_instances.serialize(&mut write_buf)?;
		self.n_wires.serialize(&mut write_buf)?;
		self.values
			.iter()
			.try_for_each(|value| value.serialize(&mut write_buf))
	}
}

impl<F: Field> DeserializeBytes for Witness<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		deserialize_header::<F>(&WITNESS_MAGIC, &mut read_buf)?;
		let n_instances = usize::deserialize(&mut read_buf)?;
		let n_wires = usize::deserialize(&mut read_buf)?;
		let n_values = n_instances.checked_mul(n_wires).ok_or_else(|| {
			SerializationError::InvalidConstruction {
				name: "Witness",
				reason: format!("{n_instances} instances of {n_wires} wires overflow"),
			}
		})?;
		let n_bytes = n_values
			.checked_mul(F::BYTE_LEN)
			.ok_or(SerializationError::NotEnoughBytes)?;
		assert_enough_data_for(&read_buf, n_bytes)?;
		let values = (0..n_values)
			.map(|_| F::deserialize(&mut read_buf))
			.collect::<Result<Vec<_>, _>>()?;
		Ok(Self {
			n_instances,
			n_wires,
			values,
		})
	}
}

#[cfg(test)]
mod tests {
	use proptest::prelude::*;
	use stratum_field::{Bn254Scalar, M31};

	use super::*;

	#[test]
	fn instance_accessors() {
		let mut witness = Witness::<M31>::new(2, 3);
		witness.set(1, WireIndex(2), M31::ONE);
		assert_eq!(witness.instance(0), &[M31::ZERO; 3]);
		assert_eq!(witness.instance(1), &[M31::ZERO, M31::ZERO, M31::ONE]);
		assert_eq!(witness.instances().count(), 2);
	}

	#[test]
	fn public_inputs() {
		let witness = Witness::from_instances(
			3,
			[vec![M31::from_u64(7), M31::from_u64(8), M31::from_u64(9)]],
		);
		let layout = InputLayout {
			n_public: 2,
			n_private: 1,
			n_hint: 0,
		};
		assert_eq!(witness.public_inputs(&layout, 0), &[M31::from_u64(7), M31::from_u64(8)]);
	}

	#[test]
	fn truncated_witness() {
		let witness = Witness::from_instances(
			2,
			[
				vec![<Bn254Scalar as Field>::ONE, <Bn254Scalar as Field>::ZERO],
				vec![<Bn254Scalar as Field>::ZERO, <Bn254Scalar as Field>::ONE],
			],
		);
		let bytes = witness.to_bytes().unwrap();
		assert_eq!(&bytes[..4], b"STWT");
		assert_eq!(
			Witness::<Bn254Scalar>::from_bytes(&bytes[..bytes.len() - 1]),
			Err(SerializationError::NotEnoughBytes)
		);
	}

	#[test]
	fn circuit_bytes_are_not_a_witness() {
		let witness = Witness::<M31>::new(1, 1);
		let mut bytes = witness.to_bytes().unwrap();
		bytes[..4].copy_from_slice(b"STLC");
		assert!(matches!(
			Witness::<M31>::from_bytes(&bytes),
			Err(SerializationError::InvalidMagic { .. })
		));
	}

	proptest! {
		#[test]
		fn serialization(
			n_instances in 1usize..4,
			seed in proptest::collection::vec(0u32..M31::MODULUS, 1..16),
		) {
			let instances = (0..n_instances).map(|i| {
				seed.iter().map(|v| M31::from_u64(*v as u64 + i as u64)).collect::<Vec<_>>()
			});
			let witness = Witness::from_instances(seed.len(), instances);
			let decoded = Witness::<M31>::from_bytes(&witness.to_bytes().unwrap()).unwrap();
			prop_assert_eq!(decoded, witness);
		}
	}
}
