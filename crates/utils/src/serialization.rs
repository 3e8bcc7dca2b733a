//! Little-endian byte serialization.
//!
//! Every persisted artifact is written through [`SerializeBytes`] and read back through
//! [`DeserializeBytes`]. Readers never trust the length of the input: every read is preceded by a
//! bounds check so that truncated buffers surface as [`SerializationError::NotEnoughBytes`]
//! instead of a panic inside `bytes`.

use bytes::{Buf, BufMut};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SerializationError {
	#[error("write buffer is full")]
	WriteBufferFull,
	#[error("not enough data in read buffer to deserialize")]
	NotEnoughBytes,
	#[error("invalid magic bytes, expected {expected:?}")]
	InvalidMagic { expected: [u8; 4] },
	#[error("unsupported format version {found}, expected {expected}")]
	UnsupportedVersion { expected: u32, found: u32 },
	#[error("field tag mismatch: expected {expected}, found {found}")]
	FieldMismatch { expected: u8, found: u8 },
	#[error("field element is not in canonical form")]
	NonCanonicalFieldElement,
	#[error("usize {size} does not fit into the u32 length prefix")]
	UsizeTooLarge { size: usize },
	#[error("invalid construction of {name}: {reason}")]
	InvalidConstruction { name: &'static str, reason: String },
}

/// Represents type that can be serialized to a byte buffer.
pub trait SerializeBytes {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError>;
}

/// Represents type that can be deserialized from a byte buffer.
pub trait DeserializeBytes {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError>
	where
		Self: Sized;
}

/// Fails with [`SerializationError::NotEnoughBytes`] unless `read_buf` holds at least `n` bytes.
pub fn assert_enough_data_for(read_buf: &impl Buf, n: usize) -> Result<(), SerializationError> {
	if read_buf.remaining() < n {
		return Err(SerializationError::NotEnoughBytes);
	}
	Ok(())
}

/// Fails with [`SerializationError::WriteBufferFull`] unless `write_buf` can take `n` more bytes.
pub fn assert_enough_space_for(write_buf: &impl BufMut, n: usize) -> Result<(), SerializationError> {
	if write_buf.remaining_mut() < n {
		return Err(SerializationError::WriteBufferFull);
	}
	Ok(())
}

/// Writes a 4-byte magic tag.
pub fn serialize_magic(magic: &[u8; 4], mut write_buf: impl BufMut) -> Result<(), SerializationError> {
	assert_enough_space_for(&write_buf, magic.len())?;
	write_buf.put_slice(magic);
	Ok(())
}

/// Reads a 4-byte magic tag and checks it against `expected`.
pub fn deserialize_magic(
	expected: &[u8; 4],
	mut read_buf: impl Buf,
) -> Result<(), SerializationError> {
	assert_enough_data_for(&read_buf, expected.len())?;
	let mut found = [0u8; 4];
	read_buf.copy_to_slice(&mut found);
	if &found != expected {
		return Err(SerializationError::InvalidMagic {
			expected: *expected,
		});
	}
	Ok(())
}

impl SerializeBytes for u8 {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		assert_enough_space_for(&write_buf, 1)?;
		write_buf.put_u8(*self);
		Ok(())
	}
}

impl DeserializeBytes for u8 {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		assert_enough_data_for(&read_buf, 1)?;
		Ok(read_buf.get_u8())
	}
}

impl SerializeBytes for u32 {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		assert_enough_space_for(&write_buf, 4)?;
		write_buf.put_u32_le(*self);
		Ok(())
	}
}

impl DeserializeBytes for u32 {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		assert_enough_data_for(&read_buf, 4)?;
		Ok(read_buf.get_u32_le())
	}
}

impl SerializeBytes for u64 {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		assert_enough_space_for(&write_buf, 8)?;
		write_buf.put_u64_le(*self);
		Ok(())
	}
}

impl DeserializeBytes for u64 {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		assert_enough_data_for(&read_buf, 8)?;
		Ok(read_buf.get_u64_le())
	}
}

// usize is written as u32 so the layout does not depend on the host pointer width.
impl SerializeBytes for usize {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		let value: u32 = (*self)
			.try_into()
			.map_err(|_| SerializationError::UsizeTooLarge { size: *self })?;
		value.serialize(write_buf)
	}
}

impl DeserializeBytes for usize {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError> {
		let value = u32::deserialize(read_buf)?;
		Ok(value as usize)
	}
}

impl<T: SerializeBytes> SerializeBytes for Vec<T> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.len().serialize(&mut write_buf)?;
		self.iter()
			.try_for_each(|item| item.serialize(&mut write_buf))
	}
}

impl<T: DeserializeBytes> DeserializeBytes for Vec<T> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		let len = usize::deserialize(&mut read_buf)?;
		// Each element takes at least one byte; refuse lengths the buffer cannot possibly hold
		// before allocating.
		assert_enough_data_for(&read_buf, len)?;
		(0..len)
			.map(|_| T::deserialize(&mut read_buf))
			.collect()
	}
}

impl<T: SerializeBytes, const N: usize> SerializeBytes for [T; N] {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.iter()
			.try_for_each(|item| item.serialize(&mut write_buf))
	}
}

impl<T: DeserializeBytes, const N: usize> DeserializeBytes for [T; N] {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		let items = (0..N)
			.map(|_| T::deserialize(&mut read_buf))
			.collect::<Result<Vec<_>, _>>()?;
		match items.try_into() {
			Ok(array) => Ok(array),
			Err(_) => unreachable!("collected exactly N items"),
		}
	}
}

#[cfg(test)]
mod tests {
	use bytes::BytesMut;
	use proptest::prelude::*;

	use super::*;

	#[test]
	fn truncated_u32_is_rejected() {
		let buf: &[u8] = &[1, 2, 3];
		assert_eq!(u32::deserialize(buf), Err(SerializationError::NotEnoughBytes));
	}

	#[test]
	fn magic_mismatch() {
		let mut buf = BytesMut::new();
		serialize_magic(b"ABCD", &mut buf).unwrap();
		let err = deserialize_magic(b"ABCE", buf.freeze()).unwrap_err();
		assert_eq!(
			err,
			SerializationError::InvalidMagic {
				expected: *b"ABCE"
			}
		);
	}

	#[test]
	fn vec_length_larger_than_buffer() {
		let mut buf = BytesMut::new();
		1000usize.serialize(&mut buf).unwrap();
		0u8.serialize(&mut buf).unwrap();
		assert_eq!(
			Vec::<u8>::deserialize(buf.freeze()),
			Err(SerializationError::NotEnoughBytes)
		);
	}

	#[test]
	fn write_buffer_full() {
		let mut storage = [0u8; 3];
		let mut write_buf: &mut [u8] = &mut storage;
		assert_eq!(
			7u32.serialize(&mut write_buf),
			Err(SerializationError::WriteBufferFull)
		);
	}

	proptest! {
		#[test]
		fn vec_of_u64(values in proptest::collection::vec(any::<u64>(), 0..64)) {
			let mut buf = BytesMut::new();
			values.serialize(&mut buf).unwrap();
			let decoded = Vec::<u64>::deserialize(buf.freeze()).unwrap();
			prop_assert_eq!(decoded, values);
		}
	}
}
