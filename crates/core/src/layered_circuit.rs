use std::ops::Range;

use stratum_field::Field;
use stratum_utils::{
	DeserializeBytes, SerializationError, SerializeBytes,
	bytes::{Buf, BufMut, BytesMut},
	serialization::{deserialize_magic, serialize_magic},
};

use crate::{
	consts::{CIRCUIT_MAGIC, FORMAT_VERSION},
	error::CircuitError,
};

/// Global index of a wire in the layered circuit.
///
/// Wires are numbered layer by layer: the input layer first, then every gate layer in order.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct WireIndex(pub u32);

impl WireIndex {
	/// The wire index that is not considered to be valid.
	pub const INVALID: WireIndex = WireIndex(u32::MAX);

	pub fn as_usize(self) -> usize {
		self.0 as usize
	}
}

// The most sensible default for a wire index is to make it invalid.
impl Default for WireIndex {
	fn default() -> Self {
		Self::INVALID
	}
}

/// Shape of the input layer (layer 0).
///
/// The input layer holds, in this order:
///
/// 1. public inputs,
/// 2. private inputs,
/// 3. hint wires, auxiliary private values computed by the input solver.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputLayout {
	pub n_public: usize,
	pub n_private: usize,
	pub n_hint: usize,
}

impl InputLayout {
	pub fn n_inputs(&self) -> usize {
		self.n_public + self.n_private + self.n_hint
	}

	pub fn public_range(&self) -> Range<usize> {
		0..self.n_public
	}

	pub fn private_range(&self) -> Range<usize> {
		self.n_public..self.n_public + self.n_private
	}

	pub fn hint_range(&self) -> Range<usize> {
		self.n_public + self.n_private..self.n_inputs()
	}
}

/// `out += coef * in0 * in1`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MulGate<F> {
	pub inputs: [WireIndex; 2],
	pub output: WireIndex,
	pub coef: F,
}

/// `out += coef * in`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddGate<F> {
	pub input: WireIndex,
	pub output: WireIndex,
	pub coef: F,
}

/// `out += coef`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ConstGate<F> {
	pub output: WireIndex,
	pub coef: F,
}

/// A layer of gates.
///
/// The layer owns the wires `offset..offset + n_wires`. The value of each of these wires is the
/// sum of all gates that name it as their output. Gate inputs always refer to wires of strictly
/// earlier layers, so all gates of a layer are independent of each other.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Layer<F> {
	pub offset: u32,
	pub n_wires: u32,
	pub mul: Vec<MulGate<F>>,
	pub add: Vec<AddGate<F>>,
	pub cst: Vec<ConstGate<F>>,
}

impl<F> Layer<F> {
	pub fn wire_range(&self) -> Range<usize> {
		self.offset as usize..(self.offset + self.n_wires) as usize
	}

	pub fn n_gates(&self) -> usize {
		self.mul.len() + self.add.len() + self.cst.len()
	}

	fn contains(&self, wire: WireIndex) -> bool {
		self.wire_range().contains(&wire.as_usize())
	}
}

/// A circuit lowered into layers of multiplication, addition and constant gates.
///
/// The circuit is satisfied by a wire assignment if every wire equals the sum of its gates and
/// every wire listed in `assertions` is zero.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayeredCircuit<F> {
	input_layout: InputLayout,
	layers: Vec<Layer<F>>,
	assertions: Vec<WireIndex>,
}

impl<F: Field> LayeredCircuit<F> {
	/// Creates a layered circuit, checking all of its structural invariants.
	pub fn new(
		input_layout: InputLayout,
		layers: Vec<Layer<F>>,
		assertions: Vec<WireIndex>,
	) -> Result<Self, CircuitError> {
		let circuit = Self {
			input_layout,
			layers,
			assertions,
		};
		circuit.validate()?;
		Ok(circuit)
	}

	/// Runs a validation pass ensuring all the invariants hold.
	pub fn validate(&self) -> Result<(), CircuitError> {
		let mut expected_offset: u64 = self.input_layout.n_inputs() as u64;
		if expected_offset > u32::MAX as u64 {
			return Err(CircuitError::TooManyWires);
		}

		for (i, layer) in self.layers.iter().enumerate() {
			let layer_no = i + 1;
			if layer.offset as u64 != expected_offset {
				return Err(CircuitError::NonContiguousLayer {
					layer: layer_no,
					offset: layer.offset,
					expected: expected_offset as u32,
				});
			}
			if layer.n_wires == 0 {
				return Err(CircuitError::EmptyLayer { layer: layer_no });
			}
			// Every wire needs a gate, which bounds the allocation below by the input size.
			if layer.n_wires as usize > layer.n_gates() {
				return Err(CircuitError::TooFewGates {
					layer: layer_no,
					n_wires: layer.n_wires,
					n_gates: layer.n_gates(),
				});
			}
			expected_offset += layer.n_wires as u64;
			if expected_offset > u32::MAX as u64 {
				return Err(CircuitError::TooManyWires);
			}

			let mut driven = vec![false; layer.n_wires as usize];
			let mut drive = |output: WireIndex| {
				if !layer.contains(output) {
					return Err(CircuitError::OutputOutsideLayer {
						layer: layer_no,
						wire: output,
					});
				}
				driven[(output.0 - layer.offset) as usize] = true;
				Ok(())
			};
			let check_input = |input: WireIndex| {
				if input.0 >= layer.offset {
					return Err(CircuitError::ForwardReference {
						layer: layer_no,
						wire: input,
					});
				}
				Ok(())
			};

			for gate in &layer.mul {
				gate.inputs.iter().copied().try_for_each(check_input)?;
				drive(gate.output)?;
			}
			for gate in &layer.add {
				check_input(gate.input)?;
				drive(gate.output)?;
			}
			for gate in &layer.cst {
				drive(gate.output)?;
			}

			if let Some(pos) = driven.iter().position(|driven| !driven) {
				return Err(CircuitError::UndrivenWire {
					wire: WireIndex(layer.offset + pos as u32),
				});
			}
		}

		let n_wires = expected_offset;
		if let Some(wire) = self
			.assertions
			.iter()
			.find(|wire| wire.0 as u64 >= n_wires)
		{
			return Err(CircuitError::AssertionOutOfRange { wire: *wire });
		}
		Ok(())
	}

	pub fn input_layout(&self) -> &InputLayout {
		&self.input_layout
	}

	/// The gate layers. The input layer is implicit and not part of this slice.
	pub fn layers(&self) -> &[Layer<F>] {
		&self.layers
	}

	/// Wires that must evaluate to zero.
	pub fn assertions(&self) -> &[WireIndex] {
		&self.assertions
	}

	/// Number of layers including the input layer.
	pub fn depth(&self) -> usize {
		self.layers.len() + 1
	}

	/// Total number of wires across all layers.
	pub fn n_wires(&self) -> usize {
		self.layers
			.last()
			.map(|layer| layer.wire_range().end)
			.unwrap_or_else(|| self.input_layout.n_inputs())
	}

	pub fn n_gates(&self) -> usize {
		self.layers.iter().map(Layer::n_gates).sum()
	}

	pub fn n_mul_gates(&self) -> usize {
		self.layers.iter().map(|layer| layer.mul.len()).sum()
	}

	/// Serializes the circuit into a freshly allocated buffer.
	pub fn to_bytes(&self) -> Result<Vec<u8>, SerializationError> {
		let mut buf = BytesMut::new();
		self.serialize(&mut buf)?;
		Ok(buf.to_vec())
	}

	pub fn from_bytes(bytes: &[u8]) -> Result<Self, SerializationError> {
		Self::deserialize(bytes)
	}
}

/// Writes the format header shared by all artifacts of field `F`.
pub(crate) fn serialize_header<F: Field>(
	magic: &[u8; 4],
	mut write_buf: impl BufMut,
) -> Result<(), SerializationError> {
	serialize_magic(magic, &mut write_buf)?;
	FORMAT_VERSION.serialize(&mut write_buf)?;
	F::ID.tag().serialize(&mut write_buf)
}

/// Reads and checks the format header written by [`serialize_header`].
pub(crate) fn deserialize_header<F: Field>(
	magic: &[u8; 4],
	mut read_buf: impl Buf,
) -> Result<(), SerializationError> {
	deserialize_magic(magic, &mut read_buf)?;
	let version = u32::deserialize(&mut read_buf)?;
	if version != FORMAT_VERSION {
		return Err(SerializationError::UnsupportedVersion {
			expected: FORMAT_VERSION,
			found: version,
		});
	}
	let tag = u8::deserialize(&mut read_buf)?;
	if tag != F::ID.tag() {
		return Err(SerializationError::FieldMismatch {
			expected: F::ID.tag(),
			found: tag,
		});
	}
	Ok(())
}

impl SerializeBytes for WireIndex {
	fn serialize(&self, write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.0.serialize(write_buf)
	}
}

impl DeserializeBytes for WireIndex {
	fn deserialize(read_buf: impl Buf) -> Result<Self, SerializationError> {
		Ok(WireIndex(u32::deserialize(read_buf)?))
	}
}

impl<F: Field> SerializeBytes for MulGate<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.inputs.serialize(&mut write_buf)?;
		self.output.serialize(&mut write_buf)?;
		self.coef.serialize(&mut write_buf)
	}
}

impl<F: Field> DeserializeBytes for MulGate<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		Ok(MulGate {
			inputs: DeserializeBytes::deserialize(&mut read_buf)?,
			output: DeserializeBytes::deserialize(&mut read_buf)?,
			coef: F::deserialize(&mut read_buf)?,
		})
	}
}

impl<F: Field> SerializeBytes for AddGate<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.input.serialize(&mut write_buf)?;
		self.output.serialize(&mut write_buf)?;
		self.coef.serialize(&mut write_buf)
	}
}

impl<F: Field> DeserializeBytes for AddGate<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		Ok(AddGate {
			input: DeserializeBytes::deserialize(&mut read_buf)?,
			output: DeserializeBytes::deserialize(&mut read_buf)?,
			coef: F::deserialize(&mut read_buf)?,
		})
	}
}

impl<F: Field> SerializeBytes for ConstGate<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.output.serialize(&mut write_buf)?;
		self.coef.serialize(&mut write_buf)
	}
}

impl<F: Field> DeserializeBytes for ConstGate<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		Ok(ConstGate {
			output: DeserializeBytes::deserialize(&mut read_buf)?,
			coef: F::deserialize(&mut read_buf)?,
		})
	}
}

impl<F: Field> SerializeBytes for Layer<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		self.offset.serialize(&mut write_buf)?;
		self.n_wires.serialize(&mut write_buf)?;
		self.mul.serialize(&mut write_buf)?;
		self.add.serialize(&mut write_buf)?;
		self.cst.serialize(&mut write_buf)
	}
}

impl<F: Field> DeserializeBytes for Layer<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		Ok(Layer {
			offset: u32::deserialize(&mut read_buf)?,
			n_wires: u32::deserialize(&mut read_buf)?,
			mul: DeserializeBytes::deserialize(&mut read_buf)?,
			add: DeserializeBytes::deserialize(&mut read_buf)?,
			cst: DeserializeBytes::deserialize(&mut read_buf)?,
		})
	}
}

impl<F: Field> SerializeBytes for LayeredCircuit<F> {
	fn serialize(&self, mut write_buf: impl BufMut) -> Result<(), SerializationError> {
		serialize_header::<F>(&CIRCUIT_MAGIC, &mut write_buf)?;
		let InputLayout {
			n_public,
			n_private,
			n_hint,
		} = self.input_layout;
		n_public.serialize(&mut write_buf)?;
		n_private.serialize(&mut write_buf)?;
		n_hint.serialize(&mut write_buf)?;
		self.layers.serialize(&mut write_buf)?;
		self.assertions.serialize(&mut write_buf)
	}
}

impl<F: Field> DeserializeBytes for LayeredCircuit<F> {
	fn deserialize(mut read_buf: impl Buf) -> Result<Self, SerializationError> {
		deserialize_header::<F>(&CIRCUIT_MAGIC, &mut read_buf)?;
		let input_layout = InputLayout {
			n_public: usize::deserialize(&mut read_buf)?,
			n_private: usize::deserialize(&mut read_buf)?,
			n_hint: usize::deserialize(&mut read_buf)?,
		};
		let layers = Vec::<Layer<F>>::deserialize(&mut read_buf)?;
		let assertions = Vec::<WireIndex>::deserialize(&mut read_buf)?;
		LayeredCircuit::new(input_layout, layers, assertions).map_err(|err| {
			SerializationError::InvalidConstruction {
				name: "LayeredCircuit",
				reason: err.to_string(),
			}
		})
	}
}
