use crate::layered_circuit::WireIndex;

/// Structural problems of a [`crate::LayeredCircuit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CircuitError {
	#[error("layer {layer} starts at wire {offset}, expected {expected}")]
	NonContiguousLayer {
		layer: usize,
		offset: u32,
		expected: u32,
	},
	#[error("layer {layer} has no wires")]
	EmptyLayer { layer: usize },
	#[error("layer {layer} has {n_wires} wires but only {n_gates} gates to drive them")]
	TooFewGates {
		layer: usize,
		n_wires: u32,
		n_gates: usize,
	},
	#[error("gate in layer {layer} writes wire {wire:?} outside of the layer")]
	OutputOutsideLayer { layer: usize, wire: WireIndex },
	#[error("gate in layer {layer} reads wire {wire:?} which is not in an earlier layer")]
	ForwardReference { layer: usize, wire: WireIndex },
	#[error("wire {wire:?} is not driven by any gate")]
	UndrivenWire { wire: WireIndex },
	#[error("assertion refers to wire {wire:?} which does not exist")]
	AssertionOutOfRange { wire: WireIndex },
	#[error("the circuit has more wires than can be indexed by u32")]
	TooManyWires,
}

/// The witness does not satisfy the circuit.
///
/// Unlike a solver error this can be caused by a witness that was corrupted after solving or
/// crafted by hand.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CheckFailure {
	#[error("witness has {actual} wires per instance, circuit has {expected}")]
	ShapeMismatch { expected: usize, actual: usize },
	#[error("witness holds no instances")]
	NoInstances,
	#[error("instance {instance}: wire {wire:?} does not match its gates")]
	WireMismatch { instance: usize, wire: WireIndex },
	#[error("instance {instance}: assertion on wire {wire:?} does not hold")]
	AssertionFailed { instance: usize, wire: WireIndex },
}
