/// Magic tag opening a serialized [`crate::LayeredCircuit`].
pub const CIRCUIT_MAGIC: [u8; 4] = *b"STLC";

/// Magic tag opening a serialized [`crate::Witness`].
pub const WITNESS_MAGIC: [u8; 4] = *b"STWT";

/// Version of the binary layout. Bumped on any incompatible change.
pub const FORMAT_VERSION: u32 = 1;
