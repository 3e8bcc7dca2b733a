//! Prime fields used as the arithmetic domain of circuits.
//!
//! Every value flowing through a circuit is an element of a type implementing [`Field`]. Two
//! fields are provided: the BN254 scalar field, backed by `ark-bn254`, and the Mersenne-31 field,
//! implemented natively.

mod bn254;
mod field;
mod literal;
mod m31;

pub use bn254::Bn254Scalar;
pub use field::{Field, FieldId};
pub use literal::{ParseLiteralError, parse_literal};
pub use m31::M31;
pub use num_bigint::BigUint;
