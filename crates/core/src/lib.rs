//! Compiled artifacts: the layered circuit and its witness.
//!
//! These types are produced by the frontend compiler and input solver, persisted with the
//! [`stratum_utils::SerializeBytes`] layout and consumed by the [`checker`].

pub mod checker;
pub mod consts;
pub mod error;
pub mod layered_circuit;
pub mod witness;

pub use checker::{check_circuit, verify_witness};
pub use error::{CheckFailure, CircuitError};
pub use layered_circuit::*;
pub use witness::Witness;
