//! Small reference solvers behind the backend traits.
//!
//! They make a [`crate::GlazingSystem`] usable without external solvers and
//! give the orchestration layer something deterministic to test against.

pub mod optics;
pub mod thermal;

pub use optics::ReferenceOptics;
pub use thermal::ReferenceThermal;
