//! Core data types for the Concord version resolver.
//!
//! This crate defines the vocabulary of a resolution session: unit versions
//! with their dependencies and constraints, the two constraint forms (exact
//! pin and compatible range), and the registry that holds every known version
//! of every unit. It contains no search logic and no I/O; the engine lives in
//! `concord-resolver`.

pub mod constraint;
pub mod errors;
pub mod registry;
pub mod unit;
pub mod version;
