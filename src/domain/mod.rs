//! Domain layer types and invariants.

pub mod entities;
pub mod scoring;
pub mod toggles;
pub mod types;
