//! The growing mesh: a dynamic simplicial-complex alternative to the
//! fixed lattice, with unit insertion/removal driven by signal
//! frequencies and a force-directed display layout.

mod graph;
pub mod layout;
mod trainer;

pub use graph::{MeshGraph, MeshUnit, Simplex, SimplexKey, UnitKey};
pub use trainer::MeshTrainer;
