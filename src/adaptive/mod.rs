//! Adaptive coordinates: a parallel, continuously relaxed coordinate
//! space per unit, updated inline with lattice training and persisted
//! in a dedicated text format.

mod format;
mod layer;

pub use format::CoordinatesFormat;
pub use layer::{AdaptiveCoordinates, VirtualLayer, VirtualUnit};
