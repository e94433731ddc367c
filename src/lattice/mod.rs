//! The rectangular lattice SOM: data model, spatial partitioning, and
//! the competitive-learning trainer.

mod grid;
mod partition;
mod trainer;
mod unit;

pub use grid::{Axis, Lattice, Position};
pub use partition::{BoxRegion, SpatialPartition};
pub use trainer::{LatticeTrainer, TrainingMetrics, TrainingRun};
pub use unit::{MappedInput, Unit};

pub(crate) use grid::map_distance_squared_dims;
