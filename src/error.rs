//! Error types for the Kartta SOM training engine.

use thiserror::Error;

/// The main error type for Kartta operations.
#[derive(Error, Debug)]
pub enum KarttaError {
    /// Distance-metric failure (dimension mismatch, degenerate input).
    ///
    /// Recoverable: propagated to the training driver, which decides
    /// whether to abort the run.
    #[error("Metric error: {0}")]
    Metric(String),

    /// Quality-measure computation failure.
    #[error("Quality measure error: {0}")]
    Quality(String),

    /// Out-of-range lattice coordinate access.
    #[error("Layer access out of range: ({x}, {y}, {z}) outside {xsize}x{ysize}x{zsize}")]
    LayerAccess {
        /// Requested x coordinate.
        x: usize,
        /// Requested y coordinate.
        y: usize,
        /// Requested z coordinate.
        z: usize,
        /// Lattice extent along x.
        xsize: usize,
        /// Lattice extent along y.
        ysize: usize,
        /// Lattice extent along z.
        zsize: usize,
    },

    /// Malformed adaptive-coordinates file.
    ///
    /// Aborts only the affected load operation.
    #[error("Adaptive coordinates format error: {0}")]
    Format(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error during training.
    #[error("Training error: {0}")]
    Training(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Kartta operations.
pub type Result<T> = std::result::Result<T, KarttaError>;
