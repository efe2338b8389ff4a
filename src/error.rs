//! Error types produced while building rods, models and solvers.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, KdrError>;

/// Configuration and input errors.
///
/// These are raised before a relaxation run starts and are not recoverable
/// within a run. Numerical degeneracies never produce an error, and
/// non-convergence is reported through [`crate::solver::RunReport`].
#[derive(Debug, Error)]
pub enum KdrError {
    /// Returned when a vertex index is outside `0..n_vertices`.
    #[error("vertex index {index} is out of range for {n_vertices} vertices")]
    VertexOutOfRange { index: usize, n_vertices: usize },

    /// Returned when an edge index is outside `0..n_edges`.
    #[error("edge index {index} is out of range for {n_edges} edges")]
    EdgeOutOfRange { index: usize, n_edges: usize },

    /// Returned when two arrays that must match in length do not.
    #[error("{what}: expected {expected} entries, received {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Returned when a centerline has too few vertices for its topology.
    #[error("a {topology} centerline needs at least {min} vertices (received {actual})")]
    TooFewVertices {
        topology: &'static str,
        min: usize,
        actual: usize,
    },

    /// Returned when the rest geometry has a zero-length edge.
    #[error("edge {edge} has zero rest length")]
    DegenerateGeometry { edge: usize },

    /// Returned when a material law required by a section is missing.
    #[error("material has no {0} law")]
    UnsetLaw(&'static str),

    /// Returned when a section quantity is not physically meaningful.
    #[error("section {quantity} must be positive (received {value})")]
    InvalidSection { quantity: &'static str, value: f64 },

    /// Returned when a boundary is attached to something other than a rod end.
    #[error("invalid boundary: {0}")]
    InvalidBoundary(String),

    /// Returned when a beam index does not exist in the model.
    #[error("beam index {index} is out of range for {n_beams} beams")]
    BeamOutOfRange { index: usize, n_beams: usize },

    /// Returned when a model input refers to unknown names or bad values.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
