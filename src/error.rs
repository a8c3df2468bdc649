//! Error types for graph construction and structural operations.
//!
//! Every error is raised at the point of detection. No operation attempts
//! partial recovery; callers are expected to pre-filter invalid input.

use crate::types::tensor::DType;

/// Errors raised by registry lookups, batching, splitting, pruning,
/// neighbor-list construction and archive restore.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// A field name has no entry in the registry.
    #[error("Unregistered field: {name}")]
    UnregisteredField {
        /// Offending field name.
        name: String,
    },

    /// `batch` was called with no graphs.
    #[error("Cannot batch an empty list of graphs")]
    EmptyBatch,

    /// Graphs in a batch list do not share the same field names.
    #[error("Inconsistent fields across batch list: graph {index} has {found:?}, expected {expected:?}")]
    InconsistentFields {
        /// Position of the first offending graph in the input list.
        index: usize,
        /// Field names of the first graph.
        expected: Vec<String>,
        /// Field names of the offending graph.
        found: Vec<String>,
    },

    /// Frame index is outside `[0, num_frames)`.
    #[error("Frame index {index} out of range: input has {num_frames} frames, valid indices are 0..{num_frames}")]
    FrameOutOfRange {
        /// Requested frame index.
        index: usize,
        /// Number of frames in the input.
        num_frames: usize,
    },

    /// A required field is absent.
    #[error("Missing required field: {name}")]
    MissingField {
        /// Name of the absent field.
        name: String,
    },

    /// A field's shape breaks its registered rule or a structural invariant.
    #[error("Shape mismatch for field '{name}': expected {expected}, found {found:?}")]
    ShapeMismatch {
        /// Offending field name.
        name: String,
        /// Human-readable description of the expected shape.
        expected: String,
        /// Actual shape.
        found: Vec<usize>,
    },

    /// A field has the wrong element type.
    #[error("Dtype mismatch for field '{name}': expected {expected}, found {found}")]
    DtypeMismatch {
        /// Offending field name.
        name: String,
        /// Required element type.
        expected: DType,
        /// Actual element type.
        found: DType,
    },

    /// An index-valued entry points outside its valid range.
    #[error("Index {index} in field '{name}' out of range (bound {bound})")]
    IndexOutOfRange {
        /// Field (or argument) holding the index.
        name: String,
        /// Offending index value.
        index: i64,
        /// Exclusive upper bound.
        bound: usize,
    },

    /// An edge connects nodes owned by different frames.
    #[error("Edge {edge} crosses frames: source in frame {source_frame}, target in frame {target_frame}")]
    CrossFrameEdge {
        /// Edge position.
        edge: usize,
        /// Frame of the source node.
        source_frame: i64,
        /// Frame of the target node.
        target_frame: i64,
    },

    /// A field name is already registered with a different spec,
    /// or a structural key was asked to be removed.
    #[error("Registry conflict for field '{name}'")]
    RegistryConflict {
        /// Conflicting field name.
        name: String,
    },

    /// Invalid configuration value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The cell matrix is singular while some axis is periodic.
    #[error("Cell is singular but periodic boundaries were requested")]
    DegenerateCell,

    /// Archive fingerprint does not match the restored content.
    #[error("Fingerprint mismatch: archive says {expected}, content hashes to {found}")]
    FingerprintMismatch {
        /// Fingerprint stored in the archive.
        expected: String,
        /// Fingerprint of the restored graph.
        found: String,
    },

    /// JSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Array shape error raised by `ndarray`.
    #[error("Array error: {0}")]
    Array(#[from] ndarray::ShapeError),
}

impl GraphError {
    /// Create an [`UnregisteredField`](GraphError::UnregisteredField) error.
    pub fn unregistered(name: impl Into<String>) -> Self {
        Self::UnregisteredField { name: name.into() }
    }

    /// Create a [`MissingField`](GraphError::MissingField) error.
    pub fn missing(name: impl Into<String>) -> Self {
        Self::MissingField { name: name.into() }
    }

    /// Create a [`ShapeMismatch`](GraphError::ShapeMismatch) error.
    pub fn shape(name: impl Into<String>, expected: impl Into<String>, found: &[usize]) -> Self {
        Self::ShapeMismatch {
            name: name.into(),
            expected: expected.into(),
            found: found.to_vec(),
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, GraphError>;
