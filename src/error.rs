//! Error types for CIFTI mapping operations.

use crate::cifti::{Dimension, Structure};
use thiserror::Error;

/// Errors raised while building, mutating or rescanning a CIFTI mapping.
#[derive(Debug, Error)]
pub enum Error {
    /// Two map elements claim the same matrix dimension.
    #[error("multiple mappings on the same dimension ({0}) are not supported")]
    MultipleMappings(Dimension),

    /// No map element governs the requested dimension.
    #[error("no mapping has been set up for {0}")]
    NoMapForDimension(Dimension),

    /// The map governing a dimension is of a different kind than the operation needs.
    #[error("wrong mapping kind on {dimension}: expected {expected}, found {found}")]
    WrongMappingKind {
        dimension: Dimension,
        expected: &'static str,
        found: &'static str,
    },

    /// A map element was never given a mapping kind.
    #[error("unknown cifti mapping type on {0}")]
    UnknownMappingKind(Dimension),

    /// Voxel data was supplied before a volume space was configured.
    #[error("no volume space configured, set volume dimensions and sform first")]
    MissingVolumeSpace,

    /// A voxel triple lies outside the configured volume dimensions.
    #[error("voxel ({i}, {j}, {k}) is outside volume dimensions {dims:?}")]
    VoxelOutOfBounds { i: i64, j: i64, k: i64, dims: [i64; 3] },

    /// A vertex index lies outside `[0, vertex_count)`.
    #[error("vertex {vertex} is outside surface with {vertex_count} vertices")]
    VertexOutOfRange { vertex: i64, vertex_count: i64 },

    /// A brain model of the same type already exists for the structure.
    #[error("a model for {0} already exists in this mapping")]
    DuplicateStructure(Structure),

    /// Parcel lookup construction failed.
    #[error("invalid parcel: {0}")]
    InvalidParcel(String),

    /// The volume space cannot change while voxel mappings exist.
    #[error("volume space is fixed while voxel mappings exist; reset the voxel mappings first")]
    VolumeSpaceLocked,

    /// The voxel-to-coordinate transform has no inverse.
    #[error("volume transform is not invertible")]
    SingularTransform,

    /// Spatial units that cannot be normalized to millimeters.
    #[error("unsupported spatial units: {0}")]
    UnsupportedSpatialUnits(String),

    /// Temporal units that cannot be normalized to seconds.
    #[error("unsupported temporal units: {0}")]
    UnsupportedTemporalUnits(String),

    /// Unrecognized anatomical structure tag.
    #[error("unknown structure: '{0}'")]
    UnknownStructure(String),

    /// Unrecognized brain model type tag.
    #[error("unknown model type: '{0}'")]
    UnknownModelType(String),

    /// Negative or inconsistent sizes.
    #[error("invalid dimensions: {0}")]
    InvalidDimensions(String),

    /// Index into a list of named maps (or similar) is out of range.
    #[error("index {index} out of range (length {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Result type for CIFTI operations.
pub type Result<T> = std::result::Result<T, Error>;
