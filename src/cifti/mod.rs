//! CIFTI index mapping.
//!
//! A CIFTI file stores a two-dimensional matrix (or a stack of them) whose
//! rows and columns each carry a mapping that says what every index means:
//! a surface vertex or voxel (brain models), a parcel, a named scalar or
//! label map, or a time point. This module holds those mappings and the
//! [`CiftiXml`] engine that creates, shares, separates and queries them.

pub(crate) mod brain_model;
pub(crate) mod label_table;
pub(crate) mod map;
pub(crate) mod parcel;
pub(crate) mod structure;
pub(crate) mod units;
pub(crate) mod volume_space;
pub mod xml;

pub use brain_model::{BrainModel, ModelGeometry, ModelType, SurfaceMapEntry, VolumeMapEntry};
pub use label_table::{Label, LabelTable, UNASSIGNED_LABEL_KEY, UNASSIGNED_LABEL_NAME};
pub use map::{
    BrainModelsMap, Dimension, LabelMap, MapContent, MappingKind, MatrixIndicesMap, NamedMap,
    StructureLists, TimeSeries,
};
pub use parcel::{Parcel, ParcelSurface, ParcelsMap};
pub use structure::Structure;
pub use units::{SpatialUnits, TemporalUnits};
pub use volume_space::{AxisOrientation, PlumbAttributes, VolumeSpace, VOLUME_SPACE_TOLERANCE_RATIO};
pub use xml::{CiftiRoot, CiftiXml, Matrix, DEFAULT_CIFTI_VERSION};
