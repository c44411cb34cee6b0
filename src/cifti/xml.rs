//! The CIFTI extension document and the engine that keeps its mappings consistent.
//!
//! [`CiftiRoot`] is the plain in-memory tree: a version string and a list of
//! matrices, each holding map elements, an optional volume space and
//! metadata. [`CiftiXml`] owns a root and caches which map element governs
//! each matrix dimension. Every mutation goes through the engine so that
//! the cached indices, reverse lookups and volume-space rules stay valid.

use super::brain_model::{BrainModel, SurfaceMapEntry, VolumeMapEntry};
use super::label_table::LabelTable;
use super::map::{
    BrainModelsMap, Dimension, LabelMap, MapContent, MappingKind, MatrixIndicesMap, NamedMap,
    StructureLists, TimeSeries,
};
use super::parcel::{Parcel, ParcelSurface, ParcelsMap};
use super::structure::Structure;
use super::volume_space::{PlumbAttributes, VolumeSpace};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Version written into new documents.
pub const DEFAULT_CIFTI_VERSION: &str = "1.0";

/// One matrix of the document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Matrix {
    /// Map elements, each applying to one or both dimensions.
    pub maps: Vec<MatrixIndicesMap>,
    /// Volume space shared by every voxel mapping of the matrix.
    pub volume: Option<VolumeSpace>,
    /// Free-form key/value metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Root of the CIFTI extension document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CiftiRoot {
    /// Document version attribute.
    pub version: String,
    /// Matrices; only the first is used.
    pub matrices: Vec<Matrix>,
}

impl Default for CiftiRoot {
    fn default() -> Self {
        Self {
            version: DEFAULT_CIFTI_VERSION.to_string(),
            matrices: Vec::new(),
        }
    }
}

/// Mapping engine over a [`CiftiRoot`].
///
/// At most one map element governs each [`Dimension`]. A single element may
/// govern both (a shared map); any mutation through one dimension first
/// splits it so the other dimension is left untouched.
#[derive(Debug, Clone, Default)]
pub struct CiftiXml {
    root: CiftiRoot,
    row_map_index: Option<usize>,
    col_map_index: Option<usize>,
}

impl CiftiXml {
    /// Empty document with no matrix.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of a tree (e.g. freshly parsed) and rebuild caches.
    pub fn from_root(root: CiftiRoot) -> Result<Self> {
        let mut xml = Self {
            root,
            row_map_index: None,
            col_map_index: None,
        };
        xml.root_changed()?;
        Ok(xml)
    }

    /// Replace the tree. On failure `self` is left as it was.
    pub fn set_root(&mut self, root: CiftiRoot) -> Result<()> {
        *self = Self::from_root(root)?;
        Ok(())
    }

    /// The underlying tree.
    pub fn root(&self) -> &CiftiRoot {
        &self.root
    }

    /// Give back the underlying tree.
    pub fn into_root(self) -> CiftiRoot {
        self.root
    }

    /// Document version.
    pub fn version(&self) -> &str {
        &self.root.version
    }

    /// Set the document version.
    pub fn set_version(&mut self, version: impl Into<String>) {
        self.root.version = version.into();
    }

    /// Matrix metadata.
    pub fn metadata(&self) -> Option<&BTreeMap<String, String>> {
        self.matrix().map(|m| &m.metadata)
    }

    /// Set one metadata entry, returning the previous value.
    pub fn set_metadata(
        &mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.matrix_or_create().metadata.insert(key.into(), value.into())
    }

    /// Rescan the tree: recompute which element governs each dimension and
    /// rebuild every reverse lookup.
    ///
    /// Fails if two elements claim one dimension, a lookup cannot be built
    /// or a voxel lies outside the volume space.
    pub fn root_changed(&mut self) -> Result<()> {
        self.row_map_index = None;
        self.col_map_index = None;
        let Some(matrix) = self.root.matrices.first_mut() else {
            return Ok(());
        };
        if let Some(space) = &matrix.volume {
            if space.dims().iter().any(|&d| d < 0) {
                return Err(Error::InvalidDimensions(format!(
                    "volume dimensions must be non-negative, got {:?}",
                    space.dims()
                )));
            }
        }
        for (index, map) in matrix.maps.iter_mut().enumerate() {
            for dim in map.applies_to().to_vec() {
                let slot = match dim {
                    Dimension::Rows => &mut self.row_map_index,
                    Dimension::Columns => &mut self.col_map_index,
                };
                if slot.is_some() {
                    return Err(Error::MultipleMappings(dim));
                }
                *slot = Some(index);
            }
            map.setup_lookup()?;
            check_voxels(map.content(), matrix.volume.as_ref())?;
        }
        debug!(
            maps = matrix.maps.len(),
            rows = ?self.row_map_index,
            columns = ?self.col_map_index,
            "rescanned cifti mappings"
        );
        Ok(())
    }

    // ---------------------------------------------------------------
    // map bookkeeping
    // ---------------------------------------------------------------

    fn matrix(&self) -> Option<&Matrix> {
        self.root.matrices.first()
    }

    fn matrix_or_create(&mut self) -> &mut Matrix {
        if self.root.matrices.is_empty() {
            self.root.matrices.push(Matrix::default());
        }
        &mut self.root.matrices[0]
    }

    fn slot_mut(&mut self, dim: Dimension) -> &mut Option<usize> {
        match dim {
            Dimension::Rows => &mut self.row_map_index,
            Dimension::Columns => &mut self.col_map_index,
        }
    }

    /// Position of the element governing `dim` in the matrix's map list.
    pub fn map_index(&self, dim: Dimension) -> Option<usize> {
        match dim {
            Dimension::Rows => self.row_map_index,
            Dimension::Columns => self.col_map_index,
        }
    }

    /// Every map element of the matrix.
    pub fn maps(&self) -> &[MatrixIndicesMap] {
        self.matrix().map(|m| m.maps.as_slice()).unwrap_or_default()
    }

    /// Element governing `dim`.
    pub fn map(&self, dim: Dimension) -> Option<&MatrixIndicesMap> {
        let index = self.map_index(dim)?;
        self.matrix()?.maps.get(index)
    }

    fn map_mut(&mut self, dim: Dimension) -> Result<&mut MatrixIndicesMap> {
        let index = self.map_index(dim).ok_or(Error::NoMapForDimension(dim))?;
        self.root
            .matrices
            .first_mut()
            .and_then(|m| m.maps.get_mut(index))
            .ok_or(Error::NoMapForDimension(dim))
    }

    fn content<T>(
        &self,
        dim: Dimension,
        pick: impl FnOnce(&MapContent) -> Option<&T>,
    ) -> Option<&T> {
        pick(self.map(dim)?.content())
    }

    /// Payload of the element governing `dim`, after splitting shared maps.
    fn content_mut<T>(
        &mut self,
        dim: Dimension,
        expected: &'static str,
        pick: impl FnOnce(&mut MapContent) -> Option<&mut T>,
    ) -> Result<&mut T> {
        self.separate_maps();
        let map = self.map_mut(dim)?;
        let found = map.content().kind_name();
        pick(map.content_mut()).ok_or(Error::WrongMappingKind {
            dimension: dim,
            expected,
            found,
        })
    }

    fn brain_models(&self, dim: Dimension) -> Option<&BrainModelsMap> {
        self.content(dim, |c| match c {
            MapContent::BrainModels(bm) => Some(bm),
            _ => None,
        })
    }

    fn brain_models_mut(&mut self, dim: Dimension) -> Result<&mut BrainModelsMap> {
        self.content_mut(dim, MappingKind::BrainModels.name(), |c| match c {
            MapContent::BrainModels(bm) => Some(bm),
            _ => None,
        })
    }

    fn parcels_map(&self, dim: Dimension) -> Option<&ParcelsMap> {
        self.content(dim, |c| match c {
            MapContent::Parcels(p) => Some(p),
            _ => None,
        })
    }

    fn parcels_map_mut(&mut self, dim: Dimension) -> Result<&mut ParcelsMap> {
        self.content_mut(dim, MappingKind::Parcels.name(), |c| match c {
            MapContent::Parcels(p) => Some(p),
            _ => None,
        })
    }

    fn series(&self, dim: Dimension) -> Option<&TimeSeries> {
        self.content(dim, |c| match c {
            MapContent::TimePoints(s) => Some(s),
            _ => None,
        })
    }

    fn series_mut(&mut self, dim: Dimension) -> Result<&mut TimeSeries> {
        self.content_mut(dim, MappingKind::TimePoints.name(), |c| match c {
            MapContent::TimePoints(s) => Some(s),
            _ => None,
        })
    }

    fn label_maps_mut(&mut self, dim: Dimension) -> Result<&mut Vec<LabelMap>> {
        self.content_mut(dim, MappingKind::Labels.name(), |c| match c {
            MapContent::Labels(maps) => Some(maps),
            _ => None,
        })
    }

    fn push_map(&mut self, dim: Dimension) -> usize {
        let matrix = self.matrix_or_create();
        matrix
            .maps
            .push(MatrixIndicesMap::new(vec![dim], MapContent::Empty));
        let index = matrix.maps.len() - 1;
        *self.slot_mut(dim) = Some(index);
        index
    }

    /// Append an untyped element governing `dim` and return its position.
    ///
    /// Fails if `dim` already has a governing element.
    pub fn create_map(&mut self, dim: Dimension) -> Result<usize> {
        if self.map_index(dim).is_some() {
            return Err(Error::MultipleMappings(dim));
        }
        let index = self.push_map(dim);
        debug!(%dim, index, "created cifti map");
        Ok(index)
    }

    /// Split every element governing both dimensions into one element per
    /// dimension. The first listed dimension keeps the original element.
    pub fn separate_maps(&mut self) {
        let Some(matrix) = self.root.matrices.first_mut() else {
            return;
        };
        for index in 0..matrix.maps.len() {
            if matrix.maps[index].applies_to().len() < 2 {
                continue;
            }
            let extra: Vec<Dimension> = matrix.maps[index].applies_to_mut().drain(1..).collect();
            for dim in extra {
                let mut copy = matrix.maps[index].clone();
                *copy.applies_to_mut() = vec![dim];
                matrix.maps.push(copy);
                let new_index = matrix.maps.len() - 1;
                match dim {
                    Dimension::Rows => self.row_map_index = Some(new_index),
                    Dimension::Columns => self.col_map_index = Some(new_index),
                }
                debug!(%dim, from = index, to = new_index, "separated shared cifti map");
            }
        }
    }

    /// Make the `to` dimension use the element governing `from`.
    ///
    /// Elements left governing nothing are removed. Does nothing if both
    /// dimensions already resolve to the same element (or to none).
    pub fn apply_map_to(&mut self, from: Dimension, to: Dimension) {
        if self.row_map_index == self.col_map_index {
            return;
        }
        if let Some(matrix) = self.root.matrices.first_mut() {
            let mut index = 0;
            while index < matrix.maps.len() {
                let applies_to = matrix.maps[index].applies_to_mut();
                applies_to.retain(|&d| d != to);
                if applies_to.contains(&from) {
                    applies_to.push(to);
                }
                if applies_to.is_empty() {
                    matrix.maps.remove(index);
                    for slot in [&mut self.row_map_index, &mut self.col_map_index] {
                        if let Some(i) = slot {
                            if *i > index {
                                *i -= 1;
                            }
                        }
                    }
                    debug!(index, "removed orphaned cifti map");
                    continue;
                }
                index += 1;
            }
        }
        let source = self.map_index(from);
        *self.slot_mut(to) = source;
        debug!(%from, %to, index = ?source, "shared cifti map");
    }

    /// Make the column map the same element as the row map.
    pub fn apply_row_map_to_columns(&mut self) {
        self.apply_map_to(Dimension::Rows, Dimension::Columns);
    }

    /// Make the row map the same element as the column map.
    pub fn apply_column_map_to_rows(&mut self) {
        self.apply_map_to(Dimension::Columns, Dimension::Rows);
    }

    fn reset_map(&mut self, dim: Dimension, content: MapContent) {
        self.separate_maps();
        let index = match self.map_index(dim) {
            Some(index) => index,
            None => self.push_map(dim),
        };
        debug!(%dim, index, kind = content.kind_name(), "reset cifti map");
        if let Some(map) = self
            .root
            .matrices
            .first_mut()
            .and_then(|m| m.maps.get_mut(index))
        {
            *map = MatrixIndicesMap::new(vec![dim], content);
        }
    }

    /// Make `dim` an empty brain-models mapping.
    pub fn reset_to_brain_models(&mut self, dim: Dimension) {
        self.reset_map(dim, MapContent::BrainModels(BrainModelsMap::default()));
    }

    /// Make `dim` a time series of `count` samples `step` seconds apart.
    pub fn reset_to_timepoints(&mut self, dim: Dimension, step: f64, count: usize) {
        self.reset_map(
            dim,
            MapContent::TimePoints(TimeSeries::seconds(step, count as i64)),
        );
    }

    /// Make `dim` a scalars mapping of `count` unnamed maps.
    pub fn reset_to_scalars(&mut self, dim: Dimension, count: usize) {
        self.reset_map(dim, MapContent::Scalars(vec![NamedMap::default(); count]));
    }

    /// Make `dim` a labels mapping of `count` unnamed maps with fresh label tables.
    pub fn reset_to_labels(&mut self, dim: Dimension, count: usize) {
        self.reset_map(dim, MapContent::Labels(vec![LabelMap::default(); count]));
    }

    /// Make `dim` an empty parcels mapping.
    pub fn reset_to_parcels(&mut self, dim: Dimension) {
        self.reset_map(dim, MapContent::Parcels(ParcelsMap::default()));
    }

    // ---------------------------------------------------------------
    // brain models
    // ---------------------------------------------------------------

    /// Append a surface model to a brain-models mapping.
    ///
    /// With an ROI, vertices whose value is positive are included;
    /// without one every vertex is.
    pub fn add_surface_model(
        &mut self,
        dim: Dimension,
        number_of_vertices: i64,
        structure: Structure,
        roi: Option<&[f32]>,
    ) -> Result<()> {
        let bm = self.brain_models_mut(dim)?;
        let offset = bm.new_range_start();
        let model = match roi {
            Some(roi) => BrainModel::surface_from_roi(structure, offset, number_of_vertices, roi)?,
            None => BrainModel::surface(structure, offset, number_of_vertices, None)?,
        };
        debug!(%dim, %structure, offset, count = model.index_count(), "added surface model");
        bm.push(model)
    }

    /// Append a surface model over an explicit, ordered vertex list.
    pub fn add_surface_model_from_list(
        &mut self,
        dim: Dimension,
        number_of_vertices: i64,
        structure: Structure,
        vertices: &[i64],
    ) -> Result<()> {
        let bm = self.brain_models_mut(dim)?;
        let offset = bm.new_range_start();
        let model = BrainModel::surface_from_list(structure, offset, number_of_vertices, vertices)?;
        debug!(%dim, %structure, offset, count = model.index_count(), "added surface model");
        bm.push(model)
    }

    /// Append a voxel model. Needs a volume space containing every voxel.
    pub fn add_volume_model(
        &mut self,
        dim: Dimension,
        ijk: &[[i64; 3]],
        structure: Structure,
    ) -> Result<()> {
        self.brain_models_mut(dim)?;
        let space = self.volume_space().ok_or(Error::MissingVolumeSpace)?;
        for &voxel in ijk {
            space.check_voxel(voxel)?;
        }
        let bm = self.brain_models_mut(dim)?;
        let offset = bm.new_range_start();
        let model = BrainModel::voxels(structure, offset, ijk.to_vec())?;
        debug!(%dim, %structure, offset, count = model.index_count(), "added volume model");
        bm.push(model)
    }

    /// Brain models of a brain-models mapping, in order.
    pub fn brain_models_for(&self, dim: Dimension) -> Option<&[BrainModel]> {
        self.brain_models(dim).map(BrainModelsMap::models)
    }

    /// Matrix index of `vertex` on `structure`'s surface model.
    pub fn index_for_vertex(
        &self,
        dim: Dimension,
        structure: Structure,
        vertex: i64,
    ) -> Option<i64> {
        self.brain_models(dim)?
            .find_surface(structure)?
            .index_for_vertex(vertex)
    }

    /// Matrix index of voxel `ijk`; `None` outside the volume or unmapped.
    pub fn index_for_voxel(&self, dim: Dimension, ijk: [i64; 3]) -> Option<i64> {
        let bm = self.brain_models(dim)?;
        if !self.volume_space()?.contains(ijk) {
            return None;
        }
        bm.index_for_voxel(ijk)
    }

    /// Matrix index of the voxel nearest to millimeter coordinate `xyz`.
    pub fn index_for_coordinate(&self, dim: Dimension, xyz: [f64; 3]) -> Option<i64> {
        self.brain_models(dim)?;
        match self.volume_space()?.xyz_to_ijk(xyz) {
            Ok(ijk) => self.index_for_voxel(dim, ijk),
            Err(e) => {
                warn!(error = %e, "coordinate lookup failed");
                None
            }
        }
    }

    /// Structure and vertex at a matrix index of a surface model.
    pub fn vertex_for_index(&self, dim: Dimension, index: i64) -> Option<(Structure, i64)> {
        let model = self.brain_models(dim)?.model_for_index(index)?;
        Some((model.structure(), model.vertex_for_index(index)?))
    }

    /// Structure and voxel at a matrix index of a voxel model.
    pub fn voxel_for_index(&self, dim: Dimension, index: i64) -> Option<(Structure, [i64; 3])> {
        let model = self.brain_models(dim)?.model_for_index(index)?;
        Some((model.structure(), model.voxel_for_index(index)?))
    }

    /// (index, vertex) pairs of `structure`'s surface model.
    pub fn surface_map(&self, dim: Dimension, structure: Structure) -> Option<&[SurfaceMapEntry]> {
        self.brain_models(dim)?.find_surface(structure)?.surface_map()
    }

    /// (index, voxel) pairs of every voxel model, in model order.
    pub fn volume_map(&self, dim: Dimension) -> Option<&[VolumeMapEntry]> {
        Some(self.brain_models(dim)?.volume_map())
    }

    /// (index, voxel) pairs of `structure`'s voxel model.
    pub fn volume_structure_map(
        &self,
        dim: Dimension,
        structure: Structure,
    ) -> Option<&[VolumeMapEntry]> {
        self.brain_models(dim)?.find_volume(structure)?.volume_map()
    }

    /// Per-structure (index, voxel) pairs of every voxel model.
    pub fn volume_model_maps(&self, dim: Dimension) -> Option<Vec<(Structure, &[VolumeMapEntry])>> {
        Some(
            self.brain_models(dim)?
                .models()
                .iter()
                .filter_map(|m| Some((m.structure(), m.volume_map()?)))
                .collect(),
        )
    }

    /// Surface and volume structures of a brain-models mapping.
    pub fn structure_lists(&self, dim: Dimension) -> Option<StructureLists> {
        Some(self.brain_models(dim)?.structure_lists())
    }

    /// Vertex count of `structure`'s surface in a brain-models or parcels mapping.
    pub fn surface_number_of_vertices(&self, dim: Dimension, structure: Structure) -> Option<i64> {
        match self.map(dim)?.content() {
            MapContent::BrainModels(bm) => bm.find_surface(structure)?.number_of_vertices(),
            MapContent::Parcels(p) => p.number_of_vertices(structure),
            _ => None,
        }
    }

    /// True if the mapping on `dim` indexes any voxels.
    pub fn has_volume_data(&self, dim: Dimension) -> bool {
        self.map(dim).is_some_and(|m| m.content().has_voxels())
    }

    /// True if the brain-models mapping on `dim` has a surface model for
    /// `structure`. Parcel surfaces do not count.
    pub fn has_surface_data(&self, dim: Dimension, structure: Structure) -> bool {
        self.brain_models(dim)
            .is_some_and(|bm| bm.find_surface(structure).is_some())
    }

    fn has_any_volume_data(&self) -> bool {
        self.maps().iter().any(|m| m.content().has_voxels())
    }

    // ---------------------------------------------------------------
    // parcels
    // ---------------------------------------------------------------

    /// Append a parcel. Voxels must lie in the volume space; vertices must
    /// belong to declared surfaces and no other parcel.
    pub fn add_parcel(&mut self, dim: Dimension, parcel: Parcel) -> Result<()> {
        self.parcels_map_mut(dim)?;
        if !parcel.voxels.is_empty() {
            let space = self.volume_space().ok_or(Error::MissingVolumeSpace)?;
            for &voxel in &parcel.voxels {
                space.check_voxel(voxel)?;
            }
        }
        let name = parcel.name.clone();
        let map = self.parcels_map_mut(dim)?;
        if let Err(e) = map.push_parcel(parcel) {
            warn!(%dim, parcel = %name, error = %e, "rejected parcel");
            return Err(e);
        }
        debug!(%dim, parcel = %name, "added parcel");
        Ok(())
    }

    /// Declare a surface parcels may reference.
    pub fn add_parcel_surface(
        &mut self,
        dim: Dimension,
        number_of_vertices: i64,
        structure: Structure,
    ) -> Result<()> {
        let map = self.parcels_map_mut(dim)?;
        if let Err(e) = map.push_surface(ParcelSurface::new(structure, number_of_vertices)) {
            warn!(%dim, %structure, error = %e, "rejected parcel surface");
            return Err(e);
        }
        debug!(%dim, %structure, number_of_vertices, "added parcel surface");
        Ok(())
    }

    /// Parcels of a parcels mapping, in matrix-index order.
    pub fn parcels(&self, dim: Dimension) -> Option<&[Parcel]> {
        self.parcels_map(dim).map(ParcelsMap::parcels)
    }

    /// Declared surfaces of a parcels mapping.
    pub fn parcel_surfaces(&self, dim: Dimension) -> Option<&[ParcelSurface]> {
        self.parcels_map(dim).map(ParcelsMap::surfaces)
    }

    /// Matrix index of the parcel holding `vertex` of `structure`.
    pub fn parcel_for_vertex(
        &self,
        dim: Dimension,
        structure: Structure,
        vertex: i64,
    ) -> Option<usize> {
        self.parcels_map(dim)?.parcel_for_vertex(structure, vertex)
    }

    /// Matrix index of the parcel holding voxel `ijk`.
    pub fn parcel_for_voxel(&self, dim: Dimension, ijk: [i64; 3]) -> Option<usize> {
        self.parcels_map(dim)?.parcel_for_voxel(ijk)
    }

    // ---------------------------------------------------------------
    // series and named maps
    // ---------------------------------------------------------------

    /// Sample spacing in seconds.
    pub fn timestep(&self, dim: Dimension) -> Option<f64> {
        self.series(dim)?.step_seconds().ok()
    }

    /// Set the sample spacing, in seconds.
    pub fn set_timestep(&mut self, dim: Dimension, seconds: f64) -> Result<()> {
        let series = self.series_mut(dim)?;
        *series = TimeSeries::seconds(seconds, series.count);
        Ok(())
    }

    /// Number of samples.
    pub fn number_of_timepoints(&self, dim: Dimension) -> Option<i64> {
        self.series(dim).map(|s| s.count)
    }

    /// Set the number of samples.
    pub fn set_number_of_timepoints(&mut self, dim: Dimension, count: usize) -> Result<()> {
        self.series_mut(dim)?.count = count as i64;
        Ok(())
    }

    /// Sample nearest to `seconds`; halfway cases round to even.
    pub fn timepoint_index(&self, dim: Dimension, seconds: f64) -> Option<i64> {
        self.series(dim)?.index_for_seconds(seconds)
    }

    /// Name of a scalar or label map, or `#<index>` when there is none.
    pub fn map_name(&self, dim: Dimension, index: usize) -> String {
        let name = match self.map(dim).map(MatrixIndicesMap::content) {
            Some(MapContent::Scalars(maps)) => maps.get(index).map(|m| m.name.as_str()),
            Some(MapContent::Labels(maps)) => maps.get(index).map(|m| m.name.as_str()),
            _ => None,
        };
        name.map_or_else(|| format!("#{}", index), str::to_string)
    }

    /// Rename a scalar or label map.
    pub fn set_map_name(
        &mut self,
        dim: Dimension,
        index: usize,
        name: impl Into<String>,
    ) -> Result<()> {
        let content = self.content_mut(dim, "scalars or labels", |c| match c {
            MapContent::Scalars(_) | MapContent::Labels(_) => Some(c),
            _ => None,
        })?;
        let (slot, len) = match content {
            MapContent::Scalars(maps) => {
                let len = maps.len();
                (maps.get_mut(index).map(|m| &mut m.name), len)
            }
            MapContent::Labels(maps) => {
                let len = maps.len();
                (maps.get_mut(index).map(|m| &mut m.name), len)
            }
            _ => (None, 0),
        };
        *slot.ok_or(Error::IndexOutOfRange { index, len })? = name.into();
        Ok(())
    }

    /// Label table of a label map; `None` for other kinds.
    pub fn label_table(&self, dim: Dimension, index: usize) -> Option<&LabelTable> {
        match self.map(dim)?.content() {
            MapContent::Labels(maps) => maps.get(index).map(|m| &m.table),
            _ => None,
        }
    }

    /// Replace the label table of a label map.
    pub fn set_label_table(
        &mut self,
        dim: Dimension,
        index: usize,
        table: LabelTable,
    ) -> Result<()> {
        let maps = self.label_maps_mut(dim)?;
        let len = maps.len();
        maps.get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?
            .table = table;
        Ok(())
    }

    // ---------------------------------------------------------------
    // volume space
    // ---------------------------------------------------------------

    /// Volume space of the matrix.
    pub fn volume_space(&self) -> Option<&VolumeSpace> {
        self.matrix()?.volume.as_ref()
    }

    /// Install a volume space, normalized to millimeters.
    ///
    /// While any mapping indexes voxels, only a space matching the current
    /// one is accepted.
    pub fn set_volume_space(&mut self, space: VolumeSpace) -> Result<()> {
        let space = space.normalized()?;
        if self.has_any_volume_data() {
            if let Some(current) = self.volume_space() {
                if !current.matches(&space) {
                    warn!(dims = ?space.dims(), "refused to replace volume space in use");
                    return Err(Error::VolumeSpaceLocked);
                }
            }
        }
        debug!(dims = ?space.dims(), "set volume space");
        self.matrix_or_create().volume = Some(space);
        Ok(())
    }

    /// Install a volume space from dimensions and a millimeter sform.
    pub fn set_volume_dims_and_sform(
        &mut self,
        dims: [i64; 3],
        sform: [[f64; 4]; 3],
    ) -> Result<()> {
        self.set_volume_space(VolumeSpace::new(dims, sform)?)
    }

    /// Dimensions and millimeter sform of the volume space.
    pub fn volume_dims_and_sform(&self) -> Option<([i64; 3], [[f64; 4]; 3])> {
        let space = self.volume_space()?;
        Some((space.dims(), space.sform_mm().ok()?))
    }

    /// Axis-aligned description of the volume space, if it is plumb.
    pub fn plumb_attributes(&self) -> Option<PlumbAttributes> {
        self.volume_space()?.plumb_attributes()
    }

    // ---------------------------------------------------------------
    // queries and comparison
    // ---------------------------------------------------------------

    /// Kind of the mapping on `dim`.
    pub fn mapping_kind(&self, dim: Dimension) -> Option<MappingKind> {
        self.map(dim)?.kind()
    }

    /// Length of `dim`: 0 when unmapped, an error for an untyped map.
    pub fn dimension_length(&self, dim: Dimension) -> Result<i64> {
        match self.map(dim) {
            None => Ok(0),
            Some(map) => map.length().ok_or(Error::UnknownMappingKind(dim)),
        }
    }

    /// True if both documents use compatible volume spaces, or neither
    /// indexes voxels.
    pub fn matches_volume_space(&self, other: &Self) -> bool {
        match (self.has_any_volume_data(), other.has_any_volume_data()) {
            (false, false) => true,
            (true, true) => match (self.volume_space(), other.volume_space()) {
                (Some(a), Some(b)) => a.matches(b),
                _ => false,
            },
            _ => false,
        }
    }

    /// True if `dim` is mapped the same way in both documents.
    pub fn matches_for(&self, dim: Dimension, other: &Self) -> bool {
        if !self.matches_volume_space(other) {
            return false;
        }
        match (self.map(dim), other.map(dim)) {
            (None, None) => true,
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl PartialEq for CiftiXml {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self, other)
            || (self.root.matrices.len() == other.root.matrices.len()
                && self.matches_for(Dimension::Columns, other)
                && self.matches_for(Dimension::Rows, other))
    }
}

fn check_voxels(content: &MapContent, space: Option<&VolumeSpace>) -> Result<()> {
    if !content.has_voxels() {
        return Ok(());
    }
    let space = space.ok_or(Error::MissingVolumeSpace)?;
    match content {
        MapContent::BrainModels(bm) => bm
            .models()
            .iter()
            .filter_map(BrainModel::voxel_indices)
            .flatten()
            .try_for_each(|&v| space.check_voxel(v)),
        MapContent::Parcels(p) => p
            .parcels()
            .iter()
            .flat_map(|parcel| parcel.voxels.iter())
            .try_for_each(|&v| space.check_voxel(v)),
        _ => Ok(()),
    }
}
