//! Brain models: one structure's vertices or voxels occupying a contiguous
//! range of a brain-models mapping.

use super::structure::Structure;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::OnceLock;

/// Kind of geometry a brain model indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelType {
    /// Vertices of a surface.
    Surface,
    /// Voxels of the volume space.
    Voxels,
}

impl ModelType {
    /// XML attribute value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Surface => "CIFTI_MODEL_TYPE_SURFACE",
            Self::Voxels => "CIFTI_MODEL_TYPE_VOXELS",
        }
    }
}

impl std::fmt::Display for ModelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CIFTI_MODEL_TYPE_SURFACE" => Ok(Self::Surface),
            "CIFTI_MODEL_TYPE_VOXELS" => Ok(Self::Voxels),
            _ => Err(Error::UnknownModelType(s.to_string())),
        }
    }
}

/// One matrix index and the surface vertex it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceMapEntry {
    /// Position along the mapped dimension.
    pub index: i64,
    /// Surface vertex.
    pub vertex: i64,
}

/// One matrix index and the voxel it maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeMapEntry {
    /// Position along the mapped dimension.
    pub index: i64,
    /// Voxel index triple.
    pub ijk: [i64; 3],
}

/// What a brain model indexes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ModelGeometry {
    /// Surface vertices. `vertex_indices: None` means every vertex, in order.
    Surface {
        number_of_vertices: i64,
        vertex_indices: Option<Vec<i64>>,
    },
    /// Voxels, one triple per matrix index.
    Voxels { ijk: Vec<[i64; 3]> },
}

#[derive(Debug, Clone, Default)]
enum ReverseLookup {
    #[default]
    Unbuilt,
    /// vertex -> position within the model, -1 if excluded
    Surface(Vec<i64>),
    /// voxel -> position within the model
    Voxels(HashMap<[i64; 3], i64>),
}

/// A contiguous run of matrix indices assigned to one structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrainModel {
    structure: Structure,
    index_offset: i64,
    index_count: i64,
    geometry: ModelGeometry,
    #[serde(skip)]
    lookup: ReverseLookup,
    #[serde(skip)]
    surface_map: OnceLock<Vec<SurfaceMapEntry>>,
    #[serde(skip)]
    volume_map: OnceLock<Vec<VolumeMapEntry>>,
}

impl PartialEq for BrainModel {
    fn eq(&self, other: &Self) -> bool {
        self.structure == other.structure
            && self.index_offset == other.index_offset
            && self.index_count == other.index_count
            && self.geometry == other.geometry
    }
}

impl BrainModel {
    /// Surface model over an explicit vertex list (`None` for all vertices).
    pub fn surface(
        structure: Structure,
        index_offset: i64,
        number_of_vertices: i64,
        vertex_indices: Option<Vec<i64>>,
    ) -> Result<Self> {
        let index_count = match &vertex_indices {
            Some(list) => list.len() as i64,
            None => number_of_vertices,
        };
        Self::build(
            structure,
            index_offset,
            index_count,
            ModelGeometry::Surface {
                number_of_vertices,
                vertex_indices,
            },
        )
    }

    /// Surface model including the vertices whose ROI value is positive.
    ///
    /// When every vertex qualifies no explicit list is stored.
    pub fn surface_from_roi(
        structure: Structure,
        index_offset: i64,
        number_of_vertices: i64,
        roi: &[f32],
    ) -> Result<Self> {
        if roi.len() as i64 != number_of_vertices {
            return Err(Error::InvalidDimensions(format!(
                "roi has {} values, surface has {} vertices",
                roi.len(),
                number_of_vertices
            )));
        }
        let included: Vec<i64> = roi
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > 0.0)
            .map(|(i, _)| i as i64)
            .collect();
        let vertex_indices = if included.len() == roi.len() {
            None
        } else {
            Some(included)
        };
        Self::surface(structure, index_offset, number_of_vertices, vertex_indices)
    }

    /// Surface model over an ordered vertex list.
    ///
    /// Every entry must lie in `[0, number_of_vertices)`. The full identity
    /// sequence is stored as "all vertices".
    pub fn surface_from_list(
        structure: Structure,
        index_offset: i64,
        number_of_vertices: i64,
        vertices: &[i64],
    ) -> Result<Self> {
        if let Some(&bad) = vertices
            .iter()
            .find(|&&v| v < 0 || v >= number_of_vertices)
        {
            return Err(Error::VertexOutOfRange {
                vertex: bad,
                vertex_count: number_of_vertices,
            });
        }
        let identity = vertices.len() as i64 == number_of_vertices
            && vertices.iter().enumerate().all(|(i, &v)| v == i as i64);
        let vertex_indices = if identity {
            None
        } else {
            Some(vertices.to_vec())
        };
        Self::surface(structure, index_offset, number_of_vertices, vertex_indices)
    }

    /// Voxel model over an ordered list of IJK triples.
    pub fn voxels(structure: Structure, index_offset: i64, ijk: Vec<[i64; 3]>) -> Result<Self> {
        let index_count = ijk.len() as i64;
        Self::build(structure, index_offset, index_count, ModelGeometry::Voxels { ijk })
    }

    fn build(
        structure: Structure,
        index_offset: i64,
        index_count: i64,
        geometry: ModelGeometry,
    ) -> Result<Self> {
        let mut model = Self {
            structure,
            index_offset,
            index_count,
            geometry,
            lookup: ReverseLookup::Unbuilt,
            surface_map: OnceLock::new(),
            volume_map: OnceLock::new(),
        };
        model.setup_lookup()?;
        Ok(model)
    }

    /// Validate the model and rebuild its reverse lookup.
    pub(crate) fn setup_lookup(&mut self) -> Result<()> {
        self.surface_map = OnceLock::new();
        self.volume_map = OnceLock::new();
        if self.index_offset < 0 || self.index_count < 0 {
            return Err(Error::InvalidDimensions(format!(
                "{} model has negative offset {} or count {}",
                self.structure, self.index_offset, self.index_count
            )));
        }
        if self.index_offset.checked_add(self.index_count).is_none() {
            return Err(Error::InvalidDimensions(format!(
                "{} model range starting at {} with count {} overflows",
                self.structure, self.index_offset, self.index_count
            )));
        }
        self.lookup = match &self.geometry {
            ModelGeometry::Surface {
                number_of_vertices,
                vertex_indices,
            } => {
                let n = *number_of_vertices;
                let mut table = vertex_table(self.structure, n)?;
                match vertex_indices {
                    None => {
                        if self.index_count != n {
                            return Err(Error::InvalidDimensions(format!(
                                "{} model covers all {} vertices but has count {}",
                                self.structure, n, self.index_count
                            )));
                        }
                        for (i, slot) in table.iter_mut().enumerate() {
                            *slot = i as i64;
                        }
                    }
                    Some(list) => {
                        if list.len() as i64 != self.index_count {
                            return Err(Error::InvalidDimensions(format!(
                                "{} model lists {} vertices but has count {}",
                                self.structure,
                                list.len(),
                                self.index_count
                            )));
                        }
                        for (pos, &vertex) in list.iter().enumerate() {
                            if vertex < 0 || vertex >= n {
                                return Err(Error::VertexOutOfRange {
                                    vertex,
                                    vertex_count: n,
                                });
                            }
                            let slot = &mut table[vertex as usize];
                            if *slot != -1 {
                                return Err(Error::InvalidDimensions(format!(
                                    "vertex {} appears twice in {} model",
                                    vertex, self.structure
                                )));
                            }
                            *slot = pos as i64;
                        }
                    }
                }
                ReverseLookup::Surface(table)
            }
            ModelGeometry::Voxels { ijk } => {
                if ijk.len() as i64 != self.index_count {
                    return Err(Error::InvalidDimensions(format!(
                        "{} model lists {} voxels but has count {}",
                        self.structure,
                        ijk.len(),
                        self.index_count
                    )));
                }
                let mut table = HashMap::with_capacity(ijk.len());
                for (pos, voxel) in ijk.iter().enumerate() {
                    // first occurrence wins, as a linear scan would
                    table.entry(*voxel).or_insert(pos as i64);
                }
                ReverseLookup::Voxels(table)
            }
        };
        Ok(())
    }

    /// Structure this model covers.
    pub fn structure(&self) -> Structure {
        self.structure
    }

    /// Surface or voxels.
    pub fn model_type(&self) -> ModelType {
        match self.geometry {
            ModelGeometry::Surface { .. } => ModelType::Surface,
            ModelGeometry::Voxels { .. } => ModelType::Voxels,
        }
    }

    /// Geometry payload.
    pub fn geometry(&self) -> &ModelGeometry {
        &self.geometry
    }

    /// First matrix index of this model.
    pub fn index_offset(&self) -> i64 {
        self.index_offset
    }

    /// Number of matrix indices this model occupies.
    pub fn index_count(&self) -> i64 {
        self.index_count
    }

    /// One past the last matrix index of this model.
    pub fn range_end(&self) -> i64 {
        self.index_offset.saturating_add(self.index_count)
    }

    /// Vertex count of the referenced surface.
    pub fn number_of_vertices(&self) -> Option<i64> {
        match self.geometry {
            ModelGeometry::Surface {
                number_of_vertices, ..
            } => Some(number_of_vertices),
            ModelGeometry::Voxels { .. } => None,
        }
    }

    /// Explicit included-vertex list, `None` when every vertex is included
    /// (or for voxel models).
    pub fn vertex_indices(&self) -> Option<&[i64]> {
        match &self.geometry {
            ModelGeometry::Surface { vertex_indices, .. } => vertex_indices.as_deref(),
            ModelGeometry::Voxels { .. } => None,
        }
    }

    /// Voxel triples of a voxel model.
    pub fn voxel_indices(&self) -> Option<&[[i64; 3]]> {
        match &self.geometry {
            ModelGeometry::Voxels { ijk } => Some(ijk),
            ModelGeometry::Surface { .. } => None,
        }
    }

    /// Matrix index of a surface vertex, `None` if excluded or out of range.
    pub fn index_for_vertex(&self, vertex: i64) -> Option<i64> {
        let ReverseLookup::Surface(table) = &self.lookup else {
            return None;
        };
        if vertex < 0 {
            return None;
        }
        match table.get(vertex as usize) {
            Some(&pos) if pos >= 0 => Some(self.index_offset + pos),
            _ => None,
        }
    }

    /// Matrix index of a voxel of this model.
    pub fn index_for_voxel(&self, ijk: [i64; 3]) -> Option<i64> {
        let ReverseLookup::Voxels(table) = &self.lookup else {
            return None;
        };
        table.get(&ijk).map(|&pos| self.index_offset + pos)
    }

    /// Surface vertex at a matrix index inside this model's range.
    pub fn vertex_for_index(&self, index: i64) -> Option<i64> {
        let ModelGeometry::Surface { vertex_indices, .. } = &self.geometry else {
            return None;
        };
        if index < self.index_offset || index >= self.range_end() {
            return None;
        }
        let pos = index - self.index_offset;
        match vertex_indices {
            None => Some(pos),
            Some(list) => list.get(pos as usize).copied(),
        }
    }

    /// Voxel at a matrix index inside this model's range.
    pub fn voxel_for_index(&self, index: i64) -> Option<[i64; 3]> {
        let ModelGeometry::Voxels { ijk } = &self.geometry else {
            return None;
        };
        if index < self.index_offset || index >= self.range_end() {
            return None;
        }
        ijk.get((index - self.index_offset) as usize).copied()
    }

    /// Every (matrix index, vertex) pair of a surface model, built on first use.
    pub fn surface_map(&self) -> Option<&[SurfaceMapEntry]> {
        let ModelGeometry::Surface { vertex_indices, .. } = &self.geometry else {
            return None;
        };
        let map = self.surface_map.get_or_init(|| match vertex_indices {
            None => (0..self.index_count)
                .map(|i| SurfaceMapEntry {
                    index: self.index_offset + i,
                    vertex: i,
                })
                .collect(),
            Some(list) => list
                .iter()
                .enumerate()
                .map(|(i, &vertex)| SurfaceMapEntry {
                    index: self.index_offset + i as i64,
                    vertex,
                })
                .collect(),
        });
        Some(map)
    }

    /// Every (matrix index, voxel) pair of a voxel model, built on first use.
    pub fn volume_map(&self) -> Option<&[VolumeMapEntry]> {
        let ModelGeometry::Voxels { ijk } = &self.geometry else {
            return None;
        };
        let map = self.volume_map.get_or_init(|| {
            ijk.iter()
                .enumerate()
                .map(|(i, &voxel)| VolumeMapEntry {
                    index: self.index_offset + i as i64,
                    ijk: voxel,
                })
                .collect()
        });
        Some(map)
    }
}

/// Vertex -> position table for a surface of `n` vertices, all `-1`.
///
/// Fails instead of aborting when `n` is negative or cannot be allocated.
pub(crate) fn vertex_table(structure: Structure, n: i64) -> Result<Vec<i64>> {
    let len = usize::try_from(n).map_err(|_| {
        Error::InvalidDimensions(format!(
            "{} surface has negative vertex count {}",
            structure, n
        ))
    })?;
    let mut table = Vec::new();
    table.try_reserve_exact(len).map_err(|e| {
        Error::InvalidDimensions(format!(
            "{} surface with {} vertices cannot be indexed: {}",
            structure, n, e
        ))
    })?;
    table.resize(len, -1);
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_surface() {
        let model = BrainModel::surface(Structure::CortexLeft, 0, 5, None).unwrap();
        assert_eq!(model.index_count(), 5);
        assert!(model.vertex_indices().is_none());
        for v in 0..5 {
            assert_eq!(model.index_for_vertex(v), Some(v));
        }
        assert_eq!(model.index_for_vertex(5), None);
        assert_eq!(model.index_for_vertex(-1), None);
    }

    #[test]
    fn test_roi_excludes_vertices() {
        let roi = [1.0, 0.0, 2.0, -1.0, 0.5];
        let model = BrainModel::surface_from_roi(Structure::CortexRight, 10, 5, &roi).unwrap();
        assert_eq!(model.index_count(), 3);
        assert_eq!(model.vertex_indices(), Some(&[0, 2, 4][..]));
        assert_eq!(model.index_for_vertex(0), Some(10));
        assert_eq!(model.index_for_vertex(1), None);
        assert_eq!(model.index_for_vertex(2), Some(11));
        assert_eq!(model.index_for_vertex(4), Some(12));
        assert_eq!(model.vertex_for_index(11), Some(2));
        assert_eq!(model.vertex_for_index(13), None);
    }

    #[test]
    fn test_full_roi_stores_no_list() {
        let model = BrainModel::surface_from_roi(Structure::CortexLeft, 0, 3, &[1.0; 3]).unwrap();
        assert!(model.vertex_indices().is_none());
        assert_eq!(model.index_count(), 3);
    }

    #[test]
    fn test_roi_length_mismatch() {
        assert!(BrainModel::surface_from_roi(Structure::CortexLeft, 0, 3, &[1.0; 2]).is_err());
    }

    #[test]
    fn test_list_validation() {
        let err = BrainModel::surface_from_list(Structure::CortexLeft, 0, 4, &[0, 4]).unwrap_err();
        assert!(matches!(
            err,
            Error::VertexOutOfRange {
                vertex: 4,
                vertex_count: 4
            }
        ));

        let identity =
            BrainModel::surface_from_list(Structure::CortexLeft, 0, 3, &[0, 1, 2]).unwrap();
        assert!(identity.vertex_indices().is_none());

        let shuffled =
            BrainModel::surface_from_list(Structure::CortexLeft, 0, 3, &[2, 0, 1]).unwrap();
        assert_eq!(shuffled.vertex_indices(), Some(&[2, 0, 1][..]));
        assert_eq!(shuffled.index_for_vertex(2), Some(0));

        assert!(BrainModel::surface_from_list(Structure::CortexLeft, 0, 3, &[1, 1]).is_err());
    }

    #[test]
    fn test_voxel_model() {
        let model = BrainModel::voxels(
            Structure::ThalamusLeft,
            7,
            vec![[1, 2, 3], [4, 5, 6], [1, 2, 4]],
        )
        .unwrap();
        assert_eq!(model.model_type(), ModelType::Voxels);
        assert_eq!(model.index_for_voxel([4, 5, 6]), Some(8));
        assert_eq!(model.index_for_voxel([9, 9, 9]), None);
        assert_eq!(model.voxel_for_index(9), Some([1, 2, 4]));
        assert_eq!(model.index_for_vertex(0), None);

        let map = model.volume_map().unwrap();
        assert_eq!(map.len(), 3);
        assert_eq!(map[2], VolumeMapEntry { index: 9, ijk: [1, 2, 4] });
        assert!(model.surface_map().is_none());
    }

    #[test]
    fn test_surface_map() {
        let model = BrainModel::surface_from_list(Structure::CortexLeft, 3, 10, &[9, 4]).unwrap();
        let map = model.surface_map().unwrap();
        assert_eq!(
            map,
            &[
                SurfaceMapEntry { index: 3, vertex: 9 },
                SurfaceMapEntry { index: 4, vertex: 4 }
            ]
        );
    }

    #[test]
    fn test_range_overflow_rejected() {
        let err = BrainModel::surface_from_list(Structure::CortexLeft, i64::MAX, 4, &[1])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
        assert!(err.to_string().contains("overflows"));
        assert!(BrainModel::voxels(Structure::BrainStem, i64::MAX, vec![[0, 0, 0]]).is_err());
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let err = BrainModel::surface_from_list(Structure::CortexLeft, 0, i64::MAX, &[0])
            .unwrap_err();
        assert!(err.to_string().contains("cannot be indexed"));
        assert!(BrainModel::surface(Structure::CortexLeft, 0, -3, Some(vec![])).is_err());
    }

    #[test]
    fn test_model_type_tags() {
        assert_eq!(
            "CIFTI_MODEL_TYPE_VOXELS".parse::<ModelType>().unwrap(),
            ModelType::Voxels
        );
        assert!("CIFTI_MODEL_TYPE_POINTS".parse::<ModelType>().is_err());
    }
}
