//! Parcels: named groups of surface vertices and voxels, one matrix index each.

use super::brain_model::vertex_table;
use super::structure::Structure;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A named grouping of vertices (per structure) and voxels.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Display name.
    pub name: String,
    /// Voxel triples, each inside the mapping's volume space.
    pub voxels: Vec<[i64; 3]>,
    /// Included vertices per surface structure.
    pub vertices: BTreeMap<Structure, BTreeSet<i64>>,
}

impl Parcel {
    /// Empty parcel with a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the voxel list.
    pub fn with_voxels(mut self, voxels: Vec<[i64; 3]>) -> Self {
        self.voxels = voxels;
        self
    }

    /// Add vertices of one surface structure.
    pub fn with_vertices(
        mut self,
        structure: Structure,
        vertices: impl IntoIterator<Item = i64>,
    ) -> Self {
        self.vertices.entry(structure).or_default().extend(vertices);
        self
    }

    /// True if the parcel holds no vertices and no voxels.
    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty() && self.vertices.values().all(BTreeSet::is_empty)
    }
}

/// Declares the vertex count of a surface that parcels may reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParcelSurface {
    structure: Structure,
    number_of_vertices: i64,
    /// vertex -> parcel position, -1 if in no parcel
    #[serde(skip)]
    lookup: Vec<i64>,
}

impl PartialEq for ParcelSurface {
    fn eq(&self, other: &Self) -> bool {
        self.structure == other.structure && self.number_of_vertices == other.number_of_vertices
    }
}

impl ParcelSurface {
    /// Declare a surface for `structure` with `number_of_vertices` vertices.
    pub fn new(structure: Structure, number_of_vertices: i64) -> Self {
        Self {
            structure,
            number_of_vertices,
            lookup: Vec::new(),
        }
    }

    /// Structure of the surface.
    pub fn structure(&self) -> Structure {
        self.structure
    }

    /// Declared vertex count.
    pub fn number_of_vertices(&self) -> i64 {
        self.number_of_vertices
    }
}

/// Payload of a parcels mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParcelsMap {
    parcels: Vec<Parcel>,
    surfaces: Vec<ParcelSurface>,
    #[serde(skip)]
    voxel_lookup: HashMap<[i64; 3], usize>,
}

impl PartialEq for ParcelsMap {
    fn eq(&self, other: &Self) -> bool {
        self.parcels == other.parcels && self.surfaces == other.surfaces
    }
}

impl ParcelsMap {
    /// Build from parts read from a file; lookups are built when the owning
    /// mapping is rescanned.
    pub fn new(parcels: Vec<Parcel>, surfaces: Vec<ParcelSurface>) -> Self {
        Self {
            parcels,
            surfaces,
            voxel_lookup: HashMap::new(),
        }
    }

    /// Parcels in matrix-index order.
    pub fn parcels(&self) -> &[Parcel] {
        &self.parcels
    }

    /// Declared parcel surfaces.
    pub fn surfaces(&self) -> &[ParcelSurface] {
        &self.surfaces
    }

    /// Declared vertex count for `structure`.
    pub fn number_of_vertices(&self, structure: Structure) -> Option<i64> {
        self.surface(structure).map(ParcelSurface::number_of_vertices)
    }

    fn surface(&self, structure: Structure) -> Option<&ParcelSurface> {
        self.surfaces.iter().find(|s| s.structure == structure)
    }

    /// True if any parcel holds voxels.
    pub fn has_voxels(&self) -> bool {
        self.parcels.iter().any(|p| !p.voxels.is_empty())
    }

    /// Position of the parcel containing `vertex` of `structure`.
    pub fn parcel_for_vertex(&self, structure: Structure, vertex: i64) -> Option<usize> {
        if vertex < 0 {
            return None;
        }
        let surface = self.surface(structure)?;
        match surface.lookup.get(vertex as usize) {
            Some(&p) if p >= 0 => Some(p as usize),
            _ => None,
        }
    }

    /// Position of the parcel containing voxel `ijk`.
    pub fn parcel_for_voxel(&self, ijk: [i64; 3]) -> Option<usize> {
        if ijk.iter().any(|&v| v < 0) {
            return None;
        }
        self.voxel_lookup.get(&ijk).copied()
    }

    pub(crate) fn push_parcel(&mut self, parcel: Parcel) -> Result<()> {
        self.parcels.push(parcel);
        if let Err(e) = self.setup_lookup() {
            self.parcels.pop();
            self.setup_lookup()?;
            return Err(e);
        }
        Ok(())
    }

    pub(crate) fn push_surface(&mut self, surface: ParcelSurface) -> Result<()> {
        self.surfaces.push(surface);
        if let Err(e) = self.setup_lookup() {
            self.surfaces.pop();
            self.setup_lookup()?;
            return Err(e);
        }
        Ok(())
    }

    /// Rebuild the vertex and voxel reverse lookups.
    ///
    /// Fails if a parcel references an undeclared surface, a vertex outside
    /// the declared count, or a vertex or voxel another parcel already owns.
    pub(crate) fn setup_lookup(&mut self) -> Result<()> {
        let mut seen = BTreeSet::new();
        for surface in &mut self.surfaces {
            if !seen.insert(surface.structure) {
                return Err(Error::InvalidParcel(format!(
                    "surface {} declared more than once",
                    surface.structure
                )));
            }
            if surface.number_of_vertices < 1 {
                return Err(Error::InvalidParcel(format!(
                    "surface {} must have at least one vertex",
                    surface.structure
                )));
            }
            surface.lookup = vertex_table(surface.structure, surface.number_of_vertices)?;
        }
        self.voxel_lookup.clear();

        for (position, parcel) in self.parcels.iter().enumerate() {
            for (&structure, vertices) in &parcel.vertices {
                let surface = self
                    .surfaces
                    .iter_mut()
                    .find(|s| s.structure == structure)
                    .ok_or_else(|| {
                        Error::InvalidParcel(format!(
                            "parcel '{}' uses surface {} which is not declared",
                            parcel.name, structure
                        ))
                    })?;
                for &vertex in vertices {
                    if vertex < 0 || vertex >= surface.number_of_vertices {
                        return Err(Error::InvalidParcel(format!(
                            "parcel '{}' uses vertex {} of {}, which has {} vertices",
                            parcel.name, vertex, structure, surface.number_of_vertices
                        )));
                    }
                    let slot = &mut surface.lookup[vertex as usize];
                    if *slot != -1 {
                        return Err(Error::InvalidParcel(format!(
                            "vertex {} of {} is in more than one parcel",
                            vertex, structure
                        )));
                    }
                    *slot = position as i64;
                }
            }
            for &voxel in &parcel.voxels {
                if self.voxel_lookup.insert(voxel, position).is_some() {
                    return Err(Error::InvalidParcel(format!(
                        "voxel {:?} is in more than one parcel",
                        voxel
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map_with_surface() -> ParcelsMap {
        let mut map = ParcelsMap::default();
        map.push_surface(ParcelSurface::new(Structure::CortexLeft, 10))
            .unwrap();
        map
    }

    #[test]
    fn test_vertex_and_voxel_lookup() {
        let mut map = map_with_surface();
        map.push_parcel(Parcel::new("a").with_vertices(Structure::CortexLeft, [1, 2, 3]))
            .unwrap();
        map.push_parcel(
            Parcel::new("b")
                .with_vertices(Structure::CortexLeft, [7])
                .with_voxels(vec![[0, 0, 1]]),
        )
        .unwrap();

        assert_eq!(map.parcel_for_vertex(Structure::CortexLeft, 2), Some(0));
        assert_eq!(map.parcel_for_vertex(Structure::CortexLeft, 7), Some(1));
        assert_eq!(map.parcel_for_vertex(Structure::CortexLeft, 0), None);
        assert_eq!(map.parcel_for_vertex(Structure::CortexLeft, 10), None);
        assert_eq!(map.parcel_for_vertex(Structure::CortexRight, 2), None);
        assert_eq!(map.parcel_for_voxel([0, 0, 1]), Some(1));
        assert_eq!(map.parcel_for_voxel([0, 0, -1]), None);
        assert!(map.has_voxels());
    }

    #[test]
    fn test_out_of_range_vertex_rolls_back() {
        let mut map = map_with_surface();
        let err = map
            .push_parcel(Parcel::new("bad").with_vertices(Structure::CortexLeft, [10]))
            .unwrap_err();
        assert!(err.to_string().contains("has 10 vertices"));
        assert!(map.parcels().is_empty());
    }

    #[test]
    fn test_undeclared_surface_rejected() {
        let mut map = map_with_surface();
        assert!(map
            .push_parcel(Parcel::new("r").with_vertices(Structure::CortexRight, [0]))
            .is_err());
        assert!(map.parcels().is_empty());
    }

    #[test]
    fn test_overlap_rejected() {
        let mut map = map_with_surface();
        map.push_parcel(Parcel::new("a").with_vertices(Structure::CortexLeft, [4]))
            .unwrap();
        assert!(map
            .push_parcel(Parcel::new("b").with_vertices(Structure::CortexLeft, [4]))
            .is_err());
        assert_eq!(map.parcels().len(), 1);
        // lookup still valid after rollback
        assert_eq!(map.parcel_for_vertex(Structure::CortexLeft, 4), Some(0));
    }

    #[test]
    fn test_oversized_surface_rejected() {
        let mut map = ParcelsMap::default();
        let err = map
            .push_surface(ParcelSurface::new(Structure::CortexLeft, i64::MAX))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidDimensions(_)));
        assert!(map.surfaces().is_empty());
    }

    #[test]
    fn test_duplicate_surface_rejected() {
        let mut map = map_with_surface();
        assert!(map
            .push_surface(ParcelSurface::new(Structure::CortexLeft, 5))
            .is_err());
        assert_eq!(map.surfaces().len(), 1);
        assert_eq!(map.number_of_vertices(Structure::CortexLeft), Some(10));
    }
}
