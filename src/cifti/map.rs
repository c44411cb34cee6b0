//! Matrix-indices map elements: one mapping of a matrix dimension.

use super::brain_model::{BrainModel, ModelType, VolumeMapEntry};
use super::label_table::LabelTable;
use super::parcel::ParcelsMap;
use super::structure::Structure;
use super::units::TemporalUnits;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// A matrix dimension as seen by the mapping engine.
///
/// The on-disk `AppliesToMatrixDimension` codes read backwards: the map with
/// code 0 has one entry per *row* (its length is the number of rows) and is
/// called the column map here, because it runs down a column. Code 1 is the
/// row map, one entry per column. Only [`Dimension::code`] and
/// [`Dimension::from_code`] deal with the raw integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i32", try_from = "i32")]
pub enum Dimension {
    /// Runs down a column; indexes rows. On-disk code 0.
    Columns,
    /// Runs along a row; indexes columns. On-disk code 1.
    Rows,
}

impl Dimension {
    /// On-disk `AppliesToMatrixDimension` value.
    pub const fn code(self) -> i32 {
        match self {
            Self::Columns => 0,
            Self::Rows => 1,
        }
    }

    /// Parse an on-disk `AppliesToMatrixDimension` value.
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            0 => Ok(Self::Columns),
            1 => Ok(Self::Rows),
            _ => Err(Error::InvalidDimensions(format!(
                "matrix dimension code must be 0 or 1, got {}",
                code
            ))),
        }
    }

    /// The other dimension.
    pub const fn other(self) -> Self {
        match self {
            Self::Columns => Self::Rows,
            Self::Rows => Self::Columns,
        }
    }
}

impl From<Dimension> for i32 {
    fn from(dim: Dimension) -> Self {
        dim.code()
    }
}

impl TryFrom<i32> for Dimension {
    type Error = Error;

    fn try_from(code: i32) -> Result<Self> {
        Self::from_code(code)
    }
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Columns => write!(f, "columns (dimension 0)"),
            Self::Rows => write!(f, "rows (dimension 1)"),
        }
    }
}

/// What the indices of a mapping refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingKind {
    /// Surface vertices and voxels, grouped into brain models.
    BrainModels,
    /// Parcels.
    Parcels,
    /// Named scalar maps.
    Scalars,
    /// Named label maps, each with a label table.
    Labels,
    /// Evenly spaced time points.
    TimePoints,
}

impl MappingKind {
    /// XML attribute value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BrainModels => "CIFTI_INDEX_TYPE_BRAIN_MODELS",
            Self::Parcels => "CIFTI_INDEX_TYPE_PARCELS",
            Self::Scalars => "CIFTI_INDEX_TYPE_SCALARS",
            Self::Labels => "CIFTI_INDEX_TYPE_LABELS",
            Self::TimePoints => "CIFTI_INDEX_TYPE_TIME_POINTS",
        }
    }

    /// Short human-readable name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::BrainModels => "brain models",
            Self::Parcels => "parcels",
            Self::Scalars => "scalars",
            Self::Labels => "labels",
            Self::TimePoints => "time points",
        }
    }
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MappingKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "CIFTI_INDEX_TYPE_BRAIN_MODELS" => Ok(Self::BrainModels),
            "CIFTI_INDEX_TYPE_PARCELS" => Ok(Self::Parcels),
            "CIFTI_INDEX_TYPE_SCALARS" => Ok(Self::Scalars),
            "CIFTI_INDEX_TYPE_LABELS" => Ok(Self::Labels),
            "CIFTI_INDEX_TYPE_TIME_POINTS" | "CIFTI_INDEX_TYPE_SERIES" => Ok(Self::TimePoints),
            _ => Err(Error::InvalidDimensions(format!(
                "unknown mapping type '{}'",
                s
            ))),
        }
    }
}

/// Step and length of a time-points mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    /// Spacing between samples, in `unit`.
    pub step: f64,
    /// Units of `step`.
    pub unit: TemporalUnits,
    /// Number of samples.
    pub count: i64,
}

impl TimeSeries {
    /// A series with its step in seconds.
    pub fn seconds(step: f64, count: i64) -> Self {
        Self {
            step,
            unit: TemporalUnits::Second,
            count,
        }
    }

    /// Step converted to seconds.
    pub fn step_seconds(&self) -> Result<f64> {
        Ok(self.step * self.unit.second_scale()?)
    }

    /// Sample nearest to `seconds`, `None` outside `[0, count)`.
    ///
    /// Halfway cases round to the even sample.
    pub fn index_for_seconds(&self, seconds: f64) -> Option<i64> {
        let step = self.step_seconds().ok()?;
        if !(step.is_finite() && step > 0.0) || !seconds.is_finite() {
            return None;
        }
        let index = (seconds / step).round_ties_even();
        if index < 0.0 || index >= self.count as f64 {
            return None;
        }
        Some(index as i64)
    }
}

/// A named scalar map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NamedMap {
    /// Display name.
    pub name: String,
}

/// A named label map and its label table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelMap {
    /// Display name.
    pub name: String,
    /// Keys used by this map.
    pub table: LabelTable,
}

/// Surface and volume structures of a brain-models mapping, in model order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureLists {
    /// Structures with a surface model.
    pub surface: Vec<Structure>,
    /// Structures with a voxel model.
    pub volume: Vec<Structure>,
}

/// Payload of a brain-models mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrainModelsMap {
    models: Vec<BrainModel>,
    #[serde(skip)]
    volume_map: OnceLock<Vec<VolumeMapEntry>>,
}

impl PartialEq for BrainModelsMap {
    fn eq(&self, other: &Self) -> bool {
        self.models == other.models
    }
}

impl BrainModelsMap {
    /// Build from models read from a file.
    pub fn new(models: Vec<BrainModel>) -> Self {
        Self {
            models,
            volume_map: OnceLock::new(),
        }
    }

    /// Models in file order.
    pub fn models(&self) -> &[BrainModel] {
        &self.models
    }

    /// First index past every model's range; where the next model starts.
    pub fn new_range_start(&self) -> i64 {
        self.models
            .iter()
            .map(BrainModel::range_end)
            .max()
            .unwrap_or(0)
    }

    /// Surface model for `structure`.
    pub fn find_surface(&self, structure: Structure) -> Option<&BrainModel> {
        self.find(ModelType::Surface, structure)
    }

    /// Voxel model for `structure`.
    pub fn find_volume(&self, structure: Structure) -> Option<&BrainModel> {
        self.find(ModelType::Voxels, structure)
    }

    fn find(&self, model_type: ModelType, structure: Structure) -> Option<&BrainModel> {
        self.models
            .iter()
            .find(|m| m.model_type() == model_type && m.structure() == structure)
    }

    /// True if any model is a voxel model.
    pub fn has_voxels(&self) -> bool {
        self.models
            .iter()
            .any(|m| m.model_type() == ModelType::Voxels)
    }

    /// Matrix index of a voxel, searching voxel models in order.
    pub fn index_for_voxel(&self, ijk: [i64; 3]) -> Option<i64> {
        self.models.iter().find_map(|m| m.index_for_voxel(ijk))
    }

    /// Model whose range contains `index`.
    pub fn model_for_index(&self, index: i64) -> Option<&BrainModel> {
        self.models
            .iter()
            .find(|m| index >= m.index_offset() && index < m.range_end())
    }

    /// Structure lists split by model type.
    pub fn structure_lists(&self) -> StructureLists {
        let mut lists = StructureLists::default();
        for model in &self.models {
            match model.model_type() {
                ModelType::Surface => lists.surface.push(model.structure()),
                ModelType::Voxels => lists.volume.push(model.structure()),
            }
        }
        lists
    }

    /// Every voxel of every voxel model with its matrix index, built on first use.
    pub fn volume_map(&self) -> &[VolumeMapEntry] {
        self.volume_map.get_or_init(|| {
            self.models
                .iter()
                .filter_map(BrainModel::volume_map)
                .flat_map(|m| m.iter().copied())
                .collect()
        })
    }

    pub(crate) fn push(&mut self, model: BrainModel) -> Result<()> {
        if self.find(model.model_type(), model.structure()).is_some() {
            return Err(Error::DuplicateStructure(model.structure()));
        }
        self.models.push(model);
        self.volume_map = OnceLock::new();
        Ok(())
    }

    /// Rebuild every model's lookup and check that ranges do not overlap.
    pub(crate) fn setup_lookup(&mut self) -> Result<()> {
        self.volume_map = OnceLock::new();
        self.models
            .iter_mut()
            .try_for_each(BrainModel::setup_lookup)?;

        let mut ranges: Vec<(i64, i64)> = self
            .models
            .iter()
            .map(|m| (m.index_offset(), m.range_end()))
            .collect();
        ranges.sort_unstable();
        for pair in ranges.windows(2) {
            if pair[1].0 < pair[0].1 {
                return Err(Error::InvalidDimensions(format!(
                    "brain model ranges [{}, {}) and [{}, {}) overlap",
                    pair[0].0, pair[0].1, pair[1].0, pair[1].1
                )));
            }
        }
        Ok(())
    }
}

/// Kind-specific payload of a map element.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum MapContent {
    /// Freshly created, not yet given a kind.
    #[default]
    Empty,
    /// Brain models.
    BrainModels(BrainModelsMap),
    /// Parcels and their surfaces.
    Parcels(ParcelsMap),
    /// Named scalar maps.
    Scalars(Vec<NamedMap>),
    /// Named label maps.
    Labels(Vec<LabelMap>),
    /// Time series.
    TimePoints(TimeSeries),
}

impl MapContent {
    /// Mapping kind, `None` for an untyped map.
    pub fn kind(&self) -> Option<MappingKind> {
        match self {
            Self::Empty => None,
            Self::BrainModels(_) => Some(MappingKind::BrainModels),
            Self::Parcels(_) => Some(MappingKind::Parcels),
            Self::Scalars(_) => Some(MappingKind::Scalars),
            Self::Labels(_) => Some(MappingKind::Labels),
            Self::TimePoints(_) => Some(MappingKind::TimePoints),
        }
    }

    /// True if the payload indexes any voxels.
    pub fn has_voxels(&self) -> bool {
        match self {
            Self::BrainModels(bm) => bm.has_voxels(),
            Self::Parcels(p) => p.has_voxels(),
            _ => false,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        self.kind().map_or("untyped", MappingKind::name)
    }
}

/// One mapping instantiation and the dimensions it applies to.
///
/// Equality compares the payload only, so a row map and a column map with
/// the same content are equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatrixIndicesMap {
    applies_to: Vec<Dimension>,
    content: MapContent,
}

impl PartialEq for MatrixIndicesMap {
    fn eq(&self, other: &Self) -> bool {
        self.content == other.content
    }
}

impl MatrixIndicesMap {
    /// Map element applying to `applies_to` with the given payload.
    pub fn new(applies_to: Vec<Dimension>, content: MapContent) -> Self {
        Self {
            applies_to,
            content,
        }
    }

    /// Dimensions this map governs; normally one, two while shared.
    pub fn applies_to(&self) -> &[Dimension] {
        &self.applies_to
    }

    pub(crate) fn applies_to_mut(&mut self) -> &mut Vec<Dimension> {
        &mut self.applies_to
    }

    /// True if this map governs `dim`.
    pub fn maps(&self, dim: Dimension) -> bool {
        self.applies_to.contains(&dim)
    }

    /// Payload.
    pub fn content(&self) -> &MapContent {
        &self.content
    }

    pub(crate) fn content_mut(&mut self) -> &mut MapContent {
        &mut self.content
    }

    /// Mapping kind, `None` for an untyped map.
    pub fn kind(&self) -> Option<MappingKind> {
        self.content.kind()
    }

    /// Number of matrix indices along this map, `None` for an untyped map.
    pub fn length(&self) -> Option<i64> {
        match &self.content {
            MapContent::Empty => None,
            MapContent::BrainModels(bm) => Some(bm.new_range_start()),
            MapContent::Parcels(p) => Some(p.parcels().len() as i64),
            MapContent::Scalars(maps) => Some(maps.len() as i64),
            MapContent::Labels(maps) => Some(maps.len() as i64),
            MapContent::TimePoints(series) => Some(series.count),
        }
    }

    /// Rebuild the reverse lookups of the payload.
    pub(crate) fn setup_lookup(&mut self) -> Result<()> {
        match &mut self.content {
            MapContent::BrainModels(bm) => bm.setup_lookup(),
            MapContent::Parcels(p) => p.setup_lookup(),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dimension_codes() {
        assert_eq!(Dimension::Columns.code(), 0);
        assert_eq!(Dimension::Rows.code(), 1);
        assert_eq!(Dimension::from_code(1).unwrap(), Dimension::Rows);
        assert!(Dimension::from_code(2).is_err());
        assert_eq!(Dimension::Rows.other(), Dimension::Columns);
    }

    #[test]
    fn test_mapping_kind_tags() {
        assert_eq!(
            "CIFTI_INDEX_TYPE_SERIES".parse::<MappingKind>().unwrap(),
            MappingKind::TimePoints
        );
        for kind in [
            MappingKind::BrainModels,
            MappingKind::Parcels,
            MappingKind::Scalars,
            MappingKind::Labels,
            MappingKind::TimePoints,
        ] {
            assert_eq!(kind.as_str().parse::<MappingKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_time_series_lookup() {
        let series = TimeSeries::seconds(2.0, 100);
        assert_eq!(series.index_for_seconds(5.0), Some(2));
        assert_eq!(series.index_for_seconds(7.0), Some(4));
        assert_eq!(series.index_for_seconds(5.2), Some(3));
        assert_eq!(series.index_for_seconds(198.0), Some(99));
        assert_eq!(series.index_for_seconds(250.0), None);
        assert_eq!(series.index_for_seconds(-3.0), None);

        let ms = TimeSeries {
            step: 720.0,
            unit: TemporalUnits::Millisecond,
            count: 10,
        };
        assert_eq!(ms.index_for_seconds(1.44), Some(2));

        let unknown = TimeSeries {
            step: 1.0,
            unit: TemporalUnits::Unknown,
            count: 10,
        };
        assert_eq!(unknown.index_for_seconds(1.0), None);
    }

    #[test]
    fn test_brain_models_range_start() {
        let mut bm = BrainModelsMap::default();
        assert_eq!(bm.new_range_start(), 0);
        bm.push(BrainModel::surface(Structure::CortexLeft, 0, 4, None).unwrap())
            .unwrap();
        bm.push(BrainModel::voxels(Structure::ThalamusLeft, 4, vec![[0, 0, 0], [1, 0, 0]]).unwrap())
            .unwrap();
        assert_eq!(bm.new_range_start(), 6);
        assert_eq!(bm.index_for_voxel([1, 0, 0]), Some(5));
        assert_eq!(bm.model_for_index(5).unwrap().structure(), Structure::ThalamusLeft);
        assert_eq!(bm.volume_map().len(), 2);
        assert_eq!(
            bm.structure_lists(),
            StructureLists {
                surface: vec![Structure::CortexLeft],
                volume: vec![Structure::ThalamusLeft],
            }
        );
        assert!(matches!(
            bm.push(BrainModel::surface(Structure::CortexLeft, 6, 4, None).unwrap()),
            Err(Error::DuplicateStructure(Structure::CortexLeft))
        ));
    }

    #[test]
    fn test_overlapping_ranges_rejected() {
        let mut bm = BrainModelsMap::new(vec![
            BrainModel::surface(Structure::CortexLeft, 0, 4, None).unwrap(),
            BrainModel::surface(Structure::CortexRight, 3, 4, None).unwrap(),
        ]);
        assert!(bm.setup_lookup().is_err());
    }

    #[test]
    fn test_map_equality_ignores_dimension() {
        let a = MatrixIndicesMap::new(
            vec![Dimension::Rows],
            MapContent::TimePoints(TimeSeries::seconds(1.0, 5)),
        );
        let b = MatrixIndicesMap::new(
            vec![Dimension::Columns],
            MapContent::TimePoints(TimeSeries::seconds(1.0, 5)),
        );
        let c = MatrixIndicesMap::new(
            vec![Dimension::Columns],
            MapContent::TimePoints(TimeSeries::seconds(1.0, 6)),
        );
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.length(), Some(5));
        assert_eq!(MatrixIndicesMap::new(vec![], MapContent::Empty).length(), None);
    }
}
