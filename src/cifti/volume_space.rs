//! Volume space: voxel grid dimensions plus the voxel-index to coordinate sform.

use super::units::SpatialUnits;
use crate::error::{Error, Result};
use nalgebra::{Matrix4, Vector4};
use serde::{Deserialize, Serialize};

/// Ratio two non-identical sform entries may differ by and still match.
pub const VOLUME_SPACE_TOLERANCE_RATIO: f64 = 0.999;

/// Direction an index axis runs through physical space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisOrientation {
    /// Increasing index moves from left to right (+x).
    LeftToRight,
    /// Increasing index moves from right to left (-x).
    RightToLeft,
    /// Increasing index moves from posterior to anterior (+y).
    PosteriorToAnterior,
    /// Increasing index moves from anterior to posterior (-y).
    AnteriorToPosterior,
    /// Increasing index moves from inferior to superior (+z).
    InferiorToSuperior,
    /// Increasing index moves from superior to inferior (-z).
    SuperiorToInferior,
}

/// Per-axis description of an axis-aligned ("plumb") volume space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlumbAttributes {
    /// Orientation of the i, j and k axes.
    pub orientation: [AxisOrientation; 3],
    /// Grid dimensions.
    pub dims: [i64; 3],
    /// Physical coordinate of voxel (0, 0, 0) along each index axis, in mm.
    pub origin: [f64; 3],
    /// Signed voxel spacing along each index axis, in mm.
    pub spacing: [f64; 3],
}

/// Dimensions and IJK→XYZ transform of the volume that voxel mappings index into.
///
/// The sform holds the first three rows of the affine; the fourth row is
/// always taken to be `[0, 0, 0, 1]` regardless of what a file declared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeSpace {
    dims: [i64; 3],
    sform: [[f64; 4]; 3],
    units: SpatialUnits,
}

impl VolumeSpace {
    /// Create a volume space whose sform is in millimeters.
    pub fn new(dims: [i64; 3], sform: [[f64; 4]; 3]) -> Result<Self> {
        Self::with_units(dims, sform, SpatialUnits::Millimeter)
    }

    /// Create a volume space with an explicit sform unit, as read from a file.
    pub fn with_units(dims: [i64; 3], sform: [[f64; 4]; 3], units: SpatialUnits) -> Result<Self> {
        if dims.iter().any(|&d| d < 0) {
            return Err(Error::InvalidDimensions(format!(
                "volume dimensions must be non-negative, got {:?}",
                dims
            )));
        }
        Ok(Self { dims, sform, units })
    }

    /// Grid dimensions.
    pub fn dims(&self) -> [i64; 3] {
        self.dims
    }

    /// The sform as stored, in [`Self::units`].
    pub fn sform(&self) -> &[[f64; 4]; 3] {
        &self.sform
    }

    /// Units of the stored sform.
    pub fn units(&self) -> SpatialUnits {
        self.units
    }

    /// The sform scaled to millimeters.
    pub fn sform_mm(&self) -> Result<[[f64; 4]; 3]> {
        let scale = self.units.millimeter_scale()?;
        let mut out = self.sform;
        for row in &mut out {
            for v in row.iter_mut() {
                *v *= scale;
            }
        }
        Ok(out)
    }

    /// Copy of this space with the sform converted to millimeters.
    pub fn normalized(&self) -> Result<Self> {
        Ok(Self {
            dims: self.dims,
            sform: self.sform_mm()?,
            units: SpatialUnits::Millimeter,
        })
    }

    /// Full 4x4 affine in millimeters.
    pub fn affine_f64(&self) -> Result<[[f64; 4]; 4]> {
        let s = self.sform_mm()?;
        Ok([s[0], s[1], s[2], [0.0, 0.0, 0.0, 1.0]])
    }

    /// Voxel spacing from the affine column norms, in millimeters.
    pub fn spacing(&self) -> Result<[f64; 3]> {
        let s = self.sform_mm()?;
        let mut spacing = [0.0; 3];
        for (j, out) in spacing.iter_mut().enumerate() {
            *out = (s[0][j] * s[0][j] + s[1][j] * s[1][j] + s[2][j] * s[2][j]).sqrt();
        }
        Ok(spacing)
    }

    /// True if `ijk` lies inside the grid.
    pub fn contains(&self, ijk: [i64; 3]) -> bool {
        ijk.iter()
            .zip(self.dims.iter())
            .all(|(&v, &d)| v >= 0 && v < d)
    }

    /// Check that `ijk` lies inside the grid.
    pub fn check_voxel(&self, ijk: [i64; 3]) -> Result<()> {
        if self.contains(ijk) {
            Ok(())
        } else {
            Err(Error::VoxelOutOfBounds {
                i: ijk[0],
                j: ijk[1],
                k: ijk[2],
                dims: self.dims,
            })
        }
    }

    /// Physical coordinate (mm) of a voxel index.
    pub fn ijk_to_xyz(&self, ijk: [i64; 3]) -> Result<[f64; 3]> {
        let s = self.sform_mm()?;
        let mut out = [0.0; 3];
        for (i, o) in out.iter_mut().enumerate() {
            *o = s[i][0] * ijk[0] as f64
                + s[i][1] * ijk[1] as f64
                + s[i][2] * ijk[2] as f64
                + s[i][3];
        }
        Ok(out)
    }

    /// Nearest voxel index to a physical coordinate (mm).
    ///
    /// Each component is rounded with `floor(x + 0.5)`. The result is not
    /// bounds-checked.
    pub fn xyz_to_ijk(&self, xyz: [f64; 3]) -> Result<[i64; 3]> {
        let a = self.affine_f64()?;
        #[rustfmt::skip]
        let forward = Matrix4::new(
            a[0][0], a[0][1], a[0][2], a[0][3],
            a[1][0], a[1][1], a[1][2], a[1][3],
            a[2][0], a[2][1], a[2][2], a[2][3],
            a[3][0], a[3][1], a[3][2], a[3][3],
        );
        let inverse = forward.try_inverse().ok_or(Error::SingularTransform)?;
        let index = inverse * Vector4::new(xyz[0], xyz[1], xyz[2], 1.0);
        Ok([
            (index[0] + 0.5).floor() as i64,
            (index[1] + 0.5).floor() as i64,
            (index[2] + 0.5).floor() as i64,
        ])
    }

    /// Whether two spaces describe the same grid, allowing round-trip noise.
    pub fn matches(&self, other: &Self) -> bool {
        self.matches_with_ratio(other, VOLUME_SPACE_TOLERANCE_RATIO)
    }

    /// Like [`Self::matches`] with a caller-chosen ratio.
    ///
    /// Dimensions must agree exactly. Each millimeter sform entry must be
    /// identical, or both non-zero with `left / right` and `right / left` at
    /// least `ratio`. Spaces with unsupported units never match.
    pub fn matches_with_ratio(&self, other: &Self, ratio: f64) -> bool {
        if self.dims != other.dims {
            return false;
        }
        let (left, right) = match (self.sform_mm(), other.sform_mm()) {
            (Ok(l), Ok(r)) => (l, r),
            _ => {
                tracing::warn!("volume space comparison with unsupported spatial units");
                return false;
            }
        };
        for i in 0..3 {
            for j in 0..4 {
                let (l, r) = (left[i][j], right[i][j]);
                if l != r && (l == 0.0 || r == 0.0 || l / r < ratio || r / l < ratio) {
                    return false;
                }
            }
        }
        true
    }

    /// Orientation, spacing and origin per index axis when the sform is
    /// axis-aligned. Returns `None` for oblique transforms or unsupported units.
    pub fn plumb_attributes(&self) -> Option<PlumbAttributes> {
        let s = self.sform_mm().ok()?;
        let mut axis_used = [false; 3];
        let mut index_used = [false; 3];
        let mut orientation = [AxisOrientation::LeftToRight; 3];
        let mut origin = [0.0; 3];
        let mut spacing = [0.0; 3];
        for i in 0..3 {
            for j in 0..3 {
                let v = s[i][j];
                if v == 0.0 {
                    continue;
                }
                if axis_used[i] || index_used[j] {
                    return None;
                }
                axis_used[i] = true;
                index_used[j] = true;
                spacing[j] = v;
                origin[j] = s[i][3];
                let positive = v > 0.0;
                orientation[j] = match (i, positive) {
                    (0, true) => AxisOrientation::LeftToRight,
                    (0, false) => AxisOrientation::RightToLeft,
                    (1, true) => AxisOrientation::PosteriorToAnterior,
                    (1, false) => AxisOrientation::AnteriorToPosterior,
                    (_, true) => AxisOrientation::InferiorToSuperior,
                    (_, false) => AxisOrientation::SuperiorToInferior,
                };
            }
        }
        if !index_used.iter().all(|&u| u) {
            return None;
        }
        Some(PlumbAttributes {
            orientation,
            dims: self.dims,
            origin,
            spacing,
        })
    }
}
