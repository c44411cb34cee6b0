//! Physical units for spatial transforms and time steps.
//!
//! CIFTI reuses the NIfTI `xyzt_units` vocabulary: the XML stores the symbolic
//! names (`NIFTI_UNITS_MM`, ...) while the NIfTI header stores the bit codes.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Spatial units of a voxel-index to coordinate transform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpatialUnits {
    /// Units are not specified.
    Unknown,
    /// Coordinates expressed in meters.
    Meter,
    /// Coordinates expressed in millimeters.
    #[default]
    Millimeter,
    /// Coordinates expressed in micrometers.
    Micrometer,
}

impl SpatialUnits {
    /// Parse from the spatial bits of a NIfTI `xyzt_units` code.
    pub fn from_code(code: u8) -> Self {
        match code & 0x07 {
            1 => Self::Meter,
            2 => Self::Millimeter,
            3 => Self::Micrometer,
            _ => Self::Unknown,
        }
    }

    /// NIfTI `xyzt_units` spatial code.
    pub fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Meter => 1,
            Self::Millimeter => 2,
            Self::Micrometer => 3,
        }
    }

    /// XML attribute value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "NIFTI_UNITS_UNKNOWN",
            Self::Meter => "NIFTI_UNITS_METER",
            Self::Millimeter => "NIFTI_UNITS_MM",
            Self::Micrometer => "NIFTI_UNITS_MICRON",
        }
    }

    /// Factor that converts a length in these units to millimeters.
    pub fn millimeter_scale(self) -> Result<f64> {
        match self {
            Self::Millimeter => Ok(1.0),
            Self::Meter => Ok(1000.0),
            Self::Micrometer => Ok(0.001),
            Self::Unknown => Err(Error::UnsupportedSpatialUnits(self.as_str().to_string())),
        }
    }
}

impl std::fmt::Display for SpatialUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SpatialUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NIFTI_UNITS_MM" => Ok(Self::Millimeter),
            "NIFTI_UNITS_METER" => Ok(Self::Meter),
            "NIFTI_UNITS_MICRON" => Ok(Self::Micrometer),
            "NIFTI_UNITS_UNKNOWN" => Ok(Self::Unknown),
            _ => Err(Error::UnsupportedSpatialUnits(s.to_string())),
        }
    }
}

/// Temporal units of a series step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TemporalUnits {
    /// Temporal spacing unspecified.
    Unknown,
    /// Temporal spacing in seconds.
    #[default]
    Second,
    /// Temporal spacing in milliseconds.
    Millisecond,
    /// Temporal spacing in microseconds.
    Microsecond,
}

impl TemporalUnits {
    /// Parse from the temporal bits of a NIfTI `xyzt_units` code.
    pub fn from_code(code: u8) -> Self {
        match code & 0x38 {
            0x08 => Self::Second,
            0x10 => Self::Millisecond,
            0x18 => Self::Microsecond,
            _ => Self::Unknown,
        }
    }

    /// NIfTI `xyzt_units` temporal code.
    pub fn to_code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Second => 0x08,
            Self::Millisecond => 0x10,
            Self::Microsecond => 0x18,
        }
    }

    /// XML attribute value.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "NIFTI_UNITS_UNKNOWN",
            Self::Second => "NIFTI_UNITS_SEC",
            Self::Millisecond => "NIFTI_UNITS_MSEC",
            Self::Microsecond => "NIFTI_UNITS_USEC",
        }
    }

    /// Factor that converts a duration in these units to seconds.
    pub fn second_scale(self) -> Result<f64> {
        match self {
            Self::Second => Ok(1.0),
            Self::Millisecond => Ok(0.001),
            Self::Microsecond => Ok(0.000_001),
            Self::Unknown => Err(Error::UnsupportedTemporalUnits(self.as_str().to_string())),
        }
    }
}

impl std::fmt::Display for TemporalUnits {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TemporalUnits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "NIFTI_UNITS_SEC" => Ok(Self::Second),
            "NIFTI_UNITS_MSEC" => Ok(Self::Millisecond),
            "NIFTI_UNITS_USEC" => Ok(Self::Microsecond),
            "NIFTI_UNITS_UNKNOWN" => Ok(Self::Unknown),
            _ => Err(Error::UnsupportedTemporalUnits(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporal_units_from_code() {
        assert_eq!(TemporalUnits::from_code(0x08), TemporalUnits::Second);
        assert_eq!(TemporalUnits::from_code(0x10), TemporalUnits::Millisecond);
        assert_eq!(TemporalUnits::from_code(0x18), TemporalUnits::Microsecond);
        assert_eq!(TemporalUnits::from_code(0x00), TemporalUnits::Unknown);
        // spatial bits are ignored
        assert_eq!(TemporalUnits::from_code(0x0A), TemporalUnits::Second);
    }

    #[test]
    fn test_spatial_units_from_code() {
        assert_eq!(SpatialUnits::from_code(0x00), SpatialUnits::Unknown);
        assert_eq!(SpatialUnits::from_code(0x01), SpatialUnits::Meter);
        assert_eq!(SpatialUnits::from_code(0x02), SpatialUnits::Millimeter);
        assert_eq!(SpatialUnits::from_code(0x03), SpatialUnits::Micrometer);
        assert_eq!(SpatialUnits::from_code(0x0A), SpatialUnits::Millimeter);
    }

    #[test]
    fn test_scales() {
        assert_eq!(SpatialUnits::Meter.millimeter_scale().unwrap(), 1000.0);
        assert_eq!(SpatialUnits::Micrometer.millimeter_scale().unwrap(), 0.001);
        assert!(SpatialUnits::Unknown.millimeter_scale().is_err());
        assert_eq!(TemporalUnits::Millisecond.second_scale().unwrap(), 0.001);
        assert!(TemporalUnits::Unknown.second_scale().is_err());
    }

    #[test]
    fn test_xml_names() {
        for unit in [
            SpatialUnits::Meter,
            SpatialUnits::Millimeter,
            SpatialUnits::Micrometer,
        ] {
            assert_eq!(unit.as_str().parse::<SpatialUnits>().unwrap(), unit);
        }
        assert_eq!(
            "NIFTI_UNITS_MSEC".parse::<TemporalUnits>().unwrap(),
            TemporalUnits::Millisecond
        );
        assert!("NIFTI_UNITS_HZ".parse::<TemporalUnits>().is_err());
    }
}
