//! # ciftirs
//!
//! Index-mapping engine for CIFTI connectivity matrices.
//!
//! ## Quick start
//!
//! ```
//! use ciftirs::cifti::{CiftiXml, Dimension, Structure};
//!
//! # fn main() -> ciftirs::Result<()> {
//! let mut xml = CiftiXml::new();
//! xml.reset_to_brain_models(Dimension::Columns);
//! let roi = [1.0, 0.0, 1.0, 1.0];
//! xml.add_surface_model(Dimension::Columns, 4, Structure::CortexLeft, Some(&roi[..]))?;
//! xml.reset_to_timepoints(Dimension::Rows, 0.72, 1200);
//!
//! assert_eq!(xml.dimension_length(Dimension::Columns)?, 3);
//! assert_eq!(xml.index_for_vertex(Dimension::Columns, Structure::CortexLeft, 2), Some(1));
//! assert_eq!(xml.timepoint_index(Dimension::Rows, 1.44), Some(2));
//! # Ok(())
//! # }
//! ```
//!
//! The in-memory tree ([`cifti::CiftiRoot`]) derives serde traits; readers
//! and writers for the on-disk XML hand a parsed tree to
//! [`cifti::CiftiXml::from_root`], which rebuilds every lookup.

pub mod cifti;
pub mod error;

pub use cifti::{CiftiRoot, CiftiXml, Dimension};
pub use error::{Error, Result};
