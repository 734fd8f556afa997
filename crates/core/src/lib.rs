//! # SiteAssay Core
//!
//! Core types and I/O for the SiteAssay contamination-assessment engine.
//!
//! This crate provides:
//! - `SurveyPoint` / `SurveyDataset`: georeferenced monitoring points
//! - `SiteBoundary`: the analysis extent used for masking
//! - `BackgroundValues`: reference values per field
//! - `Grid<T>` / `GridSpec` / `GeoTransform`: regular grids over the site
//! - `Error`: the error taxonomy shared by every stage
//! - Provider and sink traits, with GeoJSON/JSON implementations

pub mod boundary;
pub mod crs;
pub mod error;
pub mod grid;
pub mod io;
pub mod survey;
pub mod vector;

pub use boundary::{Extent, SiteBoundary};
pub use crs::CRS;
pub use error::{Error, ErrorKind, Result};
pub use grid::{GeoTransform, Grid, GridSpec};
pub use survey::{BackgroundValues, SurveyDataset, SurveyPoint};
pub use vector::{AttributeValue, Feature, FeatureCollection, Numeric};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::boundary::{Extent, SiteBoundary};
    pub use crate::crs::CRS;
    pub use crate::error::{Error, ErrorKind, Result};
    pub use crate::grid::{GeoTransform, Grid, GridSpec};
    pub use crate::survey::{BackgroundValues, SurveyDataset, SurveyPoint};
    pub use crate::vector::{AttributeValue, Numeric};
}
