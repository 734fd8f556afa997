//! Input providers and output sinks
//!
//! The engine reads its inputs through [`PointSource`] and
//! [`BoundarySource`] and hands results to [`TableSink`] / [`VectorSink`].
//! File formats live behind these traits; GeoJSON and JSON implementations
//! are provided here.

mod geojson;
mod table;

pub use geojson::{
    feature_collection_to_geojson, GeoJsonDirectorySink, GeoJsonFile, GeoJsonSource,
};
pub use table::{JsonTableSink, Table};

use crate::boundary::SiteBoundary;
use crate::error::Result;
use crate::survey::SurveyDataset;
use crate::vector::FeatureCollection;

/// Read-only provider of survey points
pub trait PointSource {
    fn read_points(&self) -> Result<SurveyDataset>;
}

/// Read-only provider of the site boundary
pub trait BoundarySource {
    fn read_boundary(&self) -> Result<SiteBoundary>;
}

/// Consumer of tabular results
pub trait TableSink {
    fn write_table(&mut self, name: &str, table: &Table) -> Result<()>;
}

/// Consumer of vector layers
pub trait VectorSink {
    fn write_layer(&mut self, name: &str, layer: &FeatureCollection) -> Result<()>;
}
