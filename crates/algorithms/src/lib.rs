//! # SiteAssay Algorithms
//!
//! The statistical contamination-assessment engine.
//!
//! ## Stages
//!
//! - **selection**: validate and project the chosen survey fields
//! - **pca**: standardization, covariance eigendecomposition, loadings, scores
//! - **interpolation**: IDW, linear (TIN) or kriged surface over the site,
//!   masked to the boundary
//! - **classification**: pollution levels and source clusters
//! - **report**: aggregation into tables and vector layers
//! - **background**: ECDF, k-means cut-off and percentile backgrounds
//! - **scoring**: empirical threshold scores for soil-gas indicators
//! - **analysis**: the whole pipeline driven by one [`AnalysisConfig`]

pub mod analysis;
pub mod background;
pub mod classification;
pub mod execution;
pub mod interpolation;
pub mod kdtree;
pub mod pca;
pub mod report;
pub mod scoring;
pub mod selection;
pub mod stats;

pub use analysis::{run, AnalysisConfig, Indicator};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::analysis::{run, AnalysisConfig, Indicator};
    pub use crate::background::{
        ecdf, estimate_background, kmeans_cutoff, percentile, Anomaly, AnomalyDirection,
        BackgroundMethod,
    };
    pub use crate::classification::{
        classify, classify_cells, classify_points, ClassificationResult, PollutionLevel,
        SourceCluster, Thresholds,
    };
    pub use crate::execution::ExecutionMode;
    pub use crate::interpolation::variogram::VariogramModel;
    pub use crate::interpolation::{
        interpolate, InterpolatedSurface, InterpolationMethod, InterpolationParams, KrigingParams, SamplePoint,
    };
    pub use crate::pca::{pca, pca_from_matrix, PcaParams, PcaResult, PrincipalComponent};
    pub use crate::report::{aggregate, IndicatorSeries, Report, ReportExtras, Summary};
    pub use crate::scoring::{ScoreClass, ScoreTable, ScoringScheme};
    pub use crate::selection::{select, ValidatedDataset};
    pub use siteassay_core::prelude::*;
}
