//! The full assessment pipeline
//!
//! Field selection, PCA, interpolation of the indicator, classification
//! and aggregation, run in that order over one dataset and boundary. The
//! configuration is validated before any computation starts.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use siteassay_core::crs::ensure_compatible;
use siteassay_core::{BackgroundValues, Error, Result, SiteBoundary, SurveyDataset};

use crate::background::{estimate_background, AnomalyDirection, BackgroundMethod};
use crate::classification::{classify, ClassificationResult, Thresholds};
use crate::interpolation::{interpolate, InterpolationParams, SamplePoint};
use crate::pca::{pca, PcaParams, PcaResult};
use crate::report::{aggregate, IndicatorSeries, Report, ReportExtras};
use crate::scoring::ScoringScheme;
use crate::selection::{self, ValidatedDataset};

/// Which scalar is interpolated and classified
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Indicator {
    /// Scores of a principal component (0 = PC1)
    Component(usize),
    /// A selected field's raw values
    Field(String),
}

impl Default for Indicator {
    fn default() -> Self {
        Indicator::Component(0)
    }
}

impl Indicator {
    /// Name used for the background lookup and in exports
    pub fn name(&self) -> String {
        match self {
            Indicator::Component(i) => PcaResult::component_name(*i),
            Indicator::Field(f) => f.clone(),
        }
    }

    /// Values of the indicator, one per validated point.
    ///
    /// Component scores are centred on zero, so they are shifted to make the
    /// lowest point zero before ratio thresholds are applied to them.
    pub fn values(&self, dataset: &ValidatedDataset, pca: &PcaResult) -> Result<Vec<f64>> {
        match self {
            Indicator::Component(i) => {
                let scores = pca.scores(*i).ok_or_else(|| {
                    Error::config(
                        "indicator",
                        self.name(),
                        format!("only {} components computed", pca.components.len()),
                    )
                })?;
                let low = scores.iter().copied().fold(f64::INFINITY, f64::min);
                Ok(scores.iter().map(|s| s - low).collect())
            }
            Indicator::Field(f) => dataset
                .column(f)
                .map(|c| c.to_vec())
                .ok_or_else(|| Error::config("indicator", f, "not among the selected fields")),
        }
    }
}

/// Configuration of one run.
///
/// Every section has defaults, so a JSON run file only lists what differs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Fields fed to the PCA; empty selects every complete numeric field
    pub fields: Vec<String>,
    pub pca: PcaParams,
    pub indicator: Indicator,
    pub interpolation: InterpolationParams,
    pub thresholds: Thresholds,
    /// Manual backgrounds by field or component name
    pub background: BackgroundValues,
    /// Used for the indicator when it has no manual background
    pub background_method: BackgroundMethod,
    /// Anomaly direction per field (default: high)
    pub directions: BTreeMap<String, AnomalyDirection>,
    /// Empirical threshold scoring of the raw readings
    pub scoring: Option<ScoringScheme>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            pca: PcaParams::default(),
            indicator: Indicator::default(),
            interpolation: InterpolationParams::default(),
            thresholds: Thresholds::default(),
            background: BackgroundValues::default(),
            background_method: BackgroundMethod::default(),
            directions: BTreeMap::new(),
            scoring: None,
        }
    }
}

impl AnalysisConfig {
    /// Check every section; the first inconsistency is returned.
    pub fn validate(&self) -> Result<()> {
        self.pca.validate()?;
        self.interpolation.validate()?;
        self.thresholds.validate()?;
        self.background_method.validate()?;
        if let Some(scoring) = &self.scoring {
            scoring.validate()?;
        }

        if !self.fields.is_empty() && self.fields.len() < selection::MIN_FIELDS {
            return Err(Error::InsufficientData {
                what: "fields",
                required: selection::MIN_FIELDS,
                found: self.fields.len(),
            });
        }
        match &self.indicator {
            Indicator::Component(i) => {
                let limit = self.pca.n_components.or((!self.fields.is_empty()).then_some(self.fields.len()));
                if let Some(n) = limit {
                    if *i >= n {
                        return Err(Error::config(
                            "indicator",
                            self.indicator.name(),
                            format!("only {} components available", n),
                        ));
                    }
                }
            }
            Indicator::Field(f) => {
                if !self.fields.is_empty() && !self.fields.contains(f) {
                    return Err(Error::config("indicator", f, "not among the selected fields"));
                }
            }
        }
        Ok(())
    }
}

/// Run the whole pipeline.
///
/// # Errors
/// Any stage error aborts the run; see the stage functions for the
/// individual conditions. A CRS mismatch between points and boundary fails
/// before computation with [`Error::CrsMismatch`].
pub fn run(dataset: &SurveyDataset, boundary: &SiteBoundary, config: &AnalysisConfig) -> Result<Report> {
    let span = tracing::info_span!("analysis", points = dataset.len());
    let _guard = span.enter();

    config.validate()?;
    ensure_compatible(dataset.crs.as_ref(), boundary.crs())?;

    let fields = if config.fields.is_empty() {
        let auto = selection::numeric_fields(dataset);
        tracing::debug!(fields = ?auto, "auto-selected fields");
        auto
    } else {
        config.fields.clone()
    };
    let selected = selection::select(dataset, &fields)?;
    tracing::info!(
        points = selected.n_points(),
        fields = selected.n_fields(),
        dropped = selected.dropped().len(),
        "fields validated"
    );

    let pca_result = pca(&selected, &config.pca)?;
    tracing::info!(
        components = pca_result.components.len(),
        pc1_ratio = pca_result.components.first().map_or(0.0, |c| c.variance_ratio),
        "PCA complete"
    );

    let indicator = IndicatorSeries {
        name: config.indicator.name(),
        values: config.indicator.values(&selected, &pca_result)?,
    };
    let samples = samples(&selected, &indicator.values);

    let surface = interpolate(&samples, boundary, &config.interpolation)?;
    tracing::info!(
        rows = surface.rows(),
        cols = surface.cols(),
        inside = surface.inside_count(),
        "surface interpolated"
    );

    let mut backgrounds = config.background.clone();
    let background = match config.background.get(&indicator.name) {
        Some(v) => v,
        None => {
            let v = estimate_background(&indicator.values, config.background_method)?;
            backgrounds.insert(indicator.name.clone(), v)?;
            v
        }
    };

    let classification = classify(&samples, Some(&surface), background, &config.thresholds)?;
    tracing::info!(
        background,
        sources = classification.source_cluster_count(),
        "indicator classified"
    );

    let field_classifications = classify_fields(&selected, config)?;

    let mut anomalies = BTreeMap::new();
    for field in selected.fields() {
        let Some(bg) = backgrounds.get(field) else { continue };
        let direction = config.directions.get(field).copied().unwrap_or_default();
        let flags = selected
            .column(field)
            .map(|c| c.iter().map(|&v| direction.flag(Some(v), bg)).collect())
            .unwrap_or_default();
        anomalies.insert(field.clone(), flags);
    }

    let scores = match &config.scoring {
        Some(scheme) => scheme.score_dataset(dataset)?,
        None => Vec::new(),
    };

    let extras = ReportExtras {
        crs: dataset.crs.clone().or_else(|| boundary.crs().cloned()),
        backgrounds,
        field_classifications,
        anomalies,
        scores,
    };
    aggregate(&selected, pca_result, indicator, surface, classification, extras)
}

fn samples(dataset: &ValidatedDataset, values: &[f64]) -> Vec<SamplePoint> {
    dataset
        .coords()
        .iter()
        .zip(values)
        .map(|(&(x, y), &v)| SamplePoint::new(x, y, v))
        .collect()
}

/// Point classification of every selected field with a manual background.
fn classify_fields(
    dataset: &ValidatedDataset,
    config: &AnalysisConfig,
) -> Result<BTreeMap<String, ClassificationResult>> {
    let mut out = BTreeMap::new();
    for field in dataset.fields() {
        let Some(bg) = config.background.get(field) else { continue };
        let Some(column) = dataset.column(field) else { continue };
        let points = samples(dataset, &column.to_vec());
        out.insert(field.clone(), classify(&points, None, bg, &config.thresholds)?);
    }
    Ok(out)
}
