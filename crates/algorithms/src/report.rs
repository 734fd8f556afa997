//! Result aggregation and export views
//!
//! [`aggregate`] assembles the outputs of one run into a [`Report`]. It
//! only checks that the parts describe the same points and copies them
//! into place; the report is read-only afterwards. Tables and vector
//! layers for the sinks are derived views, emitted in point load order
//! and row-major cell order so repeated runs give identical files.

use geo_types::{Point, Rect};
use serde::Serialize;
use std::collections::BTreeMap;

use siteassay_core::io::{Table, TableSink, VectorSink};
use siteassay_core::{AttributeValue, BackgroundValues, Error, Feature, FeatureCollection, Result, CRS};

use crate::background::Anomaly;
use crate::classification::{ClassificationResult, PollutionLevel};
use crate::interpolation::variogram::FittedVariogram;
use crate::interpolation::{InterpolatedSurface, InterpolationMethod};
use crate::pca::PcaResult;
use crate::scoring::PointScore;
use crate::selection::ValidatedDataset;

/// The scalar that was interpolated and classified
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorSeries {
    /// "PC1", "PC2", ... or a field name
    pub name: String,
    /// One value per validated point
    pub values: Vec<f64>,
}

/// Optional outputs attached to a report
#[derive(Debug, Clone, Default)]
pub struct ReportExtras {
    pub crs: Option<CRS>,
    /// Backgrounds actually used, including estimated ones
    pub backgrounds: BackgroundValues,
    /// Per-field point classification, for fields with a background
    pub field_classifications: BTreeMap<String, ClassificationResult>,
    /// Per-field anomaly flags, one per validated point
    pub anomalies: BTreeMap<String, Vec<Anomaly>>,
    /// Empirical scores of every loaded point
    pub scores: Vec<PointScore>,
}

/// One validated point with its labels
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointRecord {
    pub id: String,
    pub x: f64,
    pub y: f64,
    /// Selected field values, in field order
    pub values: Vec<f64>,
    pub indicator: f64,
    pub level: PollutionLevel,
}

/// Counts at one level
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LevelCount {
    pub level: PollutionLevel,
    pub points: usize,
    pub cells: usize,
}

/// Headline numbers of a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub n_points: usize,
    pub n_dropped: usize,
    pub n_fields: usize,
    pub indicator: String,
    pub background: f64,
    /// Variance ratio per reported component
    pub variance_explained: Vec<f64>,
    pub levels: Vec<LevelCount>,
    pub interpolation: InterpolationMethod,
    /// Variogram of a kriged surface
    pub variogram: Option<FittedVariogram>,
    pub cells_inside: usize,
    pub surface_min: Option<f64>,
    pub surface_max: Option<f64>,
    pub surface_mean: Option<f64>,
    pub source_clusters: usize,
    /// Scored points per class, when scoring ran
    pub score_classes: BTreeMap<String, usize>,
}

/// Everything one analysis run produced.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    summary: Summary,
    crs: Option<CRS>,
    fields: Vec<String>,
    points: Vec<PointRecord>,
    dropped: Vec<String>,
    backgrounds: BackgroundValues,
    pca: PcaResult,
    indicator: IndicatorSeries,
    classification: ClassificationResult,
    field_classifications: BTreeMap<String, ClassificationResult>,
    anomalies: BTreeMap<String, Vec<Anomaly>>,
    scores: Vec<PointScore>,
    #[serde(skip)]
    surface: InterpolatedSurface,
}

fn check_len(what: &str, found: usize, expected: usize) -> Result<()> {
    if found != expected {
        return Err(Error::InvalidInput(format!(
            "{} has {} entries, expected {}",
            what, found, expected
        )));
    }
    Ok(())
}

/// Assemble a report.
///
/// # Errors
/// [`Error::InvalidInput`] if any part disagrees with the dataset on the
/// number of points.
pub fn aggregate(
    dataset: &ValidatedDataset,
    pca: PcaResult,
    indicator: IndicatorSeries,
    surface: InterpolatedSurface,
    classification: ClassificationResult,
    extras: ReportExtras,
) -> Result<Report> {
    let n = dataset.n_points();
    check_len("PCA scores", pca.n_points(), n)?;
    check_len("indicator", indicator.values.len(), n)?;
    check_len("classification", classification.points.len(), n)?;
    for (field, c) in &extras.field_classifications {
        check_len(field, c.points.len(), n)?;
    }
    for (field, flags) in &extras.anomalies {
        check_len(field, flags.len(), n)?;
    }

    let points: Vec<PointRecord> = (0..n)
        .map(|i| PointRecord {
            id: dataset.ids()[i].clone(),
            x: dataset.coords()[i].0,
            y: dataset.coords()[i].1,
            values: dataset.values().row(i).to_vec(),
            indicator: indicator.values[i],
            level: classification.points[i],
        })
        .collect();

    let point_counts = classification.point_counts();
    let cell_counts = classification.cell_counts();
    let levels = PollutionLevel::ALL
        .iter()
        .map(|&level| LevelCount {
            level,
            points: point_counts[level.rank()],
            cells: cell_counts[level.rank()],
        })
        .collect();

    let mut score_classes = BTreeMap::new();
    for s in &extras.scores {
        *score_classes.entry(s.class.as_str().to_string()).or_insert(0) += 1;
    }

    let (surface_min, surface_max) = match surface.min_max() {
        Some((lo, hi)) => (Some(lo), Some(hi)),
        None => (None, None),
    };

    let summary = Summary {
        n_points: n,
        n_dropped: dataset.dropped().len(),
        n_fields: dataset.n_fields(),
        indicator: indicator.name.clone(),
        background: classification.background,
        variance_explained: pca.variance_ratios(),
        levels,
        interpolation: surface.method(),
        variogram: surface.variogram().copied(),
        cells_inside: surface.inside_count(),
        surface_min,
        surface_max,
        surface_mean: surface.mean(),
        source_clusters: classification.source_cluster_count(),
        score_classes,
    };

    Ok(Report {
        summary,
        crs: extras.crs,
        fields: dataset.fields().to_vec(),
        points,
        dropped: dataset.dropped().to_vec(),
        backgrounds: extras.backgrounds,
        pca,
        indicator,
        classification,
        field_classifications: extras.field_classifications,
        anomalies: extras.anomalies,
        scores: extras.scores,
        surface,
    })
}

impl Report {
    pub fn summary(&self) -> &Summary {
        &self.summary
    }

    pub fn crs(&self) -> Option<&CRS> {
        self.crs.as_ref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Validated points in load order
    pub fn points(&self) -> &[PointRecord] {
        &self.points
    }

    /// Ids of points dropped for missing values
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn backgrounds(&self) -> &BackgroundValues {
        &self.backgrounds
    }

    pub fn pca(&self) -> &PcaResult {
        &self.pca
    }

    pub fn indicator(&self) -> &IndicatorSeries {
        &self.indicator
    }

    pub fn surface(&self) -> &InterpolatedSurface {
        &self.surface
    }

    pub fn classification(&self) -> &ClassificationResult {
        &self.classification
    }

    pub fn field_classifications(&self) -> &BTreeMap<String, ClassificationResult> {
        &self.field_classifications
    }

    pub fn anomalies(&self) -> &BTreeMap<String, Vec<Anomaly>> {
        &self.anomalies
    }

    pub fn scores(&self) -> &[PointScore] {
        &self.scores
    }

    /// One row per validated point: coordinates, field values, indicator,
    /// level, per-field levels and anomaly flags.
    pub fn point_table(&self) -> Result<Table> {
        let mut columns: Vec<String> = vec!["id".into(), "x".into(), "y".into()];
        columns.extend(self.fields.iter().cloned());
        columns.push(self.indicator.name.clone());
        columns.push("level".into());
        columns.extend(self.field_classifications.keys().map(|f| format!("{}_level", f)));
        columns.extend(self.anomalies.keys().map(|f| format!("{}_anomaly", f)));

        let mut table = Table::new(columns);
        for (i, p) in self.points.iter().enumerate() {
            let mut row: Vec<AttributeValue> = vec![p.id.as_str().into(), p.x.into(), p.y.into()];
            row.extend(p.values.iter().map(|&v| AttributeValue::from(v)));
            row.push(p.indicator.into());
            row.push(p.level.as_str().into());
            row.extend(self.field_classifications.values().map(|c| c.points[i].as_str().into()));
            row.extend(self.anomalies.values().map(|flags| anomaly_label(flags[i]).into()));
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Eigenvalue, variance ratio and cumulative ratio per component
    pub fn variance_table(&self) -> Result<Table> {
        let mut table = Table::new(vec![
            "component".into(),
            "eigenvalue".into(),
            "variance_ratio".into(),
            "cumulative".into(),
        ]);
        let cumulative = self.pca.cumulative_variance();
        for (i, c) in self.pca.components.iter().enumerate() {
            table.push_row(vec![
                PcaResult::component_name(i).into(),
                c.eigenvalue.into(),
                c.variance_ratio.into(),
                cumulative[i].into(),
            ])?;
        }
        Ok(table)
    }

    /// One row per field: scaled loading and raw eigenvector entry for
    /// every component
    pub fn loading_table(&self) -> Result<Table> {
        let mut columns = vec!["field".to_string()];
        for i in 0..self.pca.components.len() {
            let name = PcaResult::component_name(i);
            columns.push(format!("{}_loading", name));
            columns.push(format!("{}_eigenvector", name));
        }
        let mut table = Table::new(columns);
        for (j, field) in self.pca.fields.iter().enumerate() {
            let mut row: Vec<AttributeValue> = vec![field.as_str().into()];
            for c in &self.pca.components {
                row.push(c.loading[j].into());
                row.push(c.eigenvector[j].into());
            }
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Empirical scores of every loaded point
    pub fn score_table(&self) -> Result<Table> {
        let score_fields: Vec<String> = self
            .scores
            .first()
            .map(|s| s.field_scores.keys().cloned().collect())
            .unwrap_or_default();
        let mut columns = vec!["id".to_string()];
        columns.extend(score_fields.iter().map(|f| format!("{}_score", f)));
        columns.extend(["screening_score", "total_score", "class"].map(String::from));

        let mut table = Table::new(columns);
        for s in &self.scores {
            let mut row: Vec<AttributeValue> = vec![s.id.as_str().into()];
            row.extend(
                score_fields
                    .iter()
                    .map(|f| AttributeValue::from(s.field_scores.get(f).copied().flatten().map(i64::from))),
            );
            row.push(i64::from(s.screening_score).into());
            row.push(i64::from(s.total_score).into());
            row.push(s.class.as_str().into());
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Validated points as point features
    pub fn point_features(&self) -> FeatureCollection {
        let mut layer = FeatureCollection::new();
        for (i, p) in self.points.iter().enumerate() {
            let mut feature = Feature::new(Point::new(p.x, p.y)).with_id(p.id.clone());
            feature.set_property("id", p.id.as_str());
            for (field, &v) in self.fields.iter().zip(&p.values) {
                feature.set_property(field.as_str(), v);
            }
            feature.set_property(self.indicator.name.as_str(), p.indicator);
            feature.set_property("level", p.level.as_str());
            for (field, c) in &self.field_classifications {
                feature.set_property(format!("{}_level", field), c.points[i].as_str());
            }
            layer.push(feature);
        }
        layer
    }

    /// Inside cells as square polygons, in row-major order
    pub fn cell_features(&self) -> FeatureCollection {
        let grid = self.surface.grid();
        let t = grid.transform();
        let (half_w, half_h) = (t.cell_width.abs() / 2.0, t.cell_height.abs() / 2.0);
        let levels = self.classification.cells.as_ref();

        let mut layer = FeatureCollection::new();
        for (row, col, value) in self.surface.inside_cells() {
            let (cx, cy) = grid.cell_center(row, col);
            let square = Rect::new((cx - half_w, cy - half_h), (cx + half_w, cy + half_h)).to_polygon();
            let mut feature = Feature::new(square);
            feature.set_property("row", row as i64);
            feature.set_property("col", col as i64);
            feature.set_property("value", value);
            if let Some(level) = levels.and_then(|l| l.get(row, col).copied().flatten()) {
                feature.set_property("level", level.as_str());
            }
            layer.push(feature);
        }
        layer
    }

    /// Write every table and layer under fixed names.
    ///
    /// Tables: `points_table`, `variance`, `loadings`, plus `scores` when
    /// scoring ran. Layers: `points`, `surface`.
    pub fn export(&self, tables: &mut dyn TableSink, layers: &mut dyn VectorSink) -> Result<()> {
        tables.write_table("points_table", &self.point_table()?)?;
        tables.write_table("variance", &self.variance_table()?)?;
        tables.write_table("loadings", &self.loading_table()?)?;
        if !self.scores.is_empty() {
            tables.write_table("scores", &self.score_table()?)?;
        }
        layers.write_layer("points", &self.point_features())?;
        layers.write_layer("surface", &self.cell_features())?;
        Ok(())
    }
}

fn anomaly_label(flag: Anomaly) -> &'static str {
    match flag {
        Anomaly::Normal => "normal",
        Anomaly::Anomalous => "anomalous",
        Anomaly::Missing => "missing",
    }
}
