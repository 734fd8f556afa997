//! Exceedance classification of points and surface cells
//!
//! Two passes over immutable inputs:
//! 1. each value is labelled pointwise against the background
//!    ([`Thresholds::level`]);
//! 2. adjacent exceeds-threshold items are clustered, and every cluster's
//!    members are promoted through [`PollutionLevel::promote`] according to
//!    the cluster's size and mean concentration.

mod cluster;
mod level;
mod thresholds;

pub use level::{PollutionLevel, Promotion};
pub use thresholds::Thresholds;

use ndarray::Array2;
use serde::Serialize;

use siteassay_core::{Error, Grid, Result};

use crate::interpolation::{InterpolatedSurface, SamplePoint};

/// A group of adjacent exceeds-threshold items.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceCluster<T> {
    /// Point indices or `(row, col)` cells, ascending
    pub members: Vec<T>,
    pub mean_value: f64,
    pub max_value: f64,
    /// Final level shared by every member
    pub level: PollutionLevel,
}

impl<T> SourceCluster<T> {
    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Labels for one scalar indicator.
#[derive(Debug, Clone, Serialize)]
pub struct ClassificationResult {
    pub background: f64,
    pub thresholds: Thresholds,
    /// Resolved point adjacency distance
    pub adjacency_distance: f64,
    /// One label per point, in input order
    pub points: Vec<PollutionLevel>,
    pub point_clusters: Vec<SourceCluster<usize>>,
    /// Per-cell labels; `None` outside the boundary
    #[serde(skip_serializing)]
    pub cells: Option<Grid<Option<PollutionLevel>>>,
    pub cell_clusters: Vec<SourceCluster<(usize, usize)>>,
}

impl ClassificationResult {
    /// Number of points at each level, in [`PollutionLevel::ALL`] order
    pub fn point_counts(&self) -> [usize; 5] {
        count_levels(self.points.iter().copied())
    }

    /// Number of inside cells at each level, in [`PollutionLevel::ALL`] order
    pub fn cell_counts(&self) -> [usize; 5] {
        match &self.cells {
            Some(grid) => count_levels(grid.iter().filter_map(|(_, _, l)| *l)),
            None => [0; 5],
        }
    }

    /// Clusters promoted to a source level (points and cells)
    pub fn source_cluster_count(&self) -> usize {
        self.point_clusters.iter().filter(|c| c.level.is_source()).count()
            + self.cell_clusters.iter().filter(|c| c.level.is_source()).count()
    }
}

fn count_levels(levels: impl Iterator<Item = PollutionLevel>) -> [usize; 5] {
    let mut counts = [0; 5];
    for level in levels {
        counts[level.rank()] += 1;
    }
    counts
}

/// Final level of a cluster whose members all exceed the threshold.
fn cluster_level(values: &[f64], background: f64, thresholds: &Thresholds) -> (PollutionLevel, f64, f64) {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let mut level = PollutionLevel::ExceedsThreshold;
    if values.len() >= thresholds.source_cluster_min_points {
        level = level.promote(Promotion::ClusterSize);
    }
    if mean > background * thresholds.confirmed_ratio() {
        level = level.promote(Promotion::ClusterConcentration);
    }
    (level, mean, max)
}

fn check_background(background: f64) -> Result<()> {
    if !(background.is_finite() && background >= 0.0) {
        return Err(Error::config(
            "background",
            background,
            "ratio thresholds need a finite, non-negative background",
        ));
    }
    Ok(())
}

/// Classify scattered points.
///
/// # Errors
/// - [`Error::InvalidConfig`] for inconsistent thresholds or a negative
///   background
/// - [`Error::InvalidInput`] for non-finite values
pub fn classify_points(
    points: &[SamplePoint],
    background: f64,
    thresholds: &Thresholds,
) -> Result<(Vec<PollutionLevel>, Vec<SourceCluster<usize>>, f64)> {
    thresholds.validate()?;
    check_background(background)?;
    if points.iter().any(|p| !p.value.is_finite()) {
        return Err(Error::InvalidInput("cannot classify non-finite values".into()));
    }

    let mut levels: Vec<PollutionLevel> = points.iter().map(|p| thresholds.level(p.value, background)).collect();
    let flagged: Vec<bool> = levels.iter().map(|&l| l == PollutionLevel::ExceedsThreshold).collect();
    if !flagged.iter().any(|&f| f) {
        let distance = thresholds.adjacency_distance.unwrap_or(0.0);
        return Ok((levels, Vec::new(), distance));
    }

    let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
    let distance = thresholds.resolve_adjacency(&coords)?;

    let clusters = cluster::point_clusters(&coords, &flagged, distance)
        .into_iter()
        .map(|members| {
            let values: Vec<f64> = members.iter().map(|&i| points[i].value).collect();
            let (level, mean_value, max_value) = cluster_level(&values, background, thresholds);
            for &i in &members {
                levels[i] = level;
            }
            SourceCluster { members, mean_value, max_value, level }
        })
        .collect::<Vec<_>>();

    tracing::debug!(
        clusters = clusters.len(),
        sources = clusters.iter().filter(|c| c.level.is_source()).count(),
        adjacency = distance,
        "point clusters"
    );
    Ok((levels, clusters, distance))
}

/// Classify the inside cells of an interpolated surface.
///
/// Cells are clustered by 8-connectivity.
pub fn classify_cells(
    surface: &InterpolatedSurface,
    background: f64,
    thresholds: &Thresholds,
) -> Result<(Grid<Option<PollutionLevel>>, Vec<SourceCluster<(usize, usize)>>)> {
    thresholds.validate()?;
    check_background(background)?;

    let mut levels = surface.grid().map(|v| v.map(|v| thresholds.level(v, background)));
    let mask = Array2::from_shape_fn((surface.rows(), surface.cols()), |(r, c)| {
        matches!(levels.get(r, c), Some(Some(PollutionLevel::ExceedsThreshold)))
    });

    let mut clusters = Vec::new();
    for members in cluster::cell_clusters(&mask) {
        let values: Vec<f64> = members
            .iter()
            .filter_map(|&(r, c)| surface.value(r, c))
            .collect();
        let (level, mean_value, max_value) = cluster_level(&values, background, thresholds);
        for &(r, c) in &members {
            levels.set(r, c, Some(level))?;
        }
        clusters.push(SourceCluster { members, mean_value, max_value, level });
    }

    Ok((levels, clusters))
}

/// Classify points and, when given, surface cells against one background.
pub fn classify(
    points: &[SamplePoint],
    surface: Option<&InterpolatedSurface>,
    background: f64,
    thresholds: &Thresholds,
) -> Result<ClassificationResult> {
    let (point_levels, point_clusters, adjacency_distance) = classify_points(points, background, thresholds)?;
    let (cells, cell_clusters) = match surface {
        Some(surface) => {
            let (grid, clusters) = classify_cells(surface, background, thresholds)?;
            (Some(grid), clusters)
        }
        None => (None, Vec::new()),
    };

    Ok(ClassificationResult {
        background,
        thresholds: thresholds.clone(),
        adjacency_distance,
        points: point_levels,
        point_clusters,
        cells,
        cell_clusters,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionMode;
    use crate::interpolation::{interpolate, InterpolationParams};
    use siteassay_core::{GridSpec, SiteBoundary};

    fn thresholds() -> Thresholds {
        Thresholds {
            elevated_ratio: 1.5,
            exceedance_ratio: 3.0,
            source_cluster_min_points: 3,
            adjacency_distance: Some(5.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_cluster_promoted_isolated_kept() {
        let pts = vec![
            SamplePoint::new(0.0, 0.0, 35.0),
            SamplePoint::new(3.0, 0.0, 40.0),
            SamplePoint::new(0.0, 3.0, 32.0),
            SamplePoint::new(50.0, 50.0, 35.0),
            SamplePoint::new(20.0, 20.0, 12.0),
            SamplePoint::new(25.0, 5.0, 4.0),
        ];
        let result = classify(&pts, None, 10.0, &thresholds()).unwrap();
        assert_eq!(
            result.points,
            vec![
                PollutionLevel::SuspectedSource,
                PollutionLevel::SuspectedSource,
                PollutionLevel::SuspectedSource,
                PollutionLevel::ExceedsThreshold,
                PollutionLevel::Elevated,
                PollutionLevel::BelowBackground,
            ]
        );
        assert_eq!(result.point_clusters.len(), 2);
        assert_eq!(result.point_clusters[0].members, vec![0, 1, 2]);
        assert_eq!(result.point_counts(), [1, 1, 1, 3, 0]);
        assert_eq!(result.source_cluster_count(), 1);
    }

    #[test]
    fn test_confirmed_by_concentration() {
        let pts = vec![
            SamplePoint::new(0.0, 0.0, 95.0),
            SamplePoint::new(1.0, 0.0, 120.0),
            SamplePoint::new(0.0, 1.0, 100.0),
        ];
        let result = classify(&pts, None, 10.0, &thresholds()).unwrap();
        assert!(result.points.iter().all(|&l| l == PollutionLevel::ConfirmedSource));
        assert_eq!(result.point_clusters[0].max_value, 120.0);
    }

    #[test]
    fn test_high_isolated_point_not_confirmed() {
        let pts = vec![
            SamplePoint::new(0.0, 0.0, 500.0),
            SamplePoint::new(40.0, 0.0, 1.0),
            SamplePoint::new(0.0, 40.0, 1.0),
        ];
        let result = classify(&pts, None, 10.0, &thresholds()).unwrap();
        assert_eq!(result.points[0], PollutionLevel::ExceedsThreshold);
    }

    #[test]
    fn test_row_cluster_at_start_of_extent() {
        // hot cluster at the low end of a row, the rest spread 10 apart
        let mut pts = vec![
            SamplePoint::new(0.0, 0.0, 35.0),
            SamplePoint::new(1.0, 0.0, 40.0),
            SamplePoint::new(2.0, 0.0, 32.0),
        ];
        pts.extend((1..=8).map(|i| SamplePoint::new(2.0 + 10.0 * i as f64, 0.0, 36.0)));
        let thresholds = Thresholds {
            adjacency_distance: Some(1.5),
            ..thresholds()
        };
        let result = classify(&pts, None, 10.0, &thresholds).unwrap();
        assert_eq!(&result.points[..3], &[PollutionLevel::SuspectedSource; 3]);
        assert!(result.points[3..].iter().all(|&l| l == PollutionLevel::ExceedsThreshold));
        assert_eq!(result.source_cluster_count(), 1);
    }

    #[test]
    fn test_rejects_negative_background() {
        let pts = vec![SamplePoint::new(0.0, 0.0, 1.0)];
        assert!(matches!(
            classify(&pts, None, -1.0, &thresholds()),
            Err(Error::InvalidConfig { name: "background", .. })
        ));
    }

    #[test]
    fn test_cells_follow_surface() {
        let boundary =
            SiteBoundary::from_exterior(vec![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)]).unwrap();
        let pts = vec![
            SamplePoint::new(2.0, 2.0, 100.0),
            SamplePoint::new(18.0, 2.0, 1.0),
            SamplePoint::new(2.0, 18.0, 1.0),
            SamplePoint::new(18.0, 18.0, 1.0),
        ];
        let params = InterpolationParams {
            grid: GridSpec::Cells { rows: 20, cols: 20 },
            execution: ExecutionMode::Sequential,
            ..Default::default()
        };
        let surface = interpolate(&pts, &boundary, &params).unwrap();
        let result = classify(&pts, Some(&surface), 10.0, &thresholds()).unwrap();
        let cells = result.cells.as_ref().unwrap();

        // cell containing the hot sample sits in a source cluster
        let (r, c) = cells.cell_at(2.0, 2.0).unwrap();
        assert!(cells.get(r, c).unwrap().unwrap().is_source());
        // far corner stays near the clean values
        let (r, c) = cells.cell_at(18.5, 18.5).unwrap();
        assert!(cells.get(r, c).unwrap().unwrap() < PollutionLevel::ExceedsThreshold);
        let total: usize = result.cell_counts().iter().sum();
        assert_eq!(total, surface.inside_count());
    }
}
