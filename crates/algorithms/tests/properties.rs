//! Behavioural properties of the individual engine stages.

use approx::assert_relative_eq;
use ndarray::Array2;

use siteassay_algorithms::classification::{classify, PollutionLevel, Thresholds};
use siteassay_algorithms::execution::ExecutionMode;
use siteassay_algorithms::interpolation::{interpolate, InterpolationMethod, InterpolationParams, SamplePoint};
use siteassay_algorithms::pca::{pca, pca_from_matrix, PcaParams};
use siteassay_algorithms::selection::select;
use siteassay_core::{Error, GridSpec, SiteBoundary, SurveyDataset, SurveyPoint};

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Four loosely related fields over 12 points
fn four_field_matrix() -> Array2<f64> {
    let mut data = Vec::new();
    for i in 0..12 {
        let t = i as f64;
        data.push(t + ((i * 3) % 5) as f64);
        data.push(2.0 * t - ((i * 7) % 4) as f64);
        data.push(((i * 5) % 7) as f64);
        data.push(10.0 - t * 0.5 + ((i * 11) % 3) as f64);
    }
    Array2::from_shape_vec((12, 4), data).unwrap()
}

fn square(size: f64) -> SiteBoundary {
    SiteBoundary::from_exterior(vec![(0.0, 0.0), (size, 0.0), (size, size), (0.0, size)]).unwrap()
}

#[test]
fn variance_ratios_sum_to_one_and_descend() {
    let result = pca_from_matrix(&four_field_matrix(), &names(&["a", "b", "c", "d"]), &PcaParams::default()).unwrap();
    let ratios = result.variance_ratios();
    assert_eq!(ratios.len(), 4);
    assert_relative_eq!(ratios.iter().sum::<f64>(), 1.0, epsilon = 1e-10);
    for pair in ratios.windows(2) {
        assert!(pair[0] >= pair[1]);
    }
    assert!(ratios.iter().all(|r| (0.0..=1.0).contains(r)));
}

#[test]
fn rotated_pair_first_component_explains_nearly_all() {
    // points along a rotated line with a small perpendicular wobble
    let angle: f64 = 0.6;
    let mut data = Vec::new();
    for i in 0..30 {
        let along = i as f64 - 15.0;
        let across = 0.02 * (((i * 13) % 7) as f64 - 3.0);
        data.push(along * angle.cos() - across * angle.sin());
        data.push(along * angle.sin() + across * angle.cos());
    }
    let m = Array2::from_shape_vec((30, 2), data).unwrap();
    let result = pca_from_matrix(&m, &names(&["x", "y"]), &PcaParams::default()).unwrap();
    assert!(result.components[0].variance_ratio >= 0.99);
}

#[test]
fn pca_is_deterministic() {
    let m = four_field_matrix();
    let fields = names(&["a", "b", "c", "d"]);
    let first = pca_from_matrix(&m, &fields, &PcaParams::default()).unwrap();
    let second = pca_from_matrix(&m, &fields, &PcaParams::default()).unwrap();
    assert_eq!(first, second);
    for c in &first.components {
        let pivot = c
            .eigenvector
            .iter()
            .copied()
            .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
        assert!(pivot > 0.0, "largest entry must be positive");
    }
}

#[test]
fn pca_with_two_points_is_insufficient() {
    let ds = SurveyDataset::new(vec![
        SurveyPoint::new("a", 0.0, 0.0).with("VOCs", 1.0).with("CO2", 2.0),
        SurveyPoint::new("b", 1.0, 1.0).with("VOCs", 3.0).with("CO2", 5.0),
    ]);
    let err = select(&ds, &names(&["VOCs", "CO2"])).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { what: "points", .. }));

    let m = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 5.0]).unwrap();
    let err = pca_from_matrix(&m, &names(&["VOCs", "CO2"]), &PcaParams::default()).unwrap_err();
    assert!(matches!(err, Error::InsufficientData { .. }));
}

#[test]
fn pca_on_selected_dataset_keeps_point_order() {
    let ds = SurveyDataset::new(
        (0..6)
            .map(|i| {
                SurveyPoint::new(format!("P{}", i), i as f64, 0.0)
                    .with("VOCs", (i * i) as f64)
                    .with("CO2", 400.0 + ((i * 5) % 3) as f64)
            })
            .collect(),
    );
    let selected = select(&ds, &names(&["VOCs", "CO2"])).unwrap();
    let result = pca(&selected, &PcaParams::default()).unwrap();
    assert_eq!(result.components[0].scores.len(), 6);
    let projected = result.project(&[25.0, 400.0 + 1.0]).unwrap();
    assert_relative_eq!(projected[0], result.components[0].scores[5], epsilon = 1e-10);
}

#[test]
fn interpolation_is_exact_at_inputs() {
    let pts: Vec<SamplePoint> = (0..15)
        .map(|i| {
            let x = 3.0 + ((i * 37) % 90) as f64 + 0.25;
            let y = 5.0 + ((i * 53) % 85) as f64 + 0.5;
            SamplePoint::new(x, y, (i as f64).sin() * 10.0)
        })
        .collect();
    for method in [InterpolationMethod::Idw, InterpolationMethod::Linear, InterpolationMethod::OrdinaryKriging] {
        let params = InterpolationParams {
            method,
            grid: GridSpec::CellSize(4.0),
            execution: ExecutionMode::Sequential,
            ..Default::default()
        };
        let surface = interpolate(&pts, &square(100.0), &params).unwrap();
        for p in &pts {
            let v = surface.evaluate(p.x, p.y).unwrap();
            assert_relative_eq!(v, p.value, epsilon = 1e-12);
        }
        assert!(surface.inside_cells().all(|(_, _, v)| v.is_finite()), "{:?}", method);
    }
}

#[test]
fn no_values_outside_boundary() {
    // L-shaped site
    let boundary = SiteBoundary::from_exterior(vec![
        (0.0, 0.0),
        (60.0, 0.0),
        (60.0, 20.0),
        (20.0, 20.0),
        (20.0, 60.0),
        (0.0, 60.0),
    ])
    .unwrap();
    let pts = vec![
        SamplePoint::new(5.0, 5.0, 1.0),
        SamplePoint::new(50.0, 10.0, 8.0),
        SamplePoint::new(10.0, 50.0, 3.0),
        SamplePoint::new(15.0, 15.0, 5.0),
    ];
    let params = InterpolationParams {
        grid: GridSpec::Cells { rows: 30, cols: 30 },
        ..Default::default()
    };
    let surface = interpolate(&pts, &boundary, &params).unwrap();
    let grid = surface.grid();
    let mut outside = 0;
    for (r, c, v) in grid.iter() {
        let (x, y) = grid.cell_center(r, c);
        if !boundary.contains(x, y) {
            outside += 1;
            assert!(v.is_none(), "cell ({}, {}) outside the site has a value", r, c);
        }
    }
    assert!(outside > 0);
    assert_eq!(surface.inside_count() + outside, 900);
}

#[test]
fn interpolation_rejects_collinear_pair() {
    let pts = vec![SamplePoint::new(1.0, 1.0, 4.0), SamplePoint::new(5.0, 5.0, 6.0)];
    let err = interpolate(&pts, &square(10.0), &InterpolationParams::default()).unwrap_err();
    assert!(matches!(err, Error::DegenerateGeometry(_)));
}

#[test]
fn classification_is_monotonic_in_value() {
    let t = Thresholds::default();
    let mut values: Vec<f64> = (0..200).map(|i| ((i * 7919) % 613) as f64 / 10.0).collect();
    values.sort_by(f64::total_cmp);
    let levels: Vec<PollutionLevel> = values.iter().map(|&v| t.level(v, 10.0)).collect();
    for pair in levels.windows(2) {
        assert!(pair[0] <= pair[1]);
    }
}

#[test]
fn cluster_of_three_becomes_suspected_source() {
    let thresholds = Thresholds {
        elevated_ratio: 1.5,
        exceedance_ratio: 3.0,
        source_cluster_min_points: 3,
        adjacency_distance: Some(10.0),
        ..Default::default()
    };
    let pts = vec![
        SamplePoint::new(100.0, 100.0, 35.0),
        SamplePoint::new(106.0, 100.0, 40.0),
        SamplePoint::new(103.0, 105.0, 32.0),
        SamplePoint::new(400.0, 250.0, 35.0),
    ];
    let result = classify(&pts, None, 10.0, &thresholds).unwrap();
    assert_eq!(
        result.points,
        vec![
            PollutionLevel::SuspectedSource,
            PollutionLevel::SuspectedSource,
            PollutionLevel::SuspectedSource,
            PollutionLevel::ExceedsThreshold,
        ]
    );
}

#[test]
fn inconsistent_thresholds_fail_before_classifying() {
    let thresholds = Thresholds {
        elevated_ratio: 3.0,
        exceedance_ratio: 2.0,
        ..Default::default()
    };
    let pts = vec![SamplePoint::new(0.0, 0.0, 1.0)];
    let err = classify(&pts, None, 10.0, &thresholds).unwrap_err();
    assert!(matches!(err, Error::InvalidConfig { .. }));
}
