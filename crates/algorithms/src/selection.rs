//! Field selection and validation
//!
//! Projects the survey points onto the user-chosen attribute columns and
//! checks that the result can support a principal component analysis:
//! every requested field exists on every point, every present value is
//! numeric, and at least [`MIN_POINTS`] complete rows remain after rows
//! with missing values are dropped.

use ndarray::{Array2, ArrayView1};
use serde::Serialize;
use std::collections::HashSet;

use siteassay_core::{Error, Numeric, Result, SurveyDataset};

/// Minimum number of fields for a meaningful PCA
pub const MIN_FIELDS: usize = 2;
/// Minimum number of complete points for a meaningful PCA
pub const MIN_POINTS: usize = 3;

/// Complete numeric rows for the selected fields, in load order.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDataset {
    fields: Vec<String>,
    ids: Vec<String>,
    coords: Vec<(f64, f64)>,
    /// n_points x n_fields
    values: Array2<f64>,
    /// Index of each kept row in the source dataset
    source_rows: Vec<usize>,
    /// Ids of points dropped for missing values
    dropped: Vec<String>,
}

impl ValidatedDataset {
    /// Assemble from already-clean columns.
    ///
    /// Enforces the same minimums as [`select`].
    pub fn from_parts(
        fields: Vec<String>,
        ids: Vec<String>,
        coords: Vec<(f64, f64)>,
        values: Array2<f64>,
    ) -> Result<Self> {
        check_field_names(&fields)?;
        let (n, k) = values.dim();
        if k != fields.len() || ids.len() != n || coords.len() != n {
            return Err(Error::InvalidInput(format!(
                "inconsistent dataset: {} ids, {} coords, {}x{} values for {} fields",
                ids.len(),
                coords.len(),
                n,
                k,
                fields.len()
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(Error::InvalidInput("dataset contains non-finite values".into()));
        }
        if n < MIN_POINTS {
            return Err(Error::InsufficientData { what: "points", required: MIN_POINTS, found: n });
        }
        Ok(Self {
            fields,
            ids,
            coords,
            values,
            source_rows: (0..n).collect(),
            dropped: Vec::new(),
        })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn coords(&self) -> &[(f64, f64)] {
        &self.coords
    }

    /// n_points x n_fields matrix of values
    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    /// Column of one field, if selected
    pub fn column(&self, field: &str) -> Option<ArrayView1<'_, f64>> {
        let j = self.fields.iter().position(|f| f == field)?;
        Some(self.values.column(j))
    }

    pub fn source_rows(&self) -> &[usize] {
        &self.source_rows
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }

    pub fn n_points(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_fields(&self) -> usize {
        self.values.ncols()
    }
}

fn check_field_names(fields: &[String]) -> Result<()> {
    if fields.len() < MIN_FIELDS {
        return Err(Error::InsufficientData {
            what: "fields",
            required: MIN_FIELDS,
            found: fields.len(),
        });
    }
    let mut seen = HashSet::new();
    for f in fields {
        if !seen.insert(f.as_str()) {
            return Err(Error::config("fields", f, "field selected more than once"));
        }
    }
    Ok(())
}

/// Validate and project `dataset` onto `fields`.
///
/// # Errors
/// - [`Error::InsufficientData`] with fewer than 2 fields, or fewer than 3
///   complete points after dropping rows with missing values
/// - [`Error::MissingField`] if a field is absent from any point
/// - [`Error::NonNumericField`] if a present value cannot be read as a number
/// - [`Error::InvalidInput`] if a point has non-finite coordinates
pub fn select(dataset: &SurveyDataset, fields: &[String]) -> Result<ValidatedDataset> {
    check_field_names(fields)?;

    let mut ids = Vec::new();
    let mut coords = Vec::new();
    let mut data = Vec::new();
    let mut source_rows = Vec::new();
    let mut dropped = Vec::new();
    let mut row = Vec::with_capacity(fields.len());

    for (index, point) in dataset.points.iter().enumerate() {
        if !(point.x.is_finite() && point.y.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "point '{}' has non-finite coordinates",
                point.id
            )));
        }

        row.clear();
        let mut complete = true;
        for field in fields {
            let value = point.attribute(field).ok_or_else(|| Error::MissingField {
                field: field.clone(),
                point_id: point.id.clone(),
            })?;
            match value.to_numeric() {
                Numeric::Value(v) => row.push(v),
                Numeric::Missing => complete = false,
                Numeric::NotNumeric => {
                    return Err(Error::NonNumericField {
                        field: field.clone(),
                        point_id: point.id.clone(),
                        value: value.display(),
                    })
                }
            }
        }

        if complete {
            ids.push(point.id.clone());
            coords.push((point.x, point.y));
            data.extend_from_slice(&row);
            source_rows.push(index);
        } else {
            dropped.push(point.id.clone());
        }
    }

    let n = ids.len();
    if !dropped.is_empty() {
        tracing::debug!(dropped = dropped.len(), kept = n, "dropped rows with missing values");
    }
    if n < MIN_POINTS {
        return Err(Error::InsufficientData { what: "points", required: MIN_POINTS, found: n });
    }

    let values = Array2::from_shape_vec((n, fields.len()), data)
        .map_err(|e| Error::InvalidInput(e.to_string()))?;

    Ok(ValidatedDataset {
        fields: fields.to_vec(),
        ids,
        coords,
        values,
        source_rows,
        dropped,
    })
}

/// Completeness of one attribute across a dataset
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldSummary {
    pub name: String,
    /// Points carrying the attribute at all
    pub present: usize,
    /// Points with a numeric value
    pub numeric: usize,
    /// Points with an empty or null value
    pub missing: usize,
    /// Points with a value that is not a number
    pub non_numeric: usize,
}

impl FieldSummary {
    /// Present on every point and never non-numeric
    pub fn is_selectable(&self, n_points: usize) -> bool {
        self.present == n_points && self.non_numeric == 0 && self.numeric > 0
    }
}

/// Summarize every attribute of `dataset`, sorted by name.
pub fn field_summaries(dataset: &SurveyDataset) -> Vec<FieldSummary> {
    dataset
        .field_names()
        .into_iter()
        .map(|name| {
            let mut summary = FieldSummary {
                name,
                present: 0,
                numeric: 0,
                missing: 0,
                non_numeric: 0,
            };
            for point in &dataset.points {
                if let Some(value) = point.attribute(&summary.name) {
                    summary.present += 1;
                    match value.to_numeric() {
                        Numeric::Value(_) => summary.numeric += 1,
                        Numeric::Missing => summary.missing += 1,
                        Numeric::NotNumeric => summary.non_numeric += 1,
                    }
                }
            }
            summary
        })
        .collect()
}

/// Names of the fields [`select`] would accept on their own.
pub fn numeric_fields(dataset: &SurveyDataset) -> Vec<String> {
    field_summaries(dataset)
        .into_iter()
        .filter(|s| s.is_selectable(dataset.len()))
        .map(|s| s.name)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteassay_core::{AttributeValue, SurveyPoint};

    fn fields(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn dataset() -> SurveyDataset {
        SurveyDataset::new(vec![
            SurveyPoint::new("P1", 0.0, 0.0).with("VOCs", 1.0).with("CO2", "400"),
            SurveyPoint::new("P2", 1.0, 0.0).with("VOCs", 2.0).with("CO2", 410.0),
            SurveyPoint::new("P3", 0.0, 1.0).with("VOCs", AttributeValue::Null).with("CO2", 420.0),
            SurveyPoint::new("P4", 1.0, 1.0).with("VOCs", 4.0).with("CO2", 430.0),
            SurveyPoint::new("P5", 2.0, 1.0).with("VOCs", 5.0).with("CO2", ""),
        ])
    }

    #[test]
    fn test_select_drops_incomplete_rows() {
        let v = select(&dataset(), &fields(&["VOCs", "CO2"])).unwrap();
        assert_eq!(v.ids(), &["P1", "P2", "P4"]);
        assert_eq!(v.source_rows(), &[0, 1, 3]);
        assert_eq!(v.dropped(), &["P3", "P5"]);
        assert_eq!(v.values()[[0, 1]], 400.0);
        assert_eq!(v.column("VOCs").unwrap().to_vec(), vec![1.0, 2.0, 4.0]);
    }

    #[test]
    fn test_missing_field() {
        let err = select(&dataset(), &fields(&["VOCs", "CH4"])).unwrap_err();
        assert!(matches!(err, Error::MissingField { ref field, ref point_id } if field == "CH4" && point_id == "P1"));
    }

    #[test]
    fn test_non_numeric_field() {
        let mut ds = dataset();
        ds.points[1] = ds.points[1].clone().with("CO2", "n.d.");
        let err = select(&ds, &fields(&["VOCs", "CO2"])).unwrap_err();
        assert!(matches!(err, Error::NonNumericField { ref point_id, .. } if point_id == "P2"));
    }

    #[test]
    fn test_insufficient_points_after_drop() {
        let mut ds = dataset();
        ds.points.truncate(3);
        let err = select(&ds, &fields(&["VOCs", "CO2"])).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { what: "points", found: 2, .. }));
    }

    #[test]
    fn test_field_count_and_duplicates() {
        assert!(matches!(
            select(&dataset(), &fields(&["VOCs"])),
            Err(Error::InsufficientData { what: "fields", .. })
        ));
        assert!(matches!(
            select(&dataset(), &fields(&["VOCs", "VOCs"])),
            Err(Error::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_field_summaries() {
        let mut ds = dataset();
        ds.points[0] = ds.points[0].clone().with("Note", "n.d.");
        let summaries = field_summaries(&ds);
        let names: Vec<&str> = summaries.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["CO2", "Note", "VOCs"]);
        assert_eq!(summaries[0].missing, 1);
        assert_eq!(summaries[1].present, 1);
        assert_eq!(summaries[1].non_numeric, 1);
        assert_eq!(numeric_fields(&ds), vec!["CO2", "VOCs"]);
    }

    #[test]
    fn test_from_parts_minimums() {
        let values = Array2::from_shape_vec((2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        let err = ValidatedDataset::from_parts(
            fields(&["a", "b"]),
            fields(&["p1", "p2"]),
            vec![(0.0, 0.0), (1.0, 1.0)],
            values,
        )
        .unwrap_err();
        assert!(matches!(err, Error::InsufficientData { what: "points", found: 2, .. }));
    }
}
