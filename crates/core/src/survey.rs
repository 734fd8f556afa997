//! Survey points and background reference values

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::vector::AttributeValue;

/// One georeferenced monitoring point with its measured attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct SurveyPoint {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl SurveyPoint {
    pub fn new(id: impl Into<String>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            attributes: BTreeMap::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with(mut self, field: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.attributes.insert(field.into(), value.into());
        self
    }

    pub fn attribute(&self, field: &str) -> Option<&AttributeValue> {
        self.attributes.get(field)
    }
}

/// The point set of one run, in load order.
#[derive(Debug, Clone, Default)]
pub struct SurveyDataset {
    pub points: Vec<SurveyPoint>,
    pub crs: Option<CRS>,
}

impl SurveyDataset {
    pub fn new(points: Vec<SurveyPoint>) -> Self {
        Self { points, crs: None }
    }

    pub fn with_crs(mut self, crs: Option<CRS>) -> Self {
        self.crs = crs;
        self
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Every attribute name seen on any point, sorted
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .points
            .iter()
            .flat_map(|p| p.attributes.keys().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}

/// Reference (unpolluted) value per field or indicator.
///
/// Values must be finite and non-negative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct BackgroundValues {
    values: BTreeMap<String, f64>,
}

impl BackgroundValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the background for `field`.
    pub fn insert(&mut self, field: impl Into<String>, value: f64) -> Result<()> {
        let field = field.into();
        if !value.is_finite() || value < 0.0 {
            return Err(Error::config(
                "background",
                format!("{}={}", field, value),
                "background values must be finite and non-negative",
            ));
        }
        self.values.insert(field, value);
        Ok(())
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.values.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl TryFrom<BTreeMap<String, f64>> for BackgroundValues {
    type Error = Error;

    fn try_from(map: BTreeMap<String, f64>) -> Result<Self> {
        let mut values = BackgroundValues::new();
        for (field, value) in map {
            values.insert(field, value)?;
        }
        Ok(values)
    }
}

impl From<BackgroundValues> for BTreeMap<String, f64> {
    fn from(values: BackgroundValues) -> Self {
        values.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names() {
        let ds = SurveyDataset::new(vec![
            SurveyPoint::new("a", 0.0, 0.0).with("VOCs", 1.0).with("CO2", 2.0),
            SurveyPoint::new("b", 1.0, 0.0).with("CH4", 3.0).with("CO2", 4.0),
        ]);
        assert_eq!(ds.field_names(), vec!["CH4", "CO2", "VOCs"]);
    }

    #[test]
    fn test_background_rejects_negative() {
        let mut bg = BackgroundValues::new();
        assert!(bg.insert("VOCs", 10.0).is_ok());
        assert!(bg.insert("CO2", -1.0).is_err());
        assert!(bg.insert("CH4", f64::NAN).is_err());
        assert_eq!(bg.get("VOCs"), Some(10.0));
        assert_eq!(bg.get("CO2"), None);
    }

    #[test]
    fn test_background_deserialize_validates() {
        let ok: BackgroundValues = serde_json::from_str(r#"{"PC1": 1.5, "VOCs": 10}"#).unwrap();
        assert_eq!(ok.len(), 2);
        let bad = serde_json::from_str::<BackgroundValues>(r#"{"VOCs": -3}"#);
        assert!(bad.is_err());
    }
}
