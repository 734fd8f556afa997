//! Attribute values and feature collections
//!
//! Providers hand point attributes to the engine as [`AttributeValue`]s;
//! the vector sink receives results as a [`FeatureCollection`].

use geo_types::Geometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Attribute value as read from a vector source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Outcome of coercing an attribute to a number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Value(f64),
    /// Null, empty text, or a non-finite number
    Missing,
    /// Present but not interpretable as a number
    NotNumeric,
}

impl AttributeValue {
    /// Coerce to a finite number.
    ///
    /// Text is parsed after trimming; booleans are not numbers.
    pub fn to_numeric(&self) -> Numeric {
        let finite = |v: f64| if v.is_finite() { Numeric::Value(v) } else { Numeric::Missing };
        match self {
            AttributeValue::Null => Numeric::Missing,
            AttributeValue::Bool(_) => Numeric::NotNumeric,
            AttributeValue::Int(i) => Numeric::Value(*i as f64),
            AttributeValue::Float(f) => finite(*f),
            AttributeValue::Text(s) => {
                let s = s.trim();
                if s.is_empty() {
                    return Numeric::Missing;
                }
                match s.parse::<f64>() {
                    Ok(v) => finite(v),
                    Err(_) => Numeric::NotNumeric,
                }
            }
        }
    }

    /// Human-readable form for error messages
    pub fn display(&self) -> String {
        match self {
            AttributeValue::Null => "null".into(),
            AttributeValue::Bool(b) => b.to_string(),
            AttributeValue::Int(i) => i.to_string(),
            AttributeValue::Float(f) => f.to_string(),
            AttributeValue::Text(s) => format!("{:?}", s),
        }
    }
}

impl From<f64> for AttributeValue {
    fn from(v: f64) -> Self {
        AttributeValue::Float(v)
    }
}

impl From<i64> for AttributeValue {
    fn from(v: i64) -> Self {
        AttributeValue::Int(v)
    }
}

impl From<&str> for AttributeValue {
    fn from(v: &str) -> Self {
        AttributeValue::Text(v.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(v: String) -> Self {
        AttributeValue::Text(v)
    }
}

impl<T: Into<AttributeValue>> From<Option<T>> for AttributeValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(AttributeValue::Null)
    }
}

/// A geographic feature with geometry and attributes
#[derive(Debug, Clone)]
pub struct Feature {
    pub geometry: Geometry<f64>,
    /// Attributes in column order
    pub properties: BTreeMap<String, AttributeValue>,
    pub id: Option<String>,
}

impl Feature {
    pub fn new(geometry: impl Into<Geometry<f64>>) -> Self {
        Self {
            geometry: geometry.into(),
            properties: BTreeMap::new(),
            id: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.properties.insert(key.into(), value.into());
    }

    pub fn get_property(&self, key: &str) -> Option<&AttributeValue> {
        self.properties.get(key)
    }
}

/// Ordered collection of features
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self { features: Vec::new() }
    }

    pub fn push(&mut self, feature: Feature) {
        self.features.push(feature);
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl IntoIterator for FeatureCollection {
    type Item = Feature;
    type IntoIter = std::vec::IntoIter<Feature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::Point;

    #[test]
    fn test_numeric_coercion() {
        assert_eq!(AttributeValue::Int(3).to_numeric(), Numeric::Value(3.0));
        assert_eq!(AttributeValue::from(" 12.5 ").to_numeric(), Numeric::Value(12.5));
        assert_eq!(AttributeValue::from("").to_numeric(), Numeric::Missing);
        assert_eq!(AttributeValue::Null.to_numeric(), Numeric::Missing);
        assert_eq!(AttributeValue::Float(f64::NAN).to_numeric(), Numeric::Missing);
        assert_eq!(AttributeValue::from("n.d.").to_numeric(), Numeric::NotNumeric);
        assert_eq!(AttributeValue::Bool(true).to_numeric(), Numeric::NotNumeric);
    }

    #[test]
    fn test_feature_properties() {
        let mut f = Feature::new(Point::new(1.0, 2.0)).with_id("P1");
        f.set_property("level", "elevated");
        f.set_property("value", 3.5);
        assert_eq!(f.id.as_deref(), Some("P1"));
        assert_eq!(f.get_property("value"), Some(&AttributeValue::Float(3.5)));
        assert!(f.get_property("missing").is_none());
    }
}
