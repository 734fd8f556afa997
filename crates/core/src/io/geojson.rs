//! GeoJSON point/boundary provider and vector sink

use geo_types::{Coord, Geometry, LineString, MultiPolygon, Polygon};
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use super::{BoundarySource, PointSource, VectorSink};
use crate::boundary::SiteBoundary;
use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::survey::{SurveyDataset, SurveyPoint};
use crate::vector::{AttributeValue, FeatureCollection};

/// GeoJSON `FeatureCollection` held in memory.
///
/// Points are read from `Point` features; the boundary from the union of
/// `Polygon` and `MultiPolygon` features.
#[derive(Debug, Clone)]
pub struct GeoJsonSource {
    document: Value,
    id_field: Option<String>,
}

impl GeoJsonSource {
    pub fn parse(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text)?;
        if document.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(Error::InvalidInput("GeoJSON root is not a FeatureCollection".into()));
        }
        Ok(Self { document, id_field: None })
    }

    /// Take point identifiers from this property instead of the feature id
    pub fn with_id_field(mut self, field: impl Into<String>) -> Self {
        self.id_field = Some(field.into());
        self
    }

    fn crs(&self) -> Option<CRS> {
        self.document
            .pointer("/crs/properties/name")
            .and_then(Value::as_str)
            .map(CRS::parse)
    }

    fn features(&self) -> impl Iterator<Item = &Value> {
        self.document
            .get("features")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
    }
}

impl PointSource for GeoJsonSource {
    fn read_points(&self) -> Result<SurveyDataset> {
        let mut points = Vec::new();
        for (index, feature) in self.features().enumerate() {
            let geometry = feature.get("geometry").unwrap_or(&Value::Null);
            if geometry.get("type").and_then(Value::as_str) != Some("Point") {
                tracing::warn!(feature = index, "skipping feature without point geometry");
                continue;
            }
            let (x, y) = position(geometry.get("coordinates"))?;

            let mut attributes = std::collections::BTreeMap::new();
            if let Some(props) = feature.get("properties").and_then(Value::as_object) {
                for (key, value) in props {
                    attributes.insert(key.clone(), attribute(value));
                }
            }

            let id = self
                .id_field
                .as_ref()
                .and_then(|f| attributes.get(f))
                .and_then(id_text)
                .or_else(|| feature.get("id").map(attribute).as_ref().and_then(id_text))
                .unwrap_or_else(|| (index + 1).to_string());

            points.push(SurveyPoint { id, x, y, attributes });
        }
        tracing::debug!(points = points.len(), "read GeoJSON points");
        Ok(SurveyDataset::new(points).with_crs(self.crs()))
    }
}

impl BoundarySource for GeoJsonSource {
    fn read_boundary(&self) -> Result<SiteBoundary> {
        let mut polygons = Vec::new();
        for feature in self.features() {
            let geometry = feature.get("geometry").unwrap_or(&Value::Null);
            let coords = geometry.get("coordinates");
            match geometry.get("type").and_then(Value::as_str) {
                Some("Polygon") => polygons.push(polygon(coords)?),
                Some("MultiPolygon") => {
                    for part in array(coords, "MultiPolygon")? {
                        polygons.push(polygon(Some(part))?);
                    }
                }
                _ => {}
            }
        }
        SiteBoundary::new(MultiPolygon::new(polygons)).map(|b| b.with_crs(self.crs()))
    }
}

/// GeoJSON file on disk, read lazily by each provider call
#[derive(Debug, Clone)]
pub struct GeoJsonFile {
    path: PathBuf,
    id_field: Option<String>,
}

impl GeoJsonFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), id_field: None }
    }

    pub fn with_id_field(mut self, field: Option<String>) -> Self {
        self.id_field = field;
        self
    }

    fn load(&self) -> Result<GeoJsonSource> {
        let text = fs::read_to_string(&self.path)?;
        let source = GeoJsonSource::parse(&text)?;
        Ok(match &self.id_field {
            Some(f) => source.with_id_field(f.clone()),
            None => source,
        })
    }
}

impl PointSource for GeoJsonFile {
    fn read_points(&self) -> Result<SurveyDataset> {
        self.load()?.read_points()
    }
}

impl BoundarySource for GeoJsonFile {
    fn read_boundary(&self) -> Result<SiteBoundary> {
        self.load()?.read_boundary()
    }
}

/// Writes each layer as `<dir>/<name>.geojson`
#[derive(Debug, Clone)]
pub struct GeoJsonDirectorySink {
    dir: PathBuf,
    crs: Option<CRS>,
}

impl GeoJsonDirectorySink {
    pub fn new(dir: impl Into<PathBuf>, crs: Option<CRS>) -> Self {
        Self { dir: dir.into(), crs }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl VectorSink for GeoJsonDirectorySink {
    fn write_layer(&mut self, name: &str, layer: &FeatureCollection) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.geojson", name));
        let doc = feature_collection_to_geojson(layer, self.crs.as_ref());
        fs::write(&path, serde_json::to_string(&doc)?)?;
        tracing::debug!(path = %path.display(), features = layer.len(), "layer written");
        Ok(())
    }
}

/// Serialize a feature collection as a GeoJSON document
pub fn feature_collection_to_geojson(layer: &FeatureCollection, crs: Option<&CRS>) -> Value {
    let features: Vec<Value> = layer
        .iter()
        .map(|f| {
            let properties: Map<String, Value> = f
                .properties
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::to_value(v).unwrap_or(Value::Null)))
                .collect();
            let mut feature = json!({
                "type": "Feature",
                "geometry": geometry_to_json(&f.geometry),
                "properties": properties,
            });
            if let Some(id) = &f.id {
                feature["id"] = Value::String(id.clone());
            }
            feature
        })
        .collect();

    let mut doc = json!({ "type": "FeatureCollection", "features": features });
    if let Some(code) = crs.and_then(CRS::epsg) {
        doc["crs"] = json!({
            "type": "name",
            "properties": { "name": format!("urn:ogc:def:crs:EPSG::{}", code) },
        });
    }
    doc
}

fn geometry_to_json(geometry: &Geometry<f64>) -> Value {
    let ring = |ls: &LineString<f64>| -> Value {
        Value::Array(ls.coords().map(|c| json!([c.x, c.y])).collect())
    };
    let rings = |p: &Polygon<f64>| -> Value {
        let mut all = vec![ring(p.exterior())];
        all.extend(p.interiors().iter().map(ring));
        Value::Array(all)
    };
    match geometry {
        Geometry::Point(p) => json!({ "type": "Point", "coordinates": [p.x(), p.y()] }),
        Geometry::LineString(ls) => json!({ "type": "LineString", "coordinates": ring(ls) }),
        Geometry::Polygon(p) => json!({ "type": "Polygon", "coordinates": rings(p) }),
        Geometry::MultiPolygon(mp) => json!({
            "type": "MultiPolygon",
            "coordinates": mp.iter().map(rings).collect::<Vec<_>>(),
        }),
        _ => Value::Null,
    }
}

fn attribute(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null,
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => AttributeValue::Int(i),
            None => AttributeValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => AttributeValue::Text(s.clone()),
        other => AttributeValue::Text(other.to_string()),
    }
}

fn id_text(value: &AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Null => None,
        AttributeValue::Text(s) => Some(s.clone()),
        other => Some(other.display()),
    }
}

fn array<'a>(value: Option<&'a Value>, what: &str) -> Result<&'a Vec<Value>> {
    value
        .and_then(Value::as_array)
        .ok_or_else(|| Error::InvalidInput(format!("{} coordinates are not an array", what)))
}

fn position(value: Option<&Value>) -> Result<(f64, f64)> {
    let pos = array(value, "position")?;
    match (pos.first().and_then(Value::as_f64), pos.get(1).and_then(Value::as_f64)) {
        (Some(x), Some(y)) if x.is_finite() && y.is_finite() => Ok((x, y)),
        _ => Err(Error::InvalidInput(format!("invalid position {:?}", pos))),
    }
}

fn polygon(value: Option<&Value>) -> Result<Polygon<f64>> {
    let mut rings = Vec::new();
    for ring in array(value, "Polygon")? {
        let coords = array(Some(ring), "ring")?
            .iter()
            .map(|p| position(Some(p)).map(|(x, y)| Coord { x, y }))
            .collect::<Result<Vec<_>>>()?;
        rings.push(LineString::new(coords));
    }
    let mut rings = rings.into_iter();
    let exterior = rings
        .next()
        .ok_or_else(|| Error::InvalidInput("polygon without rings".into()))?;
    Ok(Polygon::new(exterior, rings.collect()))
}
