//! Coordinate reference system tags
//!
//! The engine never reprojects. Points and boundary must already share one
//! projected CRS (distances and the adjacency radius are in its units); the
//! tag only lets a run detect inputs that were prepared inconsistently.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Coordinate reference system identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CRS {
    epsg: Option<u32>,
    wkt: Option<String>,
}

impl CRS {
    /// CRS from an EPSG code
    pub fn from_epsg(code: u32) -> Self {
        Self { epsg: Some(code), wkt: None }
    }

    /// CRS from a WKT definition
    pub fn from_wkt(wkt: impl Into<String>) -> Self {
        Self { epsg: None, wkt: Some(wkt.into()) }
    }

    /// Parse the identifiers found in vector file headers:
    /// `EPSG:4547`, `urn:ogc:def:crs:EPSG::4547`, or a bare code.
    ///
    /// Anything else is kept verbatim as WKT.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        let code = trimmed
            .rsplit(':')
            .next()
            .filter(|_| trimmed.to_ascii_uppercase().contains("EPSG") || !trimmed.contains(':'))
            .and_then(|c| c.parse::<u32>().ok());
        match code {
            Some(code) => Self::from_epsg(code),
            None => Self::from_wkt(trimmed),
        }
    }

    /// EPSG code if known
    pub fn epsg(&self) -> Option<u32> {
        self.epsg
    }

    /// WKT definition if known
    pub fn wkt(&self) -> Option<&str> {
        self.wkt.as_deref()
    }

    /// Whether two tags denote the same CRS
    pub fn is_equivalent(&self, other: &CRS) -> bool {
        if let (Some(a), Some(b)) = (self.epsg, other.epsg) {
            return a == b;
        }
        if let (Some(a), Some(b)) = (&self.wkt, &other.wkt) {
            return a == b;
        }
        false
    }

    /// Short identifier for logs and error messages
    pub fn identifier(&self) -> String {
        if let Some(code) = self.epsg {
            return format!("EPSG:{}", code);
        }
        if let Some(wkt) = &self.wkt {
            return format!("WKT:{}", wkt.chars().take(50).collect::<String>());
        }
        "Unknown".to_string()
    }
}

impl fmt::Display for CRS {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.identifier())
    }
}

/// Fail with [`Error::CrsMismatch`] when both inputs are tagged and the tags differ.
///
/// An untagged side is assumed to match.
pub fn ensure_compatible(a: Option<&CRS>, b: Option<&CRS>) -> Result<()> {
    match (a, b) {
        (Some(a), Some(b)) if !a.is_equivalent(b) => {
            Err(Error::CrsMismatch(a.identifier(), b.identifier()))
        }
        _ => Ok(()),
    }
}
