//! Empirical threshold scoring of soil-gas indicators
//!
//! Each field maps a reading to an integer score through a step table.
//! Scores of the screening fields are summed; points whose screening score
//! reaches the gate threshold also add the gate field's score (radon in the
//! soil-gas preset, which is only measured at such points). The total then
//! decides between source, suspected source and screened.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use siteassay_core::{Error, Numeric, Result, SurveyDataset};

/// Start of one score interval
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub value: f64,
    /// When true, a reading equal to `value` belongs to the interval above
    pub closed_left: bool,
}

/// Step function from a reading to a score.
///
/// `scores[i]` applies below `breakpoints[i]`; the last score applies above
/// every breakpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreTable {
    pub breakpoints: Vec<Breakpoint>,
    pub scores: Vec<u32>,
}

impl ScoreTable {
    /// Table from `(value, closed_left)` breakpoints.
    pub fn new(breakpoints: &[(f64, bool)], scores: &[u32]) -> Result<Self> {
        let table = Self {
            breakpoints: breakpoints
                .iter()
                .map(|&(value, closed_left)| Breakpoint { value, closed_left })
                .collect(),
            scores: scores.to_vec(),
        };
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        if self.scores.len() != self.breakpoints.len() + 1 {
            return Err(Error::config(
                "score_table",
                format!("{} breakpoints, {} scores", self.breakpoints.len(), self.scores.len()),
                "needs exactly one more score than breakpoints",
            ));
        }
        if self.breakpoints.iter().any(|b| !b.value.is_finite()) {
            return Err(Error::config("score_table", "breakpoints", "must be finite"));
        }
        if self.breakpoints.windows(2).any(|w| w[0].value >= w[1].value) {
            return Err(Error::config("score_table", "breakpoints", "must be strictly ascending"));
        }
        Ok(())
    }

    /// Score of one reading
    pub fn score(&self, value: f64) -> u32 {
        let index = self
            .breakpoints
            .iter()
            .position(|b| value < b.value || (value == b.value && !b.closed_left))
            .unwrap_or(self.breakpoints.len());
        self.scores[index]
    }
}

/// Category of a scored point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScoreClass {
    Source,
    SuspectedSource,
    /// Total below the suspected threshold, or no supporting indicator
    Screened,
}

impl ScoreClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreClass::Source => "source",
            ScoreClass::SuspectedSource => "suspected-source",
            ScoreClass::Screened => "screened",
        }
    }

    /// True for the two source classes
    pub fn is_source(&self) -> bool {
        matches!(self, ScoreClass::Source | ScoreClass::SuspectedSource)
    }
}

/// Scores of one point
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PointScore {
    pub id: String,
    /// `None` where the reading is missing
    pub field_scores: BTreeMap<String, Option<u32>>,
    /// Sum over the non-gate fields
    pub screening_score: u32,
    /// Screening score plus the gate score when the gate applies
    pub total_score: u32,
    pub class: ScoreClass,
}

/// Complete scoring rule set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringScheme {
    pub tables: BTreeMap<String, ScoreTable>,
    /// Field added to the total only past the gate threshold
    pub gate_field: String,
    pub gate_threshold: u32,
    /// Minimum total for a source (the gate score must also be positive)
    pub source_threshold: u32,
    /// Minimum total for a suspected source
    pub suspected_threshold: u32,
    /// Field whose score must be positive for a suspected source
    pub suspected_field: String,
}

impl ScoringScheme {
    /// Soil-gas preset: radon gate, VOCs/CO2/O2/CH4/H2/H2S screening.
    ///
    /// CO2, O2 and CH4 are volume fractions; radon is in Bq/m³; VOCs, H2
    /// and H2S are in ppm.
    pub fn soil_gas() -> Self {
        let table = |bps: &[(f64, bool)], scores: &[u32]| ScoreTable {
            breakpoints: bps
                .iter()
                .map(|&(value, closed_left)| Breakpoint { value, closed_left })
                .collect(),
            scores: scores.to_vec(),
        };
        let mut tables = BTreeMap::new();
        tables.insert(
            "Radon".to_string(),
            table(&[(15.0, true), (150.0, true), (1500.0, true)], &[11, 3, 1, 0]),
        );
        tables.insert(
            "VOCs".to_string(),
            table(&[(0.1, false), (1.0, false), (10.0, false), (100.0, false)], &[0, 1, 2, 6, 22]),
        );
        tables.insert(
            "CO2".to_string(),
            table(&[(0.01, false), (0.05, false), (0.1, false)], &[0, 2, 6, 22]),
        );
        tables.insert(
            "O2".to_string(),
            table(&[(0.01, true), (0.1, true), (0.19, true)], &[11, 3, 1, 0]),
        );
        tables.insert(
            "CH4".to_string(),
            table(
                &[(0.0001, false), (0.0025, false), (0.01, false), (0.05, false)],
                &[0, 1, 2, 6, 22],
            ),
        );
        tables.insert(
            "H2".to_string(),
            table(&[(100.0, false), (500.0, false), (1000.0, false)], &[0, 1, 3, 11]),
        );
        tables.insert(
            "H2S".to_string(),
            table(&[(1.0, false), (5.0, false), (10.0, false)], &[0, 1, 3, 11]),
        );

        Self {
            tables,
            gate_field: "Radon".into(),
            gate_threshold: 6,
            source_threshold: 17,
            suspected_threshold: 6,
            suspected_field: "VOCs".into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for table in self.tables.values() {
            table.validate()?;
        }
        if !self.tables.contains_key(&self.gate_field) {
            return Err(Error::config("gate_field", &self.gate_field, "has no score table"));
        }
        if !self.tables.contains_key(&self.suspected_field) {
            return Err(Error::config("suspected_field", &self.suspected_field, "has no score table"));
        }
        if self.suspected_threshold > self.source_threshold {
            return Err(Error::config(
                "suspected_threshold",
                self.suspected_threshold,
                "must not exceed source_threshold",
            ));
        }
        Ok(())
    }

    /// Score one point given a reading lookup.
    pub fn score_point(&self, id: &str, reading: impl Fn(&str) -> Option<f64>) -> PointScore {
        let field_scores: BTreeMap<String, Option<u32>> = self
            .tables
            .iter()
            .map(|(field, table)| (field.clone(), reading(field).map(|v| table.score(v))))
            .collect();

        let screening_score: u32 = field_scores
            .iter()
            .filter(|(field, _)| **field != self.gate_field)
            .filter_map(|(_, s)| *s)
            .sum();
        let gate_score = field_scores.get(&self.gate_field).copied().flatten();

        let total_score = match gate_score {
            Some(g) if screening_score >= self.gate_threshold => screening_score + g,
            _ => screening_score,
        };

        let suspected_score = field_scores.get(&self.suspected_field).copied().flatten().unwrap_or(0);
        let class = if total_score >= self.source_threshold && gate_score.unwrap_or(0) >= 1 {
            ScoreClass::Source
        } else if total_score >= self.suspected_threshold && suspected_score >= 1 {
            ScoreClass::SuspectedSource
        } else {
            ScoreClass::Screened
        };

        PointScore {
            id: id.to_string(),
            field_scores,
            screening_score,
            total_score,
            class,
        }
    }

    /// Score every point of a dataset.
    ///
    /// Fields absent from a point count as missing readings.
    ///
    /// # Errors
    /// [`Error::NonNumericField`] when a present reading is not numeric
    pub fn score_dataset(&self, dataset: &SurveyDataset) -> Result<Vec<PointScore>> {
        self.validate()?;
        dataset
            .points
            .iter()
            .map(|point| {
                let mut readings = BTreeMap::new();
                for field in self.tables.keys() {
                    let value = match point.attribute(field).map(|v| (v, v.to_numeric())) {
                        None | Some((_, Numeric::Missing)) => None,
                        Some((_, Numeric::Value(x))) => Some(x),
                        Some((raw, Numeric::NotNumeric)) => {
                            return Err(Error::NonNumericField {
                                field: field.clone(),
                                point_id: point.id.clone(),
                                value: raw.display(),
                            })
                        }
                    };
                    readings.insert(field.as_str(), value);
                }
                Ok(self.score_point(&point.id, |f| readings.get(f).copied().flatten()))
            })
            .collect()
    }
}

impl Default for ScoringScheme {
    fn default() -> Self {
        Self::soil_gas()
    }
}
