//! School Record Module
//!
//! Typed view over a nested provider record plus the display row the table
//! collaborator renders.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{SearchError, SearchResult};
use crate::fields::FieldMap;
use crate::flatten::{lookup, Lookup};
use crate::types::{Category, Subject};

/// 25th/75th percentile scores of admitted students for one SAT section
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct ScoreBand {
    pub p25: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct SatBands {
    pub math: Option<ScoreBand>,
    pub reading: Option<ScoreBand>,
    pub writing: Option<ScoreBand>,
}

impl SatBands {
    pub fn get(&self, subject: Subject) -> Option<ScoreBand> {
        match subject {
            Subject::Math => self.math,
            Subject::Reading => self.reading,
            Subject::Writing => self.writing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolRecord {
    pub id: Option<u64>,
    pub name: String,
    pub admission_rate: f64,
    pub sat: SatBands,
    pub city: Option<String>,
    pub state: Option<String>,
    pub url: Option<String>,
    pub median_earnings: Option<f64>,
    /// Nested provider record as received
    pub raw: Value,
}

fn number_at(record: &Value, path: &str) -> SearchResult<Option<f64>> {
    match lookup(record, path) {
        Lookup::Missing => Ok(None),
        Lookup::Found(value) => value
            .as_f64()
            .map(Some)
            .ok_or_else(|| SearchError::invalid(format!("{} is not a number: {}", path, value))),
    }
}

fn text_at(record: &Value, path: &str) -> Option<String> {
    match lookup(record, path) {
        Lookup::Found(Value::String(text)) if !text.trim().is_empty() => Some(text.trim().to_string()),
        _ => None,
    }
}

impl SchoolRecord {
    /// Extract the typed record from nested provider JSON.
    ///
    /// `name` and an admission rate in `[0, 1]` are required; score bands
    /// are optional here and only demanded by classification.
    pub fn from_nested(record: &Value, fields: &FieldMap) -> SearchResult<Self> {
        let name = text_at(record, &fields.name)
            .ok_or_else(|| SearchError::invalid(format!("record missing {}", fields.name)))?;

        let admission_rate = number_at(record, &fields.admission_rate)?.ok_or_else(|| {
            SearchError::invalid(format!("{} missing {}", name, fields.admission_rate))
        })?;
        if !(0.0..=1.0).contains(&admission_rate) {
            return Err(SearchError::invalid(format!(
                "{} admission rate {} outside [0, 1]",
                name, admission_rate
            )));
        }

        let band = |subject: Subject| -> SearchResult<Option<ScoreBand>> {
            let p25 = number_at(record, &fields.percentile_25(subject))?;
            let p75 = number_at(record, &fields.percentile_75(subject))?;
            Ok(match (p25, p75) {
                (Some(p25), Some(p75)) => Some(ScoreBand { p25, p75 }),
                _ => None,
            })
        };

        Ok(Self {
            id: lookup(record, &fields.id).value().and_then(Value::as_u64),
            admission_rate,
            sat: SatBands {
                math: band(Subject::Math)?,
                reading: band(Subject::Reading)?,
                writing: band(Subject::Writing)?,
            },
            city: text_at(record, &fields.city),
            state: text_at(record, &fields.state),
            url: text_at(record, &fields.url),
            median_earnings: number_at(record, &fields.median_earnings)?,
            raw: record.clone(),
            name,
        })
    }
}

/// A school with its derived admission category attached
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedRecord {
    pub record: SchoolRecord,
    pub category: Category,
}

/// Render a 0..1 rate the way the results table shows it, e.g. `11.38%`
pub fn format_admission_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}

/// Row shown in the results table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableRow {
    pub name: String,
    pub admission_rate: String,
    pub category: Category,
    pub location: String,
}

impl From<&ClassifiedRecord> for TableRow {
    fn from(classified: &ClassifiedRecord) -> Self {
        let record = &classified.record;
        let location = match (&record.city, &record.state) {
            (Some(city), Some(state)) => format!("{}, {}", city, state),
            (Some(city), None) => city.clone(),
            (None, Some(state)) => state.clone(),
            (None, None) => String::new(),
        };
        Self {
            name: record.name.clone(),
            admission_rate: format_admission_rate(record.admission_rate),
            category: classified.category,
            location,
        }
    }
}
