//! Provider field paths
//!
//! Dotted paths of every provider field the search needs. Defaults follow the
//! College Scorecard schema; a config file may override any of them.

use serde::{Deserialize, Serialize};

use crate::types::Subject;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct FieldMap {
    pub id: String,
    pub name: String,
    pub city: String,
    pub state: String,
    pub url: String,
    pub admission_rate: String,
    pub median_earnings: String,
    /// Prefix of the score bands; the full path is `{prefix}.{percentile}.{section}`
    pub sat_scores: String,
    pub math_section: String,
    pub reading_section: String,
    pub writing_section: String,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            name: "school.name".to_string(),
            city: "school.city".to_string(),
            state: "school.state".to_string(),
            url: "school.school_url".to_string(),
            admission_rate: "latest.admissions.admission_rate.overall".to_string(),
            median_earnings: "latest.earnings.10_yrs_after_entry.median".to_string(),
            sat_scores: "latest.admissions.sat_scores".to_string(),
            math_section: "math".to_string(),
            reading_section: "critical_reading".to_string(),
            writing_section: "writing".to_string(),
        }
    }
}

impl FieldMap {
    fn section(&self, subject: Subject) -> &str {
        match subject {
            Subject::Math => &self.math_section,
            Subject::Reading => &self.reading_section,
            Subject::Writing => &self.writing_section,
        }
    }

    pub fn percentile_25(&self, subject: Subject) -> String {
        format!("{}.25th_percentile.{}", self.sat_scores, self.section(subject))
    }

    pub fn percentile_75(&self, subject: Subject) -> String {
        format!("{}.75th_percentile.{}", self.sat_scores, self.section(subject))
    }

    /// Fields requested from the provider for classification and display
    pub fn projection(&self) -> Vec<String> {
        let mut fields = vec![
            self.id.clone(),
            self.name.clone(),
            self.city.clone(),
            self.state.clone(),
            self.url.clone(),
            self.admission_rate.clone(),
            self.median_earnings.clone(),
        ];
        for subject in Subject::ALL {
            fields.push(self.percentile_25(subject));
            fields.push(self.percentile_75(subject));
        }
        fields
    }
}
