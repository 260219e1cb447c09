use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{SearchError, SearchResult};
use crate::record::ClassifiedRecord;

/// Lowest and highest score on a single SAT section
pub const MIN_SCORE: u16 = 200;
pub const MAX_SCORE: u16 = 800;

/// Granularity of the score picker offered to users
pub const SCORE_STEP: u16 = 10;

/// Admission-likelihood category of a school for a given applicant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Category {
    Reach,
    Target,
    Safety,
    Unknown,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Category::Reach => "Reach",
            Category::Target => "Target",
            Category::Safety => "Safety",
            Category::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Subject {
    Math,
    Reading,
    Writing,
}

impl Subject {
    pub const ALL: [Subject; 3] = [Subject::Math, Subject::Reading, Subject::Writing];

    pub fn label(&self) -> &'static str {
        match self {
            Subject::Math => "sat_math",
            Subject::Reading => "sat_reading",
            Subject::Writing => "sat_writing",
        }
    }
}

/// Search form input: optional SAT thresholds plus category toggles
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FilterCriteria {
    #[serde(default)]
    pub sat_math: Option<u16>,
    #[serde(default)]
    pub sat_reading: Option<u16>,
    #[serde(default)]
    pub sat_writing: Option<u16>,
    #[serde(default = "default_include")]
    pub include_reach: bool,
    #[serde(default = "default_include")]
    pub include_target: bool,
    #[serde(default = "default_include")]
    pub include_safety: bool,
    #[serde(default = "default_include")]
    pub include_unknown: bool,
}

fn default_include() -> bool {
    true
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            sat_math: None,
            sat_reading: None,
            sat_writing: None,
            include_reach: true,
            include_target: true,
            include_safety: true,
            include_unknown: true,
        }
    }
}

impl FilterCriteria {
    pub fn threshold(&self, subject: Subject) -> Option<u16> {
        match subject {
            Subject::Math => self.sat_math,
            Subject::Reading => self.sat_reading,
            Subject::Writing => self.sat_writing,
        }
    }

    /// Whether the toggle for `category` is switched on
    pub fn includes(&self, category: Category) -> bool {
        match category {
            Category::Reach => self.include_reach,
            Category::Target => self.include_target,
            Category::Safety => self.include_safety,
            Category::Unknown => self.include_unknown,
        }
    }

    /// Subjects whose thresholds take part in classification.
    ///
    /// Writing only counts once both math and reading are given; with a
    /// single math or reading threshold that subject decides alone, and
    /// with neither the school is unclassifiable by score.
    pub fn scored_subjects(&self) -> Vec<(Subject, u16)> {
        match (self.sat_math, self.sat_reading) {
            (None, None) => vec![],
            (Some(math), None) => vec![(Subject::Math, math)],
            (None, Some(reading)) => vec![(Subject::Reading, reading)],
            (Some(math), Some(reading)) => {
                let mut subjects = vec![(Subject::Math, math), (Subject::Reading, reading)];
                if let Some(writing) = self.sat_writing {
                    subjects.push((Subject::Writing, writing));
                }
                subjects
            }
        }
    }

    /// Reject thresholds outside the SAT section range
    pub fn validate(&self) -> SearchResult<()> {
        for subject in Subject::ALL {
            if let Some(score) = self.threshold(subject) {
                if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
                    return Err(SearchError::invalid(format!(
                        "{} {} outside {}..={}",
                        subject.label(),
                        score,
                        MIN_SCORE,
                        MAX_SCORE
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Clamp a raw user-entered score into the valid SAT section range
pub fn clamp_score(raw: i32) -> u16 {
    raw.clamp(MIN_SCORE as i32, MAX_SCORE as i32) as u16
}

/// Scores offered by the search form, highest first
pub fn score_choices() -> Vec<u16> {
    (MIN_SCORE..=MAX_SCORE)
        .step_by(SCORE_STEP as usize)
        .rev()
        .collect()
}

/// One classified, filtered page of schools
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    pub records: Vec<ClassifiedRecord>,
    /// Provider-side match count before category filtering
    pub total_count: u64,
    pub page_index: u32,
    pub page_size: u32,
    pub page_count: u32,
    pub fetched_at: DateTime<Utc>,
}

/// Number of pages needed to show `total_count` rows at `page_size` per page
pub fn page_count(total_count: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size as u64).min(u32::MAX as u64) as u32
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchState {
    Idle,
    Loading { token: u64 },
    Loaded(Page),
    Error(SearchError),
}

impl FetchState {
    pub fn is_loading(&self) -> bool {
        matches!(self, FetchState::Loading { .. })
    }

    pub fn page(&self) -> Option<&Page> {
        match self {
            FetchState::Loaded(page) => Some(page),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&SearchError> {
        match self {
            FetchState::Error(err) => Some(err),
            _ => None,
        }
    }
}
