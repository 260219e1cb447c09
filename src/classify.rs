//! Classification Module
//!
//! Places a school in Reach/Target/Safety/Unknown for an applicant.
//!
//! Rules:
//! - Admission rate below 15%: Reach, whatever the scores
//! - No math and no reading threshold: Unknown
//! - Per section: Safety if the 75th percentile is below the applicant's
//!   score, Reach if the score is at or below the 25th percentile, else Target
//! - Sections combine with Reach > Target > Safety; a lone math or reading
//!   threshold decides by itself

use crate::error::{SearchError, SearchResult};
use crate::record::{ScoreBand, SchoolRecord};
use crate::types::{Category, FilterCriteria};

/// Schools admitting fewer than this share of applicants are always a reach
pub const SELECTIVE_ADMISSION_RATE: f64 = 0.15;

/// Verdict for a single SAT section
pub fn subject_verdict(band: ScoreBand, threshold: u16) -> Category {
    let score = f64::from(threshold);
    if band.p75 < score {
        Category::Safety
    } else if score <= band.p25 {
        Category::Reach
    } else {
        Category::Target
    }
}

/// Merge section verdicts; the most pessimistic one wins
pub fn combine<I>(verdicts: I) -> Category
where
    I: IntoIterator<Item = Category>,
{
    let mut overall = Category::Safety;
    for verdict in verdicts {
        match verdict {
            Category::Reach => return Category::Reach,
            Category::Target => overall = Category::Target,
            _ => {}
        }
    }
    overall
}

pub fn classify(record: &SchoolRecord, criteria: &FilterCriteria) -> SearchResult<Category> {
    criteria.validate()?;

    if record.admission_rate < SELECTIVE_ADMISSION_RATE {
        return Ok(Category::Reach);
    }

    let subjects = criteria.scored_subjects();
    if subjects.is_empty() {
        return Ok(Category::Unknown);
    }

    let mut verdicts = Vec::with_capacity(subjects.len());
    for (subject, threshold) in subjects {
        let band = record.sat.get(subject).ok_or_else(|| {
            SearchError::invalid(format!(
                "{} has no {} score band",
                record.name,
                subject.label()
            ))
        })?;
        verdicts.push(subject_verdict(band, threshold));
    }

    Ok(combine(verdicts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SatBands;
    use serde_json::Value;

    fn make_school(admission_rate: f64, math: Option<(f64, f64)>, reading: Option<(f64, f64)>) -> SchoolRecord {
        let band = |b: Option<(f64, f64)>| b.map(|(p25, p75)| ScoreBand { p25, p75 });
        SchoolRecord {
            id: Some(1),
            name: "Test College".to_string(),
            admission_rate,
            sat: SatBands { math: band(math), reading: band(reading), writing: None },
            city: None,
            state: None,
            url: None,
            median_earnings: None,
            raw: Value::Null,
        }
    }

    fn math_only(score: u16) -> FilterCriteria {
        FilterCriteria {
            sat_math: Some(score),
            include_target: false,
            include_safety: false,
            include_unknown: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_selective_school_is_always_reach() {
        let school = make_school(0.05, Some((500.0, 550.0)), Some((500.0, 550.0)));
        for criteria in [
            FilterCriteria::default(),
            FilterCriteria { sat_math: Some(800), sat_reading: Some(800), ..Default::default() },
        ] {
            assert_eq!(classify(&school, &criteria).unwrap(), Category::Reach);
        }
    }

    #[test]
    fn test_selective_school_needs_no_bands() {
        let school = make_school(0.149, None, None);
        assert_eq!(classify(&school, &math_only(700)).unwrap(), Category::Reach);
    }

    #[test]
    fn test_no_thresholds_is_unknown() {
        let school = make_school(0.15, Some((600.0, 700.0)), None);
        assert_eq!(classify(&school, &FilterCriteria::default()).unwrap(), Category::Unknown);

        let writing_only = FilterCriteria { sat_writing: Some(600), ..Default::default() };
        assert_eq!(classify(&school, &writing_only).unwrap(), Category::Unknown);
    }

    #[test]
    fn test_score_at_or_below_25th_is_reach() {
        let school = make_school(0.5, Some((700.0, 750.0)), None);
        assert_eq!(classify(&school, &math_only(650)).unwrap(), Category::Reach);
        assert_eq!(classify(&school, &math_only(700)).unwrap(), Category::Reach);
    }

    #[test]
    fn test_score_above_75th_is_safety() {
        let school = make_school(0.5, Some((700.0, 750.0)), None);
        assert_eq!(classify(&school, &math_only(800)).unwrap(), Category::Safety);
    }

    #[test]
    fn test_score_inside_band_is_target() {
        let school = make_school(0.5, Some((700.0, 750.0)), None);
        assert_eq!(classify(&school, &math_only(720)).unwrap(), Category::Target);
        // equal to the 75th percentile is not yet safe
        assert_eq!(classify(&school, &math_only(750)).unwrap(), Category::Target);
    }

    #[test]
    fn test_reading_alone_decides() {
        let school = make_school(0.4, None, Some((550.0, 650.0)));
        let criteria = FilterCriteria { sat_reading: Some(700), ..Default::default() };
        assert_eq!(classify(&school, &criteria).unwrap(), Category::Safety);
    }

    #[test]
    fn test_combined_precedence() {
        let school = make_school(0.3, Some((600.0, 700.0)), Some((600.0, 700.0)));

        let safety_and_target = FilterCriteria { sat_math: Some(750), sat_reading: Some(650), ..Default::default() };
        assert_eq!(classify(&school, &safety_and_target).unwrap(), Category::Target);

        let safety_and_reach = FilterCriteria { sat_math: Some(750), sat_reading: Some(600), ..Default::default() };
        assert_eq!(classify(&school, &safety_and_reach).unwrap(), Category::Reach);

        let both_safe = FilterCriteria { sat_math: Some(760), sat_reading: Some(710), ..Default::default() };
        assert_eq!(classify(&school, &both_safe).unwrap(), Category::Safety);
    }

    #[test]
    fn test_writing_counts_with_math_and_reading() {
        let mut school = make_school(0.3, Some((600.0, 700.0)), Some((600.0, 700.0)));
        school.sat.writing = Some(ScoreBand { p25: 650.0, p75: 720.0 });
        let criteria = FilterCriteria {
            sat_math: Some(750),
            sat_reading: Some(750),
            sat_writing: Some(640),
            ..Default::default()
        };
        assert_eq!(classify(&school, &criteria).unwrap(), Category::Reach);
    }

    #[test]
    fn test_missing_band_is_invalid() {
        let school = make_school(0.5, None, Some((600.0, 700.0)));
        let err = classify(&school, &math_only(650)).unwrap_err();
        assert!(matches!(err, SearchError::InvalidInput(_)));
    }

    #[test]
    fn test_out_of_range_threshold_is_invalid() {
        let school = make_school(0.05, Some((600.0, 700.0)), None);
        assert!(classify(&school, &math_only(900)).is_err());
    }

    #[test]
    fn test_combine_empty_is_safety() {
        assert_eq!(combine(Vec::new()), Category::Safety);
        assert_eq!(combine([Category::Safety, Category::Target]), Category::Target);
    }
}
