use crate::record::ClassifiedRecord;
use crate::types::FilterCriteria;

/// Keep a school only if its category toggle is switched on
pub fn accepts(classified: &ClassifiedRecord, criteria: &FilterCriteria) -> bool {
    criteria.includes(classified.category)
}

/// Case-insensitive prefix match on the school name (table column filter).
/// An empty or blank prefix matches everything.
pub fn matches_name_prefix(classified: &ClassifiedRecord, prefix: &str) -> bool {
    let prefix = prefix.trim();
    if prefix.is_empty() {
        return true;
    }
    classified
        .record
        .name
        .to_lowercase()
        .starts_with(&prefix.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{SatBands, SchoolRecord};
    use crate::types::Category;
    use serde_json::Value;

    fn make_classified(name: &str, category: Category) -> ClassifiedRecord {
        ClassifiedRecord {
            record: SchoolRecord {
                id: None,
                name: name.to_string(),
                admission_rate: 0.5,
                sat: SatBands::default(),
                city: None,
                state: None,
                url: None,
                median_earnings: None,
                raw: Value::Null,
            },
            category,
        }
    }

    #[test]
    fn test_accepts_follows_toggles() {
        let criteria = FilterCriteria {
            include_reach: true,
            include_target: false,
            include_safety: true,
            include_unknown: false,
            ..Default::default()
        };
        assert!(accepts(&make_classified("A", Category::Reach), &criteria));
        assert!(!accepts(&make_classified("B", Category::Target), &criteria));
        assert!(accepts(&make_classified("C", Category::Safety), &criteria));
        assert!(!accepts(&make_classified("D", Category::Unknown), &criteria));
    }

    #[test]
    fn test_nothing_accepted_when_all_off() {
        let criteria = FilterCriteria {
            include_reach: false,
            include_target: false,
            include_safety: false,
            include_unknown: false,
            ..Default::default()
        };
        for category in [Category::Reach, Category::Target, Category::Safety, Category::Unknown] {
            assert!(!accepts(&make_classified("X", category), &criteria));
        }
    }

    #[test]
    fn test_name_prefix() {
        let school = make_classified("Stanford University", Category::Reach);
        assert!(matches_name_prefix(&school, "stan"));
        assert!(matches_name_prefix(&school, "  STANFORD "));
        assert!(matches_name_prefix(&school, ""));
        assert!(!matches_name_prefix(&school, "university"));
    }
}
