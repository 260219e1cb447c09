//! Query Builder Module
//!
//! Turns filter criteria and a page window into a provider request: field
//! projection, paging, range filters and a stable sort order.
//!
//! Range filters only ever drop schools that could not pass the category
//! filter, with one deliberate exception: a section the applicant scored must
//! have published bands, since classification cannot proceed without them.

use serde::Serialize;

use crate::classify::SELECTIVE_ADMISSION_RATE;
use crate::error::{SearchError, SearchResult};
use crate::fields::FieldMap;
use crate::types::{FilterCriteria, MAX_SCORE, MIN_SCORE};

/// Largest page the provider will serve
pub const MAX_PAGE_SIZE: u32 = 100;

/// Ascending sort on one provider field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortKey {
    pub field: String,
}

impl SortKey {
    fn asc(field: &str) -> Self {
        Self { field: field.to_string() }
    }

    fn render(&self) -> String {
        format!("{}:asc", self.field)
    }
}

/// Inclusive numeric range on one provider field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeClause {
    pub field: String,
    pub min: f64,
    pub max: f64,
}

impl RangeClause {
    fn new(field: impl Into<String>, min: f64, max: f64) -> Self {
        Self { field: field.into(), min, max }
    }

    fn param(&self) -> (String, String) {
        (format!("{}__range", self.field), format!("{}..{}", self.min, self.max))
    }
}

/// Provider-facing request, minus the credential
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderRequest {
    pub fields: Vec<String>,
    pub page_index: u32,
    pub page_size: u32,
    pub ranges: Vec<RangeClause>,
    pub sort: Vec<SortKey>,
}

impl ProviderRequest {
    /// Query string pairs in a fixed order
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("fields".to_string(), self.fields.join(",")),
            ("page".to_string(), self.page_index.to_string()),
            ("per_page".to_string(), self.page_size.to_string()),
        ];
        pairs.extend(self.ranges.iter().map(RangeClause::param));
        if !self.sort.is_empty() {
            let sort = self.sort.iter().map(SortKey::render).collect::<Vec<_>>().join(",");
            pairs.push(("sort".to_string(), sort));
        }
        pairs
    }
}

#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    fields: FieldMap,
}

impl QueryBuilder {
    pub fn new(fields: FieldMap) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn build(
        &self,
        criteria: &FilterCriteria,
        page_index: u32,
        page_size: u32,
    ) -> SearchResult<ProviderRequest> {
        criteria.validate()?;
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            return Err(SearchError::invalid(format!(
                "page size {} outside 1..={}",
                page_size, MAX_PAGE_SIZE
            )));
        }

        let mut ranges = Vec::new();

        // Without Reach, selective schools can never show up
        let rate_min = if criteria.include_reach { 0.0 } else { SELECTIVE_ADMISSION_RATE };
        ranges.push(RangeClause::new(&self.fields.admission_rate, rate_min, 1.0));

        let min_score = f64::from(MIN_SCORE);
        let max_score = f64::from(MAX_SCORE);
        for (subject, threshold) in criteria.scored_subjects() {
            // scores are whole numbers, so "below t" is "at most t - 1"
            let below = f64::from(threshold) - 1.0;
            let p25_max = if criteria.include_reach { max_score } else { below };
            let p75_max = if criteria.include_reach || criteria.include_target {
                max_score
            } else {
                below
            };
            ranges.push(RangeClause::new(self.fields.percentile_25(subject), min_score, p25_max));
            ranges.push(RangeClause::new(self.fields.percentile_75(subject), min_score, p75_max));
        }

        Ok(ProviderRequest {
            fields: self.fields.projection(),
            page_index,
            page_size,
            ranges,
            sort: vec![SortKey::asc(&self.fields.admission_rate), SortKey::asc(&self.fields.id)],
        })
    }
}
