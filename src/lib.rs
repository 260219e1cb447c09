//! College Search Library
//!
//! Classifies colleges into Reach/Target/Safety/Unknown against an applicant's
//! SAT scores and pages through College Scorecard results.

pub mod classify;
pub mod config;
pub mod controller;
pub mod error;
pub mod fields;
pub mod filter;
pub mod flatten;
pub mod provider;
pub mod query;
pub mod record;
pub mod types;

pub use classify::classify;
pub use config::{load_config, ProviderConfig, SearchConfig};
pub use controller::{ControllerOptions, FetchController, FetchOutcome, FetchTask};
pub use error::{SearchError, SearchResult};
pub use fields::FieldMap;
pub use filter::accepts;
pub use flatten::{flatten, lookup, unflatten, Lookup};
pub use provider::{RawPage, RecordProvider, ScorecardClient};
pub use query::{ProviderRequest, QueryBuilder};
pub use record::{ClassifiedRecord, SchoolRecord, TableRow};
pub use types::*;
