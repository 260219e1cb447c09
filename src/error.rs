//! Error Module
//!
//! Failure taxonomy shared by classification, query building and the fetch
//! controller. Errors are `Clone` so they can be carried inside `FetchState`.

use std::time::Duration;
use thiserror::Error;

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SearchError {
    /// Malformed filter criteria or a school record missing required fields
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Network or provider-side failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered but the envelope could not be decoded
    #[error("malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("provider request timed out after {0:?}")]
    Timeout(Duration),

    /// Request was aborted because a newer one superseded it
    #[error("request cancelled")]
    Cancelled,
}

impl SearchError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        SearchError::InvalidInput(msg.into())
    }

    /// Provider-side failures, as opposed to bad input from the caller
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            SearchError::Transport(_)
                | SearchError::MalformedResponse(_)
                | SearchError::Timeout(_)
                | SearchError::Cancelled
        )
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_grouping() {
        assert!(SearchError::Transport("down".to_string()).is_transport());
        assert!(SearchError::Timeout(Duration::from_secs(5)).is_transport());
        assert!(SearchError::Cancelled.is_transport());
        assert!(!SearchError::invalid("bad score").is_transport());
    }

    #[test]
    fn test_display_messages() {
        let err = SearchError::invalid("sat_math 900 outside 200..=800");
        assert_eq!(err.to_string(), "invalid input: sat_math 900 outside 200..=800");
    }
}
