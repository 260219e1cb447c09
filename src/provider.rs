//! Record Provider Module
//!
//! The seam between the fetch controller and the school data API, plus the
//! College Scorecard implementation over reqwest.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ProviderConfig;
use crate::error::{SearchError, SearchResult};
use crate::query::ProviderRequest;

/// One page exactly as the provider returned it; records are still flat-keyed
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage {
    pub total: u64,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    metadata: Metadata,
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    total: u64,
    #[serde(default)]
    page: Option<u32>,
    #[serde(default)]
    per_page: Option<u32>,
}

impl RawPage {
    /// Decode the `{ metadata: { total, page, per_page }, results: [...] }` envelope
    pub fn from_json(json: Value) -> SearchResult<Self> {
        let envelope: Envelope = serde_json::from_value(json)
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;
        Ok(Self {
            total: envelope.metadata.total,
            page: envelope.metadata.page,
            per_page: envelope.metadata.per_page,
            results: envelope.results,
        })
    }
}

#[async_trait]
pub trait RecordProvider: Send + Sync {
    async fn fetch(&self, request: &ProviderRequest) -> SearchResult<RawPage>;
}

#[async_trait]
impl<P> RecordProvider for Arc<P>
where
    P: RecordProvider + ?Sized,
{
    async fn fetch(&self, request: &ProviderRequest) -> SearchResult<RawPage> {
        (**self).fetch(request).await
    }
}

/// College Scorecard client
pub struct ScorecardClient {
    client: Client,
    config: ProviderConfig,
}

impl ScorecardClient {
    pub fn new(config: ProviderConfig) -> SearchResult<Self> {
        if config.api_key.is_empty() {
            warn!("Scorecard API key is empty; the provider will reject requests");
        }

        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { client, config })
    }

    /// Use a caller-built reqwest client, e.g. one with custom proxy settings
    pub fn with_client(client: Client, config: ProviderConfig) -> Self {
        Self { client, config }
    }

    /// Full request URL including the credential. Never log this.
    pub fn request_url(&self, request: &ProviderRequest) -> SearchResult<Url> {
        let mut pairs = vec![("api_key".to_string(), self.config.api_key.clone())];
        pairs.extend(request.query_pairs());

        Url::parse_with_params(&self.config.endpoint(), &pairs).map_err(|e| {
            SearchError::invalid(format!("invalid provider endpoint {}: {}", self.config.endpoint(), e))
        })
    }
}

#[async_trait]
impl RecordProvider for ScorecardClient {
    async fn fetch(&self, request: &ProviderRequest) -> SearchResult<RawPage> {
        let url = self.request_url(request)?;
        debug!(page = request.page_index, per_page = request.page_size, "requesting schools");

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Transport(format!("provider returned status {}", status)));
        }

        // reqwest reports body read failures as decode errors; keep them Transport
        let body = response
            .bytes()
            .await
            .map_err(|e| SearchError::Transport(format!("failed to read response body: {}", e)))?;
        let json: Value = serde_json::from_slice(&body)
            .map_err(|e| SearchError::MalformedResponse(e.to_string()))?;

        RawPage::from_json(json)
    }
}
