use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fields::FieldMap;
use crate::query::MAX_PAGE_SIZE;

pub const DEFAULT_BASE_URL: &str = "https://api.data.gov/ed/collegescorecard/v1/schools";

/// Environment variable that may carry the provider credential
pub const API_KEY_ENV: &str = "SCORECARD_API_KEY";

/// Connection settings for the school data provider
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub base_url: String,
    pub api_key: String,
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            timeout_secs: 20,
            user_agent: concat!("college_search/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Endpoint returning JSON, e.g. `.../v1/schools.json`
    pub fn endpoint(&self) -> String {
        format!("{}.json", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SearchConfig {
    pub provider: ProviderConfig,
    pub fields: FieldMap,
    pub page_size: u32,
    /// Upper bound on a single provider call as seen by the fetch controller
    pub fetch_timeout_secs: u64,
    /// Abort superseded provider calls instead of letting them run out
    pub cancel_superseded: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            provider: ProviderConfig::default(),
            fields: FieldMap::default(),
            page_size: 20,
            fetch_timeout_secs: 30,
            cancel_superseded: true,
        }
    }
}

impl SearchConfig {
    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Take the credential from `SCORECARD_API_KEY` when it is set
    pub fn with_api_key_from_env(mut self) -> Self {
        if let Ok(key) = env::var(API_KEY_ENV) {
            if !key.trim().is_empty() {
                self.provider.api_key = key.trim().to_string();
            }
        }
        self
    }
}

/// Load `config/search.yml` under `root`; a missing file means defaults
pub fn load_config(root: &str) -> Result<SearchConfig> {
    let path = PathBuf::from(root).join("config/search.yml");

    if !path.exists() {
        return Ok(SearchConfig::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read search config from {:?}", path))?;

    let config: SearchConfig = serde_yaml::from_str(&content)
        .with_context(|| "Failed to parse search config YAML")?;

    if config.page_size == 0 || config.page_size > MAX_PAGE_SIZE {
        anyhow::bail!(
            "page_size {} in {:?} must be within 1..={}",
            config.page_size,
            path,
            MAX_PAGE_SIZE
        );
    }
    if config.fetch_timeout_secs == 0 {
        anyhow::bail!("fetch_timeout_secs in {:?} must be positive", path);
    }
    if config.provider.timeout_secs == 0 {
        anyhow::bail!("provider.timeout_secs in {:?} must be positive", path);
    }

    Ok(config)
}
