//! Blocking page transport.
//!
//! The extraction pipeline only needs "give me the markup behind this URL".
//! [`HttpFetcher`] does that with `ureq`; tests plug in an in-memory fetcher.

use std::time::Duration;

use url::Url;

use crate::config::FetchConfig;
use crate::error::{Result, ScrapeError};

/// Retrieves raw markup for a URL.
pub trait Fetch {
    /// Fetch a single page.
    fn fetch(&self, url: &Url) -> Result<String>;

    /// Visit `primer` first (body discarded), then fetch `target` in the same session.
    fn fetch_in_session(&self, primer: &Url, target: &Url) -> Result<String> {
        self.fetch(primer)?;
        self.fetch(target)
    }
}

/// `ureq`-backed fetcher.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
    config: FetchConfig,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self::with_config(FetchConfig::default())
    }

    pub fn with_config(config: FetchConfig) -> Self {
        Self {
            agent: build_agent(&config),
            config,
        }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, url: &Url) -> Result<String> {
        read_page(&self.agent, url)
    }

    fn fetch_in_session(&self, primer: &Url, target: &Url) -> Result<String> {
        // Fresh cookie jar per sequence; the agent is dropped on every exit path.
        let agent = build_agent(&self.config);
        tracing::debug!(primer = %primer, target = %target, "Establishing session");
        read_page(&agent, primer)?;
        read_page(&agent, target)
    }
}

fn build_agent(config: &FetchConfig) -> ureq::Agent {
    ureq::Agent::new_with_config(
        ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .user_agent(config.user_agent.as_str())
            .build(),
    )
}

fn read_page(agent: &ureq::Agent, url: &Url) -> Result<String> {
    let response = agent
        .get(url.as_str())
        .call()
        .map_err(|e| ScrapeError::transport(url, e))?;
    tracing::debug!(url = %url, status = %response.status(), "Fetched page");
    response
        .into_body()
        .read_to_string()
        .map_err(|e| ScrapeError::transport(url, e))
}
