//! Adapters for the QuickRoute service API (driver import and optimization).
//!
//! Both endpoints hang off one API prefix, e.g. `https://host/api/`.

mod dto;
mod import;
mod optimize;

pub use import::HttpImportService;
pub use optimize::HttpOptimizationService;

use std::time::Duration;

use reqwest::{Client, Url};

/// Client and base URL shared by the API adapters.
#[derive(Debug, Clone)]
pub struct QuickRouteApi {
    client: Client,
    prefix: Url,
}

impl QuickRouteApi {
    /// Build an API client rooted at `prefix`.
    ///
    /// # Errors
    ///
    /// Returns an error when the reqwest client cannot be constructed.
    pub fn new(prefix: Url, timeout: Duration, user_agent: &str) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client, prefix })
    }

    /// Resolve `path` against the API prefix.
    fn endpoint(&self, path: &str) -> Result<Url, String> {
        self.prefix
            .join(path)
            .map_err(|error| format!("invalid endpoint '{path}': {error}"))
    }
}
