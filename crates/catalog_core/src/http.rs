use async_trait::async_trait;
use reqwest::Client;
use shared::domain::BeerSummary;
use tracing::debug;

use crate::{error::FetchError, Fetcher};

/// [`Fetcher`] backed by the remote HTTP catalog API.
pub struct HttpFetcher {
    http: Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { http, base_url }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<BeerSummary>, FetchError> {
        debug!(page, per_page, "fetching catalog page");
        let items: Vec<BeerSummary> = self
            .http
            .get(format!("{}/beers", self.base_url))
            .query(&[("page", page), ("per_page", per_page)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(items)
    }
}
