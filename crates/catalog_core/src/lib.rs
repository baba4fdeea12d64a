//! Catalog-browsing core: a paginated, cached client for the remote beer
//! API plus the two browsing controllers built on top of it.
//!
//! The cache is process-wide and shared: both the cursor-driven
//! [`PaginationController`] and the continuous [`InfiniteFeedController`]
//! resolve pages through the same [`PageCache`], which coalesces
//! concurrent fetches for one key into a single request against the
//! injected [`Fetcher`].

use async_trait::async_trait;
use shared::domain::BeerSummary;

pub mod cache;
pub mod error;
pub mod favorites;
pub mod feed;
pub mod http;
pub mod pagination;

pub use cache::PageCache;
pub use error::FetchError;
pub use favorites::FavoriteSet;
pub use feed::{InfiniteFeedController, ManualViewport, ViewportObserver};
pub use http::HttpFetcher;
pub use pagination::{
    DetachedLocation, MemoryLocation, PageLocation, PageView, PaginationController,
};

/// Remote catalog endpoint. One call per page; implementations perform no
/// caching or retries of their own.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<BeerSummary>, FetchError>;
}

/// Handle returned by collaborator `subscribe` calls; dropping it
/// unregisters the callback.
pub struct Subscription(Option<Box<dyn FnOnce() + Send>>);

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + Send + 'static) -> Self {
        Self(Some(Box::new(unsubscribe)))
    }

    /// A subscription with nothing to unregister.
    pub fn detached() -> Self {
        Self(None)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(unsubscribe) = self.0.take() {
            unsubscribe();
        }
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
