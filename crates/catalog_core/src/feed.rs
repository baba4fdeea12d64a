use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex as StdMutex, PoisonError,
};

use shared::domain::{BeerSummary, Page, PageKey};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{cache::PageCache, error::FetchError, Subscription};

/// Scroll-proximity collaborator: fires when the rendered list nears its
/// end. No payload; the feed decides what "next" means.
pub trait ViewportObserver: Send + Sync {
    fn subscribe(&self, on_near_end: Box<dyn Fn() + Send + Sync>) -> Subscription;
}

/// [`ViewportObserver`] driven by explicit [`trigger`](Self::trigger)
/// calls, for shells without a real viewport and for tests.
#[derive(Default, Clone)]
pub struct ManualViewport {
    inner: Arc<StdMutex<ViewportState>>,
}

#[derive(Default)]
struct ViewportState {
    subscribers: Vec<(u64, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
}

impl ManualViewport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        let subscribers: Vec<_> = {
            let state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            state
                .subscribers
                .iter()
                .map(|(_, on_near_end)| Arc::clone(on_near_end))
                .collect()
        };
        for on_near_end in subscribers {
            on_near_end();
        }
    }
}

impl ViewportObserver for ManualViewport {
    fn subscribe(&self, on_near_end: Box<dyn Fn() + Send + Sync>) -> Subscription {
        let id = {
            let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, Arc::from(on_near_end)));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
            state.subscribers.retain(|(sub_id, _)| *sub_id != id);
        })
    }
}

/// Continuous-scroll browsing mode: an append-only sequence of pages
/// requested strictly in increasing order, flattened for display.
/// Independent of the pagination cursor but sharing its [`PageCache`].
pub struct InfiniteFeedController {
    cache: Arc<PageCache>,
    per_page: u32,
    state: Mutex<FeedState>,
    /// Set while a load is in flight; outside [`FeedState`] so a
    /// [`LoadingGuard`] can clear it without taking the async lock.
    loading: AtomicBool,
}

#[derive(Default)]
struct FeedState {
    pages: Vec<Arc<Page>>,
    exhausted: bool,
}

/// Clears the in-flight flag on drop, so a load cancelled mid-fetch
/// cannot leave the feed refusing every later trigger.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl InfiniteFeedController {
    pub fn new(cache: Arc<PageCache>, per_page: u32) -> Arc<Self> {
        Arc::new(Self {
            cache,
            per_page,
            state: Mutex::new(FeedState::default()),
            loading: AtomicBool::new(false),
        })
    }

    /// Entry point for the viewport-observer signal: the scroll position
    /// is near the end of the rendered list, take the next page.
    pub async fn notify_near_end(&self) -> Result<Option<Arc<Page>>, FetchError> {
        self.load_next().await
    }

    /// Appends the next untaken page (`pages.len() + 1`).
    ///
    /// Returns `Ok(None)` without fetching once the feed is exhausted or
    /// while another load is already in flight, so a fast double-trigger
    /// from the observer cannot double-append. A failed load leaves the
    /// feed unchanged and a later call retries.
    pub async fn load_next(&self) -> Result<Option<Arc<Page>>, FetchError> {
        if self.loading.swap(true, Ordering::AcqRel) {
            return Ok(None);
        }
        let _guard = LoadingGuard(&self.loading);

        let next = {
            let state = self.state.lock().await;
            if state.exhausted {
                return Ok(None);
            }
            state.pages.len() as u32 + 1
        };

        let result = self
            .cache
            .fetch_if_absent(PageKey::new(next, self.per_page))
            .await;

        let mut state = self.state.lock().await;
        match result {
            Ok(page) => {
                state.exhausted = !page.has_next;
                debug!(
                    page = next,
                    items = page.items.len(),
                    exhausted = state.exhausted,
                    "feed page appended"
                );
                state.pages.push(Arc::clone(&page));
                Ok(Some(page))
            }
            Err(err) => Err(err),
        }
    }

    /// Flattened view of every loaded item, in page order.
    pub async fn items(&self) -> Vec<BeerSummary> {
        let state = self.state.lock().await;
        state
            .pages
            .iter()
            .flat_map(|page| page.items.iter().cloned())
            .collect()
    }

    pub async fn page_count(&self) -> usize {
        self.state.lock().await.pages.len()
    }

    pub async fn is_exhausted(&self) -> bool {
        self.state.lock().await.exhausted
    }
}

#[cfg(test)]
#[path = "tests/feed_tests.rs"]
mod tests;
