use std::{
    collections::HashMap,
    sync::{Arc, Weak},
};

use shared::domain::{Page, PageKey};
use tokio::sync::{broadcast, Mutex};
use tracing::debug;

use crate::{error::FetchError, Fetcher};

type FetchResult = Result<Arc<Page>, FetchError>;

enum Slot {
    Ready(Arc<Page>),
    /// A fetch is in flight; followers subscribe to receive the leader's
    /// result instead of issuing a duplicate request. Weak, so only the
    /// leading future keeps the channel alive: cancelling the leader
    /// closes the channel and wakes followers instead of wedging the key.
    InFlight(Weak<broadcast::Sender<FetchResult>>),
}

enum FetchRole {
    Leader(Arc<broadcast::Sender<FetchResult>>),
    Follower(
        Weak<broadcast::Sender<FetchResult>>,
        broadcast::Receiver<FetchResult>,
    ),
}

/// Process-wide cache of fetched pages, shared by both browsing modes.
///
/// Stored pages are immutable; replacement under the same key constructs
/// a new [`Page`] value. A page already in cache is served as-is until
/// explicitly invalidated. Fetch failures are never stored.
pub struct PageCache {
    fetcher: Arc<dyn Fetcher>,
    slots: Mutex<HashMap<PageKey, Slot>>,
}

impl PageCache {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Arc<Self> {
        Arc::new(Self {
            fetcher,
            slots: Mutex::new(HashMap::new()),
        })
    }

    /// Returns the stored page for `key`, without fetching.
    pub async fn get(&self, key: PageKey) -> Option<Arc<Page>> {
        match self.slots.lock().await.get(&key) {
            Some(Slot::Ready(page)) => Some(Arc::clone(page)),
            _ => None,
        }
    }

    /// Drops the stored page for `key`. A fetch already in flight is left
    /// to complete; its result still lands in the cache.
    pub async fn invalidate(&self, key: PageKey) {
        let mut slots = self.slots.lock().await;
        if matches!(slots.get(&key), Some(Slot::Ready(_))) {
            slots.remove(&key);
        }
    }

    /// Cached page for `key`, fetching on a miss.
    ///
    /// At most one fetch per key is in flight at a time: concurrent calls
    /// for the same key coalesce onto the single underlying request and
    /// all observe its result. If the leading call is cancelled
    /// mid-fetch, waiting followers surface an error and the next call
    /// for the key starts a fresh fetch.
    pub async fn fetch_if_absent(&self, key: PageKey) -> FetchResult {
        let role = {
            let mut slots = self.slots.lock().await;
            let live = match slots.get(&key) {
                Some(Slot::Ready(page)) => return Ok(Arc::clone(page)),
                Some(Slot::InFlight(in_flight)) => in_flight
                    .upgrade()
                    .map(|tx| (Weak::clone(in_flight), tx)),
                None => None,
            };
            match live {
                // The upgraded sender is dropped at the end of this arm;
                // a follower must not keep the channel alive past the
                // leader.
                Some((in_flight, tx)) => FetchRole::Follower(in_flight, tx.subscribe()),
                // No fetch in flight, or the previous leader was
                // cancelled and left a dead slot behind: lead a fresh one.
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    let tx = Arc::new(tx);
                    slots.insert(key, Slot::InFlight(Arc::downgrade(&tx)));
                    FetchRole::Leader(tx)
                }
            }
        };

        match role {
            FetchRole::Leader(tx) => self.fetch_and_store(key, tx).await,
            FetchRole::Follower(in_flight, mut rx) => match rx.recv().await {
                Ok(result) => result,
                Err(_) => {
                    // The leading fetch was dropped before completing.
                    // Clear the dead slot so the next call can start over.
                    let mut slots = self.slots.lock().await;
                    if let Some(Slot::InFlight(current)) = slots.get(&key) {
                        if Weak::ptr_eq(current, &in_flight) {
                            slots.remove(&key);
                        }
                    }
                    Err(FetchError::Network(
                        "page fetch aborted before completion".to_string(),
                    ))
                }
            },
        }
    }

    async fn fetch_and_store(
        &self,
        key: PageKey,
        tx: Arc<broadcast::Sender<FetchResult>>,
    ) -> FetchResult {
        let result = self
            .fetcher
            .fetch_page(key.page, key.per_page)
            .await
            .map(|items| Arc::new(Page::from_items(key, items)));

        {
            let mut slots = self.slots.lock().await;
            if matches!(slots.get(&key), Some(Slot::InFlight(_))) {
                slots.remove(&key);
            }
            if let Ok(page) = &result {
                debug!(
                    page = key.page,
                    per_page = key.per_page,
                    items = page.items.len(),
                    has_next = page.has_next,
                    "page stored"
                );
                slots.insert(key, Slot::Ready(Arc::clone(page)));
            }
        }

        let _ = tx.send(result.clone());
        result
    }
}

#[cfg(test)]
#[path = "tests/cache_tests.rs"]
mod tests;
