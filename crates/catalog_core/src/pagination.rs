use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use shared::domain::{Page, PageKey};
use tokio::sync::Mutex;
use tracing::debug;

use crate::{cache::PageCache, error::FetchError, Subscription};

/// External page-address collaborator: a URL fragment in a browser shell,
/// an in-memory cell elsewhere. The stored value outlives the controller,
/// so a session can resume at the page it left off.
pub trait PageLocation: Send + Sync {
    /// Externally stored page number, if any.
    fn read(&self) -> Option<u32>;
    /// Mirrors a cursor move out to the address.
    fn write(&self, page: u32);
    /// Registers a change callback, fired on any stored-value change.
    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription;
}

/// [`PageLocation`] for hosts with no addressable location; reads nothing
/// and drops writes.
pub struct DetachedLocation;

impl PageLocation for DetachedLocation {
    fn read(&self) -> Option<u32> {
        None
    }

    fn write(&self, _page: u32) {}

    fn subscribe(&self, _on_change: Box<dyn Fn() + Send + Sync>) -> Subscription {
        Subscription::detached()
    }
}

/// In-memory [`PageLocation`] used by the terminal shell and tests.
/// Cloning yields another handle onto the same stored value.
#[derive(Default, Clone)]
pub struct MemoryLocation {
    inner: Arc<StdMutex<MemoryLocationState>>,
}

#[derive(Default)]
struct MemoryLocationState {
    page: Option<u32>,
    subscribers: Vec<(u64, Arc<dyn Fn() + Send + Sync>)>,
    next_id: u64,
}

impl MemoryLocation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(page: u32) -> Self {
        let location = Self::default();
        location.lock().page = Some(page);
        location
    }

    /// Simulates a navigation event arriving from outside any controller:
    /// stores the page and notifies subscribers, just like `write`.
    pub fn set_external(&self, page: u32) {
        self.store_and_notify(page);
    }

    fn store_and_notify(&self, page: u32) {
        let subscribers: Vec<_> = {
            let mut state = self.lock();
            state.page = Some(page);
            state
                .subscribers
                .iter()
                .map(|(_, on_change)| Arc::clone(on_change))
                .collect()
        };
        for on_change in subscribers {
            on_change();
        }
    }

    fn lock(&self) -> MutexGuard<'_, MemoryLocationState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PageLocation for MemoryLocation {
    fn read(&self) -> Option<u32> {
        self.lock().page
    }

    fn write(&self, page: u32) {
        self.store_and_notify(page);
    }

    fn subscribe(&self, on_change: Box<dyn Fn() + Send + Sync>) -> Subscription {
        let id = {
            let mut state = self.lock();
            let id = state.next_id;
            state.next_id += 1;
            state.subscribers.push((id, Arc::from(on_change)));
            id
        };
        let inner = Arc::clone(&self.inner);
        Subscription::new(move || {
            let mut state = inner.lock().unwrap_or_else(PoisonError::into_inner);
            state.subscribers.retain(|(sub_id, _)| *sub_id != id);
        })
    }
}

/// What the embedding shell should render for the current cursor.
#[derive(Debug, Clone)]
pub enum PageView {
    /// Fetch in flight: render exactly `placeholders` skeleton rows; they
    /// are replaced in one step when the fetch resolves.
    Loading { placeholders: usize },
    Ready(Arc<Page>),
    /// The last load for this cursor failed; retry via `load_current`.
    Failed(FetchError),
}

/// Cursor-driven browsing mode: one visible page, explicit moves, cursor
/// mirrored to a [`PageLocation`] so it survives reload and back
/// navigation.
pub struct PaginationController {
    cache: Arc<PageCache>,
    location: Arc<dyn PageLocation>,
    per_page: u32,
    state: Mutex<CursorState>,
}

struct CursorState {
    current_page: u32,
    /// Bumped on every cursor move. A fetch resolving under an older
    /// epoch must not install its result.
    epoch: u64,
    current: Option<Arc<Page>>,
    last_error: Option<FetchError>,
}

impl PaginationController {
    /// Reads the initial cursor from `location`; absent or out-of-range
    /// values default to page 1.
    pub fn new(
        cache: Arc<PageCache>,
        location: Arc<dyn PageLocation>,
        per_page: u32,
    ) -> Arc<Self> {
        let current_page = location.read().filter(|page| *page >= 1).unwrap_or(1);
        Arc::new(Self {
            cache,
            location,
            per_page,
            state: Mutex::new(CursorState {
                current_page,
                epoch: 0,
                current: None,
                last_error: None,
            }),
        })
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub async fn current_page(&self) -> u32 {
        self.state.lock().await.current_page
    }

    pub async fn view(&self) -> PageView {
        let state = self.state.lock().await;
        if let Some(page) = &state.current {
            return PageView::Ready(Arc::clone(page));
        }
        if let Some(err) = &state.last_error {
            return PageView::Failed(err.clone());
        }
        PageView::Loading {
            placeholders: self.per_page as usize,
        }
    }

    /// Fetches the page under the cursor. The result is installed only if
    /// the cursor has not moved while the fetch was in flight.
    pub async fn load_current(&self) -> Result<Arc<Page>, FetchError> {
        let (page, epoch) = {
            let state = self.state.lock().await;
            (state.current_page, state.epoch)
        };
        let result = self
            .cache
            .fetch_if_absent(PageKey::new(page, self.per_page))
            .await;

        let mut state = self.state.lock().await;
        if state.epoch == epoch {
            match &result {
                Ok(page) => {
                    state.current = Some(Arc::clone(page));
                    state.last_error = None;
                }
                Err(err) => {
                    state.current = None;
                    state.last_error = Some(err.clone());
                }
            }
        } else {
            debug!(page, "discarding stale page fetch");
        }
        result
    }

    /// Moves the cursor forward. Permitted only once the current page is
    /// loaded and reports `has_next`; otherwise a no-op — which is how
    /// the terminal page is detected.
    pub async fn next_page(&self) -> Result<bool, FetchError> {
        let target = {
            let state = self.state.lock().await;
            match &state.current {
                Some(page) if page.has_next => state.current_page + 1,
                _ => return Ok(false),
            }
        };
        self.move_to(target).await?;
        Ok(true)
    }

    /// Moves the cursor back, floored at page 1.
    pub async fn prev_page(&self) -> Result<bool, FetchError> {
        let target = {
            let state = self.state.lock().await;
            if state.current_page <= 1 {
                return Ok(false);
            }
            state.current_page - 1
        };
        self.move_to(target).await?;
        Ok(true)
    }

    /// Jumps straight to page `n`. Page 0 is rejected as a no-op rather
    /// than clamped, so caller bugs stay visible. Every accepted call
    /// mirrors `n` to the location, even when the cursor already sits on
    /// it — a fresh session's address may not carry the value yet.
    pub async fn set_page(&self, n: u32) -> Result<bool, FetchError> {
        if n < 1 {
            return Ok(false);
        }
        let unchanged = {
            let state = self.state.lock().await;
            state.current_page == n
        };
        if unchanged {
            self.location.write(n);
            return Ok(false);
        }
        self.move_to(n).await?;
        Ok(true)
    }

    /// Adopts the externally stored page as the source of truth; the
    /// shell wires this to [`PageLocation`] change notifications. Does
    /// not write back.
    pub async fn sync_from_location(&self) -> Result<bool, FetchError> {
        let target = self.location.read().filter(|page| *page >= 1).unwrap_or(1);
        {
            let mut state = self.state.lock().await;
            if state.current_page == target {
                return Ok(false);
            }
            state.current_page = target;
            state.epoch += 1;
            state.current = None;
            state.last_error = None;
        }
        self.load_current().await?;
        Ok(true)
    }

    async fn move_to(&self, page: u32) -> Result<Arc<Page>, FetchError> {
        {
            let mut state = self.state.lock().await;
            state.current_page = page;
            state.epoch += 1;
            state.current = None;
            state.last_error = None;
        }
        // Mirror before fetching so the address survives even if the
        // fetch fails.
        self.location.write(page);
        self.load_current().await
    }
}

#[cfg(test)]
#[path = "tests/pagination_tests.rs"]
mod tests;
