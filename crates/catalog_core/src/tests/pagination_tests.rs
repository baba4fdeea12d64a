use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use async_trait::async_trait;
use shared::domain::{BeerId, BeerSummary};
use tokio::sync::Notify;

use crate::{
    cache::PageCache,
    error::FetchError,
    pagination::{DetachedLocation, MemoryLocation, PageLocation, PageView, PaginationController},
    Fetcher,
};

const PER_PAGE: u32 = 32;

fn items(count: usize, page: u32) -> Vec<BeerSummary> {
    (0..count)
        .map(|i| BeerSummary {
            id: BeerId(i64::from(page) * 1000 + i as i64),
            name: format!("beer-{page}-{i}"),
            tagline: "test brew".to_string(),
            abv: None,
            ebc: None,
            image_url: None,
        })
        .collect()
}

struct ScriptedFetcher {
    counts: HashMap<u32, usize>,
    calls: AtomicUsize,
    gated_page: Option<u32>,
    release: Notify,
    fail_page: Option<u32>,
    fail_once: AtomicUsize,
}

impl ScriptedFetcher {
    fn with_counts(counts: impl IntoIterator<Item = (u32, usize)>) -> Self {
        Self {
            counts: counts.into_iter().collect(),
            calls: AtomicUsize::new(0),
            gated_page: None,
            release: Notify::new(),
            fail_page: None,
            fail_once: AtomicUsize::new(0),
        }
    }

    fn full_pages() -> Self {
        Self::with_counts([])
    }

    fn gated_on(page: u32) -> Self {
        Self {
            gated_page: Some(page),
            ..Self::full_pages()
        }
    }

    /// Fails the first fetch of `page`, succeeds afterwards.
    fn failing_once_on(page: u32) -> Self {
        Self {
            fail_page: Some(page),
            ..Self::full_pages()
        }
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch_page(&self, page: u32, per_page: u32) -> Result<Vec<BeerSummary>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.gated_page == Some(page) {
            self.release.notified().await;
        }
        if self.fail_page == Some(page) && self.fail_once.fetch_add(1, Ordering::SeqCst) == 0 {
            return Err(FetchError::Network("connection reset".to_string()));
        }
        let count = self.counts.get(&page).copied().unwrap_or(per_page as usize);
        Ok(items(count, page))
    }
}

fn controller_with(
    fetcher: Arc<ScriptedFetcher>,
    location: MemoryLocation,
) -> Arc<PaginationController> {
    let cache = PageCache::new(fetcher as Arc<dyn Fetcher>);
    PaginationController::new(cache, Arc::new(location), PER_PAGE)
}

#[tokio::test]
async fn cursor_initializes_from_location() {
    let controller = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        MemoryLocation::with_page(3),
    );
    assert_eq!(controller.current_page().await, 3);
}

#[tokio::test]
async fn cursor_defaults_to_one_on_absent_or_invalid_location() {
    let absent = controller_with(Arc::new(ScriptedFetcher::full_pages()), MemoryLocation::new());
    assert_eq!(absent.current_page().await, 1);

    let invalid = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        MemoryLocation::with_page(0),
    );
    assert_eq!(invalid.current_page().await, 1);
}

#[tokio::test]
async fn detached_location_host_starts_at_page_one_and_drops_writes() {
    let fetcher = Arc::new(ScriptedFetcher::full_pages());
    let cache = PageCache::new(fetcher as Arc<dyn Fetcher>);
    let controller = PaginationController::new(cache, Arc::new(DetachedLocation), PER_PAGE);

    assert_eq!(controller.current_page().await, 1);
    // The cursor still moves even though the host has nowhere to mirror it.
    controller.set_page(4).await.expect("jump");
    assert_eq!(controller.current_page().await, 4);
}

#[tokio::test]
async fn next_page_is_rejected_before_first_load() {
    let fetcher = Arc::new(ScriptedFetcher::full_pages());
    let controller = controller_with(Arc::clone(&fetcher), MemoryLocation::new());

    // has_next is unknown until the current page has loaded.
    assert!(!controller.next_page().await.expect("next"));
    assert_eq!(controller.current_page().await, 1);
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn last_page_is_detected_from_short_item_count() {
    // 32 items then 5 at page size 32: page 2 is the last page.
    let fetcher = Arc::new(ScriptedFetcher::with_counts([(1, 32), (2, 5)]));
    let controller = controller_with(fetcher, MemoryLocation::new());

    let first = controller.load_current().await.expect("load page 1");
    assert!(first.has_next);
    assert!(controller.next_page().await.expect("advance"));
    assert_eq!(controller.current_page().await, 2);

    // Page 2 came back short, so the cursor must stay put.
    assert!(!controller.next_page().await.expect("no-op"));
    assert_eq!(controller.current_page().await, 2);
}

#[tokio::test]
async fn prev_page_is_floored_at_one() {
    let controller = controller_with(Arc::new(ScriptedFetcher::full_pages()), MemoryLocation::new());

    controller.load_current().await.expect("load page 1");
    assert!(!controller.prev_page().await.expect("no-op at 1"));
    assert_eq!(controller.current_page().await, 1);

    controller.set_page(2).await.expect("jump");
    assert!(controller.prev_page().await.expect("back"));
    assert_eq!(controller.current_page().await, 1);
}

#[tokio::test]
async fn set_page_zero_is_rejected_not_clamped() {
    let location = MemoryLocation::new();
    let controller = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        location.clone(),
    );

    assert!(!controller.set_page(0).await.expect("rejected"));
    assert_eq!(controller.current_page().await, 1);
    assert_eq!(location.read(), None);
}

#[tokio::test]
async fn set_page_mirrors_to_the_location_even_without_a_move() {
    let location = MemoryLocation::new();
    let controller = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        location.clone(),
    );

    // Fresh session: the cursor defaults to 1 but the address is empty.
    assert_eq!(location.read(), None);
    assert!(!controller.set_page(1).await.expect("no-op move"));
    assert_eq!(location.read(), Some(1));
}

#[tokio::test]
async fn cursor_round_trips_through_the_location() {
    let location = MemoryLocation::new();
    let controller = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        location.clone(),
    );

    controller.set_page(3).await.expect("jump");
    assert_eq!(location.read(), Some(3));

    // A fresh session over the same location resumes at page 3.
    let restored = controller_with(Arc::new(ScriptedFetcher::full_pages()), location);
    assert_eq!(restored.current_page().await, 3);
}

#[tokio::test]
async fn external_navigation_is_adopted_via_subscription() {
    let location = MemoryLocation::new();
    let controller = controller_with(
        Arc::new(ScriptedFetcher::full_pages()),
        location.clone(),
    );
    controller.load_current().await.expect("load page 1");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let _subscription = location.subscribe(Box::new(move || {
        let _ = tx.send(());
    }));

    location.set_external(5);
    rx.recv().await.expect("change signal");

    assert!(controller.sync_from_location().await.expect("adopt"));
    assert_eq!(controller.current_page().await, 5);
    match controller.view().await {
        PageView::Ready(page) => assert_eq!(page.key.page, 5),
        other => panic!("expected loaded page 5, got {other:?}"),
    }
}

#[tokio::test]
async fn placeholders_fill_the_page_while_loading() {
    let fetcher = Arc::new(ScriptedFetcher::gated_on(1));
    let controller = controller_with(Arc::clone(&fetcher), MemoryLocation::new());

    let load = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.load_current().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    match controller.view().await {
        PageView::Loading { placeholders } => assert_eq!(placeholders, PER_PAGE as usize),
        other => panic!("expected placeholders, got {other:?}"),
    }

    fetcher.release.notify_waiters();
    load.await.expect("join").expect("load");

    match controller.view().await {
        PageView::Ready(page) => assert_eq!(page.items.len(), PER_PAGE as usize),
        other => panic!("expected loaded page, got {other:?}"),
    }
}

#[tokio::test]
async fn stale_fetch_is_discarded_after_a_cursor_move() {
    let fetcher = Arc::new(ScriptedFetcher::gated_on(1));
    let controller = controller_with(Arc::clone(&fetcher), MemoryLocation::new());

    let stale = tokio::spawn({
        let controller = Arc::clone(&controller);
        async move { controller.load_current().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Move away while page 1 is still in flight, then let it resolve.
    controller.set_page(2).await.expect("jump to 2");
    fetcher.release.notify_waiters();
    stale.await.expect("join").expect("page 1 fetch itself succeeds");

    assert_eq!(controller.current_page().await, 2);
    match controller.view().await {
        PageView::Ready(page) => assert_eq!(page.key.page, 2),
        other => panic!("expected page 2, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_load_surfaces_and_is_retryable() {
    let fetcher = Arc::new(ScriptedFetcher::failing_once_on(1));
    let controller = controller_with(fetcher, MemoryLocation::new());

    let err = controller.load_current().await.expect_err("first load fails");
    assert!(matches!(err, FetchError::Network(_)));
    assert!(matches!(controller.view().await, PageView::Failed(_)));

    // The failure was not cached, so the retry reaches the fetcher.
    controller.load_current().await.expect("retry");
    assert!(matches!(controller.view().await, PageView::Ready(_)));
}
