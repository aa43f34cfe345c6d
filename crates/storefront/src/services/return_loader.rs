//! Coordinated loading of return requests per order.
//!
//! Order pages can be rendered many times in quick succession, and each render
//! wants the order's return requests. The loader makes sure at most one fetch
//! is in progress per order id by keeping a small state machine for every id
//! it is working on:
//!
//! ```text
//! NotStarted --trigger--> Scheduled --debounce--> InFlight --+--> Done
//!                                                            +--> Failed
//! ```
//!
//! Triggers for an id that is scheduled or in flight are coalesced. Settled
//! outcomes move out of the in-progress map into a `moka` cache bounded by
//! capacity and TTL:
//!
//! - `Done` is reused until it expires, then the next trigger fetches again.
//! - `Failed` is only kept so [`phase`](ReturnRequestLoader::phase) can report
//!   it; the next trigger retries straight away.
//!
//! [`reset`](ReturnRequestLoader::reset) forgets an id in both places and
//! discards any response still in flight for it. Different order ids never
//! wait on each other.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use lustre_core::{OrderId, ReturnRequest};
use moka::sync::Cache;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{Instrument, debug, info_span, warn};

use crate::config::ReturnFetchConfig;
use crate::orders::{OrderApiError, ReturnRequestReader};

/// Why a return request fetch did not produce data.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The order service call failed.
    #[error("order service error: {0}")]
    Api(#[from] OrderApiError),

    /// The order service did not answer in time.
    #[error("timed out after {0:?}")]
    TimedOut(Duration),
}

/// Observable phase of an order id's fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchPhase {
    NotStarted,
    Scheduled,
    InFlight,
    Done,
    Failed,
}

#[derive(Debug, Clone)]
enum SlotState {
    Scheduled,
    InFlight,
    Done(Arc<Vec<ReturnRequest>>),
    Failed(Arc<FetchError>),
}

impl SlotState {
    const fn phase(&self) -> FetchPhase {
        match self {
            Self::Scheduled => FetchPhase::Scheduled,
            Self::InFlight => FetchPhase::InFlight,
            Self::Done(_) => FetchPhase::Done,
            Self::Failed(_) => FetchPhase::Failed,
        }
    }

    const fn is_settled(&self) -> bool {
        matches!(self, Self::Done(_) | Self::Failed(_))
    }

    fn requests(&self) -> Arc<Vec<ReturnRequest>> {
        match self {
            Self::Done(requests) => Arc::clone(requests),
            Self::Scheduled | Self::InFlight | Self::Failed(_) => Arc::default(),
        }
    }
}

/// An id with a fetch scheduled or in flight.
struct Slot {
    generation: u64,
    state: watch::Sender<SlotState>,
}

type Slots = Mutex<HashMap<OrderId, Slot>>;

/// Fetches return requests at most once per order id at a time.
///
/// Cheap to clone; clones share state.
pub struct ReturnRequestLoader<R> {
    reader: Arc<R>,
    config: ReturnFetchConfig,
    pending: Arc<Slots>,
    settled: Cache<OrderId, SlotState>,
    next_generation: Arc<AtomicU64>,
}

impl<R> Clone for ReturnRequestLoader<R> {
    fn clone(&self) -> Self {
        Self {
            reader: Arc::clone(&self.reader),
            config: self.config,
            pending: Arc::clone(&self.pending),
            settled: self.settled.clone(),
            next_generation: Arc::clone(&self.next_generation),
        }
    }
}

impl<R: ReturnRequestReader> ReturnRequestLoader<R> {
    /// Create a loader that reads through `reader`.
    #[must_use]
    pub fn new(reader: Arc<R>, config: ReturnFetchConfig) -> Self {
        let settled = Cache::builder()
            .max_capacity(config.settled_capacity)
            .time_to_live(config.settled_ttl)
            .build();

        Self {
            reader,
            config,
            pending: Arc::new(Mutex::new(HashMap::new())),
            settled,
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Ask for the return requests of `order_id` to be fetched.
    ///
    /// Returns `true` if this call scheduled a fetch, `false` if it was
    /// coalesced into a pending one or a recent result is still cached.
    /// A cached failure does not count: the fetch is retried.
    /// Must be called from within a tokio runtime.
    pub fn trigger(&self, order_id: &OrderId) -> bool {
        let mut pending = lock(&self.pending);
        if pending.contains_key(order_id) {
            debug!(order_id = %order_id, "Return request fetch coalesced");
            return false;
        }
        if matches!(self.settled.get(order_id), Some(SlotState::Done(_))) {
            debug!(order_id = %order_id, "Return requests served from cache");
            return false;
        }

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let (state, _) = watch::channel(SlotState::Scheduled);
        pending.insert(order_id.clone(), Slot { generation, state });
        drop(pending);

        self.spawn_fetch(order_id.clone(), generation);
        true
    }

    /// Trigger a fetch if needed and wait for it to settle.
    ///
    /// Returns the known return requests; empty if the fetch failed or the id
    /// was reset while waiting.
    pub async fn load(&self, order_id: &OrderId) -> Arc<Vec<ReturnRequest>> {
        if let Some(SlotState::Done(requests)) = self.settled.get(order_id) {
            return requests;
        }

        self.trigger(order_id);

        // Gone already: the fetch settled between trigger and subscribe.
        let Some(mut receiver) = self.subscribe(order_id) else {
            return self.known(order_id);
        };

        match receiver.wait_for(SlotState::is_settled).await {
            Ok(state) => state.requests(),
            Err(_) => self.known(order_id),
        }
    }

    /// Return requests currently known for `order_id` without fetching.
    #[must_use]
    pub fn known(&self, order_id: &OrderId) -> Arc<Vec<ReturnRequest>> {
        self.settled
            .get(order_id)
            .map_or_else(Arc::default, |state| state.requests())
    }

    /// Current phase for `order_id`.
    ///
    /// A pending fetch wins over a cached outcome, so a retry after a failure
    /// reads `Scheduled` or `InFlight` rather than `Failed`.
    #[must_use]
    pub fn phase(&self, order_id: &OrderId) -> FetchPhase {
        if let Some(slot) = lock(&self.pending).get(order_id) {
            return slot.state.borrow().phase();
        }
        self.settled
            .get(order_id)
            .map_or(FetchPhase::NotStarted, |state| state.phase())
    }

    /// Forget `order_id` so the next trigger fetches again.
    ///
    /// A response still in flight for the forgotten slot is dropped when it
    /// arrives. Returns whether the id was known.
    pub fn reset(&self, order_id: &OrderId) -> bool {
        let was_pending = lock(&self.pending).remove(order_id).is_some();
        let was_settled = self.settled.remove(order_id).is_some();

        let known = was_pending || was_settled;
        if known {
            debug!(order_id = %order_id, "Return request fetch state reset");
        }
        known
    }

    fn subscribe(&self, order_id: &OrderId) -> Option<watch::Receiver<SlotState>> {
        lock(&self.pending)
            .get(order_id)
            .map(|slot| slot.state.subscribe())
    }

    fn spawn_fetch(&self, order_id: OrderId, generation: u64) {
        let reader = Arc::clone(&self.reader);
        let pending = Arc::clone(&self.pending);
        let settled = self.settled.clone();
        let config = self.config;
        let span = info_span!("return_request_fetch", order_id = %order_id, generation);

        tokio::spawn(
            async move {
                tokio::time::sleep(config.debounce).await;

                if !mark_in_flight(&pending, &order_id, generation) {
                    debug!("Slot reset before fetch started");
                    return;
                }

                let outcome =
                    tokio::time::timeout(config.timeout, reader.get_return_requests(&order_id))
                        .await;

                let next = match outcome {
                    Ok(Ok(requests)) => {
                        debug!(count = requests.len(), "Return requests loaded");
                        SlotState::Done(Arc::new(requests))
                    }
                    Ok(Err(e)) => {
                        warn!(error = %e, "Return request fetch failed");
                        SlotState::Failed(Arc::new(FetchError::Api(e)))
                    }
                    Err(_) => {
                        warn!(timeout = ?config.timeout, "Return request fetch timed out");
                        SlotState::Failed(Arc::new(FetchError::TimedOut(config.timeout)))
                    }
                };

                if !settle(&pending, &settled, &order_id, generation, next) {
                    warn!("Discarding return requests for a reset order");
                }
            }
            .instrument(span),
        );
    }
}

/// Move a scheduled slot to `InFlight` if it still belongs to `generation`.
fn mark_in_flight(pending: &Slots, order_id: &OrderId, generation: u64) -> bool {
    match lock(pending).get(order_id) {
        Some(slot) if slot.generation == generation => {
            slot.state.send_replace(SlotState::InFlight);
            true
        }
        _ => false,
    }
}

/// Publish `outcome` for `order_id` if the slot still belongs to `generation`.
///
/// The outcome is cached before the slot leaves the pending map, and waiters
/// still see it after the sender is dropped.
fn settle(
    pending: &Slots,
    settled: &Cache<OrderId, SlotState>,
    order_id: &OrderId,
    generation: u64,
    outcome: SlotState,
) -> bool {
    let mut pending = lock(pending);
    if !pending
        .get(order_id)
        .is_some_and(|slot| slot.generation == generation)
    {
        return false;
    }

    settled.insert(order_id.clone(), outcome.clone());
    if let Some(slot) = pending.remove(order_id) {
        slot.state.send_replace(outcome);
    }
    true
}

/// The map is only ever mutated with simple inserts/removes, so a poisoned
/// lock still holds consistent data.
fn lock(slots: &Slots) -> MutexGuard<'_, HashMap<OrderId, Slot>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize};

    use chrono::DateTime;
    use lustre_core::{ReturnRequestId, ReturnRequestStatus};

    use super::*;

    struct FakeReader {
        calls: AtomicUsize,
        delay: Duration,
        fail: AtomicBool,
    }

    impl FakeReader {
        fn new(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                delay,
                fail: AtomicBool::new(false),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl ReturnRequestReader for FakeReader {
        async fn get_return_requests(
            &self,
            order_id: &OrderId,
        ) -> Result<Vec<ReturnRequest>, OrderApiError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;

            if self.fail.load(Ordering::SeqCst) {
                return Err(OrderApiError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                });
            }

            Ok(vec![ReturnRequest {
                id: ReturnRequestId::new(format!("rr_{call}")),
                order_id: order_id.clone(),
                item_sku: "RG-001".to_string(),
                status: ReturnRequestStatus::Approved,
                reason: None,
                created_at: DateTime::UNIX_EPOCH,
                updated_at: None,
            }])
        }
    }

    fn loader(reader: &Arc<FakeReader>) -> ReturnRequestLoader<FakeReader> {
        ReturnRequestLoader::new(Arc::clone(reader), ReturnFetchConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_of_triggers_issues_one_fetch() {
        let reader = FakeReader::new(Duration::from_millis(20));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        assert!(loader.trigger(&order_id));
        for _ in 0..4 {
            assert!(!loader.trigger(&order_id));
        }

        let requests = loader.load(&order_id).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(reader.calls(), 1);
        assert_eq!(loader.phase(&order_id), FetchPhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_different_orders_fetch_independently() {
        let reader = FakeReader::new(Duration::from_millis(20));
        let loader = loader(&reader);
        let first = OrderId::new("ord_1");
        let second = OrderId::new("ord_2");

        let (a, b) = tokio::join!(loader.load(&first), loader.load(&second));

        assert_eq!(reader.calls(), 2);
        assert_eq!(a[0].order_id, first);
        assert_eq!(b[0].order_id, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_phases_progress_through_state_machine() {
        let reader = FakeReader::new(Duration::from_secs(1));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        assert_eq!(loader.phase(&order_id), FetchPhase::NotStarted);
        loader.trigger(&order_id);
        assert_eq!(loader.phase(&order_id), FetchPhase::Scheduled);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(loader.phase(&order_id), FetchPhase::InFlight);
        assert!(loader.known(&order_id).is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(loader.phase(&order_id), FetchPhase::Done);
        assert_eq!(loader.known(&order_id).len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_order_is_not_fetched_again() {
        let reader = FakeReader::new(Duration::from_millis(20));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        loader.load(&order_id).await;
        loader.load(&order_id).await;
        assert!(!loader.trigger(&order_id));
        assert_eq!(reader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_fetch_is_retried_on_next_trigger() {
        let reader = FakeReader::new(Duration::from_millis(20));
        reader.fail.store(true, Ordering::SeqCst);
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        assert!(loader.load(&order_id).await.is_empty());
        assert_eq!(loader.phase(&order_id), FetchPhase::Failed);
        assert_eq!(reader.calls(), 1);

        // The order service recovers; the next page view fetches again.
        reader.fail.store(false, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_secs(3600)).await;

        let requests = loader.load(&order_id).await;
        assert_eq!(requests.len(), 1);
        assert_eq!(reader.calls(), 2);
        assert_eq!(loader.phase(&order_id), FetchPhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_failure_still_coalesces() {
        let reader = FakeReader::new(Duration::from_millis(20));
        reader.fail.store(true, Ordering::SeqCst);
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        loader.load(&order_id).await;
        reader.fail.store(false, Ordering::SeqCst);

        assert!(loader.trigger(&order_id));
        assert_eq!(loader.phase(&order_id), FetchPhase::Scheduled);
        for _ in 0..4 {
            assert!(!loader.trigger(&order_id));
        }

        assert_eq!(loader.load(&order_id).await.len(), 1);
        assert_eq!(reader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_clears_settled_result() {
        let reader = FakeReader::new(Duration::from_millis(20));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        loader.load(&order_id).await;
        assert!(loader.reset(&order_id));
        assert_eq!(loader.phase(&order_id), FetchPhase::NotStarted);
        assert!(!loader.reset(&order_id));

        assert_eq!(loader.load(&order_id).await[0].id.as_str(), "rr_2");
        assert_eq!(reader.calls(), 2);
    }

    // moka expires entries on its own clock, so this one runs in real time.
    #[tokio::test]
    async fn test_settled_result_expires_after_ttl() {
        let reader = FakeReader::new(Duration::from_millis(5));
        let loader = ReturnRequestLoader::new(
            Arc::clone(&reader),
            ReturnFetchConfig {
                debounce: Duration::from_millis(1),
                settled_ttl: Duration::from_millis(100),
                ..ReturnFetchConfig::default()
            },
        );
        let order_id = OrderId::new("ord_1");

        loader.load(&order_id).await;
        assert!(!loader.trigger(&order_id));
        assert!(lock(&loader.pending).is_empty());

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(loader.phase(&order_id), FetchPhase::NotStarted);
        loader.settled.run_pending_tasks();
        assert_eq!(loader.settled.entry_count(), 0);

        assert_eq!(loader.load(&order_id).await.len(), 1);
        assert_eq!(reader.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_settled_results_are_bounded() {
        let reader = FakeReader::new(Duration::from_millis(1));
        let loader = ReturnRequestLoader::new(
            Arc::clone(&reader),
            ReturnFetchConfig {
                settled_capacity: 10,
                ..ReturnFetchConfig::default()
            },
        );

        for i in 0..200 {
            loader.load(&OrderId::new(format!("ord_{i}"))).await;
        }
        loader.settled.run_pending_tasks();

        assert!(lock(&loader.pending).is_empty());
        assert!(loader.settled.entry_count() <= 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_fetch_times_out() {
        let reader = FakeReader::new(Duration::from_secs(30));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        assert!(loader.load(&order_id).await.is_empty());
        assert_eq!(loader.phase(&order_id), FetchPhase::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_stale_response() {
        let reader = FakeReader::new(Duration::from_secs(1));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        loader.trigger(&order_id);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(loader.phase(&order_id), FetchPhase::InFlight);

        loader.reset(&order_id);
        let requests = loader.load(&order_id).await;

        assert_eq!(reader.calls(), 2);
        assert_eq!(requests[0].id.as_str(), "rr_2");
        assert_eq!(loader.known(&order_id)[0].id.as_str(), "rr_2");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_during_debounce_skips_fetch() {
        let reader = FakeReader::new(Duration::from_millis(20));
        let loader = loader(&reader);
        let order_id = OrderId::new("ord_1");

        loader.trigger(&order_id);
        loader.reset(&order_id);
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(reader.calls(), 0);
        assert_eq!(loader.phase(&order_id), FetchPhase::NotStarted);
    }
}
