//! In-memory registry of live countdowns.
//!
//! One lock-protected map is the only shared mutable structure in the
//! lifecycle core. The cancel path and the expiring timer both race to
//! [`CountdownRegistry::claim`], an atomic remove-if-present whose return
//! value decides the winner. There is no check-then-act window: whoever
//! removes the handle owns the terminal transition.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use uuid::Uuid;

/// A live countdown for one PENDING alert.
#[derive(Debug)]
pub struct CountdownHandle {
    abort: AbortHandle,
    pub scheduled_at: DateTime<Utc>,
}

impl CountdownHandle {
    /// Stop the timer task. Harmless if the task already ran: an expired
    /// timer that lost the claim does nothing.
    pub fn abort(&self) {
        self.abort.abort();
    }
}

/// Concurrency-safe map of alert id → cancellable timer.
///
/// Owned by one engine instance and injected where needed; never a
/// module-level singleton. The mutex is held only for map operations,
/// never across an await.
#[derive(Clone, Default)]
pub struct CountdownRegistry {
    inner: Arc<Mutex<HashMap<Uuid, CountdownHandle>>>,
}

impl CountdownRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown for `alert_id`, running `on_expiry` if the timer
    /// elapses before the handle is claimed.
    ///
    /// Returns `false` (and spawns nothing) if a countdown is already
    /// registered; at most one per alert id. The handle is inserted under
    /// the same lock acquisition that spawns the timer, so the timer cannot
    /// observe the map before its own entry exists.
    pub fn schedule<F>(&self, alert_id: Uuid, delay: Duration, on_expiry: F) -> bool
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut map = self.inner.lock().expect("countdown registry poisoned");
        if map.contains_key(&alert_id) {
            tracing::warn!(alert_id = %alert_id, "Alert already has a pending countdown");
            return false;
        }

        let registry = self.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // The claim is the race arbiter: if the cancel path got here
            // first, the handle is gone and expiry is a no-op.
            if registry.claim(alert_id).is_some() {
                on_expiry.await;
            } else {
                tracing::debug!(alert_id = %alert_id, "Countdown expired after cancellation; no-op");
            }
        });

        map.insert(
            alert_id,
            CountdownHandle {
                abort: task.abort_handle(),
                scheduled_at: Utc::now(),
            },
        );
        true
    }

    /// Atomically remove and return the handle for `alert_id`.
    ///
    /// `Some` means the caller won the race and owns the terminal
    /// transition; `None` means there was nothing to claim.
    pub fn claim(&self, alert_id: Uuid) -> Option<CountdownHandle> {
        self.inner
            .lock()
            .expect("countdown registry poisoned")
            .remove(&alert_id)
    }

    pub fn contains(&self, alert_id: Uuid) -> bool {
        self.inner
            .lock()
            .expect("countdown registry poisoned")
            .contains_key(&alert_id)
    }

    /// Ids of all alerts with a live countdown.
    pub fn pending_ids(&self) -> Vec<Uuid> {
        self.inner
            .lock()
            .expect("countdown registry poisoned")
            .keys()
            .copied()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn schedule_registers_exactly_one_handle() {
        let registry = CountdownRegistry::new();
        let id = Uuid::new_v4();

        assert!(registry.schedule(id, Duration::from_secs(60), async {}));
        assert!(registry.contains(id));
        // Second registration for the same id is refused.
        assert!(!registry.schedule(id, Duration::from_secs(60), async {}));
        assert_eq!(registry.pending_ids(), vec![id]);
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let registry = CountdownRegistry::new();
        let id = Uuid::new_v4();
        registry.schedule(id, Duration::from_secs(60), async {});

        assert!(registry.claim(id).is_some());
        assert!(registry.claim(id).is_none());
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn expiry_runs_callback_once() {
        let registry = CountdownRegistry::new();
        let id = Uuid::new_v4();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        registry.schedule(id, Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        // Expiry claimed its own handle.
        assert!(!registry.contains(id));
    }

    #[tokio::test]
    async fn claimed_countdown_never_fires() {
        let registry = CountdownRegistry::new();
        let id = Uuid::new_v4();
        let fired = Arc::new(AtomicUsize::new(0));

        let counter = fired.clone();
        registry.schedule(id, Duration::from_millis(10), async move {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let handle = registry.claim(id).expect("handle should be live");
        handle.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_delay_countdown_still_resolves_exactly_once() {
        // Even a zero-length countdown cannot fire before its handle is
        // inserted: schedule holds the lock across spawn + insert.
        let registry = CountdownRegistry::new();
        let fired = Arc::new(AtomicUsize::new(0));

        for _ in 0..50 {
            let id = Uuid::new_v4();
            let counter = fired.clone();
            registry.schedule(id, Duration::from_millis(0), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 50);
    }

    #[tokio::test]
    async fn concurrent_claim_and_expiry_yield_one_winner() {
        for _ in 0..25 {
            let registry = CountdownRegistry::new();
            let id = Uuid::new_v4();
            let expiries = Arc::new(AtomicUsize::new(0));

            let counter = expiries.clone();
            registry.schedule(id, Duration::from_millis(1), async move {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            tokio::time::sleep(Duration::from_millis(1)).await;
            let cancel_won = registry.claim(id).is_some();

            tokio::time::sleep(Duration::from_millis(50)).await;
            let expiry_fired = expiries.load(Ordering::SeqCst) == 1;
            assert!(
                cancel_won ^ expiry_fired,
                "exactly one of cancel/expiry must win (cancel: {cancel_won}, expiry: {expiry_fired})"
            );
        }
    }
}
