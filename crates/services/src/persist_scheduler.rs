//! Debounced persistence of state snapshots.
//!
//! Each change cancels the pending write and schedules a new one after the
//! quiet interval, so a burst of changes costs a single write of the last
//! snapshot.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use study_core::model::AppState;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::persistence::PersistenceGateway;
use crate::study_store::StateListener;

/// Quiet interval used when none is configured.
pub const DEFAULT_QUIET_INTERVAL: Duration = Duration::from_millis(300);

#[derive(Default)]
struct Slot {
    generation: u64,
    snapshot: Option<Arc<AppState>>,
    /// Timer still sleeping through its quiet interval.
    task: Option<JoinHandle<()>>,
    /// Timer that fired and is writing its snapshot.
    in_flight: Option<JoinHandle<()>>,
}

pub struct PersistScheduler {
    gateway: PersistenceGateway,
    quiet: Duration,
    runtime: Handle,
    slot: Arc<Mutex<Slot>>,
}

impl PersistScheduler {
    #[must_use]
    pub fn new(gateway: PersistenceGateway, quiet: Duration, runtime: Handle) -> Self {
        Self {
            gateway,
            quiet,
            runtime,
            slot: Arc::new(Mutex::new(Slot::default())),
        }
    }

    #[must_use]
    pub fn quiet_interval(&self) -> Duration {
        self.quiet
    }

    /// Cancel any pending write and schedule `state` after the quiet interval.
    pub fn schedule_persist(&self, state: Arc<AppState>) {
        let mut slot = lock(&self.slot);
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.generation += 1;
        slot.snapshot = Some(state);

        let generation = slot.generation;
        let shared = Arc::clone(&self.slot);
        let gateway = self.gateway.clone();
        let quiet = self.quiet;
        slot.task = Some(self.runtime.spawn(async move {
            tokio::time::sleep(quiet).await;
            let (snapshot, previous) = {
                let mut slot = lock(&shared);
                if slot.generation != generation {
                    return;
                }
                let previous = slot.in_flight.take();
                slot.in_flight = slot.task.take();
                (slot.snapshot.take(), previous)
            };
            // Writes land in schedule order.
            if let Some(previous) = previous {
                let _ = previous.await;
            }
            if let Some(snapshot) = snapshot {
                tracing::debug!(generation, "debounced write");
                gateway.save(&snapshot).await;
            }
        }));
    }

    /// True while a write is waiting for its quiet interval.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        lock(&self.slot).snapshot.is_some()
    }

    /// Drop the pending write without saving it.
    pub fn cancel(&self) {
        let mut slot = lock(&self.slot);
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.generation += 1;
        slot.snapshot = None;
    }

    /// Write the pending snapshot now instead of waiting. No-op when idle.
    ///
    /// A write the timer already started is awaited first, so once this
    /// returns nothing is left half written.
    pub async fn flush(&self) {
        let (snapshot, in_flight) = {
            let mut slot = lock(&self.slot);
            if let Some(task) = slot.task.take() {
                task.abort();
            }
            slot.generation += 1;
            (slot.snapshot.take(), slot.in_flight.take())
        };
        if let Some(in_flight) = in_flight {
            let _ = in_flight.await;
        }
        if let Some(snapshot) = snapshot {
            tracing::debug!("flushing pending write");
            self.gateway.save(&snapshot).await;
        }
    }
}

impl StateListener for PersistScheduler {
    fn state_changed(&self, state: &Arc<AppState>) {
        self.schedule_persist(Arc::clone(state));
    }
}

impl Drop for PersistScheduler {
    fn drop(&mut self) {
        if let Some(task) = lock(&self.slot).task.take() {
            task.abort();
        }
    }
}

// A poisoned slot only means a write task panicked; the data is still usable.
fn lock(slot: &Mutex<Slot>) -> MutexGuard<'_, Slot> {
    slot.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::STATE_KEY;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storage::repository::{InMemoryKeyValueStore, KeyValueStore, StorageError};
    use study_core::model::Theme;
    use study_core::time::{fixed_clock, fixed_now};
    use study_core::{Action, reduce};

    #[derive(Clone, Default)]
    struct CountingStore {
        inner: InMemoryKeyValueStore,
        state_writes: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl KeyValueStore for CountingStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == STATE_KEY {
                self.state_writes.fetch_add(1, Ordering::SeqCst);
            }
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    fn scheduler(store: &CountingStore) -> PersistScheduler {
        let gateway = PersistenceGateway::new(Arc::new(store.clone()), fixed_clock());
        PersistScheduler::new(gateway, DEFAULT_QUIET_INTERVAL, Handle::current())
    }

    fn stored_theme(store: &CountingStore) -> Theme {
        let blob = store.inner.peek(STATE_KEY).expect("state written");
        let state: AppState = serde_json::from_str(&blob).unwrap();
        state.theme
    }

    #[tokio::test(start_paused = true)]
    async fn burst_of_changes_is_written_once_with_last_snapshot() {
        let store = CountingStore::default();
        let sched = scheduler(&store);

        let mut state = Arc::new(AppState::empty(fixed_now()));
        for _ in 0..5 {
            state = reduce(&state, Action::ToggleTheme);
            sched.schedule_persist(Arc::clone(&state));
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(store.state_writes.load(Ordering::SeqCst), 0);
        assert!(sched.has_pending());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(store.state_writes.load(Ordering::SeqCst), 1);
        assert!(!sched.has_pending());
        assert_eq!(stored_theme(&store), Theme::Light);
    }

    #[tokio::test(start_paused = true)]
    async fn separate_quiet_periods_write_separately() {
        let store = CountingStore::default();
        let sched = scheduler(&store);
        let state = Arc::new(AppState::empty(fixed_now()));

        sched.schedule_persist(Arc::clone(&state));
        tokio::time::sleep(Duration::from_millis(350)).await;
        sched.schedule_persist(reduce(&state, Action::ToggleTheme));
        tokio::time::sleep(Duration::from_millis(350)).await;

        assert_eq!(store.state_writes.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn flush_writes_immediately_and_cancels_timer() {
        let store = CountingStore::default();
        let sched = scheduler(&store);
        let state = reduce(&Arc::new(AppState::empty(fixed_now())), Action::ToggleTheme);

        sched.schedule_persist(state);
        sched.flush().await;
        assert_eq!(store.state_writes.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(store.state_writes.load(Ordering::SeqCst), 1);

        sched.flush().await;
        assert_eq!(store.state_writes.load(Ordering::SeqCst), 1);
    }

    #[derive(Clone, Default)]
    struct SlowStore {
        inner: InMemoryKeyValueStore,
    }

    #[async_trait]
    impl KeyValueStore for SlowStore {
        async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
            tokio::time::sleep(Duration::from_secs(1)).await;
            self.inner.set(key, value).await
        }

        async fn remove(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove(key).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flush_waits_for_a_write_already_under_way() {
        let store = SlowStore::default();
        let gateway = PersistenceGateway::new(Arc::new(store.clone()), fixed_clock());
        let sched = PersistScheduler::new(gateway, DEFAULT_QUIET_INTERVAL, Handle::current());

        sched.schedule_persist(reduce(
            &Arc::new(AppState::empty(fixed_now())),
            Action::ToggleTheme,
        ));
        // Past the quiet interval: the timer has taken the snapshot and is
        // stuck inside the slow write.
        tokio::time::sleep(Duration::from_millis(350)).await;
        assert!(!sched.has_pending());
        assert_eq!(store.inner.peek(STATE_KEY), None);

        sched.flush().await;
        assert!(store.inner.peek(STATE_KEY).is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_drops_pending_write() {
        let store = CountingStore::default();
        let sched = scheduler(&store);

        sched.schedule_persist(Arc::new(AppState::empty(fixed_now())));
        sched.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;

        assert_eq!(store.state_writes.load(Ordering::SeqCst), 0);
        assert!(!sched.has_pending());
    }
}
