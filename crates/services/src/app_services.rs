use std::sync::Arc;
use std::time::Duration;

use storage::repository::Storage;
use tokio::runtime::Handle;

use crate::Clock;
use crate::error::AppServicesError;
use crate::persist_scheduler::PersistScheduler;
use crate::persistence::PersistenceGateway;
use crate::study_store::StudyStore;

/// Assembles the store with its persistence wiring.
///
/// The store starts from whatever the gateway loads and every change is
/// handed to the debounced scheduler. A defaulted start is scheduled for
/// writing right away, so ids minted for the default catalog stay stable
/// across runs.
pub struct AppServices {
    clock: Clock,
    gateway: PersistenceGateway,
    scheduler: Arc<PersistScheduler>,
    store: StudyStore,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the database cannot be opened or migrated.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        quiet: Duration,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::with_storage(storage, clock, quiet).await)
    }

    /// Build services on an already opened storage backend.
    pub async fn with_storage(storage: Storage, clock: Clock, quiet: Duration) -> Self {
        let gateway = PersistenceGateway::new(Arc::clone(&storage.kv), clock);
        let loaded = gateway.load_tracked().await;
        let scheduler = Arc::new(PersistScheduler::new(
            gateway.clone(),
            quiet,
            Handle::current(),
        ));

        let mut store = StudyStore::new(loaded.state, clock);
        store.subscribe(Arc::clone(&scheduler) as Arc<dyn crate::StateListener>);
        // A defaulted state must replace whatever unusable blob is still stored.
        if loaded.defaulted {
            scheduler.schedule_persist(Arc::clone(store.state()));
        }

        Self {
            clock,
            gateway,
            scheduler,
            store,
        }
    }

    #[must_use]
    pub fn clock(&self) -> Clock {
        self.clock
    }

    #[must_use]
    pub fn store(&self) -> &StudyStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut StudyStore {
        &mut self.store
    }

    #[must_use]
    pub fn gateway(&self) -> &PersistenceGateway {
        &self.gateway
    }

    #[must_use]
    pub fn scheduler(&self) -> Arc<PersistScheduler> {
        Arc::clone(&self.scheduler)
    }

    /// Writes any pending change now. Call before the process exits.
    pub async fn shutdown(&self) {
        self.scheduler.flush().await;
    }
}
